//! Sliced, deduplicating uploads to the 123pan open platform.
//!
//! # Architecture
//!
//! This crate follows the three-layer pattern:
//! - [`data`] - Requests, session bookkeeping, outcomes and wire types
//! - [`core`] - Pure transformations (planning, validation, decoding)
//! - [`effects`] - I/O operations behind the [`ApiClient`] and
//!   [`SliceTransport`] abstractions
//!
//! # Upload flow
//!
//! 1. The source is hashed once in 4 MiB reads and rewound.
//! 2. `create` either reports an instant upload (`reuse`) or hands back a
//!    pre-upload id and a slice size.
//! 3. Each slice gets its own pre-signed URL and is PUT with bounded retry.
//! 4. Multi-part uploads are checked against the server's part list.
//! 5. `upload_complete` finishes synchronously or asks the caller to poll.
//!
//! The source is owned by the [`Uploader`] for the whole session and dropped
//! on every exit path.

pub mod core;
pub mod data;
pub mod effects;
mod error;

pub use data::{
    AsyncResult, ClientConfig, ProgressEvent, SliceLedger, UploadOptions, UploadOutcome,
    UploadRequest, UploadSession,
};
pub use effects::{
    ApiClient, CompletionPoller, Method, SliceTransport, UploadSource, Uploader, digest_source,
};
pub use error::{ApiError, Result, SliceError, UploadError};
pub use pan123_verify::ContentDigest;

#[cfg(feature = "reqwest")]
pub use effects::{OpenApiClient, ReqwestTransport};

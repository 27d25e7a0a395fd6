//! I/O operations for the upload pipeline.
//!
//! Network access goes through two collaborator traits, [`ApiClient`] for
//! authenticated JSON calls and [`SliceTransport`] for raw PUTs to
//! pre-signed URLs, so the orchestration can run against in-memory doubles.

mod digest;
mod http;
mod poller;
mod uploader;

pub use digest::{DIGEST_READ_SIZE, UploadSource, digest_source};
pub use http::{ApiClient, Method, SliceTransport};
pub use poller::{CompletionPoller, MIN_POLL_INTERVAL};
pub use uploader::Uploader;

#[cfg(feature = "reqwest")]
pub use http::{OpenApiClient, ReqwestTransport};

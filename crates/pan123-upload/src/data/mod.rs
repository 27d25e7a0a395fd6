//! Immutable data types for upload operations.
//!
//! Requests, per-session bookkeeping, outcomes, progress notifications,
//! configuration, and the JSON wire types exchanged with the service.

pub mod options;
pub mod outcome;
pub mod progress;
pub mod request;
pub mod session;
pub mod wire;

pub use options::{ClientConfig, UploadOptions};
pub use outcome::{AsyncResult, UploadOutcome};
pub use progress::ProgressEvent;
pub use request::UploadRequest;
pub use session::{SliceLedger, UploadSession};

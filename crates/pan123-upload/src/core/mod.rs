//! Pure transformations for the upload pipeline.
//!
//! Nothing in this module performs I/O: slice arithmetic, input validation,
//! part verification, backoff computation and response envelope decoding are
//! all plain functions over owned or borrowed data.

mod envelope;
mod plan;
mod retry;
mod validation;

pub use envelope::decode_envelope;
pub use plan::SlicePlan;
pub use retry::retry_delay;
pub use validation::{MAX_FILENAME_CHARS, RESERVED_FILENAME_CHARS, validate_filename, verify_parts};

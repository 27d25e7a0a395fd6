//! Error types for pan123-upload.

use std::io;
use thiserror::Error;

/// Trace id reported when the envelope carries none.
pub const NO_TRACE_ID: &str = "no_trace_id";

/// Failure of a single authenticated API call.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The envelope decoded but carried a non-zero `code`.
    #[error("api error [{code}]({trace_id}): {message}")]
    Api {
        code:     i64,
        message:  String,
        trace_id: String,
    },

    #[error("transport error{}: {message}", status.map(|s| format!(" (http {s})")).unwrap_or_default())]
    Transport { status: Option<u16>, message: String },

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("client id/secret not configured")]
    MissingCredentials,
}

impl ApiError {
    /// Whether the access token must be refreshed before retrying.
    pub fn is_unauthorized(&self) -> bool { matches!(self, ApiError::Api { code: 401, .. }) }

    pub fn trace_id(&self) -> Option<&str> {
        match self {
            ApiError::Api { trace_id, .. } => Some(trace_id),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self { ApiError::Protocol(e.to_string()) }
}

/// Failure of a single slice PUT.
#[derive(Debug, Clone, Error)]
pub enum SliceError {
    #[error("unexpected http status {0}")]
    Status(u16),

    #[error("transport error: {0}")]
    Transport(String),
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("slice {slice_no} failed after {attempts} attempts: {source}")]
    SliceUploadExhausted {
        slice_no: u32,
        attempts: u32,
        #[source]
        source:   SliceError,
    },

    #[error("part size mismatch, preuploadID: {preupload_id}, partID: {slice_no}, {local}/{remote}")]
    PartSizeMismatch {
        preupload_id: String,
        slice_no:     u32,
        local:        u64,
        remote:       u64,
    },

    #[error("upload failed, preuploadID: {preupload_id}: neither completed nor async")]
    UploadFailed { preupload_id: String },

    #[error("merge still pending after {polls} polls, preuploadID: {preupload_id}")]
    StillPending { preupload_id: String, polls: u32 },

    #[error("upload cancelled")]
    Cancelled,

    #[error("source I/O error: {0}")]
    Io(#[from] io::Error),
}

impl UploadError {
    /// Whether restarting the whole upload may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            UploadError::Api(ApiError::Transport { .. }) => true,
            UploadError::Api(_) => false,
            UploadError::SliceUploadExhausted { .. } => true,
            UploadError::InvalidInput(_) => false,
            UploadError::PartSizeMismatch { .. } => false,
            UploadError::UploadFailed { .. } => false,
            UploadError::StillPending { .. } => true,
            UploadError::Cancelled => false,
            UploadError::Io(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, UploadError>;

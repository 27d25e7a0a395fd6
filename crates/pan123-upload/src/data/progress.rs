use std::fmt;

/// Upload state transitions reported to the progress callback.
///
/// Events are delivered synchronously, in transition order, on the task
/// driving the upload. Slice numbers are 1-based; `total` is the planned
/// slice count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressEvent {
    /// The `create` call is about to be issued.
    CreatingFile,

    /// First attempt of a slice.
    UploadingSlice { seq: u32, total: u32 },

    /// Emitted before every attempt of a slice after the first.
    RetryingSlice { seq: u32, total: u32 },

    /// Comparing local slice sizes with the server's part list.
    VerifyingSlices { total: u32 },

    /// The `upload_complete` call is about to be issued.
    ReportingCompletion,
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressEvent::CreatingFile => write!(f, "Creating file"),
            ProgressEvent::UploadingSlice { seq, total } => write!(f, "Uploading slice {seq}/{total}"),
            ProgressEvent::RetryingSlice { seq, total } => write!(f, "Retrying slice {seq}/{total}"),
            ProgressEvent::VerifyingSlices { total } => write!(f, "Verifying {total} slices"),
            ProgressEvent::ReportingCompletion => write!(f, "Reporting completion"),
        }
    }
}

/// How a successful upload ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// The server already held identical content; no bytes were sent.
    Reused { file_id: u64 },

    /// All slices were uploaded and merged synchronously.
    Completed { file_id: u64 },

    /// Slices were accepted but the merge finishes out of band.
    /// Poll with [`CompletionPoller`](crate::CompletionPoller).
    Pending { preupload_id: String },
}

impl UploadOutcome {
    /// File id, once the file exists on the server.
    pub fn file_id(&self) -> Option<u64> {
        match self {
            UploadOutcome::Reused { file_id } | UploadOutcome::Completed { file_id } => Some(*file_id),
            UploadOutcome::Pending { .. } => None,
        }
    }

    pub fn is_pending(&self) -> bool { matches!(self, UploadOutcome::Pending { .. }) }
}

/// Result of one asynchronous-completion query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AsyncResult {
    pub completed: bool,
    /// Meaningful only when `completed` is set.
    pub file_id:   u64,
}

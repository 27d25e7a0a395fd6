/// A single file upload.
///
/// The source is moved into the uploader and dropped when the upload ends,
/// whatever the outcome.
#[derive(Debug)]
pub struct UploadRequest<S> {
    /// Destination directory id, `0` for the root.
    pub parent_file_id: u64,

    /// Target name. Must be shorter than 128 characters and must not contain
    /// any of `\ / : * ? | > <`.
    pub filename: String,

    /// Readable, seekable byte source.
    pub source: S,

    /// Per-slice retry budget overriding [`UploadOptions::max_retries`].
    ///
    /// [`UploadOptions::max_retries`]: crate::UploadOptions::max_retries
    pub max_retries: Option<u32>,
}

impl<S> UploadRequest<S> {
    pub fn new(parent_file_id: u64, filename: impl Into<String>, source: S) -> Self {
        Self {
            parent_file_id,
            filename: filename.into(),
            source,
            max_retries: None,
        }
    }

    #[must_use]
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }
}

use bytes::Bytes;
use pan123_verify::ContentDigest;
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};

use super::digest::{UploadSource, digest_source};
use super::http::{ApiClient, SliceTransport, post};
use super::poller::CompletionPoller;
use crate::core::{SlicePlan, retry_delay, validate_filename, verify_parts};
use crate::data::wire::{
    CompleteResponse, CreateFileRequest, CreateFileResponse, ListPartsResponse, PreuploadRequest,
    UploadUrlRequest, UploadUrlResponse, paths,
};
use crate::data::{ProgressEvent, SliceLedger, UploadOptions, UploadOutcome, UploadRequest, UploadSession};
use crate::error::{Result, SliceError, UploadError};

/// Drives one upload from digest to completion.
///
/// Calls are strictly sequential: each slice, including its retries, is
/// finished before the next slice's URL is requested.
pub struct Uploader<A, T> {
    api:       A,
    transport: T,
    options:   UploadOptions,
}

impl<A: ApiClient, T: SliceTransport> Uploader<A, T> {
    /// Create an uploader with default options.
    pub fn new(api: A, transport: T) -> Self {
        Self {
            api,
            transport,
            options: UploadOptions::default(),
        }
    }

    /// Replace the retry, progress and cancellation settings.
    pub fn with_options(mut self, options: UploadOptions) -> Self {
        self.options = options;
        self
    }

    /// The API client, e.g. to inspect token refreshes after an upload.
    pub fn api(&self) -> &A { &self.api }

    /// Options in effect for every upload run by this uploader.
    pub fn options(&self) -> &UploadOptions { &self.options }

    /// Poller sharing this uploader's API client and cancellation token.
    pub fn poller(&self) -> CompletionPoller<&A> {
        let poller = CompletionPoller::new(&self.api);
        match &self.options.cancel {
            Some(token) => poller.cancel(token.clone()),
            None => poller,
        }
    }

    /// Upload `request.source` as `request.filename` under `request.parent_file_id`.
    ///
    /// The source is consumed and dropped before this returns, on success
    /// and on every error.
    pub async fn upload<S: UploadSource>(&self, request: UploadRequest<S>) -> Result<UploadOutcome> {
        let UploadRequest {
            parent_file_id,
            filename,
            mut source,
            max_retries,
        } = request;
        validate_filename(&filename)?;
        let max_retries = max_retries.unwrap_or(self.options.max_retries);

        let (digest, size) = digest_source(&mut source).await?;

        self.notify(ProgressEvent::CreatingFile);
        let (session, file_id) = self.create(parent_file_id, &filename, digest, size).await?;
        if session.reuse {
            info!(file_id, %digest, "instant upload, content already stored");
            return Ok(UploadOutcome::Reused { file_id });
        }
        info!(
            preupload_id = %session.preupload_id,
            slice_size = session.slice_size,
            size,
            "upload session created"
        );

        let plan = SlicePlan::new(size, session.slice_size)?;
        let ledger = self.upload_slices(&session, &plan, &mut source, max_retries).await?;
        drop(source);
        info!(
            slices = ledger.len(),
            sent = ledger.total_bytes(),
            size = plan.total_size(),
            "all slices uploaded"
        );

        if plan.needs_verification(ledger.len()) {
            self.notify(ProgressEvent::VerifyingSlices { total: ledger.len() as u32 });
            let listed: ListPartsResponse = post(
                &self.api,
                paths::LIST_UPLOAD_PARTS,
                &PreuploadRequest { preupload_id: &session.preupload_id },
            )
            .await?;
            verify_parts(&session.preupload_id, &ledger, &listed.parts)?;
        }

        self.notify(ProgressEvent::ReportingCompletion);
        let completed: CompleteResponse = post(
            &self.api,
            paths::UPLOAD_COMPLETE,
            &PreuploadRequest { preupload_id: &session.preupload_id },
        )
        .await?;

        if completed.completed {
            info!(file_id = completed.file_id, "upload completed");
            Ok(UploadOutcome::Completed { file_id: completed.file_id })
        } else if completed.is_async {
            info!(preupload_id = %session.preupload_id, "upload accepted, merge pending");
            Ok(UploadOutcome::Pending { preupload_id: session.preupload_id })
        } else {
            Err(UploadError::UploadFailed { preupload_id: session.preupload_id })
        }
    }

    async fn create(
        &self,
        parent_file_id: u64,
        filename: &str,
        digest: ContentDigest,
        size: u64,
    ) -> Result<(UploadSession, u64)> {
        let created: CreateFileResponse = post(&self.api, paths::CREATE_FILE, &CreateFileRequest {
            parent_file_id,
            filename,
            etag: digest.to_hex(),
            size,
        })
        .await?;

        let session = UploadSession {
            preupload_id: created.preupload_id,
            slice_size:   created.slice_size,
            total_size:   size,
            digest,
            reuse:        created.reuse,
        };
        Ok((session, created.file_id))
    }

    async fn upload_slices<S: UploadSource>(
        &self,
        session: &UploadSession,
        plan: &SlicePlan,
        source: &mut S,
        max_retries: u32,
    ) -> Result<SliceLedger> {
        let total = plan.slice_count();
        let mut ledger = SliceLedger::new();
        let mut slice_no: u32 = 1;

        while slice_no <= total {
            self.check_cancelled()?;

            let url: UploadUrlResponse = post(&self.api, paths::GET_UPLOAD_URL, &UploadUrlRequest {
                preupload_id: &session.preupload_id,
                slice_no,
            })
            .await?;

            let payload = read_slice(source, plan.slice_size(), plan.slice_len(slice_no)).await?;
            if payload.is_empty() {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    format!("source ended before slice {slice_no}/{total}"),
                )
                .into());
            }
            debug!(slice_no, range = ?plan.range(slice_no), "slice read");
            ledger.record(slice_no, payload.len() as u64);
            // The slice number advances once the bytes are read, never per attempt.
            let current = slice_no;
            slice_no += 1;

            self.put_with_retry(&url.presigned_url, payload, current, total, max_retries)
                .await?;
        }

        Ok(ledger)
    }

    async fn put_with_retry(
        &self,
        url: &str,
        payload: Bytes,
        seq: u32,
        total: u32,
        max_retries: u32,
    ) -> Result<()> {
        let mut attempt: u32 = 0;
        loop {
            if attempt == 0 {
                self.notify(ProgressEvent::UploadingSlice { seq, total });
            } else {
                self.check_cancelled()?;
                self.notify(ProgressEvent::RetryingSlice { seq, total });
                self.backoff(attempt - 1).await?;
                self.check_cancelled()?;
            }

            debug!(seq, total, attempt, len = payload.len(), "putting slice");
            match self.transport.put_slice(url, payload.clone()).await {
                Ok(()) => return Ok(()),
                Err(error) if attempt < max_retries => {
                    warn!(seq, attempt, %error, "slice upload failed, retrying");
                    attempt += 1;
                }
                Err(error) => return Err(exhausted(seq, attempt + 1, error)),
            }
        }
    }

    async fn backoff(&self, retry_count: u32) -> Result<()> {
        let delay = retry_delay(retry_count, self.options.retry_backoff);
        if delay.is_zero() {
            return Ok(());
        }
        match &self.options.cancel {
            Some(token) => tokio::select! {
                _ = token.cancelled() => Err(UploadError::Cancelled),
                _ = tokio::time::sleep(delay) => Ok(()),
            },
            None => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
        }
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.options.is_cancelled() {
            return Err(UploadError::Cancelled);
        }
        Ok(())
    }

    fn notify(&self, event: ProgressEvent) {
        if let Some(ref callback) = self.options.on_progress {
            callback(&event);
        }
    }
}

fn exhausted(slice_no: u32, attempts: u32, source: SliceError) -> UploadError {
    UploadError::SliceUploadExhausted { slice_no, attempts, source }
}

/// Read up to `slice_size` bytes, stopping early only at end of stream.
async fn read_slice<S: UploadSource>(source: &mut S, slice_size: u64, expected: u64) -> Result<Bytes> {
    let mut buf = Vec::with_capacity(expected as usize);
    (&mut *source).take(slice_size).read_to_end(&mut buf).await?;
    Ok(Bytes::from(buf))
}

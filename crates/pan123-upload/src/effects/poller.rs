use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::http::{ApiClient, post};
use crate::data::AsyncResult;
use crate::data::wire::{AsyncResultResponse, PreuploadRequest, paths};
use crate::error::{ApiError, UploadError};

/// The service asks clients to wait at least this long between polls.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Queries the merge status of an upload that finished as
/// [`UploadOutcome::Pending`](crate::UploadOutcome::Pending).
pub struct CompletionPoller<A> {
    api:       A,
    interval:  Duration,
    max_polls: Option<u32>,
    cancel:    Option<CancellationToken>,
}

impl<A: ApiClient> CompletionPoller<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            interval: MIN_POLL_INTERVAL,
            max_polls: None,
            cancel: None,
        }
    }

    /// Delay between polls in [`wait`](Self::wait), raised to
    /// [`MIN_POLL_INTERVAL`] if shorter.
    #[must_use]
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(MIN_POLL_INTERVAL);
        self
    }

    #[must_use]
    pub fn max_polls(mut self, max_polls: u32) -> Self {
        self.max_polls = Some(max_polls);
        self
    }

    #[must_use]
    pub fn cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Issue a single status query.
    pub async fn query(&self, preupload_id: &str) -> Result<AsyncResult, ApiError> {
        let resp: AsyncResultResponse = post(
            &self.api,
            paths::UPLOAD_ASYNC_RESULT,
            &PreuploadRequest { preupload_id },
        )
        .await?;
        Ok(AsyncResult {
            completed: resp.completed,
            file_id:   resp.file_id,
        })
    }

    /// Query until the merge completes, returning the new file id.
    ///
    /// Fails with [`UploadError::StillPending`] once `max_polls` queries have
    /// all reported an unfinished merge.
    pub async fn wait(&self, preupload_id: &str) -> Result<u64, UploadError> {
        let mut polls: u32 = 0;
        loop {
            if self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
                return Err(UploadError::Cancelled);
            }
            let result = self.query(preupload_id).await?;
            polls += 1;
            if result.completed {
                debug!(preupload_id, polls, file_id = result.file_id, "merge completed");
                return Ok(result.file_id);
            }
            if self.max_polls.is_some_and(|max| polls >= max) {
                return Err(UploadError::StillPending {
                    preupload_id: preupload_id.to_string(),
                    polls,
                });
            }
            debug!(preupload_id, polls, "merge pending");
            match &self.cancel {
                Some(token) => tokio::select! {
                    _ = token.cancelled() => return Err(UploadError::Cancelled),
                    _ = tokio::time::sleep(self.interval) => {}
                },
                None => tokio::time::sleep(self.interval).await,
            }
        }
    }
}

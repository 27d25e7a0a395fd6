use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::progress::ProgressEvent;

/// Default service endpoint.
pub const DEFAULT_BASE_URL: &str = "https://open-api.123pan.com";

/// Client identification sent with every request, including slice PUTs.
pub const DEFAULT_USER_AGENT: &str = "123PAN-UNOFFICIAL-RUST-SDK";

/// Value of the `Platform` header expected by the open API.
pub const DEFAULT_PLATFORM: &str = "open_platform";

/// Configuration for upload sessions.
///
/// # Examples
///
/// ```
/// use pan123_upload::UploadOptions;
/// use std::time::Duration;
///
/// let options = UploadOptions::default()
///     .max_retries(5)
///     .retry_backoff(Duration::from_millis(200));
/// ```
#[derive(Clone)]
pub struct UploadOptions {
    /// Retries per slice after the first attempt.
    ///
    /// - Total attempts per slice = 1 (initial) + max_retries
    /// - `0` disables retry
    /// - Only slice PUTs are retried; API calls are not
    ///
    /// Default: 3
    pub max_retries: u32,

    /// Base delay for exponential backoff between attempts of one slice.
    ///
    /// The delay before retry N (1-based) is `retry_backoff * 2^(N-1)`.
    ///
    /// Default: 100ms
    pub retry_backoff: Duration,

    /// Progress callback invoked synchronously at every state transition.
    ///
    /// A panic inside the callback is not caught; it unwinds through the
    /// upload, which still drops the source.
    ///
    /// Default: None
    pub on_progress: Option<Arc<dyn Fn(&ProgressEvent) + Send + Sync>>,

    /// Checked at the top of the slice loop and before every retry.
    ///
    /// Default: None
    pub cancel: Option<CancellationToken>,
}

impl fmt::Debug for UploadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadOptions")
            .field("max_retries", &self.max_retries)
            .field("retry_backoff", &self.retry_backoff)
            .field("on_progress", &self.on_progress.as_ref().map(|_| "{ ... }"))
            .field("cancel", &self.cancel)
            .finish()
    }
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            max_retries:   3,
            retry_backoff: Duration::from_millis(100),
            on_progress:   None,
            cancel:        None,
        }
    }
}

impl UploadOptions {
    #[must_use]
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[must_use]
    pub fn retry_backoff(mut self, retry_backoff: Duration) -> Self {
        self.retry_backoff = retry_backoff;
        self
    }

    /// Set the progress callback.
    ///
    /// # Examples
    ///
    /// ```
    /// use pan123_upload::{ProgressEvent, UploadOptions};
    /// use std::sync::Arc;
    ///
    /// let options = UploadOptions::default().on_progress(Arc::new(|event: &ProgressEvent| {
    ///     if let ProgressEvent::UploadingSlice { seq, total } = event {
    ///         println!("slice {seq}/{total}");
    ///     }
    /// }));
    /// ```
    #[must_use]
    pub fn on_progress(mut self, on_progress: Arc<dyn Fn(&ProgressEvent) + Send + Sync>) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    #[must_use]
    pub fn cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
    }
}

/// Connection settings for [`OpenApiClient`](crate::OpenApiClient).
///
/// Token refresh is only attempted when both `client_id` and
/// `client_secret` are set.
#[derive(Clone)]
pub struct ClientConfig {
    pub base_url:      String,
    pub access_token:  Option<String>,
    pub client_id:     Option<String>,
    pub client_secret: Option<String>,
    /// Whole-request timeout. `None` waits indefinitely.
    pub timeout:       Option<Duration>,
    pub user_agent:    String,
    pub platform:      String,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .field("platform", &self.platform)
            .finish()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url:      DEFAULT_BASE_URL.to_string(),
            access_token:  None,
            client_id:     None,
            client_secret: None,
            timeout:       None,
            user_agent:    DEFAULT_USER_AGENT.to_string(),
            platform:      DEFAULT_PLATFORM.to_string(),
        }
    }
}

impl ClientConfig {
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    #[must_use]
    pub fn credentials(mut self, client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self.client_secret = Some(client_secret.into());
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn can_refresh(&self) -> bool {
        self.client_id.as_deref().is_some_and(|s| !s.is_empty())
            && self.client_secret.as_deref().is_some_and(|s| !s.is_empty())
    }
}

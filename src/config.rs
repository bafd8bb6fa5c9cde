//! Client configuration.
//!
//! All client behaviour is controlled through [`ClientConfig`], built via its
//! [`ClientConfigBuilder`]. Keeping every knob in one struct makes it easy to
//! share one config between the submitter, the monitor and the retriever, and
//! to log exactly what a run was configured with.

use crate::error::Vid2DocError;
use crate::job::ExportFormat;
use crate::progress::ProgressCallback;
use std::fmt;
use std::time::Duration;

/// Default service address used by the reference deployment.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Configuration for talking to the conversion service.
///
/// Built via [`ClientConfig::builder()`] or using [`ClientConfig::default()`].
///
/// # Example
/// ```rust
/// use vid2doc::ClientConfig;
///
/// let config = ClientConfig::builder()
///     .base_url("https://newsletter.example.com/")
///     .poll_interval_ms(1000)
///     .build()
///     .unwrap();
/// assert_eq!(config.base_url, "https://newsletter.example.com");
/// ```
#[derive(Clone)]
pub struct ClientConfig {
    /// Base URL of the remote service, without trailing slash.
    pub base_url: String,

    /// Fixed status-polling interval in milliseconds. Default: 2000.
    ///
    /// Constant for the life of a monitoring loop: no backoff, no jitter.
    pub poll_interval_ms: u64,

    /// Timeout for status, preview, download and delete requests. Default: 30.
    pub request_timeout_secs: u64,

    /// Timeout for the multipart upload of a local video. Default: 600.
    ///
    /// Uploads of multi-hundred-megabyte videos over a home uplink take
    /// minutes; the short request timeout would cut them off.
    pub upload_timeout_secs: u64,

    /// Per-format downloads offered once a job completes.
    /// Default: docx, html, markdown.
    ///
    /// An empty list restricts retrieval to the bundled archive.
    pub formats: Vec<ExportFormat>,

    /// Observer for submission and monitoring events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            poll_interval_ms: 2000,
            request_timeout_secs: 30,
            upload_timeout_secs: 600,
            formats: ExportFormat::ALL.to_vec(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("upload_timeout_secs", &self.upload_timeout_secs)
            .field("formats", &self.formats)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn JobProgressCallback>"),
            )
            .finish()
    }
}

impl ClientConfig {
    /// Create a new builder for `ClientConfig`.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// True when per-format downloads are disabled.
    pub fn archive_only(&self) -> bool {
        self.formats.is_empty()
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into().trim().trim_end_matches('/').to_string();
        self
    }

    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms.max(10);
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn upload_timeout_secs(mut self, secs: u64) -> Self {
        self.config.upload_timeout_secs = secs;
        self
    }

    pub fn formats(mut self, formats: impl IntoIterator<Item = ExportFormat>) -> Self {
        let mut list: Vec<ExportFormat> = Vec::new();
        for f in formats {
            if !list.contains(&f) {
                list.push(f);
            }
        }
        self.config.formats = list;
        self
    }

    /// Restrict retrieval to the bundled archive.
    pub fn archive_only(mut self) -> Self {
        self.config.formats.clear();
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ClientConfig, Vid2DocError> {
        let c = &self.config;
        if !(c.base_url.starts_with("http://") || c.base_url.starts_with("https://")) {
            return Err(Vid2DocError::InvalidConfig(format!(
                "base URL must start with http:// or https://, got '{}'",
                c.base_url
            )));
        }
        if c.request_timeout_secs == 0 || c.upload_timeout_secs == 0 {
            return Err(Vid2DocError::InvalidConfig(
                "Timeouts must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

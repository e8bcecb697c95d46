//! # Catalog Configuration Module
//!
//! Provides configuration for one remote catalog instance.
//!
//! ## Overview
//!
//! The configuration uses a builder pattern to construct a [`CatalogConfig`].
//! `build()` runs fail-fast validation so a misconfigured catalog is rejected
//! before any remote call is attempted.
//!
//! ## Usage
//!
//! ```
//! use core_runtime::config::CatalogConfig;
//! use std::time::Duration;
//!
//! let config = CatalogConfig::builder()
//!     .catalog_id(1)
//!     .server_uri("https://seafile.example.org/")
//!     .library_name("Music")
//!     .call_delay(Duration::from_millis(250))
//!     .build()
//!     .expect("valid config");
//!
//! assert_eq!(config.server_base(), "https://seafile.example.org");
//! assert!(!config.is_ready());
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::CatalogConfig;
//!
//! // Missing library name
//! let config = CatalogConfig::builder()
//!     .server_uri("https://seafile.example.org/")
//!     .build()
//!     .expect("Should fail - missing library name");
//! ```

use crate::error::{Error, Result};
use std::time::Duration;

/// Character separating the fields of a stored virtual path.
pub const VIRTUAL_PATH_SEPARATOR: char = '|';

/// Default prefix fetched from each remote file for tag parsing (2 MiB).
pub const DEFAULT_HEADER_SIZE_BYTES: u64 = 2 * 1024 * 1024;

/// Backoff tuning for throttled remote calls.
///
/// The server states how long to wait in its throttle message; these values
/// bound how much of that advice is honoured before the run gives up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Added to every advisory wait.
    pub retry_padding: Duration,

    /// Used when the throttle message carries no parseable wait.
    pub fallback_wait: Duration,

    /// Upper bound for a single wait.
    pub max_wait_per_retry: Duration,

    /// Maximum number of retries for one call.
    pub max_retries: u32,

    /// Maximum total time spent waiting for one call.
    pub max_total_wait: Duration,

    /// Pause inserted before every remote call.
    pub call_delay: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            retry_padding: Duration::from_secs(1),
            fallback_wait: Duration::from_secs(60),
            max_wait_per_retry: Duration::from_secs(300),
            max_retries: 10,
            max_total_wait: Duration::from_secs(30 * 60),
            call_delay: Duration::ZERO,
        }
    }
}

impl RateLimitConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_wait_per_retry.is_zero() {
            return Err(Error::Config(
                "max_wait_per_retry must be greater than zero".to_string(),
            ));
        }

        if self.fallback_wait > self.max_wait_per_retry {
            return Err(Error::Config(format!(
                "fallback_wait ({:?}) exceeds max_wait_per_retry ({:?})",
                self.fallback_wait, self.max_wait_per_retry
            )));
        }

        if self.max_total_wait < self.max_wait_per_retry {
            return Err(Error::Config(format!(
                "max_total_wait ({:?}) must be at least max_wait_per_retry ({:?})",
                self.max_total_wait, self.max_wait_per_retry
            )));
        }

        if self.call_delay > Duration::from_secs(60) {
            return Err(Error::Config(
                "call_delay exceeds maximum of 60 seconds".to_string(),
            ));
        }

        Ok(())
    }
}

/// Media kinds a catalog ingests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatherTypes {
    pub music: bool,
    pub video: bool,
}

impl Default for GatherTypes {
    fn default() -> Self {
        Self {
            music: true,
            video: false,
        }
    }
}

/// Configuration of one remote catalog.
#[derive(Clone, PartialEq, Eq)]
pub struct CatalogConfig {
    /// Local catalog identifier owning the records.
    pub catalog_id: i64,

    /// Base URI of the remote server.
    pub server_uri: String,

    /// Name of the remote library the catalog mirrors.
    pub library_name: String,

    /// API token; the catalog is ready once this is present.
    pub api_token: Option<String>,

    pub rate_limit: RateLimitConfig,

    pub gather: GatherTypes,

    /// Bytes fetched from the start of each file for tag parsing.
    pub header_size_bytes: u64,

    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
}

impl std::fmt::Debug for CatalogConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogConfig")
            .field("catalog_id", &self.catalog_id)
            .field("server_uri", &self.server_uri)
            .field("library_name", &self.library_name)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("rate_limit", &self.rate_limit)
            .field("gather", &self.gather)
            .field("header_size_bytes", &self.header_size_bytes)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl CatalogConfig {
    pub fn builder() -> CatalogConfigBuilder {
        CatalogConfigBuilder::default()
    }

    /// Server URI without trailing slashes, ready for joining API paths.
    pub fn server_base(&self) -> &str {
        self.server_uri.trim_end_matches('/')
    }

    /// Whether an API token has been obtained.
    pub fn is_ready(&self) -> bool {
        self.api_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Validates the configuration.
    ///
    /// This checks:
    /// - Server URI is present and uses http or https
    /// - Library name is present and free of the virtual-path separator
    /// - The header budget is non-zero and below 64 MiB
    /// - Rate limit settings are consistent
    pub fn validate(&self) -> Result<()> {
        let uri = self.server_uri.trim();
        if uri.is_empty() {
            return Err(Error::Config("Server URI cannot be empty".to_string()));
        }

        if !(uri.starts_with("http://") || uri.starts_with("https://")) {
            return Err(Error::Config(format!(
                "Server URI must start with http:// or https:// (got '{}')",
                uri
            )));
        }

        if self.library_name.trim().is_empty() {
            return Err(Error::Config("Library name cannot be empty".to_string()));
        }

        if self.library_name.contains(VIRTUAL_PATH_SEPARATOR) {
            return Err(Error::Config(format!(
                "Library name must not contain '{}'",
                VIRTUAL_PATH_SEPARATOR
            )));
        }

        if self.header_size_bytes == 0 {
            return Err(Error::Config(
                "Header size must be greater than 0 bytes".to_string(),
            ));
        }

        if self.header_size_bytes > 64 * 1024 * 1024 {
            return Err(Error::Config(
                "Header size exceeds maximum of 64 MiB".to_string(),
            ));
        }

        self.rate_limit.validate()
    }
}

/// Builder for constructing [`CatalogConfig`] instances.
#[derive(Default)]
pub struct CatalogConfigBuilder {
    catalog_id: Option<i64>,
    server_uri: Option<String>,
    library_name: Option<String>,
    api_token: Option<String>,
    rate_limit: Option<RateLimitConfig>,
    call_delay: Option<Duration>,
    gather: Option<GatherTypes>,
    header_size_bytes: Option<u64>,
    request_timeout: Option<Duration>,
}

impl CatalogConfigBuilder {
    pub fn catalog_id(mut self, id: i64) -> Self {
        self.catalog_id = Some(id);
        self
    }

    pub fn server_uri(mut self, uri: impl Into<String>) -> Self {
        self.server_uri = Some(uri.into());
        self
    }

    pub fn library_name(mut self, name: impl Into<String>) -> Self {
        self.library_name = Some(name.into());
        self
    }

    /// Sets a previously obtained API token.
    pub fn api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    pub fn rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
        self.rate_limit = Some(rate_limit);
        self
    }

    /// Overrides only the per-call pacing delay.
    pub fn call_delay(mut self, delay: Duration) -> Self {
        self.call_delay = Some(delay);
        self
    }

    pub fn gather(mut self, gather: GatherTypes) -> Self {
        self.gather = Some(gather);
        self
    }

    pub fn header_size_bytes(mut self, bytes: u64) -> Self {
        self.header_size_bytes = Some(bytes);
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Builds the configuration, validating it.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` when the server URI or library name is missing
    /// or any value fails validation.
    pub fn build(self) -> Result<CatalogConfig> {
        let server_uri = self.server_uri.ok_or_else(|| {
            Error::Config(
                "Server URI is required. Use .server_uri() to set it.".to_string(),
            )
        })?;

        let library_name = self.library_name.ok_or_else(|| {
            Error::Config(
                "Library name is required. Use .library_name() to set it.".to_string(),
            )
        })?;

        let mut rate_limit = self.rate_limit.unwrap_or_default();
        if let Some(delay) = self.call_delay {
            rate_limit.call_delay = delay;
        }

        let config = CatalogConfig {
            catalog_id: self.catalog_id.unwrap_or(0),
            server_uri,
            library_name,
            api_token: self.api_token.filter(|t| !t.is_empty()),
            rate_limit,
            gather: self.gather.unwrap_or_default(),
            header_size_bytes: self.header_size_bytes.unwrap_or(DEFAULT_HEADER_SIZE_BYTES),
            request_timeout: self.request_timeout.unwrap_or(Duration::from_secs(30)),
        };

        config.validate()?;
        Ok(config)
    }
}

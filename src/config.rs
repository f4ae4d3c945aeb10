use std::time::Duration;

use crate::cache::DEFAULT_CACHE_TTL;
use crate::{FlagentClient, Result};

/// Configuration for [`FlagentClient`].
///
/// # Examples
/// ```no_run
/// # use flagent::ClientConfig;
/// let client = ClientConfig::new("http://localhost:18000")
///     .cache_ttl_ms(30_000)
///     .to_client()
///     .unwrap();
/// ```
pub struct ClientConfig {
    pub(crate) base_url: String,
    pub(crate) connect_timeout: Duration,
    pub(crate) read_timeout: Duration,
    pub(crate) enabled: bool,
    pub(crate) cache_enabled: bool,
    pub(crate) cache_ttl: Duration,
}

impl ClientConfig {
    /// Default base URL of the evaluation service.
    pub const DEFAULT_BASE_URL: &'static str = "http://localhost:18000";

    /// Create a default configuration pointing at the given base URL. The
    /// API version path is appended automatically if not already present.
    pub fn new(base_url: impl Into<String>) -> Self {
        ClientConfig {
            base_url: base_url.into(),
            connect_timeout: Duration::from_millis(10_000),
            read_timeout: Duration::from_millis(30_000),
            enabled: true,
            cache_enabled: true,
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }

    /// Upper bound for establishing the outbound connection.
    pub fn connect_timeout_ms(mut self, connect_timeout_ms: u64) -> Self {
        self.connect_timeout = Duration::from_millis(connect_timeout_ms);
        self
    }

    /// Upper bound for awaiting a response.
    pub fn read_timeout_ms(mut self, read_timeout_ms: u64) -> Self {
        self.read_timeout = Duration::from_millis(read_timeout_ms);
        self
    }

    /// Master on/off switch. A disabled client fails every evaluation with
    /// [`Error::Disabled`](crate::Error::Disabled).
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Whether single-evaluation results are memoized locally. Batch
    /// evaluations are never cached.
    pub fn cache_enabled(mut self, cache_enabled: bool) -> Self {
        self.cache_enabled = cache_enabled;
        self
    }

    /// Expiry window per cache entry. Defaults to 60 000 ms.
    pub fn cache_ttl_ms(mut self, cache_ttl_ms: u64) -> Self {
        self.cache_ttl = Duration::from_millis(cache_ttl_ms);
        self
    }

    /// Create a new [`FlagentClient`] using the specified configuration.
    pub fn to_client(self) -> Result<FlagentClient> {
        FlagentClient::new(self)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig::new(ClientConfig::DEFAULT_BASE_URL)
    }
}

use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Application configuration, assembled from `PULSE_*` environment variables.
///
/// Every field has a default; the pipeline can run with an empty environment
/// as long as the sources file exists. `DATABASE_URL` is read separately by
/// the storage crate.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    pub sources_path: PathBuf,
    /// Maximum number of sources fetched in parallel.
    pub concurrency_limit: usize,
    /// Retry attempts after the first failure for transient fetch errors.
    pub per_source_retry_count: u32,
    /// Base delay for exponential backoff: `base * 2^attempt` seconds.
    pub retry_backoff_base_secs: u64,
    pub request_timeout_secs: u64,
    /// Wall-clock budget for one pipeline run. Sources still in flight at
    /// the deadline are abandoned and reported as timed out.
    pub run_timeout_secs: u64,
    pub user_agent: String,
    /// Normalized body text is truncated to this many characters.
    pub max_body_chars: usize,
    /// Characters of normalized body hashed into the content fingerprint.
    pub fingerprint_prefix_chars: usize,
    /// Delay between follow-up item fetches within one HTML source.
    pub inter_request_delay_ms: u64,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
}

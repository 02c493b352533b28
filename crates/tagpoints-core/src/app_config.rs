use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
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

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    /// Affiliate tag injected into rewritten links and required on every
    /// purchase event before it is relayed.
    pub associate_id: String,
    pub api_base: String,
    pub store_path: PathBuf,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub relay_retry_delay_ms: u64,
    pub channel_timeout_secs: u64,
    pub rescan_debounce_ms: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("associate_id", &self.associate_id)
            .field("api_base", &self.api_base)
            .field("store_path", &self.store_path)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("relay_retry_delay_ms", &self.relay_retry_delay_ms)
            .field("channel_timeout_secs", &self.channel_timeout_secs)
            .field("rescan_debounce_ms", &self.rescan_debounce_ms)
            .finish()
    }
}

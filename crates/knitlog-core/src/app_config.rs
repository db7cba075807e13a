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
    /// Directory receiving one `<trace_id>.json` file per import run.
    pub trace_dir: PathBuf,
    /// Maximum stored length (in chars) of any text blob in a trace.
    pub trace_blob_limit: usize,
    pub fetch_timeout_secs: u64,
    pub fetch_max_retries: u32,
    pub fetch_retry_backoff_base_secs: u64,
    pub user_agent: String,
    pub ai_enabled: bool,
    pub ai_api_key: Option<String>,
    pub ai_model: String,
    pub ai_base_url: String,
    pub ai_timeout_secs: u64,
    /// Page text beyond this many chars is cut before it reaches the prompt.
    pub ai_max_input_chars: usize,
}

impl AppConfig {
    /// AI extraction is usable only when switched on and a key is present.
    #[must_use]
    pub fn ai_available(&self) -> bool {
        self.ai_enabled && self.ai_api_key.is_some()
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("trace_dir", &self.trace_dir)
            .field("trace_blob_limit", &self.trace_blob_limit)
            .field("fetch_timeout_secs", &self.fetch_timeout_secs)
            .field("fetch_max_retries", &self.fetch_max_retries)
            .field(
                "fetch_retry_backoff_base_secs",
                &self.fetch_retry_backoff_base_secs,
            )
            .field("user_agent", &self.user_agent)
            .field("ai_enabled", &self.ai_enabled)
            .field(
                "ai_api_key",
                &self.ai_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("ai_model", &self.ai_model)
            .field("ai_base_url", &self.ai_base_url)
            .field("ai_timeout_secs", &self.ai_timeout_secs)
            .field("ai_max_input_chars", &self.ai_max_input_chars)
            .finish()
    }
}

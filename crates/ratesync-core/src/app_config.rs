use std::net::SocketAddr;

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
    pub database_url: String,
    pub redis_url: String,
    pub reviews_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub api_keys: Vec<String>,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub reviews_timeout_secs: u64,
    pub reviews_user_agent: String,
    pub rating_interval_minutes: u32,
    pub rating_batch_size: usize,
    pub rating_batch_delay_ms: u64,
    pub scheduler_warmup_secs: u64,
    pub scheduler_boot_delay_secs: u64,
    pub scheduler_autostart: bool,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("redis_url", &"[redacted]")
            .field("reviews_url", &self.reviews_url)
            .field("api_keys", &format!("[{} redacted]", self.api_keys.len()))
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("reviews_timeout_secs", &self.reviews_timeout_secs)
            .field("reviews_user_agent", &self.reviews_user_agent)
            .field("rating_interval_minutes", &self.rating_interval_minutes)
            .field("rating_batch_size", &self.rating_batch_size)
            .field("rating_batch_delay_ms", &self.rating_batch_delay_ms)
            .field("scheduler_warmup_secs", &self.scheduler_warmup_secs)
            .field("scheduler_boot_delay_secs", &self.scheduler_boot_delay_secs)
            .field("scheduler_autostart", &self.scheduler_autostart)
            .finish()
    }
}

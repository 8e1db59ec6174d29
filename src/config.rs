use vlr_scraper::VLR_BASE_URL;

/// Runtime configuration, read once at startup. Every knob has a default so
/// a bare `.env` still boots a working instance (minus auth, which warns).
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub vlr_base_url: String,
    /// Accepted `x-api-key` values (X_API_KEYS, comma-separated).
    pub api_keys: Vec<String>,
    pub db_path: String,
    pub event_log_dir: String,
    pub populate_interval_secs: u64,
    pub settle_interval_secs: u64,
    /// Settlement endpoint (SETTLEMENT_URL). Unset means settlement calls
    /// are skipped and matches still settle locally.
    pub settlement_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            bind_addr: env_or("BIND_ADDR", "0.0.0.0:5000"),
            vlr_base_url: env_or("VLR_BASE_URL", VLR_BASE_URL),
            api_keys: parse_api_keys(&std::env::var("X_API_KEYS").unwrap_or_default()),
            db_path: env_or("DB_PATH", "data/vlrbet.db"),
            event_log_dir: env_or("EVENT_LOG_DIR", "logs"),
            populate_interval_secs: env_secs("POPULATE_INTERVAL_SECS", 60),
            settle_interval_secs: env_secs("SETTLE_INTERVAL_SECS", 300),
            settlement_url: std::env::var("SETTLEMENT_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
        }
    }

    pub fn api_key_valid(&self, key: &str) -> bool {
        self.api_keys.iter().any(|k| k == key)
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_secs(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

fn parse_api_keys(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect()
}

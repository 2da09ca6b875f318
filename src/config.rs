// Runtime configuration, read once at startup from the environment (and `.env`).

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 13000;
pub const DEFAULT_BASE_DIR: &str = "temp_sessions";
pub const DEFAULT_CALLBACK_URL: &str = "https://it-compliance-api.onrender.com/start_it_compliance";
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub port: u16,
    /// Parent of every `Temp_*` session folder.
    pub base_dir: PathBuf,
    /// Where the completion payload is posted.
    pub callback_url: String,
    /// Applies to input downloads and to the completion callback.
    pub fetch_timeout: Duration,
    /// Inline service account key JSON. Wins over `service_account_key_path`.
    pub service_account_json: Option<String>,
    pub service_account_key_path: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Unset, blank or unparsable
    /// values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let port = get("PORT")
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_PORT);
        let base_dir = get("GAP_BASE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_BASE_DIR));
        let callback_url = get("COMPLIANCE_CALLBACK_URL")
            .unwrap_or_else(|| DEFAULT_CALLBACK_URL.to_string());
        let fetch_timeout = get("GAP_FETCH_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .filter(|secs: &u64| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS));

        Self {
            port,
            base_dir,
            callback_url,
            fetch_timeout,
            service_account_json: get("GOOGLE_SERVICE_ACCOUNT_JSON"),
            service_account_key_path: get("GOOGLE_SERVICE_ACCOUNT_KEY"),
        }
    }

    /// Listen on every interface.
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port))
    }
}

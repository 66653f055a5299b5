use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::services::sessions::{DEFAULT_ADVISOR_TIMEOUT, DEFAULT_MAX_ITEMS_PER_SESSION};
use crate::services::SessionOptions;

const DEFAULT_ITEM_BANK_PATH: &str = "data/items.json";
const DEFAULT_CLEANUP_SCHEDULE: &str = "0 */5 * * * *";

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub item_bank_path: PathBuf,
    pub max_items_per_session: usize,
    pub advisor_timeout: Duration,
    /// Zero disables idle-session eviction.
    pub session_ttl: Duration,
    pub cleanup_schedule: String,
}

impl Config {
    pub fn from_env() -> Self {
        let port = env_parse::<u16>("PORT").unwrap_or(1234);

        let host = env_parse::<IpAddr>("HOST").unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));

        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let item_bank_path = env_string("ITEM_BANK_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ITEM_BANK_PATH));

        let max_items_per_session = env_parse::<usize>("MAX_ITEMS_PER_SESSION")
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_MAX_ITEMS_PER_SESSION);

        let advisor_timeout = env_parse::<u64>("ADVISOR_TIMEOUT_MS")
            .filter(|v| *v > 0)
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_ADVISOR_TIMEOUT);

        let session_ttl = Duration::from_secs(env_parse::<u64>("SESSION_TTL_SECS").unwrap_or(0));

        let cleanup_schedule = env_string("SESSION_CLEANUP_SCHEDULE")
            .unwrap_or_else(|| DEFAULT_CLEANUP_SCHEDULE.to_string());

        Self {
            host,
            port,
            log_level,
            item_bank_path,
            max_items_per_session,
            advisor_timeout,
            session_ttl,
            cleanup_schedule,
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            max_items_per_session: self.max_items_per_session,
            advisor_timeout: self.advisor_timeout,
        }
    }

    pub fn eviction_enabled(&self) -> bool {
        !self.session_ttl.is_zero()
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_string(key)?.trim().parse::<T>().ok()
}

//! Environment configuration for the bot server

use crate::runtime::DEFAULT_IDLE_TIMEOUT;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_PORT: u16 = 8000;

/// Where conversation state lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreBackend {
    #[default]
    Sqlite,
    Memory,
}

impl StoreBackend {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Some(StoreBackend::Sqlite),
            "memory" | "mem" => Some(StoreBackend::Memory),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotConfig {
    pub port: u16,
    pub store: StoreBackend,
    pub db_path: PathBuf,
    /// Quiet time after which a conversation runtime stops
    pub idle_timeout: Duration,
}

impl BotConfig {
    /// Read `TELEMENU_PORT`, `TELEMENU_STORE`, `TELEMENU_DB_PATH` and
    /// `TELEMENU_IDLE_SECS`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let port = lookup("TELEMENU_PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let store = match lookup("TELEMENU_STORE") {
            Some(value) => StoreBackend::parse(&value).unwrap_or_else(|| {
                tracing::warn!(value = %value, "Unknown TELEMENU_STORE, using sqlite");
                StoreBackend::Sqlite
            }),
            None => StoreBackend::default(),
        };

        let db_path = lookup("TELEMENU_DB_PATH").map_or_else(
            || {
                let home = lookup("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(format!("{home}/.telemenu/state.db"))
            },
            PathBuf::from,
        );

        let idle_timeout = lookup("TELEMENU_IDLE_SECS")
            .and_then(|s| s.parse().ok())
            .filter(|&secs| secs > 0)
            .map_or(DEFAULT_IDLE_TIMEOUT, Duration::from_secs);

        Self {
            port,
            store,
            db_path,
            idle_timeout,
        }
    }
}

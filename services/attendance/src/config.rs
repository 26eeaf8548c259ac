use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;

use crate::db::DbConfig;
use crate::feed::FeedWorkerConfig;
use crate::notify::{ExpoPushConfig, DEFAULT_EXPO_PUSH_URL};

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub log_level: String,
    pub dev_mode: bool,
    pub database: DbConfig,
    pub push: ExpoPushConfig,
    pub feed: FeedWorkerConfig,
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let listen_addr = std::env::var("ROLLCALL_LISTEN_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
            .parse()?;

        let log_level = std::env::var("ROLLCALL_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let dev_mode = std::env::var("ROLLCALL_DEV")
            .map(|v| v == "1" || v.to_lowercase() == "true")
            .unwrap_or(false);

        let database = DbConfig::from_env();

        let push = ExpoPushConfig {
            endpoint: std::env::var("ROLLCALL_PUSH_URL")
                .unwrap_or_else(|_| DEFAULT_EXPO_PUSH_URL.to_string()),
            timeout: Duration::from_secs(env_parse("ROLLCALL_PUSH_TIMEOUT_SECS", 10)),
        };

        let feed = FeedWorkerConfig {
            max_in_flight: env_parse("ROLLCALL_PUSH_MAX_IN_FLIGHT", 32),
            retry_interval: Duration::from_millis(env_parse("ROLLCALL_FEED_RETRY_MS", 1000)),
            ..Default::default()
        };

        Ok(Self {
            listen_addr,
            log_level,
            dev_mode,
            database,
            push,
            feed,
        })
    }
}

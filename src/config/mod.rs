//! Configuration module for the clan registry service.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Pre-shared key for API authentication (required in production)
    pub api_psk: Option<String>,
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Users holding elevated global privilege
    pub admins: Vec<String>,
    /// Rooms that exist independently of clans; clan ids may not collide with them
    pub reserved_rooms: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, String> {
        dotenvy::dotenv().ok();

        let api_psk = env::var("CLANS_API_PSK").ok().filter(|k| !k.is_empty());

        let db_path = env::var("CLANS_DB_PATH")
            .unwrap_or_else(|_| "./data/clans.sqlite".to_string())
            .into();

        let bind_addr = env::var("CLANS_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let bind_addr = bind_addr
            .parse()
            .map_err(|e| format!("Invalid CLANS_BIND_ADDR '{}': {}", bind_addr, e))?;

        let log_level = env::var("CLANS_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let admins = split_list(&env::var("CLANS_ADMINS").unwrap_or_default());

        let reserved_rooms = split_list(
            &env::var("CLANS_RESERVED_ROOMS").unwrap_or_else(|_| "lobby,staff".to_string()),
        );

        Ok(Self {
            api_psk,
            db_path,
            bind_addr,
            log_level,
            admins,
            reserved_rooms,
        })
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

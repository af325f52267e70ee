use std::env;

use log::LevelFilter;


pub const MEMORY_STORE_URL: &str = "memory:";

const DEFAULT_DATABASE_URL: &str = "postgres://localhost/hec";
const DEFAULT_DATABASE_NAME: &str = "hec_sl_db";
const DEFAULT_POOL_SIZE: u32 = 8;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;
const DEFAULT_CORS_ORIGINS: &[&str] = &[
    "https://elephantguardsl.netlify.app",
    "http://localhost:3000",
    "http://localhost:5173",
    "http://127.0.0.1:3000",
    "http://127.0.0.1:5173",
];


#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub database_url: String,
    pub database_name: String,
    pub pool_size: u32,
    /// How long a request waits for a pooled database connection.
    pub connect_timeout_secs: u64,
    pub secret_key: Option<String>,
    pub cors_origins: Vec<String>,
    pub log_level: LevelFilter,
    pub sentry_dsn: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Config::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self where
        F: Fn(&str) -> Option<String> {

        let var = |key: &str| lookup(key)
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty());

        let cors_origins = match var("CORS_ORIGINS") {
            Some(list) => list.split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_owned)
                .collect(),
            None => DEFAULT_CORS_ORIGINS.iter().map(|&o| o.to_owned()).collect(),
        };

        Config {
            database_url: var("DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.into()),
            database_name: var("DATABASE_NAME")
                .unwrap_or_else(|| DEFAULT_DATABASE_NAME.into()),
            pool_size: var("DATABASE_POOL_SIZE")
                .and_then(|v| v.parse().ok())
                .filter(|&n| n > 0)
                .unwrap_or(DEFAULT_POOL_SIZE),
            connect_timeout_secs: var("DATABASE_CONNECT_TIMEOUT")
                .and_then(|v| v.parse().ok())
                .filter(|&n| n > 0)
                .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
            secret_key: var("SECRET_KEY"),
            cors_origins,
            log_level: var("LOG_LEVEL")
                .and_then(|v| v.parse().ok())
                .unwrap_or(LevelFilter::Info),
            sentry_dsn: var("SENTRY_DSN"),
        }
    }

    pub fn uses_memory_store(&self) -> bool {
        self.database_url.starts_with(MEMORY_STORE_URL)
    }
}

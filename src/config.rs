use leptos::logging::{log, warn};
use std::env;
use std::fmt::Display;
use std::str::FromStr;

/// SQLite's default bind-parameter limit, less the one taken by the viewer id.
pub const SQLITE_MAX_BATCH_IDS: usize = 32_765;

/// Server settings that are not part of the Leptos site options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub database_path: String,
    pub max_batch_ids: usize,
}

impl ServerConfig {
    pub fn load() -> Self {
        let default_batch = SQLITE_MAX_BATCH_IDS.to_string();
        Self {
            database_path: try_load("EDSKOOL_DB_PATH", "edskool.db"),
            max_batch_ids: clamp_batch(try_load("EDSKOOL_MAX_BATCH_IDS", &default_batch)),
        }
    }
}

/// Keeps one course page's ids inside a single vote-state query.
fn clamp_batch(requested: usize) -> usize {
    if requested == 0 || requested > SQLITE_MAX_BATCH_IDS {
        warn!(
            "[CONFIG] EDSKOOL_MAX_BATCH_IDS {} out of range, using {}",
            requested, SQLITE_MAX_BATCH_IDS
        );
        return SQLITE_MAX_BATCH_IDS;
    }
    requested
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            database_path: "edskool.db".to_string(),
            max_batch_ids: SQLITE_MAX_BATCH_IDS,
        }
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        log!("[CONFIG] {} not set, using default: {}", key, default);
        default.to_string()
    });
    match raw.parse() {
        Ok(value) => value,
        Err(e) => {
            warn!("[CONFIG] Invalid {} value {:?}: {}, using default", key, raw, e);
            parse_default(key, default)
        }
    }
}

fn parse_default<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    default
        .parse()
        .unwrap_or_else(|e| panic!("default for {} does not parse: {}", key, e))
}

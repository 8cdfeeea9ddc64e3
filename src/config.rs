//! Server configuration from environment variables.
//!
//! | Variable          | Default   | Meaning                                        |
//! |-------------------|-----------|------------------------------------------------|
//! | `HOST`            | `0.0.0.0` | bind address                                   |
//! | `PORT`            | `8080`    | bind port                                      |
//! | `DATA_DIR`        | unset     | JSONL stat store root; in-memory store if unset |
//! | `POOLS_DIR`       | `pools`   | directory of `<tournament_id>.csv` pools       |
//! | `RUN_IDLE_HOURS`  | `12`      | idle runs are dropped after this long          |
//! | `STATS_PAGE_SIZE` | `500`     | records per store page when ranking            |

use crate::store::DEFAULT_PAGE_SIZE;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {var}: {reason}")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub data_dir: Option<PathBuf>,
    pub pools_dir: PathBuf,
    pub run_idle_timeout: Duration,
    pub stats_page_size: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_pools_dir() -> PathBuf {
    PathBuf::from("pools")
}

fn default_run_idle_hours() -> u64 {
    12
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            data_dir: None,
            pools_dir: default_pools_dir(),
            run_idle_timeout: Duration::from_secs(default_run_idle_hours() * 3600),
            stats_page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable lookup (the environment, or a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let port = match get("PORT") {
            Some(v) => parse_number("PORT", &v)?,
            None => defaults.port,
        };
        let idle_hours: u64 = match get("RUN_IDLE_HOURS") {
            Some(v) => parse_number("RUN_IDLE_HOURS", &v)?,
            None => default_run_idle_hours(),
        };
        let stats_page_size: usize = match get("STATS_PAGE_SIZE") {
            Some(v) => parse_number("STATS_PAGE_SIZE", &v)?,
            None => defaults.stats_page_size,
        };
        let run_idle_timeout = idle_hours
            .checked_mul(3600)
            .map(Duration::from_secs)
            .ok_or_else(|| ConfigError::InvalidValue {
                var: "RUN_IDLE_HOURS",
                value: idle_hours.to_string(),
                reason: "too large".to_string(),
            })?;
        if stats_page_size == 0 {
            return Err(ConfigError::InvalidValue {
                var: "STATS_PAGE_SIZE",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            host: get("HOST").unwrap_or(defaults.host),
            port,
            data_dir: get("DATA_DIR").map(PathBuf::from),
            pools_dir: get("POOLS_DIR").map(PathBuf::from).unwrap_or(defaults.pools_dir),
            run_idle_timeout,
            stats_page_size,
        })
    }
}

fn parse_number<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            var,
            value: value.to_string(),
            reason: e.to_string(),
        })
}

use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use thiserror::Error;

use crate::evaluation::cache::DEFAULT_TTL_MILLIS;
use crate::evaluation::UnknownFlagPolicy;
use crate::export::DEFAULT_HIDDEN_PATTERNS;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} missing, it is required")]
    Missing(&'static str),

    #[error("{name} has invalid value '{value}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: &'static str,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Raw tier name; resolution to a known tier happens later.
    pub environment: String,
    pub cache_ttl_millis: i64,
    pub catalog_path: Option<PathBuf>,
    pub hidden_patterns: Vec<String>,
    pub unknown_flag_policy: Option<UnknownFlagPolicy>,
    pub jwt_secret: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenv().is_ok();
        Self::from_reader(|name| env::var(name).ok())
    }

    /// Build from any variable source; `from_env` passes the process
    /// environment.
    pub fn from_reader<F>(read: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port_raw = read("PORT").ok_or(ConfigError::Missing("PORT"))?;
        let port = port_raw.trim().parse().map_err(|_| ConfigError::Invalid {
            name: "PORT",
            value: port_raw.clone(),
            reason: "must be a valid u16 number",
        })?;

        let host = read("HOST")
            .filter(|h| !h.trim().is_empty())
            .unwrap_or_else(|| "127.0.0.1".to_string());

        let environment = read("APP_ENV")
            .or_else(|| read("NODE_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let cache_ttl_millis = match read("FLAG_CACHE_TTL_MS") {
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(ttl) if ttl >= 0 => ttl,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "FLAG_CACHE_TTL_MS",
                        value: raw,
                        reason: "must be a non-negative number of milliseconds",
                    })
                }
            },
            None => DEFAULT_TTL_MILLIS,
        };

        let catalog_path = read("FLAG_CATALOG_PATH")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        let hidden_patterns = match read("FLAG_HIDDEN_PATTERNS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect(),
            None => DEFAULT_HIDDEN_PATTERNS.iter().map(|p| p.to_string()).collect(),
        };

        let unknown_flag_policy = match read("FLAG_UNKNOWN_POLICY") {
            Some(raw) => Some(UnknownFlagPolicy::parse(&raw).ok_or(ConfigError::Invalid {
                name: "FLAG_UNKNOWN_POLICY",
                value: raw.clone(),
                reason: "must be 'strict' or 'lenient'",
            })?),
            None => None,
        };

        let jwt_secret = read("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        Ok(Self {
            host,
            port,
            environment,
            cache_ttl_millis,
            catalog_path,
            hidden_patterns,
            unknown_flag_policy,
            jwt_secret,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

use std::{env, fmt::Display, fs::read_to_string, str::FromStr};

use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid {key} value: {reason}")]
    Invalid { key: String, reason: String },

    #[error("Secret {0} not found in environment or /run/secrets")]
    MissingSecret(String),
}

#[derive(Clone, Debug, PartialEq)]
pub enum StoreConfig {
    Mongo { uri: String, database: String },
    Memory,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub store: StoreConfig,
    pub token_secret: String,
    pub production: bool,
    pub allowed_origins: Vec<String>,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key source, falling back to
    /// `/run/secrets` for secrets the source does not provide.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let store = match try_load::<String, _>(&lookup, "STORE_BACKEND", "mongo")?.as_str() {
            "mongo" => {
                let user = read_secret(&lookup, "DB_USER")?;
                let pass = read_secret(&lookup, "DB_PASS")?;
                let host: String = try_load(&lookup, "DB_HOST", "cluster0.mongodb.net")?;

                StoreConfig::Mongo {
                    uri: format!("mongodb+srv://{user}:{pass}@{host}/?retryWrites=true&w=majority"),
                    database: try_load(&lookup, "DB_NAME", "restaurant")?,
                }
            }
            "memory" => StoreConfig::Memory,
            other => {
                return Err(ConfigError::Invalid {
                    key: "STORE_BACKEND".to_string(),
                    reason: format!("unknown backend {other}"),
                });
            }
        };

        let allowed_origins: String =
            try_load(&lookup, "CORS_ORIGINS", "http://localhost:5173")?;
        let allowed_origins: Vec<String> = allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(String::from)
            .collect();

        // credentialed CORS cannot answer with a wildcard origin
        if allowed_origins.iter().any(|origin| origin == "*") {
            warn!("Wildcard CORS origin is not allowed with cookies");

            return Err(ConfigError::Invalid {
                key: "CORS_ORIGINS".to_string(),
                reason: "wildcard origin cannot be combined with credentials".to_string(),
            });
        }

        Ok(Self {
            port: try_load(&lookup, "PORT", "5000")?,
            store,
            token_secret: read_secret(&lookup, "ACCESS_TOKEN_SECRET")?,
            production: lookup("APP_ENV").is_some_and(|value| value == "production"),
            allowed_origins,
        })
    }
}

fn try_load<T: FromStr, F>(lookup: &F, key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .unwrap_or_else(|| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e: T::Err| {
            warn!("Invalid {key} value: {e}");

            ConfigError::Invalid {
                key: key.to_string(),
                reason: e.to_string(),
            }
        })
}

fn read_secret<F>(lookup: &F, secret_name: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup(secret_name) {
        return Ok(value);
    }

    let path = format!("/run/secrets/{secret_name}");

    read_to_string(&path)
        .map(|s| s.trim().to_string())
        .map_err(|e| {
            warn!("Failed to read {secret_name} from file: {e}");

            ConfigError::MissingSecret(secret_name.to_string())
        })
}

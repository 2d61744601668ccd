//! Server configuration, read once at startup from `FITCLUB_*` variables.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use fitclub_api::ApiConfig;

const PLACEHOLDER_SECRETS: &[&str] = &["dev-secret-change-me", "change-me", "changeme", "secret"];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is unset or still a placeholder")]
    MissingSecret(&'static str),
    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub document_dir: PathBuf,
    /// Base used when building document URLs.
    pub public_url: String,
    pub api: ApiConfig,
}

impl Config {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        let jwt_secret = lookup("FITCLUB_JWT_SECRET").unwrap_or_default();
        if jwt_secret.trim().is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            return Err(ConfigError::MissingSecret("FITCLUB_JWT_SECRET"));
        }

        let port = var("FITCLUB_PORT", "3000");
        let port = port.parse().map_err(|_| ConfigError::Invalid {
            name: "FITCLUB_PORT",
            value: port,
        })?;

        let token_days = var("FITCLUB_TOKEN_DAYS", "30");
        let token_days = match token_days.parse::<i64>() {
            Ok(days) if days > 0 => days,
            _ => {
                return Err(ConfigError::Invalid {
                    name: "FITCLUB_TOKEN_DAYS",
                    value: token_days,
                });
            }
        };

        let admin_emails = var("FITCLUB_ADMIN_EMAILS", "")
            .split(',')
            .map(|email| email.trim().to_lowercase())
            .filter(|email| !email.is_empty())
            .collect();

        Ok(Self {
            host: var("FITCLUB_HOST", "0.0.0.0"),
            port,
            db_path: var("FITCLUB_DB_PATH", "fitclub.db").into(),
            document_dir: var("FITCLUB_DOCUMENT_DIR", "./documents").into(),
            public_url: var("FITCLUB_PUBLIC_URL", "http://localhost:3000")
                .trim_end_matches('/')
                .to_string(),
            api: ApiConfig {
                jwt_secret,
                token_days,
                admin_emails,
            },
        })
    }

    pub fn addr(&self) -> Result<SocketAddr, ConfigError> {
        let raw = format!("{}:{}", self.host, self.port);
        raw.parse().map_err(|_| ConfigError::Invalid {
            name: "FITCLUB_HOST",
            value: self.host.clone(),
        })
    }
}

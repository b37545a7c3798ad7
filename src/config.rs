use std::{collections::HashMap, path::PathBuf, str::FromStr};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub secret: String,
    pub token_ttl_hours: i64,
    pub media_url: String,
    pub page_size: u64,
    pub max_page_size: u64,
    pub catalog_fixture: Option<PathBuf>,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has invalid value `{value}`")]
    Invalid { key: &'static str, value: String },
}

impl Config {
    /// Reads `.env` (if any) and then the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars().collect())
    }

    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        let required = |key: &'static str| {
            vars.get(key)
                .filter(|value| !value.is_empty())
                .cloned()
                .ok_or(ConfigError::Missing(key))
        };

        let config = Config {
            database_url: required("DATABASE_URL")?,
            secret: required("SECRET")?,
            bind_addr: vars
                .get("BIND_ADDR")
                .cloned()
                .unwrap_or_else(|| "0.0.0.0:3000".to_owned()),
            token_ttl_hours: parse_or(&vars, "TOKEN_TTL_HOURS", 24)?,
            media_url: vars
                .get("MEDIA_URL")
                .cloned()
                .unwrap_or_else(|| "/media/".to_owned()),
            page_size: parse_or(&vars, "PAGE_SIZE", 10)?,
            max_page_size: parse_or(&vars, "MAX_PAGE_SIZE", 100)?,
            catalog_fixture: vars.get("CATALOG_FIXTURE").map(PathBuf::from),
        };

        if config.page_size == 0 || config.page_size > config.max_page_size {
            return Err(ConfigError::Invalid {
                key: "PAGE_SIZE",
                value: config.page_size.to_string(),
            });
        }

        Ok(config)
    }

    /// Turns a stored relative path into the URL clients should fetch.
    pub fn media(&self, path: &str) -> String {
        format!("{}{}", self.media_url, path)
    }
}

fn parse_or<T: FromStr>(
    vars: &HashMap<String, String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match vars.get(key) {
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
            key,
            value: value.clone(),
        }),
        None => Ok(default),
    }
}

use std::path::PathBuf;

use anyhow::Context;
use serde::Deserialize;

/// Deployment profile; picks the defaults used when a variable is unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Staging,
    Production,
}

impl Environment {
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "production" => Environment::Production,
            _ => Environment::Staging,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }

    fn default_port(self) -> u16 {
        match self {
            Environment::Staging => 3000,
            Environment::Production => 5000,
        }
    }

    fn default_hashing_secret(self) -> &'static str {
        match self {
            Environment::Staging => "aSecretHash",
            Environment::Production => "alsoASecretHash",
        }
    }
}

/// Upper bound for `TOKEN_TTL_MINUTES`: one year.
pub const MAX_TOKEN_TTL_MINUTES: i64 = 60 * 24 * 365;

const DEFAULT_TOKEN_TTL_MINUTES: i64 = 60;

fn token_ttl_minutes(raw: Option<&str>) -> anyhow::Result<i64> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_TOKEN_TTL_MINUTES);
    };
    let minutes = raw
        .trim()
        .parse::<i64>()
        .with_context(|| format!("TOKEN_TTL_MINUTES is not a number: {raw:?}"))?;
    anyhow::ensure!(
        (1..=MAX_TOKEN_TTL_MINUTES).contains(&minutes),
        "TOKEN_TTL_MINUTES must be between 1 and {MAX_TOKEN_TTL_MINUTES}, got {minutes}"
    );
    Ok(minutes)
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub hashing_secret: String,
    pub token_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub env: Environment,
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub auth: AuthConfig,
    pub max_cart_items: usize,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let env = Environment::from_name(&std::env::var("APP_ENV").unwrap_or_default());
        let port = match std::env::var("APP_PORT") {
            Ok(v) => v.parse::<u16>()?,
            Err(_) => env.default_port(),
        };
        let auth = AuthConfig {
            hashing_secret: std::env::var("HASHING_SECRET")
                .unwrap_or_else(|_| env.default_hashing_secret().into()),
            token_ttl_minutes: token_ttl_minutes(std::env::var("TOKEN_TTL_MINUTES").ok().as_deref())?,
        };
        Ok(Self {
            env,
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port,
            data_dir: std::env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".data")),
            auth,
            max_cart_items: std::env::var("MAX_CART_ITEMS")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(3),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_environment_falls_back_to_staging() {
        assert_eq!(Environment::from_name("qa"), Environment::Staging);
        assert_eq!(Environment::from_name(""), Environment::Staging);
        assert_eq!(Environment::from_name(" Production "), Environment::Production);
    }

    #[test]
    fn profiles_have_distinct_defaults() {
        assert_eq!(Environment::Staging.default_port(), 3000);
        assert_eq!(Environment::Production.default_port(), 5000);
        assert_ne!(
            Environment::Staging.default_hashing_secret(),
            Environment::Production.default_hashing_secret()
        );
    }

    #[test]
    fn token_ttl_defaults_to_an_hour() {
        assert_eq!(token_ttl_minutes(None).unwrap(), 60);
        assert_eq!(token_ttl_minutes(Some(" 15 ")).unwrap(), 15);
        assert_eq!(
            token_ttl_minutes(Some(&MAX_TOKEN_TTL_MINUTES.to_string())).unwrap(),
            MAX_TOKEN_TTL_MINUTES
        );
    }

    #[test]
    fn token_ttl_out_of_range_is_an_error() {
        assert!(token_ttl_minutes(Some("0")).is_err());
        assert!(token_ttl_minutes(Some("-5")).is_err());
        assert!(token_ttl_minutes(Some("soon")).is_err());
        assert!(token_ttl_minutes(Some(&(MAX_TOKEN_TTL_MINUTES + 1).to_string())).is_err());
        assert!(token_ttl_minutes(Some("9223372036854775807")).is_err());
    }
}

//! Configuration loaded from environment variables (after `.env` via `dotenvy`).
//!
//! Required: `JWT_SECRET`, and `MONGODB_URI` unless `DATABASE_BACKEND=memory`.
//! Braintree is enabled only when `BRAINTREE_MERCHANT_ID`, `BRAINTREE_PUBLIC_KEY`
//! and `BRAINTREE_PRIVATE_KEY` are all set.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use secrecy::SecretString;
use thiserror::Error;

const DEFAULT_PORT: u16 = 6060;
const DEFAULT_DATABASE_NAME: &str = "ecommerce";
const DEFAULT_JWT_TTL_DAYS: i64 = 7;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseBackend {
    Mongo,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BraintreeEnvironment {
    Sandbox,
    Production,
}

impl BraintreeEnvironment {
    pub fn graphql_endpoint(self) -> &'static str {
        match self {
            Self::Sandbox => "https://payments.sandbox.braintree-api.com/graphql",
            Self::Production => "https://payments.braintree-api.com/graphql",
        }
    }
}

#[derive(Debug, Clone)]
pub struct BraintreeConfig {
    pub environment: BraintreeEnvironment,
    pub merchant_id: String,
    pub public_key: String,
    pub private_key: SecretString,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub backend: DatabaseBackend,
    pub mongodb_uri: Option<SecretString>,
    pub database_name: String,
    pub jwt_secret: SecretString,
    pub jwt_ttl: time::Duration,
    pub braintree: Option<BraintreeConfig>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup; `from_env` passes `std::env::var`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let require = |key: &str| get(key).ok_or_else(|| ConfigError::MissingEnvVar(key.into()));

        let host = match get("HOST") {
            Some(host) => host
                .parse()
                .map_err(|_| ConfigError::InvalidEnvVar("HOST".into(), host))?,
            None => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        };

        let port = match get("PORT") {
            Some(port) => port
                .parse()
                .map_err(|_| ConfigError::InvalidEnvVar("PORT".into(), port))?,
            None => DEFAULT_PORT,
        };

        let backend = match get("DATABASE_BACKEND").as_deref() {
            None | Some("mongo") => DatabaseBackend::Mongo,
            Some("memory") => DatabaseBackend::Memory,
            Some(other) => {
                return Err(ConfigError::InvalidEnvVar(
                    "DATABASE_BACKEND".into(),
                    other.into(),
                ))
            }
        };

        let mongodb_uri = match backend {
            DatabaseBackend::Mongo => Some(SecretString::from(require("MONGODB_URI")?)),
            DatabaseBackend::Memory => get("MONGODB_URI").map(SecretString::from),
        };

        let jwt_ttl_days = match get("JWT_TTL_DAYS") {
            Some(days) => days
                .parse::<i64>()
                .ok()
                .filter(|days| *days > 0)
                .ok_or_else(|| ConfigError::InvalidEnvVar("JWT_TTL_DAYS".into(), days))?,
            None => DEFAULT_JWT_TTL_DAYS,
        };

        let environment = match get("BRAINTREE_ENVIRONMENT").as_deref() {
            None | Some("sandbox") => BraintreeEnvironment::Sandbox,
            Some("production") => BraintreeEnvironment::Production,
            Some(other) => {
                return Err(ConfigError::InvalidEnvVar(
                    "BRAINTREE_ENVIRONMENT".into(),
                    other.into(),
                ))
            }
        };

        let braintree = match (
            get("BRAINTREE_MERCHANT_ID"),
            get("BRAINTREE_PUBLIC_KEY"),
            get("BRAINTREE_PRIVATE_KEY"),
        ) {
            (Some(merchant_id), Some(public_key), Some(private_key)) => Some(BraintreeConfig {
                environment,
                merchant_id,
                public_key,
                private_key: SecretString::from(private_key),
            }),
            _ => None,
        };

        Ok(Self {
            host,
            port,
            backend,
            mongodb_uri,
            database_name: get("DATABASE_NAME").unwrap_or_else(|| DEFAULT_DATABASE_NAME.into()),
            jwt_secret: SecretString::from(require("JWT_SECRET")?),
            jwt_ttl: time::Duration::days(jwt_ttl_days),
            braintree,
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

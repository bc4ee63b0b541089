use std::env;

use anyhow::Context;

/// Deployment environment, controls logging format and cookie-free dev conveniences.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub const fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    /// Parse from the ENVIRONMENT variable; anything but "production" is development.
    fn from_env_var() -> Self {
        match env::var("ENVIRONMENT").as_deref() {
            Ok("production") | Ok("prod") => Self::Production,
            _ => Self::Development,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub env: Environment,
}

impl ApiConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL is not set")?,
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET is not set")?,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            env: Environment::from_env_var(),
        })
    }
}

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::config::{ApiConfig, Environment};

#[derive(Clone)]
pub struct ApiState {
    pub pool: PgPool,
    pub jwt_secret: String,
    pub environment: Environment,
}

impl ApiState {
    pub fn new(config: &ApiConfig, pool: PgPool) -> Self {
        Self {
            pool,
            jwt_secret: config.jwt_secret.clone(),
            environment: config.env,
        }
    }
}

/// The slice of state the auth extractor needs.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

impl FromRef<ApiState> for AuthConfig {
    fn from_ref(state: &ApiState) -> Self {
        Self {
            jwt_secret: state.jwt_secret.clone(),
        }
    }
}

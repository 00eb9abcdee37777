//! Application state management
//!
//! Shared state passed to all request handlers via Axum's state extraction.
//! Everything in here is created once at startup and is cheap to clone.

use crate::auth::JwtService;
use crate::config::AppConfig;
use metrics_exporter_prometheus::PrometheusHandle;
use secrecy::{Secret, SecretString};
use sqlx::PgPool;
use std::sync::Arc;

/// Shared application state
///
/// - `db`: PgPool is internally Arc'd
/// - `config`, `service_token`: wrapped in Arc
/// - `jwt`: pre-computed keys wrapped in Arc
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Pre-initialized JWT service with cached keys
    pub jwt: JwtService,
    /// Token expected from internal callers
    service_token: Arc<SecretString>,
    /// Prometheus render handle, absent when no recorder is installed
    metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create a new application state
    ///
    /// JWT keys are derived here, so call this once at startup.
    pub fn new(db: PgPool, config: AppConfig) -> Self {
        let jwt = JwtService::new(&config.jwt.secret, config.jwt.access_token_expiry_secs);
        let service_token = Arc::new(Secret::new(config.internal.service_token.clone()));

        Self {
            db,
            config: Arc::new(config),
            jwt,
            service_token,
            metrics: None,
        }
    }

    /// Attach the Prometheus handle used by `/metrics`
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Get a reference to the database pool
    #[inline]
    pub fn db(&self) -> &PgPool {
        &self.db
    }

    /// Get a reference to the configuration
    #[inline]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Get a reference to the JWT service
    #[inline]
    pub fn jwt(&self) -> &JwtService {
        &self.jwt
    }

    #[inline]
    pub fn service_token(&self) -> &SecretString {
        &self.service_token
    }

    #[inline]
    pub fn metrics(&self) -> Option<&PrometheusHandle> {
        self.metrics.as_ref()
    }
}

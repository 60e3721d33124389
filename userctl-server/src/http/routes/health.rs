//! Health check endpoint
//!
//! Reports the crate version and whether the user store answers.
//! Returns 503 when the store is unreachable so load balancers can
//! drain the instance.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;

use crate::http::server::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub version: &'static str,
}

/// GET /health
async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let (code, status, database) = match state.users.ping().await {
        Ok(()) => (StatusCode::OK, "ok", "ok"),
        Err(e) => {
            tracing::warn!(error = %e, "health check: store unreachable");
            (StatusCode::SERVICE_UNAVAILABLE, "degraded", "unavailable")
        }
    };

    (
        code,
        Json(HealthResponse {
            status,
            database,
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}

/// Health routes
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;

    use crate::db::repos::{MemoryUserStore, StoreError, UserStore};
    use crate::models::{NewUser, User};
    use crate::service::UserService;

    /// Store whose database has gone away.
    struct UnreachableDb;

    #[async_trait]
    impl UserStore for UnreachableDb {
        async fn create(&self, _: &NewUser) -> Result<User, StoreError> {
            Err(StoreError::Connection(sqlx::Error::PoolTimedOut))
        }
        async fn list(&self) -> Result<Vec<User>, StoreError> {
            Err(StoreError::Connection(sqlx::Error::PoolTimedOut))
        }
        async fn find_by_id(&self, _: i32) -> Result<User, StoreError> {
            Err(StoreError::Connection(sqlx::Error::PoolTimedOut))
        }
        async fn ping(&self) -> Result<(), StoreError> {
            Err(StoreError::Connection(sqlx::Error::PoolTimedOut))
        }
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let state = AppState::new(UserService::new(Arc::new(MemoryUserStore::new())));
        let (code, Json(body)) = health(State(state)).await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body.status, "ok");
        assert_eq!(body.database, "ok");
    }

    #[tokio::test]
    async fn health_degraded_when_store_unreachable() {
        let state = AppState::new(UserService::new(Arc::new(UnreachableDb)));
        let (code, Json(body)) = health(State(state)).await;
        assert_eq!(code, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.status, "degraded");
        assert_eq!(body.database, "unavailable");
        assert_eq!(body.version, env!("CARGO_PKG_VERSION"));
    }
}

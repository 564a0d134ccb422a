//! # stash_api
//!
//! HTTP API library for Stash: registration and login, refresh-token
//! rotation, API key management, and the composite credential dispatch
//! wired into an axum router.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post};
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};

use stash_core::auth::token::TokenCodec;
use stash_core::store::CredentialStore;

use crate::config::ApiConfig;
use crate::handlers::{api_keys, auth, health};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Credential storage backend.
    pub store: Arc<dyn CredentialStore>,
    /// Token codec built from the configured secret.
    pub codec: Arc<TokenCodec>,
    /// API configuration.
    pub config: ApiConfig,
}

impl AppState {
    /// Build state from a validated configuration and a store.
    pub fn new(store: Arc<dyn CredentialStore>, config: ApiConfig) -> Self {
        let codec = Arc::new(TokenCodec::new(config.jwt_secret.as_bytes()));
        Self {
            store,
            codec,
            config,
        }
    }
}

/// Run embedded database migrations.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    stash_core::migrate::migrate(pool).await
}

/// Builds the axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes (no auth required)
    let public = Router::new()
        .route("/health", get(health::health_handler))
        .route("/auth/register", post(auth::register_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/refresh", post(auth::refresh_handler))
        .route("/auth/logout", post(auth::logout_handler));

    // Protected routes (require an authenticated principal)
    let protected = Router::new()
        .route(
            "/auth/api-keys",
            post(api_keys::create_api_key_handler).get(api_keys::list_api_keys_handler),
        )
        .route(
            "/auth/api-keys/{id}",
            delete(api_keys::revoke_api_key_handler),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(cors)
        .with_state(state)
}

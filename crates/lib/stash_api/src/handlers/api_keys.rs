//! API key management request handlers.
//!
//! All routes here sit behind the authentication middleware. Token-scoped
//! callers manage their own keys with their session; key-scoped callers
//! additionally need the ManageKeys capability, so a stolen low-privilege
//! key cannot mint or revoke keys.

use axum::Json;
use axum::extract::{Path, State};
use uuid::Uuid;

use stash_core::auth::api_keys;
use stash_core::auth::capability::{self, Capability};
use stash_core::models::auth::{Principal, Scope};

use crate::AppState;
use crate::error::{ApiError, ApiResult};
use crate::middleware::auth::AuthenticatedPrincipal;
use crate::models::{ApiKeyListResponse, ApiKeySummary, CreateApiKeyRequest, CreateApiKeyResponse};

/// Key lifetime applied when the request does not choose one.
const DEFAULT_KEY_EXPIRY_DAYS: i64 = 90;

/// Longest key lifetime a request may ask for.
const MAX_KEY_EXPIRY_DAYS: i64 = 365;

fn ensure_key_route_access(principal: &Principal) -> Result<(), ApiError> {
    match principal.scope {
        Scope::ApiKey(_) => {
            capability::ensure(&principal.scope, Capability::ManageKeys).map_err(ApiError::from)
        }
        Scope::Role(_) => Ok(()),
    }
}

/// Redact a key value down to its last four characters.
fn preview(key: &str) -> String {
    let tail = &key[key.len().saturating_sub(4)..];
    format!("****{tail}")
}

/// Handles `POST /auth/api-keys`. The plaintext key appears in this
/// response and nowhere else.
pub async fn create_api_key_handler(
    State(state): State<AppState>,
    axum::Extension(principal): axum::Extension<AuthenticatedPrincipal>,
    Json(body): Json<CreateApiKeyRequest>,
) -> ApiResult<Json<CreateApiKeyResponse>> {
    let principal = principal.0;
    ensure_key_route_access(&principal)?;

    let name = body.name.trim();
    if name.is_empty() {
        return Err(ApiError::Validation("Key name must not be empty".into()));
    }
    let days = body.expires_in_days.unwrap_or(DEFAULT_KEY_EXPIRY_DAYS);
    if !(1..=MAX_KEY_EXPIRY_DAYS).contains(&days) {
        return Err(ApiError::Validation(format!(
            "expiresInDays must be between 1 and {MAX_KEY_EXPIRY_DAYS}"
        )));
    }

    let (plaintext, record) = api_keys::generate(
        state.store.as_ref(),
        &principal.user,
        name,
        body.permission,
        chrono::Duration::days(days),
    )
    .await?;

    Ok(Json(CreateApiKeyResponse {
        id: record.id,
        key: plaintext,
        name: record.name,
        permission: record.permission,
        expires_at: record.expires_at.to_rfc3339(),
    }))
}

/// Handles `GET /auth/api-keys`. Metadata only; key values stay redacted.
pub async fn list_api_keys_handler(
    State(state): State<AppState>,
    axum::Extension(principal): axum::Extension<AuthenticatedPrincipal>,
) -> ApiResult<Json<ApiKeyListResponse>> {
    let principal = principal.0;
    ensure_key_route_access(&principal)?;

    let records = api_keys::list(state.store.as_ref(), principal.user.id).await?;
    let keys = records
        .into_iter()
        .map(|record| ApiKeySummary {
            id: record.id,
            key_preview: preview(&record.key),
            name: record.name,
            permission: record.permission,
            is_active: record.is_active,
            created_at: record.created_at.to_rfc3339(),
            expires_at: record.expires_at.to_rfc3339(),
            last_used_at: record.last_used_at.map(|t| t.to_rfc3339()),
        })
        .collect();

    Ok(Json(ApiKeyListResponse { keys }))
}

/// Handles `DELETE /auth/api-keys/{id}`. Soft revocation; the record stays
/// listed as inactive.
pub async fn revoke_api_key_handler(
    State(state): State<AppState>,
    axum::Extension(principal): axum::Extension<AuthenticatedPrincipal>,
    Path(key_id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    let principal = principal.0;
    ensure_key_route_access(&principal)?;

    api_keys::revoke(state.store.as_ref(), principal.user.id, key_id).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

//! Authentication service: registration, login, refresh, logout.

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use stash_core::auth::AuthError;
use stash_core::auth::password;
use stash_core::auth::token::TokenCodec;
use stash_core::models::auth::{ClientType, Role, TokenKind, TokenPair, User};
use stash_core::store::CredentialStore;

use crate::error::{ApiError, ApiResult};
use crate::models::{AuthResponse, UserSummary};

/// Minimum accepted password length.
const MIN_PASSWORD_LEN: usize = 8;

/// A successful auth operation: the JSON body plus the refresh token that
/// travels only in the cookie.
#[derive(Debug)]
pub struct AuthOutcome {
    pub response: AuthResponse,
    pub refresh_token: String,
    pub client: ClientType,
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Register a new account and sign it in.
///
/// The first account in an empty store gets the ADMIN role; everyone after
/// that starts as USER.
pub async fn register(
    store: &dyn CredentialStore,
    codec: &TokenCodec,
    username: &str,
    email: &str,
    password_input: &str,
    client: ClientType,
) -> ApiResult<AuthOutcome> {
    let username = username.trim();
    if username.is_empty() {
        return Err(ApiError::Validation("Username must not be empty".into()));
    }
    if !email.contains('@') {
        return Err(ApiError::Validation("Email must be a valid address".into()));
    }
    if password_input.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    if store.username_exists(username).await? {
        return Err(ApiError::Validation("Username already registered".into()));
    }
    if store.email_exists(email).await? {
        return Err(ApiError::Validation("Email already registered".into()));
    }

    let is_first_user = store.user_count().await? == 0;
    let role = if is_first_user { Role::Admin } else { Role::User };

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4(),
        username: username.to_string(),
        email: email.to_string(),
        password_hash: password::hash_password(password_input)?,
        role,
        is_active: true,
        created_at: now,
        updated_at: now,
        last_login_at: None,
    };
    store.insert_user(&user).await?;

    if is_first_user {
        info!(username, "first account created with admin role");
    }

    let pair = codec.issue_pair(user.id, client)?;
    Ok(build_outcome(&user, pair, client))
}

/// Authenticate with username and password.
///
/// Unknown user, deactivated user, and wrong password all come back as the
/// same failure.
pub async fn login(
    store: &dyn CredentialStore,
    codec: &TokenCodec,
    username: &str,
    password_input: &str,
    client: ClientType,
) -> ApiResult<AuthOutcome> {
    let user = match store.find_user_by_username(username).await? {
        Some(user) if user.is_active => user,
        _ => return Err(AuthError::AuthenticationFailed.into()),
    };

    if !password::verify_password(password_input, &user.password_hash)? {
        return Err(AuthError::AuthenticationFailed.into());
    }

    let pair = codec.issue_pair(user.id, client)?;
    stamp_login(store, user.id).await;
    Ok(build_outcome(&user, pair, client))
}

/// Exchange a refresh token for a fresh pair.
///
/// Rotation is single-use: the presented token's `jti` is denylisted before
/// the replacement pair exists, so replaying it afterwards fails. A store
/// failure during revocation fails the whole refresh.
pub async fn refresh(
    store: &dyn CredentialStore,
    codec: &TokenCodec,
    presented: &str,
) -> ApiResult<AuthOutcome> {
    let claims = codec.verify(presented)?;
    if claims.kind != TokenKind::Refresh {
        return Err(AuthError::InvalidToken.into());
    }
    if store.is_token_revoked(claims.jti).await? {
        return Err(AuthError::InvalidToken.into());
    }

    let user = match store.find_user_by_id(claims.sub).await? {
        Some(user) if user.is_active => user,
        _ => return Err(AuthError::InvalidToken.into()),
    };

    let expires_at = chrono::DateTime::from_timestamp(claims.exp, 0).unwrap_or_else(Utc::now);
    store.revoke_token(claims.jti, expires_at).await?;

    let pair = codec.issue_pair(user.id, claims.client)?;
    stamp_login(store, user.id).await;
    Ok(build_outcome(&user, pair, claims.client))
}

/// Best-effort logout: denylist the presented refresh token.
///
/// Never fails. A missing, unverifiable, or wrong-kind token leaves nothing
/// to revoke.
pub async fn logout(store: &dyn CredentialStore, codec: &TokenCodec, presented: Option<&str>) {
    let Some(token_value) = presented else {
        return;
    };
    let Ok(claims) = codec.verify(token_value) else {
        debug!("logout presented an unverifiable refresh token");
        return;
    };
    if claims.kind != TokenKind::Refresh {
        return;
    }

    let expires_at = chrono::DateTime::from_timestamp(claims.exp, 0).unwrap_or_else(Utc::now);
    if let Err(e) = store.revoke_token(claims.jti, expires_at).await {
        warn!(error = %e, "failed to denylist refresh token on logout");
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn build_outcome(user: &User, pair: TokenPair, client: ClientType) -> AuthOutcome {
    AuthOutcome {
        response: AuthResponse {
            access_token: pair.access_token,
            token_type: "Bearer".to_string(),
            expires_in: pair.expires_in,
            user: UserSummary {
                id: user.id,
                username: user.username.clone(),
                email: user.email.clone(),
                role: user.role,
            },
        },
        refresh_token: pair.refresh_token,
        client,
    }
}

/// Login stamping is advisory; a failure never blocks the session.
async fn stamp_login(store: &dyn CredentialStore, user_id: Uuid) {
    if let Err(e) = store.record_login(user_id, Utc::now()).await {
        warn!(%user_id, error = %e, "failed to record login time");
    }
}

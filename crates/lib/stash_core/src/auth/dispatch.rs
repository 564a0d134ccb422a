//! Composite credential dispatch.
//!
//! One ordered pipeline decides how a request authenticates. Strategies are
//! tried in [`STRATEGY_ORDER`]; the first one whose credential is present
//! decides the outcome. A presented-but-invalid credential terminates the
//! pipeline and is never rescued by a lower-priority credential.

use tracing::debug;

use super::{AuthError, api_keys, token::TokenCodec};
use crate::models::auth::{Principal, Scope, TokenKind};
use crate::store::CredentialStore;

/// Credentials extracted from request headers by the HTTP layer.
#[derive(Debug, Clone, Default)]
pub struct RequestCredentials {
    /// Value of the configured API key header, when present and non-empty.
    pub api_key: Option<String>,
    /// Bearer token from the `Authorization` header, when present.
    pub bearer: Option<String>,
}

/// Outcome of one strategy for one request.
#[derive(Debug)]
pub enum AuthAttempt {
    /// The strategy's credential was present and valid.
    Authenticated(Principal),
    /// The strategy's credential was present and invalid. Terminal.
    Rejected(AuthError),
    /// The strategy's credential was not presented at all.
    NotApplicable,
}

/// Authentication strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    ApiKey,
    Bearer,
}

/// Fixed evaluation order: the API key wins over a bearer token when a
/// request presents both.
pub const STRATEGY_ORDER: [Strategy; 2] = [Strategy::ApiKey, Strategy::Bearer];

/// Walks [`STRATEGY_ORDER`] over extracted credentials.
pub struct Authenticator<'a> {
    codec: &'a TokenCodec,
    store: &'a dyn CredentialStore,
}

impl<'a> Authenticator<'a> {
    pub fn new(codec: &'a TokenCodec, store: &'a dyn CredentialStore) -> Self {
        Self { codec, store }
    }

    /// Resolve the caller for a request.
    ///
    /// `Ok(None)` means no credential was presented at all; the route decides
    /// whether anonymous access is acceptable.
    pub async fn authenticate(
        &self,
        credentials: &RequestCredentials,
    ) -> Result<Option<Principal>, AuthError> {
        for strategy in STRATEGY_ORDER {
            match self.attempt(strategy, credentials).await {
                AuthAttempt::Authenticated(principal) => return Ok(Some(principal)),
                AuthAttempt::Rejected(e) => {
                    debug!(?strategy, "presented credential rejected");
                    return Err(e);
                }
                AuthAttempt::NotApplicable => continue,
            }
        }
        Ok(None)
    }

    async fn attempt(&self, strategy: Strategy, credentials: &RequestCredentials) -> AuthAttempt {
        match strategy {
            Strategy::ApiKey => self.attempt_api_key(credentials.api_key.as_deref()).await,
            Strategy::Bearer => self.attempt_bearer(credentials.bearer.as_deref()).await,
        }
    }

    async fn attempt_api_key(&self, presented: Option<&str>) -> AuthAttempt {
        let Some(key) = presented else {
            return AuthAttempt::NotApplicable;
        };
        match api_keys::verify(self.store, key).await {
            Ok((user, record)) => AuthAttempt::Authenticated(Principal {
                user,
                scope: Scope::ApiKey(record.permission),
            }),
            Err(e) => AuthAttempt::Rejected(e),
        }
    }

    async fn attempt_bearer(&self, presented: Option<&str>) -> AuthAttempt {
        let Some(bearer) = presented else {
            return AuthAttempt::NotApplicable;
        };
        let claims = match self.codec.verify(bearer) {
            Ok(claims) => claims,
            Err(e) => return AuthAttempt::Rejected(e),
        };
        // A refresh token is not an access credential.
        if claims.kind != TokenKind::Access {
            return AuthAttempt::Rejected(AuthError::InvalidToken);
        }
        match self.store.find_user_by_id(claims.sub).await {
            Ok(Some(user)) if user.is_active => AuthAttempt::Authenticated(Principal {
                scope: Scope::Role(user.role),
                user,
            }),
            Ok(_) => AuthAttempt::Rejected(AuthError::InvalidToken),
            Err(e) => AuthAttempt::Rejected(e.into()),
        }
    }
}

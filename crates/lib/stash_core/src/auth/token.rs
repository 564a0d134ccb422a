//! Signed token issuance and verification.
//!
//! HS256 tokens carrying subject, kind, client class, and a unique `jti`.
//! Verification is pure: signature and expiry only, with zero leeway.
//! Subject liveness checks belong to the dispatcher.

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use super::AuthError;
use crate::models::auth::{AccessClaims, ClientType, TokenKind, TokenPair};

/// Minimum signing secret length in bytes (256 bits). Enforced at startup.
pub const MIN_SECRET_BYTES: usize = 32;

/// Access token lifetime: 15 minutes (web), 1 day (CLI).
const ACCESS_TTL_WEB_SECS: i64 = 15 * 60;
const ACCESS_TTL_CLI_SECS: i64 = 24 * 60 * 60;

/// Refresh token lifetime: 7 days (web), 90 days (CLI).
const REFRESH_TTL_WEB_SECS: i64 = 7 * 24 * 60 * 60;
const REFRESH_TTL_CLI_SECS: i64 = 90 * 24 * 60 * 60;

/// Lifetime of a token of the given kind for the given client class.
pub fn lifetime(kind: TokenKind, client: ClientType) -> chrono::Duration {
    let secs = match (kind, client) {
        (TokenKind::Access, ClientType::Web) => ACCESS_TTL_WEB_SECS,
        (TokenKind::Access, ClientType::Cli) => ACCESS_TTL_CLI_SECS,
        (TokenKind::Refresh, ClientType::Web) => REFRESH_TTL_WEB_SECS,
        (TokenKind::Refresh, ClientType::Cli) => REFRESH_TTL_CLI_SECS,
    };
    chrono::Duration::seconds(secs)
}

/// HS256 token codec built from the process-wide signing secret.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    /// Build a codec from the signing secret.
    ///
    /// Secret length is policed by configuration at startup, not here.
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        // Expired means expired. The library default grants 60 seconds.
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Issue a single signed token with a fresh `jti`.
    pub fn issue(
        &self,
        subject: Uuid,
        kind: TokenKind,
        client: ClientType,
    ) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = AccessClaims {
            sub: subject,
            kind,
            client,
            jti: Uuid::new_v4(),
            iat: now.timestamp(),
            exp: (now + lifetime(kind, client)).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AuthError::Internal(format!("token encode: {e}")))
    }

    /// Issue an access + refresh pair with distinct `jti`s.
    pub fn issue_pair(&self, subject: Uuid, client: ClientType) -> Result<TokenPair, AuthError> {
        let access_token = self.issue(subject, TokenKind::Access, client)?;
        let refresh_token = self.issue(subject, TokenKind::Refresh, client)?;
        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_in: lifetime(TokenKind::Access, client).num_seconds(),
        })
    }

    /// Verify signature and expiry, returning the embedded claims.
    ///
    /// Pure function of the token and the secret; never touches storage.
    pub fn verify(&self, token: &str) -> Result<AccessClaims, AuthError> {
        match decode::<AccessClaims>(token, &self.decoding, &self.validation) {
            Ok(data) => Ok(data.claims),
            Err(e) => Err(match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                ErrorKind::InvalidToken
                | ErrorKind::Base64(_)
                | ErrorKind::Json(_)
                | ErrorKind::Utf8(_) => AuthError::MalformedToken,
                _ => AuthError::InvalidToken,
            }),
        }
    }
}

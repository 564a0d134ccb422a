//! Capability table.
//!
//! The single place that says which scopes may perform which operation
//! categories. Enforcement sites call [`ensure`] after authentication and
//! before any side effect; nothing else encodes policy.

use super::AuthError;
use crate::models::auth::{ApiKeyPermission, Role, Scope};

/// Operation categories the API distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Read stored content and metadata.
    Read,
    /// Create or update content.
    Write,
    /// Delete content.
    Delete,
    /// Create, list, and revoke API keys.
    ManageKeys,
}

/// Every capability, for subset checks.
pub const ALL_CAPABILITIES: [Capability; 4] = [
    Capability::Read,
    Capability::Write,
    Capability::Delete,
    Capability::ManageKeys,
];

/// Does a role grant a capability?
pub fn role_allows(role: Role, capability: Capability) -> bool {
    match role {
        Role::Admin => true,
        Role::User => !matches!(capability, Capability::ManageKeys),
        Role::ReadOnly => matches!(capability, Capability::Read),
    }
}

/// Does an API key permission grant a capability?
pub fn key_allows(permission: ApiKeyPermission, capability: Capability) -> bool {
    match permission {
        ApiKeyPermission::ReadOnly => matches!(capability, Capability::Read),
        ApiKeyPermission::ReadWrite => {
            matches!(capability, Capability::Read | Capability::Write)
        }
        ApiKeyPermission::FullAccess => true,
    }
}

/// Would a role be allowed everything the key permission grants?
///
/// Guards key generation: a user must not mint a key that outranks their
/// own role.
pub fn role_covers(role: Role, permission: ApiKeyPermission) -> bool {
    ALL_CAPABILITIES
        .iter()
        .filter(|c| key_allows(permission, **c))
        .all(|c| role_allows(role, *c))
}

impl Scope {
    /// Does this scope grant the capability?
    pub fn allows(&self, capability: Capability) -> bool {
        match self {
            Scope::Role(role) => role_allows(*role, capability),
            Scope::ApiKey(permission) => key_allows(*permission, capability),
        }
    }
}

/// Fail with [`AuthError::Forbidden`] unless the scope grants the capability.
pub fn ensure(scope: &Scope, capability: Capability) -> Result<(), AuthError> {
    if scope.allows(capability) {
        Ok(())
    } else {
        Err(AuthError::Forbidden)
    }
}

//! Tenant context resolution and query scoping.
//!
//! The tenant id is resolved once at the request boundary and passed
//! explicitly, as a [`QueryScope`], to every repository call against a
//! tenant-owned table. A scope is always one of:
//!
//! - a single tenant resolved from the request or the principal,
//! - a single tenant named explicitly (background jobs, seeders),
//! - all tenants, which requires an [`AdminBypass`].
//!
//! There is no way to build an unfiltered scope from a missing context.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{FarmError, FarmResult};
use crate::models::user::User;

/// An entity type that is owned by exactly one team.
pub trait TenantOwned {
    /// Backing table name.
    const TABLE: &'static str;

    fn tenant_id(&self) -> Uuid;
}

/// The authenticated caller, as supplied by the session provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: Uuid,
    pub current_team_id: Option<Uuid>,
    pub is_super_admin: bool,
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            current_team_id: user.current_team_id,
            is_super_admin: user.is_super_admin,
        }
    }
}

/// Resolve the effective tenant id for an operation.
///
/// An explicit request parameter wins over the principal's current
/// team. Returns `None` for anonymous callers and users that have not
/// joined a team yet; there is no implicit default.
pub fn resolve_tenant(principal: Option<&Principal>, requested: Option<Uuid>) -> Option<Uuid> {
    requested.or_else(|| principal.and_then(|p| p.current_team_id))
}

/// Like [`resolve_tenant`], but a missing context is an error.
pub fn require_tenant(principal: Option<&Principal>, requested: Option<Uuid>) -> FarmResult<Uuid> {
    resolve_tenant(principal, requested).ok_or(FarmError::TenantContextMissing)
}

/// Proof that the caller was authorized for cross-tenant access.
///
/// Only obtainable from a super-admin principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminBypass {
    granted_to: Uuid,
}

impl AdminBypass {
    pub fn authorize(principal: &Principal) -> FarmResult<Self> {
        if !principal.is_super_admin {
            return Err(FarmError::AuthorizationDenied {
                reason: format!("user {} is not a super admin", principal.user_id),
            });
        }
        Ok(Self {
            granted_to: principal.user_id,
        })
    }

    pub fn granted_to(&self) -> Uuid {
        self.granted_to
    }
}

/// How a query against a tenant-owned table is filtered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryScope {
    /// `tenant_id = <id>` is applied to every statement.
    Tenant(Uuid),
    /// No tenant predicate. Cross-tenant admin path.
    AllTenants(AdminBypass),
}

impl QueryScope {
    /// Scope by the tenant resolved from ambient request state.
    pub fn scoped(principal: Option<&Principal>, requested: Option<Uuid>) -> FarmResult<Self> {
        require_tenant(principal, requested).map(QueryScope::Tenant)
    }

    /// Scope by a tenant named explicitly, regardless of request state.
    pub fn explicit_team(team_id: Uuid) -> Self {
        QueryScope::Tenant(team_id)
    }

    pub fn unscoped(bypass: AdminBypass) -> Self {
        QueryScope::AllTenants(bypass)
    }

    /// The tenant predicate value, if any.
    pub fn tenant_id(&self) -> Option<Uuid> {
        match self {
            QueryScope::Tenant(id) => Some(*id),
            QueryScope::AllTenants(_) => None,
        }
    }

    /// Whether an already-loaded entity is visible under this scope.
    pub fn admits<T: TenantOwned>(&self, entity: &T) -> bool {
        match self {
            QueryScope::Tenant(id) => entity.tenant_id() == *id,
            QueryScope::AllTenants(_) => true,
        }
    }

    /// Reject writes that would create a row outside this scope.
    pub fn ensure_owns(&self, tenant_id: Uuid) -> FarmResult<()> {
        match self {
            QueryScope::Tenant(id) if *id != tenant_id => Err(FarmError::AuthorizationDenied {
                reason: format!("tenant {tenant_id} is outside the current scope"),
            }),
            _ => Ok(()),
        }
    }
}

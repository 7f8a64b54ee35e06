//! Team-context authorization.
//!
//! Turns the caller's principal and an optional requested team into a
//! [`QueryScope`], checking that the caller actually belongs to the
//! team it asks for.

use flockwise_core::error::{FarmError, FarmResult};
use flockwise_core::models::user::User;
use flockwise_core::repository::{MembershipRepository, UserRepository};
use flockwise_core::tenancy::{AdminBypass, Principal, QueryScope};
use tracing::{debug, info};
use uuid::Uuid;

pub struct TeamContextService<M: MembershipRepository, U: UserRepository> {
    membership_repo: M,
    user_repo: U,
}

impl<M: MembershipRepository, U: UserRepository> TeamContextService<M, U> {
    pub fn new(membership_repo: M, user_repo: U) -> Self {
        Self {
            membership_repo,
            user_repo,
        }
    }

    /// Resolve the scope for a request.
    ///
    /// Fails with `TenantContextMissing` when neither the request nor
    /// the principal names a team. Fails with `AuthorizationDenied` for
    /// anonymous callers and for regular users that are not members of
    /// the resolved team. Jobs running outside a request use
    /// [`QueryScope::explicit_team`] instead.
    pub async fn authorize(
        &self,
        principal: Option<&Principal>,
        requested: Option<Uuid>,
    ) -> FarmResult<QueryScope> {
        let scope = QueryScope::scoped(principal, requested)?;
        let Some(principal) = principal else {
            return Err(FarmError::AuthorizationDenied {
                reason: "anonymous callers have no team context".into(),
            });
        };
        let Some(team_id) = scope.tenant_id() else {
            return Ok(scope);
        };

        if !principal.is_super_admin {
            self.ensure_member(principal.user_id, team_id).await?;
        }
        debug!(user_id = %principal.user_id, team_id = %team_id, "Team context authorized");
        Ok(scope)
    }

    /// Cross-tenant scope for super admins.
    pub fn admin_scope(&self, principal: &Principal) -> FarmResult<QueryScope> {
        AdminBypass::authorize(principal).map(QueryScope::unscoped)
    }

    /// Move the user's current-team pointer to `team_id`.
    pub async fn switch_team(&self, principal: &Principal, team_id: Uuid) -> FarmResult<User> {
        if !principal.is_super_admin {
            self.ensure_member(principal.user_id, team_id).await?;
        }
        let user = self
            .user_repo
            .set_current_team(principal.user_id, Some(team_id))
            .await?;
        info!(user_id = %user.id, team_id = %team_id, "Switched current team");
        Ok(user)
    }

    async fn ensure_member(&self, user_id: Uuid, team_id: Uuid) -> FarmResult<()> {
        match self.membership_repo.get(user_id, team_id).await? {
            Some(_) => Ok(()),
            None => Err(FarmError::AuthorizationDenied {
                reason: format!("user {user_id} is not a member of team {team_id}"),
            }),
        }
    }
}

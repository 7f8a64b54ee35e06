//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Repositories over tenant-owned
//! tables take a [`QueryScope`] on every call; the scope is resolved at
//! the request boundary, never inside the data layer.

use uuid::Uuid;

use crate::error::FarmResult;
use crate::models::{
    batch::{Batch, BatchFilter, CreateBatch, LifecycleUpdate},
    daily_log::{CreateDailyLog, DailyLog},
    expense::{CreateExpense, Expense},
    membership::{CreateMembership, Membership},
    team::{CreateTeam, Team, UpdateTeam},
    user::{CreateUser, User},
};
use crate::tenancy::QueryScope;

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Teams, users and memberships (global scope)
// ---------------------------------------------------------------------------

pub trait TeamRepository: Send + Sync {
    fn create(&self, input: CreateTeam) -> impl Future<Output = FarmResult<Team>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = FarmResult<Team>> + Send;
    fn get_by_slug(&self, slug: &str) -> impl Future<Output = FarmResult<Team>> + Send;
    fn update(&self, id: Uuid, input: UpdateTeam)
    -> impl Future<Output = FarmResult<Team>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = FarmResult<PaginatedResult<Team>>> + Send;
}

pub trait UserRepository: Send + Sync {
    fn create(&self, input: CreateUser) -> impl Future<Output = FarmResult<User>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = FarmResult<User>> + Send;
    fn get_by_email(&self, email: &str) -> impl Future<Output = FarmResult<User>> + Send;
    /// Point the user's ambient tenant context at `team_id` (or clear it).
    fn set_current_team(
        &self,
        id: Uuid,
        team_id: Option<Uuid>,
    ) -> impl Future<Output = FarmResult<User>> + Send;
}

pub trait MembershipRepository: Send + Sync {
    /// Fails with `ConstraintViolation` if the pair already exists.
    fn add(&self, input: CreateMembership) -> impl Future<Output = FarmResult<Membership>> + Send;
    fn remove(&self, user_id: Uuid, team_id: Uuid) -> impl Future<Output = FarmResult<()>> + Send;
    fn get(
        &self,
        user_id: Uuid,
        team_id: Uuid,
    ) -> impl Future<Output = FarmResult<Option<Membership>>> + Send;
    fn list_for_user(&self, user_id: Uuid)
    -> impl Future<Output = FarmResult<Vec<Membership>>> + Send;
    fn list_for_team(&self, team_id: Uuid)
    -> impl Future<Output = FarmResult<Vec<Membership>>> + Send;
}

// ---------------------------------------------------------------------------
// Tenant-owned repositories
// ---------------------------------------------------------------------------

pub trait BatchRepository: Send + Sync {
    /// Fails with `ConstraintViolation` on a duplicate batch number
    /// within the team.
    fn create(
        &self,
        scope: &QueryScope,
        input: CreateBatch,
    ) -> impl Future<Output = FarmResult<Batch>> + Send;
    fn get_by_id(
        &self,
        scope: &QueryScope,
        id: Uuid,
    ) -> impl Future<Output = FarmResult<Batch>> + Send;
    fn get_by_number(
        &self,
        scope: &QueryScope,
        batch_number: &str,
    ) -> impl Future<Output = FarmResult<Batch>> + Send;
    fn list(
        &self,
        scope: &QueryScope,
        filter: BatchFilter,
        pagination: Pagination,
    ) -> impl Future<Output = FarmResult<PaginatedResult<Batch>>> + Send;
    /// Persist lifecycle fields only if the stored status and live count
    /// still equal `update.expected_status` and `update.expected_quantity`;
    /// otherwise fails with `Conflict`.
    fn apply_lifecycle(
        &self,
        scope: &QueryScope,
        id: Uuid,
        update: LifecycleUpdate,
    ) -> impl Future<Output = FarmResult<Batch>> + Send;
    fn delete(&self, scope: &QueryScope, id: Uuid) -> impl Future<Output = FarmResult<()>> + Send;
}

pub trait DailyLogRepository: Send + Sync {
    /// Insert the log and subtract its mortality from the batch's live
    /// count (clamped at zero) in one transaction. Fails with
    /// `ConstraintViolation` if the batch already has a log for that date.
    fn record(
        &self,
        scope: &QueryScope,
        input: CreateDailyLog,
    ) -> impl Future<Output = FarmResult<(DailyLog, Batch)>> + Send;
    fn get_by_id(
        &self,
        scope: &QueryScope,
        id: Uuid,
    ) -> impl Future<Output = FarmResult<DailyLog>> + Send;
    /// All logs of a batch ordered by date.
    fn list_for_batch(
        &self,
        scope: &QueryScope,
        batch_id: Uuid,
    ) -> impl Future<Output = FarmResult<Vec<DailyLog>>> + Send;
}

pub trait ExpenseRepository: Send + Sync {
    fn create(
        &self,
        scope: &QueryScope,
        input: CreateExpense,
    ) -> impl Future<Output = FarmResult<Expense>> + Send;
    fn get_by_id(
        &self,
        scope: &QueryScope,
        id: Uuid,
    ) -> impl Future<Output = FarmResult<Expense>> + Send;
    fn list(
        &self,
        scope: &QueryScope,
        pagination: Pagination,
    ) -> impl Future<Output = FarmResult<PaginatedResult<Expense>>> + Send;
    fn list_allocated_to(
        &self,
        scope: &QueryScope,
        batch_id: Uuid,
    ) -> impl Future<Output = FarmResult<Vec<Expense>>> + Send;
    /// Sum of `amount_cents` allocated to a batch.
    fn total_allocated_to(
        &self,
        scope: &QueryScope,
        batch_id: Uuid,
    ) -> impl Future<Output = FarmResult<i64>> + Send;
    fn delete(&self, scope: &QueryScope, id: Uuid) -> impl Future<Output = FarmResult<()>> + Send;
}

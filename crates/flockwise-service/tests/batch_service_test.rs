//! Integration tests for the batch and team-context services, using
//! in-memory SurrealDB.

use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use flockwise_core::discrepancy::Discrepancy;
use flockwise_core::error::{FarmError, FarmResult};
use flockwise_core::models::batch::{
    Batch, BatchFilter, BatchStatus, CreateBatch, LifecycleUpdate,
};
use flockwise_core::models::daily_log::CreateDailyLog;
use flockwise_core::models::expense::{Allocation, CreateExpense};
use flockwise_core::models::membership::{CreateMembership, TeamRole};
use flockwise_core::models::team::CreateTeam;
use flockwise_core::models::user::CreateUser;
use flockwise_core::repository::{
    BatchRepository, DailyLogRepository, ExpenseRepository, MembershipRepository,
    PaginatedResult, Pagination, TeamRepository, UserRepository,
};
use flockwise_core::tenancy::{Principal, QueryScope};
use flockwise_db::repository::{
    SurrealBatchRepository, SurrealDailyLogRepository, SurrealExpenseRepository,
    SurrealMembershipRepository, SurrealTeamRepository, SurrealUserRepository,
};
use flockwise_service::{
    BatchService, DiscrepancyNotifier, OpsConfig, OverMortalityPolicy, TeamContextService,
};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

/// Collects every discrepancy it is handed.
#[derive(Clone, Default)]
struct RecordingNotifier {
    seen: Arc<Mutex<Vec<Discrepancy>>>,
}

impl DiscrepancyNotifier for RecordingNotifier {
    async fn notify(&self, discrepancy: &Discrepancy) -> FarmResult<()> {
        self.seen.lock().unwrap().push(discrepancy.clone());
        Ok(())
    }
}

type Service = BatchService<
    SurrealBatchRepository<Db>,
    SurrealDailyLogRepository<Db>,
    SurrealExpenseRepository<Db>,
    RecordingNotifier,
>;

/// Spin up in-memory DB, run migrations and create one team.
async fn setup() -> (Surreal<Db>, Uuid) {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    flockwise_db::run_migrations(&db).await.unwrap();

    let team = SurrealTeamRepository::new(db.clone())
        .create(CreateTeam {
            name: "Green Acres".into(),
            slug: "green-acres".into(),
            subscription_tier: None,
        })
        .await
        .unwrap();

    (db, team.id)
}

fn service(db: &Surreal<Db>, config: OpsConfig) -> (Service, RecordingNotifier) {
    let notifier = RecordingNotifier::default();
    let svc = BatchService::new(
        SurrealBatchRepository::new(db.clone()),
        SurrealDailyLogRepository::new(db.clone()),
        SurrealExpenseRepository::new(db.clone()),
        notifier.clone(),
        config,
    );
    (svc, notifier)
}

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
}

fn new_batch(tenant_id: Uuid, quantity: u32) -> CreateBatch {
    CreateBatch {
        tenant_id,
        name: "House 1".into(),
        batch_number: "B-2026-01".into(),
        start_date: date(1),
        expected_end_date: Some(date(31)),
        initial_quantity: quantity,
        target_weight_kg: Some(2.5),
    }
}

fn log(tenant_id: Uuid, batch_id: Uuid, day: u32, mortality: u32, feed: f64) -> CreateDailyLog {
    CreateDailyLog {
        tenant_id,
        batch_id,
        log_date: date(day),
        mortality_count: mortality,
        feed_consumed_kg: feed,
        water_consumed_liters: feed * 2.0,
        temperature_celsius: None,
        humidity_percent: None,
        notes: Some("routine check".into()),
        recorded_by: Uuid::new_v4(),
    }
}

// -----------------------------------------------------------------------
// Lifecycle
// -----------------------------------------------------------------------

#[tokio::test]
async fn full_lifecycle_closes_with_metrics() {
    let (db, team) = setup().await;
    let (svc, _) = service(&db, OpsConfig::default());
    let scope = QueryScope::explicit_team(team);

    let batch = svc.create_batch(&scope, new_batch(team, 1000)).await.unwrap();
    svc.transition(&scope, batch.id, BatchStatus::Active, date(1))
        .await
        .unwrap();

    svc.record_daily_log(&scope, log(team, batch.id, 2, 30, 2000.0))
        .await
        .unwrap();
    let (_, after) = svc
        .record_daily_log(&scope, log(team, batch.id, 3, 20, 2037.5))
        .await
        .unwrap();
    assert_eq!(after.current_quantity, 950);

    SurrealExpenseRepository::new(db.clone())
        .create(
            &scope,
            CreateExpense {
                tenant_id: team,
                description: "Chicks".into(),
                amount_cents: 1_000_000,
                incurred_on: date(1),
                allocation: Allocation::Batch(batch.id),
            },
        )
        .await
        .unwrap();

    svc.transition(&scope, batch.id, BatchStatus::Harvesting, date(30))
        .await
        .unwrap();
    let (closed, metrics) = svc.close_batch(&scope, batch.id, 2.5, date(31)).await.unwrap();

    assert_eq!(closed.status, BatchStatus::Closed);
    assert_eq!(closed.actual_end_date, Some(date(31)));
    assert_eq!(closed.average_weight_kg, Some(2.5));
    assert_eq!(metrics.total_mortality, 50);
    assert_eq!(metrics.mortality_rate_percent, 5.00);
    assert_eq!(metrics.liveability_percent, 95.00);
    assert!((metrics.feed_conversion_ratio - 1.7).abs() < 1e-9);
    assert_eq!(metrics.age_in_days, 30);
    assert_eq!(metrics.cost_per_bird_cents, 1052);
    assert_eq!(metrics.cost_per_kg_cents, 421);
    assert!(metrics.european_production_efficiency_factor > 0.0);
}

#[tokio::test]
async fn illegal_transition_leaves_stored_batch_unchanged() {
    let (db, team) = setup().await;
    let (svc, _) = service(&db, OpsConfig::default());
    let scope = QueryScope::explicit_team(team);
    let batch = svc.create_batch(&scope, new_batch(team, 100)).await.unwrap();

    let err = svc
        .transition(&scope, batch.id, BatchStatus::Harvesting, date(2))
        .await
        .unwrap_err();
    assert!(matches!(err, FarmError::InvalidTransition { .. }), "got {err:?}");

    let stored = svc.get_batch(&scope, batch.id).await.unwrap();
    assert_eq!(stored.status, BatchStatus::Planned);
    assert_eq!(stored.actual_end_date, None);
}

#[tokio::test]
async fn closing_outside_harvesting_is_invalid_transition() {
    let (db, team) = setup().await;
    let (svc, _) = service(&db, OpsConfig::default());
    let scope = QueryScope::explicit_team(team);
    let batch = svc.create_batch(&scope, new_batch(team, 100)).await.unwrap();
    svc.transition(&scope, batch.id, BatchStatus::Active, date(1))
        .await
        .unwrap();
    let before = svc.get_batch(&scope, batch.id).await.unwrap();

    let err = svc
        .close_batch(&scope, batch.id, 2.4, date(20))
        .await
        .unwrap_err();
    assert!(matches!(err, FarmError::InvalidTransition { .. }), "got {err:?}");

    let after = svc.get_batch(&scope, batch.id).await.unwrap();
    assert_eq!(after, before);
}

#[tokio::test]
async fn correct_quantity_is_bounded_by_initial() {
    let (db, team) = setup().await;
    let (svc, _) = service(&db, OpsConfig::default());
    let scope = QueryScope::explicit_team(team);
    let batch = svc.create_batch(&scope, new_batch(team, 100)).await.unwrap();

    let corrected = svc.correct_quantity(&scope, batch.id, 97).await.unwrap();
    assert_eq!(corrected.current_quantity, 97);
    assert_eq!(corrected.status, BatchStatus::Planned);

    let err = svc.correct_quantity(&scope, batch.id, 101).await.unwrap_err();
    assert!(matches!(err, FarmError::Validation { .. }));
}

/// Batch repository that commits a queued daily log right after the
/// next read, the way a concurrent request would.
struct LogAfterRead {
    inner: SurrealBatchRepository<Db>,
    logs: SurrealDailyLogRepository<Db>,
    queued: Mutex<Option<CreateDailyLog>>,
}

impl BatchRepository for LogAfterRead {
    async fn create(&self, scope: &QueryScope, input: CreateBatch) -> FarmResult<Batch> {
        self.inner.create(scope, input).await
    }

    async fn get_by_id(&self, scope: &QueryScope, id: Uuid) -> FarmResult<Batch> {
        let batch = self.inner.get_by_id(scope, id).await?;
        let queued = self.queued.lock().unwrap().take();
        if let Some(log) = queued {
            self.logs.record(scope, log).await?;
        }
        Ok(batch)
    }

    async fn get_by_number(&self, scope: &QueryScope, batch_number: &str) -> FarmResult<Batch> {
        self.inner.get_by_number(scope, batch_number).await
    }

    async fn list(
        &self,
        scope: &QueryScope,
        filter: BatchFilter,
        pagination: Pagination,
    ) -> FarmResult<PaginatedResult<Batch>> {
        self.inner.list(scope, filter, pagination).await
    }

    async fn apply_lifecycle(
        &self,
        scope: &QueryScope,
        id: Uuid,
        update: LifecycleUpdate,
    ) -> FarmResult<Batch> {
        self.inner.apply_lifecycle(scope, id, update).await
    }

    async fn delete(&self, scope: &QueryScope, id: Uuid) -> FarmResult<()> {
        self.inner.delete(scope, id).await
    }
}

#[tokio::test]
async fn transition_racing_a_daily_log_keeps_the_decrement() {
    let (db, team) = setup().await;
    let scope = QueryScope::explicit_team(team);
    let (plain, _) = service(&db, OpsConfig::default());
    let batch = plain.create_batch(&scope, new_batch(team, 100)).await.unwrap();
    plain
        .transition(&scope, batch.id, BatchStatus::Active, date(1))
        .await
        .unwrap();

    let racing = BatchService::new(
        LogAfterRead {
            inner: SurrealBatchRepository::new(db.clone()),
            logs: SurrealDailyLogRepository::new(db.clone()),
            queued: Mutex::new(Some(log(team, batch.id, 2, 10, 50.0))),
        },
        SurrealDailyLogRepository::new(db.clone()),
        SurrealExpenseRepository::new(db.clone()),
        RecordingNotifier::default(),
        OpsConfig::default(),
    );

    let err = racing
        .transition(&scope, batch.id, BatchStatus::Harvesting, date(20))
        .await
        .unwrap_err();
    assert!(matches!(err, FarmError::Conflict { .. }), "got {err:?}");

    let stored = plain.get_batch(&scope, batch.id).await.unwrap();
    assert_eq!(stored.status, BatchStatus::Active);
    assert_eq!(stored.current_quantity, 90);

    // Retrying on a fresh read succeeds and keeps the logged deaths.
    let moved = racing
        .transition(&scope, batch.id, BatchStatus::Harvesting, date(20))
        .await
        .unwrap();
    assert_eq!(moved.current_quantity, 90);
    let metrics = racing.metrics(&scope, batch.id, date(20)).await.unwrap();
    assert_eq!(metrics.total_mortality, 10);
    assert_eq!(metrics.liveability_percent, 90.0);
}

#[tokio::test]
async fn close_racing_a_daily_log_is_a_conflict() {
    let (db, team) = setup().await;
    let scope = QueryScope::explicit_team(team);
    let (plain, _) = service(&db, OpsConfig::default());
    let batch = plain.create_batch(&scope, new_batch(team, 100)).await.unwrap();
    plain
        .transition(&scope, batch.id, BatchStatus::Active, date(1))
        .await
        .unwrap();
    plain
        .transition(&scope, batch.id, BatchStatus::Harvesting, date(29))
        .await
        .unwrap();

    let racing = BatchService::new(
        LogAfterRead {
            inner: SurrealBatchRepository::new(db.clone()),
            logs: SurrealDailyLogRepository::new(db.clone()),
            queued: Mutex::new(Some(log(team, batch.id, 30, 4, 50.0))),
        },
        SurrealDailyLogRepository::new(db.clone()),
        SurrealExpenseRepository::new(db.clone()),
        RecordingNotifier::default(),
        OpsConfig::default(),
    );

    let err = racing
        .close_batch(&scope, batch.id, 2.5, date(31))
        .await
        .unwrap_err();
    assert!(matches!(err, FarmError::Conflict { .. }), "got {err:?}");

    let stored = plain.get_batch(&scope, batch.id).await.unwrap();
    assert_eq!(stored.status, BatchStatus::Harvesting);
    assert_eq!(stored.current_quantity, 96);
    assert_eq!(stored.average_weight_kg, None);
}

// -----------------------------------------------------------------------
// Daily logs
// -----------------------------------------------------------------------

#[tokio::test]
async fn over_mortality_clamps_by_default() {
    let (db, team) = setup().await;
    let (svc, _) = service(&db, OpsConfig::default());
    let scope = QueryScope::explicit_team(team);
    let batch = svc.create_batch(&scope, new_batch(team, 10)).await.unwrap();
    svc.transition(&scope, batch.id, BatchStatus::Active, date(1))
        .await
        .unwrap();

    svc.record_daily_log(&scope, log(team, batch.id, 2, 6, 5.0))
        .await
        .unwrap();
    let (_, after) = svc
        .record_daily_log(&scope, log(team, batch.id, 3, 6, 5.0))
        .await
        .unwrap();
    assert_eq!(after.current_quantity, 0);
}

#[tokio::test]
async fn over_mortality_rejected_under_reject_policy() {
    let (db, team) = setup().await;
    let config = OpsConfig {
        over_mortality_policy: OverMortalityPolicy::Reject,
        ..OpsConfig::default()
    };
    let (svc, _) = service(&db, config);
    let scope = QueryScope::explicit_team(team);
    let batch = svc.create_batch(&scope, new_batch(team, 10)).await.unwrap();
    svc.transition(&scope, batch.id, BatchStatus::Active, date(1))
        .await
        .unwrap();

    let err = svc
        .record_daily_log(&scope, log(team, batch.id, 2, 11, 5.0))
        .await
        .unwrap_err();
    assert!(matches!(err, FarmError::Validation { .. }));

    let stored = svc.get_batch(&scope, batch.id).await.unwrap();
    assert_eq!(stored.current_quantity, 10);
    let logs = SurrealDailyLogRepository::new(db.clone())
        .list_for_batch(&scope, batch.id)
        .await
        .unwrap();
    assert!(logs.is_empty());

    // A log within the live count is still accepted.
    let (_, after) = svc
        .record_daily_log(&scope, log(team, batch.id, 2, 10, 5.0))
        .await
        .unwrap();
    assert_eq!(after.current_quantity, 0);
}

#[tokio::test]
async fn daily_log_requires_running_batch() {
    let (db, team) = setup().await;
    let (svc, _) = service(&db, OpsConfig::default());
    let scope = QueryScope::explicit_team(team);
    let batch = svc.create_batch(&scope, new_batch(team, 10)).await.unwrap();

    let err = svc
        .record_daily_log(&scope, log(team, batch.id, 2, 1, 5.0))
        .await
        .unwrap_err();
    assert!(matches!(err, FarmError::Validation { .. }));
}

#[tokio::test]
async fn second_log_for_same_date_is_constraint_violation() {
    let (db, team) = setup().await;
    let (svc, _) = service(&db, OpsConfig::default());
    let scope = QueryScope::explicit_team(team);
    let batch = svc.create_batch(&scope, new_batch(team, 10)).await.unwrap();
    svc.transition(&scope, batch.id, BatchStatus::Active, date(1))
        .await
        .unwrap();

    svc.record_daily_log(&scope, log(team, batch.id, 2, 1, 5.0))
        .await
        .unwrap();
    let err = svc
        .record_daily_log(&scope, log(team, batch.id, 2, 1, 5.0))
        .await
        .unwrap_err();
    assert!(matches!(err, FarmError::ConstraintViolation { .. }), "got {err:?}");
}

#[tokio::test]
async fn listing_uses_configured_page_size() {
    let (db, team) = setup().await;
    let config = OpsConfig {
        default_page_size: 2,
        ..OpsConfig::default()
    };
    let (svc, _) = service(&db, config);
    let scope = QueryScope::explicit_team(team);
    for i in 0..3 {
        let mut input = new_batch(team, 10);
        input.batch_number = format!("B-{i}");
        svc.create_batch(&scope, input).await.unwrap();
    }

    let page = svc
        .list_batches(&scope, BatchFilter::default(), None)
        .await
        .unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.limit, 2);
}

// -----------------------------------------------------------------------
// Harvest reconciliation
// -----------------------------------------------------------------------

#[tokio::test]
async fn harvest_shortfall_is_notified() {
    let (db, team) = setup().await;
    let config = OpsConfig {
        discrepancy_tolerance: 2,
        ..OpsConfig::default()
    };
    let (svc, notifier) = service(&db, config);
    let scope = QueryScope::explicit_team(team);
    let batch = svc.create_batch(&scope, new_batch(team, 100)).await.unwrap();
    svc.transition(&scope, batch.id, BatchStatus::Active, date(1))
        .await
        .unwrap();
    svc.transition(&scope, batch.id, BatchStatus::Harvesting, date(30))
        .await
        .unwrap();

    // Within tolerance.
    let none = svc.reconcile_harvest(&scope, batch.id, 98).await.unwrap();
    assert!(none.is_none());

    let found = svc.reconcile_harvest(&scope, batch.id, 90).await.unwrap().unwrap();
    assert_eq!(found.shortfall(), 10);

    let seen = notifier.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].batch_id, batch.id);
}

#[tokio::test]
async fn reconcile_before_harvest_is_rejected() {
    let (db, team) = setup().await;
    let (svc, notifier) = service(&db, OpsConfig::default());
    let scope = QueryScope::explicit_team(team);
    let batch = svc.create_batch(&scope, new_batch(team, 100)).await.unwrap();

    let err = svc.reconcile_harvest(&scope, batch.id, 50).await.unwrap_err();
    assert!(matches!(err, FarmError::Validation { .. }));
    assert!(notifier.seen.lock().unwrap().is_empty());
}

// -----------------------------------------------------------------------
// Team context
// -----------------------------------------------------------------------

#[tokio::test]
async fn team_context_requires_membership() {
    let (db, team) = setup().await;
    let users = SurrealUserRepository::new(db.clone());
    let memberships = SurrealMembershipRepository::new(db.clone());
    let user = users
        .create(CreateUser {
            name: "Dana".into(),
            email: "dana@example.com".into(),
            password: "correct horse battery".into(),
            is_super_admin: false,
        })
        .await
        .unwrap();
    let ctx = TeamContextService::new(memberships.clone(), users.clone());
    let principal = Principal::from(&user);

    // No current team and nothing requested.
    let err = ctx.authorize(Some(&principal), None).await.unwrap_err();
    assert!(matches!(err, FarmError::TenantContextMissing));

    let err = ctx.authorize(Some(&principal), Some(team)).await.unwrap_err();
    assert!(matches!(err, FarmError::AuthorizationDenied { .. }));
    assert!(ctx.switch_team(&principal, team).await.is_err());

    memberships
        .add(CreateMembership {
            user_id: user.id,
            team_id: team,
            role: TeamRole::Worker,
        })
        .await
        .unwrap();

    let switched = ctx.switch_team(&principal, team).await.unwrap();
    assert_eq!(switched.current_team_id, Some(team));

    let scope = ctx.authorize(Some(&Principal::from(&switched)), None).await.unwrap();
    assert_eq!(scope, QueryScope::Tenant(team));
}

#[tokio::test]
async fn anonymous_callers_cannot_name_a_team() {
    let (db, team) = setup().await;
    let ctx = TeamContextService::new(
        SurrealMembershipRepository::new(db.clone()),
        SurrealUserRepository::new(db),
    );

    let err = ctx.authorize(None, Some(team)).await.unwrap_err();
    assert!(matches!(err, FarmError::AuthorizationDenied { .. }), "got {err:?}");

    let err = ctx.authorize(None, None).await.unwrap_err();
    assert!(matches!(err, FarmError::TenantContextMissing));
}

#[tokio::test]
async fn super_admin_may_enter_any_team() {
    let (db, team) = setup().await;
    let ctx = TeamContextService::new(
        SurrealMembershipRepository::new(db.clone()),
        SurrealUserRepository::new(db),
    );
    let admin = Principal {
        user_id: Uuid::new_v4(),
        current_team_id: None,
        is_super_admin: true,
    };

    let scope = ctx.authorize(Some(&admin), Some(team)).await.unwrap();
    assert_eq!(scope, QueryScope::Tenant(team));
}

#[tokio::test]
async fn admin_scope_requires_super_admin() {
    let (db, _) = setup().await;
    let ctx = TeamContextService::new(
        SurrealMembershipRepository::new(db.clone()),
        SurrealUserRepository::new(db),
    );

    let regular = Principal {
        user_id: Uuid::new_v4(),
        current_team_id: None,
        is_super_admin: false,
    };
    assert!(matches!(
        ctx.admin_scope(&regular),
        Err(FarmError::AuthorizationDenied { .. })
    ));

    let admin = Principal {
        is_super_admin: true,
        ..regular
    };
    let scope = ctx.admin_scope(&admin).unwrap();
    assert_eq!(scope.tenant_id(), None);
}

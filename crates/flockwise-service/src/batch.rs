//! Batch lifecycle service: loads a batch through the scoped
//! repositories, applies the state machine in memory and persists the
//! outcome with a compare-and-set on the stored status.

use chrono::NaiveDate;
use flockwise_core::discrepancy::{self, Discrepancy};
use flockwise_core::error::{FarmError, FarmResult};
use flockwise_core::lifecycle;
use flockwise_core::metrics::{BatchAggregate, BatchMetrics};
use flockwise_core::models::batch::{
    Batch, BatchFilter, BatchStatus, CreateBatch, LifecycleUpdate,
};
use flockwise_core::models::daily_log::{CreateDailyLog, DailyLog};
use flockwise_core::repository::{
    BatchRepository, DailyLogRepository, ExpenseRepository, PaginatedResult, Pagination,
};
use flockwise_core::tenancy::QueryScope;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{OpsConfig, OverMortalityPolicy};
use crate::notify::DiscrepancyNotifier;

/// Batch lifecycle service.
///
/// Generic over repository implementations so that this layer has no
/// dependency on the database crate.
pub struct BatchService<B, L, E, N>
where
    B: BatchRepository,
    L: DailyLogRepository,
    E: ExpenseRepository,
    N: DiscrepancyNotifier,
{
    batch_repo: B,
    log_repo: L,
    expense_repo: E,
    notifier: N,
    config: OpsConfig,
}

impl<B, L, E, N> BatchService<B, L, E, N>
where
    B: BatchRepository,
    L: DailyLogRepository,
    E: ExpenseRepository,
    N: DiscrepancyNotifier,
{
    pub fn new(
        batch_repo: B,
        log_repo: L,
        expense_repo: E,
        notifier: N,
        config: OpsConfig,
    ) -> Self {
        Self {
            batch_repo,
            log_repo,
            expense_repo,
            notifier,
            config,
        }
    }

    pub async fn create_batch(&self, scope: &QueryScope, input: CreateBatch) -> FarmResult<Batch> {
        if input.name.trim().is_empty() {
            return Err(FarmError::Validation {
                message: "batch name must not be empty".into(),
            });
        }
        let batch = self.batch_repo.create(scope, input).await?;
        info!(
            batch_id = %batch.id,
            tenant_id = %batch.tenant_id,
            batch_number = %batch.batch_number,
            initial_quantity = batch.initial_quantity,
            "Batch created"
        );
        Ok(batch)
    }

    pub async fn get_batch(&self, scope: &QueryScope, id: Uuid) -> FarmResult<Batch> {
        self.batch_repo.get_by_id(scope, id).await
    }

    /// List batches, using the configured page size when `pagination`
    /// is `None`.
    pub async fn list_batches(
        &self,
        scope: &QueryScope,
        filter: BatchFilter,
        pagination: Option<Pagination>,
    ) -> FarmResult<PaginatedResult<Batch>> {
        let pagination = pagination.unwrap_or(Pagination {
            offset: 0,
            limit: self.config.default_page_size,
        });
        self.batch_repo.list(scope, filter, pagination).await
    }

    /// Move a batch one step along its lifecycle.
    pub async fn transition(
        &self,
        scope: &QueryScope,
        id: Uuid,
        target: BatchStatus,
        today: NaiveDate,
    ) -> FarmResult<Batch> {
        let loaded = self.batch_repo.get_by_id(scope, id).await?;
        let mut batch = loaded.clone();

        lifecycle::transition(&mut batch, target, today)?;
        let batch = self.persist(scope, &loaded, &batch).await?;

        info!(batch_id = %id, from = %loaded.status, to = %batch.status, "Batch transitioned");
        Ok(batch)
    }

    /// Record a day's log and apply its mortality to the live count.
    ///
    /// Returns the stored log together with the updated batch.
    pub async fn record_daily_log(
        &self,
        scope: &QueryScope,
        input: CreateDailyLog,
    ) -> FarmResult<(DailyLog, Batch)> {
        let batch = self.batch_repo.get_by_id(scope, input.batch_id).await?;
        if !matches!(batch.status, BatchStatus::Active | BatchStatus::Harvesting) {
            return Err(FarmError::Validation {
                message: format!("daily logs cannot be recorded while batch is {}", batch.status),
            });
        }
        if input.tenant_id != batch.tenant_id {
            return Err(FarmError::Validation {
                message: "daily log team does not match the batch".into(),
            });
        }

        let mut preview = batch.clone();
        let outcome = lifecycle::record_mortality(&mut preview, input.mortality_count);
        if outcome.excess > 0 {
            match self.config.over_mortality_policy {
                OverMortalityPolicy::Reject => {
                    return Err(FarmError::Validation {
                        message: format!(
                            "mortality {} exceeds the {} head alive",
                            input.mortality_count, outcome.previous_quantity
                        ),
                    });
                }
                OverMortalityPolicy::Clamp => {
                    warn!(
                        batch_id = %batch.id,
                        mortality = input.mortality_count,
                        alive = outcome.previous_quantity,
                        excess = outcome.excess,
                        "Mortality exceeds live count, clamping at zero"
                    );
                }
            }
        }

        self.log_repo.record(scope, input).await
    }

    /// Overwrite the live count after a physical recount.
    pub async fn correct_quantity(
        &self,
        scope: &QueryScope,
        id: Uuid,
        quantity: u32,
    ) -> FarmResult<Batch> {
        let loaded = self.batch_repo.get_by_id(scope, id).await?;
        let mut batch = loaded.clone();

        lifecycle::correct_quantity(&mut batch, quantity)?;
        let batch = self.persist(scope, &loaded, &batch).await?;

        info!(
            batch_id = %id,
            previous = loaded.current_quantity,
            current = quantity,
            "Batch quantity corrected"
        );
        Ok(batch)
    }

    /// Close a harvesting batch with its final average weight and return
    /// the closure metrics.
    pub async fn close_batch(
        &self,
        scope: &QueryScope,
        id: Uuid,
        final_average_weight_kg: f64,
        today: NaiveDate,
    ) -> FarmResult<(Batch, BatchMetrics)> {
        let loaded = self.batch_repo.get_by_id(scope, id).await?;
        let mut batch = loaded.clone();

        lifecycle::close_batch(&mut batch, final_average_weight_kg, today)?;
        let batch = self.persist(scope, &loaded, &batch).await?;

        let aggregate = self.aggregate(scope, batch).await?;
        let metrics = BatchMetrics::compute(&aggregate, today);
        info!(
            batch_id = %id,
            fcr = metrics.feed_conversion_ratio,
            epef = metrics.european_production_efficiency_factor,
            mortality_rate = metrics.mortality_rate_percent,
            "Batch closed"
        );
        Ok((aggregate.batch, metrics))
    }

    /// Current metrics of a batch, recomputed from its logs and
    /// allocated expenses.
    pub async fn metrics(
        &self,
        scope: &QueryScope,
        id: Uuid,
        as_of: NaiveDate,
    ) -> FarmResult<BatchMetrics> {
        let batch = self.batch_repo.get_by_id(scope, id).await?;
        let aggregate = self.aggregate(scope, batch).await?;
        Ok(BatchMetrics::compute(&aggregate, as_of))
    }

    /// Compare the live count with the number of birds actually
    /// delivered to slaughter. A shortfall above the configured
    /// tolerance is handed to the notifier and returned.
    pub async fn reconcile_harvest(
        &self,
        scope: &QueryScope,
        id: Uuid,
        actual_quantity: u32,
    ) -> FarmResult<Option<Discrepancy>> {
        let batch = self.batch_repo.get_by_id(scope, id).await?;
        if !matches!(batch.status, BatchStatus::Harvesting | BatchStatus::Closed) {
            return Err(FarmError::Validation {
                message: format!("batch is {}, not harvested", batch.status),
            });
        }

        let found = discrepancy::detect(
            batch.tenant_id,
            batch.id,
            batch.current_quantity,
            actual_quantity,
            self.config.discrepancy_tolerance,
        );
        if let Some(ref d) = found {
            self.notifier.notify(d).await?;
        }
        Ok(found)
    }

    async fn aggregate(&self, scope: &QueryScope, batch: Batch) -> FarmResult<BatchAggregate> {
        let daily_logs = self.log_repo.list_for_batch(scope, batch.id).await?;
        let allocated_expense_cents = self.expense_repo.total_allocated_to(scope, batch.id).await?;
        Ok(BatchAggregate {
            batch,
            daily_logs,
            allocated_expense_cents,
        })
    }

    /// Write `after` back only if the stored batch still matches
    /// `loaded`. A daily log committed in between surfaces as `Conflict`
    /// instead of having its decrement overwritten.
    async fn persist(
        &self,
        scope: &QueryScope,
        loaded: &Batch,
        after: &Batch,
    ) -> FarmResult<Batch> {
        let update = LifecycleUpdate::between(loaded, after);
        self.batch_repo.apply_lifecycle(scope, after.id, update).await
    }
}

//! SurrealDB implementation of [`BatchRepository`].
//!
//! Every statement goes through [`ScopedQuery`], so a batch of another
//! team behaves exactly like a missing record.

use chrono::{DateTime, NaiveDate, Utc};
use flockwise_core::error::{FarmError, FarmResult};
use flockwise_core::models::batch::{
    Batch, BatchFilter, BatchStatus, CreateBatch, LifecycleUpdate,
};
use flockwise_core::repository::{BatchRepository, PaginatedResult, Pagination};
use flockwise_core::tenancy::QueryScope;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;

use super::{CountRow, parse_date, parse_opt_date, parse_uuid, total_of};
use crate::error::DbError;
use crate::scope::ScopedQuery;

const ENTITY: &str = "batch";

/// DB-side row struct for statements where the UUID is already known.
#[derive(Debug, SurrealValue)]
pub(super) struct BatchRow {
    tenant_id: String,
    name: String,
    batch_number: String,
    start_date: String,
    expected_end_date: Option<String>,
    actual_end_date: Option<String>,
    status: String,
    initial_quantity: u32,
    current_quantity: u32,
    target_weight_kg: Option<f64>,
    average_weight_kg: Option<f64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BatchRow {
    pub(super) fn into_batch(self, id: Uuid) -> Result<Batch, DbError> {
        let status = BatchStatus::parse(&self.status)
            .ok_or_else(|| DbError::decode(ENTITY, format!("unknown status: {}", self.status)))?;
        Ok(Batch {
            id,
            tenant_id: parse_uuid(ENTITY, "tenant_id", &self.tenant_id)?,
            name: self.name,
            batch_number: self.batch_number,
            start_date: parse_date(ENTITY, "start_date", &self.start_date)?,
            expected_end_date: parse_opt_date(
                ENTITY,
                "expected_end_date",
                self.expected_end_date.as_deref(),
            )?,
            actual_end_date: parse_opt_date(
                ENTITY,
                "actual_end_date",
                self.actual_end_date.as_deref(),
            )?,
            status,
            initial_quantity: self.initial_quantity,
            current_quantity: self.current_quantity,
            target_weight_kg: self.target_weight_kg,
            average_weight_kg: self.average_weight_kg,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct BatchRowWithId {
    record_id: String,
    tenant_id: String,
    name: String,
    batch_number: String,
    start_date: String,
    expected_end_date: Option<String>,
    actual_end_date: Option<String>,
    status: String,
    initial_quantity: u32,
    current_quantity: u32,
    target_weight_kg: Option<f64>,
    average_weight_kg: Option<f64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BatchRowWithId {
    fn try_into_batch(self) -> Result<Batch, DbError> {
        let id = parse_uuid(ENTITY, "id", &self.record_id)?;
        BatchRow {
            tenant_id: self.tenant_id,
            name: self.name,
            batch_number: self.batch_number,
            start_date: self.start_date,
            expected_end_date: self.expected_end_date,
            actual_end_date: self.actual_end_date,
            status: self.status,
            initial_quantity: self.initial_quantity,
            current_quantity: self.current_quantity,
            target_weight_kg: self.target_weight_kg,
            average_weight_kg: self.average_weight_kg,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .into_batch(id)
    }
}

fn date_string(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.to_string())
}

/// SurrealDB implementation of the Batch repository.
#[derive(Clone)]
pub struct SurrealBatchRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealBatchRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> BatchRepository for SurrealBatchRepository<C> {
    async fn create(&self, scope: &QueryScope, input: CreateBatch) -> FarmResult<Batch> {
        scope.ensure_owns(input.tenant_id)?;
        if input.batch_number.trim().is_empty() {
            return Err(FarmError::Validation {
                message: "batch number must not be empty".into(),
            });
        }

        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('batch', $id) SET \
                 tenant_id = $tenant_id, \
                 name = $name, batch_number = $batch_number, \
                 start_date = $start_date, \
                 expected_end_date = $expected_end_date, \
                 actual_end_date = NONE, \
                 status = $status, \
                 initial_quantity = $quantity, \
                 current_quantity = $quantity, \
                 target_weight_kg = $target_weight_kg, \
                 average_weight_kg = NONE",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("name", input.name))
            .bind(("batch_number", input.batch_number))
            .bind(("start_date", input.start_date.to_string()))
            .bind(("expected_end_date", date_string(input.expected_end_date)))
            .bind(("status", BatchStatus::Planned.as_str().to_string()))
            .bind(("quantity", input.initial_quantity))
            .bind(("target_weight_kg", input.target_weight_kg))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::classify(ENTITY, e))?;

        let rows: Vec<BatchRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: ENTITY.into(),
            id: id_str,
        })?;

        Ok(row.into_batch(id)?)
    }

    async fn get_by_id(&self, scope: &QueryScope, id: Uuid) -> FarmResult<Batch> {
        let id_str = id.to_string();
        let q = ScopedQuery::for_entity::<Batch>(scope);

        let mut builder = self.db.query(q.select_record()).bind(("id", id_str.clone()));
        if let Some(tenant) = q.tenant_binding() {
            builder = builder.bind(tenant);
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let rows: Vec<BatchRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: ENTITY.into(),
            id: id_str,
        })?;

        Ok(row.try_into_batch()?)
    }

    async fn get_by_number(&self, scope: &QueryScope, batch_number: &str) -> FarmResult<Batch> {
        let q = ScopedQuery::for_entity::<Batch>(scope).and("batch_number = $batch_number");

        let mut builder = self
            .db
            .query(q.select())
            .bind(("batch_number", batch_number.to_string()));
        if let Some(tenant) = q.tenant_binding() {
            builder = builder.bind(tenant);
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let rows: Vec<BatchRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: ENTITY.into(),
            id: format!("batch_number={batch_number}"),
        })?;

        Ok(row.try_into_batch()?)
    }

    async fn list(
        &self,
        scope: &QueryScope,
        filter: BatchFilter,
        pagination: Pagination,
    ) -> FarmResult<PaginatedResult<Batch>> {
        let mut q = ScopedQuery::for_entity::<Batch>(scope);
        if filter.status.is_some() {
            q = q.and("status = $status");
        }
        let status = filter.status.map(|s| s.as_str().to_string());

        let mut count_builder = self.db.query(q.count());
        if let Some(tenant) = q.tenant_binding() {
            count_builder = count_builder.bind(tenant);
        }
        if let Some(ref status) = status {
            count_builder = count_builder.bind(("status", status.clone()));
        }
        let mut count_result = count_builder.await.map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = total_of(&count_rows);

        let query = format!(
            "{} ORDER BY created_at ASC LIMIT $limit START $offset",
            q.select()
        );
        let mut builder = self
            .db
            .query(query)
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset));
        if let Some(tenant) = q.tenant_binding() {
            builder = builder.bind(tenant);
        }
        if let Some(status) = status {
            builder = builder.bind(("status", status));
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let rows: Vec<BatchRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_batch())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn apply_lifecycle(
        &self,
        scope: &QueryScope,
        id: Uuid,
        update: LifecycleUpdate,
    ) -> FarmResult<Batch> {
        let id_str = id.to_string();
        let q = ScopedQuery::for_entity::<Batch>(scope)
            .and("status = $expected_status")
            .and("current_quantity = $expected_quantity");
        let query = q.update_record(
            "status = $status, \
             current_quantity = $current_quantity, \
             actual_end_date = $actual_end_date, \
             average_weight_kg = $average_weight_kg, \
             updated_at = time::now()",
        );

        let mut builder = self
            .db
            .query(query)
            .bind(("id", id_str.clone()))
            .bind((
                "expected_status",
                update.expected_status.as_str().to_string(),
            ))
            .bind(("expected_quantity", update.expected_quantity))
            .bind(("status", update.status.as_str().to_string()))
            .bind(("current_quantity", update.current_quantity))
            .bind(("actual_end_date", date_string(update.actual_end_date)))
            .bind(("average_weight_kg", update.average_weight_kg));
        if let Some(tenant) = q.tenant_binding() {
            builder = builder.bind(tenant);
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(|e| DbError::classify(ENTITY, e))?;

        let rows: Vec<BatchRow> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(row.into_batch(id)?),
            None => {
                // Either the batch is invisible in this scope or its
                // status or live count moved underneath us.
                let stored = self.get_by_id(scope, id).await?;
                debug!(
                    batch_id = %id,
                    expected_status = %update.expected_status,
                    expected_quantity = update.expected_quantity,
                    stored_status = %stored.status,
                    stored_quantity = stored.current_quantity,
                    "Lifecycle update lost a race"
                );
                Err(DbError::Conflict {
                    entity: ENTITY.into(),
                    id: id_str,
                }
                .into())
            }
        }
    }

    async fn delete(&self, scope: &QueryScope, id: Uuid) -> FarmResult<()> {
        let batch = ScopedQuery::for_entity::<Batch>(scope);
        let logs = ScopedQuery::new("daily_log", scope).and("batch_id = $id");
        let expenses = ScopedQuery::new("expense", scope).and("allocation_batch_id = $id");

        // Logs are owned by the batch; expense allocations are weak and
        // fall back to general.
        let query = format!(
            "BEGIN TRANSACTION; {}; {}; {}; COMMIT TRANSACTION;",
            logs.delete_where(),
            expenses.update_where("allocation_batch_id = NONE"),
            batch.delete_record(),
        );

        let mut builder = self.db.query(query).bind(("id", id.to_string()));
        if let Some(tenant) = batch.tenant_binding() {
            builder = builder.bind(tenant);
        }

        builder
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        Ok(())
    }
}

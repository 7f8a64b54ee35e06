//! SurrealDB implementation of [`DailyLogRepository`].

use chrono::{DateTime, Utc};
use flockwise_core::error::FarmResult;
use flockwise_core::models::batch::Batch;
use flockwise_core::models::daily_log::{CreateDailyLog, DailyLog};
use flockwise_core::repository::DailyLogRepository;
use flockwise_core::tenancy::QueryScope;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;

use super::batch::BatchRow;
use super::{CountRow, parse_date, parse_uuid, total_of};
use crate::error::DbError;
use crate::scope::ScopedQuery;

const ENTITY: &str = "daily_log";

/// Insert the log first so a duplicate date is the first failing
/// statement, then decrement the batch, clamping at zero.
const RECORD_DAILY_LOG: &str = "\
BEGIN TRANSACTION;
CREATE type::record('daily_log', $id) SET \
    tenant_id = $tenant_id, batch_id = $batch_id, \
    log_date = $log_date, mortality_count = $mortality_count, \
    feed_consumed_kg = $feed_consumed_kg, \
    water_consumed_liters = $water_consumed_liters, \
    temperature_celsius = $temperature_celsius, \
    humidity_percent = $humidity_percent, \
    notes = $notes, recorded_by = $recorded_by;
UPDATE type::record('batch', $batch_id) SET \
    current_quantity = math::max([0, current_quantity - $mortality_count]), \
    updated_at = time::now() \
    WHERE tenant_id = $tenant_id;
COMMIT TRANSACTION;
";

#[derive(Debug, SurrealValue)]
struct DailyLogRow {
    tenant_id: String,
    batch_id: String,
    log_date: String,
    mortality_count: u32,
    feed_consumed_kg: f64,
    water_consumed_liters: f64,
    temperature_celsius: Option<f64>,
    humidity_percent: Option<f64>,
    notes: Option<String>,
    recorded_by: String,
    created_at: DateTime<Utc>,
}

impl DailyLogRow {
    fn into_log(self, id: Uuid) -> Result<DailyLog, DbError> {
        Ok(DailyLog {
            id,
            tenant_id: parse_uuid(ENTITY, "tenant_id", &self.tenant_id)?,
            batch_id: parse_uuid(ENTITY, "batch_id", &self.batch_id)?,
            log_date: parse_date(ENTITY, "log_date", &self.log_date)?,
            mortality_count: self.mortality_count,
            feed_consumed_kg: self.feed_consumed_kg,
            water_consumed_liters: self.water_consumed_liters,
            temperature_celsius: self.temperature_celsius,
            humidity_percent: self.humidity_percent,
            notes: self.notes,
            recorded_by: parse_uuid(ENTITY, "recorded_by", &self.recorded_by)?,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct DailyLogRowWithId {
    record_id: String,
    tenant_id: String,
    batch_id: String,
    log_date: String,
    mortality_count: u32,
    feed_consumed_kg: f64,
    water_consumed_liters: f64,
    temperature_celsius: Option<f64>,
    humidity_percent: Option<f64>,
    notes: Option<String>,
    recorded_by: String,
    created_at: DateTime<Utc>,
}

impl DailyLogRowWithId {
    fn try_into_log(self) -> Result<DailyLog, DbError> {
        let id = parse_uuid(ENTITY, "id", &self.record_id)?;
        DailyLogRow {
            tenant_id: self.tenant_id,
            batch_id: self.batch_id,
            log_date: self.log_date,
            mortality_count: self.mortality_count,
            feed_consumed_kg: self.feed_consumed_kg,
            water_consumed_liters: self.water_consumed_liters,
            temperature_celsius: self.temperature_celsius,
            humidity_percent: self.humidity_percent,
            notes: self.notes,
            recorded_by: self.recorded_by,
            created_at: self.created_at,
        }
        .into_log(id)
    }
}

/// SurrealDB implementation of the DailyLog repository.
#[derive(Clone)]
pub struct SurrealDailyLogRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealDailyLogRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> DailyLogRepository for SurrealDailyLogRepository<C> {
    async fn record(
        &self,
        scope: &QueryScope,
        input: CreateDailyLog,
    ) -> FarmResult<(DailyLog, Batch)> {
        scope.ensure_owns(input.tenant_id)?;

        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let tenant_id_str = input.tenant_id.to_string();
        let batch_id_str = input.batch_id.to_string();

        // The batch must exist in the log's team before anything is written.
        let mut check = self
            .db
            .query(
                "SELECT count() AS total FROM batch \
                 WHERE id = type::record('batch', $batch_id) \
                 AND tenant_id = $tenant_id GROUP ALL",
            )
            .bind(("batch_id", batch_id_str.clone()))
            .bind(("tenant_id", tenant_id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let batch_count: Vec<CountRow> = check.take(0).map_err(DbError::from)?;
        if total_of(&batch_count) == 0 {
            return Err(DbError::NotFound {
                entity: "batch".into(),
                id: batch_id_str,
            }
            .into());
        }

        let result = self
            .db
            .query(RECORD_DAILY_LOG)
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id_str))
            .bind(("batch_id", batch_id_str.clone()))
            .bind(("log_date", input.log_date.to_string()))
            .bind(("mortality_count", input.mortality_count))
            .bind(("feed_consumed_kg", input.feed_consumed_kg))
            .bind(("water_consumed_liters", input.water_consumed_liters))
            .bind(("temperature_celsius", input.temperature_celsius))
            .bind(("humidity_percent", input.humidity_percent))
            .bind(("notes", input.notes))
            .bind(("recorded_by", input.recorded_by.to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::classify(ENTITY, e))?;

        let log_rows: Vec<DailyLogRow> = result.take(0).map_err(DbError::from)?;
        let log = log_rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::NotFound {
                entity: ENTITY.into(),
                id: id_str,
            })?
            .into_log(id)?;

        let batch_rows: Vec<BatchRow> = result.take(1).map_err(DbError::from)?;
        let batch = batch_rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::NotFound {
                entity: "batch".into(),
                id: batch_id_str,
            })?
            .into_batch(input.batch_id)?;

        debug!(
            batch_id = %batch.id,
            log_date = %log.log_date,
            mortality = log.mortality_count,
            current_quantity = batch.current_quantity,
            "Daily log recorded"
        );

        Ok((log, batch))
    }

    async fn get_by_id(&self, scope: &QueryScope, id: Uuid) -> FarmResult<DailyLog> {
        let id_str = id.to_string();
        let q = ScopedQuery::for_entity::<DailyLog>(scope);

        let mut builder = self.db.query(q.select_record()).bind(("id", id_str.clone()));
        if let Some(tenant) = q.tenant_binding() {
            builder = builder.bind(tenant);
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let rows: Vec<DailyLogRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: ENTITY.into(),
            id: id_str,
        })?;

        Ok(row.try_into_log()?)
    }

    async fn list_for_batch(
        &self,
        scope: &QueryScope,
        batch_id: Uuid,
    ) -> FarmResult<Vec<DailyLog>> {
        let q = ScopedQuery::for_entity::<DailyLog>(scope).and("batch_id = $batch_id");
        let query = format!("{} ORDER BY log_date ASC", q.select());

        let mut builder = self
            .db
            .query(query)
            .bind(("batch_id", batch_id.to_string()));
        if let Some(tenant) = q.tenant_binding() {
            builder = builder.bind(tenant);
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let rows: Vec<DailyLogRowWithId> = result.take(0).map_err(DbError::from)?;

        let logs = rows
            .into_iter()
            .map(|row| row.try_into_log())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(logs)
    }
}

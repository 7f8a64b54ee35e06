//! SurrealDB implementation of [`ExpenseRepository`].
//!
//! Allocation is persisted as a nullable `allocation_batch_id`; `NONE`
//! means a general expense.

use chrono::{DateTime, Utc};
use flockwise_core::error::{FarmError, FarmResult};
use flockwise_core::models::expense::{Allocation, CreateExpense, Expense};
use flockwise_core::repository::{ExpenseRepository, PaginatedResult, Pagination};
use flockwise_core::tenancy::QueryScope;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, parse_date, parse_opt_uuid, parse_uuid, total_of};
use crate::error::DbError;
use crate::scope::ScopedQuery;

const ENTITY: &str = "expense";

#[derive(Debug, SurrealValue)]
struct ExpenseRow {
    tenant_id: String,
    description: String,
    amount_cents: i64,
    incurred_on: String,
    allocation_batch_id: Option<String>,
    created_at: DateTime<Utc>,
}

impl ExpenseRow {
    fn into_expense(self, id: Uuid) -> Result<Expense, DbError> {
        let batch_id = parse_opt_uuid(
            ENTITY,
            "allocation_batch_id",
            self.allocation_batch_id.as_deref(),
        )?;
        Ok(Expense {
            id,
            tenant_id: parse_uuid(ENTITY, "tenant_id", &self.tenant_id)?,
            description: self.description,
            amount_cents: self.amount_cents,
            incurred_on: parse_date(ENTITY, "incurred_on", &self.incurred_on)?,
            allocation: Allocation::from(batch_id),
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct ExpenseRowWithId {
    record_id: String,
    tenant_id: String,
    description: String,
    amount_cents: i64,
    incurred_on: String,
    allocation_batch_id: Option<String>,
    created_at: DateTime<Utc>,
}

impl ExpenseRowWithId {
    fn try_into_expense(self) -> Result<Expense, DbError> {
        let id = parse_uuid(ENTITY, "id", &self.record_id)?;
        ExpenseRow {
            tenant_id: self.tenant_id,
            description: self.description,
            amount_cents: self.amount_cents,
            incurred_on: self.incurred_on,
            allocation_batch_id: self.allocation_batch_id,
            created_at: self.created_at,
        }
        .into_expense(id)
    }
}

#[derive(Debug, SurrealValue)]
struct SumRow {
    total: i64,
}

/// SurrealDB implementation of the Expense repository.
#[derive(Clone)]
pub struct SurrealExpenseRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealExpenseRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn list_where(
        &self,
        q: ScopedQuery,
        batch_id: Option<Uuid>,
        pagination: Option<&Pagination>,
    ) -> FarmResult<Vec<Expense>> {
        let mut query = format!("{} ORDER BY incurred_on ASC", q.select());
        if pagination.is_some() {
            query.push_str(" LIMIT $limit START $offset");
        }

        let mut builder = self.db.query(query);
        if let Some(tenant) = q.tenant_binding() {
            builder = builder.bind(tenant);
        }
        if let Some(batch_id) = batch_id {
            builder = builder.bind(("batch_id", batch_id.to_string()));
        }
        if let Some(p) = pagination {
            builder = builder
                .bind(("limit", p.limit))
                .bind(("offset", p.offset));
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let rows: Vec<ExpenseRowWithId> = result.take(0).map_err(DbError::from)?;

        let expenses = rows
            .into_iter()
            .map(|row| row.try_into_expense())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(expenses)
    }
}

impl<C: Connection> ExpenseRepository for SurrealExpenseRepository<C> {
    async fn create(&self, scope: &QueryScope, input: CreateExpense) -> FarmResult<Expense> {
        scope.ensure_owns(input.tenant_id)?;
        if input.amount_cents < 0 {
            return Err(FarmError::Validation {
                message: "expense amount must not be negative".into(),
            });
        }

        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let tenant_id_str = input.tenant_id.to_string();

        if let Allocation::Batch(batch_id) = input.allocation {
            let mut check = self
                .db
                .query(
                    "SELECT count() AS total FROM batch \
                     WHERE id = type::record('batch', $batch_id) \
                     AND tenant_id = $tenant_id GROUP ALL",
                )
                .bind(("batch_id", batch_id.to_string()))
                .bind(("tenant_id", tenant_id_str.clone()))
                .await
                .map_err(DbError::from)?;
            let batch_count: Vec<CountRow> = check.take(0).map_err(DbError::from)?;
            if total_of(&batch_count) == 0 {
                return Err(DbError::NotFound {
                    entity: "batch".into(),
                    id: batch_id.to_string(),
                }
                .into());
            }
        }

        let result = self
            .db
            .query(
                "CREATE type::record('expense', $id) SET \
                 tenant_id = $tenant_id, description = $description, \
                 amount_cents = $amount_cents, incurred_on = $incurred_on, \
                 allocation_batch_id = $allocation_batch_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id_str))
            .bind(("description", input.description))
            .bind(("amount_cents", input.amount_cents))
            .bind(("incurred_on", input.incurred_on.to_string()))
            .bind((
                "allocation_batch_id",
                input.allocation.batch_id().map(|b| b.to_string()),
            ))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::classify(ENTITY, e))?;

        let rows: Vec<ExpenseRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: ENTITY.into(),
            id: id_str,
        })?;

        Ok(row.into_expense(id)?)
    }

    async fn get_by_id(&self, scope: &QueryScope, id: Uuid) -> FarmResult<Expense> {
        let id_str = id.to_string();
        let q = ScopedQuery::for_entity::<Expense>(scope);

        let mut builder = self.db.query(q.select_record()).bind(("id", id_str.clone()));
        if let Some(tenant) = q.tenant_binding() {
            builder = builder.bind(tenant);
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let rows: Vec<ExpenseRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: ENTITY.into(),
            id: id_str,
        })?;

        Ok(row.try_into_expense()?)
    }

    async fn list(
        &self,
        scope: &QueryScope,
        pagination: Pagination,
    ) -> FarmResult<PaginatedResult<Expense>> {
        let q = ScopedQuery::for_entity::<Expense>(scope);

        let mut count_builder = self.db.query(q.count());
        if let Some(tenant) = q.tenant_binding() {
            count_builder = count_builder.bind(tenant);
        }
        let mut count_result = count_builder.await.map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = total_of(&count_rows);

        let items = self.list_where(q, None, Some(&pagination)).await?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn list_allocated_to(
        &self,
        scope: &QueryScope,
        batch_id: Uuid,
    ) -> FarmResult<Vec<Expense>> {
        let q = ScopedQuery::for_entity::<Expense>(scope).and("allocation_batch_id = $batch_id");
        self.list_where(q, Some(batch_id), None).await
    }

    async fn total_allocated_to(&self, scope: &QueryScope, batch_id: Uuid) -> FarmResult<i64> {
        let q = ScopedQuery::for_entity::<Expense>(scope).and("allocation_batch_id = $batch_id");
        let query = format!(
            "SELECT math::sum(amount_cents) AS total FROM expense{} GROUP ALL",
            q.where_clause()
        );

        let mut builder = self
            .db
            .query(query)
            .bind(("batch_id", batch_id.to_string()));
        if let Some(tenant) = q.tenant_binding() {
            builder = builder.bind(tenant);
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let rows: Vec<SumRow> = result.take(0).map_err(DbError::from)?;

        Ok(rows.first().map(|r| r.total).unwrap_or(0))
    }

    async fn delete(&self, scope: &QueryScope, id: Uuid) -> FarmResult<()> {
        let q = ScopedQuery::for_entity::<Expense>(scope);

        let id_str = id.to_string();
        let query = format!("{} RETURN BEFORE", q.delete_record());

        let mut builder = self.db.query(query).bind(("id", id_str.clone()));
        if let Some(tenant) = q.tenant_binding() {
            builder = builder.bind(tenant);
        }

        let mut result = builder
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;
        let deleted: Vec<ExpenseRow> = result.take(0).map_err(DbError::from)?;
        if deleted.is_empty() {
            return Err(DbError::NotFound {
                entity: ENTITY.into(),
                id: id_str,
            }
            .into());
        }

        Ok(())
    }
}

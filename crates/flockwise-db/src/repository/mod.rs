//! SurrealDB repository implementations.

mod batch;
mod daily_log;
mod expense;
mod membership;
mod team;
mod user;

pub use batch::SurrealBatchRepository;
pub use daily_log::SurrealDailyLogRepository;
pub use expense::SurrealExpenseRepository;
pub use membership::SurrealMembershipRepository;
pub use team::SurrealTeamRepository;
pub use user::{SurrealUserRepository, verify_password};

use chrono::NaiveDate;
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

fn parse_uuid(entity: &str, field: &str, value: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(value).map_err(|e| DbError::decode(entity, format!("invalid {field}: {e}")))
}

fn parse_opt_uuid(entity: &str, field: &str, value: Option<&str>) -> Result<Option<Uuid>, DbError> {
    value.map(|v| parse_uuid(entity, field, v)).transpose()
}

fn parse_date(entity: &str, field: &str, value: &str) -> Result<NaiveDate, DbError> {
    value
        .parse::<NaiveDate>()
        .map_err(|e| DbError::decode(entity, format!("invalid {field}: {e}")))
}

fn parse_opt_date(
    entity: &str,
    field: &str,
    value: Option<&str>,
) -> Result<Option<NaiveDate>, DbError> {
    value.map(|v| parse_date(entity, field, v)).transpose()
}

fn total_of(rows: &[CountRow]) -> u64 {
    rows.first().map(|r| r.total).unwrap_or(0)
}

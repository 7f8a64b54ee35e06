//! Daily log domain model. One row per (batch, calendar date).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tenancy::TenantOwned;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyLog {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub batch_id: Uuid,
    pub log_date: NaiveDate,
    pub mortality_count: u32,
    pub feed_consumed_kg: f64,
    pub water_consumed_liters: f64,
    pub temperature_celsius: Option<f64>,
    pub humidity_percent: Option<f64>,
    pub notes: Option<String>,
    pub recorded_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl TenantOwned for DailyLog {
    const TABLE: &'static str = "daily_log";

    fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDailyLog {
    pub tenant_id: Uuid,
    pub batch_id: Uuid,
    pub log_date: NaiveDate,
    pub mortality_count: u32,
    pub feed_consumed_kg: f64,
    pub water_consumed_liters: f64,
    pub temperature_celsius: Option<f64>,
    pub humidity_percent: Option<f64>,
    pub notes: Option<String>,
    pub recorded_by: Uuid,
}

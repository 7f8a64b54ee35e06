//! Livestock performance metrics.
//!
//! Pure functions over a fully loaded [`BatchAggregate`]. Nothing is
//! cached; every call recomputes from the aggregate. Degenerate inputs
//! (empty stock, missing weight, zero age) yield `0` instead of an
//! error or a non-finite value.

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::batch::Batch;
use crate::models::daily_log::DailyLog;

/// A batch together with its daily logs and the sum of the expenses
/// allocated to it.
#[derive(Debug, Clone)]
pub struct BatchAggregate {
    pub batch: Batch,
    pub daily_logs: Vec<DailyLog>,
    pub allocated_expense_cents: i64,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Live biomass in kilograms, `0.0` when the average weight is unknown.
fn live_weight_kg(batch: &Batch) -> f64 {
    batch.average_weight_kg.unwrap_or(0.0) * f64::from(batch.current_quantity)
}

pub fn total_feed_consumed_kg(agg: &BatchAggregate) -> f64 {
    agg.daily_logs.iter().map(|log| log.feed_consumed_kg).sum()
}

pub fn total_mortality(agg: &BatchAggregate) -> u64 {
    agg.daily_logs
        .iter()
        .map(|log| u64::from(log.mortality_count))
        .sum()
}

pub fn feed_conversion_ratio(agg: &BatchAggregate) -> f64 {
    let denominator = live_weight_kg(&agg.batch);
    if denominator <= 0.0 {
        return 0.0;
    }
    total_feed_consumed_kg(agg) / denominator
}

pub fn mortality_rate_percent(agg: &BatchAggregate) -> f64 {
    let initial = agg.batch.initial_quantity;
    if initial == 0 {
        return 0.0;
    }
    round2(total_mortality(agg) as f64 / f64::from(initial) * 100.0)
}

pub fn liveability_percent(agg: &BatchAggregate) -> f64 {
    let initial = agg.batch.initial_quantity;
    if initial == 0 {
        return 0.0;
    }
    round2(f64::from(agg.batch.current_quantity) / f64::from(initial) * 100.0)
}

/// EPEF = liveability% x weight(kg) x 100 / (age(days) x FCR).
pub fn european_production_efficiency_factor(agg: &BatchAggregate, as_of: NaiveDate) -> f64 {
    let age_in_days = agg.batch.age_in_days(as_of);
    let fcr = feed_conversion_ratio(agg);
    let average_weight_kg = agg.batch.average_weight_kg.unwrap_or(0.0);
    if age_in_days <= 0 || fcr <= 0.0 || average_weight_kg <= 0.0 {
        return 0.0;
    }
    (liveability_percent(agg) * average_weight_kg * 100.0) / (age_in_days as f64 * fcr)
}

/// Allocated expenses per live head, truncated to whole cents.
pub fn cost_per_bird(agg: &BatchAggregate) -> i64 {
    let current = agg.batch.current_quantity;
    if current == 0 {
        return 0;
    }
    agg.allocated_expense_cents / i64::from(current)
}

/// Allocated expenses per live kilogram, truncated to whole cents.
pub fn cost_per_kg(agg: &BatchAggregate) -> i64 {
    let denominator = live_weight_kg(&agg.batch);
    if denominator <= 0.0 {
        return 0;
    }
    (agg.allocated_expense_cents as f64 / denominator).trunc() as i64
}

/// Snapshot of every metric for one batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchMetrics {
    pub age_in_days: i64,
    pub total_feed_consumed_kg: f64,
    pub total_mortality: u64,
    pub feed_conversion_ratio: f64,
    pub mortality_rate_percent: f64,
    pub liveability_percent: f64,
    pub european_production_efficiency_factor: f64,
    pub cost_per_bird_cents: i64,
    pub cost_per_kg_cents: i64,
}

impl BatchMetrics {
    pub fn compute(agg: &BatchAggregate, as_of: NaiveDate) -> Self {
        Self {
            age_in_days: agg.batch.age_in_days(as_of),
            total_feed_consumed_kg: total_feed_consumed_kg(agg),
            total_mortality: total_mortality(agg),
            feed_conversion_ratio: feed_conversion_ratio(agg),
            mortality_rate_percent: mortality_rate_percent(agg),
            liveability_percent: liveability_percent(agg),
            european_production_efficiency_factor: european_production_efficiency_factor(
                agg, as_of,
            ),
            cost_per_bird_cents: cost_per_bird(agg),
            cost_per_kg_cents: cost_per_kg(agg),
        }
    }
}

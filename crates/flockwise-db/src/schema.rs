//! Schema definitions and migration runner for SurrealDB.
//!
//! All tables are SCHEMAFULL. UUIDs are stored as strings, calendar
//! dates as ISO-8601 `YYYY-MM-DD` strings and enums as strings with
//! ASSERT constraints. Every tenant-owned table carries `tenant_id`.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Teams (global scope)
-- =======================================================================
DEFINE TABLE team SCHEMAFULL;
DEFINE FIELD name ON TABLE team TYPE string;
DEFINE FIELD slug ON TABLE team TYPE string;
DEFINE FIELD subscription_tier ON TABLE team TYPE string \
    ASSERT $value IN ['Free', 'Pro', 'Enterprise'];
DEFINE FIELD created_at ON TABLE team TYPE datetime DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE team TYPE datetime DEFAULT time::now();
DEFINE INDEX idx_team_slug ON TABLE team COLUMNS slug UNIQUE;

-- =======================================================================
-- Users (global scope)
-- =======================================================================
DEFINE TABLE user SCHEMAFULL;
DEFINE FIELD name ON TABLE user TYPE string;
DEFINE FIELD email ON TABLE user TYPE string;
DEFINE FIELD password_hash ON TABLE user TYPE string;
DEFINE FIELD current_team_id ON TABLE user TYPE option<string>;
DEFINE FIELD is_super_admin ON TABLE user TYPE bool DEFAULT false;
DEFINE FIELD created_at ON TABLE user TYPE datetime DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user TYPE datetime DEFAULT time::now();
DEFINE INDEX idx_user_email ON TABLE user COLUMNS email UNIQUE;

-- =======================================================================
-- Memberships (user x team)
-- =======================================================================
DEFINE TABLE membership SCHEMAFULL;
DEFINE FIELD user_id ON TABLE membership TYPE string;
DEFINE FIELD team_id ON TABLE membership TYPE string;
DEFINE FIELD role ON TABLE membership TYPE string \
    ASSERT $value IN ['Owner', 'Manager', 'Worker', 'Viewer'];
DEFINE FIELD joined_at ON TABLE membership TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_membership_user_team ON TABLE membership \
    COLUMNS user_id, team_id UNIQUE;
DEFINE INDEX idx_membership_team ON TABLE membership COLUMNS team_id;

-- =======================================================================
-- Batches (tenant scope)
-- =======================================================================
DEFINE TABLE batch SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE batch TYPE string;
DEFINE FIELD name ON TABLE batch TYPE string;
DEFINE FIELD batch_number ON TABLE batch TYPE string;
DEFINE FIELD start_date ON TABLE batch TYPE string;
DEFINE FIELD expected_end_date ON TABLE batch TYPE option<string>;
DEFINE FIELD actual_end_date ON TABLE batch TYPE option<string>;
DEFINE FIELD status ON TABLE batch TYPE string \
    ASSERT $value IN ['Planned', 'Active', 'Harvesting', 'Closed'];
DEFINE FIELD initial_quantity ON TABLE batch TYPE int ASSERT $value >= 0;
DEFINE FIELD current_quantity ON TABLE batch TYPE int ASSERT $value >= 0;
DEFINE FIELD target_weight_kg ON TABLE batch TYPE option<float>;
DEFINE FIELD average_weight_kg ON TABLE batch TYPE option<float>;
DEFINE FIELD created_at ON TABLE batch TYPE datetime DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE batch TYPE datetime DEFAULT time::now();
DEFINE INDEX idx_batch_tenant_number ON TABLE batch \
    COLUMNS tenant_id, batch_number UNIQUE;
DEFINE INDEX idx_batch_tenant_status ON TABLE batch \
    COLUMNS tenant_id, status;

-- =======================================================================
-- Daily logs (tenant scope, one per batch and date)
-- =======================================================================
DEFINE TABLE daily_log SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE daily_log TYPE string;
DEFINE FIELD batch_id ON TABLE daily_log TYPE string;
DEFINE FIELD log_date ON TABLE daily_log TYPE string;
DEFINE FIELD mortality_count ON TABLE daily_log TYPE int ASSERT $value >= 0;
DEFINE FIELD feed_consumed_kg ON TABLE daily_log TYPE float;
DEFINE FIELD water_consumed_liters ON TABLE daily_log TYPE float;
DEFINE FIELD temperature_celsius ON TABLE daily_log TYPE option<float>;
DEFINE FIELD humidity_percent ON TABLE daily_log TYPE option<float>;
DEFINE FIELD notes ON TABLE daily_log TYPE option<string>;
DEFINE FIELD recorded_by ON TABLE daily_log TYPE string;
DEFINE FIELD created_at ON TABLE daily_log TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_daily_log_batch_date ON TABLE daily_log \
    COLUMNS batch_id, log_date UNIQUE;

-- =======================================================================
-- Expenses (tenant scope, optionally allocated to a batch)
-- =======================================================================
DEFINE TABLE expense SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE expense TYPE string;
DEFINE FIELD description ON TABLE expense TYPE string;
DEFINE FIELD amount_cents ON TABLE expense TYPE int;
DEFINE FIELD incurred_on ON TABLE expense TYPE string;
DEFINE FIELD allocation_batch_id ON TABLE expense TYPE option<string>;
DEFINE FIELD created_at ON TABLE expense TYPE datetime DEFAULT time::now();
DEFINE INDEX idx_expense_tenant_batch ON TABLE expense \
    COLUMNS tenant_id, allocation_batch_id;
";

/// Apply every migration newer than the recorded schema version.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let mut result = db
        .query("SELECT version FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version <= current_version {
            continue;
        }
        info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );
        db.query(migration.sql).await?.check().map_err(|e| {
            DbError::Migration(format!(
                "Migration v{} '{}' failed: {}",
                migration.version, migration.name, e,
            ))
        })?;

        db.query("CREATE _migration SET version = $version, name = $name")
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;

        info!(version = migration.version, "Migration applied");
    }

    Ok(())
}

/// Returns the raw schema DDL for version 1.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}

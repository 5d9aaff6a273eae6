//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode for data integrity.
//! UUIDs are stored as strings. Enums are stored as strings with
//! ASSERT constraints for validation.

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
    #[allow(dead_code)]
    name: String,
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
// Schema v1 — initial table definitions
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Tenants (global scope)
-- =======================================================================
DEFINE TABLE tenant SCHEMAFULL;
DEFINE FIELD name ON TABLE tenant TYPE string;
DEFINE FIELD slug ON TABLE tenant TYPE string;
DEFINE FIELD metadata ON TABLE tenant TYPE object FLEXIBLE DEFAULT {};
DEFINE FIELD created_at ON TABLE tenant TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE tenant TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_tenant_slug ON TABLE tenant COLUMNS slug UNIQUE;

-- =======================================================================
-- Campaigns (tenant scope)
-- =======================================================================
DEFINE TABLE campaign SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE campaign TYPE string;
DEFINE FIELD name ON TABLE campaign TYPE string;
DEFINE FIELD code ON TABLE campaign TYPE string;
DEFINE FIELD discount_kind ON TABLE campaign TYPE string \
    ASSERT $value IN ['Percentage', 'Fixed'];
DEFINE FIELD discount_value ON TABLE campaign TYPE int;
DEFINE FIELD active ON TABLE campaign TYPE bool DEFAULT true;
DEFINE FIELD created_at ON TABLE campaign TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE campaign TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_campaign_tenant_name ON TABLE campaign \
    COLUMNS tenant_id, name UNIQUE;
DEFINE INDEX idx_campaign_tenant_code ON TABLE campaign \
    COLUMNS tenant_id, code UNIQUE;

-- =======================================================================
-- Form links (tenant scope, single-use)
-- =======================================================================
DEFINE TABLE form_link SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE form_link TYPE string;
DEFINE FIELD campaign_id ON TABLE form_link TYPE string;
DEFINE FIELD token ON TABLE form_link TYPE string;
DEFINE FIELD used_at ON TABLE form_link TYPE option<datetime>;
DEFINE FIELD created_at ON TABLE form_link TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_form_link_token ON TABLE form_link \
    COLUMNS token UNIQUE;
DEFINE INDEX idx_form_link_tenant_campaign ON TABLE form_link \
    COLUMNS tenant_id, campaign_id;

-- =======================================================================
-- Coupons (tenant scope)
-- =======================================================================
DEFINE TABLE coupon SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE coupon TYPE string;
DEFINE FIELD campaign_id ON TABLE coupon TYPE string;
DEFINE FIELD code ON TABLE coupon TYPE string;
DEFINE FIELD status ON TABLE coupon TYPE string \
    ASSERT $value IN ['Active', 'Redeemed'];
DEFINE FIELD discount_kind ON TABLE coupon TYPE string \
    ASSERT $value IN ['Percentage', 'Fixed'];
DEFINE FIELD discount_value ON TABLE coupon TYPE int;
DEFINE FIELD recipient_email ON TABLE coupon TYPE option<string>;
DEFINE FIELD recipient_name ON TABLE coupon TYPE option<string>;
DEFINE FIELD created_at ON TABLE coupon TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_coupon_tenant_code ON TABLE coupon \
    COLUMNS tenant_id, code UNIQUE;
DEFINE INDEX idx_coupon_tenant_campaign ON TABLE coupon \
    COLUMNS tenant_id, campaign_id;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum. Already
/// applied versions are skipped, so re-running is safe.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    // Ensure migration tracking table exists (idempotent).
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    // Determine current schema version.
    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version > current_version {
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

            // Record the applied migration.
            db.query(
                "CREATE _migration SET version = $version, \
                 name = $name",
            )
            .bind(("version", migration.version))
            .bind(("name", migration.name.to_string()))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;

            info!(
                version = migration.version,
                "Migration applied successfully"
            );
        }
    }

    Ok(())
}

/// Returns the raw schema DDL for version 1.
///
/// Exposed for testing with in-memory SurrealDB instances that
/// bypass the migration runner.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}

/// Schema migrations
///
/// The workspace `migrations/` directory is embedded at compile time. sqlx
/// records applied versions in `_sqlx_migrations`, so re-running is a no-op.
use sqlx::migrate::{MigrateDatabase, MigrateError, Migrator};
use sqlx::{PgPool, Postgres};
use tracing::{debug, error, info};

static MIGRATOR: Migrator = sqlx::migrate!("../migrations");

/// Applied versus embedded schema versions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationStatus {
    pub applied: i64,
    pub latest_applied: Option<i64>,
    pub latest_embedded: Option<i64>,
}

impl MigrationStatus {
    pub fn is_up_to_date(&self) -> bool {
        self.latest_applied.is_some() && self.latest_applied == self.latest_embedded
    }
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), MigrateError> {
    info!(embedded = MIGRATOR.iter().count(), "Applying schema migrations");
    MIGRATOR.run(pool).await.map_err(|e| {
        error!(error = %e, "Schema migration failed");
        e
    })?;
    info!(version = ?embedded_version(), "Schema is current");
    Ok(())
}

/// Newest version compiled into this binary
pub fn embedded_version() -> Option<i64> {
    MIGRATOR.iter().map(|m| m.version).max()
}

/// Reads `_sqlx_migrations`; a database that was never migrated reports zero
pub async fn get_migration_status(pool: &PgPool) -> Result<MigrationStatus, sqlx::Error> {
    let (applied, latest_applied): (i64, Option<i64>) = match sqlx::query_as(
        "SELECT COUNT(*), MAX(version) FROM _sqlx_migrations WHERE success",
    )
    .fetch_one(pool)
    .await
    {
        Ok(row) => row,
        // 42P01: relation does not exist
        Err(sqlx::Error::Database(db)) if db.code().as_deref() == Some("42P01") => (0, None),
        Err(e) => return Err(e),
    };
    debug!(applied, ?latest_applied, "Read migration status");

    Ok(MigrationStatus {
        applied,
        latest_applied,
        latest_embedded: embedded_version(),
    })
}

/// Creates the database named in `database_url` when it doesn't exist yet
pub async fn ensure_database_exists(database_url: &str) -> Result<(), sqlx::Error> {
    if Postgres::database_exists(database_url).await? {
        return Ok(());
    }
    info!("Creating missing database");
    Postgres::create_database(database_url).await
}

//! ABOUTME: Database layer with SQLite, migrations, and repositories
//! ABOUTME: Handles persistence of submitted stories and their moderation status

use fg_core::{Error, Result};
use sqlx::{
    migrate::MigrateDatabase,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    Sqlite, SqlitePool,
};
use tracing::{debug, info, instrument};

/// Database connection pool and operations
#[derive(Debug, Clone)]
pub struct Db {
    pool: SqlitePool,
}

impl Db {
    /// Create a new database connection with migrations
    #[instrument(skip(db_path))]
    pub async fn new(db_path: &str, max_connections: u32) -> Result<Self> {
        info!("Initializing database at: {}", db_path);

        let database_url = format!("sqlite://{}", db_path);
        if !Sqlite::database_exists(&database_url)
            .await
            .unwrap_or(false)
        {
            info!("Creating database: {}", database_url);
            Sqlite::create_database(&database_url)
                .await
                .map_err(|e| Error::Database(format!("Failed to create database: {}", e)))?;
        }

        let connect_options = SqliteConnectOptions::new()
            .filename(db_path)
            .journal_mode(SqliteJournalMode::Wal)
            .create_if_missing(true)
            .pragma("foreign_keys", "ON")
            .pragma("synchronous", "NORMAL")
            .pragma("busy_timeout", "30000");

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .min_connections(1)
            .connect_with(connect_options)
            .await
            .map_err(|e| Error::Database(format!("Failed to create connection pool: {}", e)))?;

        let db = Self { pool };
        db.migrate().await?;

        info!("Database initialized successfully");
        Ok(db)
    }

    /// Run database migrations
    #[instrument(skip(self))]
    pub async fn migrate(&self) -> Result<()> {
        info!("Running database migrations");

        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(format!("Migration failed: {}", e)))?;

        info!("Database migrations completed successfully");
        Ok(())
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create a Db instance from an existing pool (for testing/reuse)
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Close every pooled connection; later queries fail with `PoolClosed`
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Check database health
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<()> {
        debug!("Performing database health check");

        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::Database(format!("Health check failed: {}", e)))?;

        debug!("Database health check passed");
        Ok(())
    }
}

pub mod repositories;

pub use repositories::stories::{
    CreateStoryRequest, Privacy, Story, StoryRepository, StoryStatus, StorySummary,
};

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_test_db() -> (TempDir, Db) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("fairgo_test.db");
        let db = Db::new(&db_path.to_string_lossy(), 2)
            .await
            .expect("Failed to create test database");
        (temp_dir, db)
    }

    #[tokio::test]
    async fn test_database_initialization() {
        let (_dir, db) = create_test_db().await;
        db.health_check().await.expect("Health check should pass");

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stories")
            .fetch_one(db.pool())
            .await
            .expect("stories table should exist");
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_database_migrations_idempotent() {
        let (_dir, db) = create_test_db().await;
        db.migrate()
            .await
            .expect("Migrations should run successfully");
    }

    #[tokio::test]
    async fn test_health_check_fails_after_close() {
        let (_dir, db) = create_test_db().await;
        db.close().await;
        assert!(db.health_check().await.is_err());
    }

    #[tokio::test]
    async fn test_status_check_constraint() {
        let (_dir, db) = create_test_db().await;

        let result = sqlx::query(
            "INSERT INTO stories (id, name, email, category, story, status, excerpt, created_at, updated_at)
             VALUES ('x', 'n', 'e', 'c', 's', 'archived', 'e', 't', 't')",
        )
        .execute(db.pool())
        .await;

        assert!(result.is_err(), "unknown status must be rejected by the schema");
    }
}

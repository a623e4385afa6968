//! Database Module
//!
//! Embedded SurrealDB storage. The engine's serializable multi-record
//! transactions (commit-time conflict detection) are the concurrency
//! primitive the billing engine is built on.

pub mod models;
pub mod repository;

use crate::utils::AppError;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem, RocksDb};

/// Schema definition, applied at startup. Idempotent.
const SCHEMA: &str = r#"
    DEFINE TABLE IF NOT EXISTS patron SCHEMALESS;
    DEFINE INDEX IF NOT EXISTS patron_login ON TABLE patron FIELDS login_id UNIQUE;

    DEFINE TABLE IF NOT EXISTS stay_bill SCHEMALESS;
    DEFINE INDEX IF NOT EXISTS stay_bill_owner ON TABLE stay_bill FIELDS owner, status;

    DEFINE TABLE IF NOT EXISTS daily_ledger SCHEMALESS;

    DEFINE TABLE IF NOT EXISTS ledger_entry SCHEMALESS;
    DEFINE INDEX IF NOT EXISTS ledger_entry_date ON TABLE ledger_entry FIELDS ledger_date;

    DEFINE TABLE IF NOT EXISTS visit_log SCHEMALESS;
"#;

/// Database service - owns the embedded SurrealDB handle
#[derive(Clone)]
pub struct DbService {
    pub db: Surreal<Db>,
}

impl DbService {
    /// Open (or create) the on-disk database and apply the schema
    pub async fn new(db_path: &str) -> Result<Self, AppError> {
        let db = Surreal::new::<RocksDb>(db_path)
            .await
            .map_err(|e| AppError::database(format!("Failed to open database: {e}")))?;

        Self::init(db).await
    }

    /// In-memory database for tests
    pub async fn memory() -> Result<Self, AppError> {
        let db = Surreal::new::<Mem>(())
            .await
            .map_err(|e| AppError::database(format!("Failed to open in-memory database: {e}")))?;

        Self::init(db).await
    }

    async fn init(db: Surreal<Db>) -> Result<Self, AppError> {
        db.use_ns("cardroom")
            .use_db("venue")
            .await
            .map_err(|e| AppError::database(format!("Failed to select namespace: {e}")))?;

        db.query(SCHEMA)
            .await
            .map_err(|e| AppError::database(format!("Failed to apply schema: {e}")))?
            .check()
            .map_err(|e| AppError::database(format!("Failed to apply schema: {e}")))?;

        tracing::info!("Database schema applied");

        Ok(Self { db })
    }
}

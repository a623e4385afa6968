use std::sync::Arc;

use surrealdb::Surreal;
use surrealdb::engine::local::Db;

use crate::auth::JwtService;
use crate::billing::BillingEngine;
use crate::core::Config;
use crate::credential::{CredentialCodec, CredentialConfig};
use crate::db::DbService;
use crate::db::repository::PatronRepository;
use crate::ledger::LedgerQuery;
use crate::session::SessionMachine;
use crate::utils::AppResult;

/// Shared server state - cheap to clone, one instance per process
///
/// Holds the embedded database plus the service singletons built on it.
/// Everything is either `Clone`-cheap (the `Surreal` handle is an `Arc`
/// internally) or wrapped in `Arc` explicitly.
#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub db: Surreal<Db>,
    pub jwt_service: Arc<JwtService>,
    pub codec: Arc<CredentialCodec>,
    pub patrons: PatronRepository,
    pub billing: BillingEngine,
    pub session: SessionMachine,
    pub ledger: LedgerQuery,
}

impl ServerState {
    /// Initialize the full state for a running server
    ///
    /// Order: working directory, on-disk database, then the services.
    pub async fn initialize(config: &Config) -> AppResult<Self> {
        config
            .ensure_work_dir_structure()
            .map_err(|e| crate::utils::AppError::internal(format!(
                "Failed to create working directory: {e}"
            )))?;

        let db_path = config.database_dir().join("cardroom.db");
        let db_service = DbService::new(&db_path.to_string_lossy()).await?;

        Self::from_db(config, db_service)
    }

    /// Build state on an existing database handle (tests use the in-memory
    /// engine through this)
    pub fn from_db(config: &Config, db_service: DbService) -> AppResult<Self> {
        let db = db_service.db;

        let jwt_service = Arc::new(JwtService::with_config(config.jwt.clone()));
        let credential_config = CredentialConfig::from_env(config.is_production())?;
        let codec = Arc::new(CredentialCodec::new(&credential_config));

        let patrons = PatronRepository::new(db.clone());
        let billing = BillingEngine::new(db.clone(), config.venue_tz);
        let session = SessionMachine::new(codec.clone(), patrons.clone(), billing.clone());
        let ledger = LedgerQuery::new(db.clone());

        Ok(Self {
            config: config.clone(),
            db,
            jwt_service,
            codec,
            patrons,
            billing,
            session,
            ledger,
        })
    }
}

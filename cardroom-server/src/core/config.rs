use std::path::PathBuf;

use chrono_tz::Tz;

use crate::auth::JwtConfig;

/// Server configuration
///
/// # Environment variables
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | WORK_DIR | /var/lib/cardroom | Working directory (database, logs) |
/// | HTTP_PORT | 3000 | HTTP API port |
/// | ENVIRONMENT | development | development \| staging \| production |
/// | VENUE_TZ | Asia/Tokyo | Venue timezone for ledger day boundaries |
/// | DEFAULT_ENTRANCE_FEE | 0 | Fee applied when a check-in omits one |
/// | MAX_CONNECTIONS | 1000 | Concurrent request cap |
/// | REQUEST_TIMEOUT_MS | 30000 | Per-request timeout |
///
/// JWT and credential secrets are read by their own configs
/// ([`JwtConfig`], [`crate::credential::CredentialConfig`]).
#[derive(Debug, Clone)]
pub struct Config {
    /// Working directory for database and log files
    pub work_dir: String,
    pub http_port: u16,
    /// development | staging | production
    pub environment: String,
    /// Venue timezone; the ledger day rolls at local midnight
    pub venue_tz: Tz,
    /// Entrance fee in smallest currency unit, when a request omits one
    pub default_entrance_fee: i64,
    pub max_connections: usize,
    pub request_timeout_ms: u64,
    pub jwt: JwtConfig,
}

impl Config {
    /// Load configuration from the environment, with defaults
    pub fn from_env() -> Self {
        let venue_tz = std::env::var("VENUE_TZ")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(chrono_tz::Asia::Tokyo);

        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/cardroom".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            venue_tz,
            default_entrance_fee: std::env::var("DEFAULT_ENTRANCE_FEE")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(0),
            max_connections: std::env::var("MAX_CONNECTIONS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(1000),
            request_timeout_ms: std::env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(30000),
            jwt: JwtConfig::default(),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn database_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("database")
    }

    pub fn log_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("logs")
    }

    /// Create the working directory layout if missing
    pub fn ensure_work_dir_structure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.database_dir())?;
        std::fs::create_dir_all(self.log_dir())?;
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

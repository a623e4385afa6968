//! Cardroom Server - venue backend for QR check-in and stay billing
//!
//! # Module structure
//!
//! ```text
//! cardroom-server/src/
//! ├── core/          # Config, shared state, HTTP server
//! ├── auth/          # JWT sessions, PIN hashing, middleware
//! ├── credential/    # Scannable QR credential codec
//! ├── session/       # Check-in / check-out state machine
//! ├── billing/       # Transactional bill + ledger engine
//! ├── ledger/        # Read-only ledger queries
//! ├── api/           # HTTP routes and handlers
//! ├── db/            # Embedded SurrealDB, models, repositories
//! └── utils/         # Errors, logging, time helpers
//! ```
//!
//! The billing engine owns every state mutation; the session machine
//! gatekeeps it behind credential and PIN checks; everything else reads.

pub mod api;
pub mod auth;
pub mod billing;
pub mod core;
pub mod credential;
pub mod db;
pub mod ledger;
pub mod session;
pub mod utils;

// Re-export public types
pub use auth::{CurrentUser, JwtService};
pub use core::{Config, Server, ServerState};
pub use credential::{CredentialCodec, CredentialKind, QrCredential};
pub use utils::{AppError, AppResponse, AppResult};

pub use utils::logger::{init_logger, init_logger_with_file};

/// Prepare the process environment: dotenv, working directory, logging
pub fn setup_environment(config: &Config) -> std::io::Result<()> {
    config.ensure_work_dir_structure()?;

    let log_dir = config.log_dir();
    let log_level = std::env::var("LOG_LEVEL").ok();
    init_logger_with_file(log_level.as_deref(), log_dir.to_str());

    Ok(())
}

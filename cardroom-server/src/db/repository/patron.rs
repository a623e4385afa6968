//! Patron Repository
//!
//! Lookups plus account seeding. Presence flips (`is_staying`) are owned by
//! the billing engine and deliberately absent here.

use super::{BaseRepository, RepoError, RepoResult};
use crate::db::models::{Patron, PatronRole, PatronStatus};
use crate::utils::now_millis;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

const PATRON_SELECT: &str = "SELECT <string> id AS id, login_id, display_name, pin_hash, \
     role, is_staying, current_table, current_seat, last_check_in_at, last_check_out_at, \
     created_at FROM";

/// Fields for creating a patron account
#[derive(Debug, Clone)]
pub struct PatronCreate {
    /// External uid, used as the record key
    pub uid: String,
    pub login_id: String,
    pub display_name: String,
    /// Pre-hashed PIN (argon2)
    pub pin_hash: String,
    pub role: PatronRole,
}

#[derive(Clone)]
pub struct PatronRepository {
    base: BaseRepository,
}

impl PatronRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    pub async fn find_by_uid(&self, uid: &str) -> RepoResult<Option<Patron>> {
        let mut result = self
            .base
            .db()
            .query(format!("{PATRON_SELECT} type::thing('patron', $uid)"))
            .bind(("uid", uid.to_string()))
            .await?;

        let patrons: Vec<Patron> = result.take(0)?;
        Ok(patrons.into_iter().next())
    }

    pub async fn find_by_login_id(&self, login_id: &str) -> RepoResult<Option<Patron>> {
        let mut result = self
            .base
            .db()
            .query(format!(
                "{PATRON_SELECT} patron WHERE login_id = $login_id LIMIT 1"
            ))
            .bind(("login_id", login_id.to_string()))
            .await?;

        let patrons: Vec<Patron> = result.take(0)?;
        Ok(patrons.into_iter().next())
    }

    /// Presence status projection for the status endpoint
    pub async fn status(&self, uid: &str) -> RepoResult<Option<PatronStatus>> {
        let patron = self.find_by_uid(uid).await?;
        Ok(patron.map(|p| PatronStatus {
            uid: uid.to_string(),
            login_id: p.login_id,
            display_name: p.display_name,
            is_staying: p.is_staying,
            last_check_in_at: p.last_check_in_at,
            last_check_out_at: p.last_check_out_at,
        }))
    }

    /// Create a patron account record
    ///
    /// Account management proper is out of scope; this exists for seeding
    /// and tests. The unique index on `login_id` rejects duplicates.
    pub async fn create(&self, data: PatronCreate) -> RepoResult<Patron> {
        let uid = data.uid.clone();
        let result = self
            .base
            .db()
            .query(
                "CREATE type::thing('patron', $uid) SET \
                     login_id = $login_id, \
                     display_name = $display_name, \
                     pin_hash = $pin_hash, \
                     role = $role, \
                     is_staying = false, \
                     current_table = NONE, \
                     current_seat = NONE, \
                     last_check_in_at = NONE, \
                     last_check_out_at = NONE, \
                     created_at = $now",
            )
            .bind(("uid", data.uid))
            .bind(("login_id", data.login_id))
            .bind(("display_name", data.display_name))
            .bind(("pin_hash", data.pin_hash))
            .bind(("role", data.role))
            .bind(("now", now_millis()))
            .await?;

        result.check().map_err(|e| {
            let msg = e.to_string();
            if msg.contains("patron_login") || msg.contains("already exists") {
                RepoError::Duplicate(format!("Patron {uid} already exists"))
            } else {
                RepoError::Database(msg)
            }
        })?;

        self.find_by_uid(&uid)
            .await?
            .ok_or_else(|| RepoError::Database("Failed to create patron".into()))
    }
}

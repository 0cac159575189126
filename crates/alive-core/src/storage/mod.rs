//! Persistent storage for progress rows and daily logs.
//!
//! The core consumes the [`Store`] trait; [`Database`] is the SQLite
//! implementation. Every mutating method is one logical operation inside
//! one transaction -- there is no cross-call transaction state to leak.

pub mod database;

pub use database::Database;

use std::path::PathBuf;

use crate::error::Result;
use crate::model::{DailyLog, MilestoneId, Milestones, Progress, TxAttachment};

/// Outcome of the speculative check-in insert.
#[derive(Debug, Clone)]
pub enum InsertOutcome {
    /// This caller created the row.
    Created,
    /// A concurrent (or earlier) check-in won; here is its row.
    AlreadyExists(DailyLog),
}

/// Repository seam over the two entities.
///
/// `insert_checkin` is the compare-and-swap-by-unique-key step of the
/// idempotent persistence protocol: the log insert and the materialized
/// progress write happen in a single transaction, and a uniqueness
/// violation surfaces as [`InsertOutcome::AlreadyExists`] with the winning
/// row re-read, never as an error.
pub trait Store {
    /// Log lookup by the uniqueness key.
    fn find_log_by_key(
        &self,
        address: &str,
        challenge_id: i64,
        date_key: &str,
    ) -> Result<Option<DailyLog>>;

    fn find_log_by_id(&self, id: &str) -> Result<Option<DailyLog>>;

    /// All logs for a participant, ordered by date ascending.
    fn list_logs(&self, address: &str, challenge_id: i64) -> Result<Vec<DailyLog>>;

    fn find_progress(&self, address: &str) -> Result<Option<Progress>>;

    /// Create the progress row if absent, preserving an existing row
    /// (including its `start_date_key`) under concurrent creation.
    fn ensure_progress(&mut self, template: &Progress) -> Result<Progress>;

    fn upsert_progress(&mut self, progress: &Progress) -> Result<()>;

    /// Speculative insert of a new check-in plus its progress update.
    fn insert_checkin(&mut self, log: &DailyLog, progress: &Progress) -> Result<InsertOutcome>;

    /// Attach proof-submission transaction details to a log.
    ///
    /// # Errors
    /// `NotFound` for an unknown id; `Conflict` if a hash is already set.
    fn attach_tx(&mut self, log_id: &str, tx: &TxAttachment) -> Result<DailyLog>;

    /// Attach a day-reward mint reference. First write wins; a repeat
    /// attempt is a no-op returning the stored row.
    fn attach_day_mint(&mut self, log_id: &str, tx_hash: &str) -> Result<DailyLog>;

    /// Attach a milestone mint reference. First write wins; repeats are
    /// no-ops. Returns the stored references.
    fn attach_milestone(
        &mut self,
        address: &str,
        id: MilestoneId,
        tx_hash: &str,
    ) -> Result<Milestones>;

    /// Record the final badge mint. First write wins; repeats are no-ops.
    fn attach_final(&mut self, address: &str, tx_hash: &str) -> Result<Progress>;
}

/// Returns `~/.config/alive[-dev]/` based on ALIVE_ENV.
///
/// Set ALIVE_ENV=dev to use the development data directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("ALIVE_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("alive-dev")
    } else {
        base_dir.join("alive")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

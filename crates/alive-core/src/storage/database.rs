//! SQLite implementation of the [`Store`] trait.
//!
//! The `(address, challenge_id, date_key)` unique index on `daily_logs` is
//! the enforcement point of the one-check-in-per-day invariant. The insert
//! path is written to lose races gracefully: a constraint violation rolls
//! the transaction back and the winner's row is re-read.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::time::Duration;

use super::{data_dir, InsertOutcome, Store};
use crate::error::{CoreError, Result};
use crate::model::{
    DailyLog, LogStatus, MilestoneId, Milestones, Progress, Reflection, TxAttachment,
};

const LOG_COLUMNS: &str = "id, address, challenge_id, day_index, date_key, input_hash, \
     normalized_text, reflection_note, reflection_next, salt_hex, proof_hash, status, \
     tx_hash, chain_id, contract_address, block_number, mint_tx_hash, created_at";

const PROGRESS_COLUMNS: &str = "address, challenge_id, display_name, avatar_url, timezone, \
     start_date_key, streak, last_date_key, last_day_index, day_mint_count, final_minted, \
     final_tx_hash, milestone7_tx_hash, milestone14_tx_hash, milestone28_tx_hash, \
     created_at, updated_at";

/// SQLite database for progress rows and daily logs.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `<data dir>/alive.db`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        Self::open_at(&data_dir()?.join("alive.db"))
    }

    /// Open a database at an explicit path, creating schema as needed.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        // WAL lets concurrent check-in attempts from separate connections
        // block on the lock instead of failing immediately.
        let _: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (tests and ephemeral runs).
    ///
    /// # Errors
    /// Returns an error if migration fails.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS progress (
                address            TEXT PRIMARY KEY,
                challenge_id       INTEGER NOT NULL,
                display_name       TEXT,
                avatar_url         TEXT,
                timezone           TEXT NOT NULL,
                start_date_key     TEXT NOT NULL,
                streak             INTEGER NOT NULL DEFAULT 0,
                last_date_key      TEXT,
                last_day_index     INTEGER,
                day_mint_count     INTEGER NOT NULL DEFAULT 0,
                final_minted       INTEGER NOT NULL DEFAULT 0,
                final_tx_hash      TEXT,
                milestone7_tx_hash  TEXT,
                milestone14_tx_hash TEXT,
                milestone28_tx_hash TEXT,
                created_at         TEXT NOT NULL,
                updated_at         TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS daily_logs (
                id               TEXT PRIMARY KEY,
                address          TEXT NOT NULL,
                challenge_id     INTEGER NOT NULL,
                day_index        INTEGER NOT NULL,
                date_key         TEXT NOT NULL,
                input_hash       TEXT,
                normalized_text  TEXT NOT NULL DEFAULT '',
                reflection_note  TEXT NOT NULL,
                reflection_next  TEXT NOT NULL,
                salt_hex         TEXT NOT NULL,
                proof_hash       TEXT NOT NULL,
                status           TEXT NOT NULL DEFAULT 'CREATED',
                tx_hash          TEXT,
                chain_id         INTEGER,
                contract_address TEXT,
                block_number     INTEGER,
                mint_tx_hash     TEXT,
                created_at       TEXT NOT NULL
            );

            CREATE UNIQUE INDEX IF NOT EXISTS uq_daily_logs_address_challenge_date
                ON daily_logs(address, challenge_id, date_key);
            CREATE INDEX IF NOT EXISTS idx_daily_logs_status
                ON daily_logs(status);",
        )?;
        Ok(())
    }

    fn get_log_by_key(
        conn: &Connection,
        address: &str,
        challenge_id: i64,
        date_key: &str,
    ) -> Result<Option<DailyLog>> {
        let sql = format!(
            "SELECT {LOG_COLUMNS} FROM daily_logs
             WHERE address = ?1 AND challenge_id = ?2 AND date_key = ?3"
        );
        conn.query_row(&sql, params![address, challenge_id, date_key], map_log)
            .optional()
            .map_err(CoreError::from)
    }

    fn get_log_by_id(conn: &Connection, id: &str) -> Result<Option<DailyLog>> {
        let sql = format!("SELECT {LOG_COLUMNS} FROM daily_logs WHERE id = ?1");
        conn.query_row(&sql, params![id], map_log)
            .optional()
            .map_err(CoreError::from)
    }

    fn get_progress(conn: &Connection, address: &str) -> Result<Option<Progress>> {
        let sql = format!("SELECT {PROGRESS_COLUMNS} FROM progress WHERE address = ?1");
        conn.query_row(&sql, params![address], map_progress)
            .optional()
            .map_err(CoreError::from)
    }

    fn write_progress(conn: &Connection, progress: &Progress) -> Result<()> {
        conn.execute(
            "INSERT INTO progress (address, challenge_id, display_name, avatar_url, timezone,
                start_date_key, streak, last_date_key, last_day_index, day_mint_count,
                final_minted, final_tx_hash, milestone7_tx_hash, milestone14_tx_hash,
                milestone28_tx_hash, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
             ON CONFLICT(address) DO UPDATE SET
                challenge_id = excluded.challenge_id,
                display_name = excluded.display_name,
                avatar_url = excluded.avatar_url,
                timezone = excluded.timezone,
                start_date_key = excluded.start_date_key,
                streak = excluded.streak,
                last_date_key = excluded.last_date_key,
                last_day_index = excluded.last_day_index,
                day_mint_count = excluded.day_mint_count,
                final_minted = excluded.final_minted,
                final_tx_hash = excluded.final_tx_hash,
                milestone7_tx_hash = excluded.milestone7_tx_hash,
                milestone14_tx_hash = excluded.milestone14_tx_hash,
                milestone28_tx_hash = excluded.milestone28_tx_hash,
                updated_at = excluded.updated_at",
            params![
                progress.address,
                progress.challenge_id,
                progress.display_name,
                progress.avatar_url,
                progress.timezone,
                progress.start_date_key,
                progress.streak,
                progress.last_date_key,
                progress.last_day_index,
                progress.day_mint_count,
                progress.final_minted,
                progress.final_tx_hash,
                progress.milestones.seven,
                progress.milestones.fourteen,
                progress.milestones.twenty_eight,
                progress.created_at.to_rfc3339(),
                progress.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn insert_log(conn: &Connection, log: &DailyLog) -> rusqlite::Result<usize> {
        conn.execute(
            "INSERT INTO daily_logs (id, address, challenge_id, day_index, date_key,
                input_hash, normalized_text, reflection_note, reflection_next, salt_hex,
                proof_hash, status, tx_hash, chain_id, contract_address, block_number,
                mint_tx_hash, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                ?16, ?17, ?18)",
            params![
                log.id,
                log.address,
                log.challenge_id,
                log.day_index,
                log.date_key,
                log.input_hash,
                log.normalized_text,
                log.reflection.note,
                log.reflection.next,
                log.salt_hex,
                log.proof_hash,
                log.status.as_str(),
                log.tx_hash,
                log.chain_id,
                log.contract_address,
                log.block_number,
                log.mint_tx_hash,
                log.created_at.to_rfc3339(),
            ],
        )
    }
}

impl Store for Database {
    fn find_log_by_key(
        &self,
        address: &str,
        challenge_id: i64,
        date_key: &str,
    ) -> Result<Option<DailyLog>> {
        Self::get_log_by_key(&self.conn, address, challenge_id, date_key)
    }

    fn find_log_by_id(&self, id: &str) -> Result<Option<DailyLog>> {
        Self::get_log_by_id(&self.conn, id)
    }

    fn list_logs(&self, address: &str, challenge_id: i64) -> Result<Vec<DailyLog>> {
        let sql = format!(
            "SELECT {LOG_COLUMNS} FROM daily_logs
             WHERE address = ?1 AND challenge_id = ?2
             ORDER BY date_key ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![address, challenge_id], map_log)?;
        let mut logs = Vec::new();
        for row in rows {
            logs.push(row?);
        }
        Ok(logs)
    }

    fn find_progress(&self, address: &str) -> Result<Option<Progress>> {
        Self::get_progress(&self.conn, address)
    }

    fn ensure_progress(&mut self, template: &Progress) -> Result<Progress> {
        self.conn.execute(
            "INSERT OR IGNORE INTO progress (address, challenge_id, display_name, avatar_url,
                timezone, start_date_key, streak, last_date_key, last_day_index,
                day_mint_count, final_minted, final_tx_hash, milestone7_tx_hash,
                milestone14_tx_hash, milestone28_tx_hash, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
            params![
                template.address,
                template.challenge_id,
                template.display_name,
                template.avatar_url,
                template.timezone,
                template.start_date_key,
                template.streak,
                template.last_date_key,
                template.last_day_index,
                template.day_mint_count,
                template.final_minted,
                template.final_tx_hash,
                template.milestones.seven,
                template.milestones.fourteen,
                template.milestones.twenty_eight,
                template.created_at.to_rfc3339(),
                template.updated_at.to_rfc3339(),
            ],
        )?;
        Self::get_progress(&self.conn, &template.address)?.ok_or_else(|| {
            CoreError::Internal(format!("progress row vanished for {}", template.address))
        })
    }

    fn upsert_progress(&mut self, progress: &Progress) -> Result<()> {
        Self::write_progress(&self.conn, progress)
    }

    fn insert_checkin(&mut self, log: &DailyLog, progress: &Progress) -> Result<InsertOutcome> {
        let tx = self.conn.transaction()?;
        match Self::insert_log(&tx, log) {
            Ok(_) => {
                Self::write_progress(&tx, progress)?;
                tx.commit()?;
                Ok(InsertOutcome::Created)
            }
            Err(e) if is_unique_violation(&e) => {
                drop(tx);
                tracing::warn!(
                    address = %log.address,
                    date_key = %log.date_key,
                    "check-in insert lost the uniqueness race, reusing winner row"
                );
                let winner =
                    Self::get_log_by_key(&self.conn, &log.address, log.challenge_id, &log.date_key)?
                        .ok_or_else(|| {
                            CoreError::Internal(
                                "uniqueness violation reported but no stored row found".to_string(),
                            )
                        })?;
                Ok(InsertOutcome::AlreadyExists(winner))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn attach_tx(&mut self, log_id: &str, attachment: &TxAttachment) -> Result<DailyLog> {
        let tx = self.conn.transaction()?;
        let mut log = Self::get_log_by_id(&tx, log_id)?
            .ok_or_else(|| CoreError::NotFound(format!("log {log_id} not found")))?;
        if log.tx_hash.is_some() {
            return Err(CoreError::Conflict(format!(
                "log {log_id} already has a transaction hash"
            )));
        }
        tx.execute(
            "UPDATE daily_logs
             SET tx_hash = ?1, chain_id = ?2, contract_address = ?3, block_number = ?4,
                 status = ?5
             WHERE id = ?6",
            params![
                attachment.tx_hash,
                attachment.chain_id,
                attachment.contract_address,
                attachment.block_number,
                LogStatus::Submitted.as_str(),
                log_id,
            ],
        )?;
        tx.commit()?;

        log.tx_hash = Some(attachment.tx_hash.clone());
        log.chain_id = Some(attachment.chain_id);
        log.contract_address = Some(attachment.contract_address.clone());
        log.block_number = attachment.block_number;
        log.status = LogStatus::Submitted;
        Ok(log)
    }

    fn attach_day_mint(&mut self, log_id: &str, tx_hash: &str) -> Result<DailyLog> {
        let tx = self.conn.transaction()?;
        let mut log = Self::get_log_by_id(&tx, log_id)?
            .ok_or_else(|| CoreError::NotFound(format!("log {log_id} not found")))?;
        if log.mint_tx_hash.is_some() {
            return Ok(log);
        }
        tx.execute(
            "UPDATE daily_logs SET mint_tx_hash = ?1 WHERE id = ?2",
            params![tx_hash, log_id],
        )?;
        tx.execute(
            "UPDATE progress SET day_mint_count = day_mint_count + 1, updated_at = ?1
             WHERE address = ?2",
            params![Utc::now().to_rfc3339(), log.address],
        )?;
        tx.commit()?;

        log.mint_tx_hash = Some(tx_hash.to_string());
        Ok(log)
    }

    fn attach_milestone(
        &mut self,
        address: &str,
        id: MilestoneId,
        tx_hash: &str,
    ) -> Result<Milestones> {
        let tx = self.conn.transaction()?;
        let mut progress = Self::get_progress(&tx, address)?
            .ok_or_else(|| CoreError::NotFound(format!("progress for {address} not found")))?;
        if progress.milestones.set_if_unset(id, tx_hash) {
            progress.updated_at = Utc::now();
            Self::write_progress(&tx, &progress)?;
            tx.commit()?;
        }
        Ok(progress.milestones)
    }

    fn attach_final(&mut self, address: &str, tx_hash: &str) -> Result<Progress> {
        let tx = self.conn.transaction()?;
        let mut progress = Self::get_progress(&tx, address)?
            .ok_or_else(|| CoreError::NotFound(format!("progress for {address} not found")))?;
        if !progress.final_minted {
            progress.final_minted = true;
            progress.final_tx_hash = Some(tx_hash.to_string());
            progress.updated_at = Utc::now();
            Self::write_progress(&tx, &progress)?;
            tx.commit()?;
        }
        Ok(progress)
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn parse_ts(idx: usize, raw: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn map_log(row: &rusqlite::Row<'_>) -> rusqlite::Result<DailyLog> {
    let status: String = row.get(11)?;
    let created_at: String = row.get(17)?;
    Ok(DailyLog {
        id: row.get(0)?,
        address: row.get(1)?,
        challenge_id: row.get(2)?,
        day_index: row.get(3)?,
        date_key: row.get(4)?,
        input_hash: row.get(5)?,
        normalized_text: row.get(6)?,
        reflection: Reflection {
            note: row.get(7)?,
            next: row.get(8)?,
        },
        salt_hex: row.get(9)?,
        proof_hash: row.get(10)?,
        status: LogStatus::parse(&status),
        tx_hash: row.get(12)?,
        chain_id: row.get(13)?,
        contract_address: row.get(14)?,
        block_number: row.get(15)?,
        mint_tx_hash: row.get(16)?,
        created_at: parse_ts(17, created_at)?,
    })
}

fn map_progress(row: &rusqlite::Row<'_>) -> rusqlite::Result<Progress> {
    let created_at: String = row.get(15)?;
    let updated_at: String = row.get(16)?;
    Ok(Progress {
        address: row.get(0)?,
        challenge_id: row.get(1)?,
        display_name: row.get(2)?,
        avatar_url: row.get(3)?,
        timezone: row.get(4)?,
        start_date_key: row.get(5)?,
        streak: row.get(6)?,
        last_date_key: row.get(7)?,
        last_day_index: row.get(8)?,
        day_mint_count: row.get(9)?,
        final_minted: row.get(10)?,
        final_tx_hash: row.get(11)?,
        milestones: Milestones {
            seven: row.get(12)?,
            fourteen: row.get(13)?,
            twenty_eight: row.get(14)?,
        },
        created_at: parse_ts(15, created_at)?,
        updated_at: parse_ts(16, updated_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDR: &str = "0x00000000000000000000000000000000000000aa";

    fn make_log(date_key: &str, day_index: u8) -> DailyLog {
        DailyLog {
            id: uuid::Uuid::new_v4().to_string(),
            address: ADDR.to_string(),
            challenge_id: 1,
            day_index,
            date_key: date_key.to_string(),
            input_hash: Some("ab".repeat(32)),
            normalized_text: "entry".to_string(),
            reflection: Reflection {
                note: "note".to_string(),
                next: "next".to_string(),
            },
            salt_hex: "0x0011".to_string(),
            proof_hash: format!("0x{:064x}", day_index),
            status: LogStatus::Created,
            tx_hash: None,
            chain_id: None,
            contract_address: None,
            block_number: None,
            mint_tx_hash: None,
            created_at: Utc::now(),
        }
    }

    fn seeded_db() -> (Database, Progress) {
        let mut db = Database::open_memory().unwrap();
        let progress = db
            .ensure_progress(&Progress::new(ADDR, 1, "UTC", "2026-01-01"))
            .unwrap();
        (db, progress)
    }

    #[test]
    fn insert_then_duplicate_reports_existing_row() {
        let (mut db, mut progress) = seeded_db();
        let log = make_log("2026-01-01", 1);
        progress.streak = 1;
        progress.last_date_key = Some("2026-01-01".to_string());

        match db.insert_checkin(&log, &progress).unwrap() {
            InsertOutcome::Created => {}
            InsertOutcome::AlreadyExists(_) => panic!("first insert must create"),
        }

        let dup = make_log("2026-01-01", 1);
        match db.insert_checkin(&dup, &progress).unwrap() {
            InsertOutcome::AlreadyExists(winner) => assert_eq!(winner.id, log.id),
            InsertOutcome::Created => panic!("duplicate insert must not create"),
        }

        let logs = db.list_logs(ADDR, 1).unwrap();
        assert_eq!(logs.len(), 1);
    }

    #[test]
    fn log_round_trips_through_sqlite() {
        let (mut db, progress) = seeded_db();
        let log = make_log("2026-01-02", 2);
        db.insert_checkin(&log, &progress).unwrap();

        let stored = db.find_log_by_key(ADDR, 1, "2026-01-02").unwrap().unwrap();
        assert_eq!(stored.id, log.id);
        assert_eq!(stored.day_index, 2);
        assert_eq!(stored.reflection, log.reflection);
        assert_eq!(stored.proof_hash, log.proof_hash);
        assert_eq!(stored.status, LogStatus::Created);
    }

    #[test]
    fn ensure_progress_preserves_existing_row() {
        let (mut db, _) = seeded_db();
        let mut progress = db.find_progress(ADDR).unwrap().unwrap();
        progress.streak = 5;
        db.upsert_progress(&progress).unwrap();

        let template = Progress::new(ADDR, 1, "UTC", "2026-06-01");
        let kept = db.ensure_progress(&template).unwrap();
        assert_eq!(kept.streak, 5);
        assert_eq!(kept.start_date_key, "2026-01-01");
    }

    #[test]
    fn attach_tx_first_write_wins_then_conflicts() {
        let (mut db, progress) = seeded_db();
        let log = make_log("2026-01-01", 1);
        db.insert_checkin(&log, &progress).unwrap();

        let attachment = TxAttachment {
            tx_hash: "0xdead".to_string(),
            chain_id: 11155111,
            contract_address: "0x00000000000000000000000000000000000000cc".to_string(),
            block_number: Some(42),
        };
        let updated = db.attach_tx(&log.id, &attachment).unwrap();
        assert_eq!(updated.status, LogStatus::Submitted);
        assert_eq!(updated.tx_hash.as_deref(), Some("0xdead"));

        let err = db.attach_tx(&log.id, &attachment).unwrap_err();
        assert_eq!(err.code(), "CONFLICT");
    }

    #[test]
    fn attach_tx_unknown_log_is_not_found() {
        let (mut db, _) = seeded_db();
        let attachment = TxAttachment {
            tx_hash: "0xdead".to_string(),
            chain_id: 1,
            contract_address: "0x00000000000000000000000000000000000000cc".to_string(),
            block_number: None,
        };
        let err = db.attach_tx("missing", &attachment).unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[test]
    fn day_mint_is_idempotent_and_counts_once() {
        let (mut db, progress) = seeded_db();
        let log = make_log("2026-01-01", 1);
        db.insert_checkin(&log, &progress).unwrap();

        let first = db.attach_day_mint(&log.id, "0xmint1").unwrap();
        assert_eq!(first.mint_tx_hash.as_deref(), Some("0xmint1"));

        let second = db.attach_day_mint(&log.id, "0xmint2").unwrap();
        assert_eq!(second.mint_tx_hash.as_deref(), Some("0xmint1"));

        let stored = db.find_progress(ADDR).unwrap().unwrap();
        assert_eq!(stored.day_mint_count, 1);
    }

    #[test]
    fn milestone_attach_is_monotonic() {
        let (mut db, _) = seeded_db();
        let first = db
            .attach_milestone(ADDR, MilestoneId::Seven, "0xaaa")
            .unwrap();
        assert_eq!(first.get(MilestoneId::Seven), Some("0xaaa"));

        let second = db
            .attach_milestone(ADDR, MilestoneId::Seven, "0xbbb")
            .unwrap();
        assert_eq!(second.get(MilestoneId::Seven), Some("0xaaa"));
    }

    #[test]
    fn final_attach_is_idempotent() {
        let (mut db, _) = seeded_db();
        let first = db.attach_final(ADDR, "0xfinal1").unwrap();
        assert!(first.final_minted);
        assert_eq!(first.final_tx_hash.as_deref(), Some("0xfinal1"));

        let second = db.attach_final(ADDR, "0xfinal2").unwrap();
        assert_eq!(second.final_tx_hash.as_deref(), Some("0xfinal1"));
    }

    #[test]
    fn list_logs_orders_by_date() {
        let (mut db, progress) = seeded_db();
        for (key, day) in [("2026-01-03", 3u8), ("2026-01-01", 1), ("2026-01-02", 2)] {
            db.insert_checkin(&make_log(key, day), &progress).unwrap();
        }
        let logs = db.list_logs(ADDR, 1).unwrap();
        let days: Vec<u8> = logs.iter().map(|l| l.day_index).collect();
        assert_eq!(days, vec![1, 2, 3]);
    }
}

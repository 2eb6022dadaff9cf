//! SQLite-based session storage and statistics.
//!
//! Provides persistent storage for:
//! - Finished phases (completed or skipped)
//! - Statistics: totals, today, and daily streaks
//! - Key-value store for application state

use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::{DatabaseError, ObserverError};
use crate::events::{PhaseChange, PhaseOutcome};
use crate::observer::SessionRecorder;
use crate::timer::Phase;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseRecord {
    pub id: i64,
    pub phase: Phase,
    pub elapsed_secs: u64,
    pub completed: bool,
    /// Completed work cycles after this phase ended.
    pub cycle: u32,
    pub ended_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Stats {
    pub total_pomodoros: u64,
    pub total_work_secs: u64,
    pub skipped_work: u64,
    pub today_pomodoros: u64,
    pub today_work_secs: u64,
    /// Consecutive days, ending today or yesterday, with a completed pomodoro.
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_session_date: Option<NaiveDate>,
}

/// SQLite database for session storage.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `~/.config/pomodoro/pomodoro.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, crate::error::CoreError> {
        let path = data_dir()?.join("pomodoro.db");
        let conn = Connection::open(&path).map_err(|source| DatabaseError::OpenFailed {
            path: path.clone(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests and throwaway sessions).
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), DatabaseError> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS phases (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                phase        TEXT NOT NULL,
                elapsed_secs INTEGER NOT NULL,
                completed    INTEGER NOT NULL,
                cycle        INTEGER NOT NULL,
                ended_at     TEXT NOT NULL,
                day          TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;

        // Databases created before `day` existed: fall back to the UTC date.
        let has_day: bool = self.conn.query_row(
            "SELECT COUNT(*) > 0 FROM pragma_table_info('phases') WHERE name = 'day'",
            [],
            |row| row.get(0),
        )?;
        if !has_day {
            self.conn.execute_batch(
                "ALTER TABLE phases ADD COLUMN day TEXT NOT NULL DEFAULT '';
                 UPDATE phases SET day = substr(ended_at, 1, 10);",
            )?;
        }

        self.conn.execute_batch(
            "CREATE INDEX IF NOT EXISTS idx_phases_ended_at ON phases(ended_at);
             CREATE INDEX IF NOT EXISTS idx_phases_phase_day ON phases(phase, day);",
        )?;
        Ok(())
    }

    /// Record a finished work or break phase.
    ///
    /// The phase counts toward the calendar day of `ended_at` in its own
    /// time zone; pass a `DateTime<Local>` for the user's day.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn record_phase<Tz: TimeZone>(
        &self,
        outcome: &PhaseOutcome,
        cycle: u32,
        ended_at: DateTime<Tz>,
    ) -> Result<i64, DatabaseError> {
        let day = ended_at.date_naive().format("%Y-%m-%d").to_string();
        self.conn.execute(
            "INSERT INTO phases (phase, elapsed_secs, completed, cycle, ended_at, day)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                outcome.phase.as_str(),
                outcome.elapsed_seconds,
                outcome.completed,
                cycle,
                ended_at.with_timezone(&Utc).to_rfc3339(),
                day,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Most recent phases, newest first.
    pub fn recent(&self, limit: usize) -> Result<Vec<PhaseRecord>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, phase, elapsed_secs, completed, cycle, ended_at
             FROM phases
             ORDER BY id DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, u64>(2)?,
                row.get::<_, bool>(3)?,
                row.get::<_, u32>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, phase, elapsed_secs, completed, cycle, ended_at) = row?;
            let phase = serde_json::from_value(serde_json::Value::String(phase.clone()))
                .map_err(|_| DatabaseError::QueryFailed(format!("unknown phase '{phase}'")))?;
            let ended_at = DateTime::parse_from_rfc3339(&ended_at)
                .map_err(|e| DatabaseError::QueryFailed(format!("bad timestamp: {e}")))?
                .with_timezone(&Utc);
            records.push(PhaseRecord {
                id,
                phase,
                elapsed_secs,
                completed,
                cycle,
                ended_at,
            });
        }
        Ok(records)
    }

    /// Statistics for the user's local today.
    pub fn stats(&self) -> Result<Stats, DatabaseError> {
        self.stats_on(Local::now().date_naive())
    }

    /// Statistics as seen on `today`, a local calendar day.
    pub fn stats_on(&self, today: NaiveDate) -> Result<Stats, DatabaseError> {
        let mut stats = Stats::default();
        let work = Phase::Work.as_str();

        let (pomodoros, secs, skipped) = self.conn.query_row(
            "SELECT COALESCE(SUM(completed), 0),
                    COALESCE(SUM(elapsed_secs), 0),
                    COALESCE(SUM(1 - completed), 0)
             FROM phases
             WHERE phase = ?1",
            params![work],
            |row| Ok((row.get::<_, u64>(0)?, row.get::<_, u64>(1)?, row.get::<_, u64>(2)?)),
        )?;
        stats.total_pomodoros = pomodoros;
        stats.total_work_secs = secs;
        stats.skipped_work = skipped;

        let today_day = today.format("%Y-%m-%d").to_string();
        let (today_pomodoros, today_secs) = self.conn.query_row(
            "SELECT COALESCE(SUM(completed), 0), COALESCE(SUM(elapsed_secs), 0)
             FROM phases
             WHERE phase = ?1 AND day = ?2",
            params![work, today_day],
            |row| Ok((row.get::<_, u64>(0)?, row.get::<_, u64>(1)?)),
        )?;
        stats.today_pomodoros = today_pomodoros;
        stats.today_work_secs = today_secs;

        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT day
             FROM phases
             WHERE phase = ?1 AND completed = 1
             ORDER BY 1",
        )?;
        let days = stmt
            .query_map(params![work], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .filter_map(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok())
            .collect::<Vec<_>>();

        let (current, longest) = streaks(&days, today);
        stats.current_streak = current;
        stats.longest_streak = longest;
        stats.last_session_date = days.last().copied();
        Ok(stats)
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn kv_delete(&self, key: &str) -> Result<(), DatabaseError> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

impl SessionRecorder for Database {
    fn work_finished(
        &mut self,
        change: &PhaseChange,
        outcome: &PhaseOutcome,
    ) -> Result<(), ObserverError> {
        self.record_phase(outcome, change.completed_work_cycles, change.at.with_timezone(&Local))?;
        Ok(())
    }

    fn break_finished(
        &mut self,
        change: &PhaseChange,
        outcome: &PhaseOutcome,
    ) -> Result<(), ObserverError> {
        self.record_phase(outcome, change.completed_work_cycles, change.at.with_timezone(&Local))?;
        Ok(())
    }
}

/// Current and longest run of consecutive days in sorted, distinct `days`.
/// The current streak survives until the end of the day after its last entry.
fn streaks(days: &[NaiveDate], today: NaiveDate) -> (u32, u32) {
    let mut longest = 0;
    let mut run = 0;
    let mut prev: Option<NaiveDate> = None;
    for &day in days {
        run = match prev {
            Some(p) if day - p == Duration::days(1) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        prev = Some(day);
    }

    let current = match prev {
        Some(last) if today - last <= Duration::days(1) => run,
        _ => 0,
    };
    (current, longest)
}

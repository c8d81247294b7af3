//! Persistence for actuators, schedules, and the command log.
//!
//! The reconciliation engine talks to the narrow [`Store`] trait so it can
//! be exercised against fakes; [`SqliteStore`] is the production
//! implementation. The cached actuator status is written inside the same
//! transaction as every command insert, keeping the denormalized projection
//! consistent with the log.

use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::actuator::Actuator;
use crate::command::{Command, NewCommand};
use crate::error::{Result, VerdantError};
use crate::schedule::Schedule;
use crate::types::{ActuatorKind, Issuer, SwitchState};

// ---------------------------------------------------------------------------
// Store trait
// ---------------------------------------------------------------------------

/// The operations the reconciliation loop needs from the backing store.
pub trait Store {
    fn actuator_ids(&self) -> Result<Vec<i64>>;

    fn schedules_for_day(&self, actuator_id: i64, date: NaiveDate) -> Result<Vec<Schedule>>;

    /// The most recently issued command for an actuator, if any.
    fn latest_command(&self, actuator_id: i64) -> Result<Option<Command>>;

    /// Append `cmd` and update the cached actuator status, but only while
    /// the actuator's latest command id still equals `seen` (the id the
    /// caller's decision was computed from). Returns the new command id, or
    /// `None` when a conflicting command landed in between.
    fn insert_command_if_latest(&self, cmd: &NewCommand, seen: Option<i64>) -> Result<Option<i64>>;

    /// In-place expiry extension of an existing ON command.
    fn update_command_expiry(&self, command_id: i64, expires_at: NaiveDateTime) -> Result<()>;

    fn set_actuator_status(&self, actuator_id: i64, status: SwitchState) -> Result<()>;
}

// ---------------------------------------------------------------------------
// NewSchedule
// ---------------------------------------------------------------------------

/// A schedule window about to be created.
#[derive(Debug, Clone)]
pub struct NewSchedule {
    pub actuator_id: i64,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub issued_by: String,
}

// ---------------------------------------------------------------------------
// SqliteStore
// ---------------------------------------------------------------------------

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create the database at `path` and run schema bootstrap.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// An in-memory store, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS actuators (
                 id          INTEGER PRIMARY KEY,
                 name        TEXT NOT NULL,
                 kind        TEXT NOT NULL,
                 status      TEXT NOT NULL DEFAULT 'off'
             );
             CREATE TABLE IF NOT EXISTS schedules (
                 id            INTEGER PRIMARY KEY,
                 actuator_id   INTEGER NOT NULL REFERENCES actuators(id),
                 schedule_date TEXT NOT NULL,
                 start_time    TEXT NOT NULL,
                 end_time      TEXT NOT NULL,
                 issued_by     TEXT NOT NULL,
                 created_at    TEXT NOT NULL
             );
             CREATE TABLE IF NOT EXISTS commands (
                 id          INTEGER PRIMARY KEY,
                 actuator_id INTEGER NOT NULL REFERENCES actuators(id),
                 state       TEXT NOT NULL,
                 level       INTEGER,
                 issued_by   TEXT NOT NULL,
                 issued_at   TEXT NOT NULL,
                 expires_at  TEXT
             );
             CREATE INDEX IF NOT EXISTS idx_schedules_actuator_date
                 ON schedules(actuator_id, schedule_date);
             CREATE INDEX IF NOT EXISTS idx_commands_actuator_issued
                 ON commands(actuator_id, issued_at);",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| VerdantError::StorePoisoned)
    }

    // -- actuators ----------------------------------------------------------

    pub fn insert_actuator(&self, name: &str, kind: ActuatorKind) -> Result<Actuator> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO actuators (name, kind, status) VALUES (?1, ?2, 'off')",
            params![name, kind.as_str()],
        )?;
        Ok(Actuator {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            kind,
            status: SwitchState::Off,
        })
    }

    pub fn list_actuators(&self) -> Result<Vec<Actuator>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT id, name, kind, status FROM actuators ORDER BY id")?;
        let rows = stmt.query_map([], actuator_from_row)?;
        collect(rows)
    }

    pub fn remove_actuator(&self, id: i64) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM schedules WHERE actuator_id = ?1", [id])?;
        tx.execute("DELETE FROM commands WHERE actuator_id = ?1", [id])?;
        let changed = tx.execute("DELETE FROM actuators WHERE id = ?1", [id])?;
        if changed == 0 {
            return Err(VerdantError::ActuatorNotFound(id));
        }
        tx.commit()?;
        Ok(())
    }

    // -- schedules ----------------------------------------------------------

    /// Create a schedule window after validating it: chronological bounds
    /// and no overlap with an existing window for the same actuator/date.
    pub fn insert_schedule(&self, new: &NewSchedule) -> Result<Schedule> {
        if new.start_time >= new.end_time {
            return Err(VerdantError::InvalidWindow {
                start: new.start_time,
                end: new.end_time,
            });
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let exists: Option<i64> = tx
            .query_row(
                "SELECT id FROM actuators WHERE id = ?1",
                [new.actuator_id],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_none() {
            return Err(VerdantError::ActuatorNotFound(new.actuator_id));
        }

        let candidate = Schedule {
            id: 0,
            actuator_id: new.actuator_id,
            date: new.date,
            start_time: new.start_time,
            end_time: new.end_time,
            issued_by: new.issued_by.clone(),
        };
        let existing = {
            let mut stmt = tx.prepare(
                "SELECT id, actuator_id, schedule_date, start_time, end_time, issued_by
                 FROM schedules WHERE actuator_id = ?1 AND schedule_date = ?2",
            )?;
            let rows = stmt.query_map(params![new.actuator_id, new.date], schedule_from_row)?;
            collect(rows)?
        };
        if existing.iter().any(|s| s.overlaps(&candidate)) {
            return Err(VerdantError::ScheduleOverlap {
                actuator_id: new.actuator_id,
                date: new.date,
            });
        }

        tx.execute(
            "INSERT INTO schedules (actuator_id, schedule_date, start_time, end_time, issued_by, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                new.actuator_id,
                new.date,
                new.start_time,
                new.end_time,
                new.issued_by,
                Local::now().naive_local(),
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(Schedule { id, ..candidate })
    }

    pub fn list_schedules(
        &self,
        actuator_id: Option<i64>,
        date: Option<NaiveDate>,
    ) -> Result<Vec<Schedule>> {
        let conn = self.conn()?;
        let mut sql = String::from(
            "SELECT id, actuator_id, schedule_date, start_time, end_time, issued_by
             FROM schedules WHERE 1=1",
        );
        let mut args: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        if let Some(id) = actuator_id {
            sql.push_str(" AND actuator_id = ?");
            args.push(Box::new(id));
        }
        if let Some(d) = date {
            sql.push_str(" AND schedule_date = ?");
            args.push(Box::new(d));
        }
        sql.push_str(" ORDER BY schedule_date, start_time");

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            rusqlite::params_from_iter(args.iter().map(|a| a.as_ref())),
            schedule_from_row,
        )?;
        collect(rows)
    }

    pub fn delete_schedule(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute("DELETE FROM schedules WHERE id = ?1", [id])?;
        if changed == 0 {
            return Err(VerdantError::ScheduleNotFound(id));
        }
        Ok(())
    }

    // -- commands -----------------------------------------------------------

    /// Unconditional append used by manual (CLI) issuance. Updates the
    /// cached status in the same transaction.
    pub fn insert_command(&self, cmd: &NewCommand) -> Result<Command> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let id = append_command(&tx, cmd)?;
        tx.commit()?;
        Ok(Command {
            id,
            actuator_id: cmd.actuator_id,
            state: cmd.state,
            level: cmd.level,
            issued_by: cmd.issued_by.clone(),
            issued_at: cmd.issued_at,
            expires_at: cmd.expires_at,
        })
    }

    pub fn list_commands(&self, actuator_id: i64) -> Result<Vec<Command>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, actuator_id, state, level, issued_by, issued_at, expires_at
             FROM commands WHERE actuator_id = ?1 ORDER BY issued_at DESC, id DESC",
        )?;
        let rows = stmt.query_map([actuator_id], command_from_row)?;
        collect(rows)
    }
}

impl Store for SqliteStore {
    fn actuator_ids(&self) -> Result<Vec<i64>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id FROM actuators ORDER BY id")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        collect(rows)
    }

    fn schedules_for_day(&self, actuator_id: i64, date: NaiveDate) -> Result<Vec<Schedule>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, actuator_id, schedule_date, start_time, end_time, issued_by
             FROM schedules WHERE actuator_id = ?1 AND schedule_date = ?2
             ORDER BY start_time",
        )?;
        let rows = stmt.query_map(params![actuator_id, date], schedule_from_row)?;
        collect(rows)
    }

    fn latest_command(&self, actuator_id: i64) -> Result<Option<Command>> {
        let conn = self.conn()?;
        Ok(conn
            .query_row(
                "SELECT id, actuator_id, state, level, issued_by, issued_at, expires_at
                 FROM commands WHERE actuator_id = ?1
                 ORDER BY issued_at DESC, id DESC LIMIT 1",
                [actuator_id],
                command_from_row,
            )
            .optional()?)
    }

    fn insert_command_if_latest(&self, cmd: &NewCommand, seen: Option<i64>) -> Result<Option<i64>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let latest: Option<i64> = tx
            .query_row(
                "SELECT id FROM commands WHERE actuator_id = ?1
                 ORDER BY issued_at DESC, id DESC LIMIT 1",
                [cmd.actuator_id],
                |row| row.get(0),
            )
            .optional()?;
        if latest != seen {
            // A conflicting command landed between read and write; the
            // dropped transaction rolls back and the next tick re-evaluates.
            return Ok(None);
        }
        let id = append_command(&tx, cmd)?;
        tx.commit()?;
        Ok(Some(id))
    }

    fn update_command_expiry(&self, command_id: i64, expires_at: NaiveDateTime) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE commands SET expires_at = ?1 WHERE id = ?2",
            params![expires_at, command_id],
        )?;
        if changed == 0 {
            return Err(VerdantError::CommandNotFound(command_id));
        }
        Ok(())
    }

    fn set_actuator_status(&self, actuator_id: i64, status: SwitchState) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE actuators SET status = ?1 WHERE id = ?2",
            params![status.as_str(), actuator_id],
        )?;
        if changed == 0 {
            return Err(VerdantError::ActuatorNotFound(actuator_id));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Row mapping helpers
// ---------------------------------------------------------------------------

fn append_command(tx: &rusqlite::Transaction<'_>, cmd: &NewCommand) -> Result<i64> {
    tx.execute(
        "INSERT INTO commands (actuator_id, state, level, issued_by, issued_at, expires_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            cmd.actuator_id,
            cmd.state.as_str(),
            cmd.level,
            cmd.issued_by.as_str(),
            cmd.issued_at,
            cmd.expires_at,
        ],
    )?;
    let id = tx.last_insert_rowid();
    let changed = tx.execute(
        "UPDATE actuators SET status = ?1 WHERE id = ?2",
        params![cmd.state.as_str(), cmd.actuator_id],
    )?;
    if changed == 0 {
        return Err(VerdantError::ActuatorNotFound(cmd.actuator_id));
    }
    Ok(id)
}

fn parse_text<T: FromStr>(idx: usize, raw: String) -> rusqlite::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn actuator_from_row(row: &Row<'_>) -> rusqlite::Result<Actuator> {
    let kind: String = row.get(2)?;
    let status: String = row.get(3)?;
    Ok(Actuator {
        id: row.get(0)?,
        name: row.get(1)?,
        kind: parse_text(2, kind)?,
        status: parse_text(3, status)?,
    })
}

fn schedule_from_row(row: &Row<'_>) -> rusqlite::Result<Schedule> {
    Ok(Schedule {
        id: row.get(0)?,
        actuator_id: row.get(1)?,
        date: row.get(2)?,
        start_time: row.get(3)?,
        end_time: row.get(4)?,
        issued_by: row.get(5)?,
    })
}

fn command_from_row(row: &Row<'_>) -> rusqlite::Result<Command> {
    let state: String = row.get(2)?;
    let issued_by: String = row.get(4)?;
    Ok(Command {
        id: row.get(0)?,
        actuator_id: row.get(1)?,
        state: parse_text(2, state)?,
        level: row.get(3)?,
        issued_by: Issuer::from(issued_by),
        issued_at: row.get(5)?,
        expires_at: row.get(6)?,
    })
}

fn collect<T>(rows: impl Iterator<Item = rusqlite::Result<T>>) -> Result<Vec<T>> {
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

// 🗄️ Record Store - Streamer profiles, snapshots and the event log
//
// The import core never touches this module directly: it talks to the
// RecordStore trait, so tests and other backends can stand in for SQLite.

use crate::entities::{NewSnapshot, PeriodType, Snapshot, Streamer, StreamerDraft, StreamerRef};
use crate::error::{LedgerError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::path::Path;

// ============================================================================
// RECORD STORE TRAIT
// ============================================================================

/// Plain CRUD boundary used by the commit stage, the CLI and the server
pub trait RecordStore {
    /// All profiles, highest crystals first
    fn list_streamers(&self) -> Result<Vec<Streamer>>;

    fn get_streamer(&self, id: &str) -> Result<Streamer>;

    fn find_by_streamer_id(&self, streamer_id: &str) -> Result<Option<Streamer>>;

    fn create_streamer(&mut self, draft: &StreamerDraft) -> Result<Streamer>;

    fn update_streamer(&mut self, id: &str, draft: &StreamerDraft) -> Result<Streamer>;

    fn delete_streamer(&mut self, id: &str) -> Result<()>;

    /// Zero every counter of every profile; returns the number of rows touched
    fn clear_monthly(&mut self) -> Result<usize>;

    /// All snapshots, most recent date first
    fn list_snapshots(&self) -> Result<Vec<Snapshot>>;

    fn create_snapshot(&mut self, snapshot: &NewSnapshot) -> Result<Snapshot>;

    fn delete_snapshot(&mut self, id: &str) -> Result<()>;

    /// Identity of every profile, for reconciling an import batch
    fn streamer_refs(&self) -> Result<Vec<StreamerRef>> {
        Ok(self.list_streamers()?.iter().map(StreamerRef::from).collect())
    }
}

// ============================================================================
// EVENT LOG
// ============================================================================

/// Audit trail entry: every mutation of the store is recorded as an event
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Event {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: String,
    pub data: serde_json::Value,
    pub actor: String,
}

impl Event {
    pub fn new(
        event_type: &str,
        entity_type: &str,
        entity_id: &str,
        data: serde_json::Value,
        actor: &str,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            data,
            actor: actor.to_string(),
        }
    }
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // WAL for crash recovery; in-memory databases silently keep "memory"
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // ==========================================================================
    // Streamers
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS streamers (
            id TEXT PRIMARY KEY,
            streamer_id TEXT UNIQUE NOT NULL,
            name TEXT UNIQUE NOT NULL,
            luck_gifts INTEGER NOT NULL DEFAULT 0,
            exclusive_gifts INTEGER NOT NULL DEFAULT 0,
            host_crystals INTEGER NOT NULL DEFAULT 0,
            minutes INTEGER NOT NULL DEFAULT 0,
            effective_days INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Snapshots (per-streamer data kept as JSON text)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS snapshots (
            id TEXT PRIMARY KEY,
            period_type TEXT NOT NULL,
            period_label TEXT NOT NULL,
            snapshot_date TEXT NOT NULL,
            data TEXT NOT NULL,
            total_crystals INTEGER NOT NULL,
            total_host_usd REAL NOT NULL,
            total_agency_usd REAL NOT NULL,
            streamer_count INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE (period_type, period_label)
        )",
        [],
    )?;

    // ==========================================================================
    // Events (audit trail)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            data TEXT NOT NULL,
            actor TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_snapshots_date ON snapshots(snapshot_date)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_type, entity_id)",
        [],
    )?;

    Ok(())
}

/// Insert event into audit trail
pub fn insert_event(conn: &Connection, event: &Event) -> Result<()> {
    let data_json = serde_json::to_string(&event.data)?;

    conn.execute(
        "INSERT INTO events (
            event_id, timestamp, event_type, entity_type, entity_id, data, actor
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            event.event_id,
            event.timestamp.to_rfc3339(),
            event.event_type,
            event.entity_type,
            event.entity_id,
            data_json,
            event.actor,
        ],
    )?;

    Ok(())
}

/// Events for one entity, newest first
pub fn get_events_for_entity(
    conn: &Connection,
    entity_type: &str,
    entity_id: &str,
) -> Result<Vec<Event>> {
    let mut stmt = conn.prepare(
        "SELECT event_id, timestamp, event_type, entity_type, entity_id, data, actor
         FROM events
         WHERE entity_type = ?1 AND entity_id = ?2
         ORDER BY id DESC",
    )?;

    let events = stmt
        .query_map(params![entity_type, entity_id], |row| {
            let data_json: String = row.get(5)?;

            Ok(Event {
                event_id: row.get(0)?,
                timestamp: timestamp_column(row, 1)?,
                event_type: row.get(2)?,
                entity_type: row.get(3)?,
                entity_id: row.get(4)?,
                data: serde_json::from_str(&data_json)
                    .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?,
                actor: row.get(6)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(events)
}

// ============================================================================
// ROW MAPPING
// ============================================================================

fn timestamp_column(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

const STREAMER_COLUMNS: &str = "id, streamer_id, name, luck_gifts, exclusive_gifts, host_crystals,
     minutes, effective_days, created_at, updated_at";

fn streamer_from_row(row: &Row) -> rusqlite::Result<Streamer> {
    Ok(Streamer {
        id: row.get(0)?,
        streamer_id: row.get(1)?,
        name: row.get(2)?,
        luck_gifts: row.get(3)?,
        exclusive_gifts: row.get(4)?,
        host_crystals: row.get(5)?,
        minutes: row.get(6)?,
        effective_days: row.get(7)?,
        created_at: timestamp_column(row, 8)?,
        updated_at: timestamp_column(row, 9)?,
    })
}

const SNAPSHOT_COLUMNS: &str = "id, period_type, period_label, snapshot_date, data, total_crystals,
     total_host_usd, total_agency_usd, streamer_count, created_at";

fn snapshot_from_row(row: &Row) -> rusqlite::Result<Snapshot> {
    let period_type: String = row.get(1)?;
    let snapshot_date: String = row.get(3)?;
    let data_json: String = row.get(4)?;
    let streamer_count: i64 = row.get(8)?;

    Ok(Snapshot {
        id: row.get(0)?,
        period_type: period_type
            .parse::<PeriodType>()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?,
        period_label: row.get(2)?,
        snapshot_date: NaiveDate::parse_from_str(&snapshot_date, "%Y-%m-%d")
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?,
        data: serde_json::from_str(&data_json)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?,
        total_crystals: row.get(5)?,
        total_host_usd: row.get(6)?,
        total_agency_usd: row.get(7)?,
        streamer_count: usize::try_from(streamer_count).unwrap_or(0),
        created_at: timestamp_column(row, 9)?,
    })
}

// ============================================================================
// SQLITE STORE
// ============================================================================

/// Audit row written on the same connection (or transaction) as the change
fn record(
    conn: &Connection,
    actor: &str,
    event_type: &str,
    entity_type: &str,
    entity_id: &str,
    data: serde_json::Value,
) -> Result<()> {
    insert_event(conn, &Event::new(event_type, entity_type, entity_id, data, actor))
}

/// Row writes and their audit events commit together or not at all
pub struct SqliteStore {
    conn: Connection,
    /// Recorded as the actor of every event
    actor: String,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    pub fn from_connection(conn: Connection) -> Result<Self> {
        setup_database(&conn)?;
        Ok(SqliteStore {
            conn,
            actor: "streamer-ledger".to_string(),
        })
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = actor.into();
        self
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn events_for(&self, entity_type: &str, entity_id: &str) -> Result<Vec<Event>> {
        get_events_for_entity(&self.conn, entity_type, entity_id)
    }


    /// Another profile (not `except_id`) already holding this id or name
    fn conflicting_streamer(&self, draft: &StreamerDraft, except_id: Option<&str>) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM streamers
             WHERE (streamer_id = ?1 OR name = ?2) AND id != ?3",
            params![draft.streamer_id, draft.name, except_id.unwrap_or("")],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

impl RecordStore for SqliteStore {
    fn list_streamers(&self) -> Result<Vec<Streamer>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM streamers ORDER BY host_crystals DESC, name ASC",
            STREAMER_COLUMNS
        ))?;

        let streamers = stmt
            .query_map([], streamer_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(streamers)
    }

    fn get_streamer(&self, id: &str) -> Result<Streamer> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM streamers WHERE id = ?1", STREAMER_COLUMNS),
                params![id],
                streamer_from_row,
            )
            .optional()?
            .ok_or_else(|| LedgerError::NotFound(format!("streamer {}", id)))
    }

    fn find_by_streamer_id(&self, streamer_id: &str) -> Result<Option<Streamer>> {
        let streamer = self
            .conn
            .query_row(
                &format!("SELECT {} FROM streamers WHERE streamer_id = ?1", STREAMER_COLUMNS),
                params![streamer_id],
                streamer_from_row,
            )
            .optional()?;
        Ok(streamer)
    }

    fn create_streamer(&mut self, draft: &StreamerDraft) -> Result<Streamer> {
        if self.conflicting_streamer(draft, None)? {
            return Err(LedgerError::DuplicateStreamer {
                streamer_id: draft.streamer_id.clone(),
                name: draft.name.clone(),
            });
        }

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO streamers (
                id, streamer_id, name, luck_gifts, exclusive_gifts, host_crystals,
                minutes, effective_days, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
            params![
                id,
                draft.streamer_id,
                draft.name,
                draft.luck_gifts,
                draft.exclusive_gifts,
                draft.host_crystals,
                draft.minutes,
                draft.effective_days,
                now,
            ],
        )?;

        record(&tx, &self.actor, "streamer_created", "streamer", &id, serde_json::to_value(draft)?)?;
        tx.commit()?;

        self.get_streamer(&id)
    }

    fn update_streamer(&mut self, id: &str, draft: &StreamerDraft) -> Result<Streamer> {
        if self.conflicting_streamer(draft, Some(id))? {
            return Err(LedgerError::DuplicateStreamer {
                streamer_id: draft.streamer_id.clone(),
                name: draft.name.clone(),
            });
        }

        let tx = self.conn.transaction()?;
        let changed = tx.execute(
            "UPDATE streamers SET
                streamer_id = ?2, name = ?3, luck_gifts = ?4, exclusive_gifts = ?5,
                host_crystals = ?6, minutes = ?7, effective_days = ?8, updated_at = ?9
             WHERE id = ?1",
            params![
                id,
                draft.streamer_id,
                draft.name,
                draft.luck_gifts,
                draft.exclusive_gifts,
                draft.host_crystals,
                draft.minutes,
                draft.effective_days,
                Utc::now().to_rfc3339(),
            ],
        )?;

        if changed == 0 {
            return Err(LedgerError::NotFound(format!("streamer {}", id)));
        }

        record(&tx, &self.actor, "streamer_updated", "streamer", id, serde_json::to_value(draft)?)?;
        tx.commit()?;

        self.get_streamer(id)
    }

    fn delete_streamer(&mut self, id: &str) -> Result<()> {
        let tx = self.conn.transaction()?;
        let removed = tx.execute("DELETE FROM streamers WHERE id = ?1", params![id])?;
        if removed == 0 {
            return Err(LedgerError::NotFound(format!("streamer {}", id)));
        }

        record(&tx, &self.actor, "streamer_deleted", "streamer", id, serde_json::Value::Null)?;
        tx.commit()?;
        Ok(())
    }

    fn clear_monthly(&mut self) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let cleared = tx.execute(
            "UPDATE streamers SET
                luck_gifts = 0, exclusive_gifts = 0, host_crystals = 0,
                minutes = 0, effective_days = 0, updated_at = ?1",
            params![Utc::now().to_rfc3339()],
        )?;

        record(
            &tx,
            &self.actor,
            "monthly_cleared",
            "streamer",
            "*",
            serde_json::json!({ "streamers": cleared }),
        )?;
        tx.commit()?;
        Ok(cleared)
    }

    fn list_snapshots(&self) -> Result<Vec<Snapshot>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM snapshots ORDER BY snapshot_date DESC, created_at DESC",
            SNAPSHOT_COLUMNS
        ))?;

        let snapshots = stmt
            .query_map([], snapshot_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(snapshots)
    }

    fn create_snapshot(&mut self, snapshot: &NewSnapshot) -> Result<Snapshot> {
        let exists: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM snapshots WHERE period_type = ?1 AND period_label = ?2",
            params![snapshot.period_type.as_str(), snapshot.period_label],
            |row| row.get(0),
        )?;
        if exists > 0 {
            return Err(LedgerError::DuplicateSnapshot(snapshot.period_label.clone()));
        }

        let id = uuid::Uuid::new_v4().to_string();

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO snapshots (
                id, period_type, period_label, snapshot_date, data, total_crystals,
                total_host_usd, total_agency_usd, streamer_count, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                id,
                snapshot.period_type.as_str(),
                snapshot.period_label,
                snapshot.snapshot_date.format("%Y-%m-%d").to_string(),
                serde_json::to_string(&snapshot.data)?,
                snapshot.total_crystals,
                snapshot.total_host_usd,
                snapshot.total_agency_usd,
                snapshot.streamer_count as i64,
                Utc::now().to_rfc3339(),
            ],
        )?;

        record(
            &tx,
            &self.actor,
            "snapshot_created",
            "snapshot",
            &id,
            serde_json::json!({
                "period_type": snapshot.period_type,
                "period_label": snapshot.period_label,
                "streamer_count": snapshot.streamer_count,
            }),
        )?;
        tx.commit()?;

        self.conn
            .query_row(
                &format!("SELECT {} FROM snapshots WHERE id = ?1", SNAPSHOT_COLUMNS),
                params![id],
                snapshot_from_row,
            )
            .map_err(LedgerError::from)
    }

    fn delete_snapshot(&mut self, id: &str) -> Result<()> {
        let tx = self.conn.transaction()?;
        let removed = tx.execute("DELETE FROM snapshots WHERE id = ?1", params![id])?;
        if removed == 0 {
            return Err(LedgerError::NotFound(format!("snapshot {}", id)));
        }

        record(&tx, &self.actor, "snapshot_deleted", "snapshot", id, serde_json::Value::Null)?;
        tx.commit()?;
        Ok(())
    }
}

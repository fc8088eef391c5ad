use std::collections::HashMap;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::ViolationEvent;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";
const TIMESTAMP_PARSE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Where accepted violations go.
///
/// `save_violation` must be all-or-nothing: a failed save leaves no partial
/// record behind.
pub trait ViolationSink {
    /// Workshop number owning `camera_id`, or `None` when the camera is unknown.
    fn resolve_workshop(&mut self, camera_id: i64) -> Result<Option<i64>>;

    /// Persist one violation and return its report id.
    fn save_violation(&mut self, event: &ViolationEvent) -> Result<i64>;
}

/// One stored report joined with its workshop, without the photo.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReportSummary {
    pub report_id: i64,
    pub camera_id: i64,
    pub violation_time: NaiveDateTime,
    pub violation_type: String,
    pub workshop_number: i64,
    pub photo_sha256: String,
}

/// A registered workshop and the cameras attached to it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WorkshopSummary {
    pub workshop_id: i64,
    pub workshop_number: i64,
    pub camera_ids: Vec<i64>,
}

pub struct SqliteViolationStore {
    conn: Connection,
}

impl SqliteViolationStore {
    /// Open (or create) a store. `file:` URIs are opened in URI mode so shared
    /// in-memory databases work in tests.
    pub fn open(db_path: &str) -> Result<Self> {
        let conn = if db_path.starts_with("file:") {
            Connection::open_with_flags(
                db_path,
                OpenFlags::SQLITE_OPEN_READ_WRITE
                    | OpenFlags::SQLITE_OPEN_CREATE
                    | OpenFlags::SQLITE_OPEN_URI,
            )
        } else {
            Connection::open(db_path)
        }
        .with_context(|| format!("failed to open violation store {}", db_path))?;
        let mut store = Self { conn };
        store.ensure_schema()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let mut store = Self {
            conn: Connection::open_in_memory()?,
        };
        store.ensure_schema()?;
        Ok(store)
    }

    fn ensure_schema(&mut self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA foreign_keys=ON;

            CREATE TABLE IF NOT EXISTS workshops (
              workshop_id INTEGER PRIMARY KEY AUTOINCREMENT,
              workshop_number INTEGER NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS cameras (
              camera_id INTEGER PRIMARY KEY,
              workshop_id INTEGER NOT NULL REFERENCES workshops(workshop_id)
            );

            CREATE TABLE IF NOT EXISTS reports (
              report_id INTEGER PRIMARY KEY AUTOINCREMENT,
              camera_id INTEGER NOT NULL REFERENCES cameras(camera_id),
              violation_time TEXT NOT NULL,
              violation_type TEXT NOT NULL,
              photo BLOB NOT NULL,
              photo_sha256 BLOB NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_reports_time ON reports(violation_time);
            "#,
        )?;
        Ok(())
    }

    /// Register a workshop and return its internal id.
    pub fn add_workshop(&mut self, workshop_number: i64) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO workshops(workshop_number) VALUES (?1)",
                params![workshop_number],
            )
            .with_context(|| format!("failed to add workshop {}", workshop_number))?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Attach a camera to an existing workshop, identified by its number.
    pub fn add_camera(&mut self, camera_id: i64, workshop_number: i64) -> Result<()> {
        let workshop_id: i64 = self
            .conn
            .query_row(
                "SELECT workshop_id FROM workshops WHERE workshop_number = ?1",
                params![workshop_number],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| anyhow!("workshop {} is not registered", workshop_number))?;
        self.conn
            .execute(
                "INSERT INTO cameras(camera_id, workshop_id) VALUES (?1, ?2)",
                params![camera_id, workshop_id],
            )
            .with_context(|| format!("failed to add camera {}", camera_id))?;
        Ok(())
    }

    /// All workshops ordered by number, with their cameras.
    pub fn list_workshops(&self) -> Result<Vec<WorkshopSummary>> {
        let mut workshops: Vec<WorkshopSummary> = Vec::new();
        let mut stmt = self.conn.prepare(
            "SELECT workshop_id, workshop_number FROM workshops ORDER BY workshop_number",
        )?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            workshops.push(WorkshopSummary {
                workshop_id: row.get(0)?,
                workshop_number: row.get(1)?,
                camera_ids: Vec::new(),
            });
        }

        let mut stmt = self
            .conn
            .prepare("SELECT camera_id, workshop_id FROM cameras ORDER BY camera_id")?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let camera_id: i64 = row.get(0)?;
            let workshop_id: i64 = row.get(1)?;
            if let Some(workshop) = workshops
                .iter_mut()
                .find(|w| w.workshop_id == workshop_id)
            {
                workshop.camera_ids.push(camera_id);
            }
        }
        Ok(workshops)
    }

    /// All reports, newest first.
    pub fn list_reports(&self) -> Result<Vec<ReportSummary>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT r.report_id, r.camera_id, r.violation_time, r.violation_type,
                   w.workshop_number, r.photo_sha256
            FROM reports r
            JOIN cameras c ON r.camera_id = c.camera_id
            JOIN workshops w ON c.workshop_id = w.workshop_id
            ORDER BY r.violation_time DESC, r.report_id DESC
            "#,
        )?;
        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let time: String = row.get(2)?;
            let digest: Vec<u8> = row.get(5)?;
            out.push(ReportSummary {
                report_id: row.get(0)?,
                camera_id: row.get(1)?,
                violation_time: parse_timestamp(&time)?,
                violation_type: row.get(3)?,
                workshop_number: row.get(4)?,
                photo_sha256: hex::encode(digest),
            });
        }
        Ok(out)
    }

    /// Evidence still for a report, if the report exists.
    pub fn report_photo(&self, report_id: i64) -> Result<Option<Vec<u8>>> {
        Ok(self
            .conn
            .query_row(
                "SELECT photo FROM reports WHERE report_id = ?1",
                params![report_id],
                |row| row.get(0),
            )
            .optional()?)
    }

    pub fn report_count(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM reports", [], |row| row.get(0))?)
    }
}

impl ViolationSink for SqliteViolationStore {
    fn resolve_workshop(&mut self, camera_id: i64) -> Result<Option<i64>> {
        Ok(self
            .conn
            .query_row(
                r#"
                SELECT w.workshop_number
                FROM cameras c
                JOIN workshops w ON c.workshop_id = w.workshop_id
                WHERE c.camera_id = ?1
                "#,
                params![camera_id],
                |row| row.get(0),
            )
            .optional()?)
    }

    fn save_violation(&mut self, event: &ViolationEvent) -> Result<i64> {
        let digest: [u8; 32] = Sha256::digest(&event.image).into();
        let tx = self.conn.transaction()?;
        tx.execute(
            r#"
            INSERT INTO reports(camera_id, violation_time, violation_type, photo, photo_sha256)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                event.camera_id,
                format_timestamp(event.timestamp),
                event.violation_type,
                event.image,
                digest.to_vec()
            ],
        )?;
        let report_id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(report_id)
    }
}

fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

fn parse_timestamp(raw: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_PARSE_FORMAT)
        .map_err(|e| anyhow!("corrupt report timestamp {:?}: {}", raw, e))
}

// ----------------------------------------------------------------------------
// In-memory sink for tests
// ----------------------------------------------------------------------------

#[derive(Clone, Debug, Default)]
pub struct InMemoryViolationStore {
    cameras: HashMap<i64, i64>,
    reports: Vec<ViolationEvent>,
    fail_saves: bool,
}

impl InMemoryViolationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_camera(mut self, camera_id: i64, workshop_number: i64) -> Self {
        self.cameras.insert(camera_id, workshop_number);
        self
    }

    /// Make every subsequent save fail without storing anything.
    pub fn fail_saves(mut self, fail: bool) -> Self {
        self.fail_saves = fail;
        self
    }

    pub fn reports(&self) -> &[ViolationEvent] {
        &self.reports
    }
}

impl ViolationSink for InMemoryViolationStore {
    fn resolve_workshop(&mut self, camera_id: i64) -> Result<Option<i64>> {
        Ok(self.cameras.get(&camera_id).copied())
    }

    fn save_violation(&mut self, event: &ViolationEvent) -> Result<i64> {
        if self.fail_saves {
            return Err(anyhow!("in-memory store rejects writes"));
        }
        self.reports.push(event.clone());
        Ok(self.reports.len() as i64)
    }
}

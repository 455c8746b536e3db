// 🗄️ Entity Store - SQLite schema, audit trail, import ledger, read queries
//
// Entity CRUD lives next to each entity (src/entities/*). This module owns
// the schema and everything that spans more than one table.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Current time as stored in every `*_at` column.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339()
}

/// Open (or create) the store at `path` and make sure the schema exists.
pub fn open(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database {}", path.display()))?;
    setup_database(&conn)?;
    Ok(conn)
}

/// In-memory store with the full schema. Used by tests and dry runs.
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    setup_database(&conn)?;
    Ok(conn)
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // WAL for crash recovery; in-memory databases answer "memory" here
    conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS political_organizations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            code TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            acronym TEXT,
            organization_type TEXT,
            status TEXT,
            registration_date TEXT,
            cancellation_date TEXT,
            website TEXT,
            address TEXT,
            logo_url TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS electoral_districts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            code TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            district_type TEXT NOT NULL,
            seats_count INTEGER,
            ubigeo TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS candidates (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            political_organization_id INTEGER NOT NULL
                REFERENCES political_organizations(id) ON DELETE CASCADE,
            electoral_district_id INTEGER
                REFERENCES electoral_districts(id) ON DELETE SET NULL,
            position_type TEXT NOT NULL,
            position_number INTEGER,
            document_type TEXT,
            document_number TEXT NOT NULL,
            first_name TEXT,
            paternal_surname TEXT,
            maternal_surname TEXT,
            gender TEXT,
            birth_date TEXT,
            is_native TEXT,
            status TEXT,
            photo_guid TEXT,
            photo_filename TEXT,
            department TEXT,
            province TEXT,
            district TEXT,
            electoral_file_code TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        -- Audit trail: every create/update done by the reconciler
        CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            data TEXT NOT NULL,
            actor TEXT NOT NULL
        );

        -- One row per import run
        CREATE TABLE IF NOT EXISTS import_runs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            run_id TEXT UNIQUE NOT NULL,
            source TEXT NOT NULL,
            source_sha256 TEXT NOT NULL,
            shape TEXT NOT NULL,
            started_at TEXT NOT NULL,
            finished_at TEXT NOT NULL,
            processed INTEGER NOT NULL,
            created INTEGER NOT NULL,
            updated INTEGER NOT NULL,
            skipped INTEGER NOT NULL,
            errors INTEGER NOT NULL
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_candidates_natural_key
            ON candidates(document_number, position_type, political_organization_id);
        CREATE INDEX IF NOT EXISTS idx_candidates_position_type ON candidates(position_type);
        CREATE INDEX IF NOT EXISTS idx_candidates_status ON candidates(status);
        CREATE INDEX IF NOT EXISTS idx_candidates_department ON candidates(department);
        CREATE INDEX IF NOT EXISTS idx_candidates_district ON candidates(electoral_district_id);
        CREATE INDEX IF NOT EXISTS idx_organizations_name ON political_organizations(name);
        CREATE INDEX IF NOT EXISTS idx_districts_name ON electoral_districts(name);
        CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_type, entity_id);",
    )?;

    Ok(())
}

// ============================================================================
// AUDIT TRAIL
// ============================================================================

/// Event for audit trail ("every change is an event")
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

/// Get events for a specific entity, newest first
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

    let rows = stmt
        .query_map(params![entity_type, entity_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(event_id, timestamp, event_type, entity_type, entity_id, data, actor)| -> Result<Event> {
            Ok(Event {
                event_id,
                timestamp: DateTime::parse_from_rfc3339(&timestamp)
                    .with_context(|| format!("Bad event timestamp: {}", timestamp))?
                    .with_timezone(&Utc),
                event_type,
                entity_type,
                entity_id,
                data: serde_json::from_str(&data).context("Bad event payload")?,
                actor,
            })
        })
        .collect()
}

// ============================================================================
// IMPORT LEDGER
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRun {
    pub run_id: String,
    pub source: String,
    pub source_sha256: String,
    pub shape: String,
    pub started_at: String,
    pub finished_at: String,
    pub processed: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub errors: usize,
}

pub fn insert_import_run(conn: &Connection, run: &ImportRun) -> Result<()> {
    conn.execute(
        "INSERT INTO import_runs (
            run_id, source, source_sha256, shape, started_at, finished_at,
            processed, created, updated, skipped, errors
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            run.run_id,
            run.source,
            run.source_sha256,
            run.shape,
            run.started_at,
            run.finished_at,
            run.processed as i64,
            run.created as i64,
            run.updated as i64,
            run.skipped as i64,
            run.errors as i64,
        ],
    )?;
    Ok(())
}

pub fn recent_import_runs(conn: &Connection, limit: usize) -> Result<Vec<ImportRun>> {
    let mut stmt = conn.prepare(
        "SELECT run_id, source, source_sha256, shape, started_at, finished_at,
                processed, created, updated, skipped, errors
         FROM import_runs
         ORDER BY id DESC
         LIMIT ?1",
    )?;

    let runs = stmt
        .query_map(params![limit as i64], |row| {
            Ok(ImportRun {
                run_id: row.get(0)?,
                source: row.get(1)?,
                source_sha256: row.get(2)?,
                shape: row.get(3)?,
                started_at: row.get(4)?,
                finished_at: row.get(5)?,
                processed: row.get::<_, i64>(6)? as usize,
                created: row.get::<_, i64>(7)? as usize,
                updated: row.get::<_, i64>(8)? as usize,
                skipped: row.get::<_, i64>(9)? as usize,
                errors: row.get::<_, i64>(10)? as usize,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(runs)
}

// ============================================================================
// COUNTS & BREAKDOWNS
// ============================================================================

pub fn count_rows(conn: &Connection, table: Table) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) FROM {}", table.name());
    let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
    Ok(count)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Organizations,
    Districts,
    Candidates,
    Events,
}

impl Table {
    fn name(&self) -> &'static str {
        match self {
            Table::Organizations => "political_organizations",
            Table::Districts => "electoral_districts",
            Table::Candidates => "candidates",
            Table::Events => "events",
        }
    }
}

/// Candidates per position type, largest first.
pub fn count_candidates_by_position(conn: &Connection) -> Result<Vec<(String, i64)>> {
    let mut stmt = conn.prepare(
        "SELECT position_type, COUNT(*) AS n
         FROM candidates
         GROUP BY position_type
         ORDER BY n DESC, position_type",
    )?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Candidates per electoral district name, largest first. Candidates
/// without a district are not included (see `count_candidates_without_district`).
pub fn count_candidates_by_district(
    conn: &Connection,
    position_type: Option<&str>,
) -> Result<Vec<(String, i64)>> {
    let mut stmt = conn.prepare(
        "SELECT d.name, COUNT(*) AS n
         FROM candidates c
         JOIN electoral_districts d ON d.id = c.electoral_district_id
         WHERE ?1 IS NULL OR c.position_type = ?1
         GROUP BY d.name
         ORDER BY n DESC, d.name",
    )?;
    let rows = stmt
        .query_map(params![position_type], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn count_candidates_without_district(
    conn: &Connection,
    position_type: Option<&str>,
) -> Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM candidates
         WHERE electoral_district_id IS NULL AND (?1 IS NULL OR position_type = ?1)",
        params![position_type],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn total_seats(conn: &Connection) -> Result<i64> {
    let seats: Option<i64> = conn.query_row(
        "SELECT SUM(seats_count) FROM electoral_districts",
        [],
        |row| row.get(0),
    )?;
    Ok(seats.unwrap_or(0))
}

pub fn count_organizations_with_status(conn: &Connection, status: &str) -> Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM political_organizations WHERE status = ?1",
        params![status],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Copy the whole store into a standalone file (works with WAL enabled).
pub fn backup_to(conn: &Connection, destination: &Path) -> Result<()> {
    if destination.exists() {
        anyhow::bail!("Backup target already exists: {}", destination.display());
    }
    let target = destination
        .to_str()
        .with_context(|| format!("Non UTF-8 backup path: {}", destination.display()))?;
    conn.execute("VACUUM INTO ?1", params![target])
        .with_context(|| format!("Failed to write backup {}", destination.display()))?;
    Ok(())
}

// ============================================================================
// CANDIDATE LISTING
// ============================================================================

/// Statuses shown in the public listing
pub const ACTIVE_STATUSES: [&str; 2] = ["INSCRITO", "ADMITIDO"];

/// District filter value meaning "candidates without district" (national lists)
pub const NATIONAL_DISTRICT_FILTER: &str = "nacional";

#[derive(Debug, Clone, Default)]
pub struct CandidateFilter {
    pub position_type: Option<String>,
    pub organization_code: Option<String>,
    /// District code, or `nacional` for candidates without district
    pub district: Option<String>,
    /// Substring match on name parts and document number
    pub search: Option<String>,
    pub include_inactive: bool,
}

/// One row of the candidate listing, joined with its organization and district.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateRow {
    pub position_type: String,
    pub position_number: Option<i64>,
    pub document_number: String,
    pub full_name: String,
    pub organization_code: String,
    pub organization_name: String,
    pub electoral_district: Option<String>,
    pub department: Option<String>,
    pub status: Option<String>,
}

pub fn search_candidates(conn: &Connection, filter: &CandidateFilter) -> Result<Vec<CandidateRow>> {
    let mut sql = String::from(
        "SELECT c.position_type, c.position_number, c.document_number,
                c.first_name, c.paternal_surname, c.maternal_surname,
                o.code, o.name, d.name, c.department, c.status
         FROM candidates c
         JOIN political_organizations o ON o.id = c.political_organization_id
         LEFT JOIN electoral_districts d ON d.id = c.electoral_district_id
         WHERE 1 = 1",
    );
    let mut args: Vec<String> = Vec::new();

    if !filter.include_inactive {
        sql.push_str(" AND c.status IN ('INSCRITO', 'ADMITIDO')");
    }
    if let Some(position) = &filter.position_type {
        args.push(position.clone());
        sql.push_str(&format!(" AND c.position_type = ?{}", args.len()));
    }
    if let Some(code) = &filter.organization_code {
        args.push(code.clone());
        sql.push_str(&format!(" AND o.code = ?{}", args.len()));
    }
    match filter.district.as_deref() {
        Some(NATIONAL_DISTRICT_FILTER) => sql.push_str(" AND c.electoral_district_id IS NULL"),
        Some(code) => {
            args.push(code.to_string());
            sql.push_str(&format!(" AND d.code = ?{}", args.len()));
        }
        None => {}
    }
    if let Some(term) = filter.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        args.push(format!("%{}%", term));
        let n = args.len();
        sql.push_str(&format!(
            " AND (c.first_name LIKE ?{n} OR c.paternal_surname LIKE ?{n}
                   OR c.maternal_surname LIKE ?{n} OR c.document_number LIKE ?{n})"
        ));
    }
    sql.push_str(
        " ORDER BY c.position_type, c.position_number, c.paternal_surname,
                   c.maternal_surname, c.first_name",
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(args.iter()), |row| {
            let parts: Vec<Option<String>> = vec![row.get(3)?, row.get(4)?, row.get(5)?];
            Ok(CandidateRow {
                position_type: row.get(0)?,
                position_number: row.get(1)?,
                document_number: row.get(2)?,
                full_name: crate::entities::join_name_parts(&parts),
                organization_code: row.get(6)?,
                organization_name: row.get(7)?,
                electoral_district: row.get(8)?,
                department: row.get(9)?,
                status: row.get(10)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Name of the district a candidate points at, if any.
pub fn district_name_for_candidate(conn: &Connection, candidate_id: i64) -> Result<Option<String>> {
    let name = conn
        .query_row(
            "SELECT d.name FROM candidates c
             JOIN electoral_districts d ON d.id = c.electoral_district_id
             WHERE c.id = ?1",
            params![candidate_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(name)
}

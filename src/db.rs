// 🗄️ Run Archive - RunOutput → SQLite (WAL)
//
// Optional persistence of resolved runs. A run is keyed by the SHA-256 of its
// property id + input; archiving the same input twice inserts nothing
// (UNIQUE run_hash, constraint violation = already archived).
//
// Entities get a deterministic UUID v5 from "<property_id>/<record_ref>" so
// the same owner record of the same property keeps one identity across runs.

use crate::entities::CanonicalEntity;
use crate::error::Result;
use crate::run::RunOutput;
use chrono::Utc;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::{debug, info};
use uuid::Uuid;

// ============================================================================
// IDENTITY & HASHING
// ============================================================================

/// Idempotency hash of one run's input
pub fn compute_run_hash(property_id: &str, input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(property_id.as_bytes());
    hasher.update([0u8]);
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Stable UUID for an owner record of a property
pub fn entity_uuid(property_id: &str, entity: &CanonicalEntity) -> Uuid {
    let name = format!("{}/{}", property_id, entity.id.record_ref());
    Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes())
}

// ============================================================================
// SCHEMA
// ============================================================================

/// Open (or create) an archive file and make sure the schema exists
pub fn open_archive<P: AsRef<Path>>(path: P) -> Result<Connection> {
    let conn = Connection::open(path)?;
    setup_database(&conn)?;
    Ok(conn)
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // WAL for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS runs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            run_hash TEXT UNIQUE NOT NULL,
            property_id TEXT NOT NULL,
            county_profile TEXT NOT NULL,
            source_shape TEXT NOT NULL,
            entity_count INTEGER NOT NULL,
            invalid_count INTEGER NOT NULL,
            archived_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS entities (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            run_id INTEGER NOT NULL REFERENCES runs(id),
            entity_uuid TEXT NOT NULL,
            record_ref TEXT NOT NULL,
            kind TEXT NOT NULL,
            display_name TEXT NOT NULL,
            payload TEXT NOT NULL,
            aliases TEXT NOT NULL,
            UNIQUE(run_id, record_ref)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS ownership (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            run_id INTEGER NOT NULL REFERENCES runs(id),
            temporal_key TEXT NOT NULL,
            position INTEGER NOT NULL,
            record_ref TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS invalid_owners (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            run_id INTEGER NOT NULL REFERENCES runs(id),
            raw TEXT NOT NULL,
            reason TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS sale_links (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            run_id INTEGER NOT NULL REFERENCES runs(id),
            sale_index INTEGER NOT NULL,
            transfer_date TEXT,
            role TEXT NOT NULL,
            record_ref TEXT NOT NULL,
            inferred INTEGER NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_runs_property ON runs(property_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_entities_uuid ON entities(entity_uuid)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_ownership_run ON ownership(run_id, temporal_key)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_sale_links_run ON sale_links(run_id, sale_index)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// ARCHIVE
// ============================================================================

/// Store a run. Returns false when a run with the same hash is already archived.
pub fn archive_run(conn: &mut Connection, output: &RunOutput, run_hash: &str) -> Result<bool> {
    let tx = conn.transaction()?;

    let inserted = tx.execute(
        "INSERT INTO runs (
            run_hash, property_id, county_profile, source_shape,
            entity_count, invalid_count, archived_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            run_hash,
            output.property_id,
            output.profile,
            output.shape.as_str(),
            output.entities.len() as i64,
            output.invalid_owners.len() as i64,
            Utc::now().to_rfc3339(),
        ],
    );

    let run_id = match inserted {
        Ok(_) => tx.last_insert_rowid(),
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            debug!(property = %output.property_id, "run already archived");
            return Ok(false);
        }
        Err(e) => return Err(e.into()),
    };

    {
        let mut stmt = tx.prepare(
            "INSERT INTO entities (
                run_id, entity_uuid, record_ref, kind, display_name, payload, aliases
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        for entity in &output.entities {
            stmt.execute(params![
                run_id,
                entity_uuid(&output.property_id, entity).to_string(),
                entity.id.record_ref(),
                entity.kind().as_str(),
                entity.display_name(),
                serde_json::to_string(&entity.payload)?,
                serde_json::to_string(&entity.aliases)?,
            ])?;
        }
    }

    {
        let mut stmt = tx.prepare(
            "INSERT INTO ownership (run_id, temporal_key, position, record_ref)
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        for (key, ids) in output.owners_by_date.iter() {
            for (position, id) in ids.iter().enumerate() {
                stmt.execute(params![run_id, key.to_string(), position as i64, id.record_ref()])?;
            }
        }
    }

    {
        let mut stmt = tx.prepare(
            "INSERT INTO invalid_owners (run_id, raw, reason) VALUES (?1, ?2, ?3)",
        )?;
        for record in &output.invalid_owners {
            stmt.execute(params![run_id, record.raw, record.reason])?;
        }
    }

    if let Some(report) = &output.sales {
        let mut stmt = tx.prepare(
            "INSERT INTO sale_links (
                run_id, sale_index, transfer_date, role, record_ref, inferred
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        for link in &report.links {
            let date = link.date.map(|d| d.format("%Y-%m-%d").to_string());
            let roles = [
                ("grantee", &link.grantees, link.grantee_inferred),
                ("grantor", &link.grantors, link.grantor_inferred),
            ];
            for (role, ids, inferred) in roles {
                for id in ids {
                    stmt.execute(params![
                        run_id,
                        link.sale_index as i64,
                        date,
                        role,
                        id.record_ref(),
                        inferred,
                    ])?;
                }
            }
        }
    }

    tx.commit()?;
    info!(
        property = %output.property_id,
        entities = output.entities.len(),
        "run archived"
    );
    Ok(true)
}

// ============================================================================
// QUERIES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivedRun {
    pub run_hash: String,
    pub property_id: String,
    pub county_profile: String,
    pub source_shape: String,
    pub entity_count: i64,
    pub invalid_count: i64,
    pub archived_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnershipRow {
    pub temporal_key: String,
    pub record_ref: String,
    pub entity_uuid: String,
    pub display_name: String,
}

/// All archived runs, oldest first
pub fn archived_runs(conn: &Connection) -> Result<Vec<ArchivedRun>> {
    let mut stmt = conn.prepare(
        "SELECT run_hash, property_id, county_profile, source_shape,
                entity_count, invalid_count, archived_at
         FROM runs ORDER BY id",
    )?;

    let runs = stmt
        .query_map([], |row| {
            Ok(ArchivedRun {
                run_hash: row.get(0)?,
                property_id: row.get(1)?,
                county_profile: row.get(2)?,
                source_shape: row.get(3)?,
                entity_count: row.get(4)?,
                invalid_count: row.get(5)?,
                archived_at: row.get(6)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(runs)
}

/// owners_by_date rows of one archived run, in stored order
pub fn load_ownership(conn: &Connection, run_hash: &str) -> Result<Vec<OwnershipRow>> {
    let mut stmt = conn.prepare(
        "SELECT o.temporal_key, o.record_ref, e.entity_uuid, e.display_name
         FROM ownership o
         JOIN runs r ON r.id = o.run_id
         JOIN entities e ON e.run_id = o.run_id AND e.record_ref = o.record_ref
         WHERE r.run_hash = ?1
         ORDER BY o.id",
    )?;

    let rows = stmt
        .query_map(params![run_hash], |row| {
            Ok(OwnershipRow {
                temporal_key: row.get(0)?,
                record_ref: row.get(1)?,
                entity_uuid: row.get(2)?,
                display_name: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

pub fn count_rows(conn: &Connection, table: &str) -> Result<i64> {
    let count = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
    Ok(count)
}

// ============================================================================
// TESTS
// ============================================================================

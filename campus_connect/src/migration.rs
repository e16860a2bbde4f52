//! Campus Connect - Store Migrations
//!
//! Versioned schema for the favorites database and the one-shot import of the
//! legacy flat lists (`favoriteCommunityIds` / `favoriteEventIds`).

use std::path::Path;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::error::{CampusError, CampusResult};
use crate::favorites::FavoriteKind;

/// Newest schema this build understands (stored in `PRAGMA user_version`)
pub const SCHEMA_VERSION: i64 = 1;

/// `store_meta` key marking the legacy import as done
pub const LEGACY_MIGRATED_FLAG: &str = "legacy_migrated";

/// Schema steps, index `n` upgrades from version `n` to `n + 1`
const SCHEMA_STEPS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS favorites (
        key TEXT NOT NULL,
        kind TEXT NOT NULL,
        PRIMARY KEY (key, kind)
    );

    CREATE TABLE IF NOT EXISTS store_meta (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_favorites_kind ON favorites(kind);
    "#,
];

// ═══════════════════════════════════════════════════════════════════════════════
// LEGACY FORMAT
// ═══════════════════════════════════════════════════════════════════════════════

/// Legacy favorites: two flat key lists stored under fixed names
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyFavorites {
    #[serde(rename = "favoriteCommunityIds", default)]
    pub community_keys: Vec<String>,
    #[serde(rename = "favoriteEventIds", default)]
    pub event_keys: Vec<String>,
}

impl LegacyFavorites {
    /// Read the legacy file. `Ok(None)` when it does not exist.
    pub fn load<P: AsRef<Path>>(path: P) -> CampusResult<Option<Self>> {
        let path = path.as_ref();

        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if data.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }

        serde_json::from_slice(&data)
            .map(Some)
            .map_err(|e| CampusError::LegacyFormat(format!("{}: {}", path.display(), e)))
    }

    /// Write the legacy file (used by tooling and tests to seed old installs)
    pub fn save<P: AsRef<Path>>(&self, path: P) -> CampusResult<()> {
        std::fs::write(path, serde_json::to_vec_pretty(self)?)?;
        Ok(())
    }

    /// Every non-blank (kind, key) entry
    pub fn entries(&self) -> impl Iterator<Item = (FavoriteKind, &str)> + '_ {
        let communities = self
            .community_keys
            .iter()
            .map(|k| (FavoriteKind::Community, k.as_str()));
        let events = self
            .event_keys
            .iter()
            .map(|k| (FavoriteKind::Event, k.as_str()));

        communities
            .chain(events)
            .filter(|(_, key)| !key.trim().is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.entries().next().is_none()
    }
}

/// What the legacy step did on this open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyMigration {
    /// Flag was already set
    AlreadyDone,
    /// No legacy file; flag set so we never look again
    NothingToImport,
    /// Entries imported (count of newly inserted records)
    Imported(usize),
}

// ═══════════════════════════════════════════════════════════════════════════════
// SCHEMA
// ═══════════════════════════════════════════════════════════════════════════════

/// Current `user_version` of the database
pub fn schema_version(conn: &Connection) -> CampusResult<i64> {
    Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
}

/// Bring the schema up to [`SCHEMA_VERSION`], one transaction per step
pub fn apply_schema(conn: &mut Connection) -> CampusResult<i64> {
    let mut version = schema_version(conn)?;

    if version < 0 {
        return Err(CampusError::DatabaseError(format!(
            "invalid schema version {}",
            version
        )));
    }

    if version > SCHEMA_VERSION {
        return Err(CampusError::SchemaTooNew {
            found: version,
            supported: SCHEMA_VERSION,
        });
    }

    while version < SCHEMA_VERSION {
        let step = SCHEMA_STEPS[version as usize];
        let tx = conn.transaction()?;
        tx.execute_batch(step)?;
        tx.pragma_update(None, "user_version", version + 1)?;
        tx.commit()?;

        version += 1;
        log::info!("Favorites schema upgraded to v{}", version);
    }

    Ok(version)
}

// ═══════════════════════════════════════════════════════════════════════════════
// LEGACY IMPORT
// ═══════════════════════════════════════════════════════════════════════════════

/// Whether the legacy import has completed on this database
pub fn legacy_migrated(conn: &Connection) -> CampusResult<bool> {
    let value: Option<String> = conn
        .query_row(
            "SELECT value FROM store_meta WHERE key = ?1",
            params![LEGACY_MIGRATED_FLAG],
            |row| row.get(0),
        )
        .optional()?;

    Ok(value.as_deref() == Some("1"))
}

/// Upsert every legacy entry, then set the flag, in one transaction.
///
/// Safe to repeat: upserts ignore existing (key, kind) pairs.
pub fn import_legacy(conn: &mut Connection, legacy: &LegacyFavorites) -> CampusResult<usize> {
    let tx = conn.transaction()?;
    let mut inserted = 0;

    {
        let mut stmt = tx.prepare("INSERT OR IGNORE INTO favorites (key, kind) VALUES (?1, ?2)")?;
        for (kind, key) in legacy.entries() {
            inserted += stmt.execute(params![key, kind.as_str()])?;
        }
    }

    tx.execute(
        "INSERT OR REPLACE INTO store_meta (key, value) VALUES (?1, '1')",
        params![LEGACY_MIGRATED_FLAG],
    )?;
    tx.commit()?;

    Ok(inserted)
}

/// Run the legacy import unless the flag says it already happened.
///
/// A corrupt legacy file is an error and leaves the flag unset, so the next
/// open tries again.
pub fn migrate_legacy(conn: &mut Connection, legacy_path: &Path) -> CampusResult<LegacyMigration> {
    if legacy_migrated(conn)? {
        return Ok(LegacyMigration::AlreadyDone);
    }

    match LegacyFavorites::load(legacy_path)? {
        Some(legacy) => {
            let inserted = import_legacy(conn, &legacy)?;
            log::info!(
                "Imported {} legacy favorites from {}",
                inserted,
                legacy_path.display()
            );
            Ok(LegacyMigration::Imported(inserted))
        }
        None => {
            import_legacy(conn, &LegacyFavorites::default())?;
            Ok(LegacyMigration::NothingToImport)
        }
    }
}

//! Campus Connect - Favorites Store
//!
//! Per-kind sets of favorited keys, written through to SQLite on every change.
//! Keys may be display names (older installs) or stable ids; lookups accept both.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use crate::catalog::Favoritable;
use crate::error::{CampusError, CampusResult};
use crate::migration::{self, LegacyFavorites, LegacyMigration};

/// Favorite category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FavoriteKind {
    Community,
    Event,
}

impl FavoriteKind {
    pub const ALL: [FavoriteKind; 2] = [FavoriteKind::Community, FavoriteKind::Event];

    /// Value stored in the `kind` column
    pub const fn as_str(&self) -> &'static str {
        match self {
            FavoriteKind::Community => "community",
            FavoriteKind::Event => "event",
        }
    }
}

impl fmt::Display for FavoriteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FavoriteKind {
    type Err = CampusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "community" | "communities" => Ok(FavoriteKind::Community),
            "event" | "events" => Ok(FavoriteKind::Event),
            other => Err(CampusError::UnknownKind(other.to_string())),
        }
    }
}

/// One stored favorite; (key, kind) is unique
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FavoriteRecord {
    pub key: String,
    pub kind: FavoriteKind,
}

/// Connection plus the in-memory mirror, always locked together
struct StoreInner {
    conn: Connection,
    sets: HashMap<FavoriteKind, HashSet<String>>,
}

impl StoreInner {
    fn contains(&self, key: &str, kind: FavoriteKind) -> bool {
        self.sets.get(&kind).map_or(false, |set| set.contains(key))
    }

    /// Insert and persist. Failures are logged, memory only changes on success.
    fn insert(&mut self, key: &str, kind: FavoriteKind) -> bool {
        if self.contains(key, kind) {
            return true;
        }

        let written = self.conn.execute(
            "INSERT OR IGNORE INTO favorites (key, kind) VALUES (?1, ?2)",
            params![key, kind.as_str()],
        );

        match written {
            Ok(_) => {
                self.sets.entry(kind).or_default().insert(key.to_string());
                log::info!("Added {} '{}' to favorites", kind, key);
                true
            }
            Err(e) => {
                log::error!("Failed to save favorite {} '{}': {}", kind, key, e);
                false
            }
        }
    }

    /// Delete and persist. Returns true when the key is no longer favorited.
    fn delete(&mut self, key: &str, kind: FavoriteKind) -> bool {
        if !self.contains(key, kind) {
            return true;
        }

        let written = self.conn.execute(
            "DELETE FROM favorites WHERE key = ?1 AND kind = ?2",
            params![key, kind.as_str()],
        );

        match written {
            Ok(_) => {
                if let Some(set) = self.sets.get_mut(&kind) {
                    set.remove(key);
                }
                log::info!("Removed {} '{}' from favorites", kind, key);
                true
            }
            Err(e) => {
                log::error!("Failed to remove favorite {} '{}': {}", kind, key, e);
                false
            }
        }
    }

    fn reload(&mut self) -> CampusResult<()> {
        self.sets = load_sets(&self.conn)?;
        Ok(())
    }
}

fn load_sets(conn: &Connection) -> CampusResult<HashMap<FavoriteKind, HashSet<String>>> {
    let mut stmt = conn.prepare("SELECT key, kind FROM favorites")?;
    let rows = stmt.query_map([], |row| {
        let key: String = row.get(0)?;
        let kind: String = row.get(1)?;
        Ok((key, kind))
    })?;

    let mut sets: HashMap<FavoriteKind, HashSet<String>> = HashMap::new();
    for row in rows {
        let (key, kind) = row?;
        match kind.parse::<FavoriteKind>() {
            Ok(kind) => {
                sets.entry(kind).or_default().insert(key);
            }
            Err(_) => log::warn!("Skipping favorite '{}' with unknown kind '{}'", key, kind),
        }
    }

    Ok(sets)
}

// ═══════════════════════════════════════════════════════════════════════════════
// FAVORITES STORE
// ═══════════════════════════════════════════════════════════════════════════════

/// Favorites store
///
/// Every mutation holds one lock across the set check and the SQLite write, so
/// concurrent callers can never produce a duplicate (key, kind).
pub struct FavoritesStore {
    inner: Mutex<StoreInner>,
    /// Database path (`None` for in-memory stores)
    path: Option<PathBuf>,
}

impl FavoritesStore {
    // ═══════════════════════════════════════════════════════════════════════
    // INITIALIZATION
    // ═══════════════════════════════════════════════════════════════════════

    /// Open (or create) the store, applying schema upgrades and, if a legacy
    /// file is given, the one-time legacy import.
    pub fn open<P: AsRef<Path>>(db_path: P, legacy_path: Option<&Path>) -> CampusResult<Self> {
        let db_path = db_path.as_ref();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(db_path)?;
        let store = Self::from_connection(conn, legacy_path, Some(db_path.to_path_buf()))?;
        log::debug!("Favorites store opened at {}", db_path.display());
        Ok(store)
    }

    /// Store that lives only as long as the process
    pub fn open_in_memory() -> CampusResult<Self> {
        Self::from_connection(Connection::open_in_memory()?, None, None)
    }

    fn from_connection(
        mut conn: Connection,
        legacy_path: Option<&Path>,
        path: Option<PathBuf>,
    ) -> CampusResult<Self> {
        migration::apply_schema(&mut conn)?;

        if let Some(legacy_path) = legacy_path {
            match migration::migrate_legacy(&mut conn, legacy_path) {
                Ok(LegacyMigration::AlreadyDone) => {}
                Ok(outcome) => log::debug!("Legacy migration: {:?}", outcome),
                Err(e) => log::error!(
                    "Legacy favorites migration failed, retrying on next launch: {}",
                    e
                ),
            }
        }

        let sets = load_sets(&conn)?;

        Ok(Self {
            inner: Mutex::new(StoreInner { conn, sets }),
            path,
        })
    }

    /// Database path, if file-backed
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// How long a write waits on a locked database before it fails
    pub fn set_busy_timeout(&self, timeout: Duration) -> CampusResult<()> {
        self.inner.lock().conn.busy_timeout(timeout)?;
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // MUTATIONS
    // ═══════════════════════════════════════════════════════════════════════

    /// Favorite (key, kind). No-op if already present.
    pub fn add(&self, key: &str, kind: FavoriteKind) {
        self.inner.lock().insert(key, kind);
    }

    /// Unfavorite (key, kind). No-op if absent.
    pub fn remove(&self, key: &str, kind: FavoriteKind) {
        self.inner.lock().delete(key, kind);
    }

    /// Flip the favorite state; returns whether it is favorited afterwards
    pub fn toggle(&self, key: &str, kind: FavoriteKind) -> bool {
        let mut inner = self.inner.lock();

        if inner.contains(key, kind) {
            !inner.delete(key, kind)
        } else {
            inner.insert(key, kind)
        }
    }

    /// Re-run the legacy import (idempotent) and refresh the in-memory sets
    pub fn import_legacy(&self, legacy: &LegacyFavorites) -> CampusResult<usize> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        let inserted = migration::import_legacy(&mut inner.conn, legacy)?;
        inner.reload()?;
        Ok(inserted)
    }

    /// Rewrite display-name keys to the candidates' stable ids.
    ///
    /// Runs in one transaction; returns how many keys were rewritten.
    pub fn rekey_to_ids<T: Favoritable>(
        &self,
        kind: FavoriteKind,
        candidates: &[T],
    ) -> CampusResult<usize> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        let renames: Vec<(String, String)> = candidates
            .iter()
            .map(|c| (c.favorite_name().to_string(), c.favorite_id()))
            .filter(|(name, id)| name != id && inner.contains(name, kind))
            .collect();

        if renames.is_empty() {
            return Ok(0);
        }

        let tx = inner.conn.transaction()?;
        for (name, id) in &renames {
            tx.execute(
                "INSERT OR IGNORE INTO favorites (key, kind) VALUES (?1, ?2)",
                params![id, kind.as_str()],
            )?;
            tx.execute(
                "DELETE FROM favorites WHERE key = ?1 AND kind = ?2",
                params![name, kind.as_str()],
            )?;
        }
        tx.commit()?;

        let set = inner.sets.entry(kind).or_default();
        for (name, id) in &renames {
            set.remove(name);
            set.insert(id.clone());
        }

        log::info!("Rewrote {} {} favorites to stable ids", renames.len(), kind);
        Ok(renames.len())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // QUERIES
    // ═══════════════════════════════════════════════════════════════════════

    /// Is (key, kind) favorited
    pub fn is_favorited(&self, key: &str, kind: FavoriteKind) -> bool {
        self.inner.lock().contains(key, kind)
    }

    /// Candidates whose display name or stable id is stored, in candidate order
    pub fn list_favorites<'a, T: Favoritable>(
        &self,
        kind: FavoriteKind,
        candidates: &'a [T],
    ) -> Vec<&'a T> {
        let inner = self.inner.lock();

        candidates
            .iter()
            .filter(|c| {
                inner.contains(c.favorite_name(), kind) || inner.contains(&c.favorite_id(), kind)
            })
            .collect()
    }

    /// Stored keys for a kind, sorted
    pub fn keys(&self, kind: FavoriteKind) -> Vec<String> {
        let inner = self.inner.lock();
        let mut keys: Vec<String> = inner
            .sets
            .get(&kind)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    /// Number of favorites of a kind
    pub fn count(&self, kind: FavoriteKind) -> usize {
        self.inner.lock().sets.get(&kind).map_or(0, HashSet::len)
    }

    /// Snapshot of every record
    pub fn records(&self) -> Vec<FavoriteRecord> {
        FavoriteKind::ALL
            .iter()
            .flat_map(|&kind| {
                self.keys(kind)
                    .into_iter()
                    .map(move |key| FavoriteRecord { key, kind })
            })
            .collect()
    }

    /// Row count straight from the database
    pub fn persisted_count(&self) -> CampusResult<usize> {
        let inner = self.inner.lock();
        let count: i64 = inner
            .conn
            .query_row("SELECT COUNT(*) FROM favorites", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{popular_communities, sample_events};
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn test_add_then_remove() {
        let store = FavoritesStore::open_in_memory().unwrap();

        store.add("Foss Community", FavoriteKind::Community);
        assert!(store.is_favorited("Foss Community", FavoriteKind::Community));

        store.remove("Foss Community", FavoriteKind::Community);
        assert!(!store.is_favorited("Foss Community", FavoriteKind::Community));
    }

    #[test]
    fn test_repeated_ops_are_idempotent() {
        let store = FavoritesStore::open_in_memory().unwrap();

        for _ in 0..3 {
            store.add("Campus Walk", FavoriteKind::Event);
        }
        assert_eq!(store.count(FavoriteKind::Event), 1);
        assert_eq!(store.persisted_count().unwrap(), 1);

        for _ in 0..3 {
            store.remove("Campus Walk", FavoriteKind::Event);
        }
        assert!(!store.is_favorited("Campus Walk", FavoriteKind::Event));

        // Removing something never added is fine
        store.remove("Nope", FavoriteKind::Community);
        assert_eq!(store.persisted_count().unwrap(), 0);
    }

    #[test]
    fn test_kinds_are_separate() {
        let store = FavoritesStore::open_in_memory().unwrap();

        store.add("Campus Walk", FavoriteKind::Event);
        assert!(!store.is_favorited("Campus Walk", FavoriteKind::Community));

        store.add("Campus Walk", FavoriteKind::Community);
        assert_eq!(store.records().len(), 2);
    }

    #[test]
    fn test_toggle() {
        let store = FavoritesStore::open_in_memory().unwrap();

        assert!(store.toggle("Blood Donation", FavoriteKind::Event));
        assert!(store.is_favorited("Blood Donation", FavoriteKind::Event));
        assert!(!store.toggle("Blood Donation", FavoriteKind::Event));
        assert!(!store.is_favorited("Blood Donation", FavoriteKind::Event));
    }

    #[test]
    fn test_survives_reopen() {
        let dir = tempdir().unwrap();
        let db = dir.path().join("db").join("favorites.db");

        {
            let store = FavoritesStore::open(&db, None).unwrap();
            store.add("Foss Community", FavoriteKind::Community);
            store.add("Campus Walk", FavoriteKind::Event);
            store.remove("Campus Walk", FavoriteKind::Event);
        }

        let store = FavoritesStore::open(&db, None).unwrap();
        assert!(store.is_favorited("Foss Community", FavoriteKind::Community));
        assert!(!store.is_favorited("Campus Walk", FavoriteKind::Event));
        assert_eq!(store.path(), Some(db.as_path()));
    }

    #[test]
    fn test_list_favorites_by_name_or_id_in_order() {
        let store = FavoritesStore::open_in_memory().unwrap();
        let communities = popular_communities();

        // Leo by stable id, Foss by legacy display name
        store.add(&communities[2].favorite_id(), FavoriteKind::Community);
        store.add("Foss Community", FavoriteKind::Community);

        let listed = store.list_favorites(FavoriteKind::Community, &communities);
        let names: Vec<&str> = listed.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Foss Community", "Leo Club of Campus"]);

        // Stored under the wrong kind doesn't count
        let events = sample_events();
        store.add("Campus Walk", FavoriteKind::Community);
        assert!(store.list_favorites(FavoriteKind::Event, &events).is_empty());
    }

    #[test]
    fn test_legacy_import_on_open_runs_once() {
        let dir = tempdir().unwrap();
        let db = dir.path().join("favorites.db");
        let legacy_path = dir.path().join("legacy.json");

        LegacyFavorites {
            community_keys: vec!["Foss Community".into()],
            event_keys: vec!["Campus Walk".into(), "Campus Walk".into()],
        }
        .save(&legacy_path)
        .unwrap();

        {
            let store = FavoritesStore::open(&db, Some(&legacy_path)).unwrap();
            assert!(store.is_favorited("Foss Community", FavoriteKind::Community));
            assert_eq!(store.count(FavoriteKind::Event), 1);
            store.remove("Foss Community", FavoriteKind::Community);
        }

        let store = FavoritesStore::open(&db, Some(&legacy_path)).unwrap();
        assert!(!store.is_favorited("Foss Community", FavoriteKind::Community));
        assert!(store.is_favorited("Campus Walk", FavoriteKind::Event));
    }

    #[test]
    fn test_corrupt_legacy_does_not_block_open() {
        let dir = tempdir().unwrap();
        let legacy_path = dir.path().join("legacy.json");
        std::fs::write(&legacy_path, "[[[").unwrap();

        let store = FavoritesStore::open(dir.path().join("f.db"), Some(&legacy_path)).unwrap();
        store.add("Foss Community", FavoriteKind::Community);
        assert_eq!(store.count(FavoriteKind::Community), 1);
    }

    #[test]
    fn test_import_legacy_twice() {
        let store = FavoritesStore::open_in_memory().unwrap();
        let legacy = LegacyFavorites {
            community_keys: vec!["MS Club of Campus".into()],
            event_keys: vec!["Blood Donation".into()],
        };

        assert_eq!(store.import_legacy(&legacy).unwrap(), 2);
        let once = store.records();

        assert_eq!(store.import_legacy(&legacy).unwrap(), 0);
        assert_eq!(store.records(), once);
    }

    #[test]
    fn test_rekey_to_ids() {
        let store = FavoritesStore::open_in_memory().unwrap();
        let communities = popular_communities();
        let foss_id = communities[0].favorite_id();

        store.add("Foss Community", FavoriteKind::Community);
        store.add("Unknown Club", FavoriteKind::Community);

        assert_eq!(
            store
                .rekey_to_ids(FavoriteKind::Community, &communities)
                .unwrap(),
            1
        );
        assert!(store.is_favorited(&foss_id, FavoriteKind::Community));
        assert!(!store.is_favorited("Foss Community", FavoriteKind::Community));
        assert!(store.is_favorited("Unknown Club", FavoriteKind::Community));

        // Still listed, now via the id
        assert_eq!(
            store
                .list_favorites(FavoriteKind::Community, &communities)
                .len(),
            1
        );
        assert_eq!(
            store
                .rekey_to_ids(FavoriteKind::Community, &communities)
                .unwrap(),
            0
        );
    }

    #[test]
    fn test_concurrent_adds_store_one_record() {
        let store = Arc::new(FavoritesStore::open_in_memory().unwrap());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        store.add("Foss Community", FavoriteKind::Community);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.count(FavoriteKind::Community), 1);
        assert_eq!(store.persisted_count().unwrap(), 1);
    }

    #[test]
    fn test_failed_write_leaves_memory_unchanged() {
        let dir = tempdir().unwrap();
        let db = dir.path().join("favorites.db");

        let store = FavoritesStore::open(&db, None).unwrap();
        store.add("Foss Community", FavoriteKind::Community);
        store.set_busy_timeout(Duration::from_millis(10)).unwrap();

        // Another connection holds the write lock
        let blocker = Connection::open(&db).unwrap();
        blocker.execute_batch("BEGIN EXCLUSIVE").unwrap();

        store.add("Campus Walk", FavoriteKind::Event);
        assert!(!store.is_favorited("Campus Walk", FavoriteKind::Event));

        store.remove("Foss Community", FavoriteKind::Community);
        assert!(store.is_favorited("Foss Community", FavoriteKind::Community));

        assert!(!store.toggle("Blood Donation", FavoriteKind::Event));
        assert!(!store.is_favorited("Blood Donation", FavoriteKind::Event));

        blocker.execute_batch("COMMIT").unwrap();

        store.add("Campus Walk", FavoriteKind::Event);
        assert!(store.is_favorited("Campus Walk", FavoriteKind::Event));
        assert_eq!(store.persisted_count().unwrap(), 2);
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("Communities".parse::<FavoriteKind>().unwrap(), FavoriteKind::Community);
        assert_eq!(" event ".parse::<FavoriteKind>().unwrap(), FavoriteKind::Event);
        assert!(matches!(
            "club".parse::<FavoriteKind>(),
            Err(CampusError::UnknownKind(_))
        ));
    }
}

//! Campus Connect - App Facade
//!
//! Single entry point wiring the auth gate, the favorites store and the catalog.
//! Favorites are only reachable once the gate is open.

use std::sync::Arc;

use crate::biometrics::{AuthAttempt, AuthGate, AuthSession};
use crate::catalog::{
    popular_communities, sample_events, search_communities, search_events, Community, Event,
    Favoritable,
};
use crate::config::AppConfig;
use crate::device::CredentialDevice;
use crate::error::{CampusError, CampusResult};
use crate::favorites::{FavoriteKind, FavoritesStore};

/// Campus Connect app
///
/// # Example
///
/// ```rust,ignore
/// use campus_connect::{AppConfig, CampusApp, SimulatedDevice};
///
/// let app = CampusApp::open(AppConfig::default(), SimulatedDevice::new())?;
/// app.unlock().await;
///
/// let foss = app.find_community("Foss Community").unwrap();
/// app.toggle_favorite(foss)?;
/// ```
pub struct CampusApp<D> {
    config: AppConfig,
    gate: AuthGate<D>,
    favorites: Arc<FavoritesStore>,
    communities: Vec<Community>,
    events: Vec<Event>,
}

impl<D: CredentialDevice> CampusApp<D> {
    // ═══════════════════════════════════════════════════════════════════════
    // INITIALIZATION
    // ═══════════════════════════════════════════════════════════════════════

    /// Open the store (running migrations) and build a locked gate
    pub fn open(config: AppConfig, device: D) -> CampusResult<Self> {
        std::fs::create_dir_all(&config.data_dir)?;

        let legacy_path = config.legacy_path();
        let favorites = FavoritesStore::open(config.database_path(), Some(&legacy_path))?;

        Self::with_store(config, device, Arc::new(favorites))
    }

    /// Build around an existing store
    pub fn with_store(
        config: AppConfig,
        device: D,
        favorites: Arc<FavoritesStore>,
    ) -> CampusResult<Self> {
        let app = Self {
            config,
            gate: AuthGate::new(device),
            favorites,
            communities: popular_communities(),
            events: sample_events(),
        };

        if app.config.canonicalize_keys {
            app.canonicalize_keys()?;
        }
        app.gate.check_availability();

        Ok(app)
    }

    /// Rewrite display-name favorites to stable ids
    pub fn canonicalize_keys(&self) -> CampusResult<usize> {
        let communities = self
            .favorites
            .rekey_to_ids(FavoriteKind::Community, &self.communities)?;
        let events = self
            .favorites
            .rekey_to_ids(FavoriteKind::Event, &self.events)?;
        Ok(communities + events)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    // ═══════════════════════════════════════════════════════════════════════
    // LOCK / UNLOCK
    // ═══════════════════════════════════════════════════════════════════════

    pub fn gate(&self) -> &AuthGate<D> {
        &self.gate
    }

    /// Prompt with whatever method the device offers right now
    pub async fn unlock(&self) -> AuthAttempt {
        let method = self.gate.check_availability();
        self.gate.authenticate(method).await
    }

    /// Log out
    pub fn lock(&self) {
        self.gate.logout();
    }

    pub fn session(&self) -> AuthSession {
        self.gate.session()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // CATALOG
    // ═══════════════════════════════════════════════════════════════════════

    pub fn communities(&self) -> &[Community] {
        &self.communities
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn search_communities(&self, query: &str) -> Vec<&Community> {
        search_communities(&self.communities, query)
    }

    pub fn search_events(&self, query: &str) -> Vec<&Event> {
        search_events(&self.events, query)
    }

    /// Community by display name or id
    pub fn find_community(&self, key: &str) -> Option<&Community> {
        find(&self.communities, key)
    }

    /// Event by title or id
    pub fn find_event(&self, key: &str) -> Option<&Event> {
        find(&self.events, key)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // FAVORITES (GATED)
    // ═══════════════════════════════════════════════════════════════════════

    /// The favorites store, once authenticated
    pub fn favorites(&self) -> CampusResult<&FavoritesStore> {
        if !self.gate.is_authenticated() {
            return Err(CampusError::NotAuthenticated);
        }
        Ok(&self.favorites)
    }

    /// Shared handle for background work, once authenticated
    pub fn shared_favorites(&self) -> CampusResult<Arc<FavoritesStore>> {
        self.favorites()?;
        Ok(Arc::clone(&self.favorites))
    }

    pub fn favorite_communities(&self) -> CampusResult<Vec<&Community>> {
        Ok(self
            .favorites()?
            .list_favorites(FavoriteKind::Community, &self.communities))
    }

    pub fn favorite_events(&self) -> CampusResult<Vec<&Event>> {
        Ok(self
            .favorites()?
            .list_favorites(FavoriteKind::Event, &self.events))
    }

    /// Whether an entity is favorited under either of its keys
    pub fn is_favorite<T: Favoritable>(&self, item: &T) -> CampusResult<bool> {
        let store = self.favorites()?;
        Ok(store.is_favorited(&item.favorite_id(), T::KIND)
            || store.is_favorited(item.favorite_name(), T::KIND))
    }

    /// Heart button: new favorites are keyed by stable id, un-favoriting
    /// clears both key forms. Returns the new state.
    pub fn toggle_favorite<T: Favoritable>(&self, item: &T) -> CampusResult<bool> {
        let store = self.favorites()?;

        if self.is_favorite(item)? {
            store.remove(&item.favorite_id(), T::KIND);
            store.remove(item.favorite_name(), T::KIND);
        } else {
            store.add(&item.favorite_id(), T::KIND);
        }

        self.is_favorite(item)
    }
}

fn find<'a, T: Favoritable>(items: &'a [T], key: &str) -> Option<&'a T> {
    items
        .iter()
        .find(|item| item.favorite_name().eq_ignore_ascii_case(key) || item.favorite_id() == key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biometrics::{BiometryKind, CredentialFailure};
    use crate::device::SimulatedDevice;
    use crate::migration::LegacyFavorites;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_favorites_gated_until_unlock() {
        let dir = tempdir().unwrap();
        let device = SimulatedDevice::new().with_biometry(BiometryKind::FaceId);
        device.push_outcome(Err(CredentialFailure::UserCancel));

        let app = CampusApp::open(AppConfig::with_data_dir(dir.path()), device).unwrap();
        assert!(matches!(app.favorites(), Err(CampusError::NotAuthenticated)));

        assert!(matches!(app.unlock().await, AuthAttempt::Rejected(_)));
        assert!(app.favorite_communities().is_err());

        assert_eq!(app.unlock().await, AuthAttempt::Authenticated);
        assert!(app.favorite_communities().unwrap().is_empty());

        app.lock();
        assert!(app.favorites().is_err());
    }

    #[tokio::test]
    async fn test_toggle_and_reopen() {
        let dir = tempdir().unwrap();
        let config = AppConfig::with_data_dir(dir.path());

        {
            let app = CampusApp::open(config.clone(), SimulatedDevice::new()).unwrap();
            app.unlock().await;

            let walk = app.find_event("campus walk").unwrap().clone();
            assert!(app.toggle_favorite(&walk).unwrap());
        }

        let app = CampusApp::open(config, SimulatedDevice::new()).unwrap();
        app.unlock().await;

        let events = app.favorite_events().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title, "Campus Walk");

        let walk = events[0].clone();
        assert!(!app.toggle_favorite(&walk).unwrap());
        assert!(app.favorite_events().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_legacy_names_migrated_and_canonicalized() {
        let dir = tempdir().unwrap();
        let config = AppConfig::with_data_dir(dir.path());

        LegacyFavorites {
            community_keys: vec!["Foss Community".into(), "Retired Club".into()],
            event_keys: vec!["Blood Donation".into()],
        }
        .save(config.legacy_path())
        .unwrap();

        let app = CampusApp::open(config, SimulatedDevice::new()).unwrap();
        app.unlock().await;

        let store = app.favorites().unwrap();
        let foss = app.find_community("Foss Community").unwrap();
        assert!(store.is_favorited(&foss.favorite_id(), FavoriteKind::Community));
        assert!(!store.is_favorited("Foss Community", FavoriteKind::Community));
        // Not in the catalog, so left as-is
        assert!(store.is_favorited("Retired Club", FavoriteKind::Community));

        assert_eq!(app.favorite_communities().unwrap().len(), 1);
        assert_eq!(app.favorite_events().unwrap()[0].title, "Blood Donation");
    }

    #[tokio::test]
    async fn test_name_keys_kept_when_canonicalization_off() {
        let dir = tempdir().unwrap();
        let mut config = AppConfig::with_data_dir(dir.path());
        config.canonicalize_keys = false;

        let store = Arc::new(FavoritesStore::open_in_memory().unwrap());
        store.add("MS Club of Campus", FavoriteKind::Community);

        let app = CampusApp::with_store(config, SimulatedDevice::new(), store).unwrap();
        app.unlock().await;

        let ms = app.find_community("MS Club of Campus").unwrap();
        assert!(app.is_favorite(ms).unwrap());

        // Toggling off clears the legacy name key too
        assert!(!app.toggle_favorite(ms).unwrap());
        assert_eq!(app.favorites().unwrap().count(FavoriteKind::Community), 0);
    }

    #[test]
    fn test_search_through_app() {
        let dir = tempdir().unwrap();
        let app = CampusApp::open(AppConfig::with_data_dir(dir.path()), SimulatedDevice::new())
            .unwrap();

        assert_eq!(app.search_communities("theater").len(), 1);
        assert_eq!(app.search_events("").len(), app.events().len());
        assert!(app.find_community("nope").is_none());
    }
}

//! # Campus Connect
//!
//! Core of the campus social app: favorites that survive restarts and a
//! device-credential gate in front of everything else.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                     CAMPUS APP                       │
//! │  ┌─────────────┐  ┌──────────────┐  ┌─────────────┐  │
//! │  │  AUTH GATE  │  │  FAVORITES   │  │   CATALOG   │  │
//! │  │  biometric/ │  │  SQLite +    │  │ communities │  │
//! │  │  passcode   │  │  migrations  │  │ + events    │  │
//! │  └──────┬──────┘  └──────┬───────┘  └─────────────┘  │
//! │         │                │                           │
//! │  ┌──────┴──────┐  ┌──────┴───────┐                   │
//! │  │ CREDENTIAL  │  │ LEGACY FLAT  │                   │
//! │  │ DEVICE      │  │ LISTS (once) │                   │
//! │  └─────────────┘  └──────────────┘                   │
//! └──────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod biometrics;
pub mod catalog;
pub mod config;
pub mod device;
pub mod error;
pub mod favorites;
pub mod migration;

pub use api::CampusApp;
pub use biometrics::{
    AuthAttempt, AuthGate, AuthSession, BiometryKind, CredentialFailure, CredentialMethod,
};
pub use catalog::{Community, Event, Favoritable};
pub use config::AppConfig;
pub use device::{CredentialDevice, SimulatedDevice};
pub use error::{CampusError, CampusResult};
pub use favorites::{FavoriteKind, FavoriteRecord, FavoritesStore};
pub use migration::LegacyFavorites;

/// Campus Connect version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

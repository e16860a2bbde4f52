//! Campus Connect - Biometric Authentication
//!
//! Session gate in front of the app. The device prompt is awaited; only one
//! prompt may be in flight at a time and nothing is ever retried automatically.

use std::sync::atomic::{AtomicBool, Ordering};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::device::CredentialDevice;

/// Biometric sensor class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BiometryKind {
    FaceId,
    TouchId,
}

/// How the user can prove identity right now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CredentialMethod {
    #[default]
    None,
    Biometric(BiometryKind),
    Passcode,
}

impl CredentialMethod {
    /// Button caption
    pub fn prompt_label(&self) -> &'static str {
        match self {
            CredentialMethod::Biometric(BiometryKind::FaceId) => "Use Face ID",
            CredentialMethod::Biometric(BiometryKind::TouchId) => "Use Touch ID",
            _ => "Use Passcode",
        }
    }

    /// System icon name
    pub fn icon_name(&self) -> &'static str {
        match self {
            CredentialMethod::Biometric(BiometryKind::FaceId) => "faceid",
            CredentialMethod::Biometric(BiometryKind::TouchId) => "touchid",
            _ => "key.fill",
        }
    }

    /// Policy evaluated for this method
    pub fn policy(&self) -> Option<Policy> {
        match self {
            CredentialMethod::None => None,
            CredentialMethod::Biometric(_) => Some(Policy::BiometricsOnly),
            CredentialMethod::Passcode => Some(Policy::DeviceOwner),
        }
    }
}

/// Device policy to evaluate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Policy {
    /// Biometrics only
    BiometricsOnly,
    /// Biometrics or device passcode
    DeviceOwner,
}

impl Policy {
    /// Text shown in the system prompt
    pub fn reason(&self) -> &'static str {
        match self {
            Policy::BiometricsOnly => "Use Face ID or Touch ID to access Campus Connect",
            Policy::DeviceOwner => "Enter your passcode to access Campus Connect",
        }
    }
}

/// Classified reason a credential check failed
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialFailure {
    #[error("cancelled by user")]
    UserCancel,
    #[error("user chose the fallback method")]
    UserFallback,
    #[error("biometry not available")]
    BiometryNotAvailable,
    #[error("biometry not enrolled")]
    BiometryNotEnrolled,
    #[error("biometry locked out")]
    BiometryLockout,
    #[error("passcode not set")]
    PasscodeNotSet,
    #[error("cancelled by system")]
    SystemCancel,
    #[error("cancelled by app")]
    AppCancel,
    #[error("invalid context")]
    InvalidContext,
    #[error("not interactive")]
    NotInteractive,
    #[error("authentication failed")]
    Failed,
}

impl CredentialFailure {
    /// User-facing message for a failure under the given policy
    pub fn message(&self, policy: Policy) -> &'static str {
        use CredentialFailure::*;

        match (self, policy) {
            (UserCancel, _) => "Authentication was cancelled.",
            (SystemCancel, _) => "Authentication was cancelled by the system.",
            (AppCancel, _) => "Authentication was cancelled by the app.",
            (InvalidContext, _) => "Authentication context is invalid.",
            (NotInteractive, _) => "Authentication is not interactive.",

            (UserFallback, Policy::BiometricsOnly) => "User chose to use passcode instead.",
            (BiometryNotAvailable, Policy::BiometricsOnly) => {
                "Biometric authentication is not available on this device."
            }
            (BiometryNotEnrolled, Policy::BiometricsOnly) => {
                "No biometric data is enrolled. Please set up Face ID or Touch ID in Settings."
            }
            (BiometryLockout, Policy::BiometricsOnly) => {
                "Biometric authentication is locked. Please use your passcode to unlock."
            }
            (_, Policy::BiometricsOnly) => "Biometric authentication failed. Please try again.",

            (UserFallback, Policy::DeviceOwner) => {
                "User chose to use biometric authentication instead."
            }
            (_, Policy::DeviceOwner) => "Passcode authentication failed. Please try again.",
        }
    }

    /// Whether switching to the passcode could get the user in
    pub fn suggests_passcode(&self) -> bool {
        matches!(
            self,
            CredentialFailure::BiometryLockout
                | CredentialFailure::BiometryNotEnrolled
                | CredentialFailure::BiometryNotAvailable
                | CredentialFailure::UserFallback
        )
    }
}

/// Authentication session state
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AuthSession {
    pub is_authenticated: bool,
    pub last_error: Option<String>,
    pub available_method: CredentialMethod,
    pub authenticated_at: Option<DateTime<Utc>>,
}

/// Result of one `authenticate` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthAttempt {
    Authenticated,
    Rejected(CredentialFailure),
    /// Another prompt was already showing; this call did nothing
    AlreadyInProgress,
}

/// Clears the in-flight flag however the attempt ends (including drop)
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// AUTH GATE
// ═══════════════════════════════════════════════════════════════════════════════

/// Authentication gate over a credential device
pub struct AuthGate<D> {
    device: D,
    session: RwLock<AuthSession>,
    in_flight: AtomicBool,
}

impl<D: CredentialDevice> AuthGate<D> {
    /// New gate, unauthenticated
    pub fn new(device: D) -> Self {
        Self {
            device,
            session: RwLock::new(AuthSession::default()),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    /// Snapshot of the session
    pub fn session(&self) -> AuthSession {
        self.session.read().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.read().is_authenticated
    }

    pub fn last_error(&self) -> Option<String> {
        self.session.read().last_error.clone()
    }

    /// Is a prompt currently showing
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Ask the device what can be evaluated right now.
    ///
    /// Only `available_method` is updated; authentication state is untouched.
    pub fn check_availability(&self) -> CredentialMethod {
        let method = match self.device.can_evaluate(Policy::BiometricsOnly) {
            Ok(Some(kind)) => CredentialMethod::Biometric(kind),
            _ => match self.device.can_evaluate(Policy::DeviceOwner) {
                Ok(_) => CredentialMethod::Passcode,
                Err(e) => {
                    log::debug!("No credential method available: {}", e);
                    CredentialMethod::None
                }
            },
        };

        self.session.write().available_method = method;
        method
    }

    /// Run one device prompt for `method`.
    ///
    /// Ignored (`AlreadyInProgress`) while another prompt is in flight.
    pub async fn authenticate(&self, method: CredentialMethod) -> AuthAttempt {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            log::debug!("Authentication already in progress, ignoring request");
            return AuthAttempt::AlreadyInProgress;
        }
        let _guard = InFlight(&self.in_flight);

        let Some(policy) = method.policy() else {
            let failure = CredentialFailure::BiometryNotAvailable;
            self.record_failure(failure, Policy::BiometricsOnly);
            return AuthAttempt::Rejected(failure);
        };

        match self.device.evaluate(policy, policy.reason()).await {
            Ok(()) => {
                let mut session = self.session.write();
                session.is_authenticated = true;
                session.last_error = None;
                session.authenticated_at = Some(Utc::now());
                log::info!("Authenticated with {:?}", method);
                AuthAttempt::Authenticated
            }
            Err(failure) => {
                self.record_failure(failure, policy);
                AuthAttempt::Rejected(failure)
            }
        }
    }

    fn record_failure(&self, failure: CredentialFailure, policy: Policy) {
        let message = failure.message(policy);
        log::warn!("Authentication failed ({}): {}", failure, message);

        let mut session = self.session.write();
        session.is_authenticated = false;
        session.authenticated_at = None;
        session.last_error = Some(message.to_string());
    }

    /// Back to unauthenticated, error cleared
    pub fn logout(&self) {
        let mut session = self.session.write();
        session.is_authenticated = false;
        session.authenticated_at = None;
        session.last_error = None;
        log::info!("Logged out");
    }
}

//! Campus Connect - Credential Device
//!
//! Seam to the platform credential API (stub - actual implementation is platform-specific).

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use parking_lot::Mutex;

use crate::biometrics::{BiometryKind, CredentialFailure, Policy};

/// Platform credential API
pub trait CredentialDevice: Send + Sync {
    /// Can `policy` be evaluated now? `Ok(Some(kind))` names the enrolled biometry.
    fn can_evaluate(&self, policy: Policy) -> Result<Option<BiometryKind>, CredentialFailure>;

    /// Show the system prompt and resolve once the user is done
    fn evaluate(
        &self,
        policy: Policy,
        reason: &str,
    ) -> impl Future<Output = Result<(), CredentialFailure>> + Send;
}

/// Scripted device for the CLI and tests
#[derive(Debug)]
pub struct SimulatedDevice {
    biometry: Option<BiometryKind>,
    /// Why biometrics can't be evaluated even though hardware exists
    biometry_error: Option<CredentialFailure>,
    passcode_set: bool,
    /// Results handed out by successive prompts; empty means success
    outcomes: Mutex<VecDeque<Result<(), CredentialFailure>>>,
    delay: Option<Duration>,
    prompts: AtomicUsize,
}

impl SimulatedDevice {
    /// No biometry, passcode set, every prompt succeeds
    pub fn new() -> Self {
        Self {
            biometry: None,
            biometry_error: None,
            passcode_set: true,
            outcomes: Mutex::new(VecDeque::new()),
            delay: None,
            prompts: AtomicUsize::new(0),
        }
    }

    pub fn with_biometry(mut self, kind: BiometryKind) -> Self {
        self.biometry = Some(kind);
        self
    }

    /// Biometry present but unusable (lockout, not enrolled...)
    pub fn with_biometry_error(mut self, failure: CredentialFailure) -> Self {
        self.biometry_error = Some(failure);
        self
    }

    pub fn with_passcode(mut self, set: bool) -> Self {
        self.passcode_set = set;
        self
    }

    /// How long each prompt stays open
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue the result of the next prompt
    pub fn push_outcome(&self, outcome: Result<(), CredentialFailure>) {
        self.outcomes.lock().push_back(outcome);
    }

    /// Prompts shown so far
    pub fn prompts(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }

    fn biometrics_usable(&self) -> Result<BiometryKind, CredentialFailure> {
        if let Some(failure) = self.biometry_error {
            return Err(failure);
        }
        self.biometry.ok_or(CredentialFailure::BiometryNotAvailable)
    }
}

impl Default for SimulatedDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialDevice for SimulatedDevice {
    fn can_evaluate(&self, policy: Policy) -> Result<Option<BiometryKind>, CredentialFailure> {
        match policy {
            Policy::BiometricsOnly => self.biometrics_usable().map(Some),
            Policy::DeviceOwner => match self.biometrics_usable() {
                Ok(kind) => Ok(Some(kind)),
                Err(_) if self.passcode_set => Ok(None),
                Err(_) => Err(CredentialFailure::PasscodeNotSet),
            },
        }
    }

    async fn evaluate(&self, policy: Policy, reason: &str) -> Result<(), CredentialFailure> {
        self.can_evaluate(policy)?;

        self.prompts.fetch_add(1, Ordering::SeqCst);
        log::debug!("Credential prompt ({:?}): {}", policy, reason);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let outcome = self.outcomes.lock().pop_front();
        outcome.unwrap_or(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_owner_falls_back_to_passcode() {
        let device = SimulatedDevice::new()
            .with_biometry(BiometryKind::FaceId)
            .with_biometry_error(CredentialFailure::BiometryNotEnrolled);

        assert_eq!(
            device.can_evaluate(Policy::BiometricsOnly),
            Err(CredentialFailure::BiometryNotEnrolled)
        );
        assert_eq!(device.can_evaluate(Policy::DeviceOwner), Ok(None));
    }

    #[test]
    fn test_nothing_available() {
        let device = SimulatedDevice::new().with_passcode(false);
        assert_eq!(
            device.can_evaluate(Policy::DeviceOwner),
            Err(CredentialFailure::PasscodeNotSet)
        );
    }

    #[tokio::test]
    async fn test_outcomes_in_order() {
        let device = SimulatedDevice::new().with_biometry(BiometryKind::TouchId);
        device.push_outcome(Err(CredentialFailure::UserCancel));

        let first = device.evaluate(Policy::BiometricsOnly, "test").await;
        let second = device.evaluate(Policy::BiometricsOnly, "test").await;

        assert_eq!(first, Err(CredentialFailure::UserCancel));
        assert_eq!(second, Ok(()));
        assert_eq!(device.prompts(), 2);
    }

    #[tokio::test]
    async fn test_unavailable_policy_shows_no_prompt() {
        let device = SimulatedDevice::new();
        let result = device.evaluate(Policy::BiometricsOnly, "test").await;

        assert_eq!(result, Err(CredentialFailure::BiometryNotAvailable));
        assert_eq!(device.prompts(), 0);
    }
}

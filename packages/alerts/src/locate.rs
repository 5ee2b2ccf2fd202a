//! Position acquisition with retry.
//!
//! The first attempt asks for a high-accuracy fix. Each retry downgrades to
//! low accuracy and allows a longer timeout, since a coarse fix that
//! arrives is worth more than a precise one that never does.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use urban_guardian_geo::LatLng;

use crate::AlertError;

/// Default number of attempts (one initial try plus two retries).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default timeout of the first attempt.
pub const DEFAULT_INITIAL_TIMEOUT: Duration = Duration::from_millis(9000);

/// Default timeout added per retry.
pub const DEFAULT_TIMEOUT_STEP: Duration = Duration::from_millis(4000);

/// Default base delay between attempts. Doubles on every retry.
pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(500);

/// Failure of a single position request.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LocateError {
    /// The user refused location access. Not retried.
    #[error("Location permission denied")]
    PermissionDenied,

    /// The device could not produce a fix.
    #[error("Position unavailable: {0}")]
    Unavailable(String),

    /// The attempt did not complete within its timeout.
    #[error("Position request timed out after {0:?}")]
    Timeout(Duration),

    /// The provider returned coordinates outside the valid range.
    #[error("Provider returned invalid position {0}")]
    InvalidPosition(LatLng),
}

impl LocateError {
    /// Whether another attempt could succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        !matches!(self, Self::PermissionDenied)
    }
}

/// Parameters of one position request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocateAttempt {
    /// 1-based attempt number.
    pub number: u32,
    /// Whether to ask for a high-accuracy fix.
    pub high_accuracy: bool,
    /// How long to wait for the fix.
    pub timeout: Duration,
}

/// Something that can produce the device's current position.
#[async_trait]
pub trait PositionProvider: Send + Sync {
    /// Requests one position fix with the given accuracy.
    ///
    /// The caller enforces `attempt.timeout`; providers may also honor it.
    ///
    /// # Errors
    ///
    /// Returns a [`LocateError`] if no fix could be produced.
    async fn current_position(&self, attempt: &LocateAttempt) -> Result<LatLng, LocateError>;
}

/// Schedule of position attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeolocationRetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Whether the first attempt asks for high accuracy.
    pub high_accuracy: bool,
    /// Timeout of the first attempt.
    pub initial_timeout: Duration,
    /// Timeout added on every retry.
    pub timeout_step: Duration,
    /// Base delay before a retry.
    pub backoff: Duration,
}

impl Default for GeolocationRetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            high_accuracy: true,
            initial_timeout: DEFAULT_INITIAL_TIMEOUT,
            timeout_step: DEFAULT_TIMEOUT_STEP,
            backoff: DEFAULT_BACKOFF,
        }
    }
}

impl GeolocationRetryPolicy {
    /// Parameters for the `number`th attempt (1-based), or `None` once the
    /// policy is exhausted.
    #[must_use]
    pub fn attempt(&self, number: u32) -> Option<LocateAttempt> {
        if number == 0 || number > self.max_attempts {
            return None;
        }
        let retries = number - 1;
        Some(LocateAttempt {
            number,
            high_accuracy: self.high_accuracy && retries == 0,
            timeout: self
                .initial_timeout
                .saturating_add(self.timeout_step.saturating_mul(retries)),
        })
    }

    /// Delay to wait before the `number`th attempt. Zero for the first.
    ///
    /// The doubling stops after 16 retries and the product saturates.
    #[must_use]
    pub fn delay_before(&self, number: u32) -> Duration {
        if number <= 1 {
            Duration::ZERO
        } else {
            self.backoff.saturating_mul(1u32 << (number - 2).min(16))
        }
    }
}

/// Acquires a position fix, retrying transient failures per `policy`.
///
/// # Errors
///
/// * [`AlertError::Locate`] if the provider reports a permanent failure.
/// * [`AlertError::PositionUnavailable`] if every attempt failed.
pub async fn locate_with_retry(
    policy: &GeolocationRetryPolicy,
    provider: &dyn PositionProvider,
) -> Result<LatLng, AlertError> {
    let mut last_error = LocateError::Unavailable("no attempts configured".to_string());
    let mut attempts = 0;

    for number in 1..=policy.max_attempts {
        let Some(attempt) = policy.attempt(number) else {
            break;
        };
        let delay = policy.delay_before(number);
        if !delay.is_zero() {
            log::warn!(
                "  locate retry {}/{} in {delay:?}...",
                number - 1,
                policy.max_attempts - 1
            );
            tokio::time::sleep(delay).await;
        }
        attempts = number;

        let fix = provider.current_position(&attempt);
        let result = match tokio::time::timeout(attempt.timeout, fix).await {
            Ok(result) => result,
            Err(_) => Err(LocateError::Timeout(attempt.timeout)),
        };

        match result.and_then(|position| {
            if position.is_valid() {
                Ok(position)
            } else {
                Err(LocateError::InvalidPosition(position))
            }
        }) {
            Ok(position) => {
                log::debug!(
                    "Located at {position} on attempt {number} (high_accuracy={})",
                    attempt.high_accuracy
                );
                return Ok(position);
            }
            Err(e) if !e.is_transient() => {
                log::warn!("Locate failed permanently: {e}");
                return Err(AlertError::Locate(e));
            }
            Err(e) => {
                log::warn!("  locate attempt {number} failed: {e}");
                last_error = e;
            }
        }
    }

    log::error!("Position unavailable after {attempts} attempts: {last_error}");
    Err(AlertError::PositionUnavailable {
        attempts,
        last_error,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Replays a scripted list of results and records the attempts it saw.
    struct ScriptedProvider {
        script: Mutex<Vec<Result<LatLng, LocateError>>>,
        seen: Mutex<Vec<LocateAttempt>>,
    }

    impl ScriptedProvider {
        fn new(mut script: Vec<Result<LatLng, LocateError>>) -> Self {
            script.reverse();
            Self {
                script: Mutex::new(script),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn seen(&self) -> Vec<LocateAttempt> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PositionProvider for ScriptedProvider {
        async fn current_position(&self, attempt: &LocateAttempt) -> Result<LatLng, LocateError> {
            self.seen.lock().unwrap().push(*attempt);
            self.script
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(LocateError::Unavailable("script exhausted".to_string())))
        }
    }

    fn fast_policy() -> GeolocationRetryPolicy {
        GeolocationRetryPolicy {
            backoff: Duration::from_millis(1),
            ..GeolocationRetryPolicy::default()
        }
    }

    #[test]
    fn default_schedule() {
        let policy = GeolocationRetryPolicy::default();
        assert_eq!(
            policy.attempt(1),
            Some(LocateAttempt {
                number: 1,
                high_accuracy: true,
                timeout: Duration::from_millis(9000),
            })
        );
        assert_eq!(
            policy.attempt(2),
            Some(LocateAttempt {
                number: 2,
                high_accuracy: false,
                timeout: Duration::from_millis(13000),
            })
        );
        assert_eq!(policy.attempt(3).map(|a| a.timeout), Some(Duration::from_millis(17000)));
        assert_eq!(policy.attempt(4), None);
        assert_eq!(policy.attempt(0), None);
    }

    #[test]
    fn backoff_doubles() {
        let policy = GeolocationRetryPolicy::default();
        assert_eq!(policy.delay_before(1), Duration::ZERO);
        assert_eq!(policy.delay_before(2), Duration::from_millis(500));
        assert_eq!(policy.delay_before(3), Duration::from_millis(1000));
    }

    #[test]
    fn huge_durations_saturate() {
        let policy = GeolocationRetryPolicy {
            max_attempts: 20,
            high_accuracy: true,
            initial_timeout: Duration::from_millis(u64::MAX),
            timeout_step: Duration::from_millis(u64::MAX),
            backoff: Duration::from_millis(u64::MAX),
        };
        assert_eq!(policy.delay_before(12), Duration::MAX);
        assert_eq!(policy.attempt(20).map(|a| a.timeout), Some(Duration::MAX));
    }

    #[tokio::test]
    async fn succeeds_on_retry_with_low_accuracy() {
        let provider = ScriptedProvider::new(vec![
            Err(LocateError::Unavailable("no satellites".to_string())),
            Ok(LatLng::new(28.6139, 77.2090)),
        ]);
        let position = locate_with_retry(&fast_policy(), &provider).await.unwrap();
        assert_eq!(position, LatLng::new(28.6139, 77.2090));

        let seen = provider.seen();
        assert_eq!(seen.len(), 2);
        assert!(seen[0].high_accuracy);
        assert!(!seen[1].high_accuracy);
    }

    #[tokio::test]
    async fn permission_denied_is_not_retried() {
        let provider = ScriptedProvider::new(vec![Err(LocateError::PermissionDenied)]);
        let err = locate_with_retry(&fast_policy(), &provider)
            .await
            .unwrap_err();
        assert!(matches!(err, AlertError::Locate(LocateError::PermissionDenied)));
        assert_eq!(provider.seen().len(), 1);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let provider = ScriptedProvider::new(vec![
            Err(LocateError::Unavailable("a".to_string())),
            Ok(LatLng::new(120.0, 0.0)),
            Err(LocateError::Unavailable("c".to_string())),
        ]);
        let err = locate_with_retry(&fast_policy(), &provider)
            .await
            .unwrap_err();
        match err {
            AlertError::PositionUnavailable {
                attempts,
                last_error,
            } => {
                assert_eq!(attempts, 3);
                assert_eq!(last_error, LocateError::Unavailable("c".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(provider.seen().len(), 3);
    }
}

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Proximity alerts.
//!
//! Decides, for a user's last known position, whether an incident warrants
//! a notification. How the notification is shown (system notification,
//! in-app banner) is up to the caller; this crate only makes the decision.
//!
//! - [`proximity`]: the pure distance decision.
//! - [`echo`]: suppression of the local actor's own writes when they come
//!   back through the real-time channel.
//! - [`session`]: the per-user alert state machine tying both together.
//! - [`locate`]: retry policy for acquiring a position fix.

pub mod echo;
pub mod locate;
pub mod proximity;
pub mod session;

pub use echo::{ChangeId, SelfEchoTracker};
pub use locate::{
    GeolocationRetryPolicy, LocateAttempt, LocateError, PositionProvider, locate_with_retry,
};
pub use proximity::{Alert, NOTIFY_RADIUS_KM, ProximityDecision, evaluate_proximity};
pub use session::{AlertOutcome, AlertSession, NotificationCapability, SkipReason};

/// Errors surfaced by the alert layer.
#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    /// Alerts cannot be enabled because notifications are not available.
    #[error("Notifications unavailable: {0}")]
    NotificationsUnavailable(NotificationCapability),

    /// No position fix could be obtained.
    #[error("Position unavailable after {attempts} attempts")]
    PositionUnavailable {
        /// How many attempts were made.
        attempts: u32,
        /// The error from the final attempt.
        #[source]
        last_error: LocateError,
    },

    /// The position provider failed with an error that retrying cannot fix.
    #[error(transparent)]
    Locate(LocateError),
}

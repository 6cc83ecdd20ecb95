//! Bounded reconnection policy.

use std::time::Duration;

use nas_monitor_core::ReconnectSettings;
use tracing::{info, warn};

use crate::session::Session;

/// What to do after a transport closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectDecision {
    /// Open a new link after `delay`
    Retry {
        /// Attempt number since the last healthy frame, starting at 1
        attempt: u32,
        /// Pause before connecting
        delay: Duration,
    },
    /// Retry budget exhausted; the session is dead
    GiveUp,
}

/// Decides whether a closed session may reconnect.
///
/// A session reconnects while its retry counter is below `max_retries`.
/// Healthy traffic resets the counter, so the budget applies to
/// consecutive failures only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    max_retries: u32,
    retry_delay: Duration,
}

impl ReconnectPolicy {
    /// Policy with no pause between attempts.
    pub fn new(max_retries: u32) -> Self {
        Self::with_delay(max_retries, Duration::ZERO)
    }

    /// Policy pausing `retry_delay` before every attempt.
    pub fn with_delay(max_retries: u32, retry_delay: Duration) -> Self {
        Self {
            max_retries,
            retry_delay,
        }
    }

    /// Policy from the `reconnect` config section.
    pub fn from_settings(settings: &ReconnectSettings) -> Self {
        Self::with_delay(settings.max_retries, settings.retry_delay())
    }

    /// Maximum consecutive reconnections.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Pause before each reconnection.
    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    /// Record a transport close on `session` and decide what happens next.
    ///
    /// On [`ReconnectDecision::GiveUp`] the counter is reset so a session
    /// restarted by the caller begins with a full budget.
    pub fn on_close(&self, session: &mut Session) -> ReconnectDecision {
        if session.retry_count() < self.max_retries {
            let attempt = session.record_retry();
            info!(
                "Reconnecting: session={}, attempt={}/{}",
                session.id(),
                attempt,
                self.max_retries
            );
            ReconnectDecision::Retry {
                attempt,
                delay: self.retry_delay,
            }
        } else {
            warn!(
                "Retry budget exhausted, giving up: session={}, max_retries={}",
                session.id(),
                self.max_retries
            );
            session.reset_retries();
            ReconnectDecision::GiveUp
        }
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::from_settings(&ReconnectSettings::default())
    }
}

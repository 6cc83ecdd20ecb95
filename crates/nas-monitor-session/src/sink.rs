//! Status sinks.
//!
//! A [`StatusSink`] receives every status a session produces, in the order
//! produced. Sinks are called from the driver task and must not block.

use std::sync::{Arc, Mutex, PoisonError};

use nas_monitor_core::Status;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

/// Receiver of status notifications.
pub trait StatusSink: Send + Sync {
    /// Deliver one status.
    fn notify_status(&self, status: &Status);
}

impl<F> StatusSink for F
where
    F: Fn(&Status) + Send + Sync,
{
    fn notify_status(&self, status: &Status) {
        self(status)
    }
}

impl StatusSink for UnboundedSender<Status> {
    fn notify_status(&self, status: &Status) {
        if self.send(status.clone()).is_err() {
            debug!("Status receiver dropped, discarding {}", status);
        }
    }
}

impl<T: StatusSink + ?Sized> StatusSink for Arc<T> {
    fn notify_status(&self, status: &Status) {
        (**self).notify_status(status)
    }
}

/// Sink that records every status it receives.
#[derive(Debug, Default)]
pub struct RecordingSink {
    statuses: Mutex<Vec<Status>>,
}

impl RecordingSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Statuses received so far.
    pub fn snapshot(&self) -> Vec<Status> {
        self.statuses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl StatusSink for RecordingSink {
    fn notify_status(&self, status: &Status) {
        self.statuses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(status.clone());
    }
}

/// Sink that logs every status at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl StatusSink for TracingSink {
    fn notify_status(&self, status: &Status) {
        info!("Host status: {}", status);
    }
}

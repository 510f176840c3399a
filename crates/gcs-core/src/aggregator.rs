use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::state::{VehicleState, VehicleUpdate};

/// Owner of the current [`VehicleState`].
///
/// The snapshot lives behind an `Arc` inside a watch channel: an update
/// builds a new state off to the side and swaps the pointer, so readers
/// always get a complete snapshot and only hold the channel lock long
/// enough to clone the `Arc`.
#[derive(Debug)]
pub struct Aggregator {
    tx: watch::Sender<Arc<VehicleState>>,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl Aggregator {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Arc::new(VehicleState::default()));
        Self { tx }
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> Arc<VehicleState> {
        self.tx.borrow().clone()
    }

    /// Receiver that is woken with every new snapshot. Dropping it
    /// unsubscribes. Slow receivers only see the latest snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Arc<VehicleState>> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Apply one decoded update and publish the resulting snapshot.
    pub fn apply(&self, update: VehicleUpdate) -> Arc<VehicleState> {
        let kind = update.kind();
        let mut published = None;
        let mut was_connected = false;
        self.tx.send_modify(|current| {
            was_connected = current.is_connected();
            let next = Arc::new(current.with_update(update));
            *current = next.clone();
            published = Some(next);
        });
        let published = published.unwrap_or_else(|| self.snapshot());
        if was_connected != published.is_connected() {
            info!(connected = published.is_connected(), "vehicle link state changed");
        }
        debug!(kind, "snapshot published");
        published
    }

    /// Drop everything known about the vehicle. Called when the link comes
    /// (back) up, so nothing from an earlier connection survives.
    pub fn reset(&self) {
        info!("vehicle state reset for new connection");
        self.tx.send_replace(Arc::new(VehicleState::default()));
    }
}

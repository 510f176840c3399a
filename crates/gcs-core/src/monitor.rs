use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use time::OffsetDateTime;
use tracing::warn;

use crate::aggregator::Aggregator;
use crate::decode::MSG_HEARTBEAT;
use crate::dispatch::{DispatchOutcome, Registry};
use crate::frame::Frame;
use crate::state::{ConnectionState, VehicleUpdate};

/// Tracks vehicle heartbeats and turns their arrival/absence into
/// connection updates. Emits only on transitions.
#[derive(Debug)]
pub struct LinkMonitor {
    timeout: Duration,
    last_heartbeat: Option<Instant>,
    connected: bool,
}

impl LinkMonitor {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout, last_heartbeat: None, connected: false }
    }

    pub fn on_heartbeat(&mut self, now: Instant) -> Option<VehicleUpdate> {
        self.last_heartbeat = Some(now);
        if self.connected {
            return None;
        }
        self.connected = true;
        Some(transition(true))
    }

    /// Call periodically; reports a disconnect once the heartbeat is older
    /// than the timeout.
    pub fn on_tick(&mut self, now: Instant) -> Option<VehicleUpdate> {
        let stale = match self.last_heartbeat {
            Some(t) => now.saturating_duration_since(t) >= self.timeout,
            None => true,
        };
        if self.connected && stale {
            self.connected = false;
            return Some(transition(false));
        }
        None
    }

    pub fn hb_age(&self, now: Instant) -> Option<Duration> {
        self.last_heartbeat.map(|t| now.saturating_duration_since(t))
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }
}

/// Couples a [`LinkMonitor`] to the aggregator it reports into. Every
/// connection transition is published while the monitor lock is held, so
/// the snapshot and the monitor can't disagree about the link.
#[derive(Debug)]
pub struct LinkSupervisor {
    monitor: Mutex<LinkMonitor>,
    state: Arc<Aggregator>,
}

impl LinkSupervisor {
    pub fn new(timeout: Duration, state: Arc<Aggregator>) -> Self {
        Self { monitor: Mutex::new(LinkMonitor::new(timeout)), state }
    }

    pub fn state(&self) -> &Arc<Aggregator> {
        &self.state
    }

    /// Reader side: route one inbound frame.
    ///
    /// A heartbeat that brings the link up starts from a fresh snapshot and
    /// publishes `connected` before the heartbeat itself, so its armed flag
    /// never lands on a disconnected state.
    pub fn handle_frame(&self, registry: &Registry, frame: &Frame, now: Instant) -> DispatchOutcome {
        if frame.message_id != MSG_HEARTBEAT {
            return registry.dispatch(frame, &self.state);
        }
        let mut monitor = self.lock();
        registry.dispatch_with(frame, |heartbeat| {
            if let Some(up) = monitor.on_heartbeat(now) {
                self.state.reset();
                self.state.apply(up);
            }
            self.state.apply(heartbeat);
        })
    }

    /// Watchdog side. Returns true when this tick declared the link lost.
    pub fn tick(&self, now: Instant) -> bool {
        let mut monitor = self.lock();
        match monitor.on_tick(now) {
            Some(lost) => {
                warn!(age = ?monitor.hb_age(now), "vehicle heartbeat lost");
                self.state.apply(lost);
                true
            }
            None => false,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.lock().is_connected()
    }

    fn lock(&self) -> MutexGuard<'_, LinkMonitor> {
        // the monitor is plain bookkeeping; a panicked holder leaves it usable
        self.monitor.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn transition(connected: bool) -> VehicleUpdate {
    VehicleUpdate::Connection(ConnectionState { connected, changed_at: OffsetDateTime::now_utc() })
}

use std::time::Duration;

use anyhow::Result;
use serde::Deserialize;

use crate::command::Target;

#[derive(Debug, Clone, Deserialize)]
pub struct LinkConfig {
    /// mavlink connection string, e.g. "serial:/dev/ttyUSB0:57600",
    /// "udpin:0.0.0.0:14550" or "tcpout:127.0.0.1:5760".
    pub url: String,

    /// MAVLink ids we use (GCS side). 255/190 is the usual GCS identity.
    #[serde(default = "default_sys_id")]
    pub sys_id: u8,
    #[serde(default = "default_comp_id")]
    pub comp_id: u8,

    /// Autopilot we talk to. Frames from other systems are ignored.
    #[serde(default = "default_target")]
    pub target_sys: u8,
    #[serde(default = "default_target")]
    pub target_comp: u8,

    /// No vehicle heartbeat for this long means disconnected.
    pub heartbeat_timeout_ms: Option<u64>,

    /// GCS heartbeat rate. Default 1 Hz.
    pub send_heartbeat_hz: Option<f32>,

    /// How often `monitor` logs the snapshot.
    pub snapshot_log_ms: Option<u64>,
}

fn default_sys_id() -> u8 { 255 }
fn default_comp_id() -> u8 { 190 }
fn default_target() -> u8 { 1 }

impl LinkConfig {
    pub fn target(&self) -> Target {
        Target { system: self.target_sys, component: self.target_comp }
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_millis(self.heartbeat_timeout_ms.unwrap_or(3000))
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs_f32(1.0 / self.send_heartbeat_hz.unwrap_or(1.0).clamp(0.2, 50.0))
    }

    pub fn snapshot_log_interval(&self) -> Duration {
        Duration::from_millis(self.snapshot_log_ms.unwrap_or(1000).max(100))
    }

    pub fn validate(&self) -> Result<()> {
        let scheme = self.url.split(':').next().unwrap_or_default();
        anyhow::ensure!(
            matches!(scheme, "serial" | "udpin" | "udpout" | "udpbcast" | "tcpin" | "tcpout"),
            "link.url has unsupported scheme '{}'",
            scheme
        );
        anyhow::ensure!(self.target_sys != 0, "link.target_sys must be non-zero");
        anyhow::ensure!(self.sys_id != self.target_sys, "link.sys_id collides with target_sys");
        anyhow::ensure!(self.heartbeat_timeout() >= Duration::from_millis(500), "link.heartbeat_timeout_ms too small");
        if let Some(hz) = self.send_heartbeat_hz {
            anyhow::ensure!(hz.is_finite() && hz > 0.0, "link.send_heartbeat_hz must be a positive rate, got {}", hz);
        }
        Ok(())
    }
}

use serde::Serialize;
use time::OffsetDateTime;

use crate::mode::FlightMode;

pub const RC_MAX_CHANNELS: usize = 18;
pub const RC_RSSI_UNKNOWN: u8 = 255;

/// Base mode bit set by the autopilot while armed.
pub const MAV_MODE_FLAG_SAFETY_ARMED: u8 = 0x80;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionState {
    pub connected: bool,
    pub changed_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeartbeatState {
    pub custom_mode: u32,
    pub base_mode: u8,
    /// `Unknown` when `custom_mode` has no mapping.
    pub flight_mode: FlightMode,
    pub armed: bool,
    pub observed_at: OffsetDateTime,
}

/// Radians and radians/second.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttitudeState {
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
    pub rollspeed: f32,
    pub pitchspeed: f32,
    pub yawspeed: f32,
    pub observed_at: OffsetDateTime,
}

impl AttitudeState {
    pub fn roll_deg(&self) -> f32 { self.roll.to_degrees() }
    pub fn pitch_deg(&self) -> f32 { self.pitch.to_degrees() }

    /// Yaw folded into 0..360.
    pub fn heading_deg(&self) -> f32 {
        self.yaw.to_degrees().rem_euclid(360.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionState {
    pub lat_deg: f64,
    pub lon_deg: f64,
    pub alt_msl_m: f32,
    pub relative_alt_m: f32,
    pub vx_mps: f32,
    pub vy_mps: f32,
    pub vz_mps: f32,
    /// None when the autopilot reports 65535 (unknown).
    pub heading_deg: Option<f32>,
    pub observed_at: OffsetDateTime,
}

impl PositionState {
    pub fn ground_speed_mps(&self) -> f32 {
        self.vx_mps.hypot(self.vy_mps)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VfrHudState {
    pub airspeed_mps: f32,
    pub groundspeed_mps: f32,
    pub alt_m: f32,
    pub climb_mps: f32,
    pub heading_deg: i16,
    pub throttle_pct: u16,
    pub observed_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct BatteryState {
    pub voltage: Option<f32>,      // Volts
    pub current: Option<f32>,      // Amps
    pub remaining: Option<u8>,     // Percent 0-100
    pub observed_at: Option<OffsetDateTime>,
}

/// GPS status from GPS_RAW_INT.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GpsFixState {
    /// 0=no GPS, 1=no fix, 2=2D, 3=3D, 4=DGPS, 5=RTK float, 6=RTK fixed
    pub fix_type: u8,
    pub satellites_visible: u8,
    /// HDOP * 100
    pub eph: u16,
    /// VDOP * 100
    pub epv: u16,
    pub observed_at: OffsetDateTime,
}

impl GpsFixState {
    pub fn has_fix(&self) -> bool { self.fix_type >= 2 }

    pub fn is_rtk(&self) -> bool { self.fix_type >= 5 }

    pub fn hdop_m(&self) -> f32 { f32::from(self.eph) / 100.0 }

    pub fn vdop_m(&self) -> f32 { f32::from(self.epv) / 100.0 }

    pub fn fix_label(&self) -> &'static str {
        match self.fix_type {
            0 => "NO GPS",
            1 => "NO FIX",
            2 => "2D FIX",
            3 => "3D FIX",
            4 => "DGPS",
            5 => "RTK FLOAT",
            6 => "RTK FIXED",
            _ => "UNKNOWN",
        }
    }
}

/// One RC input channel as a PWM pulse width in microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RcChannel {
    pub raw: u16,
}

impl RcChannel {
    pub const MIN_US: u16 = 1000;
    pub const MAX_US: u16 = 2000;

    /// 0 and 65535 mean "no data" on the wire.
    pub fn is_valid(&self) -> bool {
        self.raw != 0 && self.raw != u16::MAX
    }

    /// 1000 -> 0.0, 1500 -> 0.5, 2000 -> 1.0, clamped. Invalid reads as center.
    pub fn normalized(&self) -> f64 {
        if !self.is_valid() {
            return 0.5;
        }
        let span = f64::from(Self::MAX_US - Self::MIN_US);
        ((f64::from(self.raw) - f64::from(Self::MIN_US)) / span).clamp(0.0, 1.0)
    }

    /// 1000 -> -1.0, 1500 -> 0.0, 2000 -> +1.0.
    pub fn centered(&self) -> f64 {
        self.normalized() * 2.0 - 1.0
    }

    pub fn percent(&self) -> f64 {
        self.normalized() * 100.0
    }

    /// Label for the 1-based channel `number` under the usual ArduPilot
    /// input mapping.
    pub fn label(number: usize) -> String {
        let function = match number {
            1 => "ROLL",
            2 => "PITCH",
            3 => "THROTTLE",
            4 => "YAW",
            5 => "MODE",
            6 => "AUX1",
            7 => "AUX2",
            8 => "AUX3",
            _ => return format!("CH{}", number),
        };
        format!("CH{} {}", number, function)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RcChannelsSnapshot {
    pub channels: Vec<RcChannel>,
    pub channel_count: u8,
    /// 0-100, 255 = unknown
    pub rssi: u8,
    pub observed_at: OffsetDateTime,
}

impl RcChannelsSnapshot {
    pub fn rssi_percent(&self) -> Option<u8> {
        (self.rssi != RC_RSSI_UNKNOWN).then_some(self.rssi)
    }

    /// Channels the receiver reports as present (`channel_count`, capped).
    pub fn active(&self) -> &[RcChannel] {
        let n = usize::from(self.channel_count).min(self.channels.len());
        &self.channels[..n]
    }
}

/// One decoded change to the vehicle state; each variant owns one slice of
/// [`VehicleState`].
#[derive(Debug, Clone, PartialEq)]
pub enum VehicleUpdate {
    Connection(ConnectionState),
    Heartbeat(HeartbeatState),
    Attitude(AttitudeState),
    Position(PositionState),
    VfrHud(VfrHudState),
    Battery(BatteryState),
    Gps(GpsFixState),
    RcChannels(RcChannelsSnapshot),
}

impl VehicleUpdate {
    pub fn kind(&self) -> &'static str {
        match self {
            VehicleUpdate::Connection(_) => "connection",
            VehicleUpdate::Heartbeat(_) => "heartbeat",
            VehicleUpdate::Attitude(_) => "attitude",
            VehicleUpdate::Position(_) => "position",
            VehicleUpdate::VfrHud(_) => "vfr_hud",
            VehicleUpdate::Battery(_) => "battery",
            VehicleUpdate::Gps(_) => "gps",
            VehicleUpdate::RcChannels(_) => "rc_channels",
        }
    }
}

/// Snapshot of everything known about the vehicle. Each field is filled in
/// by its own message kind and stays `None` until that message arrives.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct VehicleState {
    pub connection: Option<ConnectionState>,
    pub attitude: Option<AttitudeState>,
    pub position: Option<PositionState>,
    pub vfr_hud: Option<VfrHudState>,
    pub battery: Option<BatteryState>,
    pub flight_mode: Option<FlightMode>,
    pub gps: Option<GpsFixState>,
    pub rc_channels: Option<RcChannelsSnapshot>,
    pub armed: bool,
}

impl VehicleState {
    pub fn is_connected(&self) -> bool {
        self.connection.as_ref().map(|c| c.connected).unwrap_or(false)
    }

    /// Copy of `self` with the slice owned by `update` replaced.
    pub fn with_update(&self, update: VehicleUpdate) -> VehicleState {
        let mut next = self.clone();
        match update {
            VehicleUpdate::Connection(c) => {
                // telemetry lost: can no longer claim the aircraft is armed
                if !c.connected {
                    next.armed = false;
                }
                next.connection = Some(c);
            }
            VehicleUpdate::Heartbeat(hb) => {
                next.flight_mode = Some(hb.flight_mode);
                // armed is only trusted while the link is up
                next.armed = hb.armed && next.is_connected();
            }
            VehicleUpdate::Attitude(a) => next.attitude = Some(a),
            VehicleUpdate::Position(p) => next.position = Some(p),
            VehicleUpdate::VfrHud(v) => next.vfr_hud = Some(v),
            VehicleUpdate::Battery(b) => next.battery = Some(b),
            VehicleUpdate::Gps(g) => next.gps = Some(g),
            VehicleUpdate::RcChannels(rc) => next.rc_channels = Some(rc),
        }
        next
    }
}

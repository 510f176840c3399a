//! One decoder per consumed MAVLink message kind.
//!
//! A decoder turns a [`Frame`] into exactly one [`VehicleUpdate`], stamped
//! with the time it was decoded. Field names are the MAVLink XML names.

mod attitude;
mod battery;
mod gps;
mod heartbeat;
mod position;
mod rc;
mod vfr_hud;

pub use attitude::AttitudeDecoder;
pub use battery::SysStatusDecoder;
pub use gps::GpsRawIntDecoder;
pub use heartbeat::HeartbeatDecoder;
pub use position::GlobalPositionIntDecoder;
pub use rc::RcChannelsDecoder;
pub use vfr_hud::VfrHudDecoder;

use std::fmt;

use time::OffsetDateTime;

use crate::frame::{FieldValue, Frame};
use crate::state::VehicleUpdate;

pub const MSG_HEARTBEAT: u32 = 0;
pub const MSG_SYS_STATUS: u32 = 1;
pub const MSG_GPS_RAW_INT: u32 = 24;
pub const MSG_ATTITUDE: u32 = 30;
pub const MSG_GLOBAL_POSITION_INT: u32 = 33;
pub const MSG_RC_CHANNELS: u32 = 65;
pub const MSG_VFR_HUD: u32 = 74;

#[derive(Debug, Clone, PartialEq)]
pub enum DecodeErrorKind {
    Missing,
    /// Present but does not fit the declared width/signedness.
    Malformed(FieldValue),
}

impl fmt::Display for DecodeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeErrorKind::Missing => f.write_str("missing"),
            DecodeErrorKind::Malformed(v) => write!(f, "malformed ({v:?})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("msg {message_id}: field '{field}' {kind}")]
pub struct DecodeError {
    pub message_id: u32,
    pub field: &'static str,
    pub kind: DecodeErrorKind,
}

pub trait Decoder: Send + Sync {
    /// The single message id this decoder owns.
    fn message_id(&self) -> u32;

    fn decode(&self, frame: &Frame, at: OffsetDateTime) -> Result<VehicleUpdate, DecodeError>;
}

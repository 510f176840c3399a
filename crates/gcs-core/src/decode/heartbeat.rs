use time::OffsetDateTime;

use super::{DecodeError, Decoder, MSG_HEARTBEAT};
use crate::frame::Frame;
use crate::mode::{self, FlightMode};
use crate::state::{HeartbeatState, VehicleUpdate, MAV_MODE_FLAG_SAFETY_ARMED};

/// HEARTBEAT: current custom mode and the armed bit of base_mode.
#[derive(Debug, Default)]
pub struct HeartbeatDecoder;

impl Decoder for HeartbeatDecoder {
    fn message_id(&self) -> u32 {
        MSG_HEARTBEAT
    }

    fn decode(&self, frame: &Frame, at: OffsetDateTime) -> Result<VehicleUpdate, DecodeError> {
        let custom_mode: u32 = frame.field("custom_mode")?;
        let base_mode: u8 = frame.field("base_mode")?;
        Ok(VehicleUpdate::Heartbeat(HeartbeatState {
            custom_mode,
            base_mode,
            flight_mode: mode::from_wire_code(custom_mode).unwrap_or(FlightMode::Unknown),
            armed: base_mode & MAV_MODE_FLAG_SAFETY_ARMED != 0,
            observed_at: at,
        }))
    }
}

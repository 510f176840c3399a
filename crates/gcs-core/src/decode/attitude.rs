use time::OffsetDateTime;

use super::{DecodeError, Decoder, MSG_ATTITUDE};
use crate::frame::Frame;
use crate::state::{AttitudeState, VehicleUpdate};

#[derive(Debug, Default)]
pub struct AttitudeDecoder;

impl Decoder for AttitudeDecoder {
    fn message_id(&self) -> u32 {
        MSG_ATTITUDE
    }

    fn decode(&self, frame: &Frame, at: OffsetDateTime) -> Result<VehicleUpdate, DecodeError> {
        Ok(VehicleUpdate::Attitude(AttitudeState {
            roll: frame.field("roll")?,
            pitch: frame.field("pitch")?,
            yaw: frame.field("yaw")?,
            rollspeed: frame.field("rollspeed")?,
            pitchspeed: frame.field("pitchspeed")?,
            yawspeed: frame.field("yawspeed")?,
            observed_at: at,
        }))
    }
}

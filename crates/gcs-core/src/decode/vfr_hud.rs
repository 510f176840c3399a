use time::OffsetDateTime;

use super::{DecodeError, Decoder, MSG_VFR_HUD};
use crate::frame::Frame;
use crate::state::{VehicleUpdate, VfrHudState};

#[derive(Debug, Default)]
pub struct VfrHudDecoder;

impl Decoder for VfrHudDecoder {
    fn message_id(&self) -> u32 {
        MSG_VFR_HUD
    }

    fn decode(&self, frame: &Frame, at: OffsetDateTime) -> Result<VehicleUpdate, DecodeError> {
        Ok(VehicleUpdate::VfrHud(VfrHudState {
            airspeed_mps: frame.field("airspeed")?,
            groundspeed_mps: frame.field("groundspeed")?,
            alt_m: frame.field("alt")?,
            climb_mps: frame.field("climb")?,
            heading_deg: frame.field("heading")?,
            throttle_pct: frame.field("throttle")?,
            observed_at: at,
        }))
    }
}

use time::OffsetDateTime;

use super::{DecodeError, Decoder, MSG_GPS_RAW_INT};
use crate::frame::Frame;
use crate::state::{GpsFixState, VehicleUpdate};

/// GPS_RAW_INT: fix type and satellite count.
#[derive(Debug, Default)]
pub struct GpsRawIntDecoder;

impl Decoder for GpsRawIntDecoder {
    fn message_id(&self) -> u32 {
        MSG_GPS_RAW_INT
    }

    fn decode(&self, frame: &Frame, at: OffsetDateTime) -> Result<VehicleUpdate, DecodeError> {
        Ok(VehicleUpdate::Gps(GpsFixState {
            fix_type: frame.field("fix_type")?,
            satellites_visible: frame.field("satellites_visible")?,
            eph: frame.field("eph")?,
            epv: frame.field("epv")?,
            observed_at: at,
        }))
    }
}

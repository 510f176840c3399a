use time::OffsetDateTime;

use super::{DecodeError, Decoder, MSG_GLOBAL_POSITION_INT};
use crate::frame::Frame;
use crate::state::{PositionState, VehicleUpdate};

const HDG_UNKNOWN: u16 = u16::MAX;

/// GLOBAL_POSITION_INT: lat/lon in degE7, altitudes in mm, speeds in cm/s,
/// heading in cdeg.
#[derive(Debug, Default)]
pub struct GlobalPositionIntDecoder;

impl Decoder for GlobalPositionIntDecoder {
    fn message_id(&self) -> u32 {
        MSG_GLOBAL_POSITION_INT
    }

    fn decode(&self, frame: &Frame, at: OffsetDateTime) -> Result<VehicleUpdate, DecodeError> {
        let lat: i32 = frame.field("lat")?;
        let lon: i32 = frame.field("lon")?;
        let alt: i32 = frame.field("alt")?;
        let relative_alt: i32 = frame.field("relative_alt")?;
        let vx: i16 = frame.field("vx")?;
        let vy: i16 = frame.field("vy")?;
        let vz: i16 = frame.field("vz")?;
        let hdg: u16 = frame.field("hdg")?;

        Ok(VehicleUpdate::Position(PositionState {
            lat_deg: f64::from(lat) / 1e7,
            lon_deg: f64::from(lon) / 1e7,
            alt_msl_m: alt as f32 / 1000.0,
            relative_alt_m: relative_alt as f32 / 1000.0,
            vx_mps: f32::from(vx) / 100.0,
            vy_mps: f32::from(vy) / 100.0,
            vz_mps: f32::from(vz) / 100.0,
            heading_deg: (hdg != HDG_UNKNOWN).then(|| f32::from(hdg) / 100.0),
            observed_at: at,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scales_units() {
        let f = Frame::new(MSG_GLOBAL_POSITION_INT)
            .with("lat", 473_977_420i32)
            .with("lon", 85_455_940i32)
            .with("alt", 488_000i32)
            .with("relative_alt", 12_500i32)
            .with("vx", 300i16)
            .with("vy", -400i16)
            .with("vz", 0i16)
            .with("hdg", u16::MAX);
        let VehicleUpdate::Position(p) = GlobalPositionIntDecoder
            .decode(&f, OffsetDateTime::UNIX_EPOCH)
            .unwrap()
        else {
            panic!("expected position");
        };
        assert!((p.lat_deg - 47.397742).abs() < 1e-9);
        assert!((p.lon_deg - 8.545594).abs() < 1e-9);
        assert_eq!(p.alt_msl_m, 488.0);
        assert_eq!(p.relative_alt_m, 12.5);
        assert!((p.ground_speed_mps() - 5.0).abs() < 1e-6);
        assert_eq!(p.heading_deg, None);
    }
}

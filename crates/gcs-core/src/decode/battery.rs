use time::OffsetDateTime;

use super::{DecodeError, Decoder, MSG_SYS_STATUS};
use crate::frame::Frame;
use crate::state::{BatteryState, VehicleUpdate};

/// SYS_STATUS battery fields. Each reading has its own "unknown" sentinel,
/// which maps to `None` rather than failing the frame.
#[derive(Debug, Default)]
pub struct SysStatusDecoder;

impl Decoder for SysStatusDecoder {
    fn message_id(&self) -> u32 {
        MSG_SYS_STATUS
    }

    fn decode(&self, frame: &Frame, at: OffsetDateTime) -> Result<VehicleUpdate, DecodeError> {
        let voltage_battery: u16 = frame.field("voltage_battery")?;
        let current_battery: i16 = frame.field("current_battery")?;
        let battery_remaining: i8 = frame.field("battery_remaining")?;

        let mut battery = BatteryState { observed_at: Some(at), ..Default::default() };
        // millivolts
        if voltage_battery != u16::MAX {
            battery.voltage = Some(f32::from(voltage_battery) / 1000.0);
        }
        // centiamps, -1 = not measured
        if current_battery != -1 {
            battery.current = Some(f32::from(current_battery) / 100.0);
        }
        if (0..=100).contains(&battery_remaining) {
            battery.remaining = Some(battery_remaining as u8);
        }
        Ok(VehicleUpdate::Battery(battery))
    }
}

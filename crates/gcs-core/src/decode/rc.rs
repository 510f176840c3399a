use time::OffsetDateTime;

use super::{DecodeError, Decoder, MSG_RC_CHANNELS};
use crate::frame::Frame;
use crate::state::{RcChannel, RcChannelsSnapshot, VehicleUpdate, RC_MAX_CHANNELS};

const CHANNEL_FIELDS: [&str; RC_MAX_CHANNELS] = [
    "chan1_raw", "chan2_raw", "chan3_raw", "chan4_raw", "chan5_raw", "chan6_raw",
    "chan7_raw", "chan8_raw", "chan9_raw", "chan10_raw", "chan11_raw", "chan12_raw",
    "chan13_raw", "chan14_raw", "chan15_raw", "chan16_raw", "chan17_raw", "chan18_raw",
];

/// RC_CHANNELS: all 18 raw pulse widths plus receiver channel count and RSSI.
#[derive(Debug, Default)]
pub struct RcChannelsDecoder;

impl Decoder for RcChannelsDecoder {
    fn message_id(&self) -> u32 {
        MSG_RC_CHANNELS
    }

    fn decode(&self, frame: &Frame, at: OffsetDateTime) -> Result<VehicleUpdate, DecodeError> {
        let channels = CHANNEL_FIELDS
            .iter()
            .map(|&name| frame.field::<u16>(name).map(|raw| RcChannel { raw }))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(VehicleUpdate::RcChannels(RcChannelsSnapshot {
            channels,
            channel_count: frame.field("chancount")?,
            rssi: frame.field("rssi")?,
            observed_at: at,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> Frame {
        let mut f = Frame::new(MSG_RC_CHANNELS).with("chancount", 8u8).with("rssi", 255u8);
        for (i, name) in CHANNEL_FIELDS.iter().enumerate() {
            let raw: u16 = if i < 8 { 1000 + 100 * i as u16 } else { u16::MAX };
            f = f.with(name, raw);
        }
        f
    }

    #[test]
    fn decodes_all_channels() {
        let VehicleUpdate::RcChannels(rc) = RcChannelsDecoder
            .decode(&frame(), OffsetDateTime::UNIX_EPOCH)
            .unwrap()
        else {
            panic!("expected rc channels");
        };
        assert_eq!(rc.channels.len(), RC_MAX_CHANNELS);
        assert_eq!(rc.active().len(), 8);
        assert_eq!(rc.channels[0].normalized(), 0.0);
        assert_eq!(rc.channels[5].normalized(), 0.5);
        assert!(!rc.channels[17].is_valid());
        assert_eq!(rc.channels[17].centered(), 0.0);
        assert_eq!(rc.rssi_percent(), None);
    }

    #[test]
    fn missing_channel_is_reported() {
        let mut f = frame();
        f.fields.remove("chan12_raw");
        let err = RcChannelsDecoder.decode(&f, OffsetDateTime::UNIX_EPOCH).unwrap_err();
        assert_eq!(err.field, "chan12_raw");
    }
}

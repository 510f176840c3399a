//! ArduPilot Plane / QuadPlane flight modes and their `custom_mode` wire codes.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FlightMode {
    // fixed-wing
    Manual,
    Circle,
    Stabilize,
    Training,
    Acro,
    Fbwa,
    Fbwb,
    Cruise,
    Autotune,
    Auto,
    Rtl,
    Loiter,
    Takeoff,
    AvoidAdsb,
    Guided,
    Initialising,

    // quadplane VTOL
    QStabilize,
    QHover,
    QLoiter,
    QLand,
    QRtl,
    QAutotune,
    QAcro,
    Thermal,

    /// Heartbeat carried a custom mode we have no mapping for.
    Unknown,
}

impl FlightMode {
    /// Every mode that has a wire code, in wire-code order.
    pub const ALL: [FlightMode; 24] = [
        FlightMode::Manual,
        FlightMode::Circle,
        FlightMode::Stabilize,
        FlightMode::Training,
        FlightMode::Acro,
        FlightMode::Fbwa,
        FlightMode::Fbwb,
        FlightMode::Cruise,
        FlightMode::Autotune,
        FlightMode::Auto,
        FlightMode::Rtl,
        FlightMode::Loiter,
        FlightMode::Takeoff,
        FlightMode::AvoidAdsb,
        FlightMode::Guided,
        FlightMode::Initialising,
        FlightMode::QStabilize,
        FlightMode::QHover,
        FlightMode::QLoiter,
        FlightMode::QLand,
        FlightMode::QRtl,
        FlightMode::QAutotune,
        FlightMode::QAcro,
        FlightMode::Thermal,
    ];

    /// Symbolic name as written in source, e.g. `QHover`.
    pub fn symbol(self) -> &'static str {
        match self {
            FlightMode::Manual => "Manual",
            FlightMode::Circle => "Circle",
            FlightMode::Stabilize => "Stabilize",
            FlightMode::Training => "Training",
            FlightMode::Acro => "Acro",
            FlightMode::Fbwa => "Fbwa",
            FlightMode::Fbwb => "Fbwb",
            FlightMode::Cruise => "Cruise",
            FlightMode::Autotune => "Autotune",
            FlightMode::Auto => "Auto",
            FlightMode::Rtl => "Rtl",
            FlightMode::Loiter => "Loiter",
            FlightMode::Takeoff => "Takeoff",
            FlightMode::AvoidAdsb => "AvoidAdsb",
            FlightMode::Guided => "Guided",
            FlightMode::Initialising => "Initialising",
            FlightMode::QStabilize => "QStabilize",
            FlightMode::QHover => "QHover",
            FlightMode::QLoiter => "QLoiter",
            FlightMode::QLand => "QLand",
            FlightMode::QRtl => "QRtl",
            FlightMode::QAutotune => "QAutotune",
            FlightMode::QAcro => "QAcro",
            FlightMode::Thermal => "Thermal",
            FlightMode::Unknown => "Unknown",
        }
    }
}

/// Custom mode sent in SET_MODE / DO_SET_MODE.
///
/// Never fails: a mode without a mapping (`Unknown`) encodes as Manual (0).
/// Callers that must not silently fall back should reject `Unknown` first,
/// as [`crate::command::encode_set_mode`] does.
pub fn to_wire_code(mode: FlightMode) -> u32 {
    match mode {
        FlightMode::Manual => 0,
        FlightMode::Circle => 1,
        FlightMode::Stabilize => 2,
        FlightMode::Training => 3,
        FlightMode::Acro => 4,
        FlightMode::Fbwa => 5,
        FlightMode::Fbwb => 6,
        FlightMode::Cruise => 7,
        FlightMode::Autotune => 8,
        FlightMode::Auto => 10,
        FlightMode::Rtl => 11,
        FlightMode::Loiter => 12,
        FlightMode::Takeoff => 13,
        FlightMode::AvoidAdsb => 14,
        FlightMode::Guided => 15,
        FlightMode::Initialising => 16,
        FlightMode::QStabilize => 17,
        FlightMode::QHover => 18,
        FlightMode::QLoiter => 19,
        FlightMode::QLand => 20,
        FlightMode::QRtl => 21,
        FlightMode::QAutotune => 22,
        FlightMode::QAcro => 23,
        FlightMode::Thermal => 24,
        FlightMode::Unknown => 0,
    }
}

/// Mode reported in HEARTBEAT.custom_mode. `None` for codes with no mapping
/// (9 is reserved by the firmware).
pub fn from_wire_code(code: u32) -> Option<FlightMode> {
    let mode = match code {
        0 => FlightMode::Manual,
        1 => FlightMode::Circle,
        2 => FlightMode::Stabilize,
        3 => FlightMode::Training,
        4 => FlightMode::Acro,
        5 => FlightMode::Fbwa,
        6 => FlightMode::Fbwb,
        7 => FlightMode::Cruise,
        8 => FlightMode::Autotune,
        10 => FlightMode::Auto,
        11 => FlightMode::Rtl,
        12 => FlightMode::Loiter,
        13 => FlightMode::Takeoff,
        14 => FlightMode::AvoidAdsb,
        15 => FlightMode::Guided,
        16 => FlightMode::Initialising,
        17 => FlightMode::QStabilize,
        18 => FlightMode::QHover,
        19 => FlightMode::QLoiter,
        20 => FlightMode::QLand,
        21 => FlightMode::QRtl,
        22 => FlightMode::QAutotune,
        23 => FlightMode::QAcro,
        24 => FlightMode::Thermal,
        _ => return None,
    };
    Some(mode)
}

pub fn display_name(mode: FlightMode) -> String {
    let curated = match mode {
        FlightMode::Manual => "MANUAL",
        FlightMode::Circle => "CIRCLE",
        FlightMode::Stabilize => "STABILIZE",
        FlightMode::Training => "TRAINING",
        FlightMode::Acro => "ACRO",
        FlightMode::Fbwa => "FBW-A",
        FlightMode::Fbwb => "FBW-B",
        FlightMode::Cruise => "CRUISE",
        FlightMode::Autotune => "AUTOTUNE",
        FlightMode::Auto => "AUTO",
        FlightMode::Rtl => "RTL",
        FlightMode::Loiter => "LOITER",
        FlightMode::Takeoff => "TAKEOFF",
        FlightMode::AvoidAdsb => "AVOID ADSB",
        FlightMode::Guided => "GUIDED",
        FlightMode::Initialising => "INIT",
        FlightMode::QStabilize => "QSTABILIZE",
        FlightMode::QHover => "QHOVER",
        FlightMode::QLoiter => "QLOITER",
        FlightMode::QLand => "QLAND",
        FlightMode::QRtl => "QRTL",
        FlightMode::QAutotune => "QAUTOTUNE",
        FlightMode::QAcro => "QACRO",
        FlightMode::Thermal => "THERMAL",
        FlightMode::Unknown => return mode.symbol().to_uppercase(),
    };
    curated.to_string()
}

pub fn is_vtol(mode: FlightMode) -> bool {
    matches!(
        mode,
        FlightMode::QStabilize
            | FlightMode::QHover
            | FlightMode::QLoiter
            | FlightMode::QLand
            | FlightMode::QRtl
            | FlightMode::QAutotune
            | FlightMode::QAcro
            | FlightMode::Thermal
    )
}

impl fmt::Display for FlightMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&display_name(*self))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown flight mode '{0}'")]
pub struct ParseModeError(pub String);

impl FromStr for FlightMode {
    type Err = ParseModeError;

    /// Accepts the symbolic name (`qhover`) or the display label (`FBW-A`),
    /// case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        FlightMode::ALL
            .iter()
            .copied()
            .find(|m| {
                m.symbol().eq_ignore_ascii_case(wanted)
                    || display_name(*m).eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| ParseModeError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_codes_round_trip() {
        for code in (0..=24).filter(|c| *c != 9) {
            let mode = from_wire_code(code).expect("mapped code");
            assert_eq!(to_wire_code(mode), code);
            assert_eq!(from_wire_code(to_wire_code(mode)), Some(mode));
        }
    }

    #[test]
    fn unmapped_codes_are_absent() {
        for code in [9, 25, 255, 1000, u32::MAX] {
            assert_eq!(from_wire_code(code), None, "code {code}");
        }
    }

    #[test]
    fn unknown_encodes_as_manual() {
        assert_eq!(to_wire_code(FlightMode::Unknown), 0);
    }

    #[test]
    fn all_modes_have_distinct_codes() {
        let mut codes: Vec<u32> = FlightMode::ALL.iter().map(|m| to_wire_code(*m)).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), FlightMode::ALL.len());
        assert!(!codes.contains(&9));
    }

    #[test]
    fn vtol_classification() {
        let vtol: Vec<_> = FlightMode::ALL.iter().filter(|m| is_vtol(**m)).collect();
        assert_eq!(vtol.len(), 8);
        assert!(is_vtol(FlightMode::Thermal));
        assert!(!is_vtol(FlightMode::Fbwa));
        assert!(!is_vtol(FlightMode::Unknown));
    }

    #[test]
    fn display_names() {
        assert_eq!(display_name(FlightMode::Fbwa), "FBW-A");
        assert_eq!(display_name(FlightMode::Initialising), "INIT");
        assert_eq!(display_name(FlightMode::Unknown), "UNKNOWN");
        assert_eq!(FlightMode::AvoidAdsb.to_string(), "AVOID ADSB");
    }

    #[test]
    fn parse_by_symbol_or_label() {
        assert_eq!("qhover".parse::<FlightMode>(), Ok(FlightMode::QHover));
        assert_eq!("FBW-B".parse::<FlightMode>(), Ok(FlightMode::Fbwb));
        assert_eq!(" guided ".parse::<FlightMode>(), Ok(FlightMode::Guided));
        assert!("unknown".parse::<FlightMode>().is_err());
        assert!("hover".parse::<FlightMode>().is_err());
    }
}

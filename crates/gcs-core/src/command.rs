//! Outbound arm/disarm and set-mode commands.

use std::fmt;
use std::sync::Arc;

use tracing::{info, warn};

use crate::aggregator::Aggregator;
use crate::mode::{self, FlightMode};

pub const MAV_CMD_COMPONENT_ARM_DISARM: u16 = 400;

/// custom-mode-enabled | stabilize | guided | armed
pub const BASE_MODE_ARMED: u8 = 0xD1;
/// custom-mode-enabled | stabilize | guided
pub const BASE_MODE_DISARMED: u8 = 0x51;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub system: u8,
    pub component: u8,
}

impl Default for Target {
    fn default() -> Self {
        // ArduPilot autopilot
        Self { system: 1, component: 1 }
    }
}

/// COMMAND_LONG payload.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandLong {
    pub command: u16,
    pub target: Target,
    pub params: [f32; 7],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetModeRequest {
    pub target: Target,
    pub base_mode: u8,
    pub custom_mode: u32,
}

/// Inputs to a set-mode command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeCommandRequest {
    pub armed: bool,
    pub mode: FlightMode,
}

/// Whatever actually puts commands on the link.
pub trait CommandTransport {
    fn send_command(&mut self, cmd: &CommandLong) -> anyhow::Result<()>;
    fn send_set_mode(&mut self, req: &SetModeRequest) -> anyhow::Result<()>;
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("refusing {action}: {reason}")]
    Precondition { action: String, reason: String },
    #[error("{action} failed: {reason}")]
    Transport { action: String, reason: String },
}

/// A command that left the ground station. Delivery to the vehicle is not
/// confirmed; watch the next snapshots for the effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub action: String,
}

impl fmt::Display for CommandOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} sent", self.action)
    }
}

pub fn encode_arm_disarm(arm: bool, target: Target) -> CommandLong {
    let mut params = [0.0; 7];
    params[0] = if arm { 1.0 } else { 0.0 };
    CommandLong { command: MAV_CMD_COMPONENT_ARM_DISARM, target, params }
}

/// Rejects `Unknown`: the mode table would silently turn it into Manual.
pub fn encode_set_mode(req: ModeCommandRequest, target: Target) -> Result<SetModeRequest, CommandError> {
    if req.mode == FlightMode::Unknown {
        return Err(CommandError::Precondition {
            action: "SET MODE".into(),
            reason: "mode UNKNOWN has no wire code".into(),
        });
    }
    Ok(SetModeRequest {
        target,
        base_mode: if req.armed { BASE_MODE_ARMED } else { BASE_MODE_DISARMED },
        custom_mode: mode::to_wire_code(req.mode),
    })
}

/// Encodes commands against the latest snapshot and hands them to the
/// transport. One attempt per call, no retries.
pub struct CommandSender<T> {
    transport: T,
    state: Arc<Aggregator>,
    target: Target,
}

impl<T: CommandTransport> CommandSender<T> {
    pub fn new(transport: T, state: Arc<Aggregator>, target: Target) -> Self {
        Self { transport, state, target }
    }

    pub fn arm_disarm(&mut self, arm: bool) -> Result<CommandOutcome, CommandError> {
        let action = if arm { "ARM" } else { "DISARM" };
        self.require_connected(action)?;

        let cmd = encode_arm_disarm(arm, self.target);
        info!("sending {}", action);
        self.transport
            .send_command(&cmd)
            .map_err(|e| transport_error(action, e))?;
        Ok(CommandOutcome { action: action.to_string() })
    }

    pub fn set_mode(&mut self, mode: FlightMode) -> Result<CommandOutcome, CommandError> {
        let action = mode.to_string();
        // snapshot is an owned Arc; no aggregator lock is held past this line
        let snapshot = self.state.snapshot();
        if !snapshot.is_connected() {
            return Err(not_connected(&action));
        }

        let req = encode_set_mode(ModeCommandRequest { armed: snapshot.armed, mode }, self.target)?;
        info!(
            "setting mode {} (base_mode=0x{:02X} custom_mode={})",
            action, req.base_mode, req.custom_mode
        );
        self.transport
            .send_set_mode(&req)
            .map_err(|e| transport_error(&action, e))?;
        Ok(CommandOutcome { action })
    }

    fn require_connected(&self, action: &str) -> Result<(), CommandError> {
        if self.state.snapshot().is_connected() {
            Ok(())
        } else {
            Err(not_connected(action))
        }
    }
}

fn not_connected(action: &str) -> CommandError {
    warn!("{} refused: vehicle not connected", action);
    CommandError::Precondition { action: action.to_string(), reason: "vehicle not connected".into() }
}

fn transport_error(action: &str, e: anyhow::Error) -> CommandError {
    warn!("{} failed: {:#}", action, e);
    CommandError::Transport { action: action.to_string(), reason: format!("{:#}", e) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{ConnectionState, HeartbeatState, VehicleUpdate};
    use time::OffsetDateTime;

    #[derive(Default)]
    struct Recorder {
        commands: Vec<CommandLong>,
        modes: Vec<SetModeRequest>,
        fail: bool,
    }

    impl CommandTransport for Recorder {
        fn send_command(&mut self, cmd: &CommandLong) -> anyhow::Result<()> {
            anyhow::ensure!(!self.fail, "serial write timed out");
            self.commands.push(cmd.clone());
            Ok(())
        }
        fn send_set_mode(&mut self, req: &SetModeRequest) -> anyhow::Result<()> {
            anyhow::ensure!(!self.fail, "serial write timed out");
            self.modes.push(*req);
            Ok(())
        }
    }

    fn connected_state(armed: bool) -> Arc<Aggregator> {
        let agg = Arc::new(Aggregator::new());
        agg.apply(VehicleUpdate::Connection(ConnectionState {
            connected: true,
            changed_at: OffsetDateTime::UNIX_EPOCH,
        }));
        agg.apply(VehicleUpdate::Heartbeat(HeartbeatState {
            custom_mode: 5,
            base_mode: if armed { BASE_MODE_ARMED } else { BASE_MODE_DISARMED },
            flight_mode: FlightMode::Fbwa,
            armed,
            observed_at: OffsetDateTime::UNIX_EPOCH,
        }));
        agg
    }

    #[test]
    fn encodes_arm_and_disarm() {
        let arm = encode_arm_disarm(true, Target::default());
        assert_eq!(arm.command, 400);
        assert_eq!(arm.params, [1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(encode_arm_disarm(false, Target::default()).params[0], 0.0);
    }

    #[test]
    fn set_mode_base_mode_follows_armed() {
        let t = Target::default();
        let armed = encode_set_mode(ModeCommandRequest { armed: true, mode: FlightMode::Guided }, t).unwrap();
        assert_eq!((armed.base_mode, armed.custom_mode), (0xD1, 15));
        let disarmed = encode_set_mode(ModeCommandRequest { armed: false, mode: FlightMode::Guided }, t).unwrap();
        assert_eq!((disarmed.base_mode, disarmed.custom_mode), (0x51, 15));
    }

    #[test]
    fn set_mode_unknown_is_refused() {
        let err = encode_set_mode(
            ModeCommandRequest { armed: false, mode: FlightMode::Unknown },
            Target::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CommandError::Precondition { .. }));
    }

    #[test]
    fn sender_uses_snapshot_armed_flag() {
        let mut sender = CommandSender::new(Recorder::default(), connected_state(true), Target::default());
        let out = sender.set_mode(FlightMode::Guided).unwrap();
        assert_eq!(out.to_string(), "GUIDED sent");
        assert_eq!(sender.transport.modes[0].base_mode, 0xD1);
        assert_eq!(sender.transport.modes[0].custom_mode, 15);
    }

    #[test]
    fn refuses_when_disconnected() {
        let agg = Arc::new(Aggregator::new());
        let mut sender = CommandSender::new(Recorder::default(), agg, Target::default());
        let err = sender.arm_disarm(true).unwrap_err();
        assert_eq!(err.to_string(), "refusing ARM: vehicle not connected");
        assert!(sender.set_mode(FlightMode::Rtl).is_err());
        assert!(sender.transport.commands.is_empty());
        assert!(sender.transport.modes.is_empty());
    }

    #[test]
    fn transport_failure_is_returned_once() {
        let mut sender = CommandSender::new(
            Recorder { fail: true, ..Default::default() },
            connected_state(false),
            Target::default(),
        );
        match sender.arm_disarm(true) {
            Err(CommandError::Transport { action, reason }) => {
                assert_eq!(action, "ARM");
                assert!(reason.contains("timed out"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(sender.transport.commands.is_empty());
    }
}

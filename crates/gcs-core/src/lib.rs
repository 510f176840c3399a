//! Telemetry and command core for an ArduPilot Plane / QuadPlane ground
//! station.
//!
//! Inbound: [`mav::MavLink`] produces [`frame::Frame`]s, the
//! [`dispatch::Registry`] decodes them and the [`aggregator::Aggregator`]
//! publishes a new [`state::VehicleState`] snapshot per update. The
//! [`monitor::LinkSupervisor`] sits in front of both and turns heartbeat
//! arrival and timeout into connection state.
//! Outbound: [`command::CommandSender`] encodes arm/disarm and set-mode
//! requests against the latest snapshot.

pub mod aggregator;
pub mod command;
pub mod config;
pub mod decode;
pub mod dispatch;
pub mod frame;
pub mod mav;
pub mod mode;
pub mod monitor;
pub mod state;

pub use aggregator::Aggregator;
pub use command::{CommandError, CommandOutcome, CommandSender, CommandTransport, Target};
pub use config::LinkConfig;
pub use dispatch::{DispatchOutcome, Registry, RegistrationError};
pub use frame::{FieldValue, Frame};
pub use mode::FlightMode;
pub use monitor::LinkSupervisor;
pub use state::{VehicleState, VehicleUpdate};

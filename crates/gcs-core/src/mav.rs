//! Adapter between the `mavlink` crate and the core: incoming `MavMessage`s
//! become [`Frame`]s, outgoing commands become COMMAND_LONG messages.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use mavlink::{
    common::{
        MavAutopilot, MavCmd, MavMessage, MavModeFlag, MavState, MavType, COMMAND_LONG_DATA,
        HEARTBEAT_DATA,
    },
    MavConnection, MavHeader, Message,
};
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info};

use crate::command::{CommandLong, CommandTransport, SetModeRequest, Target, MAV_CMD_COMPONENT_ARM_DISARM};
use crate::config::LinkConfig;
use crate::frame::Frame;

type Conn = dyn MavConnection<MavMessage> + Send + Sync;

/// Shared handle to one MAVLink connection. Clones share the connection and
/// the outgoing sequence counter, so the reader loop and the command path
/// can each own one.
#[derive(Clone)]
pub struct MavLink {
    conn: Arc<Conn>,
    sys_id: u8,
    comp_id: u8,
    sequence: Arc<AtomicU8>,
    target: Target,
}

impl MavLink {
    /// Must be called inside a tokio runtime when `url` is a serial port.
    pub fn open(cfg: &LinkConfig) -> Result<Self> {
        cfg.validate()?;
        if let Some((dev, baud)) = serial_device(&cfg.url) {
            // quick validate device
            let _ = tokio_serial::new(dev, baud)
                .open_native_async()
                .with_context(|| format!("open serial device {}", dev))?;
        }

        let conn = mavlink::connect::<MavMessage>(&cfg.url)
            .with_context(|| format!("mavlink connect {}", cfg.url))?;
        info!("link: connected to {}", cfg.url);

        Ok(Self {
            conn: Arc::from(conn),
            sys_id: cfg.sys_id,
            comp_id: cfg.comp_id,
            sequence: Arc::new(AtomicU8::new(0)),
            target: cfg.target(),
        })
    }

    /// Blocking receive. Returns `None` for messages from systems other than
    /// the target, and for heartbeats from non-autopilot components.
    pub fn recv_frame(&self) -> Result<Option<Frame>> {
        let (hdr, msg) = self.conn.recv().context("mavlink recv")?;
        if hdr.system_id != self.target.system {
            return Ok(None);
        }
        if matches!(msg, MavMessage::HEARTBEAT(_)) && hdr.component_id != self.target.component {
            debug!("ignoring heartbeat from component {}", hdr.component_id);
            return Ok(None);
        }
        Ok(Some(to_frame(&msg)))
    }

    pub fn send_heartbeat(&self) -> Result<()> {
        let hb = HEARTBEAT_DATA {
            custom_mode: 0,
            mavtype: MavType::MAV_TYPE_GCS,
            autopilot: MavAutopilot::MAV_AUTOPILOT_INVALID,
            base_mode: MavModeFlag::empty(),
            system_status: MavState::MAV_STATE_ACTIVE,
            mavlink_version: 3,
        };
        self.send(MavMessage::HEARTBEAT(hb))
    }

    fn command_long(&self, command: MavCmd, target: Target, params: [f32; 7]) -> MavMessage {
        MavMessage::COMMAND_LONG(COMMAND_LONG_DATA {
            target_system: target.system,
            target_component: target.component,
            command,
            confirmation: 0,
            param1: params[0],
            param2: params[1],
            param3: params[2],
            param4: params[3],
            param5: params[4],
            param6: params[5],
            param7: params[6],
        })
    }

    fn send(&self, msg: MavMessage) -> Result<()> {
        let hdr = MavHeader {
            system_id: self.sys_id,
            component_id: self.comp_id,
            sequence: self.sequence.fetch_add(1, Ordering::Relaxed),
        };
        self.conn.send(&hdr, &msg).context("mavlink send")?;
        Ok(())
    }
}

impl CommandTransport for MavLink {
    fn send_command(&mut self, cmd: &CommandLong) -> Result<()> {
        let command = match cmd.command {
            MAV_CMD_COMPONENT_ARM_DISARM => MavCmd::MAV_CMD_COMPONENT_ARM_DISARM,
            other => anyhow::bail!("command id {} not supported by this link", other),
        };
        let msg = self.command_long(command, cmd.target, cmd.params);
        self.send(msg)
    }

    /// Sent as MAV_CMD_DO_SET_MODE so the raw base mode byte goes out as is.
    fn send_set_mode(&mut self, req: &SetModeRequest) -> Result<()> {
        let mut params = [0.0; 7];
        params[0] = f32::from(req.base_mode);
        params[1] = req.custom_mode as f32;
        let msg = self.command_long(MavCmd::MAV_CMD_DO_SET_MODE, req.target, params);
        self.send(msg)
    }
}

/// "serial:/dev/ttyUSB0:57600" -> ("/dev/ttyUSB0", 57600)
fn serial_device(url: &str) -> Option<(&str, u32)> {
    let rest = url.strip_prefix("serial:")?;
    let (dev, baud) = rest.rsplit_once(':')?;
    Some((dev, baud.parse().ok()?))
}

/// Flatten the messages the decoders consume into name/value frames. Other
/// messages keep their id and carry no fields; the registry ignores them.
pub fn to_frame(msg: &MavMessage) -> Frame {
    let frame = Frame::new(msg.message_id());
    match msg {
        MavMessage::HEARTBEAT(d) => frame
            .with("custom_mode", d.custom_mode)
            .with("base_mode", d.base_mode.bits()),
        MavMessage::SYS_STATUS(d) => frame
            .with("voltage_battery", d.voltage_battery)
            .with("current_battery", d.current_battery)
            .with("battery_remaining", d.battery_remaining),
        MavMessage::GPS_RAW_INT(d) => frame
            .with("fix_type", d.fix_type as u8)
            .with("satellites_visible", d.satellites_visible)
            .with("eph", d.eph)
            .with("epv", d.epv),
        MavMessage::ATTITUDE(d) => frame
            .with("roll", d.roll)
            .with("pitch", d.pitch)
            .with("yaw", d.yaw)
            .with("rollspeed", d.rollspeed)
            .with("pitchspeed", d.pitchspeed)
            .with("yawspeed", d.yawspeed),
        MavMessage::GLOBAL_POSITION_INT(d) => frame
            .with("lat", d.lat)
            .with("lon", d.lon)
            .with("alt", d.alt)
            .with("relative_alt", d.relative_alt)
            .with("vx", d.vx)
            .with("vy", d.vy)
            .with("vz", d.vz)
            .with("hdg", d.hdg),
        MavMessage::VFR_HUD(d) => frame
            .with("airspeed", d.airspeed)
            .with("groundspeed", d.groundspeed)
            .with("alt", d.alt)
            .with("climb", d.climb)
            .with("heading", d.heading)
            .with("throttle", d.throttle),
        MavMessage::RC_CHANNELS(d) => frame
            .with("chancount", d.chancount)
            .with("rssi", d.rssi)
            .with("chan1_raw", d.chan1_raw)
            .with("chan2_raw", d.chan2_raw)
            .with("chan3_raw", d.chan3_raw)
            .with("chan4_raw", d.chan4_raw)
            .with("chan5_raw", d.chan5_raw)
            .with("chan6_raw", d.chan6_raw)
            .with("chan7_raw", d.chan7_raw)
            .with("chan8_raw", d.chan8_raw)
            .with("chan9_raw", d.chan9_raw)
            .with("chan10_raw", d.chan10_raw)
            .with("chan11_raw", d.chan11_raw)
            .with("chan12_raw", d.chan12_raw)
            .with("chan13_raw", d.chan13_raw)
            .with("chan14_raw", d.chan14_raw)
            .with("chan15_raw", d.chan15_raw)
            .with("chan16_raw", d.chan16_raw)
            .with("chan17_raw", d.chan17_raw)
            .with("chan18_raw", d.chan18_raw),
        _ => frame,
    }
}

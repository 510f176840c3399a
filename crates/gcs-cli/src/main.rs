use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use gcs_core::mav::MavLink;
use gcs_core::mode::{self, FlightMode};
use gcs_core::state::RcChannel;
use gcs_core::{Aggregator, CommandSender, LinkConfig, LinkSupervisor, Registry, VehicleState};

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

#[derive(Debug, Parser)]
#[command(name = "gcs", version, about = "ArduPlane / QuadPlane ground control link")]
struct Cli {
    #[arg(long, default_value = "gcs.toml")]
    config: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the flight mode table.
    Modes,
    /// Connect and log vehicle state until interrupted.
    Monitor,
    Arm,
    Disarm,
    /// Switch flight mode, e.g. `gcs mode QLOITER`.
    Mode { name: String },
}

#[derive(Debug, serde::Deserialize)]
struct Config {
    link: LinkConfig,
}

fn load_config(path: &str) -> Result<Config> {
    let s = std::fs::read_to_string(path).context("read config")?;
    Ok(toml::from_str(&s).context("parse config toml")?)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Command::Modes => print_modes(),
        Command::Monitor => monitor(&load_config(&cli.config)?.link).await?,
        Command::Arm => command(&load_config(&cli.config)?.link, Request::ArmDisarm(true)).await?,
        Command::Disarm => command(&load_config(&cli.config)?.link, Request::ArmDisarm(false)).await?,
        Command::Mode { name } => {
            let mode: FlightMode = name.parse()?;
            command(&load_config(&cli.config)?.link, Request::SetMode(mode)).await?
        }
    }
    Ok(())
}

fn print_modes() {
    for m in FlightMode::ALL {
        println!(
            "{:>3}  {:<11} {}",
            mode::to_wire_code(m),
            mode::display_name(m),
            if mode::is_vtol(m) { "vtol" } else { "fixed-wing" }
        );
    }
}

/// Running link: reader thread feeding the aggregator plus the heartbeat
/// and watchdog task.
struct Session {
    link: MavLink,
    state: Arc<Aggregator>,
}

async fn start_session(cfg: &LinkConfig) -> Result<Session> {
    let link = MavLink::open(cfg).context("link open")?;
    let registry = Registry::with_builtin_decoders().context("decoder registration")?;
    let state = Arc::new(Aggregator::new());

    let supervisor = Arc::new(LinkSupervisor::new(cfg.heartbeat_timeout(), state.clone()));

    // Reader runs on its own thread: mavlink recv blocks.
    {
        let link = link.clone();
        let supervisor = supervisor.clone();
        std::thread::Builder::new()
            .name("mav-rx".into())
            .spawn(move || loop {
                match link.recv_frame() {
                    Ok(Some(frame)) => {
                        supervisor.handle_frame(&registry, &frame, Instant::now());
                    }
                    Ok(None) => {}
                    Err(e) => {
                        warn!("link recv failed: {:#}", e);
                        std::thread::sleep(Duration::from_millis(100));
                    }
                }
            })
            .context("spawn reader thread")?;
    }

    // GCS heartbeat + link watchdog.
    {
        let link = link.clone();
        let mut tick = tokio::time::interval(cfg.heartbeat_interval());
        tokio::spawn(async move {
            loop {
                tick.tick().await;
                if let Err(e) = link.send_heartbeat() {
                    warn!("heartbeat send failed: {:#}", e);
                }
                supervisor.tick(Instant::now());
            }
        });
    }

    Ok(Session { link, state })
}

async fn monitor(cfg: &LinkConfig) -> Result<()> {
    info!("monitor: starting");
    let session = start_session(cfg).await?;
    let mut rx = session.state.subscribe();
    let every = cfg.snapshot_log_interval();
    let mut last_log: Option<Instant> = None;

    loop {
        tokio::select! {
            changed = rx.changed() => {
                changed.context("state publisher gone")?;
                if last_log.map(|t| t.elapsed() >= every).unwrap_or(true) {
                    let s = rx.borrow_and_update().clone();
                    log_snapshot(&s);
                    last_log = Some(Instant::now());
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("monitor: stopping");
                return Ok(());
            }
        }
    }
}

fn log_snapshot(s: &VehicleState) {
    let mode = s.flight_mode.map(|m| m.to_string()).unwrap_or_else(|| "-".into());
    let gps = s
        .gps
        .as_ref()
        .map(|g| format!("{} sats={} hdop={:.2}", g.fix_label(), g.satellites_visible, g.hdop_m()))
        .unwrap_or_else(|| "-".into());
    let batt = s
        .battery
        .as_ref()
        .and_then(|b| b.voltage)
        .map(|v| format!("{:.2}V", v))
        .unwrap_or_else(|| "-".into());
    let (alt, airspeed) = s
        .vfr_hud
        .as_ref()
        .map(|h| (format!("{:.1}m", h.alt_m), format!("{:.1}m/s", h.airspeed_mps)))
        .unwrap_or_else(|| ("-".into(), "-".into()));
    let att = s
        .attitude
        .as_ref()
        .map(|a| format!("r={:.1} p={:.1} hdg={:.0}", a.roll_deg(), a.pitch_deg(), a.heading_deg()))
        .unwrap_or_else(|| "-".into());
    info!(
        "connected={} armed={} mode={} att=[{}] gps=[{}] batt={} alt={} as={}",
        s.is_connected(), s.armed, mode, att, gps, batt, alt, airspeed
    );
    if let Some(rc) = &s.rc_channels {
        let sticks: Vec<String> = rc
            .active()
            .iter()
            .take(8)
            .enumerate()
            .map(|(i, c)| format!("{}={:.0}%", RcChannel::label(i + 1), c.percent()))
            .collect();
        info!("rc rssi={:?} {}", rc.rssi_percent(), sticks.join(" "));
    }
}

#[derive(Debug, Clone, Copy)]
enum Request {
    ArmDisarm(bool),
    SetMode(FlightMode),
}

async fn command(cfg: &LinkConfig, req: Request) -> Result<()> {
    let session = start_session(cfg).await?;
    let mut rx = session.state.subscribe();

    tokio::time::timeout(cfg.heartbeat_timeout() * 3, wait_for(&mut rx, |s| s.is_connected()))
        .await
        .context("no vehicle heartbeat")??;

    // Send off the async workers; the reader thread keeps decoding meanwhile.
    let mut sender = CommandSender::new(session.link.clone(), session.state.clone(), cfg.target());
    let outcome = tokio::task::spawn_blocking(move || match req {
        Request::ArmDisarm(arm) => sender.arm_disarm(arm),
        Request::SetMode(mode) => sender.set_mode(mode),
    })
    .await
    .context("command task")?;

    match outcome {
        Ok(sent) => println!("{}", sent),
        Err(e) => anyhow::bail!("{}", e),
    }

    let confirmed = tokio::time::timeout(
        Duration::from_secs(3),
        wait_for(&mut rx, move |s| match req {
            Request::ArmDisarm(arm) => s.armed == arm,
            Request::SetMode(mode) => s.flight_mode == Some(mode),
        }),
    )
    .await;
    match confirmed {
        Ok(Ok(())) => println!("vehicle confirmed"),
        _ => println!("no confirmation from vehicle yet"),
    }
    Ok(())
}

async fn wait_for(
    rx: &mut watch::Receiver<Arc<VehicleState>>,
    pred: impl Fn(&VehicleState) -> bool,
) -> Result<()> {
    loop {
        if pred(&rx.borrow_and_update()) {
            return Ok(());
        }
        rx.changed().await.context("state publisher gone")?;
    }
}

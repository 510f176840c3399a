use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use gcs_core::command::{CommandLong, SetModeRequest};
use gcs_core::decode::{MSG_ATTITUDE, MSG_GPS_RAW_INT, MSG_HEARTBEAT};
use gcs_core::{
    Aggregator, CommandError, CommandSender, CommandTransport, DispatchOutcome, FlightMode, Frame,
    LinkSupervisor, Registry, Target,
};

#[derive(Clone, Default)]
struct SharedRecorder {
    sent: Arc<Mutex<Vec<String>>>,
}

impl CommandTransport for SharedRecorder {
    fn send_command(&mut self, cmd: &CommandLong) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(format!("cmd {} p1={}", cmd.command, cmd.params[0]));
        Ok(())
    }

    fn send_set_mode(&mut self, req: &SetModeRequest) -> anyhow::Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push(format!("mode base=0x{:02X} custom={}", req.base_mode, req.custom_mode));
        Ok(())
    }
}

fn heartbeat(custom_mode: u32, base_mode: u8) -> Frame {
    Frame::new(MSG_HEARTBEAT)
        .with("custom_mode", custom_mode)
        .with("base_mode", base_mode)
}

fn gps(fix_type: u8, sats: u8, dop: u16) -> Frame {
    Frame::new(MSG_GPS_RAW_INT)
        .with("fix_type", fix_type)
        .with("satellites_visible", sats)
        .with("eph", dop)
        .with("epv", dop)
}

fn attitude(roll: f32) -> Frame {
    Frame::new(MSG_ATTITUDE)
        .with("roll", roll)
        .with("pitch", 0.0f32)
        .with("yaw", 0.0f32)
        .with("rollspeed", 0.0f32)
        .with("pitchspeed", 0.0f32)
        .with("yawspeed", 0.0f32)
}

#[test]
fn telemetry_drives_commands() {
    let registry = Registry::with_builtin_decoders().unwrap();
    let agg = Arc::new(Aggregator::new());
    let recorder = SharedRecorder::default();
    let mut sender = CommandSender::new(recorder.clone(), agg.clone(), Target::default());

    // no heartbeat yet: nothing goes out
    assert!(matches!(sender.arm_disarm(true), Err(CommandError::Precondition { .. })));

    let link = LinkSupervisor::new(Duration::from_secs(3), agg.clone());
    let t0 = Instant::now();
    assert_eq!(link.handle_frame(&registry, &heartbeat(5, 0x51), t0), DispatchOutcome::Applied);

    let s = agg.snapshot();
    assert!(s.is_connected());
    assert_eq!(s.flight_mode, Some(FlightMode::Fbwa));
    assert!(!s.armed);

    assert_eq!(sender.arm_disarm(true).unwrap().to_string(), "ARM sent");
    sender.set_mode(FlightMode::Guided).unwrap();

    // vehicle reports armed
    link.handle_frame(&registry, &heartbeat(15, 0xD1), t0 + Duration::from_secs(1));
    sender.set_mode(FlightMode::Guided).unwrap();

    assert_eq!(
        *recorder.sent.lock().unwrap(),
        vec![
            "cmd 400 p1=1".to_string(),
            "mode base=0x51 custom=15".to_string(),
            "mode base=0xD1 custom=15".to_string(),
        ]
    );

    // link loss disarms the snapshot and blocks further commands
    assert!(link.tick(t0 + Duration::from_secs(5)));
    let s = agg.snapshot();
    assert!(!s.is_connected());
    assert!(!s.armed);
    assert!(sender.arm_disarm(false).is_err());
}

#[test]
fn readers_never_see_torn_snapshots() {
    let registry = Registry::with_builtin_decoders().unwrap();
    let agg = Arc::new(Aggregator::new());
    registry.dispatch(&attitude(0.25), &agg);

    let done = Arc::new(AtomicBool::new(false));
    let reader = {
        let agg = agg.clone();
        let done = done.clone();
        thread::spawn(move || {
            let mut samples = 0u64;
            loop {
                let finished = done.load(Ordering::Acquire);
                let s = agg.snapshot();
                let roll = s.attitude.as_ref().map(|a| a.roll);
                assert_eq!(roll, Some(0.25));
                if let Some(g) = &s.gps {
                    // written together in every update
                    assert_eq!(g.eph, g.epv);
                    assert_eq!(u16::from(g.satellites_visible), g.eph % 256);
                }
                samples += 1;
                if finished {
                    break;
                }
            }
            samples
        })
    };

    for i in 0..10_000u16 {
        let frame = gps(3, (i % 256) as u8, i);
        assert_eq!(registry.dispatch(&frame, &agg), DispatchOutcome::Applied);
    }
    done.store(true, Ordering::Release);

    let samples = reader.join().unwrap();
    assert!(samples > 0);
    let last = agg.snapshot();
    assert_eq!(last.gps.as_ref().map(|g| g.eph), Some(9_999));
    assert_eq!(last.attitude.as_ref().map(|a| a.roll), Some(0.25));
}

#[test]
fn malformed_frames_do_not_stop_processing() {
    let registry = Registry::with_builtin_decoders().unwrap();
    let agg = Aggregator::new();

    let outcomes: Vec<_> = [
        gps(3, 10, 120).with("fix_type", -1i32),
        Frame::new(42),
        gps(3, 10, 120),
    ]
    .iter()
    .map(|f| registry.dispatch(f, &agg))
    .collect();

    assert!(matches!(outcomes[0], DispatchOutcome::Dropped(_)));
    assert_eq!(outcomes[1], DispatchOutcome::Ignored);
    assert_eq!(outcomes[2], DispatchOutcome::Applied);
    assert_eq!(agg.snapshot().gps.as_ref().map(|g| g.hdop_m()), Some(1.2));
}

#[test]
fn link_flapping_never_publishes_armed_while_disconnected() {
    let registry = Registry::with_builtin_decoders().unwrap();
    let link = Arc::new(LinkSupervisor::new(Duration::from_millis(1), Arc::new(Aggregator::new())));

    let done = Arc::new(AtomicBool::new(false));
    let reader = {
        let agg = link.state().clone();
        let done = done.clone();
        thread::spawn(move || loop {
            let finished = done.load(Ordering::Acquire);
            let s = agg.snapshot();
            assert!(!(s.armed && !s.is_connected()), "armed snapshot without a link");
            if finished {
                break;
            }
        })
    };
    let watchdog = {
        let link = link.clone();
        let done = done.clone();
        thread::spawn(move || {
            let mut losses = 0u32;
            while !done.load(Ordering::Acquire) {
                if link.tick(Instant::now()) {
                    losses += 1;
                }
            }
            losses
        })
    };

    for i in 0..5_000u32 {
        let outcome = link.handle_frame(&registry, &heartbeat(19, 0xD1), Instant::now());
        assert_eq!(outcome, DispatchOutcome::Applied);
        if i % 50 == 0 {
            // let the watchdog see a stale link
            thread::sleep(Duration::from_millis(2));
        }
    }
    done.store(true, Ordering::Release);
    reader.join().unwrap();
    let losses = watchdog.join().unwrap();
    assert!(losses > 0);

    assert_eq!(link.is_connected(), link.state().snapshot().is_connected());

    // the next heartbeat always brings both back up, armed
    link.handle_frame(&registry, &heartbeat(19, 0xD1), Instant::now());
    let s = link.state().snapshot();
    assert!(link.is_connected());
    assert!(s.is_connected());
    assert!(s.armed);
    assert_eq!(s.flight_mode, Some(FlightMode::QLoiter));
}

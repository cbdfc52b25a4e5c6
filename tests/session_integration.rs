//! Integration tests for a full control/data session.
//!
//! A simulated driver stands in for the sensor, so every cycle
//! (open → activate → open_data_source → data_open → fire → poll → close)
//! runs without hardware, with polls on their own threads where they block.

use std::collections::HashMap;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use gesture_hal::{
    builtin_gestures, Capabilities, ControlDevice, DataDevice, Delivery, Device, GestureHandle,
    GestureModule, GestureRecord, GestureVector, HalError, PollOutcome, SimulatedDriver,
    WAKE_SENTINEL,
};

fn session() -> (Arc<SimulatedDriver>, GestureModule) {
    let driver = Arc::new(SimulatedDriver::new(builtin_gestures()));
    let module = GestureModule::new(driver.clone()).unwrap();
    (driver, module)
}

/// Keep waking until a poll was actually blocked to receive it
fn wake_blocked_poll(control: &ControlDevice) {
    for _ in 0..2000 {
        if control.wake() {
            return;
        }
        thread::sleep(Duration::from_millis(1));
    }
    panic!("no poll ever blocked");
}

// ── end-to-end scenario ──

#[test]
fn single_tap_scenario() {
    let (driver, module) = session();
    let control = module.open("control").unwrap().into_control().unwrap();
    let data = module.open("data").unwrap().into_data().unwrap();

    control.activate(2, true).unwrap();
    control.set_sensitivity(2, 5).unwrap();
    let channel = control.open_data_source().unwrap();
    data.data_open(&channel).unwrap();

    let t = 1_234_567_890;
    let delivery = driver.fire_at(2, GestureVector::new([0.0, 0.0, 0.0], 1), t);
    assert_eq!(delivery, Some(Delivery::Queued));

    let mut record = GestureRecord::zeroed();
    assert_eq!(data.poll_raw(&mut record), 2);
    assert_eq!(record.gesture, 2);
    assert_eq!(record.vector, [0.0, 0.0, 0.0]);
    assert_eq!(record.status, 1);
    assert_eq!(record.time, t);

    control.close();
    let single_tap = control.activation().get(GestureHandle::new(2)).unwrap();
    assert!(!single_tap.enabled);

    data.data_close();
    let (tx, done) = mpsc::channel();
    let data = Arc::new(data);
    let poller = Arc::clone(&data);
    thread::spawn(move || tx.send(poller.poll_raw(&mut GestureRecord::zeroed())).unwrap());
    assert_eq!(
        done.recv_timeout(Duration::from_secs(2)).unwrap(),
        WAKE_SENTINEL
    );
}

#[test]
fn round_trip_through_token() {
    let (driver, module) = session();
    let control = module.open_control().unwrap();
    control.activate(1, true).unwrap();
    let token = control.open_data_source().unwrap().token();

    // Only the serialised token crosses over
    let text = token.to_string();
    let data = module.open_data();
    data.data_open_token(text.parse().unwrap()).unwrap();

    driver.fire(1, GestureVector::new([0.5, -0.5, 1.0], 3));
    match data.poll().unwrap() {
        PollOutcome::Event(event) => assert_eq!(event.gesture, GestureHandle::new(1)),
        PollOutcome::Woken => panic!("expected an event"),
    }
}

// ── error taxonomy ──

#[test]
fn unknown_handles_rejected_without_side_effects() {
    let (driver, module) = session();
    let control = module.open_control().unwrap();
    control.activate(3, true).unwrap();
    let before = control.activation().snapshot();

    for handle in [0, 5, 42, 255, 256, 1000, -7] {
        assert!(matches!(
            control.activate(handle, true),
            Err(HalError::InvalidArgument(_))
        ));
        assert!(matches!(
            control.set_sensitivity(handle, 1),
            Err(HalError::InvalidArgument(_))
        ));
    }
    assert_eq!(control.activation().snapshot(), before);
    assert_eq!(driver.hardware_toggles(), 1);
}

#[test]
fn unreachable_sensor_is_unavailable() {
    let (driver, module) = session();
    driver.set_available(false);
    let err = module.open("control").unwrap_err();
    assert!(matches!(err, HalError::Unavailable(_)));
    assert_eq!(err.errno(), -libc::ENODEV);
}

#[test]
fn unknown_device_name_not_found() {
    let (_driver, module) = session();
    assert!(matches!(module.open("sensor"), Err(HalError::NotFound(_))));
    assert!(matches!(module.open("data"), Ok(Device::Data(_))));
}

#[test]
fn data_open_rejects_foreign_token() {
    let (_driver, module) = session();
    let control = module.open_control().unwrap();
    let token = control.open_data_source().unwrap().token();
    assert_eq!(control.close_data_source().map(|r| r.is_ok()), Some(true));

    let data = DataDevice::new();
    assert!(matches!(
        data.data_open_token(token),
        Err(HalError::Protocol(_))
    ));
}

// ── activation ──

#[test]
fn enabling_twice_touches_hardware_once() {
    let (driver, module) = session();
    let control = module.open_control().unwrap();
    control.activate(4, true).unwrap();
    control.activate(4, true).unwrap();
    assert_eq!(driver.hardware_toggles(), 1);
    control.activate(4, false).unwrap();
    control.activate(4, false).unwrap();
    assert_eq!(driver.hardware_toggles(), 2);
}

#[test]
fn disabled_gestures_never_reach_the_channel() {
    let (driver, module) = session();
    let control = module.open_control().unwrap();
    control.activate(1, true).unwrap();
    let data = module.open_data();
    data.data_open(&control.open_data_source().unwrap()).unwrap();

    assert_eq!(driver.fire_at(2, GestureVector::default(), 5), Some(Delivery::Disabled));
    assert_eq!(driver.fire_at(9, GestureVector::default(), 5), Some(Delivery::Unknown));
    assert_eq!(driver.fire_at(1, GestureVector::default(), 6), Some(Delivery::Queued));

    let outcome = data.poll().unwrap();
    assert_eq!(outcome.code(), 1);
}

// ── wake ──

#[test]
fn wake_releases_blocked_poll() {
    let (_driver, module) = session();
    let control = module.open_control().unwrap();
    let data = Arc::new(module.open_data());
    data.data_open(&control.open_data_source().unwrap()).unwrap();

    let poller = Arc::clone(&data);
    let (tx, done) = mpsc::channel();
    let t = thread::spawn(move || tx.send(poller.poll()).unwrap());

    wake_blocked_poll(&control);
    let outcome = done.recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(outcome.unwrap(), PollOutcome::Woken);
    t.join().unwrap();
}

#[test]
fn wake_without_poller_has_no_later_effect() {
    let (driver, module) = session();
    let control = module.open_control().unwrap();
    control.activate(2, true).unwrap();
    let data = module.open_data();
    data.data_open(&control.open_data_source().unwrap()).unwrap();

    assert!(!control.wake());
    assert!(!control.wake());

    driver.fire_at(2, GestureVector::new([0.0; 3], 1), 77);
    assert!(matches!(data.poll().unwrap(), PollOutcome::Event(e) if e.timestamp_ns == 77));
}

#[test]
fn wake_keeps_queued_events() {
    let (driver, module) = session();
    let control = module.open_control().unwrap();
    control.activate(2, true).unwrap();
    let data = Arc::new(module.open_data());
    data.data_open(&control.open_data_source().unwrap()).unwrap();

    let poller = Arc::clone(&data);
    let (tx, done) = mpsc::channel();
    let t = thread::spawn(move || tx.send(poller.poll()).unwrap());
    wake_blocked_poll(&control);
    assert_eq!(
        done.recv_timeout(Duration::from_secs(2)).unwrap().unwrap(),
        PollOutcome::Woken
    );
    t.join().unwrap();

    driver.fire_at(2, GestureVector::default(), 10);
    driver.fire_at(2, GestureVector::default(), 20);
    assert!(!control.wake());
    assert_eq!(data.poll().unwrap().event().map(|e| e.timestamp_ns), Some(10));
    assert_eq!(data.poll().unwrap().event().map(|e| e.timestamp_ns), Some(20));
}

#[test]
fn data_close_only_affects_its_own_consumer() {
    let (driver, module) = session();
    let control = module.open_control().unwrap();
    control.activate(1, true).unwrap();
    let channel = control.open_data_source().unwrap();
    let first = Arc::new(module.open_data());
    let second = module.open_data();
    first.data_open(&channel).unwrap();
    second.data_open(&channel).unwrap();

    let poller = Arc::clone(&first);
    let (tx, done) = mpsc::channel();
    let t = thread::spawn(move || tx.send(poller.poll()).unwrap());
    thread::sleep(Duration::from_millis(20));
    first.data_close();
    assert_eq!(
        done.recv_timeout(Duration::from_secs(2)).unwrap().unwrap(),
        PollOutcome::Woken
    );
    t.join().unwrap();

    driver.fire_at(1, GestureVector::default(), 3);
    assert_eq!(second.poll().unwrap().code(), 1);
    assert!(!channel.is_closed());
}

// ── ordering ──

#[test]
fn per_handle_timestamps_never_decrease() {
    let (driver, module) = session();
    let control = module.open_control().unwrap();
    control.activate(1, true).unwrap();
    control.activate(2, true).unwrap();
    let data = module.open_data();
    data.data_open(&control.open_data_source().unwrap()).unwrap();

    let fired = [(1, 100), (2, 50), (1, 90), (2, 60), (1, 100), (2, 55), (1, 130)];
    let mut queued = 0;
    for (handle, time) in fired {
        if driver.fire_at(handle, GestureVector::default(), time) == Some(Delivery::Queued) {
            queued += 1;
        }
    }
    assert_eq!(queued, 5);

    let mut last: HashMap<GestureHandle, i64> = HashMap::new();
    for _ in 0..queued {
        let event = *data.poll().unwrap().event().unwrap();
        if let Some(&prev) = last.get(&event.gesture) {
            assert!(event.timestamp_ns >= prev);
        }
        last.insert(event.gesture, event.timestamp_ns);
    }
}

// ── capabilities ──

#[test]
fn close_data_source_is_a_capability() {
    let driver = Arc::new(
        SimulatedDriver::new(builtin_gestures()).with_capabilities(Capabilities {
            close_data_source: false,
        }),
    );
    let module = GestureModule::new(driver).unwrap();
    let control = module.open_control().unwrap();
    assert!(!control.capabilities().close_data_source);
    let _channel = control.open_data_source().unwrap();
    assert!(control.close_data_source().is_none());
}

#[test]
fn control_close_tears_down_channel() {
    let (_driver, module) = session();
    let control = module.open_control().unwrap();
    let data = Arc::new(module.open_data());
    data.data_open(&control.open_data_source().unwrap()).unwrap();

    let poller = Arc::clone(&data);
    let (tx, done) = mpsc::channel();
    let t = thread::spawn(move || tx.send(poller.poll_raw(&mut GestureRecord::zeroed())).unwrap());
    thread::sleep(Duration::from_millis(20));
    control.close();

    let code = done.recv_timeout(Duration::from_secs(2)).unwrap();
    assert!(code < 0);
    t.join().unwrap();
}

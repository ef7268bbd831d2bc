//! Scheduler cadence and termination with real job bodies.

use std::cell::{Cell, RefCell};

use sensornode::app::ports::Clock;
use sensornode::config::NodeConfig;
use sensornode::drivers::run_gate::RunGate;
use sensornode::drivers::status_led::StatusIndicator;
use sensornode::error::{CommsError, Error};
use sensornode::node::{NodeIo, jobs};
use sensornode::scheduler::{JobContext, Scheduler};
use sensornode::sensors::motion::MotionSensor;

use crate::mock_hw::{MockAdc, RecordingPin, RecordingPublisher, SimClock, TimedPin};

const EXEC_MS: u32 = 200;

#[test]
fn cadences_hold_despite_execution_time() {
    let clock = SimClock::new();
    let calls: RefCell<Vec<(&str, u64)>> = RefCell::new(Vec::new());
    let mut sched = Scheduler::new(10_000);
    for (label, secs) in [("hourly", 60), ("fast", 10), ("slow", 300)] {
        let calls = &calls;
        sched.register(label, secs * 1000, move |ctx: &mut JobContext<'_>| {
            calls.borrow_mut().push((label, ctx.now_ms));
            ctx.clock.delay_ms(EXEC_MS);
            Ok(())
        });
    }

    let mut gate = RunGate::new(TimedPin::new(&clock, true).at(600_000, false));
    let mut led = StatusIndicator::new(RecordingPin::new(&clock), false);
    let mut sim = clock.clone();
    assert_eq!(sched.run(&mut sim, &mut led, &mut gate), Ok(()));

    let at = |label: &str| -> Vec<u64> {
        calls
            .borrow()
            .iter()
            .filter(|(l, _)| *l == label)
            .map(|(_, t)| *t)
            .collect()
    };
    for (label, period_ms, count) in [("hourly", 60_000, 10), ("fast", 10_000, 60), ("slow", 300_000, 2)] {
        let times = at(label);
        assert_eq!(times.len(), count, "{label}");
        for (k, t) in times.iter().enumerate() {
            let due = k as u64 * period_ms;
            // At most the two other jobs can be ahead of it at one instant.
            assert!(
                (due..=due + 2 * EXEC_MS as u64).contains(t),
                "{label} run {k} at {t}, due {due}"
            );
        }
    }
}

#[test]
fn one_failure_stops_every_job() {
    let clock = SimClock::new();
    let runs = Cell::new(0u32);
    let mut sched = Scheduler::new(10_000);
    let r = &runs;
    sched.register("steady", 10_000, move |_: &mut JobContext<'_>| {
        r.set(r.get() + 1);
        Ok(())
    });
    sched.register("flaky", 60_000, move |ctx: &mut JobContext<'_>| {
        if ctx.now_ms >= 120_000 {
            return Err(CommsError::PublishFailed.into());
        }
        Ok(())
    });

    let mut gate = RunGate::new(TimedPin::new(&clock, true));
    let mut led = StatusIndicator::new(RecordingPin::new(&clock), false);
    let mut sim = clock.clone();
    let failure = sched.run(&mut sim, &mut led, &mut gate).unwrap_err();

    assert_eq!(failure.label, "flaky");
    assert_eq!(failure.error, Error::Comms(CommsError::PublishFailed));
    assert_eq!(clock.now_ms(), 120_000);
    // steady ran at 0, 10 s, .., 120 s; nothing after the failure.
    assert_eq!(runs.get(), 13);
}

#[test]
fn gate_read_error_is_a_job_failure() {
    let clock = SimClock::new();
    let mut sched = Scheduler::new(10_000);
    sched.register("noop", 1_000, |_: &mut JobContext<'_>| Ok(()));

    let pin = TimedPin::new(&clock, true);
    pin.fail_from(25_000);
    let mut gate = RunGate::new(pin);
    let mut led = StatusIndicator::new(RecordingPin::new(&clock), false);
    let mut sim = clock.clone();

    let failure = sched.run(&mut sim, &mut led, &mut gate).unwrap_err();
    assert_eq!(failure.label, "run-gate");
    assert_eq!(clock.now_ms(), 30_000);
}

/// Motion jobs driven by an edge-injector job standing in for the PIR
/// interrupt.
#[test]
fn motion_alert_refresh_and_decay() {
    let clock = SimClock::new();
    let config = NodeConfig::default();
    let publisher = RecordingPublisher::new(&clock);
    let publisher_cell = RefCell::new(publisher.clone());
    let adc = RefCell::new(MockAdc::new());
    let io = NodeIo {
        publisher: &publisher_cell,
        adc: &adc,
        config: &config,
    };

    let sensor = MotionSensor::new(config.motion_retrigger_secs);
    let edges = [15_000u64, 40_000, 850_000];
    let rearms = Cell::new(0u32);

    let mut sched = Scheduler::new(10_000);
    let s = &sensor;
    sched.register("pir", 1_000, move |ctx: &mut JobContext<'_>| {
        if edges.contains(&ctx.now_ms) {
            s.on_rising_edge(ctx.now_ms);
        }
        Ok(())
    });
    let r = &rearms;
    let rearm = move || {
        r.set(r.get() + 1);
        Ok::<(), Error>(())
    };
    jobs::register(&mut sched, "motion-alert", config.motion_alert_interval_secs, jobs::motion_alert(&sensor, io, rearm)).unwrap();
    jobs::register(&mut sched, "motion-refresh", config.motion_refresh_interval_secs, jobs::motion_refresh(&sensor, io)).unwrap();

    let mut gate = RunGate::new(TimedPin::new(&clock, true).at(2_200_000, false));
    let mut led = StatusIndicator::new(RecordingPin::new(&clock), false);
    let mut sim = clock.clone();
    sched.run(&mut sim, &mut led, &mut gate).unwrap();

    let motion: Vec<(u64, String)> = publisher
        .on("motion")
        .into_iter()
        .map(|m| (m.at_ms, m.payload))
        .collect();
    assert_eq!(
        motion,
        vec![
            // First edge, fast path.
            (20_000, "MOTION".to_owned()),
            // Edge at 850 s keeps it alive; re-asserted once the window
            // since the last report has passed.
            (1_200_000, "MOTION".to_owned()),
            // 900 s after that re-assert, and more than 900 s since the
            // last edge: decays exactly once.
            (2_100_000, "NONE".to_owned()),
        ]
    );
    assert_eq!(publisher.messages()[0].topic, "home/ground/sensornode/motion");
    // Alert job polls every 10 s over 2200 s.
    assert_eq!(rearms.get(), 220);
    assert!(!sensor.snapshot().pending_alert);
}

#[test]
fn publish_failure_inside_job_is_fatal() {
    let clock = SimClock::new();
    let config = NodeConfig::default();
    let publisher = RecordingPublisher::new(&clock);
    publisher.fail_after(0);
    let publisher_cell = RefCell::new(publisher.clone());
    let adc = RefCell::new(MockAdc::new().with(0, 4000));
    let io = NodeIo {
        publisher: &publisher_cell,
        adc: &adc,
        config: &config,
    };

    let mut sched = Scheduler::new(10_000);
    jobs::register(
        &mut sched,
        "temperature",
        config.temperature_interval_secs,
        jobs::temperature(sensornode::sensors::temperature::TemperatureSensor::new(0), io),
    )
    .unwrap();

    let mut gate = RunGate::new(TimedPin::new(&clock, true));
    let mut led = StatusIndicator::new(RecordingPin::new(&clock), false);
    let mut sim = clock.clone();
    let failure = sched.run(&mut sim, &mut led, &mut gate).unwrap_err();
    assert_eq!(failure.label, "temperature");
    assert_eq!(failure.error, Error::Comms(CommsError::PublishFailed));
}

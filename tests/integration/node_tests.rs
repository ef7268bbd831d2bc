//! Full boot sequence and main loop for both node variants.

use std::cell::{Cell, RefCell};

use sensornode::app::ports::Clock;
use sensornode::config::NodeConfig;
use sensornode::error::Error;
use sensornode::node::{ContactNode, Exit, MotionNode, Node};
use sensornode::sensors::motion::MotionSensor;

use crate::mock_hw::{MockAdc, RecordingPin, RecordingPublisher, SimClock, TimedPin};

const MAC: &str = "deadbeefcafe";

/// TMP36 at 750 mV (25 °C) on channel 0, light sensor well above the pivot.
fn adc() -> MockAdc {
    MockAdc::new().with(0, 4000).with(1, 1500).with(2, 1000)
}

#[test]
fn contact_node_reports_confirmed_transitions() {
    let config = NodeConfig::default();
    let clock = SimClock::new();
    let led = RecordingPin::new(&clock);
    // Checked at 0 (open) and 10 s (closed).
    let gate = TimedPin::new(&clock, true).at(9_000, false);
    // One level per contact poll (every 2 s): the seed read and the first
    // poll see CLOSED, then OPEN, CLOSED, OPEN, OPEN.
    let contact = TimedPin::new(&clock, false)
        .at(1_000, true)
        .at(3_000, false)
        .at(5_000, true);
    let publisher = RecordingPublisher::new(&clock);

    let mut node = Node::new(&config, led.clone(), gate, clock.clone(), MAC);
    let exit = node.boot(
        publisher.clone(),
        || Ok(adc()),
        ContactNode { contact_pin: contact.clone() },
    );

    assert_eq!(exit, Ok(Exit::GateClosed));
    assert_eq!(publisher.payloads("contact"), ["OPEN", "CLOSED", "OPEN"]);
    let times: Vec<u64> = publisher.on("contact").iter().map(|m| m.at_ms).collect();
    // Each report lands after the 100 ms settle re-read.
    assert_eq!(times, [2_100, 4_100, 6_100]);
    // Seed, then one read per unchanged poll and two per changed poll.
    assert_eq!(contact.reads(), 1 + 1 + 2 + 2 + 2 + 1);
    assert!(!node.indicator().lit());
    assert_eq!(led.writes().last(), Some(&(10_000, false)));
}

#[test]
fn contact_bounce_is_not_reported() {
    let config = NodeConfig::default();
    let clock = SimClock::new();
    let gate = TimedPin::new(&clock, true).at(9_000, false);
    // Opens for 50 ms right as the 2 s poll reads it.
    let contact = TimedPin::new(&clock, false).at(2_000, true).at(2_050, false);
    let publisher = RecordingPublisher::new(&clock);

    let mut node = Node::new(&config, RecordingPin::new(&clock), gate, clock.clone(), MAC);
    let exit = node.boot(publisher.clone(), || Ok(adc()), ContactNode { contact_pin: contact });

    assert_eq!(exit, Ok(Exit::GateClosed));
    assert!(publisher.payloads("contact").is_empty());
}

#[test]
fn boot_announces_and_publishes_temperature() {
    let config = NodeConfig::default();
    let clock = SimClock::new();
    let gate = TimedPin::new(&clock, true).at(1, false);
    let publisher = RecordingPublisher::new(&clock);

    let mut node = Node::new(&config, RecordingPin::new(&clock), gate, clock.clone(), MAC);
    let exit = node.boot(
        publisher.clone(),
        || Ok(adc()),
        ContactNode { contact_pin: TimedPin::new(&clock, false) },
    );
    assert_eq!(exit, Ok(Exit::GateClosed));

    let session = publisher.session().expect("connected");
    assert_eq!(session.client_id, "sensornode");
    assert_eq!(session.will_topic, "disconnect/sensornode");
    assert_eq!(session.will_payload, MAC);

    let messages = publisher.messages();
    assert_eq!(messages[0].topic, "connect/sensornode");
    assert_eq!(messages[0].payload, MAC);
    assert_eq!(messages[1].topic, "home/ground/sensornode/temp");
    assert_eq!(messages[1].payload, "25.00");
    // Light seeded LIT at boot; the seed itself is not a report.
    assert!(publisher.payloads("light").is_empty());
}

#[test]
fn light_transitions_are_reported_once_per_crossing() {
    let config = NodeConfig::default();
    let clock = SimClock::new();
    // Checked at 30 s (closed).
    let gate = TimedPin::new(&clock, true).at(29_000, false);
    // Pivot 1000, margin 200: the band is 800..=1200.  Light polls every
    // 5 s; the seed read at boot sees 1500 (LIT).
    let adc = MockAdc::timed(&clock)
        .with(0, 4000)
        .with(1, 1500)
        .with(2, 1000)
        .at(7_000, 1, 1100)
        .at(12_000, 1, 700)
        .at(17_000, 1, 1100)
        .at(22_000, 1, 1300);
    let publisher = RecordingPublisher::new(&clock);

    let mut node = Node::new(&config, RecordingPin::new(&clock), gate, clock.clone(), MAC);
    let exit = node.boot(
        publisher.clone(),
        || Ok(adc),
        ContactNode { contact_pin: TimedPin::new(&clock, false) },
    );
    assert_eq!(exit, Ok(Exit::GateClosed));

    let light: Vec<(u64, String, String)> = publisher
        .on("light")
        .into_iter()
        .map(|m| (m.at_ms, m.topic, m.payload))
        .collect();
    // In-band reads at 10 s and 20 s hold the previous class.
    assert_eq!(
        light,
        vec![
            (15_000, "home/ground/sensornode/light".to_owned(), "DARK".to_owned()),
            (25_000, "home/ground/sensornode/light".to_owned(), "LIT".to_owned()),
        ]
    );
}

#[test]
fn heartbeat_blinks_the_indicator() {
    let config = NodeConfig::default();
    let clock = SimClock::new();
    let led = RecordingPin::new(&clock);
    let gate = TimedPin::new(&clock, true).at(25_000, false);
    let publisher = RecordingPublisher::new(&clock);

    let mut node = Node::new(&config, led.clone(), gate, clock.clone(), MAC);
    node.boot(
        publisher,
        || Ok(adc()),
        ContactNode { contact_pin: TimedPin::new(&clock, false) },
    )
    .unwrap();

    // Heartbeats at 10 s and 20 s hold the indicator lit for 200 ms.
    let writes = led.writes();
    for t in [10_000, 20_000] {
        assert!(writes.contains(&(t, true)), "lit at {t}");
        assert!(writes.contains(&(t + 200, false)), "unlit at {}", t + 200);
    }
}

#[test]
fn closed_gate_at_boot_starts_nothing() {
    let config = NodeConfig::default();
    let clock = SimClock::new();
    let led = RecordingPin::new(&clock);
    let publisher = RecordingPublisher::new(&clock);
    let adc_started = Cell::new(false);

    let mut node = Node::new(&config, led.clone(), TimedPin::new(&clock, false), clock.clone(), MAC);
    let exit = node.boot(
        publisher.clone(),
        || {
            adc_started.set(true);
            Ok(adc())
        },
        ContactNode { contact_pin: TimedPin::new(&clock, false) },
    );

    assert_eq!(exit, Ok(Exit::GateClosedAtBoot));
    assert!(publisher.session().is_none());
    assert!(!adc_started.get());
    assert_eq!(led.rising_edges(), 0);
}

#[test]
fn unreadable_gate_at_boot_starts_nothing() {
    let config = NodeConfig::default();
    let clock = SimClock::new();
    let gate = TimedPin::new(&clock, true);
    gate.fail_from(0);
    let publisher = RecordingPublisher::new(&clock);

    let mut node = Node::new(&config, RecordingPin::new(&clock), gate, clock.clone(), MAC);
    let exit = node.boot(
        publisher.clone(),
        || Ok(adc()),
        ContactNode { contact_pin: TimedPin::new(&clock, false) },
    );
    assert_eq!(exit, Ok(Exit::GateClosedAtBoot));
    assert!(publisher.session().is_none());
}

/// The `arm` hook doubles as the PIR line: edges scheduled for a time at or
/// before "now" are delivered whenever the interrupt is re-armed.
#[test]
fn motion_node_alerts_then_decays() {
    let config = NodeConfig::default();
    let clock = SimClock::new();
    let gate = TimedPin::new(&clock, true).at(1_300_000, false);
    let publisher = RecordingPublisher::new(&clock);

    let sensor = MotionSensor::new(config.motion_retrigger_secs);
    let pending = RefCell::new(vec![15_000u64]);
    let arms = Cell::new(0u32);
    let line = clock.clone();
    let arm = || {
        arms.set(arms.get() + 1);
        let now = line.now_ms();
        pending.borrow_mut().retain(|&t| {
            if t <= now {
                sensor.on_rising_edge(t);
                false
            } else {
                true
            }
        });
        Ok::<(), Error>(())
    };

    let mut node = Node::new(&config, RecordingPin::new(&clock), gate, clock.clone(), MAC);
    let exit = node.boot(publisher.clone(), || Ok(adc()), MotionNode { sensor: &sensor, arm });
    assert_eq!(exit, Ok(Exit::GateClosed));

    let motion: Vec<(u64, String)> = publisher
        .on("motion")
        .into_iter()
        .map(|m| (m.at_ms, m.payload))
        .collect();
    // The 15 s edge is delivered on the re-arm after the 20 s poll and
    // reported by the 30 s poll; the 1200 s refresh is the first one more
    // than a window after that report.
    assert_eq!(
        motion,
        vec![(30_000, "MOTION".to_owned()), (1_200_000, "NONE".to_owned())]
    );
    // Once at install, then after each of the 130 alert polls.
    assert_eq!(arms.get(), 131);
    assert_eq!(sensor.snapshot().last_trigger_ms, Some(15_000));
}

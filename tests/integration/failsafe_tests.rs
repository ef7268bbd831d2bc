//! Every boot stage maps its failure onto the right fail-safe code, and the
//! fail-safe itself blinks for the grace period and then resets.

use std::panic::{self, AssertUnwindSafe};

use sensornode::app::ports::Clock;
use sensornode::config::NodeConfig;
use sensornode::drivers::watchdog::FatalCode;
use sensornode::error::{CommsError, Error};
use sensornode::node::{ContactNode, Exit, MotionNode, Node};
use sensornode::sensors::motion::MotionSensor;

use crate::mock_hw::{MockAdc, PanicReset, RESET_PANIC, RecordingPin, RecordingPublisher, SimClock, TimedPin};

const MAC: &str = "deadbeefcafe";

fn adc() -> MockAdc {
    MockAdc::new().with(0, 4000).with(1, 1500).with(2, 1000)
}

/// Boot a contact node with an open gate and a quiet contact.
fn boot_contact(
    publisher: &RecordingPublisher,
    adc_init: impl FnOnce() -> sensornode::error::Result<MockAdc>,
    contact: TimedPin,
    gate: TimedPin,
    clock: &SimClock,
) -> Result<Exit, FatalCode> {
    let config = NodeConfig::default();
    let mut node = Node::new(&config, RecordingPin::new(clock), gate, clock.clone(), MAC);
    node.boot(publisher.clone(), adc_init, ContactNode { contact_pin: contact })
}

#[test]
fn refused_session_is_code_1() {
    let clock = SimClock::new();
    let publisher = RecordingPublisher::new(&clock);
    publisher.refuse_connect(CommsError::ConnectRefused);
    let out = boot_contact(
        &publisher,
        || Ok(adc()),
        TimedPin::new(&clock, false),
        TimedPin::new(&clock, true),
        &clock,
    );
    assert_eq!(out, Err(FatalCode::Connect));
    assert!(publisher.messages().is_empty());
}

#[test]
fn unreachable_broker_is_code_2() {
    let clock = SimClock::new();
    let publisher = RecordingPublisher::new(&clock);
    publisher.refuse_connect(CommsError::BrokerUnreachable);
    let out = boot_contact(
        &publisher,
        || Ok(adc()),
        TimedPin::new(&clock, false),
        TimedPin::new(&clock, true),
        &clock,
    );
    assert_eq!(out, Err(FatalCode::Broker));
}

#[test]
fn adc_bring_up_failure_is_code_3() {
    let clock = SimClock::new();
    let publisher = RecordingPublisher::new(&clock);
    let out = boot_contact(
        &publisher,
        || Err(Error::Init("ADS1115 did not answer")),
        TimedPin::new(&clock, false),
        TimedPin::new(&clock, true),
        &clock,
    );
    assert_eq!(out, Err(FatalCode::Driver));
    // Connected, but never announced.
    assert!(publisher.session().is_some());
    assert!(publisher.messages().is_empty());
}

#[test]
fn unreadable_contact_at_seed_is_code_4() {
    let clock = SimClock::new();
    let publisher = RecordingPublisher::new(&clock);
    let contact = TimedPin::new(&clock, false);
    contact.fail_from(0);
    let out = boot_contact(&publisher, || Ok(adc()), contact, TimedPin::new(&clock, true), &clock);
    assert_eq!(out, Err(FatalCode::SensorInit));
}

#[test]
fn missing_light_channel_is_code_4() {
    let clock = SimClock::new();
    let publisher = RecordingPublisher::new(&clock);
    let out = boot_contact(
        &publisher,
        || Ok(MockAdc::new().with(0, 4000).with(1, 1500)),
        TimedPin::new(&clock, false),
        TimedPin::new(&clock, true),
        &clock,
    );
    assert_eq!(out, Err(FatalCode::SensorInit));
}

#[test]
fn pir_arm_failure_is_code_4() {
    let config = NodeConfig::default();
    let clock = SimClock::new();
    let publisher = RecordingPublisher::new(&clock);
    let sensor = MotionSensor::new(config.motion_retrigger_secs);

    let mut node = Node::new(
        &config,
        RecordingPin::new(&clock),
        TimedPin::new(&clock, true),
        clock.clone(),
        MAC,
    );
    let arm = || -> sensornode::error::Result<()> { Err(Error::Init("PIR interrupt")) };
    let out = node.boot(publisher.clone(), || Ok(adc()), MotionNode { sensor: &sensor, arm });
    assert_eq!(out, Err(FatalCode::SensorInit));
    assert!(publisher.messages().is_empty());
}

#[test]
fn failed_announce_is_code_5() {
    let clock = SimClock::new();
    let publisher = RecordingPublisher::new(&clock);
    publisher.fail_after(0);
    let out = boot_contact(
        &publisher,
        || Ok(adc()),
        TimedPin::new(&clock, false),
        TimedPin::new(&clock, true),
        &clock,
    );
    assert_eq!(out, Err(FatalCode::Announce));
    // Nothing ran: the scheduler starts only after the announcement.
    assert_eq!(clock.now_ms(), 0);
}

#[test]
fn publish_failure_while_running_is_code_6() {
    let clock = SimClock::new();
    let publisher = RecordingPublisher::new(&clock);
    // Announcement and the first temperature go out; the contact report
    // at 2.1 s does not.
    publisher.fail_after(2);
    let contact = TimedPin::new(&clock, false).at(2_000, true);
    let out = boot_contact(&publisher, || Ok(adc()), contact, TimedPin::new(&clock, true), &clock);
    assert_eq!(out, Err(FatalCode::Runtime));
    assert_eq!(clock.now_ms(), 2_100);
    assert_eq!(publisher.messages().len(), 2);
}

#[test]
fn gate_read_error_while_running_is_code_6() {
    let clock = SimClock::new();
    let publisher = RecordingPublisher::new(&clock);
    let gate = TimedPin::new(&clock, true);
    gate.fail_from(5_000);
    let out = boot_contact(&publisher, || Ok(adc()), TimedPin::new(&clock, false), gate, &clock);
    assert_eq!(out, Err(FatalCode::Runtime));
    assert_eq!(clock.now_ms(), 10_000);
}

#[test]
fn fatal_boot_blinks_code_then_resets() {
    let mut config = NodeConfig::default();
    config.failsafe_grace_secs = 10;
    let clock = SimClock::new();
    let led = RecordingPin::new(&clock);
    let publisher = RecordingPublisher::new(&clock);
    publisher.refuse_connect(CommsError::BrokerUnreachable);

    let node = Node::new(&config, led.clone(), TimedPin::new(&clock, true), clock.clone(), MAC);
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        node.run(
            publisher.clone(),
            || Ok(adc()),
            ContactNode { contact_pin: TimedPin::new(&clock, false) },
            &mut PanicReset,
        )
    }));

    let payload = result.expect_err("fail-safe must reset the board");
    assert_eq!(payload.downcast_ref::<String>().map(String::as_str), Some(RESET_PANIC));
    // Code 2 cycle is 6 s: two full cycles fit the 10 s grace period.
    assert_eq!(clock.now_ms(), 12_000);
    // Lit at boot, so the first rapid flash is not a new edge; then
    // 10 rapid flashes + 2 code pulses per cycle.
    assert_eq!(led.rising_edges(), 1 + (9 + 2) + (10 + 2));
    assert!(!led.is_high());
}

#[test]
fn direct_fatal_uses_the_same_fail_safe() {
    let mut config = NodeConfig::default();
    config.failsafe_grace_secs = 1;
    let clock = SimClock::new();
    let led = RecordingPin::new(&clock);

    let node = Node::new(&config, led.clone(), TimedPin::new(&clock, true), clock.clone(), MAC);
    let result = panic::catch_unwind(AssertUnwindSafe(|| -> Exit {
        node.raise_fatal(FatalCode::Broker, &mut PanicReset)
    }));

    assert!(result.is_err());
    // One full code 2 cycle, never truncated.
    assert_eq!(clock.now_ms(), 6_000);
    assert_eq!(led.rising_edges(), 10 + 2);
}

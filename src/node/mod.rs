//! Node runtime: boot sequence, variant wiring and the fail-safe hand-off.
//!
//! Both node variants share one skeleton.  What differs is the set of jobs
//! they register, which [`NodeVariant::install`] decides.
//!
//! ```text
//!   gate? ──closed──▶ Exit::GateClosedAtBoot
//!     │ open
//!     ▼
//!   connect ──▶ ADC ──▶ temperature + variant jobs + heartbeat ──▶ announce
//!     │1/2        │3              │4                                 │5
//!     ▼           ▼               ▼                                  ▼
//!   ───────────────────────── Watchdog::raise_fatal ─────────────────────
//!                                 ▲6
//!   Scheduler::run ───job error───┘
//!     │ gate closed
//!     ▼
//!   Exit::GateClosed
//! ```

pub mod jobs;

use core::cell::RefCell;

use embedded_hal::digital::{InputPin, OutputPin};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::{AnalogPort, BrokerSession, Clock, PublishPort, ResetPort};
use crate::app::reports;
use crate::config::NodeConfig;
use crate::drivers::run_gate::RunGate;
use crate::drivers::status_led::StatusIndicator;
use crate::drivers::watchdog::{FatalCode, Watchdog};
use crate::error::{CommsError, Error, Result};
use crate::scheduler::Scheduler;
use crate::sensors::contact::ContactSensor;
use crate::sensors::light::{LightChannels, LightSensor};
use crate::sensors::motion::MotionSensor;
use crate::sensors::temperature::TemperatureSensor;

// ─── Variants ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// PIR motion plus temperature.
    Motion,
    /// Door/window contact, light level and temperature.
    Contact,
}

/// Collaborators shared by every job of a node.
#[derive(Clone, Copy)]
pub struct NodeIo<'j> {
    pub publisher: &'j RefCell<dyn PublishPort + 'j>,
    pub adc: &'j RefCell<dyn AnalogPort + 'j>,
    pub config: &'j NodeConfig,
}

/// The variant-specific part of a node: seed its sensors and register its
/// jobs.  Any error here is a sensor-init failure.
pub trait NodeVariant {
    fn kind(&self) -> NodeKind;

    fn install<'j>(self, sched: &mut Scheduler<'j>, io: NodeIo<'j>) -> Result<()>
    where
        Self: 'j;
}

/// Motion node.  `arm` enables the PIR edge interrupt; it is called once at
/// install and again after every alert poll.
pub struct MotionNode<'a, F> {
    pub sensor: &'a MotionSensor,
    pub arm: F,
}

impl<F> NodeVariant for MotionNode<'_, F>
where
    F: FnMut() -> Result<()>,
{
    fn kind(&self) -> NodeKind {
        NodeKind::Motion
    }

    fn install<'j>(mut self, sched: &mut Scheduler<'j>, io: NodeIo<'j>) -> Result<()>
    where
        Self: 'j,
    {
        (self.arm)()?;
        let cfg = io.config;
        jobs::register(
            sched,
            "motion-alert",
            cfg.motion_alert_interval_secs,
            jobs::motion_alert(self.sensor, io, self.arm),
        )?;
        jobs::register(
            sched,
            "motion-refresh",
            cfg.motion_refresh_interval_secs,
            jobs::motion_refresh(self.sensor, io),
        )
    }
}

/// Contact node.
pub struct ContactNode<P> {
    pub contact_pin: P,
}

impl<P: InputPin> NodeVariant for ContactNode<P> {
    fn kind(&self) -> NodeKind {
        NodeKind::Contact
    }

    fn install<'j>(self, sched: &mut Scheduler<'j>, io: NodeIo<'j>) -> Result<()>
    where
        Self: 'j,
    {
        let cfg = io.config;
        let contact = ContactSensor::new(self.contact_pin, cfg.contact_settle_ms)?;
        let channels = LightChannels {
            sensor: cfg.light_sensor_channel,
            pivot: cfg.light_pivot_channel,
            margin: cfg.light_margin,
            gain: Default::default(),
            rate: Default::default(),
        };
        let light = LightSensor::new(channels, &mut *io.adc.borrow_mut())?;

        jobs::register(sched, "contact", cfg.contact_interval_secs, jobs::contact(contact, io))?;
        jobs::register(sched, "light", cfg.light_interval_secs, jobs::light(light, io))
    }
}

// ─── Node ────────────────────────────────────────────────────────

/// How a node left its main loop without a fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// The run-gate was already closed at boot; nothing was started.
    GateClosedAtBoot,
    /// The run-gate closed while the scheduler was running.
    GateClosed,
}

pub struct Node<'a, L, G, C> {
    config: &'a NodeConfig,
    led: StatusIndicator<L>,
    gate: RunGate<G>,
    clock: C,
    /// Device MAC as lowercase hex; payload of the connect and will messages.
    device_id: &'a str,
}

impl<'a, L, G, C> Node<'a, L, G, C>
where
    L: OutputPin,
    G: InputPin,
    C: Clock,
{
    pub fn new(config: &'a NodeConfig, led: L, gate: G, clock: C, device_id: &'a str) -> Self {
        Self {
            config,
            led: StatusIndicator::new(led, config.indicator_active_low),
            gate: RunGate::new(gate),
            clock,
            device_id,
        }
    }

    pub fn indicator(&self) -> &StatusIndicator<L> {
        &self.led
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Read the run-gate.  An unreadable gate counts as closed.
    pub fn gate_open(&mut self) -> bool {
        match self.gate.enabled() {
            Ok(true) => true,
            Ok(false) => {
                info!("Node: run-gate closed, not starting");
                false
            }
            Err(e) => {
                warn!("Node: run-gate unreadable ({}), not starting", e);
                false
            }
        }
    }

    /// Boot and run until the gate closes; any failure ends in the
    /// fail-safe and a reset.
    pub fn run<P, A, V>(
        mut self,
        publisher: P,
        adc_init: impl FnOnce() -> Result<A>,
        variant: V,
        reset: &mut dyn ResetPort,
    ) -> Exit
    where
        P: PublishPort,
        A: AnalogPort,
        V: NodeVariant,
    {
        match self.boot(publisher, adc_init, variant) {
            Ok(exit) => exit,
            Err(code) => self.raise_fatal(code, reset),
        }
    }

    /// Boot sequence and main loop.  Returns the fail-safe code of the first
    /// stage that failed instead of entering the fail-safe itself.
    pub fn boot<P, A, V>(
        &mut self,
        publisher: P,
        adc_init: impl FnOnce() -> Result<A>,
        variant: V,
    ) -> core::result::Result<Exit, FatalCode>
    where
        P: PublishPort,
        A: AnalogPort,
        V: NodeVariant,
    {
        let cfg = self.config;
        if !self.gate_open() {
            return Ok(Exit::GateClosedAtBoot);
        }

        info!("Node: booting {:?} node '{}'", variant.kind(), cfg.client_id);
        self.led.set(true);

        // Connect with a last will.
        let publisher = RefCell::new(publisher);
        let will_topic = reports::topic("disconnect", &cfg.client_id).map_err(|e| {
            error!("Node: will topic: {}", e);
            FatalCode::Broker
        })?;
        let session = BrokerSession {
            client_id: &cfg.client_id,
            url: &cfg.broker_url,
            username: cfg.broker_user(),
            password: cfg.broker_password(),
            will_topic: &will_topic,
            will_payload: self.device_id,
        };
        publisher.borrow_mut().connect(&session).map_err(|e| {
            error!("Node: broker connect to {} failed: {}", cfg.broker_url, e);
            match e {
                CommsError::ConnectRefused => FatalCode::Connect,
                _ => FatalCode::Broker,
            }
        })?;
        info!("Node: connected to {}", cfg.broker_url);

        // ADC driver.
        let adc = RefCell::new(adc_init().map_err(|e| {
            error!("Node: ADC bring-up failed: {}", e);
            FatalCode::Driver
        })?);

        // Jobs.
        let io = NodeIo {
            publisher: &publisher,
            adc: &adc,
            config: cfg,
        };
        let mut sched = Scheduler::new(cfg.run_gate_interval_secs as u64 * 1000);
        install_jobs(&mut sched, io, variant).map_err(|e| {
            error!("Node: sensor init failed: {}", e);
            FatalCode::SensorInit
        })?;

        // Announce.
        announce(&mut *publisher.borrow_mut(), &cfg.client_id, self.device_id).map_err(|e| {
            error!("Node: announce failed: {}", e);
            FatalCode::Announce
        })?;

        match sched.run(&mut self.clock, &mut self.led, &mut self.gate) {
            Ok(()) => {
                self.led.set(false);
                info!("Node: stopped by run-gate");
                Ok(Exit::GateClosed)
            }
            Err(failure) => {
                error!("Node: {}", failure);
                Err(FatalCode::Runtime)
            }
        }
    }

    /// Enter the fail-safe directly (e.g. network join failed before the
    /// node could boot).  Never returns.
    pub fn raise_fatal(mut self, code: FatalCode, reset: &mut dyn ResetPort) -> ! {
        error!("Node: fatal {}", code);
        Watchdog::new(self.config.failsafe_grace_secs).raise_fatal(
            code.code(),
            &mut self.led,
            &mut self.clock,
            reset,
        )
    }
}

fn install_jobs<'j, V>(sched: &mut Scheduler<'j>, io: NodeIo<'j>, variant: V) -> Result<()>
where
    V: NodeVariant + 'j,
{
    let cfg = io.config;
    let temperature = TemperatureSensor::new(cfg.temperature_channel);
    jobs::register(
        sched,
        "temperature",
        cfg.temperature_interval_secs,
        jobs::temperature(temperature, io),
    )?;
    variant.install(sched, io)?;
    jobs::register(
        sched,
        "heartbeat",
        cfg.heartbeat_interval_secs,
        jobs::heartbeat(cfg.heartbeat_blink_ms),
    )
}

fn announce(publisher: &mut dyn PublishPort, client_id: &str, device_id: &str) -> Result<()> {
    let topic = reports::topic("connect", client_id)?;
    info!("Node: announcing on {}", topic);
    publisher.publish(&topic, device_id).map_err(Error::from)
}

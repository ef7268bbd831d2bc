//! Sensor node firmware: main entry point.
//!
//! Brings up the ESP-IDF side (logging, WiFi, pins, I2C, MQTT) and hands
//! everything to [`Node::run`].
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  SystemClock   EspMqttPublisher   Ads1115<I2cDriver>           │
//! │  (Clock)       (PublishPort)      (AnalogPort)     SystemReset │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │  Node: boot sequence · Scheduler · Watchdog            │    │
//! │  │  sensors: motion · contact · light · temperature       │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::gpio::{AnyIOPin, InterruptType, PinDriver, Pull};
use esp_idf_svc::hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::hal::prelude::*;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use log::{error, info, warn};

use sensornode::adapters::ads1115::{Ads1115, DEFAULT_ADDRESS};
use sensornode::adapters::device_id;
use sensornode::adapters::mqtt::EspMqttPublisher;
use sensornode::adapters::reset::SystemReset;
use sensornode::adapters::time::{self, SystemClock};
use sensornode::adapters::wifi;
use sensornode::config::NodeConfig;
use sensornode::drivers::watchdog::FatalCode;
use sensornode::error::Error;
use sensornode::node::{ContactNode, Exit, MotionNode, Node, NodeKind};
use sensornode::pins;
use sensornode::sensors::motion::MotionSensor;

/// Provisioned at build time: `SENSORNODE_CONFIG='{"kind":"contact",...}'`.
const CONFIG_JSON: Option<&str> = option_env!("SENSORNODE_CONFIG");

fn load_config() -> NodeConfig {
    match CONFIG_JSON.map(NodeConfig::from_json) {
        Some(Ok(cfg)) => {
            info!("Config loaded ({} node '{}')", kind_name(cfg.kind), cfg.client_id);
            cfg
        }
        Some(Err(e)) => {
            warn!("Config rejected ({}), using defaults", e);
            NodeConfig::default()
        }
        None => {
            warn!("No config provisioned, using defaults");
            NodeConfig::default()
        }
    }
}

fn kind_name(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::Motion => "motion",
        NodeKind::Contact => "contact",
    }
}

/// Pins are numbered in `pins.rs`; the HAL wants typed pins.
fn io_pin(gpio: i32) -> AnyIOPin {
    unsafe { AnyIOPin::new(gpio) }
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  sensornode v{}                    ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let config = load_config();
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take().ok();

    // ── 2. Indicator, run-gate, identity ──────────────────────
    let led = PinDriver::output(io_pin(pins::STATUS_LED_GPIO))?;
    let mut gate = PinDriver::input(io_pin(pins::RUN_GATE_GPIO))?;
    gate.set_pull(Pull::Up)?;
    let mac = device_id::mac_hex(&device_id::read_mac());

    let mut node = Node::new(&config, led, gate, SystemClock::new(), &mac);
    if !node.gate_open() {
        info!("Run-gate closed at boot, application not started");
        return Ok(());
    }

    // ── 3. Network ────────────────────────────────────────────
    let _wifi = match wifi::join(
        peripherals.modem,
        sysloop,
        nvs,
        &config.wifi_ssid,
        &config.wifi_password,
    ) {
        Ok(w) => w,
        Err(e) => {
            error!("WiFi join failed: {}", e);
            node.raise_fatal(FatalCode::Broker, &mut SystemReset)
        }
    };

    // ── 4. ADC bring-up, deferred into the boot sequence ──────
    let i2c = peripherals.i2c0;
    let adc_init = move || {
        let conf = I2cConfig::new().baudrate(pins::I2C_BAUDRATE_HZ.Hz());
        let bus = I2cDriver::new(i2c, io_pin(pins::I2C_SDA_GPIO), io_pin(pins::I2C_SCL_GPIO), &conf)
            .map_err(|_| Error::Init("I2C bus"))?;
        let mut adc = Ads1115::new(bus, FreeRtos, DEFAULT_ADDRESS);
        adc.probe().map_err(|_| Error::Init("ADS1115 not responding"))?;
        Ok(adc)
    };

    // ── 5. Run ────────────────────────────────────────────────
    let publisher = EspMqttPublisher::new();
    let exit = match config.kind {
        NodeKind::Motion => {
            let motion: &'static MotionSensor =
                Box::leak(Box::new(MotionSensor::new(config.motion_retrigger_secs)));
            let mut pir = PinDriver::input(io_pin(pins::PIR_GPIO))?;
            pir.set_interrupt_type(InterruptType::PosEdge)?;
            unsafe {
                pir.subscribe(move || motion.on_rising_edge(time::uptime_ms()))?;
            }

            let arm = || pir.enable_interrupt().map_err(|_| Error::Init("PIR interrupt"));
            let exit = node.run(
                publisher,
                adc_init,
                MotionNode { sensor: motion, arm },
                &mut SystemReset,
            );
            pir.unsubscribe()?;
            exit
        }
        NodeKind::Contact => {
            let mut contact = PinDriver::input(io_pin(pins::CONTACT_GPIO))?;
            contact.set_pull(Pull::Up)?;
            node.run(
                publisher,
                adc_init,
                ContactNode { contact_pin: contact },
                &mut SystemReset,
            )
        }
    };

    match exit {
        Exit::GateClosedAtBoot => info!("Run-gate closed at boot, application not started"),
        Exit::GateClosed => info!("Run-gate closed, application stopped"),
    }
    Ok(())
}

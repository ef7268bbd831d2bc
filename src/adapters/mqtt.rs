//! MQTT publisher adapter.
//!
//! Implements [`PublishPort`](crate::app::ports::PublishPort) on top of
//! `esp_idf_svc::mqtt::client::EspMqttClient`.  The client is created in
//! `connect` (the last will is part of the client configuration), and a
//! background thread drains the connection events.  `connect` blocks until
//! the first event that decides the session, or until the timeout.
//!
//! Deciding the session is target-independent: the device event loop maps
//! each `EventPayload` onto a [`SessionEvent`] and hands it to
//! [`FirstOutcome`]; `connect` waits in [`await_outcome`].

use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use crate::error::CommsError;

/// How long `connect` waits for the broker to decide the session.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Connection event, reduced to what matters while connecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Emitted by the client before every connect attempt.
    BeforeConnect,
    Connected,
    /// The broker closed the session before accepting it.
    Disconnected,
    /// Transport or protocol error.  The client does not expose the CONNACK
    /// code here, so it counts as an unreachable broker.
    Error,
    Other,
}

impl SessionEvent {
    /// The connect result this event decides, if any.
    pub fn outcome(self) -> Option<Result<(), CommsError>> {
        match self {
            Self::Connected => Some(Ok(())),
            Self::Disconnected => Some(Err(CommsError::ConnectRefused)),
            Self::Error => Some(Err(CommsError::BrokerUnreachable)),
            Self::BeforeConnect | Self::Other => None,
        }
    }
}

pub type OutcomeTx = mpsc::Sender<Result<(), CommsError>>;
pub type OutcomeRx = mpsc::Receiver<Result<(), CommsError>>;

/// Forwards the first deciding event of a session to the waiting `connect`.
/// Events that decide nothing leave the sender in place.
pub struct FirstOutcome {
    tx: Option<OutcomeTx>,
}

impl FirstOutcome {
    pub fn new(tx: OutcomeTx) -> Self {
        Self { tx: Some(tx) }
    }

    pub fn offer(&mut self, event: SessionEvent) {
        let Some(outcome) = event.outcome() else {
            return;
        };
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(outcome);
        }
    }
}

/// Wait for the session to be decided.  No answer in time, or an event loop
/// that ended without one, means the broker was never reached.
pub fn await_outcome(rx: &OutcomeRx, timeout: Duration) -> Result<(), CommsError> {
    match rx.recv_timeout(timeout) {
        Ok(outcome) => outcome,
        Err(RecvTimeoutError::Timeout) => {
            log::error!("MQTT: no answer from broker within {}s", timeout.as_secs());
            Err(CommsError::BrokerUnreachable)
        }
        Err(RecvTimeoutError::Disconnected) => {
            log::error!("MQTT: event loop closed before the session was decided");
            Err(CommsError::BrokerUnreachable)
        }
    }
}

#[cfg(target_os = "espidf")]
pub use espidf::EspMqttPublisher;

#[cfg(target_os = "espidf")]
mod espidf {
    use std::sync::mpsc;

    use esp_idf_svc::mqtt::client::{
        EspMqttClient, EventPayload, LwtConfiguration, MqttClientConfiguration, QoS,
    };
    use log::{error, info, warn};

    use super::{CONNECT_TIMEOUT, FirstOutcome, SessionEvent, await_outcome};
    use crate::app::ports::{BrokerSession, PublishPort};
    use crate::error::CommsError;

    const EVENT_THREAD_STACK: usize = 6 * 1024;

    #[derive(Default)]
    pub struct EspMqttPublisher {
        client: Option<EspMqttClient<'static>>,
    }

    impl EspMqttPublisher {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl PublishPort for EspMqttPublisher {
        fn connect(&mut self, session: &BrokerSession<'_>) -> Result<(), CommsError> {
            let conf = MqttClientConfiguration {
                client_id: Some(session.client_id),
                username: session.username,
                password: session.password,
                lwt: Some(LwtConfiguration {
                    topic: session.will_topic,
                    payload: session.will_payload.as_bytes(),
                    qos: QoS::AtMostOnce,
                    retain: false,
                }),
                ..Default::default()
            };

            let (client, mut conn) = EspMqttClient::new(session.url, &conf).map_err(|e| {
                error!("MQTT: client setup for {} failed: {:?}", session.url, e);
                CommsError::BrokerUnreachable
            })?;

            let (tx, rx) = mpsc::channel();
            let mut first = FirstOutcome::new(tx);
            std::thread::Builder::new()
                .stack_size(EVENT_THREAD_STACK)
                .spawn(move || {
                    while let Ok(event) = conn.next() {
                        let event = match event.payload() {
                            EventPayload::BeforeConnect => SessionEvent::BeforeConnect,
                            EventPayload::Connected(_) => SessionEvent::Connected,
                            EventPayload::Disconnected => {
                                warn!("MQTT: disconnected");
                                SessionEvent::Disconnected
                            }
                            EventPayload::Error(e) => {
                                warn!("MQTT: {:?}", e);
                                SessionEvent::Error
                            }
                            _ => SessionEvent::Other,
                        };
                        first.offer(event);
                    }
                    info!("MQTT: event loop closed");
                })
                .map_err(|_| CommsError::BrokerUnreachable)?;

            await_outcome(&rx, CONNECT_TIMEOUT)?;
            self.client = Some(client);
            Ok(())
        }

        fn publish(&mut self, topic: &str, payload: &str) -> Result<(), CommsError> {
            let client = self.client.as_mut().ok_or(CommsError::PublishFailed)?;
            client
                .publish(topic, QoS::AtMostOnce, false, payload.as_bytes())
                .map(|_| ())
                .map_err(|e| {
                    error!("MQTT: publish to {} failed: {:?}", topic, e);
                    CommsError::PublishFailed
                })
        }
    }
}

//! ESP-IDF MQTT transport.
//!
//! Wraps `EspMqttClient` created with an event callback. The callback
//! runs on the MQTT task: it flips the shared connected flag and pushes
//! received messages into a bounded queue which [`Transport::poll`]
//! drains from the scheduler thread. Publishes use `enqueue`, so they
//! never block on the network.
//!
//! A last-will of `"offline"` (retained) is registered on the status
//! topic so the broker announces an unexpected drop.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::mqtt::client::{
    EspMqttClient, EventPayload, LwtConfiguration, MqttClientConfiguration, QoS,
};
use log::{info, warn};

use crate::config::BrokerConfig;
use crate::error::CommsError;

use super::{InboundMessage, Transport, INBOX_CAP};

/// Messages buffered between the MQTT task and the scheduler.
const QUEUE_CAP: usize = INBOX_CAP * 4;
const CONNECT_POLL_MS: u32 = 50;

pub struct EspMqttTransport {
    broker: BrokerConfig,
    status_topic: String,
    client: Option<EspMqttClient<'static>>,
    connected: Arc<AtomicBool>,
    queue: Arc<Mutex<VecDeque<InboundMessage>>>,
}

impl EspMqttTransport {
    pub fn new(broker: BrokerConfig, status_topic: &str) -> Self {
        Self {
            broker,
            status_topic: status_topic.to_owned(),
            client: None,
            connected: Arc::new(AtomicBool::new(false)),
            queue: Arc::new(Mutex::new(VecDeque::with_capacity(QUEUE_CAP))),
        }
    }

    fn create_client(&self) -> Result<EspMqttClient<'static>, CommsError> {
        let opt = |s: &str| (!s.is_empty()).then(|| s.to_owned());
        let username = opt(&self.broker.username);
        let password = opt(&self.broker.password);

        let conf = MqttClientConfiguration {
            client_id: Some(&self.broker.client_id),
            username: username.as_deref(),
            password: password.as_deref(),
            keep_alive_interval: Some(Duration::from_secs(u64::from(self.broker.keep_alive_secs))),
            network_timeout: Duration::from_millis(u64::from(self.broker.connect_timeout_ms)),
            lwt: Some(LwtConfiguration {
                topic: &self.status_topic,
                payload: b"offline",
                qos: QoS::AtLeastOnce,
                retain: true,
            }),
            // The scheduler reconnects at tick cadence.
            disable_reconnect: true,
            ..Default::default()
        };

        let connected = self.connected.clone();
        let queue = self.queue.clone();
        EspMqttClient::new_cb(&self.broker.url, &conf, move |event| match event.payload() {
            EventPayload::Connected(_) => connected.store(true, Ordering::SeqCst),
            EventPayload::Disconnected => connected.store(false, Ordering::SeqCst),
            EventPayload::Received { topic: Some(topic), data, .. } => {
                let Some(msg) = InboundMessage::from_bytes(topic, data) else {
                    warn!("MQTT: discarded oversize/non-UTF-8 message on '{}'", topic);
                    return;
                };
                if let Ok(mut q) = queue.lock() {
                    if q.len() >= QUEUE_CAP {
                        q.pop_front();
                    }
                    q.push_back(msg);
                }
            }
            EventPayload::Error(e) => warn!("MQTT: event error {:?}", e),
            _ => {}
        })
        .map_err(|e| {
            warn!("MQTT: client create failed: {}", e);
            CommsError::ConnectFailed
        })
    }
}

impl Transport for EspMqttTransport {
    fn connect(&mut self) -> Result<(), CommsError> {
        self.disconnect();
        self.connected.store(false, Ordering::SeqCst);
        let client = self.create_client()?;
        self.client = Some(client);

        let mut waited = 0;
        while !self.connected.load(Ordering::SeqCst) {
            if waited >= self.broker.connect_timeout_ms {
                self.client = None;
                return Err(CommsError::ConnectTimeout);
            }
            FreeRtos::delay_ms(CONNECT_POLL_MS);
            waited += CONNECT_POLL_MS;
        }
        info!("MQTT: session up after {} ms", waited);
        Ok(())
    }

    fn disconnect(&mut self) {
        // Dropping the client stops its task and closes the socket.
        self.client = None;
        self.connected.store(false, Ordering::SeqCst);
        if let Ok(mut q) = self.queue.lock() {
            q.clear();
        }
    }

    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), CommsError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(CommsError::NotConnected);
        }
        let client = self.client.as_mut().ok_or(CommsError::NotConnected)?;
        let qos = if retain { QoS::AtLeastOnce } else { QoS::AtMostOnce };
        client
            .enqueue(topic, qos, retain, payload)
            .map(|_| ())
            .map_err(|_| CommsError::PublishFailed)
    }

    fn subscribe(&mut self, filter: &str) -> Result<(), CommsError> {
        let client = self.client.as_mut().ok_or(CommsError::NotConnected)?;
        client
            .subscribe(filter, QoS::AtMostOnce)
            .map(|_| ())
            .map_err(|_| CommsError::SubscribeFailed)
    }

    fn poll(&mut self) -> Result<Option<InboundMessage>, CommsError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(CommsError::TransportClosed);
        }
        let mut q = self.queue.lock().map_err(|_| CommsError::TransportClosed)?;
        Ok(q.pop_front())
    }
}

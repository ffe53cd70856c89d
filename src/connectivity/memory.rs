//! In-memory broker session for host tests and simulation.
//!
//! Behaves like a single-client broker: publishes are recorded, injected
//! messages are delivered only if they match an active subscription, and
//! a session can be refused or killed on demand.

use std::collections::VecDeque;

use crate::app::topics::topic_matches;
use crate::error::CommsError;

use super::{InboundMessage, Transport};

/// A message the client handed to the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub topic: String,
    pub payload: String,
    pub retain: bool,
}

#[derive(Debug)]
pub struct MemoryTransport {
    broker_up: bool,
    session: bool,
    published: Vec<Published>,
    subscriptions: Vec<String>,
    inbound: VecDeque<(String, String)>,
    fail_publish: bool,
    fail_poll: bool,
    connect_attempts: u32,
    disconnects: u32,
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self {
            broker_up: true,
            session: false,
            published: Vec::new(),
            subscriptions: Vec::new(),
            inbound: VecDeque::new(),
            fail_publish: false,
            fail_poll: false,
            connect_attempts: 0,
            disconnects: 0,
        }
    }

    /// Bringing the broker down also kills the current session.
    pub fn set_broker_up(&mut self, up: bool) {
        self.broker_up = up;
        if !up {
            self.session = false;
        }
    }

    pub fn has_session(&self) -> bool {
        self.session
    }

    /// Queue a message as if another client had published it.
    pub fn inject(&mut self, topic: &str, payload: &str) {
        self.inbound.push_back((topic.to_owned(), payload.to_owned()));
    }

    pub fn fail_next_publish(&mut self) {
        self.fail_publish = true;
    }

    pub fn fail_next_poll(&mut self) {
        self.fail_poll = true;
    }

    pub fn published(&self) -> &[Published] {
        &self.published
    }

    /// Payloads published to exactly `topic`, oldest first.
    pub fn payloads_on(&self, topic: &str) -> Vec<&str> {
        self.published
            .iter()
            .filter(|p| p.topic == topic)
            .map(|p| p.payload.as_str())
            .collect()
    }

    pub fn clear_published(&mut self) {
        self.published.clear();
    }

    pub fn subscriptions(&self) -> &[String] {
        &self.subscriptions
    }

    pub fn connect_attempts(&self) -> u32 {
        self.connect_attempts
    }

    pub fn disconnects(&self) -> u32 {
        self.disconnects
    }
}

impl Transport for MemoryTransport {
    fn connect(&mut self) -> Result<(), CommsError> {
        self.connect_attempts += 1;
        if !self.broker_up {
            return Err(CommsError::ConnectFailed);
        }
        // A fresh session starts without subscriptions.
        self.subscriptions.clear();
        self.session = true;
        Ok(())
    }

    fn disconnect(&mut self) {
        self.disconnects += 1;
        self.session = false;
    }

    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), CommsError> {
        if !self.session {
            return Err(CommsError::NotConnected);
        }
        if std::mem::take(&mut self.fail_publish) {
            self.session = false;
            return Err(CommsError::PublishFailed);
        }
        self.published.push(Published {
            topic: topic.to_owned(),
            payload: String::from_utf8_lossy(payload).into_owned(),
            retain,
        });
        Ok(())
    }

    fn subscribe(&mut self, filter: &str) -> Result<(), CommsError> {
        if !self.session {
            return Err(CommsError::NotConnected);
        }
        self.subscriptions.push(filter.to_owned());
        Ok(())
    }

    fn poll(&mut self) -> Result<Option<InboundMessage>, CommsError> {
        if std::mem::take(&mut self.fail_poll) {
            self.session = false;
            return Err(CommsError::TransportClosed);
        }
        if !self.session {
            return Err(CommsError::NotConnected);
        }
        while let Some((topic, payload)) = self.inbound.pop_front() {
            if !self.subscriptions.iter().any(|f| topic_matches(f, &topic)) {
                continue;
            }
            if let Some(msg) = InboundMessage::new(&topic, &payload) {
                return Ok(Some(msg));
            }
        }
        Ok(None)
    }
}

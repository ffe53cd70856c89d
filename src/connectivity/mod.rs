//! Broker connectivity.
//!
//! [`Channel`] owns the single logical broker session: it tracks the
//! connected flag, replays subscriptions on every (re)connect, and turns
//! every transport failure into `connected = false` instead of an error
//! the caller has to handle. The scheduler retries `connect()` once per
//! tick while the flag is down.
//!
//! ```text
//!   Task ──publish──▶ Channel ──▶ Transport (ESP MQTT / in-memory)
//!   Scheduler ◀─pump── Channel ◀── Transport::poll
//! ```
//!
//! Delivery is best effort: a publish while disconnected is dropped and
//! counted, never queued.

pub mod memory;

#[cfg(target_os = "espidf")]
pub mod esp_mqtt;

use log::{debug, info, warn};

use crate::app::ports::Publisher;
use crate::app::topics::TopicBuf;
use crate::error::CommsError;

pub use memory::MemoryTransport;

/// Largest inbound payload accepted; longer messages are discarded.
pub const PAYLOAD_CAP: usize = 256;
/// Messages handed out by a single [`Channel::pump`].
pub const INBOX_CAP: usize = 8;
pub const MAX_FILTERS: usize = 8;

/// One message received from the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: TopicBuf,
    pub payload: heapless::String<PAYLOAD_CAP>,
}

impl InboundMessage {
    /// `None` when the topic or payload does not fit.
    pub fn new(topic: &str, payload: &str) -> Option<Self> {
        let mut t = TopicBuf::new();
        t.push_str(topic).ok()?;
        let mut p = heapless::String::new();
        p.push_str(payload).ok()?;
        Some(Self { topic: t, payload: p })
    }

    /// Build from raw bytes; non-UTF-8 payloads are rejected.
    pub fn from_bytes(topic: &str, payload: &[u8]) -> Option<Self> {
        Self::new(topic, core::str::from_utf8(payload).ok()?)
    }
}

/// Messages drained by one pump step.
pub type Inbox = heapless::Vec<InboundMessage, INBOX_CAP>;

/// Raw broker session. Every call is bounded in time.
pub trait Transport {
    /// Establish a session, waiting at most the configured connect timeout.
    fn connect(&mut self) -> Result<(), CommsError>;

    /// Tear the session down. Safe to call when not connected.
    fn disconnect(&mut self);

    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), CommsError>;

    fn subscribe(&mut self, filter: &str) -> Result<(), CommsError>;

    /// Next buffered inbound message, never blocking.
    fn poll(&mut self) -> Result<Option<InboundMessage>, CommsError>;
}

pub struct Channel<T: Transport> {
    transport: T,
    connected: bool,
    filters: heapless::Vec<TopicBuf, MAX_FILTERS>,
    online_topic: TopicBuf,
    published: u32,
    dropped: u32,
}

impl<T: Transport> Channel<T> {
    /// `online_topic` receives a retained `"online"` after every connect.
    pub fn new(transport: T, online_topic: TopicBuf) -> Self {
        Self {
            transport,
            connected: false,
            filters: heapless::Vec::new(),
            online_topic,
            published: 0,
            dropped: 0,
        }
    }

    /// Add a subscription that is (re)applied on every connect.
    /// Returns `false` when the filter table is full.
    pub fn register_filter(&mut self, filter: &str) -> bool {
        if self.filters.iter().any(|f| f.as_str() == filter) {
            return true;
        }
        let mut f = TopicBuf::new();
        if f.push_str(filter).is_err() || self.filters.push(f).is_err() {
            warn!("MQTT: cannot register filter '{}'", filter);
            return false;
        }
        if self.connected {
            if let Err(e) = self.transport.subscribe(filter) {
                warn!("MQTT: subscribe '{}' failed: {}", filter, e);
                self.mark_down();
            }
        }
        true
    }

    pub fn filters(&self) -> impl Iterator<Item = &str> {
        self.filters.iter().map(|f| f.as_str())
    }

    /// Attempt a session. Never panics or returns an error; `false` means
    /// still disconnected and the caller may try again next tick.
    pub fn connect(&mut self) -> bool {
        if self.connected {
            return true;
        }
        if let Err(e) = self.transport.connect() {
            warn!("MQTT: connect failed: {}", e);
            return false;
        }
        for f in &self.filters {
            if let Err(e) = self.transport.subscribe(f) {
                warn!("MQTT: subscribe '{}' failed: {}", f, e);
                self.transport.disconnect();
                return false;
            }
        }
        self.connected = true;
        if let Err(e) = self.transport.publish(&self.online_topic, b"online", true) {
            warn!("MQTT: online status failed: {}", e);
            self.mark_down();
            return false;
        }
        info!("MQTT: connected ({} subscriptions)", self.filters.len());
        true
    }

    /// Announce `"offline"` (retained) and close the session. Idempotent.
    pub fn disconnect(&mut self) {
        if self.connected {
            if let Err(e) = self.transport.publish(&self.online_topic, b"offline", true) {
                debug!("MQTT: offline status failed: {}", e);
            }
            self.transport.disconnect();
            self.connected = false;
            info!("MQTT: disconnected");
        }
    }

    /// Drain at most [`INBOX_CAP`] buffered messages. Anything left stays
    /// buffered for the next call. A transport error drops the link.
    pub fn pump(&mut self) -> Inbox {
        let mut inbox = Inbox::new();
        if !self.connected {
            return inbox;
        }
        while !inbox.is_full() {
            match self.transport.poll() {
                Ok(Some(msg)) => {
                    let _ = inbox.push(msg);
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("MQTT: poll failed: {}", e);
                    self.mark_down();
                    break;
                }
            }
        }
        inbox
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Messages handed to the transport successfully.
    pub fn published(&self) -> u32 {
        self.published
    }

    /// Messages dropped because the link was down or the send failed.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    fn mark_down(&mut self) {
        if self.connected {
            self.connected = false;
            self.transport.disconnect();
        }
    }
}

impl<T: Transport> Publisher for Channel<T> {
    fn publish(&mut self, topic: &str, payload: &str) -> bool {
        if !self.connected {
            self.dropped = self.dropped.saturating_add(1);
            debug!("MQTT: dropped '{}' (offline)", topic);
            return false;
        }
        match self.transport.publish(topic, payload.as_bytes(), false) {
            Ok(()) => {
                self.published = self.published.saturating_add(1);
                true
            }
            Err(e) => {
                warn!("MQTT: publish '{}' failed: {}", topic, e);
                self.dropped = self.dropped.saturating_add(1);
                self.mark_down();
                false
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

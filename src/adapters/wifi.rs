//! WiFi station-mode adapter.
//!
//! Implements [`ConnectivityPort`], the link layer underneath the MQTT
//! channel. The broker channel retries every tick on its own; this adapter
//! only keeps the station associated.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: the non-blocking `esp_idf_svc::wifi::EspWifi`.
//! - **all other targets**: a scriptable simulated link for host tests.
//!
//! ## Reconnection policy
//!
//! A connect only starts association. [`ConnectivityPort::poll`] then
//! checks whether the interface is up and gives up after
//! [`ASSOCIATE_TIMEOUT_MS`]. On a failed or timed-out attempt, or a lost
//! association, the adapter waits an exponential backoff (2 s → 4 s → 8 s
//! … capped at 60 s) between attempts. `poll` must be called regularly
//! with the current uptime; it never waits on the radio.

use core::fmt;
use log::{error, info, warn};

#[cfg(target_os = "espidf")]
use esp_idf_svc::wifi::{AuthMethod, ClientConfiguration, Configuration, EspWifi};

// ───────────────────────────────────────────────────────────────
// Port trait
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityError {
    NoCredentials,
    InvalidSsid,
    InvalidPassword,
    AuthFailed,
    ConnectionFailed,
    AlreadyConnected,
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)"),
            Self::AuthFailed => write!(f, "access point rejected the credentials"),
            Self::ConnectionFailed => write!(f, "WiFi connection failed"),
            Self::AlreadyConnected => write!(f, "already connected to AP"),
        }
    }
}

impl std::error::Error for ConnectivityError {}

pub trait ConnectivityPort {
    /// Start associating. Returns once the attempt is under way; `poll`
    /// reports the outcome.
    fn connect(&mut self) -> Result<(), ConnectivityError>;
    fn disconnect(&mut self);
    fn is_connected(&self) -> bool;
    /// Drive reconnection. `now_ms` is monotonic uptime.
    fn poll(&mut self, now_ms: u64);
    fn set_credentials(&mut self, ssid: &str, password: &str) -> Result<(), ConnectivityError>;
    fn rssi(&self) -> Option<i8>;
}

// ───────────────────────────────────────────────────────────────
// Connection state
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiState {
    Disconnected,
    /// Association requested, interface not up yet.
    Connecting { attempt: u32 },
    Connected,
    Reconnecting { attempt: u32 },
}

pub const MIN_BACKOFF_SECS: u32 = 2;
pub const MAX_BACKOFF_SECS: u32 = 60;
/// An attempt that has not brought the interface up by now has failed.
pub const ASSOCIATE_TIMEOUT_MS: u64 = 15_000;

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

fn validate_ssid(ssid: &str) -> Result<(), ConnectivityError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(ConnectivityError::InvalidSsid);
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ConnectivityError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(ConnectivityError::InvalidPassword);
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// Simulated link (host)
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Default)]
struct SimLink {
    associated: bool,
    /// Attempts are accepted but the AP never answers.
    stalled: bool,
    fail_next: u32,
    attempts: u32,
}

// ───────────────────────────────────────────────────────────────
// WiFi adapter
// ───────────────────────────────────────────────────────────────

pub struct WifiAdapter {
    state: WifiState,
    ssid: heapless::String<32>,
    password: heapless::String<64>,
    backoff_secs: u32,
    retry_at_ms: Option<u64>,
    deadline_ms: Option<u64>,
    last_rssi: Option<i8>,
    #[cfg(target_os = "espidf")]
    wifi: EspWifi<'static>,
    #[cfg(not(target_os = "espidf"))]
    sim: SimLink,
}

impl WifiAdapter {
    #[cfg(target_os = "espidf")]
    pub fn new(wifi: EspWifi<'static>) -> Self {
        Self {
            state: WifiState::Disconnected,
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            backoff_secs: MIN_BACKOFF_SECS,
            retry_at_ms: None,
            deadline_ms: None,
            last_rssi: None,
            wifi,
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        Self {
            state: WifiState::Disconnected,
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            backoff_secs: MIN_BACKOFF_SECS,
            retry_at_ms: None,
            deadline_ms: None,
            last_rssi: None,
            sim: SimLink::default(),
        }
    }

    pub fn state(&self) -> WifiState {
        self.state
    }

    /// Wait before the next reconnect attempt.
    pub fn backoff_secs(&self) -> u32 {
        self.backoff_secs
    }

    fn schedule_retry(&mut self, now_ms: u64) {
        self.retry_at_ms = Some(now_ms + u64::from(self.backoff_secs) * 1000);
    }

    fn on_connected(&mut self) {
        self.state = WifiState::Connected;
        self.backoff_secs = MIN_BACKOFF_SECS;
        self.retry_at_ms = None;
        self.deadline_ms = None;
        self.last_rssi = self.platform_rssi();
        self.log_address();
    }

    /// Kick off association. `now_ms` is unknown when called from
    /// `connect`; the first `poll` then starts the deadline.
    fn begin_attempt(&mut self, attempt: u32, now_ms: Option<u64>) -> Result<(), ConnectivityError> {
        self.platform_begin()?;
        self.state = WifiState::Connecting { attempt };
        self.retry_at_ms = None;
        self.deadline_ms = now_ms.map(|now| now + ASSOCIATE_TIMEOUT_MS);
        Ok(())
    }

    fn retry_later(&mut self, now_ms: u64, attempt: u32) {
        self.backoff_secs = (self.backoff_secs * 2).min(MAX_BACKOFF_SECS);
        self.state = WifiState::Reconnecting { attempt };
        self.deadline_ms = None;
        self.schedule_retry(now_ms);
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_begin(&mut self) -> Result<(), ConnectivityError> {
        let auth_method = if self.password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        let config = Configuration::Client(ClientConfiguration {
            ssid: self.ssid.as_str().try_into().map_err(|_| ConnectivityError::InvalidSsid)?,
            password: self
                .password
                .as_str()
                .try_into()
                .map_err(|_| ConnectivityError::InvalidPassword)?,
            auth_method,
            ..Default::default()
        });
        let fail = |e: esp_idf_svc::sys::EspError| {
            warn!("WiFi(espidf): {}", e);
            ConnectivityError::ConnectionFailed
        };
        self.wifi.set_configuration(&config).map_err(fail)?;
        if !self.wifi.is_started().map_err(fail)? {
            self.wifi.start().map_err(fail)?;
        }
        self.wifi.connect().map_err(fail)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_begin(&mut self) -> Result<(), ConnectivityError> {
        self.sim.attempts = self.sim.attempts.wrapping_add(1);
        if self.sim.fail_next > 0 {
            self.sim.fail_next -= 1;
            warn!("WiFi(sim): simulated auth failure (attempt {})", self.sim.attempts);
            return Err(ConnectivityError::AuthFailed);
        }
        self.sim.associated = !self.sim.stalled;
        info!("WiFi(sim): associating with '{}' (attempt {})", self.ssid, self.sim.attempts);
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_disconnect(&mut self) {
        if let Err(e) = self.wifi.disconnect() {
            warn!("WiFi(espidf): disconnect: {}", e);
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_disconnect(&mut self) {
        self.sim.associated = false;
    }

    /// Associated and the interface has an address.
    #[cfg(target_os = "espidf")]
    fn platform_is_up(&self) -> bool {
        self.wifi.is_up().unwrap_or(false)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_is_up(&self) -> bool {
        self.sim.associated
    }

    #[cfg(target_os = "espidf")]
    fn log_address(&self) {
        if let Ok(ip) = self.wifi.sta_netif().get_ip_info() {
            info!("WiFi(espidf): IP {}", ip.ip);
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn log_address(&self) {}

    #[cfg(target_os = "espidf")]
    fn platform_rssi(&self) -> Option<i8> {
        let mut info: esp_idf_svc::sys::wifi_ap_record_t = unsafe { core::mem::zeroed() };
        let rc = unsafe { esp_idf_svc::sys::esp_wifi_sta_get_ap_info(&mut info) };
        (rc == esp_idf_svc::sys::ESP_OK).then_some(info.rssi)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_rssi(&self) -> Option<i8> {
        self.sim.associated.then_some(-60)
    }

    // ── Simulation hooks ──────────────────────────────────────

    /// Simulation: drop the association as if the AP went away.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_drop_link(&mut self) {
        self.sim.associated = false;
    }

    /// Simulation: accept attempts but never come up.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_stall_association(&mut self, stalled: bool) {
        self.sim.stalled = stalled;
    }

    /// Simulation: make the next `n` connect attempts fail.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_fail_connects(&mut self, n: u32) {
        self.sim.fail_next = n;
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn sim_attempts(&self) -> u32 {
        self.sim.attempts
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for WifiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

// ───────────────────────────────────────────────────────────────
// ConnectivityPort
// ───────────────────────────────────────────────────────────────

impl ConnectivityPort for WifiAdapter {
    fn connect(&mut self) -> Result<(), ConnectivityError> {
        if self.ssid.is_empty() {
            return Err(ConnectivityError::NoCredentials);
        }
        if self.state == WifiState::Connected {
            return Err(ConnectivityError::AlreadyConnected);
        }

        if matches!(self.state, WifiState::Connecting { .. }) {
            return Ok(());
        }

        info!("WiFi: connecting to '{}'", self.ssid);
        self.begin_attempt(0, None).inspect_err(|e| {
            error!("WiFi: connection failed: {}", e);
            self.state = WifiState::Reconnecting { attempt: 0 };
            self.retry_at_ms = None;
        })
    }

    fn disconnect(&mut self) {
        self.platform_disconnect();
        self.state = WifiState::Disconnected;
        self.retry_at_ms = None;
        self.deadline_ms = None;
        self.last_rssi = None;
        info!("WiFi: disconnected");
    }

    fn is_connected(&self) -> bool {
        self.state == WifiState::Connected && self.platform_is_up()
    }

    fn poll(&mut self, now_ms: u64) {
        match self.state {
            WifiState::Reconnecting { attempt } => {
                let due = match self.retry_at_ms {
                    Some(due) => due,
                    None => {
                        self.schedule_retry(now_ms);
                        return;
                    }
                };
                if now_ms < due {
                    return;
                }
                info!("WiFi: reconnect attempt {} (backoff {}s)", attempt + 1, self.backoff_secs);
                if let Err(e) = self.begin_attempt(attempt, Some(now_ms)) {
                    warn!("WiFi: reconnect failed: {}", e);
                    self.retry_later(now_ms, attempt + 1);
                }
            }
            WifiState::Connecting { attempt } => {
                if self.platform_is_up() {
                    self.on_connected();
                    info!("WiFi: connected (RSSI={:?})", self.last_rssi);
                    return;
                }
                let deadline = *self.deadline_ms.get_or_insert(now_ms + ASSOCIATE_TIMEOUT_MS);
                if now_ms >= deadline {
                    warn!("WiFi: no link after {} ms, backing off", ASSOCIATE_TIMEOUT_MS);
                    self.platform_disconnect();
                    self.retry_later(now_ms, attempt + 1);
                }
            }
            WifiState::Connected => {
                if self.platform_is_up() {
                    self.last_rssi = self.platform_rssi();
                } else {
                    warn!("WiFi: connection lost, entering reconnect");
                    self.state = WifiState::Reconnecting { attempt: 0 };
                    self.last_rssi = None;
                    self.schedule_retry(now_ms);
                }
            }
            WifiState::Disconnected => {}
        }
    }

    fn set_credentials(&mut self, ssid: &str, password: &str) -> Result<(), ConnectivityError> {
        validate_ssid(ssid)?;
        validate_password(password)?;
        self.ssid.clear();
        self.ssid.push_str(ssid).map_err(|_| ConnectivityError::InvalidSsid)?;
        self.password.clear();
        self.password.push_str(password).map_err(|_| ConnectivityError::InvalidPassword)?;
        info!("WiFi: credentials updated (SSID='{}')", self.ssid);
        Ok(())
    }

    fn rssi(&self) -> Option<i8> {
        self.last_rssi
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────

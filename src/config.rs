//! System configuration parameters
//!
//! All tunable parameters for the smart house controller. Defaults match the
//! reference installation; a JSON document may override any subset of fields
//! (missing fields keep their defaults).

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::sensors::rfid::CardId;

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    // --- Timing ---
    /// Nominal scheduler period (milliseconds)
    pub tick_interval_ms: u32,
    /// Heartbeat publish interval (seconds, 0 = disabled)
    pub heartbeat_interval_secs: u32,

    // --- Messaging ---
    /// Namespace prefix for every topic, without trailing slash
    pub topic_root: heapless::String<32>,
    pub broker: BrokerConfig,

    // --- Per-domain tasks ---
    pub illumination: IlluminationConfig,
    pub climate: ClimateConfig,
    pub moisture: MoistureConfig,
    pub gas: GasConfig,
    pub access: AccessConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// e.g. `mqtts://broker.example:8883`
    pub url: heapless::String<128>,
    pub client_id: heapless::String<32>,
    pub username: heapless::String<32>,
    pub password: heapless::String<64>,
    /// Upper bound on a single blocking connect attempt (milliseconds)
    pub connect_timeout_ms: u32,
    pub keep_alive_secs: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IlluminationConfig {
    /// Fixed offset from UTC applied to the wall clock (seconds)
    pub utc_offset_secs: i32,
    /// LED turns on at or after this hour...
    pub on_hour: u8,
    /// ...and stays on until before this hour
    pub off_hour: u8,
    /// Minimum spacing between evaluations (seconds)
    pub check_interval_secs: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClimateConfig {
    /// Read + publish interval (seconds)
    pub interval_secs: u32,
    /// Alert when relative humidity is strictly above this (%)
    pub alert_humidity_pct: f32,
    /// ...and temperature is strictly above this (°C)
    pub alert_temperature_c: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MoistureConfig {
    /// Raw ADC level above which the surface counts as wet (0 – 4095)
    pub wet_threshold: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GasConfig {
    /// Readings are ignored for this long after start-up (seconds)
    pub warmup_secs: u32,
    /// Consecutive positive readings required to confirm
    pub debounce_count: u8,
}

/// How a scanned card is authorised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// Compare against [`AccessConfig::allow_list`] immediately.
    Local,
    /// Publish a check request and wait for a broker-side verdict.
    Remote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    pub mode: AuthMode,
    pub allow_list: heapless::Vec<CardId, 8>,
    /// Same card is ignored for this long after a scan (milliseconds)
    pub cooldown_ms: u32,
    /// Remote verdict deadline; expiry denies (milliseconds)
    pub auth_timeout_ms: u32,
    /// Door hold-open time after a grant (milliseconds)
    pub dwell_ms: u32,
    pub deny_flash_count: u8,
    pub deny_flash_on_ms: u32,
    pub deny_flash_off_ms: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 500,
            heartbeat_interval_secs: 60,
            topic_root: heapless_str("ks5009/house"),
            broker: BrokerConfig::default(),
            illumination: IlluminationConfig::default(),
            climate: ClimateConfig::default(),
            moisture: MoistureConfig::default(),
            gas: GasConfig::default(),
            access: AccessConfig::default(),
        }
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            url: heapless_str("mqtt://broker.hivemq.com:1883"),
            client_id: heapless_str("ks5009-smart-house"),
            username: heapless::String::new(),
            password: heapless::String::new(),
            connect_timeout_ms: 1000,
            keep_alive_secs: 60,
        }
    }
}

impl Default for IlluminationConfig {
    fn default() -> Self {
        Self {
            utc_offset_secs: 11 * 3600,
            on_hour: 20,
            off_hour: 7,
            check_interval_secs: 60,
        }
    }
}

impl Default for ClimateConfig {
    fn default() -> Self {
        Self {
            interval_secs: 30 * 60,
            alert_humidity_pct: 50.0,
            alert_temperature_c: 27.0,
        }
    }
}

impl Default for MoistureConfig {
    fn default() -> Self {
        Self { wet_threshold: 2000 }
    }
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            warmup_secs: 30,
            debounce_count: 6,
        }
    }
}

impl Default for AccessConfig {
    fn default() -> Self {
        let mut allow_list = heapless::Vec::new();
        let _ = allow_list.push(heapless_str("0x12345678"));
        Self {
            mode: AuthMode::Local,
            allow_list,
            cooldown_ms: 3000,
            auth_timeout_ms: 5000,
            dwell_ms: 3000,
            deny_flash_count: 3,
            deny_flash_on_ms: 300,
            deny_flash_off_ms: 300,
        }
    }
}

impl SystemConfig {
    /// Parse a (possibly partial) JSON document and validate the result.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|_| ConfigError::Malformed)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the control loop cannot operate with. Nothing is clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 || self.tick_interval_ms > 10_000 {
            return Err(ConfigError::ValidationFailed("tick_interval_ms must be 1..=10000"));
        }
        if self.topic_root.is_empty() || self.topic_root.ends_with('/') {
            return Err(ConfigError::ValidationFailed("topic_root must be non-empty without trailing '/'"));
        }
        if self.topic_root.contains(['+', '#']) {
            return Err(ConfigError::ValidationFailed("topic_root must not contain wildcards"));
        }
        if self.broker.connect_timeout_ms > 2 * self.tick_interval_ms.max(1000) {
            return Err(ConfigError::ValidationFailed("broker.connect_timeout_ms must stay within two ticks"));
        }
        let il = &self.illumination;
        if il.on_hour > 23 || il.off_hour > 23 {
            return Err(ConfigError::ValidationFailed("illumination hours must be 0..=23"));
        }
        if il.utc_offset_secs.abs() > 14 * 3600 {
            return Err(ConfigError::ValidationFailed("illumination.utc_offset_secs out of range"));
        }
        if self.climate.interval_secs == 0 {
            return Err(ConfigError::ValidationFailed("climate.interval_secs must be > 0"));
        }
        if !(0.0..=100.0).contains(&self.climate.alert_humidity_pct) {
            return Err(ConfigError::ValidationFailed("climate.alert_humidity_pct must be 0..=100"));
        }
        if self.moisture.wet_threshold > 4095 {
            return Err(ConfigError::ValidationFailed("moisture.wet_threshold exceeds 12-bit ADC range"));
        }
        if self.gas.debounce_count == 0 {
            return Err(ConfigError::ValidationFailed("gas.debounce_count must be >= 1"));
        }
        if self.access.deny_flash_count == 0 {
            return Err(ConfigError::ValidationFailed("access.deny_flash_count must be >= 1"));
        }
        if self.access.mode == AuthMode::Local && self.access.allow_list.is_empty() {
            return Err(ConfigError::ValidationFailed("access.allow_list is empty in local mode"));
        }
        Ok(())
    }
}

fn heapless_str<const N: usize>(s: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    let _ = out.push_str(s);
    out
}

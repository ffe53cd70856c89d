//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements          | Connects to                 |
//! |------------|---------------------|-----------------------------|
//! | `hardware` | SensorPort          | ESP32 GPIO, ADC, DHT, RFID  |
//! |            | ActuatorPort        | GPIO, LEDC servos, RMT strip|
//! |            | DisplayPort         | LCD1602 over I2C            |
//! | `console`  | (stop flag)         | Ctrl-C on the serial console|
//! | `log_sink` | EventSink           | Serial log output           |
//! | `time`     | ClockPort           | esp_timer + SNTP wall clock |
//! | `wifi`     | ConnectivityPort    | ESP-IDF WiFi STA            |

pub mod console;
pub mod hardware;
pub mod log_sink;
pub mod time;
pub mod wifi;

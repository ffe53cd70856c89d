//! GPIO / peripheral pin assignments for the smart house board (ESP32).
//!
//! Every driver references this module rather than hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Digital outputs
// ---------------------------------------------------------------------------

/// Porch / night LED (active HIGH).
pub const LED_GPIO: i32 = 12;
/// Piezo buzzer (active HIGH).
pub const BUZZER_GPIO: i32 = 25;
/// Fan motor driver input A. Forward = A high, B low.
pub const FAN_A_GPIO: i32 = 19;
/// Fan motor driver input B.
pub const FAN_B_GPIO: i32 = 18;

// ---------------------------------------------------------------------------
// Servos (LEDC, 50 Hz)
// ---------------------------------------------------------------------------

pub const WINDOW_SERVO_GPIO: i32 = 5;
pub const DOOR_SERVO_GPIO: i32 = 13;

// ---------------------------------------------------------------------------
// RGB strip (WS2812 via RMT)
// ---------------------------------------------------------------------------

pub const RGB_STRIP_GPIO: i32 = 26;
/// Number of pixels on the strip; every pixel shows the same colour.
pub const RGB_STRIP_LEN: usize = 4;

// ---------------------------------------------------------------------------
// Sensors
// ---------------------------------------------------------------------------

/// DHT11 single-wire data line.
pub const DHT_GPIO: i32 = 17;
/// Water / steam sensor: analog, ADC1 channel 6 (GPIO 34).
pub const WATER_ADC_GPIO: i32 = 34;
/// MQ-2 gas module digital output (active LOW).
pub const GAS_GPIO: i32 = 23;
/// PIR motion sensor (active HIGH).
pub const PIR_GPIO: i32 = 14;

// ---------------------------------------------------------------------------
// I²C bus (LCD1602 backpack)
// ---------------------------------------------------------------------------

pub const I2C_SDA_GPIO: i32 = 21;
pub const I2C_SCL_GPIO: i32 = 22;
/// PCF8574 backpack addresses probed in order.
pub const LCD_I2C_ADDRS: [u8; 2] = [0x27, 0x3F];
/// MFRC522 card reader, shares the LCD bus.
pub const RFID_I2C_ADDR: u8 = 0x28;
pub const I2C_FREQ_HZ: u32 = 100_000;

// ---------------------------------------------------------------------------
// PWM configuration
// ---------------------------------------------------------------------------

/// LEDC timer resolution for servos (bits). 10-bit gives 0 – 1023 duty.
pub const SERVO_PWM_RESOLUTION_BITS: u32 = 10;
/// Hobby servo frame rate.
pub const SERVO_PWM_FREQ_HZ: u32 = 50;

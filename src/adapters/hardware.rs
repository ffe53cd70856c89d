//! Hardware adapter: bridges real peripherals to domain port traits.
//!
//! Owns every sensor and actuator driver plus the shared I2C bus (LCD and
//! card reader), exposing them through [`SensorPort`], [`ActuatorPort`]
//! and [`DisplayPort`]. This is the only module in the system that touches
//! actual hardware. On non-espidf targets the drivers use cfg-gated
//! simulation stubs.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::{info, warn};

use crate::app::ports::{
    ActuatorPort, ActuatorStates, CardId, ClimateReading, DisplayPort, Position, Rgb, SensorPort,
};
use crate::drivers::hw_init::{ADC1_CH_WATER, LEDC_CH_DOOR, LEDC_CH_WINDOW};
use crate::drivers::{Fan, Lcd1602, RgbStrip, Servo, Switch};
use crate::error::{ActuatorError, SensorError};
use crate::pins;
use crate::sensors::digital::Polarity;
use crate::sensors::{Dht11, DigitalSensor, Mfrc522, WaterSensor};

/// Input side of the board.
pub struct Sensors {
    pub pir: DigitalSensor,
    pub gas: DigitalSensor,
    pub water: WaterSensor,
    pub dht: Dht11,
    pub rfid: Mfrc522,
}

impl Sensors {
    /// Wired per the board pin map.
    pub fn from_pins() -> Self {
        Self {
            pir: DigitalSensor::new(pins::PIR_GPIO, Polarity::ActiveHigh),
            gas: DigitalSensor::new(pins::GAS_GPIO, Polarity::ActiveLow),
            water: WaterSensor::new(ADC1_CH_WATER),
            dht: Dht11::new(pins::DHT_GPIO),
            rfid: Mfrc522::new(pins::RFID_I2C_ADDR),
        }
    }
}

/// Output side of the board.
pub struct Actuators {
    pub led: Switch,
    pub buzzer: Switch,
    pub fan: Fan,
    pub door: Servo,
    pub window: Servo,
    pub strip: RgbStrip,
}

impl Actuators {
    /// Wired per the board pin map; the strip's RMT channel is owned by
    /// the caller. Both servos are driven to Closed so the reported and
    /// physical positions agree from boot.
    pub fn from_pins(strip: RgbStrip) -> Self {
        let mut door = Servo::new(LEDC_CH_DOOR);
        let mut window = Servo::new(LEDC_CH_WINDOW);
        for (name, servo) in [("door", &mut door), ("window", &mut window)] {
            if let Err(e) = servo.set(Position::Closed) {
                warn!("Hardware: initial {} close failed: {}", name, e);
            }
        }
        Self {
            led: Switch::new(pins::LED_GPIO),
            buzzer: Switch::new(pins::BUZZER_GPIO),
            fan: Fan::new(pins::FAN_A_GPIO, pins::FAN_B_GPIO),
            door,
            window,
            strip,
        }
    }
}

/// Concrete adapter that combines all hardware behind port traits.
pub struct HardwareAdapter<I: I2c, D: DelayNs> {
    sensors: Sensors,
    actuators: Actuators,
    lcd: Lcd1602,
    bus: I,
    delay: D,
}

impl<I: I2c, D: DelayNs> HardwareAdapter<I, D> {
    /// Probes the LCD and brings up the card reader. Neither is required:
    /// a missing LCD disables the display port, a missing reader keeps
    /// reporting "no observation".
    pub fn new(sensors: Sensors, actuators: Actuators, mut bus: I, mut delay: D) -> Self {
        let mut lcd = Lcd1602::new();
        lcd.probe(&mut bus, &mut delay, &pins::LCD_I2C_ADDRS);

        let mut sensors = sensors;
        match sensors.rfid.init(&mut bus) {
            Ok(()) => info!("RFID: reader ready at 0x{:02X}", pins::RFID_I2C_ADDR),
            Err(e) => warn!("RFID: init failed ({}), will retry on scan", e),
        }

        Self {
            sensors,
            actuators,
            lcd,
            bus,
            delay,
        }
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl<I: I2c, D: DelayNs> SensorPort for HardwareAdapter<I, D> {
    fn motion(&mut self) -> Result<bool, SensorError> {
        self.sensors.pir.detected()
    }

    fn moisture_level(&mut self) -> Result<u16, SensorError> {
        self.sensors.water.level()
    }

    fn gas(&mut self) -> Result<bool, SensorError> {
        self.sensors.gas.detected()
    }

    fn climate(&mut self) -> Result<ClimateReading, SensorError> {
        self.sensors.dht.read()
    }

    fn scan_card(&mut self) -> Result<Option<CardId>, SensorError> {
        self.sensors.rfid.scan(&mut self.bus)
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl<I: I2c, D: DelayNs> ActuatorPort for HardwareAdapter<I, D> {
    fn set_led(&mut self, on: bool) -> Result<(), ActuatorError> {
        self.actuators.led.set(on)
    }

    fn set_fan(&mut self, on: bool) -> Result<(), ActuatorError> {
        self.actuators.fan.set(on)
    }

    fn set_buzzer(&mut self, on: bool) -> Result<(), ActuatorError> {
        self.actuators.buzzer.set(on)
    }

    fn set_door(&mut self, position: Position) -> Result<(), ActuatorError> {
        self.actuators.door.set(position)
    }

    fn set_window(&mut self, position: Position) -> Result<(), ActuatorError> {
        self.actuators.window.set(position)
    }

    fn set_rgb(&mut self, colour: Rgb) -> Result<(), ActuatorError> {
        self.actuators.strip.set(colour)
    }

    fn actuator_states(&self) -> ActuatorStates {
        ActuatorStates {
            led: self.actuators.led.is_on(),
            fan: self.actuators.fan.is_on(),
            buzzer: self.actuators.buzzer.is_on(),
            door: self.actuators.door.position(),
            window: self.actuators.window.position(),
            rgb: self.actuators.strip.current(),
        }
    }
}

// ── DisplayPort implementation ────────────────────────────────

impl<I: I2c, D: DelayNs> DisplayPort for HardwareAdapter<I, D> {
    fn is_available(&self) -> bool {
        self.lcd.is_present()
    }

    fn show_two_lines(&mut self, line1: &str, line2: &str) -> Result<(), ActuatorError> {
        self.lcd.show_two_lines(&mut self.bus, &mut self.delay, line1, line2)
    }

    fn clear(&mut self) -> Result<(), ActuatorError> {
        self.lcd.clear(&mut self.bus, &mut self.delay)
    }
}

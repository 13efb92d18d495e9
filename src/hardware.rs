//! Board capability interface consumed by the protocol core.
//!
//! The core never touches peripherals directly.  The firmware binary
//! implements [`Hardware`] for the real board and tests implement it with
//! a recorder.  Only one owner exists per process; tasks share it through
//! [`SharedHardware`], which serialises access.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;

use crate::protocol::ButtonId;

/// Hardware shared between the scheduled tasks.
pub type SharedHardware<H> = Mutex<CriticalSectionRawMutex, H>;

/// Digital inputs watched for edges.  Discriminants index fixed-size
/// per-pin state arrays.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputPin {
    /// Right button, wire pin 17.
    Pin17 = 0,
    /// Left button, wire pin 18.
    Pin18 = 1,
}

impl InputPin {
    pub const COUNT: usize = 2;
    pub const ALL: [InputPin; Self::COUNT] = [InputPin::Pin17, InputPin::Pin18];

    /// Pin number as carried in PIN_EVENT frames and the state bitfield.
    pub const fn wire_index(self) -> u8 {
        match self {
            InputPin::Pin17 => 17,
            InputPin::Pin18 => 18,
        }
    }

    /// Logical button wired to this pin.
    pub const fn button(self) -> ButtonId {
        match self {
            InputPin::Pin17 => ButtonId::B,
            InputPin::Pin18 => ButtonId::A,
        }
    }

    pub const fn slot(self) -> usize {
        self as usize
    }
}

/// Output addressed by a wire pin number in DIGITAL_OUT / PWM_OUT.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OutputPin {
    /// The on-board LED, wire pin 15.  On/off only.
    UserLed,
    /// PWM channel index into [`crate::config::PWM_PINS`].
    Pwm(usize),
}

impl OutputPin {
    pub fn from_wire(pin: u8) -> Option<OutputPin> {
        if pin == crate::config::USER_LED_PIN {
            return Some(OutputPin::UserLed);
        }
        crate::config::PWM_PINS
            .iter()
            .position(|&p| p == pin)
            .map(OutputPin::Pwm)
    }
}

/// PWM duty for a digital write: fully off or fully on.
pub fn digital_duty(value: u8) -> u16 {
    if value != 0 {
        crate::config::PWM_DUTY_MAX
    } else {
        0
    }
}

/// Capability set the core needs from the board.
///
/// Methods must not block for long: they run inside cooperative tasks.
/// Absent peripherals turn the matching call into a no-op (or a zero
/// reading) rather than an error.
pub trait Hardware {
    /// Raw logic level of a monitored input.
    fn read_pin(&mut self, pin: InputPin) -> bool;

    /// Whether the button on `pin` is currently pressed.
    fn read_button(&mut self, pin: InputPin) -> bool {
        self.read_pin(pin) == crate::config::BUTTON_ACTIVE_HIGH
    }

    /// Ambient light, 0-100 %.
    fn read_light_level(&mut self) -> f32;

    /// Temperature (°C) and relative humidity (%).  `(0.0, 0.0)` when the
    /// sensor is missing.
    fn read_temp_humidity(&mut self) -> (f32, f32);

    /// Passive-infrared motion sensor.
    fn read_pir(&mut self) -> bool;

    /// Show `text` on the display's top line; `interval` is the scroll step.
    fn show_text(&mut self, text: &str, interval: u8);

    fn digital_out(&mut self, pin: u8, value: u8);

    /// PWM output, duty on a 0-1024 scale.
    fn analog_out(&mut self, pin: u8, duty: u16);

    fn play_tone(&mut self, frequency_hz: u32, volume_pct: u8);

    fn stop_tone(&mut self);

    /// Set pixel `index`; `r`, `g`, `b` are percentages (0-100).
    fn set_pixel(&mut self, index: u8, r: u8, g: u8, b: u8);

    /// Draw a 5-wide cell bitmap with its top-left corner at (`x`, `y`).
    fn draw_icon(&mut self, bitmap: &[u8], x: u8, y: u8);

    /// Link status line.  Boards without a separate status area reuse the
    /// text line.
    fn show_status(&mut self, text: &str) {
        self.show_text(text, 0);
    }
}

/// Translate a 0-100 % channel to the 0-255 LED drive range.
pub fn percent_to_channel(pct: u8) -> u8 {
    (pct.min(100) as u32 * 255 / 100) as u8
}

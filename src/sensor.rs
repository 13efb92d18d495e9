//! Point-in-time sensor reading and its state-frame encoding.
//!
//! Bitfield layout (protocol revision 0):
//! ```text
//! bit 17      wire pin 17 level
//! bit 18      wire pin 18 level
//! bit 24+3    button A pressed
//! bit 24+4    button B pressed
//! bit 24+5    PIR motion
//! ```

use crate::hardware::{Hardware, InputPin};
use crate::protocol::frame::{encode_state, STATE_FRAME_LEN};

const BUTTON_STATE_BASE: u32 = 24;
const BUTTON_A_BIT: u32 = BUTTON_STATE_BASE + 3;
const BUTTON_B_BIT: u32 = BUTTON_STATE_BASE + 4;
const PIR_BIT: u32 = BUTTON_STATE_BASE + 5;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorSnapshot {
    /// Level of each monitored input, indexed by [`InputPin::slot`].
    pub pins: [bool; InputPin::COUNT],
    pub button_a: bool,
    pub button_b: bool,
    pub pir: bool,
    /// 0-100 %.
    pub light_pct: f32,
    pub temperature_c: f32,
    /// 0-100 %.
    pub humidity_pct: f32,
}

impl SensorSnapshot {
    /// Read every input the state frame reports.
    pub fn capture<H: Hardware>(hw: &mut H) -> Self {
        let mut pins = [false; InputPin::COUNT];
        for pin in InputPin::ALL {
            pins[pin.slot()] = hw.read_pin(pin);
        }
        let (temperature_c, humidity_pct) = hw.read_temp_humidity();
        Self {
            pins,
            button_a: hw.read_button(InputPin::Pin18),
            button_b: hw.read_button(InputPin::Pin17),
            pir: hw.read_pir(),
            light_pct: hw.read_light_level(),
            temperature_c,
            humidity_pct,
        }
    }

    pub fn bits(&self) -> u32 {
        let mut bits = 0u32;
        for pin in InputPin::ALL {
            if self.pins[pin.slot()] {
                bits |= 1 << pin.wire_index();
            }
        }
        bits |= (self.button_a as u32) << BUTTON_A_BIT;
        bits |= (self.button_b as u32) << BUTTON_B_BIT;
        bits |= (self.pir as u32) << PIR_BIT;
        bits
    }

    pub fn light_byte(&self) -> u8 {
        clamp_byte(self.light_pct / 100.0 * 255.0)
    }

    /// Offset-encoded: byte = °C + 128.
    pub fn temperature_byte(&self) -> u8 {
        clamp_byte(self.temperature_c + 128.0)
    }

    pub fn humidity_byte(&self) -> u8 {
        clamp_byte(self.humidity_pct / 100.0 * 255.0)
    }

    pub fn to_frame(&self) -> [u8; STATE_FRAME_LEN] {
        encode_state(
            self.bits(),
            self.light_byte(),
            self.temperature_byte(),
            self.humidity_byte(),
        )
    }
}

/// Truncate toward zero, then clamp into 0-255.  NaN maps to 0.
fn clamp_byte(value: f32) -> u8 {
    (value as i32).clamp(0, 255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::StateFrame;

    #[test]
    fn bits_pack_pins_buttons_and_pir() {
        let snap = SensorSnapshot {
            pins: [true, false],
            button_a: true,
            button_b: false,
            pir: true,
            ..Default::default()
        };
        assert_eq!(snap.bits(), (1 << 17) | (1 << 27) | (1 << 29));

        let snap = SensorSnapshot {
            pins: [false, true],
            button_b: true,
            ..Default::default()
        };
        assert_eq!(snap.bits(), (1 << 18) | (1 << 28));
    }

    #[test]
    fn byte_fields_are_scaled_and_clamped() {
        let snap = SensorSnapshot {
            light_pct: 50.0,
            temperature_c: 23.7,
            humidity_pct: 40.0,
            ..Default::default()
        };
        assert_eq!(snap.light_byte(), 127);
        assert_eq!(snap.temperature_byte(), 151);
        assert_eq!(snap.humidity_byte(), 102);

        let extreme = SensorSnapshot {
            light_pct: 180.0,
            temperature_c: -200.0,
            humidity_pct: f32::NAN,
            ..Default::default()
        };
        assert_eq!(extreme.light_byte(), 255);
        assert_eq!(extreme.temperature_byte(), 0);
        assert_eq!(extreme.humidity_byte(), 0);

        let hot = SensorSnapshot {
            temperature_c: 130.0,
            ..Default::default()
        };
        assert_eq!(hot.temperature_byte(), 255);
    }

    #[test]
    fn frame_round_trips_through_decoder() {
        let snap = SensorSnapshot {
            pins: [true, true],
            button_a: true,
            button_b: true,
            pir: false,
            light_pct: 100.0,
            temperature_c: 0.0,
            humidity_pct: 100.0,
        };
        let frame = StateFrame::decode(&snap.to_frame()).unwrap();
        assert_eq!(frame.bits, snap.bits());
        assert_eq!(frame.light, 255);
        assert_eq!(frame.temperature, 128);
        assert_eq!(frame.humidity, 255);
    }
}

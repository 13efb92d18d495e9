//! Outbound binary frames: state snapshot, discrete events, hello.
//!
//! State frame (7 bytes):
//! ```text
//! Byte 0-3: GPIO / button / PIR bitfield (u32, little-endian)
//! Byte 4:   Light level      (0-255)
//! Byte 5:   Temperature + 128 (0-255)
//! Byte 6:   Humidity scaled  (0-255)
//! ```
//!
//! Event frame (20 bytes, byte 19 = data format tag):
//! ```text
//! ACTION_EVENT: [0] class  [1-2] button id (u16 LE)  [3] event id  [4-7] timestamp (u32 LE)
//! PIN_EVENT:    [0] pin    [1]   event id            [2-5] timestamp (u32 LE)
//! ```
//! Unused bytes are zero.

use super::{ActionKind, ButtonEventId, ButtonId, DataFormat, PinEventId};
use crate::config;

/// State frame size in bytes.
pub const STATE_FRAME_LEN: usize = 7;

/// Event frame size in bytes.
pub const EVENT_FRAME_LEN: usize = 20;

/// Legacy motion frame: nine zero u16 values.
pub const MOTION_FRAME_LEN: usize = 18;

/// Capability frame written to the command characteristic on connect.
pub const HELLO_FRAME_LEN: usize = 3;

const TAG_INDEX: usize = EVENT_FRAME_LEN - 1;

/// Pack a state frame.  Callers clamp the byte fields beforehand.
pub fn encode_state(bits: u32, light: u8, temperature: u8, humidity: u8) -> [u8; STATE_FRAME_LEN] {
    let mut buf = [0u8; STATE_FRAME_LEN];
    buf[0..4].copy_from_slice(&bits.to_le_bytes());
    buf[4] = light;
    buf[5] = temperature;
    buf[6] = humidity;
    buf
}

/// Pack an ACTION_EVENT frame.
pub fn encode_action_event(
    action: ActionKind,
    button_id: u16,
    event_id: u8,
    timestamp: u32,
) -> [u8; EVENT_FRAME_LEN] {
    let mut buf = [0u8; EVENT_FRAME_LEN];
    buf[0] = action as u8;
    buf[1..3].copy_from_slice(&button_id.to_le_bytes());
    buf[3] = event_id;
    buf[4..8].copy_from_slice(&timestamp.to_le_bytes());
    buf[TAG_INDEX] = DataFormat::ActionEvent as u8;
    buf
}

/// Pack a PIN_EVENT frame.
pub fn encode_pin_event(pin_index: u8, event: PinEventId, timestamp: u32) -> [u8; EVENT_FRAME_LEN] {
    let mut buf = [0u8; EVENT_FRAME_LEN];
    buf[0] = pin_index;
    buf[1] = event as u8;
    buf[2..6].copy_from_slice(&timestamp.to_le_bytes());
    buf[TAG_INDEX] = DataFormat::PinEvent as u8;
    buf
}

/// The capability frame announced after every accepted connection.
pub const fn hello_frame() -> [u8; HELLO_FRAME_LEN] {
    [config::HELLO_HARDWARE, config::HELLO_PROTOCOL, config::HELLO_ROUTE]
}

/// Decoded view of a state frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StateFrame {
    pub bits: u32,
    pub light: u8,
    pub temperature: u8,
    pub humidity: u8,
}

impl StateFrame {
    pub fn encode(&self) -> [u8; STATE_FRAME_LEN] {
        encode_state(self.bits, self.light, self.temperature, self.humidity)
    }

    /// Parse a state frame; `None` if fewer than 7 bytes are given.
    pub fn decode(data: &[u8]) -> Option<Self> {
        if data.len() < STATE_FRAME_LEN {
            return None;
        }
        Some(Self {
            bits: u32::from_le_bytes([data[0], data[1], data[2], data[3]]),
            light: data[4],
            temperature: data[5],
            humidity: data[6],
        })
    }
}

/// A discrete event waiting to be pushed to the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EventFrame {
    Button {
        button: ButtonId,
        event: ButtonEventId,
        timestamp: u32,
    },
    Pin {
        pin: u8,
        event: PinEventId,
        timestamp: u32,
    },
}

impl EventFrame {
    pub fn encode(&self) -> [u8; EVENT_FRAME_LEN] {
        match *self {
            EventFrame::Button {
                button,
                event,
                timestamp,
            } => encode_action_event(ActionKind::Button, button as u16, event as u8, timestamp),
            EventFrame::Pin {
                pin,
                event,
                timestamp,
            } => encode_pin_event(pin, event, timestamp),
        }
    }

    pub fn format(&self) -> DataFormat {
        match self {
            EventFrame::Button { .. } => DataFormat::ActionEvent,
            EventFrame::Pin { .. } => DataFormat::PinEvent,
        }
    }
}

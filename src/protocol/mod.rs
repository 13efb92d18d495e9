//! Wire protocol shared with the host extension.
//!
//! Two directions:
//!
//! - **Outbound** ([`frame`]) - fixed-length state (7 bytes) and event
//!   (20 bytes) records pushed to the host.
//! - **Inbound** ([`command`]) - variable-length command frames written
//!   by the host to the command characteristic.
//!
//! Numeric identifiers below are fixed for wire compatibility.

pub mod command;
pub mod frame;

pub use command::{decode_command, CommandFrame, CommandId};
pub use frame::{
    encode_action_event, encode_pin_event, encode_state, EventFrame, StateFrame,
    EVENT_FRAME_LEN, HELLO_FRAME_LEN, MOTION_FRAME_LEN, STATE_FRAME_LEN,
};

/// Discriminator stored in byte 19 of every event frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum DataFormat {
    /// Reserved, not sent by this firmware revision.
    Config = 0x10,
    PinEvent = 0x11,
    ActionEvent = 0x12,
    DataNumber = 0x13,
    DataText = 0x14,
}

/// Class of an action event (byte 0 of an ACTION_EVENT frame).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ActionKind {
    Button = 0x01,
    Gesture = 0x02,
}

/// Event id of a PIN_EVENT frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum PinEventId {
    Rise = 2,
    Fall = 3,
    PulseHigh = 4,
    PulseLow = 5,
}

/// Logical button ids as understood by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum ButtonId {
    A = 1,
    B = 2,
    P0 = 100,
    P1 = 101,
    P2 = 102,
    Logo = 121,
}

/// Button event ids carried in byte 3 of an ACTION_EVENT frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ButtonEventId {
    Down = 1,
    Up = 2,
    Click = 3,
    LongClick = 4,
    Hold = 5,
    DoubleClick = 6,
}

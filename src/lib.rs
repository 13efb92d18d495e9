//! Protocol core for the Pcratch IoT board.
//!
//! Everything here is board-agnostic and runs on the host: the wire
//! codec, edge detection, command dispatch, the GATT link state machine
//! and the cooperative task set.  The firmware binary (`main.rs`, built
//! with the `embedded` feature) binds it to the SoftDevice and the board
//! peripherals.
//!
//! Usage: `cargo test`
//!
//! On-target logging goes through `defmt` when the `defmt` feature is on;
//! on the host the log macros compile away.

#![cfg_attr(not(test), no_std)]

// Must come first so the log macros are visible to every module below.
mod fmt;

pub mod ble;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod hardware;
pub mod input;
pub mod protocol;
pub mod scheduler;
pub mod sensor;

pub use ble::{GattLinkManager, GattTransport};
pub use dispatch::CommandDispatcher;
pub use error::{Error, LinkError};
pub use hardware::{Hardware, InputPin, SharedHardware};
pub use input::InputMonitor;
pub use scheduler::{Scheduler, ShutdownSignal};
pub use sensor::SensorSnapshot;

// ═══════════════════════════════════════════════════════════════════════════
// Unit Tests - cross-module wire behaviour
// ═══════════════════════════════════════════════════════════════════════════

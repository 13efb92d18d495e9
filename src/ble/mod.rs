//! Bluetooth Low Energy subsystem.
//!
//! The board runs in **Peripheral** role with a single vendor service:
//!
//! 1. **Transport** ([`GattTransport`]) - the seam to the BLE stack.  The
//!    firmware implements it on top of the SoftDevice GATT server; tests
//!    implement it in memory.
//! 2. **Link manager** ([`link::GattLinkManager`]) - registers the service,
//!    advertises, holds the single live connection and routes outbound
//!    frames to their characteristics.
//! 3. **Naming / advertising** ([`name`], [`adv_data`]) - device name
//!    derived from the MAC and the legacy advertising payloads.

pub mod adv_data;
pub mod link;
pub mod name;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use heapless::Vec;

use crate::config::{self, COMMAND_MAILBOX_DEPTH, COMMAND_MAX_LEN};
use crate::error::LinkError;

pub use adv_data::Advertisement;
pub use link::GattLinkManager;

/// One command as written by the host.
pub type CommandBuf = Vec<u8, COMMAND_MAX_LEN>;

/// Inbound command writes, in the order the host made them.
pub type CommandMailbox = Channel<CriticalSectionRawMutex, CommandBuf, COMMAND_MAILBOX_DEPTH>;

/// Characteristics of the IoT service.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CharacteristicId {
    Command,
    State,
    Motion,
    PinEvent,
    ActionEvent,
    AnalogIn0,
    AnalogIn1,
    AnalogIn2,
    Message,
}

/// GATT access properties of a characteristic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Properties {
    pub read: bool,
    pub write: bool,
    pub notify: bool,
}

impl CharacteristicId {
    pub const ALL: [CharacteristicId; 9] = [
        CharacteristicId::Command,
        CharacteristicId::State,
        CharacteristicId::Motion,
        CharacteristicId::PinEvent,
        CharacteristicId::ActionEvent,
        CharacteristicId::AnalogIn0,
        CharacteristicId::AnalogIn1,
        CharacteristicId::AnalogIn2,
        CharacteristicId::Message,
    ];

    pub const fn uuid(self) -> &'static str {
        match self {
            CharacteristicId::Command => config::COMMAND_CHAR_UUID,
            CharacteristicId::State => config::STATE_CHAR_UUID,
            CharacteristicId::Motion => config::MOTION_CHAR_UUID,
            CharacteristicId::PinEvent => config::PIN_EVENT_CHAR_UUID,
            CharacteristicId::ActionEvent => config::ACTION_EVENT_CHAR_UUID,
            CharacteristicId::AnalogIn0 => config::ANALOG_IN0_CHAR_UUID,
            CharacteristicId::AnalogIn1 => config::ANALOG_IN1_CHAR_UUID,
            CharacteristicId::AnalogIn2 => config::ANALOG_IN2_CHAR_UUID,
            CharacteristicId::Message => config::MESSAGE_CHAR_UUID,
        }
    }

    pub const fn properties(self) -> Properties {
        match self {
            CharacteristicId::Command => Properties {
                read: true,
                write: true,
                notify: true,
            },
            CharacteristicId::State | CharacteristicId::Motion => Properties {
                read: true,
                write: false,
                notify: false,
            },
            _ => Properties {
                read: true,
                write: false,
                notify: true,
            },
        }
    }
}

/// The BLE stack as seen by the link manager.
///
/// `advertise` and `serve` are the only suspension points; everything
/// else must return immediately.
#[allow(async_fn_in_trait)]
pub trait GattTransport {
    /// Handle of one live central connection.
    type Connection: Clone;

    /// Register the service table with the stack.
    fn register(&self) -> Result<(), LinkError>;

    /// Own public address, most significant byte first.
    fn address(&self) -> [u8; 6];

    /// Advertise until a central connects.
    async fn advertise(&self, adv: &Advertisement) -> Result<Self::Connection, LinkError>;

    fn peer_address(&self, conn: &Self::Connection) -> [u8; 6];

    /// Serve GATT requests on `conn` until it disconnects, forwarding every
    /// command write into `commands`.
    async fn serve(&self, conn: &Self::Connection, commands: &CommandMailbox);

    /// Set a characteristic's local value; with `send_update`, subscribed
    /// centrals are notified too.
    fn write(&self, id: CharacteristicId, value: &[u8], send_update: bool) -> Result<(), LinkError>;

    /// Notify `value` on `conn`.
    fn notify(&self, conn: &Self::Connection, id: CharacteristicId, value: &[u8]) -> Result<(), LinkError>;
}

/// Queue a command write without waiting; a full mailbox drops it.
pub fn forward_command(commands: &CommandMailbox, data: &[u8]) -> bool {
    let Ok(buf) = CommandBuf::from_slice(data) else {
        warn!("command of {} bytes exceeds buffer - dropped", data.len());
        return false;
    };
    if commands.try_send(buf).is_err() {
        warn!("command mailbox full - dropped");
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn characteristic_uuids_share_the_service_base() {
        for id in CharacteristicId::ALL {
            let uuid = id.uuid();
            assert_eq!(uuid.len(), 36);
            assert!(uuid.starts_with("0b5001"));
            assert!(uuid.ends_with("-607f-4151-9091-7d008d6ffc5c"));
        }
    }

    #[test]
    fn only_command_is_writable() {
        for id in CharacteristicId::ALL {
            assert_eq!(id.properties().write, id == CharacteristicId::Command);
            assert!(id.properties().read);
        }
        assert!(!CharacteristicId::State.properties().notify);
        assert!(CharacteristicId::PinEvent.properties().notify);
    }

    #[test]
    fn forward_command_keeps_order_and_drops_overflow() {
        let mailbox = CommandMailbox::new();
        for i in 0..COMMAND_MAILBOX_DEPTH as u8 {
            assert!(forward_command(&mailbox, &[96, i]));
        }
        assert!(!forward_command(&mailbox, &[96]));
        assert!(!forward_command(&CommandMailbox::new(), &[0u8; COMMAND_MAX_LEN + 1]));
        assert_eq!(mailbox.try_receive().unwrap().as_slice(), &[96, 0]);
        assert_eq!(mailbox.try_receive().unwrap().as_slice(), &[96, 1]);
    }
}

//! [`GattTransport`] on the Nordic S140 SoftDevice.
//!
//! The service table is declared with the `nrf_softdevice` GATT macros.
//! Registration needs exclusive access to the SoftDevice, so the
//! transport holds the `&'static mut` until `register` runs and keeps
//! only a shared reference afterwards.

use core::cell::{Cell, OnceCell, RefCell};

use defmt::{debug, info, unwrap, warn};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use heapless::Vec;
use nrf_softdevice::ble::gatt_server::{self, NotifyValueError, SetValueError};
use nrf_softdevice::ble::{peripheral, Connection};
use nrf_softdevice::{raw, Softdevice};
use pcratch_iot::ble::{forward_command, Advertisement, CharacteristicId, CommandMailbox, GattTransport};
use pcratch_iot::config::COMMAND_MAX_LEN;
use pcratch_iot::protocol::{EVENT_FRAME_LEN, MOTION_FRAME_LEN, STATE_FRAME_LEN};
use pcratch_iot::LinkError;

/// Analog-in and message characteristics carry at most one ATT payload.
const SHORT_VALUE_LEN: usize = 20;

#[nrf_softdevice::gatt_service(uuid = "0b50f3e4-607f-4151-9091-7d008d6ffc5c")]
pub struct IotService {
    #[characteristic(uuid = "0b500100-607f-4151-9091-7d008d6ffc5c", read, write, notify)]
    command: Vec<u8, COMMAND_MAX_LEN>,
    #[characteristic(uuid = "0b500101-607f-4151-9091-7d008d6ffc5c", read)]
    state: [u8; STATE_FRAME_LEN],
    #[characteristic(uuid = "0b500102-607f-4151-9091-7d008d6ffc5c", read)]
    motion: [u8; MOTION_FRAME_LEN],
    #[characteristic(uuid = "0b500110-607f-4151-9091-7d008d6ffc5c", read, notify)]
    pin_event: [u8; EVENT_FRAME_LEN],
    #[characteristic(uuid = "0b500111-607f-4151-9091-7d008d6ffc5c", read, notify)]
    action_event: [u8; EVENT_FRAME_LEN],
    #[characteristic(uuid = "0b500120-607f-4151-9091-7d008d6ffc5c", read, notify)]
    analog_in0: Vec<u8, SHORT_VALUE_LEN>,
    #[characteristic(uuid = "0b500121-607f-4151-9091-7d008d6ffc5c", read, notify)]
    analog_in1: Vec<u8, SHORT_VALUE_LEN>,
    #[characteristic(uuid = "0b500122-607f-4151-9091-7d008d6ffc5c", read, notify)]
    analog_in2: Vec<u8, SHORT_VALUE_LEN>,
    #[characteristic(uuid = "0b500130-607f-4151-9091-7d008d6ffc5c", read, notify)]
    message: Vec<u8, SHORT_VALUE_LEN>,
}

#[nrf_softdevice::gatt_server]
pub struct Server {
    iot: IotService,
}

/// SoftDevice configuration for one peripheral link.
pub fn softdevice_config() -> nrf_softdevice::Config {
    nrf_softdevice::Config {
        clock: Some(raw::nrf_clock_lf_cfg_t {
            source: raw::NRF_CLOCK_LF_SRC_RC as u8,
            rc_ctiv: 16,
            rc_temp_ctiv: 2,
            accuracy: raw::NRF_CLOCK_LF_ACCURACY_500_PPM as u8,
        }),
        conn_gap: Some(raw::ble_gap_conn_cfg_t {
            conn_count: 1,
            event_length: 24,
        }),
        conn_gatt: Some(raw::ble_gatt_conn_cfg_t { att_mtu: 256 }),
        gatts_attr_tab_size: Some(raw::ble_gatts_cfg_attr_tab_size_t {
            attr_tab_size: raw::BLE_GATTS_ATTR_TAB_SIZE_DEFAULT,
        }),
        gap_role_count: Some(raw::ble_gap_cfg_role_count_t {
            adv_set_count: 1,
            periph_role_count: 1,
            central_role_count: 0,
            central_sec_count: 0,
            _bitfield_1: raw::ble_gap_cfg_role_count_t::new_bitfield_1(0),
        }),
        ..Default::default()
    }
}

pub struct SoftdeviceTransport {
    pending: Cell<Option<&'static mut Softdevice>>,
    sd: OnceCell<&'static Softdevice>,
    server: OnceCell<Server>,
    address: [u8; 6],
    live: Mutex<CriticalSectionRawMutex, RefCell<Option<Connection>>>,
}

impl SoftdeviceTransport {
    pub fn new(sd: &'static mut Softdevice) -> Self {
        let mut address = nrf_softdevice::ble::get_address(sd).bytes();
        address.reverse();
        Self {
            pending: Cell::new(Some(sd)),
            sd: OnceCell::new(),
            server: OnceCell::new(),
            address,
            live: Mutex::new(RefCell::new(None)),
        }
    }

    /// Shared SoftDevice handle for the event loop.  Only available once
    /// the service table is registered.
    pub fn softdevice(&self) -> Option<&'static Softdevice> {
        self.sd.get().copied()
    }

    fn server(&self) -> Result<&Server, LinkError> {
        self.server.get().ok_or(LinkError::NotRegistered)
    }

    fn set(&self, id: CharacteristicId, value: &[u8]) -> Result<(), SetValueError> {
        let Ok(server) = self.server() else {
            return Err(SetValueError::Raw(nrf_softdevice::RawError::InvalidState));
        };
        let svc = &server.iot;
        match id {
            CharacteristicId::Command => svc.command_set(&Vec::from_slice(value).unwrap_or_default()),
            CharacteristicId::State => svc.state_set(&fixed(value)),
            CharacteristicId::Motion => svc.motion_set(&fixed(value)),
            CharacteristicId::PinEvent => svc.pin_event_set(&fixed(value)),
            CharacteristicId::ActionEvent => svc.action_event_set(&fixed(value)),
            CharacteristicId::AnalogIn0 => svc.analog_in0_set(&short(value)),
            CharacteristicId::AnalogIn1 => svc.analog_in1_set(&short(value)),
            CharacteristicId::AnalogIn2 => svc.analog_in2_set(&short(value)),
            CharacteristicId::Message => svc.message_set(&short(value)),
        }
    }

    fn send(&self, conn: &Connection, id: CharacteristicId, value: &[u8]) -> Result<(), NotifyValueError> {
        let Ok(server) = self.server() else {
            return Err(NotifyValueError::Raw(nrf_softdevice::RawError::InvalidState));
        };
        let svc = &server.iot;
        match id {
            CharacteristicId::Command => svc.command_notify(conn, &Vec::from_slice(value).unwrap_or_default()),
            CharacteristicId::PinEvent => svc.pin_event_notify(conn, &fixed(value)),
            CharacteristicId::ActionEvent => svc.action_event_notify(conn, &fixed(value)),
            CharacteristicId::AnalogIn0 => svc.analog_in0_notify(conn, &short(value)),
            CharacteristicId::AnalogIn1 => svc.analog_in1_notify(conn, &short(value)),
            CharacteristicId::AnalogIn2 => svc.analog_in2_notify(conn, &short(value)),
            CharacteristicId::Message => svc.message_notify(conn, &short(value)),
            // Read-only characteristics have no CCCD.
            CharacteristicId::State | CharacteristicId::Motion => Ok(()),
        }
    }
}

/// Copy into a fixed-size value, zero-padding or truncating.
fn fixed<const N: usize>(value: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    let n = value.len().min(N);
    out[..n].copy_from_slice(&value[..n]);
    out
}

fn short(value: &[u8]) -> Vec<u8, SHORT_VALUE_LEN> {
    let n = value.len().min(SHORT_VALUE_LEN);
    Vec::from_slice(&value[..n]).unwrap_or_default()
}

impl GattTransport for SoftdeviceTransport {
    type Connection = Connection;

    fn register(&self) -> Result<(), LinkError> {
        let Some(sd) = self.pending.take() else {
            return if self.server.get().is_some() {
                Ok(())
            } else {
                Err(LinkError::NotRegistered)
            };
        };
        match Server::new(sd) {
            Ok(server) => {
                let _ = self.server.set(server);
                let _ = self.sd.set(sd);
                Ok(())
            }
            Err(e) => {
                warn!("GATT registration failed: {:?}", e);
                let _ = self.sd.set(sd);
                Err(LinkError::NotRegistered)
            }
        }
    }

    fn address(&self) -> [u8; 6] {
        self.address
    }

    async fn advertise(&self, adv: &Advertisement) -> Result<Connection, LinkError> {
        let sd = self.softdevice().ok_or(LinkError::NotRegistered)?;
        let config = peripheral::Config {
            interval: adv.interval,
            ..Default::default()
        };
        let payload = peripheral::ConnectableAdvertisement::ScannableUndirected {
            adv_data: adv.adv_data.as_slice(),
            scan_data: adv.scan_data.as_slice(),
        };
        let conn = peripheral::advertise_connectable(sd, payload, &config)
            .await
            .map_err(|e| {
                warn!("advertise failed: {:?}", e);
                LinkError::AdvertiseFailed
            })?;
        self.live.lock(|live| *live.borrow_mut() = Some(conn.clone()));
        Ok(conn)
    }

    fn peer_address(&self, conn: &Connection) -> [u8; 6] {
        let mut peer = conn.peer_address().bytes();
        peer.reverse();
        peer
    }

    async fn serve(&self, conn: &Connection, commands: &CommandMailbox) {
        if let Ok(server) = self.server() {
            let reason = gatt_server::run(conn, server, |event| match event {
                ServerEvent::Iot(IotServiceEvent::CommandWrite(data)) => {
                    forward_command(commands, &data);
                }
                ServerEvent::Iot(IotServiceEvent::PinEventCccdWrite { notifications }) => {
                    debug!("pin event notifications: {}", notifications);
                }
                ServerEvent::Iot(IotServiceEvent::ActionEventCccdWrite { notifications }) => {
                    debug!("action event notifications: {}", notifications);
                }
                _ => {}
            })
            .await;
            info!("GATT server stopped: {:?}", reason);
        }
        self.live.lock(|live| live.borrow_mut().take());
    }

    fn write(&self, id: CharacteristicId, value: &[u8], send_update: bool) -> Result<(), LinkError> {
        self.set(id, value).map_err(|e| {
            warn!("set {} failed: {:?}", id, e);
            match e {
                SetValueError::Raw(raw) => LinkError::Raw(raw as u32),
                _ => LinkError::WriteFailed,
            }
        })?;
        if !send_update {
            return Ok(());
        }
        if let Some(conn) = self.live.lock(|live| live.borrow().clone()) {
            // Not subscribed is the common case; the value is already set.
            let _ = self.send(&conn, id, value);
        }
        Ok(())
    }

    fn notify(&self, conn: &Connection, id: CharacteristicId, value: &[u8]) -> Result<(), LinkError> {
        self.send(conn, id, value).map_err(|e| {
            debug!("notify {} failed: {:?}", id, e);
            match e {
                NotifyValueError::Raw(raw) => LinkError::Raw(raw as u32),
                _ => LinkError::NotifyFailed,
            }
        })
    }
}

/// Drive the SoftDevice event loop.
pub async fn run(sd: &'static Softdevice) -> ! {
    sd.run().await
}

/// Register the service table or halt; nothing works without it.
pub fn must_register(link: &pcratch_iot::GattLinkManager<SoftdeviceTransport>) -> &'static Softdevice {
    unwrap!(link.start());
    unwrap!(link.transport().softdevice())
}

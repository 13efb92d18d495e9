//! In-memory doubles for the BLE stack and the board.
#![allow(dead_code)]

use std::cell::RefCell;

use embassy_futures::select::{select, Either};
use embassy_futures::yield_now;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use pcratch_iot::ble::{forward_command, Advertisement, CharacteristicId, CommandBuf, CommandMailbox, GattTransport};
use pcratch_iot::{Hardware, InputPin, LinkError, SharedHardware};

pub const TEST_MAC: [u8; 6] = [0x24, 0x0a, 0xc4, 0x12, 0x34, 0x56];

/// Let every ready future run until nothing is left to do.
pub async fn settle() {
    for _ in 0..32 {
        yield_now().await;
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Fake GATT transport
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq)]
pub struct Write {
    pub id: CharacteristicId,
    pub value: Vec<u8>,
    pub send_update: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Notification {
    pub conn: u32,
    pub id: CharacteristicId,
    pub value: Vec<u8>,
}

#[derive(Default)]
struct Record {
    registrations: u32,
    advertise_calls: u32,
    live: u32,
    max_live: u32,
    failing_advertises: u32,
    write_error: Option<LinkError>,
    last_advertisement: Option<Advertisement>,
    writes: Vec<Write>,
    notifications: Vec<Notification>,
}

/// Scripted central: connect attempts queue up until the link manager
/// advertises; disconnects end the current `serve`.
pub struct FakeTransport {
    mac: [u8; 6],
    record: RefCell<Record>,
    connects: Channel<CriticalSectionRawMutex, u32, 4>,
    host_writes: Channel<CriticalSectionRawMutex, CommandBuf, 8>,
    disconnect: Signal<CriticalSectionRawMutex, ()>,
}

impl FakeTransport {
    pub fn new(mac: [u8; 6]) -> Self {
        Self {
            mac,
            record: RefCell::new(Record::default()),
            connects: Channel::new(),
            host_writes: Channel::new(),
            disconnect: Signal::new(),
        }
    }

    /// A central with id `peer` tries to connect.
    pub fn connect(&self, peer: u32) {
        self.connects
            .try_send(peer)
            .expect("too many pending connect attempts");
    }

    pub fn disconnect(&self) {
        self.disconnect.signal(());
    }

    /// The host writes `data` to the command characteristic.
    pub fn host_write(&self, data: &[u8]) {
        let buf = CommandBuf::from_slice(data).expect("command too long");
        self.host_writes.try_send(buf).expect("host write queue full");
    }

    /// The next `n` advertise calls fail.
    pub fn fail_next_advertises(&self, n: u32) {
        self.record.borrow_mut().failing_advertises = n;
    }

    /// Every later characteristic write fails with `err`.
    pub fn fail_writes_with(&self, err: LinkError) {
        self.record.borrow_mut().write_error = Some(err);
    }

    pub fn registrations(&self) -> u32 {
        self.record.borrow().registrations
    }

    pub fn advertise_calls(&self) -> u32 {
        self.record.borrow().advertise_calls
    }

    pub fn live_connections(&self) -> u32 {
        self.record.borrow().live
    }

    pub fn max_live_connections(&self) -> u32 {
        self.record.borrow().max_live
    }

    pub fn last_advertisement(&self) -> Option<Advertisement> {
        self.record.borrow().last_advertisement.clone()
    }

    pub fn writes(&self) -> Vec<Write> {
        self.record.borrow().writes.clone()
    }

    pub fn writes_to(&self, id: CharacteristicId) -> Vec<Write> {
        self.writes().into_iter().filter(|w| w.id == id).collect()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.record.borrow().notifications.clone()
    }
}

impl GattTransport for FakeTransport {
    type Connection = u32;

    fn register(&self) -> Result<(), LinkError> {
        self.record.borrow_mut().registrations += 1;
        Ok(())
    }

    fn address(&self) -> [u8; 6] {
        self.mac
    }

    async fn advertise(&self, adv: &Advertisement) -> Result<u32, LinkError> {
        {
            let mut record = self.record.borrow_mut();
            record.advertise_calls += 1;
            record.last_advertisement = Some(adv.clone());
            if record.failing_advertises > 0 {
                record.failing_advertises -= 1;
                return Err(LinkError::AdvertiseFailed);
            }
        }
        let peer = self.connects.receive().await;
        let mut record = self.record.borrow_mut();
        record.live += 1;
        record.max_live = record.max_live.max(record.live);
        Ok(peer)
    }

    fn peer_address(&self, conn: &u32) -> [u8; 6] {
        let b = conn.to_be_bytes();
        [0xc0, 0xde, b[0], b[1], b[2], b[3]]
    }

    async fn serve(&self, _conn: &u32, commands: &CommandMailbox) {
        loop {
            match select(self.disconnect.wait(), self.host_writes.receive()).await {
                Either::First(()) => break,
                Either::Second(data) => {
                    forward_command(commands, &data);
                    // One GATT event per poll, like the real stack.
                    yield_now().await;
                }
            }
        }
        self.record.borrow_mut().live -= 1;
    }

    fn write(&self, id: CharacteristicId, value: &[u8], send_update: bool) -> Result<(), LinkError> {
        if let Some(err) = self.record.borrow().write_error {
            return Err(err);
        }
        self.record.borrow_mut().writes.push(Write {
            id,
            value: value.to_vec(),
            send_update,
        });
        Ok(())
    }

    fn notify(&self, conn: &u32, id: CharacteristicId, value: &[u8]) -> Result<(), LinkError> {
        self.record.borrow_mut().notifications.push(Notification {
            conn: *conn,
            id,
            value: value.to_vec(),
        });
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Recording hardware
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq)]
pub enum HwCall {
    Text(String, u8),
    Status(String),
    Digital(u8, u8),
    Analog(u8, u16),
    Tone(u32, u8),
    StopTone,
    Pixel(u8, u8, u8, u8),
    Icon(Vec<u8>, u8, u8),
}

#[derive(Default)]
pub struct RecordingHardware {
    pub calls: Vec<HwCall>,
    pub levels: [bool; InputPin::COUNT],
    pub light_pct: f32,
    pub climate: (f32, f32),
    pub pir: bool,
}

impl RecordingHardware {
    /// Calls other than status line updates.
    pub fn command_calls(&self) -> Vec<HwCall> {
        self.calls
            .iter()
            .filter(|c| !matches!(c, HwCall::Status(_)))
            .cloned()
            .collect()
    }

    pub fn status_lines(&self) -> Vec<String> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                HwCall::Status(s) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }
}

impl Hardware for RecordingHardware {
    fn read_pin(&mut self, pin: InputPin) -> bool {
        self.levels[pin.slot()]
    }

    fn read_light_level(&mut self) -> f32 {
        self.light_pct
    }

    fn read_temp_humidity(&mut self) -> (f32, f32) {
        self.climate
    }

    fn read_pir(&mut self) -> bool {
        self.pir
    }

    fn show_text(&mut self, text: &str, interval: u8) {
        self.calls.push(HwCall::Text(text.to_string(), interval));
    }

    fn show_status(&mut self, text: &str) {
        self.calls.push(HwCall::Status(text.to_string()));
    }

    fn digital_out(&mut self, pin: u8, value: u8) {
        self.calls.push(HwCall::Digital(pin, value));
    }

    fn analog_out(&mut self, pin: u8, duty: u16) {
        self.calls.push(HwCall::Analog(pin, duty));
    }

    fn play_tone(&mut self, frequency_hz: u32, volume_pct: u8) {
        self.calls.push(HwCall::Tone(frequency_hz, volume_pct));
    }

    fn stop_tone(&mut self) {
        self.calls.push(HwCall::StopTone);
    }

    fn set_pixel(&mut self, index: u8, r: u8, g: u8, b: u8) {
        self.calls.push(HwCall::Pixel(index, r, g, b));
    }

    fn draw_icon(&mut self, bitmap: &[u8], x: u8, y: u8) {
        self.calls.push(HwCall::Icon(bitmap.to_vec(), x, y));
    }
}

/// Snapshot of the recorded calls without waiting on the lock.
pub fn recorded(hw: &SharedHardware<RecordingHardware>) -> Vec<HwCall> {
    hw.try_lock().map(|h| h.command_calls()).unwrap_or_default()
}

pub fn status_lines(hw: &SharedHardware<RecordingHardware>) -> Vec<String> {
    hw.try_lock().map(|h| h.status_lines()).unwrap_or_default()
}

//! Connection lifecycle for the IoT service.
//!
//! ```text
//!   ┌──────────── advertise ◄──────────────┐
//!   │                │ central connects     │
//!   │ error          ▼                      │
//!   │ (back-off)  store connection          │
//!   │                │ write hello frame    │
//!   └──►  retry      ▼                      │
//!              serve until disconnect ──────┘  clear connection
//! ```
//!
//! Advertising only restarts once the live connection is gone, so there is
//! never more than one connection.  The slot is read by other tasks, which
//! must tolerate it emptying between a check and a send.

use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_time::{Instant, Timer};
use heapless::String;

use super::adv_data::Advertisement;
use super::name::{device_name, DEVICE_NAME_CAP};
use super::{CharacteristicId, CommandBuf, CommandMailbox, GattTransport};
use crate::config::LINK_RETRY_BACKOFF_MS;
use crate::error::Error;
use crate::protocol::frame::{hello_frame, MOTION_FRAME_LEN};
use crate::protocol::{EventFrame, STATE_FRAME_LEN};

struct LiveConnection<C> {
    handle: C,
    peer: [u8; 6],
    since: Instant,
}

pub struct GattLinkManager<T: GattTransport> {
    transport: T,
    device_name: String<DEVICE_NAME_CAP>,
    registered: AtomicBool,
    connection: Mutex<CriticalSectionRawMutex, RefCell<Option<LiveConnection<T::Connection>>>>,
    commands: CommandMailbox,
    accepted: AtomicU32,
}

impl<T: GattTransport> GattLinkManager<T> {
    pub fn new(transport: T) -> Self {
        let device_name = device_name(&transport.address());
        Self {
            transport,
            device_name,
            registered: AtomicBool::new(false),
            connection: Mutex::new(RefCell::new(None)),
            commands: CommandMailbox::new(),
            accepted: AtomicU32::new(0),
        }
    }

    /// Register the service table.  Only the first successful call reaches
    /// the stack; later calls return `Ok` immediately.
    pub fn start(&self) -> Result<(), Error> {
        if self.registered.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        if let Err(e) = self.transport.register() {
            self.registered.store(false, Ordering::Release);
            error!("service registration failed: {}", e);
            return Err(e.into());
        }
        info!("IoT service registered");
        Ok(())
    }

    pub fn is_started(&self) -> bool {
        self.registered.load(Ordering::Acquire)
    }

    /// Advertise, serve one connection, repeat.  Failures back off and
    /// retry; this never returns.
    pub async fn advertise_and_serve(&self) -> ! {
        loop {
            if let Err(e) = self.serve_once().await {
                warn!("link error: {} - retrying in {} ms", e, LINK_RETRY_BACKOFF_MS);
                Timer::after_millis(LINK_RETRY_BACKOFF_MS).await;
            }
        }
    }

    /// One advertise / connect / disconnect cycle.
    pub async fn serve_once(&self) -> Result<(), Error> {
        self.start()?;
        let adv = Advertisement::for_device(&self.device_name)?;

        info!("advertising as {=str}", self.device_name.as_str());
        let conn = self.transport.advertise(&adv).await?;
        let peer = self.transport.peer_address(&conn);
        self.accepted.fetch_add(1, Ordering::AcqRel);
        info!("connected: {:02x}", peer);

        let attached = self.attach(conn.clone(), peer);
        if let Err(e) = self
            .transport
            .write(CharacteristicId::Command, &hello_frame(), false)
        {
            warn!("hello frame write failed: {}", e);
        }
        self.transport.serve(&conn, &self.commands).await;
        let held_ms = attached.elapsed_ms();
        drop(attached);
        info!("disconnected after {} ms", held_ms);
        Ok(())
    }

    fn attach(&self, handle: T::Connection, peer: [u8; 6]) -> Attached<'_, T> {
        self.connection.lock(|slot| {
            *slot.borrow_mut() = Some(LiveConnection {
                handle,
                peer,
                since: Instant::now(),
            });
        });
        Attached { link: self }
    }

    fn detach(&self) {
        self.connection.lock(|slot| {
            slot.borrow_mut().take();
        });
    }

    /// Handle of the live connection, if any.
    pub fn connection(&self) -> Option<T::Connection> {
        self.connection
            .lock(|slot| slot.borrow().as_ref().map(|c| c.handle.clone()))
    }

    pub fn peer_address(&self) -> Option<[u8; 6]> {
        self.connection
            .lock(|slot| slot.borrow().as_ref().map(|c| c.peer))
    }

    pub fn is_connected(&self) -> bool {
        self.connection.lock(|slot| slot.borrow().is_some())
    }

    /// Connections accepted since boot.
    pub fn accepted_count(&self) -> u32 {
        self.accepted.load(Ordering::Acquire)
    }

    /// Notify an event on its characteristic.  Without a connection this
    /// is a logged no-op.
    pub fn send_notification(&self, event: &EventFrame) -> Result<(), Error> {
        let id = match event {
            EventFrame::Pin { .. } => CharacteristicId::PinEvent,
            EventFrame::Button { .. } => CharacteristicId::ActionEvent,
        };
        match self.notify(id, &event.encode()) {
            Err(Error::NotConnected) => {
                debug!("no connection - {} not sent", event);
                Ok(())
            }
            other => other,
        }
    }

    /// Notify `value` on `id` over the live connection.
    pub fn notify(&self, id: CharacteristicId, value: &[u8]) -> Result<(), Error> {
        let conn = self.connection().ok_or(Error::NotConnected)?;
        self.transport.notify(&conn, id, value)?;
        Ok(())
    }

    /// Update the state characteristic and notify subscribers.  Works
    /// with or without a connection.
    pub fn write_state(&self, frame: &[u8; STATE_FRAME_LEN]) -> Result<(), Error> {
        self.transport
            .write(CharacteristicId::State, frame, true)
            .map_err(Error::from)
    }

    /// Refresh the legacy motion characteristic (all zeros).
    pub fn write_motion(&self) -> Result<(), Error> {
        self.transport
            .write(CharacteristicId::Motion, &[0u8; MOTION_FRAME_LEN], false)
            .map_err(Error::from)
    }

    /// Wait for the next command the host writes.
    pub async fn await_command(&self) -> CommandBuf {
        self.commands.receive().await
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

/// Clears the connection slot when the serving future ends or is dropped.
struct Attached<'a, T: GattTransport> {
    link: &'a GattLinkManager<T>,
}

impl<T: GattTransport> Attached<'_, T> {
    fn elapsed_ms(&self) -> u64 {
        self.link.connection.lock(|slot| {
            slot.borrow()
                .as_ref()
                .map(|c| c.since.elapsed().as_millis())
                .unwrap_or(0)
        })
    }
}

impl<T: GattTransport> Drop for Attached<'_, T> {
    fn drop(&mut self) {
        self.link.detach();
    }
}

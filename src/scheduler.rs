//! Cooperative task set.
//!
//! Every task is a method on [`Scheduler`] and runs on one executor; they
//! are joined into a single future so the whole set can be cancelled at
//! its next await point with [`Scheduler::run_until`].
//!
//! | task      | period / trigger          | action                                  |
//! |-----------|---------------------------|-----------------------------------------|
//! | link      | -                         | advertise, serve, repeat                |
//! | heartbeat | 1000 ms                   | zero motion frame                       |
//! | sensor    | 250 ms (connected only)   | snapshot -> state characteristic        |
//! | command   | host write                | mailbox -> dispatch queue               |
//! | dispatch  | dispatch queue            | decode + hardware call, in write order  |
//! | events    | edge queue                | notify pin / action characteristic      |
//! | status    | 1000 ms (on change)       | link status line                        |

use embassy_futures::join::{join, join3};
use embassy_futures::select::select;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Instant, Ticker};
use heapless::String;

use crate::ble::name::{connected_banner, DEVICE_NAME_CAP};
use crate::ble::{CommandBuf, GattLinkManager, GattTransport};
use crate::config::{
    DISPATCH_QUEUE_DEPTH, EDGE_RECONCILE_MS, HEARTBEAT_PERIOD_MS, SENSOR_PERIOD_MS,
    STATUS_PERIOD_MS,
};
use crate::dispatch::CommandDispatcher;
use crate::hardware::{Hardware, InputPin, SharedHardware};
use crate::input::{now_ms, InputMonitor};
use crate::sensor::SensorSnapshot;

/// Cancels [`Scheduler::run_until`].
pub type ShutdownSignal = Signal<CriticalSectionRawMutex, ()>;

type DispatchQueue = Channel<CriticalSectionRawMutex, CommandBuf, DISPATCH_QUEUE_DEPTH>;

pub struct Scheduler<'a, T: GattTransport, H: Hardware> {
    link: &'a GattLinkManager<T>,
    hardware: &'a SharedHardware<H>,
    inputs: &'a InputMonitor,
    dispatch_queue: DispatchQueue,
}

impl<'a, T: GattTransport, H: Hardware> Scheduler<'a, T, H> {
    pub fn new(
        link: &'a GattLinkManager<T>,
        hardware: &'a SharedHardware<H>,
        inputs: &'a InputMonitor,
    ) -> Self {
        Self {
            link,
            hardware,
            inputs,
            dispatch_queue: Channel::new(),
        }
    }

    /// Run every task forever.
    pub async fn run(&self) {
        join3(
            join3(self.link_task(), self.heartbeat_task(), self.sensor_task()),
            join(self.command_task(), self.dispatch_task()),
            join(self.event_task(), self.status_task()),
        )
        .await;
    }

    /// Run every task until `shutdown` is signalled.
    pub async fn run_until(&self, shutdown: &ShutdownSignal) {
        select(shutdown.wait(), self.run()).await;
        info!("scheduler stopped");
    }

    pub async fn link_task(&self) {
        self.link.advertise_and_serve().await
    }

    pub async fn heartbeat_task(&self) {
        let mut ticker = Ticker::every(Duration::from_millis(HEARTBEAT_PERIOD_MS));
        loop {
            if let Err(e) = self.link.write_motion() {
                warn!("motion write failed: {}", e);
            }
            ticker.next().await;
        }
    }

    pub async fn sensor_task(&self) {
        let mut ticker = Ticker::every(Duration::from_millis(SENSOR_PERIOD_MS));
        let reconcile_every = Duration::from_millis(EDGE_RECONCILE_MS);
        let mut last_reconcile = Instant::now();
        loop {
            ticker.next().await;

            if last_reconcile.elapsed() >= reconcile_every {
                last_reconcile = Instant::now();
                self.reconcile_edges().await;
            }

            if !self.link.is_connected() {
                continue;
            }
            let snapshot = {
                let mut hw = self.hardware.lock().await;
                SensorSnapshot::capture(&mut *hw)
            };
            if let Err(e) = self.link.write_state(&snapshot.to_frame()) {
                warn!("state write failed: {}", e);
            }
        }
    }

    /// Compare stored edges with polled levels and emit anything missed.
    pub async fn reconcile_edges(&self) {
        let mut levels = [false; InputPin::COUNT];
        {
            let mut hw = self.hardware.lock().await;
            for pin in InputPin::ALL {
                levels[pin.slot()] = hw.read_pin(pin);
            }
        }
        let now = now_ms();
        for pin in InputPin::ALL {
            self.inputs.reconcile(pin, levels[pin.slot()], now);
        }
    }

    pub async fn command_task(&self) {
        loop {
            let command = self.link.await_command().await;
            trace!("command received ({} bytes)", command.len());
            if self.dispatch_queue.try_send(command).is_err() {
                warn!("dispatch queue full - command dropped");
            }
        }
    }

    pub async fn dispatch_task(&self) {
        let dispatcher = CommandDispatcher::new(self.hardware);
        loop {
            let command = self.dispatch_queue.receive().await;
            // Failures are logged by the dispatcher; the next frame still runs.
            let _ = dispatcher.dispatch(&command).await;
        }
    }

    pub async fn event_task(&self) {
        loop {
            let event = self.inputs.next_event().await;
            if let Err(e) = self.link.send_notification(&event) {
                warn!("event notify failed: {}", e);
            }
        }
    }

    pub async fn status_task(&self) {
        let mut ticker = Ticker::every(Duration::from_millis(STATUS_PERIOD_MS));
        let mut shown: Option<bool> = None;
        loop {
            let connected = self.link.is_connected();
            if shown != Some(connected) {
                let line = self.status_line(connected);
                self.hardware.lock().await.show_status(&line);
                shown = Some(connected);
            }
            ticker.next().await;
        }
    }

    fn status_line(&self, connected: bool) -> String<DEVICE_NAME_CAP> {
        if connected {
            connected_banner(self.link.device_name())
        } else {
            let mut line = String::new();
            let _ = line.push_str(self.link.device_name());
            line
        }
    }
}

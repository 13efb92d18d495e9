//! Edge-event detection for the monitored digital inputs.
//!
//! Pin change handlers run outside the cooperative scheduler, so every
//! piece of state here is an atomic in a fixed array indexed by
//! [`InputPin`].  Handlers only update that state and `try_send` into a
//! bounded event queue; they never wait on the BLE link.
//!
//! Deduplication is by last edge, not by time window: a handler that
//! observes the same direction as the stored edge is a no-op.  A missed
//! opposite edge is repaired by [`InputMonitor::reconcile`], which the
//! sensor task calls with polled levels.

use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

use crate::config::{BUTTON_ACTIVE_HIGH, CLICK_THRESHOLD_MS, EVENT_QUEUE_DEPTH};
use crate::hardware::InputPin;
use crate::protocol::{ButtonEventId, EventFrame, PinEventId};

/// Events raised by input handlers, drained by the event task.
pub type EventQueue = Channel<CriticalSectionRawMutex, EventFrame, EVENT_QUEUE_DEPTH>;

/// Last observed logical edge of one pin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Edge {
    Unknown = 0,
    Risen = 1,
    Fallen = 2,
}

impl Edge {
    pub fn from_level(level: bool) -> Self {
        if level {
            Edge::Risen
        } else {
            Edge::Fallen
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Edge::Risen,
            2 => Edge::Fallen,
            _ => Edge::Unknown,
        }
    }

    pub fn pin_event(self) -> Option<PinEventId> {
        match self {
            Edge::Risen => Some(PinEventId::Rise),
            Edge::Fallen => Some(PinEventId::Fall),
            Edge::Unknown => None,
        }
    }
}

/// Per-pin last-edge store.
pub struct EdgeDetector {
    edges: [AtomicU8; InputPin::COUNT],
}

impl EdgeDetector {
    pub const fn new() -> Self {
        #[allow(clippy::declare_interior_mutable_const)]
        const UNKNOWN: AtomicU8 = AtomicU8::new(Edge::Unknown as u8);
        Self {
            edges: [UNKNOWN; InputPin::COUNT],
        }
    }

    /// Record the level seen by a handler.  Returns the new edge, or
    /// `None` when it repeats the stored one.
    pub fn observe(&self, pin: InputPin, level: bool) -> Option<Edge> {
        let edge = Edge::from_level(level);
        let previous = self.edges[pin.slot()].swap(edge as u8, Ordering::AcqRel);
        (previous != edge as u8).then_some(edge)
    }

    pub fn edge(&self, pin: InputPin) -> Edge {
        Edge::from_u8(self.edges[pin.slot()].load(Ordering::Acquire))
    }

    /// Store `level` without reporting, used to seed an unknown pin.
    fn seed(&self, pin: InputPin, level: bool) -> bool {
        self.edges[pin.slot()]
            .compare_exchange(
                Edge::Unknown as u8,
                Edge::from_level(level) as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }
}

impl Default for EdgeDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Release classification: short press is CLICK, long press is UP.
pub fn classify_release(elapsed_ms: u32) -> ButtonEventId {
    if elapsed_ms < CLICK_THRESHOLD_MS {
        ButtonEventId::Click
    } else {
        ButtonEventId::Up
    }
}

/// Press tracking for one logical button.
pub struct ButtonState {
    pressed: AtomicBool,
    press_time: AtomicU32,
    down_count: AtomicU32,
}

impl ButtonState {
    pub const fn new() -> Self {
        Self {
            pressed: AtomicBool::new(false),
            press_time: AtomicU32::new(0),
            down_count: AtomicU32::new(0),
        }
    }

    /// Feed a transition to the pressed (`true`) or released level.
    pub fn on_level(&self, pressed: bool, now_ms: u32) -> Option<ButtonEventId> {
        if pressed {
            if self.pressed.swap(true, Ordering::AcqRel) {
                return None;
            }
            self.press_time.store(now_ms, Ordering::Release);
            self.down_count.fetch_add(1, Ordering::AcqRel);
            Some(ButtonEventId::Down)
        } else {
            if !self.pressed.swap(false, Ordering::AcqRel) {
                return None;
            }
            let elapsed = now_ms.wrapping_sub(self.press_time.load(Ordering::Acquire));
            Some(classify_release(elapsed))
        }
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed.load(Ordering::Acquire)
    }

    pub fn down_count(&self) -> u32 {
        self.down_count.load(Ordering::Acquire)
    }
}

impl Default for ButtonState {
    fn default() -> Self {
        Self::new()
    }
}

/// Edge detector, button trackers and the outgoing event queue.
pub struct InputMonitor {
    edges: EdgeDetector,
    buttons: [ButtonState; InputPin::COUNT],
    queue: EventQueue,
}

impl InputMonitor {
    pub const fn new() -> Self {
        #[allow(clippy::declare_interior_mutable_const)]
        const IDLE: ButtonState = ButtonState::new();
        Self {
            edges: EdgeDetector::new(),
            buttons: [IDLE; InputPin::COUNT],
            queue: Channel::new(),
        }
    }

    /// Pin change handler.  Never blocks; returns the number of events
    /// queued (0 for a duplicate edge).
    pub fn on_pin_change(&self, pin: InputPin, level: bool, now_ms: u32) -> usize {
        match self.edges.observe(pin, level) {
            Some(edge) => self.emit(pin, edge, now_ms),
            None => 0,
        }
    }

    /// Resync the stored edge with a polled level.  A pin seen for the
    /// first time is seeded silently; a disagreement emits the missed
    /// event.  Returns `true` when a resync happened.
    pub fn reconcile(&self, pin: InputPin, level: bool, now_ms: u32) -> bool {
        if self.edges.seed(pin, level) {
            let pressed = level == BUTTON_ACTIVE_HIGH;
            if pressed {
                // Adopt a button already held at boot without reporting it.
                self.buttons[pin.slot()].pressed.store(true, Ordering::Release);
                self.buttons[pin.slot()].press_time.store(now_ms, Ordering::Release);
            }
            return false;
        }
        match self.edges.observe(pin, level) {
            Some(edge) => {
                warn!("pin {} edge resynced to {}", pin.wire_index(), edge);
                self.emit(pin, edge, now_ms);
                true
            }
            None => false,
        }
    }

    fn emit(&self, pin: InputPin, edge: Edge, now_ms: u32) -> usize {
        let mut queued = 0;
        if let Some(event) = edge.pin_event() {
            queued += self.enqueue(EventFrame::Pin {
                pin: pin.wire_index(),
                event,
                timestamp: now_ms,
            });
        }
        let pressed = (edge == Edge::Risen) == BUTTON_ACTIVE_HIGH;
        if let Some(event) = self.buttons[pin.slot()].on_level(pressed, now_ms) {
            queued += self.enqueue(EventFrame::Button {
                button: pin.button(),
                event,
                timestamp: now_ms,
            });
        }
        queued
    }

    fn enqueue(&self, frame: EventFrame) -> usize {
        match self.queue.try_send(frame) {
            Ok(()) => 1,
            Err(_) => {
                warn!("event queue full - dropping {}", frame);
                0
            }
        }
    }

    /// Wait for the next queued event.
    pub async fn next_event(&self) -> EventFrame {
        self.queue.receive().await
    }

    pub fn try_next_event(&self) -> Option<EventFrame> {
        self.queue.try_receive().ok()
    }

    pub fn edge(&self, pin: InputPin) -> Edge {
        self.edges.edge(pin)
    }

    pub fn button(&self, pin: InputPin) -> &ButtonState {
        &self.buttons[pin.slot()]
    }
}

impl Default for InputMonitor {
    fn default() -> Self {
        Self::new()
    }
}

/// Millisecond tick used for event timestamps (wraps like `ticks_ms`).
pub fn now_ms() -> u32 {
    embassy_time::Instant::now().as_millis() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ButtonId;

    fn drain(monitor: &InputMonitor) -> std::vec::Vec<EventFrame> {
        core::iter::from_fn(|| monitor.try_next_event()).collect()
    }

    #[test]
    fn repeated_level_is_ignored() {
        let detector = EdgeDetector::new();
        assert_eq!(detector.observe(InputPin::Pin17, true), Some(Edge::Risen));
        assert_eq!(detector.observe(InputPin::Pin17, true), None);
        assert_eq!(detector.observe(InputPin::Pin17, false), Some(Edge::Fallen));
        assert_eq!(detector.observe(InputPin::Pin17, false), None);
        assert_eq!(detector.edge(InputPin::Pin17), Edge::Fallen);
        assert_eq!(detector.edge(InputPin::Pin18), Edge::Unknown);
    }

    #[test]
    fn duplicate_interrupt_emits_at_most_once() {
        let monitor = InputMonitor::new();
        let first = monitor.on_pin_change(InputPin::Pin18, true, 10);
        let second = monitor.on_pin_change(InputPin::Pin18, true, 11);
        assert_eq!(first, 2); // PIN_EVENT + DOWN
        assert_eq!(second, 0);
        assert_eq!(drain(&monitor).len(), 2);
    }

    #[test]
    fn press_and_release_emit_pin_and_button_events() {
        let monitor = InputMonitor::new();
        monitor.on_pin_change(InputPin::Pin17, true, 1000);
        monitor.on_pin_change(InputPin::Pin17, false, 1200);
        let events = drain(&monitor);
        assert_eq!(
            events,
            [
                EventFrame::Pin {
                    pin: 17,
                    event: PinEventId::Rise,
                    timestamp: 1000
                },
                EventFrame::Button {
                    button: ButtonId::B,
                    event: ButtonEventId::Down,
                    timestamp: 1000
                },
                EventFrame::Pin {
                    pin: 17,
                    event: PinEventId::Fall,
                    timestamp: 1200
                },
                EventFrame::Button {
                    button: ButtonId::B,
                    event: ButtonEventId::Click,
                    timestamp: 1200
                },
            ]
        );
        assert_eq!(monitor.button(InputPin::Pin17).down_count(), 1);
    }

    #[test]
    fn click_threshold_boundary() {
        assert_eq!(classify_release(0), ButtonEventId::Click);
        assert_eq!(classify_release(499), ButtonEventId::Click);
        assert_eq!(classify_release(500), ButtonEventId::Up);
        assert_eq!(classify_release(501), ButtonEventId::Up);
    }

    #[test]
    fn button_state_classifies_by_hold_time() {
        for (held, expected) in [
            (499, ButtonEventId::Click),
            (500, ButtonEventId::Up),
            (501, ButtonEventId::Up),
        ] {
            let state = ButtonState::new();
            assert_eq!(state.on_level(true, 2000), Some(ButtonEventId::Down));
            assert_eq!(state.on_level(false, 2000 + held), Some(expected));
        }
    }

    #[test]
    fn button_state_ignores_redundant_transitions() {
        let state = ButtonState::new();
        assert_eq!(state.on_level(false, 0), None);
        assert_eq!(state.on_level(true, 5), Some(ButtonEventId::Down));
        assert_eq!(state.on_level(true, 6), None);
        assert!(state.is_pressed());
        assert_eq!(state.down_count(), 1);
    }

    #[test]
    fn button_release_survives_tick_wraparound() {
        let state = ButtonState::new();
        state.on_level(true, u32::MAX - 100);
        assert_eq!(state.on_level(false, 200), Some(ButtonEventId::Click));
    }

    #[test]
    fn reconcile_seeds_unknown_pins_silently() {
        let monitor = InputMonitor::new();
        assert!(!monitor.reconcile(InputPin::Pin17, false, 0));
        assert_eq!(monitor.edge(InputPin::Pin17), Edge::Fallen);
        assert!(drain(&monitor).is_empty());
    }

    #[test]
    fn reconcile_repairs_missed_edge() {
        let monitor = InputMonitor::new();
        monitor.on_pin_change(InputPin::Pin18, true, 100);
        drain(&monitor);

        // The falling-edge interrupt was lost; polling sees the pin low.
        assert!(monitor.reconcile(InputPin::Pin18, false, 900));
        let events = drain(&monitor);
        assert_eq!(
            events,
            [
                EventFrame::Pin {
                    pin: 18,
                    event: PinEventId::Fall,
                    timestamp: 900
                },
                EventFrame::Button {
                    button: ButtonId::A,
                    event: ButtonEventId::Up,
                    timestamp: 900
                },
            ]
        );
        assert!(!monitor.reconcile(InputPin::Pin18, false, 1000));
    }

    #[test]
    fn full_queue_drops_without_blocking() {
        let monitor = InputMonitor::new();
        let mut level = true;
        for t in 0..(EVENT_QUEUE_DEPTH as u32 * 2) {
            monitor.on_pin_change(InputPin::Pin17, level, t * 1000);
            level = !level;
        }
        assert_eq!(drain(&monitor).len(), EVENT_QUEUE_DEPTH);
    }
}

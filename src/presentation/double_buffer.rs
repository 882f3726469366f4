//! Flicker-free page switching for paged documents.
//!
//! Two render slots alternate: one is visible, the other stages the next
//! page. Rendering is asynchronous and done by the host; this type only
//! decides which slot to load and when to flip. Only the most recently
//! requested page matters, intermediate requests are dropped.

use std::time::{Duration, Instant};

use serde::Serialize;

/// Upper bound on a single page render before it is abandoned and retried.
pub const RENDER_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Slot {
    A,
    B,
}

impl Slot {
    pub fn other(self) -> Slot {
        match self {
            Slot::A => Slot::B,
            Slot::B => Slot::A,
        }
    }

    fn index(self) -> usize {
        match self {
            Slot::A => 0,
            Slot::B => 1,
        }
    }
}

/// Instruction to the host: render `page` into `slot`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LoadPage {
    pub slot: Slot,
    pub page: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct SlotState {
    page: Option<u32>,
    /// Render for `page` has completed.
    ready: bool,
}

#[derive(Debug, Clone)]
pub struct DoubleBuffer {
    slots: [SlotState; 2],
    active: Slot,
    target: Option<u32>,
    in_flight: Option<(Slot, Instant)>,
    timeout: Duration,
}

impl Default for DoubleBuffer {
    fn default() -> Self {
        DoubleBuffer::new()
    }
}

impl DoubleBuffer {
    pub fn new() -> Self {
        DoubleBuffer::with_timeout(RENDER_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        DoubleBuffer {
            slots: [SlotState::default(); 2],
            active: Slot::A,
            target: None,
            in_flight: None,
            timeout,
        }
    }

    pub fn active_slot(&self) -> Slot {
        self.active
    }

    /// Page currently on screen, if the visible slot has finished rendering.
    pub fn visible_page(&self) -> Option<u32> {
        let slot = self.slots[self.active.index()];
        if slot.ready { slot.page } else { None }
    }

    pub fn slot_page(&self, slot: Slot) -> Option<u32> {
        self.slots[slot.index()].page
    }

    pub fn target(&self) -> Option<u32> {
        self.target
    }

    pub fn is_processing(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Ask for `page` to become visible.
    pub fn request(&mut self, page: u32, now: Instant) -> Option<LoadPage> {
        self.target = Some(page);
        self.pump(now)
    }

    /// The host finished rendering `page` into `slot`.
    pub fn on_rendered(&mut self, slot: Slot, page: u32, now: Instant) -> Option<LoadPage> {
        let state = &mut self.slots[slot.index()];
        if state.page == Some(page) {
            state.ready = true;
            if self.target == Some(page) {
                self.active = slot;
            } else {
                log::debug!("Discarding stale render of page {page} in slot {slot:?}");
            }
        }
        if self.in_flight.is_some_and(|(s, _)| s == slot) {
            self.in_flight = None;
        }
        self.pump(now)
    }

    /// Rendering into `slot` failed. The slot is cleared and the latest target retried.
    pub fn on_error(&mut self, slot: Slot, now: Instant) -> Option<LoadPage> {
        log::warn!("Page render failed in slot {slot:?}, retrying");
        if slot != self.active {
            self.slots[slot.index()] = SlotState::default();
        }
        if self.in_flight.is_some_and(|(s, _)| s == slot) {
            self.in_flight = None;
        }
        self.pump(now)
    }

    /// Abandon a render that has been in flight longer than the timeout.
    pub fn poll_timeout(&mut self, now: Instant) -> Option<LoadPage> {
        let (slot, started) = self.in_flight?;
        if now.duration_since(started) < self.timeout {
            return None;
        }
        log::warn!("Page render in slot {slot:?} exceeded {:?}, retrying", self.timeout);
        self.slots[slot.index()] = SlotState::default();
        self.in_flight = None;
        self.pump(now)
    }

    fn pump(&mut self, now: Instant) -> Option<LoadPage> {
        let page = self.target?;
        let active = self.slots[self.active.index()];
        if active.page == Some(page) {
            return None;
        }
        let inactive = self.active.other();
        let staged = self.slots[inactive.index()];
        if staged.page == Some(page) && staged.ready {
            self.active = inactive;
            return None;
        }
        if self.in_flight.is_some() {
            return None;
        }
        self.slots[inactive.index()] = SlotState { page: Some(page), ready: false };
        self.in_flight = Some((inactive, now));
        Some(LoadPage { slot: inactive, page })
    }
}

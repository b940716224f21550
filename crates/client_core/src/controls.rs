use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tokio::sync::broadcast;

use crate::SessionEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionControl {
    Store,
    Retrieve,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControlState {
    pub store_enabled: bool,
    pub retrieve_enabled: bool,
}

/// Enablement of the two action controls. A control is enabled only while a
/// contract handle exists and no call it triggered is still in flight.
pub struct ActionControls {
    connected: AtomicBool,
    store_in_flight: AtomicUsize,
    retrieve_in_flight: AtomicUsize,
    events: broadcast::Sender<SessionEvent>,
}

impl ActionControls {
    pub(crate) fn new(events: broadcast::Sender<SessionEvent>) -> Self {
        Self {
            connected: AtomicBool::new(false),
            store_in_flight: AtomicUsize::new(0),
            retrieve_in_flight: AtomicUsize::new(0),
            events,
        }
    }

    pub fn state(&self) -> ControlState {
        let connected = self.connected.load(Ordering::SeqCst);
        ControlState {
            store_enabled: connected && self.store_in_flight.load(Ordering::SeqCst) == 0,
            retrieve_enabled: connected && self.retrieve_in_flight.load(Ordering::SeqCst) == 0,
        }
    }

    pub(crate) fn set_connected(&self, connected: bool) {
        if self.connected.swap(connected, Ordering::SeqCst) != connected {
            self.publish();
        }
    }

    /// Disables `control` until the returned guard is dropped.
    pub(crate) fn begin(&self, control: ActionControl) -> InFlight<'_> {
        self.counter(control).fetch_add(1, Ordering::SeqCst);
        self.publish();
        InFlight {
            controls: self,
            control,
        }
    }

    fn counter(&self, control: ActionControl) -> &AtomicUsize {
        match control {
            ActionControl::Store => &self.store_in_flight,
            ActionControl::Retrieve => &self.retrieve_in_flight,
        }
    }

    fn publish(&self) {
        let _ = self.events.send(SessionEvent::ControlsChanged(self.state()));
    }
}

pub(crate) struct InFlight<'a> {
    controls: &'a ActionControls,
    control: ActionControl,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.controls
            .counter(self.control)
            .fetch_sub(1, Ordering::SeqCst);
        self.controls.publish();
    }
}

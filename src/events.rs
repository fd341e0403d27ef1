//! Named notifications raised by the scheduler.
//!
//! Hosts subscribe to an event and get called on the driving thread when the
//! scheduler fires it. The only event today is [`WorkerEvent::InitComplete`],
//! raised once when every worker has acknowledged its readiness probe.

use std::collections::HashMap;
use std::fmt;

/// Events a host can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerEvent {
    /// All workers answered their readiness probe.
    InitComplete,
}

impl WorkerEvent {
    /// The event's name as used by hosts that subscribe by string.
    pub fn name(self) -> &'static str {
        match self {
            WorkerEvent::InitComplete => "initComplete",
        }
    }

    /// Looks an event up by name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "initComplete" => Some(WorkerEvent::InitComplete),
            _ => None,
        }
    }
}

impl fmt::Display for WorkerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Handle returned by [`EventHandler::on`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription {
    event: WorkerEvent,
    id: u64,
}

struct Handler {
    id: u64,
    once: bool,
    callback: Box<dyn FnMut() + 'static>,
}

/// Subscriber registry for [`WorkerEvent`]s.
#[derive(Default)]
pub struct EventHandler {
    handlers: HashMap<WorkerEvent, Vec<Handler>>,
    next_id: u64,
}

impl EventHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes `callback` to every firing of `event`.
    pub fn on<F>(&mut self, event: WorkerEvent, callback: F) -> Subscription
    where
        F: FnMut() + 'static,
    {
        self.add(event, false, Box::new(callback))
    }

    /// Subscribes `callback` to the next firing of `event` only.
    pub fn once<F>(&mut self, event: WorkerEvent, callback: F) -> Subscription
    where
        F: FnMut() + 'static,
    {
        self.add(event, true, Box::new(callback))
    }

    /// Removes a subscription. Returns false if it was already gone.
    pub fn off(&mut self, subscription: Subscription) -> bool {
        let Some(list) = self.handlers.get_mut(&subscription.event) else {
            return false;
        };
        let before = list.len();
        list.retain(|h| h.id != subscription.id);
        before != list.len()
    }

    /// Returns true if anything is subscribed to `event`.
    pub fn has_handlers(&self, event: WorkerEvent) -> bool {
        self.handlers.get(&event).is_some_and(|list| !list.is_empty())
    }

    /// Invokes every handler subscribed to `event`, in subscription order.
    ///
    /// Returns the number of handlers invoked.
    pub fn fire(&mut self, event: WorkerEvent) -> usize {
        let Some(list) = self.handlers.get_mut(&event) else {
            return 0;
        };
        for handler in list.iter_mut() {
            (handler.callback)();
        }
        let fired = list.len();
        list.retain(|h| !h.once);
        fired
    }

    fn add(
        &mut self,
        event: WorkerEvent,
        once: bool,
        callback: Box<dyn FnMut() + 'static>,
    ) -> Subscription {
        let id = self.next_id;
        self.next_id += 1;
        self.handlers
            .entry(event)
            .or_default()
            .push(Handler { id, once, callback });
        Subscription { event, id }
    }
}

impl fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: HashMap<_, _> = self
            .handlers
            .iter()
            .map(|(event, list)| (event.name(), list.len()))
            .collect();
        f.debug_struct("EventHandler")
            .field("handlers", &counts)
            .finish()
    }
}

// TWatch - Generic Callback Table
//
// Append-only table of listeners, each subscribed to an event bitmask.
// Dispatch walks the table in registration order and calls every listener
// whose mask intersects the event; no listener can stop the walk.
//
// Listeners run on the dispatching task and must return quickly. A listener
// that blocks stalls the motion poll and everything scheduled behind it.
//
// Registration needs `&mut self`, so it can never overlap a dispatch. If a
// table is ever shared between tasks, wrap it in a `Mutex` and keep the lock
// held for the whole registration.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::events::EventBits;

/// Listener signature: `(event, payload) -> handled`. The return value is
/// reserved; dispatch does not look at it.
pub type Callback<P> = Box<dyn FnMut(EventBits, &P) -> bool + Send>;

static EVENT_LOGGING: AtomicBool = AtomicBool::new(false);

/// Enable/disable per-listener dispatch logging for all tables.
pub fn set_event_logging(enable: bool) {
    EVENT_LOGGING.store(enable, Ordering::Relaxed);
}

pub fn event_logging_enabled() -> bool {
    EVENT_LOGGING.load(Ordering::Relaxed)
}

struct Entry<P: ?Sized> {
    event: EventBits,
    callback: Callback<P>,
    id: &'static str,
    counter: u64,
}

pub struct CallbackTable<P: ?Sized> {
    name: &'static str,
    entries: Vec<Entry<P>>,
}

impl<P: ?Sized> CallbackTable<P> {
    pub fn new(name: &'static str) -> Self {
        Self { name, entries: Vec::new() }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append a listener for `event`. Grows the table by one slot.
    ///
    /// Running out of heap here halts the firmware: a half-registered
    /// listener set is not something the rest of the system can recover from.
    pub fn register<F>(&mut self, event: EventBits, callback: F, id: &'static str) -> bool
    where
        F: FnMut(EventBits, &P) -> bool + Send + 'static,
    {
        if self.entries.try_reserve_exact(1).is_err() {
            log::error!("{}: callback table realloc failed ({})", self.name, id);
            std::process::abort();
        }

        self.entries.push(Entry {
            event,
            callback: Box::new(callback),
            id,
            counter: 0,
        });
        log::info!("{}: registered callback '{}' (mask {:#x})", self.name, id, event);
        true
    }

    /// Call every listener whose mask intersects `event`.
    pub fn send(&mut self, event: EventBits, arg: &P) -> bool {
        self.dispatch(event, arg, event_logging_enabled())
    }

    /// Same as [`send`](Self::send) but never logs, for high-rate events.
    pub fn send_no_log(&mut self, event: EventBits, arg: &P) -> bool {
        self.dispatch(event, arg, false)
    }

    fn dispatch(&mut self, event: EventBits, arg: &P, logging: bool) -> bool {
        for entry in self.entries.iter_mut().filter(|e| e.event & event != 0) {
            entry.counter += 1;
            if logging {
                log::debug!(
                    "{}: call '{}' (event {:#x}, #{})",
                    self.name,
                    entry.id,
                    event,
                    entry.counter
                );
            }
            let _ = (entry.callback)(event, arg);
        }
        true
    }

    /// How many times the listener registered as `id` has been called.
    pub fn invocation_count(&self, id: &str) -> Option<u64> {
        self.entries.iter().find(|e| e.id == id).map(|e| e.counter)
    }

    /// Registered listener ids, in dispatch order.
    pub fn ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|e| e.id)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    fn recorder(
        table: &mut CallbackTable<str>,
        log: &Arc<Mutex<Vec<(&'static str, EventBits, String)>>>,
        mask: EventBits,
        id: &'static str,
    ) {
        let log = Arc::clone(log);
        table.register(
            mask,
            move |event, msg: &str| {
                log.lock().unwrap().push((id, event, msg.to_string()));
                true
            },
            id,
        );
    }

    #[test]
    fn dispatch_hits_only_intersecting_masks_in_order() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut table = CallbackTable::<str>::new("test");
        recorder(&mut table, &calls, 0b001, "one");
        recorder(&mut table, &calls, 0b010, "two");
        recorder(&mut table, &calls, 0b011, "three");

        assert!(table.send(0b010, "x"));

        let calls = calls.lock().unwrap();
        let ids: Vec<_> = calls.iter().map(|c| c.0).collect();
        assert_eq!(ids, ["two", "three"]);
        assert!(calls.iter().all(|c| c.1 == 0b010 && c.2 == "x"));
    }

    #[test]
    fn every_matching_listener_runs_exactly_once() {
        let hits = Arc::new(Mutex::new(0u32));
        let mut table = CallbackTable::<str>::new("test");
        for _ in 0..7 {
            let hits = Arc::clone(&hits);
            // Returning true ("handled") must not stop the walk.
            table.register(0b100, move |_, _| {
                *hits.lock().unwrap() += 1;
                true
            }, "counter");
        }

        table.send(0b110, "");
        assert_eq!(*hits.lock().unwrap(), 7);
        assert_eq!(table.len(), 7);
    }

    #[test]
    fn empty_table_dispatch_is_a_no_op() {
        let mut table = CallbackTable::<str>::new("empty");
        assert!(table.is_empty());
        assert!(table.send(0xffff_ffff, ""));
        assert!(table.send_no_log(0xffff_ffff, ""));
    }

    #[test]
    fn no_log_variant_dispatches_identically() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut table = CallbackTable::<str>::new("test");
        recorder(&mut table, &calls, 0b01, "a");
        recorder(&mut table, &calls, 0b10, "b");

        set_event_logging(true);
        table.send(0b11, "p");
        set_event_logging(false);
        table.send_no_log(0b11, "p");

        let ids: Vec<_> = calls.lock().unwrap().iter().map(|c| c.0).collect();
        assert_eq!(ids, ["a", "b", "a", "b"]);
    }

    #[test]
    fn invocation_counts_track_matching_dispatches() {
        let mut table = CallbackTable::<()>::new("count");
        table.register(0b01, |_, _| true, "low");
        table.register(0b10, |_, _| false, "high");

        table.send(0b01, &());
        table.send(0b01, &());
        table.send(0b10, &());

        assert_eq!(table.invocation_count("low"), Some(2));
        assert_eq!(table.invocation_count("high"), Some(1));
        assert_eq!(table.invocation_count("missing"), None);
        assert_eq!(table.ids().collect::<Vec<_>>(), ["low", "high"]);
        assert_eq!(table.name(), "count");
    }
}

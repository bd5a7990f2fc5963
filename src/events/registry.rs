use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use parking_lot::Mutex;
use rtrb::{Consumer, Producer, RingBuffer as EventQueue};

/// Pending events each listener can hold before content-changes get dropped.
pub const LISTENER_QUEUE_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferEvent {
    /// Data was updated, shape unchanged.
    ContentChange,
    /// Shape or identity changed; re-fetch the size and reallocate mirrors.
    ContentRedirect,
}

/// Value handle for a registered listener: arena slot plus generation.
///
/// Ids of removed listeners never alias a later registration in the same slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId {
    index: u32,
    generation: u32,
}

struct Sender {
    tx: Producer<BufferEvent>,
    overflowed: Arc<AtomicBool>,
}

struct Slot {
    generation: u32,
    sender: Option<Sender>,
}

/// Receiving end handed out by [`Updater::add_listener`].
///
/// The listener may be dropped at any time; the updater notices the abandoned
/// queue and recycles the slot.
pub struct EventListener {
    id: ListenerId,
    rx: Consumer<BufferEvent>,
    overflowed: Arc<AtomicBool>,
}

impl EventListener {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Take the next pending event.
    ///
    /// If a redirect could not be queued, the stale queue is discarded and a
    /// single `ContentRedirect` is reported instead.
    pub fn pop(&mut self) -> Option<BufferEvent> {
        if self.overflowed.swap(false, Ordering::Acquire) {
            while self.rx.pop().is_ok() {}
            return Some(BufferEvent::ContentRedirect);
        }
        self.rx.pop().ok()
    }

    /// Drain everything pending and collapse it into the strongest event.
    pub fn poll(&mut self) -> Option<BufferEvent> {
        let mut strongest = None;
        while let Some(event) = self.pop() {
            if event == BufferEvent::ContentRedirect {
                strongest = Some(event);
            } else if strongest.is_none() {
                strongest = Some(event);
            }
        }
        strongest
    }
}

/// Event source shared by data objects that UI views observe.
///
/// Delivery is a push into each listener's wait-free queue; nothing is called
/// back on the sending thread.
#[derive(Default)]
pub struct Updater {
    slots: Mutex<Vec<Slot>>,
}

impl Updater {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&self) -> EventListener {
        let (tx, rx) = EventQueue::new(LISTENER_QUEUE_LEN);
        let overflowed = Arc::new(AtomicBool::new(false));

        let mut slots = self.slots.lock();
        prune(&mut slots);

        let index = match slots.iter().position(|s| s.sender.is_none()) {
            Some(index) => index,
            None => {
                slots.push(Slot {
                    generation: 0,
                    sender: None,
                });
                slots.len() - 1
            }
        };

        let slot = &mut slots[index];
        slot.generation = slot.generation.wrapping_add(1);
        slot.sender = Some(Sender {
            tx,
            overflowed: Arc::clone(&overflowed),
        });

        EventListener {
            id: ListenerId {
                index: index as u32,
                generation: slot.generation,
            },
            rx,
            overflowed,
        }
    }

    /// Unregister by id. Returns false for ids that are stale or unknown.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut slots = self.slots.lock();
        match slots.get_mut(id.index as usize) {
            Some(slot) if slot.generation == id.generation && slot.sender.is_some() => {
                slot.sender = None;
                true
            }
            _ => {
                log::warn!("ignoring removal of stale listener {id:?}");
                false
            }
        }
    }

    /// Listeners whose receiving end is still alive.
    pub fn num_listeners(&self) -> usize {
        self.slots
            .lock()
            .iter()
            .filter_map(|s| s.sender.as_ref())
            .filter(|s| !s.tx.is_abandoned())
            .count()
    }

    pub fn send_content_change(&self) {
        let mut slots = self.slots.lock();
        prune(&mut slots);
        dispatch(&mut slots, BufferEvent::ContentChange);
    }

    /// Realtime variant: gives up instead of waiting for the registry and never
    /// frees abandoned slots. Returns whether the event was dispatched.
    pub fn try_send_content_change(&self) -> bool {
        match self.slots.try_lock() {
            Some(mut slots) => {
                dispatch(&mut slots, BufferEvent::ContentChange);
                true
            }
            None => false,
        }
    }

    pub fn send_content_redirect(&self) {
        let mut slots = self.slots.lock();
        prune(&mut slots);
        dispatch(&mut slots, BufferEvent::ContentRedirect);
    }
}

fn dispatch(slots: &mut [Slot], event: BufferEvent) {
    for sender in slots.iter_mut().filter_map(|s| s.sender.as_mut()) {
        if sender.tx.is_abandoned() {
            continue;
        }
        if sender.tx.push(event).is_err() && event == BufferEvent::ContentRedirect {
            sender.overflowed.store(true, Ordering::Release);
        }
    }
}

fn prune(slots: &mut [Slot]) {
    for slot in slots.iter_mut() {
        if slot.sender.as_ref().is_some_and(|s| s.tx.is_abandoned()) {
            slot.sender = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_reach_every_listener() {
        let updater = Updater::new();
        let mut a = updater.add_listener();
        let mut b = updater.add_listener();

        updater.send_content_change();
        updater.send_content_redirect();

        for listener in [&mut a, &mut b] {
            assert_eq!(listener.pop(), Some(BufferEvent::ContentChange));
            assert_eq!(listener.pop(), Some(BufferEvent::ContentRedirect));
            assert_eq!(listener.pop(), None);
        }
    }

    #[test]
    fn removed_slot_is_reused_with_new_generation() {
        let updater = Updater::new();
        let first = updater.add_listener();
        let first_id = first.id();

        assert!(updater.remove_listener(first_id));
        assert!(!updater.remove_listener(first_id), "second removal is stale");

        let second = updater.add_listener();
        assert_ne!(second.id(), first_id);
        assert!(!updater.remove_listener(first_id), "old id must not hit the new listener");
        assert_eq!(updater.num_listeners(), 1);
    }

    #[test]
    fn dropped_listener_is_skipped_and_recycled() {
        let updater = Updater::new();
        let live = updater.add_listener();
        drop(updater.add_listener());

        assert_eq!(updater.num_listeners(), 1);
        updater.send_content_redirect();

        let mut live = live;
        assert_eq!(live.pop(), Some(BufferEvent::ContentRedirect));

        let again = updater.add_listener();
        assert_eq!(updater.num_listeners(), 2);
        drop(again);
    }

    #[test]
    fn full_queue_still_reports_redirect() {
        let updater = Updater::new();
        let mut listener = updater.add_listener();

        for _ in 0..LISTENER_QUEUE_LEN {
            updater.send_content_change();
        }
        updater.send_content_redirect();

        assert_eq!(listener.pop(), Some(BufferEvent::ContentRedirect));
        assert_eq!(listener.pop(), None);
    }

    #[test]
    fn poll_collapses_to_strongest_event() {
        let updater = Updater::new();
        let mut listener = updater.add_listener();

        assert_eq!(listener.poll(), None);

        updater.send_content_change();
        updater.send_content_change();
        assert_eq!(listener.poll(), Some(BufferEvent::ContentChange));

        updater.send_content_change();
        updater.send_content_redirect();
        updater.send_content_change();
        assert_eq!(listener.poll(), Some(BufferEvent::ContentRedirect));
    }

    #[test]
    fn try_send_gives_up_while_registry_is_busy() {
        let updater = Updater::new();
        let mut listener = updater.add_listener();

        {
            let _busy = updater.slots.lock();
            assert!(!updater.try_send_content_change());
        }
        assert!(updater.try_send_content_change());
        assert_eq!(listener.pop(), Some(BufferEvent::ContentChange));
    }
}

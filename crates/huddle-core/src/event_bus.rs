//! Event bus from the orchestrator and credential actions to the UI.
//!
//! Single-threaded (WASM): an `Rc<RefCell<VecDeque>>` shared by clones.
//! The UI drains it once per frame. Frames stop while the tab is hidden, so
//! the queue is bounded and sheds its oldest events when full.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use huddle_types::event::HuddleEvent;

/// Events kept while nobody drains.
pub const MAX_PENDING: usize = 256;

#[derive(Clone)]
pub struct EventBus {
    queue: Rc<RefCell<VecDeque<HuddleEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            queue: Rc::new(RefCell::new(VecDeque::new())),
        }
    }

    pub fn emit(&self, event: HuddleEvent) {
        let mut queue = self.queue.borrow_mut();
        if queue.len() == MAX_PENDING {
            if let Some(dropped) = queue.pop_front() {
                log::debug!("Event queue full; dropping {:?}", dropped);
            }
        }
        queue.push_back(event);
    }

    /// Take every pending event, oldest first.
    pub fn drain(&self) -> Vec<HuddleEvent> {
        self.queue.borrow_mut().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

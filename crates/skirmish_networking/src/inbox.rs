//! # Staging Inbox
//!
//! Transport handlers run outside the simulation tick. They push what they
//! receive into an [`Inbox`]; the tick drains it at one well-defined point.
//!
//! ```text
//! pump() ─► handler ─► InboxSender::stage ─► [channel] ─► Inbox::drain ─► tick
//! ```

use crossbeam_channel::{unbounded, Receiver, Sender};

/// Receiving end, owned by the simulation.
#[derive(Debug)]
pub struct Inbox<T> {
    sender: Sender<T>,
    receiver: Receiver<T>,
}

/// Producer handle, cloned into each handler.
#[derive(Debug)]
pub struct InboxSender<T> {
    sender: Sender<T>,
}

impl<T> Clone for InboxSender<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<T> Inbox<T> {
    /// Creates an empty inbox.
    #[must_use]
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self { sender, receiver }
    }

    /// A producer handle.
    #[must_use]
    pub fn sender(&self) -> InboxSender<T> {
        InboxSender {
            sender: self.sender.clone(),
        }
    }

    /// Everything staged so far, in arrival order.
    pub fn drain(&self) -> Vec<T> {
        self.receiver.try_iter().collect()
    }

    /// Number of staged items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// True if nothing is staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

impl<T> Default for Inbox<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> InboxSender<T> {
    /// Stages one item. Returns `false` once the inbox is gone.
    #[inline]
    pub fn stage(&self, item: T) -> bool {
        self.sender.send(item).is_ok()
    }
}

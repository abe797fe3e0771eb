// inbox.rs - hands work produced off-thread to the simulation thread
//
// The component store is single-writer and not thread-safe. Network or
// loading threads hold a `TickSender` and push messages; the simulation
// drains the queue from inside a system during a tick.

use crossbeam_channel::{bounded, unbounded, Receiver, SendError, Sender};

pub struct TickQueue<M> {
    sender: Sender<M>,
    receiver: Receiver<M>,
}

/// Cloneable, `Send` producer half of a [`TickQueue`].
#[derive(Debug)]
pub struct TickSender<M> {
    sender: Sender<M>,
}

impl<M> TickQueue<M> {
    pub fn unbounded() -> Self {
        let (sender, receiver) = unbounded();
        Self { sender, receiver }
    }

    /// Producers block once `capacity` messages are waiting.
    pub fn bounded(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self { sender, receiver }
    }

    pub fn sender(&self) -> TickSender<M> {
        TickSender {
            sender: self.sender.clone(),
        }
    }

    /// Everything queued so far, in send order.
    pub fn drain(&self) -> Vec<M> {
        self.receiver.try_iter().collect()
    }

    /// At most `max` messages; the rest wait for the next tick.
    pub fn drain_up_to(&self, max: usize) -> Vec<M> {
        self.receiver.try_iter().take(max).collect()
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

impl<M> Default for TickQueue<M> {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl<M> TickSender<M> {
    pub fn send(&self, message: M) -> Result<(), SendError<M>> {
        self.sender.send(message)
    }
}

impl<M> Clone for TickSender<M> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

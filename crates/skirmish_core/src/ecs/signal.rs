// signal.rs - typed publish/subscribe over a closed set of signal kinds
//
// Each subscriber owns an inbox and drains it at its own point in the
// tick, so a system sees everything published earlier in the same tick
// and nothing is delivered twice.

use crate::ecs::{EcsError, Entity};
use std::collections::VecDeque;
use std::fmt;
use std::hash::Hash;

/// A signal type whose variants are grouped by a copyable kind.
pub trait Signal: Clone + fmt::Debug + 'static {
    type Kind: Copy + Eq + Hash + fmt::Debug;

    fn kind(&self) -> Self::Kind;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SubscriberId(usize);

/// A signal addressed to the entity it concerns.
#[derive(Debug, Clone)]
pub struct SignalEnvelope<S> {
    pub entity: Entity,
    pub signal: S,
}

struct Subscriber<S: Signal> {
    name: String,
    kinds: Vec<S::Kind>,
    inbox: VecDeque<SignalEnvelope<S>>,
}

pub struct SignalBus<S: Signal> {
    subscribers: Vec<Subscriber<S>>,
    published: u64,
}

impl<S: Signal> SignalBus<S> {
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
            published: 0,
        }
    }

    pub fn subscribe(&mut self, name: impl Into<String>, kinds: &[S::Kind]) -> SubscriberId {
        self.subscribers.push(Subscriber {
            name: name.into(),
            kinds: kinds.to_vec(),
            inbox: VecDeque::new(),
        });
        SubscriberId(self.subscribers.len() - 1)
    }

    /// Deliver to every subscriber of the signal's kind; returns the fan-out.
    pub fn publish(&mut self, entity: Entity, signal: S) -> usize {
        let kind = signal.kind();
        self.published += 1;
        let mut delivered = 0;
        for subscriber in &mut self.subscribers {
            if subscriber.kinds.contains(&kind) {
                subscriber.inbox.push_back(SignalEnvelope {
                    entity,
                    signal: signal.clone(),
                });
                delivered += 1;
            }
        }
        if delivered == 0 {
            tracing::trace!(?kind, %entity, "signal had no subscribers");
        }
        delivered
    }

    pub fn drain(&mut self, id: SubscriberId) -> Result<Vec<SignalEnvelope<S>>, EcsError> {
        self.subscribers
            .get_mut(id.0)
            .map(|subscriber| subscriber.inbox.drain(..).collect())
            .ok_or(EcsError::UnknownSubscriber(id.0))
    }

    pub fn pending(&self, id: SubscriberId) -> usize {
        self.subscribers
            .get(id.0)
            .map(|subscriber| subscriber.inbox.len())
            .unwrap_or(0)
    }

    pub fn subscriber_name(&self, id: SubscriberId) -> Option<&str> {
        self.subscribers.get(id.0).map(|subscriber| subscriber.name.as_str())
    }

    /// Total signals published since creation.
    pub fn published(&self) -> u64 {
        self.published
    }
}

impl<S: Signal> Default for SignalBus<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Signal> fmt::Debug for SignalBus<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalBus")
            .field("subscribers", &self.subscribers.len())
            .field("published", &self.published)
            .finish()
    }
}

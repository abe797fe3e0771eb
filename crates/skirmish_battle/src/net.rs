// net.rs - message shapes at the transport boundary
//
// Inbound messages arrive on a `TickQueue` from whatever thread the
// transport runs on and are applied by the network system during a tick.
// Outbound messages are collected in the `Outbox` resource and flushed to
// a `NetworkSink` in the late phase.

use crate::components::Team;
use crate::config::ContentId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    CastAbility {
        caster: u64,
        ability: ContentId,
        #[serde(default)]
        target: Option<u64>,
    },
    /// Run effect assignment of a live cast again.
    Reassign { cast: u64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    CastStarted {
        cast: u64,
        caster: u64,
        ability: ContentId,
    },
    DamageDealt {
        target: u64,
        attacker: Option<u64>,
        amount: f64,
        critical: bool,
        remaining: f64,
    },
    Healed {
        target: u64,
        amount: f64,
        remaining: f64,
    },
    EntityDied {
        entity: u64,
        killer: Option<u64>,
    },
    TeamEliminated {
        team: Team,
    },
    MatchOver {
        winner: Team,
    },
}

/// Transport side of outbound traffic.
pub trait NetworkSink {
    fn send(&mut self, message: &OutboundMessage);
}

/// Drops everything; for hosts without a transport.
#[derive(Debug, Default)]
pub struct NullSink;

impl NetworkSink for NullSink {
    fn send(&mut self, _message: &OutboundMessage) {}
}

/// Outbound messages produced during the current tick.
#[derive(Debug, Default)]
pub struct Outbox {
    pending: Vec<OutboundMessage>,
    sent: u64,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: OutboundMessage) {
        self.pending.push(message);
    }

    pub fn pending(&self) -> &[OutboundMessage] {
        &self.pending
    }

    pub fn flush(&mut self, sink: &mut dyn NetworkSink) -> usize {
        let count = self.pending.len();
        for message in self.pending.drain(..) {
            sink.send(&message);
        }
        self.sent += count as u64;
        count
    }

    /// Messages flushed since creation.
    pub fn sent(&self) -> u64 {
        self.sent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inbound_messages_use_tagged_json() {
        let message: InboundMessage =
            serde_json::from_str(r#"{ "type": "cast_ability", "caster": 3, "ability": 10 }"#)
                .unwrap();
        assert_eq!(
            message,
            InboundMessage::CastAbility {
                caster: 3,
                ability: ContentId(10),
                target: None
            }
        );
    }

    #[test]
    fn flush_empties_the_outbox() {
        struct Counting(usize);
        impl NetworkSink for Counting {
            fn send(&mut self, _message: &OutboundMessage) {
                self.0 += 1;
            }
        }

        let mut outbox = Outbox::new();
        outbox.push(OutboundMessage::TeamEliminated { team: Team::Red });
        outbox.push(OutboundMessage::MatchOver { winner: Team::Blue });
        let mut sink = Counting(0);

        assert_eq!(outbox.flush(&mut sink), 2);
        assert_eq!(sink.0, 2);
        assert!(outbox.pending().is_empty());
        assert_eq!(outbox.sent(), 2);
    }
}

//! Append-only event log.

use tinypay_proto::{Account, EventKind, LedgerEvent};

/// The ordered record of every externally observable ledger effect.
///
/// Entries are never modified or removed. Sequence numbers are dense and
/// start at zero, so `events_since(n)` returns everything a reader that has
/// seen `n` events has not seen yet.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    entries: Vec<LedgerEvent>,
}

impl EventLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event emitted by `emitter` and returns its sequence number.
    pub fn append(&mut self, emitter: Account, kind: EventKind) -> u64 {
        let sequence = self.entries.len() as u64;
        self.entries.push(LedgerEvent {
            sequence,
            emitter,
            kind,
        });
        sequence
    }

    /// Returns every event in order.
    #[must_use]
    pub fn entries(&self) -> &[LedgerEvent] {
        &self.entries
    }

    /// Returns the events with a sequence number of at least `sequence`.
    #[must_use]
    pub fn events_since(&self, sequence: u64) -> &[LedgerEvent] {
        let start = usize::try_from(sequence)
            .unwrap_or(usize::MAX)
            .min(self.entries.len());
        &self.entries[start..]
    }

    /// Returns the events whose `type` equals `name`, e.g. `"PreCommitMade"`.
    pub fn named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a LedgerEvent> + 'a {
        self.entries.iter().filter(move |e| e.kind.name() == name)
    }

    /// Returns the number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;
    use tinypay_proto::Digest;

    const MERCHANT: Account = address!("0x4444444444444444444444444444444444444444");

    fn precommit(byte: u8) -> EventKind {
        EventKind::PreCommitMade {
            account: MERCHANT,
            commit_hash: Digest::with_last_byte(byte),
        }
    }

    #[test]
    fn test_sequence_numbers_are_dense() {
        let mut log = EventLog::new();
        assert!(log.is_empty());
        assert_eq!(log.append(MERCHANT, precommit(1)), 0);
        assert_eq!(log.append(MERCHANT, precommit(2)), 1);
        assert_eq!(log.len(), 2);
        assert_eq!(log.entries()[1].sequence, 1);
        assert_eq!(log.entries()[1].emitter, MERCHANT);
    }

    #[test]
    fn test_events_since() {
        let mut log = EventLog::new();
        for byte in 0..5 {
            log.append(MERCHANT, precommit(byte));
        }
        assert_eq!(log.events_since(3).len(), 2);
        assert_eq!(log.events_since(3)[0].sequence, 3);
        assert!(log.events_since(99).is_empty());
    }

    #[test]
    fn test_named_filter() {
        let mut log = EventLog::new();
        log.append(MERCHANT, precommit(1));
        log.append(
            MERCHANT,
            EventKind::AnchorRefreshed {
                account: MERCHANT,
                new_anchor: Digest::ZERO,
            },
        );
        assert_eq!(log.named("PreCommitMade").count(), 1);
        assert_eq!(log.named("AnchorRefreshed").count(), 1);
        assert_eq!(log.named("Deposit").count(), 0);
    }
}

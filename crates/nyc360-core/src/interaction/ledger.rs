use std::collections::HashMap;

use super::Ticket;

/// How a finished call should affect its target.
#[derive(Debug, PartialEq)]
pub(crate) enum Resolution<S> {
    Confirmed(S),
    Restore(S),
    Superseded,
    Unknown,
}

/// Bookkeeping slot for one call on a target.
enum Slot<S> {
    /// Still in flight, holding the state to restore if it fails.
    Pending(S),
    Settled,
}

/// Calls of one interaction site, with their rollback snapshots.
///
/// Generations increase per site, so each target's entries stay sorted.
/// A target keeps its settled entries until every call on it has settled,
/// so a late failure can tell whether its successor was accepted.
pub(crate) struct PendingLedger<S> {
    next_generation: u64,
    targets: HashMap<i64, Vec<(u64, Slot<S>)>>,
}

impl<S> Default for PendingLedger<S> {
    fn default() -> Self {
        Self {
            next_generation: 0,
            targets: HashMap::new(),
        }
    }
}

impl<S> PendingLedger<S> {
    pub(crate) fn record(&mut self, target_id: i64, snapshot: S) -> Ticket {
        self.next_generation += 1;
        let generation = self.next_generation;
        self.targets
            .entry(target_id)
            .or_default()
            .push((generation, Slot::Pending(snapshot)));
        Ticket {
            target_id,
            generation,
        }
    }

    /// Settle `ticket` and decide what its outcome does to the live state.
    ///
    /// A failure restores its snapshot only when it is the newest call on
    /// the target. An older failure leaves the live state alone and passes
    /// its snapshot to its immediate successor if that call is still in
    /// flight; a successor that already succeeded made its own state the
    /// accepted one, so the snapshot is dropped.
    ///
    /// `independent` marks actions whose rollbacks commute (counter
    /// increments), which always restore their own snapshot.
    pub(crate) fn resolve(&mut self, ticket: Ticket, succeeded: bool, independent: bool) -> Resolution<S> {
        let Some(entries) = self.targets.get_mut(&ticket.target_id) else {
            return Resolution::Unknown;
        };
        let Some(pos) = entries
            .iter()
            .position(|(g, slot)| *g == ticket.generation && matches!(slot, Slot::Pending(_)))
        else {
            return Resolution::Unknown;
        };
        let Slot::Pending(snapshot) = std::mem::replace(&mut entries[pos].1, Slot::Settled) else {
            return Resolution::Unknown;
        };
        let is_newest = pos + 1 == entries.len();

        let resolution = if succeeded {
            Resolution::Confirmed(snapshot)
        } else if independent || is_newest {
            Resolution::Restore(snapshot)
        } else {
            if let Some((_, Slot::Pending(baseline))) = entries.get_mut(pos + 1) {
                *baseline = snapshot;
            }
            Resolution::Superseded
        };

        if entries.iter().all(|(_, slot)| matches!(slot, Slot::Settled)) {
            self.targets.remove(&ticket.target_id);
        }
        resolution
    }

    pub(crate) fn has_pending(&self, target_id: i64) -> bool {
        self.targets.contains_key(&target_id)
    }

    /// Number of calls still in flight.
    pub(crate) fn len(&self) -> usize {
        self.targets
            .values()
            .flatten()
            .filter(|(_, slot)| matches!(slot, Slot::Pending(_)))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newest_failure_restores() {
        let mut ledger = PendingLedger::default();
        let ticket = ledger.record(1, "before");
        assert!(ledger.has_pending(1));
        assert_eq!(ledger.resolve(ticket, false, false), Resolution::Restore("before"));
        assert!(!ledger.has_pending(1));
        assert_eq!(ledger.len(), 0);
    }

    #[test]
    fn test_success_confirms() {
        let mut ledger = PendingLedger::default();
        let ticket = ledger.record(1, "before");
        assert_eq!(ledger.resolve(ticket, true, false), Resolution::Confirmed("before"));
        assert_eq!(ledger.resolve(ticket, true, false), Resolution::Unknown);
    }

    #[test]
    fn test_stale_failure_hands_snapshot_forward() {
        let mut ledger = PendingLedger::default();
        let first = ledger.record(1, "original");
        let second = ledger.record(1, "after-first");
        assert_eq!(ledger.len(), 2);

        assert_eq!(ledger.resolve(first, false, false), Resolution::Superseded);
        assert_eq!(ledger.resolve(second, false, false), Resolution::Restore("original"));
    }

    #[test]
    fn test_stale_failure_after_newer_success() {
        let mut ledger = PendingLedger::default();
        let first = ledger.record(1, "original");
        let second = ledger.record(1, "after-first");

        assert_eq!(ledger.resolve(second, true, false), Resolution::Confirmed("after-first"));
        assert_eq!(ledger.resolve(first, false, false), Resolution::Superseded);
        assert!(!ledger.has_pending(1));
    }

    #[test]
    fn test_stale_failure_does_not_undo_accepted_successor() {
        let mut ledger = PendingLedger::default();
        let first = ledger.record(1, "original");
        let second = ledger.record(1, "after-first");
        let third = ledger.record(1, "after-second");

        assert_eq!(ledger.resolve(second, true, false), Resolution::Confirmed("after-first"));
        assert_eq!(ledger.len(), 2);
        // The successor was accepted: nothing is handed forward
        assert_eq!(ledger.resolve(first, false, false), Resolution::Superseded);
        assert_eq!(ledger.resolve(third, false, false), Resolution::Restore("after-second"));
        assert!(!ledger.has_pending(1));
    }

    #[test]
    fn test_handoff_skips_to_immediate_successor_only() {
        let mut ledger = PendingLedger::default();
        let first = ledger.record(1, "original");
        let second = ledger.record(1, "after-first");
        let third = ledger.record(1, "after-second");

        assert_eq!(ledger.resolve(first, false, false), Resolution::Superseded);
        assert_eq!(ledger.resolve(second, false, false), Resolution::Superseded);
        assert_eq!(ledger.resolve(third, false, false), Resolution::Restore("original"));
    }

    #[test]
    fn test_independent_failures_always_restore() {
        let mut ledger = PendingLedger::default();
        let first = ledger.record(1, 1);
        let _second = ledger.record(1, 2);
        assert_eq!(ledger.resolve(first, false, true), Resolution::Restore(1));
    }

    #[test]
    fn test_targets_are_tracked_separately() {
        let mut ledger = PendingLedger::default();
        let a = ledger.record(1, "a");
        let b = ledger.record(2, "b");
        assert_eq!(ledger.resolve(a, false, false), Resolution::Restore("a"));
        assert!(ledger.has_pending(2));
        assert_eq!(ledger.resolve(b, false, false), Resolution::Restore("b"));
    }
}

//! Settlement registry: the membership set under active simulation.
//!
//! The registry is an explicit object owned by a scheduler instance --
//! there is no process-wide settlement map. That keeps multiple
//! independent schedulers possible in one process (and in tests) and
//! leaves no hidden state behind when a scheduler is dropped.

use std::collections::BTreeMap;

use steading_types::{PlayerId, SettlementId, WorldId};

/// In-memory simulation state for one registered settlement.
///
/// Created on registration, mutated only by the scheduler, destroyed on
/// unregistration. Never persisted -- it is rebuilt from external state
/// when a settlement is (re)registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlementSimState {
    /// The settlement under simulation.
    pub settlement_id: SettlementId,
    /// The player who owns it.
    pub owner_id: PlayerId,
    /// The world it lives in.
    pub world_id: WorldId,
    /// The tick of the last successful cycle for this settlement.
    ///
    /// Monotonically non-decreasing; the delta to the current tick is
    /// the elapsed window fed into the production/consumption models.
    pub last_update_tick: u64,
}

/// The membership set of settlements under active simulation.
#[derive(Debug, Default)]
pub struct Registry {
    entries: BTreeMap<SettlementId, SettlementSimState>,
}

impl Registry {
    /// Create an empty registry.
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Register a settlement, starting its elapsed window at `current_tick`.
    ///
    /// Idempotent: returns `false` and leaves the existing entry (and its
    /// `last_update_tick`) untouched when the settlement is already
    /// registered.
    pub fn register(
        &mut self,
        settlement_id: SettlementId,
        owner_id: PlayerId,
        world_id: WorldId,
        current_tick: u64,
    ) -> bool {
        if self.entries.contains_key(&settlement_id) {
            return false;
        }
        self.entries.insert(
            settlement_id,
            SettlementSimState {
                settlement_id,
                owner_id,
                world_id,
                last_update_tick: current_tick,
            },
        );
        true
    }

    /// Remove a settlement from simulation.
    ///
    /// Idempotent: returns `false` when the settlement was not registered.
    pub fn unregister(&mut self, settlement_id: SettlementId) -> bool {
        self.entries.remove(&settlement_id).is_some()
    }

    /// Remove every settlement owned by a player. Returns how many were
    /// removed.
    pub fn unregister_owned(&mut self, owner_id: PlayerId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.owner_id != owner_id);
        before.saturating_sub(self.entries.len())
    }

    /// Advance a settlement's `last_update_tick` after a successful cycle.
    ///
    /// Monotonic: a tick earlier than the stored one is ignored. A
    /// settlement deregistered mid-wave is also ignored.
    pub fn advance(&mut self, settlement_id: SettlementId, tick: u64) {
        if let Some(entry) = self.entries.get_mut(&settlement_id)
            && tick > entry.last_update_tick
        {
            entry.last_update_tick = tick;
        }
    }

    /// Whether a settlement is currently registered.
    pub fn contains(&self, settlement_id: SettlementId) -> bool {
        self.entries.contains_key(&settlement_id)
    }

    /// Look up a settlement's registry entry.
    pub fn get(&self, settlement_id: SettlementId) -> Option<SettlementSimState> {
        self.entries.get(&settlement_id).copied()
    }

    /// Snapshot all entries in settlement-id order for one wave.
    pub fn snapshot(&self) -> Vec<SettlementSimState> {
        self.entries.values().copied().collect()
    }

    /// Number of registered settlements.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every entry (used when the scheduler stops).
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_is_idempotent() {
        let mut registry = Registry::new();
        let settlement = SettlementId::new();
        let owner = PlayerId::new();
        let world = WorldId::new();

        assert!(registry.register(settlement, owner, world, 10));
        assert!(!registry.register(settlement, owner, world, 99));
        assert_eq!(registry.len(), 1);
        // The original registration tick is preserved.
        assert_eq!(
            registry.get(settlement).map(|entry| entry.last_update_tick),
            Some(10)
        );
    }

    #[test]
    fn unregister_is_idempotent() {
        let mut registry = Registry::new();
        let settlement = SettlementId::new();

        assert!(!registry.unregister(settlement));
        registry.register(settlement, PlayerId::new(), WorldId::new(), 0);
        assert!(registry.unregister(settlement));
        assert!(!registry.unregister(settlement));
        assert!(registry.is_empty());
    }

    #[test]
    fn advance_is_monotonic() {
        let mut registry = Registry::new();
        let settlement = SettlementId::new();
        registry.register(settlement, PlayerId::new(), WorldId::new(), 5);

        registry.advance(settlement, 60);
        assert_eq!(
            registry.get(settlement).map(|entry| entry.last_update_tick),
            Some(60)
        );

        // Stale ticks never move the counter backwards.
        registry.advance(settlement, 30);
        assert_eq!(
            registry.get(settlement).map(|entry| entry.last_update_tick),
            Some(60)
        );
    }

    #[test]
    fn advance_on_unknown_settlement_is_a_no_op() {
        let mut registry = Registry::new();
        registry.advance(SettlementId::new(), 100);
        assert!(registry.is_empty());
    }

    #[test]
    fn unregister_owned_removes_only_that_player() {
        let mut registry = Registry::new();
        let keeper = PlayerId::new();
        let leaver = PlayerId::new();
        let world = WorldId::new();

        registry.register(SettlementId::new(), keeper, world, 0);
        registry.register(SettlementId::new(), leaver, world, 0);
        registry.register(SettlementId::new(), leaver, world, 0);

        assert_eq!(registry.unregister_owned(leaver), 2);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.unregister_owned(leaver), 0);
    }

    #[test]
    fn snapshot_is_ordered_and_detached() {
        let mut registry = Registry::new();
        for _ in 0..5 {
            registry.register(SettlementId::new(), PlayerId::new(), WorldId::new(), 0);
        }
        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 5);
        let mut ids: Vec<_> = snapshot.iter().map(|entry| entry.settlement_id).collect();
        ids.dedup();
        assert_eq!(ids.len(), 5);

        registry.clear();
        assert!(registry.is_empty());
        // The snapshot is unaffected by the clear.
        assert_eq!(snapshot.len(), 5);
    }
}

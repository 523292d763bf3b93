//! The settlement store trait and an in-memory implementation.
//!
//! The scheduler reaches the game's persistent state only through the
//! narrow [`SettlementStore`] interface -- it never knows which engine
//! backs it. Production deployments use the `PostgreSQL` implementation
//! from `steading-store`; tests and local runs use [`MemoryStore`].
//!
//! Trait methods return `impl Future + Send` so scheduler waves can run
//! store calls concurrently from a spawned task; implementations write
//! them as plain `async fn`s.

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;

use tokio::sync::RwLock;

use steading_types::{
    PlayerId, PopulationState, ResourceAmounts, SettlementDetail, SettlementId, StorageId,
    Structure,
};

/// Errors that can occur in a settlement store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The storage engine failed (connection loss, query failure, ...).
    #[error("store backend error: {message}")]
    Backend {
        /// Description from the underlying engine.
        message: String,
    },

    /// A record that must exist for the operation was not found.
    #[error("record not found: {what}")]
    NotFound {
        /// Description of the missing record.
        what: String,
    },
}

/// Narrow query/update interface to the game's persistent state.
///
/// Implementations must be cheap to call concurrently: one scheduler
/// batch issues up to `batch_size` overlapping calls.
pub trait SettlementStore: Send + Sync {
    /// List the active settlements owned by a player.
    fn list_owned_settlements(
        &self,
        owner: PlayerId,
    ) -> impl Future<Output = Result<Vec<SettlementId>, StoreError>> + Send;

    /// Fetch the full settlement detail, or `None` if the settlement
    /// row itself is gone.
    fn fetch_detail(
        &self,
        settlement: SettlementId,
    ) -> impl Future<Output = Result<Option<SettlementDetail>, StoreError>> + Send;

    /// Fetch the structure snapshot for a settlement, with modifiers.
    fn fetch_structures(
        &self,
        settlement: SettlementId,
    ) -> impl Future<Output = Result<Vec<Structure>, StoreError>> + Send;

    /// Fetch the population record for a settlement, if one exists.
    fn fetch_population(
        &self,
        settlement: SettlementId,
    ) -> impl Future<Output = Result<Option<PopulationState>, StoreError>> + Send;

    /// Replace the population record for a settlement.
    fn update_population(
        &self,
        settlement: SettlementId,
        record: PopulationState,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Replace the stored amounts of a storage record.
    fn update_storage(
        &self,
        storage: StorageId,
        amounts: ResourceAmounts,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Mutable state behind the in-memory store's lock.
#[derive(Debug, Default)]
struct MemoryInner {
    details: BTreeMap<SettlementId, SettlementDetail>,
    structures: BTreeMap<SettlementId, Vec<Structure>>,
    populations: BTreeMap<SettlementId, PopulationState>,
    owners: BTreeMap<PlayerId, Vec<SettlementId>>,
    /// Settlements whose detail fetch fails with a backend error.
    failing_details: BTreeSet<SettlementId>,
    /// Count of storage updates per storage record, for assertions.
    storage_updates: BTreeMap<StorageId, u64>,
}

/// An in-memory [`SettlementStore`] used by tests and local runs.
///
/// Seed it with [`insert_settlement`], then point a scheduler at it.
/// Detail fetches can be made to fail per settlement with
/// [`fail_detail_fetches`], which is how batch-isolation behavior is
/// exercised end to end.
///
/// [`insert_settlement`]: MemoryStore::insert_settlement
/// [`fail_detail_fetches`]: MemoryStore::fail_detail_fetches
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryInner>,
}

impl MemoryStore {
    /// Create an empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a settlement with its detail, structures, and population.
    pub async fn insert_settlement(
        &self,
        detail: SettlementDetail,
        structures: Vec<Structure>,
        population: Option<PopulationState>,
    ) {
        let mut inner = self.inner.write().await;
        let settlement_id = detail.settlement.id;
        inner
            .owners
            .entry(detail.settlement.owner_id)
            .or_default()
            .push(settlement_id);
        inner.structures.insert(settlement_id, structures);
        if let Some(record) = population {
            inner.populations.insert(settlement_id, record);
        }
        inner.details.insert(settlement_id, detail);
    }

    /// Remove a settlement entirely (detail fetches return `None`).
    pub async fn remove_settlement(&self, settlement: SettlementId) {
        let mut inner = self.inner.write().await;
        inner.details.remove(&settlement);
        inner.structures.remove(&settlement);
        inner.populations.remove(&settlement);
    }

    /// Make detail fetches for a settlement fail with a backend error.
    pub async fn fail_detail_fetches(&self, settlement: SettlementId, failing: bool) {
        let mut inner = self.inner.write().await;
        if failing {
            inner.failing_details.insert(settlement);
        } else {
            inner.failing_details.remove(&settlement);
        }
    }

    /// Read back the current stored amounts for a settlement.
    pub async fn storage_amounts(&self, settlement: SettlementId) -> Option<ResourceAmounts> {
        let inner = self.inner.read().await;
        inner
            .details
            .get(&settlement)
            .and_then(|detail| detail.storage.as_ref())
            .map(|storage| storage.amounts)
    }

    /// Read back the current population record for a settlement.
    pub async fn population(&self, settlement: SettlementId) -> Option<PopulationState> {
        let inner = self.inner.read().await;
        inner.populations.get(&settlement).cloned()
    }

    /// How many times a storage record has been written.
    pub async fn storage_update_count(&self, storage: StorageId) -> u64 {
        let inner = self.inner.read().await;
        inner.storage_updates.get(&storage).copied().unwrap_or(0)
    }
}

impl SettlementStore for MemoryStore {
    async fn list_owned_settlements(
        &self,
        owner: PlayerId,
    ) -> Result<Vec<SettlementId>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.owners.get(&owner).cloned().unwrap_or_default())
    }

    async fn fetch_detail(
        &self,
        settlement: SettlementId,
    ) -> Result<Option<SettlementDetail>, StoreError> {
        let inner = self.inner.read().await;
        if inner.failing_details.contains(&settlement) {
            return Err(StoreError::Backend {
                message: format!("injected failure fetching settlement {settlement}"),
            });
        }
        Ok(inner.details.get(&settlement).cloned())
    }

    async fn fetch_structures(
        &self,
        settlement: SettlementId,
    ) -> Result<Vec<Structure>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.structures.get(&settlement).cloned().unwrap_or_default())
    }

    async fn fetch_population(
        &self,
        settlement: SettlementId,
    ) -> Result<Option<PopulationState>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.populations.get(&settlement).cloned())
    }

    async fn update_population(
        &self,
        settlement: SettlementId,
        record: PopulationState,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.populations.insert(settlement, record);
        Ok(())
    }

    async fn update_storage(
        &self,
        storage: StorageId,
        amounts: ResourceAmounts,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let count = inner.storage_updates.entry(storage).or_insert(0);
        *count = count.saturating_add(1);

        for detail in inner.details.values_mut() {
            if let Some(record) = detail.storage.as_mut()
                && record.id == storage
            {
                record.amounts = amounts;
                return Ok(());
            }
        }
        Err(StoreError::NotFound {
            what: format!("storage record {storage}"),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;
    use steading_types::{Biome, Plot, PlotId, Settlement, SettlementStorage, WorldId};

    use super::*;

    fn make_detail(owner: PlayerId) -> SettlementDetail {
        let settlement_id = SettlementId::new();
        SettlementDetail {
            settlement: Settlement {
                id: settlement_id,
                owner_id: owner,
                world_id: WorldId::new(),
                name: String::from("Fernvale"),
                founded_at: Utc::now(),
            },
            storage: Some(SettlementStorage {
                id: StorageId::new(),
                settlement_id,
                amounts: ResourceAmounts::ZERO,
            }),
            plot: Some(Plot {
                id: PlotId::new(),
                area: Decimal::from(100),
                base_yields: ResourceAmounts::ZERO,
            }),
            biome: Some(Biome::Plains),
        }
    }

    #[tokio::test]
    async fn fetch_round_trips_seeded_settlement() {
        let store = MemoryStore::new();
        let owner = PlayerId::new();
        let detail = make_detail(owner);
        let settlement_id = detail.settlement.id;

        store.insert_settlement(detail.clone(), Vec::new(), None).await;

        let fetched = store.fetch_detail(settlement_id).await.unwrap();
        assert_eq!(fetched, Some(detail));
        assert_eq!(
            store.list_owned_settlements(owner).await.unwrap(),
            vec![settlement_id]
        );
        assert!(store.fetch_population(settlement_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_settlement_fetches_none() {
        let store = MemoryStore::new();
        let fetched = store.fetch_detail(SettlementId::new()).await.unwrap();
        assert!(fetched.is_none());
    }

    #[tokio::test]
    async fn injected_failure_is_a_backend_error() {
        let store = MemoryStore::new();
        let detail = make_detail(PlayerId::new());
        let settlement_id = detail.settlement.id;
        store.insert_settlement(detail, Vec::new(), None).await;

        store.fail_detail_fetches(settlement_id, true).await;
        assert!(matches!(
            store.fetch_detail(settlement_id).await,
            Err(StoreError::Backend { .. })
        ));

        store.fail_detail_fetches(settlement_id, false).await;
        assert!(store.fetch_detail(settlement_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn update_storage_replaces_amounts() {
        let store = MemoryStore::new();
        let detail = make_detail(PlayerId::new());
        let settlement_id = detail.settlement.id;
        let storage_id = detail.storage.as_ref().unwrap().id;
        store.insert_settlement(detail, Vec::new(), None).await;

        let mut amounts = ResourceAmounts::ZERO;
        amounts.food = Decimal::from(12);
        store.update_storage(storage_id, amounts).await.unwrap();

        assert_eq!(store.storage_amounts(settlement_id).await, Some(amounts));
        assert_eq!(store.storage_update_count(storage_id).await, 1);
    }

    #[tokio::test]
    async fn update_unknown_storage_is_not_found() {
        let store = MemoryStore::new();
        let result = store
            .update_storage(StorageId::new(), ResourceAmounts::ZERO)
            .await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }
}

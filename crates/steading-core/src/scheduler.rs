//! The tick scheduler: fixed-cadence driver for settlement simulation.
//!
//! One scheduler owns one [`Registry`] and drives it from a single loop
//! task -- there is no process-global state, so independent schedulers
//! can coexist (and do, in tests). The loop runs one `tokio` interval at
//! the configured tick rate; on coarse-period ticks it takes a registry
//! snapshot and processes it as a **wave** of fixed-size **batches**:
//! batches strictly in sequence, the settlements inside a batch
//! concurrently. Peak concurrent store calls are therefore bounded by
//! the batch size.
//!
//! Waves run inline in the loop task and the interval skips missed
//! ticks, so two waves can never overlap; a slow wave delays later
//! ticks instead of racing them.
//!
//! Failure isolation: an error in one settlement's cycle is caught at
//! the cycle boundary, logged with settlement id and tick, and never
//! affects the rest of the batch. The failed settlement's
//! `last_update_tick` stays put, so the same elapsed window is retried
//! on the next wave. Settlements with structurally incomplete data are
//! deregistered instead and must be re-registered by a collaborator.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use steading_sim::RatesConfig;
use steading_types::{PlayerId, SettlementId, WorldId};

use crate::config::{ConfigError, SchedulerConfig};
use crate::cycle::{self, CycleContext, CycleError};
use crate::events::EventBus;
use crate::registry::Registry;
use crate::store::{SettlementStore, StoreError};

/// Snapshot of the scheduler's state for collaborators.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SchedulerStatus {
    /// Whether the tick loop is running.
    pub running: bool,
    /// The current tick counter.
    pub current_tick: u64,
    /// Number of settlements under active simulation.
    pub active_count: usize,
    /// Configured ticks per second.
    pub tick_rate: u32,
    /// When the scheduler was last started, if ever.
    pub started_at: Option<DateTime<Utc>>,
    /// Seconds since the last start (0 when stopped).
    pub uptime_seconds: u64,
}

/// State shared between the scheduler handle and its loop task.
#[derive(Debug)]
struct SchedulerInner<S> {
    store: Arc<S>,
    bus: Arc<EventBus>,
    config: SchedulerConfig,
    rates: RatesConfig,
    running: AtomicBool,
    current_tick: AtomicU64,
    started_at: Mutex<Option<DateTime<Utc>>>,
    registry: Mutex<Registry>,
    stop: Notify,
}

/// The tick scheduler.
///
/// Cheap to share behind an [`Arc`]; all control-surface methods take
/// `&self`.
#[derive(Debug)]
pub struct Scheduler<S> {
    inner: Arc<SchedulerInner<S>>,
    loop_handle: Mutex<Option<JoinHandle<()>>>,
}

impl<S: SettlementStore + 'static> Scheduler<S> {
    /// Create a stopped scheduler over a store and an event bus.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the scheduler configuration
    /// fails validation.
    pub fn new(
        store: Arc<S>,
        bus: Arc<EventBus>,
        config: SchedulerConfig,
        rates: RatesConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(SchedulerInner {
                store,
                bus,
                config,
                rates,
                running: AtomicBool::new(false),
                current_tick: AtomicU64::new(0),
                started_at: Mutex::new(None),
                registry: Mutex::new(Registry::new()),
                stop: Notify::new(),
            }),
            loop_handle: Mutex::new(None),
        })
    }

    /// The event bus this scheduler publishes on.
    pub fn bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.inner.bus)
    }

    /// Start the tick loop.
    ///
    /// Starting a running scheduler is a logged no-op.
    pub async fn start(&self) {
        if self.inner.running.swap(true, Ordering::AcqRel) {
            warn!("Scheduler already running; start ignored");
            return;
        }

        *self.inner.started_at.lock().await = Some(Utc::now());
        info!(
            tick_rate = self.inner.config.tick_rate,
            coarse_period_ticks = self.inner.config.coarse_period(),
            population_period_ticks = self.inner.config.population_period_ticks,
            batch_size = self.inner.config.batch_size,
            "Scheduler started"
        );

        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(run_loop(inner));
        *self.loop_handle.lock().await = Some(handle);
    }

    /// Stop the tick loop and clear the registry.
    ///
    /// Stopping a stopped scheduler is a logged no-op. A wave already in
    /// flight finishes its outstanding store writes; no new wave starts.
    pub async fn stop(&self) {
        if !self.inner.running.swap(false, Ordering::AcqRel) {
            warn!("Scheduler not running; stop ignored");
            return;
        }

        self.inner.stop.notify_one();

        let cleared = {
            let mut registry = self.inner.registry.lock().await;
            let count = registry.len();
            registry.clear();
            count
        };

        let handle = self.loop_handle.lock().await.take();
        if let Some(handle) = handle
            && let Err(error) = handle.await
        {
            warn!(%error, "Scheduler loop task failed");
        }

        info!(
            cleared,
            tick = self.inner.current_tick.load(Ordering::Acquire),
            "Scheduler stopped"
        );
    }

    /// Register a settlement for simulation. Idempotent.
    ///
    /// Returns `true` if the settlement was newly registered.
    pub async fn register(
        &self,
        settlement_id: SettlementId,
        owner_id: PlayerId,
        world_id: WorldId,
    ) -> bool {
        let tick = self.inner.current_tick.load(Ordering::Acquire);
        let added = self
            .inner
            .registry
            .lock()
            .await
            .register(settlement_id, owner_id, world_id, tick);
        if added {
            debug!(settlement_id = %settlement_id, tick, "Settlement registered");
        } else {
            debug!(settlement_id = %settlement_id, "Settlement already registered");
        }
        added
    }

    /// Remove a settlement from simulation. Idempotent.
    ///
    /// Returns `true` if the settlement had been registered.
    pub async fn unregister(&self, settlement_id: SettlementId) -> bool {
        let removed = self.inner.registry.lock().await.unregister(settlement_id);
        if removed {
            debug!(settlement_id = %settlement_id, "Settlement unregistered");
        }
        removed
    }

    /// Register every settlement a player owns (used on world join).
    ///
    /// Returns how many settlements were newly registered.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the ownership query fails; no partial
    /// registrations are rolled back.
    pub async fn register_owned(
        &self,
        owner_id: PlayerId,
        world_id: WorldId,
    ) -> Result<usize, StoreError> {
        let settlements = self.inner.store.list_owned_settlements(owner_id).await?;
        let tick = self.inner.current_tick.load(Ordering::Acquire);
        let mut registry = self.inner.registry.lock().await;
        let mut added = 0_usize;
        for settlement_id in settlements {
            if registry.register(settlement_id, owner_id, world_id, tick) {
                added = added.saturating_add(1);
            }
        }
        info!(owner_id = %owner_id, added, "Registered player settlements");
        Ok(added)
    }

    /// Remove every settlement a player owns (used on world leave).
    ///
    /// Returns how many settlements were removed.
    pub async fn unregister_owned(&self, owner_id: PlayerId) -> usize {
        let removed = self.inner.registry.lock().await.unregister_owned(owner_id);
        if removed > 0 {
            info!(owner_id = %owner_id, removed, "Unregistered player settlements");
        }
        removed
    }

    /// Report the scheduler's current status.
    pub async fn status(&self) -> SchedulerStatus {
        let running = self.inner.running.load(Ordering::Acquire);
        let started_at = *self.inner.started_at.lock().await;
        let uptime_seconds = if running {
            started_at.map_or(0, |start| {
                let elapsed = Utc::now().signed_duration_since(start).num_seconds();
                u64::try_from(elapsed.max(0)).unwrap_or(u64::MAX)
            })
        } else {
            0
        };
        SchedulerStatus {
            running,
            current_tick: self.inner.current_tick.load(Ordering::Acquire),
            active_count: self.inner.registry.lock().await.len(),
            tick_rate: self.inner.config.tick_rate,
            started_at,
            uptime_seconds,
        }
    }

    /// Run the wave for one tick directly, bypassing the timer.
    ///
    /// This is the same code path the loop task drives; it is public so
    /// tests (and operational tooling) can step the scheduler
    /// deterministically without real-time waits. Ticks that are not on
    /// a coarse-period boundary return immediately.
    pub async fn run_wave(&self, tick: u64) {
        run_wave_inner(&self.inner, tick).await;
    }

    /// The last tick the registry believes a settlement completed.
    ///
    /// `None` when the settlement is not registered.
    pub async fn last_update_tick(&self, settlement_id: SettlementId) -> Option<u64> {
        self.inner
            .registry
            .lock()
            .await
            .get(settlement_id)
            .map(|entry| entry.last_update_tick)
    }
}

/// The scheduler loop task: one interval, waves inline.
async fn run_loop<S: SettlementStore + 'static>(inner: Arc<SchedulerInner<S>>) {
    let interval_duration = Duration::from_secs(1)
        .checked_div(inner.config.tick_rate)
        .unwrap_or_else(|| Duration::from_millis(16));
    let mut interval = tokio::time::interval(interval_duration);
    // A wave that overruns the tick interval delays later ticks rather
    // than stacking waves on top of each other.
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            () = inner.stop.notified() => break,
            _ = interval.tick() => {
                if !inner.running.load(Ordering::Acquire) {
                    break;
                }
                let tick = inner
                    .current_tick
                    .fetch_add(1, Ordering::AcqRel)
                    .saturating_add(1);
                run_wave_inner(&inner, tick).await;
            }
        }
    }
    debug!("Scheduler loop exited");
}

/// Process one tick: status log, coarse-period gate, then the wave.
async fn run_wave_inner<S: SettlementStore>(inner: &SchedulerInner<S>, tick: u64) {
    if tick.checked_rem(inner.config.status_log_interval()) == Some(0) {
        let active = inner.registry.lock().await.len();
        info!(
            tick,
            active,
            tick_rate = inner.config.tick_rate,
            "Scheduler status"
        );
    }

    if tick.checked_rem(inner.config.coarse_period()) != Some(0) {
        return;
    }

    let snapshot = inner.registry.lock().await.snapshot();
    if snapshot.is_empty() {
        return;
    }

    let evaluate_population =
        tick.checked_rem(inner.config.population_period_ticks) == Some(0);
    let ctx = CycleContext {
        store: inner.store.as_ref(),
        bus: inner.bus.as_ref(),
        scheduler: &inner.config,
        rates: &inner.rates,
    };

    let mut processed = 0_usize;
    let mut failed = 0_usize;
    let mut dropped = 0_usize;

    for batch in snapshot.chunks(inner.config.batch_size.max(1)) {
        let results = join_all(batch.iter().map(|entry| {
            cycle::run_settlement_cycle(&ctx, *entry, tick, evaluate_population)
        }))
        .await;

        for (entry, result) in batch.iter().zip(results) {
            match result {
                Ok(outcome) => {
                    inner
                        .registry
                        .lock()
                        .await
                        .advance(entry.settlement_id, tick);
                    processed = processed.saturating_add(1);
                    debug!(
                        tick,
                        settlement_id = %outcome.settlement_id,
                        events = outcome.events_published,
                        "Settlement cycle complete"
                    );
                }
                Err(CycleError::IncompleteData { missing, .. }) => {
                    warn!(
                        tick,
                        settlement_id = %entry.settlement_id,
                        missing,
                        "Settlement has incomplete data; deregistering"
                    );
                    inner
                        .registry
                        .lock()
                        .await
                        .unregister(entry.settlement_id);
                    dropped = dropped.saturating_add(1);
                }
                Err(error) => {
                    warn!(
                        tick,
                        settlement_id = %entry.settlement_id,
                        %error,
                        "Settlement cycle failed; elapsed window will be retried"
                    );
                    failed = failed.saturating_add(1);
                }
            }
        }
    }

    debug!(tick, processed, failed, dropped, evaluate_population, "Wave complete");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use steading_types::{
        Biome, Plot, PlotId, PopulationState, ResourceAmounts, Settlement, SettlementDetail,
        SettlementStorage, StorageId, Structure, StructureId, StructureKind, StructureModifier,
        modifier_names,
    };

    use super::*;
    use crate::store::MemoryStore;

    fn make_detail(owner_id: PlayerId, world_id: WorldId) -> SettlementDetail {
        let settlement_id = SettlementId::new();
        let mut amounts = ResourceAmounts::ZERO;
        amounts.food = Decimal::from(50);
        amounts.water = Decimal::from(50);
        let mut base_yields = ResourceAmounts::ZERO;
        base_yields.food = Decimal::from(10);
        SettlementDetail {
            settlement: Settlement {
                id: settlement_id,
                owner_id,
                world_id,
                name: String::from("Fernvale"),
                founded_at: Utc::now(),
            },
            storage: Some(SettlementStorage {
                id: StorageId::new(),
                settlement_id,
                amounts,
            }),
            plot: Some(Plot {
                id: PlotId::new(),
                area: Decimal::from(100),
                base_yields,
            }),
            biome: Some(Biome::Plains),
        }
    }

    fn farm() -> Structure {
        Structure {
            id: StructureId::new(),
            name: String::from("River Farm"),
            kind: StructureKind::Farm,
            modifiers: vec![StructureModifier {
                name: String::from(modifier_names::LEVEL),
                value: Decimal::ONE,
            }],
        }
    }

    fn make_scheduler(store: Arc<MemoryStore>) -> Scheduler<MemoryStore> {
        Scheduler::new(
            store,
            Arc::new(EventBus::new()),
            SchedulerConfig::default(),
            RatesConfig::default(),
        )
        .unwrap()
    }

    async fn seed_settlement(
        store: &MemoryStore,
        owner_id: PlayerId,
        world_id: WorldId,
    ) -> SettlementId {
        let detail = make_detail(owner_id, world_id);
        let settlement_id = detail.settlement.id;
        store.insert_settlement(detail, vec![farm()], None).await;
        settlement_id
    }

    #[tokio::test]
    async fn register_and_unregister_are_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let scheduler = make_scheduler(Arc::clone(&store));
        let settlement = SettlementId::new();
        let owner = PlayerId::new();
        let world = WorldId::new();

        assert!(scheduler.register(settlement, owner, world).await);
        assert!(!scheduler.register(settlement, owner, world).await);
        assert_eq!(scheduler.status().await.active_count, 1);

        assert!(scheduler.unregister(settlement).await);
        assert!(!scheduler.unregister(settlement).await);
        assert_eq!(scheduler.status().await.active_count, 0);
    }

    #[tokio::test]
    async fn start_twice_and_stop_twice_are_no_ops() {
        let store = Arc::new(MemoryStore::new());
        let scheduler = make_scheduler(store);

        scheduler.start().await;
        assert!(scheduler.status().await.running);
        // Second start is a logged no-op, not a second loop.
        scheduler.start().await;
        assert!(scheduler.status().await.running);

        scheduler.stop().await;
        assert!(!scheduler.status().await.running);
        // Second stop is a logged no-op.
        scheduler.stop().await;
        assert!(!scheduler.status().await.running);
    }

    #[tokio::test]
    async fn stop_clears_the_registry() {
        let store = Arc::new(MemoryStore::new());
        let scheduler = make_scheduler(store);
        scheduler
            .register(SettlementId::new(), PlayerId::new(), WorldId::new())
            .await;

        scheduler.start().await;
        scheduler.stop().await;
        assert_eq!(scheduler.status().await.active_count, 0);
    }

    #[tokio::test]
    async fn non_coarse_tick_is_skipped() {
        let store = Arc::new(MemoryStore::new());
        let owner = PlayerId::new();
        let world = WorldId::new();
        let settlement = seed_settlement(&store, owner, world).await;
        let scheduler = make_scheduler(Arc::clone(&store));
        scheduler.register(settlement, owner, world).await;

        // Tick 30 is not a multiple of the coarse period (60).
        scheduler.run_wave(30).await;
        assert_eq!(scheduler.last_update_tick(settlement).await, Some(0));

        scheduler.run_wave(60).await;
        assert_eq!(scheduler.last_update_tick(settlement).await, Some(60));
    }

    #[tokio::test]
    async fn batch_isolation_on_failure() {
        let store = Arc::new(MemoryStore::new());
        let owner = PlayerId::new();
        let world = WorldId::new();
        let a = seed_settlement(&store, owner, world).await;
        let b = seed_settlement(&store, owner, world).await;
        let c = seed_settlement(&store, owner, world).await;
        store.fail_detail_fetches(b, true).await;

        let scheduler = make_scheduler(Arc::clone(&store));
        scheduler.register(a, owner, world).await;
        scheduler.register(b, owner, world).await;
        scheduler.register(c, owner, world).await;

        scheduler.run_wave(60).await;

        // A and C advanced; B failed but stays registered and unadvanced.
        assert_eq!(scheduler.last_update_tick(a).await, Some(60));
        assert_eq!(scheduler.last_update_tick(c).await, Some(60));
        assert_eq!(scheduler.last_update_tick(b).await, Some(0));
        assert_eq!(scheduler.status().await.active_count, 3);

        // Once the store recovers, B catches up over the full window.
        store.fail_detail_fetches(b, false).await;
        scheduler.run_wave(120).await;
        assert_eq!(scheduler.last_update_tick(b).await, Some(120));
    }

    #[tokio::test]
    async fn incomplete_data_deregisters() {
        let store = Arc::new(MemoryStore::new());
        let owner = PlayerId::new();
        let world = WorldId::new();
        let detail = make_detail(owner, world);
        let settlement = detail.settlement.id;
        let mut broken = detail;
        broken.plot = None;
        store.insert_settlement(broken, Vec::new(), None).await;

        let scheduler = make_scheduler(Arc::clone(&store));
        scheduler.register(settlement, owner, world).await;

        scheduler.run_wave(60).await;
        assert_eq!(scheduler.status().await.active_count, 0);

        // Not retried: the next wave has nothing to process.
        scheduler.run_wave(120).await;
        assert_eq!(scheduler.status().await.active_count, 0);
    }

    #[tokio::test]
    async fn bulk_register_and_unregister_by_owner() {
        let store = Arc::new(MemoryStore::new());
        let owner = PlayerId::new();
        let world = WorldId::new();
        let first = seed_settlement(&store, owner, world).await;
        let _second = seed_settlement(&store, owner, world).await;

        let scheduler = make_scheduler(Arc::clone(&store));
        let added = scheduler.register_owned(owner, world).await.unwrap();
        assert_eq!(added, 2);

        // Re-joining is idempotent.
        let added_again = scheduler.register_owned(owner, world).await.unwrap();
        assert_eq!(added_again, 0);
        assert!(scheduler.last_update_tick(first).await.is_some());

        let removed = scheduler.unregister_owned(owner).await;
        assert_eq!(removed, 2);
        assert_eq!(scheduler.status().await.active_count, 0);
    }

    #[tokio::test]
    async fn wave_emits_resource_updates_per_settlement() {
        let store = Arc::new(MemoryStore::new());
        let owner = PlayerId::new();
        let world = WorldId::new();
        let a = seed_settlement(&store, owner, world).await;
        let b = seed_settlement(&store, owner, world).await;

        let scheduler = make_scheduler(Arc::clone(&store));
        let bus = scheduler.bus();
        let mut receiver = bus.subscribe(world).await;
        scheduler.register(a, owner, world).await;
        scheduler.register(b, owner, world).await;

        scheduler.run_wave(60).await;

        let mut updated = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            if event.kind() == "resource-update" {
                updated.push(event.settlement_id);
            }
        }
        updated.sort();
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(updated, expected);
    }

    #[tokio::test]
    async fn population_runs_only_on_its_period() {
        let store = Arc::new(MemoryStore::new());
        let owner = PlayerId::new();
        let world = WorldId::new();
        let detail = make_detail(owner, world);
        let settlement = detail.settlement.id;
        store
            .insert_settlement(
                detail,
                vec![farm()],
                Some(PopulationState {
                    current: 10,
                    capacity: 20,
                    happiness: Decimal::from(80),
                    growth_rate: Decimal::ZERO,
                    immigration_chance: Decimal::ZERO,
                    emigration_chance: Decimal::ZERO,
                    last_growth_at: Utc::now(),
                }),
            )
            .await;

        let scheduler = make_scheduler(Arc::clone(&store));
        let bus = scheduler.bus();
        let mut receiver = bus.subscribe(world).await;
        scheduler.register(settlement, owner, world).await;

        // A coarse tick off the population period: no population events.
        scheduler.run_wave(60).await;
        let mut kinds = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            kinds.push(event.kind());
        }
        assert!(!kinds.contains(&"population-state"));

        // The population period tick evaluates and summarizes.
        scheduler.run_wave(36_000).await;
        let mut kinds = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            kinds.push(event.kind());
        }
        assert!(kinds.contains(&"population-state"));
    }

    #[tokio::test]
    async fn loop_task_processes_waves_in_real_time() {
        let store = Arc::new(MemoryStore::new());
        let owner = PlayerId::new();
        let world = WorldId::new();
        let settlement = seed_settlement(&store, owner, world).await;

        // 100 ticks/second with a wave on every tick keeps the test fast.
        let config = SchedulerConfig {
            tick_rate: 100,
            coarse_period_ticks: Some(1),
            ..SchedulerConfig::default()
        };
        let scheduler = Scheduler::new(
            Arc::clone(&store),
            Arc::new(EventBus::new()),
            config,
            RatesConfig::default(),
        )
        .unwrap();

        scheduler.register(settlement, owner, world).await;
        scheduler.start().await;
        tokio::time::sleep(Duration::from_millis(120)).await;
        scheduler.stop().await;

        let status = scheduler.status().await;
        assert!(!status.running);
        assert!(status.current_tick > 0);
    }
}

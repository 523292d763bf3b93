//! The per-settlement simulation cycle.
//!
//! One cycle runs the full model chain for a single settlement:
//!
//! 1. **Fetch** -- settlement detail and structure snapshot from the store.
//! 2. **Produce** -- extractor output over the elapsed tick window.
//! 3. **Consume** -- population and structure upkeep over the same window.
//! 4. **Settle** -- net flow against storage capacity: waste attribution,
//!    clamping, persistence of the final stock.
//! 5. **Signal** -- `resource-update` always, plus `resource-waste`,
//!    `storage-warning`, and `resource-shortage` when their conditions hold.
//! 6. **Population** -- on evaluation ticks only, the stochastic
//!    population dynamics step with its own event family.
//!
//! A cycle is self-contained: it touches exactly one settlement's
//! persisted records, so cycles within a batch can run concurrently
//! without cross-settlement locking.

use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use tracing::debug;

use steading_sim::config::RatesConfig;
use steading_sim::error::SimError;
use steading_sim::{consumption, population, production, storage};
use steading_types::{
    PopulationState, SettlementId, SimEvent, SimEventPayload, Structure, WorldId,
};

use crate::config::SchedulerConfig;
use crate::events::EventBus;
use crate::registry::SettlementSimState;
use crate::store::{SettlementStore, StoreError};

/// Errors that can occur during a per-settlement cycle.
#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    /// A store operation failed.
    #[error("store error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: StoreError,
    },

    /// A simulation model computation failed.
    #[error("simulation error: {source}")]
    Sim {
        /// The underlying model error.
        #[from]
        source: SimError,
    },

    /// The settlement's detail is missing a required sub-record.
    ///
    /// The scheduler deregisters the settlement on this error; it is not
    /// retried until a collaborator re-registers it.
    #[error("settlement {settlement_id} has incomplete data: missing {missing}")]
    IncompleteData {
        /// The settlement with incomplete data.
        settlement_id: SettlementId,
        /// Which sub-record was missing.
        missing: &'static str,
    },
}

/// Summary of one completed settlement cycle.
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    /// The settlement that was processed.
    pub settlement_id: SettlementId,
    /// The elapsed tick window the models were run over.
    pub elapsed_ticks: u64,
    /// How many events were published.
    pub events_published: usize,
    /// Whether the population dynamics step ran.
    pub population_evaluated: bool,
}

/// Shared, read-only context for the cycles of one wave.
#[derive(Debug)]
pub struct CycleContext<'a, S> {
    /// The settlement store.
    pub store: &'a S,
    /// The event bus.
    pub bus: &'a EventBus,
    /// Scheduler configuration (tick rate, periods, seed).
    pub scheduler: &'a SchedulerConfig,
    /// Model rates.
    pub rates: &'a RatesConfig,
}

/// Derive the seed for one settlement's migration trials.
///
/// Mixes the configured base seed with the settlement identity and the
/// evaluation tick, so draws are independent across settlements and
/// evaluations but fully reproducible for a given configuration.
fn migration_rng_seed(base: u64, settlement_id: SettlementId, tick: u64) -> u64 {
    let (hi, lo) = settlement_id.into_inner().as_u64_pair();
    base ^ hi.rotate_left(17)
        ^ lo.rotate_right(11)
        ^ tick.wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// Publish one event for a settlement on its world channel.
async fn publish(
    bus: &EventBus,
    world_id: WorldId,
    settlement_id: SettlementId,
    occurred_at: DateTime<Utc>,
    payload: SimEventPayload,
) {
    bus.publish(SimEvent {
        world_id,
        settlement_id,
        occurred_at,
        payload,
    })
    .await;
}

/// Run one full simulation cycle for a settlement.
///
/// On success the caller advances the settlement's `last_update_tick` to
/// `tick`. On [`CycleError::IncompleteData`] the caller deregisters the
/// settlement. On any other error the caller leaves `last_update_tick`
/// unchanged so the same elapsed window is retried next cycle.
///
/// # Errors
///
/// Returns [`CycleError`] as described above; no error escapes the wave.
#[allow(clippy::too_many_lines)]
pub async fn run_settlement_cycle<S: SettlementStore>(
    ctx: &CycleContext<'_, S>,
    entry: SettlementSimState,
    tick: u64,
    evaluate_population: bool,
) -> Result<CycleOutcome, CycleError> {
    let settlement_id = entry.settlement_id;

    // 1. Fetch detail; deregister on anything structurally missing.
    let detail = ctx
        .store
        .fetch_detail(settlement_id)
        .await?
        .ok_or(CycleError::IncompleteData {
            settlement_id,
            missing: "settlement",
        })?;
    let storage_record = detail
        .storage
        .clone()
        .ok_or(CycleError::IncompleteData {
            settlement_id,
            missing: "storage",
        })?;
    let plot = detail.plot.clone().ok_or(CycleError::IncompleteData {
        settlement_id,
        missing: "plot",
    })?;
    let world_id = detail.settlement.world_id;

    let structures = ctx.store.fetch_structures(settlement_id).await?;
    let elapsed_ticks = tick.saturating_sub(entry.last_update_tick);

    // 2. Production over the elapsed window.
    let production = production::produce(
        &plot,
        &structures,
        elapsed_ticks,
        detail.biome,
        ctx.scheduler.tick_rate,
        ctx.rates,
    )?;

    // 3. Consumption for the current population and structure count.
    let population_record = ctx.store.fetch_population(settlement_id).await?;
    let population_count = population_record.as_ref().map_or(0, |record| record.current);
    let consumption = consumption::consume(
        population_count,
        structures.len(),
        elapsed_ticks,
        ctx.scheduler.tick_rate,
        ctx.rates,
    )?;

    // 4. Net flow against capacity: waste first, then clamp, then persist.
    let net = production
        .checked_sub(&consumption)
        .ok_or_else(|| SimError::overflow("net production"))?;
    let current = storage_record.amounts;
    let capacity = storage::capacity(&structures, ctx.rates)?;
    let wasted = storage::waste(&current, &net, &capacity)?;
    let final_stock = storage::clamp(&storage::propose(&current, &net)?, &capacity);

    ctx.store
        .update_storage(storage_record.id, final_stock)
        .await?;

    debug!(
        tick,
        settlement_id = %settlement_id,
        elapsed_ticks,
        population = population_count,
        structures = structures.len(),
        "Settlement cycle settled"
    );

    // 5. Resource events.
    let now = Utc::now();
    let mut events_published = 0_usize;

    publish(
        ctx.bus,
        world_id,
        settlement_id,
        now,
        SimEventPayload::ResourceUpdate {
            resources: final_stock,
            production,
            consumption,
            net_production: net,
            population: population_count,
        },
    )
    .await;
    events_published = events_published.saturating_add(1);

    if wasted.any_positive() {
        publish(
            ctx.bus,
            world_id,
            settlement_id,
            now,
            SimEventPayload::ResourceWaste {
                waste: wasted,
                capacity,
            },
        )
        .await;
        events_published = events_published.saturating_add(1);
    }

    let near =
        storage::is_near_capacity(&final_stock, &capacity, ctx.rates.near_capacity_threshold);
    if near.any() {
        publish(
            ctx.bus,
            world_id,
            settlement_id,
            now,
            SimEventPayload::StorageWarning {
                near_capacity: near,
                resources: final_stock,
                capacity,
            },
        )
        .await;
        events_published = events_published.saturating_add(1);
    }

    let sufficient = consumption::has_resources_for_population(
        population_count,
        structures.len(),
        &final_stock,
        ctx.rates,
    )?;
    if !sufficient && population_count > 0 {
        publish(
            ctx.bus,
            world_id,
            settlement_id,
            now,
            SimEventPayload::ResourceShortage {
                population: population_count,
                resources: final_stock,
            },
        )
        .await;
        events_published = events_published.saturating_add(1);
    }

    // 6. Population dynamics, on evaluation ticks only.
    let mut population_evaluated = false;
    if evaluate_population {
        if let Some(record) = population_record {
            let published = run_population_step(
                ctx,
                world_id,
                settlement_id,
                &structures,
                record,
                sufficient,
                tick,
                now,
            )
            .await?;
            events_published = events_published.saturating_add(published);
            population_evaluated = true;
        } else {
            debug!(
                tick,
                settlement_id = %settlement_id,
                "No population record; skipping population step"
            );
        }
    }

    Ok(CycleOutcome {
        settlement_id,
        elapsed_ticks,
        events_published,
        population_evaluated,
    })
}

/// Run the population dynamics sub-step and emit its event family.
///
/// Returns how many events were published.
#[allow(clippy::too_many_arguments)]
async fn run_population_step<S: SettlementStore>(
    ctx: &CycleContext<'_, S>,
    world_id: WorldId,
    settlement_id: SettlementId,
    structures: &[Structure],
    record: PopulationState,
    fed: bool,
    tick: u64,
    now: DateTime<Utc>,
) -> Result<usize, CycleError> {
    let housing_capacity = population::housing_capacity(structures, ctx.rates)?;

    // Whole evaluation periods since the last persisted evaluation.
    let period_seconds = ctx.scheduler.population_period_seconds();
    let elapsed_seconds = now
        .signed_duration_since(record.last_growth_at)
        .num_seconds()
        .max(0);
    let whole_periods = u64::try_from(elapsed_seconds)
        .unwrap_or(0)
        .checked_div(period_seconds)
        .unwrap_or(0)
        .min(u64::from(u32::MAX));
    let elapsed_periods = u32::try_from(whole_periods).unwrap_or(u32::MAX).max(1);

    let inputs = population::PopulationInputs {
        state: record,
        housing_capacity,
        fed,
        elapsed_periods,
    };
    let mut rng = SmallRng::seed_from_u64(migration_rng_seed(
        ctx.scheduler.migration_seed,
        settlement_id,
        tick,
    ));
    let outcome = population::evaluate(&inputs, &mut rng, now)?;

    if outcome.changed {
        ctx.store
            .update_population(settlement_id, outcome.state.clone())
            .await?;
    }

    let mut published = 0_usize;

    if outcome.state.current != outcome.previous {
        publish(
            ctx.bus,
            world_id,
            settlement_id,
            now,
            SimEventPayload::PopulationGrowth {
                previous: outcome.previous,
                current: outcome.state.current,
                happiness: outcome.state.happiness,
                growth_rate: outcome.state.growth_rate,
            },
        )
        .await;
        published = published.saturating_add(1);
    }

    publish(
        ctx.bus,
        world_id,
        settlement_id,
        now,
        SimEventPayload::PopulationState {
            current: outcome.state.current,
            capacity: outcome.state.capacity,
            happiness: outcome.state.happiness,
            description: outcome.description.clone(),
            growth_rate: outcome.state.growth_rate,
            status: outcome.trend,
        },
    )
    .await;
    published = published.saturating_add(1);

    if outcome.immigrants > 0 {
        publish(
            ctx.bus,
            world_id,
            settlement_id,
            now,
            SimEventPayload::SettlerArrived {
                population: outcome.state.current,
                immigrant_count: outcome.immigrants,
                happiness: outcome.state.happiness,
            },
        )
        .await;
        published = published.saturating_add(1);
    }

    for warning in &outcome.warnings {
        publish(
            ctx.bus,
            world_id,
            settlement_id,
            now,
            SimEventPayload::PopulationWarning {
                population: outcome.state.current,
                happiness: outcome.state.happiness,
                kind: warning.kind,
                message: warning.message.clone(),
            },
        )
        .await;
        published = published.saturating_add(1);
    }

    Ok(published)
}

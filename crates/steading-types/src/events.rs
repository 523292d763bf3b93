//! Broadcast event types pushed to listeners after each simulation cycle.
//!
//! Every event carries the settlement it concerns and a wall-clock
//! timestamp, and is broadcast on its world's channel. Payloads are
//! externally tagged with kebab-case kinds (`resource-update`,
//! `population-growth`, ...) so the game client can switch on `type`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{PopulationTrend, PopulationWarningKind};
use crate::ids::{SettlementId, WorldId};
use crate::resources::{NearCapacityFlags, ResourceAmounts, ResourceDelta, StorageCapacity};

/// An event produced by the simulation core for one settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SimEvent {
    /// The world whose channel this event is broadcast on.
    pub world_id: WorldId,
    /// The settlement this event concerns.
    pub settlement_id: SettlementId,
    /// When the event was produced.
    pub occurred_at: DateTime<Utc>,
    /// The typed payload.
    pub payload: SimEventPayload,
}

impl SimEvent {
    /// The kebab-case kind string of the payload.
    ///
    /// Matches the serde tag; used for log fields and pub/sub subjects.
    pub const fn kind(&self) -> &'static str {
        match self.payload {
            SimEventPayload::ResourceUpdate { .. } => "resource-update",
            SimEventPayload::ResourceWaste { .. } => "resource-waste",
            SimEventPayload::StorageWarning { .. } => "storage-warning",
            SimEventPayload::ResourceShortage { .. } => "resource-shortage",
            SimEventPayload::PopulationGrowth { .. } => "population-growth",
            SimEventPayload::PopulationWarning { .. } => "population-warning",
            SimEventPayload::SettlerArrived { .. } => "settler-arrived",
            SimEventPayload::PopulationState { .. } => "population-state",
        }
    }
}

/// Typed payload for a [`SimEvent`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SimEventPayload {
    /// Resources were recomputed for a settlement this cycle.
    ResourceUpdate {
        /// Stored amounts after clamping.
        resources: ResourceAmounts,
        /// Gross production over the elapsed window.
        production: ResourceAmounts,
        /// Gross consumption over the elapsed window.
        consumption: ResourceAmounts,
        /// Production minus consumption.
        net_production: ResourceDelta,
        /// Population used for consumption.
        population: u32,
    },

    /// Production was lost to insufficient storage headroom this cycle.
    ResourceWaste {
        /// Amount lost per resource.
        waste: ResourceAmounts,
        /// The capacity that was exceeded.
        capacity: StorageCapacity,
    },

    /// One or more resources are near their storage ceiling.
    StorageWarning {
        /// Which resources are near capacity.
        near_capacity: NearCapacityFlags,
        /// Stored amounts after clamping.
        resources: ResourceAmounts,
        /// Current ceilings.
        capacity: StorageCapacity,
    },

    /// Stock cannot sustain projected consumption over the lookahead buffer.
    ResourceShortage {
        /// Population the projection was computed for.
        population: u32,
        /// Stored amounts after clamping.
        resources: ResourceAmounts,
    },

    /// Population changed during a periodic evaluation.
    PopulationGrowth {
        /// Population before the evaluation.
        previous: u32,
        /// Population after the evaluation.
        current: u32,
        /// Happiness after the evaluation.
        #[ts(as = "String")]
        happiness: Decimal,
        /// Growth rate used for the evaluation.
        #[ts(as = "String")]
        growth_rate: Decimal,
    },

    /// A population risk condition was detected.
    PopulationWarning {
        /// Current population.
        population: u32,
        /// Happiness after the evaluation.
        #[ts(as = "String")]
        happiness: Decimal,
        /// What triggered the warning.
        kind: PopulationWarningKind,
        /// Human-readable description for the client.
        message: String,
    },

    /// An immigration trial succeeded.
    SettlerArrived {
        /// Population after the arrivals.
        population: u32,
        /// How many settlers arrived.
        immigrant_count: u32,
        /// Happiness after the evaluation.
        #[ts(as = "String")]
        happiness: Decimal,
    },

    /// Periodic population summary, emitted on every evaluation.
    PopulationState {
        /// Current population.
        current: u32,
        /// Housing capacity.
        capacity: u32,
        /// Happiness after the evaluation.
        #[ts(as = "String")]
        happiness: Decimal,
        /// Human-readable mood description.
        description: String,
        /// Growth rate for the next period.
        #[ts(as = "String")]
        growth_rate: Decimal,
        /// Population trend over the last evaluation.
        status: PopulationTrend,
    },
}

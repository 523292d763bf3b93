//! Core entity structs for the Steading simulation core.
//!
//! These mirror the records the simulation reads from and writes to the
//! game's persistent store: settlements, their storage, the plot they
//! occupy, the structures standing on it, and the population record.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{Biome, StructureCategory, StructureKind};
use crate::ids::{PlayerId, PlotId, SettlementId, StorageId, StructureId, WorldId};
use crate::resources::ResourceAmounts;

// ---------------------------------------------------------------------------
// Settlement
// ---------------------------------------------------------------------------

/// A settlement's identity record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Settlement {
    /// Unique settlement identifier.
    pub id: SettlementId,
    /// The player who owns this settlement.
    pub owner_id: PlayerId,
    /// The world this settlement lives in.
    pub world_id: WorldId,
    /// Player-chosen settlement name.
    pub name: String,
    /// When the settlement was founded.
    pub founded_at: DateTime<Utc>,
}

/// A settlement's stored resource record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SettlementStorage {
    /// Unique storage record identifier.
    pub id: StorageId,
    /// The settlement this storage belongs to.
    pub settlement_id: SettlementId,
    /// Current stored amounts.
    pub amounts: ResourceAmounts,
}

/// The plot of land a settlement occupies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Plot {
    /// Unique plot identifier.
    pub id: PlotId,
    /// Plot area in map units.
    #[ts(as = "String")]
    pub area: Decimal,
    /// The plot's base per-resource yield potential, in units per hour
    /// for a level-1 extractor before biome scaling.
    pub base_yields: ResourceAmounts,
}

/// The full settlement detail payload fetched once per wave.
///
/// `storage` and `plot` are optional because the store may hold a
/// settlement row whose sub-records were deleted out from under it;
/// the scheduler treats either missing record as incomplete data and
/// deregisters the settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SettlementDetail {
    /// The settlement identity record.
    pub settlement: Settlement,
    /// The settlement's storage record, if present.
    pub storage: Option<SettlementStorage>,
    /// The plot the settlement occupies, if present.
    pub plot: Option<Plot>,
    /// The biome of the plot, if terrain data is available.
    pub biome: Option<Biome>,
}

// ---------------------------------------------------------------------------
// Structures
// ---------------------------------------------------------------------------

/// Well-known structure modifier name constants.
///
/// Modifiers are an ordered open-ended list so the structure service can
/// attach effects the simulation core does not know about; the core only
/// reads these names.
pub mod modifier_names {
    /// Structure upgrade level (defaults to 1 when absent).
    pub const LEVEL: &str = "level";
    /// Per-resource storage capacity bonus granted by a storage structure.
    pub const CAPACITY: &str = "capacity";
    /// Number of settlers housed by a housing structure.
    pub const HOUSING: &str = "housing";
}

/// A single named modifier attached to a structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct StructureModifier {
    /// Modifier name (see [`modifier_names`]).
    pub name: String,
    /// Modifier magnitude.
    #[ts(as = "String")]
    pub value: Decimal,
}

/// A read-only structure snapshot taken once per wave.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Structure {
    /// Unique structure identifier.
    pub id: StructureId,
    /// Display name.
    pub name: String,
    /// The structure's kind.
    pub kind: StructureKind,
    /// Ordered modifier list; first match wins on name lookups.
    pub modifiers: Vec<StructureModifier>,
}

impl Structure {
    /// Return the structure's functional category.
    pub const fn category(&self) -> StructureCategory {
        self.kind.category()
    }

    /// Look up the first modifier with the given name.
    pub fn modifier(&self, name: &str) -> Option<Decimal> {
        self.modifiers
            .iter()
            .find(|modifier| modifier.name == name)
            .map(|modifier| modifier.value)
    }

    /// The structure's upgrade level.
    ///
    /// Read from the `level` modifier; absent or sub-1 values mean level 1.
    pub fn level(&self) -> Decimal {
        match self.modifier(modifier_names::LEVEL) {
            Some(level) if level >= Decimal::ONE => level,
            _ => Decimal::ONE,
        }
    }
}

// ---------------------------------------------------------------------------
// Population
// ---------------------------------------------------------------------------

/// A settlement's persisted population record.
///
/// Mutated only by the population dynamics model, at coarse granularity
/// (the population evaluation period, not every tick).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PopulationState {
    /// Current number of settlers.
    pub current: u32,
    /// Housing capacity derived from structures.
    pub capacity: u32,
    /// Satisfaction scalar in `[0, 100]`.
    #[ts(as = "String")]
    pub happiness: Decimal,
    /// Natural growth rate per evaluation period.
    #[ts(as = "String")]
    pub growth_rate: Decimal,
    /// Probability of an immigration event per evaluation.
    #[ts(as = "String")]
    pub immigration_chance: Decimal,
    /// Probability of an emigration event per evaluation.
    #[ts(as = "String")]
    pub emigration_chance: Decimal,
    /// When the population was last re-evaluated.
    pub last_growth_at: DateTime<Utc>,
}

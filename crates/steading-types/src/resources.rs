//! Resource quantity vectors and storage capacity types.
//!
//! All quantities are [`Decimal`] because production over a single coarse
//! period is fractional (an extractor's hourly rate scaled down to a
//! one-second window). [`ResourceAmounts`] holds non-negative stock or
//! flow vectors; [`ResourceDelta`] holds signed per-cycle net flows.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::ResourceKind;

/// A non-negative per-resource quantity vector.
///
/// Used for stored amounts, production, consumption, and waste. The
/// non-negativity invariant is maintained by the storage capacity model's
/// clamp operation; constructors and setters do not re-check it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ResourceAmounts {
    /// Stored or flowing food.
    #[ts(as = "String")]
    pub food: Decimal,
    /// Stored or flowing water.
    #[ts(as = "String")]
    pub water: Decimal,
    /// Stored or flowing wood.
    #[ts(as = "String")]
    pub wood: Decimal,
    /// Stored or flowing stone.
    #[ts(as = "String")]
    pub stone: Decimal,
    /// Stored or flowing ore.
    #[ts(as = "String")]
    pub ore: Decimal,
}

impl ResourceAmounts {
    /// The all-zero vector.
    pub const ZERO: Self = Self {
        food: Decimal::ZERO,
        water: Decimal::ZERO,
        wood: Decimal::ZERO,
        stone: Decimal::ZERO,
        ore: Decimal::ZERO,
    };

    /// Return the quantity for one resource kind.
    pub const fn get(&self, kind: ResourceKind) -> Decimal {
        match kind {
            ResourceKind::Food => self.food,
            ResourceKind::Water => self.water,
            ResourceKind::Wood => self.wood,
            ResourceKind::Stone => self.stone,
            ResourceKind::Ore => self.ore,
        }
    }

    /// Set the quantity for one resource kind.
    pub const fn set(&mut self, kind: ResourceKind, value: Decimal) {
        match kind {
            ResourceKind::Food => self.food = value,
            ResourceKind::Water => self.water = value,
            ResourceKind::Wood => self.wood = value,
            ResourceKind::Stone => self.stone = value,
            ResourceKind::Ore => self.ore = value,
        }
    }

    /// Element-wise checked addition. Returns `None` on overflow.
    pub fn checked_add(&self, other: &Self) -> Option<Self> {
        let mut out = Self::ZERO;
        for kind in ResourceKind::ALL {
            out.set(kind, self.get(kind).checked_add(other.get(kind))?);
        }
        Some(out)
    }

    /// Element-wise checked subtraction into a signed delta.
    ///
    /// Returns `None` on overflow. Components may be negative; this is
    /// how a cycle's net flow (production minus consumption) is formed.
    pub fn checked_sub(&self, other: &Self) -> Option<ResourceDelta> {
        let mut out = ResourceDelta::ZERO;
        for kind in ResourceKind::ALL {
            out.set(kind, self.get(kind).checked_sub(other.get(kind))?);
        }
        Some(out)
    }

    /// Whether every component is exactly zero.
    pub fn is_zero(&self) -> bool {
        ResourceKind::ALL
            .iter()
            .all(|kind| self.get(*kind) == Decimal::ZERO)
    }

    /// Whether any component is strictly positive.
    pub fn any_positive(&self) -> bool {
        ResourceKind::ALL
            .iter()
            .any(|kind| self.get(*kind) > Decimal::ZERO)
    }
}

/// A signed per-resource flow vector (net production for one cycle).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ResourceDelta {
    /// Net food flow.
    #[ts(as = "String")]
    pub food: Decimal,
    /// Net water flow.
    #[ts(as = "String")]
    pub water: Decimal,
    /// Net wood flow.
    #[ts(as = "String")]
    pub wood: Decimal,
    /// Net stone flow.
    #[ts(as = "String")]
    pub stone: Decimal,
    /// Net ore flow.
    #[ts(as = "String")]
    pub ore: Decimal,
}

impl ResourceDelta {
    /// The all-zero delta.
    pub const ZERO: Self = Self {
        food: Decimal::ZERO,
        water: Decimal::ZERO,
        wood: Decimal::ZERO,
        stone: Decimal::ZERO,
        ore: Decimal::ZERO,
    };

    /// Return the flow for one resource kind.
    pub const fn get(&self, kind: ResourceKind) -> Decimal {
        match kind {
            ResourceKind::Food => self.food,
            ResourceKind::Water => self.water,
            ResourceKind::Wood => self.wood,
            ResourceKind::Stone => self.stone,
            ResourceKind::Ore => self.ore,
        }
    }

    /// Set the flow for one resource kind.
    pub const fn set(&mut self, kind: ResourceKind, value: Decimal) {
        match kind {
            ResourceKind::Food => self.food = value,
            ResourceKind::Water => self.water = value,
            ResourceKind::Wood => self.wood = value,
            ResourceKind::Stone => self.stone = value,
            ResourceKind::Ore => self.ore = value,
        }
    }
}

impl From<ResourceAmounts> for ResourceDelta {
    fn from(amounts: ResourceAmounts) -> Self {
        Self {
            food: amounts.food,
            water: amounts.water,
            wood: amounts.wood,
            stone: amounts.stone,
            ore: amounts.ore,
        }
    }
}

/// Per-resource storage ceilings derived from built structures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct StorageCapacity {
    /// Food ceiling.
    #[ts(as = "String")]
    pub food: Decimal,
    /// Water ceiling.
    #[ts(as = "String")]
    pub water: Decimal,
    /// Wood ceiling.
    #[ts(as = "String")]
    pub wood: Decimal,
    /// Stone ceiling.
    #[ts(as = "String")]
    pub stone: Decimal,
    /// Ore ceiling.
    #[ts(as = "String")]
    pub ore: Decimal,
}

impl StorageCapacity {
    /// Return the ceiling for one resource kind.
    pub const fn get(&self, kind: ResourceKind) -> Decimal {
        match kind {
            ResourceKind::Food => self.food,
            ResourceKind::Water => self.water,
            ResourceKind::Wood => self.wood,
            ResourceKind::Stone => self.stone,
            ResourceKind::Ore => self.ore,
        }
    }

    /// Set the ceiling for one resource kind.
    pub const fn set(&mut self, kind: ResourceKind, value: Decimal) {
        match kind {
            ResourceKind::Food => self.food = value,
            ResourceKind::Water => self.water = value,
            ResourceKind::Wood => self.wood = value,
            ResourceKind::Stone => self.stone = value,
            ResourceKind::Ore => self.ore = value,
        }
    }

    /// Build a capacity with the same ceiling for every resource kind.
    pub const fn uniform(value: Decimal) -> Self {
        Self {
            food: value,
            water: value,
            wood: value,
            stone: value,
            ore: value,
        }
    }
}

/// Per-resource booleans reported by the `storage-warning` event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct NearCapacityFlags {
    /// Food at or beyond the warning threshold.
    pub food: bool,
    /// Water at or beyond the warning threshold.
    pub water: bool,
    /// Wood at or beyond the warning threshold.
    pub wood: bool,
    /// Stone at or beyond the warning threshold.
    pub stone: bool,
    /// Ore at or beyond the warning threshold.
    pub ore: bool,
}

impl NearCapacityFlags {
    /// Return the flag for one resource kind.
    pub const fn get(&self, kind: ResourceKind) -> bool {
        match kind {
            ResourceKind::Food => self.food,
            ResourceKind::Water => self.water,
            ResourceKind::Wood => self.wood,
            ResourceKind::Stone => self.stone,
            ResourceKind::Ore => self.ore,
        }
    }

    /// Set the flag for one resource kind.
    pub const fn set(&mut self, kind: ResourceKind, value: bool) {
        match kind {
            ResourceKind::Food => self.food = value,
            ResourceKind::Water => self.water = value,
            ResourceKind::Wood => self.wood = value,
            ResourceKind::Stone => self.stone = value,
            ResourceKind::Ore => self.ore = value,
        }
    }

    /// Whether any resource is flagged.
    pub const fn any(&self) -> bool {
        self.food || self.water || self.wood || self.stone || self.ore
    }
}

//! Storage capacity model: ceilings, clamping, waste, and near-capacity.
//!
//! Capacity is the base ceiling plus the bonuses of standing storage
//! structures. `waste` is computed independently of `clamp`: it reports
//! the production lost to insufficient headroom this cycle, not any
//! pre-existing overflow already in stock.

use rust_decimal::Decimal;

use steading_types::{
    NearCapacityFlags, ResourceAmounts, ResourceDelta, ResourceKind, StorageCapacity, Structure,
    StructureCategory, StructureKind, modifier_names,
};

use crate::config::RatesConfig;
use crate::error::SimError;

/// The resource kinds a storage structure kind raises the ceiling for.
const fn covered_kinds(kind: StructureKind) -> &'static [ResourceKind] {
    match kind {
        StructureKind::Granary => &[ResourceKind::Food, ResourceKind::Water],
        StructureKind::Warehouse => {
            &[ResourceKind::Wood, ResourceKind::Stone, ResourceKind::Ore]
        }
        StructureKind::Stockpile => &ResourceKind::ALL,
        _ => &[],
    }
}

/// Compute per-resource storage capacity from the structure snapshot.
///
/// Every settlement starts from the base ceiling; each storage structure
/// adds its `capacity` modifier (or the configured default bonus) scaled
/// by its level to the resource kinds it covers.
///
/// # Errors
///
/// Returns [`SimError`] if a bonus computation overflows.
pub fn capacity(
    structures: &[Structure],
    rates: &RatesConfig,
) -> Result<StorageCapacity, SimError> {
    let mut out = StorageCapacity::uniform(rates.base_storage_capacity);

    for structure in structures {
        if structure.category() != StructureCategory::Storage {
            continue;
        }

        let base_bonus = structure
            .modifier(modifier_names::CAPACITY)
            .unwrap_or(rates.default_storage_bonus);
        let bonus = base_bonus
            .checked_mul(structure.level())
            .ok_or_else(|| SimError::overflow("storage bonus scaling"))?;

        for kind in covered_kinds(structure.kind) {
            let raised = out
                .get(*kind)
                .checked_add(bonus)
                .ok_or_else(|| SimError::overflow("storage capacity accumulation"))?;
            out.set(*kind, raised);
        }
    }

    Ok(out)
}

/// Element-wise sum of current stock and a net flow.
///
/// # Errors
///
/// Returns [`SimError`] if the addition overflows.
pub fn propose(
    current: &ResourceAmounts,
    net: &ResourceDelta,
) -> Result<ResourceDelta, SimError> {
    let mut out = ResourceDelta::ZERO;
    for kind in ResourceKind::ALL {
        let sum = current
            .get(kind)
            .checked_add(net.get(kind))
            .ok_or_else(|| SimError::overflow("proposed stock"))?;
        out.set(kind, sum);
    }
    Ok(out)
}

/// Clamp a proposed stock vector into `[0, capacity]` element-wise.
pub fn clamp(proposed: &ResourceDelta, capacity: &StorageCapacity) -> ResourceAmounts {
    let mut out = ResourceAmounts::ZERO;
    for kind in ResourceKind::ALL {
        let value = proposed.get(kind).min(capacity.get(kind)).max(Decimal::ZERO);
        out.set(kind, value);
    }
    out
}

/// Production lost to insufficient headroom this cycle:
/// `max(0, current + net - capacity)` element-wise.
///
/// Under the post-cycle invariant `current <= capacity` this is exactly
/// the portion of this cycle's net inflow that does not fit. Stock left
/// above a ceiling by an out-of-band change (e.g. a capacity-reducing
/// demolition) is not attributed separately.
///
/// # Errors
///
/// Returns [`SimError`] if a computation overflows.
pub fn waste(
    current: &ResourceAmounts,
    net: &ResourceDelta,
    capacity: &StorageCapacity,
) -> Result<ResourceAmounts, SimError> {
    let proposed = propose(current, net)?;
    let mut out = ResourceAmounts::ZERO;
    for kind in ResourceKind::ALL {
        let over = proposed
            .get(kind)
            .checked_sub(capacity.get(kind))
            .ok_or_else(|| SimError::overflow("waste computation"))?;
        out.set(kind, over.max(Decimal::ZERO));
    }
    Ok(out)
}

/// Per-resource near-capacity flags.
///
/// A resource is near capacity when its stock is at or beyond
/// `threshold * capacity`. Resources with a zero ceiling are flagged
/// only when stock is actually positive.
pub fn is_near_capacity(
    amounts: &ResourceAmounts,
    capacity: &StorageCapacity,
    threshold: Decimal,
) -> NearCapacityFlags {
    let mut flags = NearCapacityFlags::default();
    for kind in ResourceKind::ALL {
        let ceiling = capacity.get(kind);
        let flagged = if ceiling > Decimal::ZERO {
            ceiling
                .checked_mul(threshold)
                .is_some_and(|limit| amounts.get(kind) >= limit)
        } else {
            amounts.get(kind) > Decimal::ZERO
        };
        flags.set(kind, flagged);
    }
    flags
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use steading_types::{StructureId, StructureModifier};

    use super::*;

    fn storage_structure(kind: StructureKind, capacity_bonus: Option<i64>, level: i64) -> Structure {
        let mut modifiers = vec![StructureModifier {
            name: String::from(modifier_names::LEVEL),
            value: Decimal::from(level),
        }];
        if let Some(bonus) = capacity_bonus {
            modifiers.push(StructureModifier {
                name: String::from(modifier_names::CAPACITY),
                value: Decimal::from(bonus),
            });
        }
        Structure {
            id: StructureId::new(),
            name: format!("{kind:?}"),
            kind,
            modifiers,
        }
    }

    fn amounts(food: i64) -> ResourceAmounts {
        let mut out = ResourceAmounts::ZERO;
        out.food = Decimal::from(food);
        out
    }

    #[test]
    fn base_capacity_without_structures() {
        let rates = RatesConfig::default();
        let cap = capacity(&[], &rates).unwrap();
        assert_eq!(cap.food, rates.base_storage_capacity);
        assert_eq!(cap.ore, rates.base_storage_capacity);
    }

    #[test]
    fn granary_raises_food_and_water_only() {
        let rates = RatesConfig::default();
        let structures = vec![storage_structure(StructureKind::Granary, Some(80), 1)];
        let cap = capacity(&structures, &rates).unwrap();
        assert_eq!(cap.food, Decimal::from(180));
        assert_eq!(cap.water, Decimal::from(180));
        assert_eq!(cap.wood, Decimal::from(100));
    }

    #[test]
    fn stockpile_level_scales_bonus() {
        let rates = RatesConfig::default();
        // Level 2 stockpile without explicit capacity: 50 * 2 = 100 on top
        // of the base 100 for every kind.
        let structures = vec![storage_structure(StructureKind::Stockpile, None, 2)];
        let cap = capacity(&structures, &rates).unwrap();
        for kind in ResourceKind::ALL {
            assert_eq!(cap.get(kind), Decimal::from(200));
        }
    }

    #[test]
    fn extractors_do_not_raise_capacity() {
        let rates = RatesConfig::default();
        let structures = vec![storage_structure(StructureKind::Farm, Some(500), 1)];
        let cap = capacity(&structures, &rates).unwrap();
        assert_eq!(cap.food, rates.base_storage_capacity);
    }

    #[test]
    fn clamp_is_idempotent() {
        let cap = StorageCapacity::uniform(Decimal::from(100));
        let proposed = ResourceDelta {
            food: Decimal::from(250),
            water: Decimal::from(-10),
            wood: Decimal::from(40),
            stone: Decimal::ZERO,
            ore: Decimal::from(100),
        };
        let once = clamp(&proposed, &cap);
        let twice = clamp(&ResourceDelta::from(once), &cap);
        assert_eq!(once, twice);
    }

    #[test]
    fn clamp_bounds() {
        let cap = StorageCapacity::uniform(Decimal::from(100));
        let proposed = ResourceDelta {
            food: Decimal::from(250),
            water: Decimal::from(-10),
            wood: Decimal::from(40),
            stone: Decimal::ZERO,
            ore: Decimal::from(100),
        };
        let clamped = clamp(&proposed, &cap);
        for kind in ResourceKind::ALL {
            assert!(clamped.get(kind) <= cap.get(kind));
            assert!(clamped.get(kind) >= Decimal::ZERO);
            assert!(clamped.get(kind) <= proposed.get(kind).max(Decimal::ZERO));
        }
    }

    #[test]
    fn waste_reports_lost_production() {
        // Capacity 100, current 95, net +10: clamp lands on 100, waste 5.
        let cap = StorageCapacity::uniform(Decimal::from(100));
        let current = amounts(95);
        let mut net = ResourceDelta::ZERO;
        net.food = Decimal::from(10);

        let wasted = waste(&current, &net, &cap).unwrap();
        assert_eq!(wasted.food, Decimal::from(5));

        let final_stock = clamp(&propose(&current, &net).unwrap(), &cap);
        assert_eq!(final_stock.food, Decimal::from(100));
    }

    #[test]
    fn waste_is_never_negative() {
        let cap = StorageCapacity::uniform(Decimal::from(100));
        let current = amounts(10);
        let mut net = ResourceDelta::ZERO;
        net.food = Decimal::from(-50);
        net.water = Decimal::from(20);

        let wasted = waste(&current, &net, &cap).unwrap();
        for kind in ResourceKind::ALL {
            assert!(wasted.get(kind) >= Decimal::ZERO);
        }
    }

    #[test]
    fn near_capacity_at_ninety_percent() {
        let cap = StorageCapacity::uniform(Decimal::from(100));
        let threshold = Decimal::new(9, 1);

        let flags = is_near_capacity(&amounts(90), &cap, threshold);
        assert!(flags.food);
        let flags = is_near_capacity(&amounts(89), &cap, threshold);
        assert!(!flags.food);
        assert!(!flags.any() || flags.food);
    }

    #[test]
    fn zero_ceiling_flags_only_positive_stock() {
        let cap = StorageCapacity::uniform(Decimal::ZERO);
        let threshold = Decimal::new(9, 1);

        let empty = is_near_capacity(&ResourceAmounts::ZERO, &cap, threshold);
        assert!(!empty.any());
        let stocked = is_near_capacity(&amounts(1), &cap, threshold);
        assert!(stocked.food);
    }
}

//! Resource production model.
//!
//! Computes the raw output of a settlement's extractor structures over an
//! elapsed tick window. For each extractor the hourly base rate of its
//! primary resource is scaled by the structure's level multiplier and the
//! plot's biome efficiency, then the sum over all extractors is scaled
//! linearly by `elapsed_ticks / ticks_per_hour`.
//!
//! The model never clamps: overflow against storage ceilings is handled
//! downstream by the storage capacity model.

use rust_decimal::Decimal;

use steading_types::{Biome, Plot, ResourceAmounts, ResourceKind, Structure, StructureKind};

use crate::config::RatesConfig;
use crate::error::SimError;

/// Ticks in one hour, the model's reference time unit.
///
/// `tick_rate` is ticks per second, so one hour is `tick_rate * 3600`.
pub fn ticks_per_hour(tick_rate: u32) -> Result<u64, SimError> {
    let rate = u64::from(tick_rate);
    if rate == 0 {
        return Err(SimError::InvalidParameter {
            reason: String::from("tick_rate must be at least 1"),
        });
    }
    rate.checked_mul(3600)
        .ok_or_else(|| SimError::overflow("ticks_per_hour"))
}

/// The primary resource an extractor kind produces, if it is an extractor.
pub const fn primary_resource(kind: StructureKind) -> Option<ResourceKind> {
    match kind {
        StructureKind::Farm => Some(ResourceKind::Food),
        StructureKind::Well => Some(ResourceKind::Water),
        StructureKind::LumberCamp => Some(ResourceKind::Wood),
        StructureKind::Quarry => Some(ResourceKind::Stone),
        StructureKind::Mine => Some(ResourceKind::Ore),
        _ => None,
    }
}

/// The canonical hourly base rate of an extractor kind, used when the
/// plot has no surveyed yield for its primary resource.
pub fn default_base_rate(kind: StructureKind) -> Decimal {
    match kind {
        StructureKind::Farm => Decimal::from(10),
        StructureKind::Well => Decimal::from(12),
        StructureKind::LumberCamp => Decimal::from(8),
        StructureKind::Quarry => Decimal::from(6),
        StructureKind::Mine => Decimal::from(4),
        _ => Decimal::ZERO,
    }
}

/// Terrain efficiency multiplier for producing a resource in a biome.
///
/// Settlements without terrain data (no biome on the detail payload)
/// produce at the neutral multiplier of 1.
pub fn biome_efficiency(biome: Option<Biome>, resource: ResourceKind) -> Decimal {
    let Some(biome) = biome else {
        return Decimal::ONE;
    };
    let pct: i64 = match (biome, resource) {
        (Biome::Plains, ResourceKind::Food) => 150,
        (Biome::Plains, ResourceKind::Wood) => 75,
        (Biome::Forest, ResourceKind::Wood) => 150,
        (Biome::Forest, ResourceKind::Food) => 110,
        (Biome::Forest, ResourceKind::Stone) => 80,
        (Biome::Hills, ResourceKind::Stone) => 125,
        (Biome::Hills, ResourceKind::Ore) => 110,
        (Biome::Mountains, ResourceKind::Stone) => 150,
        (Biome::Mountains, ResourceKind::Ore) => 140,
        (Biome::Mountains, ResourceKind::Food) => 60,
        (Biome::Wetlands, ResourceKind::Water) => 150,
        (Biome::Wetlands, ResourceKind::Food) => 90,
        (Biome::Wetlands, ResourceKind::Stone) => 70,
        (Biome::Desert, ResourceKind::Food) => 50,
        (Biome::Desert, ResourceKind::Water) => 40,
        (Biome::Desert, ResourceKind::Ore) => 120,
        _ => 100,
    };
    Decimal::new(pct, 2)
}

/// The level multiplier for an extractor: `1 + step * (level - 1)`.
fn level_multiplier(level: Decimal, step: Decimal) -> Result<Decimal, SimError> {
    let above_one = level
        .checked_sub(Decimal::ONE)
        .ok_or_else(|| SimError::overflow("level multiplier subtraction"))?;
    let bonus = above_one
        .checked_mul(step)
        .ok_or_else(|| SimError::overflow("level multiplier scaling"))?;
    Decimal::ONE
        .checked_add(bonus)
        .ok_or_else(|| SimError::overflow("level multiplier addition"))
}

/// The hourly base rate of one extractor on a given plot.
///
/// A surveyed positive yield on the plot overrides the canonical table.
fn base_rate(structure: &Structure, plot: &Plot, resource: ResourceKind) -> Decimal {
    let surveyed = plot.base_yields.get(resource);
    if surveyed > Decimal::ZERO {
        surveyed
    } else {
        default_base_rate(structure.kind)
    }
}

/// Compute the resources produced over an elapsed tick window.
///
/// `structures` is the full structure snapshot for the settlement;
/// non-extractors contribute nothing. An elapsed window of zero ticks
/// produces the zero vector.
///
/// # Errors
///
/// Returns [`SimError`] if `tick_rate` is zero or a computation overflows.
pub fn produce(
    plot: &Plot,
    structures: &[Structure],
    elapsed_ticks: u64,
    biome: Option<Biome>,
    tick_rate: u32,
    rates: &RatesConfig,
) -> Result<ResourceAmounts, SimError> {
    let hour_ticks = ticks_per_hour(tick_rate)?;
    let elapsed_hours = Decimal::from(elapsed_ticks)
        .checked_div(Decimal::from(hour_ticks))
        .ok_or_else(|| SimError::overflow("elapsed hours"))?;

    let mut produced = ResourceAmounts::ZERO;
    for structure in structures {
        let Some(resource) = primary_resource(structure.kind) else {
            continue;
        };

        let hourly = base_rate(structure, plot, resource)
            .checked_mul(level_multiplier(structure.level(), rates.level_multiplier_step)?)
            .and_then(|rate| rate.checked_mul(biome_efficiency(biome, resource)))
            .ok_or_else(|| SimError::overflow("hourly extractor rate"))?;

        let output = hourly
            .checked_mul(elapsed_hours)
            .ok_or_else(|| SimError::overflow("extractor output"))?;

        let total = produced
            .get(resource)
            .checked_add(output)
            .ok_or_else(|| SimError::overflow("production accumulation"))?;
        produced.set(resource, total);
    }

    Ok(produced)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use steading_types::{PlotId, StructureId, StructureModifier, modifier_names};

    use super::*;

    fn make_plot(food_yield: Decimal) -> Plot {
        let mut base_yields = ResourceAmounts::ZERO;
        base_yields.set(ResourceKind::Food, food_yield);
        Plot {
            id: PlotId::new(),
            area: Decimal::from(100),
            base_yields,
        }
    }

    fn make_structure(kind: StructureKind, level: i64) -> Structure {
        Structure {
            id: StructureId::new(),
            name: format!("{kind:?}"),
            kind,
            modifiers: vec![StructureModifier {
                name: String::from(modifier_names::LEVEL),
                value: Decimal::from(level),
            }],
        }
    }

    #[test]
    fn zero_elapsed_produces_nothing() {
        let plot = make_plot(Decimal::from(10));
        let structures = vec![make_structure(StructureKind::Farm, 1)];
        let rates = RatesConfig::default();

        let produced =
            produce(&plot, &structures, 0, Some(Biome::Plains), 60, &rates).unwrap();
        assert!(produced.is_zero());
    }

    #[test]
    fn one_second_farm_scenario() {
        // One level-1 farm, base rate 10 food/hour, biome efficiency 1.5,
        // 60 ticks at 60 ticks/sec = 1/3600 hour:
        //   10 * 1.5 * (1/3600) ~= 0.00417 food.
        let plot = make_plot(Decimal::from(10));
        let structures = vec![make_structure(StructureKind::Farm, 1)];
        let rates = RatesConfig::default();

        let produced =
            produce(&plot, &structures, 60, Some(Biome::Plains), 60, &rates).unwrap();
        // ~0.00417, allowing for division rounding.
        assert!(produced.food > Decimal::new(41, 4));
        assert!(produced.food < Decimal::new(42, 4));
        assert_eq!(produced.water, Decimal::ZERO);
    }

    #[test]
    fn level_scales_output() {
        let plot = make_plot(Decimal::from(10));
        let level_one = vec![make_structure(StructureKind::Farm, 1)];
        let level_three = vec![make_structure(StructureKind::Farm, 3)];
        let rates = RatesConfig::default();

        let hour_ticks = ticks_per_hour(60).unwrap();
        let base = produce(&plot, &level_one, hour_ticks, None, 60, &rates).unwrap();
        let upgraded = produce(&plot, &level_three, hour_ticks, None, 60, &rates).unwrap();

        // Level 3 multiplier over one full hour: 1 + 0.25 * 2 = 1.5
        assert_eq!(base.food, Decimal::from(10));
        assert_eq!(upgraded.food, Decimal::from(15));
    }

    #[test]
    fn unsurveyed_plot_falls_back_to_table_rate() {
        let plot = make_plot(Decimal::ZERO);
        let structures = vec![make_structure(StructureKind::Mine, 1)];
        let rates = RatesConfig::default();

        // One full hour at neutral biome: exactly the table rate.
        let hour_ticks = ticks_per_hour(60).unwrap();
        let produced = produce(&plot, &structures, hour_ticks, None, 60, &rates).unwrap();
        assert_eq!(produced.ore, default_base_rate(StructureKind::Mine));
    }

    #[test]
    fn non_extractors_produce_nothing() {
        let plot = make_plot(Decimal::from(10));
        let structures = vec![
            make_structure(StructureKind::Granary, 1),
            make_structure(StructureKind::Cabin, 1),
            make_structure(StructureKind::MeetingHall, 1),
        ];
        let rates = RatesConfig::default();

        let produced = produce(&plot, &structures, 3600, None, 60, &rates).unwrap();
        assert!(produced.is_zero());
    }

    #[test]
    fn multiple_extractors_sum() {
        let plot = make_plot(Decimal::from(10));
        let single = vec![make_structure(StructureKind::Farm, 1)];
        let pair = vec![
            make_structure(StructureKind::Farm, 1),
            make_structure(StructureKind::Farm, 1),
        ];
        let rates = RatesConfig::default();

        let hour_ticks = ticks_per_hour(60).unwrap();
        let one = produce(&plot, &single, hour_ticks, None, 60, &rates).unwrap();
        let two = produce(&plot, &pair, hour_ticks, None, 60, &rates).unwrap();
        assert_eq!(two.food, one.food.checked_mul(Decimal::from(2)).unwrap());
    }

    #[test]
    fn zero_tick_rate_is_rejected() {
        let plot = make_plot(Decimal::from(10));
        let rates = RatesConfig::default();
        let result = produce(&plot, &[], 60, None, 0, &rates);
        assert!(matches!(result, Err(SimError::InvalidParameter { .. })));
    }
}

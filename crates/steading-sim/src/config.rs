//! Tunable rates for the simulation models.
//!
//! [`RatesConfig`] bundles every per-hour rate and threshold the four
//! models use, so callers (scheduler, tests) can override defaults. The
//! struct deserializes from the `rates` section of `steading-config.yaml`;
//! all fields have defaults matching the design values.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Tunable rates and thresholds for the simulation models.
///
/// All flow rates are expressed per hour, the models' reference time
/// unit; elapsed tick windows are scaled down from it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RatesConfig {
    /// Storage capacity every settlement has before storage structures
    /// are counted (per resource).
    #[serde(default = "default_base_storage_capacity")]
    pub base_storage_capacity: Decimal,

    /// Capacity bonus of a storage structure without an explicit
    /// `capacity` modifier.
    #[serde(default = "default_storage_bonus")]
    pub default_storage_bonus: Decimal,

    /// Food consumed per settler per hour.
    #[serde(default = "default_food_per_capita_hour")]
    pub food_per_capita_hour: Decimal,

    /// Water consumed per settler per hour.
    #[serde(default = "default_water_per_capita_hour")]
    pub water_per_capita_hour: Decimal,

    /// Wood consumed per structure per hour for upkeep.
    #[serde(default = "default_wood_upkeep_hour")]
    pub wood_upkeep_per_structure_hour: Decimal,

    /// Stone consumed per structure per hour for upkeep.
    #[serde(default = "default_stone_upkeep_hour")]
    pub stone_upkeep_per_structure_hour: Decimal,

    /// Ore consumed per structure per hour for upkeep.
    #[serde(default = "default_ore_upkeep_hour")]
    pub ore_upkeep_per_structure_hour: Decimal,

    /// How far ahead the shortage predicate projects consumption, in hours.
    #[serde(default = "default_shortage_lookahead_hours")]
    pub shortage_lookahead_hours: Decimal,

    /// Fraction of capacity at which a resource counts as near capacity.
    #[serde(default = "default_near_capacity_threshold")]
    pub near_capacity_threshold: Decimal,

    /// Extra output per structure level above 1, as a fraction of the
    /// base rate (level multiplier = `1 + step * (level - 1)`).
    #[serde(default = "default_level_multiplier_step")]
    pub level_multiplier_step: Decimal,

    /// Settlers every settlement can house before housing structures
    /// are counted.
    #[serde(default = "default_base_population_capacity")]
    pub base_population_capacity: u32,

    /// Settlers housed by a housing structure without an explicit
    /// `housing` modifier.
    #[serde(default = "default_housing_per_structure")]
    pub default_housing_per_structure: u32,
}

impl Default for RatesConfig {
    fn default() -> Self {
        Self {
            base_storage_capacity: default_base_storage_capacity(),
            default_storage_bonus: default_storage_bonus(),
            food_per_capita_hour: default_food_per_capita_hour(),
            water_per_capita_hour: default_water_per_capita_hour(),
            wood_upkeep_per_structure_hour: default_wood_upkeep_hour(),
            stone_upkeep_per_structure_hour: default_stone_upkeep_hour(),
            ore_upkeep_per_structure_hour: default_ore_upkeep_hour(),
            shortage_lookahead_hours: default_shortage_lookahead_hours(),
            near_capacity_threshold: default_near_capacity_threshold(),
            level_multiplier_step: default_level_multiplier_step(),
            base_population_capacity: default_base_population_capacity(),
            default_housing_per_structure: default_housing_per_structure(),
        }
    }
}

fn default_base_storage_capacity() -> Decimal {
    Decimal::from(100)
}

fn default_storage_bonus() -> Decimal {
    Decimal::from(50)
}

fn default_food_per_capita_hour() -> Decimal {
    Decimal::new(5, 1) // 0.5
}

fn default_water_per_capita_hour() -> Decimal {
    Decimal::new(75, 2) // 0.75
}

fn default_wood_upkeep_hour() -> Decimal {
    Decimal::new(2, 1) // 0.2
}

fn default_stone_upkeep_hour() -> Decimal {
    Decimal::new(1, 1) // 0.1
}

fn default_ore_upkeep_hour() -> Decimal {
    Decimal::new(5, 2) // 0.05
}

fn default_shortage_lookahead_hours() -> Decimal {
    Decimal::ONE
}

fn default_near_capacity_threshold() -> Decimal {
    Decimal::new(9, 1) // 0.9
}

fn default_level_multiplier_step() -> Decimal {
    Decimal::new(25, 2) // 0.25
}

const fn default_base_population_capacity() -> u32 {
    5
}

const fn default_housing_per_structure() -> u32 {
    4
}

//! Consumption model and the forward-looking sufficiency predicate.
//!
//! Food and water consumption scale per-capita with the population;
//! material upkeep scales with the structure count. Both scale linearly
//! with the elapsed tick window.
//!
//! The sufficiency predicate deliberately projects consumption over a
//! lookahead buffer (default one hour) instead of comparing against the
//! instantaneous balance, so the shortage signal does not flap on
//! marginal deficits.

use rust_decimal::Decimal;

use steading_types::{ResourceAmounts, ResourceKind};

use crate::config::RatesConfig;
use crate::error::SimError;
use crate::production::ticks_per_hour;

/// Hourly consumption for a population and structure count.
fn hourly(
    population: u32,
    structure_count: usize,
    rates: &RatesConfig,
) -> Result<ResourceAmounts, SimError> {
    let settlers = Decimal::from(population);
    let structures = Decimal::from(
        u64::try_from(structure_count).map_err(|_err| SimError::overflow("structure count"))?,
    );

    let mut out = ResourceAmounts::ZERO;
    out.food = settlers
        .checked_mul(rates.food_per_capita_hour)
        .ok_or_else(|| SimError::overflow("hourly food consumption"))?;
    out.water = settlers
        .checked_mul(rates.water_per_capita_hour)
        .ok_or_else(|| SimError::overflow("hourly water consumption"))?;
    out.wood = structures
        .checked_mul(rates.wood_upkeep_per_structure_hour)
        .ok_or_else(|| SimError::overflow("hourly wood upkeep"))?;
    out.stone = structures
        .checked_mul(rates.stone_upkeep_per_structure_hour)
        .ok_or_else(|| SimError::overflow("hourly stone upkeep"))?;
    out.ore = structures
        .checked_mul(rates.ore_upkeep_per_structure_hour)
        .ok_or_else(|| SimError::overflow("hourly ore upkeep"))?;
    Ok(out)
}

/// Compute the resources consumed over an elapsed tick window.
///
/// An elapsed window of zero ticks consumes the zero vector.
///
/// # Errors
///
/// Returns [`SimError`] if `tick_rate` is zero or a computation overflows.
pub fn consume(
    population: u32,
    structure_count: usize,
    elapsed_ticks: u64,
    tick_rate: u32,
    rates: &RatesConfig,
) -> Result<ResourceAmounts, SimError> {
    let hour_ticks = ticks_per_hour(tick_rate)?;
    let elapsed_hours = Decimal::from(elapsed_ticks)
        .checked_div(Decimal::from(hour_ticks))
        .ok_or_else(|| SimError::overflow("elapsed hours"))?;

    let per_hour = hourly(population, structure_count, rates)?;
    let mut out = ResourceAmounts::ZERO;
    for kind in ResourceKind::ALL {
        let amount = per_hour
            .get(kind)
            .checked_mul(elapsed_hours)
            .ok_or_else(|| SimError::overflow("consumption scaling"))?;
        out.set(kind, amount);
    }
    Ok(out)
}

/// Whether current stock can sustain projected consumption over the
/// lookahead buffer.
///
/// Every resource kind is checked against its projected draw, upkeep
/// included. A settlement with zero population and zero structures is
/// trivially sufficient.
///
/// # Errors
///
/// Returns [`SimError`] if a projection computation overflows.
pub fn has_resources_for_population(
    population: u32,
    structure_count: usize,
    current: &ResourceAmounts,
    rates: &RatesConfig,
) -> Result<bool, SimError> {
    let per_hour = hourly(population, structure_count, rates)?;
    for kind in ResourceKind::ALL {
        let projected = per_hour
            .get(kind)
            .checked_mul(rates.shortage_lookahead_hours)
            .ok_or_else(|| SimError::overflow("shortage projection"))?;
        if current.get(kind) < projected {
            return Ok(false);
        }
    }
    Ok(true)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn zero_elapsed_consumes_nothing() {
        let rates = RatesConfig::default();
        let consumed = consume(25, 8, 0, 60, &rates).unwrap();
        assert!(consumed.is_zero());
    }

    #[test]
    fn one_hour_matches_rates() {
        let rates = RatesConfig::default();
        let hour_ticks = ticks_per_hour(60).unwrap();
        let consumed = consume(10, 4, hour_ticks, 60, &rates).unwrap();

        // 10 settlers * 0.5 food/hour, 4 structures * 0.2 wood/hour.
        assert_eq!(consumed.food, Decimal::from(5));
        assert_eq!(consumed.water, Decimal::new(75, 1));
        assert_eq!(consumed.wood, Decimal::new(8, 1));
        assert_eq!(consumed.stone, Decimal::new(4, 1));
        assert_eq!(consumed.ore, Decimal::new(2, 1));
    }

    #[test]
    fn consumption_is_linear_in_time() {
        let rates = RatesConfig::default();
        let hour_ticks = ticks_per_hour(60).unwrap();
        let one = consume(10, 4, hour_ticks, 60, &rates).unwrap();
        let two = consume(10, 4, hour_ticks.checked_mul(2).unwrap(), 60, &rates).unwrap();
        assert_eq!(two.food, one.food.checked_mul(Decimal::from(2)).unwrap());
    }

    #[test]
    fn sufficiency_accepts_full_buffer() {
        let rates = RatesConfig::default();
        let mut stock = ResourceAmounts::ZERO;
        stock.food = Decimal::from(100);
        stock.water = Decimal::from(100);
        stock.wood = Decimal::from(100);
        stock.stone = Decimal::from(100);
        stock.ore = Decimal::from(100);

        assert!(has_resources_for_population(10, 4, &stock, &rates).unwrap());
    }

    #[test]
    fn sufficiency_rejects_marginal_stock() {
        let rates = RatesConfig::default();
        // 10 settlers need 5 food for the one-hour buffer; 4.9 is short
        // even though instantaneous consumption would be far smaller.
        let mut stock = ResourceAmounts::ZERO;
        stock.food = Decimal::new(49, 1);
        stock.water = Decimal::from(100);

        assert!(!has_resources_for_population(10, 0, &stock, &rates).unwrap());
    }

    #[test]
    fn empty_settlement_is_sufficient() {
        let rates = RatesConfig::default();
        assert!(
            has_resources_for_population(0, 0, &ResourceAmounts::ZERO, &rates).unwrap()
        );
    }
}

//! Population dynamics: growth, happiness, and stochastic migration.
//!
//! Runs on the population evaluation period (minutes, not seconds), far
//! less often than the resource cycle. The model is a pure function of
//! its inputs and the injected random source, so migration-event tests
//! are deterministic under a seeded RNG.
//!
//! # Algorithm
//!
//! 1. Re-derive happiness from resource sufficiency and housing headroom,
//!    blended with the previous value to damp swings.
//! 2. Natural growth: `current * (1 + growth_rate)^periods`, capped at
//!    housing capacity.
//! 3. Immigration trial (chance rises with happiness): add a bounded
//!    random batch, never exceeding capacity.
//! 4. Emigration trial (chance rises as happiness falls): remove a tenth
//!    of the population, floored at 1.
//! 5. Clamp into `[1, capacity]`.

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use steading_types::{
    PopulationState, PopulationTrend, PopulationWarningKind, Structure, StructureCategory,
    modifier_names,
};

use crate::config::RatesConfig;
use crate::error::SimError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Upper bound on compounded growth periods for a single evaluation.
///
/// A settlement can sit dormant for a long time between evaluations;
/// compounding is cut off here so the growth loop stays bounded.
const MAX_ELAPSED_PERIODS: u32 = 1_000;

/// Happiness below which emigration risk is reported (35).
fn low_happiness_threshold() -> Decimal {
    Decimal::from(35)
}

/// Neutral happiness baseline before situation bonuses (50).
fn happiness_base() -> Decimal {
    Decimal::from(50)
}

/// Happiness bonus when the sufficiency predicate holds (+25).
fn fed_bonus() -> Decimal {
    Decimal::from(25)
}

/// Happiness penalty when it does not (-30).
fn hungry_penalty() -> Decimal {
    Decimal::from(30)
}

/// Happiness bonus for at least 10% housing headroom (+10).
fn headroom_bonus() -> Decimal {
    Decimal::from(10)
}

/// Happiness penalty when housing is full (-15).
fn crowded_penalty() -> Decimal {
    Decimal::from(15)
}

/// Fraction of the population that leaves on a successful emigration
/// trial (0.1, rounded up).
fn emigrant_fraction() -> Decimal {
    Decimal::new(1, 1)
}

/// Natural growth rate per period at full happiness (0.02).
fn max_growth_rate() -> Decimal {
    Decimal::new(2, 2)
}

// ---------------------------------------------------------------------------
// Inputs and outcome
// ---------------------------------------------------------------------------

/// Inputs to one population evaluation.
#[derive(Debug, Clone)]
pub struct PopulationInputs {
    /// The persisted population record being re-evaluated.
    pub state: PopulationState,
    /// Housing capacity derived from the structure snapshot.
    pub housing_capacity: u32,
    /// Result of the resource sufficiency predicate for this settlement.
    pub fed: bool,
    /// Whole evaluation periods elapsed since the last evaluation.
    pub elapsed_periods: u32,
}

/// A population risk condition detected during an evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopulationWarning {
    /// What triggered the warning.
    pub kind: PopulationWarningKind,
    /// Human-readable description for the client.
    pub message: String,
}

/// Result of one population evaluation.
#[derive(Debug, Clone)]
pub struct PopulationOutcome {
    /// The updated record to persist (only if `changed`).
    pub state: PopulationState,
    /// Population before the evaluation.
    pub previous: u32,
    /// Settlers added by a successful immigration trial.
    pub immigrants: u32,
    /// Settlers removed by a successful emigration trial.
    pub emigrants: u32,
    /// Population trend over this evaluation.
    pub trend: PopulationTrend,
    /// Risk conditions detected this evaluation, in detection order.
    pub warnings: Vec<PopulationWarning>,
    /// Whether the persisted record actually changed.
    pub changed: bool,
    /// Human-readable mood description for the summary event.
    pub description: String,
}

// ---------------------------------------------------------------------------
// Derivations
// ---------------------------------------------------------------------------

/// Housing capacity from the structure snapshot.
///
/// Base capacity plus, per housing structure, its `housing` modifier
/// (or the configured default) scaled by level. Always at least 1 so
/// the population floor invariant is representable.
///
/// # Errors
///
/// Returns [`SimError`] if a computation overflows.
pub fn housing_capacity(structures: &[Structure], rates: &RatesConfig) -> Result<u32, SimError> {
    let mut total = rates.base_population_capacity;

    for structure in structures {
        if structure.category() != StructureCategory::Housing {
            continue;
        }
        let per_structure = structure
            .modifier(modifier_names::HOUSING)
            .unwrap_or_else(|| Decimal::from(rates.default_housing_per_structure));
        let housed = per_structure
            .checked_mul(structure.level())
            .ok_or_else(|| SimError::overflow("housing scaling"))?
            .floor()
            .to_u32()
            .ok_or_else(|| SimError::overflow("housing conversion"))?;
        total = total
            .checked_add(housed)
            .ok_or_else(|| SimError::overflow("housing accumulation"))?;
    }

    Ok(total.max(1))
}

/// Derive the new happiness scalar, blended with the previous value.
fn derive_happiness(
    previous: Decimal,
    fed: bool,
    current: u32,
    capacity: u32,
) -> Result<Decimal, SimError> {
    let mut derived = happiness_base();
    derived = if fed {
        derived
            .checked_add(fed_bonus())
            .ok_or_else(|| SimError::overflow("happiness fed bonus"))?
    } else {
        derived
            .checked_sub(hungry_penalty())
            .ok_or_else(|| SimError::overflow("happiness hunger penalty"))?
    };

    // Housing headroom: at least 10% free space is a bonus, none at all
    // is a penalty.
    let tenth_of_capacity = capacity.checked_div(10).unwrap_or(0);
    let headroom = capacity.saturating_sub(current);
    if current >= capacity {
        derived = derived
            .checked_sub(crowded_penalty())
            .ok_or_else(|| SimError::overflow("happiness crowding penalty"))?;
    } else if headroom >= tenth_of_capacity.max(1) {
        derived = derived
            .checked_add(headroom_bonus())
            .ok_or_else(|| SimError::overflow("happiness headroom bonus"))?;
    }

    derived = derived.clamp(Decimal::ZERO, Decimal::from(100));

    // Blend 50/50 with the previous value to damp swings.
    let blended = previous
        .checked_add(derived)
        .and_then(|sum| sum.checked_div(Decimal::from(2)))
        .ok_or_else(|| SimError::overflow("happiness blending"))?;
    Ok(blended.clamp(Decimal::ZERO, Decimal::from(100)))
}

/// Growth rate per period for a happiness level.
fn derive_growth_rate(happiness: Decimal) -> Result<Decimal, SimError> {
    happiness
        .checked_div(Decimal::from(100))
        .and_then(|fraction| fraction.checked_mul(max_growth_rate()))
        .ok_or_else(|| SimError::overflow("growth rate derivation"))
}

/// Immigration chance per evaluation: rises with happiness, zero at or
/// below the low-happiness threshold.
fn derive_immigration_chance(happiness: Decimal) -> Result<Decimal, SimError> {
    if happiness <= low_happiness_threshold() {
        return Ok(Decimal::ZERO);
    }
    happiness
        .checked_div(Decimal::from(200))
        .ok_or_else(|| SimError::overflow("immigration chance derivation"))
}

/// Emigration chance per evaluation: rises as happiness falls below 50.
fn derive_emigration_chance(happiness: Decimal) -> Result<Decimal, SimError> {
    let deficit = Decimal::from(50)
        .checked_sub(happiness)
        .ok_or_else(|| SimError::overflow("emigration chance derivation"))?;
    let chance = deficit
        .checked_div(Decimal::from(100))
        .ok_or_else(|| SimError::overflow("emigration chance scaling"))?;
    Ok(chance.max(Decimal::ZERO))
}

/// Run one Bernoulli trial with a `Decimal` probability in `[0, 1]`.
///
/// The roll is an integer in `0..10_000` compared against the chance
/// scaled by 10,000, keeping the trial in exact arithmetic.
fn bernoulli(chance: Decimal, rng: &mut impl Rng) -> Result<bool, SimError> {
    if chance <= Decimal::ZERO {
        return Ok(false);
    }
    let scaled = chance
        .checked_mul(Decimal::from(10_000))
        .ok_or_else(|| SimError::overflow("trial probability scaling"))?;
    let roll: u32 = rng.random_range(0..10_000);
    Ok(Decimal::from(roll) < scaled)
}

/// Mood description for the summary event.
fn describe(happiness: Decimal) -> String {
    let mood = if happiness >= Decimal::from(80) {
        "thriving"
    } else if happiness >= Decimal::from(60) {
        "content"
    } else if happiness >= Decimal::from(40) {
        "uneasy"
    } else if happiness >= Decimal::from(20) {
        "restless"
    } else {
        "desperate"
    };
    format!("The settlement is {mood}.")
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Evaluate population dynamics for one settlement.
///
/// Pure except for draws on `rng`. The caller persists `outcome.state`
/// and emits events only according to the outcome flags. A population of
/// zero (never initialized) is left untouched.
///
/// # Errors
///
/// Returns [`SimError`] if a computation overflows.
#[allow(clippy::too_many_lines)]
pub fn evaluate(
    inputs: &PopulationInputs,
    rng: &mut impl Rng,
    now: DateTime<Utc>,
) -> Result<PopulationOutcome, SimError> {
    let previous = inputs.state.current;
    let capacity = inputs.housing_capacity.max(1);

    if previous == 0 {
        return Ok(PopulationOutcome {
            state: inputs.state.clone(),
            previous,
            immigrants: 0,
            emigrants: 0,
            trend: PopulationTrend::Stable,
            warnings: Vec::new(),
            changed: false,
            description: describe(inputs.state.happiness),
        });
    }

    // 1. Happiness and the rates derived from it.
    let happiness = derive_happiness(inputs.state.happiness, inputs.fed, previous, capacity)?;
    let growth_rate = derive_growth_rate(happiness)?;
    let immigration_chance = derive_immigration_chance(happiness)?;
    let emigration_chance = derive_emigration_chance(happiness)?;

    // 2. Natural growth, compounded per whole elapsed period.
    let periods = inputs.elapsed_periods.min(MAX_ELAPSED_PERIODS);
    let factor = Decimal::ONE
        .checked_add(growth_rate)
        .ok_or_else(|| SimError::overflow("growth factor"))?;
    let mut grown_exact = Decimal::from(previous);
    for _ in 0..periods {
        if grown_exact >= Decimal::from(capacity) {
            break;
        }
        grown_exact = grown_exact
            .checked_mul(factor)
            .ok_or_else(|| SimError::overflow("growth compounding"))?;
    }
    let mut population = grown_exact
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u32()
        .ok_or_else(|| SimError::overflow("grown population conversion"))?
        .min(capacity);

    // 3. Immigration trial.
    let mut immigrants = 0_u32;
    if bernoulli(immigration_chance, rng)? {
        let max_batch = capacity.checked_div(20).unwrap_or(0).max(1);
        let batch: u32 = rng.random_range(1..=max_batch);
        let headroom = capacity.saturating_sub(population);
        immigrants = batch.min(headroom);
        population = population.saturating_add(immigrants);
    }

    // 4. Emigration trial.
    let mut emigrants = 0_u32;
    if bernoulli(emigration_chance, rng)? {
        let leaving = Decimal::from(population)
            .checked_mul(emigrant_fraction())
            .ok_or_else(|| SimError::overflow("emigrant count"))?
            .ceil()
            .to_u32()
            .ok_or_else(|| SimError::overflow("emigrant conversion"))?;
        // Floor at 1: the last settler never leaves.
        emigrants = leaving.min(population.saturating_sub(1));
        population = population.saturating_sub(emigrants);
    }

    // 5. Final clamp into [1, capacity].
    let population = population.clamp(1, capacity);

    let trend = match population.cmp(&previous) {
        core::cmp::Ordering::Greater => PopulationTrend::Growing,
        core::cmp::Ordering::Less => PopulationTrend::Declining,
        core::cmp::Ordering::Equal => PopulationTrend::Stable,
    };

    let mut warnings = Vec::new();
    if emigrants > 0 {
        warnings.push(PopulationWarning {
            kind: PopulationWarningKind::Emigration,
            message: format!("{emigrants} settlers packed up and left."),
        });
    }
    if happiness < low_happiness_threshold() && emigration_chance > Decimal::ZERO {
        warnings.push(PopulationWarning {
            kind: PopulationWarningKind::LowHappiness,
            message: String::from("Settlers are unhappy and may leave."),
        });
    }
    if population >= capacity {
        warnings.push(PopulationWarning {
            kind: PopulationWarningKind::NoHousing,
            message: String::from("There is no housing left for new settlers."),
        });
    }

    let changed = population != previous || happiness != inputs.state.happiness;
    let state = PopulationState {
        current: population,
        capacity,
        happiness,
        growth_rate,
        immigration_chance,
        emigration_chance,
        last_growth_at: if changed {
            now
        } else {
            inputs.state.last_growth_at
        },
    };

    Ok(PopulationOutcome {
        state,
        previous,
        immigrants,
        emigrants,
        trend,
        warnings,
        changed,
        description: describe(happiness),
    })
}

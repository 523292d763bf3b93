//! Pure simulation models for the Steading simulation core.
//!
//! This crate contains the numeric models that turn settlement state into
//! new settlement state -- everything that computes without touching I/O.
//! It sits between `steading-types` (which defines the data structures)
//! and `steading-core` (which schedules, persists, and broadcasts).
//!
//! # Modules
//!
//! - [`config`] -- Tunable per-hour rates and thresholds ([`RatesConfig`])
//! - [`production`] -- Extractor output over an elapsed tick window
//! - [`consumption`] -- Population/structure upkeep and the sufficiency predicate
//! - [`storage`] -- Capacity, clamping, waste, and near-capacity detection
//! - [`population`] -- Periodic stochastic growth and migration
//! - [`error`] -- Error types for all model operations ([`SimError`])
//!
//! All models are pure functions of their inputs; the population model
//! additionally draws on an injected [`rand::Rng`] so its stochastic
//! behavior is deterministic under a seeded source.

pub mod config;
pub mod consumption;
pub mod error;
pub mod population;
pub mod production;
pub mod storage;

// Re-export primary types at crate root for convenience.
pub use config::RatesConfig;
pub use error::SimError;
pub use population::{
    PopulationInputs, PopulationOutcome, PopulationWarning, evaluate, housing_capacity,
};

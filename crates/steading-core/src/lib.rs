//! Tick scheduling and orchestration for the Steading simulation core.
//!
//! This crate drives the real-time simulation of every registered
//! settlement: a fixed-rate tick loop that, on coarse-period ticks,
//! fetches settlement state through the narrow [`SettlementStore`]
//! interface, runs the `steading-sim` models over the elapsed window,
//! persists the results, and broadcasts incremental updates on a
//! per-world [`EventBus`].
//!
//! # Modules
//!
//! - [`config`] -- YAML-backed typed configuration ([`SimulationConfig`])
//! - [`registry`] -- The membership set under active simulation ([`Registry`])
//! - [`store`] -- The store trait and the in-memory test store
//! - [`events`] -- Per-world broadcast bus for simulation events
//! - [`cycle`] -- The per-settlement simulation cycle
//! - [`scheduler`] -- The tick loop and its control surface ([`Scheduler`])

pub mod config;
pub mod cycle;
pub mod events;
pub mod registry;
pub mod scheduler;
pub mod store;

// Re-export primary types at crate root for convenience.
pub use config::{ConfigError, SchedulerConfig, SimulationConfig};
pub use cycle::{CycleContext, CycleError, CycleOutcome, run_settlement_cycle};
pub use events::EventBus;
pub use registry::{Registry, SettlementSimState};
pub use scheduler::{Scheduler, SchedulerStatus};
pub use store::{MemoryStore, SettlementStore, StoreError};

//! Shared type definitions for the Steading simulation core.
//!
//! This crate is the single source of truth for all types used across the
//! Steading workspace. Types defined here flow downstream to `TypeScript`
//! via `ts-rs` for the game client.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for all entity identifiers
//! - [`enums`] -- Enumeration types (resources, structures, biomes, population)
//! - [`resources`] -- Resource quantity vectors and storage capacity
//! - [`structs`] -- Core entity structs (settlements, plots, structures, population)
//! - [`events`] -- Broadcast events pushed to listeners after each cycle

pub mod enums;
pub mod events;
pub mod ids;
pub mod resources;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{
    Biome, PopulationTrend, PopulationWarningKind, ResourceKind, StructureCategory, StructureKind,
};
pub use events::{SimEvent, SimEventPayload};
pub use ids::{PlayerId, PlotId, SettlementId, StorageId, StructureId, WorldId};
pub use resources::{NearCapacityFlags, ResourceAmounts, ResourceDelta, StorageCapacity};
pub use structs::{
    Plot, PopulationState, Settlement, SettlementDetail, SettlementStorage, Structure,
    StructureModifier, modifier_names,
};

#[cfg(test)]
mod tests {
    //! Integration tests for type exports and `TypeScript` binding generation.

    #[test]
    fn export_bindings() {
        // ts-rs generates TypeScript bindings when types with
        // #[ts(export)] are used. Importing them here triggers generation.
        // The actual files are written to the `bindings/` directory
        // relative to the crate root.
        use ts_rs::TS;

        // IDs
        let _ = crate::ids::SettlementId::export_all();
        let _ = crate::ids::PlayerId::export_all();
        let _ = crate::ids::WorldId::export_all();
        let _ = crate::ids::PlotId::export_all();
        let _ = crate::ids::StructureId::export_all();
        let _ = crate::ids::StorageId::export_all();

        // Enums
        let _ = crate::enums::ResourceKind::export_all();
        let _ = crate::enums::StructureKind::export_all();
        let _ = crate::enums::StructureCategory::export_all();
        let _ = crate::enums::Biome::export_all();
        let _ = crate::enums::PopulationTrend::export_all();
        let _ = crate::enums::PopulationWarningKind::export_all();

        // Resources
        let _ = crate::resources::ResourceAmounts::export_all();
        let _ = crate::resources::ResourceDelta::export_all();
        let _ = crate::resources::StorageCapacity::export_all();
        let _ = crate::resources::NearCapacityFlags::export_all();

        // Structs
        let _ = crate::structs::Settlement::export_all();
        let _ = crate::structs::SettlementStorage::export_all();
        let _ = crate::structs::SettlementDetail::export_all();
        let _ = crate::structs::Plot::export_all();
        let _ = crate::structs::Structure::export_all();
        let _ = crate::structs::PopulationState::export_all();

        // Events
        let _ = crate::events::SimEvent::export_all();
        let _ = crate::events::SimEventPayload::export_all();
    }
}

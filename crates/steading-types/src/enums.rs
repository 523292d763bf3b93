//! Enumeration types for the Steading simulation core.
//!
//! Resource kinds, structure classification, biomes, and the population
//! status/warning vocabulary used by the broadcast events.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Resource Kinds
// ---------------------------------------------------------------------------

/// A raw resource tracked in settlement storage.
///
/// The simulation core works over exactly these five kinds: the two
/// consumables the population eats and drinks, and the three materials
/// structures are built and maintained from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum ResourceKind {
    /// Crops, game, and other edibles consumed by the population.
    Food,
    /// Fresh water consumed by the population.
    Water,
    /// Lumber harvested from forests.
    Wood,
    /// Quarried stone.
    Stone,
    /// Raw ore extracted from mines.
    Ore,
}

impl ResourceKind {
    /// All resource kinds in canonical order.
    pub const ALL: [Self; 5] = [
        Self::Food,
        Self::Water,
        Self::Wood,
        Self::Stone,
        Self::Ore,
    ];
}

// ---------------------------------------------------------------------------
// Structure Classification
// ---------------------------------------------------------------------------

/// A type of structure that can stand in a settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum StructureKind {
    // --- Extractors ---
    /// Agricultural plot producing food.
    Farm,
    /// A reliable water source independent of rivers.
    Well,
    /// Forestry camp producing wood.
    LumberCamp,
    /// Stone quarry.
    Quarry,
    /// Ore mine.
    Mine,

    // --- Storage ---
    /// Food-focused storage building.
    Granary,
    /// General bulk storage.
    Warehouse,
    /// Open material stockpile.
    Stockpile,

    // --- Housing ---
    /// A small single-family dwelling.
    Cabin,
    /// A full family house.
    House,
    /// Communal housing for many settlers.
    Longhouse,

    // --- Civic ---
    /// Gathering place for settlement decisions.
    MeetingHall,
    /// Trading venue run by the settlement.
    Market,
}

impl StructureKind {
    /// Return the functional category this structure belongs to.
    pub const fn category(self) -> StructureCategory {
        match self {
            Self::Farm | Self::Well | Self::LumberCamp | Self::Quarry | Self::Mine => {
                StructureCategory::Extractor
            }
            Self::Granary | Self::Warehouse | Self::Stockpile => StructureCategory::Storage,
            Self::Cabin | Self::House | Self::Longhouse => StructureCategory::Housing,
            Self::MeetingHall | Self::Market => StructureCategory::Civic,
        }
    }
}

/// The functional category of a structure.
///
/// Determines which simulation model reads the structure: extractors feed
/// the production model, storage feeds the capacity model, housing feeds
/// the population model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum StructureCategory {
    /// Produces raw resources from the plot over time.
    Extractor,
    /// Raises per-resource storage capacity.
    Storage,
    /// Houses settlers, raising population capacity.
    Housing,
    /// Social and economic functions outside the simulation core.
    Civic,
}

// ---------------------------------------------------------------------------
// Biomes
// ---------------------------------------------------------------------------

/// The terrain type of the plot a settlement occupies.
///
/// Biomes scale extractor output per resource kind; the efficiency table
/// lives in the production model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum Biome {
    /// Open grassland, strong for farming.
    Plains,
    /// Dense woodland, strong for lumber.
    Forest,
    /// Rolling hills with exposed rock.
    Hills,
    /// High terrain rich in stone and ore.
    Mountains,
    /// Waterlogged lowland, abundant water.
    Wetlands,
    /// Arid land, poor for food and water.
    Desert,
}

// ---------------------------------------------------------------------------
// Population Vocabulary
// ---------------------------------------------------------------------------

/// Trend of a settlement's population reported in the periodic summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum PopulationTrend {
    /// Population rose during the last evaluation.
    Growing,
    /// Population was unchanged during the last evaluation.
    Stable,
    /// Population fell during the last evaluation.
    Declining,
}

/// The kind of condition that triggered a `population-warning` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum PopulationWarningKind {
    /// Happiness dropped below the emigration-risk threshold.
    LowHappiness,
    /// The settlement has no housing headroom left.
    NoHousing,
    /// Settlers left during the last evaluation.
    Emigration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_has_a_category() {
        assert_eq!(StructureKind::Farm.category(), StructureCategory::Extractor);
        assert_eq!(StructureKind::Granary.category(), StructureCategory::Storage);
        assert_eq!(StructureKind::Cabin.category(), StructureCategory::Housing);
        assert_eq!(StructureKind::Market.category(), StructureCategory::Civic);
    }

    #[test]
    fn resource_kinds_are_complete_and_ordered() {
        assert_eq!(ResourceKind::ALL.len(), 5);
        assert_eq!(ResourceKind::ALL.first(), Some(&ResourceKind::Food));
        assert_eq!(ResourceKind::ALL.last(), Some(&ResourceKind::Ore));
    }

    #[test]
    fn warning_kind_serializes_snake_case() {
        let json = serde_json::to_string(&PopulationWarningKind::LowHappiness).ok();
        assert_eq!(json.as_deref(), Some("\"low_happiness\""));
    }
}

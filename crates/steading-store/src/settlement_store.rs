//! The `PostgreSQL`-backed [`SettlementStore`] implementation.
//!
//! Every trait method maps to one narrow, parameterized query against
//! the game schema. The simulation core reads settlement rows the API
//! service writes, and writes back only the storage amounts and the
//! population record -- the two records it owns.

use sqlx::PgPool;
use uuid::Uuid;

use steading_core::{SettlementStore, StoreError};
use steading_types::{
    Biome, Plot, PlayerId, PopulationState, ResourceAmounts, Settlement, SettlementDetail,
    SettlementId, SettlementStorage, StorageId, Structure, StructureId, StructureKind,
    StructureModifier,
};

use crate::error::PgError;
use crate::postgres::PostgresPool;

/// [`SettlementStore`] backed by `PostgreSQL`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a store over an established connection pool.
    pub fn new(pool: &PostgresPool) -> Self {
        Self {
            pool: pool.pool().clone(),
        }
    }
}

/// Joined settlement/storage/plot row for the detail fetch.
#[derive(Debug, sqlx::FromRow)]
struct DetailRow {
    id: Uuid,
    owner_id: Uuid,
    world_id: Uuid,
    name: String,
    founded_at: chrono::DateTime<chrono::Utc>,
    storage_id: Option<Uuid>,
    food: Option<rust_decimal::Decimal>,
    water: Option<rust_decimal::Decimal>,
    wood: Option<rust_decimal::Decimal>,
    stone: Option<rust_decimal::Decimal>,
    ore: Option<rust_decimal::Decimal>,
    plot_id: Option<Uuid>,
    area: Option<rust_decimal::Decimal>,
    yield_food: Option<rust_decimal::Decimal>,
    yield_water: Option<rust_decimal::Decimal>,
    yield_wood: Option<rust_decimal::Decimal>,
    yield_stone: Option<rust_decimal::Decimal>,
    yield_ore: Option<rust_decimal::Decimal>,
    biome: Option<String>,
}

/// One structure/modifier row; modifiers repeat the structure columns.
#[derive(Debug, sqlx::FromRow)]
struct StructureRow {
    id: Uuid,
    name: String,
    kind: String,
    modifier_name: Option<String>,
    modifier_value: Option<rust_decimal::Decimal>,
}

/// Population record row.
#[derive(Debug, sqlx::FromRow)]
struct PopulationRow {
    current: i64,
    capacity: i64,
    happiness: rust_decimal::Decimal,
    growth_rate: rust_decimal::Decimal,
    immigration_chance: rust_decimal::Decimal,
    emigration_chance: rust_decimal::Decimal,
    last_growth_at: chrono::DateTime<chrono::Utc>,
}

/// Parse a structure kind from its database representation.
fn structure_kind_from_db(value: &str) -> Result<StructureKind, PgError> {
    match value {
        "farm" => Ok(StructureKind::Farm),
        "well" => Ok(StructureKind::Well),
        "lumber_camp" => Ok(StructureKind::LumberCamp),
        "quarry" => Ok(StructureKind::Quarry),
        "mine" => Ok(StructureKind::Mine),
        "granary" => Ok(StructureKind::Granary),
        "warehouse" => Ok(StructureKind::Warehouse),
        "stockpile" => Ok(StructureKind::Stockpile),
        "cabin" => Ok(StructureKind::Cabin),
        "house" => Ok(StructureKind::House),
        "longhouse" => Ok(StructureKind::Longhouse),
        "meeting_hall" => Ok(StructureKind::MeetingHall),
        "market" => Ok(StructureKind::Market),
        other => Err(PgError::MalformedRow(format!(
            "unknown structure kind: {other}"
        ))),
    }
}

/// Parse a biome from its database representation.
fn biome_from_db(value: &str) -> Result<Biome, PgError> {
    match value {
        "plains" => Ok(Biome::Plains),
        "forest" => Ok(Biome::Forest),
        "hills" => Ok(Biome::Hills),
        "mountains" => Ok(Biome::Mountains),
        "wetlands" => Ok(Biome::Wetlands),
        "desert" => Ok(Biome::Desert),
        other => Err(PgError::MalformedRow(format!("unknown biome: {other}"))),
    }
}

/// Convert a non-negative database count to `u32`.
fn count_from_db(value: i64, what: &str) -> Result<u32, PgError> {
    u32::try_from(value)
        .map_err(|_err| PgError::MalformedRow(format!("{what} out of range: {value}")))
}

impl DetailRow {
    /// Assemble the domain detail payload from the joined row.
    fn into_detail(self) -> Result<SettlementDetail, PgError> {
        let settlement_id = SettlementId::from(self.id);

        let storage = self.storage_id.map(|storage_id| SettlementStorage {
            id: StorageId::from(storage_id),
            settlement_id,
            amounts: ResourceAmounts {
                food: self.food.unwrap_or_default(),
                water: self.water.unwrap_or_default(),
                wood: self.wood.unwrap_or_default(),
                stone: self.stone.unwrap_or_default(),
                ore: self.ore.unwrap_or_default(),
            },
        });

        let plot = self.plot_id.map(|plot_id| Plot {
            id: plot_id.into(),
            area: self.area.unwrap_or_default(),
            base_yields: ResourceAmounts {
                food: self.yield_food.unwrap_or_default(),
                water: self.yield_water.unwrap_or_default(),
                wood: self.yield_wood.unwrap_or_default(),
                stone: self.yield_stone.unwrap_or_default(),
                ore: self.yield_ore.unwrap_or_default(),
            },
        });

        let biome = self
            .biome
            .as_deref()
            .map(biome_from_db)
            .transpose()?;

        Ok(SettlementDetail {
            settlement: Settlement {
                id: settlement_id,
                owner_id: PlayerId::from(self.owner_id),
                world_id: self.world_id.into(),
                name: self.name,
                founded_at: self.founded_at,
            },
            storage,
            plot,
            biome,
        })
    }
}

impl SettlementStore for PgStore {
    async fn list_owned_settlements(
        &self,
        owner: PlayerId,
    ) -> Result<Vec<SettlementId>, StoreError> {
        let rows: Vec<(Uuid,)> =
            sqlx::query_as(r"SELECT id FROM settlements WHERE owner_id = $1 ORDER BY id")
                .bind(owner.into_inner())
                .fetch_all(&self.pool)
                .await
                .map_err(PgError::Postgres)?;

        Ok(rows.into_iter().map(|(id,)| SettlementId::from(id)).collect())
    }

    async fn fetch_detail(
        &self,
        settlement: SettlementId,
    ) -> Result<Option<SettlementDetail>, StoreError> {
        let row: Option<DetailRow> = sqlx::query_as(
            r"SELECT s.id, s.owner_id, s.world_id, s.name, s.founded_at,
                     st.id AS storage_id, st.food, st.water, st.wood, st.stone, st.ore,
                     p.id AS plot_id, p.area,
                     p.yield_food, p.yield_water, p.yield_wood, p.yield_stone, p.yield_ore,
                     p.biome
              FROM settlements s
              LEFT JOIN settlement_storage st ON st.settlement_id = s.id
              LEFT JOIN plots p ON p.settlement_id = s.id
              WHERE s.id = $1",
        )
        .bind(settlement.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(PgError::Postgres)?;

        row.map(DetailRow::into_detail)
            .transpose()
            .map_err(StoreError::from)
    }

    async fn fetch_structures(
        &self,
        settlement: SettlementId,
    ) -> Result<Vec<Structure>, StoreError> {
        let rows: Vec<StructureRow> = sqlx::query_as(
            r"SELECT st.id, st.name, st.kind,
                     m.name AS modifier_name, m.value AS modifier_value
              FROM structures st
              LEFT JOIN structure_modifiers m ON m.structure_id = st.id
              WHERE st.settlement_id = $1
              ORDER BY st.id, m.position",
        )
        .bind(settlement.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(PgError::Postgres)?;

        // Rows arrive structure-major; fold the modifier rows into their
        // structure in arrival order.
        let mut structures: Vec<Structure> = Vec::new();
        for row in rows {
            let structure_id = StructureId::from(row.id);
            let modifier = match (row.modifier_name, row.modifier_value) {
                (Some(name), Some(value)) => Some(StructureModifier { name, value }),
                _ => None,
            };

            let continues_last = structures
                .last()
                .is_some_and(|last| last.id == structure_id);
            if continues_last {
                if let (Some(modifier), Some(last)) = (modifier, structures.last_mut()) {
                    last.modifiers.push(modifier);
                }
            } else {
                let kind = structure_kind_from_db(&row.kind).map_err(StoreError::from)?;
                structures.push(Structure {
                    id: structure_id,
                    name: row.name,
                    kind,
                    modifiers: modifier.into_iter().collect(),
                });
            }
        }

        Ok(structures)
    }

    async fn fetch_population(
        &self,
        settlement: SettlementId,
    ) -> Result<Option<PopulationState>, StoreError> {
        let row: Option<PopulationRow> = sqlx::query_as(
            r"SELECT current, capacity, happiness, growth_rate,
                     immigration_chance, emigration_chance, last_growth_at
              FROM settlement_population
              WHERE settlement_id = $1",
        )
        .bind(settlement.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(PgError::Postgres)?;

        row.map(|row| {
            Ok::<_, PgError>(PopulationState {
                current: count_from_db(row.current, "population")?,
                capacity: count_from_db(row.capacity, "population capacity")?,
                happiness: row.happiness,
                growth_rate: row.growth_rate,
                immigration_chance: row.immigration_chance,
                emigration_chance: row.emigration_chance,
                last_growth_at: row.last_growth_at,
            })
        })
        .transpose()
        .map_err(StoreError::from)
    }

    async fn update_population(
        &self,
        settlement: SettlementId,
        record: PopulationState,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r"INSERT INTO settlement_population
                  (settlement_id, current, capacity, happiness, growth_rate,
                   immigration_chance, emigration_chance, last_growth_at)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
              ON CONFLICT (settlement_id) DO UPDATE SET
                  current = EXCLUDED.current,
                  capacity = EXCLUDED.capacity,
                  happiness = EXCLUDED.happiness,
                  growth_rate = EXCLUDED.growth_rate,
                  immigration_chance = EXCLUDED.immigration_chance,
                  emigration_chance = EXCLUDED.emigration_chance,
                  last_growth_at = EXCLUDED.last_growth_at",
        )
        .bind(settlement.into_inner())
        .bind(i64::from(record.current))
        .bind(i64::from(record.capacity))
        .bind(record.happiness)
        .bind(record.growth_rate)
        .bind(record.immigration_chance)
        .bind(record.emigration_chance)
        .bind(record.last_growth_at)
        .execute(&self.pool)
        .await
        .map_err(PgError::Postgres)?;

        tracing::debug!(settlement_id = %settlement, "Population record updated");
        Ok(())
    }

    async fn update_storage(
        &self,
        storage: StorageId,
        amounts: ResourceAmounts,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r"UPDATE settlement_storage
              SET food = $2, water = $3, wood = $4, stone = $5, ore = $6
              WHERE id = $1",
        )
        .bind(storage.into_inner())
        .bind(amounts.food)
        .bind(amounts.water)
        .bind(amounts.wood)
        .bind(amounts.stone)
        .bind(amounts.ore)
        .execute(&self.pool)
        .await
        .map_err(PgError::Postgres)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                what: format!("storage record {storage}"),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structure_kinds_parse_from_db_strings() {
        assert_eq!(
            structure_kind_from_db("farm").ok(),
            Some(StructureKind::Farm)
        );
        assert_eq!(
            structure_kind_from_db("lumber_camp").ok(),
            Some(StructureKind::LumberCamp)
        );
        assert_eq!(
            structure_kind_from_db("meeting_hall").ok(),
            Some(StructureKind::MeetingHall)
        );
        assert!(structure_kind_from_db("ziggurat").is_err());
    }

    #[test]
    fn biomes_parse_from_db_strings() {
        assert_eq!(biome_from_db("plains").ok(), Some(Biome::Plains));
        assert_eq!(biome_from_db("wetlands").ok(), Some(Biome::Wetlands));
        assert!(biome_from_db("lunar").is_err());
    }

    #[test]
    fn counts_reject_negative_values() {
        assert_eq!(count_from_db(7, "population").ok(), Some(7));
        assert!(count_from_db(-1, "population").is_err());
    }
}

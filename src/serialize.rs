//! # Snapshots
//!
//! JSON documents holding a set of entities and their components.
//!
//! ```json
//! {
//!   "TypeName": "World",
//!   "EntityCount": 2,
//!   "EntityIDs": [4, 9],
//!   "AllEntities": [
//!     { "ID": 4, "LocalTransform": { "position": [0.0, 1.0, 0.0], ... } }
//!   ]
//! }
//! ```
//!
//! Entities without components appear in `EntityIDs` only. Loading creates a fresh entity for every
//! listed ID, then replays each component and remaps embedded entity references.

use nohash::IntSet;
use serde::Deserialize;
use serde::Serialize;

use crate::entity::EntityHandle;
use crate::entity::EntityRemap;
use crate::error::EcsError;
use crate::error::EcsResult;
use crate::registry::TypeIndex;
use crate::World;

/// Type name written to and expected from every snapshot.
pub const SNAPSHOT_TYPE_NAME: &str = "World";

const ID_KEY: &str = "ID";

/// # World Snapshot
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WorldSnapshot {
    /// Document tag, always [SNAPSHOT_TYPE_NAME].
    pub type_name: String,
    /// Number of entries in `entity_ids`.
    pub entity_count: usize,
    /// Public IDs of every saved entity.
    #[serde(rename = "EntityIDs")]
    pub entity_ids: Vec<u32>,
    /// One object per entity that owns components: its `ID` plus one field per component type.
    pub all_entities: Vec<serde_json::Map<String, serde_json::Value>>,
}

impl WorldSnapshot {
    /// Encodes the snapshot as pretty-printed JSON.
    pub fn to_json_string(&self) -> EcsResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Decodes a snapshot and checks its type name.
    pub fn from_json_str(source: &str) -> EcsResult<Self> {
        let snapshot: Self = serde_json::from_str(source)?;
        snapshot.check_type_name()?;

        Ok(snapshot)
    }

    fn check_type_name(&self) -> EcsResult<()> {
        if self.type_name == SNAPSHOT_TYPE_NAME {
            return Ok(());
        }

        tracing::error!(
            expected = SNAPSHOT_TYPE_NAME,
            found = %self.type_name,
            "snapshot type name mismatch"
        );

        Err(EcsError::TypeNameMismatch {
            expected: SNAPSHOT_TYPE_NAME.to_string(),
            found: self.type_name.clone(),
        })
    }
}

impl World {
    /// Saves the given entities. Invalid and pending-deletion handles are skipped, and a handle
    /// listed more than once is saved once.
    pub fn serialise_entities(&self, entities: &[EntityHandle]) -> EcsResult<WorldSnapshot> {
        let mut entity_ids = Vec::with_capacity(entities.len());
        let mut emitted = IntSet::default();
        let mut all_entities = Vec::new();

        for &entity in entities {
            if !self.is_handle_valid(entity) || self.is_pending_delete(entity) {
                continue;
            }
            if !emitted.insert(entity.public_id()) {
                continue;
            }

            entity_ids.push(entity.public_id());

            let mut entry = serde_json::Map::new();
            for info in self.registry().all_types() {
                let Some(slot) = self.visible_slot(entity, info.index()) else {
                    continue;
                };
                let Some(storage) = self.storage(info.index()) else {
                    continue;
                };

                entry.insert(info.name().to_string(), storage.serialize_slot(slot)?);
            }

            if !entry.is_empty() {
                entry.insert(ID_KEY.to_string(), entity.public_id().into());
                all_entities.push(entry);
            }
        }

        Ok(WorldSnapshot {
            type_name: SNAPSHOT_TYPE_NAME.to_string(),
            entity_count: entity_ids.len(),
            entity_ids,
            all_entities,
        })
    }

    /// Saves every live entity.
    pub fn serialise_world(&self) -> EcsResult<WorldSnapshot> {
        self.serialise_entities(&self.live_entities())
    }

    /// Loads a snapshot into fresh entities and returns the table from saved IDs to new handles.
    ///
    /// Entities created before an error is found stay in the world.
    pub fn deserialise_entities(&self, snapshot: &WorldSnapshot) -> EcsResult<EntityRemap> {
        snapshot.check_type_name()?;
        if snapshot.entity_count != snapshot.entity_ids.len() {
            return Err(EcsError::MalformedSnapshot(format!(
                "EntityCount is {} but {} IDs are listed",
                snapshot.entity_count,
                snapshot.entity_ids.len()
            )));
        }

        let mut remap = EntityRemap::new();
        for &saved_id in &snapshot.entity_ids {
            let entity = self.add_entity();
            if entity.is_null() {
                return Err(EcsError::InvalidHandle(entity));
            }

            remap.insert(saved_id, entity);
        }

        let mut loaded: Vec<(TypeIndex, u32)> = Vec::new();
        for entry in &snapshot.all_entities {
            let saved_id = entry
                .get(ID_KEY)
                .and_then(serde_json::Value::as_u64)
                .ok_or_else(|| EcsError::MalformedSnapshot("entity entry without ID".into()))?;
            let entity = u32::try_from(saved_id)
                .ok()
                .and_then(|saved_id| remap.get(saved_id))
                .ok_or_else(|| {
                    EcsError::MalformedSnapshot(format!("entity {saved_id} is not in EntityIDs"))
                })?;

            for (type_name, value) in entry {
                if type_name == ID_KEY {
                    continue;
                }

                let Some(type_index) = self.registry().type_index(type_name) else {
                    tracing::error!("snapshot references unregistered component {type_name:?}");
                    return Err(EcsError::UnknownComponentType(type_name.clone()));
                };

                let slot = self
                    .attach(entity, type_index, |storage| storage.create_default(entity))
                    .ok_or_else(|| {
                        EcsError::MalformedSnapshot(format!(
                            "entity {saved_id} lists {type_name} twice"
                        ))
                    })?;
                if let Some(storage) = self.storage(type_index) {
                    storage.deserialize_slot(slot, value)?;
                }

                loaded.push((type_index, slot));
            }
        }

        for (type_index, slot) in loaded {
            if let Some(storage) = self.storage(type_index) {
                storage.remap_slot(slot, &remap);
            }
        }

        Ok(remap)
    }
}

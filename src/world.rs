//! # World
//!
//! Owner of every entity slot and component storage.
//!
//! Entities move through three states: live after [World::add_entity], pending deletion after
//! [World::remove_entity], and free after the next [World::collect_garbage] reclaims the slot. A
//! pending entity keeps its handle valid and its components resident, but owns no visible
//! components, so every query skips it.
//!
//! All operations take `&self`. The entity table and each storage sit behind their own cells, which
//! lets query callbacks add and remove entities while a traversal is running.

use std::cell::OnceCell;
use std::cell::Ref;
use std::cell::RefCell;
use std::cell::RefMut;
use std::collections::VecDeque;
use std::sync::Arc;

use nohash::IntSet;

use crate::config::WorldConfig;
use crate::entity::EntityHandle;
use crate::error::EcsError;
use crate::error::EcsResult;
use crate::lookup::ComponentMask;
use crate::lookup::EntityComponentLookup;
use crate::registry::Component;
use crate::registry::ComponentType;
use crate::registry::ComponentTypeRegistry;
use crate::registry::Inspector;
use crate::registry::TypeIndex;
use crate::storage::ComponentStorage;
use crate::storage::LinearComponentStorage;

/// Per-slot entity data. A public ID of zero marks a free slot.
#[derive(Clone, Debug, Default)]
pub(crate) struct PerEntityData {
    public_id: u32,
    lookup: EntityComponentLookup,
}

struct EntityTable {
    all: Vec<PerEntityData>,
    free: VecDeque<u32>,
    pending: Vec<EntityHandle>,
    pending_ids: IntSet<u32>,
    live_ids: IntSet<u32>,
    next_public_id: u32,
}

impl EntityTable {
    fn is_valid(&self, entity: EntityHandle) -> bool {
        !entity.is_null()
            && self
                .all
                .get(entity.private_index() as usize)
                .is_some_and(|data| data.public_id == entity.public_id())
    }

    fn lookup(&self, entity: EntityHandle) -> Option<&EntityComponentLookup> {
        if self.is_valid(entity) {
            Some(&self.all[entity.private_index() as usize].lookup)
        } else {
            None
        }
    }

    fn lookup_mut(&mut self, entity: EntityHandle) -> Option<&mut EntityComponentLookup> {
        if self.is_valid(entity) {
            Some(&mut self.all[entity.private_index() as usize].lookup)
        } else {
            None
        }
    }

    fn next_public_id(&mut self) -> u32 {
        let public_id = self.next_public_id;
        self.next_public_id = match public_id.wrapping_add(1) {
            EntityHandle::NULL_ID => EntityHandle::NULL_ID + 1,
            next => next,
        };

        public_id
    }
}

/// # Component Slot
///
/// Generation-stamped reference to one component. Stays usable until the storage it points into
/// changes shape; check with [World::is_slot_current] or read through [World::get_by_slot].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ComponentSlot {
    entity: EntityHandle,
    type_index: TypeIndex,
    slot: u32,
    generation: u64,
}

impl ComponentSlot {
    /// Returns the owning entity.
    pub fn entity(&self) -> EntityHandle {
        self.entity
    }

    /// Returns the component type.
    pub fn type_index(&self) -> TypeIndex {
        self.type_index
    }

    /// Returns the slot in the type's storage.
    pub fn slot(&self) -> u32 {
        self.slot
    }

    /// Returns the storage generation the slot was taken under.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// # World
pub struct World {
    registry: Arc<ComponentTypeRegistry>,
    config: WorldConfig,
    entities: RefCell<EntityTable>,
    storages: Box<[OnceCell<Box<dyn ComponentStorage>>]>,
}

impl World {
    /// Returns an empty world for the registered component types.
    pub fn new(registry: Arc<ComponentTypeRegistry>) -> Self {
        Self::with_config(registry, WorldConfig::default())
    }

    /// Returns an empty world with the given allocation hints.
    pub fn with_config(registry: Arc<ComponentTypeRegistry>, config: WorldConfig) -> Self {
        let storages = (0..registry.len()).map(|_| OnceCell::new()).collect();
        let entities = EntityTable {
            all: Vec::with_capacity(config.initial_entity_capacity),
            free: VecDeque::with_capacity(config.initial_entity_capacity),
            pending: Vec::new(),
            pending_ids: IntSet::default(),
            live_ids: IntSet::default(),
            next_public_id: config.first_public_id.max(EntityHandle::NULL_ID + 1),
        };

        Self {
            registry,
            config,
            entities: RefCell::new(entities),
            storages,
        }
    }

    /// Returns the component type registry.
    pub fn registry(&self) -> &ComponentTypeRegistry {
        &self.registry
    }

    /// Returns the config the world was created with.
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Creates an entity, reusing a free slot if there is one.
    ///
    /// Once the public ID counter wraps, IDs still held by live entities are skipped. Returns
    /// [EntityHandle::INVALID] if the next public ID still belongs to an entity waiting for garbage
    /// collection. The ID is consumed either way.
    pub fn add_entity(&self) -> EntityHandle {
        let mut table = self.entities.borrow_mut();
        let mut public_id = table.next_public_id();
        while table.live_ids.contains(&public_id) {
            public_id = table.next_public_id();
        }

        if table.pending_ids.contains(&public_id) {
            tracing::error!(
                public_id,
                "cannot reissue entity ID while it is pending deletion"
            );
            return EntityHandle::INVALID;
        }

        let private_index = match table.free.pop_front() {
            Some(index) => {
                table.all[index as usize].public_id = public_id;
                index
            }
            None => {
                table.all.push(PerEntityData {
                    public_id,
                    lookup: EntityComponentLookup::default(),
                });
                table.all.len() as u32 - 1
            }
        };

        table.live_ids.insert(public_id);

        EntityHandle::new(public_id, private_index)
    }

    /// Returns true if the handle refers to a live or pending-deletion entity.
    pub fn is_handle_valid(&self, entity: EntityHandle) -> bool {
        self.entities.borrow().is_valid(entity)
    }

    /// Returns true if the entity was removed and is waiting for garbage collection.
    pub fn is_pending_delete(&self, entity: EntityHandle) -> bool {
        let table = self.entities.borrow();
        table.is_valid(entity) && table.pending_ids.contains(&entity.public_id())
    }

    /// Hides the entity and all of its components, and queues the slot for
    /// [World::collect_garbage]. Returns false for invalid or already removed handles.
    pub fn remove_entity(&self, entity: EntityHandle) -> bool {
        let mut table = self.entities.borrow_mut();
        if table.pending_ids.contains(&entity.public_id()) {
            return false;
        }

        let Some(lookup) = table.lookup_mut(entity) else {
            tracing::warn!("cannot remove {entity:?}: invalid handle");
            return false;
        };

        lookup.hide_all();
        table.pending.push(entity);
        table.pending_ids.insert(entity.public_id());
        table.live_ids.remove(&entity.public_id());

        true
    }

    /// Destroys the components of every removed entity and returns their slots to the free list.
    /// Returns the number of entities reclaimed.
    ///
    /// # Panics
    ///
    /// Panics if a storage that holds one of the components is being iterated.
    pub fn collect_garbage(&self) -> usize {
        let pending = std::mem::take(&mut self.entities.borrow_mut().pending);
        let mut reclaimed = 0;

        for entity in pending {
            let retained: Vec<(TypeIndex, u32)> = match self.entities.borrow().lookup(entity) {
                Some(lookup) => lookup.retained().collect(),
                None => continue,
            };

            for (type_index, slot) in retained {
                let destroyed = self.storage(type_index).is_some_and(|storage| {
                    storage.destroy(entity, &mut |owner, old_slot, new_slot| {
                        self.on_component_moved(owner, type_index, old_slot, new_slot)
                    })
                });
                assert!(
                    destroyed,
                    "component lookup out of sync for {entity:?}: type {type_index:?} slot {slot} is not in storage"
                );
            }

            let mut table = self.entities.borrow_mut();
            let index = entity.private_index();
            let data = &mut table.all[index as usize];
            data.public_id = EntityHandle::NULL_ID;
            data.lookup.reset();
            table.free.push_back(index);
            table.pending_ids.remove(&entity.public_id());

            tracing::trace!("reclaimed {entity:?}");
            reclaimed += 1;
        }

        if reclaimed > 0 {
            tracing::debug!(reclaimed, "collected garbage");
        }

        reclaimed
    }

    /// Keeps the owner's slot table in step with a component moved inside its storage.
    ///
    /// # Panics
    ///
    /// Panics if the owner is invalid or its recorded slot is not `old_slot`.
    pub(crate) fn on_component_moved(
        &self,
        owner: EntityHandle,
        type_index: TypeIndex,
        old_slot: u32,
        new_slot: u32,
    ) {
        let mut table = self.entities.borrow_mut();
        match table.lookup_mut(owner) {
            Some(lookup) => lookup.relocate(type_index, old_slot, new_slot),
            None => panic!("moved component of type {type_index:?} belongs to invalid {owner:?}"),
        }
    }

    /// Attaches a default `T` and returns it, or `None` if the entity already has one, the handle is
    /// invalid or pending deletion, or `T` is not registered.
    pub fn add_component<T: Component>(&self, entity: EntityHandle) -> Option<RefMut<'_, T>> {
        let type_index = self.type_index_of::<T>()?;
        let slot = self.attach(entity, type_index, |storage| {
            downcast::<T>(storage).create(entity)
        })?;

        self.storage_of::<T>()?.get_slot_mut(slot)
    }

    /// Attaches `value` to the entity. Returns false under the same conditions as
    /// [World::add_component].
    pub fn add<T: Component>(&self, entity: EntityHandle, value: T) -> bool {
        let Some(type_index) = self.type_index_of::<T>() else {
            return false;
        };

        self.attach(entity, type_index, |storage| {
            downcast::<T>(storage).insert(entity, value)
        })
        .is_some()
    }

    /// Attaches a default component of the named type and returns its slot.
    pub fn add_component_by_name(&self, entity: EntityHandle, type_name: &str) -> Option<u32> {
        let Some(type_index) = self.registry.type_index(type_name) else {
            tracing::error!("cannot add {type_name:?} to {entity:?}: type is not registered");
            return None;
        };

        self.attach(entity, type_index, |storage| storage.create_default(entity))
    }

    /// Returns true if the entity visibly owns a `T`.
    pub fn has_component<T: Component>(&self, entity: EntityHandle) -> bool {
        self.type_index_of::<T>()
            .is_some_and(|type_index| self.has_type(entity, type_index))
    }

    /// Returns true if the entity visibly owns a component of the given type.
    pub fn has_type(&self, entity: EntityHandle, type_index: TypeIndex) -> bool {
        self.entities
            .borrow()
            .lookup(entity)
            .is_some_and(|lookup| lookup.has(type_index))
    }

    /// Returns the set of component types the entity visibly owns.
    pub fn owned_mask(&self, entity: EntityHandle) -> ComponentMask {
        self.entities
            .borrow()
            .lookup(entity)
            .map_or(ComponentMask::EMPTY, EntityComponentLookup::owned)
    }

    /// Returns a copy of the entity's ownership bits and slot table.
    pub fn component_lookup(&self, entity: EntityHandle) -> Option<EntityComponentLookup> {
        self.with_lookup(entity, EntityComponentLookup::clone)
    }

    /// Returns the entity's `T`.
    ///
    /// The guard borrows the whole `T` storage: adding or destroying a `T` while it is held panics.
    pub fn get_component<T: Component>(&self, entity: EntityHandle) -> Option<Ref<'_, T>> {
        let slot = self.visible_slot(entity, self.type_index_of::<T>()?)?;
        self.storage_of::<T>()?.get_slot(slot)
    }

    /// Returns the entity's `T` for writing.
    pub fn get_component_mut<T: Component>(&self, entity: EntityHandle) -> Option<RefMut<'_, T>> {
        let slot = self.visible_slot(entity, self.type_index_of::<T>()?)?;
        self.storage_of::<T>()?.get_slot_mut(slot)
    }

    /// Returns true if the entity visibly owns the token's type.
    pub fn has<T: Component>(&self, entity: EntityHandle, component_type: ComponentType<T>) -> bool {
        self.has_type(entity, component_type.index())
    }

    /// Returns the entity's component of the token's type without a type lookup.
    ///
    /// Returns `None` if the token came from another registry.
    pub fn component<T: Component>(
        &self,
        entity: EntityHandle,
        component_type: ComponentType<T>,
    ) -> Option<Ref<'_, T>> {
        let slot = self.visible_slot(entity, component_type.index())?;
        self.storage(component_type.index())?
            .as_any()
            .downcast_ref::<LinearComponentStorage<T>>()?
            .get_slot(slot)
    }

    /// Returns the entity's component of the token's type for writing.
    pub fn component_mut<T: Component>(
        &self,
        entity: EntityHandle,
        component_type: ComponentType<T>,
    ) -> Option<RefMut<'_, T>> {
        let slot = self.visible_slot(entity, component_type.index())?;
        self.storage(component_type.index())?
            .as_any()
            .downcast_ref::<LinearComponentStorage<T>>()?
            .get_slot_mut(slot)
    }

    /// Returns a copy of the entity's `T`.
    pub fn get<T: Component>(&self, entity: EntityHandle) -> Option<T> {
        self.get_component::<T>(entity).map(|component| component.clone())
    }

    /// Replaces the entity's `T`. Returns false if the entity has none.
    pub fn set<T: Component>(&self, entity: EntityHandle, value: T) -> bool {
        match self.get_component_mut::<T>(entity) {
            Some(mut component) => {
                *component = value;
                true
            }
            None => false,
        }
    }

    /// Replaces the entity's `T`, attaching one first if needed.
    pub fn set_or_add<T: Component>(&self, entity: EntityHandle, value: T) -> bool {
        if self.has_component::<T>(entity) {
            self.set(entity, value)
        } else {
            self.add(entity, value)
        }
    }

    /// Returns a generation-stamped reference to the entity's `T`.
    pub fn component_slot<T: Component>(&self, entity: EntityHandle) -> Option<ComponentSlot> {
        let type_index = self.type_index_of::<T>()?;
        let slot = self.visible_slot(entity, type_index)?;
        let generation = self.storage(type_index)?.generation();

        Some(ComponentSlot {
            entity,
            type_index,
            slot,
            generation,
        })
    }

    /// Returns true if the slot still points at its entity's component.
    pub fn is_slot_current(&self, slot: &ComponentSlot) -> bool {
        self.storage(slot.type_index)
            .is_some_and(|storage| storage.generation() == slot.generation)
            && self.visible_slot(slot.entity, slot.type_index) == Some(slot.slot)
    }

    /// Reads through a slot, returning `None` once it is stale.
    pub fn get_by_slot<T: Component>(&self, slot: &ComponentSlot) -> Option<Ref<'_, T>> {
        if self.type_index_of::<T>() != Some(slot.type_index) || !self.is_slot_current(slot) {
            return None;
        }

        self.storage_of::<T>()?.get_slot(slot.slot)
    }

    /// Returns the serialized fields of the entity's component of the named type.
    pub fn component_value(&self, entity: EntityHandle, type_name: &str) -> Option<serde_json::Value> {
        let type_index = self.registry.type_index(type_name)?;
        let slot = self.visible_slot(entity, type_index)?;

        match self.storage(type_index)?.serialize_slot(slot) {
            Ok(value) => Some(value),
            Err(error) => {
                tracing::warn!("cannot serialize {type_name} of {entity:?}: {error}");
                None
            }
        }
    }

    /// Overwrites the entity's component of the named type from serialized fields.
    pub fn set_component_value(
        &self,
        entity: EntityHandle,
        type_name: &str,
        value: &serde_json::Value,
    ) -> EcsResult<()> {
        let type_index = self
            .registry
            .type_index(type_name)
            .ok_or_else(|| EcsError::UnknownComponentType(type_name.to_string()))?;
        if !self.is_handle_valid(entity) {
            return Err(EcsError::InvalidHandle(entity));
        }

        let slot = self
            .visible_slot(entity, type_index)
            .ok_or_else(|| EcsError::MissingComponent {
                entity,
                type_name: type_name.to_string(),
            })?;
        let storage = self
            .storage(type_index)
            .ok_or_else(|| EcsError::MissingComponent {
                entity,
                type_name: type_name.to_string(),
            })?;

        storage.deserialize_slot(slot, value)?;

        Ok(())
    }

    /// Lists every component the entity visibly owns, in registry order.
    pub fn inspect(&self, entity: EntityHandle, inspector: &mut dyn Inspector) {
        let owned = self.owned_mask(entity);
        for info in self.registry.all_types() {
            if owned.contains(info.index()) {
                inspector.begin_component(info.name());
                (info.inspector())(self, entity, inspector);
            }
        }
    }

    /// Returns the number of live entities, excluding those pending deletion.
    pub fn entity_count(&self) -> usize {
        self.entities.borrow().live_ids.len()
    }

    /// Returns the number of entities waiting for garbage collection.
    pub fn pending_delete_count(&self) -> usize {
        self.entities.borrow().pending.len()
    }

    /// Returns the number of entity slots, including free ones.
    pub fn slot_count(&self) -> usize {
        self.entities.borrow().all.len()
    }

    /// Returns the live entities in slot order, excluding those pending deletion.
    pub fn live_entities(&self) -> Vec<EntityHandle> {
        let table = self.entities.borrow();
        table
            .all
            .iter()
            .enumerate()
            .filter(|(_, data)| {
                data.public_id != EntityHandle::NULL_ID
                    && !table.pending_ids.contains(&data.public_id)
            })
            .map(|(index, data)| EntityHandle::new(data.public_id, index as u32))
            .collect()
    }

    /// Returns the number of resident `T` components, including those of pending entities.
    pub fn storage_len<T: Component>(&self) -> usize {
        self.storage_of::<T>()
            .map_or(0, |storage| ComponentStorage::len(storage))
    }

    /// Returns the generation of the `T` storage, or `None` if no `T` was ever added.
    pub fn storage_generation<T: Component>(&self) -> Option<u64> {
        self.storage(self.type_index_of::<T>()?)
            .map(|storage| storage.generation())
    }

    /// Returns the `T` storage if it was created.
    pub fn storage_of<T: Component>(&self) -> Option<&LinearComponentStorage<T>> {
        self.storage(self.type_index_of::<T>()?)
            .map(downcast::<T>)
    }

    /// Returns the storage for a type index if it was created.
    pub fn storage(&self, type_index: TypeIndex) -> Option<&dyn ComponentStorage> {
        self.storages
            .get(type_index.as_usize())?
            .get()
            .map(Box::as_ref)
    }

    /// Returns the index of `T` in the registry.
    pub fn type_index_of<T: Component>(&self) -> Option<TypeIndex> {
        self.registry.type_index_of::<T>()
    }

    /// Runs `f` against the entity's lookup if the handle is valid.
    pub(crate) fn with_lookup<R>(
        &self,
        entity: EntityHandle,
        f: impl FnOnce(&EntityComponentLookup) -> R,
    ) -> Option<R> {
        self.entities.borrow().lookup(entity).map(f)
    }

    pub(crate) fn visible_slot(&self, entity: EntityHandle, type_index: TypeIndex) -> Option<u32> {
        self.with_lookup(entity, |lookup| lookup.slot(type_index))
            .flatten()
    }

    fn storage_or_create(&self, type_index: TypeIndex) -> Option<&dyn ComponentStorage> {
        let info = self.registry.info(type_index)?;
        let cell = self.storages.get(type_index.as_usize())?;
        let storage = cell.get_or_init(|| {
            let capacity = info
                .initial_capacity()
                .unwrap_or(self.config.initial_component_capacity);
            tracing::debug!(type_name = info.name(), capacity, "creating component storage");
            info.create_storage(capacity)
        });

        Some(storage.as_ref())
    }

    pub(crate) fn attach(
        &self,
        entity: EntityHandle,
        type_index: TypeIndex,
        create: impl FnOnce(&dyn ComponentStorage) -> Option<u32>,
    ) -> Option<u32> {
        {
            let table = self.entities.borrow();
            if !table.is_valid(entity) {
                tracing::warn!("cannot add component to {entity:?}: invalid handle");
                return None;
            }
            if table.pending_ids.contains(&entity.public_id()) {
                tracing::warn!("cannot add component to {entity:?}: pending deletion");
                return None;
            }
        }

        let slot = create(self.storage_or_create(type_index)?)?;
        if let Some(lookup) = self.entities.borrow_mut().lookup_mut(entity) {
            lookup.insert(type_index, slot);
        }

        Some(slot)
    }
}

fn downcast<T: Component>(storage: &dyn ComponentStorage) -> &LinearComponentStorage<T> {
    match storage.as_any().downcast_ref::<LinearComponentStorage<T>>() {
        Some(storage) => storage,
        None => panic!(
            "storage for type {:?} does not hold {}",
            storage.type_index(),
            std::any::type_name::<T>()
        ),
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde::Serialize;

    use super::*;

    #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Position {
        x: f32,
        y: f32,
        z: f32,
    }

    impl Component for Position {}

    #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Name(String);

    impl Component for Name {}

    #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Unregistered;

    impl Component for Unregistered {}

    fn world() -> World {
        let mut registry = ComponentTypeRegistry::new();
        registry.register::<Position>("Position");
        registry.register::<Name>("Name");

        World::new(Arc::new(registry))
    }

    fn position(x: f32, y: f32, z: f32) -> Position {
        Position { x, y, z }
    }

    #[test]
    fn add_entity_is_handle_valid_returns_true() {
        let world = world();

        let entity = world.add_entity();

        assert!(world.is_handle_valid(entity));
        assert_eq!(world.entity_count(), 1);
    }

    #[test]
    fn add_entity_returns_increasing_public_ids() {
        let world = world();

        let first = world.add_entity();
        let second = world.add_entity();

        assert!(second.public_id() > first.public_id());
    }

    #[test]
    fn add_entity_after_collect_reuses_slot_with_new_id() {
        let world = world();
        let first = world.add_entity();
        world.remove_entity(first);
        world.collect_garbage();

        let second = world.add_entity();

        assert_eq!(second.private_index(), first.private_index());
        assert_ne!(second.public_id(), first.public_id());
        assert!(!world.is_handle_valid(first));
        assert_eq!(world.slot_count(), 1);
    }

    #[test]
    fn add_entity_pending_id_returns_invalid() {
        let world = world();
        let entity = world.add_entity();
        world.remove_entity(entity);
        world.entities.borrow_mut().next_public_id = entity.public_id();

        let reissued = world.add_entity();

        assert_eq!(reissued, EntityHandle::INVALID);
        assert!(world.is_handle_valid(world.add_entity()));
    }

    #[test]
    fn add_entity_public_id_wraps_past_zero() {
        let world = World::with_config(
            world().registry.clone(),
            WorldConfig {
                first_public_id: u32::MAX,
                ..WorldConfig::default()
            },
        );

        let last = world.add_entity();
        let wrapped = world.add_entity();

        assert_eq!(last.public_id(), u32::MAX);
        assert_eq!(wrapped.public_id(), 1);
    }

    #[test]
    fn add_entity_after_wrap_skips_live_ids() {
        let world = world();
        let first = world.add_entity();
        let second = world.add_entity();
        world.entities.borrow_mut().next_public_id = u32::MAX;

        let last = world.add_entity();
        let wrapped = world.add_entity();

        assert_eq!(last.public_id(), u32::MAX);
        assert_eq!(wrapped.public_id(), 3);
        assert!(world.is_handle_valid(first));
        assert!(world.is_handle_valid(second));
        assert_eq!(world.entity_count(), 4);
    }

    #[test]
    #[should_panic(expected = "is not in storage")]
    fn collect_garbage_desynced_lookup_panics() {
        let world = world();
        let owner = world.add_entity();
        let stray = world.add_entity();
        world.add(owner, Position::default());
        let type_index = world.type_index_of::<Position>().unwrap();
        if let Some(lookup) = world.entities.borrow_mut().lookup_mut(stray) {
            lookup.insert(type_index, 0);
        }

        world.remove_entity(stray);
        world.collect_garbage();
    }

    #[test]
    fn add_with_capacity_hint_uses_linear_storage() {
        let mut registry = ComponentTypeRegistry::new();
        let position_type = registry.register::<Position>("Position");
        registry.set_initial_capacity(position_type.index(), 1024);
        let world = World::new(Arc::new(registry));
        let entity = world.add_entity();

        assert_eq!(world.add_component_by_name(entity, "Position"), Some(0));
        world.set(entity, position(1.0, 2.0, 3.0));

        assert_eq!(world.get::<Position>(entity), Some(position(1.0, 2.0, 3.0)));
        assert_eq!(world.storage_len::<Position>(), 1);
    }

    #[test]
    fn remove_entity_has_component_returns_false() {
        let world = world();
        let entity = world.add_entity();
        world.add(entity, position(1.0, 2.0, 3.0));

        world.remove_entity(entity);

        assert!(world.is_handle_valid(entity));
        assert!(world.is_pending_delete(entity));
        assert!(!world.has_component::<Position>(entity));
        assert!(world.get_component::<Position>(entity).is_none());
        assert_eq!(world.storage_len::<Position>(), 1);
        assert_eq!(world.entity_count(), 0);
    }

    #[test]
    fn remove_entity_twice_returns_false() {
        let world = world();
        let entity = world.add_entity();

        assert!(world.remove_entity(entity));
        assert!(!world.remove_entity(entity));
        assert_eq!(world.pending_delete_count(), 1);
    }

    #[test]
    fn remove_entity_invalid_returns_false() {
        let world = world();

        assert!(!world.remove_entity(EntityHandle::INVALID));
        assert!(!world.remove_entity(EntityHandle::new(9, 0)));
    }

    #[test]
    fn collect_garbage_invalidates_handle() {
        let world = world();
        let entity = world.add_entity();
        world.add(entity, position(1.0, 2.0, 3.0));
        world.remove_entity(entity);

        assert_eq!(world.collect_garbage(), 1);

        assert!(!world.is_handle_valid(entity));
        assert_eq!(world.storage_len::<Position>(), 0);
        assert_eq!(world.pending_delete_count(), 0);
    }

    #[test]
    fn collect_garbage_twice_is_noop() {
        let world = world();
        let keep = world.add_entity();
        world.add(keep, position(4.0, 5.0, 6.0));
        let entity = world.add_entity();
        world.remove_entity(entity);
        world.collect_garbage();
        let generation = world.storage_generation::<Position>();

        assert_eq!(world.collect_garbage(), 0);

        assert_eq!(world.storage_generation::<Position>(), generation);
        assert_eq!(world.get::<Position>(keep), Some(position(4.0, 5.0, 6.0)));
        assert_eq!(world.slot_count(), 2);
    }

    #[test]
    fn collect_garbage_keeps_moved_component_reachable() {
        let world = world();
        let entities: Vec<_> = (0..4).map(|_| world.add_entity()).collect();
        for (i, entity) in entities.iter().enumerate() {
            world.add(*entity, position(i as f32, 0.0, 0.0));
            world.add(*entity, Name(format!("e{i}")));
        }

        world.remove_entity(entities[0]);
        world.remove_entity(entities[2]);
        world.collect_garbage();

        assert_eq!(world.get::<Position>(entities[1]), Some(position(1.0, 0.0, 0.0)));
        assert_eq!(world.get::<Position>(entities[3]), Some(position(3.0, 0.0, 0.0)));
        assert_eq!(world.get::<Name>(entities[3]), Some(Name("e3".into())));
        assert_eq!(world.storage_len::<Name>(), 2);
    }

    #[test]
    fn add_component_twice_returns_none() {
        let world = world();
        let entity = world.add_entity();

        assert!(world.add_component::<Position>(entity).is_some());
        assert!(world.add_component::<Position>(entity).is_none());
        assert_eq!(world.storage_len::<Position>(), 1);
    }

    #[test]
    fn add_component_returns_default_for_writing() {
        let world = world();
        let entity = world.add_entity();

        if let Some(mut added) = world.add_component::<Position>(entity) {
            assert_eq!(*added, Position::default());
            added.y = 8.0;
        }

        assert_eq!(world.get::<Position>(entity), Some(position(0.0, 8.0, 0.0)));
    }

    #[test]
    fn add_component_pending_entity_returns_none() {
        let world = world();
        let entity = world.add_entity();
        world.remove_entity(entity);

        assert!(world.add_component::<Position>(entity).is_none());
        assert_eq!(world.storage_len::<Position>(), 0);
    }

    #[test]
    fn add_component_unregistered_returns_none() {
        let world = world();
        let entity = world.add_entity();

        assert!(world.add_component::<Unregistered>(entity).is_none());
        assert!(!world.has_component::<Unregistered>(entity));
    }

    #[test]
    fn add_component_by_name_sets_bit() {
        let world = world();
        let entity = world.add_entity();

        assert_eq!(world.add_component_by_name(entity, "Name"), Some(0));
        assert_eq!(world.add_component_by_name(entity, "Missing"), None);

        assert!(world.has_component::<Name>(entity));
        assert_eq!(world.get::<Name>(entity), Some(Name::default()));
    }

    #[test]
    fn set_get_returns_new_value() {
        let world = world();
        let entity = world.add_entity();
        world.add(entity, position(1.0, 1.0, 1.0));

        assert!(world.set(entity, position(2.0, 2.0, 2.0)));

        assert_eq!(world.get::<Position>(entity), Some(position(2.0, 2.0, 2.0)));
    }

    #[test]
    fn set_or_add_attaches_missing_component() {
        let world = world();
        let entity = world.add_entity();

        assert!(!world.set(entity, Name("a".into())));
        assert!(world.set_or_add(entity, Name("b".into())));
        assert!(world.set_or_add(entity, Name("c".into())));

        assert_eq!(world.get::<Name>(entity), Some(Name("c".into())));
    }

    #[test]
    fn component_slot_becomes_stale_after_collect() {
        let world = world();
        let first = world.add_entity();
        let second = world.add_entity();
        world.add(first, position(1.0, 0.0, 0.0));
        world.add(second, position(2.0, 0.0, 0.0));
        let slot = world.component_slot::<Position>(second).unwrap();
        assert!(world.is_slot_current(&slot));
        assert_eq!(world.get_by_slot::<Position>(&slot).as_deref(), Some(&position(2.0, 0.0, 0.0)));

        world.remove_entity(first);
        world.collect_garbage();

        assert!(!world.is_slot_current(&slot));
        assert!(world.get_by_slot::<Position>(&slot).is_none());
        let refreshed = world.component_slot::<Position>(second).unwrap();
        assert_eq!(refreshed.slot(), 0);
    }

    #[test]
    fn component_value_round_trips_through_set() {
        let world = world();
        let entity = world.add_entity();
        world.add(entity, position(1.0, 2.0, 3.0));

        world
            .set_component_value(entity, "Position", &serde_json::json!({"x": 7.0, "y": 8.0, "z": 9.0}))
            .unwrap();

        assert_eq!(
            world.component_value(entity, "Position"),
            Some(serde_json::json!({"x": 7.0, "y": 8.0, "z": 9.0}))
        );
    }

    #[test]
    fn set_component_value_errors() {
        let world = world();
        let entity = world.add_entity();

        assert!(matches!(
            world.set_component_value(entity, "Missing", &serde_json::Value::Null),
            Err(EcsError::UnknownComponentType(_))
        ));
        assert!(matches!(
            world.set_component_value(entity, "Position", &serde_json::Value::Null),
            Err(EcsError::MissingComponent { .. })
        ));
        assert!(matches!(
            world.set_component_value(EntityHandle::INVALID, "Position", &serde_json::Value::Null),
            Err(EcsError::InvalidHandle(_))
        ));

        world.add(entity, Position::default());
        assert!(matches!(
            world.set_component_value(entity, "Position", &serde_json::json!("nope")),
            Err(EcsError::Json(_))
        ));
    }

    #[test]
    fn inspect_lists_owned_component_fields() {
        #[derive(Default)]
        struct Collect(Vec<String>);

        impl Inspector for Collect {
            fn begin_component(&mut self, type_name: &str) {
                self.0.push(type_name.to_string());
            }

            fn field(&mut self, label: &str, value: &serde_json::Value) {
                self.0.push(format!("{label}={value}"));
            }
        }

        let world = world();
        let entity = world.add_entity();
        world.add(entity, position(1.0, 2.0, 3.0));
        world.add(entity, Name("crate".into()));

        let mut collect = Collect::default();
        world.inspect(entity, &mut collect);

        assert_eq!(
            collect.0,
            ["Position", "x=1.0", "y=2.0", "z=3.0", "Name", "value=\"crate\""]
        );
    }

    #[test]
    fn component_by_token_returns_value() {
        let world = world();
        let position_type = world.registry().component_type::<Position>().unwrap();
        let entity = world.add_entity();
        world.add(entity, position(1.0, 0.0, 0.0));

        if let Some(mut component) = world.component_mut(entity, position_type) {
            component.y = 4.0;
        }

        assert!(world.has(entity, position_type));
        assert_eq!(
            world.component(entity, position_type).as_deref(),
            Some(&position(1.0, 4.0, 0.0))
        );
    }

    #[test]
    fn live_entities_excludes_pending() {
        let world = world();
        let first = world.add_entity();
        let second = world.add_entity();
        world.remove_entity(first);

        assert_eq!(world.live_entities(), vec![second]);
    }

    #[test]
    #[should_panic(expected = "out of sync")]
    fn on_component_moved_wrong_slot_panics() {
        let world = world();
        let entity = world.add_entity();
        world.add(entity, Position::default());
        let type_index = world.type_index_of::<Position>().unwrap();

        world.on_component_moved(entity, type_index, 5, 0);
    }
}

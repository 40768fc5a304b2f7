//! # Component Storage
//!
//! Packed per-type component arrays. Components live contiguously in slot order; removal moves the
//! last component into the freed slot so the array never has holes.

use std::any::Any;
use std::cell::Cell;
use std::cell::Ref;
use std::cell::RefCell;
use std::cell::RefMut;

use nohash::IntMap;

use crate::entity::EntityHandle;
use crate::entity::EntityRemap;
use crate::registry::Component;
use crate::registry::TypeIndex;

/// Called with the moved component's owner, its old slot, and its new slot.
pub type MovedFn<'a> = &'a mut dyn FnMut(EntityHandle, u32, u32);

/// # Component Storage
///
/// Type-erased view of a [LinearComponentStorage], used by the world for operations that only
/// know a [TypeIndex].
pub trait ComponentStorage {
    /// Returns the storage as [Any] for downcasting to its concrete type.
    fn as_any(&self) -> &dyn Any;

    /// Returns the type index of the stored components.
    fn type_index(&self) -> TypeIndex;

    /// Returns the number of stored components.
    fn len(&self) -> usize;

    /// Returns true if no components are stored.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the current generation. Slots and references obtained under an older generation
    /// are stale.
    fn generation(&self) -> u64;

    /// Returns true while a traversal of this storage is in progress.
    fn is_iterating(&self) -> bool;

    /// Returns true if the entity owns a component in this storage.
    fn contains(&self, entity: EntityHandle) -> bool;

    /// Returns the slot owned by the entity with the given public ID.
    fn find(&self, public_id: u32) -> Option<u32>;

    /// Returns the owner of a slot.
    fn owner(&self, slot: u32) -> Option<EntityHandle>;

    /// Appends a default component for the entity, returning its slot.
    fn create_default(&self, entity: EntityHandle) -> Option<u32>;

    /// Removes the entity's component. See [LinearComponentStorage::destroy].
    fn destroy(&self, entity: EntityHandle, on_moved: MovedFn<'_>) -> bool;

    /// Serializes the component in a slot.
    fn serialize_slot(&self, slot: u32) -> serde_json::Result<serde_json::Value>;

    /// Overwrites the component in a slot from a serialized value.
    fn deserialize_slot(&self, slot: u32, value: &serde_json::Value) -> serde_json::Result<()>;

    /// Rewrites entity references held by the component in a slot.
    fn remap_slot(&self, slot: u32, remap: &EntityRemap);
}

pub(crate) struct Columns<T> {
    pub(crate) owners: Vec<EntityHandle>,
    pub(crate) components: Vec<T>,
    entity_to_component: IntMap<u32, u32>,
}

/// # Linear Component Storage
///
/// Parallel `owners` and `components` arrays plus a map from public ID to slot.
///
/// The storage is mutated through `&self` so traversals can run while the world is borrowed. A
/// traversal raises the iteration depth; creating or destroying a component while the depth is
/// non-zero panics, since either would move components under the visitor.
pub struct LinearComponentStorage<T> {
    type_index: TypeIndex,
    columns: RefCell<Columns<T>>,
    generation: Cell<u64>,
    iteration_depth: Cell<u32>,
}

impl<T: Component> LinearComponentStorage<T> {
    /// Returns empty storage for the given type index.
    pub fn new(type_index: TypeIndex) -> Self {
        Self::with_capacity(type_index, 0)
    }

    /// Returns empty storage with room for `capacity` components.
    pub fn with_capacity(type_index: TypeIndex, capacity: usize) -> Self {
        let mut entity_to_component = IntMap::default();
        entity_to_component.reserve(capacity);

        Self {
            type_index,
            columns: RefCell::new(Columns {
                owners: Vec::with_capacity(capacity),
                components: Vec::with_capacity(capacity),
                entity_to_component,
            }),
            generation: Cell::new(0),
            iteration_depth: Cell::new(0),
        }
    }

    /// Storage factory installed for every registered component type.
    pub fn boxed(type_index: TypeIndex, capacity: usize) -> Box<dyn ComponentStorage> {
        Box::new(Self::with_capacity(type_index, capacity))
    }

    /// Appends a default component for the entity and returns its slot, or `None` if the entity
    /// already owns one.
    ///
    /// Bumps the generation if the arrays had to grow.
    ///
    /// # Panics
    ///
    /// Panics if the storage is being iterated.
    pub fn create(&self, entity: EntityHandle) -> Option<u32> {
        self.insert(entity, T::default())
    }

    /// Appends `value` for the entity and returns its slot, or `None` if the entity already owns a
    /// component here.
    ///
    /// # Panics
    ///
    /// Panics if the storage is being iterated.
    pub fn insert(&self, entity: EntityHandle, value: T) -> Option<u32> {
        if self.iteration_depth.get() > 0 {
            panic!(
                "cannot add {} to {entity:?} while its storage is being iterated",
                std::any::type_name::<T>()
            );
        }

        let mut columns = self.columns.borrow_mut();
        if columns
            .entity_to_component
            .contains_key(&entity.public_id())
        {
            return None;
        }

        if columns.components.len() == columns.components.capacity() {
            self.bump_generation();
        }

        let slot = columns.components.len() as u32;
        columns.components.push(value);
        columns.owners.push(entity);
        columns.entity_to_component.insert(entity.public_id(), slot);

        Some(slot)
    }

    /// Removes the entity's component by moving the last component into its slot.
    ///
    /// `on_moved` runs before the move with the relocated component's owner, old slot, and new
    /// slot, so the caller's slot tables are updated before the arrays change. Returns false if the
    /// entity owns no component here.
    ///
    /// # Panics
    ///
    /// Panics if the storage is being iterated.
    pub fn destroy(&self, entity: EntityHandle, on_moved: MovedFn<'_>) -> bool {
        if self.iteration_depth.get() > 0 {
            panic!(
                "cannot destroy {} of {entity:?} while its storage is being iterated",
                std::any::type_name::<T>()
            );
        }

        let mut columns = self.columns.borrow_mut();
        let slot = match columns.entity_to_component.get(&entity.public_id()) {
            Some(&slot) if columns.owners[slot as usize] == entity => slot,
            _ => return false,
        };

        let last = columns.components.len() as u32 - 1;
        let mover = columns.owners[last as usize];
        if slot != last {
            on_moved(mover, last, slot);
        }

        columns.components.swap_remove(slot as usize);
        columns.owners.swap_remove(slot as usize);
        columns.entity_to_component.remove(&entity.public_id());
        if slot != last {
            columns.entity_to_component.insert(mover.public_id(), slot);
        }

        self.bump_generation();

        true
    }

    /// Returns the entity's component.
    pub fn get(&self, entity: EntityHandle) -> Option<Ref<'_, T>> {
        let slot = self.slot_of(entity)?;
        self.get_slot(slot)
    }

    /// Returns the entity's component for writing.
    pub fn get_mut(&self, entity: EntityHandle) -> Option<RefMut<'_, T>> {
        let slot = self.slot_of(entity)?;
        self.get_slot_mut(slot)
    }

    /// Returns the component in a slot.
    pub fn get_slot(&self, slot: u32) -> Option<Ref<'_, T>> {
        Ref::filter_map(self.columns.borrow(), |columns| {
            columns.components.get(slot as usize)
        })
        .ok()
    }

    /// Returns the component in a slot for writing.
    pub fn get_slot_mut(&self, slot: u32) -> Option<RefMut<'_, T>> {
        RefMut::filter_map(self.columns.borrow_mut(), |columns| {
            columns.components.get_mut(slot as usize)
        })
        .ok()
    }

    /// Returns the owners in slot order.
    pub fn owners(&self) -> Ref<'_, [EntityHandle]> {
        Ref::map(self.columns.borrow(), |columns| columns.owners.as_slice())
    }

    /// Returns the components in slot order.
    pub fn components(&self) -> Ref<'_, [T]> {
        Ref::map(self.columns.borrow(), |columns| columns.components.as_slice())
    }

    /// Calls `f` for every (owner, component) pair in slot order until it returns false.
    ///
    /// # Panics
    ///
    /// Panics if `f` creates or destroys a component in this storage, or if the generation changed
    /// by the end of the traversal.
    pub fn for_each(&self, mut f: impl FnMut(EntityHandle, &mut T) -> bool) {
        let _guard = self.begin_iteration();
        let mut columns = self.columns.borrow_mut();
        let Columns {
            owners, components, ..
        } = &mut *columns;

        for (owner, component) in owners.iter().zip(components.iter_mut()) {
            if !f(*owner, component) {
                break;
            }
        }
    }

    /// Marks the storage as being iterated until the guard is dropped.
    pub fn begin_iteration(&self) -> IterationGuard<'_> {
        self.iteration_depth.set(self.iteration_depth.get() + 1);

        IterationGuard {
            depth: &self.iteration_depth,
            generation: &self.generation,
            stamp: self.generation.get(),
        }
    }

    /// Returns the number of traversals in progress.
    pub fn iteration_depth(&self) -> u32 {
        self.iteration_depth.get()
    }

    pub(crate) fn columns_mut(&self) -> RefMut<'_, Columns<T>> {
        self.columns.borrow_mut()
    }

    fn slot_of(&self, entity: EntityHandle) -> Option<u32> {
        let columns = self.columns.borrow();
        match columns.entity_to_component.get(&entity.public_id()) {
            Some(&slot) if columns.owners[slot as usize] == entity => Some(slot),
            _ => None,
        }
    }

    fn bump_generation(&self) {
        self.generation.set(self.generation.get().wrapping_add(1));
    }
}

impl<T: Component> ComponentStorage for LinearComponentStorage<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_index(&self) -> TypeIndex {
        self.type_index
    }

    fn len(&self) -> usize {
        self.columns.borrow().components.len()
    }

    fn generation(&self) -> u64 {
        self.generation.get()
    }

    fn is_iterating(&self) -> bool {
        self.iteration_depth.get() > 0
    }

    fn contains(&self, entity: EntityHandle) -> bool {
        self.slot_of(entity).is_some()
    }

    fn find(&self, public_id: u32) -> Option<u32> {
        self.columns
            .borrow()
            .entity_to_component
            .get(&public_id)
            .copied()
    }

    fn owner(&self, slot: u32) -> Option<EntityHandle> {
        self.columns.borrow().owners.get(slot as usize).copied()
    }

    fn create_default(&self, entity: EntityHandle) -> Option<u32> {
        self.create(entity)
    }

    fn destroy(&self, entity: EntityHandle, on_moved: MovedFn<'_>) -> bool {
        LinearComponentStorage::destroy(self, entity, on_moved)
    }

    fn serialize_slot(&self, slot: u32) -> serde_json::Result<serde_json::Value> {
        match self.get_slot(slot) {
            Some(component) => serde_json::to_value(&*component),
            None => Ok(serde_json::Value::Null),
        }
    }

    fn deserialize_slot(&self, slot: u32, value: &serde_json::Value) -> serde_json::Result<()> {
        let decoded = <T as serde::Deserialize>::deserialize(value)?;
        if let Some(mut component) = self.get_slot_mut(slot) {
            *component = decoded;
        }

        Ok(())
    }

    fn remap_slot(&self, slot: u32, remap: &EntityRemap) {
        if let Some(mut component) = self.get_slot_mut(slot) {
            component.remap_entities(remap);
        }
    }
}

/// # Iteration Guard
///
/// Holds a storage's iteration depth raised. On drop, checks that the storage generation did not
/// move during the traversal.
pub struct IterationGuard<'a> {
    depth: &'a Cell<u32>,
    generation: &'a Cell<u64>,
    stamp: u64,
}

impl Drop for IterationGuard<'_> {
    fn drop(&mut self) {
        self.depth.set(self.depth.get() - 1);

        if !std::thread::panicking() {
            assert_eq!(
                self.generation.get(),
                self.stamp,
                "component storage moved during iteration"
            );
        }
    }
}

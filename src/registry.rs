//! # Component Type Registry
//!
//! Maps component types to small dense indices used as bit positions in
//! [ComponentMask](crate::ComponentMask) and as slots in the world's storage table. The registry is
//! filled during engine bootstrap, then shared read-only by every [World] built from it.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::entity::EntityHandle;
use crate::entity::EntityRemap;
use crate::storage::ComponentStorage;
use crate::storage::LinearComponentStorage;
use crate::World;

/// Maximum number of component types a registry can hold.
pub const MAX_COMPONENT_TYPES: usize = 64;

/// # Component
///
/// Plain data attached to at most one entity at a time. The serde representation is the
/// component's field list for snapshots, inspection, and scripting.
pub trait Component: 'static + Clone + Default + Serialize + DeserializeOwned {
    /// Rewrites embedded entity references after a snapshot is loaded.
    fn remap_entities(&mut self, _remap: &EntityRemap) {}
}

/// # Type Index
///
/// Dense index of a registered component type, stable for the lifetime of the registry.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TypeIndex(u32);

impl TypeIndex {
    pub(crate) const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw index.
    pub const fn get(&self) -> u32 {
        self.0
    }

    pub(crate) const fn as_usize(&self) -> usize {
        self.0 as usize
    }
}

/// # Component Type
///
/// Token returned by [ComponentTypeRegistry::register]. Carries the type index so callers can skip
/// the `TypeId` lookup on hot paths.
pub struct ComponentType<T> {
    index: TypeIndex,
    marker: PhantomData<fn() -> T>,
}

impl<T> ComponentType<T> {
    /// Returns the type index.
    pub const fn index(&self) -> TypeIndex {
        self.index
    }
}

impl<T> Copy for ComponentType<T> {}

impl<T> Clone for ComponentType<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> PartialEq for ComponentType<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<T> Eq for ComponentType<T> {}

impl<T> fmt::Debug for ComponentType<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ComponentType").field(&self.index.0).finish()
    }
}

/// # Inspector
///
/// Receiver for component field listings, implemented by UI and tooling front-ends.
pub trait Inspector {
    /// Called once before the fields of each component.
    fn begin_component(&mut self, type_name: &str);

    /// Called for each field of the current component.
    fn field(&mut self, label: &str, value: &serde_json::Value);
}

/// Lists the fields of one component of an entity.
pub type InspectFn = fn(&World, EntityHandle, &mut dyn Inspector);

type StorageFactory = fn(TypeIndex, usize) -> Box<dyn ComponentStorage>;

/// # Component Type Info
pub struct ComponentTypeInfo {
    name: String,
    index: TypeIndex,
    type_id: TypeId,
    storage_factory: StorageFactory,
    initial_capacity: Option<usize>,
    inspector: InspectFn,
}

impl ComponentTypeInfo {
    /// Returns the registered name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the dense type index.
    pub fn index(&self) -> TypeIndex {
        self.index
    }

    /// Returns the Rust type ID.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the per-type capacity hint, if one was set.
    pub fn initial_capacity(&self) -> Option<usize> {
        self.initial_capacity
    }

    pub(crate) fn create_storage(&self, capacity: usize) -> Box<dyn ComponentStorage> {
        (self.storage_factory)(self.index, capacity)
    }

    pub(crate) fn inspector(&self) -> InspectFn {
        self.inspector
    }
}

impl fmt::Debug for ComponentTypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentTypeInfo")
            .field("name", &self.name)
            .field("index", &self.index.0)
            .field("initial_capacity", &self.initial_capacity)
            .finish()
    }
}

/// # Component Type Registry
#[derive(Debug, Default)]
pub struct ComponentTypeRegistry {
    types: Vec<ComponentTypeInfo>,
    by_type_id: HashMap<TypeId, TypeIndex>,
}

impl ComponentTypeRegistry {
    /// Returns an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T` under `name` and assigns it the next free index.
    ///
    /// # Panics
    ///
    /// Panics if `T` or `name` is already registered, or if [MAX_COMPONENT_TYPES] types are
    /// already registered.
    pub fn register<T: Component>(&mut self, name: impl Into<String>) -> ComponentType<T> {
        let name = name.into();
        let type_id = TypeId::of::<T>();

        assert!(
            !self.by_type_id.contains_key(&type_id),
            "component type {} registered twice",
            std::any::type_name::<T>()
        );
        assert!(
            self.type_index(&name).is_none(),
            "component name {name:?} registered twice"
        );
        assert!(
            self.types.len() < MAX_COMPONENT_TYPES,
            "cannot register {name:?}: registry holds {MAX_COMPONENT_TYPES} types already"
        );

        let index = TypeIndex::new(self.types.len() as u32);
        self.types.push(ComponentTypeInfo {
            name,
            index,
            type_id,
            storage_factory: LinearComponentStorage::<T>::boxed,
            initial_capacity: None,
            inspector: inspect_fields::<T>,
        });
        self.by_type_id.insert(type_id, index);

        ComponentType {
            index,
            marker: PhantomData,
        }
    }

    /// Sets how many components the type's storage reserves when a world first creates it,
    /// overriding [WorldConfig::initial_component_capacity](crate::WorldConfig).
    ///
    /// # Panics
    ///
    /// Panics if the index is not registered.
    pub fn set_initial_capacity(&mut self, index: TypeIndex, capacity: usize) {
        self.info_mut(index).initial_capacity = Some(capacity);
    }

    /// Replaces the inspector of a registered type.
    ///
    /// # Panics
    ///
    /// Panics if the index is not registered.
    pub fn set_inspector(&mut self, index: TypeIndex, inspector: InspectFn) {
        self.info_mut(index).inspector = inspector;
    }

    /// Returns the index registered under `name`.
    pub fn type_index(&self, name: &str) -> Option<TypeIndex> {
        self.types
            .iter()
            .find(|info| info.name == name)
            .map(|info| info.index)
    }

    /// Returns the index registered for `T`.
    pub fn type_index_of<T: 'static>(&self) -> Option<TypeIndex> {
        self.by_type_id.get(&TypeId::of::<T>()).copied()
    }

    /// Returns the token for `T` if it is registered.
    pub fn component_type<T: Component>(&self) -> Option<ComponentType<T>> {
        self.type_index_of::<T>().map(|index| ComponentType {
            index,
            marker: PhantomData,
        })
    }

    /// Returns the info for a registered index.
    pub fn info(&self, index: TypeIndex) -> Option<&ComponentTypeInfo> {
        self.types.get(index.as_usize())
    }

    /// Returns every registered type in index order.
    pub fn all_types(&self) -> impl '_ + Iterator<Item = &ComponentTypeInfo> {
        self.types.iter()
    }

    /// Returns the number of registered types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns true if no type is registered.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    fn info_mut(&mut self, index: TypeIndex) -> &mut ComponentTypeInfo {
        match self.types.get_mut(index.as_usize()) {
            Some(info) => info,
            None => panic!("component type index {} is not registered", index.0),
        }
    }
}

fn inspect_fields<T: Component>(world: &World, entity: EntityHandle, inspector: &mut dyn Inspector) {
    let value = match world.get_component::<T>(entity) {
        Some(component) => serde_json::to_value(&*component),
        None => return,
    };

    match value {
        Ok(serde_json::Value::Object(fields)) => {
            for (label, value) in &fields {
                inspector.field(label, value);
            }
        }
        Ok(value) => inspector.field("value", &value),
        Err(error) => {
            tracing::warn!(
                "cannot inspect {} of {entity:?}: {error}",
                std::any::type_name::<T>()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Clone, Default, Serialize, Deserialize)]
    struct Health(u32);

    impl Component for Health {}

    #[derive(Clone, Default, Serialize, Deserialize)]
    struct Armor(u32);

    impl Component for Armor {}

    #[test]
    fn register_assigns_sequential_indices() {
        let mut registry = ComponentTypeRegistry::new();

        let health = registry.register::<Health>("Health");
        let armor = registry.register::<Armor>("Armor");

        assert_eq!(health.index().get(), 0);
        assert_eq!(armor.index().get(), 1);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn type_index_returns_registered_index() {
        let mut registry = ComponentTypeRegistry::new();
        registry.register::<Health>("Health");
        let armor = registry.register::<Armor>("Armor");

        assert_eq!(registry.type_index("Armor"), Some(armor.index()));
        assert_eq!(registry.type_index_of::<Armor>(), Some(armor.index()));
    }

    #[test]
    fn type_index_unknown_name_returns_none() {
        let registry = ComponentTypeRegistry::new();

        assert_eq!(registry.type_index("Missing"), None);
        assert_eq!(registry.type_index_of::<Health>(), None);
    }

    #[test]
    fn component_type_returns_token_equal_to_registration() {
        let mut registry = ComponentTypeRegistry::new();
        let health = registry.register::<Health>("Health");

        assert_eq!(registry.component_type::<Health>(), Some(health));
        assert_eq!(registry.component_type::<Armor>(), None);
    }

    #[test]
    fn all_types_returns_names_in_index_order() {
        let mut registry = ComponentTypeRegistry::new();
        registry.register::<Health>("Health");
        registry.register::<Armor>("Armor");

        let names: Vec<_> = registry.all_types().map(ComponentTypeInfo::name).collect();

        assert_eq!(names, ["Health", "Armor"]);
    }

    #[test]
    #[should_panic(expected = "registered twice")]
    fn register_same_type_twice_panics() {
        let mut registry = ComponentTypeRegistry::new();
        registry.register::<Health>("Health");

        registry.register::<Health>("Health2");
    }

    #[test]
    #[should_panic(expected = "registered twice")]
    fn register_same_name_twice_panics() {
        let mut registry = ComponentTypeRegistry::new();
        registry.register::<Health>("Health");

        registry.register::<Armor>("Health");
    }

    #[test]
    fn set_initial_capacity_records_hint() {
        let mut registry = ComponentTypeRegistry::new();
        let health = registry.register::<Health>("Health");
        let armor = registry.register::<Armor>("Armor");

        registry.set_initial_capacity(health.index(), 512);

        assert_eq!(registry.info(health.index()).unwrap().initial_capacity(), Some(512));
        assert_eq!(registry.info(armor.index()).unwrap().initial_capacity(), None);
    }

    #[test]
    #[should_panic(expected = "is not registered")]
    fn set_initial_capacity_unknown_index_panics() {
        let mut registry = ComponentTypeRegistry::new();

        registry.set_initial_capacity(TypeIndex::new(1), 8);
    }

    #[test]
    #[should_panic(expected = "is not registered")]
    fn set_inspector_unknown_index_panics() {
        fn noop(_: &World, _: EntityHandle, _: &mut dyn Inspector) {}

        let mut registry = ComponentTypeRegistry::new();

        registry.set_inspector(TypeIndex::new(3), noop);
    }
}

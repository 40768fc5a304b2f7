use std::fmt;

use nohash::IntMap;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;

/// # Entity Handle
///
/// Value reference to an entity. The public ID is never reused within a run; the private index is
/// the entity's slot in the world and is recycled through the free list. A handle is valid while
/// the slot it points at still carries the same public ID.
///
/// Only the public ID is serialized. A deserialized handle points at no slot until it is passed
/// through an [EntityRemap].
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct EntityHandle {
    public_id: u32,
    private_index: u32,
}

impl EntityHandle {
    /// Handle that never refers to a live entity.
    pub const INVALID: Self = Self {
        public_id: Self::NULL_ID,
        private_index: Self::NULL_INDEX,
    };

    pub(crate) const NULL_ID: u32 = 0;
    pub(crate) const NULL_INDEX: u32 = u32::MAX;

    pub(crate) const fn new(public_id: u32, private_index: u32) -> Self {
        Self {
            public_id,
            private_index,
        }
    }

    /// Handle carrying only a public ID, as produced by deserialization.
    pub(crate) const fn unresolved(public_id: u32) -> Self {
        Self::new(public_id, Self::NULL_INDEX)
    }

    /// Returns the stable public identifier.
    pub const fn public_id(&self) -> u32 {
        self.public_id
    }

    /// Returns the slot index in the owning world.
    pub const fn private_index(&self) -> u32 {
        self.private_index
    }

    /// Returns true if this is [EntityHandle::INVALID] or carries the null public ID.
    pub const fn is_null(&self) -> bool {
        self.public_id == Self::NULL_ID
    }
}

impl Default for EntityHandle {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Debug for EntityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.private_index == Self::NULL_INDEX {
            write!(f, "Entity({}@-)", self.public_id)
        } else {
            write!(f, "Entity({}@{})", self.public_id, self.private_index)
        }
    }
}

impl Serialize for EntityHandle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.public_id)
    }
}

impl<'de> Deserialize<'de> for EntityHandle {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        u32::deserialize(deserializer).map(Self::unresolved)
    }
}

/// # Entity Remap
///
/// Translation table from serialized public IDs to freshly allocated handles, built while loading
/// a snapshot and handed to [Component::remap_entities](crate::Component::remap_entities).
#[derive(Clone, Debug, Default)]
pub struct EntityRemap {
    handles: IntMap<u32, EntityHandle>,
}

impl EntityRemap {
    /// Returns an empty remap table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `serialized_id` now lives at `handle`.
    pub fn insert(&mut self, serialized_id: u32, handle: EntityHandle) {
        self.handles.insert(serialized_id, handle);
    }

    /// Returns the live handle for a serialized public ID.
    pub fn get(&self, serialized_id: u32) -> Option<EntityHandle> {
        self.handles.get(&serialized_id).copied()
    }

    /// Translates a deserialized handle. References to entities outside the snapshot become
    /// [EntityHandle::INVALID].
    pub fn remap(&self, handle: EntityHandle) -> EntityHandle {
        if handle.is_null() {
            return EntityHandle::INVALID;
        }

        self.get(handle.public_id())
            .unwrap_or(EntityHandle::INVALID)
    }

    /// Returns the number of entries in the table.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Returns true if the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

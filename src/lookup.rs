use crate::registry::TypeIndex;
use crate::registry::MAX_COMPONENT_TYPES;

/// # Component Mask
///
/// Set of component type indices, one bit per registered type.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct ComponentMask(u64);

impl ComponentMask {
    /// Mask with no types set.
    pub const EMPTY: Self = Self(0);

    /// Returns a mask containing only the given type.
    pub const fn of(index: TypeIndex) -> Self {
        Self(1u64 << index.get())
    }

    /// Returns the mask with the given type added.
    pub const fn with(self, index: TypeIndex) -> Self {
        Self(self.0 | (1u64 << index.get()))
    }

    /// Returns true if the given type is in the mask.
    pub const fn contains(&self, index: TypeIndex) -> bool {
        self.0 & (1u64 << index.get()) != 0
    }

    /// Returns true if every type in `other` is in this mask.
    pub const fn contains_all(&self, other: ComponentMask) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns true if no type is in the mask.
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Returns the number of types in the mask.
    pub const fn len(&self) -> u32 {
        self.0.count_ones()
    }

    /// Returns the raw bits.
    pub const fn bits(&self) -> u64 {
        self.0
    }

    fn insert(&mut self, index: TypeIndex) {
        self.0 |= 1u64 << index.get();
    }

    fn clear(&mut self) {
        self.0 = 0;
    }
}

const _: () = assert!(MAX_COMPONENT_TYPES <= u64::BITS as usize);

/// # Entity Component Lookup
///
/// Per-entity ownership bits plus the slot each owned component occupies in its type's storage.
///
/// A set bit means the slot is live. A slot recorded without its bit belongs to an entity waiting
/// for garbage collection: the component is still resident but no longer visible.
#[derive(Clone, Debug, Default)]
pub struct EntityComponentLookup {
    owned: ComponentMask,
    slots: Vec<u32>,
}

impl EntityComponentLookup {
    const NO_SLOT: u32 = u32::MAX;

    /// Returns the ownership bits.
    pub fn owned(&self) -> ComponentMask {
        self.owned
    }

    /// Returns true if the entity visibly owns a component of the given type.
    pub fn has(&self, index: TypeIndex) -> bool {
        self.owned.contains(index)
    }

    /// Returns the slot of a visibly owned component.
    pub fn slot(&self, index: TypeIndex) -> Option<u32> {
        if self.has(index) {
            self.retained_slot(index)
        } else {
            None
        }
    }

    /// Returns the recorded slot regardless of the ownership bit.
    pub fn retained_slot(&self, index: TypeIndex) -> Option<u32> {
        match self.slots.get(index.as_usize()) {
            Some(&slot) if slot != Self::NO_SLOT => Some(slot),
            _ => None,
        }
    }

    /// Returns every recorded (type, slot) pair regardless of the ownership bits.
    pub fn retained(&self) -> impl '_ + Iterator<Item = (TypeIndex, u32)> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| **slot != Self::NO_SLOT)
            .map(|(index, slot)| (TypeIndex::new(index as u32), *slot))
    }

    /// Records a live slot for the given type and sets its ownership bit.
    pub(crate) fn insert(&mut self, index: TypeIndex, slot: u32) {
        let position = index.as_usize();
        if position >= self.slots.len() {
            self.slots.resize(position + 1, Self::NO_SLOT);
        }

        self.slots[position] = slot;
        self.owned.insert(index);
    }

    /// Replaces a recorded slot after the component was moved in storage.
    ///
    /// # Panics
    ///
    /// Panics if the recorded slot is not `old_slot`.
    pub(crate) fn relocate(&mut self, index: TypeIndex, old_slot: u32, new_slot: u32) {
        let recorded = self.retained_slot(index);
        assert_eq!(
            recorded,
            Some(old_slot),
            "component lookup out of sync for type {index:?}: expected slot {old_slot}, found {recorded:?}"
        );

        self.slots[index.as_usize()] = new_slot;
    }

    /// Clears the ownership bits, hiding every component while keeping the slots for reclamation.
    pub(crate) fn hide_all(&mut self) {
        self.owned.clear();
    }

    /// Forgets every bit and slot.
    pub(crate) fn reset(&mut self) {
        self.owned.clear();
        self.slots.clear();
    }
}

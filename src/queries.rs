//! # Queries
//!
//! Traversals over every entity that visibly owns a set of component types. Each traversal walks
//! the smallest requested storage and checks the other types against the entity's ownership bits.
//! Entities pending deletion are skipped.
//!
//! Callbacks return false to stop early. They may add and remove entities and touch component types
//! outside the query. Adding or destroying a component of a queried type panics, even when the add
//! would fit in the array's spare capacity, because the callback holds `&mut` into that array.
//! Reading a queried type through the world panics for the same reason.
//!
//! Visit order follows storage order, which changes as components are removed.

use crate::entity::EntityHandle;
use crate::lookup::ComponentMask;
use crate::registry::Component;
use crate::registry::TypeIndex;
use crate::storage::Columns;
use crate::World;

/// Visits every entity with an `A`.
pub fn for_each<A: Component>(world: &World, mut f: impl FnMut(EntityHandle, &mut A) -> bool) {
    let (Some(type_a), Some(storage_a)) = (world.type_index_of::<A>(), world.storage_of::<A>())
    else {
        return;
    };

    let _guard_a = storage_a.begin_iteration();
    let mut columns_a = storage_a.columns_mut();
    let Columns {
        owners, components, ..
    } = &mut *columns_a;

    for (owner, component) in owners.iter().zip(components.iter_mut()) {
        if !world.has_type(*owner, type_a) {
            continue;
        }

        if !f(*owner, component) {
            break;
        }
    }
}

/// Visits every entity with both an `A` and a `B`.
///
/// # Panics
///
/// Panics if `A` and `B` are the same type.
pub fn for_each2<A: Component, B: Component>(
    world: &World,
    mut f: impl FnMut(EntityHandle, &mut A, &mut B) -> bool,
) {
    let (Some(type_a), Some(type_b)) = (world.type_index_of::<A>(), world.type_index_of::<B>())
    else {
        return;
    };
    assert_distinct(&[type_a, type_b]);

    let (Some(storage_a), Some(storage_b)) = (world.storage_of::<A>(), world.storage_of::<B>())
    else {
        return;
    };

    let types = [type_a, type_b];
    let mask = mask_of(&types);
    let _guard_a = storage_a.begin_iteration();
    let _guard_b = storage_b.begin_iteration();
    let mut columns_a = storage_a.columns_mut();
    let mut columns_b = storage_b.columns_mut();

    let driver = smallest(&[columns_a.owners.len(), columns_b.owners.len()]);
    let driver_len = [columns_a.owners.len(), columns_b.owners.len()][driver];

    for i in 0..driver_len {
        let owner = match driver {
            0 => columns_a.owners[i],
            _ => columns_b.owners[i],
        };
        let Some([slot_a, slot_b]) = visible_slots(world, owner, mask, types) else {
            continue;
        };

        let a = &mut columns_a.components[slot_a as usize];
        let b = &mut columns_b.components[slot_b as usize];
        if !f(owner, a, b) {
            break;
        }
    }
}

/// Visits every entity with an `A`, a `B`, and a `C`.
///
/// # Panics
///
/// Panics if any two of the types are the same.
pub fn for_each3<A: Component, B: Component, C: Component>(
    world: &World,
    mut f: impl FnMut(EntityHandle, &mut A, &mut B, &mut C) -> bool,
) {
    let (Some(type_a), Some(type_b), Some(type_c)) = (
        world.type_index_of::<A>(),
        world.type_index_of::<B>(),
        world.type_index_of::<C>(),
    ) else {
        return;
    };
    assert_distinct(&[type_a, type_b, type_c]);

    let (Some(storage_a), Some(storage_b), Some(storage_c)) = (
        world.storage_of::<A>(),
        world.storage_of::<B>(),
        world.storage_of::<C>(),
    ) else {
        return;
    };

    let types = [type_a, type_b, type_c];
    let mask = mask_of(&types);
    let _guard_a = storage_a.begin_iteration();
    let _guard_b = storage_b.begin_iteration();
    let _guard_c = storage_c.begin_iteration();
    let mut columns_a = storage_a.columns_mut();
    let mut columns_b = storage_b.columns_mut();
    let mut columns_c = storage_c.columns_mut();

    let lengths = [
        columns_a.owners.len(),
        columns_b.owners.len(),
        columns_c.owners.len(),
    ];
    let driver = smallest(&lengths);

    for i in 0..lengths[driver] {
        let owner = match driver {
            0 => columns_a.owners[i],
            1 => columns_b.owners[i],
            _ => columns_c.owners[i],
        };
        let Some([slot_a, slot_b, slot_c]) = visible_slots(world, owner, mask, types) else {
            continue;
        };

        let a = &mut columns_a.components[slot_a as usize];
        let b = &mut columns_b.components[slot_b as usize];
        let c = &mut columns_c.components[slot_c as usize];
        if !f(owner, a, b, c) {
            break;
        }
    }
}

/// Returns the number of entities visibly owning every type in `mask`.
pub fn count(world: &World, mask: ComponentMask) -> usize {
    world
        .live_entities()
        .into_iter()
        .filter(|entity| world.owned_mask(*entity).contains_all(mask))
        .count()
}

fn visible_slots<const N: usize>(
    world: &World,
    owner: EntityHandle,
    mask: ComponentMask,
    types: [TypeIndex; N],
) -> Option<[u32; N]> {
    world
        .with_lookup(owner, |lookup| {
            if !lookup.owned().contains_all(mask) {
                return None;
            }

            let mut slots = [0; N];
            for (slot, type_index) in slots.iter_mut().zip(types) {
                *slot = lookup.slot(type_index)?;
            }

            Some(slots)
        })
        .flatten()
}

fn mask_of(types: &[TypeIndex]) -> ComponentMask {
    types
        .iter()
        .fold(ComponentMask::EMPTY, |mask, index| mask.with(*index))
}

fn smallest(lengths: &[usize]) -> usize {
    lengths
        .iter()
        .enumerate()
        .min_by_key(|(_, len)| **len)
        .map_or(0, |(index, _)| index)
}

fn assert_distinct(types: &[TypeIndex]) {
    assert_eq!(
        mask_of(types).len() as usize,
        types.len(),
        "query requests the same component type more than once"
    );
}

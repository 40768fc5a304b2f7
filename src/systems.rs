//! # Systems

use glam::Mat4;
use nohash::IntMap;
use nohash::IntSet;

use crate::components::WorldTransform;
use crate::queries;
use crate::ComputedVisibility;
use crate::EntityHandle;
use crate::LocalTransform;
use crate::Parent;
use crate::Visibility;
use crate::World;

/// Computes the visibility for every live entity.
///
/// Entities without a [Visibility], or with [Visibility::Inherit], take their parent's computed
/// visibility. Entities without a valid parent count as visible roots.
pub fn compute_visibility(world: &World) {
    let mut computed = IntMap::default();
    let mut visiting = IntSet::default();

    for entity in world.live_entities() {
        let visibility = visibility_of(world, entity, &mut computed, &mut visiting);
        world.set_or_add(entity, visibility);
    }
}

fn visibility_of(
    world: &World,
    entity: EntityHandle,
    computed: &mut IntMap<u32, ComputedVisibility>,
    visiting: &mut IntSet<u32>,
) -> ComputedVisibility {
    if let Some(visibility) = computed.get(&entity.public_id()) {
        return *visibility;
    }

    let visibility = match world.get::<Visibility>(entity) {
        Some(Visibility::Visible) => ComputedVisibility::Visible,
        Some(Visibility::Invisible) => ComputedVisibility::Invisible,
        Some(Visibility::Inherit) | None => match parent_of(world, entity) {
            Some(parent) if visiting.insert(entity.public_id()) => {
                let inherited = visibility_of(world, parent, computed, visiting);
                visiting.remove(&entity.public_id());
                inherited
            }
            _ => ComputedVisibility::Visible,
        },
    };

    computed.insert(entity.public_id(), visibility);
    visibility
}

/// Computes the world transform for every entity with a [LocalTransform] component.
///
/// A parent without a [LocalTransform] contributes the identity and ends the chain.
pub fn compute_world_transform(world: &World) {
    let mut entities = Vec::with_capacity(world.storage_len::<LocalTransform>());
    queries::for_each::<LocalTransform>(world, |entity, _| {
        entities.push(entity);
        true
    });

    let mut computed = IntMap::default();
    let mut visiting = IntSet::default();
    for entity in entities {
        let matrix = world_matrix(world, entity, &mut computed, &mut visiting);
        world.set_or_add(entity, WorldTransform::new(matrix));
    }
}

fn world_matrix(
    world: &World,
    entity: EntityHandle,
    computed: &mut IntMap<u32, Mat4>,
    visiting: &mut IntSet<u32>,
) -> Mat4 {
    if let Some(matrix) = computed.get(&entity.public_id()) {
        return *matrix;
    }

    let Some(local) = world.get::<LocalTransform>(entity) else {
        return Mat4::IDENTITY;
    };

    let parent_matrix = match parent_of(world, entity) {
        Some(parent) if visiting.insert(entity.public_id()) => {
            let matrix = world_matrix(world, parent, computed, visiting);
            visiting.remove(&entity.public_id());
            matrix
        }
        _ => Mat4::IDENTITY,
    };

    let matrix = parent_matrix * local.matrix();
    computed.insert(entity.public_id(), matrix);
    matrix
}

fn parent_of(world: &World, entity: EntityHandle) -> Option<EntityHandle> {
    world
        .get::<Parent>(entity)
        .map(|parent| parent.0)
        .filter(|parent| world.is_handle_valid(*parent))
}

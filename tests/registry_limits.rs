use std::sync::Arc;

use pulse_ecs::Component;
use pulse_ecs::ComponentMask;
use pulse_ecs::ComponentTypeRegistry;
use pulse_ecs::World;
use pulse_ecs::MAX_COMPONENT_TYPES;
use serde::Deserialize;
use serde::Serialize;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
struct Marker<const N: usize>;

impl<const N: usize> Component for Marker<N> {}

macro_rules! register_markers {
    ($registry:ident; $($n:literal)*) => {
        $( $registry.register::<Marker<$n>>(format!("Marker{}", $n)); )*
    };
}

fn full_registry() -> ComponentTypeRegistry {
    let mut registry = ComponentTypeRegistry::new();
    register_markers!(registry;
        0 1 2 3 4 5 6 7 8 9 10 11 12 13 14 15
        16 17 18 19 20 21 22 23 24 25 26 27 28 29 30 31
        32 33 34 35 36 37 38 39 40 41 42 43 44 45 46 47
        48 49 50 51 52 53 54 55 56 57 58 59 60 61 62 63
    );

    registry
}

#[test]
fn register_fills_every_index() {
    let registry = full_registry();

    assert_eq!(registry.len(), MAX_COMPONENT_TYPES);
    assert_eq!(registry.type_index("Marker63").map(|index| index.get()), Some(63));
}

#[test]
#[should_panic(expected = "holds 64 types already")]
fn register_past_limit_panics() {
    let mut registry = full_registry();

    registry.register::<Marker<64>>("Marker64");
}

#[test]
fn last_index_round_trips_through_mask() {
    let registry = full_registry();
    let first = registry.component_type::<Marker<0>>().unwrap();
    let last = registry.component_type::<Marker<63>>().unwrap();
    let world = World::new(Arc::new(registry));
    let entity = world.add_entity();

    assert!(world.add(entity, Marker::<63>));
    assert!(world.add(entity, Marker::<0>));

    let mask = world.owned_mask(entity);
    assert!(mask.contains(last.index()));
    assert!(mask.contains_all(ComponentMask::of(first.index()).with(last.index())));
    assert_eq!(mask.bits(), (1 << 63) | 1);
    assert!(world.has_type(entity, last.index()));
    assert!(world.has(entity, last));
    assert!(!world.has_component::<Marker<62>>(entity));
}

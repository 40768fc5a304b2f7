use std::sync::Arc;

use pulse_ecs::register_builtin_components;
use pulse_ecs::systems;
use pulse_ecs::Application;
use pulse_ecs::ApplicationState;
use pulse_ecs::ComponentTypeRegistry;
use pulse_ecs::Event;
use pulse_ecs::LocalTransform;
use pulse_ecs::Parent;
use pulse_ecs::Visibility;
use pulse_ecs::World;

struct Playground {
    state: ApplicationState,
    world: World,
}

impl Playground {
    fn new() -> Self {
        let mut registry = ComponentTypeRegistry::new();
        register_builtin_components(&mut registry);
        let world = World::new(Arc::new(registry));

        let root = world.add_entity();
        world.add(root, Visibility::Visible);
        world.add(root, LocalTransform::IDENTITY);

        let child = world.add_entity();
        world.add(child, Visibility::Inherit);
        world.add(child, LocalTransform::IDENTITY);
        world.add(child, Parent(root));

        Self {
            state: ApplicationState::Running,
            world,
        }
    }
}

impl Application for Playground {
    fn title(&self) -> &str {
        "Pulse Playground"
    }

    fn state(&self) -> ApplicationState {
        self.state
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::CloseRequested => {
                self.state = ApplicationState::Finished;
            }
        }
    }

    fn update(&mut self) {
        systems::compute_visibility(&self.world);
        systems::compute_world_transform(&self.world);
    }

    fn world(&self) -> &World {
        &self.world
    }
}

fn main() {
    if let Err(error) = Playground::new().run() {
        eprintln!("playground exited with error: {error}");
    }
}

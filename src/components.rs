use glam::Mat4;
use glam::Quat;
use glam::Vec3;
use serde::Deserialize;
use serde::Serialize;

use crate::Component;
use crate::ComponentTypeRegistry;
use crate::EntityHandle;
use crate::EntityRemap;

/// Registers every built-in component under its type name.
pub fn register_builtin_components(registry: &mut ComponentTypeRegistry) {
    registry.register::<LocalTransform>("LocalTransform");
    registry.register::<WorldTransform>("WorldTransform");
    registry.register::<Visibility>("Visibility");
    registry.register::<ComputedVisibility>("ComputedVisibility");
    registry.register::<Parent>("Parent");
}

/// # Visibility
///
/// Visibility of the entity.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum Visibility {
    /// Inherit the visibility from the entity's parent.
    #[default]
    Inherit,
    /// Entity is visible.
    Visible,
    /// Entity is not visible.
    Invisible,
}

impl Component for Visibility {}

/// # Computed Visibility
///
/// Computed visibility of the entity.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum ComputedVisibility {
    /// Entity is visible.
    #[default]
    Visible,
    /// Entity is not visible.
    Invisible,
}

impl Component for ComputedVisibility {}

/// # Parent
///
/// Entity whose transform and visibility this entity inherits.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Parent(pub EntityHandle);

impl Component for Parent {
    fn remap_entities(&mut self, remap: &EntityRemap) {
        self.0 = remap.remap(self.0);
    }
}

/// # Local Transform
///
/// Position, rotation, and scale of the entity relative to its parent.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocalTransform {
    /// Position of the transform.
    pub position: Vec3,
    /// Rotation of the transform.
    pub rotation: Quat,
    /// Scale of the transform.
    pub scale: Vec3,
}

impl LocalTransform {
    /// Identity transform.
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// Returns a transform with the given position, rotation, and scale.
    pub const fn new(position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }

    /// Returns a transform with the given position.
    pub const fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    /// Returns the transform as a matrix.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

impl Component for LocalTransform {}

impl Default for LocalTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// # World Transform
///
/// Transform of the entity in world coordinates.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldTransform {
    /// Transform matrix.
    pub matrix: Mat4,
}

impl WorldTransform {
    /// Identity transform.
    pub const IDENTITY: Self = Self {
        matrix: Mat4::IDENTITY,
    };

    /// Returns a transform with the given transform matrix.
    pub const fn new(matrix: Mat4) -> Self {
        Self { matrix }
    }
}

impl Component for WorldTransform {}

impl Default for WorldTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

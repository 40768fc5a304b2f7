//! # Errors

use thiserror::Error;

use crate::entity::EntityHandle;

/// Errors returned by snapshot, by-name access, and configuration operations.
///
/// Contract violations such as destroying a component during iteration panic instead, and plain
/// absence is reported through `Option` or `bool`.
#[derive(Error, Debug)]
pub enum EcsError {
    /// A document could not be encoded or decoded as JSON.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A snapshot was tagged with an unexpected type name.
    #[error("type name mismatch: expected {expected:?}, found {found:?}")]
    TypeNameMismatch {
        /// Name the reader expected.
        expected: String,
        /// Name found in the document.
        found: String,
    },

    /// A snapshot is structurally inconsistent.
    #[error("malformed snapshot: {0}")]
    MalformedSnapshot(String),

    /// No component type is registered under the name.
    #[error("unknown component type: {0}")]
    UnknownComponentType(String),

    /// The handle does not refer to a live entity.
    #[error("invalid entity handle: {0:?}")]
    InvalidHandle(EntityHandle),

    /// The entity does not own a component of the named type.
    #[error("{entity:?} has no {type_name} component")]
    MissingComponent {
        /// Entity that was queried.
        entity: EntityHandle,
        /// Name of the component type.
        type_name: String,
    },

    /// A configuration document could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
}

/// Result type for fallible world operations.
pub type EcsResult<T> = Result<T, EcsError>;

/// Errors that stop an [Application](crate::Application) from running.
#[derive(Error, Debug)]
pub enum ApplicationError {
    /// The event loop could not be created or failed while running.
    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    /// The application window could not be created.
    #[error("window creation failed: {0}")]
    Window(#[from] winit::error::OsError),
}

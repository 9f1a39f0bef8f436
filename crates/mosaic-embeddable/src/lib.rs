//! ---
//! mosaic_section: "01-embeddable-core"
//! mosaic_subsection: "module"
//! mosaic_type: "source"
//! mosaic_scope: "code"
//! mosaic_description: "Embeddable unit layer and factory interfaces."
//! mosaic_version: "v0.1.0-alpha"
//! mosaic_owner: "tbd"
//! ---
//! The embeddable unit layer of the Mosaic composition engine.
//!
//! An embeddable is an atomic, self-rendering stateful node: it holds an
//! identity, a type tag, an input record driven from outside, and an output
//! record it publishes itself. Containers (see `mosaic-container`) own
//! embeddables and mediate all state propagation between them; this crate
//! deliberately knows nothing about containment beyond the weak
//! back-reference every unit carries to its owner.
#![warn(missing_docs)]

pub mod embeddable;
pub mod factory;
pub mod panel;
pub mod record;
pub mod subscription;

/// Shared result type for embeddable operations.
pub type Result<T> = std::result::Result<T, EmbeddableError>;

/// Error conditions raised by the embeddable and container layers.
///
/// All variants are local, recoverable conditions from a container's
/// perspective; double-destroy is deliberately not an error (teardown is
/// idempotent).
#[derive(Debug, thiserror::Error)]
pub enum EmbeddableError {
    /// A panel id was referenced that is not present in the container's
    /// declarative panel mapping. The container never fabricates a default
    /// panel record.
    #[error("no panel with id {id}")]
    NotFound {
        /// The missing panel identity.
        id: String,
    },
    /// Factory resolution or instantiation failed while loading a child.
    /// The container's own state stays consistent (panel record present,
    /// no live unit), so callers may retry the load.
    #[error("failed to instantiate embeddable of type {type_name}")]
    InstantiationFailure {
        /// The type tag whose factory lookup or creation failed.
        type_name: String,
        /// Underlying failure reported by the registry or factory.
        #[source]
        source: anyhow::Error,
    },
    /// An operation was attempted against a unit in a state that cannot
    /// accept it (destroyed unit, double attach, uninitialised container).
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Wrapper for JSON serialization or deserialization problems.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub use embeddable::{Embeddable, EmbeddableCore, RenderTarget};
pub use factory::{EmbeddableFactory, FactoryRegistry, InMemoryFactoryRegistry};
pub use panel::PanelRecord;
pub use record::{keys, Record, ViewMode};
pub use subscription::{ChangeListener, Subscription};

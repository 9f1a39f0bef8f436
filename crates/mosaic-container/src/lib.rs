//! ---
//! mosaic_section: "02-composition"
//! mosaic_subsection: "module"
//! mosaic_type: "source"
//! mosaic_scope: "code"
//! mosaic_description: "Container composition layer for the Mosaic engine."
//! mosaic_version: "v0.1.0-alpha"
//! mosaic_owner: "tbd"
//! ---
//! The container layer of the Mosaic composition engine.
//!
//! A container is itself an embeddable whose input carries a declarative
//! `panels` mapping. It instantiates children asynchronously from that
//! mapping, pushes a merged effective input down into every live child
//! whenever its own input changes, and folds each child's published
//! customization back into the matching panel record (which is itself an
//! input change, so the cycle must and does terminate on deep-equal
//! values).
#![warn(missing_docs)]

pub mod container;
pub mod group;

pub use container::{
    effective_input, init_container, spawn_declared_loads, Container, ContainerCore, CONTEXT_KEYS,
};
pub use group::{GroupContainer, GROUP_CONTAINER_TYPE};

//! ---
//! mosaic_section: "01-core-functionality"
//! mosaic_subsection: "module"
//! mosaic_type: "source"
//! mosaic_scope: "code"
//! mosaic_description: "Shared primitives for the Mosaic workspace."
//! mosaic_version: "v0.1.0-alpha"
//! mosaic_owner: "tbd"
//! ---
//! Shared primitives for the Mosaic composition engine workspace.
//! This crate exposes tracing initialisation and panel identity
//! allocation consumed across the workspace.
#![warn(missing_docs)]

pub mod ids;
pub mod logging;

pub use ids::new_panel_id;
pub use logging::{init_tracing, LogFormat, LoggingConfig};

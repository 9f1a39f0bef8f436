//! ---
//! mosaic_section: "03-dashboard"
//! mosaic_subsection: "module"
//! mosaic_type: "source"
//! mosaic_scope: "code"
//! mosaic_description: "Dashboard root layer for the Mosaic engine."
//! mosaic_version: "v0.1.0-alpha"
//! mosaic_owner: "tbd"
//! ---
//! The dashboard root of the Mosaic composition engine.
//!
//! A dashboard is the composed specialization of the container layer: it
//! carries the shared view state every panel inherits (view mode, time
//! range, filters, expansion, full-screen flag), delegates placement of
//! new panels to a [`PanelPlacer`], and renders its panels in declarative
//! order.
#![warn(missing_docs)]

pub mod dashboard;
pub mod input;
pub mod placement;

pub use dashboard::{DashboardContainer, DASHBOARD_CONTAINER_TYPE};
pub use input::DashboardInput;
pub use placement::{PanelPlacer, SequentialPlacer, PANEL_INDEX};

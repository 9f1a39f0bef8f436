//! ---
//! mosaic_section: "03-dashboard"
//! mosaic_subsection: "module"
//! mosaic_type: "source"
//! mosaic_scope: "code"
//! mosaic_description: "Panel placement collaborator for the dashboard root."
//! mosaic_version: "v0.1.0-alpha"
//! mosaic_owner: "tbd"
//! ---
use serde_json::Value;

use mosaic_embeddable::{PanelRecord, Record};

/// Customization key carrying a panel's position in the dashboard flow.
pub const PANEL_INDEX: &str = "panelIndex";

/// Builds the panel record for a brand-new dashboard slot.
///
/// The dashboard hands this collaborator the initial input (already
/// carrying the freshly allocated id), the type tag, and the records of
/// every panel currently declared, and takes back a complete record with
/// whatever placement customization the strategy decides on. Hosting
/// shells with real layout engines supply their own implementation.
pub trait PanelPlacer: Send + Sync {
    /// Build the record for one new panel.
    fn create_panel_state(
        &self,
        input_with_id: Record,
        type_name: &str,
        existing: &[PanelRecord],
    ) -> PanelRecord;
}

/// Default placement strategy: append at the end of the flow, recording
/// the position as a `panelIndex` customization.
#[derive(Debug, Default)]
pub struct SequentialPlacer;

impl PanelPlacer for SequentialPlacer {
    fn create_panel_state(
        &self,
        input_with_id: Record,
        type_name: &str,
        existing: &[PanelRecord],
    ) -> PanelRecord {
        let embeddable_id = input_with_id.id().unwrap_or_default().to_owned();
        let mut customization = Record::new();
        customization.insert(PANEL_INDEX, Value::from(existing.len() as u64));
        PanelRecord::new(embeddable_id, type_name)
            .with_initial_input(input_with_id)
            .with_customization(customization)
    }
}

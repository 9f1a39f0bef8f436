//! ---
//! mosaic_section: "03-dashboard"
//! mosaic_subsection: "module"
//! mosaic_type: "source"
//! mosaic_scope: "code"
//! mosaic_description: "Builder for dashboard input records."
//! mosaic_version: "v0.1.0-alpha"
//! mosaic_owner: "tbd"
//! ---
use indexmap::IndexMap;
use serde_json::Value;

use mosaic_embeddable::{keys, PanelRecord, Record, Result, ViewMode};

/// Builder over the dashboard's persisted input shape.
///
/// Fills in the shared-state defaults (view mode `view`, margins on,
/// full-screen off, titles shown) so hosts only state what differs.
#[derive(Debug)]
pub struct DashboardInput {
    record: Record,
    panels: IndexMap<String, PanelRecord>,
}

impl DashboardInput {
    /// Start a dashboard input with the given identity and the shared
    /// state defaults.
    pub fn new(id: impl Into<String>) -> Self {
        let mut record = Record::new();
        record.set_id(id);
        record.insert(keys::VIEW_MODE, Value::String("view".to_owned()));
        record.insert(keys::USE_MARGINS, Value::Bool(true));
        record.insert(keys::IS_FULL_SCREEN_MODE, Value::Bool(false));
        record.insert(keys::HIDE_PANEL_TITLES, Value::Bool(false));
        Self {
            record,
            panels: IndexMap::new(),
        }
    }

    /// Set the shared view mode.
    pub fn view_mode(mut self, view_mode: ViewMode) -> Self {
        let tag = match view_mode {
            ViewMode::View => "view",
            ViewMode::Edit => "edit",
        };
        self.record.insert(keys::VIEW_MODE, Value::String(tag.to_owned()));
        self
    }

    /// Set the dashboard title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.record.insert(keys::TITLE, Value::String(title.into()));
        self
    }

    /// Set the dashboard description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.record
            .insert(keys::DESCRIPTION, Value::String(description.into()));
        self
    }

    /// Set the shared time range payload.
    pub fn time_range(mut self, time_range: Value) -> Self {
        self.record.insert(keys::TIME_RANGE, time_range);
        self
    }

    /// Set the shared filters payload.
    pub fn filters(mut self, filters: Value) -> Self {
        self.record.insert(keys::FILTERS, filters);
        self
    }

    /// Set the shared query payload.
    pub fn query(mut self, query: Value) -> Self {
        self.record.insert(keys::QUERY, query);
        self
    }

    /// Set the shared refresh configuration payload.
    pub fn refresh_config(mut self, refresh_config: Value) -> Self {
        self.record.insert(keys::REFRESH_CONFIG, refresh_config);
        self
    }

    /// Render panels with or without margins.
    pub fn use_margins(mut self, use_margins: bool) -> Self {
        self.record
            .insert(keys::USE_MARGINS, Value::Bool(use_margins));
        self
    }

    /// Suppress or show panel title chrome.
    pub fn hide_panel_titles(mut self, hide: bool) -> Self {
        self.record
            .insert(keys::HIDE_PANEL_TITLES, Value::Bool(hide));
        self
    }

    /// Start in or out of full-screen presentation.
    pub fn full_screen(mut self, full_screen: bool) -> Self {
        self.record
            .insert(keys::IS_FULL_SCREEN_MODE, Value::Bool(full_screen));
        self
    }

    /// Declare one panel; declaration order is render order.
    pub fn panel(mut self, panel: PanelRecord) -> Self {
        self.panels.insert(panel.embeddable_id.clone(), panel);
        self
    }

    /// Finish the record. The panel mapping is always written, so a
    /// panel-less dashboard still carries an empty `panels` object.
    pub fn build(self) -> Result<Record> {
        let mut record = self.record;
        record.insert(keys::PANELS, serde_json::to_value(&self.panels)?);
        Ok(record)
    }
}

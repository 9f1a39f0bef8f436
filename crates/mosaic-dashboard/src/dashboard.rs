//! ---
//! mosaic_section: "03-dashboard"
//! mosaic_subsection: "module"
//! mosaic_type: "source"
//! mosaic_scope: "code"
//! mosaic_description: "Dashboard root container and its view-state operations."
//! mosaic_version: "v0.1.0-alpha"
//! mosaic_owner: "tbd"
//! ---
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::warn;

use mosaic_container::{effective_input, init_container, Container, ContainerCore};
use mosaic_embeddable::{
    keys, Embeddable, EmbeddableCore, FactoryRegistry, PanelRecord, Record, RenderTarget, Result,
};

use crate::placement::{PanelPlacer, SequentialPlacer};

/// Type tag of the dashboard root container.
pub const DASHBOARD_CONTAINER_TYPE: &str = "dashboard";

/// The composed root of the engine: a container carrying the shared view
/// state (view mode, time range, panel expansion, full-screen flag) every
/// panel inherits, plus the dashboard-only operations on that state.
///
/// A dashboard mirrors its own input into its output on every accepted
/// input change, so hosts observing the dashboard as a unit see the full
/// persisted shape.
pub struct DashboardContainer {
    core: EmbeddableCore,
    composition: ContainerCore,
    placer: Arc<dyn PanelPlacer>,
}

impl DashboardContainer {
    /// Construct a dashboard with the default sequential panel placement.
    pub fn new(input: Record, registry: Arc<dyn FactoryRegistry>) -> Result<Arc<Self>> {
        Self::with_placer(input, registry, Arc::new(SequentialPlacer))
    }

    /// Construct a dashboard placing new panels through `placer`.
    ///
    /// The input record must carry an `id`. Construction does not load
    /// the declared panels; drive them with
    /// [`Container::load_declared_panels`] or
    /// [`mosaic_container::spawn_declared_loads`].
    pub fn with_placer(
        input: Record,
        registry: Arc<dyn FactoryRegistry>,
        placer: Arc<dyn PanelPlacer>,
    ) -> Result<Arc<Self>> {
        let output = input.clone();
        let core = EmbeddableCore::new(DASHBOARD_CONTAINER_TYPE, input, output)?;
        let dashboard = Arc::new(Self {
            core,
            composition: ContainerCore::new(registry),
            placer,
        });
        init_container(&dashboard);

        // Mirror input into output on every accepted change.
        let weak = Arc::downgrade(&dashboard);
        let subscription = dashboard.subscribe_to_input_changes(Arc::new(move |input| {
            if let Some(dashboard) = weak.upgrade() {
                if let Err(err) = dashboard.core.set_output(input.clone()) {
                    warn!(dashboard_id = %dashboard.id(), error = %err, "failed to mirror input into output");
                }
            }
        }));
        dashboard.composition.retain_subscription(subscription);
        Ok(dashboard)
    }

    /// The id of the currently expanded panel, if any.
    pub fn expanded_panel_id(&self) -> Option<String> {
        self.get_input()
            .str_field(keys::EXPANDED_PANEL_ID)
            .map(str::to_owned)
    }

    /// Expand `embeddable_id`, or collapse it when it is already the
    /// expanded panel. Expanding one panel while another is expanded
    /// switches the expansion over. Unknown ids are `NotFound`.
    pub fn toggle_expand_panel(&self, embeddable_id: &str) -> Result<()> {
        self.panel(embeddable_id)?;
        let mut input = self.get_input();
        if input.str_field(keys::EXPANDED_PANEL_ID) == Some(embeddable_id) {
            input.remove(keys::EXPANDED_PANEL_ID);
        } else {
            input.insert(
                keys::EXPANDED_PANEL_ID,
                Value::String(embeddable_id.to_owned()),
            );
        }
        self.set_input(input)
    }

    /// Whether the dashboard is presented full-screen.
    pub fn is_full_screen_mode(&self) -> bool {
        self.get_input()
            .flag(keys::IS_FULL_SCREEN_MODE)
            .unwrap_or(false)
    }

    /// Leave full-screen presentation.
    pub fn exit_full_screen_mode(&self) -> Result<()> {
        let mut input = self.get_input();
        input.insert(keys::IS_FULL_SCREEN_MODE, Value::Bool(false));
        self.set_input(input)
    }

    /// Whether panels are rendered with margins between them.
    pub fn use_margins(&self) -> bool {
        self.get_input().flag(keys::USE_MARGINS).unwrap_or(true)
    }

    /// Wholesale-replace the declarative panel mapping.
    pub fn replace_panels(&self, panels: IndexMap<String, PanelRecord>) -> Result<()> {
        self.set_panels(panels)
    }

    /// Build the panel record for hosting an existing unit on this
    /// dashboard: the unit's current input under a freshly allocated
    /// identity, placed by the dashboard's placement collaborator. The
    /// record is not written; feed it to
    /// [`Container::load_embeddable`] or [`Container::update_panel_record`].
    pub fn create_panel_state_for_embeddable(
        &self,
        unit: &Arc<dyn Embeddable>,
    ) -> Result<PanelRecord> {
        let mut input = unit.get_input();
        input.set_id(mosaic_common::new_panel_id());
        let existing: Vec<PanelRecord> = self.panels().into_values().collect();
        Ok(self
            .placer
            .create_panel_state(input, unit.type_name(), &existing))
    }
}

impl Embeddable for DashboardContainer {
    fn core(&self) -> &EmbeddableCore {
        &self.core
    }

    fn destroy(&self) {
        self.composition.release();
        self.core.destroy();
    }

    /// Present every declared panel in mapping order; a panel whose unit
    /// is still loading is drawn without one.
    fn render(&self, target: &mut dyn RenderTarget) -> anyhow::Result<()> {
        for (embeddable_id, panel) in self.panels() {
            let unit = self.get_embeddable(&embeddable_id);
            target.draw_panel(&panel, unit.as_ref())?;
        }
        Ok(())
    }
}

impl Container for DashboardContainer {
    fn container_core(&self) -> &ContainerCore {
        &self.composition
    }

    /// Dashboard children additionally learn whether they are the
    /// expanded panel. The flag is injected after the `initialInput`
    /// payload so a stale input snapshot can never mask a toggle.
    fn input_for_embeddable(&self, embeddable_id: &str) -> Result<Record> {
        let panel = self.panel(embeddable_id)?;
        let expanded = self.expanded_panel_id().as_deref() == Some(embeddable_id);
        Ok(effective_input(&self.get_input(), &panel, Some(expanded)))
    }

    fn create_panel_record(&self, input_with_id: Record, type_name: &str) -> Result<PanelRecord> {
        let existing: Vec<PanelRecord> = self.panels().into_values().collect();
        Ok(self
            .placer
            .create_panel_state(input_with_id, type_name, &existing))
    }
}

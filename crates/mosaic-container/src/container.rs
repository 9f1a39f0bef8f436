//! ---
//! mosaic_section: "02-composition"
//! mosaic_subsection: "module"
//! mosaic_type: "source"
//! mosaic_scope: "code"
//! mosaic_description: "Container contract, core state, and the propagation algorithm."
//! mosaic_version: "v0.1.0-alpha"
//! mosaic_owner: "tbd"
//! ---
use std::collections::HashMap;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, warn};

use mosaic_embeddable::{
    keys, Embeddable, EmbeddableError, FactoryRegistry, PanelRecord, Record, Result, Subscription,
    ViewMode,
};

/// Shared context fields lifted from a container's own input into every
/// child's effective input, lowest-precedence first in the merge.
pub const CONTEXT_KEYS: [&str; 6] = [
    keys::VIEW_MODE,
    keys::FILTERS,
    keys::QUERY,
    keys::TIME_RANGE,
    keys::REFRESH_CONFIG,
    keys::HIDE_PANEL_TITLES,
];

/// Compute the merged input actually delivered to a child.
///
/// Precedence, lowest to highest: shared context lifted from the
/// container input, the panel's `initialInput` payload (field-by-field
/// shallow merge), the panel's customization as one nested object under
/// `customization`, the optional expansion flag, and finally the child id
/// forced to the panel's `embeddableId`.
///
/// The function is pure; recomputing it from unchanged container state
/// yields a deep-equal record, which is what keeps the attach/propagate
/// cycle from looping.
pub fn effective_input(
    container_input: &Record,
    panel: &PanelRecord,
    is_panel_expanded: Option<bool>,
) -> Record {
    let mut effective = Record::new();
    for key in CONTEXT_KEYS {
        if let Some(value) = container_input.get(key) {
            effective.insert(key, value.clone());
        }
    }
    effective.merge(&panel.initial_input);
    effective.set_customization(panel.customization.clone());
    if let Some(expanded) = is_panel_expanded {
        effective.insert(keys::IS_PANEL_EXPANDED, Value::Bool(expanded));
    }
    effective.set_id(panel.embeddable_id.clone());
    effective
}

/// Runtime state owned by every container: the live-children map, the
/// per-child output subscriptions, the factory registry handle, and the
/// weak self-handles the propagation closures capture.
///
/// Both maps are owned exclusively by their container; nothing else
/// writes them.
pub struct ContainerCore {
    registry: Arc<dyn FactoryRegistry>,
    children: Mutex<IndexMap<String, Arc<dyn Embeddable>>>,
    output_subscriptions: Mutex<HashMap<String, Subscription>>,
    self_container: OnceCell<Weak<dyn Container>>,
    self_embeddable: OnceCell<Weak<dyn Embeddable>>,
    retained_subscriptions: Mutex<Vec<Subscription>>,
}

impl ContainerCore {
    /// Create core state around the registry children are resolved from.
    pub fn new(registry: Arc<dyn FactoryRegistry>) -> Self {
        Self {
            registry,
            children: Mutex::new(IndexMap::new()),
            output_subscriptions: Mutex::new(HashMap::new()),
            self_container: OnceCell::new(),
            self_embeddable: OnceCell::new(),
            retained_subscriptions: Mutex::new(Vec::new()),
        }
    }

    /// The factory registry children are resolved from.
    pub fn registry(&self) -> Arc<dyn FactoryRegistry> {
        self.registry.clone()
    }

    /// Look up a live child by id.
    pub fn child(&self, embeddable_id: &str) -> Option<Arc<dyn Embeddable>> {
        self.children.lock().get(embeddable_id).cloned()
    }

    /// Ids of all live children, in panel insertion order.
    pub fn child_ids(&self) -> Vec<String> {
        self.children.lock().keys().cloned().collect()
    }

    /// Number of live children.
    pub fn child_count(&self) -> usize {
        self.children.lock().len()
    }

    /// Snapshot of the live children, in insertion order.
    pub fn children_snapshot(&self) -> Vec<(String, Arc<dyn Embeddable>)> {
        self.children
            .lock()
            .iter()
            .map(|(id, unit)| (id.clone(), unit.clone()))
            .collect()
    }

    pub(crate) fn insert_child(&self, embeddable_id: String, unit: Arc<dyn Embeddable>) {
        self.children.lock().insert(embeddable_id, unit);
    }

    pub(crate) fn take_child(&self, embeddable_id: &str) -> Option<Arc<dyn Embeddable>> {
        self.children.lock().shift_remove(embeddable_id)
    }

    pub(crate) fn register_output_subscription(
        &self,
        embeddable_id: &str,
        subscription: Subscription,
    ) {
        let previous = self
            .output_subscriptions
            .lock()
            .insert(embeddable_id.to_owned(), subscription);
        if let Some(previous) = previous {
            previous.unsubscribe();
        }
    }

    pub(crate) fn take_output_subscription(&self, embeddable_id: &str) -> Option<Subscription> {
        self.output_subscriptions.lock().remove(embeddable_id)
    }

    pub(crate) fn self_container(&self) -> Result<Weak<dyn Container>> {
        self.self_container.get().cloned().ok_or_else(|| {
            EmbeddableError::InvalidState("container has not been initialised".to_owned())
        })
    }

    pub(crate) fn self_embeddable(&self) -> Result<Weak<dyn Embeddable>> {
        self.self_embeddable.get().cloned().ok_or_else(|| {
            EmbeddableError::InvalidState("container has not been initialised".to_owned())
        })
    }

    /// Keep a subscription alive for the lifetime of the container; it is
    /// released by [`ContainerCore::release`].
    pub fn retain_subscription(&self, subscription: Subscription) {
        self.retained_subscriptions.lock().push(subscription);
    }

    /// Tear down the composition state: release retained and per-child
    /// subscriptions and destroy every live child. Called from a
    /// container's `destroy` before its own core teardown.
    pub fn release(&self) {
        for subscription in self.retained_subscriptions.lock().drain(..) {
            subscription.unsubscribe();
        }
        let subscriptions: Vec<Subscription> = self
            .output_subscriptions
            .lock()
            .drain()
            .map(|(_, subscription)| subscription)
            .collect();
        for subscription in subscriptions {
            subscription.unsubscribe();
        }
        let children: Vec<Arc<dyn Embeddable>> = self
            .children
            .lock()
            .drain(..)
            .map(|(_, unit)| unit)
            .collect();
        for unit in children {
            unit.destroy();
        }
    }
}

impl std::fmt::Debug for ContainerCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerCore")
            .field("children", &self.child_ids())
            .finish()
    }
}

/// Wire a freshly constructed container into the propagation graph.
///
/// Stores the weak self-handles the closures capture and subscribes the
/// container to its own input changes so every accepted change re-pushes
/// effective input into all live children. Must be called exactly once,
/// immediately after the `Arc` is created.
pub fn init_container<C>(container: &Arc<C>)
where
    C: Container + 'static,
{
    let core = container.container_core();
    let as_container: Weak<dyn Container> = Arc::<C>::downgrade(container);
    let as_embeddable: Weak<dyn Embeddable> = Arc::<C>::downgrade(container);
    let _ = core.self_container.set(as_container);
    let _ = core.self_embeddable.set(as_embeddable);

    let weak = Arc::downgrade(container);
    let subscription = container.subscribe_to_input_changes(Arc::new(move |_input| {
        if let Some(container) = weak.upgrade() {
            container.sync_children_inputs();
        }
    }));
    core.retain_subscription(subscription);
}

/// Run the declared-panel loads on the tokio runtime, logging failures.
///
/// This is the fire-and-forget construction path; hosts that want load
/// errors surfaced to them call
/// [`Container::load_declared_panels`] directly instead.
pub fn spawn_declared_loads(container: Arc<dyn Container>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(err) = container.load_declared_panels().await {
            warn!(container_id = %container.id(), error = %err, "declared panel load failed");
        }
    })
}

/// A unit that owns and composes child units.
///
/// The whole propagation algorithm ships as provided methods over
/// [`ContainerCore`]; a concrete container implements
/// [`Container::container_core`] and overrides
/// [`Container::input_for_embeddable`] /
/// [`Container::create_panel_record`] when it projects extra context into
/// its children, the way the dashboard root does.
#[async_trait]
pub trait Container: Embeddable {
    /// The composition state backing this container.
    fn container_core(&self) -> &ContainerCore;

    /// The declarative panel mapping held in this container's own input.
    /// A malformed mapping is treated as empty (and logged) rather than
    /// propagated as a panic.
    fn panels(&self) -> IndexMap<String, PanelRecord> {
        match self.get_input().get(keys::PANELS) {
            Some(value) => serde_json::from_value(value.clone()).unwrap_or_else(|err| {
                warn!(container_id = %self.id(), error = %err, "malformed panels mapping; treating as empty");
                IndexMap::new()
            }),
            None => IndexMap::new(),
        }
    }

    /// Look up one panel record; referencing an id that is not declared
    /// is `NotFound`, never a fabricated default.
    fn panel(&self, embeddable_id: &str) -> Result<PanelRecord> {
        self.panels()
            .get(embeddable_id)
            .cloned()
            .ok_or_else(|| EmbeddableError::NotFound {
                id: embeddable_id.to_owned(),
            })
    }

    /// Look up a live child. `None` either means the id is unknown or the
    /// child is still loading; the panel mapping is authoritative.
    fn get_embeddable(&self, embeddable_id: &str) -> Option<Arc<dyn Embeddable>> {
        self.container_core().child(embeddable_id)
    }

    /// The customization overlay currently held for a panel.
    fn get_embeddable_customization(&self, embeddable_id: &str) -> Result<Record> {
        Ok(self.panel(embeddable_id)?.customization)
    }

    /// The shared view mode, defaulting to view.
    fn view_mode(&self) -> ViewMode {
        self.get_input().view_mode()
    }

    /// Whether panel title chrome is suppressed.
    fn hide_panel_titles(&self) -> bool {
        self.get_input()
            .flag(keys::HIDE_PANEL_TITLES)
            .unwrap_or(false)
    }

    /// Wholesale-replace the declarative panel mapping, committed through
    /// the container's own `set_input`.
    fn set_panels(&self, panels: IndexMap<String, PanelRecord>) -> Result<()> {
        let mut input = self.get_input();
        input.insert(keys::PANELS, serde_json::to_value(&panels)?);
        self.set_input(input)
    }

    /// Write or merge one panel record into the mapping. An existing
    /// record keeps its customization and initial input when the incoming
    /// record does not carry them.
    fn update_panel_record(&self, panel: PanelRecord) -> Result<()> {
        let mut panels = self.panels();
        let merged = match panels.get(&panel.embeddable_id) {
            Some(existing) => existing.merged_with(panel),
            None => panel,
        };
        panels.insert(merged.embeddable_id.clone(), merged);
        self.set_panels(panels)
    }

    /// Compute the effective input for one child; see [`effective_input`]
    /// for the merge precedence. `NotFound` when the panel is not
    /// declared.
    fn input_for_embeddable(&self, embeddable_id: &str) -> Result<Record> {
        let panel = self.panel(embeddable_id)?;
        Ok(effective_input(&self.get_input(), &panel, None))
    }

    /// Snapshot a live unit into a panel record: type, id, the
    /// customization it currently publishes, and its explicit input as the
    /// initial-input payload.
    ///
    /// Explicit input is the unit's current input minus every field the
    /// container re-derives on each recomputation: context values the
    /// child merely inherited, the customization bag, the expansion flag,
    /// the id. Keeping inherited context in the snapshot would shadow
    /// later context changes, since `initialInput` outranks lifted
    /// context in the merge. A context field whose value differs from the
    /// container's own is a genuine per-panel override and is kept.
    fn panel_record_for(&self, unit: &Arc<dyn Embeddable>) -> PanelRecord {
        let container_input = self.get_input();
        let mut initial_input = unit.get_input();
        for key in CONTEXT_KEYS {
            if initial_input.get(key) == container_input.get(key) {
                initial_input.remove(key);
            }
        }
        initial_input.remove(keys::CUSTOMIZATION);
        initial_input.remove(keys::IS_PANEL_EXPANDED);
        initial_input.remove(keys::ID);
        PanelRecord {
            embeddable_id: unit.id().to_owned(),
            panel_type: unit.type_name().to_owned(),
            customization: unit.get_output().customization(),
            initial_input,
        }
    }

    /// Build the panel record for a brand-new child slot from an input
    /// that already carries the freshly allocated id. The dashboard root
    /// overrides this to delegate placement to its panel-state
    /// collaborator.
    fn create_panel_record(&self, input_with_id: Record, type_name: &str) -> Result<PanelRecord> {
        let embeddable_id = input_with_id
            .id()
            .ok_or_else(|| {
                EmbeddableError::InvalidState("panel input record missing id".to_owned())
            })?
            .to_owned();
        Ok(PanelRecord::new(embeddable_id, type_name).with_initial_input(input_with_id))
    }

    /// Attach a loaded unit to this container.
    ///
    /// Sets the back-reference, subscribes to the child's output (the
    /// up-propagation path), pushes the current effective input into the
    /// child once, registers it in the live map, and refreshes the panel
    /// record snapshot. Returns `Ok(false)` when the panel record is gone
    /// (a load that finished after its panel was removed), in which case
    /// the unit is destroyed and the result discarded rather than
    /// resurrecting a removed child.
    fn add_embeddable(&self, unit: Arc<dyn Embeddable>) -> Result<bool> {
        let embeddable_id = unit.id().to_owned();
        if self.panel(&embeddable_id).is_err() {
            debug!(container_id = %self.id(), embeddable_id = %embeddable_id, "discarding unit loaded for a removed panel");
            unit.destroy();
            return Ok(false);
        }

        unit.set_container(self.container_core().self_embeddable()?)?;

        let weak = self.container_core().self_container()?;
        let child_id = embeddable_id.clone();
        let subscription = unit.subscribe_to_output_changes(Arc::new(move |output| {
            if let Some(container) = weak.upgrade() {
                container.absorb_child_output(&child_id, output);
            }
        }));
        self.container_core()
            .register_output_subscription(&embeddable_id, subscription);

        unit.set_input(self.input_for_embeddable(&embeddable_id)?)?;
        self.container_core()
            .insert_child(embeddable_id.clone(), unit.clone());
        self.update_panel_record(self.panel_record_for(&unit))?;
        Ok(true)
    }

    /// Up-propagation: fold a child's published customization into the
    /// matching panel record (nested shallow merge, child-reported keys
    /// overwrite container-held keys of the same name, other panel fields
    /// untouched) and commit through the container's own `set_input`.
    fn absorb_child_output(&self, embeddable_id: &str, output: &Record) {
        let Ok(mut panel) = self.panel(embeddable_id) else {
            // Output from a child whose panel is already gone; removal
            // owns the teardown.
            return;
        };
        panel.customization.merge(&output.customization());
        if let Err(err) = self.update_panel_record(panel) {
            warn!(container_id = %self.id(), embeddable_id = %embeddable_id, error = %err, "failed to absorb child output");
        }
    }

    /// Remove a child: destroy the unit, drop it from the live map,
    /// release its output subscription, and remove the panel record in a
    /// single `set_input`, so observers never see one map without the
    /// other. `NotFound` when neither a unit nor a panel record exists
    /// for the id.
    fn remove_embeddable(&self, embeddable_id: &str) -> Result<()> {
        let core = self.container_core();
        let unit = core.take_child(embeddable_id);
        if let Some(subscription) = core.take_output_subscription(embeddable_id) {
            subscription.unsubscribe();
        }
        if let Some(unit) = &unit {
            unit.destroy();
        }

        let mut panels = self.panels();
        let had_panel = panels.shift_remove(embeddable_id).is_some();
        if had_panel {
            self.set_panels(panels)?;
        }

        if unit.is_some() || had_panel {
            Ok(())
        } else {
            Err(EmbeddableError::NotFound {
                id: embeddable_id.to_owned(),
            })
        }
    }

    /// Down-propagation: recompute and push the effective input into
    /// every live child. Children whose computed input is deep-equal to
    /// what they already hold are not notified.
    fn sync_children_inputs(&self) {
        for (embeddable_id, unit) in self.container_core().children_snapshot() {
            match self.input_for_embeddable(&embeddable_id) {
                Ok(next) => {
                    if let Err(err) = unit.set_input(next) {
                        warn!(container_id = %self.id(), embeddable_id = %embeddable_id, error = %err, "failed to push effective input");
                    }
                }
                Err(_) => {
                    debug!(container_id = %self.id(), embeddable_id = %embeddable_id, "no panel record for live unit; skipping input push");
                }
            }
        }
    }

    /// Load one child from its panel record.
    ///
    /// The record is written into the panel mapping first so the state is
    /// visible while the factory resolves. Factory lookup or creation
    /// failure is `InstantiationFailure`; the panel record stays, no unit
    /// is registered, and the caller may retry. Returns `Ok(None)` when
    /// the panel was removed while the load was in flight.
    async fn load_embeddable(&self, panel: PanelRecord) -> Result<Option<Arc<dyn Embeddable>>> {
        let type_name = panel.panel_type.clone();
        let embeddable_id = panel.embeddable_id.clone();
        self.update_panel_record(panel)?;

        let factory = self
            .container_core()
            .registry()
            .factory_by_name(&type_name)
            .ok_or_else(|| EmbeddableError::InstantiationFailure {
                type_name: type_name.clone(),
                source: anyhow::anyhow!("no factory registered for this type"),
            })?;
        let initial_input = self.input_for_embeddable(&embeddable_id)?;
        let unit = factory
            .create(initial_input)
            .await
            .map_err(|source| EmbeddableError::InstantiationFailure {
                type_name: type_name.clone(),
                source,
            })?;

        if self.add_embeddable(unit.clone())? {
            Ok(Some(unit))
        } else {
            Ok(None)
        }
    }

    /// Add a brand-new child at runtime: allocate a fresh id, build the
    /// minimal initial input carrying it, construct the panel record, and
    /// follow the load/attach path.
    async fn add_new_embeddable(&self, type_name: &str) -> Result<Arc<dyn Embeddable>> {
        let embeddable_id = mosaic_common::new_panel_id();
        let mut seed = Record::new();
        seed.set_id(embeddable_id.clone());
        let panel = self.create_panel_record(seed, type_name)?;
        match self.load_embeddable(panel).await? {
            Some(unit) => Ok(unit),
            None => Err(EmbeddableError::NotFound { id: embeddable_id }),
        }
    }

    /// Load every panel declared in the container's input, sequentially,
    /// surfacing the first failure to the caller.
    async fn load_declared_panels(&self) -> Result<()> {
        for (_, panel) in self.panels() {
            self.load_embeddable(panel).await?;
        }
        Ok(())
    }
}

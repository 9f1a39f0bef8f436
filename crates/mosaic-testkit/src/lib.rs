//! ---
//! mosaic_section: "04-test-support"
//! mosaic_subsection: "module"
//! mosaic_type: "source"
//! mosaic_scope: "code"
//! mosaic_description: "Stub embeddables, factories, and recording render targets."
//! mosaic_version: "v0.1.0-alpha"
//! mosaic_owner: "tbd"
//! ---
//! Test support for the Mosaic workspace.
//!
//! The stubs here implement the real embeddable contract against in-memory
//! state so the composition and dashboard layers can be exercised without a
//! hosting shell: a [`StubEmbeddable`] that counts the input changes it
//! receives and can publish customization, a [`StubFactory`] that records
//! what it created (and can be told to fail), and a
//! [`RecordingRenderTarget`] that captures panel presentation order.
#![warn(missing_docs)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::bail;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use mosaic_embeddable::{
    Embeddable, EmbeddableCore, EmbeddableFactory, InMemoryFactoryRegistry, PanelRecord, Record,
    RenderTarget, Result, Subscription,
};

/// A minimal embeddable that records every input change delivered to it.
pub struct StubEmbeddable {
    core: EmbeddableCore,
    input_changes: Arc<AtomicUsize>,
    _input_subscription: Subscription,
}

impl StubEmbeddable {
    /// Create a stub of the given type from an initial input record. The
    /// record must carry an `id`.
    pub fn new(type_name: &str, input: Record) -> Result<Arc<Self>> {
        let core = EmbeddableCore::new(type_name, input, Record::new())?;
        let input_changes = Arc::new(AtomicUsize::new(0));
        let counter = input_changes.clone();
        let subscription = core.subscribe_input(Arc::new(move |_record| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        Ok(Arc::new(Self {
            core,
            input_changes,
            _input_subscription: subscription,
        }))
    }

    /// Number of input change notifications this unit has received since
    /// creation. Deep-equal pushes are not counted because they are never
    /// delivered.
    pub fn input_change_count(&self) -> usize {
        self.input_changes.load(Ordering::SeqCst)
    }

    /// Publish one customization key through the unit's output record,
    /// preserving previously published keys.
    pub fn publish_customization(&self, key: &str, value: Value) -> Result<()> {
        let mut output = self.core.output();
        let mut customization = output.customization();
        customization.insert(key, value);
        output.set_customization(customization);
        self.core.set_output(output)
    }

    /// Publish a whole output record.
    pub fn publish_output(&self, output: Record) -> Result<()> {
        self.core.set_output(output)
    }
}

impl Embeddable for StubEmbeddable {
    fn core(&self) -> &EmbeddableCore {
        &self.core
    }
}

/// Factory producing [`StubEmbeddable`] units, keeping a handle to every
/// unit it created so tests can reach the concrete type behind the
/// container's `Arc<dyn Embeddable>`.
pub struct StubFactory {
    type_name: String,
    failing: bool,
    created: Mutex<Vec<Arc<StubEmbeddable>>>,
}

impl StubFactory {
    /// A factory that succeeds, producing stubs tagged with `type_name`.
    pub fn new(type_name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            type_name: type_name.into(),
            failing: false,
            created: Mutex::new(Vec::new()),
        })
    }

    /// A factory that fails every create call, for instantiation-failure
    /// paths.
    pub fn failing(type_name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            type_name: type_name.into(),
            failing: true,
            created: Mutex::new(Vec::new()),
        })
    }

    /// Every unit this factory has created, in creation order.
    pub fn created(&self) -> Vec<Arc<StubEmbeddable>> {
        self.created.lock().clone()
    }

    /// The unit created for the given id, if any.
    pub fn created_by_id(&self, id: &str) -> Option<Arc<StubEmbeddable>> {
        self.created
            .lock()
            .iter()
            .find(|unit| unit.id() == id)
            .cloned()
    }
}

#[async_trait]
impl EmbeddableFactory for StubFactory {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    async fn create(&self, initial_input: Record) -> anyhow::Result<Arc<dyn Embeddable>> {
        if self.failing {
            bail!("stub factory configured to fail");
        }
        let unit = StubEmbeddable::new(&self.type_name, initial_input)?;
        self.created.lock().push(unit.clone());
        Ok(unit)
    }
}

/// Build an in-memory registry with one succeeding stub factory per type.
pub fn registry_with(types: &[&str]) -> Arc<InMemoryFactoryRegistry> {
    let registry = InMemoryFactoryRegistry::new();
    for type_name in types {
        registry.register(StubFactory::new(*type_name));
    }
    Arc::new(registry)
}

/// Render target that records which panels were presented, in order, and
/// whether their unit was live at the time.
#[derive(Default)]
pub struct RecordingRenderTarget {
    /// `(embeddable_id, unit_was_loaded)` per presented panel.
    pub drawn: Vec<(String, bool)>,
}

impl RecordingRenderTarget {
    /// Create an empty recording target.
    pub fn new() -> Self {
        Self::default()
    }
}

impl RenderTarget for RecordingRenderTarget {
    fn draw_panel(
        &mut self,
        panel: &PanelRecord,
        embeddable: Option<&Arc<dyn Embeddable>>,
    ) -> anyhow::Result<()> {
        self.drawn
            .push((panel.embeddable_id.clone(), embeddable.is_some()));
        Ok(())
    }
}

/// Convenience re-export so integration tests can register bespoke
/// factories alongside the stubs.
pub use mosaic_embeddable::InMemoryFactoryRegistry as Registry;

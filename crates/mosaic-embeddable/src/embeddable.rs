//! ---
//! mosaic_section: "01-embeddable-core"
//! mosaic_subsection: "module"
//! mosaic_type: "source"
//! mosaic_scope: "code"
//! mosaic_description: "The embeddable unit contract and shared core state."
//! mosaic_version: "v0.1.0-alpha"
//! mosaic_owner: "tbd"
//! ---
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::panel::PanelRecord;
use crate::record::Record;
use crate::subscription::{ChangeListener, SubscriberSet, Subscription};
use crate::{EmbeddableError, Result};

/// Surface handed to [`Embeddable::render`]; the engine only guarantees
/// that panels are presented in declarative order, pixel layout belongs to
/// the hosting shell.
pub trait RenderTarget {
    /// Present one panel slot. `embeddable` is `None` while the child is
    /// still loading.
    fn draw_panel(
        &mut self,
        panel: &PanelRecord,
        embeddable: Option<&Arc<dyn Embeddable>>,
    ) -> anyhow::Result<()>;
}

struct CoreState {
    input: Record,
    output: Record,
    container: Option<Weak<dyn Embeddable>>,
    destroyed: bool,
}

/// Shared state and behavior backing every embeddable unit.
///
/// Concrete units hold one of these and delegate the [`Embeddable`] trait
/// methods to it, which gives them the full subscription and lifecycle
/// contract without reimplementing it.
pub struct EmbeddableCore {
    id: String,
    type_name: String,
    state: Mutex<CoreState>,
    input_subscribers: SubscriberSet,
    output_subscribers: SubscriberSet,
}

impl EmbeddableCore {
    /// Create core state for a unit of the given type.
    ///
    /// The initial input must carry the unit identity under `id`; the
    /// identity is immutable afterwards.
    pub fn new(type_name: impl Into<String>, input: Record, output: Record) -> Result<Self> {
        let id = input
            .id()
            .map(str::to_owned)
            .ok_or_else(|| EmbeddableError::InvalidState("input record missing id".to_owned()))?;
        Ok(Self {
            id,
            type_name: type_name.into(),
            state: Mutex::new(CoreState {
                input,
                output,
                container: None,
                destroyed: false,
            }),
            input_subscribers: SubscriberSet::default(),
            output_subscribers: SubscriberSet::default(),
        })
    }

    /// Immutable unit identity, assigned at creation.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Type tag identifying which factory produced this unit.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Snapshot of the current input record.
    pub fn input(&self) -> Record {
        self.state.lock().input.clone()
    }

    /// Snapshot of the current output record.
    pub fn output(&self) -> Record {
        self.state.lock().output.clone()
    }

    /// Replace the input record wholesale and notify input subscribers
    /// synchronously with the new value.
    ///
    /// A record that is deep-equal (structural JSON equality) to the
    /// current input is accepted without notifying anyone; this is the
    /// short-circuit the container propagation cycle relies on to
    /// terminate. Fails with `InvalidState` once the unit is destroyed.
    pub fn set_input(&self, next: Record) -> Result<()> {
        {
            let mut state = self.state.lock();
            if state.destroyed {
                return Err(EmbeddableError::InvalidState(format!(
                    "embeddable {} is destroyed",
                    self.id
                )));
            }
            if state.input == next {
                return Ok(());
            }
            state.input = next.clone();
        }
        self.input_subscribers.notify(&next);
        Ok(())
    }

    /// Publish a new output record and notify output subscribers.
    ///
    /// Only the unit itself may call this; consumers treat output
    /// snapshots as read-only. The same deep-equality short-circuit as
    /// [`EmbeddableCore::set_input`] applies.
    pub fn set_output(&self, next: Record) -> Result<()> {
        {
            let mut state = self.state.lock();
            if state.destroyed {
                return Err(EmbeddableError::InvalidState(format!(
                    "embeddable {} is destroyed",
                    self.id
                )));
            }
            if state.output == next {
                return Ok(());
            }
            state.output = next.clone();
        }
        self.output_subscribers.notify(&next);
        Ok(())
    }

    /// Register a listener for accepted input changes.
    pub fn subscribe_input(&self, listener: ChangeListener) -> Subscription {
        self.input_subscribers.subscribe(listener)
    }

    /// Register a listener for published output changes.
    pub fn subscribe_output(&self, listener: ChangeListener) -> Subscription {
        self.output_subscribers.subscribe(listener)
    }

    /// One-time attach of the owning container back-reference.
    ///
    /// The relation is non-owning (`Weak`): containers own units, never
    /// the other way around. Attaching the same container again is a
    /// no-op; attaching a different one is `InvalidState`.
    pub fn set_container(&self, container: Weak<dyn Embeddable>) -> Result<()> {
        let mut state = self.state.lock();
        if state.destroyed {
            return Err(EmbeddableError::InvalidState(format!(
                "embeddable {} is destroyed",
                self.id
            )));
        }
        match &state.container {
            Some(existing) if existing.ptr_eq(&container) => Ok(()),
            Some(_) => Err(EmbeddableError::InvalidState(format!(
                "embeddable {} is already attached to a container",
                self.id
            ))),
            None => {
                state.container = Some(container);
                Ok(())
            }
        }
    }

    /// The owning container back-reference, if attached.
    pub fn container(&self) -> Option<Weak<dyn Embeddable>> {
        self.state.lock().container.clone()
    }

    /// True once the unit has been destroyed.
    pub fn is_destroyed(&self) -> bool {
        self.state.lock().destroyed
    }

    /// Mark the unit inert and release every subscription held on it.
    /// Idempotent: destroying twice is a no-op, not an error.
    pub fn destroy(&self) {
        {
            let mut state = self.state.lock();
            if state.destroyed {
                return;
            }
            state.destroyed = true;
            state.container = None;
        }
        self.input_subscribers.clear();
        self.output_subscribers.clear();
    }
}

impl std::fmt::Debug for EmbeddableCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddableCore")
            .field("id", &self.id)
            .field("type_name", &self.type_name)
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

/// The atomic stateful node of the composition engine.
///
/// Everything the propagation layer needs is provided in terms of
/// [`EmbeddableCore`], so a concrete unit only implements
/// [`Embeddable::core`] (and optionally [`Embeddable::render`] or
/// [`Embeddable::destroy`] when it has extra teardown of its own).
pub trait Embeddable: Send + Sync {
    /// The shared core state backing this unit.
    fn core(&self) -> &EmbeddableCore;

    /// Opaque unique identity, immutable after creation.
    fn id(&self) -> &str {
        self.core().id()
    }

    /// Type tag identifying which factory produced this unit.
    fn type_name(&self) -> &str {
        self.core().type_name()
    }

    /// Snapshot of the current input; callers must not treat it as live.
    fn get_input(&self) -> Record {
        self.core().input()
    }

    /// Snapshot of the current output; read-only for consumers.
    fn get_output(&self) -> Record {
        self.core().output()
    }

    /// Replace the input record wholesale; see
    /// [`EmbeddableCore::set_input`] for the equality short-circuit and
    /// destroyed-unit behavior.
    fn set_input(&self, next: Record) -> Result<()> {
        self.core().set_input(next)
    }

    /// Register a listener for accepted input changes; delivery order is
    /// subscription order.
    fn subscribe_to_input_changes(&self, listener: ChangeListener) -> Subscription {
        self.core().subscribe_input(listener)
    }

    /// Register a listener for published output changes.
    fn subscribe_to_output_changes(&self, listener: ChangeListener) -> Subscription {
        self.core().subscribe_output(listener)
    }

    /// One-time attach of the owning container; see
    /// [`EmbeddableCore::set_container`].
    fn set_container(&self, container: Weak<dyn Embeddable>) -> Result<()> {
        self.core().set_container(container)
    }

    /// The owning container back-reference, if attached.
    fn container(&self) -> Option<Weak<dyn Embeddable>> {
        self.core().container()
    }

    /// True once the unit has been destroyed.
    fn is_destroyed(&self) -> bool {
        self.core().is_destroyed()
    }

    /// Tear the unit down, releasing all subscriptions held on it and by
    /// it. Idempotent.
    fn destroy(&self) {
        self.core().destroy()
    }

    /// Present this unit's visual content on the given surface. The
    /// default does nothing; self-rendering units override it.
    fn render(&self, target: &mut dyn RenderTarget) -> anyhow::Result<()> {
        let _ = target;
        Ok(())
    }
}

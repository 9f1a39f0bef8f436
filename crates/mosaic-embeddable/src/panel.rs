//! ---
//! mosaic_section: "01-embeddable-core"
//! mosaic_subsection: "module"
//! mosaic_type: "source"
//! mosaic_scope: "code"
//! mosaic_description: "Declarative panel records for container child slots."
//! mosaic_version: "v0.1.0-alpha"
//! mosaic_owner: "tbd"
//! ---
use serde::{Deserialize, Serialize};

use crate::record::Record;

/// Declarative descriptor of one child slot inside a container.
///
/// A panel record is pure data: it is written into the container's own
/// input before the corresponding unit is instantiated (child creation is
/// asynchronous and may still be pending), and it is the only part of a
/// child that persists. `embeddable_id` is unique within a container's
/// panel mapping and stable for the lifetime of the panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelRecord {
    /// Identity of the child slot.
    pub embeddable_id: String,
    /// Type tag used to look up the factory that loads this child.
    #[serde(rename = "type")]
    pub panel_type: String,
    /// Free-form overrides merged into the child's effective input under
    /// the `customization` key; mergeable from both container and child
    /// sides.
    #[serde(default, skip_serializing_if = "Record::is_empty")]
    pub customization: Record,
    /// Opaque payload merged into the child's effective input on every
    /// recomputation; may be empty.
    #[serde(default, skip_serializing_if = "Record::is_empty")]
    pub initial_input: Record,
}

impl PanelRecord {
    /// Construct a minimal panel record for the given slot and type.
    pub fn new(embeddable_id: impl Into<String>, panel_type: impl Into<String>) -> Self {
        Self {
            embeddable_id: embeddable_id.into(),
            panel_type: panel_type.into(),
            customization: Record::new(),
            initial_input: Record::new(),
        }
    }

    /// Builder-style helper attaching an initial input payload.
    pub fn with_initial_input(mut self, initial_input: Record) -> Self {
        self.initial_input = initial_input;
        self
    }

    /// Builder-style helper attaching a customization overlay.
    pub fn with_customization(mut self, customization: Record) -> Self {
        self.customization = customization;
        self
    }

    /// Merge an incoming record over this one.
    ///
    /// Identity and type are always taken from the incoming record. The
    /// customization overlay and initial input are only replaced when the
    /// incoming record actually carries them; an empty bag keeps what the
    /// container already holds (mirroring the optional-field semantics of
    /// the persisted shape).
    pub fn merged_with(&self, incoming: PanelRecord) -> PanelRecord {
        PanelRecord {
            embeddable_id: incoming.embeddable_id,
            panel_type: incoming.panel_type,
            customization: if incoming.customization.is_empty() {
                self.customization.clone()
            } else {
                incoming.customization
            },
            initial_input: if incoming.initial_input.is_empty() {
                self.initial_input.clone()
            } else {
                incoming.initial_input
            },
        }
    }
}

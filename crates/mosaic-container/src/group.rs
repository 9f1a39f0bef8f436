//! ---
//! mosaic_section: "02-composition"
//! mosaic_subsection: "module"
//! mosaic_type: "source"
//! mosaic_scope: "code"
//! mosaic_description: "Minimal concrete container for plain panel groupings."
//! mosaic_version: "v0.1.0-alpha"
//! mosaic_owner: "tbd"
//! ---
use std::sync::Arc;

use mosaic_embeddable::{Embeddable, EmbeddableCore, FactoryRegistry, Record, Result};

use crate::container::{init_container, Container, ContainerCore};

/// Type tag of the plain grouping container.
pub const GROUP_CONTAINER_TYPE: &str = "group";

/// A minimal container with no context of its own beyond what its input
/// carries: it loads the declared panels, propagates state, and nothing
/// else. Dashboards and other composed roots specialize [`Container`]
/// instead; this type exists for plain groupings and as the simplest full
/// exercise of the propagation algorithm.
pub struct GroupContainer {
    core: EmbeddableCore,
    composition: ContainerCore,
}

impl GroupContainer {
    /// Construct a group container around the given input record. The
    /// record must carry an `id`; a `panels` mapping is optional.
    ///
    /// Construction does not block on child loading: drive the declared
    /// panels with [`Container::load_declared_panels`] (errors surfaced to
    /// you) or [`crate::spawn_declared_loads`] (fire and forget).
    pub fn new(input: Record, registry: Arc<dyn FactoryRegistry>) -> Result<Arc<Self>> {
        let core = EmbeddableCore::new(GROUP_CONTAINER_TYPE, input, Record::new())?;
        let container = Arc::new(Self {
            core,
            composition: ContainerCore::new(registry),
        });
        init_container(&container);
        Ok(container)
    }
}

impl Embeddable for GroupContainer {
    fn core(&self) -> &EmbeddableCore {
        &self.core
    }

    fn destroy(&self) {
        self.composition.release();
        self.core.destroy();
    }
}

impl Container for GroupContainer {
    fn container_core(&self) -> &ContainerCore {
        &self.composition
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::effective_input;
    use mosaic_embeddable::{keys, EmbeddableError, PanelRecord};
    use mosaic_testkit::{registry_with, StubEmbeddable, StubFactory};
    use serde_json::json;

    fn group_input(panels: serde_json::Value) -> Record {
        Record::from_value(json!({
            "id": "group-1",
            "viewMode": "edit",
            "panels": panels,
        }))
        .expect("object")
    }

    #[tokio::test]
    async fn declared_panels_load_into_live_children() {
        let registry = registry_with(&["list"]);
        let container = GroupContainer::new(
            group_input(json!({
                "p1": {"embeddableId": "p1", "type": "list"},
                "p2": {"embeddableId": "p2", "type": "list"},
            })),
            registry,
        )
        .expect("container");

        container.load_declared_panels().await.expect("load");

        let child = container.get_embeddable("p1").expect("loaded");
        let input = child.get_input();
        assert_eq!(input.id(), Some("p1"));
        // Context is lifted from the container's own input.
        assert_eq!(input.get(keys::VIEW_MODE), Some(&json!("edit")));
        assert_eq!(container.container_core().child_count(), 2);
    }

    #[tokio::test]
    async fn every_live_child_has_a_panel_record() {
        let registry = registry_with(&["list"]);
        let container = GroupContainer::new(
            group_input(json!({
                "p1": {"embeddableId": "p1", "type": "list"},
            })),
            registry,
        )
        .expect("container");
        container.load_declared_panels().await.expect("load");
        let _ = container.add_new_embeddable("list").await.expect("add");

        let panels = container.panels();
        for id in container.container_core().child_ids() {
            assert!(panels.contains_key(&id), "unit {} has no panel record", id);
        }
    }

    #[tokio::test]
    async fn child_customization_folds_back_into_the_panel_record() {
        let factory = StubFactory::new("list");
        let registry = Arc::new(
            mosaic_embeddable::InMemoryFactoryRegistry::new().with_factory(factory.clone()),
        );
        let container = GroupContainer::new(
            group_input(json!({
                "p1": {
                    "embeddableId": "p1",
                    "type": "list",
                    "customization": {"label": "left"},
                },
            })),
            registry,
        )
        .expect("container");
        container.load_declared_panels().await.expect("load");

        let stub = factory.created_by_id("p1").expect("created");
        stub.publish_customization("color", json!("red")).expect("live");

        let customization = container.get_embeddable_customization("p1").expect("panel");
        assert_eq!(customization.get("color"), Some(&json!("red")));
        // Keys the container already held are untouched.
        assert_eq!(customization.get("label"), Some(&json!("left")));

        // And the child sees its own customization come back down.
        let input = stub.get_input();
        assert_eq!(
            input.customization().get("color"),
            Some(&json!("red"))
        );
    }

    #[tokio::test]
    async fn per_panel_context_overrides_survive_context_changes() {
        let factory = StubFactory::new("list");
        let registry = Arc::new(
            mosaic_embeddable::InMemoryFactoryRegistry::new().with_factory(factory.clone()),
        );
        let container = GroupContainer::new(
            Record::from_value(json!({
                "id": "group-1",
                "viewMode": "view",
                "query": "memory",
                "panels": {
                    "p1": {
                        "embeddableId": "p1",
                        "type": "list",
                        "initialInput": {"viewMode": "edit"},
                    },
                    "p2": {"embeddableId": "p2", "type": "list"},
                },
            }))
            .expect("object"),
            registry,
        )
        .expect("container");
        container.load_declared_panels().await.expect("load");

        let mut input = container.get_input();
        input.insert(keys::QUERY, json!("cpu"));
        container.set_input(input).expect("live");

        let p1 = factory.created_by_id("p1").expect("p1");
        let p2 = factory.created_by_id("p2").expect("p2");
        // Inherited context follows the container; the declared override
        // keeps shadowing it.
        assert_eq!(p1.get_input().get(keys::QUERY), Some(&json!("cpu")));
        assert_eq!(p2.get_input().get(keys::QUERY), Some(&json!("cpu")));
        assert_eq!(p1.get_input().get(keys::VIEW_MODE), Some(&json!("edit")));
        assert_eq!(p2.get_input().get(keys::VIEW_MODE), Some(&json!("view")));
    }

    #[tokio::test]
    async fn unchanged_container_input_triggers_no_child_notifications() {
        let factory = StubFactory::new("list");
        let registry = Arc::new(
            mosaic_embeddable::InMemoryFactoryRegistry::new().with_factory(factory.clone()),
        );
        let container = GroupContainer::new(
            group_input(json!({
                "p1": {"embeddableId": "p1", "type": "list"},
            })),
            registry,
        )
        .expect("container");
        container.load_declared_panels().await.expect("load");

        let stub = factory.created_by_id("p1").expect("created");
        let settled = stub.input_change_count();

        // Recomputing effective input from unchanged state is deep-equal.
        let first = container.input_for_embeddable("p1").expect("panel");
        let second = container.input_for_embeddable("p1").expect("panel");
        assert_eq!(first, second);

        // Re-setting the container's own input with an identical record
        // must not start another propagation round.
        container.set_input(container.get_input()).expect("live");
        assert_eq!(stub.input_change_count(), settled);
    }

    #[tokio::test]
    async fn removal_clears_both_maps_and_severs_output() {
        let factory = StubFactory::new("list");
        let registry = Arc::new(
            mosaic_embeddable::InMemoryFactoryRegistry::new().with_factory(factory.clone()),
        );
        let container = GroupContainer::new(
            group_input(json!({
                "p1": {"embeddableId": "p1", "type": "list"},
                "p2": {"embeddableId": "p2", "type": "list"},
            })),
            registry,
        )
        .expect("container");
        container.load_declared_panels().await.expect("load");

        let stub = factory.created_by_id("p1").expect("created");
        container.remove_embeddable("p1").expect("remove");

        assert!(container.get_embeddable("p1").is_none());
        assert!(!container.panels().contains_key("p1"));
        assert!(stub.is_destroyed());

        // A retained reference cannot reach the container any more: the
        // unit is inert and the output subscription has been released.
        assert!(stub.publish_customization("color", json!("red")).is_err());
        assert!(matches!(
            container.get_embeddable_customization("p1"),
            Err(EmbeddableError::NotFound { .. })
        ));

        // Removing an unknown id is NotFound, repeat removal included.
        assert!(matches!(
            container.remove_embeddable("p1"),
            Err(EmbeddableError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn add_new_embeddable_allocates_a_fresh_slot() {
        let registry = registry_with(&["list"]);
        let container =
            GroupContainer::new(group_input(json!({})), registry).expect("container");

        let unit = container.add_new_embeddable("list").await.expect("add");

        assert_eq!(container.container_core().child_count(), 1);
        let panels = container.panels();
        assert_eq!(panels.len(), 1);
        assert!(panels.contains_key(unit.id()));
        assert_eq!(unit.get_input().id(), Some(unit.id()));
    }

    #[tokio::test]
    async fn factory_failure_keeps_the_panel_record_and_allows_retry() {
        let registry = Arc::new(
            mosaic_embeddable::InMemoryFactoryRegistry::new()
                .with_factory(StubFactory::failing("list")),
        );
        let container =
            GroupContainer::new(group_input(json!({})), registry.clone()).expect("container");

        let panel = PanelRecord::new("p1", "list");
        let err = container
            .load_embeddable(panel.clone())
            .await
            .map(|_| ())
            .expect_err("factory fails");
        assert!(matches!(
            err,
            EmbeddableError::InstantiationFailure { .. }
        ));

        // Panel record present, no unit registered.
        assert!(container.panels().contains_key("p1"));
        assert!(container.get_embeddable("p1").is_none());

        // Replacing the factory and retrying the same load succeeds.
        registry.register(StubFactory::new("list"));
        let unit = container
            .load_embeddable(panel)
            .await
            .expect("retry")
            .expect("not discarded");
        assert_eq!(unit.id(), "p1");
        assert!(container.get_embeddable("p1").is_some());
    }

    #[tokio::test]
    async fn missing_factory_is_an_instantiation_failure() {
        let registry = registry_with(&[]);
        let container =
            GroupContainer::new(group_input(json!({})), registry).expect("container");
        let err = container
            .load_embeddable(PanelRecord::new("p1", "unknown"))
            .await
            .map(|_| ())
            .expect_err("no factory");
        assert!(matches!(err, EmbeddableError::InstantiationFailure { .. }));
    }

    #[tokio::test]
    async fn late_load_for_a_removed_panel_is_discarded() {
        let registry = registry_with(&["list"]);
        let container =
            GroupContainer::new(group_input(json!({})), registry).expect("container");

        // A unit arriving for a slot with no panel record models a load
        // finishing after its panel was removed.
        let mut input = Record::new();
        input.set_id("ghost");
        let orphan = StubEmbeddable::new("list", input).expect("stub");
        let registered = container.add_embeddable(orphan.clone()).expect("handled");

        assert!(!registered);
        assert!(orphan.is_destroyed());
        assert!(container.get_embeddable("ghost").is_none());
        assert!(!container.panels().contains_key("ghost"));
    }

    #[tokio::test]
    async fn unknown_panel_lookup_is_not_found() {
        let registry = registry_with(&["list"]);
        let container =
            GroupContainer::new(group_input(json!({})), registry).expect("container");
        assert!(matches!(
            container.input_for_embeddable("nope"),
            Err(EmbeddableError::NotFound { .. })
        ));
    }

    #[test]
    fn effective_input_merge_precedence() {
        let container_input = Record::from_value(json!({
            "id": "g",
            "viewMode": "view",
            "timeRange": {"from": "now-15m", "to": "now"},
        }))
        .expect("object");
        let panel = PanelRecord::new("p1", "list")
            .with_initial_input(
                Record::from_value(json!({"viewMode": "edit", "query": "cpu"})).expect("object"),
            )
            .with_customization(Record::from_value(json!({"color": "red"})).expect("object"));

        let merged = effective_input(&container_input, &panel, None);

        // initialInput overrides lifted context field-by-field.
        assert_eq!(merged.get(keys::VIEW_MODE), Some(&json!("edit")));
        assert_eq!(merged.get(keys::QUERY), Some(&json!("cpu")));
        assert_eq!(
            merged.get(keys::TIME_RANGE),
            Some(&json!({"from": "now-15m", "to": "now"}))
        );
        // Customization stays nested, id is forced last.
        assert_eq!(merged.get(keys::CUSTOMIZATION), Some(&json!({"color": "red"})));
        assert_eq!(merged.id(), Some("p1"));
    }

    #[tokio::test]
    async fn destroy_tears_down_children() {
        let factory = StubFactory::new("list");
        let registry = Arc::new(
            mosaic_embeddable::InMemoryFactoryRegistry::new().with_factory(factory.clone()),
        );
        let container = GroupContainer::new(
            group_input(json!({
                "p1": {"embeddableId": "p1", "type": "list"},
            })),
            registry,
        )
        .expect("container");
        container.load_declared_panels().await.expect("load");

        let stub = factory.created_by_id("p1").expect("created");
        container.destroy();

        assert!(container.is_destroyed());
        assert!(stub.is_destroyed());
        assert_eq!(container.container_core().child_count(), 0);
    }
}

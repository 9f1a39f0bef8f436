//! ---
//! mosaic_section: "01-embeddable-core"
//! mosaic_subsection: "module"
//! mosaic_type: "source"
//! mosaic_scope: "code"
//! mosaic_description: "Factory and registry interfaces for loading units by type tag."
//! mosaic_version: "v0.1.0-alpha"
//! mosaic_owner: "tbd"
//! ---
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::embeddable::Embeddable;
use crate::record::Record;

/// Constructor for one embeddable type.
///
/// Creation is asynchronous and may fail; the caller (a container loading
/// a child) maps failures into `InstantiationFailure` without touching its
/// live-unit map.
#[async_trait]
pub trait EmbeddableFactory: Send + Sync {
    /// The type tag this factory produces.
    fn type_name(&self) -> &str;

    /// Instantiate a new unit with the supplied initial input.
    async fn create(&self, initial_input: Record) -> anyhow::Result<Arc<dyn Embeddable>>;
}

/// Lookup of polymorphic constructors keyed by string type tag.
pub trait FactoryRegistry: Send + Sync {
    /// Resolve a factory by type tag, if one is registered.
    fn factory_by_name(&self, type_name: &str) -> Option<Arc<dyn EmbeddableFactory>>;
}

/// Registry backed by a mutex protected map, primarily for tests and
/// single-process hosts; larger shells typically bring their own registry
/// implementation.
#[derive(Default)]
pub struct InMemoryFactoryRegistry {
    factories: Mutex<HashMap<String, Arc<dyn EmbeddableFactory>>>,
}

impl InMemoryFactoryRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under its own type tag, replacing any previous
    /// registration for that tag.
    pub fn register(&self, factory: Arc<dyn EmbeddableFactory>) {
        self.factories
            .lock()
            .insert(factory.type_name().to_owned(), factory);
    }

    /// Builder-style helper for constructing a populated registry.
    pub fn with_factory(self, factory: Arc<dyn EmbeddableFactory>) -> Self {
        self.register(factory);
        self
    }
}

impl FactoryRegistry for InMemoryFactoryRegistry {
    fn factory_by_name(&self, type_name: &str) -> Option<Arc<dyn EmbeddableFactory>> {
        self.factories.lock().get(type_name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddable::EmbeddableCore;

    struct NullUnit {
        core: EmbeddableCore,
    }

    impl Embeddable for NullUnit {
        fn core(&self) -> &EmbeddableCore {
            &self.core
        }
    }

    struct NullFactory;

    #[async_trait]
    impl EmbeddableFactory for NullFactory {
        fn type_name(&self) -> &str {
            "null"
        }

        async fn create(&self, initial_input: Record) -> anyhow::Result<Arc<dyn Embeddable>> {
            Ok(Arc::new(NullUnit {
                core: EmbeddableCore::new("null", initial_input, Record::new())?,
            }))
        }
    }

    #[tokio::test]
    async fn lookup_resolves_registered_factories() {
        let registry = InMemoryFactoryRegistry::new().with_factory(Arc::new(NullFactory));

        let factory = registry.factory_by_name("null").expect("registered");
        let mut input = Record::new();
        input.set_id("n1");
        let unit = factory.create(input).await.expect("create");
        assert_eq!(unit.id(), "n1");
        assert_eq!(unit.type_name(), "null");

        assert!(registry.factory_by_name("missing").is_none());
    }
}

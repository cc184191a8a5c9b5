use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

use super::traits::{HandlerFactory, TaskHandler};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("queue '{0}' already has a handler registered")]
    DuplicateQueue(String),

    #[error("no handler registered for queue '{0}'")]
    NotFound(String),
}

/// Registry mapping queue names to handler factories
///
/// Populated once at startup; only one consumer is bound per queue in this
/// design, so a second registration for the same name is a configuration bug
/// and fails eagerly.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    factories: BTreeMap<String, Arc<dyn HandlerFactory>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, factory: Arc<dyn HandlerFactory>) -> Result<(), RegistryError> {
        let queue_name = factory.queue_name().to_string();
        if self.factories.contains_key(&queue_name) {
            return Err(RegistryError::DuplicateQueue(queue_name));
        }
        self.factories.insert(queue_name, factory);
        Ok(())
    }

    /// Build a fresh handler instance for the given queue
    pub fn resolve(&self, queue_name: &str) -> Result<Box<dyn TaskHandler>, RegistryError> {
        self.factories
            .get(queue_name)
            .map(|factory| factory.create())
            .ok_or_else(|| RegistryError::NotFound(queue_name.to_string()))
    }

    /// Registered queue names in deterministic (sorted) order
    pub fn queue_names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::HandlerError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingHandler;

    #[async_trait]
    impl TaskHandler for CountingHandler {
        async fn process(&self, _body: &[u8]) -> Result<(), HandlerError> {
            Ok(())
        }
    }

    struct CountingFactory {
        queue: String,
        created: AtomicUsize,
    }

    impl CountingFactory {
        fn new(queue: &str) -> Self {
            Self {
                queue: queue.to_string(),
                created: AtomicUsize::new(0),
            }
        }
    }

    impl HandlerFactory for CountingFactory {
        fn queue_name(&self) -> &str {
            &self.queue
        }

        fn create(&self) -> Box<dyn TaskHandler> {
            self.created.fetch_add(1, Ordering::Relaxed);
            Box::new(CountingHandler)
        }
    }

    #[test]
    fn test_register_and_resolve() {
        let mut registry = HandlerRegistry::new();
        registry
            .register(Arc::new(CountingFactory::new("jobs.email")))
            .unwrap();

        assert!(registry.resolve("jobs.email").is_ok());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut registry = HandlerRegistry::new();
        registry
            .register(Arc::new(CountingFactory::new("jobs.email")))
            .unwrap();

        let result = registry.register(Arc::new(CountingFactory::new("jobs.email")));
        assert!(matches!(result, Err(RegistryError::DuplicateQueue(name)) if name == "jobs.email"));
    }

    #[test]
    fn test_resolve_unknown_queue() {
        let registry = HandlerRegistry::new();
        assert!(matches!(
            registry.resolve("missing"),
            Err(RegistryError::NotFound(name)) if name == "missing"
        ));
    }

    #[test]
    fn test_resolve_builds_fresh_instance_per_call() {
        let factory = Arc::new(CountingFactory::new("jobs.email"));
        let mut registry = HandlerRegistry::new();
        registry.register(factory.clone()).unwrap();

        registry.resolve("jobs.email").unwrap();
        registry.resolve("jobs.email").unwrap();
        registry.resolve("jobs.email").unwrap();

        assert_eq!(factory.created.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn test_queue_names_sorted() {
        let mut registry = HandlerRegistry::new();
        registry
            .register(Arc::new(CountingFactory::new("zeta")))
            .unwrap();
        registry
            .register(Arc::new(CountingFactory::new("alpha")))
            .unwrap();

        let names: Vec<&str> = registry.queue_names().collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }
}

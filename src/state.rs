//! Shared application state for all routes. Controllers are immutable once registered.

use crate::config::ResolvedResource;
use crate::controller::ResourceController;
use crate::presenter::Presenter;
use crate::repository::ResourceRepository;
use crate::store::DataStore;
use crate::upload::UploadSink;
use std::collections::HashMap;
use std::sync::Arc;

/// Resource name (URL path segment) -> controller.
#[derive(Default)]
pub struct ResourceRegistry {
    by_name: HashMap<String, Arc<ResourceController>>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        ResourceRegistry {
            by_name: HashMap::new(),
        }
    }

    /// One `ResourceRepository` + controller per resolved resource, all sharing the collaborators.
    pub fn build(
        resources: Vec<ResolvedResource>,
        store: Arc<dyn DataStore>,
        uploads: Arc<dyn UploadSink>,
        presenter: Arc<dyn Presenter>,
    ) -> Self {
        let mut registry = ResourceRegistry::new();
        for resolved in resources {
            let repository = ResourceRepository::new(resolved.definition.clone(), store.clone(), uploads.clone());
            let controller = ResourceController::from_resolved(resolved, Arc::new(repository), presenter.clone());
            registry.insert(controller);
        }
        registry
    }

    pub fn insert(&mut self, controller: ResourceController) {
        tracing::debug!(resource = %controller.name(), "resource registered");
        self.by_name.insert(controller.name().to_string(), Arc::new(controller));
    }

    pub fn get(&self, name: &str) -> Option<Arc<ResourceController>> {
        self.by_name.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.by_name.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DataStore>,
    pub registry: Arc<ResourceRegistry>,
}

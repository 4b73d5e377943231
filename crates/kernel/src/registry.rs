use anyhow::Context;
use bookstore_db::{IndexSpec, SharedStore};
use std::sync::Arc;

use crate::module::{InitCtx, Module};

/// Module registry driving the lifecycle of every registered module in registration order
pub struct ModuleRegistry {
    modules: Vec<Arc<dyn Module>>,
}

impl ModuleRegistry {
    /// Create a new module registry
    pub fn new() -> Self {
        Self {
            modules: Vec::new(),
        }
    }

    /// Register a module; names must be unique
    pub fn register(&mut self, module: Arc<dyn Module>) -> anyhow::Result<()> {
        if self.get_module(module.name()).is_some() {
            anyhow::bail!("module '{}' is already registered", module.name());
        }
        self.modules.push(module);
        Ok(())
    }

    /// Get all registered modules in registration order
    pub fn modules(&self) -> &[Arc<dyn Module>] {
        &self.modules
    }

    /// Get a module by name
    pub fn get_module(&self, name: &str) -> Option<&Arc<dyn Module>> {
        self.modules.iter().find(|module| module.name() == name)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Initialize modules in registration order
    pub async fn init_all(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!("initializing {} modules", self.modules.len());

        for module in &self.modules {
            tracing::info!(module = module.name(), "initializing module");

            module
                .init(ctx)
                .await
                .with_context(|| format!("failed to initialize module '{}'", module.name()))?;
        }

        Ok(())
    }

    /// Start modules in registration order
    pub async fn start_all(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        for module in &self.modules {
            tracing::info!(module = module.name(), "starting module");

            module
                .start(ctx)
                .await
                .with_context(|| format!("failed to start module '{}'", module.name()))?;
        }

        Ok(())
    }

    /// Stop modules in reverse registration order
    pub async fn stop_all(&self) -> anyhow::Result<()> {
        tracing::info!("stopping modules in reverse order");

        for module in self.modules.iter().rev() {
            tracing::info!(module = module.name(), "stopping module");

            module
                .stop()
                .await
                .with_context(|| format!("failed to stop module '{}'", module.name()))?;
        }

        Ok(())
    }

    /// Collect the indexes declared by all modules, tagged with the declaring module
    pub fn collect_indexes(&self) -> Vec<(&'static str, IndexSpec)> {
        let mut indexes: Vec<_> = self
            .modules
            .iter()
            .flat_map(|module| {
                module
                    .indexes()
                    .into_iter()
                    .map(move |index| (module.name(), index))
            })
            .collect();

        // Deterministic creation order
        indexes.sort_by(|a, b| {
            a.1.collection
                .cmp(b.1.collection)
                .then_with(|| a.1.name().cmp(&b.1.name()))
        });
        indexes.dedup_by(|a, b| a.1 == b.1);

        indexes
    }

    /// Create every declared index on the store, returning how many were ensured
    pub async fn ensure_indexes(&self, store: &SharedStore) -> anyhow::Result<usize> {
        let indexes = self.collect_indexes();

        for (module, index) in &indexes {
            tracing::info!(
                module = *module,
                collection = index.collection,
                index = %index.name(),
                unique = index.unique,
                "ensuring index"
            );

            store.ensure_index(index).await.with_context(|| {
                format!(
                    "failed to create index '{}' on '{}'",
                    index.name(),
                    index.collection
                )
            })?;
        }

        Ok(indexes.len())
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use bookstore_db::MemoryStore;
    use std::sync::Mutex;

    struct TestModule {
        name: &'static str,
        journal: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait::async_trait]
    impl Module for TestModule {
        fn name(&self) -> &'static str {
            self.name
        }

        fn indexes(&self) -> Vec<IndexSpec> {
            vec![
                IndexSpec::ascending("books", "price"),
                IndexSpec::ascending("books", "category"),
            ]
        }

        async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
            self.journal.lock().unwrap().push(format!("init {}", self.name));
            Ok(())
        }

        async fn stop(&self) -> anyhow::Result<()> {
            self.journal.lock().unwrap().push(format!("stop {}", self.name));
            Ok(())
        }
    }

    fn module(name: &'static str, journal: &Arc<Mutex<Vec<String>>>) -> Arc<dyn Module> {
        Arc::new(TestModule {
            name,
            journal: journal.clone(),
        })
    }

    #[test]
    fn test_module_registry_creation() {
        let registry = ModuleRegistry::new();
        assert!(registry.is_empty()); // No modules registered yet
        assert!(registry.collect_indexes().is_empty());
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        let journal = Arc::default();
        let mut registry = ModuleRegistry::new();
        registry.register(module("books", &journal)).unwrap();
        assert!(registry.register(module("books", &journal)).is_err());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_index_collection_is_sorted_and_deduplicated() {
        let journal = Arc::default();
        let mut registry = ModuleRegistry::new();
        registry.register(module("books", &journal)).unwrap();
        registry.register(module("catalog", &journal)).unwrap();

        let names: Vec<_> = registry
            .collect_indexes()
            .into_iter()
            .map(|(_, index)| index.name())
            .collect();
        assert_eq!(names, vec!["category_1", "price_1"]);
    }

    #[tokio::test]
    async fn test_module_lifecycle() {
        let journal: Arc<Mutex<Vec<String>>> = Arc::default();
        let mut registry = ModuleRegistry::new();
        registry.register(module("books", &journal)).unwrap();
        registry.register(module("users", &journal)).unwrap();

        let settings = Settings::default();
        let store: SharedStore = Arc::new(MemoryStore::new());
        let ctx = InitCtx {
            settings: &settings,
            store: &store,
        };

        registry.init_all(&ctx).await.unwrap();
        registry.start_all(&ctx).await.unwrap();
        assert_eq!(registry.ensure_indexes(&store).await.unwrap(), 2);
        registry.stop_all().await.unwrap();

        assert_eq!(
            *journal.lock().unwrap(),
            vec!["init books", "init users", "stop users", "stop books"]
        );
    }
}

pub mod authors;
pub mod books;
pub mod users;

use bookstore_db::SharedStore;
use bookstore_kernel::{settings::Settings, ModuleRegistry};

/// Register all bookstore modules with the registry
pub fn register_all(
    registry: &mut ModuleRegistry,
    settings: &Settings,
    store: &SharedStore,
) -> anyhow::Result<()> {
    registry.register(authors::create_module(store.clone()))?;
    registry.register(books::create_module(settings, store.clone()))?;
    registry.register(users::create_module(store.clone()))?;
    Ok(())
}

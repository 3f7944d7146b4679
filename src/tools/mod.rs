//! The built-in tool surface.
//!
//! Each submodule exposes a `module()` (or a tool class) that the registry
//! builder turns into model-callable functions. `default_sources` is the
//! full set wired into the agent.

pub mod grocery;
pub mod webscraper;

use std::path::PathBuf;
use std::sync::Arc;

use crate::browser::manager::BrowserManagerClass;
use crate::toolgen::{InstanceArena, ToolSource};

/// All tool sources the agent ships with, in registration order. The
/// browser arguments are configured defaults for sessions where the model
/// omits them.
pub fn default_sources(
    arena: Arc<InstanceArena>,
    browser_user_data_dir: Option<PathBuf>,
    browser_debug: bool,
) -> Vec<ToolSource> {
    vec![
        ToolSource::Class(Arc::new(BrowserManagerClass::new(
            browser_user_data_dir,
            browser_debug,
        ))),
        ToolSource::Module(grocery::module(arena.clone())),
        ToolSource::Module(webscraper::module()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toolgen::{ToolRegistryBuilder, SENTINEL_TOOL};

    #[test]
    fn test_default_surface() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let arena = Arc::new(InstanceArena::new());
            let registry = ToolRegistryBuilder::new(arena.clone())
                .sources(default_sources(arena, None, false))
                .build()
                .await;

            for name in [
                "initialize_browser_manager",
                "start_browser_manager",
                "stop_browser_manager",
                "setup_heb_search_location",
                "find_product_at_heb",
                "url_to_markdown",
            ] {
                assert!(registry.has_tool(name), "missing tool {}", name);
            }
            assert_eq!(registry.len(), 6);
            assert_eq!(registry.schemas().last().unwrap().name, SENTINEL_TOOL);
        });
    }
}

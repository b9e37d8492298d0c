//! Process-global hot-context registry.
//!
//! The host runs modules on a single thread, so the global registry is a
//! thread-local created on first use. It is only ever changed through these
//! functions; nothing resets it except pruning a path. Embedders that want
//! isolation (tests, multiple runtimes) should own a [`HotContextRegistry`]
//! instead.

use super::{HotContextRegistry, HotModule};
use serde_json::Value;
use std::rc::Rc;

thread_local! {
    static REGISTRY: Rc<HotContextRegistry<Value>> = Rc::new(HotContextRegistry::new());
}

fn registry() -> Rc<HotContextRegistry<Value>> {
    REGISTRY.with(Rc::clone)
}

/// Run `f` against the global registry.
pub fn with_registry<R>(f: impl FnOnce(&HotContextRegistry<Value>) -> R) -> R {
    REGISTRY.with(|registry| f(registry))
}

/// Get or create the global hot context for `path`.
pub fn create_hot_context(path: &str) -> HotModule<Value> {
    registry().create_hot_context(path)
}

/// Run the update sequence for `path`. Returns `false` when the path is
/// unknown and the caller should fall back to a full reload.
pub async fn apply_update(path: &str, new_module: Option<Value>) -> bool {
    registry().apply_update(path, new_module).await.is_handled()
}

/// Run dispose callbacks for `path` and forget it.
pub async fn prune_module(path: &str) {
    registry().prune_module(path).await;
}

/// Paths with a live hot context, sorted.
#[must_use]
pub fn list_active_paths() -> Vec<String> {
    registry().list_active_paths()
}

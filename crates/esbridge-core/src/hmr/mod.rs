//! Hot module replacement for the embedded host.
//!
//! Provides:
//! - [`HotContextRegistry`]: path → persistent hot context, the state behind
//!   `import.meta.hot` in a running module
//! - the update (dispose, then accept) and prune (dispose, then delete)
//!   sequences run when the dev server reports a change
//! - process-global entry points for transports that cannot hold a reference
//! - dev-server wire message decoding and an engine tying it to a module host

mod context;
pub mod engine;
pub mod global;
pub mod payload;

pub use context::{CallbackError, CallbackResult, HotData, HotModule};
use context::Queued;
pub use engine::{HmrEngine, HmrOutcome, ModuleHost};
pub use payload::{HmrEvent, HmrMessage, HmrPayloadError};

use futures::FutureExt;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;

/// Result of an update request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Dispose and accept callbacks ran (individual failures are logged).
    Handled,
    /// No context is registered for the path; the caller should fall back to
    /// a full reload.
    NotHandled,
}

impl UpdateOutcome {
    #[must_use]
    pub fn is_handled(self) -> bool {
        matches!(self, Self::Handled)
    }
}

/// Which callback list is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Dispose,
    Accept,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Dispose => "dispose",
            Self::Accept => "accept",
        })
    }
}

/// Registry of hot contexts keyed by module path.
///
/// `M` is the host's module instance type, handed to accept callbacks.
/// Single-threaded: contexts hold `Rc`s and callbacks are local futures.
pub struct HotContextRegistry<M> {
    contexts: RefCell<HashMap<String, HotModule<M>>>,
}

impl<M> Default for HotContextRegistry<M> {
    fn default() -> Self {
        Self {
            contexts: RefCell::new(HashMap::new()),
        }
    }
}

impl<M: Clone + 'static> HotContextRegistry<M> {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the context for `path`.
    ///
    /// A fresh path gets an empty context. A known path (a module being
    /// re-evaluated) gets the same context back with its accept callbacks
    /// cleared; dispose callbacks, `selfAccepted` and data are kept.
    pub fn create_hot_context(&self, path: &str) -> HotModule<M> {
        let mut contexts = self.contexts.borrow_mut();
        if let Some(hot) = contexts.get(path) {
            hot.reset_for_reload();
            tracing::debug!(path, "reusing hot context");
            return hot.clone();
        }
        let hot = HotModule::new(path);
        contexts.insert(path.to_string(), hot.clone());
        tracing::debug!(path, "created hot context");
        hot
    }

    /// The context registered for `path`, if any.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<HotModule<M>> {
        self.contexts.borrow().get(path).cloned()
    }

    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.contexts.borrow().contains_key(path)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.contexts.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contexts.borrow().is_empty()
    }

    /// Registered paths, sorted.
    #[must_use]
    pub fn list_active_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.contexts.borrow().keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Run the update sequence for `path`.
    ///
    /// Every pending dispose callback, including those of instances replaced
    /// since the last update, runs (and is dropped) before the first accept
    /// callback starts. Accept callbacks stay registered for the next update
    /// unless the module re-registers in the meantime. A failing or
    /// panicking callback is logged and the rest still run.
    ///
    /// A request made while a sequence for the same path is running (for
    /// example from one of its callbacks) is queued behind it and reported
    /// as handled right away.
    pub async fn apply_update(&self, path: &str, new_module: Option<M>) -> UpdateOutcome {
        let Some(hot) = self.get(path) else {
            tracing::warn!(path, "no hot context registered; full reload required");
            return UpdateOutcome::NotHandled;
        };
        self.run_or_queue(&hot, Queued::Update(new_module)).await;
        UpdateOutcome::Handled
    }

    /// Run the dispose callbacks for `path`, then forget it entirely.
    ///
    /// No-op for unknown paths. Queued like [`Self::apply_update`] when a
    /// sequence for the path is already running.
    pub async fn prune_module(&self, path: &str) {
        let Some(hot) = self.get(path) else {
            return;
        };
        self.run_or_queue(&hot, Queued::Prune).await;
    }

    async fn run_or_queue(&self, hot: &HotModule<M>, job: Queued<M>) {
        let Some(_busy) = hot.try_begin() else {
            tracing::debug!(path = hot.path(), "hot sequence already running; queued");
            hot.enqueue(job);
            return;
        };

        let mut job = job;
        loop {
            match job {
                Queued::Update(new_module) => self.run_update(hot, new_module).await,
                Queued::Prune => {
                    self.run_prune(hot).await;
                    // Nothing is left to update once the path is gone.
                    hot.clear_queue();
                    break;
                }
            }
            match hot.next_queued() {
                Some(next) => job = next,
                None => break,
            }
        }
    }

    async fn run_update(&self, hot: &HotModule<M>, new_module: Option<M>) {
        let path = hot.path();
        run_disposers(hot).await;

        let (generation, mut accepters) = {
            let mut state = hot.state_mut();
            (state.generation, std::mem::take(&mut state.accept_callbacks))
        };
        for callback in &mut accepters {
            let module = new_module.clone();
            run_callback(Phase::Accept, path, async { callback(module).await }).await;
        }

        // Put the callbacks back unless the context was re-created or pruned
        // while they ran.
        let current = self.get(path).is_some_and(|registered| registered.ptr_eq(hot));
        let mut state = hot.state_mut();
        if current && state.generation == generation {
            accepters.append(&mut state.accept_callbacks);
            state.accept_callbacks = accepters;
        }

        tracing::debug!(path, "hot update applied");
    }

    async fn run_prune(&self, hot: &HotModule<M>) {
        let path = hot.path();
        run_disposers(hot).await;

        let mut contexts = self.contexts.borrow_mut();
        if contexts.get(path).is_some_and(|registered| registered.ptr_eq(hot)) {
            contexts.remove(path);
        }
        tracing::info!(path, "pruned hot context");
    }
}

/// Take and run every pending dispose callback of `hot`.
async fn run_disposers<M: 'static>(hot: &HotModule<M>) {
    let disposers = std::mem::take(&mut hot.state_mut().dispose_callbacks);
    let data = hot.data();
    for mut callback in disposers {
        run_callback(Phase::Dispose, hot.path(), async { callback(data.clone()).await }).await;
    }
}

/// Await one callback, logging an error or a panic instead of propagating it.
async fn run_callback<F>(phase: Phase, path: &str, callback: F)
where
    F: std::future::Future<Output = CallbackResult>,
{
    match AssertUnwindSafe(callback).catch_unwind().await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            tracing::error!(%phase, path, error = %err, "hot callback failed");
        }
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::error!(%phase, path, error = %message, "hot callback panicked");
        }
    }
}

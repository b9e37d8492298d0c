//! Per-path hot context and the capability handle handed to modules.

use futures::future::{FutureExt, LocalBoxFuture};
use serde_json::{Map, Value};
use std::cell::{Cell, RefCell, RefMut};
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::rc::Rc;

/// Failure returned by a dispose or accept callback.
pub type CallbackError = Box<dyn std::error::Error>;

/// Result of a dispose or accept callback.
pub type CallbackResult = Result<(), CallbackError>;

pub(crate) type DisposeCallback = Box<dyn FnMut(HotData) -> LocalBoxFuture<'static, CallbackResult>>;
pub(crate) type AcceptCallback<M> =
    Box<dyn FnMut(Option<M>) -> LocalBoxFuture<'static, CallbackResult>>;

/// Open key/value map shared by every instance of a module path.
///
/// Cloning yields another handle to the same map; the map lives until the
/// path is pruned.
#[derive(Clone, Default)]
pub struct HotData(Rc<RefCell<Map<String, Value>>>);

impl HotData {
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.0.borrow().get(key).cloned()
    }

    pub fn insert(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.borrow_mut().insert(key.into(), value)
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.0.borrow_mut().remove(key)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.borrow().contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Whether both handles point at the same map.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for HotData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HotData").field(&*self.0.borrow()).finish()
    }
}

/// Callback bag for one module path.
pub(crate) struct HotContext<M> {
    pub(crate) accept_callbacks: Vec<AcceptCallback<M>>,
    pub(crate) dispose_callbacks: Vec<DisposeCallback>,
    pub(crate) self_accepted: bool,
    pub(crate) data: HotData,
    /// Bumped on every re-creation; lets an in-flight update tell whether the
    /// accept callbacks it took are still the current ones.
    pub(crate) generation: u64,
}

impl<M> HotContext<M> {
    fn new() -> Self {
        Self {
            accept_callbacks: Vec::new(),
            dispose_callbacks: Vec::new(),
            self_accepted: false,
            data: HotData::default(),
            generation: 0,
        }
    }
}

/// A sequence requested while another one was running for the same path.
pub(crate) enum Queued<M> {
    Update(Option<M>),
    Prune,
}

struct HotModuleInner<M> {
    path: String,
    state: RefCell<HotContext<M>>,
    /// Set while an update or prune of this path is running.
    busy: Cell<bool>,
    queued: RefCell<VecDeque<Queued<M>>>,
}

/// Clears the busy flag of a context when dropped.
pub(crate) struct BusyGuard<'a>(&'a Cell<bool>);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// The hot-context capability object a module instance receives.
///
/// Every call to create a context for the same path returns a handle to the
/// same underlying context until the path is pruned.
pub struct HotModule<M> {
    inner: Rc<HotModuleInner<M>>,
}

impl<M> Clone for HotModule<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<M> fmt::Debug for HotModule<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("HotModule")
            .field("path", &self.inner.path)
            .field("accept_callbacks", &state.accept_callbacks.len())
            .field("dispose_callbacks", &state.dispose_callbacks.len())
            .field("self_accepted", &state.self_accepted)
            .field("data", &state.data)
            .finish()
    }
}

impl<M: 'static> HotModule<M> {
    pub(crate) fn new(path: &str) -> Self {
        Self {
            inner: Rc::new(HotModuleInner {
                path: path.to_string(),
                state: RefCell::new(HotContext::new()),
                busy: Cell::new(false),
                queued: RefCell::new(VecDeque::new()),
            }),
        }
    }

    /// Module path this context belongs to.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.inner.path
    }

    /// Register a callback run with the new module instance on every update.
    ///
    /// Registrations accumulate and run in order.
    pub fn accept<F, Fut>(&self, mut callback: F)
    where
        F: FnMut(Option<M>) -> Fut + 'static,
        Fut: Future<Output = CallbackResult> + 'static,
    {
        self.state_mut()
            .accept_callbacks
            .push(Box::new(move |module| callback(module).boxed_local()));
    }

    /// Declare that the module can replace itself wholesale.
    pub fn accept_self(&self) {
        self.state_mut().self_accepted = true;
    }

    /// Register a cleanup callback run with the shared data map before any
    /// accept callback of the next update.
    pub fn dispose<F, Fut>(&self, mut callback: F)
    where
        F: FnMut(HotData) -> Fut + 'static,
        Fut: Future<Output = CallbackResult> + 'static,
    {
        self.state_mut()
            .dispose_callbacks
            .push(Box::new(move |data| callback(data).boxed_local()));
    }

    /// Accepted for API compatibility; prune callbacks are not tracked.
    pub fn prune<F>(&self, _callback: F) {}

    /// Ask for the module to be re-propagated. Only logged.
    pub fn invalidate(&self, message: Option<&str>) {
        tracing::warn!(
            path = %self.inner.path,
            message = message.unwrap_or_default(),
            "hot invalidate() is not supported; a full reload may be needed"
        );
    }

    /// Custom event listener. The transport is not implemented.
    pub fn on<F>(&self, _event: &str, _callback: F) {}

    /// Custom event dispatch. The transport is not implemented.
    pub fn send(&self, _event: &str, _data: Value) {}

    /// Data map persisted across reloads of this path.
    #[must_use]
    pub fn data(&self) -> HotData {
        self.inner.state.borrow().data.clone()
    }

    #[must_use]
    pub fn is_self_accepted(&self) -> bool {
        self.inner.state.borrow().self_accepted
    }

    #[must_use]
    pub fn accept_callback_count(&self) -> usize {
        self.inner.state.borrow().accept_callbacks.len()
    }

    #[must_use]
    pub fn dispose_callback_count(&self) -> usize {
        self.inner.state.borrow().dispose_callbacks.len()
    }

    /// Whether both handles refer to the same context.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// A module instance is being re-evaluated: its previous accept
    /// callbacks are stale. Dispose callbacks, `selfAccepted` and data
    /// survive, so the next update or prune runs the disposers of every
    /// instance registered since the last one.
    pub(crate) fn reset_for_reload(&self) {
        let mut state = self.state_mut();
        state.accept_callbacks.clear();
        state.generation += 1;
    }

    pub(crate) fn state_mut(&self) -> RefMut<'_, HotContext<M>> {
        self.inner.state.borrow_mut()
    }

    /// Mark the context busy. `None` when a sequence is already running.
    pub(crate) fn try_begin(&self) -> Option<BusyGuard<'_>> {
        if self.inner.busy.replace(true) {
            return None;
        }
        Some(BusyGuard(&self.inner.busy))
    }

    pub(crate) fn enqueue(&self, job: Queued<M>) {
        self.inner.queued.borrow_mut().push_back(job);
    }

    pub(crate) fn next_queued(&self) -> Option<Queued<M>> {
        self.inner.queued.borrow_mut().pop_front()
    }

    pub(crate) fn clear_queue(&self) {
        self.inner.queued.borrow_mut().clear();
    }
}

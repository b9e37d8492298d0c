//! HMR engine: applies dev-server events to a module host.
//!
//! The host owns module loading; the engine only sequences it against the
//! hot-context registry.

use super::payload::{HmrEvent, HmrMessage};
use super::HotContextRegistry;
use futures::future::LocalBoxFuture;
use std::fmt::Display;
use std::rc::Rc;

/// The embedding host's module loader.
pub trait ModuleHost {
    /// A loaded module instance, handed to accept callbacks.
    type Module: Clone + 'static;
    type Error: Display;

    /// Drop the cached instance of `path` so the next load re-evaluates it.
    fn invalidate(&self, path: &str);

    /// Load (re-evaluate) `path`.
    fn load<'a>(&'a self, path: &'a str) -> LocalBoxFuture<'a, Result<Self::Module, Self::Error>>;
}

/// What the caller has to do after an event was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HmrOutcome {
    /// Hot update applied; keep running.
    Continue,
    /// The change could not be applied in place; restart the application.
    FullReload,
}

/// Sequences HMR events against a host and a registry.
pub struct HmrEngine<H: ModuleHost> {
    host: H,
    registry: Rc<HotContextRegistry<H::Module>>,
}

impl<H: ModuleHost> HmrEngine<H> {
    /// Create an engine over `host` with a registry shared with the modules
    /// it loads.
    pub fn new(host: H, registry: Rc<HotContextRegistry<H::Module>>) -> Self {
        Self { host, registry }
    }

    /// Handle a decoded wire message.
    pub async fn handle_message(&self, message: HmrMessage) -> HmrOutcome {
        match message.into_event() {
            Some(event) => self.handle_event(event).await,
            None => HmrOutcome::Continue,
        }
    }

    /// Handle one event.
    ///
    /// Updates stop at the first path that fails to load or has no hot
    /// context; the remaining paths are left to the full reload.
    pub async fn handle_event(&self, event: HmrEvent) -> HmrOutcome {
        match event {
            HmrEvent::Update { paths } => {
                for path in &paths {
                    tracing::info!(path = %path, "hot update");
                    self.host.invalidate(path);
                    let module = match self.host.load(path).await {
                        Ok(module) => module,
                        Err(err) => {
                            tracing::error!(path = %path, error = %err, "reloading module failed");
                            return HmrOutcome::FullReload;
                        }
                    };
                    if !self.registry.apply_update(path, Some(module)).await.is_handled() {
                        return HmrOutcome::FullReload;
                    }
                }
                HmrOutcome::Continue
            }
            HmrEvent::Prune { paths } => {
                for path in &paths {
                    self.host.invalidate(path);
                    self.registry.prune_module(path).await;
                }
                HmrOutcome::Continue
            }
            HmrEvent::FullReload => HmrOutcome::FullReload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use futures::FutureExt;
    use std::cell::RefCell;

    /// Host whose modules are version counters; loading a path re-runs its
    /// "module body", which registers an accept callback.
    struct CounterHost {
        registry: Rc<HotContextRegistry<u32>>,
        versions: RefCell<Vec<(String, u32)>>,
        log: Rc<RefCell<Vec<String>>>,
        broken: Option<String>,
    }

    impl CounterHost {
        fn evaluate(&self, path: &str) -> u32 {
            let mut versions = self.versions.borrow_mut();
            let version = match versions.iter_mut().find(|(p, _)| p == path) {
                Some((_, v)) => {
                    *v += 1;
                    *v
                }
                None => {
                    versions.push((path.to_string(), 1));
                    1
                }
            };
            let hot = self.registry.create_hot_context(path);
            let log = self.log.clone();
            let p = path.to_string();
            hot.accept(move |module| {
                log.borrow_mut().push(format!("{p} accepted {module:?}"));
                async { Ok(()) }
            });
            let log = self.log.clone();
            let p = path.to_string();
            hot.dispose(move |_| {
                log.borrow_mut().push(format!("{p} disposed"));
                async { Ok(()) }
            });
            version
        }
    }

    impl ModuleHost for &CounterHost {
        type Module = u32;
        type Error = String;

        fn invalidate(&self, path: &str) {
            self.log.borrow_mut().push(format!("{path} invalidated"));
        }

        fn load<'a>(&'a self, path: &'a str) -> LocalBoxFuture<'a, Result<u32, String>> {
            async move {
                if self.broken.as_deref() == Some(path) {
                    return Err(format!("syntax error in {path}"));
                }
                Ok(self.evaluate(path))
            }
            .boxed_local()
        }
    }

    fn host(broken: Option<&str>) -> CounterHost {
        CounterHost {
            registry: Rc::new(HotContextRegistry::new()),
            versions: RefCell::default(),
            log: Rc::default(),
            broken: broken.map(str::to_string),
        }
    }

    #[test]
    fn test_update_reloads_and_accepts() {
        let host = host(None);
        host.evaluate("/src/a.ts");
        host.log.borrow_mut().clear();

        let engine = HmrEngine::new(&host, host.registry.clone());
        let outcome = block_on(engine.handle_event(HmrEvent::Update {
            paths: vec!["/src/a.ts".to_string()],
        }));

        assert_eq!(outcome, HmrOutcome::Continue);
        assert_eq!(
            *host.log.borrow(),
            vec![
                "/src/a.ts invalidated",
                // Both the replaced instance's disposer and the reloaded one's.
                "/src/a.ts disposed",
                "/src/a.ts disposed",
                "/src/a.ts accepted Some(2)",
            ]
        );
    }

    #[test]
    fn test_update_of_untracked_module_needs_full_reload() {
        let host = host(None);
        let registry = Rc::new(HotContextRegistry::new());
        let engine = HmrEngine::new(&host, registry);
        let outcome = block_on(engine.handle_event(HmrEvent::Update {
            paths: vec!["/src/a.ts".to_string()],
        }));
        assert_eq!(outcome, HmrOutcome::FullReload);
    }

    #[test]
    fn test_load_failure_needs_full_reload() {
        let host = host(Some("/src/bad.ts"));
        let engine = HmrEngine::new(&host, host.registry.clone());
        let outcome = block_on(engine.handle_event(HmrEvent::Update {
            paths: vec!["/src/bad.ts".to_string()],
        }));
        assert_eq!(outcome, HmrOutcome::FullReload);
    }

    #[test]
    fn test_prune_disposes_and_forgets() {
        let host = host(None);
        host.evaluate("/src/a.ts");
        host.evaluate("/src/b.ts");
        let engine = HmrEngine::new(&host, host.registry.clone());

        let outcome = block_on(engine.handle_message(HmrMessage::Prune {
            paths: vec!["/src/a.ts".to_string()],
        }));
        assert_eq!(outcome, HmrOutcome::Continue);
        assert_eq!(host.registry.list_active_paths(), vec!["/src/b.ts"]);
        assert!(host.log.borrow().contains(&"/src/a.ts disposed".to_string()));
    }

    #[test]
    fn test_informational_message_continues() {
        let host = host(None);
        let engine = HmrEngine::new(&host, host.registry.clone());
        assert_eq!(
            block_on(engine.handle_message(HmrMessage::Ping)),
            HmrOutcome::Continue
        );
        assert_eq!(
            block_on(engine.handle_event(HmrEvent::FullReload)),
            HmrOutcome::FullReload
        );
    }
}

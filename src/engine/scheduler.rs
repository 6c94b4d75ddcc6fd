//! Lazy-Load Scheduler - when each component's behavior script loads.
//!
//! | strategy      | during scan                         | later                          |
//! |---------------|-------------------------------------|--------------------------------|
//! | `eager`       | load                                |                                |
//! | `interaction` | nothing                             | dispatch buffers and loads     |
//! | `visible`     | observe with the viewport watcher   | first intersection loads       |
//! | `idle`        | queue on the idle primitive         | idle callback loads            |
//!
//! Every deferred load re-checks the registry first: a component that got
//! registered in the meantime is never loaded again. Scanning also activates
//! instances for component elements whose behavior is already registered.

use tracing::{debug, trace, warn};

use super::runtime::RuntimeInner;
use crate::dom::{Dom, NodeRef};
use crate::error::LoadError;
use crate::host::Task;
use crate::types::LoadStrategy;

/// A load waiting on visibility or idle time.
pub(super) struct DeferredLoad {
    pub(super) component: String,
    pub(super) src: String,
    pub(super) strategy: LoadStrategy,
}

impl<D: Dom> RuntimeInner<D> {
    /// Scan `root` and its descendants.
    pub(super) fn scan(&self, root: &D::Node) {
        let attrs = &self.config.attributes;
        let mut nodes = vec![root.clone()];
        nodes.extend(self.dom.descendants(root));

        for node in nodes {
            let Some(name) = self.dom.attribute(&node, &attrs.component) else {
                continue;
            };
            if let Some(definition) = self.registry.get(&name) {
                self.activate_with(&node, &definition);
                continue;
            }
            let Some(src) = self.dom.attribute(&node, &attrs.source) else {
                continue;
            };

            match self.strategy_of(&node, &name) {
                LoadStrategy::Eager => self.load_component(&name, &src),
                LoadStrategy::Interaction => {
                    trace!(component = %name, "waiting for first interaction");
                }
                LoadStrategy::Visible => self.defer_load(&node, name, src, LoadStrategy::Visible),
                LoadStrategy::Idle => self.defer_load(&node, name, src, LoadStrategy::Idle),
            }
        }
    }

    fn strategy_of(&self, node: &D::Node, name: &str) -> LoadStrategy {
        let Some(raw) = self.dom.attribute(node, &self.config.attributes.strategy) else {
            return LoadStrategy::Eager;
        };
        LoadStrategy::parse(&raw).unwrap_or_else(|| {
            warn!(component = %name, strategy = %raw, "unknown load strategy; loading eagerly");
            LoadStrategy::Eager
        })
    }

    fn defer_load(&self, node: &D::Node, component: String, src: String, strategy: LoadStrategy) {
        if self.deferred.borrow().contains(node) {
            return;
        }
        debug!(component = %component, strategy = strategy.as_str(), "deferring load");
        self.deferred.borrow_mut().insert(
            node,
            DeferredLoad {
                component,
                src,
                strategy,
            },
        );

        match strategy {
            LoadStrategy::Visible => self.viewport.observe(node),
            _ => {
                let runtime = self.this.clone();
                let element = node.downgrade();
                let task: Task = Box::new(move || {
                    let Some(runtime) = runtime.upgrade() else {
                        return;
                    };
                    if let Some(node) = <D::Node as NodeRef>::upgrade(&element) {
                        runtime.run_deferred(&node, LoadStrategy::Idle);
                    }
                });
                if let Err(task) = self.idle.request_idle(task) {
                    trace!("idle scheduling unavailable; deferring instead");
                    self.idle.defer(task);
                }
            }
        }
    }

    /// The viewport watcher saw `node` for the first time.
    pub(super) fn notify_visible(&self, node: &D::Node) {
        self.run_deferred(node, LoadStrategy::Visible);
    }

    fn run_deferred(&self, node: &D::Node, strategy: LoadStrategy) {
        let matches = self
            .deferred
            .borrow()
            .get(node)
            .is_some_and(|pending| pending.strategy == strategy);
        if !matches {
            return;
        }
        let Some(pending) = self.deferred.borrow_mut().remove(node) else {
            return;
        };
        if strategy == LoadStrategy::Visible {
            self.viewport.unobserve(node);
        }

        if self.registry.contains(&pending.component) {
            trace!(component = %pending.component, "already registered; skipping load");
            return;
        }
        self.load_component(&pending.component, &pending.src);
    }

    /// Load `src` for `component`; replay its buffered interactions once the
    /// script has run.
    pub(super) fn load_component(&self, component: &str, src: &str) {
        debug!(component, src, "loading component script");
        let runtime = self.this.clone();
        let component = component.to_string();

        self.loader.load(
            src,
            Box::new(move |result: Result<(), LoadError>| {
                let Some(runtime) = runtime.upgrade() else {
                    return;
                };
                match result {
                    Ok(()) => runtime.replay(&component),
                    Err(err) => warn!(
                        component = %component,
                        buffered = runtime.buffered_count(&component),
                        error = %err,
                        "component script failed; interactions stay buffered"
                    ),
                }
            }),
        );
    }
}

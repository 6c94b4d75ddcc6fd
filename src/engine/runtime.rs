//! Runtime - the owned context tying the engine together.
//!
//! There is no global state: every registry, instance table, template table
//! and event queue lives in a [`Runtime`], created per host document. Clones
//! share the same runtime.
//!
//! ```ignore
//! let dom = Rc::new(MemoryDom::parse(markup)?);
//! let runtime = Runtime::builder(dom.clone())
//!     .scripts(scripts.clone())
//!     .build();
//! runtime.start();
//! ```

use std::cell::{Ref, RefCell};
use std::collections::HashSet;
use std::rc::{Rc, Weak};

use serde_json::Value;
use spark_signals::{ReactiveSet, Signal};
use tracing::debug;

use super::dispatch::{DispatchOutcome, EventQueue};
use super::instance::{ComponentInstance, InstanceHandle};
use super::loader::ScriptLoader;
use super::registry::{ComponentDefinition, ComponentRegistry};
use super::scheduler::DeferredLoad;
use crate::bindings::conditional::Markers;
use crate::bindings::list::Templates;
use crate::config::RuntimeConfig;
use crate::dom::{Dom, ElementTable};
use crate::host::{IdleScheduler, ManualIdle, ManualScripts, ManualViewport, ScriptInjector, Viewport};
use crate::types::{Interaction, LoadStatus, State};

// =============================================================================
// Inner state
// =============================================================================

pub(crate) struct RuntimeInner<D: Dom> {
    pub(super) this: Weak<RuntimeInner<D>>,
    pub(super) dom: Rc<D>,
    pub(super) config: RuntimeConfig,
    pub(super) registry: ComponentRegistry<D>,
    pub(super) instances: RefCell<ElementTable<D::Node, ComponentInstance<D>>>,
    pub(super) templates: RefCell<Templates<D::Node>>,
    pub(super) markers: RefCell<Markers<D::Node>>,
    pub(super) buffered: RefCell<EventQueue<D::Node>>,
    pub(super) loader: ScriptLoader,
    pub(super) viewport: Rc<dyn Viewport<D::Node>>,
    pub(super) idle: Rc<dyn IdleScheduler>,
    pub(super) deferred: RefCell<ElementTable<D::Node, DeferredLoad>>,
    subscriptions: RefCell<HashSet<String>>,
}

impl<D: Dom> RuntimeInner<D> {
    /// Install the document listener for `event_type` unless one exists.
    fn subscribe(&self, event_type: &str) {
        if !self.subscriptions.borrow_mut().insert(event_type.to_string()) {
            return;
        }
        debug!(event_type, "subscribing");
        let runtime = self.this.clone();
        self.dom.listen(
            event_type,
            Rc::new(move |interaction: &Interaction<D::Node>| {
                if let Some(runtime) = runtime.upgrade() {
                    runtime.dispatch(interaction);
                }
            }),
        );
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Configures host collaborators. Anything not supplied falls back to the
/// queue-backed [`manual`](crate::host::manual) adapters.
pub struct RuntimeBuilder<D: Dom> {
    dom: Rc<D>,
    config: RuntimeConfig,
    scripts: Option<Rc<dyn ScriptInjector>>,
    viewport: Option<Rc<dyn Viewport<D::Node>>>,
    idle: Option<Rc<dyn IdleScheduler>>,
}

impl<D: Dom> RuntimeBuilder<D> {
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn scripts(mut self, scripts: Rc<dyn ScriptInjector>) -> Self {
        self.scripts = Some(scripts);
        self
    }

    pub fn viewport(mut self, viewport: Rc<dyn Viewport<D::Node>>) -> Self {
        self.viewport = Some(viewport);
        self
    }

    pub fn idle(mut self, idle: Rc<dyn IdleScheduler>) -> Self {
        self.idle = Some(idle);
        self
    }

    pub fn build(self) -> Runtime<D> {
        let scripts = self
            .scripts
            .unwrap_or_else(|| Rc::new(ManualScripts::new()) as Rc<dyn ScriptInjector>);
        let viewport = self
            .viewport
            .unwrap_or_else(|| Rc::new(ManualViewport::new()) as Rc<dyn Viewport<D::Node>>);
        let idle = self
            .idle
            .unwrap_or_else(|| Rc::new(ManualIdle::new()) as Rc<dyn IdleScheduler>);

        let inner = Rc::new_cyclic(|this| RuntimeInner {
            this: this.clone(),
            dom: self.dom,
            config: self.config,
            registry: ComponentRegistry::new(),
            instances: RefCell::new(ElementTable::new()),
            templates: RefCell::new(Templates::new()),
            markers: RefCell::new(Markers::new()),
            buffered: RefCell::new(EventQueue::new()),
            loader: ScriptLoader::new(scripts),
            viewport,
            idle,
            deferred: RefCell::new(ElementTable::new()),
            subscriptions: RefCell::new(HashSet::new()),
        });
        Runtime { inner }
    }
}

// =============================================================================
// Runtime
// =============================================================================

/// On-demand activation runtime for one host document.
pub struct Runtime<D: Dom> {
    inner: Rc<RuntimeInner<D>>,
}

impl<D: Dom> Clone for Runtime<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<D: Dom> Runtime<D> {
    /// Runtime with the default configuration and manual host adapters.
    pub fn new(dom: Rc<D>) -> Self {
        Self::builder(dom).build()
    }

    pub fn builder(dom: Rc<D>) -> RuntimeBuilder<D> {
        RuntimeBuilder {
            dom,
            config: RuntimeConfig::default(),
            scripts: None,
            viewport: None,
            idle: None,
        }
    }

    /// Subscribe the configured default event types and scan the document.
    pub fn start(&self) {
        for event_type in &self.inner.config.default_events {
            self.inner.subscribe(event_type);
        }
        self.scan(None);
    }

    /// Register (or replace) the behavior for `name`.
    ///
    /// Subscribes every event type the definition handles and activates
    /// every element already in the document that carries the name.
    pub fn register(&self, name: &str, definition: ComponentDefinition<D>) {
        let definition = Rc::new(definition);
        let replaced = self.inner.registry.register(name, Rc::clone(&definition));
        debug!(component = name, replaced, "registered component");

        for event_type in definition.event_types() {
            self.inner.subscribe(&event_type);
        }

        let dom = &self.inner.dom;
        let attrs = &self.inner.config.attributes;
        let elements: Vec<D::Node> = dom
            .descendants(&dom.root())
            .into_iter()
            .filter(|node| dom.attribute(node, &attrs.component).as_deref() == Some(name))
            .collect();
        for element in elements {
            self.inner.activate_with(&element, &definition);
        }
    }

    /// Scan `root` (the whole document when `None`) for component elements.
    /// Safe to repeat, e.g. after inserting markup.
    pub fn scan(&self, root: Option<&D::Node>) {
        let root = root.cloned().unwrap_or_else(|| self.inner.dom.root());
        self.inner.scan(&root);
    }

    /// Route an interaction the way the document listeners do.
    pub fn dispatch(&self, interaction: &Interaction<D::Node>) -> DispatchOutcome {
        self.inner.dispatch(interaction)
    }

    /// Activate `element` with its registered definition. Returns whether an
    /// instance exists afterwards.
    pub fn activate(&self, element: &D::Node) -> bool {
        let attrs = &self.inner.config.attributes;
        let Some(name) = self.inner.dom.attribute(element, &attrs.component) else {
            return false;
        };
        if let Some(definition) = self.inner.registry.get(&name) {
            self.inner.activate_with(element, &definition);
        }
        self.has_instance(element)
    }

    /// Shallow-merge `partial` into `element`'s state. No-op without an
    /// instance.
    pub fn patch(&self, element: &D::Node, partial: Value) {
        self.inner.patch(element, partial);
    }

    /// Run `destroy` and forget the instance. Call before detaching
    /// `element`.
    pub fn teardown(&self, element: &D::Node) {
        self.inner.teardown(element);
    }

    pub fn state(&self, element: &D::Node) -> Option<State> {
        self.inner.state_of(element)
    }

    /// State as it was before the most recent patch.
    pub fn previous_state(&self, element: &D::Node) -> Option<State> {
        self.inner.previous_state_of(element)
    }

    pub fn instance(&self, element: &D::Node) -> Option<InstanceHandle<D>> {
        self.has_instance(element)
            .then(|| InstanceHandle::new(Rc::downgrade(&self.inner), element.clone()))
    }

    pub fn has_instance(&self, element: &D::Node) -> bool {
        self.inner.instances.borrow().contains(element)
    }

    pub fn instance_count(&self) -> usize {
        self.inner.instances.borrow().len()
    }

    /// Called by the host's intersection watcher for observed elements.
    pub fn notify_visible(&self, element: &D::Node) {
        self.inner.notify_visible(element);
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.inner.registry.contains(name)
    }

    /// Registered component names, reactive. Drop the guard before calling
    /// `register`.
    pub fn registered_names(&self) -> Ref<'_, ReactiveSet<String>> {
        self.inner.registry.names()
    }

    /// Interactions waiting for `name`'s script.
    pub fn buffered_count(&self, name: &str) -> usize {
        self.inner.buffered_count(name)
    }

    pub fn load_status(&self, src: &str) -> LoadStatus {
        self.inner.loader.status(src)
    }

    pub fn load_status_signal(&self, src: &str) -> Signal<LoadStatus> {
        self.inner.loader.status_signal(src)
    }

    /// Event types with an installed document listener, sorted.
    pub fn subscribed_events(&self) -> Vec<String> {
        let mut events: Vec<String> = self.inner.subscriptions.borrow().iter().cloned().collect();
        events.sort();
        events
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    pub fn dom(&self) -> &Rc<D> {
        &self.inner.dom
    }
}

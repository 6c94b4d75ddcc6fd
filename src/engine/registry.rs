//! Component Registry - component name → behavior definition.
//!
//! The registry is the source of truth for "has this component's behavior
//! loaded yet". Entries are only ever added or replaced, never removed.
//!
//! Registered names are also kept in a `ReactiveSet`, so deriveds that read
//! it react when a component finishes loading.

use std::cell::{Ref, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value;
use spark_signals::ReactiveSet;
use tracing::warn;

use super::instance::InstanceHandle;
use crate::bindings::BindingKinds;
use crate::dom::Dom;
use crate::types::{Interaction, State};

// =============================================================================
// Handlers
// =============================================================================

/// Everything an action handler gets to see.
pub struct ActionContext<'a, D: Dom> {
    /// The interaction being handled.
    pub interaction: &'a Interaction<D::Node>,
    /// Element carrying the action marker.
    pub action_element: &'a D::Node,
    /// Root element of the component that owns the handler.
    pub component_element: &'a D::Node,
    /// Action name as written in markup.
    pub action: &'a str,
    /// Live instance state. `None` when the definition declares no state.
    pub instance: Option<&'a InstanceHandle<D>>,
}

impl<D: Dom> ActionContext<'_, D> {
    /// Patch the instance state. No-op for stateless components.
    pub fn set_state(&self, partial: Value) {
        if let Some(instance) = self.instance {
            instance.set_state(partial);
        }
    }

    /// Read one state key.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.instance.and_then(|instance| instance.get(key))
    }
}

/// Action handler.
pub type ActionHandler<D> = Rc<dyn Fn(&ActionContext<'_, D>)>;

/// `init` and `destroy` callback: element and current state.
pub type LifecycleHook<D> = Rc<dyn Fn(&<D as Dom>::Node, &State)>;

/// `update` callback: element, new state, state before the patch.
pub type UpdateHook<D> = Rc<dyn Fn(&<D as Dom>::Node, &State, &State)>;

// =============================================================================
// Definition
// =============================================================================

/// A component's behavior: initial state, action handlers and lifecycle
/// callbacks. Immutable once registered.
///
/// ```ignore
/// let counter = ComponentDefinition::new()
///     .state(json!({ "count": 0 }))
///     .action("increment", "click", |ctx| {
///         let count = ctx.get("count").and_then(|v| v.as_i64()).unwrap_or(0);
///         ctx.set_state(json!({ "count": count + 1 }));
///     });
/// runtime.register("counter", counter);
/// ```
pub struct ComponentDefinition<D: Dom> {
    initial_state: Option<State>,
    actions: HashMap<String, HashMap<String, ActionHandler<D>>>,
    bindings: BindingKinds,
    init: Option<LifecycleHook<D>>,
    update: Option<UpdateHook<D>>,
    destroy: Option<LifecycleHook<D>>,
}

impl<D: Dom> Default for ComponentDefinition<D> {
    fn default() -> Self {
        Self {
            initial_state: None,
            actions: HashMap::new(),
            bindings: BindingKinds::all(),
            init: None,
            update: None,
            destroy: None,
        }
    }
}

impl<D: Dom> ComponentDefinition<D> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare initial state. Only objects are accepted; anything else is
    /// logged and ignored.
    pub fn state(mut self, initial: Value) -> Self {
        match initial {
            Value::Object(map) => self.initial_state = Some(map),
            other => warn!(value = %other, "initial state must be an object; ignored"),
        }
        self
    }

    /// Handle `action` for interactions of `event_type`.
    pub fn action(
        mut self,
        action: impl Into<String>,
        event_type: impl Into<String>,
        handler: impl Fn(&ActionContext<'_, D>) + 'static,
    ) -> Self {
        self.actions
            .entry(action.into())
            .or_default()
            .insert(event_type.into(), Rc::new(handler));
        self
    }

    /// Restrict which binding kinds this component hydrates and renders.
    pub fn bindings(mut self, kinds: BindingKinds) -> Self {
        self.bindings = kinds;
        self
    }

    pub fn on_init(mut self, hook: impl Fn(&D::Node, &State) + 'static) -> Self {
        self.init = Some(Rc::new(hook));
        self
    }

    pub fn on_update(mut self, hook: impl Fn(&D::Node, &State, &State) + 'static) -> Self {
        self.update = Some(Rc::new(hook));
        self
    }

    pub fn on_destroy(mut self, hook: impl Fn(&D::Node, &State) + 'static) -> Self {
        self.destroy = Some(Rc::new(hook));
        self
    }

    pub fn initial_state(&self) -> Option<&State> {
        self.initial_state.as_ref()
    }

    pub fn has_state(&self) -> bool {
        self.initial_state.is_some()
    }

    pub fn binding_kinds(&self) -> BindingKinds {
        self.bindings
    }

    pub fn handler(&self, action: &str, event_type: &str) -> Option<ActionHandler<D>> {
        self.actions.get(action)?.get(event_type).cloned()
    }

    /// Every event type some action listens for.
    pub fn event_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self
            .actions
            .values()
            .flat_map(|by_event| by_event.keys().cloned())
            .collect();
        types.sort();
        types.dedup();
        types
    }

    pub fn init_hook(&self) -> Option<LifecycleHook<D>> {
        self.init.clone()
    }

    pub fn update_hook(&self) -> Option<UpdateHook<D>> {
        self.update.clone()
    }

    pub fn destroy_hook(&self) -> Option<LifecycleHook<D>> {
        self.destroy.clone()
    }
}

// =============================================================================
// Registry
// =============================================================================

pub struct ComponentRegistry<D: Dom> {
    definitions: RefCell<HashMap<String, Rc<ComponentDefinition<D>>>>,
    names: RefCell<ReactiveSet<String>>,
}

impl<D: Dom> Default for ComponentRegistry<D> {
    fn default() -> Self {
        Self {
            definitions: RefCell::new(HashMap::new()),
            names: RefCell::new(ReactiveSet::new()),
        }
    }
}

impl<D: Dom> ComponentRegistry<D> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace `name`. Returns true when an earlier definition was
    /// replaced.
    pub fn register(&self, name: &str, definition: Rc<ComponentDefinition<D>>) -> bool {
        let replaced = self
            .definitions
            .borrow_mut()
            .insert(name.to_string(), definition)
            .is_some();
        if !replaced {
            self.names.borrow_mut().insert(name.to_string());
        }
        replaced
    }

    pub fn get(&self, name: &str) -> Option<Rc<ComponentDefinition<D>>> {
        self.definitions.borrow().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.definitions.borrow().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.definitions.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered names as a reactive set. Release the borrow before
    /// registering again.
    pub fn names(&self) -> Ref<'_, ReactiveSet<String>> {
        self.names.borrow()
    }
}

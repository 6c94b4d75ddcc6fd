//! Instance State Store - per-element component state.
//!
//! # Lifecycle
//!
//! - `activate`: deep-clone the initial state, hydrate it from markup, render
//!   every key once, then call `init`. Idempotent.
//! - `patch`: snapshot the previous state, shallow-merge, render the keys
//!   whose value actually changed, then call `update` (always).
//! - `teardown`: call `destroy`, then discard the instance.
//!
//! No instance-table borrow is held while user callbacks or renders run, so
//! `init`, `update`, `destroy` and host mutation callbacks may call back into
//! the runtime.

use std::rc::{Rc, Weak};

use serde_json::Value;
use tracing::{debug, trace};

use super::registry::ComponentDefinition;
use super::runtime::RuntimeInner;
use crate::bindings::{conditional, list, text, BindingKinds, ConditionalBinding};
use crate::dom::Dom;
use crate::types::State;

/// State of one activated component element.
pub struct ComponentInstance<D: Dom> {
    pub(super) definition: Rc<ComponentDefinition<D>>,
    pub(super) state: State,
    pub(super) previous_state: State,
    pub(super) conditionals: Vec<ConditionalBinding<D::Node>>,
}

/// Handle to one instance's state, handed to action handlers.
///
/// Holds the runtime weakly: a handle kept past the runtime's lifetime reads
/// as empty and ignores patches.
pub struct InstanceHandle<D: Dom> {
    runtime: Weak<RuntimeInner<D>>,
    element: D::Node,
}

impl<D: Dom> Clone for InstanceHandle<D> {
    fn clone(&self) -> Self {
        Self {
            runtime: self.runtime.clone(),
            element: self.element.clone(),
        }
    }
}

impl<D: Dom> InstanceHandle<D> {
    pub(super) fn new(runtime: Weak<RuntimeInner<D>>, element: D::Node) -> Self {
        Self { runtime, element }
    }

    /// The component element this handle belongs to.
    pub fn element(&self) -> &D::Node {
        &self.element
    }

    /// Snapshot of the current state. Empty once the instance is gone.
    pub fn state(&self) -> State {
        self.runtime
            .upgrade()
            .and_then(|runtime| runtime.state_of(&self.element))
            .unwrap_or_default()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.state().remove(key)
    }

    /// Shallow-merge `partial` (an object) into the state and re-render.
    pub fn set_state(&self, partial: Value) {
        if let Some(runtime) = self.runtime.upgrade() {
            runtime.patch(&self.element, partial);
        }
    }
}

impl<D: Dom> RuntimeInner<D> {
    /// Create the instance for `element` unless it exists or `definition`
    /// declares no state.
    pub(super) fn activate_with(&self, element: &D::Node, definition: &Rc<ComponentDefinition<D>>) {
        if self.instances.borrow().contains(element) {
            return;
        }
        let Some(initial) = definition.initial_state() else {
            return;
        };

        let kinds = definition.binding_kinds();
        let attrs = &self.config.attributes;
        let dom = &*self.dom;

        let mut state = initial.clone();
        if kinds.contains(BindingKinds::TEXT) {
            text::hydrate(dom, attrs, element, &mut state);
        }
        if kinds.contains(BindingKinds::LIST) {
            list::hydrate(dom, attrs, element, &mut state, &mut self.templates.borrow_mut());
        }
        let mut conditionals = if kinds.contains(BindingKinds::CONDITIONAL) {
            conditional::hydrate(dom, attrs, element, &mut state, &mut self.markers.borrow_mut())
        } else {
            Vec::new()
        };

        let keys: Vec<String> = state.keys().cloned().collect();
        self.render(element, kinds, &state, &mut conditionals, &keys);

        self.instances.borrow_mut().insert(
            element,
            ComponentInstance {
                definition: Rc::clone(definition),
                state: state.clone(),
                previous_state: State::new(),
                conditionals,
            },
        );
        debug!(element = ?element, keys = keys.len(), "activated instance");

        if let Some(init) = definition.init_hook() {
            init(element, &state);
        }
    }

    /// Shallow-merge `partial` into the instance state.
    pub(super) fn patch(&self, element: &D::Node, partial: Value) {
        let Value::Object(partial) = partial else {
            debug!(element = ?element, "ignoring non-object patch");
            return;
        };

        let (definition, state, previous, changed, mut conditionals) = {
            let mut instances = self.instances.borrow_mut();
            let Some(instance) = instances.get_mut(element) else {
                return;
            };

            instance.previous_state = instance.state.clone();
            let mut changed = Vec::new();
            for (key, value) in partial {
                if instance.state.get(&key) != Some(&value) {
                    changed.push(key.clone());
                }
                instance.state.insert(key, value);
            }

            // Rendered from a copy; only the changed keys are written back.
            let conditionals = if changed.is_empty() {
                Vec::new()
            } else {
                instance.conditionals.clone()
            };
            (
                Rc::clone(&instance.definition),
                instance.state.clone(),
                instance.previous_state.clone(),
                changed,
                conditionals,
            )
        };

        if !changed.is_empty() {
            trace!(element = ?element, changed = ?changed, "rendering patch");
            self.render(
                element,
                definition.binding_kinds(),
                &state,
                &mut conditionals,
                &changed,
            );
            if let Some(instance) = self.instances.borrow_mut().get_mut(element) {
                for (binding, rendered) in instance.conditionals.iter_mut().zip(&conditionals) {
                    if changed.contains(&binding.key) {
                        binding.inserted = rendered.inserted;
                    }
                }
            }
        }

        if let Some(update) = definition.update_hook() {
            update(element, &state, &previous);
        }
    }

    /// Run `destroy` and drop the instance.
    pub(super) fn teardown(&self, element: &D::Node) {
        let snapshot = self
            .instances
            .borrow()
            .get(element)
            .map(|instance| (Rc::clone(&instance.definition), instance.state.clone()));
        let Some((definition, state)) = snapshot else {
            return;
        };

        if let Some(destroy) = definition.destroy_hook() {
            destroy(element, &state);
        }
        self.instances.borrow_mut().remove(element);
        debug!(element = ?element, "tore down instance");
    }

    pub(super) fn state_of(&self, element: &D::Node) -> Option<State> {
        self.instances
            .borrow()
            .get(element)
            .map(|instance| instance.state.clone())
    }

    pub(super) fn previous_state_of(&self, element: &D::Node) -> Option<State> {
        self.instances
            .borrow()
            .get(element)
            .map(|instance| instance.previous_state.clone())
    }

    fn render(
        &self,
        element: &D::Node,
        kinds: BindingKinds,
        state: &State,
        conditionals: &mut [ConditionalBinding<D::Node>],
        keys: &[String],
    ) {
        let attrs = &self.config.attributes;
        let dom = &*self.dom;

        if kinds.contains(BindingKinds::TEXT) {
            text::render(dom, attrs, element, state, keys);
        }
        if kinds.contains(BindingKinds::LIST) {
            list::render(dom, attrs, element, state, keys, &self.templates.borrow());
        }
        if kinds.contains(BindingKinds::CONDITIONAL) {
            conditional::render(dom, conditionals, state, keys);
        }
    }
}

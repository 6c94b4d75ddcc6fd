//! Dispatch Engine - resolve an interaction to at most one handler.
//!
//! # Resolution
//!
//! ```text
//! outer walk: target → ... → document, stopping at action-marked elements
//!   inner walk: action element → ... → document, stopping at components
//!     registered + handler for (action, event)  → invoke, stop everything
//!     unregistered + src + interaction strategy → buffer, load, stop
//!       (script already executed → keep walking, as replay would)
//!     otherwise                                 → keep walking (bubbling)
//!   inner walk exhausted → continue the outer walk
//! outer walk exhausted → drop
//! ```
//!
//! Buffered interactions are replayed in arrival order once their component's
//! script has loaded. Replay re-enters the inner walk at the buffered
//! component element and never buffers again.

use std::collections::VecDeque;
use std::rc::Rc;

use tracing::{debug, trace};

use super::instance::InstanceHandle;
use super::registry::{ActionContext, ActionHandler, ComponentDefinition};
use super::runtime::RuntimeInner;
use crate::dom::Dom;
use crate::types::{Interaction, LoadStrategy};

/// An interaction captured before its component's behavior was available.
#[derive(Debug, Clone)]
pub struct BufferedEvent<N> {
    pub interaction: Interaction<N>,
    pub action_element: N,
    pub component_element: N,
    pub component: String,
    pub action: String,
    pub event_type: String,
}

/// What became of a dispatched interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A handler ran.
    Handled,
    /// Queued until the component's script loads. Never reported for a
    /// script that has already executed; such interactions keep bubbling.
    Buffered,
    /// Nothing claimed it.
    Dropped,
}

pub(super) type EventQueue<N> = VecDeque<BufferedEvent<N>>;

impl<D: Dom> RuntimeInner<D> {
    pub(super) fn dispatch(&self, interaction: &Interaction<D::Node>) -> DispatchOutcome {
        let attrs = &self.config.attributes;
        let mut current = Some(interaction.target.clone());

        while let Some(node) = current {
            if let Some(action) = self.dom.attribute(&node, &attrs.action) {
                let outcome = self.resolve(interaction, &node, &action, &node, true);
                if outcome != DispatchOutcome::Dropped {
                    return outcome;
                }
            }
            current = self.dom.parent(&node);
        }

        trace!(event_type = %interaction.event_type, "no handler; dropped");
        DispatchOutcome::Dropped
    }

    /// Inner walk from `start` (inclusive) for `action`.
    fn resolve(
        &self,
        interaction: &Interaction<D::Node>,
        action_element: &D::Node,
        action: &str,
        start: &D::Node,
        allow_buffer: bool,
    ) -> DispatchOutcome {
        let attrs = &self.config.attributes;
        let mut current = Some(start.clone());

        while let Some(node) = current {
            if let Some(name) = self.dom.attribute(&node, &attrs.component) {
                match self.registry.get(&name) {
                    Some(definition) => {
                        if let Some(handler) = definition.handler(action, &interaction.event_type) {
                            self.invoke(&definition, &handler, interaction, action_element, &node, action);
                            return DispatchOutcome::Handled;
                        }
                    }
                    None if allow_buffer => {
                        if let Some(src) = self.interaction_source(&node) {
                            // Already executed without registering: buffering
                            // would replay at once, so keep bubbling instead.
                            if self.loader.is_loaded(&src) {
                                trace!(component = %name, src = %src, "script loaded but component unregistered");
                                current = self.dom.parent(&node);
                                continue;
                            }
                            self.buffer(BufferedEvent {
                                interaction: interaction.clone(),
                                action_element: action_element.clone(),
                                component_element: node.clone(),
                                component: name.clone(),
                                action: action.to_string(),
                                event_type: interaction.event_type.clone(),
                            });
                            self.load_component(&name, &src);
                            return DispatchOutcome::Buffered;
                        }
                    }
                    None => {}
                }
            }
            current = self.dom.parent(&node);
        }

        DispatchOutcome::Dropped
    }

    /// Load source of an interaction-strategy component element.
    fn interaction_source(&self, node: &D::Node) -> Option<String> {
        let attrs = &self.config.attributes;
        let strategy = self.dom.attribute(node, &attrs.strategy)?;
        if LoadStrategy::parse(&strategy) != Some(LoadStrategy::Interaction) {
            return None;
        }
        self.dom.attribute(node, &attrs.source)
    }

    fn invoke(
        &self,
        definition: &Rc<ComponentDefinition<D>>,
        handler: &ActionHandler<D>,
        interaction: &Interaction<D::Node>,
        action_element: &D::Node,
        component_element: &D::Node,
        action: &str,
    ) {
        self.activate_with(component_element, definition);

        let handle = definition
            .has_state()
            .then(|| InstanceHandle::new(self.this.clone(), component_element.clone()));
        let context = ActionContext {
            interaction,
            action_element,
            component_element,
            action,
            instance: handle.as_ref(),
        };

        trace!(action, event_type = %interaction.event_type, "invoking handler");
        handler(&context);
    }

    fn buffer(&self, event: BufferedEvent<D::Node>) {
        debug!(
            component = %event.component,
            action = %event.action,
            event_type = %event.event_type,
            "buffering interaction until script loads"
        );
        self.buffered.borrow_mut().push_back(event);
    }

    /// Replay every interaction buffered for `component`, oldest first.
    pub(super) fn replay(&self, component: &str) {
        let events: Vec<BufferedEvent<D::Node>> = {
            let mut queue = self.buffered.borrow_mut();
            let (mine, rest): (Vec<_>, Vec<_>) =
                queue.drain(..).partition(|event| event.component == component);
            queue.extend(rest);
            mine
        };
        if events.is_empty() {
            return;
        }

        debug!(component, count = events.len(), "replaying buffered interactions");
        for event in events {
            let outcome = self.resolve(
                &event.interaction,
                &event.action_element,
                &event.action,
                &event.component_element,
                false,
            );
            if outcome == DispatchOutcome::Dropped {
                trace!(component, action = %event.action, "replayed interaction found no handler");
            }
        }
    }

    pub(super) fn buffered_count(&self, component: &str) -> usize {
        self.buffered
            .borrow()
            .iter()
            .filter(|event| event.component == component)
            .count()
    }
}

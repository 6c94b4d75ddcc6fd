//! Conditional bindings: `data-if="key"` keeps an element in the tree only
//! while the key is truthy. A leading negation marker (`data-if="!key"`)
//! inverts the test.
//!
//! Two markup forms:
//!
//! ```text
//! <p data-if="open">...</p>                            starts visible
//! <template data-if="open"><p>...</p></template>       starts hidden
//! ```
//!
//! The concrete form gets a marker inserted just before it. The marker is
//! remembered in a runtime-wide [`Markers`] table, so activating the same
//! element again reuses it. The template form uses the wrapper itself as the
//! marker and its first content element as the controlled element. Either way
//! the element always returns to the same position.

use serde_json::Value;
use tracing::debug;

use super::owned_tagged;
use super::value::truthy;
use crate::config::Attributes;
use crate::dom::{Dom, ElementTable};
use crate::types::State;

/// Concrete conditional element → its position marker.
pub type Markers<N> = ElementTable<N, N>;

/// One conditional element of an instance.
#[derive(Debug, Clone)]
pub struct ConditionalBinding<N> {
    /// The element shown or hidden.
    pub element: N,
    /// Stable position; the element is inserted right before it.
    pub marker: N,
    pub key: String,
    pub negated: bool,
    /// Whether `element` is currently in the tree.
    pub inserted: bool,
}

impl<N> ConditionalBinding<N> {
    fn wants_visible(&self, value: &Value) -> bool {
        truthy(value) != self.negated
    }
}

/// Build binding records for every owned conditional element and write the
/// presence it was rendered with into `state`.
pub fn hydrate<D: Dom>(
    dom: &D,
    attrs: &Attributes,
    root: &D::Node,
    state: &mut State,
    markers: &mut Markers<D::Node>,
) -> Vec<ConditionalBinding<D::Node>> {
    // Collected first: inserting markers while walking would shift the walk.
    let candidates = owned_tagged(dom, attrs, root, &attrs.conditional);
    let mut bindings = Vec::with_capacity(candidates.len());

    for (node, raw) in candidates {
        let (negated, key) = attrs.split_negation(&raw);
        let key = key.to_string();

        let binding = if dom.is_template(&node) {
            let Some(element) = dom.template_content(&node) else {
                debug!(key = %key, "conditional template has no content");
                continue;
            };
            ConditionalBinding {
                element,
                marker: node,
                key,
                negated,
                inserted: false,
            }
        } else {
            let existing = markers.get(&node).cloned();
            let marker = match existing {
                Some(marker) => marker,
                None => {
                    let marker = dom.create_marker();
                    dom.insert_before(&marker, &node);
                    markers.insert(&node, marker.clone());
                    marker
                }
            };
            ConditionalBinding {
                element: node,
                marker,
                key,
                negated,
                inserted: true,
            }
        };

        state.insert(binding.key.clone(), Value::Bool(binding.inserted != negated));
        bindings.push(binding);
    }
    bindings
}

/// Insert or remove elements whose key is in `keys`.
pub fn render<D: Dom>(
    dom: &D,
    bindings: &mut [ConditionalBinding<D::Node>],
    state: &State,
    keys: &[String],
) {
    for binding in bindings.iter_mut() {
        if !keys.contains(&binding.key) {
            continue;
        }
        let value = state.get(&binding.key).unwrap_or(&Value::Null);
        let visible = binding.wants_visible(value);

        if visible && !binding.inserted {
            dom.insert_before(&binding.element, &binding.marker);
            binding.inserted = true;
        } else if !visible && binding.inserted {
            dom.remove(&binding.element);
            binding.inserted = false;
        }
    }
}

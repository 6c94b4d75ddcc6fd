//! List-repeat bindings: `data-each="key"` repeats a template per array item.
//!
//! # Template snapshot
//!
//! The first element child of a container is deep-cloned the first time the
//! container is hydrated and kept in a runtime-wide [`ElementTable`]. It is
//! never retaken, so later renders (and later activations of the same
//! element) always clone the original markup, not whatever the list
//! currently shows.
//!
//! # Item shape
//!
//! - Object mode: the template carries a text tag on itself or a descendant.
//!   Each item is a mapping from tag name to text.
//! - Primitive mode: everything else. Each item is the child's text.
//!
//! Rendering clears the container and rebuilds it, one clone per item. There
//! is no keyed reconciliation.

use serde_json::{Map, Value};
use tracing::{debug, trace};

use super::owned_tagged;
use super::value::stringify;
use crate::config::Attributes;
use crate::dom::{Dom, ElementTable};
use crate::types::State;

/// Template snapshots keyed by container.
pub type Templates<N> = ElementTable<N, N>;

/// Capture templates and read each container's children into state.
pub fn hydrate<D: Dom>(
    dom: &D,
    attrs: &Attributes,
    root: &D::Node,
    state: &mut State,
    templates: &mut Templates<D::Node>,
) {
    for (container, key) in owned_tagged(dom, attrs, root, &attrs.list) {
        let children = dom.children(&container);

        if !templates.contains(&container) {
            let Some(first) = children.first() else {
                debug!(key = %key, "list container has no child to use as template");
                continue;
            };
            trace!(key = %key, "captured list template");
            templates.insert(&container, dom.clone_node(first));
        }
        let Some(template) = templates.get(&container) else {
            continue;
        };

        let object_mode = is_tagged_tree(dom, attrs, template);
        let items: Vec<Value> = children
            .iter()
            .map(|child| {
                if object_mode {
                    Value::Object(read_fields(dom, attrs, child))
                } else {
                    Value::String(dom.text(child))
                }
            })
            .collect();
        state.insert(key, Value::Array(items));
    }
}

/// Rebuild every owned container whose key is in `keys`.
pub fn render<D: Dom>(
    dom: &D,
    attrs: &Attributes,
    root: &D::Node,
    state: &State,
    keys: &[String],
    templates: &Templates<D::Node>,
) {
    for (container, key) in owned_tagged(dom, attrs, root, &attrs.list) {
        if !keys.contains(&key) {
            continue;
        }
        let Some(Value::Array(items)) = state.get(&key) else {
            continue;
        };
        let Some(template) = templates.get(&container) else {
            continue;
        };

        dom.clear_children(&container);
        for item in items {
            let clone = dom.clone_node(template);
            match item {
                Value::Object(fields) => write_fields(dom, attrs, &clone, fields),
                other => dom.set_text(&clone, &stringify(other)),
            }
            dom.append_child(&container, &clone);
        }
    }
}

/// `node` followed by its element descendants.
fn subtree<D: Dom>(dom: &D, node: &D::Node) -> Vec<D::Node> {
    let mut nodes = vec![node.clone()];
    nodes.extend(dom.descendants(node));
    nodes
}

fn is_tagged_tree<D: Dom>(dom: &D, attrs: &Attributes, node: &D::Node) -> bool {
    subtree(dom, node)
        .iter()
        .any(|candidate| dom.has_attribute(candidate, &attrs.text))
}

fn read_fields<D: Dom>(dom: &D, attrs: &Attributes, item: &D::Node) -> Map<String, Value> {
    let mut fields = Map::new();
    for node in subtree(dom, item) {
        if let Some(name) = dom.attribute(&node, &attrs.text) {
            fields
                .entry(name)
                .or_insert_with(|| Value::String(dom.text(&node)));
        }
    }
    fields
}

fn write_fields<D: Dom>(dom: &D, attrs: &Attributes, clone: &D::Node, fields: &Map<String, Value>) {
    for node in subtree(dom, clone) {
        let Some(name) = dom.attribute(&node, &attrs.text) else {
            continue;
        };
        if let Some(value) = fields.get(&name) {
            dom.set_text(&node, &stringify(value));
        }
    }
}

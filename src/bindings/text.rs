//! Text bindings: `data-bind="key"` mirrors a state value as element text.

use serde_json::Value;

use super::owned_tagged;
use super::value::{coerce, stringify};
use crate::config::Attributes;
use crate::dom::Dom;
use crate::types::State;

/// Read initial values from markup.
///
/// For each non-array key, the first owned element tagged with it supplies
/// the value, read as the same kind as the declared initial value.
pub fn hydrate<D: Dom>(dom: &D, attrs: &Attributes, root: &D::Node, state: &mut State) {
    let tagged = owned_tagged(dom, attrs, root, &attrs.text);
    for (key, current) in state.iter_mut() {
        if current.is_array() {
            continue;
        }
        if let Some((node, _)) = tagged.iter().find(|(_, tag)| tag == key) {
            *current = coerce(&dom.text(node), current);
        }
    }
}

/// Write `keys` into every owned element tagged with one of them.
pub fn render<D: Dom>(
    dom: &D,
    attrs: &Attributes,
    root: &D::Node,
    state: &State,
    keys: &[String],
) {
    for (node, key) in owned_tagged(dom, attrs, root, &attrs.text) {
        if !keys.contains(&key) {
            continue;
        }
        let value = state.get(&key).unwrap_or(&Value::Null);
        dom.set_text(&node, &stringify(value));
    }
}

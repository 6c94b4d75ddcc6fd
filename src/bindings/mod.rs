//! Binding Engine - markup ⇄ state.
//!
//! Three binding kinds, each with a hydrate phase (markup → state, once at
//! activation) and a render phase (state → markup, on every patch that
//! changes the bound key):
//!
//! - [`text`] - element text mirrors a state value
//! - [`list`] - a container repeats a template once per array item
//! - [`conditional`] - an element is present only while a key is truthy
//!
//! # Ownership
//!
//! A bound element belongs to the component instance whose root is the
//! first component-marked element found walking up from it (inclusive), and
//! only when no list-repeat container lies between the element and that
//! root. Nested components and list items are never touched by the outer
//! instance's text or conditional passes.
//!
//! ```text
//! <div data-component="cart">           root
//!   <b data-bind="total">               owned
//!   <ul data-each="items">              owned (the container itself)
//!     <li data-bind="name">             not owned: inside a list container
//!   <div data-component="badge">        not owned: nested root
//!     <span data-bind="count">          not owned
//! ```

pub mod conditional;
pub mod list;
pub mod text;
pub mod value;

use bitflags::bitflags;

use crate::config::Attributes;
use crate::dom::Dom;

pub use conditional::ConditionalBinding;

bitflags! {
    /// Selects which binding kinds a hydrate or render pass runs.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BindingKinds: u8 {
        const TEXT = 1 << 0;
        const LIST = 1 << 1;
        const CONDITIONAL = 1 << 2;
    }
}

/// Whether `node` belongs to the instance rooted at `root`.
pub fn belongs_to<D: Dom>(dom: &D, attrs: &Attributes, root: &D::Node, node: &D::Node) -> bool {
    let mut current = Some(node.clone());
    let mut is_start = true;
    while let Some(next) = current {
        if next == *root {
            return true;
        }
        if dom.has_attribute(&next, &attrs.component) {
            return false;
        }
        if !is_start && dom.has_attribute(&next, &attrs.list) {
            return false;
        }
        is_start = false;
        current = dom.parent(&next);
    }
    false
}

/// Owned descendants of `root` carrying `attribute`, with its value, in
/// document order.
pub fn owned_tagged<D: Dom>(
    dom: &D,
    attrs: &Attributes,
    root: &D::Node,
    attribute: &str,
) -> Vec<(D::Node, String)> {
    dom.descendants(root)
        .into_iter()
        .filter_map(|node| {
            let value = dom.attribute(&node, attribute)?;
            belongs_to(dom, attrs, root, &node).then_some((node, value))
        })
        .collect()
}

//! Node-tree adapter.
//!
//! The engine never names a concrete tree type. Everything it needs from the
//! host document goes through [`Dom`]:
//!
//! - Traversal: parent lookup, element children, descendants
//! - Reads: attributes, text content
//! - Writes: text, insertion before a reference node, append, removal
//! - Inert template content and position markers for conditional bindings
//! - One capture-phase subscription per event type ([`Dom::listen`])
//!
//! [`MemoryDom`] is the in-memory implementation used for headless runs and
//! tests. Per-element bookkeeping lives in [`ElementTable`], which holds weak
//! node references only.

mod markup;
mod memory;
mod table;

use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

use crate::types::Interaction;

pub use memory::{MemoryDom, MemoryNode, WeakMemoryNode};
pub use table::ElementTable;

/// A cheap, clonable handle to a tree node.
///
/// Equality is node identity, not structural equality.
pub trait NodeRef: Clone + Eq + Hash + fmt::Debug + 'static {
    /// Non-owning form of the handle.
    type Weak: Clone + 'static;

    fn downgrade(&self) -> Self::Weak;

    fn upgrade(weak: &Self::Weak) -> Option<Self>;

    /// Identity key, stable for as long as the node is alive.
    fn identity(&self) -> usize;
}

/// Capture-phase listener installed on the document for one event type.
pub type Listener<N> = Rc<dyn Fn(&Interaction<N>)>;

/// Host document interface.
///
/// All methods take `&self`: hosts are expected to use interior mutability,
/// the same way a browser document is shared by everything on the page.
pub trait Dom: 'static {
    type Node: NodeRef;

    /// Document root. Ancestor walks end here.
    fn root(&self) -> Self::Node;

    fn parent(&self, node: &Self::Node) -> Option<Self::Node>;

    /// Element children in document order. Text and marker nodes are skipped.
    fn children(&self, node: &Self::Node) -> Vec<Self::Node>;

    fn attribute(&self, node: &Self::Node, name: &str) -> Option<String>;

    /// Concatenated text of the node and its descendants.
    fn text(&self, node: &Self::Node) -> String;

    /// Replace all children of `node` with a single text node.
    fn set_text(&self, node: &Self::Node, text: &str);

    /// Whether `node` is an inert template wrapper.
    fn is_template(&self, node: &Self::Node) -> bool;

    /// First element of a template wrapper's inert content.
    fn template_content(&self, node: &Self::Node) -> Option<Self::Node>;

    /// Detached deep copy of `node`.
    fn clone_node(&self, node: &Self::Node) -> Self::Node;

    /// Detached, invisible node used to remember a position in the tree.
    fn create_marker(&self) -> Self::Node;

    /// Move `node` so it sits immediately before `reference`.
    fn insert_before(&self, node: &Self::Node, reference: &Self::Node);

    fn append_child(&self, parent: &Self::Node, child: &Self::Node);

    /// Detach `node` from its parent. The node itself stays usable.
    fn remove(&self, node: &Self::Node);

    /// Detach every child, text included.
    fn clear_children(&self, node: &Self::Node);

    /// Install a document-level capture listener for `event_type`.
    fn listen(&self, event_type: &str, listener: Listener<Self::Node>);

    fn has_attribute(&self, node: &Self::Node, name: &str) -> bool {
        self.attribute(node, name).is_some()
    }

    /// Element descendants of `node` in document order, `node` excluded.
    fn descendants(&self, node: &Self::Node) -> Vec<Self::Node> {
        let mut out = Vec::new();
        let mut stack: Vec<Self::Node> = self.children(node).into_iter().rev().collect();
        while let Some(next) = stack.pop() {
            stack.extend(self.children(&next).into_iter().rev());
            out.push(next);
        }
        out
    }
}

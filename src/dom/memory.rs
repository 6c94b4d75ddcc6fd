//! In-memory document.
//!
//! A small `Rc`-based tree that implements [`Dom`]. Children are owned by
//! their parent, parents are weak, so a detached subtree lives exactly as
//! long as something holds a handle to it.
//!
//! Node kinds: document, element, text, marker (an empty comment), and the
//! fragment that holds a `<template>` element's inert content.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};

use super::markup;
use super::{Dom, Listener, NodeRef};
use crate::error::MarkupError;
use crate::types::Interaction;

// =============================================================================
// Nodes
// =============================================================================

enum NodeKind {
    Document,
    Element {
        tag: String,
        attributes: Vec<(String, String)>,
        /// Inert content of a `<template>` element.
        content: Option<MemoryNode>,
    },
    Text(String),
    Marker,
    Fragment,
}

struct NodeData {
    kind: NodeKind,
    parent: Weak<RefCell<NodeData>>,
    children: Vec<MemoryNode>,
}

/// Handle to a node of a [`MemoryDom`].
#[derive(Clone)]
pub struct MemoryNode(Rc<RefCell<NodeData>>);

/// Non-owning handle to a [`MemoryNode`].
#[derive(Clone)]
pub struct WeakMemoryNode(Weak<RefCell<NodeData>>);

impl MemoryNode {
    fn new(kind: NodeKind) -> Self {
        Self(Rc::new(RefCell::new(NodeData {
            kind,
            parent: Weak::new(),
            children: Vec::new(),
        })))
    }

    fn parent_node(&self) -> Option<MemoryNode> {
        self.0.borrow().parent.upgrade().map(MemoryNode)
    }

    fn is_element(&self) -> bool {
        matches!(self.0.borrow().kind, NodeKind::Element { .. })
    }

    fn detach(&self) {
        if let Some(parent) = self.parent_node() {
            parent
                .0
                .borrow_mut()
                .children
                .retain(|child| !Rc::ptr_eq(&child.0, &self.0));
        }
        self.0.borrow_mut().parent = Weak::new();
    }

    fn push_child(&self, child: &MemoryNode) {
        if Rc::ptr_eq(&self.0, &child.0) {
            return;
        }
        child.detach();
        child.0.borrow_mut().parent = Rc::downgrade(&self.0);
        self.0.borrow_mut().children.push(child.clone());
    }

    fn take_children(&self) -> Vec<MemoryNode> {
        let children = std::mem::take(&mut self.0.borrow_mut().children);
        for child in &children {
            child.0.borrow_mut().parent = Weak::new();
        }
        children
    }

    fn deep_clone(&self) -> MemoryNode {
        let data = self.0.borrow();
        let kind = match &data.kind {
            NodeKind::Element {
                tag,
                attributes,
                content,
            } => NodeKind::Element {
                tag: tag.clone(),
                attributes: attributes.clone(),
                content: content.as_ref().map(MemoryNode::deep_clone),
            },
            NodeKind::Text(text) => NodeKind::Text(text.clone()),
            NodeKind::Marker => NodeKind::Marker,
            NodeKind::Document | NodeKind::Fragment => NodeKind::Fragment,
        };
        let copy = MemoryNode::new(kind);
        for child in &data.children {
            copy.push_child(&child.deep_clone());
        }
        copy
    }

    fn collect_text(&self, out: &mut String) {
        let data = self.0.borrow();
        match &data.kind {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Marker => {}
            _ => {
                for child in &data.children {
                    child.collect_text(out);
                }
            }
        }
    }

    fn write_html(&self, out: &mut String) {
        let data = self.0.borrow();
        match &data.kind {
            NodeKind::Document | NodeKind::Fragment => {
                for child in &data.children {
                    child.write_html(out);
                }
            }
            NodeKind::Text(text) => out.push_str(&markup::escape_text(text)),
            NodeKind::Marker => out.push_str("<!---->"),
            NodeKind::Element {
                tag,
                attributes,
                content,
            } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attributes {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&markup::escape_attribute(value));
                    out.push('"');
                }
                out.push('>');
                if markup::is_void_tag(tag) {
                    return;
                }
                if let Some(content) = content {
                    content.write_html(out);
                }
                for child in &data.children {
                    child.write_html(out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }
}

impl PartialEq for MemoryNode {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for MemoryNode {}

impl Hash for MemoryNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl fmt::Debug for MemoryNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Ok(data) = self.0.try_borrow() else {
            return f.write_str("<borrowed>");
        };
        match &data.kind {
            NodeKind::Document => f.write_str("#document"),
            NodeKind::Fragment => f.write_str("#fragment"),
            NodeKind::Marker => f.write_str("#marker"),
            NodeKind::Text(text) => write!(f, "#text {text:?}"),
            NodeKind::Element {
                tag, attributes, ..
            } => {
                write!(f, "<{tag}")?;
                for (name, value) in attributes {
                    write!(f, " {name}={value:?}")?;
                }
                f.write_str(">")
            }
        }
    }
}

impl NodeRef for MemoryNode {
    type Weak = WeakMemoryNode;

    fn downgrade(&self) -> Self::Weak {
        WeakMemoryNode(Rc::downgrade(&self.0))
    }

    fn upgrade(weak: &Self::Weak) -> Option<Self> {
        weak.0.upgrade().map(MemoryNode)
    }

    fn identity(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }
}

// =============================================================================
// Document
// =============================================================================

/// In-memory host document.
///
/// Listeners installed through [`Dom::listen`] are invoked by [`fire`](Self::fire),
/// which plays the role of the host's native event propagation: every
/// interaction reaches the document-level listeners for its type.
pub struct MemoryDom {
    document: MemoryNode,
    listeners: RefCell<HashMap<String, Vec<Listener<MemoryNode>>>>,
}

impl Default for MemoryDom {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDom {
    /// Empty document.
    pub fn new() -> Self {
        Self {
            document: MemoryNode::new(NodeKind::Document),
            listeners: RefCell::new(HashMap::new()),
        }
    }

    /// Build a document from markup.
    ///
    /// Accepts a well-formed subset: elements, quoted or bare attributes,
    /// text, comments (dropped) and `<template>` (content kept inert).
    /// Whitespace-only text between tags is dropped.
    pub fn parse(source: &str) -> Result<Self, MarkupError> {
        let dom = Self::new();
        markup::parse_into(&dom, &dom.document, source)?;
        Ok(dom)
    }

    pub fn document(&self) -> MemoryNode {
        self.document.clone()
    }

    /// Detached element. `<template>` elements get an empty content fragment.
    pub fn create_element(&self, tag: &str) -> MemoryNode {
        let tag = tag.to_ascii_lowercase();
        let content = (tag == "template").then(|| MemoryNode::new(NodeKind::Fragment));
        MemoryNode::new(NodeKind::Element {
            tag,
            attributes: Vec::new(),
            content,
        })
    }

    /// Detached text node.
    pub fn create_text(&self, text: &str) -> MemoryNode {
        MemoryNode::new(NodeKind::Text(text.to_string()))
    }

    pub fn set_attribute(&self, node: &MemoryNode, name: &str, value: &str) {
        if let NodeKind::Element { attributes, .. } = &mut node.0.borrow_mut().kind {
            match attributes.iter_mut().find(|(existing, _)| existing == name) {
                Some((_, current)) => *current = value.to_string(),
                None => attributes.push((name.to_string(), value.to_string())),
            }
        }
    }

    pub fn remove_attribute(&self, node: &MemoryNode, name: &str) {
        if let NodeKind::Element { attributes, .. } = &mut node.0.borrow_mut().kind {
            attributes.retain(|(existing, _)| existing != name);
        }
    }

    /// Append `child` to a `<template>` element's inert content.
    pub fn append_template_content(&self, template: &MemoryNode, child: &MemoryNode) {
        if let Some(content) = self.template_fragment(template) {
            content.push_child(child);
        }
    }

    /// Content fragment of a `<template>` element.
    pub(super) fn template_fragment(&self, node: &MemoryNode) -> Option<MemoryNode> {
        match &node.0.borrow().kind {
            NodeKind::Element { content, .. } => content.clone(),
            _ => None,
        }
    }

    pub fn tag(&self, node: &MemoryNode) -> Option<String> {
        match &node.0.borrow().kind {
            NodeKind::Element { tag, .. } => Some(tag.clone()),
            _ => None,
        }
    }

    /// First element in document order with `name="value"`.
    pub fn find_by_attr(&self, name: &str, value: &str) -> Option<MemoryNode> {
        self.find_all_by_attr(name, value).into_iter().next()
    }

    /// Every element in document order with `name="value"`.
    pub fn find_all_by_attr(&self, name: &str, value: &str) -> Vec<MemoryNode> {
        self.descendants(&self.document)
            .into_iter()
            .filter(|node| self.attribute(node, name).as_deref() == Some(value))
            .collect()
    }

    /// Whether `node` is attached to this document.
    pub fn is_connected(&self, node: &MemoryNode) -> bool {
        let mut current = Some(node.clone());
        while let Some(next) = current {
            if next == self.document {
                return true;
            }
            current = next.parent_node();
        }
        false
    }

    /// Serialized markup of `node` including itself.
    pub fn outer_html(&self, node: &MemoryNode) -> String {
        let mut out = String::new();
        node.write_html(&mut out);
        out
    }

    /// Serialized markup of `node`'s children.
    pub fn inner_html(&self, node: &MemoryNode) -> String {
        let mut out = String::new();
        for child in &node.0.borrow().children {
            child.write_html(&mut out);
        }
        out
    }

    /// Deliver an interaction of `event_type` originating at `target`.
    /// Returns false when nothing listens for that type.
    pub fn fire(&self, event_type: &str, target: &MemoryNode) -> bool {
        self.fire_interaction(&Interaction::new(event_type, target.clone()))
    }

    pub fn fire_interaction(&self, interaction: &Interaction<MemoryNode>) -> bool {
        // Cloned out so listeners may subscribe further types while running.
        let listeners = self
            .listeners
            .borrow()
            .get(&interaction.event_type)
            .cloned()
            .unwrap_or_default();
        for listener in &listeners {
            listener(interaction);
        }
        !listeners.is_empty()
    }

    /// Number of listeners installed for `event_type`.
    pub fn listener_count(&self, event_type: &str) -> usize {
        self.listeners
            .borrow()
            .get(event_type)
            .map_or(0, Vec::len)
    }
}

impl Dom for MemoryDom {
    type Node = MemoryNode;

    fn root(&self) -> MemoryNode {
        self.document.clone()
    }

    fn parent(&self, node: &MemoryNode) -> Option<MemoryNode> {
        node.parent_node()
    }

    fn children(&self, node: &MemoryNode) -> Vec<MemoryNode> {
        node.0
            .borrow()
            .children
            .iter()
            .filter(|child| child.is_element())
            .cloned()
            .collect()
    }

    fn attribute(&self, node: &MemoryNode, name: &str) -> Option<String> {
        match &node.0.borrow().kind {
            NodeKind::Element { attributes, .. } => attributes
                .iter()
                .find(|(existing, _)| existing == name)
                .map(|(_, value)| value.clone()),
            _ => None,
        }
    }

    fn text(&self, node: &MemoryNode) -> String {
        let mut out = String::new();
        node.collect_text(&mut out);
        out
    }

    fn set_text(&self, node: &MemoryNode, text: &str) {
        if let NodeKind::Text(current) = &mut node.0.borrow_mut().kind {
            *current = text.to_string();
            return;
        }
        node.take_children();
        if !text.is_empty() {
            node.push_child(&self.create_text(text));
        }
    }

    fn is_template(&self, node: &MemoryNode) -> bool {
        matches!(&node.0.borrow().kind, NodeKind::Element { tag, .. } if tag == "template")
    }

    fn template_content(&self, node: &MemoryNode) -> Option<MemoryNode> {
        let content = match &node.0.borrow().kind {
            NodeKind::Element {
                tag,
                content: Some(content),
                ..
            } if tag == "template" => content.clone(),
            _ => return None,
        };
        self.children(&content).into_iter().next()
    }

    fn clone_node(&self, node: &MemoryNode) -> MemoryNode {
        node.deep_clone()
    }

    fn create_marker(&self) -> MemoryNode {
        MemoryNode::new(NodeKind::Marker)
    }

    fn insert_before(&self, node: &MemoryNode, reference: &MemoryNode) {
        if node == reference {
            return;
        }
        let Some(parent) = reference.parent_node() else {
            return;
        };
        node.detach();
        {
            let mut data = parent.0.borrow_mut();
            let index = data
                .children
                .iter()
                .position(|child| child == reference)
                .unwrap_or(data.children.len());
            data.children.insert(index, node.clone());
        }
        node.0.borrow_mut().parent = Rc::downgrade(&parent.0);
    }

    fn append_child(&self, parent: &MemoryNode, child: &MemoryNode) {
        parent.push_child(child);
    }

    fn remove(&self, node: &MemoryNode) {
        node.detach();
    }

    fn clear_children(&self, node: &MemoryNode) {
        node.take_children();
    }

    fn listen(&self, event_type: &str, listener: Listener<MemoryNode>) {
        self.listeners
            .borrow_mut()
            .entry(event_type.to_string())
            .or_default()
            .push(listener);
    }
}

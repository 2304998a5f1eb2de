//! An in-process live tree.
//!
//! Useful for tests and headless hosts. Every mutation is recorded so callers
//! can assert on exactly what a patch pass changed.

use std::collections::BTreeMap;

use crate::{
    error::PatchError,
    message::HostMessage,
    patch::LiveTree,
    vnode::Handler,
};

/// Default for [`MemoryTree::with_log_limit`].
pub const DEFAULT_LOG_LIMIT: usize = 4096;

/// Handle to a node of a [`MemoryTree`].
///
/// Handles to removed nodes go stale: their slot may be reused, but a stale
/// handle never resolves to the new occupant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: usize,
    generation: u32,
}

/// A recorded mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Mutation {
    CreateElement { node: NodeId, tag: String },
    CreateText { node: NodeId, text: String },
    SetText { node: NodeId, text: String },
    SetAttribute { node: NodeId, name: String, value: String },
    RemoveAttribute { node: NodeId, name: String },
    SetHandler { node: NodeId, event: String },
    RemoveHandler { node: NodeId, event: String },
    AppendChild { parent: NodeId, child: NodeId },
    RemoveChild { parent: NodeId, child: NodeId },
    ReplaceChild { parent: NodeId, new: NodeId, old: NodeId },
}

#[derive(Debug, Clone)]
enum NodeData {
    Element {
        tag: String,
        attributes: BTreeMap<String, String>,
        handlers: BTreeMap<String, Handler>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct Slot {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
struct Entry {
    generation: u32,
    slot: Option<Slot>,
}

/// Arena backed [`LiveTree`].
///
/// Subtrees removed or replaced by the patcher are released and their slots
/// reused. The mutation log keeps at most the configured number of entries,
/// dropping the oldest first.
#[derive(Debug, Clone)]
pub struct MemoryTree {
    entries: Vec<Entry>,
    free: Vec<usize>,
    root: NodeId,
    mutations: Vec<Mutation>,
    log_limit: usize,
}

impl Default for MemoryTree {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTree {
    /// Creates a tree holding a single `<div id="app">` mount point.
    #[must_use]
    pub fn new() -> Self {
        let root = Slot {
            data: NodeData::Element {
                tag: "div".to_string(),
                attributes: BTreeMap::from([("id".to_string(), "app".to_string())]),
                handlers: BTreeMap::new(),
            },
            parent: None,
            children: Vec::new(),
        };
        Self {
            entries: vec![Entry {
                generation: 0,
                slot: Some(root),
            }],
            free: Vec::new(),
            root: NodeId {
                index: 0,
                generation: 0,
            },
            mutations: Vec::new(),
            log_limit: DEFAULT_LOG_LIMIT,
        }
    }

    /// Caps the mutation log. A limit of zero disables recording.
    #[must_use]
    pub fn with_log_limit(mut self, limit: usize) -> Self {
        self.log_limit = limit;
        let excess = self.mutations.len().saturating_sub(limit);
        self.mutations.drain(..excess);
        self
    }

    /// Returns the mount point.
    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    /// Recorded mutations, oldest first.
    #[must_use]
    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    /// Forgets the recorded mutations.
    pub fn clear_mutations(&mut self) {
        self.mutations.clear();
    }

    /// Drains the recorded mutations.
    pub fn take_mutations(&mut self) -> Vec<Mutation> {
        std::mem::take(&mut self.mutations)
    }

    /// Number of live nodes, the mount point included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.entries.iter().filter(|entry| entry.slot.is_some()).count()
    }

    /// Number of slots ever allocated, live or free.
    #[must_use]
    pub fn allocated(&self) -> usize {
        self.entries.len()
    }

    /// Elements with the given tag under `node`, in document order.
    #[must_use]
    pub fn find_by_tag(&self, node: NodeId, tag: &str) -> Vec<NodeId> {
        let mut found = Vec::new();
        self.collect_by_tag(node, tag, &mut found);
        found
    }

    fn collect_by_tag(&self, node: NodeId, tag: &str, found: &mut Vec<NodeId>) {
        let Some(slot) = self.get(node) else {
            return;
        };
        if matches!(&slot.data, NodeData::Element { tag: t, .. } if t == tag) {
            found.push(node);
        }
        for child in &slot.children {
            self.collect_by_tag(*child, tag, found);
        }
    }

    /// Concatenated text under `node`.
    #[must_use]
    pub fn text_content(&self, node: NodeId) -> String {
        let Some(slot) = self.get(node) else {
            return String::new();
        };
        match &slot.data {
            NodeData::Text(text) => text.clone(),
            NodeData::Element { .. } => slot
                .children
                .iter()
                .map(|child| self.text_content(*child))
                .collect(),
        }
    }

    /// Serializes `node` as HTML. Handlers are not rendered.
    #[must_use]
    pub fn to_html(&self, node: NodeId) -> String {
        let mut html = String::new();
        self.write_html(node, &mut html);
        html
    }

    fn write_html(&self, node: NodeId, html: &mut String) {
        let Some(slot) = self.get(node) else {
            return;
        };
        match &slot.data {
            NodeData::Text(text) => html.push_str(&escape(text)),
            NodeData::Element { tag, attributes, .. } => {
                html.push('<');
                html.push_str(tag);
                for (name, value) in attributes {
                    html.push(' ');
                    html.push_str(name);
                    if !value.is_empty() {
                        html.push_str("=\"");
                        html.push_str(&escape(value));
                        html.push('"');
                    }
                }
                html.push('>');
                for child in &slot.children {
                    self.write_html(*child, html);
                }
                html.push_str("</");
                html.push_str(tag);
                html.push('>');
            }
        }
    }

    /// Fires `event` on `target` and bubbles it towards the root.
    ///
    /// Returns the message built by the nearest handler for `event`, or
    /// `None` when nothing on the path listens. `value` stands in for the
    /// target's current value or checked state.
    #[must_use]
    pub fn dispatch(&self, target: NodeId, event: &str, value: Option<String>) -> Option<HostMessage> {
        let mut current = Some(target);
        while let Some(node) = current {
            let slot = self.get(node)?;
            if let NodeData::Element { handlers, .. } = &slot.data
                && let Some(handler) = handlers.get(event)
            {
                return Some(handler.message(value));
            }
            current = slot.parent;
        }
        None
    }

    fn get(&self, node: NodeId) -> Option<&Slot> {
        self.entries
            .get(node.index)
            .filter(|entry| entry.generation == node.generation)?
            .slot
            .as_ref()
    }

    fn slot(&self, node: NodeId) -> Result<&Slot, PatchError> {
        self.get(node).ok_or(PatchError::Detached)
    }

    fn slot_mut(&mut self, node: NodeId) -> Result<&mut Slot, PatchError> {
        self.entries
            .get_mut(node.index)
            .filter(|entry| entry.generation == node.generation)
            .and_then(|entry| entry.slot.as_mut())
            .ok_or(PatchError::Detached)
    }

    fn element_mut(
        &mut self,
        node: NodeId,
        op: &'static str,
    ) -> Result<(&mut BTreeMap<String, String>, &mut BTreeMap<String, Handler>), PatchError> {
        match &mut self.slot_mut(node)?.data {
            NodeData::Element {
                attributes,
                handlers,
                ..
            } => Ok((attributes, handlers)),
            NodeData::Text(_) => Err(PatchError::backend(op, "text nodes have no attributes")),
        }
    }

    fn insert(&mut self, data: NodeData) -> NodeId {
        let slot = Slot {
            data,
            parent: None,
            children: Vec::new(),
        };
        if let Some(index) = self.free.pop()
            && let Some(entry) = self.entries.get_mut(index)
        {
            entry.slot = Some(slot);
            return NodeId {
                index,
                generation: entry.generation,
            };
        }
        self.entries.push(Entry {
            generation: 0,
            slot: Some(slot),
        });
        NodeId {
            index: self.entries.len() - 1,
            generation: 0,
        }
    }

    /// Frees `node` and everything below it.
    fn release(&mut self, node: NodeId) {
        let mut pending = vec![node];
        while let Some(node) = pending.pop() {
            let Some(entry) = self
                .entries
                .get_mut(node.index)
                .filter(|entry| entry.generation == node.generation)
            else {
                continue;
            };
            if let Some(slot) = entry.slot.take() {
                entry.generation = entry.generation.wrapping_add(1);
                self.free.push(node.index);
                pending.extend(slot.children);
            }
        }
    }

    fn detach(&mut self, child: NodeId) -> Result<(), PatchError> {
        if let Some(parent) = self.slot(child)?.parent {
            self.slot_mut(parent)?.children.retain(|c| *c != child);
            self.slot_mut(child)?.parent = None;
        }
        Ok(())
    }

    fn record(&mut self, mutation: Mutation) {
        if self.log_limit == 0 {
            return;
        }
        if self.mutations.len() >= self.log_limit {
            self.mutations.drain(..self.log_limit.div_ceil(2));
        }
        self.mutations.push(mutation);
    }
}

impl LiveTree for MemoryTree {
    type Node = NodeId;

    fn tag(&self, node: &NodeId) -> Option<String> {
        match &self.get(*node)?.data {
            NodeData::Element { tag, .. } => Some(tag.clone()),
            NodeData::Text(_) => None,
        }
    }

    fn text(&self, node: &NodeId) -> Option<String> {
        match &self.get(*node)?.data {
            NodeData::Text(text) => Some(text.clone()),
            NodeData::Element { .. } => None,
        }
    }

    fn attributes(&self, node: &NodeId) -> BTreeMap<String, String> {
        match self.get(*node).map(|slot| &slot.data) {
            Some(NodeData::Element { attributes, .. }) => attributes.clone(),
            _ => BTreeMap::new(),
        }
    }

    fn handlers(&self, node: &NodeId) -> BTreeMap<String, Handler> {
        match self.get(*node).map(|slot| &slot.data) {
            Some(NodeData::Element { handlers, .. }) => handlers.clone(),
            _ => BTreeMap::new(),
        }
    }

    fn children(&self, node: &NodeId) -> Vec<NodeId> {
        self.get(*node)
            .map(|slot| slot.children.clone())
            .unwrap_or_default()
    }

    fn create_element(&mut self, tag: &str) -> Result<NodeId, PatchError> {
        let node = self.insert(NodeData::Element {
            tag: tag.to_string(),
            attributes: BTreeMap::new(),
            handlers: BTreeMap::new(),
        });
        self.record(Mutation::CreateElement {
            node,
            tag: tag.to_string(),
        });
        Ok(node)
    }

    fn create_text(&mut self, text: &str) -> Result<NodeId, PatchError> {
        let node = self.insert(NodeData::Text(text.to_string()));
        self.record(Mutation::CreateText {
            node,
            text: text.to_string(),
        });
        Ok(node)
    }

    fn set_text(&mut self, node: &NodeId, text: &str) -> Result<(), PatchError> {
        match &mut self.slot_mut(*node)?.data {
            NodeData::Text(current) => *current = text.to_string(),
            NodeData::Element { .. } => {
                return Err(PatchError::backend("set_text", "node is an element"));
            }
        }
        self.record(Mutation::SetText {
            node: *node,
            text: text.to_string(),
        });
        Ok(())
    }

    fn set_attribute(&mut self, node: &NodeId, name: &str, value: &str) -> Result<(), PatchError> {
        let (attributes, _) = self.element_mut(*node, "set_attribute")?;
        attributes.insert(name.to_string(), value.to_string());
        self.record(Mutation::SetAttribute {
            node: *node,
            name: name.to_string(),
            value: value.to_string(),
        });
        Ok(())
    }

    fn remove_attribute(&mut self, node: &NodeId, name: &str) -> Result<(), PatchError> {
        let (attributes, _) = self.element_mut(*node, "remove_attribute")?;
        attributes.remove(name);
        self.record(Mutation::RemoveAttribute {
            node: *node,
            name: name.to_string(),
        });
        Ok(())
    }

    fn set_handler(&mut self, node: &NodeId, event: &str, handler: &Handler) -> Result<(), PatchError> {
        let (_, handlers) = self.element_mut(*node, "set_handler")?;
        handlers.insert(event.to_string(), handler.clone());
        self.record(Mutation::SetHandler {
            node: *node,
            event: event.to_string(),
        });
        Ok(())
    }

    fn remove_handler(&mut self, node: &NodeId, event: &str) -> Result<(), PatchError> {
        let (_, handlers) = self.element_mut(*node, "remove_handler")?;
        handlers.remove(event);
        self.record(Mutation::RemoveHandler {
            node: *node,
            event: event.to_string(),
        });
        Ok(())
    }

    fn append_child(&mut self, parent: &NodeId, child: &NodeId) -> Result<(), PatchError> {
        self.element_mut(*parent, "append_child")?;
        self.detach(*child)?;
        self.slot_mut(*parent)?.children.push(*child);
        self.slot_mut(*child)?.parent = Some(*parent);
        self.record(Mutation::AppendChild {
            parent: *parent,
            child: *child,
        });
        Ok(())
    }

    fn remove_child(&mut self, parent: &NodeId, child: &NodeId) -> Result<(), PatchError> {
        if self.slot(*child)?.parent != Some(*parent) {
            return Err(PatchError::Detached);
        }
        self.detach(*child)?;
        self.record(Mutation::RemoveChild {
            parent: *parent,
            child: *child,
        });
        self.release(*child);
        Ok(())
    }

    fn replace_child(&mut self, parent: &NodeId, new: &NodeId, old: &NodeId) -> Result<(), PatchError> {
        let index = self
            .slot(*parent)?
            .children
            .iter()
            .position(|c| c == old)
            .ok_or(PatchError::Detached)?;
        self.detach(*new)?;
        self.slot_mut(*parent)?.children[index] = *new;
        self.slot_mut(*new)?.parent = Some(*parent);
        self.slot_mut(*old)?.parent = None;
        self.record(Mutation::ReplaceChild {
            parent: *parent,
            new: *new,
            old: *old,
        });
        self.release(*old);
        Ok(())
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_bubbles_to_the_nearest_handler() {
        let mut tree = MemoryTree::new();
        let root = tree.root();
        let label = tree.create_element("div").expect("create");
        let text = tree.create_text("hi").expect("create");
        tree.append_child(&label, &text).expect("append");
        tree.append_child(&root, &label).expect("append");
        tree.set_handler(&label, "click", &Handler::click("greeting"))
            .expect("bind");

        assert_eq!(
            tree.dispatch(text, "click", None),
            Some(HostMessage::click("greeting"))
        );
        assert_eq!(tree.dispatch(text, "change", None), None);
    }

    #[test]
    fn text_nodes_reject_attributes() {
        let mut tree = MemoryTree::new();
        let text = tree.create_text("x").expect("create");
        assert!(tree.set_attribute(&text, "class", "y").is_err());
    }

    #[test]
    fn html_snapshot_escapes_text() {
        let mut tree = MemoryTree::new();
        let root = tree.root();
        let text = tree.create_text("a < b").expect("create");
        tree.append_child(&root, &text).expect("append");
        assert_eq!(tree.to_html(root), r#"<div id="app">a &lt; b</div>"#);
    }

    #[test]
    fn removed_subtrees_are_released_and_reused() {
        let mut tree = MemoryTree::new();
        let root = tree.root();
        let label = tree.create_element("div").expect("create");
        let text = tree.create_text("hi").expect("create");
        tree.append_child(&label, &text).expect("append");
        tree.append_child(&root, &label).expect("append");
        assert_eq!(tree.node_count(), 3);

        tree.remove_child(&root, &label).expect("remove");
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.tag(&label), None);
        assert_eq!(tree.text(&text), None);

        let reused = tree.create_element("span").expect("create");
        assert_eq!(tree.allocated(), 3);
        assert_ne!(reused, label);
        assert!(tree.set_attribute(&label, "class", "stale").is_err());
    }

    #[test]
    fn replaced_nodes_are_released() {
        let mut tree = MemoryTree::new();
        let root = tree.root();
        let old = tree.create_element("div").expect("create");
        tree.append_child(&root, &old).expect("append");
        let new = tree.create_element("button").expect("create");
        tree.replace_child(&root, &new, &old).expect("replace");
        assert_eq!(tree.children(&root), [new]);
        assert_eq!(tree.tag(&old), None);
        assert_eq!(tree.node_count(), 2);
    }

    #[test]
    fn mutation_log_is_bounded() {
        let mut tree = MemoryTree::new().with_log_limit(4);
        for index in 0..10 {
            tree.create_text(&index.to_string()).expect("create");
        }
        assert!(tree.mutations().len() <= 4);
        assert!(matches!(
            tree.mutations().last(),
            Some(Mutation::CreateText { text, .. }) if text == "9"
        ));

        let drained = tree.take_mutations();
        assert!(!drained.is_empty());
        assert!(tree.mutations().is_empty());

        let mut silent = MemoryTree::new().with_log_limit(0);
        silent.create_text("x").expect("create");
        assert!(silent.mutations().is_empty());
    }
}

//! Positional reconciliation of a live tree against a virtual tree.
//!
//! The patcher reads the live tree back through [`LiveTree`] instead of
//! diffing against the previous virtual tree, so state edited outside the
//! patcher (for example by a browser extension) is repaired on the next pass.
//!
//! Children are aligned by index only. A change of tag or widget kind at a
//! position replaces the whole subtree; otherwise attributes, handlers and
//! children are reconciled in place.

use std::{collections::BTreeMap, fmt::Debug};

use crate::{
    error::PatchError,
    render::WIDGET_ATTRIBUTE,
    vnode::{AttributeValue, Element, Handler, VirtualNode},
};

/// Operations a live tree backend must provide.
///
/// Reads are infallible: a backend that cannot interpret a node reports it as
/// empty, which makes the patcher rewrite it.
pub trait LiveTree {
    /// Handle to a live node.
    type Node: Clone + Debug;

    /// Lowercase tag of an element, `None` for text nodes.
    fn tag(&self, node: &Self::Node) -> Option<String>;
    /// Content of a text node, `None` for elements.
    fn text(&self, node: &Self::Node) -> Option<String>;
    /// Attributes currently set on an element.
    fn attributes(&self, node: &Self::Node) -> BTreeMap<String, String>;
    /// Handler records currently bound to an element.
    fn handlers(&self, node: &Self::Node) -> BTreeMap<String, Handler>;
    /// Children in order.
    fn children(&self, node: &Self::Node) -> Vec<Self::Node>;

    /// Creates a detached element.
    ///
    /// # Errors
    ///
    /// Backend failure.
    fn create_element(&mut self, tag: &str) -> Result<Self::Node, PatchError>;
    /// Creates a detached text node.
    ///
    /// # Errors
    ///
    /// Backend failure.
    fn create_text(&mut self, text: &str) -> Result<Self::Node, PatchError>;
    /// Replaces the content of a text node.
    ///
    /// # Errors
    ///
    /// Backend failure.
    fn set_text(&mut self, node: &Self::Node, text: &str) -> Result<(), PatchError>;
    /// Adds or overwrites an attribute.
    ///
    /// # Errors
    ///
    /// Backend failure.
    fn set_attribute(&mut self, node: &Self::Node, name: &str, value: &str) -> Result<(), PatchError>;
    /// Removes an attribute.
    ///
    /// # Errors
    ///
    /// Backend failure.
    fn remove_attribute(&mut self, node: &Self::Node, name: &str) -> Result<(), PatchError>;
    /// Detaches any handler bound to `event` and binds `handler`.
    ///
    /// # Errors
    ///
    /// Backend failure.
    fn set_handler(&mut self, node: &Self::Node, event: &str, handler: &Handler) -> Result<(), PatchError>;
    /// Detaches the handler bound to `event`.
    ///
    /// # Errors
    ///
    /// Backend failure.
    fn remove_handler(&mut self, node: &Self::Node, event: &str) -> Result<(), PatchError>;
    /// Appends `child` to `parent`.
    ///
    /// # Errors
    ///
    /// Backend failure.
    fn append_child(&mut self, parent: &Self::Node, child: &Self::Node) -> Result<(), PatchError>;
    /// Removes `child` from `parent`.
    ///
    /// # Errors
    ///
    /// Backend failure.
    fn remove_child(&mut self, parent: &Self::Node, child: &Self::Node) -> Result<(), PatchError>;
    /// Puts `new` in the place of `old` under `parent`.
    ///
    /// # Errors
    ///
    /// Backend failure.
    fn replace_child(
        &mut self,
        parent: &Self::Node,
        new: &Self::Node,
        old: &Self::Node,
    ) -> Result<(), PatchError>;
}

/// Counts of the mutations applied by one patch pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PatchSummary {
    /// Subtrees materialized and appended.
    pub appended: usize,
    /// Subtrees replaced because their tag or node type changed.
    pub replaced: usize,
    /// Surplus live children removed.
    pub removed: usize,
    /// Attributes set or removed.
    pub attributes: usize,
    /// Handlers bound or detached.
    pub handlers: usize,
    /// Text nodes rewritten.
    pub texts: usize,
}

impl PatchSummary {
    /// Total number of mutations.
    #[must_use]
    pub const fn mutations(&self) -> usize {
        self.appended + self.replaced + self.removed + self.attributes + self.handlers + self.texts
    }

    /// Whether the pass left the live tree untouched.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.mutations() == 0
    }
}

/// The single mount point of the live tree.
///
/// Owns the backend; every mutation goes through [`RenderTarget::patch`].
#[derive(Debug)]
pub struct RenderTarget<T: LiveTree> {
    tree: T,
    root: T::Node,
}

impl<T: LiveTree> RenderTarget<T> {
    /// Binds a mount point. The rendered tree becomes the root's only child.
    pub const fn new(tree: T, root: T::Node) -> Self {
        Self { tree, root }
    }

    /// Returns the backend for reading.
    pub const fn tree(&self) -> &T {
        &self.tree
    }

    /// Returns the backend for maintenance outside a patch pass.
    pub const fn tree_mut(&mut self) -> &mut T {
        &mut self.tree
    }

    /// Returns the mount point.
    pub const fn root(&self) -> &T::Node {
        &self.root
    }

    /// Returns the live node rendered from the top of the virtual tree.
    pub fn mounted(&self) -> Option<T::Node> {
        self.tree.children(&self.root).into_iter().next()
    }

    /// Makes the live tree under the mount point match `next`.
    ///
    /// Patching twice with the same tree applies no mutation the second time.
    ///
    /// # Errors
    ///
    /// Propagates backend failures. The live tree may then be partially
    /// patched; the next successful pass repairs it.
    pub fn patch(&mut self, next: &VirtualNode) -> Result<PatchSummary, PatchError> {
        let mut patcher = Patcher {
            tree: &mut self.tree,
            summary: PatchSummary::default(),
        };
        let root = self.root.clone();
        patcher.patch_children(&root, core::slice::from_ref(next))?;
        let summary = patcher.summary;
        tracing::debug!(
            mutations = summary.mutations(),
            replaced = summary.replaced,
            appended = summary.appended,
            removed = summary.removed,
            "patched live tree"
        );
        Ok(summary)
    }
}

struct Patcher<'a, T: LiveTree> {
    tree: &'a mut T,
    summary: PatchSummary,
}

impl<T: LiveTree> Patcher<'_, T> {
    fn patch_node(&mut self, parent: &T::Node, live: &T::Node, next: &VirtualNode) -> Result<(), PatchError> {
        match (self.tree.tag(live), next) {
            (None, VirtualNode::Text(text)) => {
                if self.tree.text(live).as_deref() != Some(text.as_str()) {
                    self.tree.set_text(live, text)?;
                    self.summary.texts += 1;
                }
                Ok(())
            }
            (Some(tag), VirtualNode::Element(element))
                if tag == element.tag && self.same_widget(live, element) =>
            {
                self.patch_attributes(live, element)?;
                self.patch_handlers(live, element)?;
                self.patch_children(live, &element.children)
            }
            _ => {
                let fresh = self.materialize(next)?;
                self.tree.replace_child(parent, &fresh, live)?;
                self.summary.replaced += 1;
                Ok(())
            }
        }
    }

    fn same_widget(&self, live: &T::Node, next: &Element) -> bool {
        let wanted = next.attributes.get(WIDGET_ATTRIBUTE).and_then(AttributeValue::to_dom);
        self.tree.attributes(live).get(WIDGET_ATTRIBUTE) == wanted.as_ref()
    }

    fn patch_attributes(&mut self, live: &T::Node, next: &Element) -> Result<(), PatchError> {
        let current = self.tree.attributes(live);
        let wanted = next.dom_attributes();

        for name in current.keys().filter(|name| !wanted.contains_key(*name)) {
            self.tree.remove_attribute(live, name)?;
            self.summary.attributes += 1;
        }
        for (name, value) in &wanted {
            if current.get(name) != Some(value) {
                self.tree.set_attribute(live, name, value)?;
                self.summary.attributes += 1;
            }
        }
        Ok(())
    }

    fn patch_handlers(&mut self, live: &T::Node, next: &Element) -> Result<(), PatchError> {
        let current = self.tree.handlers(live);

        for event in current.keys().filter(|event| !next.handlers.contains_key(*event)) {
            self.tree.remove_handler(live, event)?;
            self.summary.handlers += 1;
        }
        for (event, handler) in &next.handlers {
            if current.get(event) != Some(handler) {
                self.tree.set_handler(live, event, handler)?;
                self.summary.handlers += 1;
            }
        }
        Ok(())
    }

    fn patch_children(&mut self, parent: &T::Node, next: &[VirtualNode]) -> Result<(), PatchError> {
        let live = self.tree.children(parent);

        for (node, wanted) in live.iter().zip(next) {
            self.patch_node(parent, node, wanted)?;
        }
        for surplus in live.iter().skip(next.len()).rev() {
            self.tree.remove_child(parent, surplus)?;
            self.summary.removed += 1;
        }
        for missing in next.iter().skip(live.len()) {
            let fresh = self.materialize(missing)?;
            self.tree.append_child(parent, &fresh)?;
            self.summary.appended += 1;
        }
        Ok(())
    }

    fn materialize(&mut self, node: &VirtualNode) -> Result<T::Node, PatchError> {
        match node {
            VirtualNode::Text(text) => self.tree.create_text(text),
            VirtualNode::Element(element) => {
                let live = self.tree.create_element(&element.tag)?;
                for (name, value) in element.dom_attributes() {
                    self.tree.set_attribute(&live, &name, &value)?;
                }
                for (event, handler) in &element.handlers {
                    self.tree.set_handler(&live, event, handler)?;
                }
                for child in &element.children {
                    let child = self.materialize(child)?;
                    self.tree.append_child(&live, &child)?;
                }
                Ok(live)
            }
        }
    }
}

use std::collections::BTreeMap;

use neutrino_core::{Handler, LiveTree, PatchError};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Element, HtmlInputElement, Node, Window};

use crate::error::{WebError, patch_error};

const STYLE_ID: &str = "neutrino-web-styles";

/// Property on live nodes holding their handler records as JSON.
const HANDLERS_KEY: &str = "__neutrinoHandlers";

/// The element the application renders into.
#[derive(Debug, Clone)]
pub struct DomRoot {
    window: Window,
    document: Document,
    element: Element,
}

impl DomRoot {
    /// Looks up the mounting element by id.
    ///
    /// When the element is missing and `create_if_missing` is set, a `<div>`
    /// with that id is appended to `<body>`.
    pub fn new(root_id: &str, create_if_missing: bool, inject_styles: bool) -> Result<Self, WebError> {
        let window: Window = web_sys::window().ok_or(WebError::DomUnavailable)?;
        let document: Document = window.document().ok_or(WebError::DomUnavailable)?;

        if inject_styles {
            inject_stylesheet(&document)?;
        }

        let element = match document.get_element_by_id(root_id) {
            Some(element) => element,
            None if create_if_missing => {
                let body = document.body().ok_or(WebError::DomUnavailable)?;
                let host = document.create_element("div")?;
                host.set_id(root_id);
                body.append_child(&host)?;
                host
            }
            None => return Err(WebError::RootNotFound(root_id.to_string())),
        };

        Ok(Self {
            window,
            document,
            element,
        })
    }

    /// Returns the DOM element representing the mounting point.
    #[must_use]
    pub const fn element(&self) -> &Element {
        &self.element
    }

    /// Returns the owning document.
    #[must_use]
    pub const fn document(&self) -> &Document {
        &self.document
    }

    /// Returns the owning window.
    #[must_use]
    pub const fn window(&self) -> &Window {
        &self.window
    }

    /// Clears the mounting element.
    pub fn clear(&self) -> Result<(), WebError> {
        while let Some(child) = self.element.first_child() {
            self.element.remove_child(&child)?;
        }
        Ok(())
    }

    /// Adds a CSS class to the root element.
    pub fn add_class(&self, class_name: &str) -> Result<(), WebError> {
        self.element.class_list().add_1(class_name)?;
        Ok(())
    }
}

fn inject_stylesheet(document: &Document) -> Result<(), WebError> {
    if document.get_element_by_id(STYLE_ID).is_some() {
        return Ok(());
    }

    let style = document.create_element("style")?;
    style.set_id(STYLE_ID);
    style.set_attribute("data-neutrino", "true")?;
    style.set_inner_html(include_str!("../styles/default.css"));

    if let Some(head) = document.head() {
        head.append_child(&style)?;
    } else if let Some(body) = document.body() {
        body.prepend_with_node_1(&style)?;
    } else {
        return Err(WebError::DomUnavailable);
    }
    Ok(())
}

/// [`LiveTree`] over the browser DOM.
///
/// Handler records are stored on each node as a JSON string property, out of
/// sight of the attribute diff. The actual DOM listeners are delegated from the
/// mount point, see [`EventDelegate`](crate::events::EventDelegate).
#[derive(Debug, Clone)]
pub struct DomTree {
    document: Document,
}

impl DomTree {
    /// Creates a tree creating its nodes in `document`.
    #[must_use]
    pub const fn new(document: Document) -> Self {
        Self { document }
    }

    fn element<'a>(node: &'a Node, op: &'static str) -> Result<&'a Element, PatchError> {
        node.dyn_ref::<Element>()
            .ok_or_else(|| PatchError::backend(op, "node is not an element"))
    }

    fn write_handlers(node: &Node, handlers: &BTreeMap<String, Handler>) -> Result<(), PatchError> {
        let encoded = serde_json::to_string(handlers)
            .map_err(|error| PatchError::backend("set_handler", error.to_string()))?;
        js_sys::Reflect::set(node, &JsValue::from_str(HANDLERS_KEY), &JsValue::from_str(&encoded))
            .map_err(patch_error("set_handler"))?;
        Ok(())
    }
}

impl LiveTree for DomTree {
    type Node = Node;

    fn tag(&self, node: &Node) -> Option<String> {
        node.dyn_ref::<Element>()
            .map(|element| element.tag_name().to_ascii_lowercase())
    }

    fn text(&self, node: &Node) -> Option<String> {
        if node.node_type() == Node::TEXT_NODE {
            Some(node.node_value().unwrap_or_default())
        } else {
            None
        }
    }

    fn attributes(&self, node: &Node) -> BTreeMap<String, String> {
        let Some(element) = node.dyn_ref::<Element>() else {
            return BTreeMap::new();
        };
        element
            .get_attribute_names()
            .iter()
            .filter_map(|name| name.as_string())
            .filter_map(|name| {
                let value = element.get_attribute(&name)?;
                Some((name, value))
            })
            .collect()
    }

    fn handlers(&self, node: &Node) -> BTreeMap<String, Handler> {
        js_sys::Reflect::get(node, &JsValue::from_str(HANDLERS_KEY))
            .ok()
            .and_then(|value| value.as_string())
            .and_then(|encoded| serde_json::from_str(&encoded).ok())
            .unwrap_or_default()
    }

    fn children(&self, node: &Node) -> Vec<Node> {
        let list = node.child_nodes();
        (0..list.length()).filter_map(|index| list.item(index)).collect()
    }

    fn create_element(&mut self, tag: &str) -> Result<Node, PatchError> {
        self.document
            .create_element(tag)
            .map(Node::from)
            .map_err(patch_error("create_element"))
    }

    fn create_text(&mut self, text: &str) -> Result<Node, PatchError> {
        Ok(self.document.create_text_node(text).into())
    }

    fn set_text(&mut self, node: &Node, text: &str) -> Result<(), PatchError> {
        node.set_node_value(Some(text));
        Ok(())
    }

    fn set_attribute(&mut self, node: &Node, name: &str, value: &str) -> Result<(), PatchError> {
        Self::element(node, "set_attribute")?
            .set_attribute(name, value)
            .map_err(patch_error("set_attribute"))?;
        // Attributes only seed form state; keep the live property in step.
        if let Some(input) = node.dyn_ref::<HtmlInputElement>() {
            match name {
                "value" => input.set_value(value),
                "checked" => input.set_checked(true),
                _ => {}
            }
        }
        Ok(())
    }

    fn remove_attribute(&mut self, node: &Node, name: &str) -> Result<(), PatchError> {
        Self::element(node, "remove_attribute")?
            .remove_attribute(name)
            .map_err(patch_error("remove_attribute"))?;
        if name == "checked"
            && let Some(input) = node.dyn_ref::<HtmlInputElement>()
        {
            input.set_checked(false);
        }
        Ok(())
    }

    fn set_handler(&mut self, node: &Node, event: &str, handler: &Handler) -> Result<(), PatchError> {
        Self::element(node, "set_handler")?;
        let mut handlers = self.handlers(node);
        handlers.insert(event.to_string(), handler.clone());
        Self::write_handlers(node, &handlers)
    }

    fn remove_handler(&mut self, node: &Node, event: &str) -> Result<(), PatchError> {
        let mut handlers = self.handlers(node);
        if handlers.remove(event).is_some() {
            Self::write_handlers(node, &handlers)?;
        }
        Ok(())
    }

    fn append_child(&mut self, parent: &Node, child: &Node) -> Result<(), PatchError> {
        parent
            .append_child(child)
            .map_err(patch_error("append_child"))?;
        Ok(())
    }

    fn remove_child(&mut self, parent: &Node, child: &Node) -> Result<(), PatchError> {
        parent
            .remove_child(child)
            .map_err(patch_error("remove_child"))?;
        Ok(())
    }

    fn replace_child(&mut self, parent: &Node, new: &Node, old: &Node) -> Result<(), PatchError> {
        parent
            .replace_child(new, old)
            .map_err(patch_error("replace_child"))?;
        Ok(())
    }
}

use neutrino_core::{EventBridge, Handler, LiveTree, ValueSource};
use wasm_bindgen::{JsCast, closure::Closure};
use web_sys::{Element, Event, HtmlInputElement, Node};

use crate::{channel::HostChannel, dom::DomTree, error::WebError};

/// Events listened for on the mount point.
pub const DELEGATED_EVENTS: [&str; 4] = ["click", "change", "input", "mousedown"];

/// Listeners installed once on the mount point.
///
/// An event bubbling up from a rendered node is matched against the handler
/// records stored on the target and its ancestors; the nearest record wins
/// and its message goes out through the bridge. Listeners are removed on drop.
#[derive(Debug)]
pub struct EventDelegate {
    root: Element,
    listeners: Vec<(&'static str, Closure<dyn FnMut(Event)>)>,
}

impl EventDelegate {
    /// Installs the listeners on `root`.
    pub fn install(
        root: &Element,
        tree: &DomTree,
        bridge: &EventBridge<HostChannel>,
    ) -> Result<Self, WebError> {
        let mut listeners = Vec::with_capacity(DELEGATED_EVENTS.len());
        for name in DELEGATED_EVENTS {
            let root_node: Node = root.clone().into();
            let tree = tree.clone();
            let bridge = bridge.clone();
            let listener = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
                let Some(target) = event.target().and_then(|target| target.dyn_into::<Node>().ok())
                else {
                    return;
                };
                if let Some((node, handler)) = nearest_handler(&tree, &root_node, target, name) {
                    bridge.invoke(&handler.message(read_value(&node, &handler.value)));
                }
            });
            root.add_event_listener_with_callback(name, listener.as_ref().unchecked_ref())?;
            listeners.push((name, listener));
        }
        Ok(Self {
            root: root.clone(),
            listeners,
        })
    }
}

impl Drop for EventDelegate {
    fn drop(&mut self) {
        for (name, listener) in &self.listeners {
            let _ = self
                .root
                .remove_event_listener_with_callback(name, listener.as_ref().unchecked_ref());
        }
    }
}

/// Walks from `target` up to (not including) `root`.
fn nearest_handler(tree: &DomTree, root: &Node, target: Node, event: &str) -> Option<(Node, Handler)> {
    let mut current = Some(target);
    while let Some(node) = current {
        if node.is_same_node(Some(root)) {
            return None;
        }
        if let Some(handler) = tree.handlers(&node).remove(event) {
            return Some((node, handler));
        }
        current = node.parent_node();
    }
    None
}

fn read_value(node: &Node, source: &ValueSource) -> Option<String> {
    let input = node.dyn_ref::<HtmlInputElement>();
    match source {
        ValueSource::None | ValueSource::Constant(_) => None,
        ValueSource::TargetValue => input.map(HtmlInputElement::value),
        ValueSource::TargetChecked => input.map(|input| input.checked().to_string()),
    }
}

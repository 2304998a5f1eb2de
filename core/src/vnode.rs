//! The diffable intermediate tree produced by the renderer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    message::{HostMessage, MessageKind},
    widget::Style,
};

/// A node of the virtual tree.
#[derive(Debug, Clone, PartialEq)]
pub enum VirtualNode {
    /// An element with attributes, handlers and children.
    Element(Element),
    /// Leaf text content.
    Text(String),
}

impl VirtualNode {
    /// Creates a text node.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Returns the element tag, or `None` for text nodes.
    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        match self {
            Self::Element(element) => Some(&element.tag),
            Self::Text(_) => None,
        }
    }

    /// Returns the element, if this is one.
    #[must_use]
    pub const fn as_element(&self) -> Option<&Element> {
        match self {
            Self::Element(element) => Some(element),
            Self::Text(_) => None,
        }
    }

    /// Concatenated text of this node and all descendants.
    #[must_use]
    pub fn text_content(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Element(element) => element.children.iter().map(Self::text_content).collect(),
        }
    }
}

impl From<Element> for VirtualNode {
    fn from(value: Element) -> Self {
        Self::Element(value)
    }
}

/// An attribute as produced by the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    /// Plain string attribute.
    Text(String),
    /// Boolean attribute: present when `true`, absent when `false`.
    Flag(bool),
    /// Inline style declarations.
    Style(Style),
}

impl AttributeValue {
    /// Returns the string form stored in the live tree, or `None` when the
    /// attribute must be absent.
    #[must_use]
    pub fn to_dom(&self) -> Option<String> {
        match self {
            Self::Text(text) => Some(text.clone()),
            Self::Flag(true) => Some(String::new()),
            Self::Flag(false) => None,
            Self::Style(style) if style.is_empty() => None,
            Self::Style(style) => Some(
                style
                    .iter()
                    .map(|(property, value)| format!("{property}: {value};"))
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

impl From<Style> for AttributeValue {
    fn from(value: Style) -> Self {
        Self::Style(value)
    }
}

/// Where the `value` of an outgoing message comes from when the event fires.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueSource {
    /// No value is sent.
    #[default]
    None,
    /// The target's current `value`.
    TargetValue,
    /// The target's current `checked` state, as `"true"` or `"false"`.
    TargetChecked,
    /// A value fixed at render time, such as the index of a choice.
    Constant(String),
}

/// An event binding: which message to send when the event fires.
///
/// Handlers are plain data so the patcher can compare them and the live tree
/// can build the message by value when the event arrives.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Handler {
    /// Kind of the outgoing message.
    pub kind: MessageKind,
    /// Correlation key of the widget.
    pub source: String,
    /// Value captured from the event target.
    #[serde(default)]
    pub value: ValueSource,
}

impl Handler {
    /// A handler sending `{kind: "click", source}`.
    pub fn click(source: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Click,
            source: source.into(),
            value: ValueSource::None,
        }
    }

    /// A handler sending `{kind: "change", source, value}`.
    pub fn change(source: impl Into<String>, value: ValueSource) -> Self {
        Self {
            kind: MessageKind::Change,
            source: source.into(),
            value,
        }
    }

    /// A handler sending `{kind, source, value}` with a value fixed at render time.
    pub fn constant(kind: MessageKind, source: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind,
            source: source.into(),
            value: ValueSource::Constant(value.into()),
        }
    }

    /// Builds the outgoing message. `value` is what the target reported for
    /// this handler's [`ValueSource`] and is ignored for [`ValueSource::None`]
    /// and [`ValueSource::Constant`].
    #[must_use]
    pub fn message(&self, value: Option<String>) -> HostMessage {
        HostMessage {
            kind: self.kind,
            source: Some(self.source.clone()),
            value: match &self.value {
                ValueSource::None => None,
                ValueSource::TargetValue | ValueSource::TargetChecked => value,
                ValueSource::Constant(constant) => Some(constant.clone()),
            },
        }
    }
}

/// An element node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    /// Lowercase tag name.
    pub tag: String,
    /// Attributes by name.
    pub attributes: BTreeMap<String, AttributeValue>,
    /// Handlers by event name.
    pub handlers: BTreeMap<String, Handler>,
    /// Children in order.
    pub children: Vec<VirtualNode>,
}

impl Element {
    /// Creates an element without attributes or children.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    /// Sets an attribute.
    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Sets the `class` attribute.
    #[must_use]
    pub fn class(self, class: &str) -> Self {
        self.attr("class", class)
    }

    /// Binds a handler to an event.
    #[must_use]
    pub fn on(mut self, event: impl Into<String>, handler: Handler) -> Self {
        self.handlers.insert(event.into(), handler);
        self
    }

    /// Appends a child.
    #[must_use]
    pub fn child(mut self, child: impl Into<VirtualNode>) -> Self {
        self.children.push(child.into());
        self
    }

    /// The attributes as they should appear in the live tree.
    #[must_use]
    pub fn dom_attributes(&self) -> BTreeMap<String, String> {
        self.attributes
            .iter()
            .filter_map(|(name, value)| Some((name.clone(), value.to_dom()?)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_and_styles_in_dom_form() {
        let element = Element::new("div")
            .attr("disabled", false)
            .attr("hidden", true)
            .attr("style", Style::new())
            .attr(
                "data-style",
                Style::from([("color".to_string(), "red".to_string()), ("gap".to_string(), "1px".to_string())]),
            );
        let attributes = element.dom_attributes();
        assert!(!attributes.contains_key("disabled"));
        assert!(!attributes.contains_key("style"));
        assert_eq!(attributes["hidden"], "");
        assert_eq!(attributes["data-style"], "color: red; gap: 1px;");
    }

    #[test]
    fn click_handler_ignores_value() {
        let handler = Handler::click("ok");
        assert_eq!(handler.message(Some("x".into())), HostMessage::click("ok"));
        let handler = Handler::change("name", ValueSource::TargetValue);
        assert_eq!(
            handler.message(Some("Ada".into())),
            HostMessage::change("name", "Ada")
        );
    }

    #[test]
    fn constant_handlers_report_their_own_value() {
        let handler = Handler::constant(MessageKind::Click, "size", "2");
        let message = handler.message(Some("ignored".into()));
        assert_eq!(message.kind, MessageKind::Click);
        assert_eq!(message.value.as_deref(), Some("2"));
    }
}

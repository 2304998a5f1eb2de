//! Widget descriptors pushed by the host.
//!
//! A descriptor is a tagged JSON object: `{"type": "button", "name": "ok", ...}`.
//! The set of kinds is closed on the Rust side, but the wire format is open:
//! tags this build does not know decode into [`Widget::Unknown`] instead of
//! failing, so a newer host can talk to an older frontend.

use std::collections::BTreeMap;

use serde::{
    Deserialize, Deserializer,
    de::{Error as _, Unexpected},
};
use serde_json::Value;

use crate::error::DecodeError;

/// Inline CSS declarations keyed by property name.
pub type Style = BTreeMap<String, String>;

/// A clickable push button.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Button {
    /// Correlation key reported back with click events.
    pub name: String,
    /// Caption.
    #[serde(default)]
    pub text: String,
    /// Whether the button ignores input.
    #[serde(default)]
    pub disabled: bool,
}

impl Button {
    /// Creates an enabled button with an empty caption.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the caption.
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Sets the disabled flag.
    #[must_use]
    pub const fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }
}

/// A line of static text that still reports clicks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Label {
    /// Correlation key reported back with click events.
    pub name: String,
    /// Displayed text.
    #[serde(default)]
    pub text: String,
}

impl Label {
    /// Creates an empty label.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: String::new(),
        }
    }

    /// Sets the displayed text.
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }
}

/// A styled box laying out its children in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Container {
    /// Inline style. Accepts a mapping or a legacy CSS declaration string.
    pub style: Style,
    /// Children in visual order.
    pub children: Vec<Widget>,
}

impl Container {
    /// Creates a container laying out its children top to bottom.
    #[must_use]
    pub fn vertical() -> Self {
        Self::default().style("flex-direction", "column")
    }

    /// Creates a container laying out its children left to right.
    #[must_use]
    pub fn horizontal() -> Self {
        Self::default().style("flex-direction", "row")
    }

    /// Sets one style declaration.
    #[must_use]
    pub fn style(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
        self.style.insert(property.into(), value.into());
        self
    }

    /// Appends a child.
    #[must_use]
    pub fn child(mut self, widget: impl Into<Widget>) -> Self {
        self.children.push(widget.into());
        self
    }
}

/// A labelled checkbox.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Checkbox {
    /// Correlation key reported back with change events.
    pub name: String,
    /// Label text.
    #[serde(default)]
    pub text: String,
    /// Current state.
    #[serde(default)]
    pub checked: bool,
}

/// A single line text field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TextInput {
    /// Correlation key reported back with change events.
    pub name: String,
    /// Current content.
    #[serde(default)]
    pub value: String,
}

/// An integer slider.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Range {
    /// Correlation key reported back with change events.
    pub name: String,
    /// Lower bound.
    #[serde(default)]
    pub min: i64,
    /// Upper bound.
    #[serde(default = "default_range_max")]
    pub max: i64,
    /// Current position.
    #[serde(default)]
    pub value: i64,
}

const fn default_range_max() -> i64 {
    100
}

/// A horizontal progress indicator.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProgressBar {
    /// Correlation key reported back with click events.
    pub name: String,
    /// Completion in percent.
    #[serde(default)]
    pub value: f64,
}

/// A group of mutually exclusive choices. Clicking one reports its index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Radio {
    /// Correlation key reported back with click events.
    pub name: String,
    /// Choice captions in display order.
    #[serde(default)]
    pub choices: Vec<String>,
    /// Index of the selected choice.
    #[serde(default)]
    pub selected: usize,
}

impl Radio {
    /// Creates a radio group without choices.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Appends a choice.
    #[must_use]
    pub fn choice(mut self, caption: impl Into<String>) -> Self {
        self.choices.push(caption.into());
        self
    }

    /// Selects the choice at `index`.
    #[must_use]
    pub const fn selected(mut self, index: usize) -> Self {
        self.selected = index;
        self
    }
}

/// One page of a [`Tabs`] widget.
#[derive(Debug, Clone, PartialEq)]
pub struct Tab {
    /// Caption shown in the title row.
    pub title: String,
    /// Page content.
    pub content: Widget,
}

/// Titled pages of which only the selected one is shown.
///
/// Clicking a title reports its index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tabs {
    /// Correlation key reported back with click events.
    pub name: String,
    /// Index of the visible page.
    pub selected: usize,
    /// Pages in title order.
    pub children: Vec<Tab>,
}

impl Tabs {
    /// Creates an empty tab set.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Appends a page.
    #[must_use]
    pub fn tab(mut self, title: impl Into<String>, content: impl Into<Widget>) -> Self {
        self.children.push(Tab {
            title: title.into(),
            content: content.into(),
        });
        self
    }

    /// Shows the page at `index`.
    #[must_use]
    pub const fn selected(mut self, index: usize) -> Self {
        self.selected = index;
        self
    }
}

/// A drop-down list.
///
/// Pressing the button reports a change to `-1`, which a host answers by
/// pushing the combo back `opened`. Pressing a choice reports its index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Combo {
    /// Correlation key reported back with change events.
    pub name: String,
    /// Choice captions in display order.
    #[serde(default)]
    pub choices: Vec<String>,
    /// Index of the selected choice.
    #[serde(default)]
    pub selected: usize,
    /// Whether the choice list is unfolded.
    #[serde(default)]
    pub opened: bool,
    /// Whether the combo ignores input.
    #[serde(default)]
    pub disabled: bool,
}

/// One node of the host supplied widget tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Widget {
    /// See [`Button`].
    Button(Button),
    /// See [`Label`].
    Label(Label),
    /// See [`Container`].
    Container(Container),
    /// See [`Checkbox`].
    Checkbox(Checkbox),
    /// See [`TextInput`].
    TextInput(TextInput),
    /// See [`Range`].
    Range(Range),
    /// See [`ProgressBar`].
    ProgressBar(ProgressBar),
    /// See [`Radio`].
    Radio(Radio),
    /// See [`Tabs`].
    Tabs(Tabs),
    /// See [`Combo`].
    Combo(Combo),
    /// A kind this build does not recognise. Renders as an empty placeholder.
    Unknown {
        /// The `type` tag as sent by the host.
        kind: String,
    },
}

impl Widget {
    /// Returns the wire tag of this widget.
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::Button(_) => "button",
            Self::Label(_) => "label",
            Self::Container(_) => "container",
            Self::Checkbox(_) => "checkbox",
            Self::TextInput(_) => "textinput",
            Self::Range(_) => "range",
            Self::ProgressBar(_) => "progressbar",
            Self::Radio(_) => "radio",
            Self::Tabs(_) => "tabs",
            Self::Combo(_) => "combo",
            Self::Unknown { kind } => kind,
        }
    }

    /// Returns the correlation key of interactive widgets.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Button(Button { name, .. })
            | Self::Label(Label { name, .. })
            | Self::Checkbox(Checkbox { name, .. })
            | Self::TextInput(TextInput { name, .. })
            | Self::Range(Range { name, .. })
            | Self::ProgressBar(ProgressBar { name, .. })
            | Self::Radio(Radio { name, .. })
            | Self::Tabs(Tabs { name, .. })
            | Self::Combo(Combo { name, .. }) => Some(name),
            Self::Container(_) | Self::Unknown { .. } => None,
        }
    }

    /// Builds a widget tree from parsed JSON.
    ///
    /// Each level is visited once; child lists are taken out of their parent
    /// before the parent's own fields are read.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::TooDeep`] when widgets nest deeper than
    /// `max_depth`, counting the root as depth 1, and
    /// [`DecodeError::Malformed`] when a known widget lacks a required field or
    /// has one of the wrong shape.
    pub fn from_value(value: Value, max_depth: usize) -> Result<Self, DecodeError> {
        Self::from_value_at(value, 1, max_depth)
    }

    fn from_value_at(mut value: Value, depth: usize, max_depth: usize) -> Result<Self, DecodeError> {
        if depth > max_depth {
            return Err(DecodeError::TooDeep { limit: max_depth });
        }
        let kind = match value.as_object_mut().map(|object| object.remove("type")) {
            Some(Some(Value::String(kind))) => kind,
            Some(Some(other)) => {
                return Err(serde_json::Error::invalid_type(unexpected(&other), &"a string tag").into());
            }
            Some(None) => return Err(serde_json::Error::missing_field("type").into()),
            None => {
                return Err(serde_json::Error::invalid_type(
                    unexpected(&value),
                    &"a widget descriptor object",
                )
                .into());
            }
        };

        let invalid = |error: serde_json::Error| {
            DecodeError::Malformed(serde_json::Error::custom(format_args!(
                "invalid `{kind}` widget: {error}"
            )))
        };
        let widget = match kind.as_str() {
            "button" => Self::Button(serde_json::from_value(value).map_err(invalid)?),
            "label" => Self::Label(serde_json::from_value(value).map_err(invalid)?),
            "checkbox" => Self::Checkbox(serde_json::from_value(value).map_err(invalid)?),
            "textinput" => Self::TextInput(serde_json::from_value(value).map_err(invalid)?),
            "range" => Self::Range(serde_json::from_value(value).map_err(invalid)?),
            "progressbar" => Self::ProgressBar(serde_json::from_value(value).map_err(invalid)?),
            "radio" => Self::Radio(serde_json::from_value(value).map_err(invalid)?),
            "combo" => Self::Combo(serde_json::from_value(value).map_err(invalid)?),
            "container" => {
                let children = take_children(&mut value).map_err(invalid)?;
                let ContainerFields { style } = serde_json::from_value(value).map_err(invalid)?;
                let children = children
                    .into_iter()
                    .map(|child| Self::from_value_at(child, depth + 1, max_depth))
                    .collect::<Result<_, _>>()?;
                Self::Container(Container { style, children })
            }
            "tabs" => {
                let pages = take_children(&mut value).map_err(invalid)?;
                let TabsFields { name, selected } = serde_json::from_value(value).map_err(invalid)?;
                let children = pages
                    .into_iter()
                    .map(|page| Tab::from_value(page, depth + 1, max_depth))
                    .collect::<Result<_, _>>()?;
                Self::Tabs(Tabs {
                    name,
                    selected,
                    children,
                })
            }
            _ => Self::Unknown { kind },
        };
        Ok(widget)
    }
}

impl Tab {
    fn from_value(page: Value, depth: usize, max_depth: usize) -> Result<Self, DecodeError> {
        let mut object = match page {
            Value::Object(object) => object,
            other => {
                return Err(
                    serde_json::Error::invalid_type(unexpected(&other), &"a tab page object").into(),
                );
            }
        };
        let content = object
            .remove("content")
            .ok_or_else(|| serde_json::Error::missing_field("content"))?;
        let title = match object.remove("title") {
            None => String::new(),
            Some(title) => serde_json::from_value(title)?,
        };
        Ok(Self {
            title,
            content: Widget::from_value_at(content, depth, max_depth)?,
        })
    }
}

#[derive(Deserialize)]
struct ContainerFields {
    #[serde(default, deserialize_with = "deserialize_style")]
    style: Style,
}

#[derive(Deserialize)]
struct TabsFields {
    name: String,
    #[serde(default)]
    selected: usize,
}

/// Removes the `children` list from a descriptor object. A missing list is empty.
fn take_children(value: &mut Value) -> Result<Vec<Value>, serde_json::Error> {
    match value.as_object_mut().and_then(|object| object.remove("children")) {
        None => Ok(Vec::new()),
        Some(Value::Array(children)) => Ok(children),
        Some(other) => Err(serde_json::Error::invalid_type(unexpected(&other), &"a sequence")),
    }
}

impl<'de> Deserialize<'de> for Widget {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value, usize::MAX).map_err(|error| match error {
            DecodeError::Malformed(error) => D::Error::custom(error),
            other => D::Error::custom(other),
        })
    }
}

fn unexpected(value: &Value) -> Unexpected<'_> {
    match value {
        Value::Null => Unexpected::Unit,
        Value::Bool(b) => Unexpected::Bool(*b),
        Value::Number(_) => Unexpected::Other("number"),
        Value::String(s) => Unexpected::Str(s),
        Value::Array(_) => Unexpected::Seq,
        Value::Object(_) => Unexpected::Map,
    }
}

macro_rules! impl_into_widget {
    ($($ty:ident),*) => {
        $(
            impl From<$ty> for Widget {
                fn from(value: $ty) -> Self {
                    Self::$ty(value)
                }
            }
        )*
    };
}

impl_into_widget!(
    Button, Label, Container, Checkbox, TextInput, Range, ProgressBar, Radio, Tabs, Combo
);

#[derive(Deserialize)]
#[serde(untagged)]
enum StyleRepr {
    Map(Style),
    Inline(String),
}

fn deserialize_style<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Style, D::Error> {
    match StyleRepr::deserialize(deserializer)? {
        StyleRepr::Map(map) => Ok(map),
        StyleRepr::Inline(css) => Ok(parse_inline_style(&css)),
    }
}

/// Parses `"a: b; c: d;"` into a [`Style`]. Declarations without a colon are dropped.
#[must_use]
pub fn parse_inline_style(css: &str) -> Style {
    css.split(';')
        .filter_map(|declaration| {
            let (property, value) = declaration.split_once(':')?;
            let property = property.trim();
            (!property.is_empty()).then(|| (property.to_string(), value.trim().to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(json: &str) -> Widget {
        serde_json::from_str(json).expect("descriptor should decode")
    }

    #[test]
    fn button_fields_default() {
        let widget = decode(r#"{"type":"button","name":"save"}"#);
        assert_eq!(widget, Widget::Button(Button::new("save")));
        assert_eq!(widget.name(), Some("save"));
    }

    #[test]
    fn nested_container_keeps_order() {
        let widget = decode(
            r#"{"type":"container","style":{"gap":"4px"},"children":[
                {"type":"label","name":"a","text":"A"},
                {"type":"label","name":"b","text":"B"},
                {"type":"label","name":"c","text":"C"}
            ]}"#,
        );
        let Widget::Container(container) = widget else {
            panic!("expected a container");
        };
        let names: Vec<_> = container.children.iter().filter_map(Widget::name).collect();
        assert_eq!(names, ["a", "b", "c"]);
        assert_eq!(container.style["gap"], "4px");
    }

    #[test]
    fn unknown_kind_is_not_an_error() {
        let widget = decode(r#"{"type":"carousel","items":[1,2,3]}"#);
        assert_eq!(
            widget,
            Widget::Unknown {
                kind: "carousel".into()
            }
        );
        assert_eq!(widget.kind(), "carousel");
    }

    #[test]
    fn missing_required_field_is_malformed() {
        let error = serde_json::from_str::<Widget>(r#"{"type":"button","text":"OK"}"#)
            .expect_err("name is required");
        assert!(error.to_string().contains("invalid `button` widget"));
    }

    #[test]
    fn children_must_be_a_sequence() {
        let result = serde_json::from_str::<Widget>(r#"{"type":"container","children":"nope"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn missing_tag_is_malformed() {
        let error = serde_json::from_str::<Widget>(r#"{"name":"x"}"#).expect_err("tag required");
        assert!(error.to_string().contains("type"));
    }

    #[test]
    fn legacy_inline_style() {
        let widget = decode(r#"{"type":"container","style":"flex-direction: column; ;color:red"}"#);
        let Widget::Container(container) = widget else {
            panic!("expected a container");
        };
        assert_eq!(container.style, Container::vertical().style("color", "red").style);
    }

    #[test]
    fn range_defaults() {
        let widget = decode(r#"{"type":"range","name":"volume"}"#);
        assert_eq!(
            widget,
            Widget::Range(Range {
                name: "volume".into(),
                min: 0,
                max: 100,
                value: 0,
            })
        );
    }

    #[test]
    fn choice_widgets_decode() {
        assert_eq!(
            decode(r#"{"type":"radio","name":"size","choices":["S","M","L"],"selected":1}"#),
            Widget::Radio(Radio::new("size").choice("S").choice("M").choice("L").selected(1))
        );
        assert_eq!(
            decode(r#"{"type":"combo","name":"city","choices":["Oslo","Rome"],"opened":true}"#),
            Widget::Combo(Combo {
                name: "city".into(),
                choices: vec!["Oslo".into(), "Rome".into()],
                selected: 0,
                opened: true,
                disabled: false,
            })
        );
    }

    #[test]
    fn tabs_decode_titled_pages() {
        let widget = decode(
            r#"{"type":"tabs","name":"pages","selected":1,"children":[
                {"title":"One","content":{"type":"label","name":"a","text":"A"}},
                {"title":"Two","content":{"type":"button","name":"b"}}
            ]}"#,
        );
        assert_eq!(
            widget,
            Widget::Tabs(
                Tabs::new("pages")
                    .tab("One", Label::new("a").text("A"))
                    .tab("Two", Button::new("b"))
                    .selected(1)
            )
        );
    }

    #[test]
    fn tab_page_without_content_is_malformed() {
        let error = serde_json::from_str::<Widget>(
            r#"{"type":"tabs","name":"pages","children":[{"title":"One"}]}"#,
        )
        .expect_err("content is required");
        assert!(error.to_string().contains("content"));
    }

    fn chain(depth: usize) -> Value {
        let mut value = serde_json::json!({"type": "label", "name": "leaf"});
        for _ in 1..depth {
            value = serde_json::json!({"type": "container", "children": [value]});
        }
        value
    }

    #[test]
    fn depth_limit_applies_while_decoding() {
        let widget = Widget::from_value(chain(200), 256).expect("within the limit");
        assert_eq!(widget.kind(), "container");

        assert!(matches!(
            Widget::from_value(chain(5), 4),
            Err(DecodeError::TooDeep { limit: 4 })
        ));
        assert!(Widget::from_value(chain(4), 4).is_ok());
    }
}

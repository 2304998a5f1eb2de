//! Maps widget descriptors onto virtual nodes.
//!
//! Rendering is pure: no live tree access and no message sending. Interactive
//! widgets get [`Handler`] records instead of closures.

use crate::{
    error::RenderError,
    message::MessageKind,
    vnode::{Element, Handler, ValueSource, VirtualNode},
    widget::{
        Button, Checkbox, Combo, Container, Label, ProgressBar, Radio, Range, Tabs, TextInput, Widget,
    },
};

/// Attribute recording which widget kind a live element was rendered from.
///
/// The patcher treats it as part of node identity, so a label turning into a
/// container is replaced even though both are `div`s.
pub const WIDGET_ATTRIBUTE: &str = "data-widget";

/// Default for [`RenderOptions::max_depth`].
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Renderer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Deepest widget nesting accepted before the cycle is aborted.
    pub max_depth: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Walks widget trees and produces virtual trees.
#[derive(Debug, Default, Clone)]
pub struct Renderer {
    options: RenderOptions,
}

impl Renderer {
    /// Creates a renderer with default options.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            options: RenderOptions {
                max_depth: DEFAULT_MAX_DEPTH,
            },
        }
    }

    /// Creates a renderer with the given options.
    #[must_use]
    pub const fn with_options(options: RenderOptions) -> Self {
        Self { options }
    }

    /// Returns the active options.
    #[must_use]
    pub const fn options(&self) -> RenderOptions {
        self.options
    }

    /// Renders a widget tree.
    ///
    /// Unknown widget kinds become hidden placeholders and never fail.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::TooDeep`] when the tree nests deeper than
    /// [`RenderOptions::max_depth`]. No partial tree is returned.
    pub fn render(&self, widget: &Widget) -> Result<VirtualNode, RenderError> {
        self.render_at(widget, 1)
    }

    fn render_at(&self, widget: &Widget, depth: usize) -> Result<VirtualNode, RenderError> {
        if depth > self.options.max_depth {
            return Err(RenderError::TooDeep {
                limit: self.options.max_depth,
            });
        }

        let element = match widget {
            Widget::Button(button) => render_button(button),
            Widget::Label(label) => render_label(label),
            Widget::Container(container) => self.render_container(container, depth)?,
            Widget::Checkbox(checkbox) => render_checkbox(checkbox),
            Widget::TextInput(input) => render_text_input(input),
            Widget::Range(range) => render_range(range),
            Widget::ProgressBar(progress) => render_progress_bar(progress),
            Widget::Radio(radio) => render_radio(radio),
            Widget::Tabs(tabs) => self.render_tabs(tabs, depth)?,
            Widget::Combo(combo) => render_combo(combo),
            Widget::Unknown { kind } => {
                tracing::warn!(%kind, "widget kind is not supported by this build; rendering a placeholder");
                Element::new("div").attr("hidden", true)
            }
        };
        Ok(element.attr(WIDGET_ATTRIBUTE, widget.kind()).into())
    }

    fn render_container(&self, container: &Container, depth: usize) -> Result<Element, RenderError> {
        let children = container
            .children
            .iter()
            .map(|child| self.render_at(child, depth + 1))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Element {
            children,
            ..Element::new("div")
                .class("container")
                .attr("style", container.style.clone())
        })
    }

    /// Only the selected page is rendered; an out of range selection shows
    /// an empty page.
    fn render_tabs(&self, tabs: &Tabs, depth: usize) -> Result<Element, RenderError> {
        let titles = tabs.children.iter().enumerate().fold(
            Element::new("div").class("tab-titles"),
            |row, (index, tab)| {
                row.child(
                    Element::new("div")
                        .class(&class_list(&[("tab-title", true), ("selected", index == tabs.selected)]))
                        .on("click", Handler::constant(MessageKind::Click, &tabs.name, index.to_string()))
                        .child(VirtualNode::text(&tab.title)),
                )
            },
        );
        let mut page = Element::new("div").class("tab");
        if let Some(tab) = tabs.children.get(tabs.selected) {
            page = page.child(self.render_at(&tab.content, depth + 1)?);
        }
        Ok(Element::new("div").class("tabs").child(titles).child(page))
    }
}

/// Renders with [`RenderOptions::default`].
///
/// # Errors
///
/// See [`Renderer::render`].
pub fn render(widget: &Widget) -> Result<VirtualNode, RenderError> {
    Renderer::new().render(widget)
}

fn render_button(button: &Button) -> Element {
    Element::new("button")
        .attr("disabled", button.disabled)
        .on("click", Handler::click(&button.name))
        .child(VirtualNode::text(&button.text))
}

fn render_label(label: &Label) -> Element {
    Element::new("div")
        .class("label")
        .on("click", Handler::click(&label.name))
        .child(VirtualNode::text(&label.text))
}

fn render_checkbox(checkbox: &Checkbox) -> Element {
    let input = Element::new("input")
        .attr("type", "checkbox")
        .attr("checked", checkbox.checked)
        .on(
            "change",
            Handler::change(&checkbox.name, ValueSource::TargetChecked),
        );
    Element::new("label")
        .class("checkbox")
        .child(input)
        .child(VirtualNode::text(&checkbox.text))
}

fn render_text_input(input: &TextInput) -> Element {
    Element::new("div").class("textinput").child(
        Element::new("input")
            .attr("type", "text")
            .attr("value", input.value.as_str())
            .on("change", Handler::change(&input.name, ValueSource::TargetValue)),
    )
}

fn render_range(range: &Range) -> Element {
    Element::new("div").class("range").child(
        Element::new("input")
            .attr("type", "range")
            .attr("min", range.min.to_string())
            .attr("max", range.max.to_string())
            .attr("value", range.value.to_string())
            .on("input", Handler::change(&range.name, ValueSource::TargetValue)),
    )
}

fn render_progress_bar(progress: &ProgressBar) -> Element {
    let percent = if progress.value.is_nan() {
        0.0
    } else {
        progress.value.clamp(0.0, 100.0)
    };
    Element::new("div")
        .class("progressbar")
        .on("click", Handler::click(&progress.name))
        .child(
            Element::new("div")
                .class("inner-progressbar")
                .attr("style", format!("width: {percent}%;")),
        )
}

fn render_radio(radio: &Radio) -> Element {
    radio.choices.iter().enumerate().fold(
        Element::new("div").class("radio-group"),
        |group, (index, choice)| {
            let selected = index == radio.selected;
            group.child(
                Element::new("div")
                    .class("radio")
                    .on("click", Handler::constant(MessageKind::Click, &radio.name, index.to_string()))
                    .child(
                        Element::new("div")
                            .class(&class_list(&[("radio-outer", true), ("selected", selected)]))
                            .child(
                                Element::new("div")
                                    .class(&class_list(&[("radio-inner", true), ("selected", selected)])),
                            ),
                    )
                    .child(Element::new("label").child(VirtualNode::text(choice))),
            )
        },
    )
}

fn render_combo(combo: &Combo) -> Element {
    let press = |value: String| {
        (!combo.disabled).then(|| Handler::constant(MessageKind::Change, &combo.name, value))
    };
    let caption = combo.choices.get(combo.selected).map_or("", String::as_str);
    let button = with_handler(
        Element::new("div")
            .class(&class_list(&[
                ("combo-button", true),
                ("opened", combo.opened),
                ("disabled", combo.disabled),
            ]))
            .child(VirtualNode::text(caption)),
        "mousedown",
        press("-1".to_string()),
    );
    let combo_root = Element::new("div").class("combo").child(button);
    if !combo.opened {
        return combo_root;
    }

    let last = combo.choices.len().saturating_sub(1);
    let choices = combo.choices.iter().enumerate().fold(
        Element::new("div").class("combo-choices"),
        |list, (index, choice)| {
            list.child(with_handler(
                Element::new("div")
                    .class(&class_list(&[("combo-choice", true), ("last", index == last)]))
                    .child(VirtualNode::text(choice)),
                "mousedown",
                press(index.to_string()),
            ))
        },
    );
    combo_root.child(choices)
}

fn with_handler(element: Element, event: &str, handler: Option<Handler>) -> Element {
    match handler {
        Some(handler) => element.on(event, handler),
        None => element,
    }
}

/// Joins the enabled class names with spaces.
fn class_list(classes: &[(&str, bool)]) -> String {
    classes
        .iter()
        .filter(|(_, enabled)| *enabled)
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(" ")
}

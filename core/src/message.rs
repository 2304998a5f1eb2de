//! Messages crossing the host boundary.
//!
//! Inbound, the host pushes [`Instruction`]s. Outbound, the frontend sends
//! [`HostMessage`]s through the [`EventBridge`](crate::EventBridge).

use serde::{Deserialize, Serialize, de::Error as _};
use serde_json::Value;

use crate::{error::DecodeError, render::DEFAULT_MAX_DEPTH, widget::Widget};

/// What happened on the frontend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// The page finished loading.
    Init,
    /// A widget was clicked.
    Click,
    /// A widget's value changed.
    Change,
}

impl MessageKind {
    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Click => "click",
            Self::Change => "change",
        }
    }
}

/// Outbound envelope. Absent optional fields are never serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostMessage {
    /// Message kind.
    pub kind: MessageKind,
    /// Correlation key of the originating widget.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Payload such as the new value of an input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl HostMessage {
    /// The lifecycle message sent once when the page loads.
    #[must_use]
    pub fn init() -> Self {
        Self {
            kind: MessageKind::Init,
            source: Some("app".to_string()),
            value: None,
        }
    }

    /// A click on the widget named `source`.
    pub fn click(source: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Click,
            source: Some(source.into()),
            value: None,
        }
    }

    /// A value change on the widget named `source`.
    pub fn change(source: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Change,
            source: Some(source.into()),
            value: Some(value.into()),
        }
    }
}

/// A host push.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// Replace the displayed tree.
    Update(Widget),
}

impl Instruction {
    /// Decodes a raw host push with the default depth limit.
    ///
    /// See [`Self::decode_with_depth`].
    ///
    /// # Errors
    ///
    /// See [`Self::decode_with_depth`].
    pub fn decode(payload: &str) -> Result<Self, DecodeError> {
        Self::decode_with_depth(payload, DEFAULT_MAX_DEPTH)
    }

    /// Decodes a raw host push, refusing widget trees nested deeper than
    /// `max_depth`.
    ///
    /// The typed envelope `{"type": "Update", "tree": ...}` is the current
    /// form; instruction names are capitalised. Any other object is taken as a
    /// bare widget tree, still accepted for older hosts.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Malformed`] when the payload is not a valid
    /// widget tree, [`DecodeError::TooDeep`] when it nests too deeply and
    /// [`DecodeError::UnsupportedInstruction`] when an envelope names an
    /// instruction other than `Update`.
    pub fn decode_with_depth(payload: &str, max_depth: usize) -> Result<Self, DecodeError> {
        // Two JSON levels per widget, plus the envelope and a style map.
        if nesting_exceeds(payload, max_depth.saturating_mul(2).saturating_add(2)) {
            return Err(DecodeError::TooDeep { limit: max_depth });
        }
        let mut deserializer = serde_json::Deserializer::from_str(payload);
        deserializer.disable_recursion_limit();
        let mut value = Value::deserialize(&mut deserializer)?;
        deserializer.end()?;

        let instruction = value
            .get("type")
            .and_then(Value::as_str)
            .filter(|name| name.starts_with(|c: char| c.is_ascii_uppercase()))
            .map(str::to_string);
        if let Some(name) = instruction {
            if name != "Update" {
                return Err(DecodeError::UnsupportedInstruction(name));
            }
            let tree = value
                .as_object_mut()
                .and_then(|object| object.remove("tree"))
                .ok_or_else(|| serde_json::Error::missing_field("tree"))?;
            return Ok(Self::Update(Widget::from_value(tree, max_depth)?));
        }

        let widget = Widget::from_value(value, max_depth)?;
        tracing::warn!(
            kind = widget.kind(),
            "host pushed a bare widget tree; wrap it in an `Update` instruction"
        );
        Ok(Self::Update(widget))
    }

    /// Returns the widget tree carried by this instruction.
    #[must_use]
    pub fn into_tree(self) -> Widget {
        match self {
            Self::Update(tree) => tree,
        }
    }
}

/// Whether arrays and objects in `payload` nest deeper than `limit`.
///
/// Runs before parsing so the recursive parser never sees hostile nesting.
fn nesting_exceeds(payload: &str, limit: usize) -> bool {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for byte in payload.bytes() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' | b'[' => {
                depth += 1;
                if depth > limit {
                    return true;
                }
            }
            b'}' | b']' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::Label;

    #[test]
    fn typed_envelope() {
        let instruction =
            Instruction::decode(r#"{"type":"Update","tree":{"type":"label","name":"l","text":"hi"}}"#)
                .expect("envelope should decode");
        assert_eq!(
            instruction.into_tree(),
            Widget::Label(Label::new("l").text("hi"))
        );
    }

    #[test]
    fn bare_tree_alias() {
        let instruction = Instruction::decode(r#"{"type":"label","name":"l"}"#)
            .expect("bare tree should decode");
        assert_eq!(instruction, Instruction::Update(Label::new("l").into()));
    }

    #[test]
    fn unsupported_envelope() {
        let error = Instruction::decode(r#"{"type":"Close","tree":{}}"#)
            .expect_err("only Update is handled");
        assert!(matches!(error, DecodeError::UnsupportedInstruction(name) if name == "Close"));
    }

    #[test]
    fn malformed_payloads() {
        assert!(matches!(
            Instruction::decode("not json"),
            Err(DecodeError::Malformed(_))
        ));
        assert!(matches!(
            Instruction::decode("[1, 2]"),
            Err(DecodeError::Malformed(_))
        ));
        assert!(matches!(
            Instruction::decode(r#"{"type":"Update","tree":{"type":"button"}}"#),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn message_shape() {
        let encoded = serde_json::to_string(&HostMessage::click("save")).expect("serializable");
        assert_eq!(encoded, r#"{"kind":"click","source":"save"}"#);
        let encoded = serde_json::to_string(&HostMessage::change("volume", "7")).expect("serializable");
        assert_eq!(encoded, r#"{"kind":"change","source":"volume","value":"7"}"#);
    }

    #[test]
    fn bare_unknown_widget_with_a_tree_field_is_a_placeholder() {
        let instruction = Instruction::decode(r#"{"type":"treeview","tree":{"root":"a"}}"#)
            .expect("bare unknown widget should decode");
        assert_eq!(
            instruction.into_tree(),
            Widget::Unknown {
                kind: "treeview".into()
            }
        );
    }

    #[test]
    fn envelope_without_tree_is_malformed() {
        assert!(matches!(
            Instruction::decode(r#"{"type":"Update"}"#),
            Err(DecodeError::Malformed(_))
        ));
    }

    fn chain(depth: usize) -> String {
        let mut json = r#"{"type":"label","name":"leaf","text":"deep"}"#.to_string();
        for _ in 1..depth {
            json = format!(r#"{{"type":"container","style":{{"gap":"1px"}},"children":[{json}]}}"#);
        }
        format!(r#"{{"type":"Update","tree":{json}}}"#)
    }

    #[test]
    fn trees_up_to_the_depth_limit_decode() {
        assert!(Instruction::decode(&chain(100)).is_ok());
        assert!(Instruction::decode(&chain(DEFAULT_MAX_DEPTH)).is_ok());
        assert!(matches!(
            Instruction::decode(&chain(DEFAULT_MAX_DEPTH + 1)),
            Err(DecodeError::TooDeep { limit: DEFAULT_MAX_DEPTH })
        ));
        assert!(Instruction::decode_with_depth(&chain(4), 4).is_ok());
        assert!(matches!(
            Instruction::decode_with_depth(&chain(5), 4),
            Err(DecodeError::TooDeep { limit: 4 })
        ));
    }

    #[test]
    fn hostile_nesting_is_refused_before_parsing() {
        let payload = "[".repeat(100_000);
        assert!(matches!(
            Instruction::decode(&payload),
            Err(DecodeError::TooDeep { .. })
        ));
        assert!(!nesting_exceeds(r#"{"text":"[[[[[[\"]]"}"#, 1));
    }
}

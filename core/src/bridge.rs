//! Outbound, fire-and-forget messaging to the host.

use std::{cell::RefCell, rc::Rc};

use serde::Serialize;

use crate::{
    error::ChannelError,
    message::{HostMessage, MessageKind},
};

/// The host's one-way send primitive.
pub trait Channel {
    /// Hands an encoded message to the host.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError`] when the primitive is missing or throws.
    fn send(&self, payload: &str) -> Result<(), ChannelError>;
}

impl<C: Channel + ?Sized> Channel for Rc<C> {
    fn send(&self, payload: &str) -> Result<(), ChannelError> {
        (**self).send(payload)
    }
}

/// Top-level key naming the message kind on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MessageEncoding {
    /// `{"kind": ..., "source": ..., "value": ...}`
    #[default]
    Envelope,
    /// `{"event": ..., "source": ..., "value": ...}`, understood by older hosts.
    LegacyEvent,
}

#[derive(Serialize)]
struct LegacyEvent<'a> {
    event: MessageKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<&'a str>,
}

/// Serializes [`HostMessage`]s and sends them over a [`Channel`].
#[derive(Debug, Clone)]
pub struct EventBridge<C> {
    channel: C,
    encoding: MessageEncoding,
}

impl<C: Channel> EventBridge<C> {
    /// Creates a bridge using [`MessageEncoding::Envelope`].
    pub const fn new(channel: C) -> Self {
        Self {
            channel,
            encoding: MessageEncoding::Envelope,
        }
    }

    /// Selects the wire encoding.
    #[must_use]
    pub const fn with_encoding(mut self, encoding: MessageEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Encodes a message. Keys appear as `kind`, `source`, `value`; absent
    /// optional fields are omitted.
    ///
    /// # Errors
    ///
    /// Only if serialization itself fails.
    pub fn encode(&self, message: &HostMessage) -> Result<String, serde_json::Error> {
        match self.encoding {
            MessageEncoding::Envelope => serde_json::to_string(message),
            MessageEncoding::LegacyEvent => serde_json::to_string(&LegacyEvent {
                event: message.kind,
                source: message.source.as_deref(),
                value: message.value.as_deref(),
            }),
        }
    }

    /// Sends a message. Failures are logged and otherwise ignored.
    pub fn invoke(&self, message: &HostMessage) {
        let payload = match self.encode(message) {
            Ok(payload) => payload,
            Err(error) => {
                tracing::error!(%error, kind = message.kind.as_str(), "failed to encode host message");
                return;
            }
        };
        if let Err(error) = self.channel.send(&payload) {
            tracing::warn!(%error, kind = message.kind.as_str(), "dropping host message");
        }
    }
}

/// A channel that keeps every payload it is handed.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    sent: Rc<RefCell<Vec<String>>>,
}

impl Recorder {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw payloads in send order.
    #[must_use]
    pub fn payloads(&self) -> Vec<String> {
        self.sent.borrow().clone()
    }

    /// Payloads decoded as envelopes. Payloads in another encoding are skipped.
    #[must_use]
    pub fn messages(&self) -> Vec<HostMessage> {
        self.sent
            .borrow()
            .iter()
            .filter_map(|payload| serde_json::from_str(payload).ok())
            .collect()
    }
}

impl Channel for Recorder {
    fn send(&self, payload: &str) -> Result<(), ChannelError> {
        self.sent.borrow_mut().push(payload.to_string());
        Ok(())
    }
}

/// A channel whose host never attached a send primitive.
#[derive(Debug, Clone, Copy, Default)]
pub struct Disconnected;

impl Channel for Disconnected {
    fn send(&self, _payload: &str) -> Result<(), ChannelError> {
        Err(ChannelError("no host channel attached".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_key_order_and_omission() {
        let recorder = Recorder::new();
        let bridge = EventBridge::new(recorder.clone());
        bridge.invoke(&HostMessage::init());
        bridge.invoke(&HostMessage::change("name", "Ada"));
        assert_eq!(
            recorder.payloads(),
            [
                r#"{"kind":"init","source":"app"}"#,
                r#"{"kind":"change","source":"name","value":"Ada"}"#,
            ]
        );
    }

    #[test]
    fn legacy_encoding() {
        let recorder = Recorder::new();
        let bridge = EventBridge::new(recorder.clone()).with_encoding(MessageEncoding::LegacyEvent);
        bridge.invoke(&HostMessage::click("save"));
        assert_eq!(recorder.payloads(), [r#"{"event":"click","source":"save"}"#]);
        assert!(recorder.messages().is_empty());
    }

    #[test]
    fn unavailable_channel_is_swallowed() {
        let bridge = EventBridge::new(Disconnected);
        bridge.invoke(&HostMessage::click("save"));
    }
}

//! Error types shared by the rendering pipeline.

use thiserror::Error;

/// A host push could not be turned into a widget tree.
///
/// Decoding happens before anything is rendered, so a failure here aborts the
/// current cycle and leaves the live tree exactly as it was.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The payload is not valid JSON or a widget is missing a required field.
    #[error("malformed widget descriptor: {0}")]
    Malformed(#[from] serde_json::Error),
    /// A typed envelope names an instruction this frontend does not handle.
    #[error("unsupported instruction `{0}`")]
    UnsupportedInstruction(String),
    /// The pushed tree nests deeper than [`RenderOptions::max_depth`](crate::RenderOptions).
    #[error("widget tree exceeds the maximum depth of {limit}")]
    TooDeep {
        /// The configured limit.
        limit: usize,
    },
}

/// The renderer refused to build a virtual tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// The widget tree nests deeper than [`RenderOptions::max_depth`](crate::RenderOptions).
    #[error("widget tree exceeds the maximum depth of {limit}")]
    TooDeep {
        /// The configured limit.
        limit: usize,
    },
}

/// A live tree operation failed while patching.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchError {
    /// The backend rejected an operation.
    #[error("live tree operation `{op}` failed: {message}")]
    Backend {
        /// Name of the failing operation.
        op: &'static str,
        /// Backend supplied detail.
        message: String,
    },
    /// The node handed to the patcher is no longer part of the tree.
    #[error("live node is detached from the tree")]
    Detached,
}

impl PatchError {
    /// Creates a [`PatchError::Backend`] for the named operation.
    pub fn backend(op: &'static str, message: impl Into<String>) -> Self {
        Self::Backend {
            op,
            message: message.into(),
        }
    }
}

/// The host send primitive is missing or threw.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("host channel unavailable: {0}")]
pub struct ChannelError(pub String);

/// Umbrella error returned by [`App`](crate::App).
#[derive(Debug, Error)]
pub enum Error {
    /// See [`DecodeError`].
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// See [`RenderError`].
    #[error(transparent)]
    Render(#[from] RenderError),
    /// See [`PatchError`].
    #[error(transparent)]
    Patch(#[from] PatchError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(
            RenderError::TooDeep { limit: 4 }.to_string(),
            "widget tree exceeds the maximum depth of 4"
        );
        assert_eq!(
            PatchError::backend("append_child", "boom").to_string(),
            "live tree operation `append_child` failed: boom"
        );
        assert_eq!(
            ChannelError("no invoke".into()).to_string(),
            "host channel unavailable: no invoke"
        );
    }

    #[test]
    fn umbrella_is_transparent() {
        let error = Error::from(DecodeError::UnsupportedInstruction("Close".into()));
        assert_eq!(error.to_string(), "unsupported instruction `Close`");
    }
}

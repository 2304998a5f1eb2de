use core::fmt;

use neutrino_core::PatchError;

/// Error type produced by the web backend.
#[derive(Debug)]
pub enum WebError {
    /// The DOM APIs are not accessible (e.g., when executed outside of a browser).
    DomUnavailable,
    /// The requested mounting node cannot be located.
    RootNotFound(String),
    /// Wrapper around JavaScript exceptions.
    Js(String),
    /// A render cycle failed in the core pipeline.
    Pipeline(neutrino_core::Error),
}

impl fmt::Display for WebError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DomUnavailable => write!(f, "DOM is not available"),
            Self::RootNotFound(id) => write!(f, "Failed to find DOM element with id `{id}`"),
            Self::Js(msg) => write!(f, "JavaScript error: {msg}"),
            Self::Pipeline(error) => write!(f, "render cycle failed: {error}"),
        }
    }
}

impl std::error::Error for WebError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Pipeline(error) => Some(error),
            _ => None,
        }
    }
}

impl From<wasm_bindgen::JsValue> for WebError {
    fn from(value: wasm_bindgen::JsValue) -> Self {
        Self::Js(describe(&value))
    }
}

impl From<neutrino_core::Error> for WebError {
    fn from(value: neutrino_core::Error) -> Self {
        Self::Pipeline(value)
    }
}

impl From<WebError> for wasm_bindgen::JsValue {
    fn from(value: WebError) -> Self {
        match value {
            WebError::Js(msg) => Self::from(msg),
            other => Self::from(other.to_string()),
        }
    }
}

/// Best effort text for a thrown JavaScript value.
pub(crate) fn describe(value: &wasm_bindgen::JsValue) -> String {
    value
        .as_string()
        .unwrap_or_else(|| format!("{value:?}"))
}

/// Maps a JavaScript exception thrown by a live tree operation.
pub(crate) fn patch_error(op: &'static str) -> impl FnOnce(wasm_bindgen::JsValue) -> PatchError {
    move |value| PatchError::backend(op, describe(&value))
}

use js_sys::{Function, Reflect};
use neutrino_core::{Channel, ChannelError};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::Window;

use crate::error::describe;

/// Send primitives looked up on `window`, in order.
const ENDPOINTS: [(&str, &str); 2] = [("external", "invoke"), ("ipc", "postMessage")];

/// The webview's one-way send primitive.
///
/// Classic webview hosts expose `window.external.invoke(string)`; newer
/// runtimes expose `window.ipc.postMessage(string)`. The first one found at
/// send time is used.
#[derive(Debug, Clone)]
pub struct HostChannel {
    window: Window,
}

impl HostChannel {
    /// Creates a channel bound to `window`.
    #[must_use]
    pub const fn new(window: Window) -> Self {
        Self { window }
    }

    fn endpoint(&self) -> Option<(JsValue, Function)> {
        ENDPOINTS.iter().find_map(|(object, method)| {
            let object = Reflect::get(&self.window, &JsValue::from_str(object)).ok()?;
            if object.is_undefined() || object.is_null() {
                return None;
            }
            let function = Reflect::get(&object, &JsValue::from_str(method))
                .ok()?
                .dyn_into::<Function>()
                .ok()?;
            Some((object, function))
        })
    }
}

impl Channel for HostChannel {
    fn send(&self, payload: &str) -> Result<(), ChannelError> {
        let (object, function) = self
            .endpoint()
            .ok_or_else(|| ChannelError("the host exposes no invoke primitive".to_string()))?;
        function
            .call1(&object, &JsValue::from_str(payload))
            .map_err(|error| ChannelError(describe(&error)))?;
        Ok(())
    }
}

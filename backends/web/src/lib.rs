#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Browser backend for the Neutrino rendering bridge.
//!
//! [`WebApp`] binds the core pipeline to a mounting element: [`DomTree`]
//! implements the live tree over `web-sys`, [`HostChannel`] forwards
//! messages to the webview host, and [`EventDelegate`] turns DOM events into
//! host messages using the handler records the patcher stored on each node.
//!
//! The host drives rendering by evaluating `render(<json>)` in the page, the
//! same entry point classic webview hosts already call.

mod app;
mod channel;
mod dom;
mod error;
mod events;

pub use app::{DEFAULT_ROOT_ID, RENDER_HOOK, WebApp, WebAppBuilder};
pub use channel::HostChannel;
pub use dom::{DomRoot, DomTree};
pub use error::WebError;
pub use events::{DELEGATED_EVENTS, EventDelegate};

#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Rendering core of the Neutrino webview frontend.
//!
//! The host pushes a [`Widget`] tree; the [`Renderer`] turns it into a
//! [`VirtualNode`] tree; a [`RenderTarget`] patches its [`LiveTree`] to match;
//! user interaction travels back through the [`EventBridge`] as
//! [`HostMessage`]s. [`App`] runs that cycle.
//!
//! Nothing here touches a browser. The web backend implements [`LiveTree`]
//! and [`Channel`] on top of the DOM; [`MemoryTree`] and [`Recorder`] do the
//! same in-process.

mod app;
pub mod bridge;
pub mod error;
pub mod memory;
pub mod message;
pub mod patch;
pub mod render;
pub mod vnode;
pub mod widget;

#[cfg(test)]
mod tests;

pub use app::App;
pub use bridge::{Channel, Disconnected, EventBridge, MessageEncoding, Recorder};
pub use error::{ChannelError, DecodeError, Error, PatchError, RenderError};
pub use memory::{MemoryTree, Mutation, NodeId};
pub use message::{HostMessage, Instruction, MessageKind};
pub use patch::{LiveTree, PatchSummary, RenderTarget};
pub use render::{RenderOptions, Renderer, render};
pub use vnode::{AttributeValue, Element, Handler, ValueSource, VirtualNode};
pub use widget::Widget;

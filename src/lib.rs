#![doc = include_str!("../README.md")]
#![allow(clippy::multiple_crate_versions)]

pub mod logging;

#[doc(inline)]
pub use neutrino_core::*;

/// Browser backend, available on `wasm32` targets.
#[cfg(target_arch = "wasm32")]
pub use neutrino_web as web;

/// Installs logging and runs a [`web::WebApp`] mounted on `#app` for the
/// lifetime of the page, creating the element when the page lacks it.
///
/// # Errors
///
/// Returns an error when the DOM is unavailable or rejects the mount.
#[cfg(target_arch = "wasm32")]
pub fn launch() -> Result<(), web::WebError> {
    logging::install();
    web::WebAppBuilder::new()
        .create_root_if_missing(true)
        .build()?
        .run()
}

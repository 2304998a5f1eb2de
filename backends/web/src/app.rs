use std::{cell::RefCell, rc::Rc};

use neutrino_core::{
    App, EventBridge, MessageEncoding, PatchSummary, RenderOptions, RenderTarget, Renderer,
};
use wasm_bindgen::{JsCast, JsValue, closure::Closure};

use crate::{
    channel::HostChannel,
    dom::{DomRoot, DomTree},
    error::WebError,
    events::EventDelegate,
};

/// Default id of the mounting element.
pub const DEFAULT_ROOT_ID: &str = "app";

/// Name of the global function the host evaluates to push a tree.
pub const RENDER_HOOK: &str = "render";

type Pipeline = App<DomTree, HostChannel>;

/// Builder for [`WebApp`].
#[derive(Debug, Clone)]
pub struct WebAppBuilder {
    root_id: String,
    create_root: bool,
    inject_default_styles: bool,
    encoding: MessageEncoding,
    render_options: RenderOptions,
}

impl Default for WebAppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl WebAppBuilder {
    /// Creates a new builder with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root_id: DEFAULT_ROOT_ID.to_string(),
            create_root: false,
            inject_default_styles: true,
            encoding: MessageEncoding::Envelope,
            render_options: RenderOptions::default(),
        }
    }

    /// Sets the DOM element identifier that should host the application.
    #[must_use]
    pub fn with_root_id(mut self, id: impl Into<String>) -> Self {
        self.root_id = id.into();
        self
    }

    /// Creates the mounting element under `<body>` when it does not exist.
    #[must_use]
    pub const fn create_root_if_missing(mut self, create: bool) -> Self {
        self.create_root = create;
        self
    }

    /// Controls whether the backend injects the default stylesheet.
    #[must_use]
    pub const fn inject_default_styles(mut self, inject: bool) -> Self {
        self.inject_default_styles = inject;
        self
    }

    /// Selects the outbound message encoding.
    #[must_use]
    pub const fn with_encoding(mut self, encoding: MessageEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Limits how deeply host trees may nest.
    #[must_use]
    pub const fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.render_options.max_depth = max_depth;
        self
    }

    /// Finalises the builder and creates a [`WebApp`].
    ///
    /// # Errors
    ///
    /// Returns an error if the DOM root element cannot be found or initialized.
    pub fn build(self) -> Result<WebApp, WebError> {
        WebApp::new_with_options(self)
    }
}

/// Entry point for running the rendering bridge inside the webview.
///
/// Dropping the app detaches its listeners and the global render hook; use
/// [`WebApp::run`] to keep it alive for the lifetime of the page.
#[wasm_bindgen]
#[derive(Debug)]
pub struct WebApp {
    root: DomRoot,
    pipeline: Rc<RefCell<Pipeline>>,
    delegate: Option<EventDelegate>,
    render_hook: Option<Closure<dyn FnMut(String)>>,
    load_hook: Option<Closure<dyn FnMut()>>,
}

impl WebApp {
    #[allow(clippy::needless_pass_by_value)]
    fn new_with_options(builder: WebAppBuilder) -> Result<Self, WebError> {
        let root = DomRoot::new(
            &builder.root_id,
            builder.create_root,
            builder.inject_default_styles,
        )?;
        let target = RenderTarget::new(DomTree::new(root.document().clone()), root.element().clone().into());
        let bridge = EventBridge::new(HostChannel::new(root.window().clone())).with_encoding(builder.encoding);
        let pipeline = App::new(target, bridge).with_renderer(Renderer::with_options(builder.render_options));
        Ok(Self {
            root,
            pipeline: Rc::new(RefCell::new(pipeline)),
            delegate: None,
            render_hook: None,
            load_hook: None,
        })
    }

    /// Runs one host push through the pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error when the push cannot be decoded or rendered, or when a
    /// DOM mutation throws. The view is left untouched in the first two cases.
    pub fn render_instruction(&self, payload: &str) -> Result<PatchSummary, WebError> {
        let mut pipeline = self
            .pipeline
            .try_borrow_mut()
            .map_err(|_| WebError::Js("a host push is already being applied".to_string()))?;
        Ok(pipeline.handle(payload)?)
    }

    /// Provides access to the DOM root.
    #[must_use]
    pub const fn root(&self) -> &DomRoot {
        &self.root
    }

    fn install_render_hook(&mut self) -> Result<(), WebError> {
        let pipeline = Rc::clone(&self.pipeline);
        let hook = Closure::<dyn FnMut(String)>::new(move |payload: String| {
            let Ok(mut pipeline) = pipeline.try_borrow_mut() else {
                tracing::warn!("host pushed a tree while another push was being applied; dropping it");
                return;
            };
            // Failures are already logged by the pipeline; the host has no way to act on them.
            let _ = pipeline.handle(&payload);
        });
        js_sys::Reflect::set(
            self.root.window(),
            &JsValue::from_str(RENDER_HOOK),
            hook.as_ref(),
        )?;
        self.render_hook = Some(hook);
        Ok(())
    }

    fn announce_on_load(&mut self) -> Result<(), WebError> {
        if self.root.document().ready_state() == "complete" {
            announce(&self.pipeline);
            return Ok(());
        }
        let pipeline = Rc::clone(&self.pipeline);
        let hook = Closure::<dyn FnMut()>::new(move || announce(&pipeline));
        self.root
            .window()
            .add_event_listener_with_callback("load", hook.as_ref().unchecked_ref())?;
        self.load_hook = Some(hook);
        Ok(())
    }
}

/// Sends `init` once, outside the pipeline borrow: hosts may answer it by
/// calling the render hook before `invoke` returns.
fn announce(pipeline: &Rc<RefCell<Pipeline>>) {
    let pending = {
        let mut app = pipeline.borrow_mut();
        app.take_init().map(|message| (message, app.bridge().clone()))
    };
    if let Some((message, bridge)) = pending {
        bridge.invoke(&message);
    }
}

use wasm_bindgen::prelude::*;

#[wasm_bindgen]
impl WebApp {
    /// Convenience constructor exposed to JavaScript callers.
    #[wasm_bindgen(constructor)]
    /// Creates a new [`WebApp`] using the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the DOM root element cannot be found or initialized.
    pub fn new() -> Result<Self, WebError> {
        Self::new_with_options(WebAppBuilder::new())
    }

    /// Mounts the application: clears the root, installs event delegation,
    /// exposes `window.render` to the host and sends `init` once the page has
    /// loaded. Mounting twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the DOM rejects any of the above.
    #[wasm_bindgen]
    pub fn mount(&mut self) -> Result<(), WebError> {
        if self.delegate.is_some() {
            return Ok(());
        }
        console_error_panic_hook::set_once();
        self.root.add_class("neutrino-root")?;
        self.root.clear()?;

        let delegate = {
            let pipeline = self.pipeline.borrow();
            EventDelegate::install(self.root.element(), pipeline.target().tree(), pipeline.bridge())?
        };
        self.delegate = Some(delegate);
        self.install_render_hook()?;
        self.announce_on_load()?;
        tracing::info!("mounted");
        Ok(())
    }

    /// Pushes a host instruction (JSON) through the pipeline.
    ///
    /// # Errors
    ///
    /// See [`WebApp::render_instruction`].
    #[wasm_bindgen]
    pub fn render(&self, payload: &str) -> Result<(), WebError> {
        self.render_instruction(payload).map(|_| ())
    }

    /// Whether the `init` message has been sent.
    #[wasm_bindgen(getter)]
    #[must_use]
    pub fn started(&self) -> bool {
        self.pipeline.borrow().is_started()
    }

    /// Mounts the app and keeps it alive for the lifetime of the page.
    ///
    /// # Errors
    ///
    /// See [`WebApp::mount`].
    #[wasm_bindgen]
    pub fn run(mut self) -> Result<(), WebError> {
        self.mount()?;
        std::mem::forget(self);
        Ok(())
    }
}

use crate::{
    bridge::{Channel, EventBridge},
    error::Error,
    memory::{MemoryTree, NodeId},
    message::{HostMessage, Instruction},
    patch::{LiveTree, PatchSummary, RenderTarget},
    render::Renderer,
    vnode::VirtualNode,
};

/// Wires the renderer, the patcher and the bridge together.
///
/// Host pushes are processed one at a time: each is decoded, rendered and
/// patched before the call returns.
#[derive(Debug)]
pub struct App<T: LiveTree, C> {
    target: RenderTarget<T>,
    renderer: Renderer,
    bridge: EventBridge<C>,
    current: Option<VirtualNode>,
    started: bool,
}

impl<T: LiveTree, C: Channel> App<T, C> {
    /// Creates an app rendering into `target` and reporting through `bridge`.
    pub const fn new(target: RenderTarget<T>, bridge: EventBridge<C>) -> Self {
        Self {
            target,
            renderer: Renderer::new(),
            bridge,
            current: None,
            started: false,
        }
    }

    /// Replaces the renderer.
    #[must_use]
    pub const fn with_renderer(mut self, renderer: Renderer) -> Self {
        self.renderer = renderer;
        self
    }

    /// Sends the `init` lifecycle message. Only the first call sends anything.
    ///
    /// Returns whether the message was sent by this call.
    pub fn start(&mut self) -> bool {
        match self.take_init() {
            Some(message) => {
                self.bridge.invoke(&message);
                true
            }
            None => false,
        }
    }

    /// Marks the app as started and hands out the `init` message for the
    /// caller to send, once.
    ///
    /// Hosts may answer `init` synchronously with a push, so callers that share
    /// the app behind a lock should send the message after releasing it.
    pub fn take_init(&mut self) -> Option<HostMessage> {
        if self.started {
            return None;
        }
        self.started = true;
        tracing::info!("frontend loaded, announcing to host");
        Some(HostMessage::init())
    }

    /// Whether [`Self::start`] has run.
    #[must_use]
    pub const fn is_started(&self) -> bool {
        self.started
    }

    /// Decodes, renders and patches a raw host push.
    ///
    /// # Errors
    ///
    /// Decode and render failures abort the cycle before the live tree is
    /// touched. Patch failures are reported after the fact.
    pub fn handle(&mut self, payload: &str) -> Result<PatchSummary, Error> {
        let max_depth = self.renderer.options().max_depth;
        let instruction = Instruction::decode_with_depth(payload, max_depth).inspect_err(|error| {
            tracing::warn!(%error, "rejected host push, keeping the current view");
        })?;
        self.apply(instruction)
    }

    /// Renders and patches an already decoded instruction.
    ///
    /// # Errors
    ///
    /// See [`Self::handle`].
    pub fn apply(&mut self, instruction: Instruction) -> Result<PatchSummary, Error> {
        let tree = instruction.into_tree();
        let next = self.renderer.render(&tree).inspect_err(|error| {
            tracing::warn!(%error, "render aborted, keeping the current view");
        })?;
        let summary = self.target.patch(&next)?;
        self.current = Some(next);
        Ok(summary)
    }

    /// The virtual tree of the last successful cycle.
    #[must_use]
    pub const fn current(&self) -> Option<&VirtualNode> {
        self.current.as_ref()
    }

    /// The mount point and its live tree.
    #[must_use]
    pub const fn target(&self) -> &RenderTarget<T> {
        &self.target
    }

    /// The mount point, for maintenance such as draining a backend log.
    #[must_use]
    pub const fn target_mut(&mut self) -> &mut RenderTarget<T> {
        &mut self.target
    }

    /// The outbound bridge.
    #[must_use]
    pub const fn bridge(&self) -> &EventBridge<C> {
        &self.bridge
    }
}

impl<C: Channel> App<MemoryTree, C> {
    /// Creates an app over a fresh [`MemoryTree`].
    pub fn headless(bridge: EventBridge<C>) -> Self {
        let tree = MemoryTree::new();
        let root = tree.root();
        Self::new(RenderTarget::new(tree, root), bridge)
    }

    /// Fires `event` on a live node and forwards the resulting message.
    ///
    /// Returns whether a handler on the node or one of its ancestors reacted.
    pub fn dispatch(&self, node: NodeId, event: &str, value: Option<String>) -> bool {
        match self.target.tree().dispatch(node, event, value) {
            Some(message) => {
                self.bridge.invoke(&message);
                true
            }
            None => false,
        }
    }
}

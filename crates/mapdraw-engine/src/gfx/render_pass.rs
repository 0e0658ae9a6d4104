use std::any::Any;

use bitflags::bitflags;

use crate::paint::Color;

bitflags! {
    /// Render phases a drawable or layer group takes part in.
    ///
    /// Passes run in declaration order each frame: 3D, opaque, translucent, debug.
    #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Default)]
    pub struct RenderPass: u8 {
        const PASS_3D = 1 << 0;
        const OPAQUE = 1 << 1;
        const TRANSLUCENT = 1 << 2;
        const DEBUG = 1 << 3;
    }
}

impl RenderPass {
    /// The single-bit passes in frame order.
    pub const FRAME_ORDER: [RenderPass; 4] =
        [RenderPass::PASS_3D, RenderPass::OPAQUE, RenderPass::TRANSLUCENT, RenderPass::DEBUG];

    pub fn label(self) -> &'static str {
        match self {
            RenderPass::PASS_3D => "3d",
            RenderPass::OPAQUE => "opaque",
            RenderPass::TRANSLUCENT => "translucent",
            RenderPass::DEBUG => "debug",
            _ => "mixed",
        }
    }
}

/// Parameters for opening a backend render pass.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPassDescriptor {
    pub name: &'static str,
    /// `Some` clears the color target before drawing.
    pub clear_color: Option<Color>,
    pub clear_depth: Option<f32>,
}

impl RenderPassDescriptor {
    pub const fn load(name: &'static str) -> Self {
        Self { name, clear_color: None, clear_depth: None }
    }
}

/// Backend command recorder for one render pass.
///
/// Drawables downcast it to their backend's encoder type when issuing draw calls.
pub trait RenderPassEncoder: Any {
    fn name(&self) -> &str;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

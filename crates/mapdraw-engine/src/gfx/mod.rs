//! Backend-neutral drawing contracts.
//!
//! Everything a layer needs to describe GPU work lives here: drawables and the builder that
//! produces them, their vertex/uniform data, shaders, render passes and the [`Context`]
//! trait a backend implements.

mod context;
mod drawable;
mod drawable_builder;
mod drawable_tweaker;
mod error;
mod fill_generator;
mod identity;
mod polyline;
mod render_pass;
mod renderable;
mod segment;
mod shader;
mod texture;
mod types;
mod uniform_buffer;
mod upload_pass;
mod vertex_attribute;

pub use context::{Context, RenderingStats};
pub use drawable::{
    COLOR_ATTRIBUTE, Drawable, DrawableData, DrawableImpl, DrawableLessByPriority, DrawableResources,
    LinePatternCap,
};
pub use drawable_builder::{ColorAttrMode, DrawableBuilder, DrawableBuilderImpl, POSITION_ATTRIBUTE};
pub use drawable_tweaker::DrawableTweaker;
pub use error::GfxError;
pub use fill_generator::{FillBuffers, generate_fill_and_outline_buffers, generate_fill_buffers, triangulate};
pub use identity::DrawableId;
pub use polyline::{
    LineCapType, LineJoinType, LineLayoutVertex, PolylineGeometry, PolylineOptions, tessellate_polyline,
};
pub use render_pass::{RenderPass, RenderPassDescriptor, RenderPassEncoder};
pub use renderable::DefaultRenderable;
pub use segment::{DrawSegment, MAX_SEGMENT_VERTICES, Segment};
pub use shader::{ShaderFactory, ShaderGroup, ShaderProgram, ShaderProgramInfo, ShaderRegistry, UniformBlock};
pub use texture::{Texture2D, TextureAttachment};
pub use types::{
    AttributeDataType, BackendType, BlendMode, BufferUsage, ColorMode, CullFaceMode, CullFaceSide, DepthFunction,
    DepthMaskType, DepthMode, DrawMode, Winding,
};
pub use uniform_buffer::{UniformBuffer, UniformBufferArray};
pub use upload_pass::{BufferResource, UploadPass};
pub use vertex_attribute::{AttributeBinding, AttributeValue, SharedRawData, VertexAttribute, VertexAttributeArray};

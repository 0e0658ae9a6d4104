use std::any::Any;

use super::error::GfxError;
use super::types::BufferUsage;
use super::vertex_attribute::{AttributeBinding, VertexAttributeArray, pack_vertex_attributes};

/// Backend buffer handle owned by a drawable or layer group.
pub trait BufferResource: Any + Send + Sync {
    fn size(&self) -> usize;

    fn as_any(&self) -> &dyn Any;
}

/// Resource creation and updates for the frame's upload phase.
///
/// Runs once per frame before any render pass; drawables with dirty state call into it.
pub trait UploadPass {
    fn create_index_buffer_resource(
        &mut self,
        data: &[u8],
        usage: BufferUsage,
    ) -> Result<Box<dyn BufferResource>, GfxError>;

    fn create_vertex_buffer_resource(
        &mut self,
        data: &[u8],
        usage: BufferUsage,
    ) -> Result<Box<dyn BufferResource>, GfxError>;

    fn create_uniform_buffer_resource(
        &mut self,
        data: &[u8],
    ) -> Result<Box<dyn BufferResource>, GfxError>;

    /// Overwrites `resource` with `data`. Sizes must match.
    fn update_buffer_resource(
        &mut self,
        resource: &dyn BufferResource,
        data: &[u8],
    ) -> Result<(), GfxError>;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Resolves the shader's attributes against the drawable's overrides and uploads
    /// them as one vertex buffer. Returns no buffer when there is nothing to bind.
    fn build_attribute_bindings(
        &mut self,
        vertex_count: usize,
        defaults: &VertexAttributeArray,
        overrides: &VertexAttributeArray,
        usage: BufferUsage,
    ) -> Result<(Vec<AttributeBinding>, Option<Box<dyn BufferResource>>), GfxError> {
        if vertex_count == 0 || defaults.is_empty() {
            return Ok((Vec::new(), None));
        }
        let (bindings, bytes) = pack_vertex_attributes(vertex_count, defaults, overrides);
        let buffer = self.create_vertex_buffer_resource(&bytes, usage)?;
        Ok((bindings, Some(buffer)))
    }
}

use std::any::Any;
use std::sync::{Arc, Mutex};

use crate::backend::counters::Counters;
use crate::gfx::{
    BufferResource, BufferUsage, GfxError, ShaderProgram, ShaderProgramInfo, Texture2D, UniformBlock,
    UploadPass, VertexAttributeArray,
};

/// CPU-side buffer standing in for a GPU buffer.
#[derive(Debug)]
pub struct HeadlessBuffer {
    data: Mutex<Vec<u8>>,
    size: usize,
    counters: Option<Arc<Counters>>,
}

impl HeadlessBuffer {
    pub fn new(data: &[u8]) -> Self {
        Self { data: Mutex::new(data.to_vec()), size: data.len(), counters: None }
    }

    fn tracked(data: &[u8], counters: &Arc<Counters>) -> Self {
        counters.buffer_created(data.len());
        let mut buffer = Self::new(data);
        buffer.counters = Some(counters.clone());
        buffer
    }

    /// A copy of the buffer's current bytes.
    pub fn contents(&self) -> Vec<u8> {
        self.data.lock().map(|d| d.clone()).unwrap_or_default()
    }

    fn write(&self, bytes: &[u8]) -> Result<(), GfxError> {
        if bytes.len() != self.size {
            return Err(GfxError::Backend(format!(
                "buffer update of {} bytes into a {} byte buffer",
                bytes.len(),
                self.size
            )));
        }
        let mut data = self.data.lock().map_err(|_| GfxError::Backend("buffer lock poisoned".into()))?;
        data.copy_from_slice(bytes);
        Ok(())
    }
}

impl BufferResource for HeadlessBuffer {
    fn size(&self) -> usize {
        self.size
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for HeadlessBuffer {
    fn drop(&mut self) {
        if let Some(counters) = &self.counters {
            counters.buffer_dropped();
        }
    }
}

/// RGBA8 image kept in memory.
#[derive(Debug)]
pub struct HeadlessTexture {
    size: (u32, u32),
    pixels: Vec<u8>,
    counters: Option<Arc<Counters>>,
}

impl HeadlessTexture {
    /// A transparent texture of `width × height`.
    pub fn new(width: u32, height: u32) -> Self {
        Self { size: (width, height), pixels: vec![0; width as usize * height as usize * 4], counters: None }
    }

    pub(super) fn from_rgba(
        width: u32,
        height: u32,
        rgba: &[u8],
        counters: &Arc<Counters>,
    ) -> Result<Self, GfxError> {
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return Err(GfxError::Backend(format!(
                "texture {width}x{height} expects {expected} bytes, got {}",
                rgba.len()
            )));
        }
        counters.texture_created();
        Ok(Self { size: (width, height), pixels: rgba.to_vec(), counters: Some(counters.clone()) })
    }

    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

impl Texture2D for HeadlessTexture {
    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for HeadlessTexture {
    fn drop(&mut self) {
        if let Some(counters) = &self.counters {
            counters.texture_dropped();
        }
    }
}

/// A shader program that is only its layout.
#[derive(Debug, Clone)]
pub struct HeadlessShader {
    info: ShaderProgramInfo,
}

impl HeadlessShader {
    pub fn new(info: ShaderProgramInfo) -> Self {
        Self { info }
    }
}

impl ShaderProgram for HeadlessShader {
    fn name(&self) -> &str {
        &self.info.name
    }

    fn vertex_attributes(&self) -> &VertexAttributeArray {
        &self.info.vertex_attributes
    }

    fn uniform_blocks(&self) -> &[UniformBlock] {
        &self.info.uniform_blocks
    }

    fn sampler_location(&self, name: &str) -> Option<i32> {
        self.info.sampler_location(name)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Upload pass that copies into [`HeadlessBuffer`]s.
pub struct HeadlessUploadPass {
    pub(super) counters: Arc<Counters>,
    pub(super) max_buffer_size: usize,
    pub(super) context_lost: bool,
}

impl HeadlessUploadPass {
    fn create(&mut self, data: &[u8]) -> Result<Box<dyn BufferResource>, GfxError> {
        if self.context_lost {
            return Err(GfxError::ContextLost);
        }
        if data.len() > self.max_buffer_size {
            return Err(GfxError::BufferTooLarge { size: data.len(), limit: self.max_buffer_size });
        }
        Ok(Box::new(HeadlessBuffer::tracked(data, &self.counters)))
    }
}

impl UploadPass for HeadlessUploadPass {
    fn create_index_buffer_resource(
        &mut self,
        data: &[u8],
        _usage: BufferUsage,
    ) -> Result<Box<dyn BufferResource>, GfxError> {
        self.create(data)
    }

    fn create_vertex_buffer_resource(
        &mut self,
        data: &[u8],
        _usage: BufferUsage,
    ) -> Result<Box<dyn BufferResource>, GfxError> {
        self.create(data)
    }

    fn create_uniform_buffer_resource(&mut self, data: &[u8]) -> Result<Box<dyn BufferResource>, GfxError> {
        self.create(data)
    }

    fn update_buffer_resource(&mut self, resource: &dyn BufferResource, data: &[u8]) -> Result<(), GfxError> {
        if self.context_lost {
            return Err(GfxError::ContextLost);
        }
        let Some(buffer) = resource.as_any().downcast_ref::<HeadlessBuffer>() else {
            return Err(GfxError::ForeignResource("buffer"));
        };
        buffer.write(data)?;
        self.counters.buffer_updated(data.len());
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

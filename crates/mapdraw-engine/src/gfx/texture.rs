use std::any::Any;
use std::sync::Arc;

/// Backend texture handle. Shared between drawables through `Arc` (e.g. an atlas).
pub trait Texture2D: Any + Send + Sync {
    fn size(&self) -> (u32, u32);

    fn as_any(&self) -> &dyn Any;
}

/// A texture bound at a sampler location.
#[derive(Clone)]
pub struct TextureAttachment {
    pub texture: Arc<dyn Texture2D>,
    pub location: i32,
}

impl core::fmt::Debug for TextureAttachment {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TextureAttachment")
            .field("location", &self.location)
            .field("size", &self.texture.size())
            .finish()
    }
}

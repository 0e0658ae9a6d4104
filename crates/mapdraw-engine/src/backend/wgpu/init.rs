use anyhow::{Context, Result};

/// Initialization parameters for the wgpu backend.
///
/// The backend always renders offscreen; presenting the target is up to the embedder.
#[derive(Debug, Clone)]
pub struct WgpuInit {
    /// Render into an sRGB target.
    pub prefer_srgb: bool,

    pub power_preference: wgpu::PowerPreference,

    /// Accept a software adapter. Useful on CI machines without a GPU.
    pub force_fallback_adapter: bool,

    /// Required wgpu features.
    ///
    /// Favor an empty set for portability unless a feature is strictly necessary.
    pub required_features: wgpu::Features,

    /// Limits requested from the adapter/device.
    pub required_limits: wgpu::Limits,

    /// Initial size of the offscreen target in physical pixels.
    pub width: u32,
    pub height: u32,
}

impl Default for WgpuInit {
    fn default() -> Self {
        Self {
            prefer_srgb: true,
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            width: 512,
            height: 512,
        }
    }
}

impl WgpuInit {
    /// Color format of the offscreen target.
    pub fn target_format(&self) -> wgpu::TextureFormat {
        if self.prefer_srgb {
            wgpu::TextureFormat::Rgba8UnormSrgb
        } else {
            wgpu::TextureFormat::Rgba8Unorm
        }
    }
}

/// Adapter, device and queue of one wgpu backend instance.
pub struct GpuDevice {
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

/// Acquires an adapter and a device without a surface.
///
/// Adapter/device acquisition is asynchronous under wgpu; block on it with `pollster`
/// when no executor is around.
pub async fn request_device(init: &WgpuInit) -> Result<GpuDevice> {
    anyhow::ensure!(init.width > 0 && init.height > 0, "render target has zero size");

    // Use all backends to allow wgpu to select the optimal platform backend.
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    });

    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: init.power_preference,
            compatible_surface: None,
            force_fallback_adapter: init.force_fallback_adapter,
        })
        .await
        .context("failed to find a suitable GPU adapter")?;

    let info = adapter.get_info();
    log::info!("wgpu adapter: {} ({:?})", info.name, info.backend);

    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("mapdraw device"),
            required_features: init.required_features,
            required_limits: init.required_limits.clone(),
            experimental_features: wgpu::ExperimentalFeatures::disabled(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        })
        .await
        .context("failed to create wgpu device/queue")?;

    Ok(GpuDevice { adapter, device, queue })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_format_follows_srgb_preference() {
        let mut init = WgpuInit::default();
        assert_eq!(init.target_format(), wgpu::TextureFormat::Rgba8UnormSrgb);
        init.prefer_srgb = false;
        assert_eq!(init.target_format(), wgpu::TextureFormat::Rgba8Unorm);
    }

    #[test]
    fn zero_sized_target_is_rejected() {
        let init = WgpuInit { width: 0, ..WgpuInit::default() };
        let err = pollster::block_on(request_device(&init)).err().map(|e| e.to_string());
        assert_eq!(err.as_deref(), Some("render target has zero size"));
    }
}

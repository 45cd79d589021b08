// SPDX-License-Identifier: GPL-3.0-only

//! GPU initialization for frame conversion
//!
//! Creates the wgpu device and queue the conversion resources live in, and
//! wraps them as a [`RenderContext`] so the bridge can create converters
//! from it.

use crate::constants;
use crate::converter::RenderContext;
use crate::errors::{BridgeError, BridgeResult};
use crate::shaders::WgpuTextureConverter;
use std::sync::Arc;
use tracing::{debug, info};

pub use wgpu;

/// Information about the created GPU device
#[derive(Debug, Clone)]
pub struct GpuDeviceInfo {
    /// Name of the GPU adapter
    pub adapter_name: String,
    /// Backend being used (Vulkan, Metal, DX12, etc.)
    pub backend: wgpu::Backend,
}

/// Create a wgpu device and queue for compute work.
///
/// # Arguments
///
/// * `label` - A label for the device (for debugging)
pub async fn create_compute_device(
    label: &str,
) -> Result<(Arc<wgpu::Device>, Arc<wgpu::Queue>, GpuDeviceInfo), String> {
    info!(label = label, "Creating GPU device for compute");

    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::VULKAN,
        ..Default::default()
    });

    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        })
        .await
        .map_err(|e| format!("Failed to find suitable GPU adapter: {}", e))?;

    let adapter_info = adapter.get_info();

    info!(
        adapter = %adapter_info.name,
        backend = ?adapter_info.backend,
        "GPU adapter selected for compute"
    );

    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some(label),
            required_features: wgpu::Features::empty(),
            required_limits: adapter.limits(),
            memory_hints: wgpu::MemoryHints::Performance,
            ..Default::default()
        })
        .await
        .map_err(|e| format!("Failed to create GPU device: {}", e))?;

    debug!(label, "GPU device created");

    let info = GpuDeviceInfo {
        adapter_name: adapter_info.name.clone(),
        backend: adapter_info.backend,
    };

    Ok((Arc::new(device), Arc::new(queue), info))
}

/// Rendering context backed by a wgpu device
///
/// Cheap to share: every clone refers to the same device and queue, so
/// textures created through any of them are valid in all.
#[derive(Clone)]
pub struct WgpuContext {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    info: GpuDeviceInfo,
}

impl WgpuContext {
    /// Open the default adapter
    pub async fn new() -> BridgeResult<Self> {
        let (device, queue, info) = create_compute_device(constants::gpu::DEVICE_LABEL)
            .await
            .map_err(BridgeError::Gpu)?;

        info!(
            adapter_name = %info.adapter_name,
            adapter_backend = ?info.backend,
            "GPU context ready for frame conversion"
        );
        Ok(Self {
            device,
            queue,
            info,
        })
    }

    /// Blocking variant of [`new`](Self::new) for synchronous callers
    pub fn new_blocking() -> BridgeResult<Self> {
        pollster::block_on(Self::new())
    }

    pub fn device(&self) -> &Arc<wgpu::Device> {
        &self.device
    }

    pub fn queue(&self) -> &Arc<wgpu::Queue> {
        &self.queue
    }

    pub fn info(&self) -> &GpuDeviceInfo {
        &self.info
    }
}

impl RenderContext for WgpuContext {
    type Converter = WgpuTextureConverter;

    fn share(&self) -> Self {
        self.clone()
    }

    fn create_converter(&self) -> BridgeResult<WgpuTextureConverter> {
        Ok(WgpuTextureConverter::new(
            Arc::clone(&self.device),
            Arc::clone(&self.queue),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_compute_device() {
        // This test requires a GPU, so it may be skipped in CI
        match create_compute_device("test_device").await {
            Ok((device, queue, info)) => {
                println!("Created device: {:?}", info);
                assert!(!info.adapter_name.is_empty());
                drop(queue);
                drop(device);
            }
            Err(e) => {
                println!("Skipping test (no GPU): {}", e);
            }
        }
    }

    #[test]
    fn test_shared_context_uses_same_device() {
        let Ok(context) = WgpuContext::new_blocking() else {
            println!("Skipping test (no GPU)");
            return;
        };
        let shared = context.share();
        assert!(Arc::ptr_eq(context.device(), shared.device()));
        assert!(Arc::ptr_eq(context.queue(), shared.queue()));
    }
}

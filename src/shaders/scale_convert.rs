// SPDX-License-Identifier: GPL-3.0-only

//! GPU scaling of RGBA camera frames into display-sized textures
//!
//! The camera frame is uploaded into a sampled input texture, a compute pass
//! scales it into a storage texture of the display size, and that texture is
//! handed to the processing pipeline without a CPU round-trip. Output
//! textures come from a small ring so the pipeline can still hold the
//! previous frame while the next one is written.

use crate::backends::camera::{CameraFrame, DisplaySize, FrameSize};
use crate::constants::gpu::{OUTPUT_TEXTURE_RING, WORKGROUP_SIZE};
use crate::converter::TextureConverter;
use crate::errors::{BridgeError, BridgeResult};
use crate::gpu::wgpu;
use std::sync::Arc;
use tracing::debug;

/// Scale shader source
pub const SCALE_RGBA_SHADER: &str = include_str!("scale_rgba.wgsl");

/// Uniform buffer for shader parameters
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct ScaleParams {
    src_width: u32,
    src_height: u32,
    dst_width: u32,
    dst_height: u32,
}

/// Binding type specification for pipeline creation
#[derive(Clone, Copy)]
enum BindingSpec {
    Texture,
    StorageTexture,
    Uniform,
}

impl BindingSpec {
    fn to_layout_entry(self, binding: u32) -> wgpu::BindGroupLayoutEntry {
        wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: match self {
                BindingSpec::Texture => wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: false },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                BindingSpec::StorageTexture => wgpu::BindingType::StorageTexture {
                    access: wgpu::StorageTextureAccess::WriteOnly,
                    format: wgpu::TextureFormat::Rgba8Unorm,
                    view_dimension: wgpu::TextureViewDimension::D2,
                },
                BindingSpec::Uniform => wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
            },
            count: None,
        }
    }
}

// Input texture + output + params
const BIND_LAYOUT: [(u32, BindingSpec); 3] = [
    (0, BindingSpec::Texture),
    (1, BindingSpec::StorageTexture),
    (2, BindingSpec::Uniform),
];

/// Converted frame living on the GPU
#[derive(Debug, Clone)]
pub struct GpuTexture {
    pub texture: Arc<wgpu::Texture>,
    pub size: DisplaySize,
    /// Sequence number of the camera frame this was converted from
    pub sequence: u64,
}

/// Textures allocated for one input/output size pair
struct SizedResources {
    input: FrameSize,
    output: DisplaySize,
    input_texture: wgpu::Texture,
    input_view: wgpu::TextureView,
    outputs: Vec<Arc<wgpu::Texture>>,
    next_output: usize,
}

/// wgpu conversion resource
pub struct WgpuTextureConverter {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    resources: Option<SizedResources>,
}

impl WgpuTextureConverter {
    pub fn new(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("scale_rgba_shader"),
            source: wgpu::ShaderSource::Wgsl(SCALE_RGBA_SHADER.into()),
        });

        let entries: Vec<wgpu::BindGroupLayoutEntry> = BIND_LAYOUT
            .iter()
            .map(|(binding, spec)| spec.to_layout_entry(*binding))
            .collect();

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("scale_rgba_bind_group_layout"),
            entries: &entries,
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("scale_rgba_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("scale_rgba_pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("scale_rgba_uniform_buffer"),
            size: std::mem::size_of::<ScaleParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            device,
            queue,
            pipeline,
            bind_group_layout,
            uniform_buffer,
            resources: None,
        }
    }

    fn create_texture(
        &self,
        label: &str,
        width: u32,
        height: u32,
        usage: wgpu::TextureUsages,
    ) -> wgpu::Texture {
        self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage,
            view_formats: &[],
        })
    }
}

impl TextureConverter for WgpuTextureConverter {
    type Texture = GpuTexture;

    fn configure(&mut self, input: FrameSize, output: DisplaySize) -> BridgeResult<()> {
        if input.is_empty() || output.width == 0 || output.height == 0 {
            return Err(BridgeError::InvalidState(format!(
                "cannot scale {} to {}",
                input, output
            )));
        }
        if let Some(resources) = &self.resources
            && resources.input == input
            && resources.output == output
        {
            return Ok(());
        }

        debug!(%input, %output, "Allocating scale converter resources");

        let input_texture = self.create_texture(
            "scale_input_texture",
            input.width,
            input.height,
            wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        );
        let input_view = input_texture.create_view(&wgpu::TextureViewDescriptor::default());

        let outputs = (0..OUTPUT_TEXTURE_RING)
            .map(|_| {
                Arc::new(self.create_texture(
                    "scale_output_texture",
                    output.width,
                    output.height,
                    wgpu::TextureUsages::STORAGE_BINDING
                        | wgpu::TextureUsages::TEXTURE_BINDING
                        | wgpu::TextureUsages::COPY_SRC,
                ))
            })
            .collect();

        let params = ScaleParams {
            src_width: input.width,
            src_height: input.height,
            dst_width: output.width,
            dst_height: output.height,
        };
        self.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&params));

        self.resources = Some(SizedResources {
            input,
            output,
            input_texture,
            input_view,
            outputs,
            next_output: 0,
        });
        Ok(())
    }

    fn convert(&mut self, frame: &CameraFrame) -> BridgeResult<GpuTexture> {
        let resources = self.resources.as_mut().ok_or_else(|| {
            BridgeError::InvalidState("GPU converter used before configure".into())
        })?;
        if frame.size() != resources.input {
            return Err(BridgeError::InvalidState(format!(
                "frame {} does not match configured input {}",
                frame.size(),
                resources.input
            )));
        }

        // Upload RGBA data to input texture
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &resources.input_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &frame.data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(frame.stride),
                rows_per_image: Some(frame.height),
            },
            wgpu::Extent3d {
                width: frame.width,
                height: frame.height,
                depth_or_array_layers: 1,
            },
        );

        let output = Arc::clone(&resources.outputs[resources.next_output]);
        resources.next_output = (resources.next_output + 1) % resources.outputs.len();
        let output_view = output.create_view(&wgpu::TextureViewDescriptor::default());

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("scale_rgba_bind_group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&resources.input_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&output_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: self.uniform_buffer.as_entire_binding(),
                },
            ],
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("scale_rgba_encoder"),
            });

        {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("scale_rgba_pass"),
                timestamp_writes: None,
            });

            compute_pass.set_pipeline(&self.pipeline);
            compute_pass.set_bind_group(0, Some(&bind_group), &[]);
            compute_pass.dispatch_workgroups(
                compute_dispatch_size(resources.output.width, WORKGROUP_SIZE),
                compute_dispatch_size(resources.output.height, WORKGROUP_SIZE),
                1,
            );
        }

        self.queue.submit(std::iter::once(encoder.finish()));

        Ok(GpuTexture {
            texture: output,
            size: resources.output,
            sequence: frame.sequence,
        })
    }
}

/// Calculate compute shader dispatch size (workgroups needed)
#[inline]
pub fn compute_dispatch_size(dimension: u32, workgroup_size: u32) -> u32 {
    dimension.div_ceil(workgroup_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::CameraFacing;
    use crate::backends::virtual_camera::test_pattern;
    use crate::converter::RenderContext;
    use crate::gpu::WgpuContext;

    /// Validate that a WGSL shader compiles successfully using naga
    fn validate_wgsl(source: &str) {
        let module = naga::front::wgsl::parse_str(source)
            .unwrap_or_else(|e| panic!("WGSL parse error:\n{}", e.emit_to_string(source)));
        naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        )
        .validate(&module)
        .unwrap_or_else(|e| panic!("WGSL validation error: {:?}", e));
    }

    #[test]
    fn test_scale_shader_is_valid() {
        validate_wgsl(SCALE_RGBA_SHADER);
    }

    #[test]
    fn test_shader_workgroup_matches_constant() {
        let expected = format!("@workgroup_size({}, {})", WORKGROUP_SIZE, WORKGROUP_SIZE);
        assert!(SCALE_RGBA_SHADER.contains(&expected));
    }

    #[test]
    fn test_compute_dispatch_size() {
        assert_eq!(compute_dispatch_size(640, 16), 40);
        assert_eq!(compute_dispatch_size(641, 16), 41);
        assert_eq!(compute_dispatch_size(1, 16), 1);
    }

    #[test]
    fn test_params_layout_matches_shader() {
        assert_eq!(std::mem::size_of::<ScaleParams>(), 16);
    }

    #[test]
    fn test_gpu_convert_produces_display_sized_texture() {
        let Ok(context) = WgpuContext::new_blocking() else {
            println!("Skipping test (no GPU)");
            return;
        };
        let mut converter = context.create_converter().unwrap();
        converter
            .configure(FrameSize::new(64, 48), DisplaySize::new(32, 24))
            .unwrap();

        let frame = test_pattern(FrameSize::new(64, 48), CameraFacing::Back, 5);
        let first = converter.convert(&frame).unwrap();
        assert_eq!(first.size, DisplaySize::new(32, 24));
        assert_eq!(first.sequence, 5);
        assert_eq!(first.texture.width(), 32);
        assert_eq!(first.texture.height(), 24);

        let second = converter.convert(&frame).unwrap();
        assert!(!Arc::ptr_eq(&first.texture, &second.texture));
    }
}

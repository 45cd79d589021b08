// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use serde::{Deserialize, Serialize};

/// Which conversion backend turns camera frames into textures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConverterBackend {
    /// wgpu compute shader (default)
    #[default]
    Gpu,
    /// Nearest-neighbour resampling on the CPU (headless, no adapter needed)
    Cpu,
}

impl ConverterBackend {
    /// All backends, for iteration
    pub const ALL: [ConverterBackend; 2] = [ConverterBackend::Gpu, ConverterBackend::Cpu];

    /// Get display name for the backend
    pub fn display_name(&self) -> &'static str {
        match self {
            ConverterBackend::Gpu => "GPU",
            ConverterBackend::Cpu => "CPU",
        }
    }
}

/// Processing graph defaults, matching the edge detection sample app
pub mod graph {
    /// Binary graph loaded by the processing pipeline
    pub const DEFAULT_BINARY_GRAPH_NAME: &str = "edge_detection_mobile_gpu.binarypb";

    /// Graph input stream receiving converted camera textures
    pub const DEFAULT_INPUT_VIDEO_STREAM: &str = "input_video";

    /// Graph output stream rendered to the display surface
    pub const DEFAULT_OUTPUT_VIDEO_STREAM: &str = "output_video";
}

/// Virtual camera defaults
pub mod virtual_camera {
    pub const DEFAULT_WIDTH: u32 = 640;
    pub const DEFAULT_HEIGHT: u32 = 480;
    pub const DEFAULT_FPS: u32 = 30;
}

/// GPU conversion constants
pub mod gpu {
    /// Compute shader workgroup edge (matches `@workgroup_size` in the shader)
    pub const WORKGROUP_SIZE: u32 = 16;

    /// Label for the conversion device
    pub const DEVICE_LABEL: &str = "preview_bridge_converter";

    /// Output textures rotated through by the GPU converter
    pub const OUTPUT_TEXTURE_RING: usize = 3;
}

/// Timing constants
pub mod timing {
    /// Frame counter modulo for periodic logging
    pub const FRAME_LOG_INTERVAL: u64 = 30;

    /// Conversions slower than this are logged at debug level
    pub const SLOW_CONVERSION_MS: u128 = 2;
}

/// Configuration file location
pub mod paths {
    /// Directory under the user config dir
    pub const CONFIG_DIR_NAME: &str = "preview-bridge";

    /// Configuration file name
    pub const CONFIG_FILE_NAME: &str = "config.json";
}

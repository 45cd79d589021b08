// SPDX-License-Identifier: GPL-3.0-only

//! Startup configuration
//!
//! Loaded once from JSON. Every field has a default so partial files work.

use crate::backends::camera::CameraFacing;
use crate::constants::{self, ConverterBackend};
use crate::errors::{BridgeError, BridgeResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Names the processing pipeline needs to wire its graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Binary graph file (e.g., "edge_detection_mobile_gpu.binarypb")
    pub binary_graph_name: String,
    /// Stream fed with converted camera frames
    pub input_video_stream: String,
    /// Stream rendered onto the display surface
    pub output_video_stream: String,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            binary_graph_name: constants::graph::DEFAULT_BINARY_GRAPH_NAME.to_string(),
            input_video_stream: constants::graph::DEFAULT_INPUT_VIDEO_STREAM.to_string(),
            output_video_stream: constants::graph::DEFAULT_OUTPUT_VIDEO_STREAM.to_string(),
        }
    }
}

/// Virtual camera output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VirtualCameraConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for VirtualCameraConfig {
    fn default() -> Self {
        Self {
            width: constants::virtual_camera::DEFAULT_WIDTH,
            height: constants::virtual_camera::DEFAULT_HEIGHT,
            fps: constants::virtual_camera::DEFAULT_FPS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Camera to open once permission is granted (front or back)
    pub camera_facing: CameraFacing,
    /// Processing graph wiring
    pub graph: GraphConfig,
    /// Frame conversion backend
    pub converter: ConverterBackend,
    /// Format of the bundled virtual camera
    pub virtual_camera: VirtualCameraConfig,
}

impl Config {
    /// Parse a JSON document
    pub fn from_json_str(json: &str) -> BridgeResult<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file
    pub fn load(path: &Path) -> BridgeResult<Self> {
        debug!(path = %path.display(), "Loading configuration");
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Load from `path`, falling back to defaults when the file is missing
    ///
    /// A file that exists but does not parse is still an error.
    pub fn load_or_default(path: &Path) -> BridgeResult<Self> {
        if !path.exists() {
            info!(path = %path.display(), "No configuration file, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Default configuration file path (`$XDG_CONFIG_HOME/preview-bridge/config.json`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| {
            dir.join(constants::paths::CONFIG_DIR_NAME)
                .join(constants::paths::CONFIG_FILE_NAME)
        })
    }

    /// Serialize as pretty JSON
    pub fn to_json_pretty(&self) -> BridgeResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn validate(&self) -> BridgeResult<()> {
        let vc = &self.virtual_camera;
        if vc.width == 0 || vc.height == 0 || vc.fps == 0 {
            return Err(BridgeError::Config(format!(
                "virtual camera needs non-zero size and fps, got {}x{} @ {}",
                vc.width, vc.height, vc.fps
            )));
        }
        if self.graph.input_video_stream.is_empty() || self.graph.output_video_stream.is_empty()
        {
            warn!("Graph stream names are empty; the pipeline may not wire its graph");
        }
        Ok(())
    }
}

// SPDX-License-Identifier: GPL-3.0-only
// Shared types for camera backend abstraction

//! Shared types for camera backends

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;

/// Which way the camera points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CameraFacing {
    /// User-facing (selfie) camera
    Front,
    /// World-facing camera
    #[default]
    Back,
}

impl CameraFacing {
    /// The camera on the other side of the device
    pub fn opposite(&self) -> Self {
        match self {
            CameraFacing::Front => CameraFacing::Back,
            CameraFacing::Back => CameraFacing::Front,
        }
    }
}

impl std::fmt::Display for CameraFacing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraFacing::Front => write!(f, "front"),
            CameraFacing::Back => write!(f, "back"),
        }
    }
}

impl FromStr for CameraFacing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "front" => Ok(CameraFacing::Front),
            "back" | "rear" => Ok(CameraFacing::Back),
            other => Err(format!("unknown camera facing '{}'", other)),
        }
    }
}

/// Pixel dimensions of a camera frame or a view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True when either dimension is zero
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl std::fmt::Display for FrameSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for FrameSize {
    type Err = String;

    /// Parse `WIDTHxHEIGHT` (e.g. `1280x720`)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{}'", s))?;
        let width = w
            .parse::<u32>()
            .map_err(|e| format!("invalid width '{}': {}", w, e))?;
        let height = h
            .parse::<u32>()
            .map_err(|e| format!("invalid height '{}': {}", h, e))?;
        Ok(Self { width, height })
    }
}

/// Output dimensions of the conversion resource
///
/// Always the camera's native frame aspect-fitted into a view size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DisplaySize {
    pub width: u32,
    pub height: u32,
}

impl DisplaySize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl std::fmt::Display for DisplaySize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Scale `native` to the largest size that fits inside `view` while keeping
/// its aspect ratio. Dimensions round down to whole pixels.
///
/// Returns `None` when either rectangle has zero area or the fitted size
/// collapses to zero.
pub fn aspect_fit(native: FrameSize, view: FrameSize) -> Option<DisplaySize> {
    if native.is_empty() || view.is_empty() {
        return None;
    }

    let (nw, nh) = (native.width as u64, native.height as u64);
    let (vw, vh) = (view.width as u64, view.height as u64);

    // Width-limited when view_w / native_w <= view_h / native_h
    let (width, height) = if vw * nh <= vh * nw {
        (vw, vw * nh / nw)
    } else {
        (vh * nw / nh, vh)
    };

    if width == 0 || height == 0 {
        return None;
    }
    Some(DisplaySize::new(width as u32, height as u32))
}

/// A single RGBA frame from the camera
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    /// RGBA pixels, `stride` bytes per row
    pub data: Arc<[u8]>,
    /// Row stride in bytes (may include padding)
    pub stride: u32,
    /// Monotonic frame counter assigned by the camera
    pub sequence: u64,
    /// Timestamp when frame was captured (for latency diagnostics)
    pub captured_at: Instant,
}

impl CameraFrame {
    pub fn size(&self) -> FrameSize {
        FrameSize::new(self.width, self.height)
    }

    /// Check that `data` holds `height` rows of at least `width` pixels
    pub fn is_well_formed(&self) -> bool {
        let row = self.width as usize * 4;
        if (self.stride as usize) < row {
            return false;
        }
        if self.height == 0 {
            return self.data.is_empty();
        }
        let needed = self.stride as usize * (self.height as usize - 1) + row;
        self.data.len() >= needed
    }
}

/// Latest-frame channel from a running camera
///
/// Holds `None` until the first frame is produced. The sender side is owned by
/// the camera backend; dropping it closes every receiver.
pub type FrameReceiver = watch::Receiver<Option<Arc<CameraFrame>>>;

/// Producer side of [`FrameReceiver`]
pub type FrameSender = watch::Sender<Option<Arc<CameraFrame>>>;

/// What a camera backend hands back once streaming has started
#[derive(Debug)]
pub struct CameraStream {
    /// Size of the frames the sensor produces
    pub native_size: FrameSize,
    /// Latest-frame channel
    pub frames: FrameReceiver,
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Error types for backend operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Backend is not available on this system
    NotAvailable(String),
    /// Failed to initialize backend
    InitializationFailed(String),
    /// Camera device not found
    DeviceNotFound(String),
    /// The camera went away before or while streaming
    Disconnected,
    /// Other errors
    Other(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::NotAvailable(msg) => write!(f, "Backend not available: {}", msg),
            BackendError::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            BackendError::DeviceNotFound(msg) => write!(f, "Device not found: {}", msg),
            BackendError::Disconnected => write!(f, "Camera disconnected"),
            BackendError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aspect_fit_width_limited() {
        // 4:3 camera into a tall portrait view
        let fitted = aspect_fit(FrameSize::new(640, 480), FrameSize::new(100, 200));
        assert_eq!(fitted, Some(DisplaySize::new(100, 75)));
    }

    #[test]
    fn test_aspect_fit_height_limited() {
        let fitted = aspect_fit(FrameSize::new(640, 480), FrameSize::new(1920, 600));
        assert_eq!(fitted, Some(DisplaySize::new(800, 600)));
    }

    #[test]
    fn test_aspect_fit_exact_ratio() {
        let fitted = aspect_fit(FrameSize::new(640, 480), FrameSize::new(400, 300));
        assert_eq!(fitted, Some(DisplaySize::new(400, 300)));
    }

    #[test]
    fn test_aspect_fit_rounds_down() {
        // 1280x720 into 333 wide: 333 * 720 / 1280 = 187.3
        let fitted = aspect_fit(FrameSize::new(1280, 720), FrameSize::new(333, 1000));
        assert_eq!(fitted, Some(DisplaySize::new(333, 187)));
    }

    #[test]
    fn test_aspect_fit_rejects_empty() {
        assert_eq!(aspect_fit(FrameSize::new(0, 480), FrameSize::new(100, 100)), None);
        assert_eq!(aspect_fit(FrameSize::new(640, 480), FrameSize::new(100, 0)), None);
        // Collapses to zero height
        assert_eq!(aspect_fit(FrameSize::new(4000, 1), FrameSize::new(10, 10)), None);
    }

    #[test]
    fn test_frame_size_parse() {
        assert_eq!("1280x720".parse::<FrameSize>(), Ok(FrameSize::new(1280, 720)));
        assert_eq!(" 64X48 ".parse::<FrameSize>(), Ok(FrameSize::new(64, 48)));
        assert!("1280".parse::<FrameSize>().is_err());
        assert!("axb".parse::<FrameSize>().is_err());
    }

    #[test]
    fn test_camera_facing_parse_and_opposite() {
        assert_eq!("Front".parse::<CameraFacing>(), Ok(CameraFacing::Front));
        assert_eq!("rear".parse::<CameraFacing>(), Ok(CameraFacing::Back));
        assert!("side".parse::<CameraFacing>().is_err());
        assert_eq!(CameraFacing::Front.opposite(), CameraFacing::Back);
        assert_eq!(CameraFacing::default(), CameraFacing::Back);
    }

    #[test]
    fn test_frame_well_formed() {
        let frame = CameraFrame {
            width: 2,
            height: 2,
            data: Arc::from(vec![0u8; 16]),
            stride: 8,
            sequence: 0,
            captured_at: Instant::now(),
        };
        assert!(frame.is_well_formed());

        let short = CameraFrame {
            data: Arc::from(vec![0u8; 12]),
            ..frame.clone()
        };
        assert!(!short.is_well_formed());

        let bad_stride = CameraFrame { stride: 4, ..frame };
        assert!(!bad_stride.is_well_formed());
    }
}

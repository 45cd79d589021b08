// SPDX-License-Identifier: GPL-3.0-only

//! Camera backend abstraction
//!
//! ```text
//! ┌─────────────────────┐
//! │    PreviewBridge    │
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │  CameraController   │  ← Start/stop, start generations, display sizing
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │ CameraService Trait │  ← Platform camera contract
//! └──────────┬──────────┘
//!            │
//!            ▼
//!   ┌────────────────┐
//!   │ VirtualCamera  │  ← Bundled test-pattern implementation
//!   └────────────────┘
//! ```

pub mod controller;
pub mod frame_loop;
pub mod types;

pub use controller::CameraController;
pub use types::*;

use tokio::sync::oneshot;

/// Platform camera service
///
/// Starting is asynchronous: the service answers through the returned
/// one-shot channel exactly once. Dropping the sender without answering is
/// reported as [`BackendError::Disconnected`].
pub trait CameraService: Send {
    /// Begin acquisition for the camera pointing `facing`
    fn start(&mut self, facing: CameraFacing) -> oneshot::Receiver<BackendResult<CameraStream>>;

    /// Release the camera
    ///
    /// Must close the frame channel of the running stream and be safe to call
    /// when nothing is running.
    fn stop(&mut self);
}

/// Reference to a started camera's frame source
///
/// Produced once per successful start. The handle stays cheap to clone so the
/// join latch can keep a copy for replay after a background/foreground cycle.
#[derive(Debug, Clone)]
pub struct FrameSourceHandle {
    generation: u64,
    facing: CameraFacing,
    native_size: FrameSize,
    pub(crate) frames: FrameReceiver,
}

impl FrameSourceHandle {
    pub(crate) fn new(
        generation: u64,
        facing: CameraFacing,
        native_size: FrameSize,
        frames: FrameReceiver,
    ) -> Self {
        Self {
            generation,
            facing,
            native_size,
            frames,
        }
    }

    /// Start generation this handle belongs to
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn facing(&self) -> CameraFacing {
        self.facing
    }

    /// Size of the frames the camera produces
    pub fn native_size(&self) -> FrameSize {
        self.native_size
    }
}

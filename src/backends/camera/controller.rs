// SPDX-License-Identifier: GPL-3.0-only

//! Camera lifecycle controller
//!
//! The controller provides:
//! - One start in flight at a time, never a duplicate start while streaming
//! - Start generations, so results of a start that was stopped are discarded
//! - Display sizing from a camera's native frame size

use super::types::*;
use super::{CameraService, FrameSourceHandle};
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;
use tracing::{debug, info, warn};

/// Pending start result from the platform service
type StartReceiver = oneshot::Receiver<BackendResult<CameraStream>>;

enum CameraState {
    Idle,
    Starting(StartReceiver),
    Streaming,
}

/// Starts and stops the platform camera
pub struct CameraController {
    service: Box<dyn CameraService>,
    state: CameraState,
    facing: CameraFacing,
    generation: u64,
}

impl CameraController {
    pub fn new(service: Box<dyn CameraService>, facing: CameraFacing) -> Self {
        Self {
            service,
            state: CameraState::Idle,
            facing,
            generation: 0,
        }
    }

    /// Begin camera acquisition
    ///
    /// The result arrives later through [`wait_started`](Self::wait_started)
    /// or [`try_started`](Self::try_started). Returns false when a start is
    /// already in flight or the camera is streaming.
    pub fn start(&mut self, facing: CameraFacing) -> bool {
        if !matches!(self.state, CameraState::Idle) {
            debug!(%facing, "Camera already starting or streaming, ignoring start");
            return false;
        }

        self.generation += 1;
        self.facing = facing;
        info!(generation = self.generation, %facing, "Starting camera");

        let receiver = self.service.start(facing);
        self.state = CameraState::Starting(receiver);
        true
    }

    /// Release the camera and invalidate any outstanding frame source
    ///
    /// Safe to call when the camera was never started.
    pub fn stop(&mut self) {
        if matches!(self.state, CameraState::Idle) {
            return;
        }

        info!(generation = self.generation, "Stopping camera");
        // Dropping a pending receiver discards a start result that is still in flight
        self.state = CameraState::Idle;
        self.generation += 1;
        self.service.stop();
    }

    /// Restart on the camera pointing `facing`
    ///
    /// Returns false when nothing was running, in which case only the
    /// preferred facing is updated.
    pub fn switch_facing(&mut self, facing: CameraFacing) -> bool {
        if self.is_idle() {
            self.facing = facing;
            return false;
        }
        self.stop();
        self.start(facing)
    }

    /// Wait for the in-flight start to complete
    ///
    /// Pending forever when no start is in flight. Cancel safe: the result
    /// stays queued if the future is dropped before it resolves.
    pub async fn wait_started(&mut self) -> BackendResult<FrameSourceHandle> {
        let CameraState::Starting(receiver) = &mut self.state else {
            return std::future::pending().await;
        };
        let result = receiver.await.unwrap_or(Err(BackendError::Disconnected));
        self.finish_start(result)
    }

    /// Non-blocking variant of [`wait_started`](Self::wait_started)
    pub fn try_started(&mut self) -> Option<BackendResult<FrameSourceHandle>> {
        let CameraState::Starting(receiver) = &mut self.state else {
            return None;
        };
        let result = match receiver.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Closed) => Err(BackendError::Disconnected),
        };
        Some(self.finish_start(result))
    }

    fn finish_start(
        &mut self,
        result: BackendResult<CameraStream>,
    ) -> BackendResult<FrameSourceHandle> {
        match result {
            Ok(stream) => {
                info!(
                    generation = self.generation,
                    facing = %self.facing,
                    native = %stream.native_size,
                    "Camera started"
                );
                self.state = CameraState::Streaming;
                Ok(FrameSourceHandle::new(
                    self.generation,
                    self.facing,
                    stream.native_size,
                    stream.frames,
                ))
            }
            Err(e) => {
                // Not retried: a fresh start() is the only way back
                warn!(generation = self.generation, error = %e, "Camera failed to start");
                self.state = CameraState::Idle;
                Err(e)
            }
        }
    }

    /// Fit a camera's native frame into `view`
    ///
    /// Rounds down to whole pixels; `None` when either size has zero area.
    pub fn compute_display_size(native: FrameSize, view: FrameSize) -> Option<DisplaySize> {
        aspect_fit(native, view)
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, CameraState::Idle)
    }

    pub fn is_starting(&self) -> bool {
        matches!(self.state, CameraState::Starting(_))
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self.state, CameraState::Streaming)
    }

    /// Facing of the current (or next) start
    pub fn facing(&self) -> CameraFacing {
        self.facing
    }

    /// Current start generation
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

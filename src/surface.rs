// SPDX-License-Identifier: GPL-3.0-only

//! Display surface lifecycle
//!
//! State machine over the platform's surface callbacks:
//!
//! ```text
//!  None ──created──▶ Created ──sized──▶ Sized ◀─┐
//!   ▲                   │                 │  └──┘ sized
//!   │                   ▼                 ▼
//!   └── (never) ◀── Destroyed ◀──────destroyed
//!                       │
//!                       └──created──▶ Created
//! ```
//!
//! The pipeline's render target is bound exactly while the state is
//! `Created` or `Sized`. Binding and unbinding happen on the caller's
//! context, before the callback returns, so the pipeline never renders into
//! a surface the platform has already freed.
//!
//! Each created surface gets a fresh [`SurfaceEpoch`]. Display sizes are
//! published tagged with the epoch they were computed for, which lets the
//! join latch discard sizes belonging to a surface that has since gone away.

use crate::backends::camera::{CameraController, DisplaySize, FrameSize};
use crate::errors::{BridgeError, BridgeResult};
use crate::pipeline::SharedRenderOutput;
use crate::utils::lock;
use tracing::{debug, info, warn};

/// Opaque platform surface reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceHandle(u64);

impl SurfaceHandle {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

}

impl std::fmt::Display for SurfaceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "surface#{}", self.0)
    }
}

/// Identifies one created-to-destroyed surface lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SurfaceEpoch(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceState {
    None,
    Created(SurfaceHandle),
    Sized {
        handle: SurfaceHandle,
        width: u32,
        height: u32,
    },
    Destroyed,
}

impl SurfaceState {
    /// Handle of the live surface, if any
    pub fn handle(&self) -> Option<SurfaceHandle> {
        match *self {
            SurfaceState::Created(handle) | SurfaceState::Sized { handle, .. } => Some(handle),
            SurfaceState::None | SurfaceState::Destroyed => None,
        }
    }
}

/// Surface state plus the render target binding that follows it
pub struct SurfaceLifecycleManager {
    state: SurfaceState,
    epoch: SurfaceEpoch,
    camera_size: Option<FrameSize>,
    display_size: Option<DisplaySize>,
    output: SharedRenderOutput,
}

impl SurfaceLifecycleManager {
    pub fn new(output: SharedRenderOutput) -> Self {
        Self {
            state: SurfaceState::None,
            epoch: SurfaceEpoch(0),
            camera_size: None,
            display_size: None,
            output,
        }
    }

    /// Surface created: bind the render target to it
    pub fn on_created(&mut self, handle: SurfaceHandle) -> SurfaceEpoch {
        if let Some(previous) = self.state.handle() {
            warn!(%previous, %handle, "Surface created while another is live, rebinding");
        }

        self.epoch = SurfaceEpoch(self.epoch.0 + 1);
        self.state = SurfaceState::Created(handle);
        self.display_size = None;
        lock(&self.output).set_output_target(Some(handle));

        info!(%handle, epoch = self.epoch.0, "Surface created, render target bound");
        self.epoch
    }

    /// Surface resized
    ///
    /// Returns the new display size once the camera's native size is known.
    /// Sizing a surface that is not live is a protocol violation.
    pub fn on_sized(
        &mut self,
        handle: SurfaceHandle,
        width: u32,
        height: u32,
    ) -> BridgeResult<Option<(SurfaceEpoch, DisplaySize)>> {
        if self.state.handle() != Some(handle) {
            warn!(
                %handle,
                state = ?self.state,
                "Surface resized before it was created, ignoring"
            );
            return Err(BridgeError::ProtocolViolation(format!(
                "resize of {} in state {:?}",
                handle, self.state
            )));
        }
        if width == 0 || height == 0 {
            warn!(%handle, width, height, "Zero-area surface size, ignoring");
            return Err(BridgeError::ProtocolViolation(format!(
                "zero-area size {}x{} for {}",
                width, height, handle
            )));
        }

        self.state = SurfaceState::Sized {
            handle,
            width,
            height,
        };
        debug!(%handle, width, height, "Surface sized");
        Ok(self.recompute())
    }

    /// Surface destroyed: unbind the render target
    ///
    /// Always unbinds, whatever the state. Returns the epoch of the surface
    /// that went away.
    pub fn on_destroyed(&mut self) -> Option<SurfaceEpoch> {
        let was_live = self.state.handle();
        lock(&self.output).set_output_target(None);
        self.state = SurfaceState::Destroyed;
        self.display_size = None;

        match was_live {
            Some(handle) => {
                info!(%handle, epoch = self.epoch.0, "Surface destroyed, render target unbound");
                Some(self.epoch)
            }
            None => {
                debug!("Surface destroyed with no live surface");
                None
            }
        }
    }

    /// Record the camera's native frame size
    ///
    /// When the surface is already sized, the display size is recomputed and
    /// returned for publishing.
    pub fn set_camera_frame_size(
        &mut self,
        native: FrameSize,
    ) -> Option<(SurfaceEpoch, DisplaySize)> {
        self.camera_size = Some(native);
        self.recompute()
    }

    /// Forget the camera's native size after the camera stops
    ///
    /// The display size goes with it until a camera reports again.
    pub fn clear_camera_frame_size(&mut self) {
        self.camera_size = None;
        self.display_size = None;
    }

    fn recompute(&mut self) -> Option<(SurfaceEpoch, DisplaySize)> {
        // Never leave a size computed for an earlier surface size behind
        self.display_size = None;

        let SurfaceState::Sized { width, height, .. } = self.state else {
            return None;
        };
        let native = self.camera_size?;
        let view = FrameSize::new(width, height);
        let size = CameraController::compute_display_size(native, view)?;
        debug!(%native, %view, display = %size, "Display size computed");
        self.display_size = Some(size);
        Some((self.epoch, size))
    }

    pub fn state(&self) -> SurfaceState {
        self.state
    }

    pub fn epoch(&self) -> SurfaceEpoch {
        self.epoch
    }

    /// Most recently published display size of the live surface
    pub fn display_size(&self) -> Option<DisplaySize> {
        self.display_size
    }

    /// Display size tagged with the surface it was computed for
    pub fn published_display(&self) -> Option<(SurfaceEpoch, DisplaySize)> {
        self.display_size.map(|size| (self.epoch, size))
    }

    /// Render target is bound iff the surface is live
    pub fn is_bound(&self) -> bool {
        self.state.handle().is_some()
    }
}

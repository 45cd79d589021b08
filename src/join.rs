// SPDX-License-Identifier: GPL-3.0-only

//! Join of frame source and display size into a single attach
//!
//! The frame source (camera start) and the display size (surface sized,
//! aspect-fitted to the camera) arrive independently and in any order. The
//! coordinator latches the newest value of each and attaches them to the
//! conversion resource exactly once, on the first flush where both are
//! present and the resource is acquired.
//!
//! ```text
//!   offer_frame_source ─┐
//!                       ├─▶ AttachmentJoin ──flush──▶ converter attach
//!   offer_display_size ─┘        ▲
//!                                └── kept across background, replayed on resume
//! ```
//!
//! A changed input while attached marks the attachment stale. The next flush
//! recycles the resource (release + acquire) and attaches the new pair.

use crate::backends::camera::{DisplaySize, FrameSourceHandle};
use crate::converter::{RenderContext, TextureConverterBridge};
use crate::errors::{BridgeError, BridgeResult};
use crate::lifecycle::LifecycleState;
use crate::surface::SurfaceEpoch;
use tracing::{debug, info};

/// Latch holding at most one of each attach input
#[derive(Debug, Default)]
pub struct AttachmentJoin {
    pub frame_source: Option<FrameSourceHandle>,
    pub display: Option<(SurfaceEpoch, DisplaySize)>,
}

/// What a flush did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing to attach
    Idle,
    /// Both inputs present but the resource is released; kept for replay
    Deferred,
    /// Attach performed at this size
    Attached(DisplaySize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Attached {
    generation: u64,
    epoch: SurfaceEpoch,
    size: DisplaySize,
}

/// Order-independent attach of frame source and display size
#[derive(Debug, Default)]
pub struct JoinCoordinator {
    latch: AttachmentJoin,
    attached: Option<Attached>,
    stale: bool,
}

impl JoinCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latch the frame source of a camera start
    pub fn offer_frame_source(&mut self, handle: FrameSourceHandle) {
        if let Some(attached) = self.attached
            && attached.generation != handle.generation()
        {
            debug!(
                attached = attached.generation,
                offered = handle.generation(),
                "New frame source while attached, marking stale"
            );
            self.stale = true;
        }
        self.latch.frame_source = Some(handle);
    }

    /// Latch the display size of the live surface
    pub fn offer_display_size(&mut self, epoch: SurfaceEpoch, size: DisplaySize) {
        if let Some(attached) = self.attached
            && (attached.epoch, attached.size) != (epoch, size)
        {
            debug!(
                attached = %attached.size,
                offered = %size,
                epoch = epoch.0,
                "Display changed while attached, marking stale"
            );
            self.stale = true;
        }
        self.latch.display = Some((epoch, size));
    }

    /// The surface went away: nothing may attach until a new one is sized
    pub fn surface_destroyed(&mut self) {
        if self.latch.display.take().is_some() {
            debug!("Display size dropped with its surface");
        }
    }

    /// The camera stopped: its frame source is no longer valid
    pub fn camera_stopped(&mut self) {
        if self.latch.frame_source.take().is_some() {
            debug!("Frame source dropped with its camera");
        }
        if self.attached.is_some() {
            self.stale = true;
        }
    }

    /// The conversion resource was released by a background transition
    ///
    /// Forgets the attachment and keeps both inputs for replay.
    pub fn resource_released(&mut self) {
        self.attached = None;
        self.stale = false;
    }

    /// Attach if both inputs are present and nothing is attached yet
    pub fn flush<C: RenderContext>(
        &mut self,
        converter: &mut TextureConverterBridge<C>,
        context: &C,
        lifecycle: LifecycleState,
    ) -> BridgeResult<FlushOutcome> {
        if self.stale {
            self.stale = false;
            if self.attached.take().is_some() && converter.is_acquired() {
                info!("Recycling conversion resource for a fresh join");
                converter.release();
                converter.acquire(context, lifecycle)?;
            }
        }

        if self.attached.is_some() {
            return Ok(FlushOutcome::Idle);
        }
        let (Some(source), Some((epoch, size))) = (&self.latch.frame_source, self.latch.display)
        else {
            return Ok(FlushOutcome::Idle);
        };
        if !converter.is_acquired() {
            debug!(%size, "Join complete but resource released, deferring attach");
            return Ok(FlushOutcome::Deferred);
        }

        let generation = source.generation();
        match converter.attach(source.clone(), size) {
            Ok(()) => {
                self.attached = Some(Attached {
                    generation,
                    epoch,
                    size,
                });
                Ok(FlushOutcome::Attached(size))
            }
            Err(BridgeError::ResourceReleased) => Ok(FlushOutcome::Deferred),
            Err(e) => Err(e),
        }
    }

    pub fn is_attached(&self) -> bool {
        self.attached.is_some()
    }

    /// Display size currently latched
    pub fn display(&self) -> Option<(SurfaceEpoch, DisplaySize)> {
        self.latch.display
    }

    /// Forget everything, attachment and inputs alike
    pub fn reset(&mut self) {
        self.latch = AttachmentJoin::default();
        self.attached = None;
        self.stale = false;
    }
}

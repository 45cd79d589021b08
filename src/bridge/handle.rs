// SPDX-License-Identifier: GPL-3.0-only

//! Host-facing side of the preview bridge
//!
//! Every method returns immediately. Surface callbacks update the surface
//! state (and the pipeline's render target) before returning; everything
//! else is posted to the bridge loop.

use super::BridgeEvent;
use crate::backends::camera::{CameraFacing, DisplaySize};
use crate::lifecycle::LifecycleTransition;
use crate::surface::{SurfaceHandle, SurfaceLifecycleManager, SurfaceState};
use crate::utils::lock;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

/// Cloneable handle for delivering platform callbacks to a
/// [`PreviewBridge`](super::PreviewBridge)
#[derive(Clone)]
pub struct BridgeHandle {
    events: UnboundedSender<BridgeEvent>,
    surface: Arc<Mutex<SurfaceLifecycleManager>>,
}

impl BridgeHandle {
    pub(super) fn new(
        events: UnboundedSender<BridgeEvent>,
        surface: Arc<Mutex<SurfaceLifecycleManager>>,
    ) -> Self {
        Self { events, surface }
    }

    fn post(&self, event: BridgeEvent) {
        if self.events.send(event).is_err() {
            debug!("Preview bridge has shut down, dropping callback");
        }
    }

    /// Host came to the foreground
    pub fn resume(&self) {
        self.post(BridgeEvent::Lifecycle(LifecycleTransition::Resume));
    }

    /// Host went to the background
    pub fn pause(&self) {
        self.post(BridgeEvent::Lifecycle(LifecycleTransition::Pause));
    }

    /// Host is being torn down; the bridge loop ends
    pub fn destroy(&self) {
        self.post(BridgeEvent::Lifecycle(LifecycleTransition::Destroy));
    }

    /// Ask for camera permission (again, after a denial)
    pub fn request_permission(&self) {
        self.post(BridgeEvent::RequestPermission);
    }

    /// Start the camera with the current facing
    pub fn start_camera(&self) {
        self.post(BridgeEvent::StartCamera);
    }

    pub fn stop_camera(&self) {
        self.post(BridgeEvent::StopCamera);
    }

    /// Restart on the camera pointing `facing`
    pub fn switch_camera(&self, facing: CameraFacing) {
        self.post(BridgeEvent::SwitchCamera(facing));
    }

    /// The platform created a display surface
    pub fn surface_created(&self, handle: SurfaceHandle) {
        let epoch = lock(&self.surface).on_created(handle);
        debug!(%handle, epoch = epoch.0, "Posting surface creation");
        self.post(BridgeEvent::SurfaceChanged);
    }

    /// The platform resized the display surface
    ///
    /// Out-of-order or zero-area sizes are logged and ignored.
    pub fn surface_changed(&self, handle: SurfaceHandle, width: u32, height: u32) {
        let result = lock(&self.surface).on_sized(handle, width, height);
        if result.is_ok() {
            self.post(BridgeEvent::SurfaceChanged);
        }
    }

    /// The platform destroyed the display surface
    ///
    /// The render target is unbound before this returns.
    pub fn surface_destroyed(&self) {
        lock(&self.surface).on_destroyed();
        self.post(BridgeEvent::SurfaceChanged);
    }

    pub fn surface_state(&self) -> SurfaceState {
        lock(&self.surface).state()
    }

    /// Display size of the live surface, once the camera size is known
    pub fn display_size(&self) -> Option<DisplaySize> {
        lock(&self.surface).display_size()
    }

    /// Whether the bridge loop is still accepting callbacks
    pub fn is_open(&self) -> bool {
        !self.events.is_closed()
    }
}

// SPDX-License-Identifier: GPL-3.0-only

//! Preview bridge event loop
//!
//! Owns every component on the task the rendering context is bound to:
//!
//! ```text
//!   BridgeHandle ──BridgeEvent──┐
//!   PermissionService ─oneshot──┤
//!   CameraService ─────oneshot──┼─▶ PreviewBridge ──▶ JoinCoordinator ──▶ TextureConverterBridge
//!   camera frames ───────watch──┘        │                                        │
//!                                        └──HostEvent──▶ host          pipeline ◀─┘
//! ```
//!
//! Each iteration handles every input that is ready, then flushes the join
//! once, so callbacks that arrive together produce a single attach with the
//! most recent values.

mod handle;

pub use handle::BridgeHandle;

use crate::backends::camera::{
    BackendError, BackendResult, CameraController, CameraFacing, CameraService, DisplaySize,
    FrameSourceHandle,
};
use crate::config::Config;
use crate::converter::{FrameSignal, RenderContext, TextureConverterBridge, TextureOf};
use crate::errors::BridgeError;
use crate::join::{FlushOutcome, JoinCoordinator};
use crate::lifecycle::{LifecycleState, LifecycleTransition};
use crate::permission::{PermissionGate, PermissionService, PermissionState, RequestOutcome};
use crate::pipeline::{ProcessingPipeline, SharedConsumer, SharedRenderOutput};
use crate::surface::SurfaceLifecycleManager;
use crate::utils::lock;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender, error::TryRecvError};
use tracing::{debug, error, info, warn};

/// Callback delivered to the bridge loop
#[derive(Debug, Clone)]
pub enum BridgeEvent {
    Lifecycle(LifecycleTransition),
    /// Surface state changed; the loop reads it back from the shared manager
    SurfaceChanged,
    RequestPermission,
    StartCamera,
    StopCamera,
    SwitchCamera(CameraFacing),
}

/// Notification for the host application
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// The user refused camera access
    PermissionDenied,
    /// The camera failed to start; not retried
    CameraUnavailable(BackendError),
    /// First frame source arrived; the preview view should be shown
    PreviewVisible,
    /// A frame source was attached at this output size
    Attached { size: DisplaySize },
    /// The attachment was dropped with the conversion resource
    Detached,
}

/// What woke the async loop
enum Step {
    Event(BridgeEvent),
    Closed,
    Permission(bool),
    Camera(BackendResult<FrameSourceHandle>),
    Frame(FrameSignal),
}

/// Coordinates permission, camera, surface and converter
pub struct PreviewBridge<C: RenderContext> {
    context: C,
    lifecycle: LifecycleState,
    permission: PermissionGate,
    camera: CameraController,
    surface: Arc<Mutex<SurfaceLifecycleManager>>,
    join: JoinCoordinator,
    converter: TextureConverterBridge<C>,
    events: UnboundedReceiver<BridgeEvent>,
    host: UnboundedSender<HostEvent>,
    preview_visible: bool,
    finished: bool,
}

impl<C: RenderContext> PreviewBridge<C> {
    /// Wire up a bridge and ask for camera permission
    ///
    /// The pipeline is shared between the converter (frames) and the surface
    /// manager (render target). Returns the bridge, the handle for platform
    /// callbacks and the stream of host notifications.
    pub fn new<P>(
        config: &Config,
        context: &C,
        permission: Box<dyn PermissionService>,
        camera: Box<dyn CameraService>,
        pipeline: Arc<Mutex<P>>,
    ) -> (Self, BridgeHandle, UnboundedReceiver<HostEvent>)
    where
        P: ProcessingPipeline<TextureOf<C>> + 'static,
    {
        info!(
            graph = %config.graph.binary_graph_name,
            input_stream = %config.graph.input_video_stream,
            output_stream = %config.graph.output_video_stream,
            facing = %config.camera_facing,
            "Creating preview bridge"
        );

        let consumer: SharedConsumer<TextureOf<C>> = pipeline.clone();
        let output: SharedRenderOutput = pipeline;

        let surface = Arc::new(Mutex::new(SurfaceLifecycleManager::new(output)));
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (host_tx, host_rx) = mpsc::unbounded_channel();

        let mut converter = TextureConverterBridge::new();
        converter.set_consumer(consumer);

        let mut bridge = Self {
            context: context.share(),
            lifecycle: LifecycleState::Created,
            permission: PermissionGate::new(permission),
            camera: CameraController::new(camera, config.camera_facing),
            surface: Arc::clone(&surface),
            join: JoinCoordinator::new(),
            converter,
            events: event_rx,
            host: host_tx,
            preview_visible: false,
            finished: false,
        };
        bridge.request_permission();

        (bridge, BridgeHandle::new(event_tx, surface), host_rx)
    }

    /// Handle everything that is ready without waiting
    ///
    /// Returns the number of inputs handled.
    pub fn run_pending(&mut self) -> usize {
        let mut handled = 0;

        loop {
            match self.events.try_recv() {
                Ok(event) => {
                    self.handle(event);
                    handled += 1;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if !self.finished {
                        info!("All bridge handles dropped");
                        self.shutdown();
                    }
                    break;
                }
            }
        }
        if let Some(granted) = self.permission.try_result() {
            self.on_permission_result(granted);
            handled += 1;
        }
        if let Some(result) = self.camera.try_started() {
            self.on_camera_started(result);
            handled += 1;
        }

        self.settle();
        self.pump();
        handled
    }

    /// Run until destroyed or every handle is dropped
    pub async fn run(&mut self) {
        info!("Preview bridge running");
        self.run_pending();

        while !self.finished {
            let step = tokio::select! {
                event = self.events.recv() => match event {
                    Some(event) => Step::Event(event),
                    None => Step::Closed,
                },
                granted = self.permission.wait_result() => Step::Permission(granted),
                started = self.camera.wait_started() => Step::Camera(started),
                signal = self.converter.wait_frame() => Step::Frame(signal),
            };

            match step {
                Step::Event(event) => {
                    self.handle(event);
                    while let Ok(event) = self.events.try_recv() {
                        self.handle(event);
                    }
                }
                Step::Closed => {
                    info!("All bridge handles dropped");
                    self.shutdown();
                }
                Step::Permission(granted) => self.on_permission_result(granted),
                Step::Camera(result) => self.on_camera_started(result),
                Step::Frame(FrameSignal::Ready) => {}
                Step::Frame(FrameSignal::Closed) => debug!("Camera frames stopped"),
            }

            self.settle();
            self.pump();
        }

        info!(
            frames = self.converter.frames_converted(),
            "Preview bridge stopped"
        );
    }

    fn handle(&mut self, event: BridgeEvent) {
        if self.finished {
            debug!(?event, "Bridge finished, ignoring event");
            return;
        }
        debug!(?event, "Bridge event");

        match event {
            BridgeEvent::Lifecycle(transition) => self.on_lifecycle(transition),
            // Read back from the manager when the join settles
            BridgeEvent::SurfaceChanged => {}
            BridgeEvent::RequestPermission => self.request_permission(),
            BridgeEvent::StartCamera => self.start_camera(self.camera.facing()),
            BridgeEvent::StopCamera => self.stop_camera(),
            BridgeEvent::SwitchCamera(facing) => self.switch_camera(facing),
        }
    }

    fn on_lifecycle(&mut self, transition: LifecycleTransition) {
        let Some(next) = self.lifecycle.next(transition) else {
            debug!(?transition, state = %self.lifecycle, "Lifecycle transition ignored");
            return;
        };
        info!(from = %self.lifecycle, to = %next, "Lifecycle transition");
        self.lifecycle = next;

        match transition {
            LifecycleTransition::Resume => {
                if let Err(e) = self.converter.acquire(&self.context, next) {
                    self.report(e);
                }
            }
            LifecycleTransition::Pause => self.release_converter(),
            LifecycleTransition::Destroy => self.shutdown(),
        }
    }

    fn release_converter(&mut self) {
        let was_attached = self.join.is_attached();
        self.converter.release();
        self.join.resource_released();
        if was_attached {
            self.notify(HostEvent::Detached);
        }
    }

    fn shutdown(&mut self) {
        self.lifecycle = LifecycleState::Destroyed;
        self.camera.stop();
        lock(&self.surface).clear_camera_frame_size();
        self.release_converter();
        self.join.reset();
        // Handles observe the loop ending
        self.events.close();
        self.finished = true;
    }

    fn request_permission(&mut self) {
        match self.permission.request() {
            RequestOutcome::AlreadyGranted => self.start_camera(self.camera.facing()),
            RequestOutcome::Prompted | RequestOutcome::InFlight => {}
        }
    }

    fn on_permission_result(&mut self, granted: bool) {
        match self.permission.on_result(granted) {
            Ok(PermissionState::Granted) => self.start_camera(self.camera.facing()),
            Ok(PermissionState::Denied) => self.notify(HostEvent::PermissionDenied),
            Ok(PermissionState::Unknown) => {}
            Err(e) => self.report(e),
        }
    }

    fn start_camera(&mut self, facing: CameraFacing) {
        if !self.permission.is_granted() {
            warn!(%facing, "Camera start without permission");
            self.report(BridgeError::PermissionDenied);
            return;
        }
        self.camera.start(facing);
    }

    fn stop_camera(&mut self) {
        self.camera.stop();
        self.join.camera_stopped();
        lock(&self.surface).clear_camera_frame_size();
    }

    fn switch_camera(&mut self, facing: CameraFacing) {
        if self.camera.is_idle() {
            self.camera.switch_facing(facing);
            return;
        }
        self.join.camera_stopped();
        lock(&self.surface).clear_camera_frame_size();
        self.camera.switch_facing(facing);
    }

    fn on_camera_started(&mut self, result: BackendResult<FrameSourceHandle>) {
        match result {
            Ok(source) => {
                lock(&self.surface).set_camera_frame_size(source.native_size());
                if !self.preview_visible {
                    self.preview_visible = true;
                    self.notify(HostEvent::PreviewVisible);
                }
                self.join.offer_frame_source(source);
            }
            Err(e) => self.report(BridgeError::CameraUnavailable(e)),
        }
    }

    /// Bring the join up to date with the surface and flush it
    fn settle(&mut self) {
        if self.finished {
            return;
        }

        let published = lock(&self.surface).published_display();
        match published {
            Some(display) if self.join.display() != Some(display) => {
                self.join.offer_display_size(display.0, display.1);
            }
            Some(_) => {}
            None => self.join.surface_destroyed(),
        }

        match self
            .join
            .flush(&mut self.converter, &self.context, self.lifecycle)
        {
            Ok(FlushOutcome::Attached(size)) => self.notify(HostEvent::Attached { size }),
            Ok(FlushOutcome::Idle | FlushOutcome::Deferred) => {}
            Err(e) => self.report(e),
        }
    }

    fn pump(&mut self) {
        if let Err(e) = self.converter.pump_frame() {
            self.report(e);
        }
    }

    fn report(&mut self, err: BridgeError) {
        match err {
            BridgeError::PermissionDenied => self.notify(HostEvent::PermissionDenied),
            BridgeError::CameraUnavailable(e) => {
                warn!(error = %e, "Camera unavailable");
                self.notify(HostEvent::CameraUnavailable(e));
            }
            BridgeError::ProtocolViolation(msg) => warn!(%msg, "Protocol violation ignored"),
            BridgeError::ResourceReleased => debug!("Conversion resource released, input buffered"),
            e @ (BridgeError::InvalidState(_) | BridgeError::Gpu(_) | BridgeError::Config(_)) => {
                error!(error = %e, "Preview bridge error")
            }
        }
    }

    fn notify(&self, event: HostEvent) {
        debug!(?event, "Host notification");
        if self.host.send(event).is_err() {
            debug!("Host stopped listening for notifications");
        }
    }

    pub fn lifecycle(&self) -> LifecycleState {
        self.lifecycle
    }

    pub fn permission_state(&self) -> PermissionState {
        self.permission.state()
    }

    pub fn is_attached(&self) -> bool {
        self.converter.is_attached()
    }

    /// Output size of the current attachment
    pub fn attached_size(&self) -> Option<DisplaySize> {
        self.converter.attached_size()
    }

    pub fn is_acquired(&self) -> bool {
        self.converter.is_acquired()
    }

    pub fn is_camera_streaming(&self) -> bool {
        self.camera.is_streaming()
    }

    /// Start generation of the camera; changes on every start and stop
    pub fn camera_generation(&self) -> u64 {
        self.camera.generation()
    }

    pub fn frames_converted(&self) -> u64 {
        self.converter.frames_converted()
    }

    /// Whether the loop has ended
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

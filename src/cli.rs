// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! This module provides command-line functionality for:
//! - Simulating a preview session against the virtual camera
//! - Printing the resolved configuration

use preview_bridge::backends::virtual_camera::VirtualCameraService;
use preview_bridge::converter::{CpuContext, RenderContext};
use preview_bridge::gpu::WgpuContext;
use preview_bridge::permission::{PermissionService, StaticPermissionService};
use preview_bridge::pipeline::{FrameConsumer, RenderOutput};
use preview_bridge::{
    BridgeError, BridgeHandle, BridgeResult, CameraFacing, Config, ConverterBackend, FrameSize,
    HostEvent, PreviewBridge, SurfaceHandle,
};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{info, warn};

/// Options of the `run` command
pub struct SessionOptions {
    pub config: Option<PathBuf>,
    pub facing: Option<CameraFacing>,
    pub cpu: bool,
    pub deny_permission: bool,
    pub frames: u64,
    pub pause_cycle: bool,
    pub surface: FrameSize,
}

/// How a simulated session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    Completed,
    PermissionDenied,
    CameraUnavailable,
    BridgeStopped,
    TimedOut,
}

struct SessionReport {
    end: SessionEnd,
    rendered: u64,
    dropped: u64,
    converted: u64,
    elapsed: Duration,
}

/// Stand-in processing pipeline that counts frames it could render
struct CountingPipeline {
    target: Option<SurfaceHandle>,
    rendered: u64,
    dropped: u64,
    progress: watch::Sender<u64>,
}

impl CountingPipeline {
    fn new(progress: watch::Sender<u64>) -> Self {
        Self {
            target: None,
            rendered: 0,
            dropped: 0,
            progress,
        }
    }
}

impl<T: Send> FrameConsumer<T> for CountingPipeline {
    fn consume(&mut self, _texture: T) {
        if self.target.is_none() {
            // Nowhere to render
            self.dropped += 1;
            return;
        }
        self.rendered += 1;
        self.progress.send_replace(self.rendered);
    }
}

impl RenderOutput for CountingPipeline {
    fn set_output_target(&mut self, target: Option<SurfaceHandle>) {
        self.target = target;
    }
}

fn load_config(path: Option<PathBuf>) -> BridgeResult<Config> {
    match path {
        Some(path) => Config::load(&path),
        None => match Config::default_path() {
            Some(path) => Config::load_or_default(&path),
            None => Ok(Config::default()),
        },
    }
}

/// Print the resolved configuration
pub fn print_info(path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(path)?;
    println!("{}", config.to_json_pretty()?);
    Ok(())
}

/// Run a simulated preview session
pub fn run_session(options: SessionOptions) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config(options.config.clone())?;
    if let Some(facing) = options.facing {
        config.camera_facing = facing;
    }
    if options.cpu {
        config.converter = ConverterBackend::Cpu;
    }
    if options.surface.is_empty() {
        return Err(format!("surface size {} has zero area", options.surface).into());
    }

    let vc = config.virtual_camera;
    println!(
        "Camera: virtual {} ({}x{} @ {} fps)",
        config.camera_facing, vc.width, vc.height, vc.fps
    );
    println!("Surface: {}", options.surface);

    // Create async runtime for the bridge loop
    let rt = tokio::runtime::Runtime::new()?;
    let report = rt.block_on(async {
        match config.converter {
            ConverterBackend::Gpu => match WgpuContext::new().await {
                Ok(context) => {
                    println!(
                        "Converter: {} ({})",
                        ConverterBackend::Gpu.display_name(),
                        context.info().adapter_name
                    );
                    drive(context, &config, &options).await
                }
                Err(e) => {
                    warn!(error = %e, "GPU unavailable, falling back to CPU conversion");
                    println!(
                        "Converter: {} (GPU unavailable)",
                        ConverterBackend::Cpu.display_name()
                    );
                    drive(CpuContext, &config, &options).await
                }
            },
            ConverterBackend::Cpu => {
                println!("Converter: {}", ConverterBackend::Cpu.display_name());
                drive(CpuContext, &config, &options).await
            }
        }
    })?;

    println!();
    match report.end {
        SessionEnd::Completed => println!("Session completed"),
        SessionEnd::PermissionDenied => println!("Camera permission denied, camera never started"),
        SessionEnd::CameraUnavailable => println!("Camera unavailable"),
        SessionEnd::BridgeStopped => println!("Bridge stopped early"),
        SessionEnd::TimedOut => println!("Timed out waiting for frames"),
    }
    println!("Frames converted: {}", report.converted);
    println!("Frames rendered:  {}", report.rendered);
    if report.dropped > 0 {
        println!("Frames dropped:   {} (no render target)", report.dropped);
    }
    println!("Elapsed: {:.2}s", report.elapsed.as_secs_f64());

    if report.end == SessionEnd::TimedOut {
        return Err("session timed out".into());
    }
    Ok(())
}

async fn drive<C: RenderContext>(
    context: C,
    config: &Config,
    options: &SessionOptions,
) -> BridgeResult<SessionReport> {
    let started = Instant::now();
    let (progress_tx, mut progress) = watch::channel(0u64);
    let pipeline = Arc::new(Mutex::new(CountingPipeline::new(progress_tx)));

    let permission: Box<dyn PermissionService> = if options.deny_permission {
        Box::new(StaticPermissionService::denying())
    } else {
        Box::new(StaticPermissionService::granting())
    };
    let camera = Box::new(VirtualCameraService::new(config.virtual_camera));

    let (mut bridge, handle, mut host_events) =
        PreviewBridge::new(config, &context, permission, camera, Arc::clone(&pipeline));
    let loop_task = tokio::spawn(async move {
        bridge.run().await;
        bridge.frames_converted()
    });

    let surface = SurfaceHandle::new(1);
    handle.resume();
    handle.surface_created(surface);
    handle.surface_changed(surface, options.surface.width, options.surface.height);

    let fps = config.virtual_camera.fps.max(1) as u64;
    let budget = Duration::from_secs(options.frames * 3 / fps + 5);
    let halfway = options.frames / 2;
    let mut cycled = !options.pause_cycle;

    let session = async {
        loop {
            tokio::select! {
                event = host_events.recv() => match event {
                    Some(HostEvent::PermissionDenied) => return SessionEnd::PermissionDenied,
                    Some(HostEvent::CameraUnavailable(e)) => {
                        println!("  camera error: {}", e);
                        return SessionEnd::CameraUnavailable;
                    }
                    Some(HostEvent::PreviewVisible) => println!("  preview visible"),
                    Some(HostEvent::Attached { size }) => println!("  attached at {}", size),
                    Some(HostEvent::Detached) => println!("  detached"),
                    None => return SessionEnd::BridgeStopped,
                },
                changed = progress.changed() => {
                    if changed.is_err() {
                        return SessionEnd::BridgeStopped;
                    }
                    let rendered = *progress.borrow_and_update();
                    if !cycled && rendered >= halfway {
                        cycled = true;
                        background_cycle(&handle, surface, options.surface).await;
                    }
                    if rendered >= options.frames {
                        return SessionEnd::Completed;
                    }
                }
            }
        }
    };
    let end = tokio::time::timeout(budget, session)
        .await
        .unwrap_or(SessionEnd::TimedOut);

    handle.destroy();
    let converted = loop_task
        .await
        .map_err(|e| BridgeError::InvalidState(format!("bridge task failed: {}", e)))?;

    let pipeline = pipeline
        .lock()
        .map_err(|_| BridgeError::InvalidState("pipeline lock poisoned".into()))?;
    info!(?end, converted, rendered = pipeline.rendered, "Session finished");

    Ok(SessionReport {
        end,
        rendered: pipeline.rendered,
        dropped: pipeline.dropped,
        converted,
        elapsed: started.elapsed(),
    })
}

/// Background the session, lose the surface, then come back
async fn background_cycle(handle: &BridgeHandle, surface: SurfaceHandle, size: FrameSize) {
    println!("  backgrounding");
    handle.pause();
    handle.surface_destroyed();
    tokio::time::sleep(Duration::from_millis(250)).await;

    println!("  resuming");
    handle.resume();
    handle.surface_created(surface);
    handle.surface_changed(surface, size.width, size.height);
}

// SPDX-License-Identifier: GPL-3.0-only

//! Preview bridge - camera to GPU pipeline to display surface
//!
//! This library joins a live camera feed to a texture-consuming processing
//! pipeline and back onto a display surface, across a host lifecycle that can
//! pause and resume at any time and behind an asynchronous permission grant.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`bridge`]: Event loop owning every component, plus the host handle
//! - [`permission`]: Camera permission gate
//! - [`surface`]: Display surface state machine and render target binding
//! - [`join`]: Order-independent attach of frame source and display size
//! - [`converter`]: Conversion resource lifetime and frame pumping
//! - [`backends`]: Camera controller and the bundled virtual camera
//! - [`gpu`] / [`shaders`]: wgpu context and the scaling compute shader
//! - [`config`]: Startup configuration
//!
//! # Example
//!
//! ```ignore
//! let (mut bridge, handle, host_events) = PreviewBridge::new(
//!     &config,
//!     &CpuContext,
//!     Box::new(StaticPermissionService::granting()),
//!     Box::new(VirtualCameraService::new(config.virtual_camera)),
//!     pipeline,
//! );
//! handle.resume();
//! handle.surface_created(SurfaceHandle::new(1));
//! handle.surface_changed(SurfaceHandle::new(1), 1280, 720);
//! bridge.run().await;
//! ```

pub mod backends;
pub mod bridge;
pub mod config;
pub mod constants;
pub mod converter;
pub mod errors;
pub mod gpu;
pub mod join;
pub mod lifecycle;
pub mod permission;
pub mod pipeline;
pub mod shaders;
pub mod surface;
mod utils;

// Re-export commonly used types
pub use backends::camera::{CameraFacing, DisplaySize, FrameSize};
pub use bridge::{BridgeHandle, HostEvent, PreviewBridge};
pub use config::Config;
pub use constants::ConverterBackend;
pub use errors::{BridgeError, BridgeResult};
pub use surface::SurfaceHandle;

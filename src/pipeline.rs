// SPDX-License-Identifier: GPL-3.0-only

//! Contract of the external processing pipeline
//!
//! The pipeline is opaque: it consumes converted frames one at a time (in
//! order, no backpressure) and renders into whatever output target it is
//! given. Both halves are shared behind mutexes because the surface side
//! binds targets from the platform's UI context while frames arrive from the
//! bridge's loop.

use crate::surface::SurfaceHandle;
use std::sync::{Arc, Mutex};

/// Receives converted camera textures
pub trait FrameConsumer<T>: Send {
    fn consume(&mut self, texture: T);
}

/// Holds the surface the pipeline renders into
pub trait RenderOutput: Send {
    /// Bind (`Some`) or unbind (`None`) the render target
    fn set_output_target(&mut self, target: Option<SurfaceHandle>);
}

/// Both sides of a processing pipeline
pub trait ProcessingPipeline<T>: FrameConsumer<T> + RenderOutput {}

impl<T, P> ProcessingPipeline<T> for P where P: FrameConsumer<T> + RenderOutput {}

/// Converter-side view of a shared pipeline
pub type SharedConsumer<T> = Arc<Mutex<dyn FrameConsumer<T>>>;

/// Surface-side view of a shared pipeline
pub type SharedRenderOutput = Arc<Mutex<dyn RenderOutput>>;

// SPDX-License-Identifier: GPL-3.0-only

//! Camera frame to rendering-context texture conversion
//!
//! [`TextureConverterBridge`] owns one conversion resource created from a
//! [`RenderContext`]. The resource only exists while the host is in the
//! foreground: it is acquired on resume and released on pause. While it
//! exists, at most one frame source is attached to it with a fixed output
//! size, and every new camera frame is converted and handed to the
//! processing pipeline.
//!
//! Two contexts are bundled:
//! - [`WgpuContext`](crate::gpu::WgpuContext): compute shader scaling into a
//!   storage texture
//! - [`CpuContext`](cpu::CpuContext): nearest-neighbour resample in memory

pub mod cpu;

use crate::backends::camera::{CameraFrame, DisplaySize, FrameSize, FrameSourceHandle};
use crate::constants::timing;
use crate::errors::{BridgeError, BridgeResult};
use crate::lifecycle::LifecycleState;
use crate::pipeline::SharedConsumer;
use crate::utils::lock;
use std::time::Instant;
use tracing::{debug, info, warn};

pub use cpu::{CpuContext, CpuTexture, CpuTextureConverter};

/// A conversion resource bound to a rendering context
pub trait TextureConverter: Send {
    /// Texture type valid inside the rendering context
    type Texture: Send + 'static;

    /// Fix the input and output dimensions for the attached source
    fn configure(&mut self, input: FrameSize, output: DisplaySize) -> BridgeResult<()>;

    /// Convert one camera frame into an output-sized texture
    fn convert(&mut self, frame: &CameraFrame) -> BridgeResult<Self::Texture>;
}

/// Rendering context conversion resources are created in
pub trait RenderContext: Send + 'static {
    type Converter: TextureConverter;

    /// Variant of this context usable for resource creation off the
    /// primary thread
    fn share(&self) -> Self
    where
        Self: Sized;

    /// Create a fresh conversion resource
    fn create_converter(&self) -> BridgeResult<Self::Converter>;
}

/// Texture type produced by a context's converter
pub type TextureOf<C> = <<C as RenderContext>::Converter as TextureConverter>::Texture;

/// What woke [`TextureConverterBridge::wait_frame`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameSignal {
    /// A new frame is waiting to be pumped
    Ready,
    /// The camera behind the attached source stopped
    Closed,
}

struct Attachment {
    source: FrameSourceHandle,
    size: DisplaySize,
    last_sequence: Option<u64>,
    closed: bool,
}

/// Owns the conversion resource and the single attachment made to it
pub struct TextureConverterBridge<C: RenderContext> {
    resource: Option<C::Converter>,
    consumer: Option<SharedConsumer<TextureOf<C>>>,
    attachment: Option<Attachment>,
    frames_converted: u64,
}

impl<C: RenderContext> Default for TextureConverterBridge<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: RenderContext> TextureConverterBridge<C> {
    pub fn new() -> Self {
        Self {
            resource: None,
            consumer: None,
            attachment: None,
            frames_converted: 0,
        }
    }

    /// Create the conversion resource
    ///
    /// Only valid in the foreground. Acquiring while already acquired is a
    /// no-op.
    pub fn acquire(&mut self, context: &C, lifecycle: LifecycleState) -> BridgeResult<()> {
        if !lifecycle.is_foreground() {
            return Err(BridgeError::InvalidState(format!(
                "conversion resource acquired while {}",
                lifecycle
            )));
        }
        if self.resource.is_some() {
            debug!("Conversion resource already acquired");
            return Ok(());
        }

        self.resource = Some(context.create_converter()?);
        info!("Conversion resource acquired");
        Ok(())
    }

    /// Destroy the conversion resource and drop any attachment
    ///
    /// Idempotent. Returns true if a resource was actually released.
    pub fn release(&mut self) -> bool {
        let had_attachment = self.attachment.take().is_some();
        match self.resource.take() {
            Some(_) => {
                info!(had_attachment, "Conversion resource released");
                true
            }
            None => false,
        }
    }

    /// Wire converted output to the processing pipeline
    pub fn set_consumer(&mut self, consumer: SharedConsumer<TextureOf<C>>) {
        self.consumer = Some(consumer);
    }

    /// Bind `source` as input with fixed output dimensions `size`
    ///
    /// At most once per acquire/release cycle.
    pub fn attach(&mut self, source: FrameSourceHandle, size: DisplaySize) -> BridgeResult<()> {
        let Some(resource) = self.resource.as_mut() else {
            return Err(BridgeError::ResourceReleased);
        };
        if let Some(existing) = &self.attachment {
            return Err(BridgeError::InvalidState(format!(
                "converter already attached to generation {} at {}",
                existing.source.generation(),
                existing.size
            )));
        }

        resource.configure(source.native_size(), size)?;
        if self.consumer.is_none() {
            warn!("Attached without a consumer, converted frames will be dropped");
        }

        info!(
            generation = source.generation(),
            native = %source.native_size(),
            %size,
            "Frame source attached"
        );
        self.attachment = Some(Attachment {
            source,
            size,
            last_sequence: None,
            closed: false,
        });
        Ok(())
    }

    /// Wait until the attached source publishes a frame
    ///
    /// Pending forever while nothing is attached or the source has closed.
    /// Cancel safe.
    pub async fn wait_frame(&mut self) -> FrameSignal {
        let Some(attachment) = self.attachment.as_mut().filter(|a| !a.closed) else {
            return std::future::pending().await;
        };
        match attachment.source.frames.changed().await {
            Ok(()) => FrameSignal::Ready,
            Err(_) => {
                debug!(
                    generation = attachment.source.generation(),
                    "Attached frame source closed"
                );
                attachment.closed = true;
                FrameSignal::Closed
            }
        }
    }

    /// Convert the newest frame of the attached source, if not yet converted
    ///
    /// Returns true when a frame was converted.
    pub fn pump_frame(&mut self) -> BridgeResult<bool> {
        let (Some(attachment), Some(resource)) = (self.attachment.as_mut(), self.resource.as_mut())
        else {
            return Ok(false);
        };

        let frame = attachment.source.frames.borrow_and_update().clone();
        let Some(frame) = frame else {
            return Ok(false);
        };
        if attachment.last_sequence == Some(frame.sequence) {
            return Ok(false);
        }
        attachment.last_sequence = Some(frame.sequence);

        let native = attachment.source.native_size();
        if frame.size() != native || !frame.is_well_formed() {
            warn!(
                sequence = frame.sequence,
                frame = %frame.size(),
                %native,
                "Skipping frame that does not match the attached source"
            );
            return Ok(false);
        }

        let started = Instant::now();
        let texture = resource.convert(&frame)?;
        let elapsed = started.elapsed();
        if elapsed.as_millis() > timing::SLOW_CONVERSION_MS {
            debug!(
                sequence = frame.sequence,
                elapsed_ms = elapsed.as_millis() as u64,
                "Slow frame conversion"
            );
        }

        match &self.consumer {
            Some(consumer) => lock(consumer).consume(texture),
            None => debug!(sequence = frame.sequence, "No consumer, dropping frame"),
        }

        self.frames_converted += 1;
        if self.frames_converted % timing::FRAME_LOG_INTERVAL == 0 {
            debug!(
                frames = self.frames_converted,
                size = %attachment.size,
                latency_ms = frame.captured_at.elapsed().as_millis() as u64,
                "Frames converted"
            );
        }
        Ok(true)
    }

    pub fn is_acquired(&self) -> bool {
        self.resource.is_some()
    }

    pub fn is_attached(&self) -> bool {
        self.attachment.is_some()
    }

    /// Output size of the current attachment
    pub fn attached_size(&self) -> Option<DisplaySize> {
        self.attachment.as_ref().map(|a| a.size)
    }

    /// Total frames converted over the bridge's lifetime
    pub fn frames_converted(&self) -> u64 {
        self.frames_converted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::{CameraFacing, FrameSender};
    use crate::backends::virtual_camera::test_pattern;
    use crate::pipeline::FrameConsumer;
    use std::sync::{Arc, Mutex};
    use tokio::sync::watch;

    #[derive(Default)]
    struct Collector {
        textures: Vec<CpuTexture>,
    }

    impl FrameConsumer<CpuTexture> for Collector {
        fn consume(&mut self, texture: CpuTexture) {
            self.textures.push(texture);
        }
    }

    fn source(width: u32, height: u32) -> (FrameSender, FrameSourceHandle) {
        let (tx, rx) = watch::channel(None);
        let handle =
            FrameSourceHandle::new(1, CameraFacing::Back, FrameSize::new(width, height), rx);
        (tx, handle)
    }

    fn acquired() -> TextureConverterBridge<CpuContext> {
        let mut bridge = TextureConverterBridge::new();
        bridge
            .acquire(&CpuContext, LifecycleState::Foreground)
            .unwrap();
        bridge
    }

    #[test]
    fn test_acquire_requires_foreground() {
        let mut bridge = TextureConverterBridge::<CpuContext>::new();
        assert!(matches!(
            bridge.acquire(&CpuContext, LifecycleState::Background),
            Err(BridgeError::InvalidState(_))
        ));
        assert!(!bridge.is_acquired());
    }

    #[test]
    fn test_second_acquire_keeps_resource() {
        let mut bridge = acquired();
        let (tx, handle) = source(64, 48);
        bridge.attach(handle, DisplaySize::new(32, 24)).unwrap();

        bridge
            .acquire(&CpuContext, LifecycleState::Foreground)
            .unwrap();
        assert!(bridge.is_acquired());
        assert_eq!(bridge.attached_size(), Some(DisplaySize::new(32, 24)));

        // The attachment still converts
        let frame = test_pattern(FrameSize::new(64, 48), CameraFacing::Back, 1);
        tx.send(Some(Arc::new(frame))).unwrap();
        assert!(bridge.pump_frame().unwrap());
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut bridge = acquired();
        assert!(bridge.release());
        assert!(!bridge.release());
        assert!(!bridge.is_acquired());
    }

    #[test]
    fn test_attach_against_released_resource() {
        let mut bridge = TextureConverterBridge::<CpuContext>::new();
        let (_tx, handle) = source(64, 48);
        assert_eq!(
            bridge.attach(handle, DisplaySize::new(32, 24)),
            Err(BridgeError::ResourceReleased)
        );
    }

    #[test]
    fn test_second_attach_is_invalid() {
        let mut bridge = acquired();
        let (_tx, handle) = source(64, 48);
        bridge.attach(handle.clone(), DisplaySize::new(32, 24)).unwrap();
        assert!(matches!(
            bridge.attach(handle, DisplaySize::new(32, 24)),
            Err(BridgeError::InvalidState(_))
        ));
    }

    #[test]
    fn test_release_drops_attachment() {
        let mut bridge = acquired();
        let (_tx, handle) = source(64, 48);
        bridge.attach(handle.clone(), DisplaySize::new(32, 24)).unwrap();
        bridge.release();
        bridge
            .acquire(&CpuContext, LifecycleState::Foreground)
            .unwrap();
        assert!(!bridge.is_attached());
        bridge.attach(handle, DisplaySize::new(16, 12)).unwrap();
        assert_eq!(bridge.attached_size(), Some(DisplaySize::new(16, 12)));
    }

    #[test]
    fn test_pump_converts_each_frame_once() {
        let mut bridge = acquired();
        let collector = Arc::new(Mutex::new(Collector::default()));
        bridge.set_consumer(collector.clone());

        let (tx, handle) = source(64, 48);
        bridge.attach(handle, DisplaySize::new(32, 24)).unwrap();
        assert!(!bridge.pump_frame().unwrap());

        let frame = test_pattern(FrameSize::new(64, 48), CameraFacing::Back, 1);
        tx.send(Some(Arc::new(frame))).unwrap();
        assert!(bridge.pump_frame().unwrap());
        assert!(!bridge.pump_frame().unwrap());

        let collected = collector.lock().unwrap();
        let textures = &collected.textures;
        assert_eq!(textures.len(), 1);
        assert_eq!((textures[0].width, textures[0].height), (32, 24));
        assert_eq!(bridge.frames_converted(), 1);
    }

    #[test]
    fn test_mismatched_frame_is_skipped() {
        let mut bridge = acquired();
        let (tx, handle) = source(64, 48);
        bridge.attach(handle, DisplaySize::new(32, 24)).unwrap();

        let frame = test_pattern(FrameSize::new(32, 32), CameraFacing::Back, 1);
        tx.send(Some(Arc::new(frame))).unwrap();
        assert!(!bridge.pump_frame().unwrap());
        assert_eq!(bridge.frames_converted(), 0);
    }

    #[test]
    fn test_attach_without_consumer_drops_frames() {
        let mut bridge = acquired();
        let (tx, handle) = source(8, 8);
        bridge.attach(handle, DisplaySize::new(4, 4)).unwrap();
        let frame = test_pattern(FrameSize::new(8, 8), CameraFacing::Front, 3);
        tx.send(Some(Arc::new(frame))).unwrap();
        assert!(bridge.pump_frame().unwrap());
    }

    #[tokio::test]
    async fn test_wait_frame_reports_close() {
        let mut bridge = acquired();
        let (tx, handle) = source(8, 8);
        bridge.attach(handle, DisplaySize::new(4, 4)).unwrap();

        let frame = test_pattern(FrameSize::new(8, 8), CameraFacing::Back, 0);
        tx.send(Some(Arc::new(frame))).unwrap();
        assert_eq!(bridge.wait_frame().await, FrameSignal::Ready);
        assert!(bridge.pump_frame().unwrap());

        drop(tx);
        assert_eq!(bridge.wait_frame().await, FrameSignal::Closed);
    }
}

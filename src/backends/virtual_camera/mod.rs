// SPDX-License-Identifier: GPL-3.0-only

//! Virtual camera backend producing a synthetic test pattern
//!
//! Stands in for the platform camera on machines without one (CLI sessions,
//! integration tests). Frames are RGBA, produced by a paced [`FrameLoop`]
//! thread and published on a latest-frame watch channel.
//!
//! ```text
//! ┌──────────────────┐
//! │ FrameLoop thread │  ← gradient + moving bar, tinted per facing
//! └────────┬─────────┘
//!          │ watch (latest frame)
//!          ▼
//! ┌──────────────────┐
//! │ FrameSourceHandle│
//! └──────────────────┘
//! ```

use crate::backends::camera::frame_loop::{FrameLoop, LoopAction};
use crate::backends::camera::{
    BackendError, BackendResult, CameraFacing, CameraFrame, CameraService, CameraStream,
    FrameSize,
};
use crate::config::VirtualCameraConfig;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{oneshot, watch};
use tracing::{debug, info};

/// Software camera service
pub struct VirtualCameraService {
    config: VirtualCameraConfig,
    frame_loop: Option<FrameLoop>,
}

impl VirtualCameraService {
    pub fn new(config: VirtualCameraConfig) -> Self {
        Self {
            config,
            frame_loop: None,
        }
    }

    /// Check if frames are currently being produced
    pub fn is_streaming(&self) -> bool {
        self.frame_loop
            .as_ref()
            .map(FrameLoop::is_running)
            .unwrap_or(false)
    }

    fn spawn_stream(&mut self, facing: CameraFacing) -> BackendResult<CameraStream> {
        let size = FrameSize::new(self.config.width, self.config.height);
        if size.is_empty() {
            return Err(BackendError::InitializationFailed(format!(
                "invalid virtual camera size {}",
                size
            )));
        }
        if self.config.fps == 0 {
            return Err(BackendError::InitializationFailed(
                "virtual camera fps must be non-zero".into(),
            ));
        }

        let (sender, receiver) = watch::channel(None);
        let interval = Duration::from_secs_f64(1.0 / self.config.fps as f64);

        let frame_loop = FrameLoop::spawn("virtual-camera", interval, move |index| {
            let frame = test_pattern(size, facing, index);
            // All receivers gone: nobody is watching this camera anymore
            match sender.send(Some(Arc::new(frame))) {
                Ok(()) => LoopAction::Continue,
                Err(_) => LoopAction::Stop,
            }
        })
        .map_err(|e| BackendError::InitializationFailed(e.to_string()))?;

        self.frame_loop = Some(frame_loop);
        info!(%size, %facing, fps = self.config.fps, "Virtual camera streaming");

        Ok(CameraStream {
            native_size: size,
            frames: receiver,
        })
    }
}

impl CameraService for VirtualCameraService {
    fn start(&mut self, facing: CameraFacing) -> oneshot::Receiver<BackendResult<CameraStream>> {
        let (responder, receiver) = oneshot::channel();
        // Replace any previous stream; its receivers observe the channel closing
        self.stop();
        let _ = responder.send(self.spawn_stream(facing));
        receiver
    }

    /// Stop producing frames
    ///
    /// Inside a tokio runtime the frame thread is joined on the blocking pool
    /// so the caller's task never waits out a frame interval.
    fn stop(&mut self) {
        let Some(mut frame_loop) = self.frame_loop.take() else {
            return;
        };
        debug!("Stopping virtual camera");
        frame_loop.signal_stop();

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn_blocking(move || frame_loop.stop());
            }
            Err(_) => frame_loop.stop(),
        }
    }
}

/// Render one RGBA test pattern frame
///
/// Horizontal/vertical gradient with a vertical bar that moves one step per
/// frame. The front camera pattern is tinted blue, the back one red.
pub fn test_pattern(size: FrameSize, facing: CameraFacing, sequence: u64) -> CameraFrame {
    let (width, height) = (size.width as usize, size.height as usize);
    let stride = width * 4;
    let mut data = vec![0u8; stride * height];

    let bar_width = (width / 16).max(1);
    let bar_x = (sequence as usize * 4) % width.max(1);

    for y in 0..height {
        let row = &mut data[y * stride..(y + 1) * stride];
        let g = (y * 255 / height.max(1)) as u8;
        for (x, px) in row.chunks_exact_mut(4).enumerate() {
            let ramp = (x * 255 / width.max(1)) as u8;
            let in_bar = x >= bar_x && x < bar_x + bar_width;
            let (r, b) = match facing {
                CameraFacing::Back => (ramp, 64),
                CameraFacing::Front => (64, ramp),
            };
            if in_bar {
                px.copy_from_slice(&[255, 255, 255, 255]);
            } else {
                px.copy_from_slice(&[r, g, b, 255]);
            }
        }
    }

    CameraFrame {
        width: size.width,
        height: size.height,
        data: Arc::from(data),
        stride: stride as u32,
        sequence,
        captured_at: Instant::now(),
    }
}

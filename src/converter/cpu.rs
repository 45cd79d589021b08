// SPDX-License-Identifier: GPL-3.0-only

//! Software conversion context
//!
//! Resamples RGBA camera frames to the display size with nearest-neighbour
//! lookup. Needs no adapter, so it backs headless sessions and tests.

use super::{RenderContext, TextureConverter};
use crate::backends::camera::{CameraFrame, DisplaySize, FrameSize};
use crate::errors::{BridgeError, BridgeResult};
use tracing::debug;

/// Rendering context for [`CpuTextureConverter`]
#[derive(Debug, Clone, Copy, Default)]
pub struct CpuContext;

impl RenderContext for CpuContext {
    type Converter = CpuTextureConverter;

    fn share(&self) -> Self {
        *self
    }

    fn create_converter(&self) -> BridgeResult<CpuTextureConverter> {
        Ok(CpuTextureConverter::default())
    }
}

/// Tightly packed RGBA image at display size
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuTexture {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    /// Sequence number of the camera frame this was converted from
    pub sequence: u64,
}

impl CpuTexture {
    /// RGBA value at (x, y)
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        [
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        ]
    }
}

/// Nearest-neighbour RGBA scaler
#[derive(Debug, Default)]
pub struct CpuTextureConverter {
    input: Option<FrameSize>,
    output: Option<DisplaySize>,
    /// Source byte offset within a row for each output column
    column_offsets: Vec<usize>,
    /// Source row for each output row
    rows: Vec<usize>,
}

impl TextureConverter for CpuTextureConverter {
    type Texture = CpuTexture;

    fn configure(&mut self, input: FrameSize, output: DisplaySize) -> BridgeResult<()> {
        if input.is_empty() || output.width == 0 || output.height == 0 {
            return Err(BridgeError::InvalidState(format!(
                "cannot scale {} to {}",
                input, output
            )));
        }

        // Sample at pixel centres: src = (dst + 0.5) * in / out
        self.column_offsets = (0..output.width as u64)
            .map(|x| {
                let src = ((2 * x + 1) * input.width as u64 / (2 * output.width as u64))
                    .min(input.width as u64 - 1);
                src as usize * 4
            })
            .collect();
        self.rows = (0..output.height as u64)
            .map(|y| {
                ((2 * y + 1) * input.height as u64 / (2 * output.height as u64))
                    .min(input.height as u64 - 1) as usize
            })
            .collect();

        self.input = Some(input);
        self.output = Some(output);
        debug!(%input, %output, "CPU converter configured");
        Ok(())
    }

    fn convert(&mut self, frame: &CameraFrame) -> BridgeResult<CpuTexture> {
        let (Some(input), Some(output)) = (self.input, self.output) else {
            return Err(BridgeError::InvalidState(
                "CPU converter used before configure".into(),
            ));
        };
        if frame.size() != input {
            return Err(BridgeError::InvalidState(format!(
                "frame {} does not match configured input {}",
                frame.size(),
                input
            )));
        }

        let stride = frame.stride as usize;
        let mut data = Vec::with_capacity(output.width as usize * output.height as usize * 4);
        for &src_row in &self.rows {
            let row = &frame.data[src_row * stride..];
            for &offset in &self.column_offsets {
                data.extend_from_slice(&row[offset..offset + 4]);
            }
        }

        Ok(CpuTexture {
            width: output.width,
            height: output.height,
            data,
            sequence: frame.sequence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Instant;

    fn quadrant_frame(width: u32, height: u32, stride: u32) -> CameraFrame {
        let mut data = vec![0u8; (stride * height) as usize];
        for y in 0..height {
            for x in 0..width {
                let idx = (y * stride + x * 4) as usize;
                let left = x < width / 2;
                let top = y < height / 2;
                let px = match (left, top) {
                    (true, true) => [255, 0, 0, 255],
                    (false, true) => [0, 255, 0, 255],
                    (true, false) => [0, 0, 255, 255],
                    (false, false) => [255, 255, 255, 255],
                };
                data[idx..idx + 4].copy_from_slice(&px);
            }
        }
        CameraFrame {
            width,
            height,
            data: Arc::from(data),
            stride,
            sequence: 9,
            captured_at: Instant::now(),
        }
    }

    #[test]
    fn test_downscale_keeps_quadrants() {
        let mut converter = CpuContext.create_converter().unwrap();
        converter
            .configure(FrameSize::new(8, 8), DisplaySize::new(4, 4))
            .unwrap();

        let texture = converter.convert(&quadrant_frame(8, 8, 32)).unwrap();
        assert_eq!((texture.width, texture.height), (4, 4));
        assert_eq!(texture.data.len(), 4 * 4 * 4);
        assert_eq!(texture.sequence, 9);
        assert_eq!(texture.pixel(0, 0), [255, 0, 0, 255]);
        assert_eq!(texture.pixel(3, 0), [0, 255, 0, 255]);
        assert_eq!(texture.pixel(0, 3), [0, 0, 255, 255]);
        assert_eq!(texture.pixel(3, 3), [255, 255, 255, 255]);
    }

    #[test]
    fn test_padded_stride() {
        let mut converter = CpuTextureConverter::default();
        converter
            .configure(FrameSize::new(4, 4), DisplaySize::new(8, 8))
            .unwrap();

        let texture = converter.convert(&quadrant_frame(4, 4, 24)).unwrap();
        assert_eq!(texture.pixel(7, 7), [255, 255, 255, 255]);
        assert_eq!(texture.pixel(1, 6), [0, 0, 255, 255]);
    }

    #[test]
    fn test_convert_before_configure_fails() {
        let mut converter = CpuTextureConverter::default();
        assert!(converter.convert(&quadrant_frame(4, 4, 16)).is_err());
    }

    #[test]
    fn test_wrong_input_size_fails() {
        let mut converter = CpuTextureConverter::default();
        converter
            .configure(FrameSize::new(8, 8), DisplaySize::new(4, 4))
            .unwrap();
        assert!(converter.convert(&quadrant_frame(4, 4, 16)).is_err());
    }
}

// SPDX-License-Identifier: GPL-3.0-only
//! Compute shaders for frame conversion
//!
//! All conversion operates on RGBA textures.

mod scale_convert;

pub use scale_convert::{
    GpuTexture, SCALE_RGBA_SHADER, WgpuTextureConverter, compute_dispatch_size,
};

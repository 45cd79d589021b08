// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for constants module

use preview_bridge::constants::{self, ConverterBackend};
use preview_bridge::shaders::SCALE_RGBA_SHADER;

#[test]
fn test_converter_backends() {
    assert_eq!(ConverterBackend::ALL.len(), 2);
    assert_eq!(ConverterBackend::default(), ConverterBackend::Gpu);
}

#[test]
fn test_converter_display_names() {
    for backend in ConverterBackend::ALL {
        assert!(
            !backend.display_name().is_empty(),
            "Backend {:?} should have a display name",
            backend
        );
    }
}

#[test]
fn test_converter_serde_names() {
    assert_eq!(
        serde_json::to_string(&ConverterBackend::Cpu).unwrap(),
        "\"cpu\""
    );
    assert_eq!(
        serde_json::from_str::<ConverterBackend>("\"gpu\"").unwrap(),
        ConverterBackend::Gpu
    );
}

#[test]
fn test_workgroup_size_matches_shader() {
    let size = constants::gpu::WORKGROUP_SIZE;
    assert!(SCALE_RGBA_SHADER.contains(&format!("@workgroup_size({}, {})", size, size)));
}

#[test]
fn test_virtual_camera_defaults_are_usable() {
    use constants::virtual_camera::*;
    assert!(DEFAULT_WIDTH > 0 && DEFAULT_HEIGHT > 0);
    assert!(DEFAULT_FPS > 0);
}

#[test]
fn test_output_ring_holds_previous_frame() {
    assert!(constants::gpu::OUTPUT_TEXTURE_RING >= 2);
}

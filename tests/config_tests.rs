// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for configuration module

use preview_bridge::config::{GraphConfig, VirtualCameraConfig};
use preview_bridge::{BridgeError, CameraFacing, Config, ConverterBackend};
use std::path::PathBuf;

fn temp_config_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "preview-bridge-{}-{}.json",
        name,
        std::process::id()
    ))
}

#[test]
fn test_config_default() {
    let config = Config::default();

    assert_eq!(config.camera_facing, CameraFacing::Back);
    assert_eq!(config.converter, ConverterBackend::Gpu);
    assert_eq!(
        config.graph.binary_graph_name,
        "edge_detection_mobile_gpu.binarypb"
    );
    assert_eq!(config.graph.input_video_stream, "input_video");
    assert_eq!(config.graph.output_video_stream, "output_video");
    assert_eq!(
        config.virtual_camera,
        VirtualCameraConfig {
            width: 640,
            height: 480,
            fps: 30
        }
    );
}

#[test]
fn test_partial_json_keeps_defaults() {
    let config = Config::from_json_str(r#"{ "camera_facing": "front" }"#).unwrap();
    assert_eq!(config.camera_facing, CameraFacing::Front);
    assert_eq!(config.graph, GraphConfig::default());
    assert_eq!(config.virtual_camera, VirtualCameraConfig::default());
}

#[test]
fn test_full_json() {
    let json = r#"{
        "camera_facing": "back",
        "graph": {
            "binary_graph_name": "face_detection.binarypb",
            "input_video_stream": "frames_in",
            "output_video_stream": "frames_out"
        },
        "converter": "cpu",
        "virtual_camera": { "width": 320, "height": 240, "fps": 15 }
    }"#;
    let config = Config::from_json_str(json).unwrap();
    assert_eq!(config.converter, ConverterBackend::Cpu);
    assert_eq!(config.graph.binary_graph_name, "face_detection.binarypb");
    assert_eq!(config.virtual_camera.fps, 15);
}

#[test]
fn test_zero_fps_is_rejected() {
    let result = Config::from_json_str(r#"{ "virtual_camera": { "fps": 0 } }"#);
    assert!(matches!(result, Err(BridgeError::Config(_))));
}

#[test]
fn test_unknown_facing_is_rejected() {
    let result = Config::from_json_str(r#"{ "camera_facing": "sideways" }"#);
    assert!(matches!(result, Err(BridgeError::Config(_))));
}

#[test]
fn test_json_round_trip() {
    let mut config = Config::default();
    config.camera_facing = CameraFacing::Front;
    config.converter = ConverterBackend::Cpu;

    let json = config.to_json_pretty().unwrap();
    assert!(json.contains("\"front\""));
    assert_eq!(Config::from_json_str(&json).unwrap(), config);
}

#[test]
fn test_load_from_file() {
    let path = temp_config_path("load");
    std::fs::write(&path, r#"{ "converter": "cpu" }"#).unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.converter, ConverterBackend::Cpu);

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn test_load_or_default_missing_file() {
    let path = temp_config_path("missing");
    let config = Config::load_or_default(&path).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_load_or_default_broken_file_is_error() {
    let path = temp_config_path("broken");
    std::fs::write(&path, "{ not json").unwrap();

    assert!(Config::load_or_default(&path).is_err());

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn test_default_path_location() {
    if let Some(path) = Config::default_path() {
        assert!(path.ends_with("preview-bridge/config.json"));
    }
}

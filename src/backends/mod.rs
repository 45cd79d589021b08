// SPDX-License-Identifier: GPL-3.0-only

//! Camera backend layer
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               Preview Bridge                │
//! └────────────────────┬────────────────────────┘
//!                      │
//! ┌────────────────────┴────────────────────────┐
//! │              Backend Layer                  │
//! │  ┌──────────────────┐  ┌────────────────┐   │
//! │  │ Camera controller│  │ Virtual camera │   │
//! │  │ + service trait  │  │ (test pattern) │   │
//! │  └──────────────────┘  └────────────────┘   │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`camera`]: Camera service contract, controller and shared types
//! - [`virtual_camera`]: Software camera for headless sessions and tests

pub mod camera;
pub mod virtual_camera;

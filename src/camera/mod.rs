//! Webcam access: enumeration, live streaming, and still capture.
//!
//! - Device enumeration via [`list_devices`]
//! - Exclusive stream ownership and stills via [`CameraController`]
//! - Raw stream plumbing via [`CameraCapture`]
//! - Configuration via [`CameraSettings`] and [`Resolution`]

mod capture;
mod capture_loop;
mod controller;
mod device;
mod frame_utils;
mod types;

pub use capture::CameraCapture;
pub use controller::{CameraController, Still};
pub use device::list_devices;
pub use types::{CameraError, CameraInfo, CameraSettings, Frame, FrameFormat, Resolution};

//! Exclusive owner of the camera device.
//!
//! Everything above this module goes through `CameraController`; nothing
//! else touches the device. The controller holds at most one live stream
//! and releases it on stop, on still capture, on start failure, and on
//! drop.

use log::{debug, info};

use super::capture::CameraCapture;
use super::frame_utils::encode_jpeg;
use super::types::{CameraError, CameraSettings, Frame, Resolution};

/// A still image taken from the live stream, encoded as JPEG.
#[derive(Debug, Clone)]
pub struct Still {
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Owns the (at most one) active camera stream.
#[derive(Debug)]
pub struct CameraController {
    settings: CameraSettings,
    capture: Option<CameraCapture>,
}

impl CameraController {
    pub fn new(settings: CameraSettings) -> Self {
        Self {
            settings,
            capture: None,
        }
    }

    /// Open the device and start streaming.
    ///
    /// Any stream already held is stopped and released first, so two
    /// starts in a row never hold two streams. On error the controller
    /// holds nothing.
    pub fn start(&mut self) -> Result<(), CameraError> {
        self.stop();

        let mut capture = CameraCapture::open(self.settings.clone())?;
        capture.start()?;
        if let Some(res) = capture.actual_resolution() {
            info!(
                "Camera {} streaming at {}x{}",
                self.settings.device_index, res.width, res.height
            );
        }
        self.capture = Some(capture);
        Ok(())
    }

    /// Stop streaming and release the device. No-op when nothing is
    /// active, so it is safe to call during teardown.
    pub fn stop(&mut self) {
        if let Some(mut capture) = self.capture.take() {
            capture.stop();
            debug!("Camera released");
        }
    }

    /// Take a still from the live stream, then release the camera.
    ///
    /// The newest frame in the buffer is used as-is; mirroring was
    /// already applied in the capture loop, so the still matches the
    /// preview. The device is released whether or not this succeeds.
    ///
    /// # Errors
    /// * `CameraError::NoFrame` - no stream, or no frame decoded yet
    /// * `CameraError::EncodeFailed` - the frame would not encode
    pub fn capture_still(&mut self) -> Result<Still, CameraError> {
        let result = match self.capture.as_ref().and_then(|c| c.latest_frame()) {
            Some(frame) => encode_jpeg(&frame)
                .map(|jpeg| Still {
                    jpeg,
                    width: frame.width,
                    height: frame.height,
                })
                .map_err(|e| CameraError::EncodeFailed(e.to_string())),
            None => Err(CameraError::NoFrame),
        };

        self.stop();
        result
    }

    /// Newest frame for the live preview, `None` before the first one.
    pub fn latest_frame(&self) -> Option<Frame> {
        self.capture.as_ref().and_then(|c| c.latest_frame())
    }

    /// Resolution the device actually delivers, once streaming.
    pub fn actual_resolution(&self) -> Option<Resolution> {
        self.capture.as_ref().and_then(|c| c.actual_resolution())
    }

    /// Whether a stream is currently held and its thread alive.
    pub fn is_active(&self) -> bool {
        self.capture.as_ref().is_some_and(|c| c.is_running())
    }
}

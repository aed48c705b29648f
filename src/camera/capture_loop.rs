//! Background capture thread implementation.

use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    CameraFormat, CameraIndex, FrameFormat as NokhwaFrameFormat, RequestedFormat,
    RequestedFormatType,
};
use nokhwa::Camera;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use super::frame_utils::{convert_to_rgb, mirror_horizontal};
use super::types::{CameraError, CameraSettings, Frame, Resolution};

/// Commands sent to the capture thread.
pub enum CaptureCommand {
    Stop,
}

/// Run the capture loop in a background thread.
///
/// The nokhwa camera is created and dropped entirely inside this thread.
/// The startup result (actual resolution and fps, or the open error) is
/// reported once through `info_tx`.
pub fn run_capture_loop(
    settings: CameraSettings,
    buffer: Arc<Mutex<Option<Frame>>>,
    stop: Arc<AtomicBool>,
    rx: Receiver<CaptureCommand>,
    info_tx: Sender<Result<(Resolution, u32), CameraError>>,
) {
    let index = CameraIndex::Index(settings.device_index);

    let mut camera = match open_camera_with_fallback(&index, &settings) {
        Ok(cam) => cam,
        Err(e) => {
            let _ = info_tx.send(Err(e));
            return;
        }
    };

    if let Err(e) = camera.open_stream() {
        let _ = info_tx.send(Err(CameraError::StreamFailed(e.to_string())));
        return;
    }

    let res = camera.resolution();
    let actual_res = Resolution {
        width: res.width(),
        height: res.height(),
    };
    let actual_fps = camera.frame_rate();
    let _ = info_tx.send(Ok((actual_res, actual_fps)));

    while !stop.load(Ordering::Relaxed) {
        if let Ok(CaptureCommand::Stop) = rx.try_recv() {
            break;
        }

        if let Ok(raw_frame) = camera.frame() {
            if let Some(mut frame) = convert_to_rgb(&raw_frame) {
                if settings.mirror {
                    mirror_horizontal(&mut frame);
                }

                if let Ok(mut buf) = buffer.lock() {
                    *buf = Some(frame);
                }
            }
            // Undecodable frames are skipped; the next one usually decodes.
        }

        // Short sleep keeps the stop signal responsive.
        thread::sleep(Duration::from_millis(1));
    }

    let _ = camera.stop_stream();
}

/// Open a camera, trying format strategies in order of preference:
/// NV12 closest match, MJPEG closest match, then whatever highest
/// resolution the device offers.
fn open_camera_with_fallback(
    index: &CameraIndex,
    settings: &CameraSettings,
) -> Result<Camera, CameraError> {
    let requested_resolution =
        nokhwa::utils::Resolution::new(settings.resolution.width, settings.resolution.height);
    let format_attempts: Vec<RequestedFormat> = vec![
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(CameraFormat::new(
            requested_resolution,
            NokhwaFrameFormat::NV12,
            settings.fps,
        ))),
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(CameraFormat::new(
            requested_resolution,
            NokhwaFrameFormat::MJPEG,
            settings.fps,
        ))),
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestResolution),
    ];

    let mut last_error = None;
    for requested in format_attempts {
        match Camera::new(index.clone(), requested) {
            Ok(cam) => return Ok(cam),
            Err(e) => last_error = Some(e),
        }
    }

    let msg = last_error
        .map(|e| e.to_string())
        .unwrap_or_else(|| "no camera formats to try".to_string());
    Err(classify_open_error(&msg))
}

/// Map a backend open failure onto our error type. Backends phrase
/// permission problems differently, so match on keywords.
fn classify_open_error(msg: &str) -> CameraError {
    let lower = msg.to_lowercase();
    if lower.contains("permission")
        || lower.contains("denied")
        || lower.contains("authorization")
        || lower.contains("access")
    {
        CameraError::PermissionDenied
    } else {
        CameraError::OpenFailed(msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_open_error_permission_keywords() {
        assert!(matches!(
            classify_open_error("Operation not permitted: access denied"),
            CameraError::PermissionDenied
        ));
        assert!(matches!(
            classify_open_error("AVFoundation authorization required"),
            CameraError::PermissionDenied
        ));
        assert!(matches!(
            classify_open_error("PERMISSION refused by TCC"),
            CameraError::PermissionDenied
        ));
    }

    #[test]
    fn test_classify_open_error_other_failures() {
        match classify_open_error("device busy") {
            CameraError::OpenFailed(msg) => assert_eq!(msg, "device busy"),
            other => panic!("expected OpenFailed, got {:?}", other),
        }
    }
}

//! Camera capture handle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use super::capture_loop::{run_capture_loop, CaptureCommand};
use super::device::list_devices;
use super::types::{CameraError, CameraSettings, Frame, Resolution};

/// Handle to one camera stream.
///
/// The nokhwa camera itself lives in a background thread that decodes
/// frames continuously and publishes the newest one into a shared slot.
/// `open()` only validates the device; the stream starts with `start()`
/// and every frame after that comes from `latest_frame()`.
pub struct CameraCapture {
    /// Latest decoded frame, shared with the capture thread
    frame_buffer: Arc<Mutex<Option<Frame>>>,
    /// Capture thread handle
    capture_thread: Option<JoinHandle<()>>,
    /// Channel to send commands to the capture thread
    command_tx: Option<Sender<CaptureCommand>>,
    /// Signal to stop the capture thread
    stop_signal: Arc<AtomicBool>,
    /// Requested settings
    settings: CameraSettings,
    /// Actual resolution, known once the camera opens
    actual_resolution: Option<Resolution>,
    /// Actual FPS, known once the camera opens
    actual_fps: Option<u32>,
}

impl std::fmt::Debug for CameraCapture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraCapture")
            .field("settings", &self.settings)
            .field("is_running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl CameraCapture {
    /// Validate that the device exists and build an idle handle.
    ///
    /// The device itself is opened inside the background thread on
    /// `start()`, since the camera type is not safe to move across
    /// threads.
    ///
    /// # Errors
    /// * `CameraError::DeviceNotFound` - no device at the given index
    pub fn open(settings: CameraSettings) -> Result<Self, CameraError> {
        let devices = list_devices()?;
        if !devices.iter().any(|d| d.index == settings.device_index) {
            return Err(CameraError::DeviceNotFound(settings.device_index));
        }

        Ok(Self {
            frame_buffer: Arc::new(Mutex::new(None)),
            capture_thread: None,
            command_tx: None,
            stop_signal: Arc::new(AtomicBool::new(false)),
            settings,
            actual_resolution: None,
            actual_fps: None,
        })
    }

    /// The settings this handle was opened with.
    pub fn settings(&self) -> &CameraSettings {
        &self.settings
    }

    /// Resolution the camera actually delivers. `None` until started;
    /// may differ from the requested resolution.
    pub fn actual_resolution(&self) -> Option<Resolution> {
        self.actual_resolution
    }

    /// Frame rate the camera actually delivers. `None` until started.
    pub fn actual_fps(&self) -> Option<u32> {
        self.actual_fps
    }

    /// Start the stream in a background thread.
    ///
    /// Blocks until the thread reports the opened format or the open
    /// error, so a returned `Ok` means frames are on their way.
    ///
    /// # Errors
    /// * `CameraError::AlreadyRunning` - capture is already running
    /// * `CameraError::PermissionDenied` - camera access was denied
    /// * `CameraError::OpenFailed` / `CameraError::StreamFailed`
    pub fn start(&mut self) -> Result<(), CameraError> {
        if self.is_running() {
            return Err(CameraError::AlreadyRunning);
        }

        self.stop_signal.store(false, Ordering::SeqCst);

        let (tx, rx) = mpsc::channel();
        self.command_tx = Some(tx);

        let buffer = Arc::clone(&self.frame_buffer);
        let stop = Arc::clone(&self.stop_signal);
        let settings = self.settings.clone();

        // Startup handshake: the thread reports the actual format once.
        let (info_tx, info_rx) = mpsc::channel::<Result<(Resolution, u32), CameraError>>();

        let handle = std::thread::spawn(move || {
            run_capture_loop(settings, buffer, stop, rx, info_tx);
        });

        self.capture_thread = Some(handle);

        match info_rx.recv() {
            Ok(Ok((res, fps))) => {
                self.actual_resolution = Some(res);
                self.actual_fps = Some(fps);
                Ok(())
            }
            Ok(Err(e)) => {
                self.stop_signal.store(true, Ordering::SeqCst);
                if let Some(h) = self.capture_thread.take() {
                    let _ = h.join();
                }
                Err(e)
            }
            Err(_) => {
                self.stop_signal.store(true, Ordering::SeqCst);
                if let Some(h) = self.capture_thread.take() {
                    let _ = h.join();
                }
                Err(CameraError::StreamFailed(
                    "Capture thread terminated unexpectedly".to_string(),
                ))
            }
        }
    }

    /// Stop the capture thread and release the device.
    ///
    /// Signals the thread both ways (atomic flag and channel) and joins
    /// it. Idempotent; calling with no thread running does nothing.
    pub fn stop(&mut self) {
        self.stop_signal.store(true, Ordering::SeqCst);

        if let Some(tx) = self.command_tx.take() {
            let _ = tx.send(CaptureCommand::Stop);
        }

        if let Some(handle) = self.capture_thread.take() {
            let _ = handle.join();
        }
    }

    /// Latest decoded frame, or `None` before the first frame arrives.
    pub fn latest_frame(&self) -> Option<Frame> {
        let buffer = self.frame_buffer.lock().ok()?;
        buffer.clone()
    }

    /// Whether the capture thread is currently running.
    pub fn is_running(&self) -> bool {
        self.capture_thread
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }
}

impl Drop for CameraCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

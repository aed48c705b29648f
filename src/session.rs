//! Classification session state machine.
//!
//! A pure reducer: `CaptureSession::handle` consumes an event, moves the
//! state, and returns the effects the caller must execute (start or stop
//! the camera, take a still, run a classification). Nothing in here
//! touches a device or spawns a task, which keeps every transition
//! testable on its own.

use std::path::PathBuf;
use std::sync::Arc;

use log::debug;

use crate::model::{top_prediction, Prediction};

/// Shown when a still could not be taken.
pub const CAPTURE_ERROR_MESSAGE: &str = "Error capturing image. Please try again.";

/// Shown when an image could not be classified.
pub const PROCESSING_ERROR_MESSAGE: &str = "Error processing image. Please try again.";

/// Shown while the model load has failed; this one is terminal.
pub const MODEL_LOAD_ERROR_MESSAGE: &str = "Failed to load model. Restart the app to try again.";

/// Where the current image came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Camera,
    File(PathBuf),
}

/// The image under consideration: encoded bytes (JPEG, PNG, ...) plus
/// provenance. Bytes are shared, so clones are cheap.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionImage {
    pub bytes: Arc<Vec<u8>>,
    pub source: ImageSource,
}

impl SessionImage {
    pub fn from_camera(jpeg: Vec<u8>) -> Self {
        Self {
            bytes: Arc::new(jpeg),
            source: ImageSource::Camera,
        }
    }

    pub fn from_file(path: PathBuf, bytes: Vec<u8>) -> Self {
        Self {
            bytes: Arc::new(bytes),
            source: ImageSource::File(path),
        }
    }
}

/// What the session is currently showing.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// Nothing captured yet, camera off
    Idle,
    /// Live preview running
    CameraActive,
    /// An image is held but has no prediction (e.g. its error was
    /// dismissed)
    HasImage(SessionImage),
    /// A classification is in flight for this image
    Analyzing(SessionImage),
    /// Classification finished; the top prediction is shown
    Result(SessionImage, Prediction),
    /// A recoverable error, optionally still showing the image
    Error(Option<SessionImage>, String),
}

/// Availability of the classifier.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelStatus {
    Loading,
    Ready,
    Failed(String),
}

/// Everything that can happen to a session.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    ModelLoaded,
    ModelLoadFailed(String),
    /// User asked for the camera
    CameraRequested,
    /// The camera actually started
    CameraStarted,
    /// The camera could not start
    CameraFailed(String),
    /// User asked to stop the camera
    StopRequested,
    /// User asked to take the still
    CaptureRequested,
    CaptureSucceeded(SessionImage),
    CaptureFailed(String),
    /// User supplied an image file
    UploadRequested(SessionImage),
    /// The chosen file could not be read
    UploadFailed(String),
    /// User dismissed the error banner
    ErrorDismissed,
    ClassificationSucceeded {
        generation: u64,
        predictions: Vec<Prediction>,
    },
    ClassificationFailed {
        generation: u64,
        message: String,
    },
}

/// Work the caller must perform after a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEffect {
    StartCamera,
    StopCamera,
    CaptureStill,
    Classify { image: SessionImage, generation: u64 },
}

/// One run's worth of capture and classification state.
///
/// The generation counter increments every time a new image heads into
/// classification; completion events carry the generation they were
/// started with, and any result from an older generation is dropped.
/// The newest submission always wins.
#[derive(Debug)]
pub struct CaptureSession {
    state: SessionState,
    model: ModelStatus,
    generation: u64,
}

impl Default for CaptureSession {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureSession {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            model: ModelStatus::Loading,
            generation: 0,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn model_status(&self) -> &ModelStatus {
        &self.model
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Camera and upload controls are usable only with a ready model.
    pub fn controls_enabled(&self) -> bool {
        self.model == ModelStatus::Ready
    }

    /// Apply one event and return the effects to execute.
    pub fn handle(&mut self, event: SessionEvent) -> Vec<SessionEffect> {
        match event {
            SessionEvent::ModelLoaded => {
                self.model = ModelStatus::Ready;
                vec![]
            }
            SessionEvent::ModelLoadFailed(message) => {
                // A failure never clobbers an earlier successful load.
                if self.model != ModelStatus::Ready {
                    self.model = ModelStatus::Failed(message);
                }
                vec![]
            }
            SessionEvent::CameraRequested => {
                if !self.controls_enabled() {
                    debug!("Camera request ignored: model not ready");
                    return vec![];
                }
                match self.state {
                    SessionState::CameraActive | SessionState::Analyzing(_) => vec![],
                    _ => vec![SessionEffect::StartCamera],
                }
            }
            SessionEvent::CameraStarted => {
                // Entering the live view drops any prior image, result,
                // or error banner.
                self.state = SessionState::CameraActive;
                vec![]
            }
            SessionEvent::CameraFailed(message) => {
                self.state = SessionState::Error(self.current_image(), message);
                vec![]
            }
            SessionEvent::StopRequested => match self.state {
                SessionState::CameraActive => {
                    self.state = SessionState::Idle;
                    vec![SessionEffect::StopCamera]
                }
                // Stopping without a live camera is a no-op.
                _ => vec![],
            },
            SessionEvent::CaptureRequested => match self.state {
                SessionState::CameraActive => vec![SessionEffect::CaptureStill],
                _ => vec![],
            },
            SessionEvent::CaptureSucceeded(image) => self.begin_classification(image),
            SessionEvent::CaptureFailed(message) => {
                // The controller released the camera as part of the
                // attempt, so only the state needs fixing up.
                self.state = SessionState::Error(None, message);
                vec![]
            }
            SessionEvent::UploadRequested(image) => {
                if !self.controls_enabled() {
                    debug!("Upload ignored: model not ready");
                    return vec![];
                }
                if self.state == SessionState::CameraActive {
                    debug!("Upload ignored while the camera is live");
                    return vec![];
                }
                // Replaces whatever was there, including an in-flight
                // classification; the bumped generation orphans it.
                self.begin_classification(image)
            }
            SessionEvent::UploadFailed(message) => {
                self.state = SessionState::Error(self.current_image(), message);
                vec![]
            }
            SessionEvent::ErrorDismissed => {
                if let SessionState::Error(image, _) = &self.state {
                    self.state = match image.clone() {
                        Some(img) => SessionState::HasImage(img),
                        None => SessionState::Idle,
                    };
                }
                vec![]
            }
            SessionEvent::ClassificationSucceeded {
                generation,
                predictions,
            } => {
                if generation != self.generation {
                    debug!(
                        "Dropping stale classification result (generation {}, current {})",
                        generation, self.generation
                    );
                    return vec![];
                }
                if let SessionState::Analyzing(image) = self.state.clone() {
                    self.state = match top_prediction(&predictions) {
                        Some(top) => SessionState::Result(image, top.clone()),
                        None => SessionState::Error(
                            Some(image),
                            PROCESSING_ERROR_MESSAGE.to_string(),
                        ),
                    };
                }
                vec![]
            }
            SessionEvent::ClassificationFailed {
                generation,
                message,
            } => {
                if generation != self.generation {
                    debug!(
                        "Dropping stale classification failure (generation {}, current {})",
                        generation, self.generation
                    );
                    return vec![];
                }
                if let SessionState::Analyzing(image) = self.state.clone() {
                    self.state = SessionState::Error(Some(image), message);
                }
                vec![]
            }
        }
    }

    fn begin_classification(&mut self, image: SessionImage) -> Vec<SessionEffect> {
        self.generation += 1;
        self.state = SessionState::Analyzing(image.clone());
        vec![SessionEffect::Classify {
            image,
            generation: self.generation,
        }]
    }

    fn current_image(&self) -> Option<SessionImage> {
        match &self.state {
            SessionState::HasImage(img) | SessionState::Analyzing(img) => Some(img.clone()),
            SessionState::Result(img, _) => Some(img.clone()),
            SessionState::Error(img, _) => img.clone(),
            SessionState::Idle | SessionState::CameraActive => None,
        }
    }
}

//! Async event loop for the interactive checker.
//!
//! Coordinates three concurrent concerns with tokio::select!:
//! 1. Terminal events (keyboard input, resize) via crossterm EventStream
//! 2. Background task completions (model load, classification) via a
//!    tokio channel
//! 3. The live preview refresh tick (~15 FPS)
//!
//! Session transitions stay inside [`CaptureSession`]; this module only
//! executes the effects it returns and feeds outcomes back in.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{Event, EventStream, KeyEvent};
use futures_util::StreamExt;
use log::{debug, error, info, warn};
use tokio::sync::mpsc;

use crate::camera::CameraController;
use crate::input::{handle_key_event, InputMode, UiAction};
use crate::model::{LoadedModel, ModelClient, Prediction};
use crate::preview::{AsciiFrame, CharSet, PreviewRenderer};
use crate::session::{
    CaptureSession, SessionEffect, SessionEvent, SessionImage, SessionState,
    CAPTURE_ERROR_MESSAGE, PROCESSING_ERROR_MESSAGE,
};
use crate::terminal::{Tui, ViewState};

/// Global flag for handling Ctrl+C across the application
static CTRLC_RECEIVED: AtomicBool = AtomicBool::new(false);

/// Check if Ctrl+C has been received.
pub fn ctrlc_received() -> bool {
    CTRLC_RECEIVED.load(Ordering::SeqCst)
}

/// Set up the Ctrl+C handler.
///
/// This should be called once at program startup. The handler only sets
/// a flag: it can fire while the TUI owns the screen, so it must not
/// write to stderr.
pub fn setup_ctrlc_handler() -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        CTRLC_RECEIVED.store(true, Ordering::SeqCst);
    })
}

/// Initial display settings from config and flags.
#[derive(Debug, Clone, Copy)]
pub struct UiOptions {
    pub charset: CharSet,
    pub invert: bool,
    pub show_status: bool,
    pub mirror: bool,
}

impl Default for UiOptions {
    fn default() -> Self {
        Self {
            charset: CharSet::Standard,
            invert: false,
            show_status: true,
            mirror: true,
        }
    }
}

/// Completion messages from background tasks.
enum TaskMessage {
    ModelReady(Box<LoadedModel>),
    ModelFailed(String),
    Classified {
        generation: u64,
        result: Result<Vec<Prediction>, String>,
    },
}

/// Cached character grid for the current still, keyed by the image
/// bytes and the render settings that produced it.
struct StillCache {
    src: Arc<Vec<u8>>,
    charset: CharSet,
    invert: bool,
    cols: u16,
    rows: u16,
    frame: AsciiFrame,
}

/// Everything the loop mutates between events.
struct App {
    session: CaptureSession,
    controller: CameraController,
    model: Option<Arc<LoadedModel>>,
    task_tx: mpsc::Sender<TaskMessage>,
    input_mode: InputMode,
    show_info: bool,
    show_status: bool,
    charset: CharSet,
    invert: bool,
    mirror: bool,
    renderer: PreviewRenderer,
    still: Option<StillCache>,
    dirty: bool,
    quit: bool,
}

impl App {
    fn new(
        session: CaptureSession,
        controller: CameraController,
        task_tx: mpsc::Sender<TaskMessage>,
        options: UiOptions,
    ) -> Self {
        Self {
            session,
            controller,
            model: None,
            task_tx,
            input_mode: InputMode::Keys,
            show_info: false,
            show_status: options.show_status,
            charset: options.charset,
            invert: options.invert,
            mirror: options.mirror,
            renderer: PreviewRenderer::new(),
            still: None,
            dirty: true,
            quit: false,
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        match handle_key_event(key, &mut self.input_mode) {
            UiAction::Quit => self.quit = true,
            UiAction::StartCamera => self.apply(SessionEvent::CameraRequested),
            UiAction::StopCamera => self.apply(SessionEvent::StopRequested),
            UiAction::Capture => self.apply(SessionEvent::CaptureRequested),
            UiAction::SubmitPath(path) => self.submit_path(path),
            UiAction::BeginPathEntry | UiAction::PathEdited | UiAction::CancelPathEntry => {}
            UiAction::Dismiss => {
                if self.show_info {
                    self.show_info = false;
                } else {
                    self.apply(SessionEvent::ErrorDismissed);
                }
            }
            UiAction::ToggleInfo => self.show_info = !self.show_info,
            UiAction::CycleCharset => self.charset = self.charset.next(),
            UiAction::ToggleInvert => self.invert = !self.invert,
            UiAction::ToggleStatusBar => self.show_status = !self.show_status,
            UiAction::None => return,
        }
        self.dirty = true;
    }

    fn on_task(&mut self, msg: TaskMessage) {
        match msg {
            TaskMessage::ModelReady(model) => {
                self.model = Some(Arc::from(model));
                self.apply(SessionEvent::ModelLoaded);
            }
            TaskMessage::ModelFailed(message) => {
                error!("Model load failed: {}", message);
                self.apply(SessionEvent::ModelLoadFailed(message));
            }
            TaskMessage::Classified { generation, result } => match result {
                Ok(predictions) => {
                    self.apply(SessionEvent::ClassificationSucceeded {
                        generation,
                        predictions,
                    });
                }
                Err(message) => {
                    error!("Classification failed: {}", message);
                    self.apply(SessionEvent::ClassificationFailed {
                        generation,
                        message: PROCESSING_ERROR_MESSAGE.to_string(),
                    });
                }
            },
        }
        self.dirty = true;
    }

    fn submit_path(&mut self, path: String) {
        let path = PathBuf::from(path);
        match std::fs::read(&path) {
            Ok(bytes) => {
                self.apply(SessionEvent::UploadRequested(SessionImage::from_file(
                    path, bytes,
                )));
            }
            Err(err) => {
                warn!("Could not read {}: {}", path.display(), err);
                self.apply(SessionEvent::UploadFailed(format!(
                    "Could not read {}: {}",
                    path.display(),
                    err
                )));
            }
        }
    }

    /// Feed one event through the session and execute every effect it
    /// produces, including effects of follow-up events.
    fn apply(&mut self, event: SessionEvent) {
        let mut queue: VecDeque<SessionEffect> = self.session.handle(event).into();

        while let Some(effect) = queue.pop_front() {
            match effect {
                SessionEffect::StartCamera => match self.controller.start() {
                    Ok(()) => {
                        queue.extend(self.session.handle(SessionEvent::CameraStarted));
                    }
                    Err(err) => {
                        error!("Camera start failed: {}", err);
                        queue.extend(
                            self.session
                                .handle(SessionEvent::CameraFailed(err.to_string())),
                        );
                    }
                },
                SessionEffect::StopCamera => self.controller.stop(),
                SessionEffect::CaptureStill => match self.controller.capture_still() {
                    Ok(still) => {
                        info!("Captured {}x{} still", still.width, still.height);
                        queue.extend(self.session.handle(SessionEvent::CaptureSucceeded(
                            SessionImage::from_camera(still.jpeg),
                        )));
                    }
                    Err(err) => {
                        error!("Capture failed: {}", err);
                        queue.extend(self.session.handle(SessionEvent::CaptureFailed(
                            CAPTURE_ERROR_MESSAGE.to_string(),
                        )));
                    }
                },
                SessionEffect::Classify { image, generation } => {
                    self.spawn_classification(image, generation);
                }
            }
        }
    }

    fn spawn_classification(&mut self, image: SessionImage, generation: u64) {
        let Some(model) = self.model.clone() else {
            // Gating keeps this from happening, but fail cleanly anyway
            let _ = self.task_tx.try_send(TaskMessage::Classified {
                generation,
                result: Err("model not loaded".to_string()),
            });
            return;
        };

        let tx = self.task_tx.clone();
        tokio::task::spawn_blocking(move || {
            let result = model
                .classify_bytes(&image.bytes)
                .map_err(|err| err.to_string());
            let _ = tx.blocking_send(TaskMessage::Classified { generation, result });
        });
    }

    /// The character grid for the pane: the newest live frame while the
    /// camera runs, otherwise the (cached) rendering of the held still.
    fn current_preview(&mut self, cols: u16, rows: u16) -> Option<AsciiFrame> {
        if *self.session.state() == SessionState::CameraActive {
            let frame = self.controller.latest_frame()?;
            return Some(
                self.renderer
                    .render_frame(&frame, cols, rows, self.charset, self.invert),
            );
        }

        let image = match self.session.state() {
            SessionState::HasImage(img)
            | SessionState::Analyzing(img)
            | SessionState::Result(img, _)
            | SessionState::Error(Some(img), _) => img.clone(),
            _ => return None,
        };
        self.still_ascii(image, cols, rows)
    }

    fn still_ascii(&mut self, image: SessionImage, cols: u16, rows: u16) -> Option<AsciiFrame> {
        let cached = self.still.as_ref().is_some_and(|c| {
            Arc::ptr_eq(&c.src, &image.bytes)
                && c.charset == self.charset
                && c.invert == self.invert
                && c.cols == cols
                && c.rows == rows
        });

        if !cached {
            let decoded = match image::load_from_memory(&image.bytes) {
                Ok(img) => img,
                Err(err) => {
                    debug!("Still preview decode failed: {}", err);
                    self.still = None;
                    return None;
                }
            };
            let rgb = decoded.to_rgb8();
            let frame = self.renderer.render_rgb(
                rgb.as_raw(),
                rgb.width(),
                rgb.height(),
                cols,
                rows,
                self.charset,
                self.invert,
            );
            self.still = Some(StillCache {
                src: image.bytes.clone(),
                charset: self.charset,
                invert: self.invert,
                cols,
                rows,
                frame,
            });
        }

        self.still.as_ref().map(|c| c.frame.clone())
    }
}

/// Inner size of the preview pane: the full area minus the header, the
/// two banner rows, the optional status bar, and the pane border.
fn pane_inner_size(width: u16, height: u16, show_status: bool) -> (u16, u16) {
    let status = if show_status { 1 } else { 0 };
    (width.saturating_sub(2), height.saturating_sub(5 + status))
}

fn draw(tui: &mut Tui, app: &mut App) -> std::io::Result<()> {
    let size = tui.terminal().size()?;
    let (cols, rows) = pane_inner_size(size.width, size.height, app.show_status);
    let preview = app.current_preview(cols, rows);

    let view = ViewState {
        session: &app.session,
        preview: preview.as_ref(),
        input_mode: &app.input_mode,
        show_info: app.show_info,
        show_status: app.show_status,
        charset: app.charset,
        mirror: app.mirror,
        camera_resolution: app.controller.actual_resolution(),
    };
    tui.draw(&view)
}

/// Run the interactive checker until the user quits.
///
/// The model loads in the background; camera and upload controls stay
/// inert until it reports in.
pub async fn run(
    session: CaptureSession,
    controller: CameraController,
    client: ModelClient,
    options: UiOptions,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut tui = Tui::new()?;
    let mut event_stream = EventStream::new();

    let (task_tx, mut task_rx) = mpsc::channel::<TaskMessage>(16);

    {
        let tx = task_tx.clone();
        tokio::spawn(async move {
            match client.load().await {
                Ok(model) => {
                    let _ = tx.send(TaskMessage::ModelReady(Box::new(model))).await;
                }
                Err(err) => {
                    let _ = tx.send(TaskMessage::ModelFailed(err.to_string())).await;
                }
            }
        });
    }

    // Live preview refresh (~15 FPS)
    let mut preview_interval = tokio::time::interval(Duration::from_millis(67));
    preview_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut app = App::new(session, controller, task_tx, options);

    loop {
        if app.quit || ctrlc_received() {
            break;
        }

        tokio::select! {
            maybe_event = event_stream.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key_event))) => app.on_key(key_event),
                    Some(Ok(Event::Resize(_, _))) => app.dirty = true,
                    Some(Ok(_)) => {
                        // Ignore other events (mouse, focus, etc.)
                    }
                    Some(Err(e)) => {
                        return Err(Box::new(e));
                    }
                    None => break,
                }
            }

            maybe_msg = task_rx.recv() => {
                match maybe_msg {
                    Some(msg) => app.on_task(msg),
                    // App holds a sender, so the channel cannot close;
                    // treat it as a shutdown signal regardless
                    None => break,
                }
            }

            _ = preview_interval.tick() => {
                // Only the live view needs tick-driven redraws; every
                // other change marks itself dirty
                if *app.session.state() == SessionState::CameraActive {
                    app.dirty = true;
                }
            }
        }

        if app.dirty {
            draw(&mut tui, &mut app)?;
            app.dirty = false;
        }
    }

    app.controller.stop();
    tui.restore()?;
    Ok(())
}

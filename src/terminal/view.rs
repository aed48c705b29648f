//! Rendering functions for the checker screen.
//!
//! Pure rendering logic separated from terminal lifecycle management.
//! All functions operate on ratatui Frame objects without touching
//! terminal state, and the text helpers are plain functions so layout
//! decisions can be tested without a TTY.

use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::camera::Resolution;
use crate::input::InputMode;
use crate::model::{display_label, format_confidence, severity_for, Prediction, Severity};
use crate::preview::{AsciiFrame, CharSet};
use crate::session::{
    CaptureSession, ImageSource, ModelStatus, SessionState, MODEL_LOAD_ERROR_MESSAGE,
};

/// Everything the renderer needs for one frame.
pub struct ViewState<'a> {
    pub session: &'a CaptureSession,
    /// Character grid for the pane: live frame or decoded still
    pub preview: Option<&'a AsciiFrame>,
    pub input_mode: &'a InputMode,
    pub show_info: bool,
    pub show_status: bool,
    pub charset: CharSet,
    pub mirror: bool,
    /// Actual camera resolution while the preview is live
    pub camera_resolution: Option<Resolution>,
}

/// Render the complete screen: header, preview pane, message banner,
/// status bar, and the info overlay on top when open.
pub fn render_full_frame(frame: &mut ratatui::Frame, view: &ViewState<'_>, area: Rect) {
    let status_rows = if view.show_status { 1 } else { 0 };
    let banner_rows = 2u16;

    let header_area = Rect {
        height: 1.min(area.height),
        ..area
    };

    let pane_area = Rect {
        x: area.x,
        y: area.y + 1,
        width: area.width,
        height: area
            .height
            .saturating_sub(1 + banner_rows + status_rows),
    };

    let banner_area = Rect {
        x: area.x,
        y: area.y + area.height.saturating_sub(banner_rows + status_rows),
        width: area.width,
        height: banner_rows.min(area.height),
    };

    render_header(frame, view, header_area);
    render_preview_pane(frame, view, pane_area);
    render_banner(frame, view, banner_area);

    if view.show_status {
        render_status_bar(frame, view, area);
    }

    if view.show_info {
        render_info_overlay(frame, area);
    }
}

/// Top line: application title plus the current model status.
fn render_header(frame: &mut ratatui::Frame, view: &ViewState<'_>, area: Rect) {
    let (status_text, status_color) = match view.session.model_status() {
        ModelStatus::Loading => ("model: loading...", Color::DarkGray),
        ModelStatus::Ready => ("model: ready", Color::Green),
        ModelStatus::Failed(_) => ("model: failed", Color::Red),
    };

    let line = Line::from(vec![
        Span::styled(
            " Attire Check ",
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::styled(status_text, Style::default().fg(status_color)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

/// The bordered pane showing the live preview or the current still.
fn render_preview_pane(frame: &mut ratatui::Frame, view: &ViewState<'_>, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(preview_title(view.session.state(), view.mirror));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    if let Some(ascii_frame) = view.preview {
        let paragraph = Paragraph::new(ascii_frame.to_string_display())
            .style(Style::default().fg(Color::White));
        frame.render_widget(paragraph, inner);
    } else {
        let placeholder = Paragraph::new("Camera is off.")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center);
        frame.render_widget(placeholder, inner);
    }
}

/// Two-line message area above the status bar.
fn render_banner(frame: &mut ratatui::Frame, view: &ViewState<'_>, area: Rect) {
    let lines: Vec<Line> = banner_lines(view)
        .into_iter()
        .map(|(text, color)| Line::from(Span::styled(text, Style::default().fg(color))))
        .collect();
    frame.render_widget(Paragraph::new(lines), area);
}

/// Bottom line with camera state and key hints, black on white.
fn render_status_bar(frame: &mut ratatui::Frame, view: &ViewState<'_>, area: Rect) {
    let status_area = Rect {
        x: area.x,
        y: area.y + area.height.saturating_sub(1),
        width: area.width,
        height: 1,
    };
    let paragraph = Paragraph::new(status_text(view))
        .style(Style::default().fg(Color::Black).bg(Color::White));
    frame.render_widget(paragraph, status_area);
}

/// Centered overlay describing the categories and how to get a good
/// reading.
fn render_info_overlay(frame: &mut ratatui::Frame, area: Rect) {
    let overlay = centered_rect(64, 16, area);
    frame.render_widget(Clear, overlay);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" How It Works ");
    let inner = block.inner(overlay);
    frame.render_widget(block, overlay);

    let lines: Vec<Line> = INFO_LINES.iter().map(|text| Line::from(*text)).collect();
    frame.render_widget(Paragraph::new(lines), inner);
}

const INFO_LINES: &[&str] = &[
    "The checker looks at your outfit and sorts it into one of",
    "three tiers:",
    "",
    "  Business Professional   suits, blazers, ties",
    "  Business Casual         collared shirts, slacks, blouses",
    "  Casual                  t-shirts, hoodies, jeans",
    "",
    "For the best reading:",
    "  - Step back until your torso fills the frame",
    "  - Face an even light source",
    "  - Plain backgrounds help",
    "",
    "Analysis runs entirely on this machine. Images are never",
    "uploaded anywhere.",
];

/// Title for the preview pane border.
pub(crate) fn preview_title(state: &SessionState, mirror: bool) -> String {
    match state {
        SessionState::Idle => " Preview ".to_string(),
        SessionState::CameraActive => {
            if mirror {
                " Live Preview (mirrored) ".to_string()
            } else {
                " Live Preview ".to_string()
            }
        }
        SessionState::HasImage(image)
        | SessionState::Analyzing(image)
        | SessionState::Result(image, _)
        | SessionState::Error(Some(image), _) => match &image.source {
            ImageSource::Camera => " Captured Still ".to_string(),
            ImageSource::File(path) => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| path.display().to_string());
                format!(" {} ", name)
            }
        },
        SessionState::Error(None, _) => " Preview ".to_string(),
    }
}

/// The two banner lines with their colors, in priority order: path
/// entry, then a failed model, then the session state.
pub(crate) fn banner_lines(view: &ViewState<'_>) -> Vec<(String, Color)> {
    if let InputMode::PathEntry(buffer) = view.input_mode {
        return vec![
            (format!("Image path: {}_", buffer), Color::Cyan),
            ("Enter to check, Esc to cancel".to_string(), Color::DarkGray),
        ];
    }

    if let ModelStatus::Failed(detail) = view.session.model_status() {
        return vec![
            (MODEL_LOAD_ERROR_MESSAGE.to_string(), Color::Red),
            (detail.clone(), Color::DarkGray),
        ];
    }

    match view.session.state() {
        SessionState::Idle => {
            if *view.session.model_status() == ModelStatus::Loading {
                vec![("Loading model...".to_string(), Color::DarkGray)]
            } else {
                vec![(
                    "Press 'c' to start the camera or 'u' to check an image file.".to_string(),
                    Color::DarkGray,
                )]
            }
        }
        SessionState::CameraActive => {
            vec![("Live. Press Space to capture.".to_string(), Color::Cyan)]
        }
        SessionState::HasImage(_) => vec![
            ("Image loaded.".to_string(), Color::White),
            (
                "Press 'c' for the camera or 'u' for another file.".to_string(),
                Color::DarkGray,
            ),
        ],
        SessionState::Analyzing(_) => vec![("Analyzing...".to_string(), Color::Yellow)],
        SessionState::Result(_, prediction) => vec![
            (
                result_line(prediction),
                severity_color(severity_for(&prediction.label)),
            ),
            (
                "Press 'c' to retake or 'u' for another file.".to_string(),
                Color::DarkGray,
            ),
        ],
        SessionState::Error(_, message) => vec![
            (message.clone(), Color::Red),
            ("Esc to dismiss.".to_string(), Color::DarkGray),
        ],
    }
}

/// Format the verdict: mapped label plus confidence.
pub(crate) fn result_line(prediction: &Prediction) -> String {
    format!(
        "{} ({}% confidence)",
        display_label(&prediction.label),
        format_confidence(prediction.probability)
    )
}

pub(crate) fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Favorable => Color::Green,
        Severity::Neutral => Color::Yellow,
        Severity::Unfavorable => Color::Red,
    }
}

/// Format the status bar text.
///
/// Format: " cam:on/off | charset | key hints "
pub(crate) fn status_text(view: &ViewState<'_>) -> String {
    let camera_segment = match view.camera_resolution {
        Some(res) => format!("cam:on {}x{}", res.width, res.height),
        None => "cam:off".to_string(),
    };

    format!(
        " {} | charset:{} | c:camera space:capture s:stop u:file i:info q:quit ",
        camera_segment,
        view.charset.name(),
    )
}

/// Center a fixed-size rectangle within a container, clamped to fit.
fn centered_rect(width: u16, height: u16, container: Rect) -> Rect {
    let width = width.min(container.width);
    let height = height.min(container.height);
    Rect {
        x: container.x + (container.width.saturating_sub(width)) / 2,
        y: container.y + (container.height.saturating_sub(height)) / 2,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{SessionEvent, SessionImage};
    use std::path::PathBuf;

    fn ready_session() -> CaptureSession {
        let mut session = CaptureSession::new();
        session.handle(SessionEvent::ModelLoaded);
        session
    }

    fn view<'a>(session: &'a CaptureSession, mode: &'a InputMode) -> ViewState<'a> {
        ViewState {
            session,
            preview: None,
            input_mode: mode,
            show_info: false,
            show_status: true,
            charset: CharSet::Standard,
            mirror: true,
            camera_resolution: None,
        }
    }

    #[test]
    fn test_preview_title_by_state() {
        assert_eq!(preview_title(&SessionState::Idle, true), " Preview ");
        assert_eq!(
            preview_title(&SessionState::CameraActive, true),
            " Live Preview (mirrored) "
        );
        assert_eq!(
            preview_title(&SessionState::CameraActive, false),
            " Live Preview "
        );

        let still = SessionImage::from_camera(vec![1]);
        assert_eq!(
            preview_title(&SessionState::Analyzing(still), true),
            " Captured Still "
        );

        let file = SessionImage::from_file(PathBuf::from("/tmp/fit-check.png"), vec![1]);
        assert_eq!(
            preview_title(&SessionState::HasImage(file), true),
            " fit-check.png "
        );
    }

    #[test]
    fn test_banner_shows_result_with_mapped_label() {
        let mut session = ready_session();
        session.handle(SessionEvent::UploadRequested(SessionImage::from_file(
            PathBuf::from("a.png"),
            vec![1],
        )));
        session.handle(SessionEvent::ClassificationSucceeded {
            generation: session.generation(),
            predictions: vec![Prediction {
                label: "Business Pro...".to_string(),
                probability: 0.935,
            }],
        });

        let mode = InputMode::Keys;
        let lines = banner_lines(&view(&session, &mode));
        assert_eq!(lines[0].0, "Business Professional (93.50% confidence)");
        assert_eq!(lines[0].1, Color::Green);
    }

    #[test]
    fn test_banner_severity_colors() {
        for (label, color) in [
            ("Business Pro...", Color::Green),
            ("Business Cas...", Color::Yellow),
            ("Casual", Color::Red),
        ] {
            let mut session = ready_session();
            session.handle(SessionEvent::UploadRequested(SessionImage::from_file(
                PathBuf::from("a.png"),
                vec![1],
            )));
            session.handle(SessionEvent::ClassificationSucceeded {
                generation: session.generation(),
                predictions: vec![Prediction {
                    label: label.to_string(),
                    probability: 0.5,
                }],
            });

            let mode = InputMode::Keys;
            let lines = banner_lines(&view(&session, &mode));
            assert_eq!(lines[0].1, color, "label {:?}", label);
        }
    }

    #[test]
    fn test_banner_path_entry_takes_precedence() {
        let mut session = ready_session();
        session.handle(SessionEvent::CameraFailed("denied".to_string()));

        let mode = InputMode::PathEntry("pho".to_string());
        let lines = banner_lines(&view(&session, &mode));
        assert_eq!(lines[0].0, "Image path: pho_");
        assert_eq!(lines[0].1, Color::Cyan);
    }

    #[test]
    fn test_banner_model_failure_is_persistent() {
        let mut session = CaptureSession::new();
        session.handle(SessionEvent::ModelLoadFailed("404 model.json".to_string()));

        let mode = InputMode::Keys;
        let lines = banner_lines(&view(&session, &mode));
        assert_eq!(lines[0].0, MODEL_LOAD_ERROR_MESSAGE);
        assert_eq!(lines[0].1, Color::Red);
        assert_eq!(lines[1].0, "404 model.json");
    }

    #[test]
    fn test_banner_error_state() {
        let mut session = ready_session();
        session.handle(SessionEvent::CameraFailed(
            "Camera permission denied".to_string(),
        ));

        let mode = InputMode::Keys;
        let lines = banner_lines(&view(&session, &mode));
        assert_eq!(lines[0].0, "Camera permission denied");
        assert_eq!(lines[0].1, Color::Red);
    }

    #[test]
    fn test_status_text_segments() {
        let session = ready_session();
        let mode = InputMode::Keys;

        let mut v = view(&session, &mode);
        assert!(status_text(&v).contains("cam:off"));
        assert!(status_text(&v).contains("charset:standard"));

        v.camera_resolution = Some(Resolution {
            width: 1280,
            height: 720,
        });
        v.charset = CharSet::Blocks;
        let text = status_text(&v);
        assert!(text.contains("cam:on 1280x720"));
        assert!(text.contains("charset:blocks"));
    }

    #[test]
    fn test_centered_rect_clamps_to_container() {
        let container = Rect {
            x: 0,
            y: 0,
            width: 40,
            height: 10,
        };
        let rect = centered_rect(64, 16, container);
        assert_eq!(rect.width, 40);
        assert_eq!(rect.height, 10);

        let small = centered_rect(20, 4, container);
        assert_eq!(small.x, 10);
        assert_eq!(small.y, 3);
    }
}

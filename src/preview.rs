//! ASCII rendering pipeline for the live preview and captured stills.
//!
//! Converting an image to characters happens in three steps:
//!
//! 1. **Grayscale conversion** - RGB to luminance using BT.601
//! 2. **Downsampling** - average pixel brightness per character cell
//! 3. **Character mapping** - gamma-corrected brightness to a charset ramp
//!
//! [`PreviewRenderer`] runs the whole pipeline with reusable buffers so the
//! per-tick live view does not allocate.

use crate::camera::Frame;

/// Standard ASCII density ramp (10 levels).
/// Characters ordered from darkest (space) to brightest (@).
/// Works well on dark terminals.
pub const STANDARD_CHARSET: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Block character set (5 levels).
/// Uses Unicode block characters for higher perceived resolution.
pub const BLOCKS_CHARSET: &[char] = &[' ', '░', '▒', '▓', '█'];

/// Minimal character set (4 levels).
/// Clean, less noisy look.
pub const MINIMAL_CHARSET: &[char] = &[' ', '.', ':', '#'];

/// Default terminal character aspect ratio.
/// Terminal characters are typically ~2x taller than wide.
pub const DEFAULT_CHAR_ASPECT_RATIO: f32 = 2.0;

/// Character set used for rendering.
///
/// Allows cycling through different character sets with hotkeys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CharSet {
    /// Standard ASCII density ramp (10 levels)
    #[default]
    Standard,
    /// Block character set (5 levels) using Unicode blocks
    Blocks,
    /// Minimal character set (4 levels) for a clean look
    Minimal,
}

impl CharSet {
    /// Get the character slice for this charset.
    pub fn chars(&self) -> &'static [char] {
        match self {
            CharSet::Standard => STANDARD_CHARSET,
            CharSet::Blocks => BLOCKS_CHARSET,
            CharSet::Minimal => MINIMAL_CHARSET,
        }
    }

    /// Cycle to the next character set.
    ///
    /// Order: Standard -> Blocks -> Minimal -> Standard
    pub fn next(&self) -> Self {
        match self {
            CharSet::Standard => CharSet::Blocks,
            CharSet::Blocks => CharSet::Minimal,
            CharSet::Minimal => CharSet::Standard,
        }
    }

    /// Get a human-readable name for the charset.
    pub fn name(&self) -> &'static str {
        match self {
            CharSet::Standard => "standard",
            CharSet::Blocks => "blocks",
            CharSet::Minimal => "minimal",
        }
    }

    /// Look up a charset by its name, as used in config files.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "standard" => Some(CharSet::Standard),
            "blocks" => Some(CharSet::Blocks),
            "minimal" => Some(CharSet::Minimal),
            _ => None,
        }
    }
}

/// Precomputed gamma correction lookup table for fast mapping.
/// Maps linear brightness [0-255] to perceptually-corrected brightness [0-255].
/// Formula: output = (input/255)^(1/2.2) * 255
/// Generated with: (0..256).map(|i| ((i as f64 / 255.0).powf(1.0/2.2) * 255.0).round() as u8)
#[rustfmt::skip]
const GAMMA_LUT: [u8; 256] = [
    0, 21, 28, 34, 39, 43, 46, 50, 53, 56, 59, 61, 64, 66, 68, 70,
    72, 74, 76, 78, 80, 82, 84, 85, 87, 89, 90, 92, 93, 95, 96, 98,
    99, 101, 102, 103, 105, 106, 107, 109, 110, 111, 112, 114, 115, 116, 117, 118,
    119, 120, 122, 123, 124, 125, 126, 127, 128, 129, 130, 131, 132, 133, 134, 135,
    136, 137, 138, 139, 140, 141, 142, 143, 144, 144, 145, 146, 147, 148, 149, 150,
    150, 151, 152, 153, 154, 155, 155, 156, 157, 158, 159, 159, 160, 161, 162, 162,
    163, 164, 165, 165, 166, 167, 168, 168, 169, 170, 171, 171, 172, 173, 173, 174,
    175, 175, 176, 177, 177, 178, 179, 179, 180, 181, 181, 182, 183, 183, 184, 185,
    185, 186, 186, 187, 188, 188, 189, 190, 190, 191, 191, 192, 193, 193, 194, 194,
    195, 196, 196, 197, 197, 198, 199, 199, 200, 200, 201, 201, 202, 203, 203, 204,
    204, 205, 205, 206, 207, 207, 208, 208, 209, 209, 210, 210, 211, 212, 212, 213,
    213, 214, 214, 215, 215, 216, 216, 217, 217, 218, 218, 219, 220, 220, 221, 221,
    222, 222, 223, 223, 224, 224, 225, 225, 226, 226, 227, 227, 228, 228, 229, 229,
    230, 230, 231, 231, 232, 232, 233, 233, 234, 234, 234, 235, 235, 236, 236, 237,
    237, 238, 238, 239, 239, 240, 240, 241, 241, 241, 242, 242, 243, 243, 244, 244,
    245, 245, 246, 246, 246, 247, 247, 248, 248, 249, 249, 250, 250, 250, 251, 255,
];

/// Apply gamma correction to a brightness value.
/// Converts linear brightness to perceptually-correct brightness.
#[inline]
pub fn gamma_correct(linear: u8) -> u8 {
    GAMMA_LUT[linear as usize]
}

/// Convert interleaved RGB bytes to grayscale using the ITU-R BT.601
/// luminance formula (Y = 0.299*R + 0.587*G + 0.114*B), reusing an
/// existing buffer.
///
/// Uses integer math with coefficients scaled by 1000 to keep floats out
/// of the hot path.
pub fn to_grayscale_into(rgb: &[u8], buffer: &mut Vec<u8>) -> usize {
    let pixel_count = rgb.len() / 3;
    buffer.clear();
    buffer.reserve(pixel_count);

    for px in rgb.chunks_exact(3) {
        let r = px[0] as u32;
        let g = px[1] as u32;
        let b = px[2] as u32;
        let luminance = (299 * r + 587 * g + 114 * b) / 1000;
        buffer.push(luminance as u8);
    }

    pixel_count
}

/// Allocating variant of [`to_grayscale_into`].
pub fn to_grayscale(rgb: &[u8]) -> Vec<u8> {
    let mut buffer = Vec::new();
    to_grayscale_into(rgb, &mut buffer);
    buffer
}

/// Downsample a grayscale image into an existing buffer.
///
/// Maps image pixels to character grid cells by averaging the brightness
/// of all pixels within each cell. This reduces the resolution from the
/// camera's pixel dimensions to the desired character dimensions.
///
/// # Arguments
/// * `gray` - Grayscale pixel data (one byte per pixel, row-major order)
/// * `img_width` - Width of the source image in pixels
/// * `img_height` - Height of the source image in pixels
/// * `char_width` - Desired output width in characters
/// * `char_height` - Desired output height in characters
/// * `buffer` - A mutable buffer to store the result
///
/// # Returns
/// The number of brightness values written to the buffer.
pub fn downsample_into(
    gray: &[u8],
    img_width: u32,
    img_height: u32,
    char_width: u16,
    char_height: u16,
    buffer: &mut Vec<u8>,
) -> usize {
    buffer.clear();

    if char_width == 0 || char_height == 0 || img_width == 0 || img_height == 0 || gray.is_empty() {
        return 0;
    }

    let output_size = (char_width as usize) * (char_height as usize);
    buffer.reserve(output_size);

    // Cell size in pixels, as floats for accurate mapping
    let cell_w = img_width as f32 / char_width as f32;
    let cell_h = img_height as f32 / char_height as f32;

    for cy in 0..char_height {
        for cx in 0..char_width {
            let start_x = (cx as f32 * cell_w) as u32;
            let end_x = ((cx + 1) as f32 * cell_w) as u32;
            let start_y = (cy as f32 * cell_h) as u32;
            let end_y = ((cy + 1) as f32 * cell_h) as u32;

            let mut sum = 0u32;
            let mut count = 0u32;

            for py in start_y..end_y {
                for px in start_x..end_x {
                    let idx = (py * img_width + px) as usize;
                    if idx < gray.len() {
                        sum += gray[idx] as u32;
                        count += 1;
                    }
                }
            }

            buffer.push(if count > 0 { (sum / count) as u8 } else { 0 });
        }
    }

    output_size
}

/// Allocating variant of [`downsample_into`].
pub fn downsample(
    gray: &[u8],
    img_width: u32,
    img_height: u32,
    char_width: u16,
    char_height: u16,
) -> Vec<u8> {
    let mut buffer = Vec::new();
    downsample_into(gray, img_width, img_height, char_width, char_height, &mut buffer);
    buffer
}

/// Map brightness values to characters with gamma correction, reusing an
/// existing buffer.
///
/// Lower brightness maps to earlier characters in the ramp, higher
/// brightness to later ones. Gamma correction accounts for perception,
/// which matters for photographic input.
///
/// # Arguments
/// * `brightness` - Brightness values (0-255), one per character cell
/// * `charset` - Character set to use, ordered from darkest to brightest
/// * `invert` - If true, invert brightness before mapping (for light terminals)
/// * `buffer` - A mutable buffer to store the result
pub fn map_to_chars_gamma_into(
    brightness: &[u8],
    charset: &[char],
    invert: bool,
    buffer: &mut Vec<char>,
) -> usize {
    buffer.clear();

    if charset.is_empty() {
        buffer.resize(brightness.len(), ' ');
        return brightness.len();
    }

    buffer.reserve(brightness.len());
    let levels = charset.len();

    for &b in brightness {
        let b = if invert { 255 - b } else { b };
        let corrected = gamma_correct(b);
        let idx = (corrected as usize * (levels - 1)) / 255;
        buffer.push(charset[idx]);
    }

    brightness.len()
}

/// Allocating variant of [`map_to_chars_gamma_into`].
pub fn map_to_chars_gamma(brightness: &[u8], charset: &[char], invert: bool) -> Vec<char> {
    let mut buffer = Vec::new();
    map_to_chars_gamma_into(brightness, charset, invert, &mut buffer);
    buffer
}

/// Calculate output dimensions that preserve aspect ratio for terminal display.
///
/// Terminal characters are typically ~2x taller than wide, so a naive
/// mapping of pixels to characters results in a vertically stretched
/// image. This compensates by adjusting the output dimensions to:
///
/// 1. Preserve the original image aspect ratio when displayed in terminal
/// 2. Fit within the specified maximum character dimensions
pub fn calculate_dimensions(
    img_width: u32,
    img_height: u32,
    max_char_width: u16,
    max_char_height: u16,
) -> (u16, u16) {
    if img_width == 0 || img_height == 0 || max_char_width == 0 || max_char_height == 0 {
        return (0, 0);
    }

    let img_aspect = img_width as f32 / img_height as f32;

    // Characters are ~2x taller than wide, so a correctly-displayed image
    // needs proportionally fewer rows than columns.
    let target_char_aspect = img_aspect * DEFAULT_CHAR_ASPECT_RATIO;

    // Try fitting to max width first
    let char_width = max_char_width;
    let char_height = (char_width as f32 / target_char_aspect).round() as u16;

    if char_height <= max_char_height && char_height > 0 {
        (char_width, char_height)
    } else {
        let char_height = max_char_height;
        let char_width = (char_height as f32 * target_char_aspect).round() as u16;
        let char_width = char_width.min(max_char_width);
        (char_width.max(1), char_height.max(1))
    }
}

/// A rendered character grid ready for display.
#[derive(Debug, Clone, Default)]
pub struct AsciiFrame {
    /// Character data for the frame (row-major order)
    pub chars: Vec<char>,
    /// Width in characters
    pub width: u16,
    /// Height in characters
    pub height: u16,
}

impl AsciiFrame {
    pub fn from_chars(chars: Vec<char>, width: u16, height: u16) -> Self {
        Self {
            chars,
            width,
            height,
        }
    }

    /// Convert the frame to a string with rows joined by newlines.
    pub fn to_string_display(&self) -> String {
        if self.width == 0 || self.height == 0 {
            return String::new();
        }

        self.chars
            .chunks(self.width as usize)
            .map(|row| row.iter().collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Runs the full pipeline with reusable intermediate buffers.
#[derive(Debug, Default)]
pub struct PreviewRenderer {
    gray: Vec<u8>,
    cells: Vec<u8>,
    chars: Vec<char>,
}

impl PreviewRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render a camera frame into a character grid that fits within the
    /// given terminal area.
    pub fn render_frame(
        &mut self,
        frame: &Frame,
        max_cols: u16,
        max_rows: u16,
        charset: CharSet,
        invert: bool,
    ) -> AsciiFrame {
        self.render_rgb(&frame.data, frame.width, frame.height, max_cols, max_rows, charset, invert)
    }

    /// Render raw interleaved RGB bytes into a character grid.
    ///
    /// Used for both live camera frames and decoded stills.
    #[allow(clippy::too_many_arguments)]
    pub fn render_rgb(
        &mut self,
        rgb: &[u8],
        img_width: u32,
        img_height: u32,
        max_cols: u16,
        max_rows: u16,
        charset: CharSet,
        invert: bool,
    ) -> AsciiFrame {
        let (cols, rows) = calculate_dimensions(img_width, img_height, max_cols, max_rows);
        if cols == 0 || rows == 0 {
            return AsciiFrame::default();
        }

        to_grayscale_into(rgb, &mut self.gray);
        downsample_into(&self.gray, img_width, img_height, cols, rows, &mut self.cells);
        map_to_chars_gamma_into(&self.cells, charset.chars(), invert, &mut self.chars);

        AsciiFrame::from_chars(self.chars.clone(), cols, rows)
    }
}

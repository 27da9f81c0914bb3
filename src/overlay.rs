//! Timestamp overlay.
//!
//! Snapshots can carry the elapsed time they were taken at, drawn in white
//! in the bottom-right corner. The label is `"<prefix> HH:MM:SS"`; its size
//! scales with the frame width relative to a 1280-pixel reference so a
//! 720p and a 4K snapshot look alike.
//!
//! Glyphs are rasterised with [`ab_glyph`] and blended onto the frame by
//! coverage through [`imageproc::drawing::draw_text_mut`].

use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use ab_glyph::{Font, FontVec, PxScale, ScaleFont, point};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_text_mut;

use crate::error::SnapshotError;

/// Frame width at which `text_size` is used unscaled.
pub const REFERENCE_WIDTH: f32 = 1280.0;

/// Margin between the label and the frame edges, as a fraction of the
/// shorter frame side.
pub const MARGIN_RATIO: f32 = 0.05;

/// Environment variable naming a font file for the overlay.
pub const FONT_ENV_VAR: &str = "FRAMESNAP_FONT";

const LABEL_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "/system/fonts/Roboto-Regular.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu-sans-fonts/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation-sans/LiberationSans-Regular.ttf",
    "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf",
    "/usr/share/fonts/noto/NotoSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// A loaded overlay font. Cheap to clone.
#[derive(Clone)]
pub struct OverlayFont {
    font: Arc<FontVec>,
    origin: String,
}

impl std::fmt::Debug for OverlayFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayFont")
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

impl OverlayFont {
    /// Parse a TrueType/OpenType font from memory.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Font`] if the data is not a usable font.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, SnapshotError> {
        Self::parse(bytes, "<memory>".to_string())
    }

    /// Load a font file.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Font`] if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SnapshotError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|error| {
            SnapshotError::Font(format!("cannot read {}: {error}", path.display()))
        })?;
        Self::parse(bytes, path.display().to_string())
    }

    /// Find a usable font on this machine.
    ///
    /// Tries the file named by `FRAMESNAP_FONT` first, then a list of
    /// well-known system font locations.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Font`] if no candidate can be loaded. An
    /// explicit `FRAMESNAP_FONT` that fails to load is reported as such
    /// rather than silently falling back.
    pub fn discover() -> Result<Self, SnapshotError> {
        if let Some(path) = env::var_os(FONT_ENV_VAR).filter(|value| !value.is_empty()) {
            return Self::from_file(PathBuf::from(path));
        }
        SYSTEM_FONT_CANDIDATES
            .iter()
            .map(Path::new)
            .filter(|path| path.is_file())
            .find_map(|path| Self::from_file(path).ok())
            .ok_or_else(|| {
                SnapshotError::Font(format!(
                    "no overlay font found; set {FONT_ENV_VAR} or disable timeStamp"
                ))
            })
    }

    /// Where this font was loaded from.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    fn parse(bytes: Vec<u8>, origin: String) -> Result<Self, SnapshotError> {
        let font = FontVec::try_from_vec(bytes)
            .map_err(|error| SnapshotError::Font(format!("{origin}: {error}")))?;
        log::debug!("Loaded overlay font from {origin}");
        Ok(Self {
            font: Arc::new(font),
            origin,
        })
    }
}

/// Format `time_ms` as a `HH:MM:SS` clock.
///
/// Hours wrap at 24; there is no day field.
///
/// ```
/// assert_eq!(framesnap::overlay::format_clock(3_661_000), "01:01:01");
/// ```
pub fn format_clock(time_ms: u64) -> String {
    let second = (time_ms / 1000) % 60;
    let minute = (time_ms / 60_000) % 60;
    let hour = (time_ms / 3_600_000) % 24;
    format!("{hour:02}:{minute:02}:{second:02}")
}

/// Build the overlay label: the prefix, a space, then the clock.
pub fn format_label(prefix: &str, time_ms: u64) -> String {
    format!("{prefix} {}", format_clock(time_ms))
}

/// Where and how large a label is drawn on a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayLayout {
    /// Font size in pixels.
    pub font_size: f32,
    /// Distance kept from the right and bottom frame edges.
    pub margin: f32,
    /// Left of the text origin passed to the rasteriser.
    pub x: i32,
    /// Top of the text origin passed to the rasteriser.
    pub y: i32,
    /// Inked extent of the label, relative to `(x, y)`.
    pub ink_width: f32,
    /// Inked extent of the label, relative to `(x, y)`.
    pub ink_height: f32,
}

impl OverlayLayout {
    /// Place `label` in the bottom-right corner of a `width`×`height` frame.
    ///
    /// Returns `None` when the scaled font size rounds to nothing or the
    /// label has no visible glyphs.
    pub fn compute(
        width: u32,
        height: u32,
        text_size: u32,
        font: &OverlayFont,
        label: &str,
    ) -> Option<Self> {
        let font_size = text_size as f32 * width as f32 / REFERENCE_WIDTH;
        if font_size < 1.0 {
            return None;
        }
        let margin = width.min(height) as f32 * MARGIN_RATIO;
        let (ink_width, ink_height) = ink_extent(&*font.font, PxScale::from(font_size), label)?;

        let x = (width as f32 - margin - ink_width).round().max(0.0) as i32;
        let y = (height as f32 - margin - ink_height).round().max(0.0) as i32;

        Some(Self {
            font_size,
            margin,
            x,
            y,
            ink_width,
            ink_height,
        })
    }
}

/// Stamp `label` onto `image` in place.
///
/// The text is opaque white, blended over the frame by glyph coverage, with
/// its right and bottom ink edges `margin` away from the frame edges.
pub fn stamp(image: &mut RgbImage, label: &str, text_size: u32, font: &OverlayFont) {
    let Some(layout) = OverlayLayout::compute(image.width(), image.height(), text_size, font, label)
    else {
        log::debug!("Skipping overlay {label:?}: nothing to draw");
        return;
    };
    draw_text_mut(
        image,
        LABEL_COLOR,
        layout.x,
        layout.y,
        PxScale::from(layout.font_size),
        &*font.font,
        label,
    );
}

/// Right-most and bottom-most inked pixel of `text` laid out from the origin.
///
/// Mirrors the rasteriser's layout: glyphs advance along a baseline sitting
/// one ascent below the origin, with kerning between outlined glyphs.
fn ink_extent(font: &FontVec, scale: PxScale, text: &str) -> Option<(f32, f32)> {
    let scaled = font.as_scaled(scale);
    let mut caret = 0.0_f32;
    let mut previous = None;
    let mut extent: Option<(f32, f32)> = None;

    for character in text.chars() {
        let glyph_id = scaled.glyph_id(character);
        let glyph = glyph_id.with_scale_and_position(scale, point(caret, scaled.ascent()));
        caret += scaled.h_advance(glyph_id);
        if let Some(outlined) = scaled.outline_glyph(glyph) {
            if let Some(previous) = previous {
                caret += scaled.kern(glyph_id, previous);
            }
            previous = Some(glyph_id);
            let bounds = outlined.px_bounds();
            extent = Some(match extent {
                Some((right, bottom)) => (right.max(bounds.max.x), bottom.max(bounds.max.y)),
                None => (bounds.max.x, bounds.max.y),
            });
        }
    }

    extent
}

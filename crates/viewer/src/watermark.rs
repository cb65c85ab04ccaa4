//! Diagonal-band watermark overlay.

use paperview_engine::PageSurface;
use serde::{Deserialize, Serialize};

/// Watermark drawn over every rendered page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Watermark {
    pub text: String,
    /// Blend strength, clamped to `0.0..=1.0` at draw time.
    #[serde(default = "default_opacity")]
    pub opacity: f32,
    #[serde(default = "default_font_size")]
    pub font_size: u32,
}

fn default_opacity() -> f32 {
    0.3
}

fn default_font_size() -> u32 {
    24
}

impl Watermark {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), opacity: default_opacity(), font_size: default_font_size() }
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn with_font_size(mut self, font_size: u32) -> Self {
        self.font_size = font_size;
        self
    }

    /// Stamp the watermark onto a rendered surface in place.
    ///
    /// Repeating horizontal bands of dashes derived from the text bytes,
    /// alpha-blended so the page content stays legible underneath.
    pub fn apply(&self, surface: &mut PageSurface) {
        let alpha = self.opacity.clamp(0.0, 1.0);
        if self.text.is_empty() || alpha <= 0.0 {
            return;
        }

        let glyphs = self.text.as_bytes();
        let band_height = self.font_size.max(8);
        let band_period = band_height * 5;
        let cell_width = (self.font_size / 2).max(4);

        for (x, y, pixel) in surface.enumerate_pixels_mut() {
            if y % band_period >= band_height {
                continue;
            }
            // Diagonal dash pattern keyed off the text contents.
            let glyph = glyphs[(((x + y) / cell_width) as usize) % glyphs.len()];
            if glyph.count_ones() % 2 == 0 {
                continue;
            }
            for channel in 0..3 {
                let base = f32::from(pixel[channel]);
                pixel[channel] = (base * (1.0 - alpha) + 90.0 * alpha) as u8;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn white_surface() -> PageSurface {
        PageSurface::from_pixel(200, 200, image::Rgba([255, 255, 255, 255]))
    }

    fn darkened_pixels(surface: &PageSurface) -> usize {
        surface.pixels().filter(|p| p[0] < 255).count()
    }

    #[test]
    fn stamps_bands_onto_the_surface() {
        let mut surface = white_surface();
        Watermark::new("CONFIDENTIAL").apply(&mut surface);
        assert!(darkened_pixels(&surface) > 0);
    }

    #[test]
    fn empty_text_and_zero_opacity_are_no_ops() {
        let mut surface = white_surface();
        Watermark::new("").apply(&mut surface);
        assert_eq!(darkened_pixels(&surface), 0);

        Watermark::new("draft").with_opacity(0.0).apply(&mut surface);
        assert_eq!(darkened_pixels(&surface), 0);
    }

    #[test]
    fn higher_opacity_blends_darker() {
        let mut faint = white_surface();
        Watermark::new("draft").with_opacity(0.1).apply(&mut faint);

        let mut bold = white_surface();
        Watermark::new("draft").with_opacity(0.9).apply(&mut bold);

        let faint_min = faint.pixels().map(|p| p[0]).min().unwrap();
        let bold_min = bold.pixels().map(|p| p[0]).min().unwrap();
        assert!(bold_min < faint_min);
    }

    #[test]
    fn defaults_survive_deserialization() {
        let watermark: Watermark = serde_json::from_str(r#"{"text":"draft"}"#).unwrap();
        assert_eq!(watermark.opacity, 0.3);
        assert_eq!(watermark.font_size, 24);
    }
}

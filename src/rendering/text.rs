//! Typefaces: glyph metrics for layout and glyph painting for rasterization.

use image::RgbaImage;
use unicode_width::UnicodeWidthChar;

use crate::rendering::raster::blend_pixel;

/// A source of glyph advances and glyph coverage.
///
/// Layout only needs `advance`; the rasterizer calls `draw_line` with
/// coordinates already multiplied by the pixel-density scale factor.
pub trait Typeface: Send + Sync {
    /// Horizontal advance of `ch` at `size` pixels
    fn advance(&self, ch: char, size: f32) -> f32;

    /// Paint a single line of text whose line box starts at (`x`, `y`)
    #[allow(clippy::too_many_arguments)]
    fn draw_line(
        &self,
        canvas: &mut RgbaImage,
        x: f32,
        y: f32,
        line_height: f32,
        text: &str,
        size: f32,
        rgba: [u8; 4],
    );

    fn measure(&self, text: &str, size: f32) -> f32 {
        text.chars().map(|c| self.advance(c, size)).sum()
    }
}

/// Fixed-cell face: every column is `size * 0.55` wide, wide (CJK) chars take
/// two columns. Glyphs are painted as solid x-height bars, which keeps
/// snapshots deterministic without shipping a font file.
#[derive(Debug, Clone, Default)]
pub struct CellFace;

const CELL_ASPECT: f32 = 0.55;

impl Typeface for CellFace {
    fn advance(&self, ch: char, size: f32) -> f32 {
        let cols = ch.width().unwrap_or(0) as f32;
        cols * size * CELL_ASPECT
    }

    fn draw_line(
        &self,
        canvas: &mut RgbaImage,
        x: f32,
        y: f32,
        line_height: f32,
        text: &str,
        size: f32,
        rgba: [u8; 4],
    ) {
        let top = y + (line_height - size) / 2.0 + size * 0.2;
        let bar_h = size * 0.6;
        let mut pen = x;
        for ch in text.chars() {
            let adv = self.advance(ch, size);
            if !ch.is_whitespace() && adv > 0.0 {
                let x0 = (pen + adv * 0.08).round() as i64;
                let x1 = (pen + adv * 0.92).round() as i64;
                let (y0, y1) = (top.round() as i64, (top + bar_h).round() as i64);
                for py in y0..y1 {
                    for px in x0..x1 {
                        blend_pixel(canvas, px, py, rgba, 1.0);
                    }
                }
            }
            pen += adv;
        }
    }
}

#[cfg(feature = "truetype")]
pub use truetype::TrueTypeFace;

#[cfg(feature = "truetype")]
mod truetype {
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::Mutex;

    use fontdue::{Font, FontSettings, Metrics};
    use image::RgbaImage;

    use super::Typeface;
    use crate::error::{Error, Result};
    use crate::rendering::raster::blend_pixel;

    type GlyphKey = (char, u32);

    /// TrueType/OpenType face rasterized with `fontdue`.
    pub struct TrueTypeFace {
        font: Font,
        glyphs: Mutex<HashMap<GlyphKey, (Metrics, Vec<u8>)>>,
    }

    impl TrueTypeFace {
        pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
            let font = Font::from_bytes(bytes, FontSettings::default())
                .map_err(|e| Error::ConfigError(format!("failed to parse font: {}", e)))?;
            Ok(Self {
                font,
                glyphs: Mutex::new(HashMap::new()),
            })
        }

        pub fn from_file(path: &Path) -> Result<Self> {
            let bytes = std::fs::read(path)?;
            Self::from_bytes(bytes)
        }
    }

    impl Typeface for TrueTypeFace {
        fn advance(&self, ch: char, size: f32) -> f32 {
            self.font.metrics(ch, size).advance_width
        }

        fn draw_line(
            &self,
            canvas: &mut RgbaImage,
            x: f32,
            y: f32,
            line_height: f32,
            text: &str,
            size: f32,
            rgba: [u8; 4],
        ) {
            let ascent = self
                .font
                .horizontal_line_metrics(size)
                .map(|m| m.ascent)
                .unwrap_or(size * 0.8);
            let baseline = y + (line_height - size) / 2.0 + ascent;

            let mut cache = self.glyphs.lock().unwrap_or_else(|e| e.into_inner());
            let mut pen = x;
            for ch in text.chars() {
                let (metrics, bitmap) = cache
                    .entry((ch, size.to_bits()))
                    .or_insert_with(|| self.font.rasterize(ch, size));

                let gx = (pen + metrics.xmin as f32).round() as i64;
                let gy = (baseline - metrics.height as f32 - metrics.ymin as f32).round() as i64;
                for row in 0..metrics.height {
                    for col in 0..metrics.width {
                        let coverage = bitmap[row * metrics.width + col];
                        if coverage > 0 {
                            blend_pixel(canvas, gx + col as i64, gy + row as i64, rgba, coverage as f32 / 255.0);
                        }
                    }
                }
                pen += metrics.advance_width;
            }
        }
    }
}

/// Greedy word wrap at `max_width`, honoring hard line breaks.
/// Whitespace is preserved as typed (pre-wrap): runs of spaces and leading
/// indentation survive, and only the spaces at a soft break are dropped.
/// Words wider than the line are broken between characters.
pub fn wrap_text(face: &dyn Typeface, text: &str, size: f32, max_width: f32) -> Vec<String> {
    let space = face.advance(' ', size);
    let mut lines = Vec::new();

    for hard_line in text.split('\n') {
        let mut cur = String::new();
        let mut cur_w = 0.0f32;
        // set once a run of spaces has wrapped; the rest of the run hangs too
        let mut hanging = false;

        // Splitting on single spaces keeps runs as empty words.
        for (i, word) in hard_line.split(' ').enumerate() {
            if i > 0 && !hanging {
                if cur_w + space <= max_width {
                    cur.push(' ');
                    cur_w += space;
                } else {
                    soft_break(&mut lines, &mut cur);
                    cur_w = 0.0;
                    hanging = true;
                }
            }
            if word.is_empty() {
                continue;
            }
            hanging = false;

            let word_w = face.measure(word, size);
            if cur_w + word_w <= max_width {
                cur.push_str(word);
                cur_w += word_w;
            } else if word_w <= max_width {
                soft_break(&mut lines, &mut cur);
                cur.push_str(word);
                cur_w = word_w;
            } else {
                for ch in word.chars() {
                    let ch_w = face.advance(ch, size);
                    if !cur.is_empty() && cur_w + ch_w > max_width {
                        soft_break(&mut lines, &mut cur);
                        cur_w = 0.0;
                    }
                    cur.push(ch);
                    cur_w += ch_w;
                }
            }
        }
        lines.push(cur);
    }

    lines
}

/// End the current line at a wrap point. Trailing spaces hang past the edge
/// and are not kept; a line of nothing but spaces is not emitted.
fn soft_break(lines: &mut Vec<String>, cur: &mut String) {
    let line = std::mem::take(cur);
    let line = line.trim_end_matches(' ');
    if !line.is_empty() {
        lines.push(line.to_string());
    }
}

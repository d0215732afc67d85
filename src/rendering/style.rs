//! Box styles, colors and the export-time style normalization pass.
//!
//! Live render trees may carry colors the rasterizer cannot paint (OKLCH,
//! translucent fills) along with borders and shadows. Before a snapshot is
//! taken, the detached copy goes through [`normalize_for_export`] which
//! replaces all of that with opaque sRGB values.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::config::ExportPalette;
use crate::error::{Error, Result};
use crate::rendering::layout::{NodeKind, RenderTree};
use crate::store::Role;

/// A color as written in a theme or config file.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(try_from = "String")]
pub enum Color {
    Srgb { r: u8, g: u8, b: u8, a: u8 },
    /// Perceptual OKLCH color; `l` in 0..=1, `h` in degrees.
    Oklch { l: f32, c: f32, h: f32, alpha: f32 },
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color::Srgb { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Color::Srgb { r, g, b, a }
    }

    pub const fn oklch(l: f32, c: f32, h: f32) -> Self {
        Color::Oklch { l, c, h, alpha: 1.0 }
    }

    /// Whether the rasterizer can paint this color as-is.
    pub fn is_raster_safe(&self) -> bool {
        matches!(self, Color::Srgb { a: 255, .. })
    }

    /// RGBA bytes for a raster-safe color.
    pub fn raster_rgba(&self) -> Result<[u8; 4]> {
        match *self {
            Color::Srgb { r, g, b, a: 255 } => Ok([r, g, b, 255]),
            other => Err(Error::RenderError(format!(
                "color {} is not raster-safe",
                other
            ))),
        }
    }

    /// Resolve to an opaque sRGB color, compositing any alpha over `backdrop`.
    pub fn to_raster_safe(&self, backdrop: [u8; 3]) -> Color {
        let (rgb, alpha) = match *self {
            Color::Srgb { r, g, b, a } => ([r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0], a as f32 / 255.0),
            Color::Oklch { l, c, h, alpha } => (oklch_to_srgb(l, c, h), alpha.clamp(0.0, 1.0)),
        };
        let mix = |fg: f32, bg: u8| -> u8 {
            let v = fg * alpha + (bg as f32 / 255.0) * (1.0 - alpha);
            (v.clamp(0.0, 1.0) * 255.0).round() as u8
        };
        Color::rgb(mix(rgb[0], backdrop[0]), mix(rgb[1], backdrop[1]), mix(rgb[2], backdrop[2]))
    }
}

fn oklch_to_srgb(l: f32, c: f32, h: f32) -> [f32; 3] {
    let (sin, cos) = h.to_radians().sin_cos();
    let (a, b) = (c * cos, c * sin);

    let l_ = l + 0.396_337_78 * a + 0.215_803_76 * b;
    let m_ = l - 0.105_561_346 * a - 0.063_854_17 * b;
    let s_ = l - 0.089_484_18 * a - 1.291_485_5 * b;
    let (l3, m3, s3) = (l_ * l_ * l_, m_ * m_ * m_, s_ * s_ * s_);

    let linear = [
        4.076_741_7 * l3 - 3.307_711_6 * m3 + 0.230_969_94 * s3,
        -1.268_438 * l3 + 2.609_757_4 * m3 - 0.341_319_38 * s3,
        -0.004_196_086_3 * l3 - 0.703_418_6 * m3 + 1.707_614_7 * s3,
    ];
    linear.map(|x| {
        let x = x.clamp(0.0, 1.0);
        if x <= 0.003_130_8 {
            12.92 * x
        } else {
            1.055 * x.powf(1.0 / 2.4) - 0.055
        }
    })
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Color::Srgb { r, g, b, a: 255 } => write!(f, "#{:02X}{:02X}{:02X}", r, g, b),
            Color::Srgb { r, g, b, a } => write!(f, "#{:02X}{:02X}{:02X}{:02X}", r, g, b, a),
            Color::Oklch { l, c, h, alpha } if alpha >= 1.0 => write!(f, "oklch({} {} {})", l, c, h),
            Color::Oklch { l, c, h, alpha } => write!(f, "oklch({} {} {} / {})", l, c, h, alpha),
        }
    }
}

impl FromStr for Color {
    type Err = Error;

    /// Accepts `#RGB`, `#RRGGBB`, `#RRGGBBAA` and `oklch(L C H[ / A])`.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let bad = || Error::ConfigError(format!("unrecognized color '{}'", s));

        if let Some(hex) = s.strip_prefix('#') {
            let expanded: String = match hex.len() {
                3 => hex.chars().flat_map(|c| [c, c]).collect(),
                6 | 8 => hex.to_string(),
                _ => return Err(bad()),
            };
            let bytes = hex::decode(&expanded).map_err(|_| bad())?;
            let a = bytes.get(3).copied().unwrap_or(255);
            return Ok(Color::rgba(bytes[0], bytes[1], bytes[2], a));
        }

        if let Some(body) = s.strip_prefix("oklch(").and_then(|r| r.strip_suffix(')')) {
            let (channels, alpha) = match body.split_once('/') {
                Some((c, a)) => (c, parse_component(a.trim()).ok_or_else(bad)?),
                None => (body, 1.0),
            };
            let parts: Vec<f32> = channels
                .split_whitespace()
                .map(parse_component)
                .collect::<Option<_>>()
                .ok_or_else(bad)?;
            if parts.len() != 3 {
                return Err(bad());
            }
            return Ok(Color::Oklch { l: parts[0], c: parts[1], h: parts[2], alpha });
        }

        Err(bad())
    }
}

fn parse_component(s: &str) -> Option<f32> {
    match s.strip_suffix('%') {
        Some(pct) => pct.parse::<f32>().ok().map(|v| v / 100.0),
        None => s.parse().ok(),
    }
}

impl TryFrom<String> for Color {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Border {
    pub width: u32,
    pub color: Color,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shadow {
    pub offset_y: i32,
    pub spread: u32,
    pub color: Color,
}

/// Visual style of a single render node.
#[derive(Debug, Clone, PartialEq)]
pub struct Style {
    pub background: Option<Color>,
    pub border: Option<Border>,
    pub shadow: Option<Shadow>,
    pub radius: u32,
    /// Foreground (text/glyph) color
    pub color: Color,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            background: None,
            border: None,
            shadow: None,
            radius: 0,
            color: Color::rgb(0, 0, 0),
        }
    }
}

/// Rewrite a detached render tree so that every paint it implies is
/// raster-safe. Borders and shadows are dropped, backgrounds are forced to
/// palette colors, remaining colors are resolved to opaque sRGB.
pub fn normalize_for_export(tree: &mut RenderTree, palette: &ExportPalette) {
    let backdrop = palette.background.to_raster_safe([255, 255, 255]);
    let backdrop_rgb = match backdrop {
        Color::Srgb { r, g, b, .. } => [r, g, b],
        Color::Oklch { .. } => [255, 255, 255],
    };
    let user_tint = palette.user_bubble.to_raster_safe(backdrop_rgb);
    let assistant_tint = palette.assistant_bubble.to_raster_safe(backdrop_rgb);
    let text = palette.text.to_raster_safe(backdrop_rgb);

    for node in tree.nodes.iter_mut() {
        let style = &mut node.style;
        style.border = None;
        style.shadow = None;
        match node.kind {
            NodeKind::Container => {
                style.background = Some(backdrop);
                style.radius = 0;
            }
            NodeKind::Bubble(Role::User) => style.background = Some(user_tint),
            NodeKind::Bubble(Role::Assistant) => style.background = Some(assistant_tint),
            NodeKind::Avatar => {
                style.background = style.background.map(|c| c.to_raster_safe(backdrop_rgb));
                style.color = style.color.to_raster_safe(backdrop_rgb);
            }
            NodeKind::Text(_) => {
                // Text paints no box of its own; the bubble behind it does.
                style.background = None;
                style.color = if style.color.is_raster_safe() { style.color } else { text };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_forms() {
        assert_eq!("#fff".parse::<Color>().unwrap(), Color::rgb(255, 255, 255));
        assert_eq!("#F9FAFB".parse::<Color>().unwrap(), Color::rgb(0xF9, 0xFA, 0xFB));
        assert_eq!("#11182780".parse::<Color>().unwrap(), Color::rgba(0x11, 0x18, 0x27, 0x80));
        assert!("#12345".parse::<Color>().is_err());
        assert!("teal".parse::<Color>().is_err());
    }

    #[test]
    fn parses_oklch_with_percent_and_alpha() {
        let c: Color = "oklch(97% 0.014 254.6 / 0.5)".parse().unwrap();
        match c {
            Color::Oklch { l, c, h, alpha } => {
                assert!((l - 0.97).abs() < 1e-6);
                assert!((c - 0.014).abs() < 1e-6);
                assert!((h - 254.6).abs() < 1e-4);
                assert!((alpha - 0.5).abs() < 1e-6);
            }
            _ => panic!("expected oklch"),
        }
    }

    #[test]
    fn oklch_extremes_resolve_to_white_and_black() {
        assert_eq!(Color::oklch(1.0, 0.0, 0.0).to_raster_safe([0, 0, 0]), Color::rgb(255, 255, 255));
        assert_eq!(Color::oklch(0.0, 0.0, 0.0).to_raster_safe([255, 255, 255]), Color::rgb(0, 0, 0));
    }

    #[test]
    fn translucent_srgb_composites_over_backdrop() {
        let half_black = Color::rgba(0, 0, 0, 128);
        assert!(!half_black.is_raster_safe());
        match half_black.to_raster_safe([255, 255, 255]) {
            Color::Srgb { r, a, .. } => {
                assert!((126..=128).contains(&r));
                assert_eq!(a, 255);
            }
            _ => panic!("expected srgb"),
        }
    }

    #[test]
    fn raster_rgba_rejects_unsafe_colors() {
        assert!(Color::oklch(0.5, 0.1, 200.0).raster_rgba().is_err());
        assert_eq!(Color::rgb(1, 2, 3).raster_rgba().unwrap(), [1, 2, 3, 255]);
    }
}

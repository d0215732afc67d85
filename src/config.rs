//! Export configuration
//!
//! All pixel constants used by layout and compositing live here. Every field
//! has a default, and a JSON file only needs to name the fields it overrides:
//!
//! ```
//! let cfg: chatframe::ExportConfig =
//!     serde_json::from_str(r#"{ "max_height": 3000, "layout": { "font_size": 20 } }"#).unwrap();
//! assert_eq!(cfg.max_height, 3000);
//! assert_eq!(cfg.canvas_width, 1080);
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::assets::FramePaths;
use crate::error::{Error, Result};
use crate::rendering::style::Color;

/// Top-level configuration for a session and its exports
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Output canvas width; the transcript is laid out at this width too
    pub canvas_width: u32,
    /// Fixed output height; composites taller than this are rejected
    pub max_height: u32,
    /// Pixel density used when snapshotting the transcript
    pub scale_factor: f32,
    /// Name of the emitted file
    pub filename: String,
    pub layout: LayoutMetrics,
    /// Live (on-screen) styling of the transcript
    pub theme: Theme,
    /// Raster-safe colors forced onto the export copy
    pub palette: ExportPalette,
    pub frames: FramePaths,
    /// Optional TrueType font; the built-in cell face is used otherwise
    pub font_path: Option<PathBuf>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            canvas_width: 1080,
            max_height: 2412,
            scale_factor: 2.0,
            filename: "deepseek-chat.png".to_string(),
            layout: LayoutMetrics::default(),
            theme: Theme::default(),
            palette: ExportPalette::default(),
            frames: FramePaths::default(),
            font_path: None,
        }
    }
}

impl ExportConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let cfg: Self = serde_json::from_str(&raw)
            .map_err(|e| Error::ConfigError(format!("{}: {}", path.display(), e)))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.canvas_width == 0 || self.max_height == 0 {
            return Err(Error::ConfigError("canvas dimensions must be non-zero".into()));
        }
        if !self.scale_factor.is_finite() || self.scale_factor <= 0.0 {
            return Err(Error::ConfigError(format!("scale_factor must be > 0, got {}", self.scale_factor)));
        }
        if self.filename.trim().is_empty() {
            return Err(Error::ConfigError("filename must not be empty".into()));
        }
        let l = &self.layout;
        if l.font_size <= 0.0 || l.line_height <= 0.0 {
            return Err(Error::ConfigError("font_size and line_height must be > 0".into()));
        }
        if l.bubble_padding >= l.bubble_max_width {
            return Err(Error::ConfigError(format!(
                "bubble_padding ({}) must be smaller than bubble_max_width ({})",
                l.bubble_padding, l.bubble_max_width
            )));
        }
        if l.container_padding * 2 >= self.canvas_width {
            return Err(Error::ConfigError("container_padding leaves no room for content".into()));
        }
        Ok(())
    }
}

/// Pixel metrics of the transcript layout
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LayoutMetrics {
    pub container_padding: u32,
    pub row_gap: u32,
    pub min_height: u32,
    pub font_size: f32,
    /// Line height as a multiple of `font_size`
    pub line_height: f32,
    pub avatar_size: u32,
    pub avatar_margin_top: u32,
    pub avatar_gap: u32,
    pub avatar_glyph: char,
    /// Upper bound on a user bubble's width
    pub bubble_max_width: u32,
    /// Horizontal plus vertical padding inside a user bubble
    pub bubble_padding: u32,
    /// How far an assistant bubble extends past its text
    pub bubble_inset: u32,
    pub bubble_radius: u32,
}

impl Default for LayoutMetrics {
    fn default() -> Self {
        Self {
            container_padding: 24,
            row_gap: 24,
            min_height: 200,
            font_size: 22.0,
            line_height: 1.5,
            avatar_size: 46,
            avatar_margin_top: 10,
            avatar_gap: 16,
            avatar_glyph: '🐳',
            bubble_max_width: 380,
            bubble_padding: 32,
            bubble_inset: 10,
            bubble_radius: 16,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Theme {
    pub container_background: Color,
    pub container_border: Color,
    pub container_shadow: Color,
    pub assistant_bubble: Color,
    pub user_bubble: Color,
    pub text: Color,
    pub avatar: Color,
    pub avatar_glyph: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            container_background: Color::WHITE,
            container_border: Color::rgb(0xE5, 0xE7, 0xEB),
            container_shadow: Color::rgba(0, 0, 0, 13),
            assistant_bubble: Color::rgb(0xF3, 0xF4, 0xF6),
            user_bubble: Color::oklch(0.97, 0.014, 254.604),
            text: Color::rgb(0x11, 0x18, 0x27),
            avatar: Color::rgb(0x4D, 0x6B, 0xFE),
            avatar_glyph: Color::WHITE,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExportPalette {
    pub background: Color,
    pub user_bubble: Color,
    pub assistant_bubble: Color,
    /// Fallback for text colors that are not raster-safe
    pub text: Color,
}

impl Default for ExportPalette {
    fn default() -> Self {
        Self {
            background: Color::rgb(0xF9, 0xFA, 0xFB),
            user_bubble: Color::rgb(0xEF, 0xF6, 0xFF),
            assistant_bubble: Color::rgb(0xF3, 0xF4, 0xF6),
            text: Color::rgb(0x11, 0x18, 0x27),
        }
    }
}

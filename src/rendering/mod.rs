//! Rendering: transcript layout, styles, display lists and rasterization

pub mod layout;
pub mod paint;
pub mod raster;
pub mod style;
pub mod text;

pub use layout::{bubble_width, layout_transcript, render_message, NodeKind, Rect, RenderNode, RenderTree};
pub use raster::{encode_png, Rasterizer, SoftwareRasterizer};
pub use style::{normalize_for_export, Color};
pub use text::{CellFace, Typeface};

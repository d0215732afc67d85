/// Transcript layout: turns messages into a flat, paint-ordered render tree.

use crate::config::{LayoutMetrics, Theme};
use crate::rendering::style::{Border, Color, Shadow, Style};
use crate::rendering::text::{wrap_text, Typeface};
use crate::store::{Message, Role};

#[derive(Debug, Clone, PartialEq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Container,
    Avatar,
    Bubble(Role),
    Text(Role),
}

/// Wrapped text carried by a node, painted top-down from the node's origin.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub lines: Vec<String>,
    pub size: f32,
    pub line_height: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderNode {
    pub kind: NodeKind,
    pub rect: Rect,
    pub style: Style,
    pub text: Option<TextRun>,
}

/// The rendered transcript. Nodes are stored in paint order, so cloning the
/// tree yields a fully detached copy that can be restyled without touching
/// the original.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderTree {
    pub width: u32,
    pub height: u32,
    pub nodes: Vec<RenderNode>,
}

/// The nodes making up one message row, positioned in tree coordinates.
#[derive(Debug, Clone)]
pub struct MessageBlock {
    pub nodes: Vec<RenderNode>,
    pub height: u32,
}

/// Width of a user bubble for text `text_width` pixels wide.
///
/// Short text gets a bubble that hugs it (`text_width + padding`); text that
/// reaches `bound` gets the full bound.
pub fn bubble_width(text_width: u32, bound: u32, padding: u32) -> u32 {
    if text_width < bound {
        text_width + padding
    } else {
        bound
    }
}

fn line_height_px(metrics: &LayoutMetrics) -> f32 {
    (metrics.font_size * metrics.line_height).round()
}

fn text_node(role: Role, rect: Rect, color: Color, lines: Vec<String>, metrics: &LayoutMetrics) -> RenderNode {
    RenderNode {
        kind: NodeKind::Text(role),
        rect,
        style: Style {
            color,
            ..Style::default()
        },
        text: Some(TextRun {
            lines,
            size: metrics.font_size,
            line_height: line_height_px(metrics),
        }),
    }
}

fn measure_lines(face: &dyn Typeface, lines: &[String], size: f32) -> u32 {
    lines
        .iter()
        .map(|l| face.measure(l, size))
        .fold(0.0f32, f32::max)
        .ceil() as u32
}

/// Lay out a single message inside the content box starting at `x` with
/// width `content_width`, with the row's top edge at `y`.
pub fn render_message(
    message: &Message,
    x: i32,
    y: i32,
    content_width: u32,
    metrics: &LayoutMetrics,
    theme: &Theme,
    face: &dyn Typeface,
) -> MessageBlock {
    let size = metrics.font_size;
    let lh = line_height_px(metrics);

    match message.role {
        Role::Assistant => {
            let inset = metrics.bubble_inset;
            let lead = metrics.avatar_size + metrics.avatar_gap;
            let wrap_w = content_width.saturating_sub(lead + inset).max(1);
            let lines = wrap_text(face, &message.content, size, wrap_w as f32);
            let text_w = measure_lines(face, &lines, size).min(wrap_w);
            let text_h = (lines.len() as f32 * lh).ceil() as u32;

            let text_x = x + lead as i32;
            let avatar = RenderNode {
                kind: NodeKind::Avatar,
                rect: Rect {
                    x,
                    y: y + metrics.avatar_margin_top as i32,
                    width: metrics.avatar_size,
                    height: metrics.avatar_size,
                },
                style: Style {
                    background: Some(theme.avatar),
                    radius: metrics.avatar_size / 2,
                    color: theme.avatar_glyph,
                    ..Style::default()
                },
                text: Some(TextRun {
                    lines: vec![metrics.avatar_glyph.to_string()],
                    size: metrics.avatar_size as f32 * 0.5,
                    line_height: metrics.avatar_size as f32,
                }),
            };
            let bubble = RenderNode {
                kind: NodeKind::Bubble(Role::Assistant),
                rect: Rect {
                    x: text_x - inset as i32,
                    y,
                    width: text_w + inset * 2,
                    height: text_h + inset * 2,
                },
                style: Style {
                    background: Some(theme.assistant_bubble),
                    radius: metrics.bubble_radius,
                    ..Style::default()
                },
                text: None,
            };
            let text = text_node(
                Role::Assistant,
                Rect { x: text_x, y: y + inset as i32, width: text_w, height: text_h },
                theme.text,
                lines,
                metrics,
            );

            let height = (metrics.avatar_margin_top + metrics.avatar_size).max(text_h + inset * 2);
            MessageBlock { nodes: vec![avatar, bubble, text], height }
        }
        Role::User => {
            let bound = metrics.bubble_max_width.min(content_width);
            let pad = metrics.bubble_padding;
            let wrap_w = bound.saturating_sub(pad).max(1);
            let lines = wrap_text(face, &message.content, size, wrap_w as f32);
            let text_w = measure_lines(face, &lines, size);
            let text_h = (lines.len() as f32 * lh).ceil() as u32;

            // Text wraps at bound - pad, so wrapped text always takes the
            // `w + pad` arm and the bubble never grows past `bound`.
            let width = bubble_width(text_w, bound, pad);
            let bubble_x = x + content_width as i32 - width as i32;
            let bubble = RenderNode {
                kind: NodeKind::Bubble(Role::User),
                rect: Rect { x: bubble_x, y, width, height: text_h + pad },
                style: Style {
                    background: Some(theme.user_bubble),
                    radius: metrics.bubble_radius,
                    ..Style::default()
                },
                text: None,
            };
            let text = text_node(
                Role::User,
                Rect {
                    x: bubble_x + (pad / 2) as i32,
                    y: y + (pad / 2) as i32,
                    width: text_w.min(width.saturating_sub(pad)),
                    height: text_h,
                },
                theme.text,
                lines,
                metrics,
            );

            MessageBlock { nodes: vec![bubble, text], height: text_h + pad }
        }
    }
}

/// Compute the render tree for `messages` at a fixed page `width`.
/// - Rows stack vertically inside a padded container, separated by `row_gap`
/// - The container is never shorter than `min_height`
pub fn layout_transcript(
    messages: &[Message],
    width: u32,
    metrics: &LayoutMetrics,
    theme: &Theme,
    face: &dyn Typeface,
) -> RenderTree {
    let pad = metrics.container_padding;
    let content_width = width.saturating_sub(pad * 2);
    let mut rows = Vec::new();
    let mut y = pad as i32;

    for (i, message) in messages.iter().enumerate() {
        if i > 0 {
            y += metrics.row_gap as i32;
        }
        let block = render_message(message, pad as i32, y, content_width, metrics, theme, face);
        y += block.height as i32;
        rows.extend(block.nodes);
    }

    let height = (y as u32 + pad).max(metrics.min_height);
    let container = RenderNode {
        kind: NodeKind::Container,
        rect: Rect { x: 0, y: 0, width, height },
        style: Style {
            background: Some(theme.container_background),
            border: Some(Border { width: 1, color: theme.container_border }),
            shadow: Some(Shadow { offset_y: 1, spread: 2, color: theme.container_shadow }),
            radius: 8,
            ..Style::default()
        },
        text: None,
    };

    let mut nodes = Vec::with_capacity(rows.len() + 1);
    nodes.push(container);
    nodes.extend(rows);
    RenderTree { width, height, nodes }
}

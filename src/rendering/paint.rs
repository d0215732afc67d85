/// Paint command set produced from a render tree

use crate::error::Result;
use crate::rendering::layout::{NodeKind, RenderNode, RenderTree};

#[derive(Debug, Clone, PartialEq)]
pub enum PaintCommand {
    SolidRect {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        radius: u32,
        rgba: [u8; 4],
    },
    /// Rectangle outline of `thickness` pixels, drawn inside the rect.
    Stroke {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        thickness: u32,
        rgba: [u8; 4],
    },
    Text {
        x: i32,
        y: i32,
        line_height: f32,
        size: f32,
        text: String,
        rgba: [u8; 4],
        /// Center each line horizontally inside this width, when set
        center_in: Option<u32>,
    },
}

/// Build the display list for `tree`.
///
/// Every color must already be raster-safe; anything else (OKLCH,
/// translucency) is an error. Live trees are expected to go through
/// `normalize_for_export` on a detached copy first.
pub fn build_display_list(tree: &RenderTree) -> Result<Vec<PaintCommand>> {
    let mut cmds = Vec::new();
    for node in &tree.nodes {
        paint_node(node, &mut cmds)?;
    }
    Ok(cmds)
}

fn paint_node(node: &RenderNode, cmds: &mut Vec<PaintCommand>) -> Result<()> {
    let r = &node.rect;
    let style = &node.style;

    if let Some(shadow) = &style.shadow {
        let spread = shadow.spread as i32;
        cmds.push(PaintCommand::SolidRect {
            x: r.x - spread,
            y: r.y - spread + shadow.offset_y,
            width: r.width + shadow.spread * 2,
            height: r.height + shadow.spread * 2,
            radius: style.radius + shadow.spread,
            rgba: shadow.color.raster_rgba()?,
        });
    }

    if let Some(bg) = &style.background {
        cmds.push(PaintCommand::SolidRect {
            x: r.x,
            y: r.y,
            width: r.width,
            height: r.height,
            radius: style.radius,
            rgba: bg.raster_rgba()?,
        });
    }

    if let Some(border) = &style.border {
        cmds.push(PaintCommand::Stroke {
            x: r.x,
            y: r.y,
            width: r.width,
            height: r.height,
            thickness: border.width,
            rgba: border.color.raster_rgba()?,
        });
    }

    if let Some(run) = &node.text {
        let rgba = style.color.raster_rgba()?;
        let center_in = matches!(node.kind, NodeKind::Avatar).then_some(r.width);
        for (i, line) in run.lines.iter().enumerate() {
            if line.is_empty() {
                continue;
            }
            cmds.push(PaintCommand::Text {
                x: r.x,
                y: r.y + (i as f32 * run.line_height).round() as i32,
                line_height: run.line_height,
                size: run.size,
                text: line.clone(),
                rgba,
                center_in,
            });
        }
    }

    Ok(())
}

//! Export compositor
//!
//! Snapshots a detached, normalized copy of the transcript render tree and
//! stacks it between the frame banners on a fixed-size canvas:
//!
//! ```text
//! 0            ┌──────────── top ────────────┐
//!              ├─────────── title ───────────┤
//!              │         transcript          │
//!              ├──────────── mid ────────────┤
//!              │  background fill (if any)   │
//! max-bottom   ├─────────── bottom ──────────┤
//! max_height   └─────────────────────────────┘
//! ```

use std::sync::Arc;

use image::imageops;
use image::{Rgba, RgbaImage};
use log::{debug, info};

use crate::assets::FrameAssetSet;
use crate::config::{ExportConfig, ExportPalette};
use crate::error::{Error, Result};
use crate::rendering::layout::RenderTree;
use crate::rendering::raster::{allocate_canvas, encode_png, Rasterizer};
use crate::rendering::style::normalize_for_export;
use crate::store::Message;

/// Heights of the five vertical bands of a composite
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BandHeights {
    pub top: u32,
    pub title: u32,
    pub transcript: u32,
    pub mid: u32,
    pub bottom: u32,
}

impl BandHeights {
    pub fn from_assets(assets: &FrameAssetSet, transcript: u32) -> Self {
        Self {
            top: assets.top.height(),
            title: assets.title.height(),
            transcript,
            mid: assets.mid.height(),
            bottom: assets.bottom.height(),
        }
    }

    /// Sum of all bands, saturating at `u32::MAX`.
    pub fn total(&self) -> u32 {
        let sum = self.top as u64 + self.title as u64 + self.transcript as u64 + self.mid as u64 + self.bottom as u64;
        u32::try_from(sum).unwrap_or(u32::MAX)
    }
}

/// Vertical offsets of every band on the output canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompositePlan {
    pub heights: BandHeights,
    pub total: u32,
    pub title_y: u32,
    pub transcript_y: u32,
    pub mid_y: u32,
    /// Start and height of the background strip between mid and bottom
    pub gap_y: u32,
    pub gap_height: u32,
    pub bottom_y: u32,
}

/// Lay out the bands on a canvas `max_height` tall.
///
/// Fails with [`Error::OverLength`] carrying the measured total when the
/// bands do not fit.
pub fn plan_composite(heights: BandHeights, max_height: u32) -> Result<CompositePlan> {
    let total = heights.total();
    if total > max_height {
        return Err(Error::OverLength { current: total, max: max_height });
    }
    let title_y = heights.top;
    let transcript_y = title_y + heights.title;
    let mid_y = transcript_y + heights.transcript;
    let gap_y = mid_y + heights.mid;
    let bottom_y = max_height - heights.bottom;
    Ok(CompositePlan {
        heights,
        total,
        title_y,
        transcript_y,
        mid_y,
        gap_y,
        gap_height: bottom_y - gap_y,
        bottom_y,
    })
}

/// A finished composite, ready for encoding
#[derive(Debug, Clone)]
pub struct Composite {
    image: RgbaImage,
    plan: CompositePlan,
}

impl Composite {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn plan(&self) -> &CompositePlan {
        &self.plan
    }

    pub fn to_png(&self) -> Result<Vec<u8>> {
        encode_png(&self.image)
    }
}

pub struct ExportCompositor {
    width: u32,
    max_height: u32,
    scale: f32,
    palette: ExportPalette,
    rasterizer: Arc<dyn Rasterizer>,
}

impl ExportCompositor {
    pub fn new(config: &ExportConfig, rasterizer: Arc<dyn Rasterizer>) -> Self {
        Self {
            width: config.canvas_width,
            max_height: config.max_height,
            scale: config.scale_factor,
            palette: config.palette.clone(),
            rasterizer,
        }
    }

    /// Export the transcript.
    ///
    /// Returns `Ok(None)` without doing anything when there are no messages,
    /// no mounted transcript, or no frame assets yet.
    pub async fn export_transcript(
        &self,
        tree: Option<&RenderTree>,
        assets: Option<&FrameAssetSet>,
        messages: &[Message],
    ) -> Result<Option<Composite>> {
        if messages.is_empty() {
            debug!("export skipped: no messages");
            return Ok(None);
        }
        let Some(tree) = tree else {
            debug!("export skipped: transcript is not mounted");
            return Ok(None);
        };
        let Some(assets) = assets else {
            debug!("export skipped: frame assets not loaded");
            return Ok(None);
        };

        // Reject over-length content before paying for a raster at 2x.
        plan_composite(BandHeights::from_assets(assets, tree.height), self.max_height)?;

        let mut detached = tree.clone();
        normalize_for_export(&mut detached, &self.palette);
        let snapshot = self.snapshot(detached).await?;

        let composite = self.compose(&snapshot, assets)?;
        info!(
            "composed {}x{} export ({}px of content)",
            composite.width(),
            composite.height(),
            composite.plan.total
        );
        Ok(Some(composite))
    }

    /// Rasterize on the blocking pool. The detached tree moves into the task
    /// and is dropped there whether or not rasterization succeeds.
    async fn snapshot(&self, detached: RenderTree) -> Result<RgbaImage> {
        let rasterizer = Arc::clone(&self.rasterizer);
        let (width, scale) = (self.width, self.scale);
        tokio::task::spawn_blocking(move || rasterizer.rasterize(&detached, width, scale))
            .await
            .map_err(|e| Error::RenderError(format!("snapshot task failed: {}", e)))?
    }

    /// Stack frames and the transcript snapshot onto a fresh canvas.
    pub fn compose(&self, transcript: &RgbaImage, assets: &FrameAssetSet) -> Result<Composite> {
        let plan = plan_composite(BandHeights::from_assets(assets, transcript.height()), self.max_height)?;

        let bg = self.palette.background.to_raster_safe([255, 255, 255]).raster_rgba()?;
        let mut canvas = allocate_canvas(self.width, self.max_height, bg)?;

        imageops::overlay(&mut canvas, &assets.top, 0, 0);
        imageops::overlay(&mut canvas, &assets.title, 0, plan.title_y as i64);
        imageops::overlay(&mut canvas, transcript, 0, plan.transcript_y as i64);
        imageops::overlay(&mut canvas, &assets.mid, 0, plan.mid_y as i64);
        for y in plan.gap_y..plan.gap_y + plan.gap_height {
            for x in 0..self.width {
                canvas.put_pixel(x, y, Rgba(bg));
            }
        }
        imageops::overlay(&mut canvas, &assets.bottom, 0, plan.bottom_y as i64);

        Ok(Composite { image: canvas, plan })
    }
}

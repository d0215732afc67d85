//! Frame asset loading
//!
//! The four decorative banners (top, title, middle, bottom) are fetched
//! concurrently and decoded into RGBA images. A single failed banner fails
//! the whole set. HTTP fetches are anonymous: no cookie store, no
//! credentials, no referer.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use image::imageops::{self, FilterType};
use image::RgbaImage;
use log::{debug, warn};
use serde::Deserialize;
use tokio::sync::OnceCell;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameSlot {
    Top,
    Title,
    Mid,
    Bottom,
}

impl FrameSlot {
    pub const ALL: [FrameSlot; 4] = [FrameSlot::Top, FrameSlot::Title, FrameSlot::Mid, FrameSlot::Bottom];
}

impl fmt::Display for FrameSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FrameSlot::Top => "top",
            FrameSlot::Title => "title",
            FrameSlot::Mid => "mid",
            FrameSlot::Bottom => "bottom",
        };
        f.write_str(name)
    }
}

/// Where a frame image comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetSource {
    File(PathBuf),
    Url(url::Url),
}

impl AssetSource {
    /// `http(s)://` and `file://` URLs are recognized; anything else is a path.
    pub fn parse(s: &str) -> Self {
        match url::Url::parse(s) {
            Ok(u) if u.scheme() == "http" || u.scheme() == "https" => AssetSource::Url(u),
            Ok(u) if u.scheme() == "file" => match u.to_file_path() {
                Ok(p) => AssetSource::File(p),
                Err(()) => AssetSource::File(PathBuf::from(s)),
            },
            _ => AssetSource::File(PathBuf::from(s)),
        }
    }

    /// Resolve `rel` against an asset root that is either a directory or a base URL.
    pub fn join(root: &str, rel: &str) -> Result<Self> {
        if let AssetSource::Url(u) = AssetSource::parse(rel) {
            return Ok(AssetSource::Url(u));
        }
        match AssetSource::parse(root) {
            AssetSource::Url(mut base) => {
                if !base.path().ends_with('/') {
                    let path = format!("{}/", base.path());
                    base.set_path(&path);
                }
                let joined = base
                    .join(rel)
                    .map_err(|e| Error::ConfigError(format!("cannot join '{}' onto '{}': {}", rel, root, e)))?;
                Ok(AssetSource::Url(joined))
            }
            AssetSource::File(dir) => Ok(AssetSource::File(dir.join(rel))),
        }
    }
}

impl fmt::Display for AssetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetSource::File(p) => write!(f, "{}", p.display()),
            AssetSource::Url(u) => write!(f, "{}", u),
        }
    }
}

/// Frame file names relative to an asset root, as written in config
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FramePaths {
    pub top: String,
    pub title: String,
    pub mid: String,
    pub bottom: String,
}

impl Default for FramePaths {
    fn default() -> Self {
        Self {
            top: "top.png".into(),
            title: "title.png".into(),
            mid: "mid.png".into(),
            bottom: "bottom.png".into(),
        }
    }
}

impl FramePaths {
    pub fn resolve(&self, root: &str) -> Result<FrameSources> {
        Ok(FrameSources {
            top: AssetSource::join(root, &self.top)?,
            title: AssetSource::join(root, &self.title)?,
            mid: AssetSource::join(root, &self.mid)?,
            bottom: AssetSource::join(root, &self.bottom)?,
        })
    }
}

/// Fully resolved locations of the four frames
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSources {
    pub top: AssetSource,
    pub title: AssetSource,
    pub mid: AssetSource,
    pub bottom: AssetSource,
}

/// The decoded frame images, all exactly canvas-wide
#[derive(Debug, Clone)]
pub struct FrameAssetSet {
    pub top: RgbaImage,
    pub title: RgbaImage,
    pub mid: RgbaImage,
    pub bottom: RgbaImage,
}

impl FrameAssetSet {
    pub fn get(&self, slot: FrameSlot) -> &RgbaImage {
        match slot {
            FrameSlot::Top => &self.top,
            FrameSlot::Title => &self.title,
            FrameSlot::Mid => &self.mid,
            FrameSlot::Bottom => &self.bottom,
        }
    }
}

/// Loads and caches the frame asset set for one session.
pub struct FrameAssetLoader {
    canvas_width: u32,
    #[cfg(feature = "remote-assets")]
    client: reqwest::Client,
    cache: OnceCell<Arc<FrameAssetSet>>,
}

impl FrameAssetLoader {
    pub fn new(canvas_width: u32) -> Result<Self> {
        #[cfg(feature = "remote-assets")]
        let client = reqwest::Client::builder()
            .referer(false)
            .build()
            .map_err(|e| Error::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            canvas_width,
            #[cfg(feature = "remote-assets")]
            client,
            cache: OnceCell::new(),
        })
    }

    /// The cached set, if a previous `load_all` succeeded
    pub fn cached(&self) -> Option<Arc<FrameAssetSet>> {
        self.cache.get().cloned()
    }

    /// Load all four frames concurrently. Resolves only when every frame
    /// decoded; the first failure wins. Successful results are cached and
    /// later calls do not fetch again.
    pub async fn load_all(&self, sources: &FrameSources) -> Result<Arc<FrameAssetSet>> {
        let set = self
            .cache
            .get_or_try_init(|| async {
                let (top, title, mid, bottom) = futures::future::try_join4(
                    self.load_one(FrameSlot::Top, &sources.top),
                    self.load_one(FrameSlot::Title, &sources.title),
                    self.load_one(FrameSlot::Mid, &sources.mid),
                    self.load_one(FrameSlot::Bottom, &sources.bottom),
                )
                .await?;
                Ok::<_, Error>(Arc::new(FrameAssetSet { top, title, mid, bottom }))
            })
            .await?;
        Ok(Arc::clone(set))
    }

    async fn load_one(&self, slot: FrameSlot, source: &AssetSource) -> Result<RgbaImage> {
        debug!("loading {} frame from {}", slot, source);
        let bytes = self.fetch(slot, source).await?;
        let width = self.canvas_width;
        tokio::task::spawn_blocking(move || decode_frame(slot, &bytes, width))
            .await
            .map_err(|e| Error::AssetLoad { slot, reason: format!("decode task failed: {}", e) })?
    }

    async fn fetch(&self, slot: FrameSlot, source: &AssetSource) -> Result<Vec<u8>> {
        let fail = |reason: String| Error::AssetLoad { slot, reason };
        match source {
            AssetSource::File(path) => tokio::fs::read(path)
                .await
                .map_err(|e| fail(format!("{}: {}", path.display(), e))),
            #[cfg(feature = "remote-assets")]
            AssetSource::Url(url) => {
                let resp = self
                    .client
                    .get(url.clone())
                    .send()
                    .await
                    .map_err(|e| fail(format!("{}: {}", url, e)))?;
                let resp = resp.error_for_status().map_err(|e| fail(e.to_string()))?;
                let body = resp.bytes().await.map_err(|e| fail(format!("{}: {}", url, e)))?;
                Ok(body.to_vec())
            }
            #[cfg(not(feature = "remote-assets"))]
            AssetSource::Url(url) => Err(fail(format!("{}: remote assets are disabled", url))),
        }
    }
}

/// Decode frame bytes and fit them to the canvas width, keeping aspect ratio.
pub fn decode_frame(slot: FrameSlot, bytes: &[u8], canvas_width: u32) -> Result<RgbaImage> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| Error::AssetLoad { slot, reason: e.to_string() })?
        .to_rgba8();
    let (w, h) = img.dimensions();
    if w == canvas_width {
        return Ok(img);
    }
    let scaled_h = ((h as u64 * canvas_width as u64 + w as u64 / 2) / w as u64).max(1) as u32;
    warn!(
        "{} frame is {}px wide, resizing to {}x{} to fit the canvas",
        slot, w, canvas_width, scaled_h
    );
    Ok(imageops::resize(&img, canvas_width, scaled_h, FilterType::Triangle))
}

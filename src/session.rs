//! Session state: the message store, pending input, frame assets and the
//! cached transcript layout, owned in one place and handed by reference to
//! the renderer and compositor.

use std::sync::Arc;

use log::{error, info};

use crate::assets::{FrameAssetLoader, FrameAssetSet, FrameSources};
use crate::config::ExportConfig;
use crate::download::DownloadEmitter;
use crate::error::{Error, Result};
use crate::export::{BandHeights, Composite, ExportCompositor};
use crate::rendering::layout::{layout_transcript, RenderTree};
use crate::rendering::raster::{Rasterizer, SoftwareRasterizer};
use crate::rendering::text::{CellFace, Typeface};
use crate::store::{Message, MessageStore};

/// Load state of the frame asset set
#[derive(Debug, Clone, Default)]
pub enum FrameState {
    #[default]
    Pending,
    Ready(Arc<FrameAssetSet>),
    Failed(String),
}

impl FrameState {
    pub fn ready(&self) -> Option<&FrameAssetSet> {
        match self {
            FrameState::Ready(set) => Some(set.as_ref()),
            _ => None,
        }
    }
}

/// Pick the typeface named by the config, falling back to the cell face.
pub fn load_typeface(config: &ExportConfig) -> Result<Arc<dyn Typeface>> {
    match &config.font_path {
        None => Ok(Arc::new(CellFace)),
        #[cfg(feature = "truetype")]
        Some(path) => Ok(Arc::new(crate::rendering::text::TrueTypeFace::from_file(path)?)),
        #[cfg(not(feature = "truetype"))]
        Some(path) => Err(Error::ConfigError(format!(
            "font {} requested but TrueType support is not compiled in",
            path.display()
        ))),
    }
}

pub struct Session {
    config: ExportConfig,
    store: MessageStore,
    user_input: String,
    assistant_input: String,
    frames: FrameState,
    face: Arc<dyn Typeface>,
    compositor: ExportCompositor,
    emitter: Box<dyn DownloadEmitter>,
    // (store revision, tree)
    layout: Option<(u64, RenderTree)>,
}

impl Session {
    pub fn new(config: ExportConfig, face: Arc<dyn Typeface>, emitter: Box<dyn DownloadEmitter>) -> Self {
        let rasterizer = Arc::new(SoftwareRasterizer::new(Arc::clone(&face)));
        Self::with_rasterizer(config, face, rasterizer, emitter)
    }

    pub fn with_rasterizer(
        config: ExportConfig,
        face: Arc<dyn Typeface>,
        rasterizer: Arc<dyn Rasterizer>,
        emitter: Box<dyn DownloadEmitter>,
    ) -> Self {
        let compositor = ExportCompositor::new(&config, rasterizer);
        Self {
            config,
            store: MessageStore::new(),
            user_input: String::new(),
            assistant_input: String::new(),
            frames: FrameState::Pending,
            face,
            compositor,
            emitter,
            layout: None,
        }
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    pub fn messages(&self) -> &[Message] {
        self.store.messages()
    }

    pub fn set_user_input(&mut self, text: impl Into<String>) {
        self.user_input = text.into();
    }

    pub fn set_assistant_input(&mut self, text: impl Into<String>) {
        self.assistant_input = text.into();
    }

    pub fn user_input(&self) -> &str {
        &self.user_input
    }

    pub fn assistant_input(&self) -> &str {
        &self.assistant_input
    }

    /// Commit the pending inputs as a new pair. Inputs are cleared only
    /// when the pair was accepted.
    pub fn add_pair(&mut self) -> Result<()> {
        self.store.append_pair(&self.user_input, &self.assistant_input)?;
        self.user_input.clear();
        self.assistant_input.clear();
        Ok(())
    }

    pub fn remove_pair(&mut self, index: usize) -> bool {
        self.store.remove_pair(index)
    }

    /// Clear the whole transcript once `confirm` agrees. Returns `Ok(false)`
    /// when the user declined.
    pub fn clear(&mut self, confirm: impl FnOnce() -> bool) -> Result<bool> {
        if self.store.is_empty() {
            return Err(Error::NothingToClear);
        }
        if !confirm() {
            return Ok(false);
        }
        self.store.clear()?;
        Ok(true)
    }

    /// Replace the store wholesale, e.g. from a transcript file.
    pub fn load_store(&mut self, store: MessageStore) {
        self.store = store;
        self.layout = None;
    }

    pub fn frames(&self) -> &FrameState {
        &self.frames
    }

    /// Load the frame assets. Failure is logged and leaves export disabled;
    /// it is never retried automatically.
    pub async fn load_frames(&mut self, loader: &FrameAssetLoader, sources: &FrameSources) -> &FrameState {
        self.frames = match loader.load_all(sources).await {
            Ok(set) => {
                info!("frame assets ready");
                FrameState::Ready(set)
            }
            Err(e) => {
                error!("frame assets failed to load: {}", e);
                FrameState::Failed(e.to_string())
            }
        };
        &self.frames
    }

    fn refresh_layout(&mut self) {
        let rev = self.store.revision();
        if matches!(&self.layout, Some((cached, _)) if *cached == rev) {
            return;
        }
        let tree = layout_transcript(
            self.store.messages(),
            self.config.canvas_width,
            &self.config.layout,
            &self.config.theme,
            self.face.as_ref(),
        );
        self.layout = Some((rev, tree));
    }

    /// The live transcript tree, or `None` while there is nothing to show.
    pub fn transcript(&mut self) -> Option<&RenderTree> {
        if self.store.is_empty() {
            return None;
        }
        self.refresh_layout();
        self.layout.as_ref().map(|(_, tree)| tree)
    }

    /// Band heights the next export would use, when frames are ready.
    pub fn band_heights(&mut self) -> Option<BandHeights> {
        let transcript = self.transcript()?.height;
        let assets = self.frames.ready()?;
        Some(BandHeights::from_assets(assets, transcript))
    }

    /// Build the composite without emitting it.
    pub async fn compose(&mut self) -> Result<Option<Composite>> {
        if !self.store.is_empty() {
            self.refresh_layout();
        }
        let tree = if self.store.is_empty() {
            None
        } else {
            self.layout.as_ref().map(|(_, tree)| tree)
        };
        self.compositor
            .export_transcript(tree, self.frames.ready(), self.store.messages())
            .await
    }

    /// Compose and hand the PNG to the emitter. Returns `true` when an image
    /// was emitted, `false` when export was skipped.
    pub async fn export(&mut self) -> Result<bool> {
        let Some(composite) = self.compose().await? else {
            return Ok(false);
        };
        let png = composite.to_png()?;
        self.emitter.emit(&png, &self.config.filename)?;
        Ok(true)
    }
}

//! chatframe
//!
//! Compose a fake chat transcript of alternating user/assistant turns and
//! export it as a single PNG framed like a chat app screenshot.
//!
//! # Pipeline
//!
//! - **Message store**: pairs of user/assistant messages, in memory only
//! - **Renderer**: lays messages out into a [`RenderTree`]
//! - **Frame loader**: fetches the top/title/mid/bottom banners concurrently
//! - **Compositor**: snapshots a detached, export-normalized copy of the
//!   tree and stacks it between the banners on a fixed-size canvas
//! - **Emitter**: writes the PNG out
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use chatframe::{ExportConfig, FileDownload, FrameAssetLoader, Session};
//!
//! # async fn run() -> chatframe::Result<()> {
//! let config = ExportConfig::default();
//! let face = chatframe::session::load_typeface(&config)?;
//! let loader = FrameAssetLoader::new(config.canvas_width)?;
//! let sources = config.frames.resolve("public/images")?;
//!
//! let mut session = Session::new(config, face, Box::new(FileDownload::new(".")));
//! session.load_frames(&loader, &sources).await;
//! session.set_user_input("What is Rust?");
//! session.set_assistant_input("A systems programming language.");
//! session.add_pair()?;
//! session.export().await?;
//! # Ok(())
//! # }
//! ```

pub mod assets;
pub mod config;
pub mod download;
pub mod error;
pub mod export;
pub mod rendering;
pub mod session;
pub mod store;

pub use assets::{AssetSource, FrameAssetLoader, FrameAssetSet, FramePaths, FrameSlot, FrameSources};
pub use config::{ExportConfig, ExportPalette, LayoutMetrics, Theme};
pub use download::{DataUrlDownload, DownloadEmitter, FileDownload};
pub use error::{Error, Result};
pub use export::{plan_composite, BandHeights, Composite, CompositePlan, ExportCompositor};
pub use rendering::{RenderTree, Rasterizer, SoftwareRasterizer};
pub use session::{FrameState, Session};
pub use store::{Message, MessageStore, Role, Transcript};

//! Download emitters: hand the encoded PNG to the outside world.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use base64::Engine as _;
use log::info;

use crate::error::Result;

/// Fire-and-forget delivery of an exported image. No retry, no prompt.
pub trait DownloadEmitter: Send + Sync {
    fn emit(&self, png: &[u8], filename: &str) -> Result<()>;
}

/// Writes `dir/filename`, replacing any previous export.
#[derive(Debug, Clone)]
pub struct FileDownload {
    dir: PathBuf,
}

impl FileDownload {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }
}

impl DownloadEmitter for FileDownload {
    fn emit(&self, png: &[u8], filename: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(filename);
        std::fs::write(&path, png)?;
        info!("wrote {} ({} bytes)", path.display(), png.len());
        Ok(())
    }
}

/// `data:image/png;base64,...` for the given bytes
pub fn to_data_url(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", base64::engine::general_purpose::STANDARD.encode(png))
}

/// Writes the image as a data URL line to a writer (stdout by default).
pub struct DataUrlDownload {
    out: Mutex<Box<dyn Write + Send>>,
}

impl DataUrlDownload {
    pub fn stdout() -> Self {
        Self::to_writer(Box::new(std::io::stdout()))
    }

    pub fn to_writer(out: Box<dyn Write + Send>) -> Self {
        Self { out: Mutex::new(out) }
    }
}

impl DownloadEmitter for DataUrlDownload {
    fn emit(&self, png: &[u8], filename: &str) -> Result<()> {
        let mut out = self.out.lock().unwrap_or_else(|e| e.into_inner());
        writeln!(out, "{}", to_data_url(png))?;
        out.flush()?;
        info!("emitted {} as data URL", filename);
        Ok(())
    }
}

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

use chatframe::session::load_typeface;
use chatframe::{
    DataUrlDownload, DownloadEmitter, ExportConfig, FileDownload, FrameAssetLoader, FrameState, MessageStore,
    Session, Transcript,
};

#[derive(Parser)]
#[command(name = "chatframe", version, about = "Render a chat transcript into a framed PNG")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compose the transcript and write the PNG
    Export {
        #[command(flatten)]
        common: CommonArgs,
        /// Output directory for the PNG
        #[arg(long, default_value = ".")]
        out: PathBuf,
        /// Print a data URL to stdout instead of writing a file
        #[arg(long)]
        data_url: bool,
    },
    /// Report band heights against the maximum without writing anything
    Measure {
        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// Transcript JSON: {"messages": [{"role": "user", "content": "..."}, ...]}
    #[arg(long)]
    transcript: PathBuf,
    /// Directory or base URL holding the frame images
    #[arg(long, default_value = "public/images")]
    assets: String,
    /// JSON config overriding the defaults
    #[arg(long)]
    config: Option<PathBuf>,
    /// TrueType font for message text
    #[arg(long)]
    font: Option<PathBuf>,
}

async fn prepare(common: &CommonArgs, emitter: Box<dyn DownloadEmitter>) -> anyhow::Result<Session> {
    let mut config = match &common.config {
        Some(path) => ExportConfig::from_json_file(path)?,
        None => ExportConfig::default(),
    };
    if common.font.is_some() {
        config.font_path = common.font.clone();
    }

    let raw = std::fs::read_to_string(&common.transcript)
        .with_context(|| format!("failed to read transcript {}", common.transcript.display()))?;
    let store = MessageStore::from_transcript(&Transcript::from_json(&raw)?)?;

    let face = load_typeface(&config)?;
    let loader = FrameAssetLoader::new(config.canvas_width)?;
    let sources = config.frames.resolve(&common.assets)?;

    let mut session = Session::new(config, face, emitter);
    session.load_store(store);
    if let FrameState::Failed(reason) = session.load_frames(&loader, &sources).await {
        anyhow::bail!("frame assets unavailable: {}", reason);
    }
    Ok(session)
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Export { common, out, data_url } => {
            let emitter: Box<dyn DownloadEmitter> = if data_url {
                Box::new(DataUrlDownload::stdout())
            } else {
                Box::new(FileDownload::new(out.clone()))
            };
            let mut session = prepare(&common, emitter).await?;
            if !session.export().await? {
                anyhow::bail!("nothing to export: the transcript is empty");
            }
            if !data_url {
                eprintln!("wrote {}", out.join(&session.config().filename).display());
            }
        }
        Command::Measure { common } => {
            let mut session = prepare(&common, Box::new(FileDownload::new("."))).await?;
            let max = session.config().max_height;
            let h = session
                .band_heights()
                .context("nothing to measure: the transcript is empty")?;
            println!("top         {:>6}px", h.top);
            println!("title       {:>6}px", h.title);
            println!("transcript  {:>6}px", h.transcript);
            println!("mid         {:>6}px", h.mid);
            println!("bottom      {:>6}px", h.bottom);
            println!("total       {:>6}px of {}px", h.total(), max);
            if h.total() > max {
                anyhow::bail!("transcript is {}px too tall", h.total() - max);
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("chatframe: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

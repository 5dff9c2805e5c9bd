//! gesture-engine - replay hand-landmark frames through the interaction engine
//!
//! Reads wire messages (one s-expression per line) from a script or stdin
//! and writes the resulting host actions to stdout as event s-expressions.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing::info;

use gesture_engine::bookmarks::BookmarkList;
use gesture_engine::replay::{self, ScriptDetector};
use gesture_engine::wire::SexpHost;
use gesture_engine::{Engine, EngineConfig, Mode};

#[derive(Copy, Clone, Debug, ValueEnum)]
enum StartMode {
    Navigation,
    Keyboard,
}

impl From<StartMode> for Mode {
    fn from(m: StartMode) -> Self {
        match m {
            StartMode::Navigation => Mode::Navigation,
            StartMode::Keyboard => Mode::Keyboard,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "gesture-engine", about = "Hand-gesture interaction engine")]
struct Cli {
    /// Wire script to replay (default: stdin)
    #[arg(long)]
    script: Option<PathBuf>,

    /// Configuration plist file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Mode to enter before the first frame
    #[arg(long, value_enum, default_value = "navigation")]
    mode: StartMode,

    /// Viewport size for cursor mapping, WIDTHxHEIGHT
    #[arg(long)]
    viewport: Option<String>,

    /// Log all incoming wire messages to stderr
    #[arg(long)]
    ipc_trace: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gesture_engine=info".into()),
        )
        .init();

    info!("gesture-engine v{} starting", env!("CARGO_PKG_VERSION"));

    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(viewport) = &cli.viewport {
        config.set_viewport(viewport)?;
    }

    if cli.print_config {
        println!("{}", config.config_sexp());
        return Ok(());
    }

    let mut engine = Engine::new(config, BookmarkList::with_defaults());
    engine.switch_mode(cli.mode.into(), Box::new(ScriptDetector::new()))?;

    replay::install_signal_handlers();

    let host = SexpHost::new(io::stdout());
    let result = match &cli.script {
        Some(path) => {
            let file =
                File::open(path).with_context(|| format!("opening script {}", path.display()))?;
            info!("replaying {}", path.display());
            replay::replay(engine, BufReader::new(file), host, cli.ipc_trace)?
        }
        None => {
            info!("replaying stdin");
            replay::replay(engine, BufReader::new(io::stdin()), host, cli.ipc_trace)?
        }
    };

    info!(
        "gesture-engine shutting down ({} frame(s), {} event(s))",
        result.stats.frames,
        result.host.events_written()
    );
    Ok(())
}

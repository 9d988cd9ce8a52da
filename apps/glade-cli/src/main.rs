use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use glade_assets::{GltfLoader, ModelLoader};
use glade_kernel::{Clock, Engine, EngineConfig, FixedClock, SystemClock, marker_names};
use glade_render::DebugTextRenderer;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "glade", about = "Run glade worlds headless")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Engine config (JSON). Defaults are used when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory model paths are resolved against
    #[arg(short, long, global = true, default_value = "assets")]
    assets: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble the world and run frames with scripted input
    Run {
        /// Number of frames to run
        #[arg(short, long, default_value = "60")]
        frames: u64,
        /// Key codes held for the whole run (e.g. KeyW, ArrowLeft)
        #[arg(long = "hold", value_name = "CODE")]
        hold: Vec<String>,
        /// Use wall-clock time instead of a fixed 1/60 s step
        #[arg(long)]
        realtime: bool,
    },
    /// List the spawn markers in the world scene
    Markers {
        /// World scene to inspect. Defaults to the configured world.
        #[arg(short, long)]
        world: Option<String>,
    },
    /// Print the effective configuration as JSON
    Config,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => EngineConfig::load(path).with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    let loader = GltfLoader::new(&cli.assets);

    match cli.command {
        Commands::Run {
            frames,
            hold,
            realtime,
        } => {
            if realtime {
                run(config, &loader, SystemClock::new(), frames, &hold)
            } else {
                run(config, &loader, FixedClock::new(1.0 / 60.0), frames, &hold)
            }
        }
        Commands::Markers { world } => {
            let path = world.unwrap_or_else(|| config.world.path.clone());
            let scene = pollster::block_on(loader.load(&path)).with_context(|| format!("loading world {path}"))?;
            println!("{path}: {} top-level nodes", scene.nodes.len());
            for name in marker_names(&scene, &config.world.marker_prefix) {
                println!("  {name}");
            }
            Ok(())
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

fn run<C: Clock>(
    config: EngineConfig,
    loader: &GltfLoader,
    clock: C,
    frames: u64,
    hold: &[String],
) -> anyhow::Result<()> {
    let mut engine = Engine::new(config, DebugTextRenderer::new(), clock);
    pollster::block_on(engine.initialize(loader)).context("starting engine")?;

    let input = engine.input_sender();
    for code in hold {
        input.key_down(code.as_str());
    }

    let ran = engine.run(Some(frames)).context("running frames")?;
    print!("{}", engine.renderer().last_frame());
    engine.stop();
    tracing::info!(frames = ran, "done");
    Ok(())
}

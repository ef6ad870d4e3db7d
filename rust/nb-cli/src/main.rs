//! nb: command-line entry point for the game-client bot bridge.
//!
//! Subcommands:
//! - serve          accept one game client at a time and answer every frame
//! - print-config   dump the effective config as YAML
//! - inspect-model  load a model artifact and print its shape

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use nb_core::Config;
use nb_features::GameStateExtractor;
use nb_model::{LstmModel, SequenceModel};
use nb_server::Server;

#[derive(Parser)]
#[command(name = "nb", version)]
#[command(about = "Bridge a game client to a sequence-model bot over TCP")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Listen for game clients and serve move commands.
    Serve(ConfigArgs),
    /// Print the effective configuration (defaults + file + flags) as YAML.
    PrintConfig(ConfigArgs),
    /// Load a safetensors model and print its dimensions.
    InspectModel {
        /// Path to the model artifact
        #[arg(long)]
        model: PathBuf,
    },
}

#[derive(clap::Args)]
struct ConfigArgs {
    /// YAML config file
    #[arg(long, short)]
    config: Option<PathBuf>,
    /// Listen address, e.g. 127.0.0.1:6969
    #[arg(long)]
    bind: Option<String>,
    /// Model artifact; relative paths resolve against the executable's directory
    #[arg(long)]
    model: Option<PathBuf>,
    /// Exit after this many sessions
    #[arg(long)]
    max_sessions: Option<u64>,
    /// Append session events (NDJSON) to this file
    #[arg(long)]
    events: Option<PathBuf>,
}

impl ConfigArgs {
    fn load(&self) -> Result<Config> {
        let mut cfg = match &self.config {
            Some(path) => Config::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => Config::default(),
        };
        if let Some(bind) = &self.bind {
            cfg.server.bind = bind.clone();
        }
        if let Some(model) = &self.model {
            cfg.model.path = model.clone();
        }
        if let Some(n) = self.max_sessions {
            cfg.server.max_sessions = Some(n);
        }
        if let Some(events) = &self.events {
            cfg.logging.events_path = Some(events.clone());
        }
        cfg.validate().context("invalid config")?;
        Ok(cfg)
    }
}

fn cmd_serve(args: &ConfigArgs) -> Result<()> {
    let cfg = args.load()?;
    let model = nb_server::load_model(&cfg).context("model load failed")?;
    let mut server = Server::from_config(&cfg, model, GameStateExtractor::new)
        .context("server startup failed")?;
    let summary = server.serve()?;
    info!(
        sessions = summary.sessions,
        peer_closed = summary.peer_closed,
        abnormal = summary.abnormal,
        "server finished"
    );
    Ok(())
}

fn cmd_print_config(args: &ConfigArgs) -> Result<()> {
    let cfg = args.load()?;
    print!("{}", cfg.to_yaml()?);
    Ok(())
}

fn cmd_inspect_model(path: &Path) -> Result<()> {
    let model = LstmModel::load(path)
        .with_context(|| format!("failed to load model {}", path.display()))?;
    println!("model:      {}", path.display());
    println!("input_dim:  {}", model.input_dim());
    println!("hidden_dim: {}", model.hidden_dim());
    println!("layers:     {}", model.num_layers());
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = nb_logging::init_tracing("info") {
        eprintln!("failed to initialise logging: {e}");
    }

    let res = match &cli.command {
        Command::Serve(args) => cmd_serve(args),
        Command::PrintConfig(args) => cmd_print_config(args),
        Command::InspectModel { model } => cmd_inspect_model(model),
    };
    if let Err(e) = res {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

//! CLI binary for roombot.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use roombot::booking::{BookingOrchestrator, OrchestratorSettings};
use roombot::lark::LarkBackend;
use roombot::lark::calendar::display_time;
use roombot::{RoomBotConfig, logging};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// roombot: books recurring meetings into free rooms.
#[derive(Parser)]
#[command(name = "roombot", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Option<Command>,
}

/// Available commands.
#[derive(Subcommand)]
enum Command {
    /// Poll the task table and book rooms until interrupted.
    Run,

    /// Run a single booking cycle and exit.
    Once,

    /// Print pending occurrences without booking anything.
    Plan,

    /// Fill the room-config table from the platform's room list.
    InitRooms,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let path = cli
        .config
        .clone()
        .unwrap_or_else(RoomBotConfig::default_config_path);
    let config = RoomBotConfig::from_file(&path)
        .map_err(|e| anyhow::anyhow!("cannot load {}: {e}", path.display()))?;

    let _log_guard = logging::init(&config.logging)?;
    config.validate()?;
    info!("roombot v{} using {}", env!("CARGO_PKG_VERSION"), path.display());

    let backend = LarkBackend::connect(&config).await?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run_loop(&orchestrator(backend, &config)?).await?,
        Command::Once => {
            let orchestrator = orchestrator(backend, &config)?;
            let report = orchestrator.run_cycle(orchestrator.now()).await?;
            println!("{report:#?}");
        }
        Command::Plan => {
            let orchestrator = orchestrator(backend, &config)?;
            let offset = orchestrator.settings().utc_offset;
            for occurrence in orchestrator.plan(orchestrator.now()).await? {
                println!(
                    "{}\t{}\t{} - {}\t{}",
                    occurrence.task_id,
                    occurrence.title,
                    display_time(occurrence.start, &offset),
                    display_time(occurrence.end, &offset),
                    occurrence.preferred_room_names.join(", ")
                );
            }
        }
        Command::InitRooms => {
            let written = backend.initialize_room_config().await?;
            println!(
                "Room config table initialised with {written} rooms. \
                 Switch rooms you do not want booked to OFF in the table."
            );
        }
    }

    Ok(())
}

fn orchestrator(
    backend: LarkBackend,
    config: &RoomBotConfig,
) -> anyhow::Result<BookingOrchestrator<LarkBackend>> {
    let settings = OrchestratorSettings::from_config(&config.scheduler)?;
    Ok(BookingOrchestrator::new(backend, settings))
}

async fn run_loop(orchestrator: &BookingOrchestrator<LarkBackend>) -> anyhow::Result<()> {
    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, shutting down");
            signal_token.cancel();
        }
    });

    orchestrator.run(shutdown).await?;
    Ok(())
}

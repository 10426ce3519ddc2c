mod error;
mod message;
mod player;
mod raffle;
mod raffle_log;
mod report;
mod settings;
mod streaks;

use chrono::{DateTime, Utc};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

pub use error::{FormatError, ReconstructError, StateError};
pub use message::{
    classify, is_ignored_line, parse_line, AdditionalReward, EndMessage, EntryMessage,
    FactExtensionMessage, FactMessage, Message, RaffleVariety, StartMessage,
};
pub use player::{aggregate_players, Player, PlayerAggregator};
pub use raffle::{assemble_raffles, Raffle, RaffleAssembler, RaffleOutcome};
pub use raffle_log::{
    classify_lines, raffles_between, read_raffle_log, reconstruct, Reconstruction,
};
pub use report::{
    read_raffle_report, report_sidecar_path, write_raffle_report, PlayerReportRow, RaffleReport,
};
pub use settings::{load_settings, ReconstructionSettings};
pub use streaks::{max_win_streaks, winner_streaks};

#[derive(Debug, Parser)]
#[command(name = "raffle-log", about = "Reconstruct raffles and player luck from a raffle bot chat log")]
struct Cli {
    /// Raffle bot chat log to read
    log_file: PathBuf,

    /// JSON file overriding the reconstruction windows
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Write a JSON summary; defaults to a sidecar next to the log
    #[arg(long, num_args = 0..=1)]
    report: Option<Option<PathBuf>>,

    /// Only summarise raffles that ended at or after this RFC 3339 time
    #[arg(long)]
    after: Option<DateTime<Utc>>,

    /// Only summarise raffles that ended at or before this RFC 3339 time
    #[arg(long)]
    before: Option<DateTime<Utc>>,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

pub fn run() {
    init_logging();

    let cli = Cli::parse();
    if let Err(error) = run_cli(&cli) {
        tracing::error!("{error}");
        std::process::exit(1);
    }
}

fn run_cli(cli: &Cli) -> Result<(), String> {
    let settings = load_settings(cli.settings.as_deref())?;
    let reconstruction = read_raffle_log(&cli.log_file, &settings)?;

    if cli.after.is_some() || cli.before.is_some() {
        let after = cli.after.unwrap_or(DateTime::<Utc>::MIN_UTC);
        let selected = reconstruction.raffles_between(after, cli.before);
        tracing::info!(
            selected_count = selected.len(),
            sniped_count = selected
                .iter()
                .filter(|raffle| raffle.outcome.as_ref().is_some_and(|outcome| outcome.was_sniped))
                .count(),
            "Raffles in the requested window"
        );
    }

    let report = RaffleReport::build(&cli.log_file, &reconstruction);
    tracing::info!(
        raffles_with_winner = report.raffles_with_winner,
        raffles_sniped = report.raffles_sniped,
        raffles_incomplete = report.raffles_incomplete,
        coins_awarded = report.coins_awarded,
        "Raffle summary"
    );

    if let Some(report_path) = cli.report.as_ref() {
        let report_path = report_path
            .clone()
            .unwrap_or_else(|| report_sidecar_path(&cli.log_file));
        write_raffle_report(&report_path, &report)?;
        tracing::info!(report_path = %report_path.display(), "Wrote raffle report");
    }

    Ok(())
}

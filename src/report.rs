use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::player::Player;
use crate::raffle_log::Reconstruction;
use crate::streaks::max_win_streaks;

pub(crate) const RAFFLE_REPORT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerReportRow {
    pub name: String,
    pub raffles_total: usize,
    pub raffles_joined: u32,
    pub raffles_won: u32,
    pub raffles_lost: u32,
    pub raffles_won_expected: f64,
    pub coins_won: u64,
    pub coins_expected: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub win_luck: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coin_luck: Option<f64>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub max_win_streak: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaffleReport {
    pub schema_version: u32,
    pub log_file: String,
    pub raffles_total: usize,
    pub raffles_ended: usize,
    pub raffles_with_winner: usize,
    pub raffles_sniped: usize,
    pub raffles_incomplete: usize,
    pub coins_awarded: u64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub raffles_by_variety: BTreeMap<String, u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub players: Vec<PlayerReportRow>,
    pub generated_at_unix: u64,
}

fn is_zero(value: &u32) -> bool {
    *value == 0
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

impl PlayerReportRow {
    fn from_player(player: &Player, max_win_streak: u32) -> Self {
        Self {
            name: player.name.clone(),
            raffles_total: player.raffles_total(),
            raffles_joined: player.raffles_joined,
            raffles_won: player.raffles_won,
            raffles_lost: player.raffles_lost,
            raffles_won_expected: player.raffles_won_expected,
            coins_won: player.coins_won,
            coins_expected: player.coins_expected,
            win_luck: finite(player.win_luck()),
            coin_luck: finite(player.coin_luck()),
            max_win_streak,
        }
    }
}

impl RaffleReport {
    pub fn build(log_path: &Path, reconstruction: &Reconstruction) -> Self {
        let log_file = log_path
            .file_name()
            .map(|value| value.to_string_lossy().to_string())
            .unwrap_or_else(|| log_path.to_string_lossy().to_string());

        let generated_at_unix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|duration| duration.as_secs())
            .unwrap_or(0);

        let raffles = &reconstruction.raffles;
        let outcomes = || raffles.iter().filter_map(|raffle| raffle.outcome.as_ref());

        let mut raffles_by_variety: BTreeMap<String, u64> = BTreeMap::new();
        for raffle in raffles {
            *raffles_by_variety
                .entry(raffle.variety.as_str().to_string())
                .or_insert(0) += 1;
        }

        let coins_awarded: u64 = raffles
            .iter()
            .filter(|raffle| {
                raffle
                    .outcome
                    .as_ref()
                    .is_some_and(|outcome| outcome.has_winner)
            })
            .map(|raffle| raffle.coins)
            .sum();

        let max_streaks = max_win_streaks(raffles);
        let players = reconstruction
            .players
            .values()
            .map(|player| {
                let max_win_streak = max_streaks.get(&player.name).copied().unwrap_or(0);
                PlayerReportRow::from_player(player, max_win_streak)
            })
            .collect();

        let raffles_ended = outcomes().count();

        Self {
            schema_version: RAFFLE_REPORT_SCHEMA_VERSION,
            log_file,
            raffles_total: raffles.len(),
            raffles_ended,
            raffles_with_winner: outcomes().filter(|outcome| outcome.has_winner).count(),
            raffles_sniped: outcomes().filter(|outcome| outcome.was_sniped).count(),
            raffles_incomplete: raffles.len() - raffles_ended,
            coins_awarded,
            raffles_by_variety,
            players,
            generated_at_unix,
        }
    }
}

pub fn report_sidecar_path(log_path: &Path) -> PathBuf {
    log_path.with_extension("report.json")
}

pub fn read_raffle_report(report_path: &Path) -> Result<Option<RaffleReport>, String> {
    let raw_json = match std::fs::read_to_string(report_path) {
        Ok(content) => content,
        Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
        Err(error) => {
            return Err(format!(
                "Failed to read raffle report '{}': {error}",
                report_path.display()
            ));
        }
    };

    let report = serde_json::from_str::<RaffleReport>(&raw_json).map_err(|error| {
        format!(
            "Failed to parse raffle report '{}': {error}",
            report_path.display()
        )
    })?;

    Ok(Some(report))
}

pub fn write_raffle_report(report_path: &Path, report: &RaffleReport) -> Result<(), String> {
    if let Some(parent_directory) = report_path.parent() {
        if !parent_directory.as_os_str().is_empty() {
            std::fs::create_dir_all(parent_directory).map_err(|error| {
                format!(
                    "Failed to create raffle report directory '{}': {error}",
                    parent_directory.display()
                )
            })?;
        }
    }

    let temp_path = temporary_report_path(report_path);
    let serialized = serde_json::to_string_pretty(report)
        .map_err(|error| format!("Failed to serialize raffle report: {error}"))?;

    std::fs::write(&temp_path, serialized).map_err(|error| {
        format!(
            "Failed to write temporary raffle report '{}': {error}",
            temp_path.display()
        )
    })?;

    if let Err(error) = std::fs::rename(&temp_path, report_path) {
        let cleanup_error = std::fs::remove_file(&temp_path).err();
        if let Some(cleanup_error) = cleanup_error {
            return Err(format!(
                "Failed to finalize raffle report '{}': {error}; temporary cleanup failed '{}': {cleanup_error}",
                report_path.display(),
                temp_path.display()
            ));
        }

        return Err(format!(
            "Failed to finalize raffle report '{}': {error}",
            report_path.display()
        ));
    }

    Ok(())
}

fn temporary_report_path(report_path: &Path) -> PathBuf {
    let Some(file_name) = report_path.file_name().and_then(|value| value.to_str()) else {
        return report_path.with_extension("report.json.tmp");
    };

    report_path.with_file_name(format!("{file_name}.tmp"))
}

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::Path;

const DEFAULT_LATE_ENTRY_WINDOW_MS: i64 = 1_000;
const DEFAULT_SNIPING_WINDOW_MS: i64 = 5_000;
const DEFAULT_MAX_WINNER_NAME_LENGTH: usize = 10;

/// Tuning knobs for reconstruction. The windows come from observed log
/// jitter, not from the bot's protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReconstructionSettings {
    pub late_entry_window_ms: i64,
    pub sniping_window_ms: i64,
    pub max_winner_name_length: usize,
}

impl Default for ReconstructionSettings {
    fn default() -> Self {
        Self {
            late_entry_window_ms: DEFAULT_LATE_ENTRY_WINDOW_MS,
            sniping_window_ms: DEFAULT_SNIPING_WINDOW_MS,
            max_winner_name_length: DEFAULT_MAX_WINNER_NAME_LENGTH,
        }
    }
}

impl ReconstructionSettings {
    pub fn late_entry_window(&self) -> Duration {
        Duration::milliseconds(self.late_entry_window_ms)
    }

    pub fn sniping_window(&self) -> Duration {
        Duration::milliseconds(self.sniping_window_ms)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.late_entry_window_ms <= 0 {
            return Err(format!(
                "lateEntryWindowMs must be positive, got {}",
                self.late_entry_window_ms
            ));
        }

        if self.sniping_window_ms <= 0 {
            return Err(format!(
                "snipingWindowMs must be positive, got {}",
                self.sniping_window_ms
            ));
        }

        if self.max_winner_name_length == 0 {
            return Err("maxWinnerNameLength must be at least 1".to_string());
        }

        Ok(())
    }
}

pub fn load_settings(path: Option<&Path>) -> Result<ReconstructionSettings, String> {
    let Some(path) = path else {
        return Ok(ReconstructionSettings::default());
    };

    let raw_json = std::fs::read_to_string(path)
        .map_err(|error| format!("Failed to read settings '{}': {error}", path.display()))?;
    let settings = serde_json::from_str::<ReconstructionSettings>(&raw_json)
        .map_err(|error| format!("Failed to parse settings '{}': {error}", path.display()))?;

    settings
        .validate()
        .map_err(|error| format!("Invalid settings '{}': {error}", path.display()))?;

    Ok(settings)
}

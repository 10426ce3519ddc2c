use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::Instant;

use crate::error::ReconstructError;
use crate::message::{is_ignored_line, parse_line, Message};
use crate::player::{aggregate_players, Player};
use crate::raffle::{assemble_raffles, Raffle};
use crate::settings::ReconstructionSettings;

#[derive(Debug, Clone)]
pub struct Reconstruction {
    pub raffles: Vec<Raffle>,
    pub players: BTreeMap<String, Player>,
}

impl Reconstruction {
    /// Ended raffles whose end time is at or after `after` and, when given,
    /// at or before `before`.
    pub fn raffles_between(
        &self,
        after: DateTime<Utc>,
        before: Option<DateTime<Utc>>,
    ) -> Vec<&Raffle> {
        raffles_between(&self.raffles, after, before)
    }
}

pub fn raffles_between(
    raffles: &[Raffle],
    after: DateTime<Utc>,
    before: Option<DateTime<Utc>>,
) -> Vec<&Raffle> {
    raffles
        .iter()
        .filter(|raffle| {
            raffle.end_time().is_some_and(|end_time| {
                end_time >= after && before.map_or(true, |before| end_time <= before)
            })
        })
        .collect()
}

/// Classifies every meaningful line. Line numbers in errors count blank and
/// comment lines.
pub fn classify_lines<I>(lines: I) -> Result<Vec<Message>, ReconstructError>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut messages: Vec<Message> = Vec::new();

    for (index, line) in lines.into_iter().enumerate() {
        let line = line.as_ref();
        if is_ignored_line(line) {
            continue;
        }

        let message =
            parse_line(line, messages.last()).map_err(|source| ReconstructError::Format {
                line_number: index as u64 + 1,
                line: line.to_string(),
                source,
            })?;
        messages.push(message);
    }

    Ok(messages)
}

pub fn reconstruct<I>(
    lines: I,
    settings: &ReconstructionSettings,
) -> Result<Reconstruction, ReconstructError>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let messages = classify_lines(lines)?;
    let raffles = assemble_raffles(&messages, *settings)?;
    let players = aggregate_players(&raffles)?;

    Ok(Reconstruction { raffles, players })
}

pub fn read_raffle_log(
    log_path: &Path,
    settings: &ReconstructionSettings,
) -> Result<Reconstruction, String> {
    if !log_path.is_file() {
        return Err(format!("Raffle log file not found: {}", log_path.display()));
    }

    let started = Instant::now();
    let file = File::open(log_path).map_err(|error| {
        format!("Failed to open raffle log '{}': {error}", log_path.display())
    })?;
    let lines = BufReader::new(file)
        .lines()
        .collect::<Result<Vec<String>, _>>()
        .map_err(|error| {
            format!("Failed to read raffle log '{}': {error}", log_path.display())
        })?;

    let reconstruction = reconstruct(&lines, settings).map_err(|error| {
        format!(
            "Failed to reconstruct raffles from '{}': {error}",
            log_path.display()
        )
    })?;

    tracing::info!(
        log_path = %log_path.display(),
        total_lines = lines.len(),
        raffle_count = reconstruction.raffles.len(),
        player_count = reconstruction.players.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Reconstructed raffle log"
    );

    Ok(reconstruction)
}

#[cfg(test)]
mod tests {
    use super::{classify_lines, read_raffle_log, reconstruct};
    use crate::message::RaffleVariety;
    use crate::settings::ReconstructionSettings;
    use chrono::{TimeZone, Utc};
    use std::time::{SystemTime, UNIX_EPOCH};

    const SINGLE_RAFFLE: [&str; 3] = [
        "2024-01-01T00:00:00 500 raffle starting!",
        "2024-01-01T00:00:05 @Alice: OK",
        "2024-01-01T00:00:10 RAFFLE OVER: Congratulations to Alice for winning 500 coins! waffle starting!",
    ];

    fn unique_temp_directory() -> std::path::PathBuf {
        let timestamp_nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|duration| duration.as_nanos())
            .unwrap_or(0);
        let process_id = std::process::id();
        std::env::temp_dir().join(format!(
            "raffle_log_reader_test_{process_id}_{timestamp_nanos}"
        ))
    }

    #[test]
    fn reconstructs_single_sniped_raffle() {
        let reconstruction = reconstruct(SINGLE_RAFFLE, &ReconstructionSettings::default())
            .expect("Expected reconstruction to succeed");

        assert_eq!(reconstruction.raffles.len(), 1);
        let raffle = &reconstruction.raffles[0];
        assert_eq!(raffle.coins, 500);
        assert_eq!(raffle.variety, RaffleVariety::Raffle);

        let outcome = raffle.outcome.as_ref().expect("Expected raffle to be ended");
        assert_eq!(outcome.number_of_players_joined, 1);
        assert_eq!(outcome.winner_name, "Alice");
        assert!(outcome.was_sniped);
        assert_eq!(outcome.next_variety, Some(RaffleVariety::Waffle));

        let alice = &reconstruction.players["Alice"];
        assert_eq!(alice.raffles_won, 1);
        assert_eq!(alice.raffles_joined, 1);
        assert_eq!(alice.coins_won, 500);
    }

    #[test]
    fn late_entry_in_the_closing_second_is_merged() {
        let mut lines = SINGLE_RAFFLE.to_vec();
        lines.push("2024-01-01T00:00:10 @Bob: OK");

        let reconstruction = reconstruct(&lines, &ReconstructionSettings::default()).unwrap();

        let outcome = reconstruction.raffles[0].outcome.as_ref().unwrap();
        assert_eq!(outcome.number_of_players_joined, 2);
        assert_eq!(reconstruction.players["Bob"].raffles_lost, 1);
    }

    #[test]
    fn late_entry_two_seconds_after_end_fails_the_run() {
        let mut lines = SINGLE_RAFFLE.to_vec();
        lines.push("2024-01-01T00:00:12 @Bob: OK");

        let error = reconstruct(&lines, &ReconstructionSettings::default()).unwrap_err();
        assert!(error.is_state_error());
    }

    #[test]
    fn unknown_reward_reports_its_line_number() {
        let lines = [
            "# raffle bot export",
            "",
            "2024-01-01T00:00:00 500 coins and a Golden Goose raffle starting!",
        ];

        let error = classify_lines(lines).unwrap_err();
        assert!(error.is_format_error());
        assert_eq!(
            error.to_string(),
            "line 3: unknown additional reward in \"500 coins and a Golden Goose raffle starting!\""
        );
    }

    #[test]
    fn comments_do_not_break_fact_continuations() {
        let mut lines = SINGLE_RAFFLE.to_vec();
        lines.push("2024-01-01T00:00:11 Warzone Fact: Raffles started in 2019,");
        lines.push("# noise");
        lines.push("   ");
        lines.push("2024-01-01T00:00:11 long before waffles.");

        let reconstruction = reconstruct(&lines, &ReconstructionSettings::default()).unwrap();

        assert_eq!(
            reconstruction.raffles[0].fact.as_deref(),
            Some("Raffles started in 2019, long before waffles.")
        );
    }

    #[test]
    fn filters_raffles_by_end_time() {
        let mut lines = SINGLE_RAFFLE.to_vec();
        lines.push("2024-01-01T01:00:00 200 waffle starting!");
        lines.push("2024-01-01T01:00:30 RAFFLE OVER: Nobody entered the waffle! Next is a raffle!");
        lines.push("2024-01-01T02:00:00 300 raffle starting!");

        let reconstruction = reconstruct(&lines, &ReconstructionSettings::default()).unwrap();
        assert_eq!(reconstruction.raffles.len(), 3);

        let after = Utc.with_ymd_and_hms(2024, 1, 1, 0, 30, 0).unwrap();
        let later = reconstruction.raffles_between(after, None);
        assert_eq!(later.len(), 1);
        assert_eq!(later[0].coins, 200);

        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let early = reconstruction.raffles_between(start, Some(after));
        assert_eq!(early.len(), 1);
        assert_eq!(early[0].coins, 500);
    }

    #[test]
    fn reads_log_files_from_disk() {
        let temp_directory = unique_temp_directory();
        std::fs::create_dir_all(&temp_directory)
            .expect("Failed to create temporary raffle log test directory");
        let log_path = temp_directory.join("RaffleBot chat log.txt");
        std::fs::write(&log_path, SINGLE_RAFFLE.join("\n"))
            .expect("Failed to write test raffle log");

        let reconstruction = read_raffle_log(&log_path, &ReconstructionSettings::default())
            .expect("Expected raffle log to load");
        assert_eq!(reconstruction.raffles.len(), 1);

        let missing = read_raffle_log(
            &temp_directory.join("missing.txt"),
            &ReconstructionSettings::default(),
        )
        .unwrap_err();
        assert!(missing.starts_with("Raffle log file not found"));

        std::fs::remove_dir_all(&temp_directory)
            .expect("Failed to remove temporary raffle log test directory");
    }
}

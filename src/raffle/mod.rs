mod assembler;

use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;

use crate::error::StateError;
use crate::message::{
    AdditionalReward, EndMessage, EntryMessage, FactExtensionMessage, FactMessage, RaffleVariety,
    StartMessage,
};
use crate::settings::ReconstructionSettings;

pub use assembler::{assemble_raffles, RaffleAssembler};

/// One raffle from its start announcement on. `outcome` is filled in once
/// the end announcement has been applied.
#[derive(Debug, Clone, PartialEq)]
pub struct Raffle {
    pub coins: u64,
    pub additional_reward: AdditionalReward,
    pub variety: RaffleVariety,
    pub start_time: DateTime<Utc>,
    pub entries: Vec<EntryMessage>,
    pub outcome: Option<RaffleOutcome>,
    pub fact: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RaffleOutcome {
    pub has_winner: bool,
    /// Truncated the way the bot elides long names.
    pub winner_name: String,
    /// Full name of the joined player the truncated winner name resolves to.
    pub winner_player: Option<String>,
    pub end_time: DateTime<Utc>,
    pub next_variety: Option<RaffleVariety>,
    pub duration: Duration,
    pub player_names: Vec<String>,
    pub number_of_players: usize,
    pub number_of_players_joined: usize,
    pub number_of_players_failed: usize,
    /// Infinite when nobody joined successfully.
    pub win_chance_per_joined_player: f64,
    pub was_sniped: bool,
}

impl Raffle {
    pub fn from_start(start: &StartMessage) -> Self {
        Self {
            coins: start.coin_price,
            additional_reward: start.additional_reward,
            variety: start.variety,
            start_time: start.timestamp,
            entries: Vec::new(),
            outcome: None,
            fact: None,
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.outcome.as_ref().map(|outcome| outcome.end_time)
    }

    /// Each player's first entry, in order of first appearance. Later
    /// attempts by the same player are ignored.
    pub fn relevant_entries(&self) -> Vec<&EntryMessage> {
        let mut seen: HashSet<&str> = HashSet::new();
        self.entries
            .iter()
            .filter(|entry| seen.insert(entry.player_name.as_str()))
            .collect()
    }

    pub fn entry_for(&self, player_name: &str) -> Option<&EntryMessage> {
        self.relevant_entries()
            .into_iter()
            .find(|entry| entry.player_name == player_name)
    }

    /// Appends an entry. Once finalized, only entries within the late-entry
    /// window of the end time are accepted; they refresh the derived fields.
    /// Returns whether the entry was a late repair.
    pub fn add_entry(
        &mut self,
        entry: &EntryMessage,
        settings: &ReconstructionSettings,
    ) -> Result<bool, StateError> {
        let Some(end_time) = self.end_time() else {
            self.entries.push(entry.clone());
            return Ok(false);
        };

        let gap = (entry.timestamp - end_time).abs();
        if gap > settings.late_entry_window() {
            return Err(StateError::new(
                format!(
                    "entry arrived {}ms after its raffle ended",
                    gap.num_milliseconds()
                ),
                entry.timestamp,
                &entry.text,
            ));
        }

        self.entries.push(entry.clone());
        self.refresh_outcome(settings);
        Ok(true)
    }

    pub fn finalize(
        &mut self,
        end: &EndMessage,
        settings: &ReconstructionSettings,
    ) -> Result<(), StateError> {
        if self.is_finalized() {
            return Err(StateError::new(
                "raffle has already ended",
                end.timestamp,
                &end.text,
            ));
        }

        if end.has_winner && self.coins != end.coins {
            return Err(StateError::new(
                format!(
                    "raffle is worth {} coins but ended with {} coins",
                    self.coins, end.coins
                ),
                end.timestamp,
                &end.text,
            ));
        }

        self.outcome = Some(RaffleOutcome {
            has_winner: end.has_winner,
            winner_name: truncate_name(&end.winner_name, settings.max_winner_name_length),
            winner_player: None,
            end_time: end.timestamp,
            next_variety: end.next_variety,
            duration: end.timestamp - self.start_time,
            player_names: Vec::new(),
            number_of_players: 0,
            number_of_players_joined: 0,
            number_of_players_failed: 0,
            win_chance_per_joined_player: f64::INFINITY,
            was_sniped: false,
        });
        self.refresh_outcome(settings);

        Ok(())
    }

    pub fn attach_fact(&mut self, fact: &FactMessage) -> Result<(), StateError> {
        if !self.is_finalized() {
            return Err(StateError::new(
                "fact arrived before the raffle ended",
                fact.timestamp,
                &fact.text,
            ));
        }

        self.fact = Some(fact.fact.clone());
        Ok(())
    }

    pub fn extend_fact(&mut self, extension: &FactExtensionMessage) -> Result<(), StateError> {
        if !self.is_finalized() {
            return Err(StateError::new(
                "fact extension arrived before the raffle ended",
                extension.timestamp,
                &extension.text,
            ));
        }

        if self.fact.is_none() {
            return Err(StateError::new(
                "fact extension for a raffle without a fact",
                extension.timestamp,
                &extension.text,
            ));
        }

        self.fact = Some(extension.full_fact());
        Ok(())
    }

    fn refresh_outcome(&mut self, settings: &ReconstructionSettings) {
        let relevant = self.relevant_entries();
        let player_names: Vec<String> = relevant
            .iter()
            .map(|entry| entry.player_name.clone())
            .collect();
        let number_of_players = relevant.len();
        let number_of_players_joined = relevant.iter().filter(|entry| entry.success).count();

        let Some(outcome) = self.outcome.as_ref() else {
            return;
        };

        let winner_player = outcome
            .has_winner
            .then(|| resolve_winner(&relevant, &outcome.winner_name, settings))
            .flatten();
        let sniping_window = settings.sniping_window();
        let was_sniped = outcome.has_winner
            && relevant
                .iter()
                .all(|entry| outcome.end_time - entry.timestamp <= sniping_window);

        let Some(outcome) = self.outcome.as_mut() else {
            return;
        };
        outcome.winner_player = winner_player;
        outcome.was_sniped = was_sniped;
        outcome.player_names = player_names;
        outcome.number_of_players = number_of_players;
        outcome.number_of_players_joined = number_of_players_joined;
        outcome.number_of_players_failed = number_of_players - number_of_players_joined;
        outcome.win_chance_per_joined_player = 1.0 / number_of_players_joined as f64;
    }
}

fn resolve_winner(
    relevant: &[&EntryMessage],
    winner_name: &str,
    settings: &ReconstructionSettings,
) -> Option<String> {
    let joined = || relevant.iter().filter(|entry| entry.success);

    if let Some(entry) = joined().find(|entry| entry.player_name == winner_name) {
        return Some(entry.player_name.clone());
    }

    joined()
        .find(|entry| {
            truncate_name(&entry.player_name, settings.max_winner_name_length) == winner_name
        })
        .map(|entry| entry.player_name.clone())
}

pub(crate) fn truncate_name(name: &str, max_length: usize) -> String {
    name.chars().take(max_length).collect()
}

use std::collections::BTreeMap;

use crate::error::StateError;
use crate::raffle::Raffle;

/// Running statistics for one player name, built from ended raffles.
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub name: String,
    /// Indices into the ordered raffle list.
    pub raffles: Vec<usize>,
    pub raffles_joined: u32,
    pub raffles_won: u32,
    pub raffles_lost: u32,
    pub raffles_won_expected: f64,
    pub coins_won: u64,
    pub coins_expected: f64,
}

impl Player {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            raffles: Vec::new(),
            raffles_joined: 0,
            raffles_won: 0,
            raffles_lost: 0,
            raffles_won_expected: 0.0,
            coins_won: 0,
            coins_expected: 0.0,
        }
    }

    pub fn raffles_total(&self) -> usize {
        self.raffles.len()
    }

    pub fn win_luck(&self) -> f64 {
        f64::from(self.raffles_won) / self.raffles_won_expected
    }

    pub fn coin_luck(&self) -> f64 {
        self.coins_won as f64 / self.coins_expected
    }

    pub fn luck(&self) -> f64 {
        self.win_luck() - 1.0
    }

    fn record_raffle(&mut self, raffle_index: usize, raffle: &Raffle) -> Result<(), StateError> {
        let Some(outcome) = raffle.outcome.as_ref() else {
            return Err(StateError::new(
                "player statistics require an ended raffle",
                raffle.start_time,
                &self.name,
            ));
        };
        let Some(entry) = raffle.entry_for(&self.name) else {
            return Err(StateError::new(
                format!("player {} has no entry in this raffle", self.name),
                outcome.end_time,
                &self.name,
            ));
        };
        let success = entry.success;

        self.raffles.push(raffle_index);
        if !success {
            return Ok(());
        }

        let win_chance = outcome.win_chance_per_joined_player;
        self.raffles_joined += 1;
        self.raffles_won_expected += win_chance;
        self.coins_expected += raffle.coins as f64 * win_chance;

        if outcome.winner_player.as_deref() == Some(self.name.as_str()) {
            self.raffles_won += 1;
            self.coins_won += raffle.coins;
        } else {
            self.raffles_lost += 1;
        }

        Ok(())
    }
}

/// Per-run player registry, keyed by name.
#[derive(Debug, Default)]
pub struct PlayerAggregator {
    players: BTreeMap<String, Player>,
}

impl PlayerAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one raffle into every player who tried to enter it. Raffles
    /// that never ended are skipped.
    pub fn record(&mut self, raffle_index: usize, raffle: &Raffle) -> Result<(), StateError> {
        let Some(outcome) = raffle.outcome.as_ref() else {
            return Ok(());
        };

        for player_name in &outcome.player_names {
            self.players
                .entry(player_name.clone())
                .or_insert_with(|| Player::new(player_name))
                .record_raffle(raffle_index, raffle)?;
        }

        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Player> {
        self.players.get(name)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn into_players(self) -> BTreeMap<String, Player> {
        self.players
    }
}

pub fn aggregate_players(raffles: &[Raffle]) -> Result<BTreeMap<String, Player>, StateError> {
    let mut aggregator = PlayerAggregator::new();
    for (raffle_index, raffle) in raffles.iter().enumerate() {
        aggregator.record(raffle_index, raffle)?;
    }

    Ok(aggregator.into_players())
}

use std::collections::BTreeMap;

use crate::raffle::Raffle;

fn winner_of(raffle: &Raffle) -> Option<&str> {
    let outcome = raffle.outcome.as_ref()?;
    if !outcome.has_winner {
        return None;
    }

    Some(
        outcome
            .winner_player
            .as_deref()
            .unwrap_or(outcome.winner_name.as_str()),
    )
}

/// Consecutive-win count of each raffle's winner at that raffle, aligned
/// with `raffles`. Raffles without a winner read 0 and do not break a
/// streak.
pub fn winner_streaks(raffles: &[Raffle]) -> Vec<u32> {
    let mut streaks = Vec::with_capacity(raffles.len());
    let mut last_winner: Option<&str> = None;
    let mut current_streak = 0_u32;

    for raffle in raffles {
        let Some(winner) = winner_of(raffle) else {
            streaks.push(0);
            continue;
        };

        if last_winner == Some(winner) {
            current_streak += 1;
        } else {
            current_streak = 1;
        }

        streaks.push(current_streak);
        last_winner = Some(winner);
    }

    streaks
}

/// Longest run of consecutive won raffles per winner.
pub fn max_win_streaks(raffles: &[Raffle]) -> BTreeMap<String, u32> {
    let mut max_streaks: BTreeMap<String, u32> = BTreeMap::new();

    for (raffle, streak) in raffles.iter().zip(winner_streaks(raffles)) {
        let Some(winner) = winner_of(raffle) else {
            continue;
        };

        let best = max_streaks.entry(winner.to_string()).or_insert(0);
        *best = (*best).max(streak);
    }

    max_streaks
}

use chrono::{DateTime, Utc};

use super::{
    AdditionalReward, EndMessage, EntryMessage, FactExtensionMessage, FactMessage, RaffleVariety,
    StartMessage, RAFFLE_ENTRY_INDICATOR, RAFFLE_FACT_INDICATOR,
};
use crate::error::FormatError;

const ADDITIONAL_REWARD_MARKER: &str = "and a ";
const START_SUFFIX: &str = " starting!";
const NEXT_VARIETY_SUFFIX: &str = " starting";
const FAILED_RAFFLE_PREFIX: &str = "RAFFLE OVER: Nobody entered the ";
const WINNER_PREFIX: &str = "RAFFLE OVER: Congratulations to ";
const WINNER_COINS_MARKER: &str = " for winning ";
const WINNER_COINS_SUFFIX: &str = " coins";
const SUCCESSFUL_ENTRY_TOKEN: &str = "OK";

pub fn decode_start(timestamp: DateTime<Utc>, text: &str) -> Result<StartMessage, FormatError> {
    let coin_token = text.split(' ').next().unwrap_or_default();
    let coin_price = coin_token
        .parse::<u64>()
        .map_err(|_| FormatError::new("missing leading coin price", text))?;

    let additional_reward = decode_additional_reward(text)?;

    let body = text
        .strip_suffix(START_SUFFIX)
        .ok_or_else(|| FormatError::new("missing raffle start suffix", text))?;
    let variety = decode_last_word_variety(body)
        .ok_or_else(|| FormatError::new("unknown raffle variety", text))?;

    Ok(StartMessage {
        timestamp,
        text: text.to_string(),
        coin_price,
        additional_reward,
        variety,
    })
}

pub fn decode_entry(timestamp: DateTime<Utc>, text: &str) -> Result<EntryMessage, FormatError> {
    let Some(body) = text.strip_prefix(RAFFLE_ENTRY_INDICATOR) else {
        return Err(FormatError::new("missing entry indicator", text));
    };
    let Some(colon_index) = body.rfind(':') else {
        return Err(FormatError::new("entry has no status separator", text));
    };

    let player_name = &body[..colon_index];
    if player_name.is_empty() {
        return Err(FormatError::new("entry has an empty player name", text));
    }

    let success = body
        .get(colon_index + 2..)
        .map(|status| status.starts_with(SUCCESSFUL_ENTRY_TOKEN))
        .unwrap_or(false);

    Ok(EntryMessage {
        timestamp,
        text: text.to_string(),
        player_name: player_name.to_string(),
        success,
    })
}

pub fn decode_end(timestamp: DateTime<Utc>, text: &str) -> Result<EndMessage, FormatError> {
    if text.starts_with(FAILED_RAFFLE_PREFIX) {
        return Ok(EndMessage {
            timestamp,
            text: text.to_string(),
            has_winner: false,
            winner_name: String::new(),
            coins: 0,
            additional_reward: decode_additional_reward(text)?,
            next_variety: decode_next_variety(text),
        });
    }

    let (winner_name, coins) = match_winner_and_coins(text)
        .ok_or_else(|| FormatError::new("unrecognised raffle end", text))?;
    let additional_reward = decode_additional_reward(text)?;
    let next_variety = decode_next_variety(text)
        .ok_or_else(|| FormatError::new("unknown next raffle variety", text))?;

    Ok(EndMessage {
        timestamp,
        text: text.to_string(),
        has_winner: true,
        winner_name,
        coins,
        additional_reward,
        next_variety: Some(next_variety),
    })
}

pub fn decode_fact(timestamp: DateTime<Utc>, text: &str) -> Result<FactMessage, FormatError> {
    let fact = text
        .strip_prefix(RAFFLE_FACT_INDICATOR)
        .ok_or_else(|| FormatError::new("missing fact indicator", text))?;

    Ok(FactMessage {
        timestamp,
        text: text.to_string(),
        fact: fact.trim_start().to_string(),
    })
}

pub fn decode_fact_extension(
    timestamp: DateTime<Utc>,
    text: &str,
    fact_message: &FactMessage,
) -> FactExtensionMessage {
    FactExtensionMessage {
        timestamp,
        text: text.to_string(),
        original_fact: fact_message.fact.clone(),
    }
}

/// `None` when the text never says "and a "; an unknown phrase after it is
/// an error.
pub fn decode_additional_reward(text: &str) -> Result<AdditionalReward, FormatError> {
    let Some(marker_index) = text.find(ADDITIONAL_REWARD_MARKER) else {
        return Ok(AdditionalReward::None);
    };
    let announced = &text[marker_index + ADDITIONAL_REWARD_MARKER.len()..];

    AdditionalReward::ANNOUNCED
        .into_iter()
        .find(|reward| {
            reward
                .phrase()
                .is_some_and(|phrase| announced.starts_with(phrase))
        })
        .ok_or_else(|| FormatError::new("unknown additional reward", text))
}

/// Reads the variety named after the last `!` of an end message. A closing
/// `!` is skipped, so both "...! Next is a waffle!" and "...! waffle
/// starting!" resolve to the waffle.
pub fn decode_next_variety(text: &str) -> Option<RaffleVariety> {
    let body = text.strip_suffix('!').unwrap_or(text);
    let segment = match body.rfind('!') {
        Some(index) => &body[index + 1..],
        None => body,
    };
    let segment = segment.trim();
    let segment = segment.strip_suffix(NEXT_VARIETY_SUFFIX).unwrap_or(segment);

    decode_last_word_variety(segment)
}

fn decode_last_word_variety(text: &str) -> Option<RaffleVariety> {
    let word = text.rsplit(' ').next()?;
    RaffleVariety::from_word(word.trim_matches(|character: char| !character.is_alphabetic()))
}

// Greedy on the name: the last " for winning <digits> coins" wins.
fn match_winner_and_coins(text: &str) -> Option<(String, u64)> {
    let rest = text.strip_prefix(WINNER_PREFIX)?;

    rest.rmatch_indices(WINNER_COINS_MARKER)
        .filter(|(index, _)| *index > 0)
        .find_map(|(index, _)| {
            let after_marker = &rest[index + WINNER_COINS_MARKER.len()..];
            let digit_count = after_marker
                .bytes()
                .take_while(|byte| byte.is_ascii_digit())
                .count();
            if digit_count == 0 || !after_marker[digit_count..].starts_with(WINNER_COINS_SUFFIX) {
                return None;
            }

            let coins = after_marker[..digit_count].parse::<u64>().ok()?;
            Some((rest[..index].to_string(), coins))
        })
}

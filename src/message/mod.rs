mod decode;

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::FormatError;

pub use decode::{decode_end, decode_entry, decode_fact, decode_fact_extension, decode_start};

pub const COMMENT_INDICATOR: char = '#';
pub const TIMESTAMP_LENGTH: usize = 19;

pub const RAFFLE_ENTRY_INDICATOR: &str = "@";
/// Every start names a raffle, waffle or wafaffle; ruthless starts read
/// "... ruthless raffle starting!".
pub const RAFFLE_START_INDICATOR: &str = "affle starting!";
pub const RAFFLE_END_INDICATOR: &str = "RAFFLE OVER:";
pub const RAFFLE_FACT_INDICATOR: &str = "Warzone Fact:";

const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// Secondary prize announced alongside the coin pot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AdditionalReward {
    None,
    FogBusterPower,
    FreeCachePower,
    InspireMercenariesPower,
    MarketRaidPower,
    PoorArtifact,
    SuperchargeArmyCampPower,
    SuperchargeMinePower,
    TimeWarpPower,
}

impl AdditionalReward {
    pub const ANNOUNCED: [AdditionalReward; 8] = [
        Self::FogBusterPower,
        Self::FreeCachePower,
        Self::InspireMercenariesPower,
        Self::MarketRaidPower,
        Self::PoorArtifact,
        Self::SuperchargeArmyCampPower,
        Self::SuperchargeMinePower,
        Self::TimeWarpPower,
    ];

    /// Phrase the bot prints after "and a ". `None` has no phrase.
    pub fn phrase(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::FogBusterPower => Some("Fog Buster"),
            Self::FreeCachePower => Some("Free Cache"),
            Self::InspireMercenariesPower => Some("Inspire Mercenaries"),
            Self::MarketRaidPower => Some("Market Raid"),
            Self::PoorArtifact => Some("poor artifact"),
            Self::SuperchargeArmyCampPower => Some("Supercharge Army Camp"),
            Self::SuperchargeMinePower => Some("Supercharge Mine"),
            Self::TimeWarpPower => Some("Time Warp"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RaffleVariety {
    Raffle,
    Waffle,
    Wafaffle,
    Ruthless,
}

impl RaffleVariety {
    pub const ALL: [RaffleVariety; 4] = [Self::Raffle, Self::Waffle, Self::Wafaffle, Self::Ruthless];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Raffle => "raffle",
            Self::Waffle => "waffle",
            Self::Wafaffle => "wafaffle",
            Self::Ruthless => "ruthless",
        }
    }

    pub fn from_word(word: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|variety| variety.as_str().eq_ignore_ascii_case(word))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StartMessage {
    pub timestamp: DateTime<Utc>,
    pub text: String,
    pub coin_price: u64,
    pub additional_reward: AdditionalReward,
    pub variety: RaffleVariety,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntryMessage {
    pub timestamp: DateTime<Utc>,
    pub text: String,
    pub player_name: String,
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EndMessage {
    pub timestamp: DateTime<Utc>,
    pub text: String,
    pub has_winner: bool,
    /// Empty when nobody entered.
    pub winner_name: String,
    pub coins: u64,
    pub additional_reward: AdditionalReward,
    pub next_variety: Option<RaffleVariety>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FactMessage {
    pub timestamp: DateTime<Utc>,
    pub text: String,
    pub fact: String,
}

/// Overflow of a fact that did not fit into a single chat message.
#[derive(Debug, Clone, PartialEq)]
pub struct FactExtensionMessage {
    pub timestamp: DateTime<Utc>,
    pub text: String,
    pub original_fact: String,
}

impl FactExtensionMessage {
    pub fn full_fact(&self) -> String {
        format!("{} {}", self.original_fact, self.text)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Start(StartMessage),
    Entry(EntryMessage),
    End(EndMessage),
    Fact(FactMessage),
    FactExtension(FactExtensionMessage),
}

impl Message {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::Start(message) => message.timestamp,
            Self::Entry(message) => message.timestamp,
            Self::End(message) => message.timestamp,
            Self::Fact(message) => message.timestamp,
            Self::FactExtension(message) => message.timestamp,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Start(message) => &message.text,
            Self::Entry(message) => &message.text,
            Self::End(message) => &message.text,
            Self::Fact(message) => &message.text,
            Self::FactExtension(message) => &message.text,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Start(_) => "start",
            Self::Entry(_) => "entry",
            Self::End(_) => "end",
            Self::Fact(_) => "fact",
            Self::FactExtension(_) => "factExtension",
        }
    }
}

/// Blank lines and `#` comments never reach the classifier.
pub fn is_ignored_line(line: &str) -> bool {
    line.trim().is_empty() || line.starts_with(COMMENT_INDICATOR)
}

/// Splits a raw log line into its UTC timestamp and the message remainder.
pub fn split_log_line(line: &str) -> Result<(DateTime<Utc>, &str), FormatError> {
    let Some(raw_timestamp) = line.get(..TIMESTAMP_LENGTH) else {
        return Err(FormatError::new("line is shorter than its timestamp prefix", line));
    };
    let timestamp = parse_timestamp(raw_timestamp)
        .ok_or_else(|| FormatError::new("malformed timestamp prefix", line))?;

    let rest = line.get(TIMESTAMP_LENGTH..).unwrap_or_default();
    let remainder = rest.strip_prefix(' ').unwrap_or(rest).trim_end();

    Ok((timestamp, remainder))
}

fn parse_timestamp(raw_timestamp: &str) -> Option<DateTime<Utc>> {
    TIMESTAMP_FORMATS.iter().find_map(|format| {
        NaiveDateTime::parse_from_str(raw_timestamp, format)
            .ok()
            .map(|value| value.and_utc())
    })
}

/// Classifies one raw log line. `previous` is the last message classified
/// from this log, used to recognise fact overflow lines.
pub fn parse_line(line: &str, previous: Option<&Message>) -> Result<Message, FormatError> {
    let (timestamp, remainder) = split_log_line(line)?;
    classify(timestamp, remainder, previous)
}

pub fn classify(
    timestamp: DateTime<Utc>,
    text: &str,
    previous: Option<&Message>,
) -> Result<Message, FormatError> {
    if text.starts_with(RAFFLE_ENTRY_INDICATOR) {
        return decode_entry(timestamp, text).map(Message::Entry);
    }

    // End messages can announce the next raffle with the start phrase.
    if text.ends_with(RAFFLE_START_INDICATOR) && !text.starts_with(RAFFLE_END_INDICATOR) {
        return decode_start(timestamp, text).map(Message::Start);
    }

    if text.starts_with(RAFFLE_END_INDICATOR) {
        return decode_end(timestamp, text).map(Message::End);
    }

    if text.starts_with(RAFFLE_FACT_INDICATOR) {
        return decode_fact(timestamp, text).map(Message::Fact);
    }

    if let Some(Message::Fact(fact_message)) = previous {
        return Ok(Message::FactExtension(decode_fact_extension(
            timestamp,
            text,
            fact_message,
        )));
    }

    Err(FormatError::new("cannot classify message", text))
}

#[cfg(test)]
mod tests {
    use super::{
        classify, is_ignored_line, parse_line, split_log_line, AdditionalReward, Message,
        RaffleVariety,
    };
    use chrono::{TimeZone, Utc};

    #[test]
    fn ignores_blank_and_comment_lines() {
        assert!(is_ignored_line(""));
        assert!(is_ignored_line("   \t"));
        assert!(is_ignored_line("# exported from the raffle bot"));
        assert!(!is_ignored_line("2024-01-01T00:00:00 @Alice: OK"));
    }

    #[test]
    fn splits_timestamp_prefix_as_utc() {
        let (timestamp, remainder) =
            split_log_line("2024-03-05T17:04:09 500 raffle starting!   ").expect("Expected split");

        assert_eq!(timestamp, Utc.with_ymd_and_hms(2024, 3, 5, 17, 4, 9).unwrap());
        assert_eq!(remainder, "500 raffle starting!");
    }

    #[test]
    fn accepts_space_separated_timestamps() {
        let (timestamp, _) =
            split_log_line("2024-03-05 17:04:09 @Alice: OK").expect("Expected split");
        assert_eq!(timestamp, Utc.with_ymd_and_hms(2024, 3, 5, 17, 4, 9).unwrap());
    }

    #[test]
    fn rejects_malformed_timestamps() {
        let error = split_log_line("2024-13-05T17:04:09 @Alice: OK").unwrap_err();
        assert_eq!(error.reason, "malformed timestamp prefix");

        let error = split_log_line("2024-03-05").unwrap_err();
        assert_eq!(error.reason, "line is shorter than its timestamp prefix");
    }

    #[test]
    fn entry_indicator_wins_over_start_suffix() {
        let message = parse_line("2024-01-01T00:00:00 @Waffle: raffle starting!", None)
            .expect("Expected entry message");

        let Message::Entry(entry) = message else {
            panic!("Expected entry, got {message:?}");
        };
        assert_eq!(entry.player_name, "Waffle");
        assert!(!entry.success);
    }

    #[test]
    fn classifies_every_message_shape() {
        let start = parse_line("2024-01-01T00:00:00 500 waffle starting!", None).unwrap();
        assert_eq!(start.kind(), "start");

        let end = parse_line(
            "2024-01-01T00:00:10 RAFFLE OVER: Nobody entered the waffle! Next is a raffle!",
            Some(&start),
        )
        .unwrap();
        assert_eq!(end.kind(), "end");

        let fact = parse_line(
            "2024-01-01T00:00:11 Warzone Fact: Mines produce more when supercharged,",
            Some(&end),
        )
        .unwrap();
        assert_eq!(fact.kind(), "fact");

        let extension =
            parse_line("2024-01-01T00:00:11 but only for a while.", Some(&fact)).unwrap();
        let Message::FactExtension(extension) = extension else {
            panic!("Expected fact extension");
        };
        assert_eq!(
            extension.full_fact(),
            "Mines produce more when supercharged, but only for a while."
        );
    }

    #[test]
    fn unknown_text_without_preceding_fact_is_a_format_error() {
        let timestamp = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let entry = classify(timestamp, "@Alice: OK", None).unwrap();

        let error = classify(timestamp, "hello there", Some(&entry)).unwrap_err();
        assert_eq!(error.reason, "cannot classify message");
        assert_eq!(error.text, "hello there");

        assert!(classify(timestamp, "hello there", None).is_err());
    }

    #[test]
    fn reward_phrases_and_variety_words_survive_template_roundtrip() {
        let timestamp = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        for reward in AdditionalReward::ANNOUNCED {
            let phrase = reward.phrase().expect("Announced rewards have a phrase");
            let text = format!("750 coins and a {phrase} wafaffle starting!");

            let Message::Start(start) = classify(timestamp, &text, None).unwrap() else {
                panic!("Expected start message for {text}");
            };
            assert_eq!(start.additional_reward, reward);
            assert_eq!(
                format!("750 coins and a {} {} starting!", phrase, start.variety.as_str()),
                text
            );
        }

        for variety in RaffleVariety::ALL {
            let text = format!(
                "RAFFLE OVER: Congratulations to Alice for winning 20 coins! Next is a {}!",
                variety.as_str()
            );

            let Message::End(end) = classify(timestamp, &text, None).unwrap() else {
                panic!("Expected end message for {text}");
            };
            assert_eq!(end.next_variety, Some(variety));
            assert_eq!(
                format!(
                    "RAFFLE OVER: Congratulations to {} for winning {} coins! Next is a {}!",
                    end.winner_name,
                    end.coins,
                    end.next_variety.map(RaffleVariety::as_str).unwrap_or_default()
                ),
                text
            );
        }

        for reward in AdditionalReward::ANNOUNCED {
            let phrase = reward.phrase().expect("Announced rewards have a phrase");
            let text = format!(
                "RAFFLE OVER: Congratulations to Alice for winning 20 coins and a {phrase}! Next is a waffle!"
            );

            let Message::End(end) = classify(timestamp, &text, None).unwrap() else {
                panic!("Expected end message for {text}");
            };
            assert_eq!(end.additional_reward, reward);
            assert_eq!(
                format!(
                    "RAFFLE OVER: Congratulations to Alice for winning 20 coins and a {}! Next is a {}!",
                    end.additional_reward.phrase().unwrap_or_default(),
                    end.next_variety.map(RaffleVariety::as_str).unwrap_or_default()
                ),
                text
            );
        }
    }

    #[test]
    fn ruthless_start_shares_the_start_indicator() {
        let timestamp = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        let Message::Start(start) = classify(timestamp, "500 ruthless raffle starting!", None).unwrap()
        else {
            panic!("Expected start message");
        };
        assert_eq!(start.coin_price, 500);
        assert_eq!(start.variety, RaffleVariety::Raffle);
    }

    #[test]
    fn end_announcing_the_next_start_is_an_end_message() {
        let message = parse_line(
            "2024-01-01T00:00:10 RAFFLE OVER: Congratulations to Alice for winning 500 coins! waffle starting!",
            None,
        )
        .expect("Expected end message to classify");

        let Message::End(end) = message else {
            panic!("Expected end, got {message:?}");
        };
        assert!(end.has_winner);
        assert_eq!(end.winner_name, "Alice");
        assert_eq!(end.coins, 500);
        assert_eq!(end.next_variety, Some(RaffleVariety::Waffle));
    }
}

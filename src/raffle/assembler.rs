use super::Raffle;
use crate::error::StateError;
use crate::message::Message;
use crate::settings::ReconstructionSettings;

/// Folds the ordered message stream into raffles. Only the active raffle is
/// mutable; starting a new raffle retires it to the ordered list.
#[derive(Debug)]
pub struct RaffleAssembler {
    settings: ReconstructionSettings,
    active: Option<Raffle>,
    raffles: Vec<Raffle>,
}

impl RaffleAssembler {
    pub fn new(settings: ReconstructionSettings) -> Self {
        Self {
            settings,
            active: None,
            raffles: Vec::new(),
        }
    }

    pub fn active(&self) -> Option<&Raffle> {
        self.active.as_ref()
    }

    pub fn retired(&self) -> &[Raffle] {
        &self.raffles
    }

    pub fn apply(&mut self, message: &Message) -> Result<(), StateError> {
        if let Message::Start(start) = message {
            if let Some(previous) = self.active.take() {
                self.raffles.push(previous);
            }
            self.active = Some(Raffle::from_start(start));
            return Ok(());
        }

        let settings = self.settings;
        let Some(raffle) = self.active.as_mut() else {
            return Err(StateError::new(
                format!("{} message without an active raffle", message.kind()),
                message.timestamp(),
                message.text(),
            ));
        };

        match message {
            Message::Start(_) => Ok(()),
            Message::Entry(entry) => {
                if raffle.add_entry(entry, &settings)? {
                    tracing::debug!(
                        player_name = %entry.player_name,
                        timestamp = %entry.timestamp,
                        "Merged late entry into ended raffle"
                    );
                }
                Ok(())
            }
            Message::End(end) => {
                raffle.finalize(end, &settings)?;
                tracing::debug!(
                    coins = raffle.coins,
                    has_winner = end.has_winner,
                    entries = raffle.entries.len(),
                    "Raffle ended"
                );
                Ok(())
            }
            Message::Fact(fact) => raffle.attach_fact(fact),
            Message::FactExtension(extension) => raffle.extend_fact(extension),
        }
    }

    /// Ends the fold. A raffle still open at the end of the log is kept
    /// as-is, without an outcome.
    pub fn finish(mut self) -> Vec<Raffle> {
        if let Some(active) = self.active.take() {
            if !active.is_finalized() {
                tracing::debug!(
                    start_time = %active.start_time,
                    "Log ended during an open raffle"
                );
            }
            self.raffles.push(active);
        }

        self.raffles
    }
}

pub fn assemble_raffles(
    messages: &[Message],
    settings: ReconstructionSettings,
) -> Result<Vec<Raffle>, StateError> {
    let mut assembler = RaffleAssembler::new(settings);
    for message in messages {
        assembler.apply(message)?;
    }

    Ok(assembler.finish())
}

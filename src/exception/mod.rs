use std::fmt;
use thiserror::Error;

/// Unexpected failures of the host itself (persistence, configuration).
#[derive(Error, Debug)]
pub enum GameError {
    #[error("I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization/deserialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Configuration(#[from] config::ConfigError),

    #[error("Remote store error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

pub type GameResult<T> = Result<T, GameError>;

impl GameError {
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// Failures talking to the remote participant store.
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Remote store answered with status {0}")]
    Status(u16),

    #[error("Remote store rejected the request: {message}")]
    Rejected { message: String },

    #[error("Unparseable remote payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Remote store is not configured")]
    NotConfigured,

    #[error("Request cancelled before it was sent")]
    Cancelled,
}

pub type RemoteResult<T> = Result<T, RemoteError>;

impl RemoteError {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// User-facing warnings. An operation that returns a notice changed nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Paused,
    RoundLocked,
    NoParticipants,
    SelectPattern,
    BallsExhausted,
    AllPrizesAwarded,
    InvalidBall(u8),
    AlreadyDrawn(u8),
    NotLocked,
    DuplicateIdentifier(String),
    MissingField(&'static str),
    ParticipantNotFound(String),
    CardNotFound(String),
    PrizeNotFound(String),
    WinnerNotFound(String),
    ProtectedCard(String),
    ProtectedPrize(String),
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Paused => write!(f, "The game is paused"),
            Self::RoundLocked => write!(f, "Confirm or reject the current winners first"),
            Self::NoParticipants => write!(f, "There are no participants"),
            Self::SelectPattern => write!(f, "Select a pattern before drawing"),
            Self::BallsExhausted => write!(f, "All balls have been drawn"),
            Self::AllPrizesAwarded => write!(f, "All prizes have been awarded"),
            Self::InvalidBall(ball) => write!(f, "Ball {} is out of range", ball),
            Self::AlreadyDrawn(ball) => write!(f, "Ball {} was already drawn", ball),
            Self::NotLocked => write!(f, "There are no winners to confirm"),
            Self::DuplicateIdentifier(id) => {
                write!(f, "A participant with identifier {} already exists", id)
            }
            Self::MissingField(field) => write!(f, "Field {} is required", field),
            Self::ParticipantNotFound(id) => write!(f, "Participant {} not found", id),
            Self::CardNotFound(id) => write!(f, "Card {} not found", id),
            Self::PrizeNotFound(id) => write!(f, "Prize {} not found", id),
            Self::WinnerNotFound(id) => write!(f, "Winner for card {} not found", id),
            Self::ProtectedCard(id) => {
                write!(f, "Card {} belongs to an unconfirmed winner", id)
            }
            Self::ProtectedPrize(id) => write!(f, "Prize {} was already awarded", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notices_render_readable_text() {
        assert_eq!(
            Notice::SelectPattern.to_string(),
            "Select a pattern before drawing"
        );
        assert_eq!(
            Notice::AlreadyDrawn(7).to_string(),
            "Ball 7 was already drawn"
        );
    }

    #[test]
    fn remote_error_wraps_into_game_error() {
        let err: GameError = RemoteError::rejected("quota").into();
        assert!(matches!(err, GameError::Remote(RemoteError::Rejected { .. })));
        assert!(err.to_string().contains("quota"));
    }
}

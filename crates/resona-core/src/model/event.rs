use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kind of a listening event.
///
/// Only [`EventKind::PlayedFull`] is a positive taste signal; any other
/// kind still counts toward the recommender's exclusion set. Unknown
/// kinds round-trip through [`EventKind::Other`] so the event log stays
/// append-only even across schema vocabulary changes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    PlayedFull,
    Skip,
    Other(String),
}

impl EventKind {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::PlayedFull => "played_full",
            Self::Skip => "skip",
            Self::Other(kind) => kind,
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "played_full" => Self::PlayedFull,
            "skip" => Self::Skip,
            other => Self::Other(other.to_string()),
        }
    }

    /// Whether this event contributes to the taste fingerprint.
    #[must_use]
    pub const fn is_positive(&self) -> bool {
        matches!(self, Self::PlayedFull)
    }
}

/// One append-only listening event. Never mutated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListeningEvent {
    pub id: i64,
    pub user_id: i64,
    pub track_id: i64,
    pub kind: EventKind,
    pub created_at: DateTime<Utc>,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pattern::Pattern;

/// 당첨 당시의 모습을 그대로 복사해 둔 기록.
///
/// Copied at creation time so a winner stays displayable after the card,
/// participant or prize it came from is edited or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinnerSnapshot {
    pub participant_name: String,
    pub card_numbers: Vec<u8>,
    pub drawn_balls: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Winner {
    pub participant_id: String,
    pub card_id: String,
    pub timestamp: DateTime<Utc>,
    pub winning_number: u8,
    pub winning_pattern: Pattern,
    #[serde(default)]
    pub round: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prize_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prize_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prize_description: Option<String>,
    pub snapshot: WinnerSnapshot,
}

impl Winner {
    pub fn participant_name(&self) -> &str {
        &self.snapshot.participant_name
    }

    pub fn with_prize(self, prize: &Prize) -> Winner {
        Winner {
            prize_id: Some(prize.id.clone()),
            prize_name: Some(prize.name.clone()),
            prize_description: Some(prize.description.clone()),
            ..self
        }
    }

    /// Same batch: detected on the same draw of the same round.
    pub fn is_concurrent_with(&self, other: &Winner) -> bool {
        self.round == other.round && self.timestamp == other.timestamp
    }
}

/// Number of winners sharing `winner`'s prize (itself included).
pub fn share_count(winners: &[Winner], winner: &Winner) -> usize {
    winners
        .iter()
        .filter(|w| w.is_concurrent_with(winner) && w.prize_id == winner.prize_id)
        .count()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prize {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_awarded: bool,
}

impl Prize {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Prize {
        Prize {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            description: description.into(),
            is_awarded: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn winner(card: &str, timestamp: DateTime<Utc>) -> Winner {
        Winner {
            participant_id: "p".into(),
            card_id: card.into(),
            timestamp,
            winning_number: 5,
            winning_pattern: Pattern::TopRow,
            round: 1,
            prize_id: None,
            prize_name: None,
            prize_description: None,
            snapshot: WinnerSnapshot {
                participant_name: "Ana".into(),
                card_numbers: vec![],
                drawn_balls: vec![5],
            },
        }
    }

    #[test]
    fn concurrent_winners_split_a_prize() {
        let prize = Prize::new("TV", "55 inch");
        let now = Utc::now();
        let later = now + chrono::Duration::seconds(3);
        let winners = vec![
            winner("a", now).with_prize(&prize),
            winner("b", now).with_prize(&prize),
            winner("c", later),
        ];

        assert_eq!(share_count(&winners, &winners[0]), 2);
        assert_eq!(share_count(&winners, &winners[2]), 1);
        assert_eq!(winners[1].prize_name.as_deref(), Some("TV"));
    }
}

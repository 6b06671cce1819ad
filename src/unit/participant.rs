use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::card::{cards::Cards, Card};

/// 등록된 참가자. 카드 소유권은 참가자에게만 있다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub surname: String,
    #[serde(rename = "dni")]
    pub external_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_cards")]
    pub cards: Cards,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

/// Input for registering a participant.
#[derive(Debug, Clone, Default)]
pub struct NewParticipant {
    pub name: String,
    pub surname: String,
    pub external_id: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub user_id: Option<String>,
}

/// Partial edit of contact fields; `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct ContactUpdate {
    pub name: Option<String>,
    pub surname: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl Participant {
    pub fn new(info: NewParticipant, cards: Cards) -> Participant {
        Participant {
            id: Uuid::new_v4().to_string(),
            name: info.name.trim().to_string(),
            surname: info.surname.trim().to_string(),
            external_id: info.external_id.trim().to_string(),
            phone: info.phone,
            email: info.email,
            user_id: info.user_id,
            cards,
            created_at: Utc::now(),
        }
    }

    pub fn full_name(&self) -> String {
        if self.surname.is_empty() {
            self.name.clone()
        } else {
            format!("{} {}", self.name, self.surname)
        }
    }

    pub fn same_identifier(&self, external_id: &str) -> bool {
        self.external_id.trim().to_lowercase() == external_id.trim().to_lowercase()
    }

    pub fn apply(&mut self, update: ContactUpdate) {
        if let Some(name) = update.name {
            self.name = name.trim().to_string();
        }
        if let Some(surname) = update.surname {
            self.surname = surname.trim().to_string();
        }
        if update.phone.is_some() {
            self.phone = update.phone;
        }
        if update.email.is_some() {
            self.email = update.email;
        }
    }

    /// Adds cards whose id is not already held.
    pub fn add_cards(&mut self, cards: Cards) -> usize {
        let before = self.cards.len();
        for card in cards {
            if !self.cards.iter().any(|c| c.get_id() == card.get_id()) {
                self.cards.push(card);
            }
        }
        self.cards.len() - before
    }
}

// 스프레드시트 쪽은 cards 컬럼을 JSON 문자열로 저장하기도 한다
fn deserialize_cards<'de, D>(deserializer: D) -> Result<Cards, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum CardsField {
        List(Vec<Card>),
        Encoded(String),
        Missing(()),
    }

    match CardsField::deserialize(deserializer)? {
        CardsField::List(cards) => Ok(cards),
        CardsField::Encoded(raw) if raw.trim().is_empty() => Ok(Vec::new()),
        CardsField::Encoded(raw) => serde_json::from_str(&raw).map_err(serde::de::Error::custom),
        CardsField::Missing(()) => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identifier_comparison_ignores_case_and_padding() {
        let p = Participant::new(
            NewParticipant {
                name: "Ana".into(),
                external_id: "12345678a".into(),
                ..Default::default()
            },
            vec![],
        );
        assert!(p.same_identifier(" 12345678A "));
        assert!(!p.same_identifier("12345678B"));
    }

    #[test]
    fn cards_accept_list_string_and_null() {
        let base = json!({"id": "p1", "name": "Ana", "dni": "1"});

        let mut listed = base.clone();
        listed["cards"] = json!([{"id": "c1", "numbers": [1, 2, 3]}]);
        let p: Participant = serde_json::from_value(listed).unwrap();
        assert_eq!(p.cards.len(), 1);

        let mut encoded = base.clone();
        encoded["cards"] = json!(r#"[{"id":"c2","numbers":[4],"isInvalid":true}]"#);
        let p: Participant = serde_json::from_value(encoded).unwrap();
        assert!(p.cards[0].is_invalid());

        let mut null = base.clone();
        null["cards"] = serde_json::Value::Null;
        let p: Participant = serde_json::from_value(null).unwrap();
        assert!(p.cards.is_empty());

        let p: Participant = serde_json::from_value(base).unwrap();
        assert!(p.cards.is_empty());
    }

    #[test]
    fn add_cards_keeps_ids_unique() {
        let mut p = Participant::new(NewParticipant::default(), vec![Card::with_id("c1", vec![])]);
        let added = p.add_cards(vec![Card::with_id("c1", vec![]), Card::with_id("c2", vec![])]);
        assert_eq!(added, 1);
        assert_eq!(p.cards.len(), 2);
    }

    #[test]
    fn contact_update_is_partial() {
        let mut p = Participant::new(
            NewParticipant {
                name: "Ana".into(),
                surname: "Diaz".into(),
                phone: Some("555".into()),
                ..Default::default()
            },
            vec![],
        );
        p.apply(ContactUpdate {
            email: Some("ana@example.com".into()),
            ..Default::default()
        });
        assert_eq!(p.full_name(), "Ana Diaz");
        assert_eq!(p.phone.as_deref(), Some("555"));
        assert_eq!(p.email.as_deref(), Some("ana@example.com"));
    }
}

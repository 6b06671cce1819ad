use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use crate::card::{
    cards::{CardVecExt, Cards},
    Card,
};
use crate::exception::Notice;
use crate::unit::participant::{ContactUpdate, NewParticipant, Participant};

/// UI 와 reconciler 가 함께 보는 로컬 roster.
pub type SharedRoster = Arc<RwLock<Roster>>;

/// The full set of registered participants.
///
/// `version` increases on every structural change so observers can tell a
/// replaced roster from an untouched one without comparing contents.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    participants: Vec<Participant>,
    version: u64,
}

impl Roster {
    pub fn new() -> Roster {
        Roster::default()
    }

    pub fn from_participants(participants: Vec<Participant>) -> Roster {
        Roster {
            participants,
            version: 0,
        }
    }

    pub fn shared(self) -> SharedRoster {
        Arc::new(RwLock::new(self))
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn find(&self, participant_id: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == participant_id)
    }

    pub fn find_by_identifier(&self, external_id: &str) -> Option<&Participant> {
        self.participants
            .iter()
            .find(|p| p.same_identifier(external_id))
    }

    pub fn card_owner(&self, card_id: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.cards.contains_id(card_id))
    }

    pub fn card_count(&self) -> usize {
        self.participants.iter().map(|p| p.cards.len()).sum()
    }

    pub fn register(&mut self, info: NewParticipant, cards: Cards) -> Result<&Participant, Notice> {
        if info.name.trim().is_empty() {
            return Err(Notice::MissingField("name"));
        }
        if info.external_id.trim().is_empty() {
            return Err(Notice::MissingField("external_id"));
        }
        if self.find_by_identifier(&info.external_id).is_some() {
            return Err(Notice::DuplicateIdentifier(info.external_id.trim().to_string()));
        }

        let participant = Participant::new(info, cards);
        info!(
            "registered participant {} ({} cards)",
            participant.id,
            participant.cards.len()
        );
        self.participants.push(participant);
        self.touch();
        Ok(&self.participants[self.participants.len() - 1])
    }

    pub fn update_contact(
        &mut self,
        participant_id: &str,
        update: ContactUpdate,
    ) -> Result<&Participant, Notice> {
        let idx = self.index_of(participant_id)?;
        self.participants[idx].apply(update);
        self.touch();
        Ok(&self.participants[idx])
    }

    pub fn add_cards(&mut self, participant_id: &str, cards: Cards) -> Result<&Participant, Notice> {
        let idx = self.index_of(participant_id)?;
        // 다른 참가자가 이미 가진 카드는 받지 않는다
        let cards: Cards = cards
            .into_iter()
            .filter(|c| self.card_owner(c.get_id()).is_none())
            .collect();
        if self.participants[idx].add_cards(cards) > 0 {
            self.touch();
        }
        Ok(&self.participants[idx])
    }

    pub fn remove_card(&mut self, participant_id: &str, card_id: &str) -> Result<Card, Notice> {
        let idx = self.index_of(participant_id)?;
        let card = self.participants[idx]
            .cards
            .remove_by_id(card_id)
            .ok_or_else(|| Notice::CardNotFound(card_id.to_string()))?;
        self.touch();
        Ok(card)
    }

    pub fn remove(&mut self, participant_id: &str) -> Result<Participant, Notice> {
        let idx = self.index_of(participant_id)?;
        let participant = self.participants.remove(idx);
        self.touch();
        Ok(participant)
    }

    pub fn clear(&mut self) {
        self.participants.clear();
        self.touch();
    }

    /// Returns the owner's id when the card was found.
    pub fn invalidate_card(&mut self, card_id: &str) -> Option<String> {
        let participant = self
            .participants
            .iter_mut()
            .find(|p| p.cards.contains_id(card_id))?;
        participant.cards.find_by_id_mut(card_id)?.invalidate();
        let owner = participant.id.clone();
        self.touch();
        Some(owner)
    }

    pub fn clear_invalidations(&mut self) -> usize {
        let mut cleared = 0;
        for card in self.participants.iter_mut().flat_map(|p| p.cards.iter_mut()) {
            if card.is_invalid() {
                card.clear_invalid();
                cleared += 1;
            }
        }
        if cleared > 0 {
            self.touch();
        }
        cleared
    }

    /// Wholesale replacement, used when a remote snapshot differs.
    pub fn replace_all(&mut self, participants: Vec<Participant>) {
        self.participants = participants;
        self.touch();
    }

    fn index_of(&self, participant_id: &str) -> Result<usize, Notice> {
        self.participants
            .iter()
            .position(|p| p.id == participant_id)
            .ok_or_else(|| Notice::ParticipantNotFound(participant_id.to_string()))
    }

    fn touch(&mut self) {
        self.version += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(name: &str, dni: &str) -> NewParticipant {
        NewParticipant {
            name: name.into(),
            external_id: dni.into(),
            ..Default::default()
        }
    }

    #[test]
    fn duplicate_identifier_is_rejected_case_insensitively() {
        let mut roster = Roster::new();
        roster.register(info("Ana", "x123"), vec![]).unwrap();
        let version = roster.version();

        let err = roster.register(info("Bea", "X123"), vec![]).unwrap_err();
        assert_eq!(err, Notice::DuplicateIdentifier("X123".into()));
        assert_eq!(roster.len(), 1);
        assert_eq!(roster.version(), version);
    }

    #[test]
    fn required_fields() {
        let mut roster = Roster::new();
        assert_eq!(
            roster.register(info(" ", "1"), vec![]).unwrap_err(),
            Notice::MissingField("name")
        );
        assert_eq!(
            roster.register(info("Ana", ""), vec![]).unwrap_err(),
            Notice::MissingField("external_id")
        );
    }

    #[test]
    fn a_card_has_a_single_owner() {
        let mut roster = Roster::new();
        let a = roster
            .register(info("Ana", "1"), vec![Card::with_id("c1", vec![])])
            .unwrap()
            .id
            .clone();
        let b = roster.register(info("Bea", "2"), vec![]).unwrap().id.clone();

        roster.add_cards(&b, vec![Card::with_id("c1", vec![])]).unwrap();
        assert_eq!(roster.card_owner("c1").map(|p| p.id.clone()), Some(a));
        assert_eq!(roster.card_count(), 1);
    }

    #[test]
    fn invalidation_and_reset() {
        let mut roster = Roster::new();
        let id = roster
            .register(info("Ana", "1"), vec![Card::with_id("c1", vec![])])
            .unwrap()
            .id
            .clone();

        assert_eq!(roster.invalidate_card("c1"), Some(id.clone()));
        assert!(roster.find(&id).unwrap().cards[0].is_invalid());
        assert_eq!(roster.invalidate_card("missing"), None);

        assert_eq!(roster.clear_invalidations(), 1);
        assert!(!roster.find(&id).unwrap().cards[0].is_invalid());
    }

    #[test]
    fn removals_report_missing_targets() {
        let mut roster = Roster::new();
        assert_eq!(
            roster.remove("nope").unwrap_err(),
            Notice::ParticipantNotFound("nope".into())
        );
        let id = roster.register(info("Ana", "1"), vec![]).unwrap().id.clone();
        assert_eq!(
            roster.remove_card(&id, "c9").unwrap_err(),
            Notice::CardNotFound("c9".into())
        );
        roster.remove(&id).unwrap();
        assert!(roster.is_empty());
    }
}

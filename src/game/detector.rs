use chrono::Utc;
use tracing::{debug, warn};

use crate::card::cards::CardVecExt;
use crate::card::Card;
use crate::game::winner::{Winner, WinnerSnapshot};
use crate::pattern::Pattern;
use crate::unit::Participant;

/// A card qualifies when every cell of the pattern is marked.
pub fn qualifies(card: &Card, drawn: &[u8], pattern: Pattern) -> bool {
    if pattern.is_none() || !card.is_well_formed() {
        return false;
    }
    pattern
        .indices()
        .iter()
        .all(|&index| card.is_marked(index, drawn))
}

/// 새로 패턴을 완성한 (참가자, 카드) 쌍을 찾는다.
///
/// Cards already recorded as winners in `round` and invalidated cards are
/// skipped. The winning number is the last ball in `drawn`; every winner of
/// one call shares the same timestamp.
pub fn detect(
    participants: &[Participant],
    drawn: &[u8],
    existing: &[Winner],
    pattern: Pattern,
    round: u32,
) -> Vec<Winner> {
    if pattern.is_none() {
        warn!("winner detection requested without a pattern");
        return Vec::new();
    }
    let Some(&winning_number) = drawn.last() else {
        return Vec::new();
    };

    let timestamp = Utc::now();
    let mut found = Vec::new();

    for participant in participants {
        for card in participant.cards.valid() {
            let already_won = existing
                .iter()
                .any(|w| w.card_id == card.get_id() && w.round == round);
            if already_won || !qualifies(card, drawn, pattern) {
                continue;
            }

            debug!(
                "card {} of {} completed {}",
                card.get_id(),
                participant.id,
                pattern
            );
            found.push(Winner {
                participant_id: participant.id.clone(),
                card_id: card.get_id().to_string(),
                timestamp,
                winning_number,
                winning_pattern: pattern,
                round,
                prize_id: None,
                prize_name: None,
                prize_description: None,
                snapshot: WinnerSnapshot {
                    participant_name: participant.full_name(),
                    card_numbers: card.get_numbers().to_vec(),
                    drawn_balls: drawn.to_vec(),
                },
            });
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card_gen::CardGenerator;
    use crate::enums::{FREE_SPACE_INDEX, GRID_CELLS, TOTAL_BALLS};
    use crate::unit::NewParticipant;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;

    fn participant(cards: Vec<Card>) -> Participant {
        Participant::new(
            NewParticipant {
                name: "Ana".into(),
                external_id: "1".into(),
                ..Default::default()
            },
            cards,
        )
    }

    #[test]
    fn qualification_matches_cell_membership() {
        let generator = CardGenerator::new();
        let mut rng = StdRng::seed_from_u64(11);
        let mut balls: Vec<u8> = (1..=TOTAL_BALLS).collect();

        for _ in 0..200 {
            let card = generator.generate_card(&mut rng);
            balls.shuffle(&mut rng);
            let drawn = &balls[..30];

            for pattern in Pattern::PLAYABLE {
                let expected = pattern.indices().iter().all(|&i| {
                    i == FREE_SPACE_INDEX || card.cell(i).map_or(false, |n| drawn.contains(&n))
                });
                assert_eq!(qualifies(&card, drawn, pattern), expected);
            }
        }
    }

    #[test]
    fn none_pattern_never_qualifies() {
        let card = Card::with_id("c", (1..=24).collect());
        let everything: Vec<u8> = (1..=TOTAL_BALLS).collect();
        assert!(!qualifies(&card, &everything, Pattern::None));
        assert!(detect(&[participant(vec![card])], &everything, &[], Pattern::None, 1).is_empty());
    }

    #[test]
    fn detection_is_idempotent() {
        let card = Card::with_id("c", (1..=24).collect());
        let roster = vec![participant(vec![card])];
        let drawn: Vec<u8> = (1..=24).collect();

        let first = detect(&roster, &drawn, &[], Pattern::FullCard, 1);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].winning_number, 24);

        let second = detect(&roster, &drawn, &first, Pattern::FullCard, 1);
        assert!(second.is_empty());

        // 다음 라운드에서는 같은 카드가 다시 당첨될 수 있다
        let next_round = detect(&roster, &drawn, &first, Pattern::FullCard, 2);
        assert_eq!(next_round.len(), 1);
    }

    #[test]
    fn invalid_cards_are_excluded() {
        let mut card = Card::with_id("c", (1..=24).collect());
        card.invalidate();
        let drawn: Vec<u8> = (1..=24).collect();
        assert!(detect(&[participant(vec![card])], &drawn, &[], Pattern::FullCard, 1).is_empty());
    }

    #[test]
    fn concurrent_winners_share_a_timestamp() {
        let a = Card::with_id("a", (1..=24).collect());
        let b = Card::with_id("b", (1..=24).collect());
        let roster = vec![participant(vec![a]), participant(vec![b])];
        let drawn: Vec<u8> = (1..=GRID_CELLS as u8).collect();

        let winners = detect(&roster, &drawn, &[], Pattern::FourCorners, 3);
        assert_eq!(winners.len(), 2);
        assert_eq!(winners[0].timestamp, winners[1].timestamp);
        assert!(winners.iter().all(|w| w.round == 3 && w.winning_number == 25));
        assert_eq!(winners[0].snapshot.drawn_balls, drawn);
    }

    #[test]
    fn full_grid_card_wins_its_top_row() {
        // 25 칸을 모두 가진 카드, 중앙은 0
        let numbers: Vec<u8> = vec![
            5, 17, 33, 50, 61, //
            2, 20, 40, 47, 62, //
            3, 21, 0, 48, 63, //
            4, 22, 41, 49, 64, //
            6, 23, 42, 51, 65,
        ];
        let card = Card::with_id("c25", numbers);
        let roster = vec![participant(vec![card.clone()])];
        let drawn = [5, 17, 33, 50, 61];

        assert!(qualifies(&card, &drawn, Pattern::TopRow));
        let winners = detect(&roster, &drawn, &[], Pattern::TopRow, 1);
        assert_eq!(winners.len(), 1);
        assert_eq!(winners[0].card_id, "c25");
        assert_eq!(winners[0].winning_number, 61);

        // 가운데 줄: 3, 21, (free), 48, 63
        assert!(qualifies(&card, &[3, 21, 48, 63], Pattern::MiddleRow));
        assert!(!qualifies(&card, &[3, 21, 40, 48], Pattern::MiddleRow));
    }
}

pub mod detector;
pub mod state;
pub mod winner;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{info, warn};

use crate::enums::{ball_label, phase::Phase, TOTAL_BALLS};
use crate::exception::Notice;
use crate::pattern::Pattern;
use crate::unit::{Participant, Roster};

pub use state::GameState;
pub use winner::{Prize, Winner, WinnerSnapshot};

/// Result of a successful draw.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOutcome {
    NoWinner { ball: u8 },
    Winners { ball: u8, winners: Vec<Winner> },
}

impl DrawOutcome {
    pub fn ball(&self) -> u8 {
        match self {
            DrawOutcome::NoWinner { ball } | DrawOutcome::Winners { ball, .. } => *ball,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub winner: Winner,
    /// True when the batch became empty and the round unlocked.
    pub unlocked: bool,
    pub released_prize: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetKind {
    /// Unawarded prizes remain: only the draw is cleared.
    Soft,
    /// Winners, prizes and card invalidations are cleared too.
    Full,
}

/// 추첨, 라운드 잠금, 상품 배정을 관리하는 상태 머신.
///
/// Every operation either succeeds or returns a [`Notice`] without touching
/// state.
#[derive(Debug, Clone, Default)]
pub struct BingoGame {
    state: GameState,
    winners: Vec<Winner>,
    prizes: Vec<Prize>,
}

impl BingoGame {
    pub fn new() -> BingoGame {
        BingoGame::default()
    }

    pub fn from_parts(state: GameState, winners: Vec<Winner>, prizes: Vec<Prize>) -> BingoGame {
        BingoGame {
            state,
            winners,
            prizes,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn winners(&self) -> &[Winner] {
        &self.winners
    }

    pub fn current_winners(&self) -> &[Winner] {
        &self.state.current_winners
    }

    pub fn prizes(&self) -> &[Prize] {
        &self.prizes
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn log(&mut self, line: impl Into<String>) {
        self.state.history.push(line.into());
    }

    pub fn select_pattern(&mut self, pattern: Pattern) -> Result<(), Notice> {
        if self.state.round_locked {
            return Err(Notice::RoundLocked);
        }
        self.state.selected_pattern = pattern;
        self.log(format!("Round {}: pattern {}", self.state.game_round, pattern));
        Ok(())
    }

    /// Returns the new pause flag.
    pub fn toggle_pause(&mut self) -> bool {
        self.state.is_paused = !self.state.is_paused;
        let line = if self.state.is_paused {
            "Game paused"
        } else {
            "Game resumed"
        };
        self.log(line);
        info!("{}, phase {}", line, self.phase().as_str());
        self.state.is_paused
    }

    /// Draws a ball uniformly from the ones not drawn yet.
    pub fn draw_ball<R: Rng + ?Sized>(
        &mut self,
        participants: &[Participant],
        rng: &mut R,
    ) -> Result<DrawOutcome, Notice> {
        self.check_can_draw(participants)?;
        let remaining: Vec<u8> = (1..=TOTAL_BALLS)
            .filter(|b| !self.state.drawn_balls.contains(b))
            .collect();
        let ball = *remaining.choose(rng).ok_or(Notice::BallsExhausted)?;
        self.draw_number(participants, ball)
    }

    /// Records a specific ball, e.g. one called out from a physical cage.
    pub fn draw_number(
        &mut self,
        participants: &[Participant],
        ball: u8,
    ) -> Result<DrawOutcome, Notice> {
        self.check_can_draw(participants)?;
        if ball == 0 || ball > TOTAL_BALLS {
            return Err(Notice::InvalidBall(ball));
        }
        if self.state.drawn_balls.contains(&ball) {
            return Err(Notice::AlreadyDrawn(ball));
        }

        self.state.drawn_balls.push(ball);
        self.log(format!("Round {}: {}", self.state.game_round, ball_label(ball)));

        let existing: Vec<Winner> = self
            .winners
            .iter()
            .chain(self.state.current_winners.iter())
            .cloned()
            .collect();
        let found = detector::detect(
            participants,
            &self.state.drawn_balls,
            &existing,
            self.state.selected_pattern,
            self.state.game_round,
        );
        if found.is_empty() {
            return Ok(DrawOutcome::NoWinner { ball });
        }

        let winners = self.lock_round(found);
        Ok(DrawOutcome::Winners { ball, winners })
    }

    /// Appends the pending batch to the permanent winners and starts the next round.
    pub fn confirm_round(&mut self) -> Result<Vec<Winner>, Notice> {
        if self.state.current_winners.is_empty() {
            return Err(Notice::NotLocked);
        }

        if let Some(prize_id) = self.state.pending_prize_id.take() {
            if let Some(prize) = self.prizes.iter_mut().find(|p| p.id == prize_id) {
                prize.is_awarded = true;
            }
        }
        let confirmed = std::mem::take(&mut self.state.current_winners);
        self.winners.extend(confirmed.iter().cloned());

        self.log(format!(
            "Round {} confirmed with {} winner(s)",
            self.state.game_round,
            confirmed.len()
        ));
        info!(
            "round {} confirmed, {} winner(s)",
            self.state.game_round,
            confirmed.len()
        );

        self.state.drawn_balls.clear();
        self.state.selected_pattern = Pattern::None;
        self.state.round_locked = false;
        self.state.game_round += 1;
        Ok(confirmed)
    }

    /// Drops one pending winner and invalidates its card.
    pub fn reject_winner(&mut self, roster: &mut Roster, card_id: &str) -> Result<Rejection, Notice> {
        let pos = self
            .state
            .current_winners
            .iter()
            .position(|w| w.card_id == card_id)
            .ok_or_else(|| Notice::WinnerNotFound(card_id.to_string()))?;

        let winner = self.state.current_winners.remove(pos);
        if roster.invalidate_card(card_id).is_none() {
            warn!("rejected card {} is no longer in the roster", card_id);
        }
        self.log(format!(
            "Round {}: rejected {} (card {})",
            self.state.game_round,
            winner.participant_name(),
            card_id
        ));

        if !self.state.current_winners.is_empty() {
            return Ok(Rejection {
                winner,
                unlocked: false,
                released_prize: None,
            });
        }

        let released_prize = self.release_pending_prize();
        self.state.round_locked = false;
        Ok(Rejection {
            winner,
            unlocked: true,
            released_prize,
        })
    }

    /// Returns the kind of reset that was performed. The pause flag is
    /// left as it was.
    pub fn reset(&mut self, roster: &mut Roster) -> ResetKind {
        self.release_pending_prize();
        self.state.current_winners.clear();
        self.state.round_locked = false;
        self.state.drawn_balls.clear();
        self.state.history.clear();
        self.state.selected_pattern = Pattern::None;

        if self.prizes.iter().any(|p| !p.is_awarded) {
            info!("soft reset, {} winner(s) kept", self.winners.len());
            return ResetKind::Soft;
        }

        self.winners.clear();
        self.prizes.clear();
        self.state.game_round = 1;
        let cleared = roster.clear_invalidations();
        info!("full reset, {} card invalidation(s) cleared", cleared);
        ResetKind::Full
    }

    /// Cards in the pending batch cannot be deleted.
    pub fn is_card_protected(&self, card_id: &str) -> bool {
        self.state.current_winners.iter().any(|w| w.card_id == card_id)
    }

    pub fn is_participant_protected(&self, participant_id: &str) -> bool {
        self.state
            .current_winners
            .iter()
            .any(|w| w.participant_id == participant_id)
    }

    pub fn add_prize(&mut self, name: impl Into<String>, description: impl Into<String>) -> &Prize {
        self.prizes.push(Prize::new(name, description));
        &self.prizes[self.prizes.len() - 1]
    }

    pub fn update_prize(
        &mut self,
        prize_id: &str,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<&Prize, Notice> {
        let prize = self
            .prizes
            .iter_mut()
            .find(|p| p.id == prize_id)
            .ok_or_else(|| Notice::PrizeNotFound(prize_id.to_string()))?;
        prize.name = name.into();
        prize.description = description.into();
        Ok(prize)
    }

    pub fn remove_prize(&mut self, prize_id: &str) -> Result<Prize, Notice> {
        let pos = self
            .prizes
            .iter()
            .position(|p| p.id == prize_id)
            .ok_or_else(|| Notice::PrizeNotFound(prize_id.to_string()))?;
        if self.prizes[pos].is_awarded {
            return Err(Notice::ProtectedPrize(prize_id.to_string()));
        }
        Ok(self.prizes.remove(pos))
    }

    fn check_can_draw(&self, participants: &[Participant]) -> Result<(), Notice> {
        let phase = self.phase();
        if phase.is_paused() {
            return Err(Notice::Paused);
        }
        if phase.is_locked() {
            return Err(Notice::RoundLocked);
        }
        if participants.is_empty() {
            return Err(Notice::NoParticipants);
        }
        if !phase.can_draw() {
            return Err(Notice::SelectPattern);
        }
        if self.state.drawn_balls.len() >= TOTAL_BALLS as usize {
            return Err(Notice::BallsExhausted);
        }
        if !self.prizes.is_empty() && self.prizes.iter().all(|p| p.is_awarded) {
            return Err(Notice::AllPrizesAwarded);
        }
        Ok(())
    }

    fn lock_round(&mut self, found: Vec<Winner>) -> Vec<Winner> {
        let prize = match self.state.pending_prize_id.as_ref() {
            Some(id) => self.prizes.iter().find(|p| &p.id == id).cloned(),
            None => self.prizes.iter_mut().find(|p| !p.is_awarded).map(|p| {
                p.is_awarded = true;
                p.clone()
            }),
        };
        if let Some(prize) = prize.as_ref() {
            self.state.pending_prize_id = Some(prize.id.clone());
        }

        let winners: Vec<Winner> = found
            .into_iter()
            .map(|w| match prize.as_ref() {
                Some(prize) => w.with_prize(prize),
                None => w,
            })
            .collect();

        let names: Vec<&str> = winners.iter().map(|w| w.participant_name()).collect();
        let line = format!("Round {}: BINGO! {}", self.state.game_round, names.join(", "));
        info!("{}", line);
        self.log(line);

        self.state.current_winners.extend(winners.iter().cloned());
        self.state.round_locked = true;
        winners
    }

    fn release_pending_prize(&mut self) -> Option<String> {
        let prize_id = self.state.pending_prize_id.take()?;
        if let Some(prize) = self.prizes.iter_mut().find(|p| p.id == prize_id) {
            prize.is_awarded = false;
        }
        Some(prize_id)
    }
}

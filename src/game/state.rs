use serde::{Deserialize, Serialize};

use crate::enums::phase::Phase;
use crate::game::winner::Winner;
use crate::pattern::Pattern;

/// 저장되는 게임 진행 상태.
///
/// Missing fields fall back to `Default`, so a partial record loaded from
/// disk is merged onto a fresh state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameState {
    pub drawn_balls: Vec<u8>,
    pub history: Vec<String>,
    pub selected_pattern: Pattern,
    pub round_locked: bool,
    pub game_round: u32,
    pub is_paused: bool,
    /// Winners detected this round, awaiting confirmation or rejection.
    pub current_winners: Vec<Winner>,
    /// Prize tentatively assigned to `current_winners`.
    pub pending_prize_id: Option<String>,
}

impl Default for GameState {
    fn default() -> Self {
        GameState {
            drawn_balls: Vec::new(),
            history: Vec::new(),
            selected_pattern: Pattern::None,
            round_locked: false,
            game_round: 1,
            is_paused: false,
            current_winners: Vec::new(),
            pending_prize_id: None,
        }
    }
}

impl GameState {
    pub fn phase(&self) -> Phase {
        if self.is_paused {
            Phase::Paused
        } else if self.round_locked {
            Phase::RoundLocked
        } else if self.selected_pattern.is_none() {
            Phase::AwaitingPattern
        } else {
            Phase::Drawing
        }
    }
}

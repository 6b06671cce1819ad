pub mod phase;

use std::ops::RangeInclusive;

/// 75-ball 게임 기준 공 개수
pub const TOTAL_BALLS: u8 = 75;

pub const GRID_SIZE: usize = 5;
pub const GRID_CELLS: usize = GRID_SIZE * GRID_SIZE;

/// Grid index of the free space (center cell).
pub const FREE_SPACE_INDEX: usize = 12;

/// Stored numbers per card; the free space is not materialized.
pub const NUMBERS_PER_CARD: usize = GRID_CELLS - 1;

pub const COLUMN_LETTERS: [char; GRID_SIZE] = ['B', 'I', 'N', 'G', 'O'];

pub const COLUMN_RANGES: [RangeInclusive<u8>; GRID_SIZE] = [1..=15, 16..=30, 31..=45, 46..=60, 61..=75];

/// Stable keys for persisted local state.
pub const KEY_ROSTER: &str = "roster";
pub const KEY_GAME_STATE: &str = "game_state";
pub const KEY_WINNERS: &str = "winners";
pub const KEY_PRIZES: &str = "prizes";
pub const KEY_TITLE: &str = "title";
pub const KEY_SUBTITLE: &str = "subtitle";
pub const KEY_SYNC_CONFIG: &str = "sync_config";

/// Column (0..5) a ball belongs to.
pub fn column_of(ball: u8) -> Option<usize> {
    COLUMN_RANGES.iter().position(|range| range.contains(&ball))
}

/// "B-12" style label used in history lines.
pub fn ball_label(ball: u8) -> String {
    match column_of(ball) {
        Some(col) => format!("{}-{}", COLUMN_LETTERS[col], ball),
        None => ball.to_string(),
    }
}

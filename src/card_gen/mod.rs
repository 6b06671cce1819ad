use std::collections::HashSet;

use rand::Rng;
use tracing::debug;

use crate::card::Card;
use crate::enums::{COLUMN_RANGES, FREE_SPACE_INDEX, GRID_SIZE, NUMBERS_PER_CARD};

const CENTER_COLUMN: usize = GRID_SIZE / 2;
const CENTER_ROW: usize = GRID_SIZE / 2;

/// 컬럼별 범위에 맞춰 카드 번호를 생성합니다.
///
/// Every column draws from its own disjoint range, so uniqueness only has to
/// be enforced inside a column. The center column draws one number fewer to
/// leave room for the free space.
#[derive(Debug, Default, Clone, Copy)]
pub struct CardGenerator;

impl CardGenerator {
    pub fn new() -> CardGenerator {
        CardGenerator
    }

    /// 24 numbers, row-major over the grid with the center cell omitted.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<u8> {
        let columns: Vec<Vec<u8>> = (0..GRID_SIZE)
            .map(|col| Self::draw_column(rng, col))
            .collect();

        let mut numbers = Vec::with_capacity(NUMBERS_PER_CARD);
        for row in 0..GRID_SIZE {
            for (col, column) in columns.iter().enumerate() {
                if row * GRID_SIZE + col == FREE_SPACE_INDEX {
                    continue;
                }
                // 중앙 컬럼은 free space 아래 행부터 한 칸씩 당겨진다
                let slot = if col == CENTER_COLUMN && row > CENTER_ROW {
                    row - 1
                } else {
                    row
                };
                numbers.push(column[slot]);
            }
        }
        numbers
    }

    pub fn generate_card<R: Rng + ?Sized>(&self, rng: &mut R) -> Card {
        let card = Card::new(self.generate(rng));
        debug!("generated card {}", card.get_id());
        card
    }

    pub fn generate_cards<R: Rng + ?Sized>(&self, rng: &mut R, count: usize) -> Vec<Card> {
        (0..count).map(|_| self.generate_card(rng)).collect()
    }

    // rejection sampling: 이미 뽑힌 번호면 다시 뽑는다
    fn draw_column<R: Rng + ?Sized>(rng: &mut R, col: usize) -> Vec<u8> {
        let count = if col == CENTER_COLUMN {
            GRID_SIZE - 1
        } else {
            GRID_SIZE
        };
        let range = COLUMN_RANGES[col].clone();

        let mut seen = HashSet::with_capacity(count);
        let mut column = Vec::with_capacity(count);
        while column.len() < count {
            let number = rng.gen_range(range.clone());
            if seen.insert(number) {
                column.push(number);
            }
        }
        column
    }
}

pub mod cards;

use crate::enums::{FREE_SPACE_INDEX, GRID_CELLS, GRID_SIZE, NUMBERS_PER_CARD};
use serde::de::{self, IgnoredAny};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use uuid::Uuid;

/// 빙고 카드 한 장.
///
/// Numbers are stored row-major over the 5×5 grid. Generated cards skip the
/// center cell, so `numbers[i]` is grid cell `i` for `i < 12` and grid cell
/// `i + 1` afterwards. Cards loaded from the remote may carry all 25 cells
/// with a placeholder (stored as `0`) at the center; those index directly.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    id: String,
    #[serde(deserialize_with = "deserialize_numbers")]
    numbers: Vec<u8>,
    #[serde(default)]
    is_invalid: bool,
}

impl fmt::Debug for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Card")
            .field("id", &self.id)
            .field("numbers", &self.numbers)
            .field("is_invalid", &self.is_invalid)
            .finish()
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  B   I   N   G   O")?;
        for row in 0..GRID_SIZE {
            for col in 0..GRID_SIZE {
                match self.cell(row * GRID_SIZE + col) {
                    Some(number) => write!(f, "{:>3} ", number)?,
                    None => write!(f, "  * ")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl Card {
    pub fn new(numbers: Vec<u8>) -> Card {
        Card::with_id(Uuid::new_v4().to_string(), numbers)
    }

    pub fn with_id(id: impl Into<String>, numbers: Vec<u8>) -> Card {
        Card {
            id: id.into(),
            numbers,
            is_invalid: false,
        }
    }

    pub fn get_id(&self) -> &str {
        &self.id
    }

    pub fn get_numbers(&self) -> &[u8] {
        &self.numbers
    }

    pub fn is_invalid(&self) -> bool {
        self.is_invalid
    }

    /// One-way within a prize cycle; only a full reset clears it.
    pub fn invalidate(&mut self) {
        self.is_invalid = true;
    }

    pub(crate) fn clear_invalid(&mut self) {
        self.is_invalid = false;
    }

    /// Number at a grid index (0..25). `None` for the free space or an
    /// index past the stored numbers.
    pub fn cell(&self, index: usize) -> Option<u8> {
        if index >= GRID_CELLS {
            return None;
        }
        if self.has_center_slot() {
            return match index {
                FREE_SPACE_INDEX => None,
                _ => self.numbers.get(index).copied(),
            };
        }
        match index.cmp(&FREE_SPACE_INDEX) {
            std::cmp::Ordering::Less => self.numbers.get(index).copied(),
            std::cmp::Ordering::Equal => None,
            std::cmp::Ordering::Greater => self.numbers.get(index - 1).copied(),
        }
    }

    /// Whether a grid cell counts as marked for the given draw history.
    pub fn is_marked(&self, index: usize, drawn: &[u8]) -> bool {
        if index == FREE_SPACE_INDEX {
            return true;
        }
        match self.cell(index) {
            Some(number) => drawn.contains(&number),
            None => false,
        }
    }

    pub fn is_well_formed(&self) -> bool {
        self.numbers.len() == NUMBERS_PER_CARD || self.has_center_slot()
    }

    fn has_center_slot(&self) -> bool {
        self.numbers.len() == GRID_CELLS
    }
}

// 시트에서 온 카드는 중앙에 "FREE" 나 null 이 들어 있을 수 있다
#[derive(Deserialize)]
#[serde(untagged)]
enum Slot {
    Number(u8),
    Placeholder(IgnoredAny),
}

fn deserialize_numbers<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let slots = Vec::<Slot>::deserialize(deserializer)?;
    let full_grid = slots.len() == GRID_CELLS;
    slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| match slot {
            Slot::Number(number) => Ok(number),
            Slot::Placeholder(_) if full_grid && index == FREE_SPACE_INDEX => Ok(0),
            Slot::Placeholder(_) => Err(de::Error::custom(format!(
                "card cell {} is not a number",
                index
            ))),
        })
        .collect()
}

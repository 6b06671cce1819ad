use serde::{Deserialize, Serialize};
use std::fmt;

/// 당첨 패턴. 각 패턴은 5x5 grid index 집합에 대응한다.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Pattern {
    #[default]
    None,
    FullCard,
    FourCorners,
    TopRow,
    MiddleRow,
    BottomRow,
    FirstColumn,
    LastColumn,
    DiagonalDown,
    DiagonalUp,
    LetterX,
    Cross,
    Frame,
    CenterSquare,
}

const FULL_CARD: [usize; 25] = [
    0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24,
];
const FOUR_CORNERS: [usize; 4] = [0, 4, 20, 24];
const TOP_ROW: [usize; 5] = [0, 1, 2, 3, 4];
const MIDDLE_ROW: [usize; 5] = [10, 11, 12, 13, 14];
const BOTTOM_ROW: [usize; 5] = [20, 21, 22, 23, 24];
const FIRST_COLUMN: [usize; 5] = [0, 5, 10, 15, 20];
const LAST_COLUMN: [usize; 5] = [4, 9, 14, 19, 24];
const DIAGONAL_DOWN: [usize; 5] = [0, 6, 12, 18, 24];
const DIAGONAL_UP: [usize; 5] = [4, 8, 12, 16, 20];
const LETTER_X: [usize; 9] = [0, 4, 6, 8, 12, 16, 18, 20, 24];
const CROSS: [usize; 9] = [2, 7, 10, 11, 12, 13, 14, 17, 22];
const FRAME: [usize; 16] = [0, 1, 2, 3, 4, 5, 9, 10, 14, 15, 19, 20, 21, 22, 23, 24];
const CENTER_SQUARE: [usize; 9] = [6, 7, 8, 11, 12, 13, 16, 17, 18];

impl Pattern {
    pub const PLAYABLE: [Pattern; 13] = [
        Pattern::FullCard,
        Pattern::FourCorners,
        Pattern::TopRow,
        Pattern::MiddleRow,
        Pattern::BottomRow,
        Pattern::FirstColumn,
        Pattern::LastColumn,
        Pattern::DiagonalDown,
        Pattern::DiagonalUp,
        Pattern::LetterX,
        Pattern::Cross,
        Pattern::Frame,
        Pattern::CenterSquare,
    ];

    /// Grid cells that must all be marked. Empty for `Pattern::None`, which
    /// callers must reject before reaching the detector.
    pub fn indices(&self) -> &'static [usize] {
        match self {
            Pattern::None => &[],
            Pattern::FullCard => &FULL_CARD,
            Pattern::FourCorners => &FOUR_CORNERS,
            Pattern::TopRow => &TOP_ROW,
            Pattern::MiddleRow => &MIDDLE_ROW,
            Pattern::BottomRow => &BOTTOM_ROW,
            Pattern::FirstColumn => &FIRST_COLUMN,
            Pattern::LastColumn => &LAST_COLUMN,
            Pattern::DiagonalDown => &DIAGONAL_DOWN,
            Pattern::DiagonalUp => &DIAGONAL_UP,
            Pattern::LetterX => &LETTER_X,
            Pattern::Cross => &CROSS,
            Pattern::Frame => &FRAME,
            Pattern::CenterSquare => &CENTER_SQUARE,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Pattern::None)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Pattern::None => "None",
            Pattern::FullCard => "Full card",
            Pattern::FourCorners => "Four corners",
            Pattern::TopRow => "Top row",
            Pattern::MiddleRow => "Middle row",
            Pattern::BottomRow => "Bottom row",
            Pattern::FirstColumn => "Column B",
            Pattern::LastColumn => "Column O",
            Pattern::DiagonalDown => "Diagonal",
            Pattern::DiagonalUp => "Reverse diagonal",
            Pattern::LetterX => "Letter X",
            Pattern::Cross => "Cross",
            Pattern::Frame => "Frame",
            Pattern::CenterSquare => "Center square",
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

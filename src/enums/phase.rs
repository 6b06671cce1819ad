use serde::{Deserialize, Serialize};

/// 진행 상태. GameState 의 플래그들로부터 계산되며 따로 저장하지 않는다.
#[derive(Clone, PartialEq, Eq, Copy, Debug, Serialize, Deserialize)]
pub enum Phase {
    // 패턴 선택 대기
    AwaitingPattern,

    // 공 추첨 중
    Drawing,

    // 당첨자 확인 대기 (확정/거절 전까지 추첨 불가)
    RoundLocked,

    // 관리자 일시정지
    Paused,
}

impl Phase {
    pub fn can_draw(&self) -> bool {
        matches!(self, Phase::Drawing)
    }

    pub fn is_locked(&self) -> bool {
        matches!(self, Phase::RoundLocked)
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, Phase::Paused)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::AwaitingPattern => "awaiting_pattern",
            Phase::Drawing => "drawing",
            Phase::RoundLocked => "round_locked",
            Phase::Paused => "paused",
        }
    }
}

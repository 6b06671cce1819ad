use super::Card;

/// Vec<Card> 타입의 별칭
pub type Cards = Vec<Card>;

/// Vec<Card> 확장 트레이트
pub trait CardVecExt {
    fn contains_id(&self, id: &str) -> bool;
    fn find_by_id_mut(&mut self, id: &str) -> Option<&mut Card>;
    fn remove_by_id(&mut self, id: &str) -> Option<Card>;
    fn valid(&self) -> Vec<&Card>;
}

impl CardVecExt for Vec<Card> {
    fn contains_id(&self, id: &str) -> bool {
        self.iter().any(|card| card.get_id() == id)
    }

    fn find_by_id_mut(&mut self, id: &str) -> Option<&mut Card> {
        self.iter_mut().find(|card| card.get_id() == id)
    }

    fn remove_by_id(&mut self, id: &str) -> Option<Card> {
        let pos = self.iter().position(|card| card.get_id() == id)?;
        Some(self.remove(pos))
    }

    fn valid(&self) -> Vec<&Card> {
        self.iter().filter(|card| !card.is_invalid()).collect()
    }
}

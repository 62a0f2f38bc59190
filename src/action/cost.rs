//! 行动代价表：FREE 行动不结束回合，TURN_ENDING 行动成功（或耗尽重试）后结束回合

use serde::Serialize;

use crate::action::{Action, ActionKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionCost {
    Free,
    TurnEnding,
}

impl ActionCost {
    /// 静态查表，整个运行期内对同一种类恒定
    pub const fn of_kind(kind: ActionKind) -> Self {
        match kind {
            ActionKind::Look | ActionKind::Speak | ActionKind::Announce => ActionCost::Free,
            ActionKind::Go
            | ActionKind::GoTo
            | ActionKind::Take
            | ActionKind::Wait
            | ActionKind::Invalid => ActionCost::TurnEnding,
        }
    }

    pub fn of(action: &Action) -> Self {
        Self::of_kind(action.kind())
    }

    pub fn is_free(self) -> bool {
        self == ActionCost::Free
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::LookTarget;
    use crate::world::Direction;

    #[test]
    fn test_free_actions() {
        assert_eq!(ActionCost::of(&Action::Look(None)), ActionCost::Free);
        assert_eq!(
            ActionCost::of(&Action::Look(Some(LookTarget::Name("door".into())))),
            ActionCost::Free
        );
        assert_eq!(ActionCost::of(&Action::Speak("hi".into())), ActionCost::Free);
        assert_eq!(ActionCost::of(&Action::Announce("hi".into())), ActionCost::Free);
    }

    #[test]
    fn test_turn_ending_actions() {
        assert_eq!(ActionCost::of(&Action::Go(Direction::North)), ActionCost::TurnEnding);
        assert_eq!(ActionCost::of(&Action::GoTo("kitchen".into())), ActionCost::TurnEnding);
        assert_eq!(ActionCost::of(&Action::Take("lamp".into())), ActionCost::TurnEnding);
        assert_eq!(ActionCost::of(&Action::Wait), ActionCost::TurnEnding);
        assert_eq!(ActionCost::of(&Action::Invalid("??".into())), ActionCost::TurnEnding);
    }
}

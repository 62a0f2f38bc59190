//! 回合错误类型与恢复动作
//!
//! 与 RecoveryEngine 配合：根据 TurnError 决定 RetryWithPrompt（消耗一次重试）或 RemindWithPrompt（不消耗）。
//! ActionError 的 Display 即反馈给 Oracle 的文本，已知时包含方向与距离。

use std::time::Duration;

use thiserror::Error;

use crate::world::{AgentId, Direction, WorldError};

/// 行动校验/执行失败（均可恢复，且失败时不修改世界）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    #[error("Your reply did not contain a valid action line.")]
    InvalidSyntax(String),

    #[error("You have already spoken this turn. Only one SPEAK or ANNOUNCE is allowed per turn; choose another action.")]
    AlreadySpoken,

    #[error("You have used all {limit} free actions this turn. Choose GO, GO TO, TAKE or WAIT to end your turn.")]
    FreeActionsExhausted { limit: usize },

    #[error("You are not placed in the world.")]
    NotPlaced(AgentId),

    #[error("Cannot go {direction}: that is the edge of the map.")]
    MapEdge { direction: Direction },

    #[error("Cannot go {direction}: there is {obstacle} in the way.")]
    Blocked {
        direction: Direction,
        obstacle: String,
    },

    #[error("Cannot go {direction}: {by} is standing there.")]
    Occupied { direction: Direction, by: AgentId },

    #[error("There is no item called '{0}' here.")]
    NoSuchItem(String),

    #[error("The {0} cannot be taken.")]
    NotTakeable(String),

    #[error("You cannot see any '{0}' from where you are.")]
    NotVisible(String),

    #[error("The {item} is {distance} tiles {bearing} of you; move next to it first.")]
    OutOfReach {
        item: String,
        distance: u32,
        bearing: String,
    },

    #[error("Nothing called '{0}' is in view.")]
    NothingInView(String),

    #[error("Unknown destination '{0}'.")]
    UnknownDestination(String),

    #[error("You are already at {0}.")]
    AlreadyThere(String),

    #[error("There is no route to {0}.")]
    NoRoute(String),

    #[error("World rejected the move: {0}")]
    World(#[from] WorldError),
}

/// Oracle 调用失败（超时、传输错误、空回复）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    #[error("Oracle timed out after {0:?}")]
    Timeout(Duration),

    #[error("Oracle transport error: {0}")]
    Transport(String),

    #[error("Oracle returned an empty response")]
    EmptyResponse,
}

/// ReplayObserver 失败（仅记录日志，不影响回合）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Observer failed: {0}")]
pub struct ObserverError(pub String);

/// 单个回合内可能出现的错误（都不会传播到回合之外）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TurnError {
    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error(transparent)]
    Action(#[from] ActionError),
}

/// 恢复引擎根据错误类型给出的建议动作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryAction {
    /// 将提示注入下一次查询，并消耗一次重试
    RetryWithPrompt(String),
    /// 将提示注入下一次查询，不消耗重试（如重复发言、免费行动失败）
    RemindWithPrompt(String),
}

impl RecoveryAction {
    pub fn prompt(&self) -> &str {
        match self {
            RecoveryAction::RetryWithPrompt(p) | RecoveryAction::RemindWithPrompt(p) => p,
        }
    }

    pub fn consumes_retry(&self) -> bool {
        matches!(self, RecoveryAction::RetryWithPrompt(_))
    }
}

//! 行动与结果类型
//!
//! Action 为封闭的标签联合：执行器对每种行动的处理由编译器穷尽检查。

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::world::{AgentId, Direction, Position};

/// LOOK 的目标：方向或名称
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum LookTarget {
    Direction(Direction),
    Name(String),
}

/// Oracle 提议的单个行动
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "arg", rename_all = "snake_case")]
pub enum Action {
    Go(Direction),
    /// 多步移动：规划到命名目标的路线并走出第一步
    GoTo(String),
    Take(String),
    Look(Option<LookTarget>),
    Speak(String),
    Announce(String),
    Wait,
    /// 无法解析的原始文本（原样保留）
    Invalid(String),
}

/// 行动种类（不含参数），用于代价查表与日志
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    Go,
    GoTo,
    Take,
    Look,
    Speak,
    Announce,
    Wait,
    Invalid,
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Go(_) => ActionKind::Go,
            Action::GoTo(_) => ActionKind::GoTo,
            Action::Take(_) => ActionKind::Take,
            Action::Look(_) => ActionKind::Look,
            Action::Speak(_) => ActionKind::Speak,
            Action::Announce(_) => ActionKind::Announce,
            Action::Wait => ActionKind::Wait,
            Action::Invalid(_) => ActionKind::Invalid,
        }
    }

    /// SPEAK / ANNOUNCE
    pub fn is_speech(&self) -> bool {
        matches!(self, Action::Speak(_) | Action::Announce(_))
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Go(dir) => write!(f, "GO {}", dir.name().to_uppercase()),
            Action::GoTo(target) => write!(f, "GO TO {}", target),
            Action::Take(item) => write!(f, "TAKE {}", item),
            Action::Look(None) => f.write_str("LOOK"),
            Action::Look(Some(LookTarget::Direction(dir))) => {
                write!(f, "LOOK {}", dir.name().to_uppercase())
            }
            Action::Look(Some(LookTarget::Name(name))) => write!(f, "LOOK {}", name),
            Action::Speak(text) => write!(f, "SPEAK {}", text),
            Action::Announce(text) => write!(f, "ANNOUNCE {}", text),
            Action::Wait => f.write_str("WAIT"),
            Action::Invalid(_) => f.write_str("INVALID"),
        }
    }
}

/// 投递回执：收件人与距离（仅 SPEAK 记录距离）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub agent: AgentId,
    pub distance: Option<u32>,
}

/// 结果载荷：每种行动一种形状
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResultPayload {
    Moved { from: Position, to: Position },
    /// GO TO：已走出第一步，剩余路径点数
    Traveling { from: Position, to: Position, remaining: usize },
    Taken { item: String },
    Described { description: String },
    Delivered { recipients: Vec<Recipient> },
    Waited,
    /// 未执行（INVALID / 耗尽重试后的强制 WAIT）
    Rejected,
}

/// 行动执行结果
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    pub message: String,
    pub payload: ResultPayload,
}

impl ActionResult {
    pub fn ok(message: impl Into<String>, payload: ResultPayload) -> Self {
        Self {
            success: true,
            message: message.into(),
            payload,
        }
    }

    pub fn failed(message: impl Into<String>, payload: ResultPayload) -> Self {
        Self {
            success: false,
            message: message.into(),
            payload,
        }
    }

    /// 新位置（仅移动类结果）
    pub fn new_position(&self) -> Option<Position> {
        match &self.payload {
            ResultPayload::Moved { to, .. } | ResultPayload::Traveling { to, .. } => Some(*to),
            _ => None,
        }
    }
}

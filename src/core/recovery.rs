//! 错误恢复引擎
//!
//! 根据 TurnError 类型返回 RecoveryAction，供回合循环决定反馈文本以及是否消耗重试。

use crate::core::{ActionError, OracleError, RecoveryAction, TurnError};

/// 语法提示：解析失败与传输失败时附在反馈中
pub const GRAMMAR_HINT: &str = "Reply with exactly one line of the form `Action: <command>` where <command> is one of: \
GO <NORTH|SOUTH|EAST|WEST>, GO TO <place or thing>, TAKE <item>, LOOK [direction or name], \
SPEAK <text>, ANNOUNCE <text>, WAIT.";

/// 语义化错误恢复：将错误映射为反馈提示
#[derive(Debug, Default)]
pub struct RecoveryEngine;

impl RecoveryEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, err: &TurnError) -> RecoveryAction {
        match err {
            TurnError::Action(ActionError::InvalidSyntax(raw)) => {
                let preview: String = raw.chars().take(120).collect();
                RecoveryAction::RetryWithPrompt(format!(
                    "Could not understand your reply: \"{preview}\". {GRAMMAR_HINT}"
                ))
            }
            TurnError::Action(e @ ActionError::AlreadySpoken) => {
                RecoveryAction::RemindWithPrompt(e.to_string())
            }
            TurnError::Action(e @ ActionError::NothingInView(_)) => {
                RecoveryAction::RemindWithPrompt(e.to_string())
            }
            TurnError::Action(e) => RecoveryAction::RetryWithPrompt(e.to_string()),
            TurnError::Oracle(OracleError::Timeout(limit)) => RecoveryAction::RetryWithPrompt(
                format!("Your previous decision took longer than {limit:?} and was discarded. {GRAMMAR_HINT}"),
            ),
            TurnError::Oracle(e) => {
                RecoveryAction::RetryWithPrompt(format!("{e}. {GRAMMAR_HINT}"))
            }
        }
    }
}

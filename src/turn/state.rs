//! TurnState：单个 Agent 单个回合的显式状态机
//!
//! ACTIVE -> ENDED（终态）。
//! - 免费行动：记入 free_action_log；本回合已发言时再次发言在执行前被拒绝（不消耗重试、不修改世界）
//! - 回合结束类行动执行成功：记录最终行动，进入 ENDED
//! - 失败：反馈写入下一次 Oracle 上下文；RetryWithPrompt 消耗一次重试
//! - 重试耗尽：合成 WAIT，标记失败但结束

use serde::Serialize;

use crate::action::{Action, ActionCost, ActionResult, ResultPayload};
use crate::core::{ActionError, RecoveryAction};
use crate::world::AgentId;

/// 默认重试预算
pub const DEFAULT_RETRY_BUDGET: u8 = 3;
/// 默认每回合免费行动上限
pub const DEFAULT_MAX_FREE_ACTIONS: usize = 5;

/// 一次免费行动记录
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FreeActionRecord {
    pub action: Action,
    pub success: bool,
    pub message: String,
}

/// 回合结束时的结果
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TurnOutcome {
    pub final_action: Action,
    /// final_action_success
    pub success: bool,
    /// 重试耗尽后的强制 WAIT
    pub forced: bool,
    /// 由路径续行完成（未查询 Oracle）
    pub via_path: bool,
    pub retries: u8,
    pub result: ActionResult,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum TurnPhase {
    Active,
    Ended(Box<TurnOutcome>),
}

#[derive(Clone, Debug)]
pub struct TurnState {
    agent: AgentId,
    turn: u64,
    has_spoken: bool,
    free_action_log: Vec<FreeActionRecord>,
    attempts: Vec<String>,
    retries: u8,
    retry_budget: u8,
    max_free_actions: usize,
    prior_error: Option<String>,
    phase: TurnPhase,
}

impl TurnState {
    pub fn new(agent: AgentId, turn: u64, retry_budget: u8, max_free_actions: usize) -> Self {
        Self {
            agent,
            turn,
            has_spoken: false,
            free_action_log: Vec::new(),
            attempts: Vec::new(),
            retries: 0,
            retry_budget: retry_budget.max(1),
            max_free_actions,
            prior_error: None,
            phase: TurnPhase::Active,
        }
    }

    pub fn agent(&self) -> &AgentId {
        &self.agent
    }

    pub fn turn(&self) -> u64 {
        self.turn
    }

    pub fn has_spoken(&self) -> bool {
        self.has_spoken
    }

    pub fn retries(&self) -> u8 {
        self.retries
    }

    pub fn free_action_log(&self) -> &[FreeActionRecord] {
        &self.free_action_log
    }

    pub fn free_actions_left(&self) -> usize {
        self.max_free_actions.saturating_sub(self.free_action_log.len())
    }

    /// 本回合已尝试的内容（"what was tried"）
    pub fn attempts(&self) -> &[String] {
        &self.attempts
    }

    /// 上一次失败的反馈，拼入下一次 Oracle 上下文
    pub fn prior_error(&self) -> Option<&str> {
        self.prior_error.as_deref()
    }

    pub fn is_ended(&self) -> bool {
        matches!(self.phase, TurnPhase::Ended(_))
    }

    pub fn outcome(&self) -> Option<&TurnOutcome> {
        match &self.phase {
            TurnPhase::Ended(outcome) => Some(outcome),
            TurnPhase::Active => None,
        }
    }

    pub fn into_outcome(self) -> Option<TurnOutcome> {
        match self.phase {
            TurnPhase::Ended(outcome) => Some(*outcome),
            TurnPhase::Active => None,
        }
    }

    /// 执行前的准入检查：返回行动代价，或拒绝原因
    ///
    /// 重复发言会记入 free_action_log 后被拒绝；免费行动超过上限时拒绝且不记录。
    pub fn admit(&mut self, action: &Action) -> Result<ActionCost, ActionError> {
        let cost = ActionCost::of(action);
        if cost.is_free() {
            if self.free_action_log.len() >= self.max_free_actions {
                return Err(ActionError::FreeActionsExhausted {
                    limit: self.max_free_actions,
                });
            }
            if action.is_speech() && self.has_spoken {
                let err = ActionError::AlreadySpoken;
                self.free_action_log.push(FreeActionRecord {
                    action: action.clone(),
                    success: false,
                    message: err.to_string(),
                });
                return Err(err);
            }
        }
        Ok(cost)
    }

    /// 记录已执行的免费行动（成功或失败），回合保持 ACTIVE；失败信息作为下一次反馈，不消耗重试
    pub fn record_free(&mut self, action: &Action, success: bool, message: impl Into<String>) {
        let message = message.into();
        if success && action.is_speech() {
            self.has_spoken = true;
        }
        self.attempts.push(format!("{} -> {}", action, message));
        self.free_action_log.push(FreeActionRecord {
            action: action.clone(),
            success,
            message: message.clone(),
        });
        self.prior_error = if success { None } else { Some(message) };
    }

    /// 回合结束类行动执行成功
    pub fn complete(&mut self, action: Action, result: ActionResult) {
        self.end(action, result, false, false);
    }

    /// 路径续行结束本回合（成功前进或受阻）
    pub fn complete_via_path(&mut self, action: Action, result: ActionResult) {
        self.end(action, result, false, true);
    }

    /// 失败反馈：根据恢复动作决定是否消耗重试；耗尽时强制 WAIT
    pub fn fail(&mut self, attempt: impl Into<String>, recovery: RecoveryAction) {
        if self.is_ended() {
            return;
        }
        self.attempts.push(attempt.into());
        if recovery.consumes_retry() {
            self.retries = self.retries.saturating_add(1);
        }
        self.prior_error = Some(recovery.prompt().to_string());
        if self.retries >= self.retry_budget {
            let result = ActionResult::failed(
                format!(
                    "No valid action after {} attempts; you wait this turn.",
                    self.retries
                ),
                ResultPayload::Rejected,
            );
            self.end(Action::Wait, result, true, false);
        }
    }

    fn end(&mut self, action: Action, result: ActionResult, forced: bool, via_path: bool) {
        if self.is_ended() {
            return;
        }
        let success = result.success && !forced;
        self.phase = TurnPhase::Ended(Box::new(TurnOutcome {
            final_action: action,
            success,
            forced,
            via_path,
            retries: self.retries,
            result,
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RecoveryEngine;
    use crate::core::TurnError;
    use crate::world::Direction;

    fn state() -> TurnState {
        TurnState::new(AgentId::from("alice"), 1, DEFAULT_RETRY_BUDGET, DEFAULT_MAX_FREE_ACTIONS)
    }

    fn retry(msg: &str) -> RecoveryAction {
        RecoveryAction::RetryWithPrompt(msg.to_string())
    }

    #[test]
    fn test_second_speech_rejected_without_retry() {
        let mut st = state();
        let hello = Action::Speak("Hello".into());
        assert_eq!(st.admit(&hello), Ok(ActionCost::Free));
        st.record_free(&hello, true, "said");
        assert!(st.has_spoken());

        let again = Action::Announce("Again".into());
        assert_eq!(st.admit(&again), Err(ActionError::AlreadySpoken));
        let recovery = RecoveryEngine::new().handle(&TurnError::Action(ActionError::AlreadySpoken));
        st.fail("ANNOUNCE Again -> rejected", recovery);
        assert_eq!(st.retries(), 0);
        assert_eq!(st.free_action_log().len(), 2);
        assert!(!st.is_ended());
    }

    #[test]
    fn test_turn_ending_success_ends_turn() {
        let mut st = state();
        let go = Action::Go(Direction::North);
        assert_eq!(st.admit(&go), Ok(ActionCost::TurnEnding));
        st.complete(go.clone(), ActionResult::ok("moved", ResultPayload::Waited));
        let outcome = st.outcome().unwrap();
        assert_eq!(outcome.final_action, go);
        assert!(outcome.success);
        assert!(!outcome.forced);
        assert_eq!(outcome.retries, 0);
    }

    #[test]
    fn test_exhaustion_forces_wait() {
        let mut st = state();
        st.fail("a", retry("bad 1"));
        st.fail("b", retry("bad 2"));
        assert!(!st.is_ended());
        assert_eq!(st.prior_error(), Some("bad 2"));
        st.fail("c", retry("bad 3"));
        assert!(st.is_ended());

        let outcome = st.into_outcome().unwrap();
        assert_eq!(outcome.final_action, Action::Wait);
        assert!(!outcome.success);
        assert!(outcome.forced);
        assert_eq!(outcome.retries, 3);
    }

    #[test]
    fn test_ended_is_terminal() {
        let mut st = state();
        st.complete(Action::Wait, ActionResult::ok("wait", ResultPayload::Waited));
        st.fail("late", retry("late"));
        st.complete(Action::Go(Direction::East), ActionResult::ok("moved", ResultPayload::Waited));
        assert_eq!(st.outcome().unwrap().final_action, Action::Wait);
        assert!(st.attempts().is_empty());
    }

    #[test]
    fn test_free_action_cap() {
        let mut st = TurnState::new(AgentId::from("alice"), 1, 3, 2);
        let look = Action::Look(None);
        for _ in 0..2 {
            assert!(st.admit(&look).is_ok());
            st.record_free(&look, true, "room");
        }
        assert_eq!(st.admit(&look), Err(ActionError::FreeActionsExhausted { limit: 2 }));
        // 回合结束类行动不受上限影响
        assert!(st.admit(&Action::Wait).is_ok());
    }

    #[test]
    fn test_failed_free_action_is_feedback_only() {
        let mut st = state();
        let look = Action::Look(Some(crate::action::LookTarget::Name("ghost".into())));
        st.record_free(&look, false, "You do not see ghost.");
        assert_eq!(st.prior_error(), Some("You do not see ghost."));
        assert_eq!(st.retries(), 0);
        assert_eq!(st.free_actions_left(), DEFAULT_MAX_FREE_ACTIONS - 1);
        st.record_free(&Action::Look(None), true, "room");
        assert!(st.prior_error().is_none());
    }
}

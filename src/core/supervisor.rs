//! 运行监管：停止条件与 Ctrl+C
//!
//! 停止条件只在每一轮（所有 Agent 各行动一次）结束后检查，不会在回合中途取消。

use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;

/// 停止原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// 用户 Ctrl+C 或调用方主动取消
    Cancelled,
    /// 达到回合上限
    TurnLimit(u64),
}

/// 运行级生命周期管理：取消令牌 + 回合上限
#[derive(Debug)]
pub struct RunSupervisor {
    cancel_token: CancellationToken,
    max_turns: Option<u64>,
    reason: Mutex<Option<StopReason>>,
}

impl RunSupervisor {
    pub fn new(max_turns: Option<u64>) -> Self {
        Self {
            cancel_token: CancellationToken::new(),
            max_turns,
            reason: Mutex::new(None),
        }
    }

    /// 请求停止；当前这一轮会完整跑完
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    pub fn max_turns(&self) -> Option<u64> {
        self.max_turns
    }

    /// 安装 Ctrl+C 处理器
    pub fn install_ctrl_c(self: &Arc<Self>) {
        let supervisor = Arc::clone(self);
        tokio::spawn(async move {
            if let Ok(()) = tokio::signal::ctrl_c().await {
                tracing::info!("Received Ctrl+C, stopping after the current pass...");
                supervisor.cancel();
            }
        });
    }

    /// completed_turns 为已完成的轮数；返回 true 时记录停止原因
    pub fn should_stop(&self, completed_turns: u64) -> bool {
        let reason = if self.cancel_token.is_cancelled() {
            Some(StopReason::Cancelled)
        } else {
            self.max_turns
                .filter(|max| completed_turns >= *max)
                .map(StopReason::TurnLimit)
        };
        let stop = reason.is_some();
        if let (Some(reason), Ok(mut slot)) = (reason, self.reason.lock()) {
            slot.get_or_insert(reason);
        }
        stop
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        self.reason.lock().ok().and_then(|r| r.clone())
    }
}

impl Default for RunSupervisor {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_limit() {
        let sup = RunSupervisor::new(Some(2));
        assert_eq!(sup.max_turns(), Some(2));
        assert!(!sup.should_stop(1));
        assert!(sup.should_stop(2));
        assert_eq!(sup.stop_reason(), Some(StopReason::TurnLimit(2)));
    }

    #[test]
    fn test_cancel_wins() {
        let sup = RunSupervisor::default();
        assert!(!sup.should_stop(100));
        sup.cancel();
        assert!(sup.should_stop(0));
        assert_eq!(sup.stop_reason(), Some(StopReason::Cancelled));
    }
}

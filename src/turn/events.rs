//! 回放事件：ReplayObserver 接口与可序列化的 TurnEvent
//!
//! 观察者是 fire-and-forget：返回的错误只记录日志，编排器不会因此阻塞或失败。

use serde::Serialize;
use tokio::sync::mpsc;

use crate::core::ObserverError;
use crate::memory::SpeechMessage;
use crate::turn::state::{FreeActionRecord, TurnOutcome};
use crate::world::AgentId;

/// 单条回放事件（可序列化为 JSON 供外部记录）
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnEvent {
    /// 一次免费行动（含被拒绝的重复发言）
    FreeAction {
        agent: AgentId,
        turn: u64,
        record: FreeActionRecord,
    },
    /// 回合结束
    TurnEnd {
        agent: AgentId,
        turn: u64,
        outcome: TurnOutcome,
    },
    /// 一条消息投递到某个收件人
    Message {
        recipient: AgentId,
        message: SpeechMessage,
    },
}

/// 回放观察者
pub trait ReplayObserver: Send + Sync {
    fn on_free_action(
        &self,
        agent: &AgentId,
        turn: u64,
        record: &FreeActionRecord,
    ) -> Result<(), ObserverError>;

    fn on_turn_end(
        &self,
        agent: &AgentId,
        turn: u64,
        outcome: &TurnOutcome,
    ) -> Result<(), ObserverError>;

    fn on_message(&self, recipient: &AgentId, message: &SpeechMessage) -> Result<(), ObserverError>;
}

/// 将事件转发到 mpsc 通道（消费端可写文件、推送前端等）
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<TurnEvent>,
}

impl ChannelObserver {
    pub fn new(tx: mpsc::UnboundedSender<TurnEvent>) -> Self {
        Self { tx }
    }

    /// 创建观察者与接收端
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<TurnEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    fn send(&self, ev: TurnEvent) -> Result<(), ObserverError> {
        self.tx
            .send(ev)
            .map_err(|_| ObserverError("replay channel closed".to_string()))
    }
}

impl ReplayObserver for ChannelObserver {
    fn on_free_action(
        &self,
        agent: &AgentId,
        turn: u64,
        record: &FreeActionRecord,
    ) -> Result<(), ObserverError> {
        self.send(TurnEvent::FreeAction {
            agent: agent.clone(),
            turn,
            record: record.clone(),
        })
    }

    fn on_turn_end(
        &self,
        agent: &AgentId,
        turn: u64,
        outcome: &TurnOutcome,
    ) -> Result<(), ObserverError> {
        self.send(TurnEvent::TurnEnd {
            agent: agent.clone(),
            turn,
            outcome: outcome.clone(),
        })
    }

    fn on_message(&self, recipient: &AgentId, message: &SpeechMessage) -> Result<(), ObserverError> {
        self.send(TurnEvent::Message {
            recipient: recipient.clone(),
            message: message.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;

    #[test]
    fn test_channel_observer_forwards_and_reports_closed() {
        let (observer, mut rx) = ChannelObserver::channel();
        let record = FreeActionRecord {
            action: Action::Look(None),
            success: true,
            message: "a room".into(),
        };
        observer
            .on_free_action(&AgentId::from("alice"), 2, &record)
            .unwrap();
        match rx.try_recv().unwrap() {
            TurnEvent::FreeAction { agent, turn, .. } => {
                assert_eq!(agent, AgentId::from("alice"));
                assert_eq!(turn, 2);
            }
            other => panic!("unexpected event {:?}", other),
        }

        drop(rx);
        assert!(observer
            .on_free_action(&AgentId::from("alice"), 3, &record)
            .is_err());
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let ev = TurnEvent::Message {
            recipient: AgentId::from("bob"),
            message: SpeechMessage {
                sender: AgentId::from("alice"),
                content: "hi".into(),
                channel: crate::memory::Channel::Speak,
                turn: 1,
                distance: Some(2),
            },
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "message");
        assert_eq!(json["message"]["channel"], "SPEAK");
    }
}

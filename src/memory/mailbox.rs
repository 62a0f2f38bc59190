//! 邮箱：每个 Agent 一个 FIFO 消息队列
//!
//! SPEAK / ANNOUNCE 在发送者回合内同步投递到收件人邮箱；收件人在自己的回合开始时 drain 一次。
//! 单线程模型下无需加锁；若并行化，需要对同一邮箱的投递与 drain 串行化。

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::world::AgentId;

/// 发言频道
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Channel {
    /// 近距离发言（曼哈顿距离内）
    Speak,
    /// 房间广播
    Announce,
}

/// 一条已投递的消息（创建后不可变）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechMessage {
    pub sender: AgentId,
    pub content: String,
    pub channel: Channel,
    pub turn: u64,
    /// 仅 SPEAK 记录
    pub distance: Option<u32>,
}

impl SpeechMessage {
    /// 渲染为 Oracle 可读的一行
    pub fn render(&self) -> String {
        match (self.channel, self.distance) {
            (Channel::Speak, Some(d)) => format!(
                "[turn {}] {} said ({} tiles away): \"{}\"",
                self.turn, self.sender, d, self.content
            ),
            (Channel::Speak, None) => {
                format!("[turn {}] {} said: \"{}\"", self.turn, self.sender, self.content)
            }
            (Channel::Announce, _) => format!(
                "[turn {}] {} announced to the room: \"{}\"",
                self.turn, self.sender, self.content
            ),
        }
    }
}

/// 单个 Agent 的邮箱
#[derive(Clone, Debug, Default)]
pub struct Mailbox {
    queue: VecDeque<SpeechMessage>,
}

impl Mailbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deposit(&mut self, msg: SpeechMessage) {
        self.queue.push_back(msg);
    }

    /// 取出全部消息（按投递顺序）
    pub fn drain(&mut self) -> Vec<SpeechMessage> {
        self.queue.drain(..).collect()
    }

    pub fn peek(&self) -> impl Iterator<Item = &SpeechMessage> {
        self.queue.iter()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// 所有 Agent 的邮箱，按 AgentId 索引；注入到执行器中作为显式的数据流
#[derive(Clone, Debug, Default)]
pub struct MailboxRegistry {
    boxes: HashMap<AgentId, Mailbox>,
}

impl MailboxRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deposit(&mut self, recipient: &AgentId, msg: SpeechMessage) {
        self.boxes.entry(recipient.clone()).or_default().deposit(msg);
    }

    pub fn drain(&mut self, agent: &AgentId) -> Vec<SpeechMessage> {
        self.boxes
            .get_mut(agent)
            .map(Mailbox::drain)
            .unwrap_or_default()
    }

    pub fn get(&self, agent: &AgentId) -> Option<&Mailbox> {
        self.boxes.get(agent)
    }

    pub fn pending(&self, agent: &AgentId) -> usize {
        self.boxes.get(agent).map_or(0, Mailbox::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(sender: &str, content: &str, turn: u64) -> SpeechMessage {
        SpeechMessage {
            sender: AgentId::from(sender),
            content: content.to_string(),
            channel: Channel::Speak,
            turn,
            distance: Some(2),
        }
    }

    #[test]
    fn test_fifo_drain_once() {
        let mut reg = MailboxRegistry::new();
        let bob = AgentId::from("bob");
        reg.deposit(&bob, msg("alice", "one", 1));
        reg.deposit(&bob, msg("carol", "two", 1));
        reg.deposit(&bob, msg("alice", "three", 2));
        assert_eq!(reg.pending(&bob), 3);

        let drained: Vec<String> = reg.drain(&bob).into_iter().map(|m| m.content).collect();
        assert_eq!(drained, vec!["one", "two", "three"]);
        assert!(reg.drain(&bob).is_empty());
    }

    #[test]
    fn test_drain_unknown_agent_is_empty() {
        let mut reg = MailboxRegistry::new();
        assert!(reg.drain(&AgentId::from("nobody")).is_empty());
    }

    #[test]
    fn test_render_includes_distance() {
        let line = msg("alice", "hi", 4).render();
        assert!(line.contains("alice"));
        assert!(line.contains("2 tiles away"));
    }
}

//! 对话记忆：LLM 消息类型与每个 Agent 的有限历史
//!
//! ConversationMemory 保留最近 N 条（收到的消息、已提交的行动），渲染为 Oracle 上下文的 conversation_history。

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// 消息角色（与 LLM API 一致）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    Assistant,
    System,
}

/// 发给 LLM 的单条消息
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// 历史条目
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub turn: u64,
    pub text: String,
}

/// 单个 Agent 的有限历史，超出容量时丢弃最旧条目
#[derive(Clone, Debug)]
pub struct ConversationMemory {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl ConversationMemory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, turn: u64, text: impl Into<String>) {
        self.entries.push_back(HistoryEntry {
            turn,
            text: text.into(),
        });
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// 渲染为 "[turn N] ..." 行
    pub fn lines(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|e| format!("[turn {}] {}", e.turn, e.text))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_prunes_oldest() {
        let mut mem = ConversationMemory::new(2);
        mem.push(1, "first");
        mem.push(2, "second");
        mem.push(3, "third");
        assert_eq!(mem.len(), 2);
        assert_eq!(mem.lines(), vec!["[turn 2] second", "[turn 3] third"]);
    }
}

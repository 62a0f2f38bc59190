//! OraclePort：外部决策服务接口
//!
//! 给定 Agent 与上下文（含上一次错误），返回一段原始决策文本；一个回合内可被多次调用。
//! 超时由编排器统一施加，实现方无需自行处理。

pub mod llm;
pub mod scripted;

use async_trait::async_trait;
use serde::Serialize;

use crate::core::OracleError;
use crate::world::AgentId;

pub use llm::LlmOracle;
pub use scripted::{Scripted, ScriptedOracle};

/// 每次查询时提供给 Oracle 的情境
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct OracleContext {
    pub turn: u64,
    pub location: String,
    pub available_actions: Vec<String>,
    /// 本回合开始时从邮箱取出的消息
    pub pending_messages: Vec<String>,
    pub points_of_interest: Vec<String>,
    pub prior_error: Option<String>,
    /// 本回合已尝试的行动及结果
    pub attempts: Vec<String>,
    pub conversation_history: Vec<String>,
}

impl OracleContext {
    /// 渲染为 Markdown 段落，作为 LLM 的 user 消息
    pub fn to_prompt(&self) -> String {
        let mut s = format!("## Turn {}\n\n## Location\n{}\n\n", self.turn, self.location);
        push_section(&mut s, "Points of interest", &self.points_of_interest);
        push_section(&mut s, "Messages received", &self.pending_messages);
        push_section(&mut s, "Recent history", &self.conversation_history);
        push_section(&mut s, "Tried this turn", &self.attempts);
        if let Some(err) = &self.prior_error {
            s.push_str(&format!("## Problem with your last reply\n{}\n\n", err));
        }
        push_section(&mut s, "Available actions", &self.available_actions);
        s.push_str("Think briefly, then finish with exactly one line: `Action: <command>`.");
        s
    }
}

fn push_section(out: &mut String, title: &str, lines: &[String]) {
    if lines.is_empty() {
        return;
    }
    out.push_str(&format!("## {}\n", title));
    for line in lines {
        out.push_str(&format!("- {}\n", line));
    }
    out.push('\n');
}

/// 决策 Oracle
#[async_trait]
pub trait OraclePort: Send + Sync {
    async fn query(&self, agent: &AgentId, context: &OracleContext) -> Result<String, OracleError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_skips_empty_sections() {
        let ctx = OracleContext {
            turn: 3,
            location: "Library (2, 2)".into(),
            available_actions: vec!["WAIT".into()],
            prior_error: Some("Cannot go north".into()),
            ..Default::default()
        };
        let prompt = ctx.to_prompt();
        assert!(prompt.contains("## Turn 3"));
        assert!(prompt.contains("Cannot go north"));
        assert!(prompt.contains("- WAIT"));
        assert!(!prompt.contains("Messages received"));
        assert!(!prompt.contains("Tried this turn"));
    }
}

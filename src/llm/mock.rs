//! Mock LLM 客户端（无需 API，用于本地演示）
//!
//! 本回合尚未尝试任何行动时先 LOOK；看过之后朝第一个开放方向 GO，没有开放方向则 WAIT。

use async_trait::async_trait;

use crate::llm::{LlmClient, LlmError};
use crate::memory::{Message, Role};

#[derive(Debug, Default)]
pub struct MockLlmClient;

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        let prompt = messages
            .iter()
            .rev()
            .find(|m| matches!(m.role, Role::User))
            .map(|m| m.content.as_str())
            .unwrap_or_default();

        if !prompt.contains("## Tried this turn") {
            return Ok("Thought: I should get my bearings first.\nAction: LOOK".to_string());
        }
        let open = prompt
            .lines()
            .filter_map(|l| l.split_once("Open: ").map(|(_, rest)| rest))
            .last()
            .and_then(|rest| rest.split([',', '.']).next())
            .map(|d| d.trim().to_uppercase());
        Ok(match open {
            Some(dir) if !dir.is_empty() => format!("Thought: that way looks clear.\nAction: GO {}", dir),
            _ => "Thought: nowhere to go.\nAction: WAIT".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_looks_then_moves() {
        let mock = MockLlmClient;
        let first = mock.complete(&[Message::user("## Location\nsomewhere")]).await.unwrap();
        assert!(first.ends_with("Action: LOOK"));

        let prompt = "## Tried this turn\n- LOOK -> You are here. Open: east, south.";
        let second = mock.complete(&[Message::user(prompt)]).await.unwrap();
        assert!(second.ends_with("Action: GO EAST"));
    }
}

//! LlmOracle：用 LLM 充当决策 Oracle
//!
//! 拼 system prompt + 渲染后的上下文，调用 LlmClient；客户端错误与空回复映射为 OracleError。

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::OracleError;
use crate::llm::LlmClient;
use crate::memory::Message;
use crate::oracle::{OracleContext, OraclePort};
use crate::world::AgentId;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are {agent}, an agent living in a shared grid world with other agents. \
Each turn you may LOOK around and SPEAK once for free, then you must commit exactly one turn-ending action \
(GO, GO TO, TAKE or WAIT). Every reply must end with a single line `Action: <command>`.";

pub struct LlmOracle {
    llm: Arc<dyn LlmClient>,
    system_prompt: String,
}

impl LlmOracle {
    /// system_prompt 中的 `{agent}` 会替换为当前 Agent 的标识
    pub fn new(llm: Arc<dyn LlmClient>, system_prompt: impl Into<String>) -> Self {
        Self {
            llm,
            system_prompt: system_prompt.into(),
        }
    }

    pub fn with_default_prompt(llm: Arc<dyn LlmClient>) -> Self {
        Self::new(llm, DEFAULT_SYSTEM_PROMPT)
    }

    pub fn token_usage(&self) -> (u64, u64, u64) {
        self.llm.token_usage()
    }

    fn messages(&self, agent: &AgentId, context: &OracleContext) -> Vec<Message> {
        vec![
            Message::system(self.system_prompt.replace("{agent}", agent.as_str())),
            Message::user(context.to_prompt()),
        ]
    }
}

#[async_trait]
impl OraclePort for LlmOracle {
    async fn query(&self, agent: &AgentId, context: &OracleContext) -> Result<String, OracleError> {
        let output = self
            .llm
            .complete(&self.messages(agent, context))
            .await
            .map_err(|e| OracleError::Transport(e.to_string()))?;
        if output.trim().is_empty() {
            return Err(OracleError::EmptyResponse);
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmError, MockLlmClient};

    struct FailingLlm;

    #[async_trait]
    impl LlmClient for FailingLlm {
        async fn complete(&self, _messages: &[Message]) -> Result<String, LlmError> {
            Err(LlmError::Api("rate limited".into()))
        }
    }

    #[tokio::test]
    async fn test_llm_oracle_returns_raw_text() {
        let oracle = LlmOracle::with_default_prompt(Arc::new(MockLlmClient));
        let out = oracle
            .query(&AgentId::from("alice"), &OracleContext::default())
            .await
            .unwrap();
        assert!(out.contains("Action: LOOK"));
    }

    #[tokio::test]
    async fn test_llm_errors_become_transport_errors() {
        let oracle = LlmOracle::with_default_prompt(Arc::new(FailingLlm));
        let err = oracle
            .query(&AgentId::from("alice"), &OracleContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, OracleError::Transport(msg) if msg.contains("rate limited")));
    }
}

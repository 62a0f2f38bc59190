//! ScriptedOracle：按脚本回放的 Oracle（测试用替身）
//!
//! 每个 Agent 一个响应队列，另有共享的默认队列；队列耗尽后返回 fallback（默认 `Action: WAIT`）。
//! 记录每次调用收到的上下文，便于断言调用次数与反馈内容。

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::core::OracleError;
use crate::oracle::{OracleContext, OraclePort};
use crate::world::AgentId;

/// 一条脚本响应
#[derive(Clone, Debug)]
pub enum Scripted {
    Reply(String),
    Fail(OracleError),
    /// 先睡眠再回复（用于触发编排器超时）
    Stall(Duration, String),
}

impl From<&str> for Scripted {
    fn from(s: &str) -> Self {
        Scripted::Reply(s.to_string())
    }
}

#[derive(Default)]
struct Script {
    shared: VecDeque<Scripted>,
    per_agent: HashMap<AgentId, VecDeque<Scripted>>,
    calls: Vec<(AgentId, OracleContext)>,
}

pub struct ScriptedOracle {
    script: Mutex<Script>,
    fallback: String,
}

impl Default for ScriptedOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(Script::default()),
            fallback: "Action: WAIT".to_string(),
        }
    }

    /// 任意 Agent 共用的响应
    pub fn with_replies<I, S>(self, replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Scripted>,
    {
        if let Ok(mut script) = self.script.lock() {
            script.shared.extend(replies.into_iter().map(Into::into));
        }
        self
    }

    /// 指定 Agent 的响应（优先于共享队列）
    pub fn for_agent<I, S>(self, agent: &str, replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Scripted>,
    {
        if let Ok(mut script) = self.script.lock() {
            script
                .per_agent
                .entry(AgentId::from(agent))
                .or_default()
                .extend(replies.into_iter().map(Into::into));
        }
        self
    }

    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = fallback.into();
        self
    }

    pub fn call_count(&self) -> usize {
        self.script.lock().map(|s| s.calls.len()).unwrap_or(0)
    }

    pub fn calls_for(&self, agent: &str) -> usize {
        let agent = AgentId::from(agent);
        self.script
            .lock()
            .map(|s| s.calls.iter().filter(|(a, _)| a == &agent).count())
            .unwrap_or(0)
    }

    /// 所有调用收到的上下文（按调用顺序）
    pub fn contexts(&self) -> Vec<(AgentId, OracleContext)> {
        self.script.lock().map(|s| s.calls.clone()).unwrap_or_default()
    }

    fn next(&self, agent: &AgentId, context: &OracleContext) -> Scripted {
        let Ok(mut script) = self.script.lock() else {
            return Scripted::Fail(OracleError::Transport("script poisoned".to_string()));
        };
        script.calls.push((agent.clone(), context.clone()));
        let own = script.per_agent.get_mut(agent).and_then(VecDeque::pop_front);
        own.or_else(|| script.shared.pop_front())
            .unwrap_or_else(|| Scripted::Reply(self.fallback.clone()))
    }
}

#[async_trait]
impl OraclePort for ScriptedOracle {
    async fn query(&self, agent: &AgentId, context: &OracleContext) -> Result<String, OracleError> {
        match self.next(agent, context) {
            Scripted::Reply(text) => Ok(text),
            Scripted::Fail(e) => Err(e),
            Scripted::Stall(delay, text) => {
                tokio::time::sleep(delay).await;
                Ok(text)
            }
        }
    }
}

//! 回合编排器：主控循环
//!
//! 每一轮按固定顺序让每个 Agent 行动一次。单个回合：
//! 取出邮箱 -> 尝试路径续行（不查询 Oracle）-> 否则进入 查询 -> 解析 -> 准入 -> 执行 的重试循环，
//! 直到 TurnState 进入 ENDED。回合内的任何错误都转为反馈，不会传播出回合。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::action::{
    parse_action, Action, ActionCost, ActionExecutor, ActionResult, ExecutionContext,
    ResultPayload,
};
use crate::config::AppConfig;
use crate::core::supervisor::{RunSupervisor, StopReason};
use crate::core::{ActionError, OracleError, RecoveryEngine, TurnError};
use crate::llm::{create_deepseek_client, LlmClient, MockLlmClient, OpenAiClient};
use crate::memory::{ConversationMemory, MailboxRegistry, SpeechMessage};
use crate::oracle::OraclePort;
use crate::turn::{
    build_context, Continuation, FreeActionRecord, PathStore, ReplayObserver, TurnOutcome,
    TurnState, DEFAULT_MAX_FREE_ACTIONS, DEFAULT_RETRY_BUDGET,
};
use crate::world::{AgentId, WorldPort};

/// 行动经济参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnConfig {
    pub retry_budget: u8,
    pub max_free_actions: usize,
    pub oracle_timeout: Duration,
    pub speak_radius: u32,
    pub look_range: u32,
    /// 每个 Agent 保留的历史条数
    pub max_history: usize,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            retry_budget: DEFAULT_RETRY_BUDGET,
            max_free_actions: DEFAULT_MAX_FREE_ACTIONS,
            oracle_timeout: Duration::from_secs(30),
            speak_radius: 4,
            look_range: 8,
            max_history: 20,
        }
    }
}

impl From<&AppConfig> for TurnConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            retry_budget: cfg.turn.retry_budget,
            max_free_actions: cfg.turn.max_free_actions,
            oracle_timeout: cfg.turn.oracle_timeout(),
            speak_radius: cfg.turn.speak_radius,
            look_range: cfg.turn.look_range,
            max_history: cfg.app.max_history,
        }
    }
}

/// 根据配置与环境变量选择 LLM 后端（DeepSeek / OpenAI 兼容 / Mock）
pub fn create_llm_from_config(cfg: &AppConfig) -> Arc<dyn LlmClient> {
    let provider = cfg.llm.provider.to_lowercase();
    let timeout = Duration::from_secs(cfg.llm.timeouts.request);
    let use_deepseek = std::env::var("DEEPSEEK_API_KEY").is_ok() && provider == "deepseek";
    let use_openai = std::env::var("OPENAI_API_KEY").is_ok() && provider != "mock";

    if use_deepseek {
        tracing::info!("Using DeepSeek LLM ({})", cfg.llm.model);
        Arc::new(create_deepseek_client(Some(&cfg.llm.model)).with_timeout(timeout))
    } else if use_openai {
        tracing::info!("Using OpenAI LLM ({})", cfg.llm.model);
        Arc::new(
            OpenAiClient::new(
                cfg.llm.base_url.as_deref(),
                &cfg.llm.model,
                std::env::var("OPENAI_API_KEY").ok().as_deref(),
            )
            .with_timeout(timeout),
        )
    } else {
        tracing::warn!("No API key set or provider is mock, using Mock LLM");
        Arc::new(MockLlmClient)
    }
}

/// 单个 Agent 单个回合的报告
#[derive(Debug, Clone)]
pub struct TurnReport {
    pub agent: AgentId,
    pub turn: u64,
    pub outcome: TurnOutcome,
    pub free_actions: Vec<FreeActionRecord>,
    pub oracle_calls: usize,
    /// 本回合开始时取出的消息
    pub received: Vec<SpeechMessage>,
}

/// 一轮（所有 Agent 各一回合）的报告
#[derive(Debug, Clone)]
pub struct PassReport {
    pub turn: u64,
    pub reports: Vec<TurnReport>,
}

/// 整次运行的汇总
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub passes: u64,
    pub agent_turns: usize,
    pub forced_waits: usize,
    pub oracle_calls: usize,
    pub stop_reason: Option<StopReason>,
}

/// 回合编排器：独占世界、邮箱与路径，`&mut self` 顺序驱动，无需加锁
pub struct TurnOrchestrator {
    run_id: Uuid,
    agents: Vec<AgentId>,
    world: Box<dyn WorldPort>,
    oracle: Arc<dyn OraclePort>,
    executor: ActionExecutor,
    recovery: RecoveryEngine,
    mailboxes: MailboxRegistry,
    paths: PathStore,
    memories: HashMap<AgentId, ConversationMemory>,
    observers: Vec<Arc<dyn ReplayObserver>>,
    config: TurnConfig,
    completed_passes: u64,
}

impl TurnOrchestrator {
    /// 回合顺序取自 `world.agent_ids()`，此后固定
    pub fn new(world: Box<dyn WorldPort>, oracle: Arc<dyn OraclePort>) -> Self {
        let agents = world.agent_ids();
        Self {
            run_id: Uuid::new_v4(),
            agents,
            world,
            oracle,
            executor: ActionExecutor::default(),
            recovery: RecoveryEngine::new(),
            mailboxes: MailboxRegistry::new(),
            paths: PathStore::new(),
            memories: HashMap::new(),
            observers: Vec::new(),
            config: TurnConfig::default(),
            completed_passes: 0,
        }
    }

    pub fn with_config(mut self, config: TurnConfig) -> Self {
        self.executor = ActionExecutor::new(config.speak_radius, config.look_range);
        self.config = config;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn ReplayObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn agents(&self) -> &[AgentId] {
        &self.agents
    }

    pub fn config(&self) -> &TurnConfig {
        &self.config
    }

    pub fn completed_passes(&self) -> u64 {
        self.completed_passes
    }

    pub fn world(&self) -> &dyn WorldPort {
        self.world.as_ref()
    }

    /// 回合之间修改世界（测试中模拟外部变化）
    pub fn world_mut(&mut self) -> &mut dyn WorldPort {
        self.world.as_mut()
    }

    pub fn mailboxes(&self) -> &MailboxRegistry {
        &self.mailboxes
    }

    pub fn paths(&self) -> &PathStore {
        &self.paths
    }

    pub fn paths_mut(&mut self) -> &mut PathStore {
        &mut self.paths
    }

    pub fn memory(&self, agent: &AgentId) -> Option<&ConversationMemory> {
        self.memories.get(agent)
    }

    /// 运行直到 supervisor 要求停止；停止条件只在每轮结束后检查
    pub async fn run(&mut self, supervisor: &RunSupervisor) -> RunSummary {
        let mut summary = RunSummary::default();
        tracing::info!(
            run_id = %self.run_id,
            agents = self.agents.len(),
            max_turns = ?supervisor.max_turns(),
            "run started"
        );
        while !supervisor.should_stop(self.completed_passes) {
            let pass = self.run_pass().await;
            summary.passes += 1;
            summary.agent_turns += pass.reports.len();
            summary.forced_waits += pass.reports.iter().filter(|r| r.outcome.forced).count();
            summary.oracle_calls += pass.reports.iter().map(|r| r.oracle_calls).sum::<usize>();
        }
        summary.stop_reason = supervisor.stop_reason();
        tracing::info!(
            run_id = %self.run_id,
            passes = summary.passes,
            forced_waits = summary.forced_waits,
            oracle_calls = summary.oracle_calls,
            reason = ?summary.stop_reason,
            "run finished"
        );
        summary
    }

    /// 所有 Agent 按固定顺序各行动一次
    pub async fn run_pass(&mut self) -> PassReport {
        let turn = self.completed_passes + 1;
        let order = self.agents.clone();
        let mut reports = Vec::with_capacity(order.len());
        for agent in &order {
            reports.push(self.run_turn(agent, turn).await);
        }
        self.completed_passes = turn;
        tracing::info!(
            turn,
            agents = reports.len(),
            moved = reports.iter().filter(|r| r.outcome.success).count(),
            "pass complete"
        );
        PassReport { turn, reports }
    }

    /// 单个 Agent 的一个回合；总能结束
    pub async fn run_turn(&mut self, agent: &AgentId, turn: u64) -> TurnReport {
        let received = self.mailboxes.drain(agent);
        let mut state = TurnState::new(
            agent.clone(),
            turn,
            self.config.retry_budget,
            self.config.max_free_actions,
        );
        let mut oracle_calls = 0;

        if let Some(note) = self.continue_path(agent, &mut state) {
            self.remember(agent, turn, note);
        }

        let outcome = loop {
            if let Some(outcome) = state.outcome() {
                break outcome.clone();
            }
            oracle_calls += 1;
            self.attempt(&mut state, &received).await;
        };

        if outcome.forced {
            tracing::warn!(
                agent = %agent,
                turn,
                retries = outcome.retries,
                "retry budget exhausted, forcing WAIT"
            );
        } else {
            tracing::info!(
                agent = %agent,
                turn,
                action = %outcome.final_action,
                success = outcome.success,
                via_path = outcome.via_path,
                retries = outcome.retries,
                "turn ended"
            );
        }
        self.notify(|o| o.on_turn_end(agent, turn, &outcome));

        for msg in &received {
            self.remember(agent, turn, format!("heard {}: \"{}\"", msg.sender, msg.content));
        }
        for record in state.free_action_log().iter().filter(|r| r.success && r.action.is_speech()) {
            self.remember(agent, turn, format!("{}", record.action));
        }
        self.remember(
            agent,
            turn,
            format!("{} -> {}", outcome.final_action, outcome.result.message),
        );

        TurnReport {
            agent: agent.clone(),
            turn,
            outcome,
            free_actions: state.free_action_log().to_vec(),
            oracle_calls,
            received,
        }
    }

    /// 路径续行：成功前进、到达或受阻都会结束回合；中断则清除路径并返回一条记忆
    fn continue_path(&mut self, agent: &AgentId, state: &mut TurnState) -> Option<String> {
        let target = self.paths.get(agent).map(|p| p.target().to_string())?;
        let action = Action::GoTo(target.clone());
        match self.paths.continue_path(self.world.as_mut(), agent) {
            Continuation::Idle => None,
            Continuation::Interrupted { appeared, vanished } => {
                tracing::warn!(
                    agent = %agent,
                    target = %target,
                    appeared = appeared.len(),
                    vanished = vanished.len(),
                    "path interrupted"
                );
                Some(format!(
                    "Stopped travelling toward the {}: something in view changed.",
                    target
                ))
            }
            Continuation::Stepped { from, to, remaining } => {
                state.complete_via_path(
                    action,
                    ActionResult::ok(
                        format!(
                            "You continue toward the {}: moved to {}, {} steps remain.",
                            target, to, remaining
                        ),
                        ResultPayload::Traveling { from, to, remaining },
                    ),
                );
                None
            }
            Continuation::Arrived { from, to } => {
                state.complete_via_path(
                    action,
                    ActionResult::ok(
                        format!("You arrived at the {} ({}).", target, to),
                        ResultPayload::Moved { from, to },
                    ),
                );
                None
            }
            Continuation::Blocked { reason } => {
                tracing::warn!(agent = %agent, target = %target, reason = %reason, "path blocked");
                state.complete_via_path(
                    action,
                    ActionResult::failed(
                        format!("Your route to the {} is blocked: {}", target, reason),
                        ResultPayload::Rejected,
                    ),
                );
                None
            }
        }
    }

    /// 重试循环的一次迭代：查询 Oracle（带超时）、解析、准入、执行
    async fn attempt(&mut self, state: &mut TurnState, received: &[SpeechMessage]) {
        let agent = state.agent().clone();
        let context = build_context(
            self.world.as_ref(),
            state,
            received,
            self.memories.get(&agent),
        );
        let limit = self.config.oracle_timeout;
        let reply = match tokio::time::timeout(limit, self.oracle.query(&agent, &context)).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => return self.fail(state, "no decision".to_string(), e.into()),
            Err(_) => {
                return self.fail(state, "no decision".to_string(), OracleError::Timeout(limit).into())
            }
        };
        tracing::debug!(agent = %agent, turn = state.turn(), reply = %reply, "oracle reply");

        let action = parse_action(&reply);
        if let Action::Invalid(raw) = &action {
            let err = ActionError::InvalidSyntax(raw.clone());
            return self.fail(state, format!("{} -> {}", action, err), err.into());
        }

        match state.admit(&action) {
            Err(e) => {
                // 重复发言已记入 free_action_log
                if e == ActionError::AlreadySpoken {
                    if let Some(record) = state.free_action_log().last().cloned() {
                        self.notify(|o| o.on_free_action(&agent, state.turn(), &record));
                    }
                }
                self.fail(state, format!("{} -> {}", action, e), e.into());
            }
            Ok(ActionCost::Free) => {
                let executed = self.execute(&agent, state.turn(), &action);
                let (success, message) = match &executed {
                    Ok(result) => (true, result.message.clone()),
                    Err(e) => (false, e.to_string()),
                };
                state.record_free(&action, success, message);
                if let Some(record) = state.free_action_log().last().cloned() {
                    self.notify(|o| o.on_free_action(&agent, state.turn(), &record));
                }
                if let Ok(ActionResult {
                    payload: ResultPayload::Delivered { recipients },
                    ..
                }) = &executed
                {
                    for recipient in recipients {
                        let delivered = self
                            .mailboxes
                            .get(&recipient.agent)
                            .and_then(|m| m.peek().last())
                            .cloned();
                        if let Some(msg) = delivered {
                            self.notify(|o| o.on_message(&recipient.agent, &msg));
                        }
                    }
                }
            }
            Ok(ActionCost::TurnEnding) => match self.execute(&agent, state.turn(), &action) {
                Ok(result) => state.complete(action, result),
                Err(e) => self.fail(state, format!("{} -> {}", action, e), e.into()),
            },
        }
    }

    fn execute(&mut self, agent: &AgentId, turn: u64, action: &Action) -> Result<ActionResult, ActionError> {
        let mut ctx = ExecutionContext {
            agent,
            turn,
            world: self.world.as_mut(),
            mailboxes: &mut self.mailboxes,
            paths: &mut self.paths,
        };
        self.executor.execute(&mut ctx, action)
    }

    fn fail(&self, state: &mut TurnState, attempt: String, err: TurnError) {
        tracing::debug!(agent = %state.agent(), turn = state.turn(), error = %err, "attempt failed");
        let recovery = self.recovery.handle(&err);
        state.fail(attempt, recovery);
    }

    fn remember(&mut self, agent: &AgentId, turn: u64, text: String) {
        let capacity = self.config.max_history;
        self.memories
            .entry(agent.clone())
            .or_insert_with(|| ConversationMemory::new(capacity))
            .push(turn, text);
    }

    /// 观察者失败只记录日志
    fn notify<F>(&self, f: F)
    where
        F: Fn(&dyn ReplayObserver) -> Result<(), crate::core::ObserverError>,
    {
        for observer in &self.observers {
            if let Err(e) = f(observer.as_ref()) {
                tracing::warn!(run_id = %self.run_id, error = %e, "replay observer failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::ScriptedOracle;
    use crate::world::{GridWorld, Position};

    fn corridor() -> Box<dyn WorldPort> {
        Box::new(
            GridWorld::builder(&["#######", "#.....#", "#######"])
                .room("hall", "Hall", Position::new(1, 1), Position::new(5, 1))
                .agent("alice", Position::new(1, 1))
                .build(),
        )
    }

    #[tokio::test]
    async fn test_single_move_ends_turn() {
        let oracle = Arc::new(ScriptedOracle::new().with_replies(["Action: GO EAST"]));
        let mut orch = TurnOrchestrator::new(corridor(), oracle.clone());
        let pass = orch.run_pass().await;
        assert_eq!(pass.turn, 1);
        assert_eq!(pass.reports.len(), 1);
        let report = &pass.reports[0];
        assert!(report.outcome.success);
        assert_eq!(report.oracle_calls, 1);
        assert_eq!(
            orch.world().query_position(&AgentId::from("alice")),
            Some(Position::new(2, 1))
        );
        assert_eq!(orch.completed_passes(), 1);
    }

    #[tokio::test]
    async fn test_wall_bump_feeds_back_and_retries() {
        let oracle = Arc::new(
            ScriptedOracle::new().with_replies(["Action: GO NORTH", "Action: GO EAST"]),
        );
        let mut orch = TurnOrchestrator::new(corridor(), oracle.clone());
        let report = orch.run_pass().await.reports.remove(0);
        assert!(report.outcome.success);
        assert_eq!(report.outcome.retries, 1);
        let contexts = oracle.contexts();
        assert_eq!(contexts.len(), 2);
        assert!(contexts[1].1.prior_error.as_deref().is_some_and(|e| e.contains("north")));
    }

    #[tokio::test]
    async fn test_run_stops_at_turn_limit() {
        let oracle = Arc::new(ScriptedOracle::new());
        let mut orch = TurnOrchestrator::new(corridor(), oracle.clone());
        let summary = orch.run(&RunSupervisor::new(Some(3))).await;
        assert_eq!(summary.passes, 3);
        assert_eq!(summary.agent_turns, 3);
        assert_eq!(summary.stop_reason, Some(StopReason::TurnLimit(3)));
        assert_eq!(oracle.call_count(), 3);
    }
}

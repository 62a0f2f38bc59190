//! 多步路径：PathState 与按 Agent 存储的 PathStore
//!
//! 规划成功时记录路径点与指纹（当时视野内的实体集合）。每个回合在查询 Oracle 之前尝试续行：
//! 指纹变化（有实体出现或消失）则中断并清除；否则重新校验下一格后移动一步，走完即清除。
//! 续行过程中的任何移动失败都会清除路径并报告受阻。

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use crate::action::executor::step_agent;
use crate::core::ActionError;
use crate::world::{AgentId, Direction, EntityId, Position, WorldPort};

/// 单个 Agent 的持久路径；不变量：index <= waypoints.len()
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathState {
    target: String,
    waypoints: Vec<Position>,
    index: usize,
    fingerprint: BTreeSet<EntityId>,
}

impl PathState {
    pub fn new(
        target: impl Into<String>,
        waypoints: Vec<Position>,
        fingerprint: BTreeSet<EntityId>,
    ) -> Self {
        Self {
            target: target.into(),
            waypoints,
            index: 0,
            fingerprint,
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn peek(&self) -> Option<Position> {
        self.waypoints.get(self.index).copied()
    }

    pub fn advance(&mut self) {
        self.index = (self.index + 1).min(self.waypoints.len());
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn remaining(&self) -> usize {
        self.waypoints.len() - self.index
    }

    pub fn is_complete(&self) -> bool {
        self.index >= self.waypoints.len()
    }

    pub fn fingerprint(&self) -> &BTreeSet<EntityId> {
        &self.fingerprint
    }
}

/// 一次续行尝试的结果
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Continuation {
    /// 没有进行中的路径
    Idle,
    /// 视野内实体变化，路径已清除，需正常查询 Oracle
    Interrupted {
        appeared: Vec<EntityId>,
        vanished: Vec<EntityId>,
    },
    /// 前进一步，路径仍有剩余
    Stepped {
        from: Position,
        to: Position,
        remaining: usize,
    },
    /// 走完最后一步，路径已清除
    Arrived { from: Position, to: Position },
    /// 下一格不可走或被占用，路径已清除
    Blocked { reason: String },
}

/// 所有 Agent 的路径
#[derive(Clone, Debug, Default)]
pub struct PathStore {
    paths: HashMap<AgentId, PathState>,
}

impl PathStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 规划 agent 到 destination 的路线并保存；返回路径点数
    ///
    /// 终点站着其他 Agent 时停在其前一格。
    pub fn plan(
        &mut self,
        world: &dyn WorldPort,
        agent: &AgentId,
        target: &str,
        destination: Position,
    ) -> Result<usize, ActionError> {
        let from = world
            .query_position(agent)
            .ok_or_else(|| ActionError::NotPlaced(agent.clone()))?;
        let mut waypoints = world
            .find_path(from, destination)
            .ok_or_else(|| ActionError::NoRoute(target.to_string()))?;
        if world.is_occupied(destination).is_some_and(|other| &other != agent) {
            waypoints.pop();
        }
        if waypoints.is_empty() {
            return Err(ActionError::AlreadyThere(target.to_string()));
        }
        let len = waypoints.len();
        let fingerprint = world.visible_entities(agent);
        self.store(agent, PathState::new(target, waypoints, fingerprint));
        Ok(len)
    }

    pub fn store(&mut self, agent: &AgentId, state: PathState) {
        if state.is_complete() {
            self.paths.remove(agent);
        } else {
            self.paths.insert(agent.clone(), state);
        }
    }

    pub fn get(&self, agent: &AgentId) -> Option<&PathState> {
        self.paths.get(agent)
    }

    pub fn clear(&mut self, agent: &AgentId) -> Option<PathState> {
        self.paths.remove(agent)
    }

    pub fn is_active(&self, agent: &AgentId) -> bool {
        self.paths.get(agent).is_some_and(|p| !p.is_complete())
    }

    /// 以当前视野重新记录指纹
    pub fn refresh_fingerprint(&mut self, world: &dyn WorldPort, agent: &AgentId) {
        if let Some(state) = self.paths.get_mut(agent) {
            state.fingerprint = world.visible_entities(agent);
        }
    }

    /// 沿路径走一步，不比较指纹；失败或走完时清除路径
    pub fn step(
        &mut self,
        world: &mut dyn WorldPort,
        agent: &AgentId,
    ) -> Result<Continuation, ActionError> {
        let Some(state) = self.paths.get_mut(agent) else {
            return Ok(Continuation::Idle);
        };
        let target = state.target().to_string();
        let moved = match (world.query_position(agent), state.peek()) {
            (None, _) => Err(ActionError::NotPlaced(agent.clone())),
            (Some(from), Some(next)) => match Direction::between(from, next) {
                Some(dir) => step_agent(world, agent, dir),
                None => Err(ActionError::NoRoute(target)),
            },
            (Some(_), None) => Err(ActionError::NoRoute(target)),
        };
        let (from, to) = match moved {
            Ok(step) => step,
            Err(e) => {
                self.paths.remove(agent);
                return Err(e);
            }
        };

        state.advance();
        if state.is_complete() {
            self.paths.remove(agent);
            Ok(Continuation::Arrived { from, to })
        } else {
            Ok(Continuation::Stepped {
                from,
                to,
                remaining: state.remaining(),
            })
        }
    }

    /// 续行一步（从不查询 Oracle）
    pub fn continue_path(&mut self, world: &mut dyn WorldPort, agent: &AgentId) -> Continuation {
        let Some(state) = self.paths.get(agent) else {
            return Continuation::Idle;
        };
        if state.is_complete() {
            self.paths.remove(agent);
            return Continuation::Idle;
        }

        let current = world.visible_entities(agent);
        if &current != state.fingerprint() {
            let appeared = current.difference(state.fingerprint()).cloned().collect();
            let vanished = state.fingerprint().difference(&current).cloned().collect();
            self.paths.remove(agent);
            return Continuation::Interrupted { appeared, vanished };
        }

        self.step(world, agent).unwrap_or_else(|e| Continuation::Blocked {
            reason: e.to_string(),
        })
    }
}

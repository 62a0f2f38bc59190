//! 构建每次查询 Oracle 的上下文
//!
//! 位置描述复用 LOOK 的概览文本；兴趣点为视野内的 Agent、物体与门（含距离和方位）。

use crate::action::survey;
use crate::memory::{ConversationMemory, SpeechMessage};
use crate::oracle::OracleContext;
use crate::turn::state::TurnState;
use crate::world::{AgentId, WorldPort};

const TURN_ENDING_ACTIONS: [&str; 4] = [
    "GO <NORTH|SOUTH|EAST|WEST>",
    "GO TO <place or thing>",
    "TAKE <item>",
    "WAIT",
];

/// 当前回合仍可用的行动：已发言则不再列出 SPEAK/ANNOUNCE，免费行动用尽则只剩回合结束类
pub fn available_actions(state: &TurnState) -> Vec<String> {
    let mut out = Vec::new();
    if state.free_actions_left() > 0 {
        out.push("LOOK [direction or name] (free)".to_string());
        if !state.has_spoken() {
            out.push("SPEAK <text> (free, once per turn, nearby agents hear it)".to_string());
            out.push("ANNOUNCE <text> (free, once per turn, everyone in the room hears it)".to_string());
        }
    }
    out.extend(TURN_ENDING_ACTIONS.iter().map(|a| a.to_string()));
    out
}

/// 视野内的兴趣点
pub fn points_of_interest(world: &dyn WorldPort, agent: &AgentId) -> Vec<String> {
    let Some(pos) = world.query_position(agent) else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for other in world.agent_ids() {
        if &other == agent {
            continue;
        }
        if let Some(p) = world.query_position(&other) {
            if world.is_in_fov(agent, p) {
                out.push(format!(
                    "agent {}: {} step(s) {}",
                    other,
                    pos.manhattan(p),
                    pos.compass(p)
                ));
            }
        }
    }
    for obj in world.all_objects() {
        if world.is_in_fov(agent, obj.position) {
            let mut line = format!(
                "{}: {} step(s) {}",
                obj.name,
                pos.manhattan(obj.position),
                pos.compass(obj.position)
            );
            if !obj.affordances.is_empty() {
                line.push_str(&format!(" [{}]", obj.affordances.join(", ")));
            }
            out.push(line);
        }
    }
    for door in world.doors() {
        if world.is_in_fov(agent, door.position) {
            out.push(format!(
                "{}{}: {} step(s) {}",
                if door.locked { "locked " } else { "" },
                door.name,
                pos.manhattan(door.position),
                pos.compass(door.position)
            ));
        }
    }
    out
}

/// 汇总世界、回合状态、本回合收到的消息与历史记忆
pub fn build_context(
    world: &dyn WorldPort,
    state: &TurnState,
    delivered: &[SpeechMessage],
    memory: Option<&ConversationMemory>,
) -> OracleContext {
    let agent = state.agent();
    let location = survey(world, agent).unwrap_or_else(|e| e.to_string());
    OracleContext {
        turn: state.turn(),
        location,
        available_actions: available_actions(state),
        pending_messages: delivered.iter().map(SpeechMessage::render).collect(),
        points_of_interest: points_of_interest(world, agent),
        prior_error: state.prior_error().map(str::to_string),
        attempts: state.attempts().to_vec(),
        conversation_history: memory.map(ConversationMemory::lines).unwrap_or_default(),
    }
}

//! Colony 演示入口
//!
//! 初始化日志与配置，搭建一个小型网格世界，由 LLM（无 API Key 时为 Mock）驱动三个 Agent，
//! 回放事件输出到日志，Ctrl+C 或达到回合上限后停止。

use std::sync::Arc;

use anyhow::Context;
use colony::config::{load_config, AppConfig};
use colony::core::{create_llm_from_config, RunSupervisor, TurnConfig, TurnOrchestrator};
use colony::oracle::LlmOracle;
use colony::turn::ChannelObserver;
use colony::world::{GridWorld, Position, WorldObject};

const DEMO_MAP: [&str; 9] = [
    "#############",
    "#.....#.....#",
    "#.....#.....#",
    "#.....+.....#",
    "#.....#.....#",
    "###+#####L###",
    "#...........#",
    "#...........#",
    "#############",
];

fn demo_world() -> GridWorld {
    GridWorld::builder(&DEMO_MAP)
        .room("library", "Library", Position::new(1, 1), Position::new(5, 4))
        .room("workshop", "Workshop", Position::new(7, 1), Position::new(11, 4))
        .room("hall", "Great Hall", Position::new(1, 6), Position::new(11, 7))
        .door_name(Position::new(6, 3), "oak door")
        .door_name(Position::new(9, 5), "iron gate")
        .object(
            WorldObject::new("key-1", "brass key", Position::new(2, 2))
                .with_affordances(&["take"])
                .with_description("A small brass key with a worn bow."),
        )
        .object(
            WorldObject::new("lamp-1", "oil lamp", Position::new(10, 2))
                .with_affordances(&["take", "light"]),
        )
        .object(
            WorldObject::new("table-1", "long table", Position::new(6, 7))
                .with_description("A heavy table that nobody could lift."),
        )
        .agent("ada", Position::new(1, 1))
        .agent("bram", Position::new(8, 2))
        .agent("cleo", Position::new(4, 6))
        .build()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    colony::observability::init();

    let cfg = load_config(None).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        AppConfig::default()
    });

    let llm = create_llm_from_config(&cfg);
    let oracle = Arc::new(LlmOracle::with_default_prompt(llm));

    let (observer, mut events) = ChannelObserver::channel();
    let logger = tokio::spawn(async move {
        while let Some(ev) = events.recv().await {
            match serde_json::to_string(&ev) {
                Ok(line) => tracing::info!(target: "replay", "{}", line),
                Err(e) => tracing::warn!("Failed to serialize replay event: {}", e),
            }
        }
    });

    let supervisor = Arc::new(RunSupervisor::new(Some(cfg.turn.max_turns)));
    supervisor.install_ctrl_c();

    let mut orchestrator = TurnOrchestrator::new(Box::new(demo_world()), oracle.clone())
        .with_config(TurnConfig::from(&cfg))
        .with_observer(Arc::new(observer));
    tracing::info!(
        run_id = %orchestrator.run_id(),
        name = cfg.app.name.as_deref().unwrap_or("colony"),
        "colony starting"
    );

    let summary = orchestrator.run(&supervisor).await;
    let (prompt_tokens, completion_tokens, total_tokens) = oracle.token_usage();
    tracing::info!(
        passes = summary.passes,
        agent_turns = summary.agent_turns,
        forced_waits = summary.forced_waits,
        prompt_tokens,
        completion_tokens,
        total_tokens,
        "colony stopped"
    );

    drop(orchestrator);
    logger.await.context("Replay logger task failed")?;
    Ok(())
}

//! Colony - 由 LLM Oracle 驱动的多 Agent 回合编排与行动经济引擎
//!
//! 模块划分：
//! - **action**: 行动类型、解析器、代价表、模糊匹配与执行器
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误与恢复、运行监管、回合编排器
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）
//! - **memory**: 邮箱与每个 Agent 的历史记忆
//! - **oracle**: 决策 Oracle 接口（LLM 实现与脚本实现）
//! - **turn**: 回合状态机、多步路径、上下文构建与回放事件
//! - **world**: 世界接口与内存网格世界

pub mod action;
pub mod config;
pub mod core;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod oracle;
pub mod turn;
pub mod world;

pub use crate::core::{RunSupervisor, TurnConfig, TurnOrchestrator};

//! 核心编排层：错误与恢复、运行监管、回合编排

pub mod error;
pub mod orchestrator;
pub mod recovery;
pub mod supervisor;

pub use error::{ActionError, ObserverError, OracleError, RecoveryAction, TurnError};
pub use orchestrator::{
    create_llm_from_config, PassReport, RunSummary, TurnConfig, TurnOrchestrator, TurnReport,
};
pub use recovery::{RecoveryEngine, GRAMMAR_HINT};
pub use supervisor::{RunSupervisor, StopReason};

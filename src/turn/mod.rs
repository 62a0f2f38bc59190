//! 回合层：回合状态机、多步路径、上下文构建与回放事件

pub mod context;
pub mod events;
pub mod path;
pub mod state;

pub use context::{available_actions, build_context, points_of_interest};
pub use events::{ChannelObserver, ReplayObserver, TurnEvent};
pub use path::{Continuation, PathState, PathStore};
pub use state::{
    FreeActionRecord, TurnOutcome, TurnState, DEFAULT_MAX_FREE_ACTIONS, DEFAULT_RETRY_BUDGET,
};

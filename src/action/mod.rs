//! 行动层：类型、解析、代价表、模糊匹配与执行器

pub mod cost;
pub mod executor;
pub mod fuzzy;
pub mod parser;
pub mod types;

pub use cost::ActionCost;
pub use executor::{survey, ActionExecutor, ExecutionContext};
pub use parser::parse_action;
pub use types::{Action, ActionKind, ActionResult, LookTarget, Recipient, ResultPayload};

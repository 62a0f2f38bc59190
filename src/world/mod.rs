//! 世界层：基础类型、WorldPort 协作接口与内存网格实现（测试与演示用）

pub mod grid;
pub mod port;
pub mod types;

pub use grid::{GridWorld, GridWorldBuilder};
pub use port::{WorldError, WorldPort};
pub use types::{AgentId, Direction, Door, EntityId, Position, RoomId, Tile, WorldObject};

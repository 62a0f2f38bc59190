//! WorldPort：空间引擎协作接口
//!
//! 位置、占用、可行走、视野（FOV）、房间、物体与寻路查询由外部空间引擎提供；
//! 编排器只通过该 trait 访问世界。所有读方法必须无副作用，保证路径中断判定在同一世界快照下可复现。

use std::collections::BTreeSet;

use thiserror::Error;

use crate::world::{AgentId, Door, EntityId, Position, RoomId, Tile, WorldObject};

/// 世界写操作错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorldError {
    #[error("Unknown agent: {0}")]
    UnknownAgent(AgentId),

    #[error("Position {0} is outside the map")]
    OutOfBounds(Position),
}

/// 空间引擎接口（同步；编排器单线程顺序调用）
pub trait WorldPort: Send {
    /// 世界中所有 Agent，顺序固定
    fn agent_ids(&self) -> Vec<AgentId>;

    fn query_position(&self, agent: &AgentId) -> Option<Position>;

    fn set_position(&mut self, agent: &AgentId, pos: Position) -> Result<(), WorldError>;

    fn in_bounds(&self, pos: Position) -> bool;

    fn tile_at(&self, pos: Position) -> Tile;

    fn is_walkable(&self, pos: Position) -> bool {
        self.in_bounds(pos) && self.tile_at(pos).is_walkable()
    }

    fn is_occupied(&self, pos: Position) -> Option<AgentId>;

    /// viewer 当前是否能看到 pos
    fn is_in_fov(&self, viewer: &AgentId, pos: Position) -> bool;

    fn room_at(&self, pos: Position) -> Option<RoomId>;

    fn room_name(&self, room: &RoomId) -> Option<String>;

    fn room_ids(&self) -> Vec<RoomId>;

    /// 房间内第一个可行走格（GO TO 房间名时的目标点）
    fn room_anchor(&self, room: &RoomId) -> Option<Position>;

    fn objects_in_room(&self, room: &RoomId) -> Vec<WorldObject>;

    /// 移除物体（TAKE 成功后调用）
    fn remove_object(&mut self, object_id: &str) -> Option<WorldObject>;

    fn doors(&self) -> Vec<Door>;

    /// 寻路：返回不含起点的路径点序列；不可达返回 None
    fn find_path(&self, from: Position, to: Position) -> Option<Vec<Position>>;

    /// 世界中所有物体（按房间顺序展开）
    fn all_objects(&self) -> Vec<WorldObject> {
        self.room_ids()
            .iter()
            .flat_map(|room| self.objects_in_room(room))
            .collect()
    }

    /// viewer 视野内的实体集合（其他 Agent 与物体），用作路径指纹
    fn visible_entities(&self, viewer: &AgentId) -> BTreeSet<EntityId> {
        let mut seen = BTreeSet::new();
        for other in self.agent_ids() {
            if &other == viewer {
                continue;
            }
            if let Some(pos) = self.query_position(&other) {
                if self.is_in_fov(viewer, pos) {
                    seen.insert(EntityId::Agent(other));
                }
            }
        }
        for obj in self.all_objects() {
            if self.is_in_fov(viewer, obj.position) {
                seen.insert(EntityId::Object(obj.id));
            }
        }
        seen
    }
}

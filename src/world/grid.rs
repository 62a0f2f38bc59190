//! 内存网格世界：WorldPort 的参考实现
//!
//! 地图由调用方以 ASCII 行给出：`#` 墙、`.` 地面、`+` 门、`L` 上锁的门、空格为地图外。
//! 视野为 Chebyshev 半径内且 Bresenham 视线不被墙/锁门遮挡；寻路为四邻接 BFS（忽略占用，执行前再校验）。

use std::collections::{HashMap, VecDeque};

use crate::world::{
    AgentId, Direction, Door, Position, RoomId, Tile, WorldError, WorldObject, WorldPort,
};

const DEFAULT_VIEW_RADIUS: u32 = 8;

#[derive(Clone, Debug)]
struct Room {
    id: RoomId,
    name: String,
    min: Position,
    max: Position,
}

impl Room {
    fn contains(&self, pos: Position) -> bool {
        pos.x >= self.min.x && pos.x <= self.max.x && pos.y >= self.min.y && pos.y <= self.max.y
    }
}

/// 网格世界
#[derive(Clone, Debug)]
pub struct GridWorld {
    width: i32,
    height: i32,
    tiles: Vec<Tile>,
    rooms: Vec<Room>,
    doors: Vec<Door>,
    objects: Vec<WorldObject>,
    /// 保持插入顺序：agent_ids 的顺序即回合顺序
    agents: Vec<(AgentId, Position)>,
    view_radius: u32,
}

impl GridWorld {
    pub fn builder(rows: &[&str]) -> GridWorldBuilder {
        GridWorldBuilder::new(rows)
    }

    fn index(&self, pos: Position) -> Option<usize> {
        if pos.x < 0 || pos.y < 0 || pos.x >= self.width || pos.y >= self.height {
            return None;
        }
        Some((pos.y * self.width + pos.x) as usize)
    }

    /// 修改地块（测试中模拟世界在回合之间的变化）
    pub fn set_tile(&mut self, pos: Position, tile: Tile) {
        if let Some(i) = self.index(pos) {
            self.tiles[i] = tile;
        }
        if let Tile::Door { locked } = tile {
            if let Some(door) = self.doors.iter_mut().find(|d| d.position == pos) {
                door.locked = locked;
            }
        }
    }

    pub fn place_object(&mut self, object: WorldObject) {
        self.objects.push(object);
    }

    pub fn add_agent(&mut self, id: impl Into<String>, pos: Position) {
        self.agents.push((AgentId(id.into()), pos));
    }

    fn line_of_sight(&self, from: Position, to: Position) -> bool {
        // Bresenham：只检查中间格，终点本身可以是墙
        let (mut x, mut y) = (from.x, from.y);
        let dx = (to.x - from.x).abs();
        let dy = -(to.y - from.y).abs();
        let sx = if from.x < to.x { 1 } else { -1 };
        let sy = if from.y < to.y { 1 } else { -1 };
        let mut err = dx + dy;
        loop {
            if x == to.x && y == to.y {
                return true;
            }
            let p = Position::new(x, y);
            if p != from && self.tile_at(p).is_opaque() {
                return false;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }
}

impl WorldPort for GridWorld {
    fn agent_ids(&self) -> Vec<AgentId> {
        self.agents.iter().map(|(id, _)| id.clone()).collect()
    }

    fn query_position(&self, agent: &AgentId) -> Option<Position> {
        self.agents
            .iter()
            .find(|(id, _)| id == agent)
            .map(|(_, pos)| *pos)
    }

    fn set_position(&mut self, agent: &AgentId, pos: Position) -> Result<(), WorldError> {
        if !self.in_bounds(pos) {
            return Err(WorldError::OutOfBounds(pos));
        }
        let slot = self
            .agents
            .iter_mut()
            .find(|(id, _)| id == agent)
            .ok_or_else(|| WorldError::UnknownAgent(agent.clone()))?;
        slot.1 = pos;
        Ok(())
    }

    fn in_bounds(&self, pos: Position) -> bool {
        self.index(pos).is_some() && self.tile_at(pos) != Tile::Void
    }

    fn tile_at(&self, pos: Position) -> Tile {
        self.index(pos).map(|i| self.tiles[i]).unwrap_or(Tile::Void)
    }

    fn is_occupied(&self, pos: Position) -> Option<AgentId> {
        self.agents
            .iter()
            .find(|(_, p)| *p == pos)
            .map(|(id, _)| id.clone())
    }

    fn is_in_fov(&self, viewer: &AgentId, pos: Position) -> bool {
        let Some(origin) = self.query_position(viewer) else {
            return false;
        };
        if !self.in_bounds(pos) || origin.chebyshev(pos) > self.view_radius {
            return false;
        }
        self.line_of_sight(origin, pos)
    }

    fn room_at(&self, pos: Position) -> Option<RoomId> {
        self.rooms
            .iter()
            .find(|r| r.contains(pos))
            .map(|r| r.id.clone())
    }

    fn room_name(&self, room: &RoomId) -> Option<String> {
        self.rooms
            .iter()
            .find(|r| &r.id == room)
            .map(|r| r.name.clone())
    }

    fn room_ids(&self) -> Vec<RoomId> {
        self.rooms.iter().map(|r| r.id.clone()).collect()
    }

    fn room_anchor(&self, room: &RoomId) -> Option<Position> {
        let room = self.rooms.iter().find(|r| &r.id == room)?;
        (room.min.y..=room.max.y)
            .flat_map(|y| (room.min.x..=room.max.x).map(move |x| Position::new(x, y)))
            .find(|p| self.is_walkable(*p))
    }

    fn objects_in_room(&self, room: &RoomId) -> Vec<WorldObject> {
        let Some(room) = self.rooms.iter().find(|r| &r.id == room) else {
            return Vec::new();
        };
        self.objects
            .iter()
            .filter(|o| room.contains(o.position))
            .cloned()
            .collect()
    }

    fn remove_object(&mut self, object_id: &str) -> Option<WorldObject> {
        let idx = self.objects.iter().position(|o| o.id == object_id)?;
        Some(self.objects.remove(idx))
    }

    fn doors(&self) -> Vec<Door> {
        self.doors.clone()
    }

    fn find_path(&self, from: Position, to: Position) -> Option<Vec<Position>> {
        if from == to {
            return Some(Vec::new());
        }
        if !self.is_walkable(to) {
            return None;
        }
        let mut came_from: HashMap<Position, Position> = HashMap::new();
        let mut queue = VecDeque::from([from]);
        came_from.insert(from, from);
        while let Some(cur) = queue.pop_front() {
            if cur == to {
                let mut path = vec![cur];
                let mut node = cur;
                while let Some(&prev) = came_from.get(&node) {
                    if prev == from {
                        break;
                    }
                    path.push(prev);
                    node = prev;
                }
                path.reverse();
                return Some(path);
            }
            for dir in Direction::ALL {
                let next = cur.step(dir);
                if self.is_walkable(next) && !came_from.contains_key(&next) {
                    came_from.insert(next, cur);
                    queue.push_back(next);
                }
            }
        }
        None
    }

    fn all_objects(&self) -> Vec<WorldObject> {
        self.objects.clone()
    }
}

/// GridWorld 构建器
pub struct GridWorldBuilder {
    rows: Vec<String>,
    rooms: Vec<Room>,
    door_names: Vec<(Position, String)>,
    objects: Vec<WorldObject>,
    agents: Vec<(AgentId, Position)>,
    view_radius: u32,
}

impl GridWorldBuilder {
    pub fn new(rows: &[&str]) -> Self {
        Self {
            rows: rows.iter().map(|r| r.to_string()).collect(),
            rooms: Vec::new(),
            door_names: Vec::new(),
            objects: Vec::new(),
            agents: Vec::new(),
            view_radius: DEFAULT_VIEW_RADIUS,
        }
    }

    /// 声明矩形房间（闭区间）
    pub fn room(
        mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        min: Position,
        max: Position,
    ) -> Self {
        self.rooms.push(Room {
            id: RoomId(id.into()),
            name: name.into(),
            min,
            max,
        });
        self
    }

    pub fn door_name(mut self, pos: Position, name: impl Into<String>) -> Self {
        self.door_names.push((pos, name.into()));
        self
    }

    pub fn object(mut self, object: WorldObject) -> Self {
        self.objects.push(object);
        self
    }

    pub fn agent(mut self, id: impl Into<String>, pos: Position) -> Self {
        self.agents.push((AgentId(id.into()), pos));
        self
    }

    pub fn view_radius(mut self, radius: u32) -> Self {
        self.view_radius = radius;
        self
    }

    pub fn build(self) -> GridWorld {
        let height = self.rows.len() as i32;
        let width = self.rows.iter().map(|r| r.chars().count()).max().unwrap_or(0) as i32;
        let mut tiles = vec![Tile::Void; (width * height) as usize];
        let mut doors = Vec::new();
        for (y, row) in self.rows.iter().enumerate() {
            for (x, ch) in row.chars().enumerate() {
                let pos = Position::new(x as i32, y as i32);
                let tile = match ch {
                    '#' => Tile::Wall,
                    '+' => Tile::Door { locked: false },
                    'L' => Tile::Door { locked: true },
                    ' ' => Tile::Void,
                    _ => Tile::Floor,
                };
                if let Tile::Door { locked } = tile {
                    let name = self
                        .door_names
                        .iter()
                        .find(|(p, _)| *p == pos)
                        .map(|(_, n)| n.clone())
                        .unwrap_or_else(|| "door".to_string());
                    doors.push(Door {
                        id: format!("door-{}-{}", pos.x, pos.y),
                        name,
                        position: pos,
                        locked,
                    });
                }
                tiles[y * width as usize + x] = tile;
            }
        }
        GridWorld {
            width,
            height,
            tiles,
            rooms: self.rooms,
            doors,
            objects: self.objects,
            agents: self.agents,
            view_radius: self.view_radius,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::EntityId;

    fn two_rooms() -> GridWorld {
        GridWorld::builder(&[
            "#########",
            "#...#...#",
            "#...+...#",
            "#...#...#",
            "#########",
        ])
        .room("west", "Library", Position::new(1, 1), Position::new(3, 3))
        .room("east", "Kitchen", Position::new(5, 1), Position::new(7, 3))
        .object(WorldObject::new("o1", "kettle", Position::new(6, 2)).with_affordances(&["take"]))
        .agent("alice", Position::new(1, 1))
        .agent("bob", Position::new(7, 3))
        .build()
    }

    #[test]
    fn test_walls_and_doors() {
        let w = two_rooms();
        assert!(!w.is_walkable(Position::new(0, 0)));
        assert!(w.is_walkable(Position::new(4, 2)));
        assert!(!w.in_bounds(Position::new(20, 2)));
        assert_eq!(w.doors().len(), 1);
    }

    #[test]
    fn test_rooms_and_objects() {
        let w = two_rooms();
        let east = w.room_at(Position::new(6, 2)).unwrap();
        assert_eq!(w.room_name(&east).as_deref(), Some("Kitchen"));
        assert_eq!(w.objects_in_room(&east).len(), 1);
        assert_eq!(w.room_anchor(&east), Some(Position::new(5, 1)));
        assert_eq!(w.room_at(Position::new(4, 2)), None);
    }

    #[test]
    fn test_find_path_through_door() {
        let w = two_rooms();
        let path = w.find_path(Position::new(1, 2), Position::new(6, 2)).unwrap();
        assert_eq!(path.len(), 5);
        assert_eq!(path.last(), Some(&Position::new(6, 2)));
        assert!(!path.contains(&Position::new(1, 2)));
    }

    #[test]
    fn test_locked_door_blocks_path_and_sight() {
        let mut w = two_rooms();
        w.set_tile(Position::new(4, 2), Tile::Door { locked: true });
        assert!(w.find_path(Position::new(1, 2), Position::new(6, 2)).is_none());
        assert!(w.doors()[0].locked);
        let alice = AgentId::from("alice");
        assert!(!w.is_in_fov(&alice, Position::new(6, 2)));
    }

    #[test]
    fn test_fov_respects_walls() {
        let w = two_rooms();
        let alice = AgentId::from("alice");
        assert!(w.is_in_fov(&alice, Position::new(3, 3)));
        // 墙本身可见，墙后不可见
        assert!(w.is_in_fov(&alice, Position::new(4, 1)));
        assert!(!w.is_in_fov(&alice, Position::new(6, 1)));
        // 透过敞开的门能看到隔壁
        let seen = w.visible_entities(&alice);
        assert!(seen.contains(&EntityId::Agent(AgentId::from("bob"))));
        assert!(!seen.contains(&EntityId::Agent(alice.clone())));
    }
}

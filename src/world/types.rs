//! 世界基础类型：坐标、方向、地块、物体、门、标识符
//!
//! 约定：北为 y - 1，南为 y + 1，东为 x + 1，西为 x - 1。

use std::fmt;

use serde::{Deserialize, Serialize};

/// Agent 标识（运行期内唯一）
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(pub String);

impl AgentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AgentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// 房间标识
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RoomId(pub String);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 可见实体标识：其他 Agent 或世界物体（路径指纹的元素）
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityId {
    Agent(AgentId),
    Object(String),
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Agent(id) => write!(f, "agent:{}", id),
            EntityId::Object(id) => write!(f, "object:{}", id),
        }
    }
}

/// 网格坐标
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn step(self, dir: Direction) -> Self {
        let (dx, dy) = dir.delta();
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn manhattan(self, other: Position) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    pub fn chebyshev(self, other: Position) -> u32 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }

    /// 从 self 看向 other 的八方位描述（如 "north-east"）；同一格返回 "here"
    pub fn compass(self, other: Position) -> &'static str {
        let dx = (other.x - self.x).signum();
        let dy = (other.y - self.y).signum();
        match (dx, dy) {
            (0, 0) => "here",
            (0, -1) => "north",
            (0, 1) => "south",
            (1, 0) => "east",
            (-1, 0) => "west",
            (1, -1) => "north-east",
            (-1, -1) => "north-west",
            (1, 1) => "south-east",
            _ => "south-west",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// 四个基本方向
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    pub const fn delta(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::South => (0, 1),
            Direction::East => (1, 0),
            Direction::West => (-1, 0),
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::South => "south",
            Direction::East => "east",
            Direction::West => "west",
        }
    }

    /// 解析方向词（大小写不敏感，支持缩写 N/S/E/W）
    pub fn parse(word: &str) -> Option<Self> {
        match word.trim().to_ascii_lowercase().as_str() {
            "north" | "n" => Some(Direction::North),
            "south" | "s" => Some(Direction::South),
            "east" | "e" => Some(Direction::East),
            "west" | "w" => Some(Direction::West),
            _ => None,
        }
    }

    /// 从相邻两格推出方向；不相邻时返回 None
    pub fn between(from: Position, to: Position) -> Option<Self> {
        match (to.x - from.x, to.y - from.y) {
            (0, -1) => Some(Direction::North),
            (0, 1) => Some(Direction::South),
            (1, 0) => Some(Direction::East),
            (-1, 0) => Some(Direction::West),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 地块类型
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tile {
    Floor,
    Wall,
    Door { locked: bool },
    /// 地图之外
    Void,
}

impl Tile {
    pub fn is_walkable(self) -> bool {
        matches!(self, Tile::Floor | Tile::Door { locked: false })
    }

    /// 是否遮挡视线（墙与上锁的门）
    pub fn is_opaque(self) -> bool {
        matches!(self, Tile::Wall | Tile::Door { locked: true } | Tile::Void)
    }
}

/// 世界中的物体（由空间引擎提供）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldObject {
    pub id: String,
    pub name: String,
    pub position: Position,
    pub affordances: Vec<String>,
    pub description: String,
}

impl WorldObject {
    pub fn new(id: impl Into<String>, name: impl Into<String>, position: Position) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            position,
            affordances: Vec::new(),
            description: String::new(),
        }
    }

    pub fn with_affordances(mut self, affordances: &[&str]) -> Self {
        self.affordances = affordances.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn is_takeable(&self) -> bool {
        self.affordances
            .iter()
            .any(|a| a.eq_ignore_ascii_case("take") || a.eq_ignore_ascii_case("takeable"))
    }
}

/// 门
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Door {
    pub id: String,
    pub name: String,
    pub position: Position,
    pub locked: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_north_decreases_y() {
        assert_eq!(Position::new(5, 5).step(Direction::North), Position::new(5, 4));
        assert_eq!(Position::new(5, 5).step(Direction::East), Position::new(6, 5));
    }

    #[test]
    fn test_distances_and_compass() {
        let a = Position::new(0, 0);
        let b = Position::new(3, -2);
        assert_eq!(a.manhattan(b), 5);
        assert_eq!(a.chebyshev(b), 3);
        assert_eq!(a.compass(b), "north-east");
        assert_eq!(a.compass(a), "here");
    }

    #[test]
    fn test_direction_parse() {
        assert_eq!(Direction::parse("NoRtH"), Some(Direction::North));
        assert_eq!(Direction::parse("w"), Some(Direction::West));
        assert_eq!(Direction::parse("up"), None);
    }

    #[test]
    fn test_takeable_affordance() {
        let lamp = WorldObject::new("o1", "lamp", Position::new(1, 1)).with_affordances(&["Take"]);
        let table = WorldObject::new("o2", "table", Position::new(1, 1)).with_affordances(&["sit"]);
        assert!(lamp.is_takeable());
        assert!(!table.is_takeable());
    }
}

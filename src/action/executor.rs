//! ActionExecutor：Action + WorldPort + 邮箱 + 路径 -> ActionResult
//!
//! 每个行动在修改世界前完成全部校验（不存在半步移动）；失败返回 ActionError，不修改任何状态。
//! 每次执行输出一条结构化审计日志（JSON）。

use std::time::Instant;

use crate::action::fuzzy::best_match;
use crate::action::{Action, ActionResult, LookTarget, Recipient, ResultPayload};
use crate::core::ActionError;
use crate::memory::{Channel, MailboxRegistry, SpeechMessage};
use crate::turn::path::{Continuation, PathStore};
use crate::world::{AgentId, Direction, Position, Tile, WorldPort};

/// 执行一次行动所需的可变上下文（显式注入，而非全局表）
pub struct ExecutionContext<'a> {
    pub agent: &'a AgentId,
    pub turn: u64,
    pub world: &'a mut dyn WorldPort,
    pub mailboxes: &'a mut MailboxRegistry,
    pub paths: &'a mut PathStore,
}

/// 行动执行器：持有发言半径与视线扫描距离
#[derive(Debug, Clone)]
pub struct ActionExecutor {
    speak_radius: u32,
    look_range: u32,
}

impl Default for ActionExecutor {
    fn default() -> Self {
        Self::new(4, 8)
    }
}

/// GO TO 的候选目的地
struct Destination {
    label: String,
    position: Position,
}

impl ActionExecutor {
    pub fn new(speak_radius: u32, look_range: u32) -> Self {
        Self {
            speak_radius,
            look_range: look_range.max(1),
        }
    }

    pub fn execute(
        &self,
        ctx: &mut ExecutionContext<'_>,
        action: &Action,
    ) -> Result<ActionResult, ActionError> {
        let start = Instant::now();
        let result = match action {
            Action::Go(dir) => self.go(ctx, *dir),
            Action::GoTo(target) => self.go_to(ctx, target),
            Action::Take(item) => self.take(ctx, item),
            Action::Look(None) => self.look_around(ctx),
            Action::Look(Some(LookTarget::Direction(dir))) => self.look_direction(ctx, *dir),
            Action::Look(Some(LookTarget::Name(name))) => self.look_at(ctx, name),
            Action::Speak(text) => self.speak(ctx, text),
            Action::Announce(text) => self.announce(ctx, text),
            Action::Wait => Ok(ActionResult::ok("You wait.", ResultPayload::Waited)),
            Action::Invalid(raw) => Err(ActionError::InvalidSyntax(raw.clone())),
        };

        let (ok, outcome) = match &result {
            Ok(_) => (true, "ok".to_string()),
            Err(e) => (false, e.to_string()),
        };
        let audit = serde_json::json!({
            "event": "action_audit",
            "agent": ctx.agent.as_str(),
            "turn": ctx.turn,
            "action": action.to_string(),
            "ok": ok,
            "outcome": outcome,
            "duration_us": start.elapsed().as_micros() as u64,
        });
        tracing::debug!(audit = %audit, "action");
        result
    }

    fn position(ctx: &ExecutionContext<'_>) -> Result<Position, ActionError> {
        ctx.world
            .query_position(ctx.agent)
            .ok_or_else(|| ActionError::NotPlaced(ctx.agent.clone()))
    }

    fn go(&self, ctx: &mut ExecutionContext<'_>, dir: Direction) -> Result<ActionResult, ActionError> {
        let (from, to) = step_agent(ctx.world, ctx.agent, dir)?;
        // 手动移动使旧路线失效
        ctx.paths.clear(ctx.agent);
        Ok(ActionResult::ok(
            format!("You moved {} to {}.", dir, to),
            ResultPayload::Moved { from, to },
        ))
    }

    /// 规划路线后立即走出第一步；指纹在这一步之后记录
    fn go_to(&self, ctx: &mut ExecutionContext<'_>, target: &str) -> Result<ActionResult, ActionError> {
        Self::position(ctx)?;
        let candidates = self.destinations(ctx);
        let dest = best_match(target, &candidates, |d| d.label.as_str())
            .ok_or_else(|| ActionError::UnknownDestination(target.to_string()))?;

        ctx.paths.plan(&*ctx.world, ctx.agent, &dest.label, dest.position)?;
        let (from, to, remaining) = match ctx.paths.step(ctx.world, ctx.agent)? {
            Continuation::Stepped { from, to, remaining } => (from, to, remaining),
            Continuation::Arrived { from, to } => (from, to, 0),
            _ => return Err(ActionError::NoRoute(dest.label.clone())),
        };
        let message = if remaining == 0 {
            format!("You arrived at the {} ({}).", dest.label, to)
        } else {
            ctx.paths.refresh_fingerprint(&*ctx.world, ctx.agent);
            format!(
                "You set off toward the {}: moved to {}, {} steps remain.",
                dest.label, to, remaining
            )
        };
        Ok(ActionResult::ok(
            message,
            ResultPayload::Traveling {
                from,
                to,
                remaining,
            },
        ))
    }

    /// 可见物体、可见 Agent、门、房间（按此顺序，模糊匹配同分时靠前者优先）
    fn destinations(&self, ctx: &ExecutionContext<'_>) -> Vec<Destination> {
        let world = &*ctx.world;
        let mut out = Vec::new();
        for obj in world.all_objects() {
            if world.is_in_fov(ctx.agent, obj.position) {
                out.push(Destination {
                    label: obj.name,
                    position: obj.position,
                });
            }
        }
        for other in world.agent_ids() {
            if &other == ctx.agent {
                continue;
            }
            if let Some(pos) = world.query_position(&other) {
                if world.is_in_fov(ctx.agent, pos) {
                    out.push(Destination {
                        label: other.to_string(),
                        position: pos,
                    });
                }
            }
        }
        for door in world.doors() {
            out.push(Destination {
                label: door.name,
                position: door.position,
            });
        }
        for room in world.room_ids() {
            if let (Some(name), Some(anchor)) = (world.room_name(&room), world.room_anchor(&room)) {
                out.push(Destination {
                    label: name,
                    position: anchor,
                });
            }
        }
        out
    }

    fn take(&self, ctx: &mut ExecutionContext<'_>, item: &str) -> Result<ActionResult, ActionError> {
        let from = Self::position(ctx)?;
        let objects = ctx.world.all_objects();
        let visible: Vec<_> = objects
            .iter()
            .filter(|o| ctx.world.is_in_fov(ctx.agent, o.position))
            .cloned()
            .collect();
        // 只在视野内匹配；全局列表仅用于区分“看不见”和“不存在”
        let Some(obj) = best_match(item, &visible, |o| o.name.as_str()) else {
            return Err(match best_match(item, &objects, |o| o.name.as_str()) {
                Some(_) => ActionError::NotVisible(item.to_string()),
                None => ActionError::NoSuchItem(item.to_string()),
            });
        };
        if !obj.is_takeable() {
            return Err(ActionError::NotTakeable(obj.name.clone()));
        }
        let distance = from.chebyshev(obj.position);
        if distance > 1 {
            return Err(ActionError::OutOfReach {
                item: obj.name.clone(),
                distance,
                bearing: from.compass(obj.position).to_string(),
            });
        }
        let taken = ctx
            .world
            .remove_object(&obj.id)
            .ok_or_else(|| ActionError::NoSuchItem(item.to_string()))?;
        Ok(ActionResult::ok(
            format!("You picked up the {}.", taken.name),
            ResultPayload::Taken { item: taken.name },
        ))
    }

    fn look_around(&self, ctx: &mut ExecutionContext<'_>) -> Result<ActionResult, ActionError> {
        let description = survey(&*ctx.world, ctx.agent)?;
        Ok(ActionResult::ok(
            description.clone(),
            ResultPayload::Described { description },
        ))
    }

    fn look_direction(
        &self,
        ctx: &mut ExecutionContext<'_>,
        dir: Direction,
    ) -> Result<ActionResult, ActionError> {
        let origin = Self::position(ctx)?;
        let world = &*ctx.world;
        let objects = world.all_objects();
        let mut passed = Vec::new();
        let mut cur = origin;
        let mut ending = None;

        for d in 1..=self.look_range {
            cur = cur.step(dir);
            if !world.in_bounds(cur) {
                ending = Some(format!("The edge of the map is {} tile(s) {}.", d, dir));
                break;
            }
            if !world.is_in_fov(ctx.agent, cur) {
                ending = Some(format!("You cannot see further than {} tile(s) {}.", d - 1, dir));
                break;
            }
            if let Some(other) = world.is_occupied(cur) {
                ending = Some(format!("{} is standing {} tile(s) {}.", other, d, dir));
                break;
            }
            let tile = world.tile_at(cur);
            if !tile.is_walkable() {
                // 未上锁的门可通行，走不到这里
                let what = match tile {
                    Tile::Door { .. } => {
                        let name = world
                            .doors()
                            .into_iter()
                            .find(|door| door.position == cur)
                            .map(|door| door.name)
                            .unwrap_or_else(|| "door".to_string());
                        format!("A locked {}", name)
                    }
                    other => capitalize(&describe_tile(other)),
                };
                ending = Some(format!("{} is {} tile(s) {}.", what, d, dir));
                break;
            }
            if let Tile::Door { .. } = tile {
                passed.push(format!("an open door ({} tile(s))", d));
            }
            for obj in objects.iter().filter(|o| o.position == cur) {
                passed.push(format!("{} ({} tile(s))", obj.name, d));
            }
        }

        let mut description = ending.unwrap_or_else(|| {
            format!("Open floor stretches at least {} tiles {}.", self.look_range, dir)
        });
        if !passed.is_empty() {
            description.push_str(&format!(" Along the way: {}.", passed.join(", ")));
        }
        Ok(ActionResult::ok(
            description.clone(),
            ResultPayload::Described { description },
        ))
    }

    fn look_at(&self, ctx: &mut ExecutionContext<'_>, name: &str) -> Result<ActionResult, ActionError> {
        let origin = Self::position(ctx)?;
        let world = &*ctx.world;

        enum Seen {
            Agent(AgentId, Position),
            Object(crate::world::WorldObject),
            Door(crate::world::Door),
        }
        let mut seen: Vec<(String, Seen)> = Vec::new();
        for other in world.agent_ids() {
            if &other == ctx.agent {
                continue;
            }
            if let Some(p) = world.query_position(&other) {
                if world.is_in_fov(ctx.agent, p) {
                    seen.push((other.to_string(), Seen::Agent(other, p)));
                }
            }
        }
        for obj in world.all_objects() {
            if world.is_in_fov(ctx.agent, obj.position) {
                seen.push((obj.name.clone(), Seen::Object(obj)));
            }
        }
        for door in world.doors() {
            if world.is_in_fov(ctx.agent, door.position) {
                seen.push((door.name.clone(), Seen::Door(door)));
            }
        }

        let (_, found) = best_match(name, &seen, |(label, _)| label.as_str())
            .ok_or_else(|| ActionError::NothingInView(name.to_string()))?;
        let description = match found {
            Seen::Agent(id, p) => format!(
                "{} is {} tiles {} of you, at {}.",
                id,
                origin.manhattan(*p),
                origin.compass(*p),
                p
            ),
            Seen::Object(obj) => {
                let mut s = format!(
                    "The {} is {} tiles {} of you.",
                    obj.name,
                    origin.manhattan(obj.position),
                    origin.compass(obj.position)
                );
                if !obj.description.is_empty() {
                    s.push_str(&format!(" {}", obj.description));
                }
                if !obj.affordances.is_empty() {
                    s.push_str(&format!(" You could: {}.", obj.affordances.join(", ")));
                }
                s
            }
            Seen::Door(door) => format!(
                "The {} is {} tiles {} of you and is {}.",
                door.name,
                origin.manhattan(door.position),
                origin.compass(door.position),
                if door.locked { "locked" } else { "unlocked" }
            ),
        };
        Ok(ActionResult::ok(
            description.clone(),
            ResultPayload::Described { description },
        ))
    }

    fn speak(&self, ctx: &mut ExecutionContext<'_>, text: &str) -> Result<ActionResult, ActionError> {
        let origin = Self::position(ctx)?;
        let mut recipients = Vec::new();
        for other in ctx.world.agent_ids() {
            if &other == ctx.agent {
                continue;
            }
            let Some(p) = ctx.world.query_position(&other) else {
                continue;
            };
            let distance = origin.manhattan(p);
            if distance <= self.speak_radius {
                ctx.mailboxes.deposit(
                    &other,
                    SpeechMessage {
                        sender: ctx.agent.clone(),
                        content: text.to_string(),
                        channel: Channel::Speak,
                        turn: ctx.turn,
                        distance: Some(distance),
                    },
                );
                recipients.push(Recipient {
                    agent: other,
                    distance: Some(distance),
                });
            }
        }
        Ok(delivered(format!("You said \"{}\"", text), recipients))
    }

    fn announce(&self, ctx: &mut ExecutionContext<'_>, text: &str) -> Result<ActionResult, ActionError> {
        let origin = Self::position(ctx)?;
        let mut recipients = Vec::new();
        if let Some(room) = ctx.world.room_at(origin) {
            for other in ctx.world.agent_ids() {
                if &other == ctx.agent {
                    continue;
                }
                let same_room = ctx
                    .world
                    .query_position(&other)
                    .and_then(|p| ctx.world.room_at(p))
                    .is_some_and(|r| r == room);
                if same_room {
                    ctx.mailboxes.deposit(
                        &other,
                        SpeechMessage {
                            sender: ctx.agent.clone(),
                            content: text.to_string(),
                            channel: Channel::Announce,
                            turn: ctx.turn,
                            distance: None,
                        },
                    );
                    recipients.push(Recipient {
                        agent: other,
                        distance: None,
                    });
                }
            }
        }
        Ok(delivered(format!("You announced \"{}\"", text), recipients))
    }
}

fn delivered(prefix: String, recipients: Vec<Recipient>) -> ActionResult {
    let message = if recipients.is_empty() {
        format!("{}, but nobody was there to hear it.", prefix)
    } else {
        let names: Vec<&str> = recipients.iter().map(|r| r.agent.as_str()).collect();
        format!("{}; heard by {}.", prefix, names.join(", "))
    };
    ActionResult::ok(message, ResultPayload::Delivered { recipients })
}

/// 当前位置概览：所在房间、视野内其他 Agent 数、四向可走/受阻情况
pub fn survey(world: &dyn WorldPort, agent: &AgentId) -> Result<String, ActionError> {
    let pos = world
        .query_position(agent)
        .ok_or_else(|| ActionError::NotPlaced(agent.clone()))?;
    let mut description = match world.room_at(pos).and_then(|r| world.room_name(&r)) {
        Some(room) => format!("You are in the {} at {}.", room, pos),
        None => format!("You are at {}, outside any known room.", pos),
    };

    let visible_agents = world
        .agent_ids()
        .into_iter()
        .filter(|a| a != agent)
        .filter(|a| {
            world
                .query_position(a)
                .is_some_and(|p| world.is_in_fov(agent, p))
        })
        .count();
    description.push_str(&format!(" You can see {} other agent(s).", visible_agents));

    let mut open = Vec::new();
    let mut blocked = Vec::new();
    for dir in Direction::ALL {
        let next = pos.step(dir);
        if !world.in_bounds(next) {
            blocked.push(format!("{} (edge of the map)", dir));
        } else if !world.is_walkable(next) {
            blocked.push(format!("{} ({})", dir, describe_tile(world.tile_at(next))));
        } else if let Some(by) = world.is_occupied(next) {
            blocked.push(format!("{} ({})", dir, by));
        } else {
            open.push(dir.name().to_string());
        }
    }
    if !open.is_empty() {
        description.push_str(&format!(" Open: {}.", open.join(", ")));
    }
    if !blocked.is_empty() {
        description.push_str(&format!(" Blocked: {}.", blocked.join(", ")));
    }
    Ok(description)
}

/// 单格移动：边界、可行走、占用三项校验全部通过后才修改位置
pub(crate) fn step_agent(
    world: &mut dyn WorldPort,
    agent: &AgentId,
    dir: Direction,
) -> Result<(Position, Position), ActionError> {
    let from = world
        .query_position(agent)
        .ok_or_else(|| ActionError::NotPlaced(agent.clone()))?;
    let to = from.step(dir);
    if !world.in_bounds(to) {
        return Err(ActionError::MapEdge { direction: dir });
    }
    if !world.is_walkable(to) {
        return Err(ActionError::Blocked {
            direction: dir,
            obstacle: describe_tile(world.tile_at(to)),
        });
    }
    if let Some(by) = world.is_occupied(to) {
        return Err(ActionError::Occupied { direction: dir, by });
    }
    world.set_position(agent, to)?;
    Ok((from, to))
}

fn describe_tile(tile: Tile) -> String {
    match tile {
        Tile::Wall => "a wall".to_string(),
        Tile::Door { locked: true } => "a locked door".to_string(),
        Tile::Door { locked: false } => "a door".to_string(),
        Tile::Void => "nothing".to_string(),
        Tile::Floor => "open floor".to_string(),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{GridWorld, WorldObject};

    struct Fixture {
        world: GridWorld,
        mailboxes: MailboxRegistry,
        paths: PathStore,
    }

    impl Fixture {
        fn new(world: GridWorld) -> Self {
            Self {
                world,
                mailboxes: MailboxRegistry::new(),
                paths: PathStore::new(),
            }
        }

        fn run(&mut self, agent: &str, action: Action) -> Result<ActionResult, ActionError> {
            let id = AgentId::from(agent);
            let mut ctx = ExecutionContext {
                agent: &id,
                turn: 1,
                world: &mut self.world,
                mailboxes: &mut self.mailboxes,
                paths: &mut self.paths,
            };
            ActionExecutor::default().execute(&mut ctx, &action)
        }
    }

    fn hall() -> GridWorld {
        GridWorld::builder(&[
            "############",
            "#..........#",
            "#..........#",
            "#....L.....#",
            "#..........#",
            "#..........#",
            "#..........#",
            "############",
        ])
        .room("hall", "Great Hall", Position::new(1, 1), Position::new(10, 6))
        .door_name(Position::new(5, 3), "iron gate")
        .object(
            WorldObject::new("o1", "brass lamp", Position::new(3, 5))
                .with_affordances(&["take", "light"])
                .with_description("It is dented."),
        )
        .object(WorldObject::new("o2", "stone table", Position::new(8, 5)).with_affordances(&["sit"]))
        .agent("alice", Position::new(5, 5))
        .build()
    }

    #[test]
    fn test_go_moves_one_tile() {
        let mut fx = Fixture::new(hall());
        let res = fx.run("alice", Action::Go(Direction::North)).unwrap();
        assert!(res.success);
        assert_eq!(res.new_position(), Some(Position::new(5, 4)));
        assert_eq!(fx.world.query_position(&"alice".into()), Some(Position::new(5, 4)));
    }

    #[test]
    fn test_go_into_locked_door_fails_without_moving() {
        let mut fx = Fixture::new(hall());
        fx.run("alice", Action::Go(Direction::North)).unwrap();
        let err = fx.run("alice", Action::Go(Direction::North)).unwrap_err();
        assert!(matches!(err, ActionError::Blocked { .. }));
        assert!(err.to_string().contains("locked door"));
        assert_eq!(fx.world.query_position(&"alice".into()), Some(Position::new(5, 4)));
    }

    #[test]
    fn test_go_occupied_and_map_edge() {
        let mut world = hall();
        world.add_agent("bob", Position::new(6, 5));
        let mut fx = Fixture::new(world);
        let err = fx.run("alice", Action::Go(Direction::East)).unwrap_err();
        assert_eq!(
            err,
            ActionError::Occupied {
                direction: Direction::East,
                by: "bob".into()
            }
        );

        let mut edge = Fixture::new(
            GridWorld::builder(&["..."]).agent("alice", Position::new(0, 0)).build(),
        );
        let err = edge.run("alice", Action::Go(Direction::West)).unwrap_err();
        assert!(matches!(err, ActionError::MapEdge { .. }));
    }

    #[test]
    fn test_take_out_of_reach_reports_bearing() {
        let mut fx = Fixture::new(hall());
        let err = fx.run("alice", Action::Take("lamp".into())).unwrap_err();
        assert_eq!(
            err,
            ActionError::OutOfReach {
                item: "brass lamp".into(),
                distance: 2,
                bearing: "west".into()
            }
        );
        assert_eq!(fx.world.all_objects().len(), 2);
    }

    #[test]
    fn test_take_adjacent_removes_object() {
        let mut fx = Fixture::new(hall());
        fx.run("alice", Action::Go(Direction::West)).unwrap();
        let res = fx.run("alice", Action::Take("the lamp".into())).unwrap();
        assert_eq!(res.payload, ResultPayload::Taken { item: "brass lamp".into() });
        assert_eq!(fx.world.all_objects().len(), 1);
    }

    #[test]
    fn test_take_rejects_missing_and_untakeable() {
        let mut fx = Fixture::new(hall());
        assert_eq!(
            fx.run("alice", Action::Take("sword".into())).unwrap_err(),
            ActionError::NoSuchItem("sword".into())
        );
        assert_eq!(
            fx.run("alice", Action::Take("table".into())).unwrap_err(),
            ActionError::NotTakeable("stone table".into())
        );
    }

    #[test]
    fn test_take_prefers_visible_match() {
        let world = GridWorld::builder(&["#########", "#...#...#", "#########"])
            .object(WorldObject::new("o1", "iron key", Position::new(6, 1)).with_affordances(&["take"]))
            .object(WorldObject::new("o2", "brass key", Position::new(3, 1)).with_affordances(&["take"]))
            .agent("alice", Position::new(2, 1))
            .build();
        let mut fx = Fixture::new(world);
        assert_eq!(
            fx.run("alice", Action::Take("iron".into())).unwrap_err(),
            ActionError::NotVisible("iron".into())
        );
        let res = fx.run("alice", Action::Take("key".into())).unwrap();
        assert_eq!(res.payload, ResultPayload::Taken { item: "brass key".into() });
        assert_eq!(fx.world.all_objects().len(), 1);
    }

    #[test]
    fn test_look_around_lists_exits() {
        let mut fx = Fixture::new(hall());
        let res = fx.run("alice", Action::Look(None)).unwrap();
        assert!(res.message.contains("Great Hall"));
        assert!(res.message.contains("0 other agent"));
        assert!(res.message.contains("Open: north, east, south, west"));
    }

    #[test]
    fn test_look_direction_stops_at_locked_door() {
        let mut fx = Fixture::new(hall());
        let res = fx
            .run("alice", Action::Look(Some(LookTarget::Direction(Direction::North))))
            .unwrap();
        assert!(res.message.contains("A locked iron gate is 2 tile(s) north"), "{}", res.message);

        let res = fx
            .run("alice", Action::Look(Some(LookTarget::Direction(Direction::East))))
            .unwrap();
        assert!(res.message.contains("A wall is 6 tile(s) east"), "{}", res.message);
    }

    #[test]
    fn test_look_direction_passes_unlocked_door() {
        let world = GridWorld::builder(&["#########", "#...+...#", "#########"])
            .agent("a", Position::new(1, 1))
            .build();
        let mut fx = Fixture::new(world);
        let res = fx
            .run("a", Action::Look(Some(LookTarget::Direction(Direction::East))))
            .unwrap();
        assert!(res.message.starts_with("A wall is 7 tile(s) east."), "{}", res.message);
        assert!(res.message.contains("an open door (3 tile(s))"), "{}", res.message);
    }

    #[test]
    fn test_look_at_object_and_unknown_name() {
        let mut fx = Fixture::new(hall());
        let res = fx
            .run("alice", Action::Look(Some(LookTarget::Name("lamp".into()))))
            .unwrap();
        assert!(res.message.contains("2 tiles west"));
        assert!(res.message.contains("dented"));
        assert!(res.message.contains("take, light"));

        let err = fx
            .run("alice", Action::Look(Some(LookTarget::Name("dragon".into()))))
            .unwrap_err();
        assert_eq!(err, ActionError::NothingInView("dragon".into()));
    }

    #[test]
    fn test_speak_respects_radius() {
        let mut world = GridWorld::builder(&["..............."])
            .agent("a", Position::new(0, 0))
            .agent("b", Position::new(3, 0))
            .agent("c", Position::new(10, 0))
            .build();
        world.add_agent("d", Position::new(4, 0));
        let mut fx = Fixture::new(world);
        let res = fx.run("a", Action::Speak("Hello".into())).unwrap();
        assert!(res.success);

        let b = fx.mailboxes.drain(&"b".into());
        assert_eq!(b.len(), 1);
        assert_eq!(b[0].distance, Some(3));
        assert_eq!(fx.mailboxes.drain(&"d".into())[0].distance, Some(4));
        assert!(fx.mailboxes.drain(&"c".into()).is_empty());
        assert!(fx.mailboxes.drain(&"a".into()).is_empty());
    }

    #[test]
    fn test_announce_reaches_room_only() {
        let world = GridWorld::builder(&[
            "#########",
            "#...#...#",
            "#...+...#",
            "#########",
        ])
        .room("w", "Study", Position::new(1, 1), Position::new(3, 2))
        .room("e", "Den", Position::new(5, 1), Position::new(7, 2))
        .agent("a", Position::new(1, 1))
        .agent("b", Position::new(3, 2))
        .agent("c", Position::new(5, 1))
        .build();
        let mut fx = Fixture::new(world);
        let res = fx.run("a", Action::Announce("Meeting now".into())).unwrap();
        match res.payload {
            ResultPayload::Delivered { recipients } => {
                assert_eq!(recipients.len(), 1);
                assert_eq!(recipients[0].agent, AgentId::from("b"));
                assert_eq!(recipients[0].distance, None);
            }
            other => panic!("unexpected payload {:?}", other),
        }
        assert!(fx.mailboxes.drain(&"c".into()).is_empty());
    }

    #[test]
    fn test_announce_outside_any_room_reaches_nobody() {
        let world = GridWorld::builder(&["......"])
            .agent("a", Position::new(0, 0))
            .agent("b", Position::new(1, 0))
            .build();
        let mut fx = Fixture::new(world);
        let res = fx.run("a", Action::Announce("Anyone?".into())).unwrap();
        assert!(res.success);
        assert_eq!(res.payload, ResultPayload::Delivered { recipients: vec![] });
        assert!(res.message.contains("nobody"));
        assert!(fx.mailboxes.drain(&"b".into()).is_empty());
    }

    #[test]
    fn test_speech_with_no_listeners_succeeds() {
        let mut fx = Fixture::new(hall());
        let res = fx.run("alice", Action::Speak("anyone?".into())).unwrap();
        assert!(res.success);
        assert!(res.message.contains("nobody"));
    }

    #[test]
    fn test_go_to_stores_remaining_path() {
        let mut fx = Fixture::new(hall());
        let res = fx.run("alice", Action::GoTo("stone table".into())).unwrap();
        // (5,5) -> (8,5) 共三步，第一步立即执行
        assert_eq!(
            res.payload,
            ResultPayload::Traveling {
                from: Position::new(5, 5),
                to: Position::new(6, 5),
                remaining: 2
            }
        );
        let path = fx.paths.get(&"alice".into()).unwrap();
        assert_eq!(path.remaining(), 2);
        assert_eq!(path.target(), "stone table");
        // 指纹取自第一步之后的视野
        assert_eq!(path.fingerprint(), &fx.world.visible_entities(&"alice".into()));
    }

    #[test]
    fn test_go_to_single_step_stores_no_path() {
        let mut fx = Fixture::new(hall());
        let res = fx.run("alice", Action::GoTo("lamp".into())).unwrap();
        assert!(res.message.contains("set off"), "{}", res.message);
        let res = fx.run("alice", Action::GoTo("lamp".into())).unwrap();
        assert!(res.message.contains("arrived"), "{}", res.message);
        assert!(fx.paths.get(&"alice".into()).is_none());
        assert_eq!(fx.world.query_position(&"alice".into()), Some(Position::new(3, 5)));
    }

    #[test]
    fn test_go_to_unknown_destination() {
        let mut fx = Fixture::new(hall());
        let err = fx.run("alice", Action::GoTo("moon".into())).unwrap_err();
        assert_eq!(err, ActionError::UnknownDestination("moon".into()));
        assert_eq!(fx.world.query_position(&"alice".into()), Some(Position::new(5, 5)));
    }

    #[test]
    fn test_invalid_never_executes() {
        let mut fx = Fixture::new(hall());
        let err = fx.run("alice", Action::Invalid("blah".into())).unwrap_err();
        assert_eq!(err, ActionError::InvalidSyntax("blah".into()));
    }
}

//! End-to-end behaviour of the simulation through its public API.

use rstest::rstest;

use tilequest::config::GameConfig;
use tilequest::domain::collision;
use tilequest::domain::entity::{Actor, ActorKind, AiControl, AiMode, MonsterKind, Mover};
use tilequest::domain::geometry::{Direction, Hitbox};
use tilequest::domain::pathfind::PathResult;
use tilequest::domain::rules;
use tilequest::domain::spawn;
use tilequest::domain::tile::{Cell, Tile, TileMap};
use tilequest::sim::combat::{self, Blow};
use tilequest::sim::event::GameEvent;
use tilequest::sim::level;
use tilequest::sim::step::{tick, FrameInput};
use tilequest::sim::world::{ActorRef, Group, World};

const TS: i32 = 48;

fn tiles_from(rows: &[&str]) -> TileMap {
    let tiles = rows.iter().map(|row| {
        row.chars().map(|ch| match ch {
            '#' => Tile::Wall,
            _   => Tile::Grass,
        }).collect()
    }).collect();
    TileMap::new(0, tiles)
}

fn room(width: usize, height: usize) -> World {
    let mut map = TileMap::filled(0, width, height, Tile::Grass);
    for col in 0..width as i32 {
        map.set_tile(col, 0, Tile::Wall);
        map.set_tile(col, height as i32 - 1, Tile::Wall);
    }
    for row in 0..height as i32 {
        map.set_tile(0, row, Tile::Wall);
        map.set_tile(width as i32 - 1, row, Tile::Wall);
    }
    let mut w = World::with_seed(map, GameConfig::default(), 2024);
    w.place_player(Cell::new(1, 1));
    w
}

/// Monster at world position (x, y) that never moves on its own.
fn still_monster(w: &mut World, kind: MonsterKind, x: i32, y: i32) -> usize {
    let cfg = w.config.clone();
    let mut m = spawn::monster(kind, x, y, &cfg);
    m.ai = None;
    w.spawn(Group::Monster, m);
    w.monsters.len() - 1
}

fn idle() -> FrameInput {
    FrameInput::default()
}

// ── Path search ──

#[rstest]
#[case(Cell::new(0, 0), Cell::new(9, 0))]
#[case(Cell::new(2, 7), Cell::new(8, 1))]
#[case(Cell::new(9, 9), Cell::new(0, 0))]
fn open_grid_paths_are_manhattan_long(#[case] start: Cell, #[case] goal: Cell) {
    let mut w = World::with_seed(TileMap::filled(0, 10, 10, Tile::Grass), GameConfig::default(), 1);
    let path = w.request_path(start, goal);
    assert_eq!(path.cells().map(<[Cell]>::len), Some(start.manhattan(goal) as usize));
    assert_eq!(path.cells().and_then(|c| c.last().copied()), Some(goal));
}

#[test]
fn straight_path_follows_the_row() {
    let mut w = World::with_seed(TileMap::filled(0, 10, 10, Tile::Grass), GameConfig::default(), 1);
    let expected: Vec<Cell> = (1..10).map(|col| Cell::new(col, 0)).collect();
    assert_eq!(w.request_path(Cell::new(0, 0), Cell::new(9, 0)), PathResult::Found(expected));
}

#[test]
fn enclosed_goal_is_unreachable_and_same_cell_is_empty() {
    let map = tiles_from(&[
        "     ",
        "  #  ",
        " # # ",
        "  #  ",
        "     ",
    ]);
    let mut w = World::with_seed(map, GameConfig::default(), 1);
    assert_eq!(w.request_path(Cell::new(0, 0), Cell::new(2, 2)), PathResult::Unreachable);
    assert_eq!(w.request_path(Cell::new(4, 4), Cell::new(4, 4)), PathResult::Found(vec![]));
}

// ── Collision ──

fn probe_actor(col: i32, row: i32) -> Actor {
    let mut a = Actor::new(ActorKind::Npc, col * TS, row * TS, Hitbox::new(8, 16, 32, 32));
    a.id = 1;
    a
}

#[test]
fn fully_blocked_map_blocks_every_direction() {
    let map = TileMap::filled(0, 3, 3, Tile::Wall);
    let a = probe_actor(1, 1);
    for dir in Direction::ALL {
        assert!(collision::check_tile(&map, &a, dir, 1, TS), "{dir:?}");
    }
}

#[rstest]
#[case(Direction::Left, 9)]
#[case(Direction::Up, 17)]
#[case(Direction::Right, 9)]
#[case(Direction::Down, 1)]
fn leaving_the_map_collides(#[case] dir: Direction, #[case] speed: i32) {
    let map = TileMap::filled(0, 1, 1, Tile::Grass);
    let a = probe_actor(0, 0);
    assert!(collision::check_tile(&map, &a, dir, speed, TS));
    assert!(!collision::check_tile(&map, &a, dir, speed - 1, TS));
}

// ── Damage and invincibility ──

#[test]
fn two_contact_hits_in_the_window_cost_one() {
    let mut w = room(8, 5);
    // Slime hitbox starts 3 px in: its left edge sits 2 px past the player's.
    still_monster(&mut w, MonsterKind::GreenSlime, 86, 48);

    let right = FrameInput { movement: Some(Direction::Right), ..idle() };
    let mut events = tick(&mut w, right);
    events.extend(tick(&mut w, right));

    let hits = events.iter().filter(|e| matches!(e, GameEvent::Hit { .. })).count();
    assert_eq!(hits, 1);
    // Slime attack 5 against wood shield defense 1.
    assert_eq!(w.player.life(), 2);
    assert!(w.player.is_invincible());
}

#[test]
fn monster_invincibility_absorbs_a_second_hit() {
    let mut w = room(8, 5);
    let i = still_monster(&mut w, MonsterKind::GreenSlime, 240, 144);
    if let Some(c) = w.monsters[i].combat.as_mut() {
        c.life = 6;
        c.max_life = 6;
    }
    let blow = Blow {
        source: ActorRef::Player,
        id: w.player.id,
        facing: Direction::Right,
        attack: 4,
        knockback: 0,
        by_player: true,
    };

    let mut events = Vec::new();
    assert!(combat::hurt_monster(&mut w, i, blow, &mut events));
    assert_eq!(w.monsters[i].life(), 2);
    assert!(w.monsters[i].is_invincible());

    for _ in 0..20 { tick(&mut w, idle()); }
    assert!(!combat::hurt_monster(&mut w, i, blow, &mut events));
    assert_eq!(w.monsters[i].life(), 2);

    for _ in 0..21 { tick(&mut w, idle()); }
    assert!(!w.monsters[i].is_invincible());
}

// ── Progression ──

#[test]
fn level_up_doubles_the_bar_and_heals_cap_at_max() {
    let mut p = spawn::player(0, 0, &GameConfig::default());
    let (Some(prog), Some(c)) = (p.progression.as_mut(), p.combat.as_mut()) else {
        panic!("player lacks progression");
    };
    assert_eq!(rules::gain_exp(prog, c, 5), 1);
    assert_eq!(prog.next_level_exp, 10);
    assert_eq!(c.max_life, 8);
    c.life = 7;
    assert_eq!(c.heal(5), 1);
    assert_eq!(c.life, 8);

    // Enough for two levels at once.
    assert_eq!(rules::gain_exp(prog, c, 25), 2);
    assert_eq!((prog.level, prog.next_level_exp), (4, 40));
}

// ── AI ──

#[test]
fn nearby_monster_eventually_gives_chase() {
    let mut w = room(12, 5);
    let cfg = w.config.clone();
    let mut slime = spawn::monster(MonsterKind::GreenSlime, 5 * TS, TS, &cfg);
    slime.mover = Some(Mover::new(0));
    let id = w.spawn(Group::Monster, slime);

    let mut events = Vec::new();
    for _ in 0..3000 {
        events.extend(tick(&mut w, idle()));
        if w.monsters[0].ai.as_ref().map(|a| a.mode) == Some(AiMode::Pursue) { break; }
    }
    assert_eq!(w.monsters[0].ai.as_ref().map(|a| a.mode), Some(AiMode::Pursue));
    assert!(events.contains(&GameEvent::ChaseStarted { id }));
}

#[test]
fn distant_pursuer_gives_up() {
    let mut w = room(30, 5);
    let cfg = w.config.clone();
    let mut slime = spawn::monster(MonsterKind::GreenSlime, 21 * TS, TS, &cfg);
    if let Some(ai) = slime.ai.as_mut() { ai.mode = AiMode::Pursue; }
    let id = w.spawn(Group::Monster, slime);

    let events = tick(&mut w, idle());
    assert!(events.contains(&GameEvent::ChaseStopped { id }));
    assert_eq!(w.monsters[0].ai.as_ref().map(|a| a.mode), Some(AiMode::Wander));
}

#[test]
fn pursuer_closes_in_along_the_path() {
    let mut w = room(12, 5);
    let cfg = w.config.clone();
    let mut orc = spawn::monster(MonsterKind::Orc, 8 * TS, 3 * TS, &cfg);
    if let Some(ai) = orc.ai.as_mut() {
        ai.mode = AiMode::Pursue;
        ai.melee = None;
    }
    w.spawn(Group::Monster, orc);
    let start = w.monsters[0].cell(TS).manhattan(w.player.cell(TS));

    for _ in 0..200 { tick(&mut w, idle()); }
    let now = w.monsters[0].cell(TS).manhattan(w.player.cell(TS));
    assert!(now < start, "distance went from {start} to {now}");
}

#[test]
fn orc_swings_at_a_player_in_reach() {
    let mut w = room(8, 5);
    let cfg = w.config.clone();
    let mut orc = spawn::monster(MonsterKind::Orc, 2 * TS, TS, &cfg);
    orc.facing = Direction::Left;
    orc.mover = Some(Mover::new(0));
    if let Some(ai) = orc.ai.as_mut() {
        ai.chase = None;
        ai.wander_interval = u32::MAX;
    }
    let id = w.spawn(Group::Monster, orc);
    let player = w.player.id;

    let mut events = Vec::new();
    for _ in 0..600 {
        events.extend(tick(&mut w, idle()));
        if events.iter().any(|e| matches!(e, GameEvent::Hit { target, .. } if *target == player)) { break; }
    }
    assert!(events.contains(&GameEvent::AttackStarted { id }));
    // Orc attack 8 against defense 1.
    assert!(events.contains(&GameEvent::Hit { attacker: id, target: player, damage: 7 }));
    assert!(events.contains(&GameEvent::Dying { id: player }));
}

// ── Knockback ──

#[test]
fn knockback_into_a_wall_restores_speed_the_same_tick() {
    let mut w = room(8, 5);
    let i = still_monster(&mut w, MonsterKind::GreenSlime, TS, 3 * TS);
    assert!(combat::knock_back(&mut w.monsters[i], Direction::Left, 5));
    assert_eq!(w.monsters[i].speed(), 6);

    tick(&mut w, idle());
    assert!(!w.monsters[i].is_knocked_back());
    assert_eq!(w.monsters[i].speed(), 1);
    assert_eq!(w.monsters[i].x, TS);
}

#[test]
fn slime_knocked_into_the_player_deals_contact_damage() {
    let mut w = room(8, 5);
    // Slime box flush against the player's right edge.
    let i = still_monster(&mut w, MonsterKind::GreenSlime, 85, 48);
    assert!(combat::knock_back(&mut w.monsters[i], Direction::Left, 5));

    let events = tick(&mut w, idle());
    let id = w.monsters[i].id;
    assert!(events.contains(&GameEvent::Hit { attacker: id, target: w.player.id, damage: 4 }));
    assert_eq!(w.player.life(), 2);
    assert!(!w.monsters[i].is_knocked_back());
    assert_eq!(w.monsters[i].x, 85);
}

// ── Whole levels ──

#[test]
fn builtin_levels_survive_a_long_run() {
    for lvl in level::builtin() {
        let mut cfg = GameConfig::default();
        cfg.timing.seed = Some(7);
        let mut w = level::build_world(&lvl, cfg);
        let walk = [Direction::Right, Direction::Down, Direction::Left, Direction::Up];
        for t in 0..2000usize {
            let input = FrameInput {
                movement: Some(walk[(t / 50) % 4]),
                attack: t % 37 == 0,
                shoot: t % 91 == 0,
                ..idle()
            };
            tick(&mut w, input);
        }
        // Nothing escapes the map.
        let (w_px, h_px) = (w.map.width() as i32 * TS, w.map.height() as i32 * TS);
        for m in &w.monsters {
            assert!(m.x >= 0 && m.y >= 0 && m.x < w_px && m.y < h_px, "{:?} at ({}, {})", m.kind, m.x, m.y);
        }
    }
}

#[test]
fn seeded_worlds_replay_identically() {
    let lvl = level::builtin().swap_remove(0);
    let run = || {
        let mut cfg = GameConfig::default();
        cfg.timing.seed = Some(99);
        let mut w = level::build_world(&lvl, cfg);
        let mut all = Vec::new();
        for _ in 0..500 { all.extend(tick(&mut w, idle())); }
        (all, w.snapshot())
    };
    assert_eq!(run(), run());
}

#[test]
fn npc_wanderers_stay_friendly() {
    let mut w = room(8, 5);
    let cfg = w.config.clone();
    let mut npc = spawn::npc(4 * TS, 2 * TS, &cfg);
    npc.ai = Some(AiControl::wanderer(10));
    w.spawn(Group::Npc, npc);
    for _ in 0..300 {
        let events = tick(&mut w, idle());
        assert!(!events.iter().any(|e| matches!(e, GameEvent::Hit { .. })));
    }
    assert_eq!(w.player.life(), 6);
}

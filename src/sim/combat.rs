/// Combat resolution: applying blows, strikes, projectile launches,
/// deaths, drops and experience.
///
/// ## Who can hurt whom
/// ┌───────────────────────┬──────────────────────────────────┐
/// │ Source                 │ Targets                          │
/// ├───────────────────────┼──────────────────────────────────┤
/// │ player melee           │ monsters, dry trees (axe only),  │
/// │                        │ hostile projectiles (swatted)    │
/// │ player projectile      │ monsters                         │
/// │ monster melee/contact  │ player                           │
/// │ monster projectile     │ player                           │
/// └───────────────────────┴──────────────────────────────────┘
///
/// A hit never lands on an invincible or dying target. Every landed hit
/// makes the target invincible for its kind's window.

use log::{debug, info};
use rand::Rng;

use crate::domain::ai;
use crate::domain::collision;
use crate::domain::entity::{
    ActionError, Actor, ActorId, ActorKind, Faction, Knockback, ProjectileKind,
};
use crate::domain::geometry::Direction;
use crate::domain::item::ItemKind;
use crate::domain::rules::{self, GuardResult};
use crate::domain::spawn;
use super::event::GameEvent;
use super::world::{ActorRef, Group, World};

/// One blow, captured before any mutation.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Blow {
    pub source: ActorRef,
    pub id: ActorId,
    /// Knockback direction, and the side a guard must face.
    pub facing: Direction,
    pub attack: i32,
    pub knockback: i32,
    /// Experience for a kill goes to the player.
    pub by_player: bool,
}

impl Blow {
    pub fn melee(actor: &Actor, source: ActorRef) -> Blow {
        let c = actor.combat.as_ref();
        Blow {
            source,
            id: actor.id,
            facing: actor.facing,
            attack: c.map_or(0, |c| c.attack),
            knockback: c.and_then(|c| c.melee).map_or(0, |m| m.knockback),
            by_player: actor.kind == ActorKind::Player,
        }
    }

    /// Touch damage: no knockback.
    pub fn contact(actor: &Actor, source: ActorRef) -> Blow {
        Blow { knockback: 0, ..Blow::melee(actor, source) }
    }

    pub fn projectile(actor: &Actor, source: ActorRef) -> Blow {
        let state = actor.projectile.as_ref();
        Blow {
            source,
            id: actor.id,
            facing: actor.facing,
            attack: state.map_or(0, |s| s.damage),
            knockback: state.map_or(0, |s| s.knockback),
            by_player: state.map_or(false, |s| s.faction == Faction::Friendly),
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Knockback
// ══════════════════════════════════════════════════════════════

/// Push `actor` in `direction`: speed rises by `power` until the
/// knockback ends. No-op for non-positive power or actors that can't move.
pub fn knock_back(actor: &mut Actor, direction: Direction, power: i32) -> bool {
    if power <= 0 { return false; }
    let (Some(m), Some(c)) = (actor.mover.as_mut(), actor.combat.as_mut()) else { return false };
    m.speed = m.default_speed + power;
    c.knockback = Some(Knockback { direction, counter: 0 });
    true
}

pub fn end_knockback(actor: &mut Actor) {
    if let Some(c) = actor.combat.as_mut() { c.knockback = None; }
    if let Some(m) = actor.mover.as_mut() { m.restore_speed(); }
}

// ══════════════════════════════════════════════════════════════
// Applying blows
// ══════════════════════════════════════════════════════════════

/// Apply `blow` to the player. Returns whether it landed.
pub fn hurt_player(world: &mut World, blow: Blow, events: &mut Vec<GameEvent>) -> bool {
    let pid = world.player.id;
    let facing = world.player.facing;
    let Some(c) = world.player.combat.as_mut() else { return false };
    if !c.is_vulnerable() { return false; }

    let guard = rules::guard_result(c.guarding, c.guard_counter, facing, blow.facing);
    let dmg = rules::guarded_damage(rules::damage(blow.attack, c.defense), guard);
    c.life -= dmg;
    c.invincible = true;
    c.invincible_counter = 0;
    if dmg != 0 { c.transparent = true; }
    let died = c.life <= 0;
    if died {
        c.dying = true;
        c.dying_counter = 0;
        c.attacking = false;
        c.guarding = false;
    }

    match guard {
        GuardResult::Blocked => events.push(GameEvent::Guarded { id: pid, damage: dmg }),
        GuardResult::Parried => events.push(GameEvent::Parried { id: pid, attacker: blow.id }),
        GuardResult::Open => {}
    }
    events.push(GameEvent::Hit { attacker: blow.id, target: pid, damage: dmg });
    debug!("player takes {dmg} from #{} ({guard:?})", blow.id);

    if dmg != 0 && knock_back(&mut world.player, blow.facing, blow.knockback) {
        events.push(GameEvent::KnockedBack { id: pid, direction: blow.facing });
    }
    if guard == GuardResult::Parried {
        if let Some(attacker) = world.actor_mut(blow.source) {
            if knock_back(attacker, facing, blow.knockback) {
                events.push(GameEvent::KnockedBack { id: blow.id, direction: facing });
            }
        }
    }
    if died {
        events.push(GameEvent::Dying { id: pid });
        info!("player defeated by #{}", blow.id);
    }
    true
}

/// Apply `blow` to monster `idx`. Returns whether it landed.
pub fn hurt_monster(world: &mut World, idx: usize, blow: Blow, events: &mut Vec<GameEvent>) -> bool {
    let Some(m) = world.monsters.get_mut(idx) else { return false };
    let id = m.id;
    let Some(c) = m.combat.as_mut() else { return false };
    if !c.is_vulnerable() { return false; }

    let dmg = rules::damage(blow.attack, c.defense);
    c.life -= dmg;
    c.invincible = true;
    c.invincible_counter = 0;
    let died = c.life <= 0;
    if died {
        c.dying = true;
        c.dying_counter = 0;
        c.attacking = false;
    }
    let reward = c.exp_reward;

    events.push(GameEvent::Hit { attacker: blow.id, target: id, damage: dmg });
    debug!("#{id} takes {dmg} from #{}", blow.id);

    if !died && knock_back(m, blow.facing, blow.knockback) {
        events.push(GameEvent::KnockedBack { id, direction: blow.facing });
    }
    if let Some(brain) = m.ai.as_mut() {
        if ai::provoke(brain).is_some() {
            events.push(GameEvent::ChaseStarted { id });
        }
    }

    if died {
        events.push(GameEvent::Dying { id });
        debug!("#{id} slain");
        if blow.by_player { award_exp(world, reward, events); }
    }
    true
}

/// Chop interactive tile `idx`. Only the required weapon does anything;
/// a destroyed tile is replaced by its remains in place.
pub fn hurt_tile(world: &mut World, idx: usize, weapon: Option<ItemKind>, events: &mut Vec<GameEvent>) {
    let Some(t) = world.tiles.get_mut(idx) else { return };
    let (id, x, y) = (t.id, t.x, t.y);
    let Some(d) = t.destructible.as_mut() else { return };
    if d.invincible || weapon != Some(d.requires) { return; }

    d.life -= 1;
    d.invincible = true;
    d.invincible_counter = 0;
    events.push(GameEvent::TileHit { id });
    if d.life > 0 { return; }

    let mut remains = spawn::trunk(x, y);
    remains.id = world.alloc_id();
    if let Some(slot) = world.tiles.get_mut(idx) {
        *slot = remains;
    }
    events.push(GameEvent::TileDestroyed { id, x, y });
    debug!("tile #{id} destroyed at ({x}, {y})");
}

pub fn award_exp(world: &mut World, amount: i32, events: &mut Vec<GameEvent>) {
    let ts = world.tile_size();
    let p = &mut world.player;
    let (Some(prog), Some(c)) = (p.progression.as_mut(), p.combat.as_mut()) else { return };
    let gained = rules::gain_exp(prog, c, amount);
    if gained == 0 { return; }
    let level = prog.level;
    rules::refresh_stats(p, ts);
    info!("level up: now level {level}");
    events.push(GameEvent::LevelUp { level });
}

// ══════════════════════════════════════════════════════════════
// Melee strike
// ══════════════════════════════════════════════════════════════

/// The one hit test of an attack, made when the strike phase begins.
pub fn strike(world: &mut World, who: ActorRef, events: &mut Vec<GameEvent>) {
    let Some(actor) = world.actor(who) else { return };
    let Some(melee) = actor.combat.as_ref().and_then(|c| c.melee) else { return };
    let area = collision::melee_box(actor, &melee);
    let blow = Blow::melee(actor, who);

    if who != ActorRef::Player {
        if world.player.is_active() && area.intersects(&world.player.rect()) {
            hurt_player(world, blow, events);
        }
        return;
    }

    let weapon = actor.inventory.as_ref().and_then(|inv| inv.equipped_weapon());
    if let Some(i) = world.monsters.iter().position(|m| m.is_active() && area.intersects(&m.rect())) {
        hurt_monster(world, i, blow, events);
    }
    if let Some(i) = collision::first_in_area(&area, blow.id, &world.tiles) {
        hurt_tile(world, i, weapon, events);
    }
    for p in world.projectiles.iter_mut() {
        let hostile = p.projectile.as_ref().map_or(false, |s| s.faction == Faction::Hostile);
        if p.alive && hostile && area.intersects(&p.rect()) {
            p.alive = false;
            events.push(GameEvent::ProjectileExpired { id: p.id });
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Projectiles
// ══════════════════════════════════════════════════════════════

fn resource(kind: ProjectileKind) -> &'static str {
    match kind {
        ProjectileKind::Fireball => "mana",
        ProjectileKind::Rock     => "ammo",
    }
}

/// Launch a projectile from `shooter`. The player pays mana (fireball) or
/// ammo (rock); monsters shoot for free. Cooldown and the one-in-flight
/// rule are checked by the caller.
pub fn launch(world: &mut World, shooter: ActorRef, kind: ProjectileKind, events: &mut Vec<GameEvent>) -> Result<ActorId, ActionError> {
    let (_, _, _, cost) = kind.stats();
    let Some(actor) = world.actor(shooter) else { return Err(ActionError::NotUsable("projectile")) };
    let faction = actor.combat.as_ref().map_or(Faction::Hostile, |c| c.faction);

    if let Some(prog) = actor.progression.as_ref() {
        let available = match kind {
            ProjectileKind::Fireball => prog.mana,
            ProjectileKind::Rock     => prog.ammo,
        };
        if available < cost {
            events.push(GameEvent::NotEnoughResource { what: resource(kind) });
            return Err(ActionError::NotEnough(resource(kind)));
        }
    }

    let missile = spawn::projectile(kind, actor, faction, &world.config);
    if let Some(actor) = world.actor_mut(shooter) {
        if let Some(prog) = actor.progression.as_mut() {
            match kind {
                ProjectileKind::Fireball => prog.mana -= cost,
                ProjectileKind::Rock     => prog.ammo -= cost,
            }
        }
        if let Some(c) = actor.combat.as_mut() {
            c.shot_counter = 0;
        }
    }
    let id = world.spawn(Group::Projectile, missile);
    events.push(GameEvent::ProjectileLaunched { id, kind });
    Ok(id)
}

// ══════════════════════════════════════════════════════════════
// Deaths, drops, removal
// ══════════════════════════════════════════════════════════════

/// Advance a dying actor. Returns true once the animation has run out.
fn advance_dying(actor: &mut Actor, frames: u32) -> bool {
    let Some(c) = actor.combat.as_mut() else { return false };
    if !c.dying { return false; }
    c.dying_counter += 1;
    c.dying_counter > frames
}

/// End-of-tick bookkeeping: finish dying actors, drop loot, and remove
/// everything that is no longer alive.
pub fn resolve_removals(world: &mut World, events: &mut Vec<GameEvent>) {
    let frames = world.config.combat.dying_frames;

    let mut drops = Vec::new();
    for m in world.monsters.iter_mut() {
        if m.alive && advance_dying(m, frames) {
            m.alive = false;
            drops.push((m.x, m.y));
        }
    }
    for (x, y) in drops {
        let kind = rules::drop_for_roll(world.rng().gen_range(0..100));
        let item = spawn::item(kind, x, y, &world.config);
        world.spawn(Group::Object, item);
        events.push(GameEvent::Dropped { kind, x, y });
    }

    if world.player.alive && advance_dying(&mut world.player, frames) {
        world.player.alive = false;
        world.end();
        events.push(GameEvent::PlayerDefeated);
    }

    for group in [Group::Npc, Group::Monster, Group::Projectile, Group::Tile, Group::Object] {
        let list = world.list_mut(group);
        let before: Vec<ActorId> = list.iter().filter(|a| !a.alive).map(|a| a.id).collect();
        list.retain(|a| a.alive);
        // Objects picked up and projectiles that already reported expiring
        // leave quietly; everything else reports its removal.
        if matches!(group, Group::Npc | Group::Monster | Group::Tile) {
            events.extend(before.into_iter().map(|id| GameEvent::Removed { id }));
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::domain::entity::MonsterKind;
    use crate::domain::tile::{Cell, Tile, TileMap};

    fn world() -> World {
        let mut w = World::with_seed(TileMap::filled(0, 8, 8, Tile::Grass), GameConfig::default(), 5);
        w.place_player(Cell::new(2, 2));
        w
    }

    fn slime_at(w: &mut World, col: i32, row: i32) -> usize {
        let cfg = w.config.clone();
        let (x, y) = w.cell_origin(Cell::new(col, row));
        w.spawn(Group::Monster, spawn::monster(MonsterKind::GreenSlime, x, y, &cfg));
        w.monsters.len() - 1
    }

    fn blow(attack: i32, knockback: i32, facing: Direction) -> Blow {
        Blow {
            source: ActorRef::In(Group::Monster, 0),
            id: 99,
            facing,
            attack,
            knockback,
            by_player: false,
        }
    }

    #[test]
    fn invincibility_absorbs_second_hit() {
        let mut w = world();
        let mut events = Vec::new();
        // Wood shield, dexterity 1: defense 1.
        assert!(hurt_player(&mut w, blow(5, 0, Direction::Left), &mut events));
        assert_eq!(w.player.life(), 2);
        assert!(!hurt_player(&mut w, blow(5, 0, Direction::Left), &mut events));
        assert_eq!(w.player.life(), 2);
        assert!(w.player.combat.as_ref().map_or(false, |c| c.invincible && c.transparent));
    }

    #[test]
    fn guard_reduces_and_parry_cancels() {
        let mut w = world();
        let mut events = Vec::new();
        w.player.facing = Direction::Right;
        if let Some(c) = w.player.combat.as_mut() {
            c.guarding = true;
            c.guard_counter = 20;
        }
        // Attacker faces left toward the player: 7 - 1 = 6, guarded to 2.
        hurt_player(&mut w, blow(7, 0, Direction::Left), &mut events);
        assert_eq!(w.player.life(), 4);
        assert!(events.contains(&GameEvent::Guarded { id: w.player.id, damage: 2 }));

        let mut w = world();
        let slime = slime_at(&mut w, 3, 2);
        w.player.facing = Direction::Right;
        if let Some(c) = w.player.combat.as_mut() {
            c.guarding = true;
            c.guard_counter = 2;
        }
        let b = Blow { source: ActorRef::In(Group::Monster, slime), ..blow(7, 4, Direction::Left) };
        let mut events = Vec::new();
        hurt_player(&mut w, b, &mut events);
        assert_eq!(w.player.life(), 6);
        assert!(!w.player.is_knocked_back());
        assert!(w.monsters[slime].is_knocked_back());
    }

    #[test]
    fn killing_a_monster_awards_exp_and_levels() {
        let mut w = world();
        let i = slime_at(&mut w, 3, 2);
        if let Some(p) = w.player.progression.as_mut() { p.exp = 4; }
        let mut b = blow(10, 0, Direction::Right);
        b.by_player = true;
        let mut events = Vec::new();
        assert!(hurt_monster(&mut w, i, b, &mut events));
        assert!(w.monsters[i].combat.as_ref().map_or(false, |c| c.dying));
        assert!(events.contains(&GameEvent::LevelUp { level: 2 }));
        assert_eq!(w.player.combat.as_ref().map(|c| c.max_life), Some(8));
        // Strength 2 with the sword.
        assert_eq!(w.player.combat.as_ref().map(|c| c.attack), Some(2));
    }

    #[test]
    fn killing_blow_does_not_knock_back() {
        let mut w = world();
        let i = slime_at(&mut w, 3, 2);
        let mut events = Vec::new();
        assert!(hurt_monster(&mut w, i, blow(10, 4, Direction::Right), &mut events));
        assert!(!w.monsters[i].is_knocked_back());
        assert!(!events.iter().any(|e| matches!(e, GameEvent::KnockedBack { .. })));

        // A blow that leaves it standing still knocks it back.
        let j = slime_at(&mut w, 5, 5);
        assert!(hurt_monster(&mut w, j, blow(1, 4, Direction::Right), &mut events));
        assert!(w.monsters[j].is_knocked_back());
    }

    #[test]
    fn hit_provokes_pursuit() {
        let mut w = world();
        let i = slime_at(&mut w, 6, 6);
        let mut events = Vec::new();
        hurt_monster(&mut w, i, blow(1, 0, Direction::Down), &mut events);
        let mode = w.monsters[i].ai.as_ref().map(|a| a.mode);
        assert_eq!(mode, Some(crate::domain::entity::AiMode::Pursue));
        assert!(events.contains(&GameEvent::ChaseStarted { id: w.monsters[i].id }));
    }

    #[test]
    fn dry_tree_needs_the_axe() {
        let mut w = world();
        let cfg = w.config.clone();
        w.spawn(Group::Tile, spawn::dry_tree(0, 0, &cfg));
        let mut events = Vec::new();
        hurt_tile(&mut w, 0, Some(ItemKind::Sword), &mut events);
        assert!(events.is_empty());
        for _ in 0..3 {
            hurt_tile(&mut w, 0, Some(ItemKind::Axe), &mut events);
            if let Some(d) = w.tiles[0].destructible.as_mut() { d.invincible = false; }
        }
        assert_eq!(w.tiles[0].kind, ActorKind::Trunk);
        assert!(!w.tiles[0].solid);
    }

    #[test]
    fn fireball_costs_mana() {
        let mut w = world();
        let mut events = Vec::new();
        for _ in 0..4 {
            assert!(launch(&mut w, ActorRef::Player, ProjectileKind::Fireball, &mut events).is_ok());
        }
        let fifth = launch(&mut w, ActorRef::Player, ProjectileKind::Fireball, &mut events);
        assert_eq!(fifth, Err(ActionError::NotEnough("mana")));
        assert!(events.contains(&GameEvent::NotEnoughResource { what: "mana" }));
        assert_eq!(w.projectiles.len(), 4);
    }

    #[test]
    fn dead_monster_leaves_a_drop() {
        let mut w = world();
        let i = slime_at(&mut w, 4, 4);
        if let Some(c) = w.monsters[i].combat.as_mut() { c.dying = true; }
        let mut events = Vec::new();
        for _ in 0..=w.config.combat.dying_frames {
            resolve_removals(&mut w, &mut events);
        }
        assert!(w.monsters.is_empty());
        assert_eq!(w.objects.len(), 1);
        assert!(events.iter().any(|e| matches!(e, GameEvent::Dropped { .. })));
        assert!(events.iter().any(|e| matches!(e, GameEvent::Removed { .. })));
    }
}

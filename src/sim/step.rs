/// The tick function: advances the world by one frame.
///
/// Processing order:
///   1. Player (input → knockback / attack / guard / move / interact, shot)
///   2. NPCs (wander)
///   3. Monsters (knockback / attack / AI + move, shot)
///   4. Projectiles (hit test, tile test, flight)
///   5. Interactive tiles (invincibility timers)
///   6. Removals (dying timers, drops, dead actors leave the lists)
///
/// List indices stay valid for the whole tick: new actors are appended and
/// nothing leaves a list before step 6.
///
/// Per actor, exactly one branch runs, in priority order:
///   knockback → attacking → guarding → movement / attack start → idle.

use log::{debug, trace};

use crate::config::CombatConfig;
use crate::domain::ai::{self, Transition};
use crate::domain::collision;
use crate::domain::entity::{ActionError, Actor, ActorKind, AiMode, Faction, ProjectileKind};
use crate::domain::geometry::Direction;
use crate::domain::item::ItemKind;
use crate::domain::pathfind::PathResult;
use crate::domain::rules;
use super::combat::{self, Blow};
use super::event::GameEvent;
use super::world::{ActorRef, Group, Probe, World};

/// Intents for one frame. `attack`, `shoot` and `interact` are
/// edge-triggered by the caller; `movement` and `guard` are held.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct FrameInput {
    pub movement: Option<Direction>,
    pub attack: bool,
    pub shoot: bool,
    pub guard: bool,
    pub interact: bool,
}

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn tick(world: &mut World, input: FrameInput) -> Vec<GameEvent> {
    if world.is_over() { return vec![]; }

    let mut events: Vec<GameEvent> = Vec::new();
    world.tick += 1;

    update_player(world, &input, &mut events);
    for i in 0..world.npcs.len() {
        update_npc(world, i);
    }
    for i in 0..world.monsters.len() {
        update_monster(world, i, &mut events);
    }
    for i in 0..world.projectiles.len() {
        update_projectile(world, i, &mut events);
    }
    update_tiles(world);
    combat::resolve_removals(world, &mut events);

    events
}

// ══════════════════════════════════════════════════════════════
// Shared actor branches
// ══════════════════════════════════════════════════════════════

/// One frame of knockback. A blocked step ends the knockback at once and
/// restores the default speed in the same frame. Being pushed into the
/// other side still counts as contact.
fn resolve_knockback(world: &mut World, who: ActorRef, events: &mut Vec<GameEvent>) {
    let frames = world.config.combat.knockback_frames;
    let Some(actor) = world.actor(who) else { return };
    let Some(kb) = actor.combat.as_ref().and_then(|c| c.knockback) else { return };
    let speed = actor.speed();
    let probe = world.probe(who, kb.direction, speed);
    contact(world, who, &probe, events);

    let Some(actor) = world.actor_mut(who) else { return };
    if probe.blocked {
        combat::end_knockback(actor);
        return;
    }
    actor.step(kb.direction, speed);
    let done = match actor.combat.as_mut().and_then(|c| c.knockback.as_mut()) {
        Some(k) => {
            k.counter += 1;
            k.counter >= frames
        }
        None => true,
    };
    if done { combat::end_knockback(actor); }
}

fn start_attack(actor: &mut Actor, events: &mut Vec<GameEvent>) -> bool {
    let id = actor.id;
    let Some(c) = actor.combat.as_mut() else { return false };
    if c.melee.is_none() || c.attacking || c.attack_cooldown > 0 { return false; }
    c.attacking = true;
    c.attack_counter = 0;
    events.push(GameEvent::AttackStarted { id });
    true
}

/// Advance an attack by one frame. The hit test runs once, on the first
/// strike frame.
fn resolve_attack(world: &mut World, who: ActorRef, events: &mut Vec<GameEvent>) {
    let cooldown = world.config.combat.attack_cooldown_frames;
    let Some(c) = world.actor_mut(who).and_then(|a| a.combat.as_mut()) else { return };
    let Some(melee) = c.melee else {
        c.attacking = false;
        return;
    };
    c.attack_counter += 1;
    let counter = c.attack_counter;

    if counter == melee.windup_frames + 1 {
        combat::strike(world, who, events);
    }
    if counter > melee.strike_end {
        if let Some(c) = world.actor_mut(who).and_then(|a| a.combat.as_mut()) {
            c.attacking = false;
            c.attack_counter = 0;
            c.attack_cooldown = cooldown;
        }
    }
}

/// Contact damage from a probe: the player running into a hostile, or a
/// hostile running into the player.
fn contact(world: &mut World, who: ActorRef, probe: &Probe, events: &mut Vec<GameEvent>) {
    let toucher = match who {
        ActorRef::Player => probe.monster.map(|i| ActorRef::In(Group::Monster, i)),
        _ if probe.player => Some(who),
        _ => None,
    };
    if let Some(t) = toucher { touch_player(world, t, events); }
}

/// `toucher` deals its contact damage to the player, whatever state
/// either of them is in.
fn touch_player(world: &mut World, toucher: ActorRef, events: &mut Vec<GameEvent>) {
    if !world.player.is_active() { return; }
    let Some(a) = world.actor(toucher).filter(|a| a.is_active()) else { return };
    let hostile = a.combat.as_ref()
        .map_or(false, |c| c.contact_damage && c.faction == Faction::Hostile);
    if !hostile { return; }
    let blow = Blow::contact(a, toucher);
    combat::hurt_player(world, blow, events);
}

/// Probe one step in the actor's facing and take it when clear.
fn walk(world: &mut World, who: ActorRef, events: &mut Vec<GameEvent>) {
    let sprite_frames = world.config.combat.sprite_frames;
    let Some(actor) = world.actor(who) else { return };
    let (dir, speed) = (actor.facing, actor.speed());
    let probe = world.probe(who, dir, speed);
    contact(world, who, &probe, events);

    let Some(actor) = world.actor_mut(who) else { return };
    if !probe.blocked { actor.step(dir, speed); }
    if let Some(m) = actor.mover.as_mut() { m.animate(sprite_frames); }
}

/// Per-frame counters: invincibility, shot and attack cooldowns.
fn tick_timers(actor: &mut Actor, cfg: &CombatConfig) {
    let Some(c) = actor.combat.as_mut() else { return };
    if c.invincible {
        c.invincible_counter += 1;
        if c.invincible_counter > c.invincible_frames {
            c.invincible = false;
            c.transparent = false;
            c.invincible_counter = 0;
        }
    }
    if c.shot_counter < cfg.shot_cooldown_frames { c.shot_counter += 1; }
    c.attack_cooldown = c.attack_cooldown.saturating_sub(1);
}

// ══════════════════════════════════════════════════════════════
// Player
// ══════════════════════════════════════════════════════════════

fn update_player(world: &mut World, input: &FrameInput, events: &mut Vec<GameEvent>) {
    if !world.player.is_active() { return; }
    let cfg = world.config.combat.clone();

    if world.player.is_knocked_back() {
        resolve_knockback(world, ActorRef::Player, events);
    } else if world.player.is_attacking() {
        resolve_attack(world, ActorRef::Player, events);
    } else if input.guard {
        if let Some(c) = world.player.combat.as_mut() {
            c.guarding = true;
            c.guard_counter += 1;
        }
    } else {
        if let Some(c) = world.player.combat.as_mut() {
            c.guarding = false;
            c.guard_counter = 0;
        }
        if input.interact {
            interact(world, events);
        }
        if input.attack {
            start_attack(&mut world.player, events);
        } else if let Some(dir) = input.movement {
            walk_player(world, dir, events);
        } else if let Some(m) = world.player.mover.as_mut() {
            m.idle(cfg.idle_reset_frames);
        }
    }

    if input.shoot { try_shoot(world, events); }
    tick_timers(&mut world.player, &cfg);
}

fn walk_player(world: &mut World, dir: Direction, events: &mut Vec<GameEvent>) {
    world.player.facing = dir;
    let speed = world.player.speed();
    let probe = world.probe(ActorRef::Player, dir, speed);

    if let Some(i) = probe.object {
        pick_up(world, i, events);
    }
    contact(world, ActorRef::Player, &probe, events);

    let frames = world.config.combat.sprite_frames;
    let p = &mut world.player;
    if !probe.blocked && !p.is_knocked_back() { p.step(dir, speed); }
    if let Some(m) = p.mover.as_mut() { m.animate(frames); }
}

/// Touching an item: pickup-only items apply at once, everything else
/// goes into the inventory. A full inventory leaves the item where it is.
fn pick_up(world: &mut World, idx: usize, events: &mut Vec<GameEvent>) {
    let Some(obj) = world.objects.get(idx).filter(|o| o.alive) else { return };
    let ActorKind::Item(kind) = obj.kind else { return };
    if kind.is_obstacle() { return; }

    let p = &mut world.player;
    if kind.is_pickup_only() {
        let amount = kind.value();
        match kind {
            ItemKind::Coin => {
                if let Some(prog) = p.progression.as_mut() { prog.coin += amount; }
                events.push(GameEvent::CoinGained { amount });
            }
            ItemKind::Heart => {
                let healed = p.combat.as_mut().map_or(0, |c| c.heal(amount));
                events.push(GameEvent::Healed { amount: healed });
            }
            _ => {
                let restored = p.progression.as_mut().map_or(0, |prog| rules::restore_mana(prog, amount));
                events.push(GameEvent::ManaRestored { amount: restored });
            }
        }
    } else {
        let Some(inv) = p.inventory.as_mut() else { return };
        if inv.obtain(kind).is_err() {
            events.push(GameEvent::InventoryFull { kind });
            return;
        }
    }

    if let Some(obj) = world.objects.get_mut(idx) { obj.alive = false; }
    events.push(GameEvent::PickedUp { kind });
    debug!("picked up {}", kind.name());
}

/// Talk to the NPC in front, or try the door in front.
fn interact(world: &mut World, events: &mut Vec<GameEvent>) {
    let facing = world.player.facing;
    let probe = world.probe(ActorRef::Player, facing, world.player.speed());

    if let Some(npc) = probe.npc.and_then(|i| world.npcs.get_mut(i)) {
        npc.facing = facing.opposite();
        events.push(GameEvent::NpcInteracted { id: npc.id });
        return;
    }

    let Some(i) = probe.object else { return };
    let Some(door) = world.objects.get(i).filter(|o| o.kind == ActorKind::Item(ItemKind::Door)) else { return };
    let door_id = door.id;
    let key = world.player.inventory.as_mut().and_then(|inv| {
        let slot = inv.find(ItemKind::Key)?;
        inv.take_one(slot).ok()
    });
    if key.is_none() {
        events.push(GameEvent::Locked);
        return;
    }
    if let Some(door) = world.objects.get_mut(i) { door.alive = false; }
    events.push(GameEvent::DoorOpened { id: door_id });
    debug!("door #{door_id} opened");
}

fn try_shoot(world: &mut World, events: &mut Vec<GameEvent>) {
    let cooldown = world.config.combat.shot_cooldown_frames;
    let ready = world.player.combat.as_ref().map_or(false, |c| c.shot_counter >= cooldown);
    if !ready || world.has_live_projectile(world.player.id) { return; }
    if let Err(e) = combat::launch(world, ActorRef::Player, ProjectileKind::Fireball, events) {
        debug!("shot refused: {e}");
    }
}

/// Use the item in inventory `slot`: weapons and shields are equipped,
/// potions are drunk.
pub fn use_item(world: &mut World, slot: usize) -> Result<GameEvent, ActionError> {
    let ts = world.tile_size();
    let p = &mut world.player;
    let inv = p.inventory.as_mut().ok_or(ActionError::EmptySlot(slot))?;
    let kind = inv.get(slot).ok_or(ActionError::EmptySlot(slot))?.kind;

    if kind.weapon().is_some() || kind.shield_defense().is_some() {
        if kind.weapon().is_some() { inv.weapon = Some(slot); } else { inv.shield = Some(slot); }
        rules::refresh_stats(p, ts);
        debug!("equipped {}", kind.name());
        return Ok(GameEvent::Equipped { kind });
    }
    if kind == ItemKind::RedPotion {
        let c = p.combat.as_mut().ok_or(ActionError::NotUsable(kind.name()))?;
        inv.take_one(slot)?;
        let amount = c.heal(kind.value());
        return Ok(GameEvent::Healed { amount });
    }
    Err(ActionError::NotUsable(kind.name()))
}

// ══════════════════════════════════════════════════════════════
// NPCs
// ══════════════════════════════════════════════════════════════

fn update_npc(world: &mut World, i: usize) {
    let who = ActorRef::In(Group::Npc, i);
    let Some(npc) = world.npcs.get_mut(i) else { return };
    if !npc.alive { return; }
    let Some(mut brain) = npc.ai.take() else { return };
    let facing = npc.facing;

    let dir = ai::wander(&mut brain, facing, world.rng());
    if let Some(npc) = world.npcs.get_mut(i) {
        npc.facing = dir;
        npc.ai = Some(brain);
    }
    walk(world, who, &mut Vec::new());
}

// ══════════════════════════════════════════════════════════════
// Monsters
// ══════════════════════════════════════════════════════════════

fn update_monster(world: &mut World, i: usize, events: &mut Vec<GameEvent>) {
    let who = ActorRef::In(Group::Monster, i);
    let Some(m) = world.monsters.get(i) else { return };
    if !m.is_active() { return; }
    let cfg = world.config.combat.clone();

    if m.is_knocked_back() {
        resolve_knockback(world, who, events);
    } else if m.is_attacking() {
        resolve_attack(world, who, events);
    } else if think(world, i, events) {
        walk(world, who, events);
    }
    let overlapping = world.monsters.get(i).map_or(false, |m| collision::touches(m, &world.player));
    if overlapping { touch_player(world, who, events); }

    if let Some(m) = world.monsters.get_mut(i) {
        tick_timers(m, &cfg);
    }
}

/// Pick this frame's direction and decide on attacks.
/// Returns false for monsters without a controller (they stand still).
fn think(world: &mut World, i: usize, events: &mut Vec<GameEvent>) -> bool {
    let who = ActorRef::In(Group::Monster, i);
    let ts = world.tile_size();
    let cooldown = world.config.combat.shot_cooldown_frames;
    let target_active = world.player.is_active();
    let target = world.player.rect();
    let goal = world.player.cell(ts);

    let Some(m) = world.monsters.get_mut(i) else { return false };
    let Some(mut brain) = m.ai.take() else { return false };
    let (id, facing, body, speed) = (m.id, m.facing, m.rect(), m.speed());
    let start = m.cell(ts);
    let (shot_counter, attack_ready) = m.combat.as_ref()
        .map_or((0, false), |c| (c.shot_counter, c.attack_cooldown == 0));

    if target_active {
        match ai::update_mode(&mut brain, start.manhattan(goal), world.rng()) {
            Some(Transition::StartChase) => {
                trace!("#{id} starts chasing");
                events.push(GameEvent::ChaseStarted { id });
            }
            Some(Transition::StopChase) => {
                trace!("#{id} gives up the chase");
                events.push(GameEvent::ChaseStopped { id });
            }
            None => {}
        }
    }

    let pursuing = target_active && brain.mode == AiMode::Pursue;
    let dir = if pursuing {
        match world.request_path(start, goal) {
            PathResult::Found(path) => {
                brain.path = path;
                brain.next_cell()
                    .and_then(|next| ai::steer(&body, next, ts, |d| world.probe(who, d, speed).blocked))
                    .unwrap_or(facing)
            }
            PathResult::Unreachable => {
                brain.path.clear();
                ai::wander(&mut brain, facing, world.rng())
            }
        }
    } else {
        ai::wander(&mut brain, facing, world.rng())
    };

    let swing = target_active && attack_ready && match brain.melee {
        Some(policy) => ai::wants_melee(&policy, &body, dir, &target, world.rng()),
        None => false,
    };
    let shot = match brain.shoot {
        Some(policy) if pursuing => {
            let live = world.has_live_projectile(id);
            ai::wants_shot(&policy, shot_counter, cooldown, live, world.rng()).then_some(policy.kind)
        }
        _ => None,
    };

    let Some(m) = world.monsters.get_mut(i) else { return false };
    m.facing = dir;
    m.ai = Some(brain);
    if swing { start_attack(m, events); }
    if let Some(kind) = shot {
        if let Err(e) = combat::launch(world, who, kind, events) {
            debug!("#{id} shot refused: {e}");
        }
    }
    true
}

// ══════════════════════════════════════════════════════════════
// Projectiles
// ══════════════════════════════════════════════════════════════

fn expire(world: &mut World, i: usize, events: &mut Vec<GameEvent>) {
    if let Some(p) = world.projectiles.get_mut(i) {
        p.alive = false;
        events.push(GameEvent::ProjectileExpired { id: p.id });
    }
}

fn update_projectile(world: &mut World, i: usize, events: &mut Vec<GameEvent>) {
    let who = ActorRef::In(Group::Projectile, i);
    let Some(p) = world.projectiles.get(i).filter(|p| p.alive) else { return };
    let Some(state) = p.projectile.clone() else { return };
    let area = p.rect();
    let blow = Blow::projectile(p, who);

    if blow.by_player {
        if let Some(m) = world.monsters.iter().position(|m| m.is_active() && area.intersects(&m.rect())) {
            combat::hurt_monster(world, m, blow, events);
            expire(world, i, events);
            return;
        }
    } else if world.player.is_active() && !world.player.is_invincible() && area.intersects(&world.player.rect()) {
        combat::hurt_player(world, blow, events);
        expire(world, i, events);
        return;
    }

    let ts = world.tile_size();
    let Some(p) = world.projectiles.get_mut(i) else { return };
    let (dir, speed) = (p.facing, p.speed());
    if collision::check_tile(&world.map, p, dir, speed, ts) || state.life <= 1 {
        expire(world, i, events);
        return;
    }
    p.step(dir, speed);
    if let Some(s) = p.projectile.as_mut() { s.life -= 1; }
}

// ══════════════════════════════════════════════════════════════
// Interactive tiles
// ══════════════════════════════════════════════════════════════

fn update_tiles(world: &mut World) {
    for t in world.tiles.iter_mut().filter(|t| t.alive) {
        let Some(d) = t.destructible.as_mut() else { continue };
        if !d.invincible { continue; }
        d.invincible_counter += 1;
        if d.invincible_counter > d.invincible_frames {
            d.invincible = false;
            d.invincible_counter = 0;
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

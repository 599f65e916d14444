/// Actor templates: stats and capability blocks for every kind of actor.
///
/// Pixel measurements are authored for a 48-unit tile and scaled to the
/// configured tile size.

use crate::config::GameConfig;

use super::entity::{
    Actor, ActorKind, AiControl, ChasePolicy, Combatant, Destructible, Faction, Inventory,
    Melee, MeleePolicy, Mover, MonsterKind, ProjectileKind, ProjectileState, Progression,
    ShootPolicy,
};
use super::geometry::{scale_px as px, Hitbox};
use super::item::ItemKind;
use super::rules;

fn scaled(x: i32, y: i32, w: i32, h: i32, tile_size: i32) -> Hitbox {
    Hitbox::new(px(x, tile_size), px(y, tile_size), px(w, tile_size).max(1), px(h, tile_size).max(1))
}

// ── Player / NPC ──

pub fn player(x: i32, y: i32, cfg: &GameConfig) -> Actor {
    let ts = cfg.timing.tile_size;
    let mut a = Actor::new(ActorKind::Player, x, y, scaled(8, 16, 32, 32, ts));
    a.solid = true;
    a.mover = Some(Mover::new(px(4, ts).max(1)));
    a.combat = Some(Combatant::new(Faction::Friendly, 6, 0, 0, cfg.combat.player_invincible_frames));
    a.progression = Some(Progression::default());

    let mut inv = Inventory::new(cfg.combat.inventory_size);
    inv.weapon = inv.obtain(ItemKind::Sword).ok();
    inv.shield = inv.obtain(ItemKind::WoodShield).ok();
    a.inventory = Some(inv);

    rules::refresh_stats(&mut a, ts);
    a
}

pub fn npc(x: i32, y: i32, cfg: &GameConfig) -> Actor {
    let ts = cfg.timing.tile_size;
    let mut a = Actor::new(ActorKind::Npc, x, y, scaled(8, 16, 32, 32, ts));
    a.solid = true;
    a.mover = Some(Mover::new(px(1, ts).max(1)));
    a.ai = Some(AiControl::wanderer(cfg.ai.wander_interval));
    a
}

// ── Monsters ──

pub fn monster(kind: MonsterKind, x: i32, y: i32, cfg: &GameConfig) -> Actor {
    let ts = cfg.timing.tile_size;
    let chase = ChasePolicy {
        start_distance: cfg.ai.chase_start_distance,
        stop_distance: cfg.ai.chase_stop_distance,
        rate: cfg.ai.chase_rate,
    };
    let invincible = cfg.combat.monster_invincible_frames;

    let (hitbox, speed, mut combat, ai) = match kind {
        MonsterKind::GreenSlime => {
            let mut ai = AiControl::wanderer(cfg.ai.wander_interval);
            ai.chase = Some(chase);
            ai.shoot = Some(ShootPolicy { rate: 200, kind: ProjectileKind::Rock });
            let mut c = Combatant::new(Faction::Hostile, 4, 5, 0, invincible);
            c.exp_reward = 2;
            (scaled(3, 18, 42, 30, ts), 1, c, ai)
        }
        MonsterKind::Orc => {
            let mut ai = AiControl::wanderer(cfg.ai.wander_interval);
            ai.chase = Some(chase);
            ai.melee = Some(MeleePolicy { rate: 30, straight: 4 * ts, lateral: ts });
            let mut c = Combatant::new(Faction::Hostile, 10, 8, 2, invincible);
            c.exp_reward = 10;
            c.melee = Some(Melee {
                width: ts, height: ts,
                windup_frames: 40, strike_end: 85, knockback: 5,
            });
            (scaled(4, 4, 40, 44, ts), 1, c, ai)
        }
        MonsterKind::Bat => {
            let ai = AiControl::wanderer(10);
            let mut c = Combatant::new(Faction::Hostile, 7, 7, 0, invincible);
            c.exp_reward = 7;
            (scaled(3, 15, 42, 21, ts), 4, c, ai)
        }
    };
    combat.contact_damage = true;

    let mut a = Actor::new(ActorKind::Monster(kind), x, y, hitbox);
    a.solid = true;
    a.mover = Some(Mover::new(px(speed, ts).max(1)));
    a.combat = Some(combat);
    a.ai = Some(ai);
    a
}

// ── Interactive tiles ──

pub fn dry_tree(x: i32, y: i32, cfg: &GameConfig) -> Actor {
    let ts = cfg.timing.tile_size;
    let mut a = Actor::new(ActorKind::DryTree, x, y, Hitbox::new(0, 0, ts, ts));
    a.solid = true;
    a.destructible = Some(Destructible {
        life: 3,
        requires: ItemKind::Axe,
        invincible: false,
        invincible_counter: 0,
        invincible_frames: cfg.combat.tile_invincible_frames,
    });
    a
}

/// What a felled tree leaves behind: walkable, never collides.
pub fn trunk(x: i32, y: i32) -> Actor {
    Actor::new(ActorKind::Trunk, x, y, Hitbox::new(0, 0, 0, 0))
}

// ── Objects ──

pub fn item(kind: ItemKind, x: i32, y: i32, cfg: &GameConfig) -> Actor {
    let ts = cfg.timing.tile_size;
    let hitbox = if kind == ItemKind::Door { scaled(0, 16, 48, 32, ts) } else { Hitbox::new(0, 0, ts, ts) };
    let mut a = Actor::new(ActorKind::Item(kind), x, y, hitbox);
    a.solid = kind.is_solid();
    a
}

// ── Projectiles ──

/// Projectile launched from `shooter`'s position in its facing direction.
pub fn projectile(kind: ProjectileKind, shooter: &Actor, faction: Faction, cfg: &GameConfig) -> Actor {
    let ts = cfg.timing.tile_size;
    let (speed, life, damage, _) = kind.stats();
    let mut a = Actor::new(ActorKind::Projectile(kind), shooter.x, shooter.y, scaled(12, 12, 24, 24, ts));
    a.facing = shooter.facing;
    a.mover = Some(Mover::new(px(speed, ts).max(1)));
    a.projectile = Some(ProjectileState {
        kind,
        faction,
        owner: shooter.id,
        damage,
        life,
        knockback: 0,
    });
    a
}

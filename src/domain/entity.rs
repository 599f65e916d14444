/// Actors: one record type for everything that has a position in the world
/// (player, NPCs, monsters, projectiles, destructible tiles, items).
///
/// What an actor can *do* is decided by which capability blocks it carries:
///   - `Mover`      : speed + walk animation counters
///   - `Combatant`  : life, attack/defense, invincibility, knockback,
///                     attack phases, guarding, dying
///   - `AiControl`  : wander / pursue controller and current path
///   - `Progression`: player level, stats, wallet, mana
///   - `Inventory`  : carried items and equipped slots
///   - `ProjectileState`, `Destructible`
///
/// Systems check for the block they need and skip actors without it.

use thiserror::Error;

use super::geometry::{Direction, Hitbox, Rect};
use super::item::ItemKind;
use super::tile::Cell;

pub type ActorId = u32;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Faction {
    Friendly,
    Hostile,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MonsterKind {
    GreenSlime,
    Orc,
    Bat,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ProjectileKind {
    Fireball,
    Rock,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ActorKind {
    Player,
    Npc,
    Monster(MonsterKind),
    Projectile(ProjectileKind),
    DryTree,
    Trunk,
    Item(ItemKind),
}

// ══════════════════════════════════════════════════════════════
// Capability blocks
// ══════════════════════════════════════════════════════════════

/// Movement speed and walk-cycle counters.
#[derive(Clone, Debug)]
pub struct Mover {
    pub speed: i32,
    pub default_speed: i32,
    pub sprite_counter: u32,
    /// 0 or 1: which walk frame the presentation layer should show.
    pub sprite_phase: u8,
    pub idle_counter: u32,
}

impl Mover {
    pub fn new(speed: i32) -> Self {
        Mover { speed, default_speed: speed, sprite_counter: 0, sprite_phase: 0, idle_counter: 0 }
    }

    /// Advance the walk cycle; flips the phase every `frames` frames.
    pub fn animate(&mut self, frames: u32) {
        self.idle_counter = 0;
        self.sprite_counter += 1;
        if self.sprite_counter > frames {
            self.sprite_phase ^= 1;
            self.sprite_counter = 0;
        }
    }

    /// Count a frame without movement; after `frames` the pose resets.
    pub fn idle(&mut self, frames: u32) {
        self.idle_counter += 1;
        if self.idle_counter >= frames {
            self.sprite_phase = 0;
            self.idle_counter = 0;
        }
    }

    pub fn restore_speed(&mut self) {
        self.speed = self.default_speed;
    }
}

/// Melee attack shape and timing.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Melee {
    /// Attack box size, placed in front of the attacker.
    pub width: i32,
    pub height: i32,
    /// Frames 1..=windup_frames are windup.
    pub windup_frames: u32,
    /// Frames windup_frames+1..=strike_end are the strike.
    pub strike_end: u32,
    pub knockback: i32,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AttackPhase {
    Windup,
    Strike,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Knockback {
    pub direction: Direction,
    pub counter: u32,
}

#[derive(Clone, Debug)]
pub struct Combatant {
    pub faction: Faction,
    pub life: i32,
    pub max_life: i32,
    pub attack: i32,
    pub defense: i32,
    /// Experience granted to whoever kills this actor.
    pub exp_reward: i32,
    /// Deals damage to the opposing faction on touch.
    pub contact_damage: bool,

    pub invincible: bool,
    pub invincible_counter: u32,
    pub invincible_frames: u32,
    /// Player-only visual hint while invincible. Never read by the core.
    pub transparent: bool,

    pub melee: Option<Melee>,
    pub attacking: bool,
    pub attack_counter: u32,
    pub attack_cooldown: u32,

    pub guarding: bool,
    pub guard_counter: u32,

    pub knockback: Option<Knockback>,

    pub dying: bool,
    pub dying_counter: u32,

    /// Frames since the last projectile launch, capped at the cooldown.
    pub shot_counter: u32,
}

impl Combatant {
    pub fn new(faction: Faction, life: i32, attack: i32, defense: i32, invincible_frames: u32) -> Self {
        Combatant {
            faction,
            life,
            max_life: life,
            attack,
            defense,
            exp_reward: 0,
            contact_damage: false,
            invincible: false,
            invincible_counter: 0,
            invincible_frames,
            transparent: false,
            melee: None,
            attacking: false,
            attack_counter: 0,
            attack_cooldown: 0,
            guarding: false,
            guard_counter: 0,
            knockback: None,
            dying: false,
            dying_counter: 0,
            shot_counter: 0,
        }
    }

    /// Which attack phase a given frame of the attack falls in.
    pub fn attack_phase(&self) -> Option<AttackPhase> {
        if !self.attacking { return None; }
        let melee = self.melee?;
        if self.attack_counter <= melee.windup_frames {
            Some(AttackPhase::Windup)
        } else if self.attack_counter <= melee.strike_end {
            Some(AttackPhase::Strike)
        } else {
            None
        }
    }

    /// Can this actor take damage right now?
    pub fn is_vulnerable(&self) -> bool {
        !self.invincible && !self.dying && self.life > 0
    }

    /// Restore life, never above max. Returns the amount actually healed.
    pub fn heal(&mut self, amount: i32) -> i32 {
        let before = self.life;
        self.life = (self.life + amount.max(0)).min(self.max_life);
        self.life - before
    }
}

// ── AI ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AiMode {
    Wander,
    Pursue,
}

/// Distances in tiles. `rate`: a 1-in-`rate` roll gates aggro.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ChasePolicy {
    pub start_distance: i32,
    pub stop_distance: i32,
    pub rate: u32,
}

/// When to swing: target within `straight` px ahead and `lateral` px sideways.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct MeleePolicy {
    pub rate: u32,
    pub straight: i32,
    pub lateral: i32,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ShootPolicy {
    pub rate: u32,
    pub kind: ProjectileKind,
}

#[derive(Clone, Debug)]
pub struct AiControl {
    pub mode: AiMode,
    pub wander_interval: u32,
    pub action_counter: u32,
    pub chase: Option<ChasePolicy>,
    pub melee: Option<MeleePolicy>,
    pub shoot: Option<ShootPolicy>,
    /// Last path found while pursuing (start excluded). Replanned on
    /// every evaluation, so the first entry is always the next step.
    pub path: Vec<Cell>,
}

impl AiControl {
    pub fn wanderer(wander_interval: u32) -> Self {
        AiControl {
            mode: AiMode::Wander,
            wander_interval,
            action_counter: 0,
            chase: None,
            melee: None,
            shoot: None,
            path: Vec::new(),
        }
    }

    pub fn next_cell(&self) -> Option<Cell> {
        self.path.first().copied()
    }
}

// ── Player-only blocks ──

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Progression {
    pub level: u32,
    pub strength: i32,
    pub dexterity: i32,
    pub exp: i32,
    pub next_level_exp: i32,
    pub coin: i32,
    pub mana: i32,
    pub max_mana: i32,
    pub ammo: i32,
}

impl Default for Progression {
    fn default() -> Self {
        Progression {
            level: 1,
            strength: 1,
            dexterity: 1,
            exp: 0,
            next_level_exp: 5,
            coin: 0,
            mana: 4,
            max_mana: 4,
            ammo: 10,
        }
    }
}

/// Failures of a player-initiated action. None of these are fatal.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Error)]
pub enum ActionError {
    #[error("inventory is full")]
    InventoryFull,
    #[error("not enough {0}")]
    NotEnough(&'static str),
    #[error("no item in slot {0}")]
    EmptySlot(usize),
    #[error("{0} can't be used")]
    NotUsable(&'static str),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Stack {
    pub kind: ItemKind,
    pub count: u32,
}

#[derive(Clone, Debug)]
pub struct Inventory {
    pub items: Vec<Stack>,
    pub capacity: usize,
    pub weapon: Option<usize>,
    pub shield: Option<usize>,
}

impl Inventory {
    pub fn new(capacity: usize) -> Self {
        Inventory { items: Vec::new(), capacity, weapon: None, shield: None }
    }

    pub fn get(&self, slot: usize) -> Option<&Stack> {
        self.items.get(slot)
    }

    pub fn find(&self, kind: ItemKind) -> Option<usize> {
        self.items.iter().position(|s| s.kind == kind)
    }

    pub fn count(&self, kind: ItemKind) -> u32 {
        self.items.iter().filter(|s| s.kind == kind).map(|s| s.count).sum()
    }

    pub fn can_obtain(&self, kind: ItemKind) -> bool {
        (kind.is_stackable() && self.find(kind).is_some()) || self.items.len() < self.capacity
    }

    /// Add one item. Stackable items merge into an existing stack.
    pub fn obtain(&mut self, kind: ItemKind) -> Result<usize, ActionError> {
        if kind.is_stackable() {
            if let Some(slot) = self.find(kind) {
                if let Some(stack) = self.items.get_mut(slot) {
                    stack.count += 1;
                }
                return Ok(slot);
            }
        }
        if self.items.len() >= self.capacity {
            return Err(ActionError::InventoryFull);
        }
        self.items.push(Stack { kind, count: 1 });
        Ok(self.items.len() - 1)
    }

    /// Take one item out of `slot`; an emptied slot is removed and
    /// equipped indices past it shift down.
    pub fn take_one(&mut self, slot: usize) -> Result<ItemKind, ActionError> {
        let stack = self.items.get_mut(slot).ok_or(ActionError::EmptySlot(slot))?;
        let kind = stack.kind;
        stack.count = stack.count.saturating_sub(1);
        if stack.count == 0 {
            self.items.remove(slot);
            self.weapon = shift_after_remove(self.weapon, slot);
            self.shield = shift_after_remove(self.shield, slot);
        }
        Ok(kind)
    }

    pub fn equipped_weapon(&self) -> Option<ItemKind> {
        self.weapon.and_then(|i| self.items.get(i)).map(|s| s.kind)
    }

    pub fn equipped_shield(&self) -> Option<ItemKind> {
        self.shield.and_then(|i| self.items.get(i)).map(|s| s.kind)
    }
}

fn shift_after_remove(equipped: Option<usize>, removed: usize) -> Option<usize> {
    match equipped {
        Some(i) if i == removed => None,
        Some(i) if i > removed => Some(i - 1),
        other => other,
    }
}

// ── Projectiles / destructibles ──

#[derive(Clone, Debug)]
pub struct ProjectileState {
    pub kind: ProjectileKind,
    pub faction: Faction,
    /// Who launched it; one live projectile per shooter.
    pub owner: ActorId,
    pub damage: i32,
    pub life: u32,
    pub knockback: i32,
}

impl ProjectileKind {
    /// (speed, life frames, damage, cost)
    pub fn stats(self) -> (i32, u32, i32, i32) {
        match self {
            ProjectileKind::Fireball => (5, 80, 2, 1),
            ProjectileKind::Rock     => (8, 80, 2, 1),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Destructible {
    pub life: i32,
    /// Only this equipped weapon can damage it.
    pub requires: ItemKind,
    pub invincible: bool,
    pub invincible_counter: u32,
    pub invincible_frames: u32,
}

// ══════════════════════════════════════════════════════════════
// Actor
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Debug)]
pub struct Actor {
    pub id: ActorId,
    pub kind: ActorKind,
    pub x: i32,
    pub y: i32,
    pub facing: Direction,
    pub hitbox: Hitbox,
    /// Blocks movers that probe into it.
    pub solid: bool,
    pub alive: bool,

    pub mover: Option<Mover>,
    pub combat: Option<Combatant>,
    pub ai: Option<AiControl>,
    pub progression: Option<Progression>,
    pub inventory: Option<Inventory>,
    pub projectile: Option<ProjectileState>,
    pub destructible: Option<Destructible>,
}

impl Actor {
    /// Bare actor with no capabilities. `id` is assigned by the world.
    pub fn new(kind: ActorKind, x: i32, y: i32, hitbox: Hitbox) -> Self {
        Actor {
            id: 0,
            kind,
            x,
            y,
            facing: Direction::Down,
            hitbox,
            solid: false,
            alive: true,
            mover: None,
            combat: None,
            ai: None,
            progression: None,
            inventory: None,
            projectile: None,
            destructible: None,
        }
    }

    /// Hitbox placed at the current position.
    pub fn rect(&self) -> Rect {
        self.hitbox.at(self.x, self.y)
    }

    /// Grid cell of the hitbox's top-left corner.
    pub fn cell(&self, tile_size: i32) -> Cell {
        let r = self.rect();
        Cell::containing(r.left(), r.top(), tile_size)
    }

    pub fn speed(&self) -> i32 {
        self.mover.as_ref().map_or(0, |m| m.speed)
    }

    /// Alive and not in the dying animation.
    pub fn is_active(&self) -> bool {
        self.alive && !self.combat.as_ref().map_or(false, |c| c.dying)
    }

    pub fn life(&self) -> i32 {
        self.combat.as_ref().map_or(0, |c| c.life)
    }

    pub fn is_invincible(&self) -> bool {
        self.combat.as_ref().map_or(false, |c| c.invincible)
    }

    pub fn is_knocked_back(&self) -> bool {
        self.combat.as_ref().map_or(false, |c| c.knockback.is_some())
    }

    pub fn is_attacking(&self) -> bool {
        self.combat.as_ref().map_or(false, |c| c.attacking)
    }

    /// Direction the actor is currently being moved in:
    /// the knockback direction overrides facing.
    pub fn travel_direction(&self) -> Direction {
        self.combat
            .as_ref()
            .and_then(|c| c.knockback)
            .map_or(self.facing, |k| k.direction)
    }

    pub fn sprite_phase(&self) -> u8 {
        self.mover.as_ref().map_or(0, |m| m.sprite_phase)
    }

    /// Move by `amount` in `dir` without any checks.
    pub fn step(&mut self, dir: Direction, amount: i32) {
        let (dx, dy) = dir.delta();
        self.x += dx * amount;
        self.y += dy * amount;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn combatant() -> Combatant {
        let mut c = Combatant::new(Faction::Hostile, 6, 1, 0, 40);
        c.melee = Some(Melee { width: 10, height: 10, windup_frames: 5, strike_end: 25, knockback: 0 });
        c
    }

    #[test]
    fn heal_is_capped_at_max() {
        let mut c = combatant();
        c.life = 3;
        assert_eq!(c.heal(2), 2);
        assert_eq!(c.heal(10), 1);
        assert_eq!(c.life, c.max_life);
        assert_eq!(c.heal(-4), 0);
    }

    #[test]
    fn attack_phases_follow_frame_counter() {
        let mut c = combatant();
        assert_eq!(c.attack_phase(), None);
        c.attacking = true;
        c.attack_counter = 1;
        assert_eq!(c.attack_phase(), Some(AttackPhase::Windup));
        c.attack_counter = 5;
        assert_eq!(c.attack_phase(), Some(AttackPhase::Windup));
        c.attack_counter = 6;
        assert_eq!(c.attack_phase(), Some(AttackPhase::Strike));
        c.attack_counter = 25;
        assert_eq!(c.attack_phase(), Some(AttackPhase::Strike));
        c.attack_counter = 26;
        assert_eq!(c.attack_phase(), None);
    }

    #[test]
    fn walk_cycle_flips_and_idle_resets() {
        let mut m = Mover::new(4);
        for _ in 0..13 { m.animate(12); }
        assert_eq!(m.sprite_phase, 1);
        for _ in 0..19 { m.idle(20); }
        assert_eq!(m.sprite_phase, 1);
        m.idle(20);
        assert_eq!(m.sprite_phase, 0);
    }

    #[test]
    fn inventory_stacks_and_fills() {
        let mut inv = Inventory::new(2);
        assert_eq!(inv.obtain(ItemKind::Key), Ok(0));
        assert_eq!(inv.obtain(ItemKind::Key), Ok(0));
        assert_eq!(inv.count(ItemKind::Key), 2);
        assert_eq!(inv.obtain(ItemKind::Sword), Ok(1));
        assert!(!inv.can_obtain(ItemKind::Axe));
        assert_eq!(inv.obtain(ItemKind::Axe), Err(ActionError::InventoryFull));
        // A stack can still grow when full.
        assert!(inv.can_obtain(ItemKind::Key));
    }

    #[test]
    fn removing_a_slot_shifts_equipment() {
        let mut inv = Inventory::new(5);
        let _ = inv.obtain(ItemKind::RedPotion);
        let sword = inv.obtain(ItemKind::Sword);
        let shield = inv.obtain(ItemKind::WoodShield);
        inv.weapon = sword.ok();
        inv.shield = shield.ok();
        assert_eq!(inv.take_one(0), Ok(ItemKind::RedPotion));
        assert_eq!(inv.equipped_weapon(), Some(ItemKind::Sword));
        assert_eq!(inv.equipped_shield(), Some(ItemKind::WoodShield));
        assert_eq!(inv.weapon, Some(0));
        assert_eq!(inv.take_one(7), Err(ActionError::EmptySlot(7)));
    }

    #[test]
    fn knockback_overrides_travel_direction() {
        let mut a = Actor::new(ActorKind::Npc, 0, 0, Hitbox::new(0, 0, 10, 10));
        a.facing = Direction::Left;
        assert_eq!(a.travel_direction(), Direction::Left);
        let mut c = combatant();
        c.knockback = Some(Knockback { direction: Direction::Up, counter: 0 });
        a.combat = Some(c);
        assert_eq!(a.travel_direction(), Direction::Up);
        assert!(a.is_knocked_back());
    }
}

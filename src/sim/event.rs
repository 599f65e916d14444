/// Events emitted during a simulation step.
/// The presentation layer consumes these for animation/sound/messages.

use crate::domain::entity::{ActorId, ProjectileKind};
use crate::domain::geometry::Direction;
use crate::domain::item::ItemKind;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GameEvent {
    // ── Combat ──
    AttackStarted { id: ActorId },
    Hit { attacker: ActorId, target: ActorId, damage: i32 },
    Guarded { id: ActorId, damage: i32 },
    Parried { id: ActorId, attacker: ActorId },
    KnockedBack { id: ActorId, direction: Direction },
    Dying { id: ActorId },
    Removed { id: ActorId },
    Dropped { kind: ItemKind, x: i32, y: i32 },
    LevelUp { level: u32 },
    PlayerDefeated,

    // ── Projectiles ──
    ProjectileLaunched { id: ActorId, kind: ProjectileKind },
    ProjectileExpired { id: ActorId },

    // ── Interactive tiles ──
    TileHit { id: ActorId },
    TileDestroyed { id: ActorId, x: i32, y: i32 },

    // ── AI ──
    ChaseStarted { id: ActorId },
    ChaseStopped { id: ActorId },

    // ── Items / interaction ──
    PickedUp { kind: ItemKind },
    CoinGained { amount: i32 },
    Healed { amount: i32 },
    ManaRestored { amount: i32 },
    Equipped { kind: ItemKind },
    InventoryFull { kind: ItemKind },
    NotEnoughResource { what: &'static str },
    Locked,
    DoorOpened { id: ActorId },
    NpcInteracted { id: ActorId },
}

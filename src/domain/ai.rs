/// Monster / NPC decision layer.
///
/// Two modes per controller:
///   1. **Wander**: hold a random cardinal direction, re-rolled every
///      `wander_interval` frames.
///   2. **Pursue**: follow a freshly planned A* path toward the target.
///
/// Transitions:
///   Wander → Pursue  target within `start_distance` tiles AND a 1-in-`rate` roll
///   Pursue → Wander  target farther than `stop_distance` tiles
///   any   → Pursue  on being hit (aggro), if the actor can chase at all
///
/// Every random draw goes through the caller's RNG so seeded worlds
/// replay identically.

use rand::Rng;

use super::entity::{AiControl, AiMode, MeleePolicy, ShootPolicy};
use super::geometry::{Direction, Rect};
use super::tile::Cell;

/// Mode change produced by `update_mode`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Transition {
    StartChase,
    StopChase,
}

// ── Mode ──

/// Evaluate the chase thresholds against the current tile distance.
pub fn update_mode<R: Rng + ?Sized>(ai: &mut AiControl, distance: i32, rng: &mut R) -> Option<Transition> {
    let chase = ai.chase?;
    match ai.mode {
        AiMode::Wander => {
            if distance > chase.start_distance { return None; }
            if rng.gen_range(0..chase.rate.max(1)) != 0 { return None; }
            ai.mode = AiMode::Pursue;
            Some(Transition::StartChase)
        }
        AiMode::Pursue => {
            if distance <= chase.stop_distance { return None; }
            ai.mode = AiMode::Wander;
            ai.path.clear();
            Some(Transition::StopChase)
        }
    }
}

/// Taking damage forces pursuit and restarts the wander timer.
pub fn provoke(ai: &mut AiControl) -> Option<Transition> {
    ai.action_counter = 0;
    if ai.chase.is_none() || ai.mode == AiMode::Pursue { return None; }
    ai.mode = AiMode::Pursue;
    Some(Transition::StartChase)
}

// ── Wander ──

/// Keep `facing` until the wander timer runs out, then roll a new one.
pub fn wander<R: Rng + ?Sized>(ai: &mut AiControl, facing: Direction, rng: &mut R) -> Direction {
    ai.action_counter += 1;
    if ai.action_counter < ai.wander_interval { return facing; }
    ai.action_counter = 0;
    Direction::ALL[rng.gen_range(0..Direction::ALL.len())]
}

// ── Pursue ──

/// Direction that brings the hitbox `body` into the grid cell `next`.
///
/// Straight moves when the box already sits inside the cell's column or
/// row. In the diagonal cases the vertical move is tried first and
/// `blocked` decides whether to fall back to the horizontal one.
/// `None` when the box is already aligned with the cell.
pub fn steer(body: &Rect, next: Cell, tile_size: i32, blocked: impl Fn(Direction) -> bool) -> Option<Direction> {
    let left = body.left();
    let right = body.left() + body.w;
    let top = body.top();
    let bottom = body.top() + body.h;
    let nx = next.col * tile_size;
    let ny = next.row * tile_size;

    let in_column = left >= nx && right < nx + tile_size;
    let in_row = top >= ny && bottom < ny + tile_size;

    if top > ny && in_column { return Some(Direction::Up); }
    if top < ny && in_column { return Some(Direction::Down); }
    if in_row {
        if left > nx { return Some(Direction::Left); }
        if left < nx { return Some(Direction::Right); }
        return None;
    }

    let vertical = if top > ny { Direction::Up } else if top < ny { Direction::Down } else { return sideways(left, nx) };
    if !blocked(vertical) { return Some(vertical); }
    sideways(left, nx)
}

fn sideways(left: i32, nx: i32) -> Option<Direction> {
    if left > nx { return Some(Direction::Left); }
    if left < nx { return Some(Direction::Right); }
    None
}

// ── Attacks ──

fn center(r: &Rect) -> (i32, i32) {
    (r.x + r.w / 2, r.y + r.h / 2)
}

/// Is `target` inside the forward reach band of an attacker facing `facing`?
pub fn in_melee_band(policy: &MeleePolicy, body: &Rect, facing: Direction, target: &Rect) -> bool {
    let (cx, cy) = center(body);
    let (tx, ty) = center(target);
    let (dx, dy) = ((tx - cx).abs(), (ty - cy).abs());
    match facing {
        Direction::Up    => ty < cy && dy < policy.straight && dx < policy.lateral,
        Direction::Down  => ty > cy && dy < policy.straight && dx < policy.lateral,
        Direction::Left  => tx < cx && dx < policy.straight && dy < policy.lateral,
        Direction::Right => tx > cx && dx < policy.straight && dy < policy.lateral,
    }
}

/// Start a swing? In-band targets are attacked on a 1-in-`rate` roll.
pub fn wants_melee<R: Rng + ?Sized>(
    policy: &MeleePolicy, body: &Rect, facing: Direction, target: &Rect, rng: &mut R,
) -> bool {
    in_melee_band(policy, body, facing, target) && rng.gen_range(0..policy.rate.max(1)) == 0
}

/// Fire? Needs the cooldown to be spent and no projectile of our own in
/// flight, then a 1-in-`rate` roll.
pub fn wants_shot<R: Rng + ?Sized>(
    policy: &ShootPolicy, shot_counter: u32, cooldown: u32, projectile_live: bool, rng: &mut R,
) -> bool {
    if projectile_live || shot_counter < cooldown { return false; }
    rng.gen_range(0..policy.rate.max(1)) == 0
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

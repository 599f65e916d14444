/// Collision resolver: single source of truth for "may this actor take
/// its next step?".
///
/// ## Model
///
/// Every check looks at the *projected* next position: the mover's hitbox
/// shifted by `speed` in the travel direction. Nothing is ever moved back
/// after overlapping, so actors never visibly interpenetrate.
///
/// Three layers, queried separately by the caller:
///   1. TILES  : static map cells under the leading edge
///   2. OBJECTS: items / fixtures (doors block, coins don't)
///   3. ACTORS : NPCs, monsters, destructible tiles, the player
///
/// The probe is a temporary `Rect`; the actor's hitbox is never displaced.
///
/// ## Bounds
///
/// Cells outside the map are blocked (see `TileMap::is_blocked`), so a
/// probe past any edge reports a collision and actors can't leave the world.

use super::entity::{Actor, Melee};
use super::geometry::{Direction, Rect};
use super::tile::TileMap;

// ══════════════════════════════════════════════════════════════
// Layer 1: Tiles
// ══════════════════════════════════════════════════════════════

/// Would moving `speed` units in `dir` put the hitbox's leading edge on a
/// blocked cell? Samples every cell the leading edge spans, from one
/// transverse edge to the other.
pub fn check_tile(map: &TileMap, actor: &Actor, dir: Direction, speed: i32, tile_size: i32) -> bool {
    if tile_size <= 0 { return true; }
    let r = actor.rect();
    let cell = |v: i32| v.div_euclid(tile_size);

    match dir {
        Direction::Up | Direction::Down => {
            let row = if dir == Direction::Up { cell(r.top() - speed) } else { cell(r.bottom() + speed) };
            (cell(r.left())..=cell(r.right())).any(|col| map.is_blocked(col, row))
        }
        Direction::Left | Direction::Right => {
            let col = if dir == Direction::Left { cell(r.left() - speed) } else { cell(r.right() + speed) };
            (cell(r.top())..=cell(r.bottom())).any(|row| map.is_blocked(col, row))
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Layer 2: Objects
// ══════════════════════════════════════════════════════════════

/// Result of probing against the object list.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct ObjectHit {
    /// A solid object is in the way.
    pub blocked: bool,
    /// First touched object, only reported when asked for.
    pub index: Option<usize>,
}

/// Probe the mover against every live object.
///
/// `want_index` is set for the player, who needs to know *what* it grazed
/// (to pick it up or open it), not only whether it is blocked.
pub fn check_object(actor: &Actor, dir: Direction, speed: i32, objects: &[Actor], want_index: bool) -> ObjectHit {
    let probe = actor.rect().shifted(dir, speed);
    let mut hit = ObjectHit::default();
    for (i, obj) in objects.iter().enumerate() {
        if !obj.alive || obj.id == actor.id { continue; }
        if !probe.intersects(&obj.rect()) { continue; }
        if obj.solid { hit.blocked = true; }
        if want_index && hit.index.is_none() { hit.index = Some(i); }
    }
    hit
}

// ══════════════════════════════════════════════════════════════
// Layer 3: Actors
// ══════════════════════════════════════════════════════════════

/// First live, solid, non-self actor the probe overlaps.
/// Non-solid actors (trunks, projectiles) are pass-through.
pub fn check_actors(actor: &Actor, dir: Direction, speed: i32, others: &[Actor]) -> Option<usize> {
    let probe = actor.rect().shifted(dir, speed);
    others.iter().position(|o| {
        o.alive && o.solid && o.id != actor.id && probe.intersects(&o.rect())
    })
}

/// Does the mover's next step overlap the player?
pub fn check_player(actor: &Actor, dir: Direction, speed: i32, player: &Actor) -> bool {
    if !player.alive || player.id == actor.id { return false; }
    actor.rect().shifted(dir, speed).intersects(&player.rect())
}

/// Static overlap of two actors' hitboxes.
pub fn touches(a: &Actor, b: &Actor) -> bool {
    a.alive && b.alive && a.rect().intersects(&b.rect())
}

/// Attack box: the melee shape placed one reach-length ahead of the
/// attacker's hitbox in its facing direction.
pub fn melee_box(actor: &Actor, melee: &Melee) -> Rect {
    let (dx, dy) = actor.facing.delta();
    Rect::new(
        actor.x + actor.hitbox.x + dx * melee.width,
        actor.y + actor.hitbox.y + dy * melee.height,
        melee.width,
        melee.height,
    )
}

/// First live, non-self actor overlapping `area`.
pub fn first_in_area(area: &Rect, self_id: u32, others: &[Actor]) -> Option<usize> {
    others.iter().position(|o| o.alive && o.id != self_id && area.intersects(&o.rect()))
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

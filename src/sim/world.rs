/// World: the complete state of a running game.
///
/// ## Actor lists
///
/// Actors live in one list per role; update order follows the list order
/// (player, NPCs, monsters, projectiles, interactive tiles):
///   - `player`     : always present, possibly dying / dead
///   - `npcs`       : friendly wanderers
///   - `monsters`   : hostile AI actors
///   - `projectiles`: fireballs and rocks in flight
///   - `tiles`      : interactive tiles (dry trees, trunks)
///   - `objects`    : items on the ground and doors
///
/// An `ActorRef` names one actor by list + index for the duration of a
/// tick. Ids (`ActorId`) are stable and unique for the world's lifetime.
///
/// ## Randomness
///
/// All random draws (wander directions, aggro rolls, drops) use the world's
/// `ChaCha8Rng`. `World::with_seed` makes a run reproducible.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::config::GameConfig;
use crate::domain::collision;
use crate::domain::entity::{Actor, ActorId, ActorKind};
use crate::domain::geometry::Direction;
use crate::domain::pathfind::{PathFinder, PathResult};
use crate::domain::spawn;
use crate::domain::tile::{Cell, TileMap};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Group {
    Npc,
    Monster,
    Projectile,
    Tile,
    Object,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ActorRef {
    Player,
    In(Group, usize),
}

/// Read-only actor view handed to the presentation layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActorView {
    pub id: ActorId,
    pub kind: ActorKind,
    pub x: i32,
    pub y: i32,
    pub facing: Direction,
    pub sprite_phase: u8,
    pub life: i32,
    pub max_life: i32,
    pub attacking: bool,
    pub guarding: bool,
    pub invincible: bool,
    pub transparent: bool,
    pub dying: bool,
}

/// What a one-step probe ran into.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Probe {
    /// Any layer blocks the step.
    pub blocked: bool,
    /// First object touched (player probes only).
    pub object: Option<usize>,
    pub npc: Option<usize>,
    pub monster: Option<usize>,
    pub tile: Option<usize>,
    pub player: bool,
}

pub struct World {
    pub config: GameConfig,
    pub map: TileMap,

    // ── Actors ──
    pub player: Actor,
    pub npcs: Vec<Actor>,
    pub monsters: Vec<Actor>,
    pub projectiles: Vec<Actor>,
    pub tiles: Vec<Actor>,
    pub objects: Vec<Actor>,

    // ── Meta ──
    pub tick: u64,
    finder: PathFinder,
    rng: ChaCha8Rng,
    next_id: ActorId,
    over: bool,
}

impl World {
    /// Empty world on `map` with the player in the top-left cell.
    /// Seeds from `config.timing.seed` when set, otherwise from entropy.
    pub fn new(map: TileMap, config: GameConfig) -> Self {
        let rng = match config.timing.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        World::build(map, config, rng)
    }

    pub fn with_seed(map: TileMap, config: GameConfig, seed: u64) -> Self {
        World::build(map, config, ChaCha8Rng::seed_from_u64(seed))
    }

    fn build(map: TileMap, config: GameConfig, rng: ChaCha8Rng) -> Self {
        let finder = PathFinder::for_map(&map, config.ai.path_max_steps);
        let mut player = spawn::player(0, 0, &config);
        player.id = 1;
        World {
            config,
            map,
            player,
            npcs: Vec::new(),
            monsters: Vec::new(),
            projectiles: Vec::new(),
            tiles: Vec::new(),
            objects: Vec::new(),
            tick: 0,
            finder,
            rng,
            next_id: 2,
            over: false,
        }
    }

    pub fn tile_size(&self) -> i32 {
        self.config.timing.tile_size
    }

    /// World position of a cell's top-left corner.
    pub fn cell_origin(&self, cell: Cell) -> (i32, i32) {
        (cell.col * self.tile_size(), cell.row * self.tile_size())
    }

    pub fn place_player(&mut self, cell: Cell) {
        let (x, y) = self.cell_origin(cell);
        self.player.x = x;
        self.player.y = y;
    }

    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }

    pub fn is_over(&self) -> bool {
        self.over
    }

    pub(crate) fn end(&mut self) {
        self.over = true;
    }

    // ── Actor bookkeeping ──

    pub fn alloc_id(&mut self) -> ActorId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Add an actor to a list, assigning it a fresh id.
    pub fn spawn(&mut self, group: Group, mut actor: Actor) -> ActorId {
        actor.id = self.alloc_id();
        let id = actor.id;
        self.list_mut(group).push(actor);
        id
    }

    pub fn list(&self, group: Group) -> &[Actor] {
        match group {
            Group::Npc        => &self.npcs,
            Group::Monster    => &self.monsters,
            Group::Projectile => &self.projectiles,
            Group::Tile       => &self.tiles,
            Group::Object     => &self.objects,
        }
    }

    pub fn list_mut(&mut self, group: Group) -> &mut Vec<Actor> {
        match group {
            Group::Npc        => &mut self.npcs,
            Group::Monster    => &mut self.monsters,
            Group::Projectile => &mut self.projectiles,
            Group::Tile       => &mut self.tiles,
            Group::Object     => &mut self.objects,
        }
    }

    pub fn actor(&self, r: ActorRef) -> Option<&Actor> {
        match r {
            ActorRef::Player => Some(&self.player),
            ActorRef::In(group, i) => self.list(group).get(i),
        }
    }

    pub fn actor_mut(&mut self, r: ActorRef) -> Option<&mut Actor> {
        match r {
            ActorRef::Player => Some(&mut self.player),
            ActorRef::In(group, i) => self.list_mut(group).get_mut(i),
        }
    }

    pub fn find(&self, id: ActorId) -> Option<ActorRef> {
        if self.player.id == id { return Some(ActorRef::Player); }
        [Group::Npc, Group::Monster, Group::Projectile, Group::Tile, Group::Object]
            .into_iter()
            .find_map(|g| self.list(g).iter().position(|a| a.id == id).map(|i| ActorRef::In(g, i)))
    }

    /// Does `owner` have a projectile in flight?
    pub fn has_live_projectile(&self, owner: ActorId) -> bool {
        self.projectiles.iter().any(|p| {
            p.alive && p.projectile.as_ref().map_or(false, |s| s.owner == owner)
        })
    }

    // ── Pathfinding ──

    /// Cells held by live solid interactive tiles; the path search treats
    /// them as walls.
    pub fn obstacle_cells(&self) -> Vec<Cell> {
        let ts = self.tile_size();
        self.tiles
            .iter()
            .filter(|t| t.alive && t.solid && t.destructible.is_some())
            .map(|t| Cell::containing(t.x, t.y, ts))
            .collect()
    }

    /// A* from `start` to `goal` over the map plus live obstacles.
    pub fn request_path(&mut self, start: Cell, goal: Cell) -> PathResult {
        let obstacles = self.obstacle_cells();
        self.finder.request_path(&self.map, &obstacles, start, goal)
    }

    /// Swap in a new map along with a path finder sized for it.
    pub fn set_map(&mut self, map: TileMap) {
        self.finder = PathFinder::for_map(&map, self.config.ai.path_max_steps);
        self.map = map;
    }

    // ── Collision ──

    /// Probe one step of `speed` in `dir` for actor `me` against every
    /// layer: tiles, objects, NPCs, monsters, interactive tiles, player.
    pub fn probe(&self, me: ActorRef, dir: Direction, speed: i32) -> Probe {
        let Some(actor) = self.actor(me) else { return Probe { blocked: true, ..Probe::default() } };
        let mut probe = Probe::default();

        if collision::check_tile(&self.map, actor, dir, speed, self.tile_size()) {
            probe.blocked = true;
        }

        let objects = collision::check_object(actor, dir, speed, &self.objects, me == ActorRef::Player);
        probe.blocked |= objects.blocked;
        probe.object = objects.index;

        probe.npc = collision::check_actors(actor, dir, speed, &self.npcs);
        probe.monster = collision::check_actors(actor, dir, speed, &self.monsters);
        probe.tile = collision::check_actors(actor, dir, speed, &self.tiles);
        probe.blocked |= probe.npc.is_some() || probe.monster.is_some() || probe.tile.is_some();

        if me != ActorRef::Player && self.player.solid && collision::check_player(actor, dir, speed, &self.player) {
            probe.player = true;
            probe.blocked = true;
        }
        probe
    }

    // ── Presentation ──

    /// Every live actor, in draw order: objects, tiles, NPCs, monsters,
    /// projectiles, then the player.
    pub fn snapshot(&self) -> Vec<ActorView> {
        self.objects.iter()
            .chain(&self.tiles)
            .chain(&self.npcs)
            .chain(&self.monsters)
            .chain(&self.projectiles)
            .chain(std::iter::once(&self.player))
            .filter(|a| a.alive)
            .map(view_of)
            .collect()
    }
}

fn view_of(a: &Actor) -> ActorView {
    let c = a.combat.as_ref();
    ActorView {
        id: a.id,
        kind: a.kind,
        x: a.x,
        y: a.y,
        facing: a.facing,
        sprite_phase: a.sprite_phase(),
        life: c.map_or_else(|| a.destructible.as_ref().map_or(0, |d| d.life), |c| c.life),
        max_life: c.map_or(0, |c| c.max_life),
        attacking: c.map_or(false, |c| c.attacking),
        guarding: c.map_or(false, |c| c.guarding),
        invincible: c.map_or(false, |c| c.invincible),
        transparent: c.map_or(false, |c| c.transparent),
        dying: c.map_or(false, |c| c.dying),
    }
}

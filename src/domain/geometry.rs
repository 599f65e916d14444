/// Directions and axis-aligned boxes.
///
/// World positions are in sub-tile units (pixels). A `Hitbox` is an offset
/// and size relative to its owner's position; `Rect` is a box placed in the
/// world. Probing a move never mutates a hitbox: it builds a shifted `Rect`.

use serde::{Deserialize, Serialize};

/// Tile size that pixel measurements are authored against.
pub const BASE_TILE: i32 = 48;

/// Scale a measurement authored for `BASE_TILE` to `tile_size`.
pub fn scale_px(v: i32, tile_size: i32) -> i32 {
    v * tile_size / BASE_TILE
}

/// Cardinal facing / movement direction.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub enum Direction {
    Up,
    #[default]
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::Up, Direction::Down, Direction::Left, Direction::Right];

    /// Unit step (dx, dy). Screen coordinates: y grows downward.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up    => (0, -1),
            Direction::Down  => (0, 1),
            Direction::Left  => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up    => Direction::Down,
            Direction::Down  => Direction::Up,
            Direction::Left  => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }
}

/// A box placed in world space. Half-open: `[x, x + w) × [y, y + h)`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Rect { x, y, w, h }
    }

    pub fn left(&self) -> i32 { self.x }
    pub fn top(&self) -> i32 { self.y }
    /// Last pixel column inside the box.
    pub fn right(&self) -> i32 { self.x + self.w - 1 }
    /// Last pixel row inside the box.
    pub fn bottom(&self) -> i32 { self.y + self.h - 1 }

    /// Strict overlap: boxes that only share an edge do not intersect.
    pub fn intersects(&self, other: &Rect) -> bool {
        if self.w <= 0 || self.h <= 0 || other.w <= 0 || other.h <= 0 { return false; }
        self.x < other.x + other.w
            && other.x < self.x + self.w
            && self.y < other.y + other.h
            && other.y < self.y + self.h
    }

    /// Same box moved `amount` units in `dir`.
    pub fn shifted(&self, dir: Direction, amount: i32) -> Rect {
        let (dx, dy) = dir.delta();
        Rect { x: self.x + dx * amount, y: self.y + dy * amount, ..*self }
    }
}

/// Hurtbox: offset + size relative to the owner's position.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Hitbox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Hitbox {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Hitbox { x, y, width, height }
    }

    /// The box placed at an owner position.
    pub fn at(&self, pos_x: i32, pos_y: i32) -> Rect {
        Rect::new(pos_x + self.x, pos_y + self.y, self.width, self.height)
    }
}

/// Tile types, grid cells and the static tile map.
/// Properties are queried via methods, not stored as flags,
/// so tile semantics are centralized here.

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Tile {
    #[default]
    Grass,
    Floor,
    Wall,   // Solid
    Water,  // Solid
    Tree,   // Solid
    Sand,
}

impl Tile {
    /// Does this tile stop movement?
    pub fn is_solid(self) -> bool {
        matches!(self, Tile::Wall | Tile::Water | Tile::Tree)
    }
}

/// Integer grid coordinate. Signed so that probes past the left/top edge
/// stay representable and can be rejected instead of wrapping.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct Cell {
    pub col: i32,
    pub row: i32,
}

impl Cell {
    pub const fn new(col: i32, row: i32) -> Self {
        Cell { col, row }
    }

    /// Manhattan distance in cells.
    pub fn manhattan(self, other: Cell) -> i32 {
        (self.col - other.col).abs() + (self.row - other.row).abs()
    }

    /// Cell that contains the world-space point (x, y).
    /// Floors toward negative infinity so points left of the map land
    /// on column -1 instead of column 0.
    pub fn containing(x: i32, y: i32, tile_size: i32) -> Self {
        Cell { col: x.div_euclid(tile_size), row: y.div_euclid(tile_size) }
    }
}

/// Static description of the active map. Read-only to the simulation.
///
/// `tiles[row][col]`. Every lookup is bounds-checked; anything outside the
/// map is treated as blocked so actors can never leave the world.
#[derive(Clone, Debug)]
pub struct TileMap {
    map_id: usize,
    width: usize,
    height: usize,
    tiles: Vec<Vec<Tile>>,
}

impl TileMap {
    /// Build a map from rows. Short rows are padded with solid walls.
    pub fn new(map_id: usize, tiles: Vec<Vec<Tile>>) -> Self {
        let height = tiles.len();
        let width = tiles.iter().map(Vec::len).max().unwrap_or(0);
        let mut tiles = tiles;
        for row in &mut tiles {
            row.resize(width, Tile::Wall);
        }
        TileMap { map_id, width, height, tiles }
    }

    /// A `width` × `height` map filled with one tile.
    pub fn filled(map_id: usize, width: usize, height: usize, tile: Tile) -> Self {
        TileMap::new(map_id, vec![vec![tile; width]; height])
    }

    pub fn width(&self) -> usize { self.width }
    pub fn height(&self) -> usize { self.height }
    pub fn map_id(&self) -> usize { self.map_id }

    pub fn in_bounds(&self, col: i32, row: i32) -> bool {
        col >= 0 && row >= 0 && (col as usize) < self.width && (row as usize) < self.height
    }

    /// Tile at (col, row), or `None` outside the map.
    pub fn tile(&self, col: i32, row: i32) -> Option<Tile> {
        if !self.in_bounds(col, row) { return None; }
        self.tiles.get(row as usize).and_then(|r| r.get(col as usize)).copied()
    }

    /// Is the cell impassable? Out of bounds = blocked.
    #[inline]
    pub fn is_blocked(&self, col: i32, row: i32) -> bool {
        self.tile(col, row).map_or(true, Tile::is_solid)
    }

    pub fn is_cell_blocked(&self, cell: Cell) -> bool {
        self.is_blocked(cell.col, cell.row)
    }

    /// Replace a tile. Out-of-bounds writes are ignored.
    pub fn set_tile(&mut self, col: i32, row: i32, tile: Tile) {
        if !self.in_bounds(col, row) { return; }
        if let Some(slot) = self.tiles.get_mut(row as usize).and_then(|r| r.get_mut(col as usize)) {
            *slot = tile;
        }
    }
}

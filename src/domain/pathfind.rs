/// A* path search over the tile grid.
///
/// One `Node` per cell, allocated once per map and reset at the start of
/// every request. Costs are computed eagerly for the whole grid:
///   g = Manhattan distance from the request start
///   h = Manhattan distance to the request goal
///   f = g + h
/// They are never updated during the search. That is only valid because
/// every step costs the same and terrain is unweighted.
///
/// ## Request lifecycle
///
///   Idle → Searching → GoalReached | Exhausted
///
/// Each iteration closes the current node, opens its neighbours in the
/// fixed order up, left, down, right, then picks the open node with the
/// lowest f (ties: lowest g, then earliest opened). The loop is bounded by
/// `max_steps`; running out of steps and running out of open nodes are the
/// same result: `Unreachable`.

use log::trace;

use super::tile::{Cell, TileMap};

/// Iteration bound per request.
pub const DEFAULT_MAX_STEPS: usize = 500;

/// Neighbour expansion order: up, left, down, right.
const NEIGHBOURS: [(i32, i32); 4] = [(0, -1), (-1, 0), (0, 1), (1, 0)];

#[derive(Clone, Debug, Default)]
pub struct Node {
    pub col: i32,
    pub row: i32,
    pub g: i32,
    pub h: i32,
    pub f: i32,
    pub blocked: bool,
    pub open: bool,
    pub closed: bool,
    /// Index of the predecessor on the best known path.
    pub parent: Option<usize>,
}

impl Node {
    fn reset(&mut self) {
        self.g = 0;
        self.h = 0;
        self.f = 0;
        self.blocked = false;
        self.open = false;
        self.closed = false;
        self.parent = None;
    }
}

/// Cells from (excluding) start to (including) goal, or no path.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum PathResult {
    Found(Vec<Cell>),
    Unreachable,
}

impl PathResult {
    pub fn is_found(&self) -> bool {
        matches!(self, PathResult::Found(_))
    }

    pub fn cells(&self) -> Option<&[Cell]> {
        match self {
            PathResult::Found(cells) => Some(cells),
            PathResult::Unreachable => None,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SearchState {
    Idle,
    Searching,
    GoalReached,
    Exhausted,
}

pub struct PathFinder {
    width: usize,
    height: usize,
    nodes: Vec<Node>,
    /// Open set, in insertion order (tie-break relies on it).
    open: Vec<usize>,
    max_steps: usize,
    state: SearchState,
}

impl PathFinder {
    pub fn new(width: usize, height: usize, max_steps: usize) -> Self {
        let mut finder = PathFinder {
            width: 0,
            height: 0,
            nodes: Vec::new(),
            open: Vec::new(),
            max_steps,
            state: SearchState::Idle,
        };
        finder.allocate(width, height);
        finder
    }

    /// Finder sized for `map`.
    pub fn for_map(map: &TileMap, max_steps: usize) -> Self {
        PathFinder::new(map.width(), map.height(), max_steps)
    }

    pub fn state(&self) -> SearchState {
        self.state
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    pub fn node(&self, cell: Cell) -> Option<&Node> {
        self.index(cell.col, cell.row).and_then(|i| self.nodes.get(i))
    }

    fn allocate(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.nodes = (0..width * height)
            .map(|i| Node { col: (i % width) as i32, row: (i / width) as i32, ..Node::default() })
            .collect();
        self.open = Vec::with_capacity(width * height);
    }

    fn index(&self, col: i32, row: i32) -> Option<usize> {
        if col < 0 || row < 0 { return None; }
        let (c, r) = (col as usize, row as usize);
        if c >= self.width || r >= self.height { return None; }
        Some(r * self.width + c)
    }

    /// Find a path from `start` to `goal`.
    ///
    /// `obstacles` are extra blocked cells on top of the map (e.g. cells
    /// held by destructible obstacles). Out-of-bounds endpoints are
    /// unreachable; `start == goal` is an empty path.
    pub fn request_path(&mut self, map: &TileMap, obstacles: &[Cell], start: Cell, goal: Cell) -> PathResult {
        if map.width() != self.width || map.height() != self.height {
            self.allocate(map.width(), map.height());
        }

        let (start_idx, goal_idx) = match (self.index(start.col, start.row), self.index(goal.col, goal.row)) {
            (Some(s), Some(g)) => (s, g),
            _ => {
                self.state = SearchState::Exhausted;
                trace!("path {start:?} -> {goal:?}: endpoint out of bounds");
                return PathResult::Unreachable;
            }
        };

        if start_idx == goal_idx {
            self.state = SearchState::GoalReached;
            return PathResult::Found(Vec::new());
        }

        self.setup(map, obstacles, start, goal);
        self.search(start_idx, goal_idx, start, goal)
    }

    // ── Setup: reset every node, recompute blocked + costs ──

    fn setup(&mut self, map: &TileMap, obstacles: &[Cell], start: Cell, goal: Cell) {
        self.open.clear();
        for node in &mut self.nodes {
            node.reset();
            let here = Cell::new(node.col, node.row);
            node.blocked = map.is_cell_blocked(here);
            node.g = here.manhattan(start);
            node.h = here.manhattan(goal);
            node.f = node.g + node.h;
        }
        for &cell in obstacles {
            if let Some(i) = self.index(cell.col, cell.row) {
                if let Some(node) = self.nodes.get_mut(i) {
                    node.blocked = true;
                }
            }
        }
    }

    // ── Search loop ──

    fn search(&mut self, start_idx: usize, goal_idx: usize, start: Cell, goal: Cell) -> PathResult {
        self.state = SearchState::Searching;
        let mut current = start_idx;
        if let Some(node) = self.nodes.get_mut(current) {
            node.open = true;
        }
        self.open.push(current);

        let mut steps = 0;
        while steps < self.max_steps {
            if let Some(node) = self.nodes.get_mut(current) {
                node.closed = true;
            }
            self.open.retain(|&i| i != current);

            let (col, row) = match self.nodes.get(current) {
                Some(n) => (n.col, n.row),
                None => break,
            };
            for &(dc, dr) in &NEIGHBOURS {
                if let Some(next) = self.index(col + dc, row + dr) {
                    self.open_node(next, current);
                }
            }

            current = match self.best_open() {
                Some(i) => i,
                None => break,
            };
            if current == goal_idx {
                self.state = SearchState::GoalReached;
                let path = self.track(goal_idx);
                trace!("path {start:?} -> {goal:?}: {} cells after {} steps", path.len(), steps + 1);
                return PathResult::Found(path);
            }
            steps += 1;
        }

        self.state = SearchState::Exhausted;
        trace!("path {start:?} -> {goal:?}: unreachable after {steps} steps");
        PathResult::Unreachable
    }

    fn open_node(&mut self, idx: usize, parent: usize) {
        let Some(node) = self.nodes.get_mut(idx) else { return };
        if node.open || node.closed || node.blocked { return; }
        node.open = true;
        node.parent = Some(parent);
        self.open.push(idx);
    }

    /// Lowest f, then lowest g, then first in insertion order.
    fn best_open(&self) -> Option<usize> {
        let mut best: Option<&Node> = None;
        let mut best_idx = None;
        for &i in &self.open {
            let Some(n) = self.nodes.get(i) else { continue };
            let better = match best {
                None => true,
                Some(b) => n.f < b.f || (n.f == b.f && n.g < b.g),
            };
            if better {
                best = Some(n);
                best_idx = Some(i);
            }
        }
        best_idx
    }

    /// Walk parents back from the goal; start excluded, start→goal order.
    fn track(&self, goal_idx: usize) -> Vec<Cell> {
        let mut path = Vec::new();
        let mut cursor = Some(goal_idx);
        while let Some(i) = cursor {
            let Some(node) = self.nodes.get(i) else { break };
            // The start node is the only one without a parent.
            if node.parent.is_none() { break; }
            path.push(Cell::new(node.col, node.row));
            cursor = node.parent;
        }
        path.reverse();
        path
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tile::Tile;
    use rstest::rstest;

    fn tiles_from(rows: &[&str]) -> TileMap {
        let tiles = rows.iter().map(|row| {
            row.chars().map(|ch| if ch == '#' { Tile::Wall } else { Tile::Grass }).collect()
        }).collect();
        TileMap::new(0, tiles)
    }

    fn open_map(w: usize, h: usize) -> TileMap {
        TileMap::filled(0, w, h, Tile::Grass)
    }

    fn is_connected(start: Cell, path: &[Cell]) -> bool {
        let mut prev = start;
        for &c in path {
            if prev.manhattan(c) != 1 { return false; }
            prev = c;
        }
        true
    }

    #[test]
    fn straight_row_path() {
        let map = open_map(10, 10);
        let mut pf = PathFinder::for_map(&map, DEFAULT_MAX_STEPS);
        let result = pf.request_path(&map, &[], Cell::new(0, 0), Cell::new(9, 0));
        let cells = result.cells().map(<[Cell]>::to_vec).unwrap_or_default();
        assert_eq!(cells.len(), 9);
        assert!(cells.iter().all(|c| c.row == 0));
        assert_eq!(cells.last(), Some(&Cell::new(9, 0)));
        assert_eq!(pf.state(), SearchState::GoalReached);
    }

    #[rstest]
    #[case((0, 0), (9, 9))]
    #[case((9, 9), (0, 0))]
    #[case((3, 7), (8, 1))]
    #[case((5, 5), (5, 0))]
    #[case((0, 9), (9, 0))]
    fn open_grid_paths_are_manhattan_length(#[case] s: (i32, i32), #[case] g: (i32, i32)) {
        let map = open_map(10, 10);
        let mut pf = PathFinder::for_map(&map, DEFAULT_MAX_STEPS);
        let start = Cell::new(s.0, s.1);
        let goal = Cell::new(g.0, g.1);
        match pf.request_path(&map, &[], start, goal) {
            PathResult::Found(path) => {
                assert_eq!(path.len() as i32, start.manhattan(goal));
                assert!(is_connected(start, &path));
                assert_eq!(path.last(), Some(&goal));
            }
            PathResult::Unreachable => panic!("open grid must be reachable"),
        }
    }

    #[test]
    fn same_cell_is_empty_path() {
        let map = open_map(4, 4);
        let mut pf = PathFinder::for_map(&map, DEFAULT_MAX_STEPS);
        assert_eq!(pf.request_path(&map, &[], Cell::new(2, 2), Cell::new(2, 2)), PathResult::Found(vec![]));
    }

    #[test]
    fn walled_in_goal_is_unreachable() {
        let map = tiles_from(&[
            "     ",
            "  #  ",
            " # # ",
            "  #  ",
            "     ",
        ]);
        let mut pf = PathFinder::for_map(&map, DEFAULT_MAX_STEPS);
        assert_eq!(pf.request_path(&map, &[], Cell::new(0, 0), Cell::new(2, 2)), PathResult::Unreachable);
        assert_eq!(pf.state(), SearchState::Exhausted);
    }

    #[test]
    fn obstacles_block_like_walls() {
        let map = open_map(5, 5);
        let mut pf = PathFinder::for_map(&map, DEFAULT_MAX_STEPS);
        let ring = [Cell::new(2, 1), Cell::new(1, 2), Cell::new(3, 2), Cell::new(2, 3)];
        assert_eq!(pf.request_path(&map, &ring, Cell::new(0, 0), Cell::new(2, 2)), PathResult::Unreachable);
        // Same finder, next request: obstacles from the last call are gone.
        assert!(pf.request_path(&map, &[], Cell::new(0, 0), Cell::new(2, 2)).is_found());
    }

    #[test]
    fn detours_around_a_wall() {
        let map = tiles_from(&[
            "     ",
            " ### ",
            "     ",
        ]);
        let mut pf = PathFinder::for_map(&map, DEFAULT_MAX_STEPS);
        let start = Cell::new(2, 0);
        let goal = Cell::new(2, 2);
        let path = pf.request_path(&map, &[], start, goal);
        let cells = path.cells().map(<[Cell]>::to_vec).unwrap_or_default();
        assert_eq!(cells.len(), 6);
        assert!(is_connected(start, &cells));
        assert!(cells.iter().all(|c| !map.is_cell_blocked(*c)));
    }

    #[test]
    fn neighbour_order_prefers_up_then_left() {
        // Symmetric choice: from (1,1) to (0,0) both (1,0) and (0,1) are optimal.
        // Up is opened first and wins the tie.
        let map = open_map(3, 3);
        let mut pf = PathFinder::for_map(&map, DEFAULT_MAX_STEPS);
        let path = pf.request_path(&map, &[], Cell::new(1, 1), Cell::new(0, 0));
        assert_eq!(path, PathResult::Found(vec![Cell::new(1, 0), Cell::new(0, 0)]));
    }

    #[test]
    fn out_of_bounds_endpoints_are_unreachable() {
        let map = open_map(3, 3);
        let mut pf = PathFinder::for_map(&map, DEFAULT_MAX_STEPS);
        assert_eq!(pf.request_path(&map, &[], Cell::new(-1, 0), Cell::new(1, 1)), PathResult::Unreachable);
        assert_eq!(pf.request_path(&map, &[], Cell::new(0, 0), Cell::new(3, 0)), PathResult::Unreachable);
    }

    #[test]
    fn step_bound_reports_unreachable() {
        let map = open_map(30, 30);
        let mut pf = PathFinder::for_map(&map, 5);
        assert_eq!(pf.request_path(&map, &[], Cell::new(0, 0), Cell::new(29, 29)), PathResult::Unreachable);
    }

    #[test]
    fn nodes_are_reset_between_requests() {
        let map = open_map(6, 6);
        let mut pf = PathFinder::for_map(&map, DEFAULT_MAX_STEPS);
        let _ = pf.request_path(&map, &[Cell::new(3, 3)], Cell::new(0, 0), Cell::new(5, 5));
        let _ = pf.request_path(&map, &[], Cell::new(5, 0), Cell::new(5, 1));
        let n = pf.node(Cell::new(3, 3)).map(|n| (n.blocked, n.closed, n.g, n.h));
        assert_eq!(n, Some((false, false, 5, 4)));
    }

    #[test]
    fn resizes_for_a_new_map() {
        let small = open_map(2, 2);
        let big = open_map(8, 3);
        let mut pf = PathFinder::for_map(&small, DEFAULT_MAX_STEPS);
        let result = pf.request_path(&big, &[], Cell::new(0, 0), Cell::new(7, 2));
        assert_eq!(result.cells().map(<[Cell]>::len), Some(9));
    }
}

/// Level loader: text maps → tile map + spawn list.
///
/// ## Sources (priority order):
///   1. `level_file` from the config (a single `.txt` level)
///   2. Built-in embedded levels
///
/// `load_dir` reads every `.txt` level of a directory, sorted by file name.
///
/// ## Text format:
///   `;` lines are comments; the first one names the level.
///   Every other line is one map row. All rows must have the same width.
///   Trailing blank lines are ignored.
///
/// ## Legend:
///   '#' = Wall          '~' = Water         'T' = Tree
///   ' ' = Grass         '.' = Floor         ':' = Sand
///   'P' = Player spawn  'N' = NPC
///   's' = Green slime   'o' = Orc           'b' = Bat
///   'd' = Dry tree (destructible)
///   '$' = Coin          'h' = Heart         'm' = Mana crystal
///   'r' = Red potion    'k' = Key           'D' = Door
///   'a' = Axe           'S' = Blue shield
///
/// Actor glyphs stand on grass.

use std::path::{Path, PathBuf};

use log::{info, warn};
use thiserror::Error;

use crate::config::GameConfig;
use crate::domain::entity::MonsterKind;
use crate::domain::item::ItemKind;
use crate::domain::spawn;
use crate::domain::tile::{Cell, Tile, TileMap};
use super::world::{Group, World};

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("level has no map rows")]
    Empty,
    #[error("row {row} is {found} cells wide, expected {expected}")]
    Ragged { row: usize, found: usize, expected: usize },
    #[error("unknown glyph {glyph:?} at column {col}, row {row}")]
    UnknownGlyph { glyph: char, col: usize, row: usize },
    #[error("level has no player spawn")]
    MissingPlayer,
    #[error("second player spawn at column {col}, row {row}")]
    DuplicatePlayer { col: usize, row: usize },
    #[error("could not read {}: {source}", path.display())]
    Read { path: PathBuf, source: std::io::Error },
}

/// What stands on a cell when the level starts.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Spawn {
    Npc,
    Monster(MonsterKind),
    DryTree,
    Item(ItemKind),
}

#[derive(Clone, Debug)]
pub struct Level {
    pub name: String,
    pub map: TileMap,
    pub player: Cell,
    pub spawns: Vec<(Spawn, Cell)>,
}

// ══════════════════════════════════════════════════════════════
// Parsing
// ══════════════════════════════════════════════════════════════

fn glyph(ch: char) -> Option<(Tile, Option<Spawn>)> {
    let spawn = |s| Some((Tile::Grass, Some(s)));
    match ch {
        '#' => Some((Tile::Wall, None)),
        '~' => Some((Tile::Water, None)),
        'T' => Some((Tile::Tree, None)),
        ' ' => Some((Tile::Grass, None)),
        '.' => Some((Tile::Floor, None)),
        ':' => Some((Tile::Sand, None)),
        'N' => spawn(Spawn::Npc),
        's' => spawn(Spawn::Monster(MonsterKind::GreenSlime)),
        'o' => spawn(Spawn::Monster(MonsterKind::Orc)),
        'b' => spawn(Spawn::Monster(MonsterKind::Bat)),
        'd' => spawn(Spawn::DryTree),
        '$' => spawn(Spawn::Item(ItemKind::Coin)),
        'h' => spawn(Spawn::Item(ItemKind::Heart)),
        'm' => spawn(Spawn::Item(ItemKind::ManaCrystal)),
        'r' => spawn(Spawn::Item(ItemKind::RedPotion)),
        'k' => spawn(Spawn::Item(ItemKind::Key)),
        'D' => spawn(Spawn::Item(ItemKind::Door)),
        'a' => spawn(Spawn::Item(ItemKind::Axe)),
        'S' => spawn(Spawn::Item(ItemKind::BlueShield)),
        _ => None,
    }
}

/// Parse a single level from text content.
pub fn parse(content: &str) -> Result<Level, LevelError> {
    let mut name = String::new();
    let mut rows: Vec<&str> = vec![];

    for line in content.lines() {
        if let Some(comment) = line.strip_prefix(';') {
            if name.is_empty() { name = comment.trim().to_string(); }
        } else {
            rows.push(line);
        }
    }
    while rows.last().map_or(false, |r| r.trim().is_empty()) {
        rows.pop();
    }
    let expected = rows.first().map(|r| r.chars().count()).ok_or(LevelError::Empty)?;
    if expected == 0 { return Err(LevelError::Empty); }

    let mut tiles = Vec::with_capacity(rows.len());
    let mut player = None;
    let mut spawns = vec![];

    for (row, line) in rows.iter().enumerate() {
        let found = line.chars().count();
        if found != expected {
            return Err(LevelError::Ragged { row, found, expected });
        }
        let mut tile_row = Vec::with_capacity(found);
        for (col, ch) in line.chars().enumerate() {
            let cell = Cell::new(col as i32, row as i32);
            if ch == 'P' {
                if player.is_some() { return Err(LevelError::DuplicatePlayer { col, row }); }
                player = Some(cell);
                tile_row.push(Tile::Grass);
                continue;
            }
            let (tile, spawn) = glyph(ch).ok_or(LevelError::UnknownGlyph { glyph: ch, col, row })?;
            tile_row.push(tile);
            if let Some(s) = spawn { spawns.push((s, cell)); }
        }
        tiles.push(tile_row);
    }

    if name.is_empty() {
        name = "Unnamed Level".to_string();
    }
    Ok(Level {
        name,
        map: TileMap::new(0, tiles),
        player: player.ok_or(LevelError::MissingPlayer)?,
        spawns,
    })
}

pub fn load_file(path: &Path) -> Result<Level, LevelError> {
    let content = std::fs::read_to_string(path)
        .map_err(|source| LevelError::Read { path: path.to_path_buf(), source })?;
    parse(&content)
}

/// Every `.txt` level in `dir`, sorted by file name. Unreadable or
/// malformed files are skipped with a warning.
pub fn load_dir(dir: &Path) -> Vec<Level> {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            warn!("can't list {}: {e}", dir.display());
            return vec![];
        }
    };

    let mut paths: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.extension().map_or(false, |e| e == "txt"))
        .collect();
    paths.sort();

    paths.iter().filter_map(|path| match load_file(path) {
        Ok(level) => Some(level),
        Err(e) => {
            warn!("skipping {}: {e}", path.display());
            None
        }
    }).collect()
}

/// The configured level file, else the first built-in level.
pub fn load_configured(config: &GameConfig) -> Level {
    if let Some(path) = config.level_file.as_deref() {
        match load_file(path) {
            Ok(level) => return level,
            Err(e) => warn!("{e}; using the built-in level"),
        }
    }
    builtin().into_iter().next().unwrap_or_else(fallback)
}

// ══════════════════════════════════════════════════════════════
// World construction
// ══════════════════════════════════════════════════════════════

/// A fresh world for `level`: map, player spawn, every actor.
pub fn build_world(level: &Level, config: GameConfig) -> World {
    let mut world = World::new(level.map.clone(), config);
    world.place_player(level.player);
    let cfg = world.config.clone();

    for &(what, cell) in &level.spawns {
        let (x, y) = world.cell_origin(cell);
        let (group, actor) = match what {
            Spawn::Npc           => (Group::Npc, spawn::npc(x, y, &cfg)),
            Spawn::Monster(kind) => (Group::Monster, spawn::monster(kind, x, y, &cfg)),
            Spawn::DryTree       => (Group::Tile, spawn::dry_tree(x, y, &cfg)),
            Spawn::Item(kind)    => (Group::Object, spawn::item(kind, x, y, &cfg)),
        };
        world.spawn(group, actor);
    }

    info!(
        "level \"{}\" loaded: {}x{}, {} monsters, {} objects",
        level.name, level.map.width(), level.map.height(),
        world.monsters.len(), world.objects.len(),
    );
    world
}

// ══════════════════════════════════════════════════════════════
// Embedded levels
// ══════════════════════════════════════════════════════════════

const FOREST_EDGE: &str = "\
; Forest Edge
########################
#    ~~~~      T   T   #
#  P ~~~~   s      $   #
#    ~~~~          b   #
#     ..   TT   T      #
#  N  ..a  TT      o   #
#     ..   ddddd       #
#  k  ..   d   d   s   #
#######D####...#########
#   r       h      m   #
#   S   o        $     #
########################
";

const DUNES: &str = "\
; Dunes
####################
#P    :::::     $  #
#     :::::  s     #
#  ####   ####  ####
#  #  h   #  b     #
#  #  ~~  #     o  #
#     ~~     r     #
####################
";

/// Levels shipped inside the binary. Never empty.
pub fn builtin() -> Vec<Level> {
    let levels: Vec<Level> = [FOREST_EDGE, DUNES]
        .into_iter()
        .filter_map(|text| match parse(text) {
            Ok(level) => Some(level),
            Err(e) => {
                warn!("built-in level rejected: {e}");
                None
            }
        })
        .collect();
    if levels.is_empty() { vec![fallback()] } else { levels }
}

/// Walled empty field, for when no embedded text parses.
fn fallback() -> Level {
    let mut map = TileMap::filled(0, 12, 8, Tile::Grass);
    for col in 0..12 {
        map.set_tile(col, 0, Tile::Wall);
        map.set_tile(col, 7, Tile::Wall);
    }
    for row in 0..8 {
        map.set_tile(0, row, Tile::Wall);
        map.set_tile(11, row, Tile::Wall);
    }
    Level { name: "Field".to_string(), map, player: Cell::new(1, 1), spawns: vec![] }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_name_tiles_and_spawns() {
        let level = parse("; Tiny\n#####\n#P s#\n#.:~#\n#####\n\n").unwrap();
        assert_eq!(level.name, "Tiny");
        assert_eq!((level.map.width(), level.map.height()), (5, 4));
        assert_eq!(level.player, Cell::new(1, 1));
        assert_eq!(level.spawns, vec![(Spawn::Monster(MonsterKind::GreenSlime), Cell::new(3, 1))]);
        assert_eq!(level.map.tile(1, 2), Some(Tile::Floor));
        assert_eq!(level.map.tile(2, 2), Some(Tile::Sand));
        assert!(level.map.is_blocked(3, 2));
        // Spawn cells are walkable.
        assert!(!level.map.is_blocked(1, 1));
    }

    #[test]
    fn unnamed_level_gets_a_default_name() {
        assert_eq!(parse("P").unwrap().name, "Unnamed Level");
    }

    #[test]
    fn rejects_malformed_maps() {
        assert!(matches!(parse("; nothing\n\n"), Err(LevelError::Empty)));
        assert!(matches!(parse("###\n#P\n"), Err(LevelError::Ragged { row: 1, found: 2, expected: 3 })));
        assert!(matches!(parse("#P?\n"), Err(LevelError::UnknownGlyph { glyph: '?', col: 2, row: 0 })));
        assert!(matches!(parse("###\n"), Err(LevelError::MissingPlayer)));
        assert!(matches!(parse("PP\n"), Err(LevelError::DuplicatePlayer { col: 1, row: 0 })));
    }

    #[test]
    fn builtin_levels_parse() {
        let levels = builtin();
        assert_eq!(levels.len(), 2);
        assert_eq!(levels[0].name, "Forest Edge");
        assert_eq!(levels[1].name, "Dunes");
    }

    #[test]
    fn build_world_places_everything() {
        let mut cfg = GameConfig::default();
        cfg.timing.seed = Some(3);
        let level = parse("; t\n######\n#P N #\n# sd$#\n######\n").unwrap();
        let w = build_world(&level, cfg);
        assert_eq!((w.player.x, w.player.y), (48, 48));
        assert_eq!(w.npcs.len(), 1);
        assert_eq!(w.monsters.len(), 1);
        assert_eq!(w.tiles.len(), 1);
        assert_eq!(w.objects.len(), 1);
        assert_eq!((w.monsters[0].x, w.monsters[0].y), (96, 96));
    }

    #[test]
    fn load_dir_sorts_and_skips_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        let write = |name: &str, text: &str| {
            let mut f = std::fs::File::create(dir.path().join(name)).unwrap();
            f.write_all(text.as_bytes()).unwrap();
        };
        write("b.txt", "; Second\nP \n");
        write("a.txt", "; First\n P\n");
        write("broken.txt", "nope\n");
        write("notes.md", "; ignored\nP\n");

        let names: Vec<String> = load_dir(dir.path()).into_iter().map(|l| l.name).collect();
        assert_eq!(names, vec!["First", "Second"]);
    }

    #[test]
    fn missing_level_file_falls_back_to_builtin() {
        let mut cfg = GameConfig::default();
        cfg.level_file = Some(PathBuf::from("/definitely/not/here.txt"));
        assert_eq!(load_configured(&cfg).name, "Forest Edge");
    }
}

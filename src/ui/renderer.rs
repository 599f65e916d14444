/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Compose the next frame into the `front` buffer
///   2. Compare each cell with the `back` buffer (previous frame)
///   3. Emit terminal commands only for changed cells, batched with `queue!`
///   4. Swap front/back
///
/// The core's world units never reach the terminal: actors are drawn in
/// the grid cell under the center of their hitbox, two columns per cell.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::entity::{ActorKind, MonsterKind, ProjectileKind};
use crate::domain::item::ItemKind;
use crate::domain::tile::Tile;
use crate::sim::world::{ActorView, World};

const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };
const HUD_BG: Color = Color::Rgb { r: 20, g: 20, b: 60 };

/// Terminal columns per grid cell.
const CELL_W: usize = 2;
const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;

// ── Glyph: the unit of the frame buffer ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Glyph {
    pub ch: char,
    pub fg: Color,
    pub bg: Color,
}

impl Glyph {
    const BLANK: Glyph = Glyph { ch: ' ', fg: Color::White, bg: BASE_BG };
    /// Never equal to a composed glyph: forces a repaint.
    const INVALID: Glyph = Glyph { ch: '?', fg: Color::Magenta, bg: Color::Magenta };
}

pub struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Glyph>,
}

impl FrameBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        FrameBuffer { width, height, cells: vec![Glyph::BLANK; width * height] }
    }

    fn resize(&mut self, width: usize, height: usize) {
        if self.width != width || self.height != height {
            *self = FrameBuffer::new(width, height);
        }
    }

    fn set(&mut self, x: usize, y: usize, g: Glyph) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = g;
        }
    }

    pub fn get(&self, x: usize, y: usize) -> Glyph {
        if x < self.width && y < self.height { self.cells[y * self.width + x] } else { Glyph::BLANK }
    }

    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            self.set(x + i, y, Glyph { ch, fg, bg });
        }
    }

    /// Text of row `y`, trailing blanks trimmed.
    pub fn row_text(&self, y: usize) -> String {
        (0..self.width).map(|x| self.get(x, y).ch).collect::<String>().trim_end().to_string()
    }
}

// ══════════════════════════════════════════════════════════════
// Composition (pure: world → buffer)
// ══════════════════════════════════════════════════════════════

fn tile_glyph(tile: Tile) -> Glyph {
    let (ch, fg, bg) = match tile {
        Tile::Grass => (' ', Color::Green, Color::Rgb { r: 30, g: 60, b: 30 }),
        Tile::Floor => ('·', Color::Grey, Color::Rgb { r: 50, g: 45, b: 40 }),
        Tile::Sand  => ('░', Color::Yellow, Color::Rgb { r: 90, g: 80, b: 40 }),
        Tile::Wall  => ('█', Color::DarkGrey, BASE_BG),
        Tile::Water => ('≈', Color::Cyan, Color::Rgb { r: 20, g: 40, b: 100 }),
        Tile::Tree  => ('♣', Color::DarkGreen, Color::Rgb { r: 30, g: 60, b: 30 }),
    };
    Glyph { ch, fg, bg }
}

fn actor_glyph(v: &ActorView) -> (char, Color) {
    let (ch, fg) = match v.kind {
        ActorKind::Player => ('@', Color::White),
        ActorKind::Npc => ('N', Color::Cyan),
        ActorKind::Monster(MonsterKind::GreenSlime) => ('s', Color::Green),
        ActorKind::Monster(MonsterKind::Orc) => ('O', Color::Red),
        ActorKind::Monster(MonsterKind::Bat) => ('b', Color::Magenta),
        ActorKind::Projectile(ProjectileKind::Fireball) => ('*', Color::Red),
        ActorKind::Projectile(ProjectileKind::Rock) => ('o', Color::Grey),
        ActorKind::DryTree => ('¥', Color::Yellow),
        ActorKind::Trunk => ('_', Color::DarkYellow),
        ActorKind::Item(kind) => match kind {
            ItemKind::Coin => ('$', Color::Yellow),
            ItemKind::Heart => ('♥', Color::Red),
            ItemKind::ManaCrystal => ('◆', Color::Blue),
            ItemKind::RedPotion => ('!', Color::Red),
            ItemKind::Key => ('k', Color::Yellow),
            ItemKind::Sword => ('/', Color::White),
            ItemKind::Axe => ('P', Color::White),
            ItemKind::WoodShield | ItemKind::BlueShield => (']', Color::Blue),
            ItemKind::Door => ('+', Color::DarkYellow),
        },
    };
    // Dying and blinking actors fade.
    if v.dying || v.transparent { (ch, Color::DarkGrey) } else { (ch, fg) }
}

/// Top-left cell of a `view_w` × `view_h` window centered on `focus`,
/// clamped to the map.
fn camera(focus: (i32, i32), view: (usize, usize), map: (usize, usize)) -> (i32, i32) {
    let clamp = |f: i32, v: usize, m: usize| (f - v as i32 / 2).clamp(0, (m as i32 - v as i32).max(0));
    (clamp(focus.0, view.0, map.0), clamp(focus.1, view.1, map.1))
}

/// Draw HUD, map and actors into `buf`. `message` goes under the map.
pub fn compose(buf: &mut FrameBuffer, world: &World, message: &str) {
    buf.cells.fill(Glyph::BLANK);
    let ts = world.tile_size();
    let (map_w, map_h) = (world.map.width(), world.map.height());
    let view_w = (buf.width / CELL_W).min(map_w);
    let view_h = buf.height.saturating_sub(MAP_ROW + 2).min(map_h);

    // ── HUD ──
    let p = &world.player;
    let (level, coin, mana, max_mana) = p.progression.as_ref()
        .map_or((0, 0, 0, 0), |g| (g.level, g.coin, g.mana, g.max_mana));
    let (life, max_life) = p.combat.as_ref().map_or((0, 0), |c| (c.life, c.max_life));
    let weapon = p.inventory.as_ref().and_then(|i| i.equipped_weapon()).map_or("-", ItemKind::name);
    let hud = format!(" Lv {level}  ♥ {life}/{max_life}  ◆ {mana}/{max_mana}  $ {coin}  {weapon} ");
    for x in 0..buf.width { buf.set(x, HUD_ROW, Glyph { ch: ' ', fg: Color::White, bg: HUD_BG }); }
    buf.put_str(0, HUD_ROW, &hud, Color::White, HUD_BG);

    // ── Map ──
    let rect = p.rect();
    let focus = ((rect.x + rect.w / 2).div_euclid(ts), (rect.y + rect.h / 2).div_euclid(ts));
    let (cx, cy) = camera(focus, (view_w, view_h), (map_w, map_h));
    for vy in 0..view_h {
        for vx in 0..view_w {
            let tile = world.map.tile(cx + vx as i32, cy + vy as i32).unwrap_or(Tile::Wall);
            let g = tile_glyph(tile);
            buf.set(vx * CELL_W, MAP_ROW + vy, g);
            buf.set(vx * CELL_W + 1, MAP_ROW + vy, Glyph { ch: if g.ch == '█' { '█' } else { ' ' }, ..g });
        }
    }

    // ── Actors (snapshot is already in draw order) ──
    for v in world.snapshot() {
        let Some(actor_rect) = world.find(v.id).and_then(|r| world.actor(r)).map(|a| a.rect()) else { continue };
        let col = (actor_rect.x + actor_rect.w / 2).div_euclid(ts) - cx;
        let row = (actor_rect.y + actor_rect.h / 2).div_euclid(ts) - cy;
        if col < 0 || row < 0 || col as usize >= view_w || row as usize >= view_h { continue; }
        let (x, y) = (col as usize * CELL_W, MAP_ROW + row as usize);
        let (ch, fg) = actor_glyph(&v);
        let bg = buf.get(x, y).bg;
        buf.set(x, y, Glyph { ch, fg, bg });
    }

    // ── Message ──
    if !message.is_empty() {
        buf.put_str(0, MAP_ROW + view_h + 1, message, Color::Yellow, BASE_BG);
    }
}

// ══════════════════════════════════════════════════════════════
// Terminal output
// ══════════════════════════════════════════════════════════════

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
}

impl Default for Renderer {
    fn default() -> Self {
        Renderer::new()
    }
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(BASE_BG),
            Clear(ClearType::All)
        )?;
        self.fit_terminal();
        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(self.writer, ResetColor, cursor::Show, terminal::LeaveAlternateScreen)?;
        terminal::disable_raw_mode()
    }

    /// Match buffers to the terminal size; true when it changed.
    fn fit_terminal(&mut self) -> bool {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        let (tw, th) = (tw as usize, th as usize);
        if tw == self.front.width && th == self.front.height { return false; }
        self.front.resize(tw, th);
        self.back.resize(tw, th);
        self.back.cells.fill(Glyph::INVALID);
        true
    }

    pub fn render(&mut self, world: &World, message: &str) -> io::Result<()> {
        if self.fit_terminal() {
            queue!(self.writer, SetBackgroundColor(BASE_BG), Clear(ClearType::All))?;
        }
        compose(&mut self.front, world, message);
        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = BASE_BG;
        let mut cursor_at: Option<(usize, usize)> = None;
        queue!(self.writer, SetForegroundColor(last_fg), SetBackgroundColor(last_bg))?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let g = self.front.get(x, y);
                if g == self.back.get(x, y) { continue; }

                if cursor_at != Some((x, y)) {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                }
                if g.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(g.fg))?;
                    last_fg = g.fg;
                }
                if g.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(g.bg))?;
                    last_bg = g.bg;
                }
                queue!(self.writer, Print(g.ch))?;
                cursor_at = Some((x + 1, y));
            }
        }
        self.writer.flush()
    }
}

/// Entry point and game loop of the terminal demo.
///
/// Usage: `tilequest [-v|--verbose] [--load <slot>]`
///
/// Keys: arrows/WASD move, Enter/J attack, F/K fireball, Space/L guard,
/// E talk or open, R drink a potion, X switch weapon, 1-4 save to a slot,
/// Esc/Q quit. Logs go to `tilequest.log` in the save directory.

use std::time::{Duration, Instant};

use clap::Parser;
use crossterm::event::KeyCode;

use tilequest::config::GameConfig;
use tilequest::domain::item::ItemKind;
use tilequest::logging;
use tilequest::sim::event::GameEvent;
use tilequest::sim::level;
use tilequest::sim::save::{self, PlayerRecord};
use tilequest::sim::step::{self, FrameInput};
use tilequest::sim::world::World;
use tilequest::ui::input::InputState;
use tilequest::ui::renderer::Renderer;

const FRAME_SLEEP: Duration = Duration::from_millis(5);
/// Ticks a status message stays on screen.
const MESSAGE_TICKS: u32 = 120;

/// A tile-based action game in the terminal
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Restore a save slot (1-4) at startup
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=4))]
    load: Option<u8>,
}

fn main() {
    let args = Args::parse();
    let save_dir = save::default_save_dir();
    let log_file = std::fs::File::create(save_dir.join("tilequest.log")).ok();
    logging::init(args.verbose, log_file);

    let config = GameConfig::load();
    let lvl = level::load_configured(&config);
    let mut world = level::build_world(&lvl, config);

    let mut status = Status::default();
    if let Some(slot) = args.load {
        status.set(load_into(&mut world, &save_dir, slot));
    }

    let mut renderer = Renderer::new();
    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let result = game_loop(&mut world, &mut renderer, &mut status, &save_dir);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }
    if let Err(e) = result {
        eprintln!("Game error: {e}");
    }

    println!();
    println!("Thanks for playing {}!", lvl.name);
}

/// Restore `slot` onto the player; the text says how it went.
fn load_into(world: &mut World, save_dir: &std::path::Path, slot: u8) -> String {
    if !save::has_slot(save_dir, slot) {
        log::warn!("no save in slot {slot} under {}", save_dir.display());
        return format!("No save in slot {slot}");
    }
    let ts = world.tile_size();
    match save::load_slot(save_dir, slot).and_then(|r| r.restore(&mut world.player, ts)) {
        Ok(()) => format!("Loaded slot {slot}"),
        Err(e) => {
            log::warn!("load failed: {e}");
            format!("Could not load slot {slot}: {e}")
        }
    }
}

#[derive(Default)]
struct Status {
    text: String,
    ticks: u32,
}

impl Status {
    fn set(&mut self, text: String) {
        self.text = text;
        self.ticks = MESSAGE_TICKS;
    }

    fn tick(&mut self) {
        if self.ticks == 0 { return; }
        self.ticks -= 1;
        if self.ticks == 0 { self.text.clear(); }
    }
}

fn game_loop(
    world: &mut World,
    renderer: &mut Renderer,
    status: &mut Status,
    save_dir: &std::path::Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    let tick_rate = Duration::from_millis(world.config.timing.tick_rate_ms);
    let mut last_tick = Instant::now();
    // Edge-triggered intents seen between ticks.
    let mut pending = FrameInput::default();

    loop {
        kb.drain_events();
        if kb.quit_requested() { break; }

        let now = kb.frame_input();
        pending.attack |= now.attack;
        pending.shoot |= now.shoot;
        pending.interact |= now.interact;
        handle_meta(world, &kb, status, save_dir);

        if last_tick.elapsed() >= tick_rate {
            let input = FrameInput { movement: now.movement, guard: now.guard, ..pending };
            pending = FrameInput::default();

            let events = step::tick(world, input);
            if let Some(text) = events.iter().rev().find_map(describe) {
                status.set(text);
            }
            status.tick();
            if world.is_over() && status.text.is_empty() {
                status.set("You were defeated. Press Q to quit.".to_string());
            }
            last_tick = Instant::now();
        }

        renderer.render(world, &status.text)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

/// Keys outside the simulation: potions, weapon switch, saving.
fn handle_meta(world: &mut World, kb: &InputState, status: &mut Status, save_dir: &std::path::Path) {
    if kb.was_pressed(KeyCode::Char('r')) {
        let slot = world.player.inventory.as_ref().and_then(|i| i.find(ItemKind::RedPotion));
        match slot.map(|s| step::use_item(world, s)) {
            Some(Ok(event)) => status.set(describe(&event).unwrap_or_default()),
            Some(Err(e)) => status.set(e.to_string()),
            None => status.set("No potion".to_string()),
        }
    }

    if kb.was_pressed(KeyCode::Char('x')) {
        let next = world.player.inventory.as_ref().and_then(|inv| {
            let current = inv.weapon.unwrap_or(0);
            let len = inv.items.len();
            (1..=len)
                .map(|k| (current + k) % len)
                .find(|&i| inv.items[i].kind.weapon().is_some())
        });
        if let Some(Ok(event)) = next.map(|s| step::use_item(world, s)) {
            status.set(describe(&event).unwrap_or_default());
        }
    }

    if let Some(slot) = kb.slot_pressed() {
        let saved = PlayerRecord::capture(&world.player)
            .and_then(|record| save::save_slot(save_dir, slot, &record));
        match saved {
            Ok(()) => status.set(format!("Saved to slot {slot}")),
            Err(e) => {
                log::warn!("save failed: {e}");
                status.set(format!("Save failed: {e}"));
            }
        }
    }
}

/// One-line status text for the events worth telling the player about.
fn describe(event: &GameEvent) -> Option<String> {
    let text = match event {
        GameEvent::LevelUp { level } => format!("Level up! You are now level {level}."),
        GameEvent::PickedUp { kind } => format!("Got {}.", kind.name()),
        GameEvent::CoinGained { amount } => format!("+{amount} coin"),
        GameEvent::Healed { amount } => format!("Recovered {amount} life."),
        GameEvent::ManaRestored { amount } => format!("Recovered {amount} mana."),
        GameEvent::Equipped { kind } => format!("Equipped {}.", kind.name()),
        GameEvent::InventoryFull { kind } => format!("No room for {}.", kind.name()),
        GameEvent::NotEnoughResource { what } => format!("Not enough {what}."),
        GameEvent::Locked => "It's locked. You need a key.".to_string(),
        GameEvent::DoorOpened { .. } => "The door opens.".to_string(),
        GameEvent::NpcInteracted { .. } => "\"Watch out for the orcs past the trees.\"".to_string(),
        GameEvent::Parried { .. } => "Parried!".to_string(),
        GameEvent::TileDestroyed { .. } => "The tree falls.".to_string(),
        GameEvent::PlayerDefeated => "You were defeated. Press Q to quit.".to_string(),
        _ => return None,
    };
    Some(text)
}

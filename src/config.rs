/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub timing: TimingConfig,
    pub combat: CombatConfig,
    pub ai: AiConfig,
    /// Text level the demo loads instead of the built-in one.
    pub level_file: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct TimingConfig {
    pub tick_rate_ms: u64,
    /// World units per grid cell.
    pub tile_size: i32,
    /// RNG seed; `None` seeds from entropy.
    pub seed: Option<u64>,
}

#[derive(Clone, Debug)]
pub struct CombatConfig {
    pub player_invincible_frames: u32,
    pub monster_invincible_frames: u32,
    pub tile_invincible_frames: u32,
    pub dying_frames: u32,
    pub knockback_frames: u32,
    pub sprite_frames: u32,      // walk frame flips after this many frames
    pub idle_reset_frames: u32,  // standing still this long resets the pose
    pub shot_cooldown_frames: u32,
    pub attack_cooldown_frames: u32,
    pub inventory_size: usize,
}

#[derive(Clone, Debug)]
pub struct AiConfig {
    pub wander_interval: u32,
    pub chase_start_distance: i32,
    pub chase_stop_distance: i32,
    pub chase_rate: u32,
    pub path_max_steps: usize,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {}: {source}", path.display())]
    Read { path: PathBuf, source: std::io::Error },
    #[error("config.toml parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    timing: TomlTiming,
    #[serde(default)]
    combat: TomlCombat,
    #[serde(default)]
    ai: TomlAi,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlTiming {
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
    #[serde(default = "default_tile_size")]
    tile_size: i32,
    #[serde(default)]
    seed: Option<u64>,
}

#[derive(Deserialize, Debug)]
struct TomlCombat {
    #[serde(default = "default_player_invincible")]
    player_invincible_frames: u32,
    #[serde(default = "default_monster_invincible")]
    monster_invincible_frames: u32,
    #[serde(default = "default_tile_invincible")]
    tile_invincible_frames: u32,
    #[serde(default = "default_dying")]
    dying_frames: u32,
    #[serde(default = "default_knockback")]
    knockback_frames: u32,
    #[serde(default = "default_sprite")]
    sprite_frames: u32,
    #[serde(default = "default_idle_reset")]
    idle_reset_frames: u32,
    #[serde(default = "default_shot_cooldown")]
    shot_cooldown_frames: u32,
    #[serde(default)]
    attack_cooldown_frames: u32,
    #[serde(default = "default_inventory_size")]
    inventory_size: usize,
}

#[derive(Deserialize, Debug)]
struct TomlAi {
    #[serde(default = "default_wander_interval")]
    wander_interval: u32,
    #[serde(default = "default_chase_start")]
    chase_start_distance: i32,
    #[serde(default = "default_chase_stop")]
    chase_stop_distance: i32,
    #[serde(default = "default_chase_rate")]
    chase_rate: u32,
    #[serde(default = "default_path_max_steps")]
    path_max_steps: usize,
}

#[derive(Deserialize, Debug, Default)]
struct TomlGeneral {
    #[serde(default)]
    level_file: Option<String>,
}

// ── Defaults ──

fn default_tick_rate() -> u64 { 16 }     // ~60 ticks per second
fn default_tile_size() -> i32 { 48 }
fn default_player_invincible() -> u32 { 60 }
fn default_monster_invincible() -> u32 { 40 }
fn default_tile_invincible() -> u32 { 20 }
fn default_dying() -> u32 { 40 }
fn default_knockback() -> u32 { 10 }
fn default_sprite() -> u32 { 12 }
fn default_idle_reset() -> u32 { 20 }
fn default_shot_cooldown() -> u32 { 30 }
fn default_inventory_size() -> usize { 20 }
fn default_wander_interval() -> u32 { 120 }
fn default_chase_start() -> i32 { 5 }
fn default_chase_stop() -> i32 { 15 }
fn default_chase_rate() -> u32 { 100 }
fn default_path_max_steps() -> usize { 500 }

impl Default for TomlTiming {
    fn default() -> Self {
        TomlTiming {
            tick_rate_ms: default_tick_rate(),
            tile_size: default_tile_size(),
            seed: None,
        }
    }
}

impl Default for TomlCombat {
    fn default() -> Self {
        TomlCombat {
            player_invincible_frames: default_player_invincible(),
            monster_invincible_frames: default_monster_invincible(),
            tile_invincible_frames: default_tile_invincible(),
            dying_frames: default_dying(),
            knockback_frames: default_knockback(),
            sprite_frames: default_sprite(),
            idle_reset_frames: default_idle_reset(),
            shot_cooldown_frames: default_shot_cooldown(),
            attack_cooldown_frames: 0,
            inventory_size: default_inventory_size(),
        }
    }
}

impl Default for TomlAi {
    fn default() -> Self {
        TomlAi {
            wander_interval: default_wander_interval(),
            chase_start_distance: default_chase_start(),
            chase_stop_distance: default_chase_stop(),
            chase_rate: default_chase_rate(),
            path_max_steps: default_path_max_steps(),
        }
    }
}

// ── Loading ──

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig::from_schema(TomlConfig::default())
    }
}

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        for dir in candidate_dirs() {
            let path = dir.join("config.toml");
            if !path.exists() { continue; }
            match GameConfig::from_file(&path) {
                Ok(cfg) => {
                    log::info!("loaded {}", path.display());
                    return cfg;
                }
                Err(e) => {
                    log::warn!("{e}; using default settings");
                    return GameConfig::default();
                }
            }
        }
        GameConfig::default()
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        GameConfig::from_toml_str(&text)
    }

    /// Parse a config document. Absent keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let schema = toml::from_str::<TomlConfig>(text)?;
        Ok(GameConfig::from_schema(schema))
    }

    fn from_schema(toml_cfg: TomlConfig) -> Self {
        let mut cfg = GameConfig {
            timing: TimingConfig {
                tick_rate_ms: toml_cfg.timing.tick_rate_ms,
                tile_size: toml_cfg.timing.tile_size,
                seed: toml_cfg.timing.seed,
            },
            combat: CombatConfig {
                player_invincible_frames: toml_cfg.combat.player_invincible_frames,
                monster_invincible_frames: toml_cfg.combat.monster_invincible_frames,
                tile_invincible_frames: toml_cfg.combat.tile_invincible_frames,
                dying_frames: toml_cfg.combat.dying_frames,
                knockback_frames: toml_cfg.combat.knockback_frames,
                sprite_frames: toml_cfg.combat.sprite_frames,
                idle_reset_frames: toml_cfg.combat.idle_reset_frames,
                shot_cooldown_frames: toml_cfg.combat.shot_cooldown_frames,
                attack_cooldown_frames: toml_cfg.combat.attack_cooldown_frames,
                inventory_size: toml_cfg.combat.inventory_size,
            },
            ai: AiConfig {
                wander_interval: toml_cfg.ai.wander_interval,
                chase_start_distance: toml_cfg.ai.chase_start_distance,
                chase_stop_distance: toml_cfg.ai.chase_stop_distance,
                chase_rate: toml_cfg.ai.chase_rate,
                path_max_steps: toml_cfg.ai.path_max_steps,
            },
            level_file: toml_cfg.general.level_file.map(PathBuf::from),
        };

        // Values the simulation can't run with.
        if cfg.timing.tile_size <= 0 {
            log::warn!("tile_size must be positive, got {}; using default", cfg.timing.tile_size);
            cfg.timing.tile_size = default_tile_size();
        }
        if cfg.ai.chase_rate == 0 {
            log::warn!("chase_rate 0 would never roll; using 1");
            cfg.ai.chase_rate = 1;
        }
        cfg
    }
}

/// Candidate directories to search: exe dir + CWD (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Save and load player progress: a slot system of TOML records.
///
/// A record holds the player's stats, wallet and inventory. Items are
/// stored by display name, equipment by inventory slot index. The level
/// itself is not saved; a loaded record is applied to a fresh player.
///
/// Slots are stored as `save_<n>.toml` in the save directory.

use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::entity::{Actor, Stack};
use crate::domain::item::ItemKind;
use crate::domain::rules;

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("could not access {}: {source}", path.display())]
    Io { path: PathBuf, source: std::io::Error },
    #[error("could not encode save: {0}")]
    Encode(#[from] toml::ser::Error),
    #[error("could not decode save: {0}")]
    Decode(#[from] toml::de::Error),
    #[error("unknown item {0:?}")]
    UnknownItem(String),
    #[error("equipped slot {slot} is outside an inventory of {len}")]
    SlotOutOfRange { slot: usize, len: usize },
    #[error("{field} = {value} is outside {min}..={max}")]
    OutOfRange { field: &'static str, value: i64, min: i64, max: i64 },
    #[error("actor has no player state")]
    NotAPlayer,
}

/// Largest value a record may carry in any numeric field.
pub const STAT_LIMIT: i32 = 1 << 30;

// ══════════════════════════════════════════════════════════════
// Record
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub name: String,
    pub count: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub level: u32,
    pub life: i32,
    pub max_life: i32,
    pub mana: i32,
    pub max_mana: i32,
    pub strength: i32,
    pub dexterity: i32,
    pub exp: i32,
    pub next_level_exp: i32,
    pub coin: i32,
    pub ammo: i32,
    pub weapon_slot: Option<usize>,
    pub shield_slot: Option<usize>,
    // Tables last: TOML wants plain keys before arrays of tables.
    #[serde(default)]
    pub items: Vec<ItemRecord>,
}

impl PlayerRecord {
    pub fn capture(player: &Actor) -> Result<Self, SaveError> {
        let (Some(prog), Some(c), Some(inv)) =
            (player.progression.as_ref(), player.combat.as_ref(), player.inventory.as_ref())
        else {
            return Err(SaveError::NotAPlayer);
        };

        Ok(PlayerRecord {
            level: prog.level,
            life: c.life,
            max_life: c.max_life,
            mana: prog.mana,
            max_mana: prog.max_mana,
            strength: prog.strength,
            dexterity: prog.dexterity,
            exp: prog.exp,
            next_level_exp: prog.next_level_exp,
            coin: prog.coin,
            ammo: prog.ammo,
            weapon_slot: inv.weapon,
            shield_slot: inv.shield,
            items: inv.items.iter()
                .map(|s| ItemRecord { name: s.kind.name().to_string(), count: s.count })
                .collect(),
        })
    }

    /// Apply this record to `player`. Nothing is changed unless the whole
    /// record is valid.
    pub fn restore(&self, player: &mut Actor, tile_size: i32) -> Result<(), SaveError> {
        self.check_ranges()?;
        let items = self.items.iter()
            .map(|r| {
                ItemKind::from_name(&r.name)
                    .map(|kind| Stack { kind, count: r.count.max(1) })
                    .ok_or_else(|| SaveError::UnknownItem(r.name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        for slot in [self.weapon_slot, self.shield_slot].into_iter().flatten() {
            if slot >= items.len() {
                return Err(SaveError::SlotOutOfRange { slot, len: items.len() });
            }
        }

        let (Some(prog), Some(c), Some(inv)) =
            (player.progression.as_mut(), player.combat.as_mut(), player.inventory.as_mut())
        else {
            return Err(SaveError::NotAPlayer);
        };

        prog.level = self.level;
        prog.mana = self.mana;
        prog.max_mana = self.max_mana;
        prog.strength = self.strength;
        prog.dexterity = self.dexterity;
        prog.exp = self.exp;
        prog.next_level_exp = self.next_level_exp;
        prog.coin = self.coin;
        prog.ammo = self.ammo;
        c.max_life = self.max_life;
        c.life = self.life.min(self.max_life);
        inv.items = items;
        inv.weapon = self.weapon_slot;
        inv.shield = self.shield_slot;

        rules::refresh_stats(player, tile_size);
        Ok(())
    }

    fn check_ranges(&self) -> Result<(), SaveError> {
        let limit = i64::from(STAT_LIMIT);
        let fields: [(&'static str, i64, i64); 12] = [
            ("level", i64::from(self.level), 1),
            ("life", i64::from(self.life), 0),
            ("max_life", i64::from(self.max_life), 1),
            ("mana", i64::from(self.mana), 0),
            ("max_mana", i64::from(self.max_mana), 0),
            ("strength", i64::from(self.strength), 0),
            ("dexterity", i64::from(self.dexterity), 0),
            ("exp", i64::from(self.exp), 0),
            ("next_level_exp", i64::from(self.next_level_exp), 1),
            ("coin", i64::from(self.coin), 0),
            ("ammo", i64::from(self.ammo), 0),
            ("items", self.items.len() as i64, 0),
        ];
        for (field, value, min) in fields {
            if value < min || value > limit {
                return Err(SaveError::OutOfRange { field, value, min, max: limit });
            }
        }
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, SaveError> {
        Ok(toml::to_string(self)?)
    }

    pub fn from_toml(text: &str) -> Result<Self, SaveError> {
        Ok(toml::from_str(text)?)
    }
}

// ══════════════════════════════════════════════════════════════
// Slots
// ══════════════════════════════════════════════════════════════

/// Where slot files go: the executable's directory when writable,
/// else `~/.local/share/tilequest`, else the current directory.
pub fn default_save_dir() -> PathBuf {
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            // System installs are read-only.
            let probe = parent.join(".write_test_tilequest");
            if std::fs::write(&probe, "").is_ok() {
                let _ = std::fs::remove_file(&probe);
                return parent.to_path_buf();
            }
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/tilequest");
        if std::fs::create_dir_all(&xdg).is_ok() {
            return xdg;
        }
    }

    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

pub fn slot_path(dir: &Path, slot: u8) -> PathBuf {
    dir.join(format!("save_{slot}.toml"))
}

pub fn save_slot(dir: &Path, slot: u8, record: &PlayerRecord) -> Result<(), SaveError> {
    let path = slot_path(dir, slot);
    let text = record.to_toml()?;
    std::fs::write(&path, text).map_err(|source| SaveError::Io { path: path.clone(), source })?;
    debug!("saved slot {slot} to {}", path.display());
    Ok(())
}

pub fn load_slot(dir: &Path, slot: u8) -> Result<PlayerRecord, SaveError> {
    let path = slot_path(dir, slot);
    let text = std::fs::read_to_string(&path).map_err(|source| SaveError::Io { path, source })?;
    PlayerRecord::from_toml(&text)
}

pub fn has_slot(dir: &Path, slot: u8) -> bool {
    slot_path(dir, slot).exists()
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::domain::spawn;

    fn seasoned_player() -> Actor {
        let mut p = spawn::player(0, 0, &GameConfig::default());
        if let Some(prog) = p.progression.as_mut() {
            prog.level = 3;
            prog.strength = 3;
            prog.dexterity = 3;
            prog.coin = 42;
        }
        if let Some(inv) = p.inventory.as_mut() {
            let _ = inv.obtain(ItemKind::Key);
            let _ = inv.obtain(ItemKind::Key);
            inv.weapon = inv.obtain(ItemKind::Axe).ok();
        }
        rules::refresh_stats(&mut p, 48);
        p
    }

    #[test]
    fn capture_then_restore_onto_a_fresh_player() {
        let record = PlayerRecord::capture(&seasoned_player()).unwrap();
        let text = record.to_toml().unwrap();
        let back = PlayerRecord::from_toml(&text).unwrap();
        assert_eq!(back, record);

        let mut fresh = spawn::player(0, 0, &GameConfig::default());
        back.restore(&mut fresh, 48).unwrap();
        assert_eq!(fresh.progression.as_ref().map(|p| (p.level, p.coin)), Some((3, 42)));
        let inv = fresh.inventory.as_ref().unwrap();
        assert_eq!(inv.count(ItemKind::Key), 2);
        assert_eq!(inv.equipped_weapon(), Some(ItemKind::Axe));
        // Strength 3 with the axe.
        assert_eq!(fresh.combat.as_ref().map(|c| c.attack), Some(6));
    }

    #[test]
    fn bad_records_leave_the_player_untouched() {
        let mut record = PlayerRecord::capture(&seasoned_player()).unwrap();
        record.items.push(ItemRecord { name: "Excalibur".into(), count: 1 });
        let mut fresh = spawn::player(0, 0, &GameConfig::default());
        assert!(matches!(record.restore(&mut fresh, 48), Err(SaveError::UnknownItem(n)) if n == "Excalibur"));
        assert_eq!(fresh.progression.as_ref().map(|p| p.coin), Some(0));

        let mut record = PlayerRecord::capture(&seasoned_player()).unwrap();
        record.shield_slot = Some(17);
        assert!(matches!(record.restore(&mut fresh, 48), Err(SaveError::SlotOutOfRange { slot: 17, .. })));
    }

    #[test]
    fn out_of_range_stats_are_rejected() {
        let mut fresh = spawn::player(0, 0, &GameConfig::default());

        let mut record = PlayerRecord::capture(&seasoned_player()).unwrap();
        record.next_level_exp = 1_500_000_000;
        assert!(matches!(
            record.restore(&mut fresh, 48),
            Err(SaveError::OutOfRange { field: "next_level_exp", .. })
        ));

        let mut record = PlayerRecord::capture(&seasoned_player()).unwrap();
        record.exp = -4;
        assert!(matches!(record.restore(&mut fresh, 48), Err(SaveError::OutOfRange { field: "exp", .. })));

        let mut record = PlayerRecord::capture(&seasoned_player()).unwrap();
        record.max_life = 0;
        assert!(matches!(record.restore(&mut fresh, 48), Err(SaveError::OutOfRange { field: "max_life", .. })));
        assert_eq!(fresh.progression.as_ref().map(|p| p.level), Some(1));
    }

    #[test]
    fn monsters_have_nothing_to_save() {
        let slime = spawn::monster(crate::domain::entity::MonsterKind::GreenSlime, 0, 0, &GameConfig::default());
        assert!(matches!(PlayerRecord::capture(&slime), Err(SaveError::NotAPlayer)));
    }

    #[test]
    fn slots_round_trip_through_files() {
        let dir = tempfile::tempdir().unwrap();
        let record = PlayerRecord::capture(&seasoned_player()).unwrap();
        assert!(!has_slot(dir.path(), 2));
        save_slot(dir.path(), 2, &record).unwrap();
        assert!(has_slot(dir.path(), 2));
        assert_eq!(load_slot(dir.path(), 2).unwrap(), record);

        assert!(!has_slot(dir.path(), 3));
        assert!(matches!(load_slot(dir.path(), 3), Err(SaveError::Io { .. })));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        assert!(matches!(PlayerRecord::from_toml("level = \"three\""), Err(SaveError::Decode(_))));
    }
}

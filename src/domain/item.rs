/// Item catalog: what each item kind is and what it does when used.
/// Item identity is the kind; the display name doubles as the persisted key.

use super::entity::Melee;
use super::geometry::scale_px;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ItemKind {
    Coin,
    Heart,
    ManaCrystal,
    RedPotion,
    Key,
    Sword,
    Axe,
    WoodShield,
    BlueShield,
    Door,
}

/// Weapon stats. `strike_end` is the last frame of the strike phase,
/// counted from the start of the attack (windup included). Reach is
/// authored for a 48-unit tile.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Weapon {
    pub attack: i32,
    pub reach_w: i32,
    pub reach_h: i32,
    pub windup_frames: u32,
    pub strike_end: u32,
    pub knockback: i32,
}

impl Weapon {
    pub fn melee(&self, tile_size: i32) -> Melee {
        Melee {
            width: scale_px(self.reach_w, tile_size).max(1),
            height: scale_px(self.reach_h, tile_size).max(1),
            windup_frames: self.windup_frames,
            strike_end: self.strike_end,
            knockback: self.knockback,
        }
    }
}

impl ItemKind {
    pub const ALL: [ItemKind; 10] = [
        ItemKind::Coin, ItemKind::Heart, ItemKind::ManaCrystal, ItemKind::RedPotion,
        ItemKind::Key, ItemKind::Sword, ItemKind::Axe, ItemKind::WoodShield,
        ItemKind::BlueShield, ItemKind::Door,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ItemKind::Coin        => "Bronze Coin",
            ItemKind::Heart       => "Heart",
            ItemKind::ManaCrystal => "Mana Crystal",
            ItemKind::RedPotion   => "Red Potion",
            ItemKind::Key         => "Key",
            ItemKind::Sword       => "Normal Sword",
            ItemKind::Axe         => "Woodcutter's Axe",
            ItemKind::WoodShield  => "Wood Shield",
            ItemKind::BlueShield  => "Blue Shield",
            ItemKind::Door        => "Door",
        }
    }

    pub fn from_name(name: &str) -> Option<ItemKind> {
        ItemKind::ALL.into_iter().find(|k| k.name() == name)
    }

    /// Applied on touch instead of going into the inventory.
    pub fn is_pickup_only(self) -> bool {
        matches!(self, ItemKind::Coin | ItemKind::Heart | ItemKind::ManaCrystal)
    }

    /// World fixtures that can't be picked up at all.
    pub fn is_obstacle(self) -> bool {
        matches!(self, ItemKind::Door)
    }

    /// Blocks movement while it exists in the world.
    pub fn is_solid(self) -> bool {
        matches!(self, ItemKind::Door)
    }

    pub fn is_stackable(self) -> bool {
        matches!(self, ItemKind::RedPotion | ItemKind::Key)
    }

    /// Coin amount, life or mana restored.
    pub fn value(self) -> i32 {
        match self {
            ItemKind::Coin        => 1,
            ItemKind::Heart       => 2,
            ItemKind::ManaCrystal => 1,
            ItemKind::RedPotion   => 5,
            _ => 0,
        }
    }

    pub fn weapon(self) -> Option<Weapon> {
        match self {
            ItemKind::Sword => Some(Weapon {
                attack: 1, reach_w: 36, reach_h: 36,
                windup_frames: 5, strike_end: 25, knockback: 2,
            }),
            ItemKind::Axe => Some(Weapon {
                attack: 2, reach_w: 30, reach_h: 30,
                windup_frames: 20, strike_end: 40, knockback: 10,
            }),
            _ => None,
        }
    }

    pub fn shield_defense(self) -> Option<i32> {
        match self {
            ItemKind::WoodShield => Some(1),
            ItemKind::BlueShield => Some(2),
            _ => None,
        }
    }
}

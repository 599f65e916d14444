/// Combat and progression rules.
///
/// Pure functions: they compute what *should* happen and leave applying it
/// to the simulation layer.
///
/// ## Damage
///
///   damage = max(attack − defense, 0)
///
/// ## Guarding (defender guarding AND facing the attacker)
/// ┌──────────────────────────────┬───────────────────────────┐
/// │ Condition                     │ Damage taken              │
/// ├──────────────────────────────┼───────────────────────────┤
/// │ not guarding / facing away    │ full                      │
/// │ guard_counter < PARRY_WINDOW  │ 0, attacker knocked back  │
/// │ otherwise                     │ damage / 3                │
/// └──────────────────────────────┴───────────────────────────┘
///
/// ## Level-up (repeats while exp ≥ next_level_exp)
///   level + 1, next_level_exp × 2, max life + 2, strength + 1, dexterity + 1.
///   Attack and defense are recomputed from the new stats at once.

use super::entity::{Actor, Combatant, Progression};
use super::geometry::Direction;
use super::item::ItemKind;

/// Guard frames during which a block becomes a parry.
pub const PARRY_WINDOW: u32 = 10;
pub const GUARD_DIVISOR: i32 = 3;
pub const LEVEL_LIFE_BONUS: i32 = 2;

#[inline]
pub fn damage(attack: i32, defense: i32) -> i32 {
    (attack - defense).max(0)
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GuardResult {
    Open,
    Blocked,
    Parried,
}

/// A guard only counts when the defender faces the incoming blow, i.e.
/// looks opposite to the attacker's facing.
pub fn guard_result(
    guarding: bool, guard_counter: u32,
    defender_facing: Direction, attacker_facing: Direction,
) -> GuardResult {
    if !guarding || defender_facing != attacker_facing.opposite() {
        return GuardResult::Open;
    }
    if guard_counter < PARRY_WINDOW { GuardResult::Parried } else { GuardResult::Blocked }
}

pub fn guarded_damage(raw: i32, guard: GuardResult) -> i32 {
    match guard {
        GuardResult::Open    => raw,
        GuardResult::Blocked => raw / GUARD_DIVISOR,
        GuardResult::Parried => 0,
    }
}

// ── Derived stats ──

pub fn attack_value(strength: i32, weapon: Option<ItemKind>) -> i32 {
    strength * weapon.and_then(ItemKind::weapon).map_or(0, |w| w.attack)
}

pub fn defense_value(dexterity: i32, shield: Option<ItemKind>) -> i32 {
    dexterity * shield.and_then(ItemKind::shield_defense).unwrap_or(0)
}

/// Recompute attack, defense and melee shape from stats + equipment.
/// No-op for actors without progression (monsters keep fixed stats).
pub fn refresh_stats(actor: &mut Actor, tile_size: i32) {
    let Some(prog) = actor.progression.as_ref() else { return };
    let (weapon, shield) = actor.inventory
        .as_ref()
        .map_or((None, None), |inv| (inv.equipped_weapon(), inv.equipped_shield()));
    let attack = attack_value(prog.strength, weapon);
    let defense = defense_value(prog.dexterity, shield);
    if let Some(c) = actor.combat.as_mut() {
        c.attack = attack;
        c.defense = defense;
        c.melee = weapon.and_then(ItemKind::weapon).map(|w| w.melee(tile_size));
    }
}

// ── Progression ──

/// Add experience and apply every level-up it pays for.
/// Returns the number of levels gained.
///
/// Arithmetic saturates. Once the bar reaches `i32::MAX` it can no longer
/// be passed, so the loop always ends.
pub fn gain_exp(prog: &mut Progression, combat: &mut Combatant, amount: i32) -> u32 {
    prog.exp = prog.exp.saturating_add(amount.max(0));
    let mut gained = 0;
    while prog.next_level_exp > 0 && prog.next_level_exp < i32::MAX && prog.exp >= prog.next_level_exp {
        prog.level = prog.level.saturating_add(1);
        prog.next_level_exp = prog.next_level_exp.saturating_mul(2);
        prog.strength = prog.strength.saturating_add(1);
        prog.dexterity = prog.dexterity.saturating_add(1);
        combat.max_life = combat.max_life.saturating_add(LEVEL_LIFE_BONUS);
        gained += 1;
    }
    gained
}

/// Restore mana, never above max. Returns the amount restored.
pub fn restore_mana(prog: &mut Progression, amount: i32) -> i32 {
    let before = prog.mana;
    prog.mana = (prog.mana + amount.max(0)).min(prog.max_mana);
    prog.mana - before
}

/// Item left behind by a slain monster for a roll in 0..100.
pub fn drop_for_roll(roll: u32) -> ItemKind {
    match roll {
        0..=49  => ItemKind::Coin,
        50..=74 => ItemKind::Heart,
        _       => ItemKind::ManaCrystal,
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::{ActorKind, Faction, Inventory};
    use crate::domain::geometry::Hitbox;
    use rstest::rstest;

    #[rstest]
    #[case(4, 0, 4)]
    #[case(5, 2, 3)]
    #[case(1, 3, 0)]
    #[case(0, 0, 0)]
    fn damage_floors_at_zero(#[case] atk: i32, #[case] def: i32, #[case] expected: i32) {
        assert_eq!(damage(atk, def), expected);
    }

    #[test]
    fn guard_needs_to_face_the_attacker() {
        // Attacker faces left, so the defender must face right.
        assert_eq!(guard_result(true, 30, Direction::Right, Direction::Left), GuardResult::Blocked);
        assert_eq!(guard_result(true, 30, Direction::Left, Direction::Left), GuardResult::Open);
        assert_eq!(guard_result(false, 30, Direction::Right, Direction::Left), GuardResult::Open);
        assert_eq!(guard_result(true, 3, Direction::Right, Direction::Left), GuardResult::Parried);
    }

    #[test]
    fn guarded_damage_is_divided_or_cancelled() {
        assert_eq!(guarded_damage(7, GuardResult::Open), 7);
        assert_eq!(guarded_damage(7, GuardResult::Blocked), 2);
        assert_eq!(guarded_damage(7, GuardResult::Parried), 0);
    }

    #[test]
    fn level_up_doubles_threshold_and_raises_stats() {
        let mut prog = Progression::default();
        let mut combat = Combatant::new(Faction::Friendly, 6, 1, 1, 60);
        assert_eq!(gain_exp(&mut prog, &mut combat, 4), 0);
        assert_eq!(gain_exp(&mut prog, &mut combat, 1), 1);
        assert_eq!(prog.level, 2);
        assert_eq!(prog.next_level_exp, 10);
        assert_eq!(combat.max_life, 8);
        assert_eq!((prog.strength, prog.dexterity), (2, 2));
        // Life is not refilled by a level-up.
        assert_eq!(combat.life, 6);
    }

    #[test]
    fn large_exp_gain_crosses_several_levels() {
        let mut prog = Progression::default();
        let mut combat = Combatant::new(Faction::Friendly, 6, 1, 1, 60);
        // Thresholds 5, 10, 20: 25 exp pays for three levels.
        assert_eq!(gain_exp(&mut prog, &mut combat, 25), 3);
        assert_eq!(prog.level, 4);
        assert_eq!(prog.next_level_exp, 40);
        assert_eq!(combat.max_life, 12);
    }

    #[test]
    fn stats_follow_equipment() {
        let mut a = Actor::new(ActorKind::Player, 0, 0, Hitbox::new(8, 16, 32, 32));
        a.combat = Some(Combatant::new(Faction::Friendly, 6, 0, 0, 60));
        let mut prog = Progression::default();
        prog.strength = 3;
        prog.dexterity = 2;
        a.progression = Some(prog);
        let mut inv = Inventory::new(20);
        inv.weapon = inv.obtain(ItemKind::Axe).ok();
        inv.shield = inv.obtain(ItemKind::BlueShield).ok();
        a.inventory = Some(inv);

        refresh_stats(&mut a, 48);
        let c = a.combat.as_ref().map(|c| (c.attack, c.defense, c.melee.map(|m| m.windup_frames)));
        assert_eq!(c, Some((6, 4, Some(20))));
    }

    #[test]
    fn huge_experience_saturates_instead_of_overflowing() {
        let mut prog = Progression::default();
        prog.exp = 2_000_000_000;
        prog.next_level_exp = 1_500_000_000;
        let mut c = Combatant::new(Faction::Friendly, 6, 0, 0, 60);

        assert_eq!(gain_exp(&mut prog, &mut c, 1), 1);
        assert_eq!(prog.next_level_exp, i32::MAX);
        assert_eq!(gain_exp(&mut prog, &mut c, i32::MAX), 0);
        assert_eq!(prog.exp, i32::MAX);
        assert_eq!(prog.level, 2);
    }

    #[test]
    fn mana_is_capped() {
        let mut prog = Progression::default();
        prog.mana = 3;
        assert_eq!(restore_mana(&mut prog, 5), 1);
        assert_eq!(prog.mana, prog.max_mana);
    }

    #[test]
    fn drop_table_bands() {
        assert_eq!(drop_for_roll(0), ItemKind::Coin);
        assert_eq!(drop_for_roll(49), ItemKind::Coin);
        assert_eq!(drop_for_roll(50), ItemKind::Heart);
        assert_eq!(drop_for_roll(74), ItemKind::Heart);
        assert_eq!(drop_for_roll(75), ItemKind::ManaCrystal);
        assert_eq!(drop_for_roll(99), ItemKind::ManaCrystal);
    }
}

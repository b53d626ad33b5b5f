//! Non-player entities: jungle camps, objectives, minions and structures.

use phf::phf_set;

/// Healing with this reason is ignored when only player interactions count.
pub const EXEMPT_HEAL_REASON: &str = "Fountain";

static NON_PLAYER_NAMES: phf::Set<&'static str> = phf_set! {
    // Lane
    "Minion",
    "Archer",
    "Brute",
    "Champion",
    "Super Minion",
    "Siege Juggernaut",
    // Structures
    "Tower",
    "Phoenix",
    "Titan",
    // Objectives
    "Fire Giant",
    "Gold Fury",
    "Pyromancer",
    // Jungle
    "Harpy",
    "Alpha Harpy",
    "Elder Harpy",
    "Cyclops",
    "Centaur",
    "Satyr",
    "Manticore",
    "Ogre",
    "Furies",
    "Oni Hunter",
    "Red Buff",
    "Blue Buff",
    "Purple Buff",
    "Yellow Buff",
    "Speed Buff",
    "Mana Buff",
    "Damage Buff",
    "Attack Speed Buff",
};

pub fn is_non_player(name: &str) -> bool {
    NON_PLAYER_NAMES.contains(name)
}

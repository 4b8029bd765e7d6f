//! Unit, unit-group and item definitions.

use serde::{Deserialize, Serialize};

use crate::math::{decimal_serde, Fixed};

/// Which combatant variant a unit entry produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum UnitKind {
    /// Player-owned hero. Heroes carry equipment and camp active skills.
    Hero,
    /// NPC creature, usually spawned from a unit group.
    #[default]
    Creature,
}

impl UnitKind {
    /// Whether roster equipment folds into this variant's attributes.
    #[must_use]
    pub const fn equips_items(self) -> bool {
        matches!(self, Self::Hero)
    }

    /// Whether this variant contributes a camp active skill.
    #[must_use]
    pub const fn has_camp_skill(self) -> bool {
        matches!(self, Self::Hero)
    }
}

/// Racial classification used by random effect predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Race {
    /// Humans.
    #[default]
    Human,
    /// Beasts.
    Beast,
    /// Undead.
    Undead,
    /// Demons.
    Demon,
    /// Elementals.
    Elemental,
}

/// Data-driven unit definition.
///
/// # Example RON
///
/// ```ron
/// UnitEntry(
///     id: 1,
///     name: "unit.footman",
///     kind: Hero,
///     race: Human,
///     attributes: 1001,
///     growth: Some(1002),
///     skills: [10001, 10101],
///     passive_auras: [],
///     active_skill: Some(10201),
///     beat_back_skill: Some(10001),
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitEntry {
    /// Unique identifier (the roster's type id).
    pub id: u32,
    /// Localization key for the display name.
    pub name: String,
    /// Combatant variant.
    #[serde(default)]
    pub kind: UnitKind,
    /// Race.
    #[serde(default)]
    pub race: Race,
    /// Attribute entry holding level-1 base values.
    pub attributes: u32,
    /// Attribute entry added once per level above 1.
    #[serde(default)]
    pub growth: Option<u32>,
    /// Skills the unit's AI may cast. The first entry flagged basic is the melee attack.
    #[serde(default)]
    pub skills: Vec<u32>,
    /// Auras applied to the unit when the scene starts.
    #[serde(default)]
    pub passive_auras: Vec<u32>,
    /// Camp-level active skill paid with camp energy (heroes only).
    #[serde(default)]
    pub active_skill: Option<u32>,
    /// Skill cast back at an attacker after a successful block.
    #[serde(default)]
    pub beat_back_skill: Option<u32>,
}

/// One member of an NPC wave.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitGroupMember {
    /// Unit entry id.
    pub type_id: u32,
    /// Level of the spawned creature.
    #[serde(default = "default_level")]
    pub level: u32,
    /// Spawn X coordinate.
    #[serde(default, with = "decimal_serde")]
    pub x: Fixed,
    /// Spawn Y coordinate.
    #[serde(default, with = "decimal_serde")]
    pub y: Fixed,
}

/// A static NPC wave resolved by id when a scene is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitGroupEntry {
    /// Unique identifier.
    pub id: u32,
    /// Creatures in this wave.
    pub members: Vec<UnitGroupMember>,
}

/// Equipment whose attributes fold into a hero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemEntry {
    /// Unique identifier.
    pub id: u32,
    /// Localization key for the display name.
    pub name: String,
    /// Attribute entry granted while equipped.
    pub attributes: u32,
}

pub(crate) const fn default_level() -> u32 {
    1
}

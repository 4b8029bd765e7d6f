//! Aura (buff/debuff) definitions.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::attribute::AttributeKind;
use crate::math::{decimal_serde, Fixed};
use crate::state::{Mechanic, MechanicFlags, School, UnitState};

/// Maximum effect slots per aura.
pub const MAX_AURA_SLOTS: usize = 3;

bitflags! {
    /// Why an aura was removed.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct RemoveMode: u8 {
        /// Expired or its owner died.
        const DEFAULT = 1 << 0;
        /// Dispelled by an effect.
        const DISPEL = 1 << 1;
        /// Used up (shield depleted).
        const CONSUME = 1 << 2;
        /// Superseded by a stronger aura of the same family.
        const HANGUP = 1 << 3;
        /// Removed while it was still ticking (scene teardown).
        const RUNNING = 1 << 4;
    }
}

/// Event that fires an aura slot's effect phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AuraTrigger {
    /// Once, when the aura is applied.
    #[default]
    Apply,
    /// Every round end.
    Round,
    /// Owner is about to deal damage.
    BeforeDamageDealt,
    /// Owner is about to take damage.
    BeforeDamageTaken,
    /// Owner dealt damage.
    DamageDealt,
    /// Owner took damage.
    DamageTaken,
    /// Owner finished a cast.
    CastSpell,
    /// Owner killed a unit.
    Kill,
    /// Owner died.
    Death,
    /// Aura removed with a mode matching its removal-effect mask.
    Remove,
}

/// Who receives a sub-spell cast by an aura.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AuraCastTarget {
    /// The aura owner.
    #[default]
    Owner,
    /// The aura caster.
    Caster,
    /// The unit on the other side of the triggering event.
    TriggerSource,
}

/// Aura effect handlers.
///
/// Fractional kinds (`DamageConvert`, `DamageAbsorb`, `DamageFix`) read
/// their slot points as a ratio, the others as an absolute amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuraEffectKind {
    /// Deal points as damage to the owner.
    PeriodicDamage {
        /// Damage school.
        #[serde(default)]
        school: School,
    },
    /// Heal the owner by points.
    PeriodicHeal,
    /// Add points to an attribute while applied.
    ModAttribute {
        /// Modified attribute.
        attribute: AttributeKind,
    },
    /// Add points to an attribute's percent companion while applied.
    ModAttributePercent {
        /// Attribute whose percent companion is modified.
        attribute: AttributeKind,
    },
    /// Cast a spell.
    CastSpell {
        /// Skill entry id.
        spell_id: u32,
        /// Receiver of the cast.
        #[serde(default)]
        target: AuraCastTarget,
    },
    /// Set owner states while applied.
    ChangeState {
        /// States to set.
        state: UnitState,
    },
    /// Grant mechanic immunity while applied.
    Immunity {
        /// Mechanics the owner ignores.
        mechanics: MechanicFlags,
    },
    /// Heal the owner by a ratio of the damage it dealt.
    DamageConvert,
    /// Reduce incoming damage by a ratio.
    DamageAbsorb,
    /// Accumulate damage taken, cast a spell once points are reached.
    DamageAccumulate {
        /// Skill entry id cast at the threshold.
        spell_id: u32,
    },
    /// Scale damage by `1 + points`.
    DamageFix {
        /// Scale outgoing damage when true, incoming otherwise.
        outgoing: bool,
    },
    /// Replace the owner's basic attack while applied.
    ReplaceMeleeSpell {
        /// Replacement skill entry id.
        spell_id: u32,
    },
    /// Absorb incoming damage from a point pool; removed when depleted.
    Shield,
}

/// One effect slot of an aura.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuraEffectSlot {
    /// Handler.
    pub kind: AuraEffectKind,
    /// Event that fires the effect phase.
    #[serde(default)]
    pub trigger: AuraTrigger,
    /// Flat magnitude.
    #[serde(default, with = "decimal_serde")]
    pub base_points: Fixed,
    /// Attribute scaling the magnitude.
    #[serde(default)]
    pub scale_attribute: Option<AttributeKind>,
    /// Ratio of `scale_attribute` added to the magnitude.
    #[serde(default, with = "decimal_serde")]
    pub scale_percent: Fixed,
    /// Effect-phase firings per quota period; zero means unlimited.
    #[serde(default)]
    pub trigger_count: u32,
    /// Rounds between effect-phase firings.
    #[serde(default)]
    pub cooldown: u32,
}

/// Data-driven aura definition.
///
/// Ids encode a family and a level: `family = id / 100`, `level = id % 100`.
///
/// # Example RON
///
/// ```ron
/// AuraEntry(
///     id: 30101,
///     name: "aura.burn",
///     duration: 3,
///     harmful: true,
///     slots: [
///         (kind: PeriodicDamage(school: Fire), trigger: Round, base_points: 10),
///     ],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuraEntry {
    /// Unique identifier.
    pub id: u32,
    /// Localization key for the display name.
    pub name: String,
    /// Duration in rounds; zero means permanent.
    #[serde(default)]
    pub duration: u32,
    /// Debuff when true.
    #[serde(default)]
    pub harmful: bool,
    /// Mechanic checked against owner immunity on application.
    #[serde(default)]
    pub mechanic: Option<Mechanic>,
    /// Instances from different casters stack into one.
    #[serde(default)]
    pub multi_wrap: bool,
    /// Maximum wrap count.
    #[serde(default = "default_max_wraps")]
    pub max_wraps: u32,
    /// Strength used when comparing auras across families.
    #[serde(default)]
    pub effect_priority: i32,
    /// Magnitudes scale with the owner's attributes instead of the caster's.
    #[serde(default)]
    pub dec_by_target: bool,
    /// Removal modes that fire `Remove`-triggered slots.
    #[serde(default)]
    pub removal_effect_mask: RemoveMode,
    /// Effect slots.
    #[serde(default)]
    pub slots: Vec<AuraEffectSlot>,
}

const fn default_max_wraps() -> u32 {
    1
}

impl AuraEntry {
    /// Stacking family.
    #[must_use]
    pub const fn family(&self) -> u32 {
        self.id / 100
    }

    /// Level within the family.
    #[must_use]
    pub const fn level(&self) -> u32 {
        self.id % 100
    }
}

//! Skill, timeline and effect definitions.
//!
//! A skill references timelines, a timeline references effects. Targeting
//! is described by four independent enums that the cast pipeline applies in
//! order (launch, target, range, scope).

use serde::{Deserialize, Serialize};

use crate::data::unit_data::Race;
use crate::math::{decimal_serde, option_decimal_serde, Fixed};
use crate::state::{Mechanic, School, UnitState};

/// Where the targeting shape is anchored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum LaunchType {
    /// Anchored on the caster.
    #[default]
    Caster,
    /// Anchored on the selected target.
    Target,
}

/// How the initial candidate list is seeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TargetType {
    /// Every living unit around the caster.
    SelfRound,
    /// Every living unit around the selected target.
    SelectRound,
    /// The selected target if friendly, otherwise the caster.
    FriendlySingle,
    /// The selected target if hostile, otherwise the enemy camp's head.
    #[default]
    EnemySingle,
}

/// Geometric shape candidates must fall inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum RangeType {
    /// Disc of `range_radius`.
    #[default]
    Circle,
    /// Box of length `range_radius` and width `range_width` along the facing.
    Rectangle,
    /// Sector of radius `range_radius` and opening `range_angle` degrees.
    Fan,
}

/// Camp relation filter relative to the caster and the primary target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ScopeType {
    /// Only the primary target.
    #[default]
    SelectTarget,
    /// Friendly units other than the primary target.
    FriendlyExceptTarget,
    /// Every friendly unit.
    AllFriendly,
    /// Enemy units other than the primary target.
    EnemyExceptTarget,
    /// Every enemy unit.
    AllEnemy,
}

/// Data-driven skill definition.
///
/// # Example RON
///
/// ```ron
/// SkillEntry(
///     id: 10001,
///     name: "skill.slash",
///     basic: true,
///     launch: Target,
///     target: EnemySingle,
///     range: Circle,
///     scope: SelectTarget,
///     range_radius: 1,
///     timelines: [1],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillEntry {
    /// Unique identifier.
    pub id: u32,
    /// Localization key for the display name.
    pub name: String,
    /// Basic melee attack. Basic skills ignore silence.
    #[serde(default)]
    pub basic: bool,
    /// Anchor of the targeting shape.
    #[serde(default)]
    pub launch: LaunchType,
    /// Candidate seeding.
    #[serde(default)]
    pub target: TargetType,
    /// Geometric filter.
    #[serde(default)]
    pub range: RangeType,
    /// Camp relation filter.
    #[serde(default)]
    pub scope: ScopeType,
    /// Circle/fan radius, rectangle length.
    #[serde(default, with = "decimal_serde")]
    pub range_radius: Fixed,
    /// Rectangle width.
    #[serde(default, with = "decimal_serde")]
    pub range_width: Fixed,
    /// Fan opening in whole degrees.
    #[serde(default)]
    pub range_angle: u32,
    /// Maximum caster-to-target distance; zero means unlimited.
    #[serde(default, with = "decimal_serde")]
    pub cast_range: Fixed,
    /// Maximum resolved targets; zero means unlimited.
    #[serde(default)]
    pub max_targets: u32,
    /// Damage school.
    #[serde(default)]
    pub school: School,
    /// Cooldown in rounds after a successful cast.
    #[serde(default)]
    pub cooldown: u32,
    /// Camp energy paid when cast as a camp active skill.
    #[serde(default)]
    pub energy_cost: i32,
    /// States on the caster that prevent the cast.
    #[serde(default = "default_caster_forbid")]
    pub caster_state_forbid: UnitState,
    /// States on the target that prevent the cast.
    #[serde(default)]
    pub target_state_forbid: UnitState,
    /// Aura the caster must carry.
    #[serde(default)]
    pub caster_aura_required: Option<u32>,
    /// Aura the target must not carry.
    #[serde(default)]
    pub target_aura_forbidden: Option<u32>,
    /// Timelines resolved in order.
    #[serde(default)]
    pub timelines: Vec<u32>,
}

fn default_caster_forbid() -> UnitState {
    UnitState::STUN
}

/// Ordered list of effects resolved by a skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    /// Unique identifier.
    pub id: u32,
    /// Effect ids in resolution order.
    #[serde(default)]
    pub effects: Vec<u32>,
}

/// One atomic outcome of a cast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectEntry {
    /// Unique identifier.
    pub id: u32,
    /// What the effect does.
    pub kind: EffectKind,
    /// Mechanic checked against target immunity.
    #[serde(default)]
    pub mechanic: Option<Mechanic>,
    /// Validity predicate evaluated per target.
    #[serde(default)]
    pub condition: EffectCondition,
    /// Static landing probability. Overrides the effect-hit roll when set.
    #[serde(default, with = "option_decimal_serde")]
    pub chance: Option<Fixed>,
}

/// Effect handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectKind {
    /// `attack * percent + flat`, through the full damage formula.
    Damage {
        /// Attack ratio.
        #[serde(with = "decimal_serde")]
        percent: Fixed,
        /// Flat skill damage.
        #[serde(default, with = "decimal_serde")]
        flat: Fixed,
    },
    /// `attack * percent + flat` healing.
    Heal {
        /// Attack ratio.
        #[serde(with = "decimal_serde")]
        percent: Fixed,
        /// Flat healing.
        #[serde(default, with = "decimal_serde")]
        flat: Fixed,
    },
    /// Cancel the target's queued actions.
    Interrupt,
    /// Pull the target toward the caster.
    Gather {
        /// Pull distance.
        #[serde(with = "decimal_serde")]
        distance: Fixed,
    },
    /// Apply an aura to the target.
    AddAura {
        /// Aura entry id.
        aura_id: u32,
    },
    /// Remove auras of one polarity from the target.
    Dispel {
        /// Maximum auras removed.
        count: u32,
        /// Remove harmful auras when true, beneficial ones otherwise.
        harmful: bool,
    },
    /// Change the target camp's energy.
    ModEnergy {
        /// Signed energy delta.
        amount: i32,
    },
}

/// Per-target validity predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum EffectCondition {
    /// Always valid.
    #[default]
    Always,
    /// Only when the target is the caster.
    SelfOnly,
    /// Only when the target is not the caster.
    NotSelf,
    /// Caster health fraction strictly below the threshold.
    CasterHpBelow(#[serde(with = "decimal_serde")] Fixed),
    /// Target health fraction strictly below the threshold.
    TargetHpBelow(#[serde(with = "decimal_serde")] Fixed),
    /// Target health fraction strictly above the threshold.
    TargetHpAbove(#[serde(with = "decimal_serde")] Fixed),
    /// Caster carries any of these states.
    CasterState(UnitState),
    /// Target carries any of these states.
    TargetState(UnitState),
    /// Random roll with racial bonus and level decay.
    Random {
        /// Base chance.
        #[serde(with = "decimal_serde")]
        chance: Fixed,
        /// Race receiving the bonus.
        #[serde(default)]
        race: Option<Race>,
        /// Chance added when the target is of `race`.
        #[serde(default, with = "decimal_serde")]
        race_bonus: Fixed,
        /// Chance removed per level the target has above the caster.
        #[serde(default, with = "decimal_serde")]
        level_decay: Fixed,
    },
    /// Caster carries the aura.
    CasterHasAura(u32),
    /// Target carries the aura.
    TargetHasAura(u32),
    /// Target does not carry the aura.
    TargetLacksAura(u32),
}

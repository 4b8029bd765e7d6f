//! Global combat tuning.

use serde::{Deserialize, Serialize};

use crate::math::{decimal_serde, Fixed};

/// Engine-wide constants loaded with the static data.
///
/// Every field has a default, so a data file only lists what it changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Tick period of the scene loop in milliseconds.
    pub tick_interval_ms: u64,
    /// Rounds before the scene ends in the defender's favour.
    pub max_rounds: u32,
    /// Casts one combatant may issue per tick.
    pub max_spells_per_tick: u32,
    /// Deferred (aura-triggered, beat-back) casts resolved after one cast.
    pub max_pending_casts: u32,
    /// Invocations before an idle action completes.
    pub idle_repeat: u32,
    /// Round ends between aura trigger-quota resets.
    pub aura_quota_reset: u32,
    /// Camp energy ceiling.
    pub energy_max: i32,
    /// Energy gained by the attacking camp per damaging hit.
    pub energy_per_hit: i32,
    /// Energy gained by the wounded camp per damaging hit.
    pub energy_per_wound: i32,
    /// Attack weight in the armor reduction denominator.
    #[serde(with = "decimal_serde")]
    pub armor_constant: Fixed,
    /// Lower bound of the random damage factor.
    #[serde(with = "decimal_serde")]
    pub random_min: Fixed,
    /// Upper bound of the random damage factor.
    #[serde(with = "decimal_serde")]
    pub random_max: Fixed,
    /// Crit bonus every unit has before its `CritBonus` attribute.
    #[serde(with = "decimal_serde")]
    pub base_crit_bonus: Fixed,
    /// Damage multiplier of a blocked hit.
    #[serde(with = "decimal_serde")]
    pub block_factor: Fixed,
    /// Hostile hit chance never drops below this.
    #[serde(with = "decimal_serde")]
    pub min_hit_chance: Fixed,
    /// Chances above this are compressed.
    #[serde(with = "decimal_serde")]
    pub compress_threshold: Fixed,
    /// Fraction of the excess kept when compressing.
    #[serde(with = "decimal_serde")]
    pub compress_factor: Fixed,
    /// Distance between roster slots when no position is given.
    #[serde(with = "decimal_serde")]
    pub formation_spacing: Fixed,
    /// X offset of each camp's formation from the origin.
    #[serde(with = "decimal_serde")]
    pub formation_offset: Fixed,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 200,
            max_rounds: 300,
            max_spells_per_tick: 8,
            max_pending_casts: 32,
            idle_repeat: 10,
            aura_quota_reset: 6,
            energy_max: 100,
            energy_per_hit: 5,
            energy_per_wound: 3,
            armor_constant: Fixed::ONE,
            random_min: Fixed::from_num(0.95),
            random_max: Fixed::from_num(1.05),
            base_crit_bonus: Fixed::from_num(0.5),
            block_factor: Fixed::from_num(0.5),
            min_hit_chance: Fixed::from_num(0.2),
            compress_threshold: Fixed::from_num(0.5),
            compress_factor: Fixed::from_num(0.5),
            formation_spacing: Fixed::from_num(2),
            formation_offset: Fixed::from_num(5),
        }
    }
}

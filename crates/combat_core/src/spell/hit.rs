//! Hit, crit and block resolution.
//!
//! Raw chances are attribute differences. Anything above the compression
//! threshold only counts partially, and the dodge chance is capped so a
//! hostile cast always keeps a minimum chance to land.

use crate::attribute::{AttSnapshot, AttributeKind};
use crate::data::GlobalConfig;
use crate::math::Fixed;
use crate::rng::CombatRng;

/// Outcome of the per-target roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HitResult {
    /// The cast landed.
    pub hit: bool,
    /// Critical strike.
    pub crit: bool,
    /// The target blocked.
    pub blocked: bool,
}

/// Compress the part of `chance` above the threshold and clamp to `[0, 1]`.
#[must_use]
pub fn compress(chance: Fixed, config: &GlobalConfig) -> Fixed {
    let chance = chance.max(Fixed::ZERO);
    let compressed = if chance > config.compress_threshold {
        config.compress_threshold
            + (chance - config.compress_threshold).saturating_mul(config.compress_factor)
    } else {
        chance
    };
    compressed.min(Fixed::ONE)
}

/// `def.dodge - atk.hit`, compressed, capped at `1 - min_hit_chance`.
#[must_use]
pub fn dodge_chance(atk: &AttSnapshot, def: &AttSnapshot, config: &GlobalConfig) -> Fixed {
    let raw = def.get(AttributeKind::Dodge).saturating_sub(atk.get(AttributeKind::Hit));
    let cap = (Fixed::ONE - config.min_hit_chance).max(Fixed::ZERO);
    compress(raw, config).min(cap)
}

/// `atk.crit - def.tenacity`, compressed.
#[must_use]
pub fn crit_chance(atk: &AttSnapshot, def: &AttSnapshot, config: &GlobalConfig) -> Fixed {
    compress(
        atk.get(AttributeKind::Crit).saturating_sub(def.get(AttributeKind::Tenacity)),
        config,
    )
}

/// `def.block - atk.break`, compressed.
#[must_use]
pub fn block_chance(atk: &AttSnapshot, def: &AttSnapshot, config: &GlobalConfig) -> Fixed {
    compress(
        def.get(AttributeKind::Block).saturating_sub(atk.get(AttributeKind::Break)),
        config,
    )
}

/// Roll against a hostile target: dodge, then crit and block.
pub fn roll_hostile(
    rng: &mut CombatRng,
    atk: &AttSnapshot,
    def: &AttSnapshot,
    config: &GlobalConfig,
) -> HitResult {
    if rng.roll(dodge_chance(atk, def, config)) {
        return HitResult::default();
    }
    HitResult {
        hit: true,
        crit: rng.roll(crit_chance(atk, def, config)),
        blocked: rng.roll(block_chance(atk, def, config)),
    }
}

/// Friendly casts always land and cannot be blocked.
pub fn roll_friendly(rng: &mut CombatRng, atk: &AttSnapshot, config: &GlobalConfig) -> HitResult {
    HitResult {
        hit: true,
        crit: rng.roll(compress(atk.get(AttributeKind::Crit), config)),
        blocked: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::AttManager;

    fn snapshot(values: &[(AttributeKind, f64)]) -> AttSnapshot {
        let mut att = AttManager::new();
        for (kind, value) in values {
            att.set_att_value(*kind, Fixed::from_num(*value));
        }
        att.calc_att();
        att.snapshot()
    }

    #[test]
    fn test_compress_above_threshold() {
        let config = GlobalConfig::default();
        assert_eq!(compress(Fixed::from_num(0.3), &config), Fixed::from_num(0.3));
        // 0.5 + (0.9 - 0.5) * 0.5
        assert_eq!(compress(Fixed::from_num(0.9), &config), Fixed::from_num(0.7));
        assert_eq!(compress(Fixed::from_num(-0.4), &config), Fixed::ZERO);
        assert_eq!(compress(Fixed::from_num(5), &config), Fixed::ONE);
    }

    #[test]
    fn test_dodge_keeps_minimum_hit_chance() {
        let mut config = GlobalConfig::default();
        config.compress_factor = Fixed::ONE;
        let atk = snapshot(&[]);
        let def = snapshot(&[(AttributeKind::Dodge, 3.0)]);
        assert_eq!(dodge_chance(&atk, &def, &config), Fixed::from_num(0.8));
    }

    #[test]
    fn test_hit_offsets_dodge() {
        let config = GlobalConfig::default();
        let atk = snapshot(&[(AttributeKind::Hit, 0.25)]);
        let def = snapshot(&[(AttributeKind::Dodge, 0.25)]);
        assert_eq!(dodge_chance(&atk, &def, &config), Fixed::ZERO);

        let mut rng = CombatRng::new(5);
        for _ in 0..50 {
            assert!(roll_hostile(&mut rng, &atk, &def, &config).hit);
        }
    }

    #[test]
    fn test_friendly_never_blocked() {
        let config = GlobalConfig::default();
        let atk = snapshot(&[(AttributeKind::Crit, 1.0)]);
        let mut rng = CombatRng::new(1);
        let roll = roll_friendly(&mut rng, &atk, &config);
        assert!(roll.hit);
        assert!(!roll.blocked);
        // 1.0 compresses to 0.75, so crit is not guaranteed; only check bounds.
        assert_eq!(compress(Fixed::ONE, &config), Fixed::from_num(0.75));
    }
}

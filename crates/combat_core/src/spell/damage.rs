//! Damage and healing arithmetic and application.

use crate::attribute::{AttSnapshot, AttributeKind};
use crate::aura::{self, TriggerContext};
use crate::battlefield::{Battlefield, DamageResult};
use crate::combatant::CombatantId;
use crate::data::{AuraTrigger, GlobalConfig, RemoveMode};
use crate::events::{CombatEvent, EventKind, ResultFlags};
use crate::math::{round_to_i64, Fixed};
use crate::state::{School, UnitState};

/// Every term of the damage formula.
///
/// ```text
/// final = (attack * percent + flat)
///       * (1 + elemental_bonus)
///       * (1 - armor_reduction)
///       * (1 - elemental_resist)
///       * self_bonus
///       * random_factor
///       * (1 + crit_bonus * is_crit)
///       * block_factor
///       + true_damage
///
/// armor_reduction = a / (a + attack * armor_constant)
/// a               = armor * (1 - ignore_defense)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DamageInputs {
    /// Caster attack.
    pub attack: Fixed,
    /// Skill attack ratio.
    pub percent: Fixed,
    /// Skill flat damage.
    pub flat: Fixed,
    /// Caster's bonus for the skill's school.
    pub elemental_bonus: Fixed,
    /// Target armor.
    pub armor: Fixed,
    /// Fraction of armor the caster ignores.
    pub ignore_defense: Fixed,
    /// Attack weight in the armor denominator.
    pub armor_constant: Fixed,
    /// Target's resistance to the skill's school.
    pub elemental_resist: Fixed,
    /// Caster's outgoing damage multiplier.
    pub self_bonus: Fixed,
    /// Rolled damage range factor.
    pub random_factor: Fixed,
    /// Extra multiplier on a critical strike.
    pub crit_bonus: Fixed,
    /// Whether the hit is critical.
    pub is_crit: bool,
    /// Multiplier of a blocked hit; one when not blocked.
    pub block_factor: Fixed,
    /// Flat damage added last.
    pub true_damage: Fixed,
}

impl DamageInputs {
    /// Inputs with every modifier neutral.
    #[must_use]
    pub const fn neutral(attack: Fixed, percent: Fixed, flat: Fixed) -> Self {
        Self {
            attack,
            percent,
            flat,
            elemental_bonus: Fixed::ZERO,
            armor: Fixed::ZERO,
            ignore_defense: Fixed::ZERO,
            armor_constant: Fixed::ONE,
            elemental_resist: Fixed::ZERO,
            self_bonus: Fixed::ONE,
            random_factor: Fixed::ONE,
            crit_bonus: Fixed::ZERO,
            is_crit: false,
            block_factor: Fixed::ONE,
            true_damage: Fixed::ZERO,
        }
    }

    /// Inputs gathered from attribute snapshots.
    #[must_use]
    pub fn from_snapshots(
        atk: &AttSnapshot,
        def: &AttSnapshot,
        school: School,
        percent: Fixed,
        flat: Fixed,
        config: &GlobalConfig,
    ) -> Self {
        let (bonus, resist) = school_attributes(school);
        Self {
            attack: atk.get(AttributeKind::Attack),
            percent,
            flat,
            elemental_bonus: atk.get(bonus),
            armor: def.get(AttributeKind::Armor),
            ignore_defense: atk.get(AttributeKind::IgnoreDefense),
            armor_constant: config.armor_constant,
            elemental_resist: def.get(resist),
            self_bonus: Fixed::ONE.saturating_add(atk.get(AttributeKind::DamageBonus)),
            random_factor: Fixed::ONE,
            crit_bonus: config.base_crit_bonus.saturating_add(atk.get(AttributeKind::CritBonus)),
            is_crit: false,
            block_factor: Fixed::ONE,
            true_damage: atk.get(AttributeKind::TrueDamage),
        }
    }

    /// `a / (a + attack * armor_constant)` with `a = armor * (1 - ignore_defense)`.
    #[must_use]
    pub fn armor_reduction(&self) -> Fixed {
        let effective = self
            .armor
            .saturating_mul(Fixed::ONE.saturating_sub(self.ignore_defense))
            .max(Fixed::ZERO);
        let denominator = effective.saturating_add(self.attack.saturating_mul(self.armor_constant));
        if denominator <= Fixed::ZERO {
            return Fixed::ZERO;
        }
        effective / denominator
    }

    /// Unrounded result of the formula, never negative.
    #[must_use]
    pub fn final_damage(&self) -> Fixed {
        let crit = if self.is_crit {
            Fixed::ONE.saturating_add(self.crit_bonus)
        } else {
            Fixed::ONE
        };
        let base = self.attack.saturating_mul(self.percent).saturating_add(self.flat);
        let scaled = base
            .saturating_mul(Fixed::ONE.saturating_add(self.elemental_bonus))
            .saturating_mul(Fixed::ONE - self.armor_reduction())
            .saturating_mul(Fixed::ONE.saturating_sub(self.elemental_resist.min(Fixed::ONE)))
            .saturating_mul(self.self_bonus)
            .saturating_mul(self.random_factor)
            .saturating_mul(crit)
            .saturating_mul(self.block_factor);
        scaled.saturating_add(self.true_damage).max(Fixed::ZERO)
    }

    /// [`Self::final_damage`] rounded to the nearest integer.
    #[must_use]
    pub fn rounded(&self) -> i64 {
        round_to_i64(self.final_damage())
    }
}

/// `(attack * percent + flat) * (1 + heal_bonus) * (1 + crit_bonus * is_crit)`.
#[must_use]
pub fn heal_amount(
    atk: &AttSnapshot,
    percent: Fixed,
    flat: Fixed,
    is_crit: bool,
    config: &GlobalConfig,
) -> Fixed {
    let base = atk
        .get(AttributeKind::Attack)
        .saturating_mul(percent)
        .saturating_add(flat);
    let crit = if is_crit {
        Fixed::ONE
            .saturating_add(config.base_crit_bonus)
            .saturating_add(atk.get(AttributeKind::CritBonus))
    } else {
        Fixed::ONE
    };
    base.saturating_mul(Fixed::ONE.saturating_add(atk.get(AttributeKind::HealBonus)))
        .saturating_mul(crit)
        .max(Fixed::ZERO)
}

/// Bonus and resistance attributes of a school.
#[must_use]
pub const fn school_attributes(school: School) -> (AttributeKind, AttributeKind) {
    match school {
        School::Physical => (AttributeKind::PhysicalDamage, AttributeKind::PhysicalResist),
        School::Fire => (AttributeKind::FireDamage, AttributeKind::FireResist),
        School::Frost => (AttributeKind::FrostDamage, AttributeKind::FrostResist),
        School::Shadow => (AttributeKind::ShadowDamage, AttributeKind::ShadowResist),
    }
}

/// Damage about to be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DamageRequest {
    /// Source.
    pub caster: CombatantId,
    /// Receiver.
    pub target: CombatantId,
    /// Unrounded amount.
    pub amount: Fixed,
    /// School.
    pub school: School,
    /// Skill or aura entry.
    pub spell_id: u32,
    /// Flags from the hit roll.
    pub flags: ResultFlags,
    /// Fire damage-related aura triggers on both sides.
    pub triggers: bool,
}

/// Apply damage: aura modifiers, health, death accounting, energy, event.
///
/// The target's first transition to dead is handled exactly once; damage to
/// a dead target does nothing.
pub fn deal_damage(bf: &mut Battlefield, request: &DamageRequest) -> DamageResult {
    let caster = request.caster;
    let target = request.target;
    let Some(target_unit) = bf.unit(target).filter(|u| u.is_alive()) else {
        return DamageResult::default();
    };
    let target_camp = target_unit.camp();
    let invincible = target_unit.has_state(UnitState::INVINCIBLE);

    let mut ctx = TriggerContext {
        source: Some(target),
        spell_id: request.spell_id,
        school: request.school,
        amount: request.amount,
        outgoing: true,
        flags: request.flags,
    };
    if request.triggers {
        aura::trigger(bf, caster, AuraTrigger::BeforeDamageDealt, &mut ctx);
        ctx.source = Some(caster);
        ctx.outgoing = false;
        aura::trigger(bf, target, AuraTrigger::BeforeDamageTaken, &mut ctx);
    }

    let mut flags = ctx.flags;
    let amount = if invincible {
        flags |= ResultFlags::IMMUNE;
        0
    } else {
        round_to_i64(ctx.amount.max(Fixed::ZERO))
    };

    let result = bf.apply_damage(target, amount);
    if result.killed {
        flags |= ResultFlags::KILL | ResultFlags::KILLED;
    }
    bf.emit(CombatEvent {
        round: 0,
        kind: EventKind::Damage,
        school: request.school,
        amount: result.dealt,
        spell_id: request.spell_id,
        caster,
        target,
        flags,
    });

    let caster_camp = bf.unit(caster).map(|u| u.camp());
    if result.dealt > 0 && caster_camp.is_some_and(|camp| camp != target_camp) {
        let config = *bf.config();
        if let Some(camp) = caster_camp {
            bf.camp_mut(camp).mod_att_energy(config.energy_per_hit);
        }
        bf.camp_mut(target_camp).mod_att_energy(config.energy_per_wound);
    }

    if request.triggers && result.dealt > 0 {
        ctx.amount = Fixed::from_num(result.dealt);
        ctx.source = Some(target);
        ctx.outgoing = true;
        aura::trigger(bf, caster, AuraTrigger::DamageDealt, &mut ctx);
        ctx.source = Some(caster);
        ctx.outgoing = false;
        aura::trigger(bf, target, AuraTrigger::DamageTaken, &mut ctx);
    }

    if result.killed {
        if request.triggers {
            let mut kill_ctx = TriggerContext::new(Some(target), request.spell_id);
            aura::trigger(bf, caster, AuraTrigger::Kill, &mut kill_ctx);
        }
        let mut death_ctx = TriggerContext::new(Some(caster), request.spell_id);
        aura::trigger(bf, target, AuraTrigger::Death, &mut death_ctx);
        aura::remove_all(bf, target, RemoveMode::DEFAULT);
    }

    result
}

/// Heal `target` and emit the event. Returns the health restored.
pub fn deal_heal(
    bf: &mut Battlefield,
    caster: CombatantId,
    target: CombatantId,
    amount: i64,
    spell_id: u32,
    flags: ResultFlags,
) -> i64 {
    if !bf.is_alive(target) {
        return 0;
    }
    let healed = bf.apply_heal(target, amount);
    bf.emit(CombatEvent {
        round: 0,
        kind: EventKind::Heal,
        school: School::Physical,
        amount: healed,
        spell_id,
        caster,
        target,
        flags,
    });
    healed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neutral_inputs_are_exact() {
        let inputs = DamageInputs::neutral(Fixed::from_num(1000), Fixed::ONE, Fixed::ZERO);
        assert_eq!(inputs.final_damage(), Fixed::from_num(1000));
        assert_eq!(inputs.rounded(), 1000);
    }

    #[test]
    fn test_armor_reduction() {
        let mut inputs = DamageInputs::neutral(Fixed::from_num(100), Fixed::ONE, Fixed::ZERO);
        inputs.armor = Fixed::from_num(100);
        assert_eq!(inputs.armor_reduction(), Fixed::from_num(0.5));
        assert_eq!(inputs.rounded(), 50);

        inputs.ignore_defense = Fixed::ONE;
        assert_eq!(inputs.armor_reduction(), Fixed::ZERO);
        assert_eq!(inputs.rounded(), 100);
    }

    #[test]
    fn test_full_formula() {
        let inputs = DamageInputs {
            attack: Fixed::from_num(200),
            percent: Fixed::from_num(1.5),
            flat: Fixed::from_num(20),
            elemental_bonus: Fixed::from_num(0.25),
            armor: Fixed::from_num(200),
            ignore_defense: Fixed::from_num(0.5),
            armor_constant: Fixed::ONE,
            elemental_resist: Fixed::from_num(0.5),
            self_bonus: Fixed::from_num(1.25),
            random_factor: Fixed::ONE,
            crit_bonus: Fixed::from_num(0.5),
            is_crit: true,
            block_factor: Fixed::from_num(0.5),
            true_damage: Fixed::from_num(7),
        };
        // (300 + 20) * 1.25 * (1 - 100/300) * 0.5 * 1.25 * 1 * 1.5 * 0.5 + 7
        // = 400 * 2/3 * 0.5 * 1.25 * 0.75 + 7 = 125 + 7
        assert_eq!(inputs.rounded(), 132);
    }

    #[test]
    fn test_rounds_only_at_the_end() {
        // 0.4 per term would round to zero if rounded early.
        let mut inputs = DamageInputs::neutral(Fixed::from_num(1), Fixed::from_num(0.4), Fixed::ZERO);
        inputs.true_damage = Fixed::from_num(0.4);
        assert_eq!(inputs.rounded(), 1);
    }

    #[test]
    fn test_extreme_attack_saturates() {
        let mut inputs = DamageInputs::neutral(Fixed::MAX, Fixed::from_num(2), Fixed::ZERO);
        inputs.true_damage = Fixed::from_num(10);
        inputs.crit_bonus = Fixed::MAX;
        inputs.is_crit = true;
        assert_eq!(inputs.final_damage(), Fixed::MAX);
        assert_eq!(inputs.rounded(), Fixed::MAX.to_num::<i64>());

        inputs.armor = Fixed::MAX;
        inputs.ignore_defense = Fixed::MIN;
        inputs.elemental_resist = Fixed::MIN;
        assert!(inputs.rounded() >= 0);
    }

    #[test]
    fn test_never_negative() {
        let mut inputs = DamageInputs::neutral(Fixed::from_num(10), Fixed::ONE, Fixed::ZERO);
        inputs.true_damage = Fixed::from_num(-50);
        assert_eq!(inputs.final_damage(), Fixed::ZERO);
    }
}

//! Per-target effect resolution.

use crate::attribute::{AttSnapshot, AttributeKind};
use crate::aura;
use crate::battlefield::Battlefield;
use crate::combatant::CombatantId;
use crate::data::{EffectCondition, EffectEntry, EffectKind, SkillEntry};
use crate::events::{CombatEvent, EventKind, ResultFlags};
use crate::math::{round_to_i64, Fixed};

use super::damage::{deal_damage, deal_heal, heal_amount, DamageInputs, DamageRequest};
use super::hit::HitResult;

/// Everything an effect needs to know about the cast resolving it.
#[derive(Debug, Clone, Copy)]
pub(super) struct EffectContext<'a> {
    pub caster: CombatantId,
    pub target: CombatantId,
    pub entry: &'a SkillEntry,
    pub roll: HitResult,
    pub friendly: bool,
    pub caster_snapshot: &'a AttSnapshot,
}

impl EffectContext<'_> {
    fn flags(&self) -> ResultFlags {
        let mut flags = ResultFlags::empty();
        if self.roll.crit {
            flags |= ResultFlags::CRIT;
        }
        if self.roll.blocked {
            flags |= ResultFlags::BLOCK;
        }
        flags
    }

    fn event(&self, kind: EventKind, amount: i64, flags: ResultFlags) -> CombatEvent {
        CombatEvent {
            round: 0,
            kind,
            school: self.entry.school,
            amount,
            spell_id: self.entry.id,
            caster: self.caster,
            target: self.target,
            flags,
        }
    }
}

/// Evaluate an effect's validity predicate.
///
/// Random predicates draw from the scene generator; every other predicate is
/// side-effect free. Missing combatants fail every predicate but `Always`.
pub fn check_condition(
    bf: &mut Battlefield,
    caster: CombatantId,
    target: CombatantId,
    condition: &EffectCondition,
) -> bool {
    if matches!(condition, EffectCondition::Always) {
        return true;
    }
    let (Some(caster_unit), Some(target_unit)) = (bf.unit(caster), bf.unit(target)) else {
        return false;
    };
    match condition {
        EffectCondition::Always => true,
        EffectCondition::SelfOnly => caster == target,
        EffectCondition::NotSelf => caster != target,
        EffectCondition::CasterHpBelow(threshold) => caster_unit.hp_fraction() < *threshold,
        EffectCondition::TargetHpBelow(threshold) => target_unit.hp_fraction() < *threshold,
        EffectCondition::TargetHpAbove(threshold) => target_unit.hp_fraction() > *threshold,
        EffectCondition::CasterState(state) => caster_unit.has_state(*state),
        EffectCondition::TargetState(state) => target_unit.has_state(*state),
        EffectCondition::CasterHasAura(aura_id) => caster_unit.combat().has_aura(*aura_id),
        EffectCondition::TargetHasAura(aura_id) => target_unit.combat().has_aura(*aura_id),
        EffectCondition::TargetLacksAura(aura_id) => !target_unit.combat().has_aura(*aura_id),
        EffectCondition::Random {
            chance,
            race,
            race_bonus,
            level_decay,
        } => {
            let mut chance = *chance;
            if race.is_some_and(|r| r == target_unit.race()) {
                chance += *race_bonus;
            }
            let levels_above = target_unit.level().saturating_sub(caster_unit.level());
            chance -= level_decay.saturating_mul(Fixed::from_num(levels_above));
            bf.rng().roll(chance)
        }
    }
}

fn effect_lands(bf: &mut Battlefield, ctx: &EffectContext<'_>, effect: &EffectEntry) -> bool {
    if let Some(chance) = effect.chance {
        return bf.rng().roll(chance);
    }
    if ctx.friendly {
        return true;
    }
    let resist = bf
        .unit(ctx.target)
        .map_or(Fixed::ZERO, |u| u.att().get(AttributeKind::EffectResist));
    let chance = Fixed::ONE + ctx.caster_snapshot.get(AttributeKind::EffectHit) - resist;
    bf.rng().roll(chance)
}

/// Resolve one effect against one target.
pub(super) fn resolve(bf: &mut Battlefield, ctx: &EffectContext<'_>, effect: &EffectEntry) {
    let Some(target_unit) = bf.unit(ctx.target) else {
        return;
    };
    if effect.mechanic.is_some_and(|m| target_unit.is_immune(m)) {
        bf.emit(ctx.event(EventKind::Miss, 0, ResultFlags::IMMUNE));
        return;
    }
    if !check_condition(bf, ctx.caster, ctx.target, &effect.condition) {
        return;
    }
    if !effect_lands(bf, ctx, effect) {
        tracing::trace!(effect_id = effect.id, target = ctx.target, "effect resisted");
        return;
    }

    let config = *bf.config();
    match effect.kind {
        EffectKind::Damage { percent, flat } => {
            let Some(def) = bf.unit(ctx.target).map(|u| u.att().snapshot()) else {
                return;
            };
            let mut inputs = DamageInputs::from_snapshots(
                ctx.caster_snapshot,
                &def,
                ctx.entry.school,
                percent,
                flat,
                &config,
            );
            inputs.random_factor = bf.rng().range(config.random_min, config.random_max);
            inputs.is_crit = ctx.roll.crit;
            if ctx.roll.blocked {
                inputs.block_factor = config.block_factor;
            }
            deal_damage(
                bf,
                &DamageRequest {
                    caster: ctx.caster,
                    target: ctx.target,
                    amount: inputs.final_damage(),
                    school: ctx.entry.school,
                    spell_id: ctx.entry.id,
                    flags: ctx.flags(),
                    triggers: true,
                },
            );
        }
        EffectKind::Heal { percent, flat } => {
            let amount = heal_amount(ctx.caster_snapshot, percent, flat, ctx.roll.crit, &config);
            deal_heal(
                bf,
                ctx.caster,
                ctx.target,
                round_to_i64(amount),
                ctx.entry.id,
                ctx.flags(),
            );
        }
        EffectKind::Interrupt => {
            if let Some(unit) = bf.unit_mut(ctx.target) {
                unit.action_mut().interrupt();
            }
            bf.emit(ctx.event(EventKind::Interrupt, 0, ResultFlags::empty()));
        }
        EffectKind::Gather { distance } => {
            let Some(anchor) = bf.unit(ctx.caster).map(|u| u.position()) else {
                return;
            };
            if let Some(unit) = bf.unit_mut(ctx.target) {
                let moved = unit.position().step_toward(anchor, distance);
                unit.set_position(moved);
            }
            bf.emit(ctx.event(EventKind::Gather, 0, ResultFlags::empty()));
        }
        EffectKind::AddAura { aura_id } => {
            if let Err(e) = aura::add_aura(bf, ctx.caster, ctx.target, aura_id, ctx.entry.id) {
                tracing::warn!(aura_id, spell_id = ctx.entry.id, error = %e, "aura not applied");
            }
        }
        EffectKind::Dispel { count, harmful } => {
            aura::dispel(bf, ctx.target, count, harmful);
        }
        EffectKind::ModEnergy { amount } => {
            if let Some(camp) = bf.unit(ctx.target).map(|u| u.camp()) {
                bf.camp_mut(camp).mod_att_energy(amount);
            }
            bf.emit(ctx.event(EventKind::Energy, i64::from(amount), ResultFlags::empty()));
        }
    }
}

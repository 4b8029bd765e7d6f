//! Aura effect handlers.

use std::sync::Arc;

use super::{aura_mut, aura_ref, remove_aura, AuraStep};
use crate::battlefield::{Battlefield, PendingCast};
use crate::combatant::CombatantId;
use crate::data::{AuraCastTarget, AuraEffectKind, AuraEffectSlot, AuraEntry, AuraTrigger, RemoveMode};
use crate::events::ResultFlags;
use crate::math::{round_to_i64, Fixed};
use crate::pool::Handle;
use crate::spell::damage::{deal_damage, deal_heal, DamageRequest};
use crate::state::{School, UnitState};

/// The event an aura slot is reacting to.
///
/// Damage triggers carry the pending amount; `BeforeDamage*` handlers may
/// change it before it is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerContext {
    /// The combatant on the other side of the event.
    pub source: Option<CombatantId>,
    /// Skill or aura entry behind the event.
    pub spell_id: u32,
    /// Damage school.
    pub school: School,
    /// Damage amount, not yet rounded.
    pub amount: Fixed,
    /// The owner is the one dealing the damage.
    pub outgoing: bool,
    /// Flags accumulated while resolving.
    pub flags: ResultFlags,
}

impl TriggerContext {
    /// Context without an amount.
    #[must_use]
    pub const fn new(source: Option<CombatantId>, spell_id: u32) -> Self {
        Self {
            source,
            spell_id,
            school: School::Physical,
            amount: Fixed::ZERO,
            outgoing: false,
            flags: ResultFlags::empty(),
        }
    }
}

/// Three-phase visitor for one aura slot.
pub(super) fn cal_aura_effect(
    bf: &mut Battlefield,
    owner: CombatantId,
    handle: Handle,
    step: AuraStep,
    index: usize,
    ctx: &mut TriggerContext,
) {
    let store = Arc::clone(bf.store());
    let Some(aura) = aura_ref(bf, owner, handle) else {
        return;
    };
    let caster = aura.caster();
    let Some(entry) = store.aura(aura.aura_id()) else {
        tracing::warn!(aura_id = aura.aura_id(), "missing aura entry");
        return;
    };
    let Some(slot) = entry.slots.get(index) else {
        return;
    };

    match step {
        AuraStep::Apply => {
            apply_static(bf, owner, handle, index, slot);
            if slot.trigger == AuraTrigger::Apply && consume(bf, owner, handle, index, slot) {
                run_effect(bf, owner, caster, handle, entry, index, ctx);
            }
        }
        AuraStep::Effect => {
            if consume(bf, owner, handle, index, slot) {
                run_effect(bf, owner, caster, handle, entry, index, ctx);
            }
        }
        AuraStep::Remove(mode) => {
            undo_static(bf, owner, handle, index, slot);
            if slot.trigger == AuraTrigger::Remove && mode.intersects(entry.removal_effect_mask) {
                run_effect(bf, owner, caster, handle, entry, index, ctx);
            }
        }
    }
}

fn consume(
    bf: &mut Battlefield,
    owner: CombatantId,
    handle: Handle,
    index: usize,
    slot: &AuraEffectSlot,
) -> bool {
    aura_mut(bf, owner, handle).is_some_and(|aura| aura.consume_trigger(index, slot.cooldown))
}

fn slot_points(bf: &Battlefield, owner: CombatantId, handle: Handle, index: usize) -> Fixed {
    aura_ref(bf, owner, handle)
        .and_then(|aura| aura.slot(index))
        .map_or(Fixed::ZERO, |slot| slot.points)
}

/// Modifications that hold for as long as the aura is applied.
fn apply_static(
    bf: &mut Battlefield,
    owner: CombatantId,
    handle: Handle,
    index: usize,
    slot: &AuraEffectSlot,
) {
    let points = slot_points(bf, owner, handle, index);
    let Some(unit) = bf.unit_mut(owner) else {
        return;
    };

    match slot.kind {
        AuraEffectKind::ModAttribute { attribute } => {
            unit.att_mut().mod_att_value(attribute, points);
            unit.recalc();
        }
        AuraEffectKind::ModAttributePercent { attribute } => {
            let kind = attribute.percent_companion().unwrap_or(attribute);
            unit.att_mut().mod_att_value(kind, points);
            unit.recalc();
        }
        AuraEffectKind::ChangeState { state } => {
            unit.add_state(state);
            if state.intersects(UnitState::STUN) {
                unit.action_mut().interrupt();
            }
        }
        AuraEffectKind::Immunity { mechanics } => unit.add_immunity(mechanics),
        AuraEffectKind::ReplaceMeleeSpell { spell_id } => {
            unit.combat_mut().set_melee_override(Some(spell_id));
        }
        AuraEffectKind::Shield => {
            if let Some(state) = unit.combat_mut().aura_mut(handle).and_then(|a| a.slot_mut(index)) {
                state.accumulated = points;
            }
            return;
        }
        AuraEffectKind::PeriodicDamage { .. }
        | AuraEffectKind::PeriodicHeal
        | AuraEffectKind::CastSpell { .. }
        | AuraEffectKind::DamageConvert
        | AuraEffectKind::DamageAbsorb
        | AuraEffectKind::DamageAccumulate { .. }
        | AuraEffectKind::DamageFix { .. } => return,
    }

    if let Some(state) = unit
        .combat_mut()
        .aura_mut(handle)
        .and_then(|a| a.slot_mut(index))
    {
        state.applied = points;
    }
}

/// Reverse [`apply_static`].
fn undo_static(
    bf: &mut Battlefield,
    owner: CombatantId,
    handle: Handle,
    index: usize,
    slot: &AuraEffectSlot,
) {
    let Some(unit) = bf.unit_mut(owner) else {
        return;
    };
    let Some(applied) = unit
        .combat_mut()
        .aura_mut(handle)
        .and_then(|a| a.slot_mut(index))
        .map(|state| std::mem::take(&mut state.applied))
    else {
        return;
    };

    match slot.kind {
        AuraEffectKind::ModAttribute { attribute } => {
            unit.att_mut().mod_att_value(attribute, -applied);
            unit.recalc();
        }
        AuraEffectKind::ModAttributePercent { attribute } => {
            let kind = attribute.percent_companion().unwrap_or(attribute);
            unit.att_mut().mod_att_value(kind, -applied);
            unit.recalc();
        }
        AuraEffectKind::ChangeState { state } => unit.remove_state(state),
        AuraEffectKind::Immunity { mechanics } => unit.remove_immunity(mechanics),
        AuraEffectKind::ReplaceMeleeSpell { spell_id } => {
            if unit.combat().melee_override() == Some(spell_id) {
                unit.combat_mut().set_melee_override(None);
            }
        }
        AuraEffectKind::PeriodicDamage { .. }
        | AuraEffectKind::PeriodicHeal
        | AuraEffectKind::CastSpell { .. }
        | AuraEffectKind::DamageConvert
        | AuraEffectKind::DamageAbsorb
        | AuraEffectKind::DamageAccumulate { .. }
        | AuraEffectKind::DamageFix { .. }
        | AuraEffectKind::Shield => {}
    }
}

fn run_effect(
    bf: &mut Battlefield,
    owner: CombatantId,
    caster: CombatantId,
    handle: Handle,
    entry: &AuraEntry,
    index: usize,
    ctx: &mut TriggerContext,
) {
    let Some(slot) = entry.slots.get(index) else {
        return;
    };
    let points = slot_points(bf, owner, handle, index);

    match slot.kind {
        AuraEffectKind::PeriodicDamage { school } => {
            deal_damage(
                bf,
                &DamageRequest {
                    caster,
                    target: owner,
                    amount: points,
                    school,
                    spell_id: entry.id,
                    flags: ResultFlags::PERIODIC,
                    triggers: false,
                },
            );
        }
        AuraEffectKind::PeriodicHeal => {
            deal_heal(bf, caster, owner, round_to_i64(points), entry.id, ResultFlags::PERIODIC);
        }
        AuraEffectKind::CastSpell { spell_id, target } => {
            let target = match target {
                AuraCastTarget::Owner => owner,
                AuraCastTarget::Caster => caster,
                AuraCastTarget::TriggerSource => ctx.source.unwrap_or(owner),
            };
            bf.push_pending(PendingCast {
                caster: owner,
                spell_id,
                target: Some(target),
                beat_back: false,
            });
        }
        AuraEffectKind::DamageConvert => {
            let healed = round_to_i64(ctx.amount.saturating_mul(points));
            if healed > 0 {
                deal_heal(bf, owner, owner, healed, entry.id, ResultFlags::PERIODIC);
            }
        }
        AuraEffectKind::DamageAbsorb => {
            let ratio = points.clamp(Fixed::ZERO, Fixed::ONE);
            let absorbed = ctx.amount * ratio;
            if absorbed > Fixed::ZERO {
                ctx.amount -= absorbed;
                ctx.flags |= ResultFlags::ABSORB;
            }
        }
        AuraEffectKind::DamageAccumulate { spell_id } => {
            let reached = aura_mut(bf, owner, handle)
                .and_then(|aura| aura.slot_mut(index))
                .is_some_and(|state| {
                    state.accumulated = state.accumulated.saturating_add(ctx.amount);
                    if points > Fixed::ZERO && state.accumulated >= points {
                        state.accumulated = Fixed::ZERO;
                        return true;
                    }
                    false
                });
            if reached {
                bf.push_pending(PendingCast {
                    caster: owner,
                    spell_id,
                    target: Some(ctx.source.unwrap_or(owner)),
                    beat_back: false,
                });
            }
        }
        AuraEffectKind::DamageFix { outgoing } => {
            if outgoing == ctx.outgoing {
                ctx.amount = ctx.amount.saturating_mul(Fixed::ONE + points).max(Fixed::ZERO);
            }
        }
        AuraEffectKind::Shield => {
            let depleted = aura_mut(bf, owner, handle)
                .and_then(|aura| aura.slot_mut(index))
                .is_some_and(|state| {
                    let absorbed = ctx.amount.min(state.accumulated).max(Fixed::ZERO);
                    state.accumulated -= absorbed;
                    ctx.amount -= absorbed;
                    if absorbed > Fixed::ZERO {
                        ctx.flags |= ResultFlags::ABSORB;
                    }
                    state.accumulated <= Fixed::ZERO
                });
            if depleted {
                remove_aura(bf, owner, handle, RemoveMode::CONSUME);
            }
        }
        AuraEffectKind::ModAttribute { .. }
        | AuraEffectKind::ModAttributePercent { .. }
        | AuraEffectKind::ChangeState { .. }
        | AuraEffectKind::Immunity { .. }
        | AuraEffectKind::ReplaceMeleeSpell { .. } => {}
    }

    tracing::trace!(aura_id = entry.id, owner, slot = index, "aura effect fired");
}

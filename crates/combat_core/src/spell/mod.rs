//! Skill/spell cast pipeline.
//!
//! A [`SpellCast`] lives for the duration of one call:
//!
//! 1. [`find_target`] resolves the target list in four filter stages.
//! 2. Cast start is logged.
//! 3. Hit, crit and block are rolled once per target, then every effect of
//!    every timeline is resolved against it.
//! 4. Cast end fires the caster's `CastSpell` aura triggers.
//! 5. Beat-back counter casts earned by blocks are queued.
//!
//! [`can_cast`] runs before any of this and has no side effects.

pub mod damage;
mod effect;
pub mod hit;
mod target;

use std::sync::Arc;

use crate::attribute::AttSnapshot;
use crate::aura::{self, TriggerContext};
use crate::battlefield::{Battlefield, PendingCast};
use crate::combatant::CombatantId;
use crate::data::{AuraTrigger, LaunchType, SkillEntry, TargetType};
use crate::error::CastError;
use crate::events::{CombatEvent, EventKind, ResultFlags};
use crate::state::UnitState;

pub use effect::check_condition;
pub use hit::HitResult;
pub use target::{facing, find_target};

/// Who pays for a cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CastSource {
    /// Issued by the combatant itself.
    #[default]
    Unit,
    /// Camp active skill paid with camp energy.
    Camp,
}

/// Parameters of one cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CastRequest {
    /// Casting combatant.
    pub caster: CombatantId,
    /// Skill entry id.
    pub spell_id: u32,
    /// Selected target.
    pub target: Option<CombatantId>,
    /// Issued by an aura or a block; skips state, cooldown and range gates.
    pub triggered: bool,
    /// Who pays.
    pub source: CastSource,
    /// Counter cast after a block.
    pub beat_back: bool,
}

impl CastRequest {
    /// Untriggered cast paid by the caster.
    #[must_use]
    pub const fn new(caster: CombatantId, spell_id: u32, target: Option<CombatantId>) -> Self {
        Self {
            caster,
            spell_id,
            target,
            triggered: false,
            source: CastSource::Unit,
            beat_back: false,
        }
    }

    /// Mark as triggered.
    #[must_use]
    pub const fn triggered(mut self) -> Self {
        self.triggered = true;
        self
    }

    /// Pay with camp energy.
    #[must_use]
    pub const fn from_camp(mut self) -> Self {
        self.source = CastSource::Camp;
        self
    }

    /// Request for a queued follow-up cast.
    #[must_use]
    pub const fn from_pending(pending: &PendingCast) -> Self {
        Self {
            caster: pending.caster,
            spell_id: pending.spell_id,
            target: pending.target,
            triggered: true,
            source: CastSource::Unit,
            beat_back: pending.beat_back,
        }
    }
}

/// What a finished cast did.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CastOutcome {
    /// Skill entry id.
    pub spell_id: u32,
    /// Resolved targets in id order.
    pub targets: Vec<CombatantId>,
    /// Targets the cast landed on.
    pub hits: usize,
}

/// Check every precondition of a cast without mutating anything.
///
/// # Errors
///
/// Returns the first failed precondition.
pub fn can_cast(
    bf: &Battlefield,
    entry: &SkillEntry,
    request: &CastRequest,
) -> Result<(), CastError> {
    let caster = bf
        .unit(request.caster)
        .filter(|u| u.is_alive())
        .ok_or(CastError::CasterUnavailable)?;

    if !request.triggered {
        let mut forbidden = entry.caster_state_forbid;
        if !entry.basic {
            forbidden |= UnitState::SILENCE;
        }
        if caster.has_state(forbidden) {
            return Err(CastError::CasterStateForbidden(entry.id));
        }
        if !caster.skill_ready(entry.id) {
            return Err(CastError::CoolingDown(entry.id));
        }
    }

    if let Some(aura_id) = entry.caster_aura_required {
        if !caster.combat().has_aura(aura_id) {
            return Err(CastError::AuraStateFailed(entry.id));
        }
    }

    let needs_target = matches!(entry.launch, LaunchType::Target)
        && matches!(entry.target, TargetType::EnemySingle | TargetType::FriendlySingle);

    match request.target.and_then(|id| bf.unit(id)) {
        Some(target) => {
            if !target.is_alive() && needs_target {
                return Err(CastError::NoTarget(entry.id));
            }
            if target.has_state(entry.target_state_forbid) {
                return Err(CastError::TargetStateForbidden(entry.id));
            }
            if let Some(aura_id) = entry.target_aura_forbidden {
                if target.combat().has_aura(aura_id) {
                    return Err(CastError::AuraStateFailed(entry.id));
                }
            }
            if !request.triggered && entry.cast_range > crate::math::Fixed::ZERO {
                let range_sq = entry.cast_range.saturating_mul(entry.cast_range);
                if caster.position().distance_squared(target.position()) > range_sq {
                    return Err(CastError::NoTarget(entry.id));
                }
            }
        }
        None if needs_target && request.target.is_some() => {
            return Err(CastError::NoTarget(entry.id));
        }
        None => {}
    }

    if request.source == CastSource::Camp && bf.camp(caster.camp()).energy() < entry.energy_cost {
        return Err(CastError::NotEnoughEnergy(entry.id));
    }

    Ok(())
}

/// One cast in flight.
#[derive(Debug)]
pub struct SpellCast<'a> {
    entry: &'a SkillEntry,
    request: CastRequest,
    caster_snapshot: AttSnapshot,
    targets: Vec<CombatantId>,
    beat_backs: Vec<PendingCast>,
    hits: usize,
}

impl<'a> SpellCast<'a> {
    /// Prepare a cast. Preconditions are the caller's job.
    #[must_use]
    pub fn new(entry: &'a SkillEntry, request: CastRequest) -> Self {
        Self {
            entry,
            request,
            caster_snapshot: AttSnapshot::default(),
            targets: Vec::new(),
            beat_backs: Vec::new(),
            hits: 0,
        }
    }

    /// Run the cast to completion.
    pub fn execute(mut self, bf: &mut Battlefield) -> CastOutcome {
        let caster = self.request.caster;
        self.caster_snapshot = bf
            .unit(caster)
            .map(|u| u.att().snapshot())
            .unwrap_or_default();
        self.targets = find_target(bf, caster, self.request.target, self.entry);

        tracing::debug!(
            caster,
            spell_id = self.entry.id,
            targets = self.targets.len(),
            round = bf.round(),
            "cast start"
        );

        self.calc_effect(bf);

        let mut ctx = TriggerContext::new(self.request.target, self.entry.id);
        aura::trigger(bf, caster, AuraTrigger::CastSpell, &mut ctx);

        for beat_back in self.beat_backs.drain(..) {
            bf.push_pending(beat_back);
        }

        CastOutcome {
            spell_id: self.entry.id,
            targets: self.targets,
            hits: self.hits,
        }
    }

    fn calc_effect(&mut self, bf: &mut Battlefield) {
        let store = Arc::clone(bf.store());
        let config = *bf.config();
        let caster = self.request.caster;
        let Some(caster_camp) = bf.unit(caster).map(|u| u.camp()) else {
            return;
        };

        for target in self.targets.clone() {
            let Some(unit) = bf.unit(target).filter(|u| u.is_alive()) else {
                continue;
            };
            let friendly = unit.camp() == caster_camp;
            let target_snapshot = unit.att().snapshot();
            let beat_back_skill = unit.beat_back_skill();

            let roll = if friendly {
                hit::roll_friendly(bf.rng(), &self.caster_snapshot, &config)
            } else {
                hit::roll_hostile(bf.rng(), &self.caster_snapshot, &target_snapshot, &config)
            };

            if !roll.hit {
                bf.emit(CombatEvent {
                    round: 0,
                    kind: EventKind::Miss,
                    school: self.entry.school,
                    amount: 0,
                    spell_id: self.entry.id,
                    caster,
                    target,
                    flags: ResultFlags::MISS | ResultFlags::DODGE,
                });
                continue;
            }
            self.hits += 1;

            if roll.blocked && !self.request.beat_back {
                if let Some(spell_id) = beat_back_skill {
                    self.beat_backs.push(PendingCast {
                        caster: target,
                        spell_id,
                        target: Some(caster),
                        beat_back: true,
                    });
                }
            }

            let ctx = effect::EffectContext {
                caster,
                target,
                entry: self.entry,
                roll,
                friendly,
                caster_snapshot: &self.caster_snapshot,
            };

            'timelines: for timeline_id in &self.entry.timelines {
                let Some(timeline) = store.timeline(*timeline_id) else {
                    tracing::warn!(spell_id = self.entry.id, timeline_id, "missing timeline entry");
                    continue;
                };
                for effect_id in &timeline.effects {
                    if !bf.is_alive(target) {
                        break 'timelines;
                    }
                    let Some(effect) = store.effect(*effect_id) else {
                        tracing::warn!(spell_id = self.entry.id, effect_id, "missing effect entry");
                        continue;
                    };
                    effect::resolve(bf, &ctx, effect);
                }
            }
        }
    }
}

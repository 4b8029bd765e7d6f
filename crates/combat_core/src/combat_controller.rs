//! Per-combatant cast and aura bookkeeping.
//!
//! The controller is the single source of truth for "does this combatant
//! have aura X from caster Y" and for how many casts it issued this tick.
//! Casting itself needs the whole battlefield, so [`cast_spell`] is a free
//! function that checks the caster's controller and then runs the cast.

use std::sync::Arc;

use crate::aura::Aura;
use crate::battlefield::Battlefield;
use crate::combatant::CombatantId;
use crate::error::{CastError, CombatError, Result};
use crate::pool::{Handle, Pool};
use crate::spell::{self, CastOutcome, CastRequest, CastSource, SpellCast};

/// Summary of a cast issued this tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CastRecord {
    /// Skill entry id.
    pub spell_id: u32,
    /// Selected target.
    pub target: Option<CombatantId>,
    /// Number of resolved targets.
    pub targets: usize,
    /// Issued by an aura or a block rather than by the AI.
    pub triggered: bool,
}

/// Casts and auras of one combatant.
#[derive(Debug, Clone, Default)]
pub struct CombatController {
    auras: Pool<Aura>,
    casts: Vec<CastRecord>,
    melee_override: Option<u32>,
}

impl CombatController {
    /// Create an empty controller.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            auras: Pool::new(),
            casts: Vec::new(),
            melee_override: None,
        }
    }

    /// Reject a cast when `capacity` casts were already issued this tick.
    ///
    /// # Errors
    ///
    /// Returns [`CastError::CapacityExceeded`] at capacity.
    pub fn check_capacity(&self, capacity: u32) -> std::result::Result<(), CastError> {
        if self.casts.len() >= capacity as usize {
            return Err(CastError::CapacityExceeded);
        }
        Ok(())
    }

    /// Casts issued this tick.
    #[must_use]
    pub fn casts(&self) -> &[CastRecord] {
        &self.casts
    }

    fn record_cast(&mut self, record: CastRecord) {
        self.casts.push(record);
    }

    /// Drain the casts completed since the last update.
    pub fn update(&mut self) -> Vec<CastRecord> {
        std::mem::take(&mut self.casts)
    }

    /// Register an aura. The caller runs its apply phase.
    pub fn register_aura(&mut self, aura: Aura) -> Handle {
        self.auras.insert(aura)
    }

    /// Unregister an aura. Stale handles return `None`.
    pub fn unregister_aura(&mut self, handle: Handle) -> Option<Aura> {
        self.auras.remove(handle)
    }

    /// Borrow an aura.
    #[must_use]
    pub fn aura(&self, handle: Handle) -> Option<&Aura> {
        self.auras.get(handle)
    }

    /// Mutably borrow an aura.
    pub fn aura_mut(&mut self, handle: Handle) -> Option<&mut Aura> {
        self.auras.get_mut(handle)
    }

    /// Every registered aura.
    pub fn auras(&self) -> impl Iterator<Item = (Handle, &Aura)> {
        self.auras.iter()
    }

    /// Handles of every registered aura.
    #[must_use]
    pub fn aura_handles(&self) -> Vec<Handle> {
        self.auras.handles()
    }

    /// Number of registered auras.
    #[must_use]
    pub const fn aura_count(&self) -> usize {
        self.auras.len()
    }

    /// Active aura `aura_id` applied by `caster`.
    #[must_use]
    pub fn find_aura(&self, aura_id: u32, caster: CombatantId) -> Option<Handle> {
        self.auras
            .iter()
            .find(|(_, aura)| aura.is_running() && aura.aura_id() == aura_id && aura.caster() == caster)
            .map(|(handle, _)| handle)
    }

    /// Whether any active aura `aura_id` is present.
    #[must_use]
    pub fn has_aura(&self, aura_id: u32) -> bool {
        self.auras
            .iter()
            .any(|(_, aura)| aura.is_running() && aura.aura_id() == aura_id)
    }

    /// Basic attack replacement.
    #[must_use]
    pub const fn melee_override(&self) -> Option<u32> {
        self.melee_override
    }

    /// Set or clear the basic attack replacement.
    pub fn set_melee_override(&mut self, spell_id: Option<u32>) {
        self.melee_override = spell_id;
    }
}

/// Issue a cast for `request.caster`.
///
/// Queued follow-up casts (aura-triggered, beat-back) are resolved before
/// this returns, whether or not this cast was accepted.
///
/// # Errors
///
/// Returns [`CombatError::CastRejected`] if the caster is at capacity or a
/// precondition fails, and [`CombatError::MissingData`] for an unknown
/// skill. A rejected cast mutates nothing itself.
pub fn cast_spell(bf: &mut Battlefield, request: CastRequest) -> Result<CastOutcome> {
    let outcome = cast_once(bf, request);
    resolve_pending(bf);
    outcome
}

fn cast_once(bf: &mut Battlefield, request: CastRequest) -> Result<CastOutcome> {
    let capacity = bf.config().max_spells_per_tick;
    let caster = bf
        .unit(request.caster)
        .ok_or(CastError::CasterUnavailable)?;
    caster.combat().check_capacity(capacity)?;

    let store = Arc::clone(bf.store());
    let entry = store.skill(request.spell_id).ok_or(CombatError::MissingData {
        table: "skill",
        id: request.spell_id,
    })?;
    spell::can_cast(bf, entry, &request)?;

    if !request.triggered {
        if let Some(unit) = bf.unit_mut(request.caster) {
            unit.start_cooldown(entry.id, entry.cooldown);
        }
    }
    if request.source == CastSource::Camp {
        if let Some(camp) = bf.unit(request.caster).map(|u| u.camp()) {
            bf.camp_mut(camp).mod_att_energy(-entry.energy_cost);
        }
    }

    let outcome = SpellCast::new(entry, request).execute(bf);

    if let Some(unit) = bf.unit_mut(request.caster) {
        unit.combat_mut().record_cast(CastRecord {
            spell_id: entry.id,
            target: request.target,
            targets: outcome.targets.len(),
            triggered: request.triggered,
        });
    }
    Ok(outcome)
}

/// Run every queued follow-up cast, bounded by `max_pending_casts`.
///
/// Does nothing when called while the queue is already being resolved.
pub fn resolve_pending(bf: &mut Battlefield) {
    if bf.is_resolving() {
        return;
    }
    bf.set_resolving(true);

    let mut budget = bf.config().max_pending_casts;
    while let Some(pending) = bf.pop_pending() {
        if budget == 0 {
            let dropped = bf.clear_pending() + 1;
            tracing::debug!(dropped, "pending cast budget exhausted");
            break;
        }
        budget -= 1;

        let request = CastRequest::from_pending(&pending);
        if let Err(e) = cast_once(bf, request) {
            tracing::debug!(
                caster = pending.caster,
                spell_id = pending.spell_id,
                error = %e,
                "pending cast skipped"
            );
        }
    }

    bf.set_resolving(false);
}

//! Aura/buff engine.
//!
//! An aura is owned by one combatant and lives in that combatant's
//! [`CombatController`](crate::combat_controller::CombatController). Its
//! lifecycle is:
//!
//! ```text
//! Init ──► Applied (locked) ──► Running ──► Removed(mode)
//! ```
//!
//! While an aura is `Applied` its apply phase is still running, so a removal
//! requested in that window is recorded and carried out once the phase
//! completes.
//!
//! Stacking against auras already on the owner is decided by
//! [`check_wrap_result`] before anything is created.

mod effect;
mod wrap;

use std::sync::Arc;

use crate::attribute::AttSnapshot;
use crate::battlefield::Battlefield;
use crate::combat_controller;
use crate::combatant::CombatantId;
use crate::data::{AuraEntry, AuraTrigger, RemoveMode};
use crate::error::{CombatError, Result};
use crate::events::{CombatEvent, EventKind, ResultFlags};
use crate::math::Fixed;
use crate::pool::Handle;
use crate::state::School;

pub use effect::TriggerContext;
pub use wrap::{check_wrap_result, WrapCandidate, WrapResult};

/// Phase of [`effect::cal_aura_effect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuraStep {
    /// The aura was just applied.
    Apply,
    /// A triggering event fired.
    Effect,
    /// The aura is being removed.
    Remove(RemoveMode),
}

/// Lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuraState {
    /// Created, magnitudes not yet applied.
    Init,
    /// Apply phase in progress; removals are deferred.
    Applied,
    /// Active.
    Running,
    /// Removed for the given reasons.
    Removed(RemoveMode),
}

/// Runtime state of one effect slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SlotState {
    /// Magnitude computed at init.
    pub points: Fixed,
    /// Amount applied to an attribute, undone on removal.
    pub applied: Fixed,
    /// Remaining effect-phase firings this quota period; `None` is unlimited.
    pub triggers_left: Option<u32>,
    /// Rounds until the slot may fire again.
    pub cooldown: u32,
    /// Shield pool or accumulated damage.
    pub accumulated: Fixed,
}

/// An applied aura.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aura {
    aura_id: u32,
    spell_id: u32,
    owner: CombatantId,
    caster: CombatantId,
    state: AuraState,
    wraps: u32,
    remaining: u32,
    rounds: u32,
    pending_removal: Option<RemoveMode>,
    slots: Vec<SlotState>,
}

impl Aura {
    /// Create an aura in the `Init` state.
    #[must_use]
    pub fn new(entry: &AuraEntry, owner: CombatantId, caster: CombatantId, spell_id: u32) -> Self {
        Self {
            aura_id: entry.id,
            spell_id,
            owner,
            caster,
            state: AuraState::Init,
            wraps: 1,
            remaining: entry.duration,
            rounds: 0,
            pending_removal: None,
            slots: vec![SlotState::default(); entry.slots.len()],
        }
    }

    /// Compute slot magnitudes from an attribute snapshot and reset timers.
    ///
    /// `points = (base_points + snapshot[scale_attribute] * scale_percent) * wraps`
    pub fn init(&mut self, entry: &AuraEntry, snapshot: &AttSnapshot) {
        let wraps = Fixed::from_num(self.wraps);
        self.remaining = entry.duration;
        self.rounds = 0;
        self.slots = entry
            .slots
            .iter()
            .zip(self.slots.iter())
            .map(|(slot, previous)| {
                let scaled = slot
                    .scale_attribute
                    .map_or(Fixed::ZERO, |kind| snapshot.get(kind) * slot.scale_percent);
                SlotState {
                    points: (slot.base_points + scaled).saturating_mul(wraps),
                    applied: previous.applied,
                    triggers_left: (slot.trigger_count > 0).then_some(slot.trigger_count),
                    cooldown: 0,
                    accumulated: Fixed::ZERO,
                }
            })
            .collect();
    }

    /// Aura entry id.
    #[must_use]
    pub const fn aura_id(&self) -> u32 {
        self.aura_id
    }

    /// Skill that applied the aura.
    #[must_use]
    pub const fn spell_id(&self) -> u32 {
        self.spell_id
    }

    /// Owning combatant.
    #[must_use]
    pub const fn owner(&self) -> CombatantId {
        self.owner
    }

    /// Combatant that applied the aura.
    #[must_use]
    pub const fn caster(&self) -> CombatantId {
        self.caster
    }

    /// Lifecycle state.
    #[must_use]
    pub const fn state(&self) -> AuraState {
        self.state
    }

    /// Stack count.
    #[must_use]
    pub const fn wraps(&self) -> u32 {
        self.wraps
    }

    /// Rounds left; meaningless for permanent auras.
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Slot state.
    #[must_use]
    pub fn slot(&self, index: usize) -> Option<&SlotState> {
        self.slots.get(index)
    }

    pub(crate) fn slot_mut(&mut self, index: usize) -> Option<&mut SlotState> {
        self.slots.get_mut(index)
    }

    /// Whether the apply phase is running.
    #[must_use]
    pub const fn is_locked(&self) -> bool {
        matches!(self.state, AuraState::Applied)
    }

    /// Whether the aura is active.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        matches!(self.state, AuraState::Running)
    }

    /// Take one firing from a slot's quota, honouring its cooldown.
    pub(crate) fn consume_trigger(&mut self, index: usize, cooldown: u32) -> bool {
        let Some(slot) = self.slots.get_mut(index) else {
            return false;
        };
        if slot.cooldown > 0 || slot.triggers_left == Some(0) {
            return false;
        }
        if let Some(left) = slot.triggers_left.as_mut() {
            *left -= 1;
        }
        slot.cooldown = cooldown;
        true
    }

    /// Advance one round. Returns `true` when a timed aura expires.
    pub(crate) fn tick(&mut self, entry: &AuraEntry, quota_period: u32) -> bool {
        for slot in &mut self.slots {
            slot.cooldown = slot.cooldown.saturating_sub(1);
        }

        self.rounds += 1;
        if quota_period > 0 && self.rounds % quota_period == 0 {
            for (state, slot) in self.slots.iter_mut().zip(&entry.slots) {
                state.triggers_left = (slot.trigger_count > 0).then_some(slot.trigger_count);
            }
        }

        if entry.duration == 0 {
            return false;
        }
        self.remaining = self.remaining.saturating_sub(1);
        self.remaining == 0
    }
}

fn aura_ref(bf: &Battlefield, owner: CombatantId, handle: Handle) -> Option<&Aura> {
    bf.unit(owner)?.combat().aura(handle)
}

fn aura_mut(bf: &mut Battlefield, owner: CombatantId, handle: Handle) -> Option<&mut Aura> {
    bf.unit_mut(owner)?.combat_mut().aura_mut(handle)
}

fn snapshot_for(
    bf: &Battlefield,
    entry: &AuraEntry,
    caster: CombatantId,
    owner: CombatantId,
) -> AttSnapshot {
    let owner_snapshot = bf.unit(owner).map(|u| u.att().snapshot()).unwrap_or_default();
    if entry.dec_by_target {
        return owner_snapshot;
    }
    bf.unit(caster)
        .map_or(owner_snapshot, |u| u.att().snapshot())
}

fn emit_aura_event(
    bf: &mut Battlefield,
    kind: EventKind,
    aura_id: u32,
    caster: CombatantId,
    owner: CombatantId,
    flags: ResultFlags,
) {
    bf.emit(CombatEvent {
        round: 0,
        kind,
        school: School::Physical,
        amount: i64::from(aura_id),
        spell_id: aura_id,
        caster,
        target: owner,
        flags,
    });
}

/// Apply `aura_id` from `caster` to `owner`, resolving stacking first.
///
/// Returns the handle of the new or wrapped aura, or `None` when the aura
/// was rejected (dead owner, immunity, weaker than an existing aura).
///
/// # Errors
///
/// Returns [`CombatError::MissingData`] for an unknown aura and
/// [`CombatError::CombatantNotFound`] for an unknown owner.
pub fn add_aura(
    bf: &mut Battlefield,
    caster: CombatantId,
    owner: CombatantId,
    aura_id: u32,
    spell_id: u32,
) -> Result<Option<Handle>> {
    let store = Arc::clone(bf.store());
    let entry = store.aura(aura_id).ok_or(CombatError::MissingData {
        table: "aura",
        id: aura_id,
    })?;
    let target = bf
        .unit(owner)
        .ok_or(CombatError::CombatantNotFound(owner))?;
    if !target.is_alive() {
        return Ok(None);
    }
    if entry.mechanic.is_some_and(|m| target.is_immune(m)) {
        emit_aura_event(
            bf,
            EventKind::AuraApplied,
            aura_id,
            caster,
            owner,
            ResultFlags::IMMUNE,
        );
        return Ok(None);
    }

    let new = WrapCandidate::from_entry(entry, caster);
    let existing: Vec<(Handle, WrapCandidate)> = target
        .combat()
        .auras()
        .filter(|(_, aura)| aura.is_running())
        .filter_map(|(handle, aura)| {
            store
                .aura(aura.aura_id())
                .map(|e| (handle, WrapCandidate::from_entry(e, aura.caster())))
        })
        .collect();

    for (handle, old) in existing {
        match check_wrap_result(&old, &new) {
            WrapResult::Add => {}
            WrapResult::Wrap => {
                rewrap(bf, entry, caster, owner, handle);
                return Ok(aura_ref(bf, owner, handle).map(|_| handle));
            }
            WrapResult::Invalid => {
                tracing::debug!(aura_id, existing = old.aura_id, owner, "aura rejected by stacking");
                return Ok(None);
            }
            WrapResult::Replace => {
                remove_aura(bf, owner, handle, RemoveMode::HANGUP);
                break;
            }
        }
    }

    let snapshot = snapshot_for(bf, entry, caster, owner);
    let mut aura = Aura::new(entry, owner, caster, spell_id);
    aura.init(entry, &snapshot);
    aura.state = AuraState::Applied;
    let Some(unit) = bf.unit_mut(owner) else {
        return Err(CombatError::CombatantNotFound(owner));
    };
    let handle = unit.combat_mut().register_aura(aura);

    run_apply_phase(bf, entry, caster, owner, handle);
    emit_aura_event(
        bf,
        EventKind::AuraApplied,
        aura_id,
        caster,
        owner,
        ResultFlags::empty(),
    );
    let removed = unlock(bf, owner, handle);
    Ok((!removed).then_some(handle))
}

fn run_apply_phase(
    bf: &mut Battlefield,
    entry: &AuraEntry,
    caster: CombatantId,
    owner: CombatantId,
    handle: Handle,
) {
    let mut ctx = TriggerContext::new(Some(caster), entry.id);
    for index in 0..entry.slots.len() {
        effect::cal_aura_effect(bf, owner, handle, AuraStep::Apply, index, &mut ctx);
    }
}

/// Finish the apply phase. Returns `true` if a deferred removal ran.
fn unlock(bf: &mut Battlefield, owner: CombatantId, handle: Handle) -> bool {
    let pending = aura_mut(bf, owner, handle).and_then(|aura| {
        aura.state = AuraState::Running;
        aura.pending_removal.take()
    });
    match pending {
        Some(mode) => remove_aura(bf, owner, handle, mode),
        None => false,
    }
}

fn rewrap(
    bf: &mut Battlefield,
    entry: &AuraEntry,
    caster: CombatantId,
    owner: CombatantId,
    handle: Handle,
) {
    // Undo the current magnitudes without firing removal effects.
    let mut ctx = TriggerContext::new(Some(caster), entry.id);
    for index in 0..entry.slots.len() {
        effect::cal_aura_effect(
            bf,
            owner,
            handle,
            AuraStep::Remove(RemoveMode::empty()),
            index,
            &mut ctx,
        );
    }

    let snapshot = snapshot_for(bf, entry, caster, owner);
    if let Some(aura) = aura_mut(bf, owner, handle) {
        aura.caster = caster;
        aura.wraps = (aura.wraps + 1).min(entry.max_wraps.max(1));
        aura.init(entry, &snapshot);
        aura.state = AuraState::Applied;
    }

    run_apply_phase(bf, entry, caster, owner, handle);
    emit_aura_event(
        bf,
        EventKind::AuraApplied,
        entry.id,
        caster,
        owner,
        ResultFlags::empty(),
    );
    unlock(bf, owner, handle);
}

/// Remove an aura with `mode`.
///
/// Returns `true` if the aura was removed now. Removal of a locked aura is
/// deferred until its apply phase ends; removal of a stale handle is a no-op.
pub fn remove_aura(
    bf: &mut Battlefield,
    owner: CombatantId,
    handle: Handle,
    mode: RemoveMode,
) -> bool {
    let Some(aura) = aura_mut(bf, owner, handle) else {
        return false;
    };
    match aura.state {
        AuraState::Applied => {
            aura.pending_removal = Some(aura.pending_removal.map_or(mode, |m| m | mode));
            return false;
        }
        AuraState::Removed(_) => return false,
        AuraState::Init | AuraState::Running => {}
    }
    aura.state = AuraState::Removed(mode);
    let aura_id = aura.aura_id;
    let caster = aura.caster;
    let slots = aura.slots.len();

    let mut ctx = TriggerContext::new(Some(caster), aura_id);
    for index in 0..slots {
        effect::cal_aura_effect(bf, owner, handle, AuraStep::Remove(mode), index, &mut ctx);
    }

    if let Some(unit) = bf.unit_mut(owner) {
        unit.combat_mut().unregister_aura(handle);
    }
    emit_aura_event(
        bf,
        EventKind::AuraRemoved,
        aura_id,
        caster,
        owner,
        ResultFlags::empty(),
    );
    tracing::debug!(aura_id, owner, ?mode, "aura removed");
    true
}

/// Remove every aura on `owner`.
pub fn remove_all(bf: &mut Battlefield, owner: CombatantId, mode: RemoveMode) {
    let handles = bf
        .unit(owner)
        .map(|u| u.combat().aura_handles())
        .unwrap_or_default();
    for handle in handles {
        remove_aura(bf, owner, handle, mode);
    }
}

/// Remove up to `count` auras of one polarity. Returns how many were removed.
pub fn dispel(bf: &mut Battlefield, owner: CombatantId, count: u32, harmful: bool) -> u32 {
    let store = Arc::clone(bf.store());
    let handles: Vec<Handle> = bf
        .unit(owner)
        .map(|u| {
            u.combat()
                .auras()
                .filter(|(_, aura)| aura.is_running())
                .filter(|(_, aura)| store.aura(aura.aura_id()).is_some_and(|e| e.harmful == harmful))
                .map(|(handle, _)| handle)
                .take(count as usize)
                .collect()
        })
        .unwrap_or_default();

    let mut removed = 0;
    for handle in handles {
        if remove_aura(bf, owner, handle, RemoveMode::DISPEL) {
            removed += 1;
        }
    }
    removed
}

/// Fire every running slot on `owner` listening for `trigger`.
pub fn trigger(
    bf: &mut Battlefield,
    owner: CombatantId,
    trigger: AuraTrigger,
    ctx: &mut TriggerContext,
) {
    let store = Arc::clone(bf.store());
    let handles = bf
        .unit(owner)
        .map(|u| u.combat().aura_handles())
        .unwrap_or_default();

    for handle in handles {
        let Some(aura) = aura_ref(bf, owner, handle) else {
            continue;
        };
        if !aura.is_running() {
            continue;
        }
        let Some(entry) = store.aura(aura.aura_id()) else {
            continue;
        };
        for (index, slot) in entry.slots.iter().enumerate() {
            if slot.trigger == trigger {
                effect::cal_aura_effect(bf, owner, handle, AuraStep::Effect, index, ctx);
            }
        }
    }
}

/// End-of-round processing for every aura on `owner`.
///
/// Fires round-triggered slots, advances cooldowns, resets trigger quotas
/// every `aura_quota_reset` rounds and expires timed auras. Casts queued by
/// the triggered slots run before this returns.
pub fn round_end(bf: &mut Battlefield, owner: CombatantId) {
    let quota_period = bf.config().aura_quota_reset;
    let store = Arc::clone(bf.store());
    let handles = bf
        .unit(owner)
        .map(|u| u.combat().aura_handles())
        .unwrap_or_default();

    for handle in handles {
        let Some(aura) = aura_ref(bf, owner, handle) else {
            continue;
        };
        if !aura.is_running() {
            continue;
        }
        let Some(entry) = store.aura(aura.aura_id()) else {
            continue;
        };
        let mut ctx = TriggerContext::new(Some(aura.caster()), entry.id);

        for (index, slot) in entry.slots.iter().enumerate() {
            if slot.trigger == AuraTrigger::Round {
                effect::cal_aura_effect(bf, owner, handle, AuraStep::Effect, index, &mut ctx);
            }
        }

        let expired = aura_mut(bf, owner, handle)
            .filter(|aura| aura.is_running())
            .is_some_and(|aura| aura.tick(entry, quota_period));
        if expired {
            remove_aura(bf, owner, handle, RemoveMode::DEFAULT);
        }
    }

    combat_controller::resolve_pending(bf);
}

#[cfg(test)]
mod tests;

//! Shared mutable state of one scene.
//!
//! Casts, auras and the AI all operate on `&mut Battlefield` plus combatant
//! ids rather than on references into it, so any of them can touch any
//! combatant while resolving.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::camp::{Camp, CampId};
use crate::combatant::{Combatant, CombatantId, UnitInfo};
use crate::data::{DataStore, GlobalConfig};
use crate::error::Result;
use crate::events::CombatEvent;
use crate::math::{Fixed, Vec2Fixed};
use crate::rng::CombatRng;

/// Cast queued while another cast or aura effect was resolving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingCast {
    /// Casting combatant.
    pub caster: CombatantId,
    /// Skill entry id.
    pub spell_id: u32,
    /// Selected target.
    pub target: Option<CombatantId>,
    /// Counter-cast after a block; cannot itself queue a counter-cast.
    pub beat_back: bool,
}

/// Result of removing health from a combatant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DamageResult {
    /// Health actually removed.
    pub dealt: i64,
    /// The hit killed the target.
    pub killed: bool,
}

/// Camps, randomness and buffered events of one scene.
#[derive(Debug, Clone)]
pub struct Battlefield {
    store: Arc<DataStore>,
    camps: [Camp; 2],
    rng: CombatRng,
    events: Vec<CombatEvent>,
    round: u32,
    next_id: CombatantId,
    pending: VecDeque<PendingCast>,
    resolving: bool,
}

impl Battlefield {
    /// Create an empty battlefield.
    #[must_use]
    pub fn new(store: Arc<DataStore>, seed: u64) -> Self {
        let energy_max = store.config().energy_max;
        Self {
            store,
            camps: [
                Camp::new(CampId::Attack, energy_max),
                Camp::new(CampId::Defence, energy_max),
            ],
            rng: CombatRng::new(seed),
            events: Vec::new(),
            round: 0,
            next_id: 1,
            pending: VecDeque::new(),
            resolving: false,
        }
    }

    /// Drop every combatant and reseed.
    pub fn reset(&mut self, seed: u64) {
        let energy_max = self.store.config().energy_max;
        for camp in &mut self.camps {
            camp.clear(energy_max);
        }
        self.rng = CombatRng::new(seed);
        self.events.clear();
        self.round = 0;
        self.next_id = 1;
        self.pending.clear();
        self.resolving = false;
    }

    /// Static data.
    #[must_use]
    pub const fn store(&self) -> &Arc<DataStore> {
        &self.store
    }

    /// Global tuning.
    #[must_use]
    pub fn config(&self) -> &GlobalConfig {
        self.store.config()
    }

    /// Current round, starting at 1 on the first tick.
    #[must_use]
    pub const fn round(&self) -> u32 {
        self.round
    }

    pub(crate) fn advance_round(&mut self) {
        self.round += 1;
    }

    /// Scene random number generator.
    pub fn rng(&mut self) -> &mut CombatRng {
        &mut self.rng
    }

    /// Borrow a camp.
    #[must_use]
    pub const fn camp(&self, id: CampId) -> &Camp {
        &self.camps[id.index()]
    }

    /// Mutably borrow a camp.
    pub fn camp_mut(&mut self, id: CampId) -> &mut Camp {
        &mut self.camps[id.index()]
    }

    /// Add a combatant under a freshly allocated id.
    ///
    /// Units without a position are placed in their camp's formation.
    ///
    /// # Errors
    ///
    /// Propagates construction errors. No id is consumed on error.
    pub fn add_unit(&mut self, camp: CampId, info: &UnitInfo) -> Result<CombatantId> {
        let id = self.next_id;
        let position = info
            .position
            .unwrap_or_else(|| self.formation_slot(camp, self.camp(camp).len()));
        let store = Arc::clone(&self.store);
        self.camps[camp.index()].add_unit(id, info, position, &store)?;
        self.next_id += 1;
        Ok(id)
    }

    fn formation_slot(&self, camp: CampId, index: usize) -> Vec2Fixed {
        let config = self.config();
        let x = match camp {
            CampId::Attack => -config.formation_offset,
            CampId::Defence => config.formation_offset,
        };
        let y = config.formation_spacing * Fixed::from_num(index as i64);
        Vec2Fixed::new(x, y)
    }

    /// Borrow a combatant from either camp.
    #[must_use]
    pub fn unit(&self, id: CombatantId) -> Option<&Combatant> {
        self.camps.iter().find_map(|camp| camp.unit(id))
    }

    /// Mutably borrow a combatant from either camp.
    pub fn unit_mut(&mut self, id: CombatantId) -> Option<&mut Combatant> {
        let [attack, defence] = &mut self.camps;
        match attack.unit_mut(id) {
            Some(unit) => Some(unit),
            None => defence.unit_mut(id),
        }
    }

    /// Whether `id` exists and is alive.
    #[must_use]
    pub fn is_alive(&self, id: CombatantId) -> bool {
        self.unit(id).is_some_and(Combatant::is_alive)
    }

    /// Every combatant, attack camp first, each camp in id order.
    pub fn units(&self) -> impl Iterator<Item = &Combatant> {
        self.camps.iter().flat_map(Camp::units)
    }

    /// Remove health, recording the death with the owning camp once.
    pub fn apply_damage(&mut self, target: CombatantId, amount: i64) -> DamageResult {
        let Some(unit) = self.unit_mut(target) else {
            return DamageResult::default();
        };
        if !unit.is_alive() {
            return DamageResult::default();
        }
        let before = unit.hp();
        let killed = unit.take_damage(amount);
        let dealt = before - unit.hp();
        let camp = unit.camp();
        if killed {
            self.camp_mut(camp).on_unit_dead(target);
        }
        DamageResult { dealt, killed }
    }

    /// Restore health. Returns the amount restored.
    pub fn apply_heal(&mut self, target: CombatantId, amount: i64) -> i64 {
        self.unit_mut(target).map_or(0, |unit| unit.heal(amount))
    }

    /// Buffer an event, stamped with the current round.
    pub fn emit(&mut self, mut event: CombatEvent) {
        event.round = self.round;
        tracing::trace!(?event, "combat event");
        self.events.push(event);
    }

    /// Buffered events.
    #[must_use]
    pub fn events(&self) -> &[CombatEvent] {
        &self.events
    }

    /// Take the buffered events.
    pub fn drain_events(&mut self) -> Vec<CombatEvent> {
        std::mem::take(&mut self.events)
    }

    /// Queue a cast to run once the current resolution finishes.
    pub fn push_pending(&mut self, cast: PendingCast) {
        self.pending.push_back(cast);
    }

    /// Casts waiting to run.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn pop_pending(&mut self) -> Option<PendingCast> {
        self.pending.pop_front()
    }

    pub(crate) fn clear_pending(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }

    pub(crate) const fn is_resolving(&self) -> bool {
        self.resolving
    }

    pub(crate) fn set_resolving(&mut self, resolving: bool) {
        self.resolving = resolving;
    }

    /// Feed the observable state into a hasher.
    pub fn hash_into<H: std::hash::Hasher>(&self, hasher: &mut H) {
        use std::hash::Hash;
        self.round.hash(hasher);
        self.rng.draws().hash(hasher);
        for camp in &self.camps {
            camp.energy().hash(hasher);
            camp.alive_count().hash(hasher);
            for unit in camp.units() {
                unit.hash_into(hasher);
            }
        }
    }
}

//! One combat scene and its tick.
//!
//! A scene owns a [`Battlefield`] and walks it through
//!
//! ```text
//! Created ──start──► Running ──update*──► Completed
//!    │                  │
//!    └──────abort───────┴──────────────► Aborted
//! ```
//!
//! `Completed` and `Aborted` are terminal. [`Scene::update`] advances one
//! round synchronously; pacing, cancellation and result delivery belong to
//! whoever drives the scene.
//!
//! # Determinism
//!
//! Given the same data, setup and seed, two scenes produce identical
//! [`Scene::state_hash`] values after every tick:
//! - combatants update in camp order, then id order
//! - every roll draws from the scene's own seeded generator
//! - all arithmetic is fixed-point

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::action;
use crate::aura;
use crate::battlefield::Battlefield;
use crate::camp::CampId;
use crate::combat_controller::{self, cast_spell};
use crate::combatant::{CombatantId, UnitInfo};
use crate::data::DataStore;
use crate::error::{CombatError, Result};
use crate::events::CombatEvent;
use crate::math::Vec2Fixed;
use crate::spell::CastRequest;

/// Scene identifier allocated by whoever owns the scene.
pub type SceneId = u64;

/// Everything needed to populate a scene.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SceneSetup {
    /// Game-defined scene type, echoed in the report.
    pub scene_type: u32,
    /// External id of the attacking party.
    pub attacker_id: u64,
    /// External id of the defending party.
    pub defender_id: u64,
    /// Attack camp roster.
    pub attackers: Vec<UnitInfo>,
    /// Defence camp roster.
    pub defenders: Vec<UnitInfo>,
    /// NPC wave added to the defence camp.
    pub unit_group: Option<u32>,
    /// Random seed; the scene id is used when absent.
    pub seed: Option<u64>,
}

/// Lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SceneState {
    /// Populated, not started.
    #[default]
    Created,
    /// Ticking.
    Running,
    /// Finished with a verdict.
    Completed,
    /// Stopped without a verdict.
    Aborted,
}

/// Why a scene ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndReason {
    /// One camp has no living combatant.
    Eliminated,
    /// The round limit was reached; the defender holds.
    RoundLimit,
}

/// Verdict of a completed scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneOutcome {
    /// Whether the attack camp won.
    pub attacker_win: bool,
    /// Rounds played.
    pub rounds: u32,
    /// Why the scene ended.
    pub reason: EndReason,
}

/// A combatant alive at the end of the scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurvivorReport {
    /// Scene-scoped id.
    pub id: CombatantId,
    /// Unit entry id.
    pub type_id: u32,
    /// Side.
    pub camp: CampId,
    /// Remaining health.
    pub hp: i64,
    /// Maximum health.
    pub max_hp: i64,
}

/// Result record handed to the persistence services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneReport {
    /// Scene id.
    pub scene_id: SceneId,
    /// Game-defined scene type.
    pub scene_type: u32,
    /// External id of the attacking party.
    pub attacker_id: u64,
    /// External id of the defending party.
    pub defender_id: u64,
    /// Seed the scene ran with.
    pub seed: u64,
    /// Final state.
    pub state: SceneState,
    /// Verdict, if the scene completed.
    pub outcome: Option<SceneOutcome>,
    /// Living combatants in camp and id order.
    pub survivors: Vec<SurvivorReport>,
    /// Dead combatants in order of death, attack camp first.
    pub deaths: Vec<CombatantId>,
}

impl SceneReport {
    /// Serialize for storage.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| CombatError::InvalidState(format!("Failed to serialize report: {e}")))
    }

    /// Deserialize a stored report.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a report.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data)
            .map_err(|e| CombatError::InvalidState(format!("Failed to deserialize report: {e}")))
    }
}

/// One combat.
#[derive(Debug, Clone)]
pub struct Scene {
    id: SceneId,
    scene_type: u32,
    attacker_id: u64,
    defender_id: u64,
    seed: u64,
    state: SceneState,
    outcome: Option<SceneOutcome>,
    battlefield: Battlefield,
}

impl Scene {
    /// Create an empty shell. Populate it with [`Scene::populate`].
    #[must_use]
    pub fn new(store: Arc<DataStore>) -> Self {
        Self {
            id: 0,
            scene_type: 0,
            attacker_id: 0,
            defender_id: 0,
            seed: 0,
            state: SceneState::Created,
            outcome: None,
            battlefield: Battlefield::new(store, 0),
        }
    }

    /// Create and populate a scene.
    ///
    /// # Errors
    ///
    /// See [`Scene::populate`].
    pub fn build(store: Arc<DataStore>, id: SceneId, setup: &SceneSetup) -> Result<Self> {
        let mut scene = Self::new(store);
        scene.populate(id, setup)?;
        Ok(scene)
    }

    /// Fill a fresh or reset shell from `setup`.
    ///
    /// Attackers join the attack camp; defenders and then the unit group
    /// members join the defence camp.
    ///
    /// # Errors
    ///
    /// Returns an error if the scene is not in `Created`, a roster entry
    /// cannot be built, the unit group is unknown, or either camp ends up
    /// empty. The shell is left empty on error.
    pub fn populate(&mut self, id: SceneId, setup: &SceneSetup) -> Result<()> {
        if self.state != SceneState::Created {
            return Err(CombatError::InvalidState(format!(
                "scene {} cannot be populated in state {:?}",
                self.id, self.state
            )));
        }
        let seed = setup.seed.unwrap_or(id);
        self.battlefield.reset(seed);
        self.id = id;
        self.scene_type = setup.scene_type;
        self.attacker_id = setup.attacker_id;
        self.defender_id = setup.defender_id;
        self.seed = seed;

        if let Err(e) = self.add_rosters(setup) {
            self.battlefield.reset(seed);
            return Err(e);
        }

        tracing::debug!(
            scene = id,
            attackers = self.battlefield.camp(CampId::Attack).len(),
            defenders = self.battlefield.camp(CampId::Defence).len(),
            seed,
            "scene populated"
        );
        Ok(())
    }

    fn add_rosters(&mut self, setup: &SceneSetup) -> Result<()> {
        for info in &setup.attackers {
            self.battlefield.add_unit(CampId::Attack, info)?;
        }
        for info in &setup.defenders {
            self.battlefield.add_unit(CampId::Defence, info)?;
        }
        if let Some(group_id) = setup.unit_group {
            let store = Arc::clone(self.battlefield.store());
            let group = store.unit_group(group_id).ok_or(CombatError::MissingData {
                table: "unit_group",
                id: group_id,
            })?;
            for member in &group.members {
                let info = UnitInfo::new(member.type_id)
                    .with_level(member.level)
                    .at(Vec2Fixed::new(member.x, member.y));
                self.battlefield.add_unit(CampId::Defence, &info)?;
            }
        }
        for camp in CampId::ALL {
            if self.battlefield.camp(camp).is_empty() {
                return Err(CombatError::InvalidState(format!("{camp:?} camp has no units")));
            }
        }
        Ok(())
    }

    /// Apply passive auras and start ticking.
    ///
    /// # Errors
    ///
    /// Returns an error unless the scene is in `Created`.
    pub fn start(&mut self) -> Result<()> {
        if self.state != SceneState::Created {
            return Err(CombatError::InvalidState(format!(
                "scene {} cannot start in state {:?}",
                self.id, self.state
            )));
        }
        let bf = &mut self.battlefield;
        let passives: Vec<(CombatantId, u32)> = bf
            .units()
            .flat_map(|u| u.passive_auras().iter().map(move |aura_id| (u.id(), *aura_id)))
            .collect();
        for (unit, aura_id) in passives {
            if let Err(e) = aura::add_aura(bf, unit, unit, aura_id, 0) {
                tracing::warn!(scene = self.id, unit, aura_id, error = %e, "passive aura skipped");
            }
        }
        combat_controller::resolve_pending(bf);
        self.state = SceneState::Running;
        tracing::info!(scene = self.id, scene_type = self.scene_type, "scene started");
        Ok(())
    }

    /// Run one round.
    ///
    /// Returns the outcome once the scene completes. Calling `update` on a
    /// completed scene returns its outcome again.
    ///
    /// # Errors
    ///
    /// Returns an error if the scene was never started or was aborted.
    pub fn update(&mut self) -> Result<Option<SceneOutcome>> {
        match self.state {
            SceneState::Running => {}
            SceneState::Completed => return Ok(self.outcome),
            SceneState::Created | SceneState::Aborted => {
                return Err(CombatError::InvalidState(format!(
                    "scene {} cannot update in state {:?}",
                    self.id, self.state
                )));
            }
        }

        self.battlefield.advance_round();
        let round = self.battlefield.round();

        for camp in CampId::ALL {
            self.update_camp(camp);
            if let Some(outcome) = self.check_end() {
                return Ok(Some(self.finish(outcome)));
            }
        }

        self.cast_camp_skills();
        if let Some(outcome) = self.check_end() {
            return Ok(Some(self.finish(outcome)));
        }

        #[cfg(feature = "debug-validation")]
        self.validate_counts();

        if round >= self.battlefield.config().max_rounds {
            return Ok(Some(self.finish(SceneOutcome {
                attacker_win: false,
                rounds: round,
                reason: EndReason::RoundLimit,
            })));
        }
        Ok(None)
    }

    fn update_camp(&mut self, camp: CampId) {
        let bf = &mut self.battlefield;
        for id in bf.camp(camp).unit_ids() {
            let Some(unit) = bf.unit_mut(id) else {
                continue;
            };
            if !unit.is_alive() {
                continue;
            }
            let finished = unit.combat_mut().update();
            if !finished.is_empty() {
                tracing::trace!(unit = id, casts = finished.len(), "casts drained");
            }

            action::update(bf, id);
            aura::round_end(bf, id);
            if let Some(unit) = bf.unit_mut(id) {
                unit.tick_cooldowns();
            }
        }
    }

    fn cast_camp_skills(&mut self) {
        let bf = &mut self.battlefield;
        for camp in CampId::ALL {
            let skills = bf.camp(camp).active_skills().to_vec();
            for active in skills {
                let Some(cost) = bf.store().skill(active.skill_id).map(|e| e.energy_cost) else {
                    continue;
                };
                if bf.camp(camp).energy() < cost || !bf.is_alive(active.caster) {
                    continue;
                }
                let ready = bf
                    .unit(active.caster)
                    .is_some_and(|u| u.skill_ready(active.skill_id));
                if !ready {
                    continue;
                }
                let target = bf.camp(camp.other()).find_unit_by_head();
                let request = CastRequest::new(active.caster, active.skill_id, target).from_camp();
                match cast_spell(bf, request) {
                    Ok(outcome) => tracing::debug!(
                        ?camp,
                        caster = active.caster,
                        skill_id = active.skill_id,
                        targets = outcome.targets.len(),
                        "camp skill cast"
                    ),
                    Err(e) => tracing::debug!(
                        ?camp,
                        caster = active.caster,
                        skill_id = active.skill_id,
                        error = %e,
                        "camp skill rejected"
                    ),
                }
            }
        }
    }

    fn check_end(&self) -> Option<SceneOutcome> {
        let attack_alive = self.battlefield.camp(CampId::Attack).alive_count();
        let defence_alive = self.battlefield.camp(CampId::Defence).alive_count();
        if attack_alive > 0 && defence_alive > 0 {
            return None;
        }
        Some(SceneOutcome {
            attacker_win: attack_alive > 0,
            rounds: self.battlefield.round(),
            reason: EndReason::Eliminated,
        })
    }

    fn finish(&mut self, outcome: SceneOutcome) -> SceneOutcome {
        self.state = SceneState::Completed;
        self.outcome = Some(outcome);
        tracing::info!(
            scene = self.id,
            attacker_win = outcome.attacker_win,
            rounds = outcome.rounds,
            reason = ?outcome.reason,
            "scene completed"
        );
        outcome
    }

    #[cfg(feature = "debug-validation")]
    fn validate_counts(&self) {
        for camp in CampId::ALL {
            let camp = self.battlefield.camp(camp);
            let alive = camp.units().filter(|u| u.is_alive()).count();
            debug_assert_eq!(alive, camp.alive_count(), "alive counter drifted");
            debug_assert_eq!(camp.len() - alive, camp.deaths().len(), "death log drifted");
        }
    }

    /// Stop the scene without a verdict. Terminal states are kept.
    pub fn abort(&mut self) {
        if matches!(self.state, SceneState::Created | SceneState::Running) {
            self.state = SceneState::Aborted;
            tracing::info!(scene = self.id, round = self.battlefield.round(), "scene aborted");
        }
    }

    /// Return the shell to its freshly created state for reuse.
    pub fn reset(&mut self) {
        self.id = 0;
        self.scene_type = 0;
        self.attacker_id = 0;
        self.defender_id = 0;
        self.seed = 0;
        self.state = SceneState::Created;
        self.outcome = None;
        self.battlefield.reset(0);
    }

    /// Scene id.
    #[must_use]
    pub const fn id(&self) -> SceneId {
        self.id
    }

    /// Lifecycle state.
    #[must_use]
    pub const fn state(&self) -> SceneState {
        self.state
    }

    /// Verdict, once completed.
    #[must_use]
    pub const fn outcome(&self) -> Option<SceneOutcome> {
        self.outcome
    }

    /// Rounds played.
    #[must_use]
    pub const fn round(&self) -> u32 {
        self.battlefield.round()
    }

    /// Seed the scene runs with.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Borrow the battlefield.
    #[must_use]
    pub const fn battlefield(&self) -> &Battlefield {
        &self.battlefield
    }

    /// Mutably borrow the battlefield.
    pub fn battlefield_mut(&mut self) -> &mut Battlefield {
        &mut self.battlefield
    }

    /// Take the events produced since the last call.
    pub fn drain_events(&mut self) -> Vec<CombatEvent> {
        self.battlefield.drain_events()
    }

    /// Hash of the observable scene state.
    ///
    /// Two scenes with identical state produce identical hashes.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.id.hash(&mut hasher);
        self.seed.hash(&mut hasher);
        self.battlefield.hash_into(&mut hasher);
        hasher.finish()
    }

    /// Summary of the scene for the persistence services.
    #[must_use]
    pub fn report(&self) -> SceneReport {
        let bf = &self.battlefield;
        let survivors = bf
            .units()
            .filter(|u| u.is_alive())
            .map(|u| SurvivorReport {
                id: u.id(),
                type_id: u.type_id(),
                camp: u.camp(),
                hp: u.hp(),
                max_hp: u.max_hp(),
            })
            .collect();
        let deaths = CampId::ALL
            .iter()
            .flat_map(|camp| bf.camp(*camp).deaths().iter().copied())
            .collect();
        SceneReport {
            scene_id: self.id,
            scene_type: self.scene_type,
            attacker_id: self.attacker_id,
            defender_id: self.defender_id,
            seed: self.seed,
            state: self.state,
            outcome: self.outcome,
            survivors,
            deaths,
        }
    }
}

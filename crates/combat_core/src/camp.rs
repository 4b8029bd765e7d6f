//! Camps: the two sides of a scene.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::combatant::{Combatant, CombatantId, UnitInfo};
use crate::data::DataStore;
use crate::error::Result;
use crate::math::Vec2Fixed;

/// Side of a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CampId {
    /// The side that started the combat.
    Attack,
    /// The side being attacked.
    Defence,
}

impl CampId {
    /// Both camps in update order.
    pub const ALL: [Self; 2] = [Self::Attack, Self::Defence];

    /// The opposing camp.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::Attack => Self::Defence,
            Self::Defence => Self::Attack,
        }
    }

    /// Array index.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Attack => 0,
            Self::Defence => 1,
        }
    }
}

/// Camp-level skill cast through one of the camp's heroes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveSkill {
    /// Hero casting the skill.
    pub caster: CombatantId,
    /// Skill entry id.
    pub skill_id: u32,
}

/// One side of a scene.
#[derive(Debug, Clone)]
pub struct Camp {
    id: CampId,
    units: BTreeMap<CombatantId, Combatant>,
    alive: usize,
    energy: i32,
    energy_max: i32,
    active_skills: Vec<ActiveSkill>,
    deaths: Vec<CombatantId>,
}

impl Camp {
    /// Create an empty camp.
    #[must_use]
    pub const fn new(id: CampId, energy_max: i32) -> Self {
        Self {
            id,
            units: BTreeMap::new(),
            alive: 0,
            energy: 0,
            energy_max,
            active_skills: Vec::new(),
            deaths: Vec::new(),
        }
    }

    /// Which side this is.
    #[must_use]
    pub const fn id(&self) -> CampId {
        self.id
    }

    /// The opposing side.
    #[must_use]
    pub const fn other_camp(&self) -> CampId {
        self.id.other()
    }

    /// Construct a combatant and insert it under `id`.
    ///
    /// # Errors
    ///
    /// Propagates the combatant construction error; the camp is unchanged.
    pub fn add_unit(
        &mut self,
        id: CombatantId,
        info: &UnitInfo,
        position: Vec2Fixed,
        store: &DataStore,
    ) -> Result<CombatantId> {
        let unit = Combatant::new(id, self.id, info, position, store)?;
        if let Some(skill_id) = unit.active_skill() {
            self.active_skills.push(ActiveSkill {
                caster: id,
                skill_id,
            });
        }
        self.units.insert(id, unit);
        self.alive += 1;
        Ok(id)
    }

    /// First living combatant in id order.
    #[must_use]
    pub fn find_unit_by_head(&self) -> Option<CombatantId> {
        self.units
            .values()
            .find(|unit| unit.is_alive())
            .map(Combatant::id)
    }

    /// Record a death. Called once per combatant by the battlefield.
    pub fn on_unit_dead(&mut self, id: CombatantId) {
        self.alive = self.alive.saturating_sub(1);
        self.deaths.push(id);
        tracing::debug!(camp = ?self.id, unit = id, alive = self.alive, "unit died");
    }

    /// Living combatants.
    #[must_use]
    pub const fn alive_count(&self) -> usize {
        self.alive
    }

    /// Combatants that died, in order of death.
    #[must_use]
    pub fn deaths(&self) -> &[CombatantId] {
        &self.deaths
    }

    /// Current energy.
    #[must_use]
    pub const fn energy(&self) -> i32 {
        self.energy
    }

    /// Change energy, clamped to `[0, energy_max]`.
    pub fn mod_att_energy(&mut self, delta: i32) {
        self.energy = self.energy.saturating_add(delta).clamp(0, self.energy_max);
    }

    /// Camp active skills.
    #[must_use]
    pub fn active_skills(&self) -> &[ActiveSkill] {
        &self.active_skills
    }

    /// Borrow a combatant.
    #[must_use]
    pub fn unit(&self, id: CombatantId) -> Option<&Combatant> {
        self.units.get(&id)
    }

    /// Mutably borrow a combatant.
    pub fn unit_mut(&mut self, id: CombatantId) -> Option<&mut Combatant> {
        self.units.get_mut(&id)
    }

    /// Every combatant in id order.
    pub fn units(&self) -> impl Iterator<Item = &Combatant> {
        self.units.values()
    }

    /// Ids of every combatant in id order.
    #[must_use]
    pub fn unit_ids(&self) -> Vec<CombatantId> {
        self.units.keys().copied().collect()
    }

    /// Number of combatants, dead or alive.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether the camp has no combatants.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Drop every combatant and reset energy.
    pub fn clear(&mut self, energy_max: i32) {
        self.units.clear();
        self.alive = 0;
        self.energy = 0;
        self.energy_max = energy_max;
        self.active_skills.clear();
        self.deaths.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_other_camp() {
        assert_eq!(CampId::Attack.other(), CampId::Defence);
        assert_eq!(CampId::Defence.other(), CampId::Attack);
        assert_eq!(Camp::new(CampId::Defence, 100).other_camp(), CampId::Attack);
    }

    #[test]
    fn test_energy_clamps() {
        let mut camp = Camp::new(CampId::Attack, 100);
        camp.mod_att_energy(-5);
        assert_eq!(camp.energy(), 0);
        camp.mod_att_energy(70);
        camp.mod_att_energy(70);
        assert_eq!(camp.energy(), 100);
        camp.mod_att_energy(i32::MIN);
        assert_eq!(camp.energy(), 0);
    }

    #[test]
    fn test_missing_unit_leaves_camp_unchanged() {
        let store = DataStore::default();
        let mut camp = Camp::new(CampId::Attack, 100);
        assert!(camp
            .add_unit(1, &UnitInfo::new(5), Vec2Fixed::ZERO, &store)
            .is_err());
        assert!(camp.is_empty());
        assert_eq!(camp.alive_count(), 0);
        assert_eq!(camp.find_unit_by_head(), None);
    }
}

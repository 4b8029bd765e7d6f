//! Combatants: heroes and creatures.
//!
//! Both variants share one struct; [`UnitKind`] decides the few places where
//! they differ (equipment, camp active skills).

use std::collections::BTreeMap;

use crate::action::ActionController;
use crate::attribute::{AttManager, AttributeKind};
use crate::camp::CampId;
use crate::combat_controller::CombatController;
use crate::data::{AttributeValue, DataStore, Race, UnitKind};
use crate::error::{CombatError, Result};
use crate::math::{round_to_i64, Fixed, Vec2Fixed};
use crate::state::{FlagCounter, Mechanic, MechanicFlags, UnitState};

/// Scene-scoped combatant identifier.
pub type CombatantId = u64;

/// One roster slot handed to a scene.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitInfo {
    /// Unit entry id.
    pub type_id: u32,
    /// Level; growth applies once per level above 1.
    pub level: u32,
    /// Spawn position. The camp formation is used when absent.
    pub position: Option<Vec2Fixed>,
    /// Base values overwritten after level growth.
    pub attributes: Vec<AttributeValue>,
    /// Equipped item ids (heroes only).
    pub items: Vec<u32>,
}

impl UnitInfo {
    /// Level-1 unit at the formation position.
    #[must_use]
    pub const fn new(type_id: u32) -> Self {
        Self {
            type_id,
            level: 1,
            position: None,
            attributes: Vec::new(),
            items: Vec::new(),
        }
    }

    /// Set the level.
    #[must_use]
    pub const fn with_level(mut self, level: u32) -> Self {
        self.level = level;
        self
    }

    /// Set the spawn position.
    #[must_use]
    pub const fn at(mut self, position: Vec2Fixed) -> Self {
        self.position = Some(position);
        self
    }

    /// Add an attribute override.
    #[must_use]
    pub fn with_attribute(mut self, kind: AttributeKind, value: Fixed) -> Self {
        self.attributes.push(AttributeValue::new(kind, value));
        self
    }

    /// Add an equipped item.
    #[must_use]
    pub fn with_item(mut self, item_id: u32) -> Self {
        self.items.push(item_id);
        self
    }
}

/// A participant in a scene.
#[derive(Debug, Clone)]
pub struct Combatant {
    id: CombatantId,
    kind: UnitKind,
    type_id: u32,
    level: u32,
    race: Race,
    camp: CampId,
    position: Vec2Fixed,
    hp: i64,
    dead: bool,
    states: FlagCounter,
    immunities: FlagCounter,
    att: AttManager,
    combat: CombatController,
    action: ActionController,
    skills: Vec<u32>,
    basic_skill: Option<u32>,
    active_skill: Option<u32>,
    beat_back_skill: Option<u32>,
    passive_auras: Vec<u32>,
    cooldowns: BTreeMap<u32, u32>,
}

impl Combatant {
    /// Build a combatant from its unit entry.
    ///
    /// # Errors
    ///
    /// Returns [`CombatError::InvalidUnit`] if the unit entry, one of its
    /// attribute entries, items or skills is missing, or if the resulting
    /// unit has no health. Nothing is constructed on error.
    pub fn new(
        id: CombatantId,
        camp: CampId,
        info: &UnitInfo,
        position: Vec2Fixed,
        store: &DataStore,
    ) -> Result<Self> {
        let invalid = |reason: String| CombatError::InvalidUnit {
            type_id: info.type_id,
            reason,
        };

        let entry = store
            .unit(info.type_id)
            .ok_or_else(|| invalid("unknown unit type".to_string()))?;
        let base = store
            .attributes(entry.attributes)
            .ok_or_else(|| invalid(format!("unknown attributes {}", entry.attributes)))?;

        let mut att = AttManager::new();
        att.reset(Some(base));

        let level = info.level.max(1);
        if let Some(growth_id) = entry.growth {
            let growth = store
                .attributes(growth_id)
                .ok_or_else(|| invalid(format!("unknown growth attributes {growth_id}")))?;
            let levels = Fixed::from_num(level - 1);
            for value in &growth.values {
                let current = att.base_value(value.kind);
                att.set_att_value(value.kind, current + value.value * levels);
            }
        }

        for value in &info.attributes {
            att.set_att_value(value.kind, value.value);
        }

        if entry.kind.equips_items() {
            for item_id in &info.items {
                let item = store
                    .item(*item_id)
                    .ok_or_else(|| invalid(format!("unknown item {item_id}")))?;
                let item_att = store
                    .attributes(item.attributes)
                    .ok_or_else(|| invalid(format!("unknown item attributes {}", item.attributes)))?;
                att.mod_att_manager(&AttManager::from_entry(item_att));
            }
        } else if !info.items.is_empty() {
            tracing::debug!(type_id = info.type_id, "ignoring items on a creature");
        }

        att.calc_att();
        let max_hp = round_to_i64(att.get(AttributeKind::MaxHp));
        if max_hp <= 0 {
            return Err(invalid("max hp must be positive".to_string()));
        }

        let mut basic_skill = None;
        for skill_id in &entry.skills {
            let skill = store
                .skill(*skill_id)
                .ok_or_else(|| invalid(format!("unknown skill {skill_id}")))?;
            if skill.basic && basic_skill.is_none() {
                basic_skill = Some(*skill_id);
            }
        }

        Ok(Self {
            id,
            kind: entry.kind,
            type_id: info.type_id,
            level,
            race: entry.race,
            camp,
            position,
            hp: max_hp,
            dead: false,
            states: FlagCounter::default(),
            immunities: FlagCounter::default(),
            att,
            combat: CombatController::new(),
            action: ActionController::new(),
            skills: entry.skills.clone(),
            basic_skill,
            active_skill: entry.active_skill.filter(|_| entry.kind.has_camp_skill()),
            beat_back_skill: entry.beat_back_skill,
            passive_auras: entry.passive_auras.clone(),
            cooldowns: BTreeMap::new(),
        })
    }

    /// Scene-scoped id.
    #[must_use]
    pub const fn id(&self) -> CombatantId {
        self.id
    }

    /// Hero or creature.
    #[must_use]
    pub const fn kind(&self) -> UnitKind {
        self.kind
    }

    /// Unit entry id.
    #[must_use]
    pub const fn type_id(&self) -> u32 {
        self.type_id
    }

    /// Level.
    #[must_use]
    pub const fn level(&self) -> u32 {
        self.level
    }

    /// Race.
    #[must_use]
    pub const fn race(&self) -> Race {
        self.race
    }

    /// Owning camp.
    #[must_use]
    pub const fn camp(&self) -> CampId {
        self.camp
    }

    /// Current position.
    #[must_use]
    pub const fn position(&self) -> Vec2Fixed {
        self.position
    }

    /// Move to a new position.
    pub fn set_position(&mut self, position: Vec2Fixed) {
        self.position = position;
    }

    /// Current health.
    #[must_use]
    pub const fn hp(&self) -> i64 {
        self.hp
    }

    /// Maximum health from the final `MaxHp` attribute.
    #[must_use]
    pub fn max_hp(&self) -> i64 {
        round_to_i64(self.att.get(AttributeKind::MaxHp)).max(1)
    }

    /// Health as a fraction of maximum health.
    #[must_use]
    pub fn hp_fraction(&self) -> Fixed {
        Fixed::from_num(self.hp) / Fixed::from_num(self.max_hp())
    }

    /// Whether the combatant is still fighting.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        !self.dead
    }

    /// State bitset.
    #[must_use]
    pub fn state(&self) -> UnitState {
        let mut state = UnitState::from_bits_truncate(self.states.bits());
        if self.dead {
            state |= UnitState::DEAD;
        }
        state
    }

    /// Whether any of `state` is set.
    #[must_use]
    pub fn has_state(&self, state: UnitState) -> bool {
        self.state().intersects(state)
    }

    /// Set states. Each call must be paired with [`Self::remove_state`].
    pub fn add_state(&mut self, state: UnitState) {
        self.states.add((state - UnitState::DEAD).bits());
    }

    /// Release states set by [`Self::add_state`].
    pub fn remove_state(&mut self, state: UnitState) {
        self.states.remove((state - UnitState::DEAD).bits());
    }

    /// Mechanic immunity bitset.
    #[must_use]
    pub fn immunities(&self) -> MechanicFlags {
        MechanicFlags::from_bits_truncate(self.immunities.bits())
    }

    /// Whether the combatant ignores `mechanic`.
    #[must_use]
    pub fn is_immune(&self, mechanic: Mechanic) -> bool {
        self.immunities().contains(mechanic.flag())
    }

    /// Grant immunities. Each call must be paired with [`Self::remove_immunity`].
    pub fn add_immunity(&mut self, mechanics: MechanicFlags) {
        self.immunities.add(mechanics.bits());
    }

    /// Release immunities granted by [`Self::add_immunity`].
    pub fn remove_immunity(&mut self, mechanics: MechanicFlags) {
        self.immunities.remove(mechanics.bits());
    }

    /// Attribute manager.
    #[must_use]
    pub const fn att(&self) -> &AttManager {
        &self.att
    }

    /// Mutable attribute manager. Call [`Self::recalc`] after changes.
    pub fn att_mut(&mut self) -> &mut AttManager {
        &mut self.att
    }

    /// Recalculate attributes and clamp health to the new maximum.
    pub fn recalc(&mut self) {
        self.att.calc_att();
        self.hp = self.hp.min(self.max_hp());
    }

    /// Combat controller.
    #[must_use]
    pub const fn combat(&self) -> &CombatController {
        &self.combat
    }

    /// Mutable combat controller.
    pub fn combat_mut(&mut self) -> &mut CombatController {
        &mut self.combat
    }

    /// Action controller.
    #[must_use]
    pub const fn action(&self) -> &ActionController {
        &self.action
    }

    /// Mutable action controller.
    pub fn action_mut(&mut self) -> &mut ActionController {
        &mut self.action
    }

    /// Skills available to the AI, in priority order.
    #[must_use]
    pub fn skills(&self) -> &[u32] {
        &self.skills
    }

    /// Basic attack, honouring a melee replacement aura.
    #[must_use]
    pub fn basic_skill(&self) -> Option<u32> {
        self.combat.melee_override().or(self.basic_skill)
    }

    /// Camp active skill.
    #[must_use]
    pub const fn active_skill(&self) -> Option<u32> {
        self.active_skill
    }

    /// Counter-attack skill cast after a block.
    #[must_use]
    pub const fn beat_back_skill(&self) -> Option<u32> {
        self.beat_back_skill
    }

    /// Auras applied when the scene starts.
    #[must_use]
    pub fn passive_auras(&self) -> &[u32] {
        &self.passive_auras
    }

    /// Whether `skill_id` is off cooldown.
    #[must_use]
    pub fn skill_ready(&self, skill_id: u32) -> bool {
        self.cooldowns.get(&skill_id).map_or(true, |rounds| *rounds == 0)
    }

    /// Remaining cooldown of `skill_id` in rounds.
    #[must_use]
    pub fn cooldown(&self, skill_id: u32) -> u32 {
        self.cooldowns.get(&skill_id).copied().unwrap_or(0)
    }

    /// Start a cooldown.
    pub fn start_cooldown(&mut self, skill_id: u32, rounds: u32) {
        if rounds > 0 {
            self.cooldowns.insert(skill_id, rounds);
        }
    }

    /// Advance cooldowns by one round.
    pub fn tick_cooldowns(&mut self) {
        self.cooldowns.retain(|_, rounds| {
            *rounds = rounds.saturating_sub(1);
            *rounds > 0
        });
    }

    /// Remove health. Returns `true` only on the transition to dead.
    ///
    /// Damage to a dead combatant is ignored.
    pub fn take_damage(&mut self, amount: i64) -> bool {
        if self.dead {
            return false;
        }
        self.hp = (self.hp - amount.max(0)).max(0);
        if self.hp == 0 {
            self.dead = true;
            self.action.interrupt();
            return true;
        }
        false
    }

    /// Restore health up to the maximum. Returns the amount restored.
    pub fn heal(&mut self, amount: i64) -> i64 {
        if self.dead || amount <= 0 {
            return 0;
        }
        let before = self.hp;
        self.hp = (self.hp + amount).min(self.max_hp());
        self.hp - before
    }

    /// Feed the observable state into a hasher.
    pub fn hash_into<H: std::hash::Hasher>(&self, hasher: &mut H) {
        use std::hash::Hash;
        self.id.hash(hasher);
        self.type_id.hash(hasher);
        self.hp.hash(hasher);
        self.dead.hash(hasher);
        self.state().bits().hash(hasher);
        self.position.x.to_bits().hash(hasher);
        self.position.y.to_bits().hash(hasher);
        self.combat.aura_count().hash(hasher);
        self.att.hash_into(hasher);
    }
}

//! Builders shared by unit tests.
//!
//! Integration tests use `combat_test_utils` instead.

use std::sync::Arc;

use crate::attribute::AttributeKind;
use crate::battlefield::Battlefield;
use crate::camp::CampId;
use crate::combatant::{CombatantId, UnitInfo};
use crate::data::{
    AttributeEntry, AttributeValue, AuraEffectKind, AuraEffectSlot, AuraEntry, AuraTrigger,
    DataDocument, DataStore, EffectCondition, EffectEntry, EffectKind, LaunchType, RangeType,
    RemoveMode, ScopeType, SkillEntry, TargetType, TimelineEntry, UnitEntry, UnitKind, Race,
};
use crate::math::Fixed;
use crate::state::{School, UnitState};

pub const UNIT: u32 = 1;
pub const SLASH: u32 = 1;

pub fn attributes(id: u32, values: &[(AttributeKind, i64)]) -> AttributeEntry {
    AttributeEntry {
        id,
        values: values
            .iter()
            .map(|(kind, value)| AttributeValue::new(*kind, Fixed::from_num(*value)))
            .collect(),
    }
}

pub fn unit(id: u32, attributes: u32, skills: Vec<u32>) -> UnitEntry {
    UnitEntry {
        id,
        name: format!("unit.{id}"),
        kind: UnitKind::Hero,
        race: Race::Human,
        attributes,
        growth: None,
        skills,
        passive_auras: Vec::new(),
        active_skill: None,
        beat_back_skill: None,
    }
}

/// Single-target skill whose effects live in a timeline of the same id.
pub fn skill(id: u32, basic: bool) -> SkillEntry {
    SkillEntry {
        id,
        name: format!("skill.{id}"),
        basic,
        launch: LaunchType::Target,
        target: TargetType::EnemySingle,
        range: RangeType::Circle,
        scope: ScopeType::SelectTarget,
        range_radius: Fixed::ZERO,
        range_width: Fixed::ZERO,
        range_angle: 0,
        cast_range: Fixed::ZERO,
        max_targets: 0,
        school: School::Physical,
        cooldown: 0,
        energy_cost: 0,
        caster_state_forbid: UnitState::STUN,
        target_state_forbid: UnitState::empty(),
        caster_aura_required: None,
        target_aura_forbidden: None,
        timelines: vec![id],
    }
}

pub fn effect(id: u32, kind: EffectKind) -> EffectEntry {
    EffectEntry {
        id,
        kind,
        mechanic: None,
        condition: EffectCondition::Always,
        chance: None,
    }
}

pub fn damage(percent: i64) -> EffectKind {
    EffectKind::Damage {
        percent: Fixed::from_num(percent),
        flat: Fixed::ZERO,
    }
}

pub fn aura(id: u32, slots: Vec<AuraEffectSlot>) -> AuraEntry {
    AuraEntry {
        id,
        name: format!("aura.{id}"),
        duration: 0,
        harmful: false,
        mechanic: None,
        multi_wrap: false,
        max_wraps: 1,
        effect_priority: 0,
        dec_by_target: false,
        removal_effect_mask: RemoveMode::empty(),
        slots,
    }
}

pub fn slot(kind: AuraEffectKind, trigger: AuraTrigger, points: i64) -> AuraEffectSlot {
    AuraEffectSlot {
        kind,
        trigger,
        base_points: Fixed::from_num(points),
        scale_attribute: None,
        scale_percent: Fixed::ZERO,
        trigger_count: 0,
        cooldown: 0,
    }
}

/// Two identical units (attack 100, max hp 1000) with a 100% basic attack.
///
/// Random damage spread is disabled so every hit lands for exactly the
/// formula value.
pub fn document() -> DataDocument {
    let mut doc = DataDocument::default();
    doc.config.random_min = Fixed::ONE;
    doc.config.random_max = Fixed::ONE;
    doc.attributes.push(attributes(
        1,
        &[
            (AttributeKind::Attack, 100),
            (AttributeKind::MaxHp, 1000),
            (AttributeKind::MoveSpeed, 2),
        ],
    ));
    doc.units.push(unit(UNIT, 1, vec![SLASH]));
    doc.skills.push(skill(SLASH, true));
    doc.timelines.push(TimelineEntry {
        id: SLASH,
        effects: vec![SLASH],
    });
    doc.effects.push(effect(SLASH, damage(1)));
    doc
}

/// Register a skill with a one-effect timeline under the same id.
pub fn add_skill(doc: &mut DataDocument, skill: SkillEntry, kind: EffectKind) {
    let id = skill.id;
    doc.skills.push(skill);
    doc.timelines.push(TimelineEntry {
        id,
        effects: vec![id],
    });
    doc.effects.push(effect(id, kind));
}

pub fn store(doc: DataDocument) -> Arc<DataStore> {
    Arc::new(DataStore::from_document(doc).expect("valid test data"))
}

/// Battlefield with one attacker and one defender of type [`UNIT`].
pub fn duel(doc: DataDocument) -> (Battlefield, CombatantId, CombatantId) {
    let mut bf = Battlefield::new(store(doc), 7);
    let attacker = bf
        .add_unit(CampId::Attack, &UnitInfo::new(UNIT))
        .expect("attacker");
    let defender = bf
        .add_unit(CampId::Defence, &UnitInfo::new(UNIT))
        .expect("defender");
    (bf, attacker, defender)
}

//! Static combat data.
//!
//! This module contains pure data structures for units, skills, auras and
//! global tuning, plus the immutable [`DataStore`] every scene reads them
//! through. All structs are designed to be deserialized from RON files.
//!
//! **Note:** This module contains no IO - it only parses text handed to it.
//! Reading files is left to the binaries.

mod attribute_data;
mod aura_data;
mod config_data;
mod skill_data;
mod unit_data;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{CombatError, Result};

pub use attribute_data::{AttributeEntry, AttributeValue};
pub use aura_data::{
    AuraCastTarget, AuraEffectKind, AuraEffectSlot, AuraEntry, AuraTrigger, RemoveMode,
    MAX_AURA_SLOTS,
};
pub use config_data::GlobalConfig;
pub use skill_data::{
    EffectCondition, EffectEntry, EffectKind, LaunchType, RangeType, ScopeType, SkillEntry,
    TargetType, TimelineEntry,
};
pub use unit_data::{ItemEntry, Race, UnitEntry, UnitGroupEntry, UnitGroupMember, UnitKind};

/// Serialized form of a full data set, as authored in RON.
///
/// # Example RON
///
/// ```ron
/// DataDocument(
///     config: (max_rounds: 100),
///     attributes: [(id: 1, values: [(kind: Attack, value: 100)])],
///     units: [(id: 1, name: "unit.footman", attributes: 1, skills: [1])],
///     skills: [(id: 1, name: "skill.slash", basic: true, timelines: [1])],
///     timelines: [(id: 1, effects: [1])],
///     effects: [(id: 1, kind: Damage(percent: 1.0))],
/// )
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataDocument {
    /// Global tuning.
    #[serde(default)]
    pub config: GlobalConfig,
    /// Attribute entries.
    #[serde(default)]
    pub attributes: Vec<AttributeEntry>,
    /// Unit entries.
    #[serde(default)]
    pub units: Vec<UnitEntry>,
    /// NPC waves.
    #[serde(default)]
    pub unit_groups: Vec<UnitGroupEntry>,
    /// Equipment.
    #[serde(default)]
    pub items: Vec<ItemEntry>,
    /// Skills.
    #[serde(default)]
    pub skills: Vec<SkillEntry>,
    /// Skill timelines.
    #[serde(default)]
    pub timelines: Vec<TimelineEntry>,
    /// Skill effects.
    #[serde(default)]
    pub effects: Vec<EffectEntry>,
    /// Auras.
    #[serde(default)]
    pub auras: Vec<AuraEntry>,
}

/// Immutable lookup tables shared by every scene.
///
/// Built once at startup and handed around as `Arc<DataStore>`; lookups
/// return `None` on a miss and callers decide whether that is fatal.
#[derive(Debug, Clone, Default)]
pub struct DataStore {
    config: GlobalConfig,
    attributes: BTreeMap<u32, AttributeEntry>,
    units: BTreeMap<u32, UnitEntry>,
    unit_groups: BTreeMap<u32, UnitGroupEntry>,
    items: BTreeMap<u32, ItemEntry>,
    skills: BTreeMap<u32, SkillEntry>,
    timelines: BTreeMap<u32, TimelineEntry>,
    effects: BTreeMap<u32, EffectEntry>,
    auras: BTreeMap<u32, AuraEntry>,
}

fn index_by_id<T>(
    table: &'static str,
    entries: Vec<T>,
    id_of: impl Fn(&T) -> u32,
) -> Result<BTreeMap<u32, T>> {
    let mut map = BTreeMap::new();
    for entry in entries {
        let id = id_of(&entry);
        if map.insert(id, entry).is_some() {
            return Err(CombatError::DataParseError {
                source_name: table.to_string(),
                message: format!("duplicate {table} id {id}"),
            });
        }
    }
    Ok(map)
}

impl DataStore {
    /// Build a store from a parsed document. Duplicate ids are rejected.
    ///
    /// # Errors
    ///
    /// Returns [`CombatError::DataParseError`] on a duplicate id.
    pub fn from_document(document: DataDocument) -> Result<Self> {
        Ok(Self {
            config: document.config,
            attributes: index_by_id("attribute", document.attributes, |e| e.id)?,
            units: index_by_id("unit", document.units, |e| e.id)?,
            unit_groups: index_by_id("unit_group", document.unit_groups, |e| e.id)?,
            items: index_by_id("item", document.items, |e| e.id)?,
            skills: index_by_id("skill", document.skills, |e| e.id)?,
            timelines: index_by_id("timeline", document.timelines, |e| e.id)?,
            effects: index_by_id("effect", document.effects, |e| e.id)?,
            auras: index_by_id("aura", document.auras, |e| e.id)?,
        })
    }

    /// Parse a RON document.
    ///
    /// # Errors
    ///
    /// Returns [`CombatError::DataParseError`] if the text is not a valid
    /// document or contains duplicate ids.
    pub fn from_ron_str(source_name: &str, text: &str) -> Result<Self> {
        let document: DataDocument =
            ron::from_str(text).map_err(|e| CombatError::DataParseError {
                source_name: source_name.to_string(),
                message: e.to_string(),
            })?;
        Self::from_document(document)
    }

    /// Global tuning.
    #[must_use]
    pub const fn config(&self) -> &GlobalConfig {
        &self.config
    }

    /// Attribute entry by id.
    #[must_use]
    pub fn attributes(&self, id: u32) -> Option<&AttributeEntry> {
        self.attributes.get(&id)
    }

    /// Unit entry by id.
    #[must_use]
    pub fn unit(&self, id: u32) -> Option<&UnitEntry> {
        self.units.get(&id)
    }

    /// Unit group entry by id.
    #[must_use]
    pub fn unit_group(&self, id: u32) -> Option<&UnitGroupEntry> {
        self.unit_groups.get(&id)
    }

    /// Item entry by id.
    #[must_use]
    pub fn item(&self, id: u32) -> Option<&ItemEntry> {
        self.items.get(&id)
    }

    /// Skill entry by id.
    #[must_use]
    pub fn skill(&self, id: u32) -> Option<&SkillEntry> {
        self.skills.get(&id)
    }

    /// Timeline entry by id.
    #[must_use]
    pub fn timeline(&self, id: u32) -> Option<&TimelineEntry> {
        self.timelines.get(&id)
    }

    /// Effect entry by id.
    #[must_use]
    pub fn effect(&self, id: u32) -> Option<&EffectEntry> {
        self.effects.get(&id)
    }

    /// Aura entry by id.
    #[must_use]
    pub fn aura(&self, id: u32) -> Option<&AuraEntry> {
        self.auras.get(&id)
    }

    /// Number of entries per table, in declaration order.
    #[must_use]
    pub fn table_sizes(&self) -> [(&'static str, usize); 8] {
        [
            ("attributes", self.attributes.len()),
            ("units", self.units.len()),
            ("unit_groups", self.unit_groups.len()),
            ("items", self.items.len()),
            ("skills", self.skills.len()),
            ("timelines", self.timelines.len()),
            ("effects", self.effects.len()),
            ("auras", self.auras.len()),
        ]
    }

    /// Check cross-table references.
    ///
    /// Returns a list of validation errors (empty if valid).
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for unit in self.units.values() {
            if self.attributes(unit.attributes).is_none() {
                errors.push(format!(
                    "Unit {} references unknown attributes {}",
                    unit.id, unit.attributes
                ));
            }
            if let Some(growth) = unit.growth {
                if self.attributes(growth).is_none() {
                    errors.push(format!(
                        "Unit {} references unknown growth attributes {growth}",
                        unit.id
                    ));
                }
            }
            let skills = unit
                .skills
                .iter()
                .chain(unit.active_skill.iter())
                .chain(unit.beat_back_skill.iter());
            for skill_id in skills {
                if self.skill(*skill_id).is_none() {
                    errors.push(format!(
                        "Unit {} references unknown skill {skill_id}",
                        unit.id
                    ));
                }
            }
            for aura_id in &unit.passive_auras {
                if self.aura(*aura_id).is_none() {
                    errors.push(format!(
                        "Unit {} references unknown aura {aura_id}",
                        unit.id
                    ));
                }
            }
            if unit.active_skill.is_some() && unit.kind != UnitKind::Hero {
                errors.push(format!(
                    "Unit {} declares an active skill but is not a hero",
                    unit.id
                ));
            }
        }

        for group in self.unit_groups.values() {
            for member in &group.members {
                if self.unit(member.type_id).is_none() {
                    errors.push(format!(
                        "Unit group {} references unknown unit {}",
                        group.id, member.type_id
                    ));
                }
            }
        }

        for item in self.items.values() {
            if self.attributes(item.attributes).is_none() {
                errors.push(format!(
                    "Item {} references unknown attributes {}",
                    item.id, item.attributes
                ));
            }
        }

        for skill in self.skills.values() {
            for timeline_id in &skill.timelines {
                if self.timeline(*timeline_id).is_none() {
                    errors.push(format!(
                        "Skill {} references unknown timeline {timeline_id}",
                        skill.id
                    ));
                }
            }
            let auras = skill
                .caster_aura_required
                .iter()
                .chain(skill.target_aura_forbidden.iter());
            for aura_id in auras {
                if self.aura(*aura_id).is_none() {
                    errors.push(format!(
                        "Skill {} references unknown aura {aura_id}",
                        skill.id
                    ));
                }
            }
        }

        for timeline in self.timelines.values() {
            for effect_id in &timeline.effects {
                if self.effect(*effect_id).is_none() {
                    errors.push(format!(
                        "Timeline {} references unknown effect {effect_id}",
                        timeline.id
                    ));
                }
            }
        }

        for effect in self.effects.values() {
            if let EffectKind::AddAura { aura_id } = effect.kind {
                if self.aura(aura_id).is_none() {
                    errors.push(format!(
                        "Effect {} applies unknown aura {aura_id}",
                        effect.id
                    ));
                }
            }
        }

        for aura in self.auras.values() {
            if aura.slots.len() > MAX_AURA_SLOTS {
                errors.push(format!(
                    "Aura {} declares {} slots (max {MAX_AURA_SLOTS})",
                    aura.id,
                    aura.slots.len()
                ));
            }
            if aura.max_wraps == 0 {
                errors.push(format!("Aura {} has max_wraps 0", aura.id));
            }
            for slot in &aura.slots {
                let spell = match slot.kind {
                    AuraEffectKind::CastSpell { spell_id, .. }
                    | AuraEffectKind::DamageAccumulate { spell_id }
                    | AuraEffectKind::ReplaceMeleeSpell { spell_id } => Some(spell_id),
                    _ => None,
                };
                if let Some(spell_id) = spell {
                    if self.skill(spell_id).is_none() {
                        errors.push(format!(
                            "Aura {} references unknown skill {spell_id}",
                            aura.id
                        ));
                    }
                }
            }
        }

        let config = &self.config;
        if config.random_min > config.random_max {
            errors.push("Config random_min is greater than random_max".to_string());
        }
        if config.tick_interval_ms == 0 {
            errors.push("Config tick_interval_ms must be positive".to_string());
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"
        DataDocument(
            config: (max_rounds: 40),
            attributes: [(id: 1, values: [(kind: Attack, value: 100), (kind: MaxHp, value: 500)])],
            units: [(id: 1, name: "unit.footman", attributes: 1, skills: [1])],
            skills: [(id: 1, name: "skill.slash", basic: true, launch: Target, timelines: [1])],
            timelines: [(id: 1, effects: [1])],
            effects: [(id: 1, kind: Damage(percent: 1.0))],
        )
    "#;

    #[test]
    fn test_from_ron_str() {
        let store = DataStore::from_ron_str("inline", DOC).unwrap();
        assert_eq!(store.config().max_rounds, 40);
        assert_eq!(store.unit(1).unwrap().skills, vec![1]);
        assert!(store.skill(1).unwrap().basic);
        assert!(store.aura(1).is_none());
        assert!(store.validate().is_empty());
    }

    #[test]
    fn test_parse_error_names_source() {
        let err = DataStore::from_ron_str("broken.ron", "DataDocument(").unwrap_err();
        assert!(err.to_string().contains("broken.ron"));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut document = DataDocument::default();
        document.timelines.push(TimelineEntry {
            id: 4,
            effects: vec![],
        });
        document.timelines.push(TimelineEntry {
            id: 4,
            effects: vec![],
        });
        let err = DataStore::from_document(document).unwrap_err();
        assert!(err.to_string().contains("duplicate timeline id 4"));
    }

    #[test]
    fn test_validate_reports_dangling_references() {
        let mut document: DataDocument = ron::from_str(DOC).unwrap();
        document.timelines[0].effects.push(99);
        document.units[0].passive_auras.push(7);
        let store = DataStore::from_document(document).unwrap();

        let errors = store.validate();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|e| e.contains("unknown effect 99")));
        assert!(errors.iter().any(|e| e.contains("unknown aura 7")));
    }
}

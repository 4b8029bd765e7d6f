//! Attribute aggregation.
//!
//! Every combatant (and every piece of equipment) owns an [`AttManager`]:
//! a fixed-size slot array indexed by [`AttributeKind`]. Static values are
//! loaded into the *base* array, additive modifiers from buffs and effects
//! are queued as *deltas*, and [`AttManager::calc_att`] folds both into the
//! *final* array that the rest of the engine reads.
//!
//! `final` is always a pure function of `base` and the queued deltas, so
//! recalculating never drifts.

use serde::{Deserialize, Serialize};
use strum::{EnumCount, EnumIter, FromRepr, IntoStaticStr, IntoEnumIterator};

use crate::data::AttributeEntry;
use crate::math::Fixed;

/// Closed set of combat attributes.
///
/// Rates (hit, dodge, crit, …) are fractions where `1.0` is 100%.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    EnumCount,
    EnumIter,
    FromRepr,
    IntoStaticStr,
)]
#[repr(u8)]
pub enum AttributeKind {
    /// Attack power, drives damage and healing.
    Attack,
    /// Percent bonus applied to [`AttributeKind::Attack`].
    AttackPercent,
    /// Armor, reduces incoming damage.
    Armor,
    /// Percent bonus applied to [`AttributeKind::Armor`].
    ArmorPercent,
    /// Maximum health.
    MaxHp,
    /// Percent bonus applied to [`AttributeKind::MaxHp`].
    MaxHpPercent,
    /// Accuracy, offsets the defender's dodge.
    Hit,
    /// Chance to dodge hostile casts.
    Dodge,
    /// Chance to land a critical strike.
    Crit,
    /// Extra damage multiplier on critical strikes.
    CritBonus,
    /// Offsets the attacker's crit chance.
    Tenacity,
    /// Chance to block hostile casts.
    Block,
    /// Offsets the defender's block chance.
    Break,
    /// Fraction of the defender's armor ignored.
    IgnoreDefense,
    /// Outgoing damage multiplier bonus.
    DamageBonus,
    /// Outgoing healing multiplier bonus.
    HealBonus,
    /// Chance to land secondary effects.
    EffectHit,
    /// Resistance to secondary effects.
    EffectResist,
    /// Flat damage added after every multiplier.
    TrueDamage,
    /// Movement per round.
    MoveSpeed,
    /// Physical school damage bonus.
    PhysicalDamage,
    /// Fire school damage bonus.
    FireDamage,
    /// Frost school damage bonus.
    FrostDamage,
    /// Shadow school damage bonus.
    ShadowDamage,
    /// Physical school resistance.
    PhysicalResist,
    /// Fire school resistance.
    FireResist,
    /// Frost school resistance.
    FrostResist,
    /// Shadow school resistance.
    ShadowResist,
}

/// Number of attribute slots.
pub const ATTRIBUTE_COUNT: usize = AttributeKind::COUNT;

impl AttributeKind {
    /// Slot index of this attribute.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Resolve a raw slot index coming from data.
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        u8::try_from(index).ok().and_then(Self::from_repr)
    }

    /// The percent slot that scales this attribute, if any.
    #[must_use]
    pub const fn percent_companion(self) -> Option<Self> {
        match self {
            Self::Attack => Some(Self::AttackPercent),
            Self::Armor => Some(Self::ArmorPercent),
            Self::MaxHp => Some(Self::MaxHpPercent),
            _ => None,
        }
    }

    /// Display name.
    #[must_use]
    pub fn name(self) -> &'static str {
        self.into()
    }
}

/// Immutable copy of a manager's final values.
///
/// Spells and auras read attributes through snapshots so that the
/// combatant they came from can be mutated while the values are in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttSnapshot([Fixed; ATTRIBUTE_COUNT]);

impl AttSnapshot {
    /// Read one attribute.
    #[must_use]
    pub fn get(&self, kind: AttributeKind) -> Fixed {
        self.0[kind.index()]
    }
}

impl Default for AttSnapshot {
    fn default() -> Self {
        Self([Fixed::ZERO; ATTRIBUTE_COUNT])
    }
}

/// Base/final attribute arrays with queued additive deltas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttManager {
    base_id: Option<u32>,
    base: [Fixed; ATTRIBUTE_COUNT],
    deltas: [Fixed; ATTRIBUTE_COUNT],
    final_values: [Fixed; ATTRIBUTE_COUNT],
}

impl Default for AttManager {
    fn default() -> Self {
        Self::new()
    }
}

impl AttManager {
    /// Create a manager with every slot at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            base_id: None,
            base: [Fixed::ZERO; ATTRIBUTE_COUNT],
            deltas: [Fixed::ZERO; ATTRIBUTE_COUNT],
            final_values: [Fixed::ZERO; ATTRIBUTE_COUNT],
        }
    }

    /// Create a manager loaded from an attribute entry and calculated.
    #[must_use]
    pub fn from_entry(entry: &AttributeEntry) -> Self {
        let mut manager = Self::new();
        manager.reset(Some(entry));
        manager.calc_att();
        manager
    }

    /// Zero every slot and reload base values from `entry`.
    ///
    /// The final array is zeroed as well; call [`Self::calc_att`] afterwards.
    pub fn reset(&mut self, entry: Option<&AttributeEntry>) {
        self.base = [Fixed::ZERO; ATTRIBUTE_COUNT];
        self.deltas = [Fixed::ZERO; ATTRIBUTE_COUNT];
        self.final_values = [Fixed::ZERO; ATTRIBUTE_COUNT];
        self.base_id = entry.map(|e| e.id);

        if let Some(entry) = entry {
            for value in &entry.values {
                self.base[value.kind.index()] += value.value;
            }
        }
    }

    /// Id of the attribute entry the base values came from.
    #[must_use]
    pub const fn base_id(&self) -> Option<u32> {
        self.base_id
    }

    /// Queue an additive delta for a slot.
    pub fn mod_att_value(&mut self, kind: AttributeKind, delta: Fixed) {
        let slot = &mut self.deltas[kind.index()];
        *slot = slot.saturating_add(delta);
    }

    /// Overwrite a base slot.
    pub fn set_att_value(&mut self, kind: AttributeKind, value: Fixed) {
        self.base[kind.index()] = value;
    }

    /// [`Self::mod_att_value`] by raw slot index; out-of-range is a no-op.
    pub fn mod_att_value_raw(&mut self, index: usize, delta: Fixed) {
        if let Some(kind) = AttributeKind::from_index(index) {
            self.mod_att_value(kind, delta);
        }
    }

    /// [`Self::set_att_value`] by raw slot index; out-of-range is a no-op.
    pub fn set_att_value_raw(&mut self, index: usize, value: Fixed) {
        if let Some(kind) = AttributeKind::from_index(index) {
            self.set_att_value(kind, value);
        }
    }

    /// Merge another manager's final values into this manager's base array.
    pub fn mod_att_manager(&mut self, other: &AttManager) {
        for (slot, value) in self.base.iter_mut().zip(other.final_values.iter()) {
            *slot = slot.saturating_add(*value);
        }
    }

    /// Recompute the final array from base values and queued deltas.
    pub fn calc_att(&mut self) {
        for kind in AttributeKind::iter() {
            let i = kind.index();
            self.final_values[i] = self.base[i].saturating_add(self.deltas[i]);
        }

        // Percent companions are final before being applied, so the order
        // of the loop above does not matter.
        for kind in AttributeKind::iter() {
            if let Some(pct) = kind.percent_companion() {
                let scale = Fixed::ONE.saturating_add(self.final_values[pct.index()]);
                let i = kind.index();
                self.final_values[i] = self.final_values[i].saturating_mul(scale);
            }
        }
    }

    /// Base value of a slot.
    #[must_use]
    pub fn base_value(&self, kind: AttributeKind) -> Fixed {
        self.base[kind.index()]
    }

    /// Final value of a slot as of the last [`Self::calc_att`].
    #[must_use]
    pub fn get(&self, kind: AttributeKind) -> Fixed {
        self.final_values[kind.index()]
    }

    /// Copy of the final values.
    #[must_use]
    pub fn snapshot(&self) -> AttSnapshot {
        AttSnapshot(self.final_values)
    }

    /// Feed the final values into a hasher.
    pub fn hash_into<H: std::hash::Hasher>(&self, hasher: &mut H) {
        use std::hash::Hash;
        for value in &self.final_values {
            value.to_bits().hash(hasher);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::AttributeValue;
    use proptest::prelude::*;

    fn entry() -> AttributeEntry {
        AttributeEntry {
            id: 7,
            values: vec![
                AttributeValue::new(AttributeKind::Attack, Fixed::from_num(100)),
                AttributeValue::new(AttributeKind::MaxHp, Fixed::from_num(500)),
            ],
        }
    }

    #[test]
    fn test_reset_loads_base() {
        let mut att = AttManager::new();
        att.mod_att_value(AttributeKind::Armor, Fixed::from_num(3));
        att.reset(Some(&entry()));
        att.calc_att();

        assert_eq!(att.base_id(), Some(7));
        assert_eq!(att.get(AttributeKind::Attack), Fixed::from_num(100));
        assert_eq!(att.get(AttributeKind::MaxHp), Fixed::from_num(500));
        // Deltas queued before the reset are gone.
        assert_eq!(att.get(AttributeKind::Armor), Fixed::ZERO);
    }

    #[test]
    fn test_calc_att_is_idempotent() {
        let mut att = AttManager::from_entry(&entry());
        att.mod_att_value(AttributeKind::Attack, Fixed::from_num(20));
        att.calc_att();
        let first = att.snapshot();
        att.calc_att();
        assert_eq!(att.snapshot(), first);
        assert_eq!(att.get(AttributeKind::Attack), Fixed::from_num(120));
    }

    #[test]
    fn test_percent_companion_scales() {
        let mut att = AttManager::from_entry(&entry());
        att.mod_att_value(AttributeKind::AttackPercent, Fixed::from_num(0.5));
        att.calc_att();
        assert_eq!(att.get(AttributeKind::Attack), Fixed::from_num(150));
    }

    #[test]
    fn test_raw_index_out_of_range_is_noop() {
        let mut att = AttManager::from_entry(&entry());
        let before = att.clone();
        att.mod_att_value_raw(ATTRIBUTE_COUNT + 3, Fixed::from_num(10));
        att.set_att_value_raw(usize::MAX, Fixed::from_num(10));
        att.calc_att();
        assert_eq!(att, before);

        att.set_att_value_raw(AttributeKind::Armor.index(), Fixed::from_num(9));
        att.calc_att();
        assert_eq!(att.get(AttributeKind::Armor), Fixed::from_num(9));
    }

    #[test]
    fn test_mod_att_manager_merges_final_values() {
        let mut item = AttManager::new();
        item.set_att_value(AttributeKind::Attack, Fixed::from_num(10));
        item.set_att_value(AttributeKind::AttackPercent, Fixed::from_num(1));
        item.calc_att();
        // The item's own percent is applied to its own final Attack.
        assert_eq!(item.get(AttributeKind::Attack), Fixed::from_num(20));

        let mut owner = AttManager::from_entry(&entry());
        owner.mod_att_manager(&item);
        owner.calc_att();
        // 100 base + 20 from the item, then the merged +100% percent.
        assert_eq!(owner.get(AttributeKind::Attack), Fixed::from_num(240));
    }

    proptest! {
        /// Queued deltas sum commutatively.
        #[test]
        fn prop_deltas_commute(deltas in proptest::collection::vec(-1000i32..1000, 0..20)) {
            let kind = AttributeKind::Hit;
            let mut forward = AttManager::from_entry(&entry());
            let mut backward = AttManager::from_entry(&entry());
            let base = forward.base_value(kind);

            for d in &deltas {
                forward.mod_att_value(kind, Fixed::from_num(*d));
            }
            for d in deltas.iter().rev() {
                backward.mod_att_value(kind, Fixed::from_num(*d));
            }
            forward.calc_att();
            backward.calc_att();

            let sum: i32 = deltas.iter().sum();
            prop_assert_eq!(forward.get(kind), base + Fixed::from_num(sum));
            prop_assert_eq!(forward.snapshot(), backward.snapshot());
        }
    }
}

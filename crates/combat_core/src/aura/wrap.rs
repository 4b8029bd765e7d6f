//! Stacking resolution.
//!
//! When an aura is about to be applied, each aura already on the owner is
//! classified against it. The classification only looks at the ids, the
//! casters and static entry fields, so it is a pure function.

use crate::combatant::CombatantId;
use crate::data::AuraEntry;

/// Outcome of comparing a new aura against an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WrapResult {
    /// Intensify the existing instance.
    Wrap,
    /// Remove the existing instance and apply the new one.
    Replace,
    /// Keep both.
    Add,
    /// Reject the new one.
    Invalid,
}

/// The stacking-relevant view of an aura.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WrapCandidate {
    /// Aura entry id.
    pub aura_id: u32,
    /// Combatant that applied it.
    pub caster: CombatantId,
    /// Instances from different casters stack.
    pub multi_wrap: bool,
    /// Cross-family strength.
    pub effect_priority: i32,
}

impl WrapCandidate {
    /// Candidate for `entry` applied by `caster`.
    #[must_use]
    pub const fn from_entry(entry: &AuraEntry, caster: CombatantId) -> Self {
        Self {
            aura_id: entry.id,
            caster,
            multi_wrap: entry.multi_wrap,
            effect_priority: entry.effect_priority,
        }
    }

    /// Stacking family.
    #[must_use]
    pub const fn family(&self) -> u32 {
        self.aura_id / 100
    }

    /// Level within the family.
    #[must_use]
    pub const fn level(&self) -> u32 {
        self.aura_id % 100
    }

    /// Whether this aura beats `other`.
    ///
    /// Within one family the higher level wins; across families the larger
    /// absolute priority wins. Ties lose.
    #[must_use]
    pub const fn more_powerful_than(&self, other: &Self) -> bool {
        if self.family() == other.family() {
            self.level() > other.level()
        } else {
            self.effect_priority.unsigned_abs() > other.effect_priority.unsigned_abs()
        }
    }
}

/// Classify `new` against `existing`.
#[must_use]
pub const fn check_wrap_result(existing: &WrapCandidate, new: &WrapCandidate) -> WrapResult {
    let same_caster = existing.caster == new.caster;

    if existing.aura_id == new.aura_id {
        if same_caster || new.multi_wrap {
            return WrapResult::Wrap;
        }
        return WrapResult::Add;
    }

    if existing.family() == new.family() && (same_caster || new.multi_wrap) {
        if new.more_powerful_than(existing) {
            return WrapResult::Replace;
        }
        return WrapResult::Invalid;
    }

    WrapResult::Add
}

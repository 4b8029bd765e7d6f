//! Four-stage target resolution.
//!
//! Launch type fixes the anchor, target type seeds candidates, range type
//! drops candidates outside the shape, scope type filters by camp relation.
//! The result is sorted by id and truncated to the skill's target limit.

use crate::battlefield::Battlefield;
use crate::camp::CampId;
use crate::combatant::CombatantId;
use crate::data::{LaunchType, RangeType, ScopeType, SkillEntry, TargetType};
use crate::math::{fixed_cos_degrees, Fixed, Vec2Fixed};
use crate::state::UnitState;

/// Unit direction the caster is facing for directional shapes.
///
/// Toward the primary target when there is one at a distinct position,
/// otherwise toward the enemy side of the field.
#[must_use]
pub fn facing(bf: &Battlefield, caster: CombatantId, primary: Option<CombatantId>) -> Vec2Fixed {
    let Some(unit) = bf.unit(caster) else {
        return Vec2Fixed::UNIT_X;
    };
    let toward = primary
        .and_then(|id| bf.unit(id))
        .map(|target| target.position() - unit.position())
        .filter(|dir| *dir != Vec2Fixed::ZERO);
    match toward {
        Some(dir) => dir.normalize(),
        None => match unit.camp() {
            CampId::Attack => Vec2Fixed::UNIT_X,
            CampId::Defence => Vec2Fixed::new(-Fixed::ONE, Fixed::ZERO),
        },
    }
}

fn primary_target(
    bf: &Battlefield,
    caster: CombatantId,
    caster_camp: CampId,
    requested: Option<CombatantId>,
    kind: TargetType,
) -> Option<CombatantId> {
    let requested = requested.and_then(|id| bf.unit(id)).filter(|u| u.is_alive());
    let enemy_head = || bf.camp(caster_camp.other()).find_unit_by_head();
    match kind {
        TargetType::FriendlySingle => Some(
            requested
                .filter(|u| u.camp() == caster_camp)
                .map_or(caster, |u| u.id()),
        ),
        TargetType::EnemySingle => requested
            .filter(|u| u.camp() != caster_camp)
            .map(|u| u.id())
            .or_else(enemy_head),
        TargetType::SelectRound => requested.map(|u| u.id()).or_else(enemy_head),
        TargetType::SelfRound => Some(requested.map_or(caster, |u| u.id())),
    }
}

/// Whether `point` lies inside the skill's shape anchored at `anchor`.
///
/// A zero radius disables the geometric filter.
#[must_use]
pub fn in_shape(entry: &SkillEntry, anchor: Vec2Fixed, dir: Vec2Fixed, point: Vec2Fixed) -> bool {
    let radius = entry.range_radius;
    if radius <= Fixed::ZERO {
        return true;
    }
    let rel = point - anchor;
    match entry.range {
        RangeType::Circle => anchor.distance_squared(point) <= radius.saturating_mul(radius),
        RangeType::Rectangle => {
            let along = rel.dot(dir);
            let across = dir.cross(rel).abs();
            along >= Fixed::ZERO && along <= radius && across.saturating_mul_int(2) <= entry.range_width
        }
        RangeType::Fan => {
            if anchor.distance_squared(point) > radius.saturating_mul(radius) {
                return false;
            }
            if entry.range_angle >= 360 || rel == Vec2Fixed::ZERO {
                return true;
            }
            let cos_half = fixed_cos_degrees(entry.range_angle / 2);
            rel.dot(dir) >= rel.length() * cos_half
        }
    }
}

/// Resolve the target list of a cast.
///
/// Dead units never appear. Enemies with `UNTARGETABLE` never appear.
#[must_use]
pub fn find_target(
    bf: &Battlefield,
    caster: CombatantId,
    requested: Option<CombatantId>,
    entry: &SkillEntry,
) -> Vec<CombatantId> {
    let Some(caster_unit) = bf.unit(caster) else {
        return Vec::new();
    };
    let caster_camp = caster_unit.camp();
    let primary = primary_target(bf, caster, caster_camp, requested, entry.target);

    // Stage 1: launch point.
    let anchor = match entry.launch {
        LaunchType::Caster => caster_unit.position(),
        LaunchType::Target => primary
            .and_then(|id| bf.unit(id))
            .map_or(caster_unit.position(), |u| u.position()),
    };
    let dir = facing(bf, caster, primary);

    // Stage 2: seed.
    let candidates: Vec<&crate::combatant::Combatant> = match entry.target {
        TargetType::SelfRound | TargetType::SelectRound => {
            bf.units().filter(|u| u.is_alive()).collect()
        }
        TargetType::FriendlySingle | TargetType::EnemySingle => primary
            .and_then(|id| bf.unit(id))
            .filter(|u| u.is_alive())
            .into_iter()
            .collect(),
    };

    let mut targets: Vec<CombatantId> = candidates
        .into_iter()
        // Stage 3: shape.
        .filter(|u| in_shape(entry, anchor, dir, u.position()))
        // Stage 4: scope.
        .filter(|u| {
            let friendly = u.camp() == caster_camp;
            let is_primary = Some(u.id()) == primary;
            match entry.scope {
                ScopeType::SelectTarget => is_primary,
                ScopeType::FriendlyExceptTarget => friendly && !is_primary,
                ScopeType::AllFriendly => friendly,
                ScopeType::EnemyExceptTarget => !friendly && !is_primary,
                ScopeType::AllEnemy => !friendly,
            }
        })
        .filter(|u| u.camp() == caster_camp || !u.has_state(UnitState::UNTARGETABLE))
        .map(|u| u.id())
        .collect();

    targets.sort_unstable();
    if entry.max_targets > 0 {
        targets.truncate(entry.max_targets as usize);
    }
    targets
}

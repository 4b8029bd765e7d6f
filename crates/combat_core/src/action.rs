//! Per-combatant action AI.
//!
//! Each combatant owns an [`ActionController`] holding a queue of actions.
//! Once per tick [`update`] runs the head action; with an empty queue it
//! first decides what to do next:
//!
//! ```text
//! NoAction ──decide──► HasAction(Idle | Attack | Move) ──► Completed
//!     ▲                                                        │
//!     └────────────────────────── next decision ───────────────┘
//! ```
//!
//! A failing handler is logged and its action stays queued, so the next
//! tick retries it.

use std::collections::VecDeque;

use crate::attribute::AttributeKind;
use crate::battlefield::Battlefield;
use crate::combat_controller::cast_spell;
use crate::combatant::CombatantId;
use crate::error::{CombatError, Result};
use crate::math::{Fixed, Vec2Fixed};
use crate::spell::{can_cast, CastRequest};
use crate::state::UnitState;

/// What an action does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// Wait for a fixed number of ticks.
    Idle,
    /// Cast the best available skill on a target.
    Attack {
        /// Combatant to attack.
        target: CombatantId,
    },
    /// Walk toward a point.
    Move {
        /// Point to walk toward.
        destination: Vec2Fixed,
        /// Distance from the destination that counts as arrived.
        stop_within: Fixed,
    },
}

/// A queued action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Action {
    /// What the action does.
    pub kind: ActionKind,
    /// Times the handler has run.
    pub invocations: u32,
}

impl Action {
    /// New action that has not run yet.
    #[must_use]
    pub const fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            invocations: 0,
        }
    }
}

/// Controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActionState {
    /// Nothing queued yet.
    #[default]
    NoAction,
    /// An action is in progress.
    HasAction,
    /// The last action completed and nothing else is queued.
    Completed,
}

/// Queue of actions for one combatant.
#[derive(Debug, Clone, Default)]
pub struct ActionController {
    queue: VecDeque<Action>,
    state: ActionState,
}

impl ActionController {
    /// Create an empty controller.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            state: ActionState::NoAction,
        }
    }

    /// Queue an action at the back.
    pub fn push(&mut self, action: Action) {
        self.queue.push_back(action);
        self.state = ActionState::HasAction;
    }

    /// Queue an action to run before the current head.
    pub fn push_front(&mut self, action: Action) {
        self.queue.push_front(action);
        self.state = ActionState::HasAction;
    }

    /// Current head.
    #[must_use]
    pub fn front(&self) -> Option<&Action> {
        self.queue.front()
    }

    fn front_mut(&mut self) -> Option<&mut Action> {
        self.queue.front_mut()
    }

    /// Drop the head as completed.
    pub fn pop(&mut self) -> Option<Action> {
        let action = self.queue.pop_front();
        if self.queue.is_empty() {
            self.state = ActionState::Completed;
        }
        action
    }

    /// Drop every queued action.
    pub fn interrupt(&mut self) {
        self.queue.clear();
        self.state = ActionState::NoAction;
    }

    /// Whether nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Number of queued actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Controller state.
    #[must_use]
    pub const fn state(&self) -> ActionState {
        self.state
    }
}

/// Result of one handler invocation.
enum Step {
    Continue,
    Complete,
    Before(Action),
}

/// Run one tick of `id`'s AI.
///
/// Dead or stunned combatants do nothing.
pub fn update(bf: &mut Battlefield, id: CombatantId) {
    let Some(unit) = bf.unit(id) else {
        return;
    };
    if !unit.is_alive() || unit.has_state(UnitState::STUN) {
        return;
    }

    if unit.action().is_empty() {
        let action = decide(bf, id);
        if let Some(unit) = bf.unit_mut(id) {
            unit.action_mut().push(action);
        }
    }

    let Some(action) = bf.unit_mut(id).and_then(|u| {
        let head = u.action_mut().front_mut()?;
        head.invocations += 1;
        Some(*head)
    }) else {
        return;
    };

    let step = match action.kind {
        ActionKind::Idle => Ok(run_idle(bf, action)),
        ActionKind::Attack { target } => run_attack(bf, id, target),
        ActionKind::Move {
            destination,
            stop_within,
        } => run_move(bf, id, destination, stop_within),
    };

    let Some(unit) = bf.unit_mut(id) else {
        return;
    };
    match step {
        Ok(Step::Continue) => {}
        Ok(Step::Complete) => {
            unit.action_mut().pop();
        }
        Ok(Step::Before(next)) => unit.action_mut().push_front(next),
        Err(e) => {
            tracing::warn!(combatant = id, action = ?action.kind, error = %e, "action handler failed");
        }
    }
}

fn decide(bf: &Battlefield, id: CombatantId) -> Action {
    let enemy = bf
        .unit(id)
        .and_then(|u| bf.camp(u.camp().other()).find_unit_by_head());
    match enemy {
        Some(target) => Action::new(ActionKind::Attack { target }),
        None => Action::new(ActionKind::Idle),
    }
}

fn run_idle(bf: &Battlefield, action: Action) -> Step {
    if action.invocations >= bf.config().idle_repeat {
        Step::Complete
    } else {
        Step::Continue
    }
}

fn choose_skill(bf: &Battlefield, id: CombatantId, target: CombatantId) -> Option<u32> {
    let unit = bf.unit(id)?;
    let store = bf.store();
    let special = unit.skills().iter().copied().find(|skill_id| {
        store.skill(*skill_id).is_some_and(|entry| {
            !entry.basic
                && unit.skill_ready(entry.id)
                && can_cast(bf, entry, &CastRequest::new(id, entry.id, Some(target))).is_ok()
        })
    });
    special.or_else(|| unit.basic_skill())
}

fn run_attack(bf: &mut Battlefield, id: CombatantId, target: CombatantId) -> Result<Step> {
    if !bf.is_alive(target) {
        return Ok(Step::Complete);
    }
    let Some(skill_id) = choose_skill(bf, id, target) else {
        return Err(CombatError::InvalidState(format!(
            "combatant {id} has no castable skill"
        )));
    };
    let Some(unit) = bf.unit(id) else {
        return Ok(Step::Complete);
    };
    if !unit.skill_ready(skill_id) {
        return Ok(Step::Continue);
    }

    let cast_range = bf.store().skill(skill_id).map_or(Fixed::ZERO, |e| e.cast_range);
    if cast_range > Fixed::ZERO {
        let here = unit.position();
        let there = bf.unit(target).map_or(here, |t| t.position());
        if here.distance_squared(there) > cast_range.saturating_mul(cast_range) {
            // Approach slightly inside the range so fixed-point rounding cannot
            // leave the unit just outside it.
            let stop_within = cast_range.saturating_mul(Fixed::from_num(9)) / 10;
            return Ok(Step::Before(Action::new(ActionKind::Move {
                destination: there,
                stop_within,
            })));
        }
    }

    cast_spell(bf, CastRequest::new(id, skill_id, Some(target)))?;
    Ok(Step::Complete)
}

fn run_move(
    bf: &mut Battlefield,
    id: CombatantId,
    destination: Vec2Fixed,
    stop_within: Fixed,
) -> Result<Step> {
    let unit = bf.unit_mut(id).ok_or(CombatError::CombatantNotFound(id))?;
    if unit.has_state(UnitState::ROOT) {
        return Ok(Step::Continue);
    }
    let position = unit.position();
    let distance = position.distance(destination);
    if distance <= stop_within {
        return Ok(Step::Complete);
    }
    let speed = unit.att().get(AttributeKind::MoveSpeed);
    if speed <= Fixed::ZERO {
        return Err(CombatError::InvalidState(format!("combatant {id} cannot move")));
    }
    let remaining = distance - stop_within;
    let step = speed.min(remaining);
    unit.set_position(position.step_toward(destination, step));
    Ok(if remaining <= speed {
        Step::Complete
    } else {
        Step::Continue
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camp::CampId;
    use crate::combatant::UnitInfo;
    use crate::test_support::{document, duel, store, UNIT};

    #[test]
    fn test_attacks_enemy_head() {
        let (mut bf, attacker, defender) = duel(document());

        update(&mut bf, attacker);

        assert_eq!(bf.unit(defender).unwrap().hp(), 900);
        let unit = bf.unit(attacker).unwrap();
        assert!(unit.action().is_empty());
        assert_eq!(unit.action().state(), ActionState::Completed);
    }

    #[test]
    fn test_idles_without_enemies() {
        let (mut bf, attacker, defender) = duel(document());
        bf.apply_damage(defender, 5000);
        let repeat = bf.config().idle_repeat;

        for _ in 1..repeat {
            update(&mut bf, attacker);
        }
        let action = bf.unit(attacker).unwrap().action();
        assert_eq!(action.state(), ActionState::HasAction);
        assert_eq!(action.front().unwrap().kind, ActionKind::Idle);

        update(&mut bf, attacker);
        assert_eq!(
            bf.unit(attacker).unwrap().action().state(),
            ActionState::Completed
        );
    }

    #[test]
    fn test_stunned_and_dead_do_nothing() {
        let (mut bf, attacker, defender) = duel(document());
        bf.unit_mut(attacker).unwrap().add_state(UnitState::STUN);
        update(&mut bf, attacker);
        assert_eq!(bf.unit(defender).unwrap().hp(), 1000);
        assert_eq!(
            bf.unit(attacker).unwrap().action().state(),
            ActionState::NoAction
        );

        bf.apply_damage(defender, 5000);
        update(&mut bf, defender);
        assert!(bf.unit(defender).unwrap().action().is_empty());
    }

    #[test]
    fn test_walks_into_range_before_attacking() {
        let mut doc = document();
        doc.skills[0].cast_range = Fixed::from_num(4);
        let (mut bf, attacker, defender) = duel(doc);
        let start = bf.unit(attacker).unwrap().position();
        let goal = bf.unit(defender).unwrap().position();

        update(&mut bf, attacker);
        assert_eq!(bf.unit(defender).unwrap().hp(), 1000);
        assert_eq!(bf.unit(attacker).unwrap().action().len(), 2);

        for _ in 0..8 {
            update(&mut bf, attacker);
        }
        let position = bf.unit(attacker).unwrap().position();
        assert!(position.distance(goal) < Fixed::from_num(4));
        assert!(position.distance(start) > Fixed::ZERO);
        assert!(bf.unit(defender).unwrap().hp() < 1000);
    }

    #[test]
    fn test_rooted_unit_stays_put() {
        let mut doc = document();
        doc.skills[0].cast_range = Fixed::from_num(4);
        let (mut bf, attacker, _) = duel(doc);
        bf.unit_mut(attacker).unwrap().add_state(UnitState::ROOT);
        let start = bf.unit(attacker).unwrap().position();

        for _ in 0..5 {
            update(&mut bf, attacker);
        }
        assert_eq!(bf.unit(attacker).unwrap().position(), start);
    }

    #[test]
    fn test_failing_handler_keeps_action() {
        let mut doc = document();
        doc.skills[0].cast_range = Fixed::from_num(4);
        let mut bf = Battlefield::new(store(doc), 1);
        let slow = bf
            .add_unit(
                CampId::Attack,
                &UnitInfo::new(UNIT).with_attribute(AttributeKind::MoveSpeed, Fixed::ZERO),
            )
            .unwrap();
        bf.add_unit(CampId::Defence, &UnitInfo::new(UNIT)).unwrap();

        for _ in 0..3 {
            update(&mut bf, slow);
        }
        let action = bf.unit(slow).unwrap().action();
        assert_eq!(action.len(), 2);
        assert!(matches!(
            action.front().unwrap().kind,
            ActionKind::Move { .. }
        ));
        assert_eq!(action.front().unwrap().invocations, 2);
    }

    #[test]
    fn test_interrupt_clears_queue() {
        let mut controller = ActionController::new();
        controller.push(Action::new(ActionKind::Idle));
        controller.push(Action::new(ActionKind::Idle));
        controller.interrupt();
        assert!(controller.is_empty());
        assert_eq!(controller.state(), ActionState::NoAction);
    }
}

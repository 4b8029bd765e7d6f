//! Combat event records.
//!
//! Every resolved effect produces one [`CombatEvent`]. The scene buffers
//! them; whoever drives the scene drains and forwards them.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::combatant::CombatantId;
use crate::state::School;

bitflags! {
    /// Outcome flags attached to an event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct ResultFlags: u16 {
        /// The cast missed.
        const MISS = 1 << 0;
        /// The target dodged.
        const DODGE = 1 << 1;
        /// The target blocked.
        const BLOCK = 1 << 2;
        /// Critical strike.
        const CRIT = 1 << 3;
        /// The caster killed the target.
        const KILL = 1 << 4;
        /// The target died.
        const KILLED = 1 << 5;
        /// The target was immune.
        const IMMUNE = 1 << 6;
        /// Part of the amount was absorbed.
        const ABSORB = 1 << 7;
        /// Amount came from an aura rather than a cast.
        const PERIODIC = 1 << 8;
    }
}

/// What an event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// Health removed.
    Damage,
    /// Health restored.
    Heal,
    /// The cast did not land.
    Miss,
    /// Queued actions cancelled.
    Interrupt,
    /// Target pulled.
    Gather,
    /// Aura applied or wrapped.
    AuraApplied,
    /// Aura removed.
    AuraRemoved,
    /// Camp energy changed.
    Energy,
}

/// One resolved effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CombatEvent {
    /// Round the effect resolved in.
    pub round: u32,
    /// What happened.
    pub kind: EventKind,
    /// Damage school.
    pub school: School,
    /// Amount (health, energy, aura id for aura events).
    pub amount: i64,
    /// Skill or aura entry that produced the effect.
    pub spell_id: u32,
    /// Source combatant.
    pub caster: CombatantId,
    /// Affected combatant.
    pub target: CombatantId,
    /// Outcome flags.
    pub flags: ResultFlags,
}

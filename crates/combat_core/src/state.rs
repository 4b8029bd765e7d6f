//! Combatant state and immunity flags.
//!
//! States (stunned, silenced, …) and immunities are toggled by auras. Two
//! auras may set the same bit, so each bit is reference-counted: removing one
//! aura's stun never clears a stun still held by another.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Combatant state bitset.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct UnitState: u32 {
        /// Health reached zero. Terminal.
        const DEAD = 1 << 0;
        /// Cannot act or cast.
        const STUN = 1 << 1;
        /// Cannot cast non-basic skills.
        const SILENCE = 1 << 2;
        /// Cannot move.
        const ROOT = 1 << 3;
        /// Forced to attack its taunter.
        const TAUNT = 1 << 4;
        /// Takes no damage.
        const INVINCIBLE = 1 << 5;
        /// Cannot be selected by enemy casts.
        const UNTARGETABLE = 1 << 6;
    }
}

/// Mechanic a spell effect or aura belongs to, used for immunity checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mechanic {
    /// Stuns.
    Stun,
    /// Silences.
    Silence,
    /// Roots.
    Root,
    /// Displacement (gather, knockback).
    Displace,
    /// Interrupts.
    Interrupt,
    /// Damage over time.
    Bleed,
    /// Poisons.
    Poison,
    /// Dispels.
    Dispel,
    /// Direct damage.
    Damage,
}

bitflags! {
    /// Set of mechanics a combatant is immune to.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct MechanicFlags: u32 {
        /// See [`Mechanic::Stun`].
        const STUN = 1 << 0;
        /// See [`Mechanic::Silence`].
        const SILENCE = 1 << 1;
        /// See [`Mechanic::Root`].
        const ROOT = 1 << 2;
        /// See [`Mechanic::Displace`].
        const DISPLACE = 1 << 3;
        /// See [`Mechanic::Interrupt`].
        const INTERRUPT = 1 << 4;
        /// See [`Mechanic::Bleed`].
        const BLEED = 1 << 5;
        /// See [`Mechanic::Poison`].
        const POISON = 1 << 6;
        /// See [`Mechanic::Dispel`].
        const DISPEL = 1 << 7;
        /// See [`Mechanic::Damage`].
        const DAMAGE = 1 << 8;
    }
}

impl Mechanic {
    /// Immunity bit for this mechanic.
    #[must_use]
    pub const fn flag(self) -> MechanicFlags {
        match self {
            Self::Stun => MechanicFlags::STUN,
            Self::Silence => MechanicFlags::SILENCE,
            Self::Root => MechanicFlags::ROOT,
            Self::Displace => MechanicFlags::DISPLACE,
            Self::Interrupt => MechanicFlags::INTERRUPT,
            Self::Bleed => MechanicFlags::BLEED,
            Self::Poison => MechanicFlags::POISON,
            Self::Dispel => MechanicFlags::DISPEL,
            Self::Damage => MechanicFlags::DAMAGE,
        }
    }
}

/// Damage school.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum School {
    /// Physical.
    #[default]
    Physical,
    /// Fire.
    Fire,
    /// Frost.
    Frost,
    /// Shadow.
    Shadow,
}

/// Reference-counted bitset.
///
/// Each of the 32 bits keeps a counter; the bit is set while its counter is
/// positive.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FlagCounter {
    counts: [u16; 32],
    bits: u32,
}

impl FlagCounter {
    /// Increment every bit in `bits`.
    pub fn add(&mut self, bits: u32) {
        for i in 0..32 {
            if bits & (1 << i) != 0 {
                self.counts[i] = self.counts[i].saturating_add(1);
                self.bits |= 1 << i;
            }
        }
    }

    /// Decrement every bit in `bits`.
    pub fn remove(&mut self, bits: u32) {
        for i in 0..32 {
            if bits & (1 << i) != 0 {
                self.counts[i] = self.counts[i].saturating_sub(1);
                if self.counts[i] == 0 {
                    self.bits &= !(1 << i);
                }
            }
        }
    }

    /// Current bitset.
    #[must_use]
    pub const fn bits(&self) -> u32 {
        self.bits
    }

    /// Clear every counter.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

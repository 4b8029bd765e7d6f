//! # Combat Core
//!
//! Deterministic combat resolution for the battle server.
//!
//! This crate contains **only** combat logic:
//! - No networking
//! - No IO beyond parsing data tables handed to it
//! - No system randomness (every roll comes from a per-scene seed)
//! - No floating-point math (uses fixed-point)
//!
//! A [`scene::Scene`] owns a [`battlefield::Battlefield`] holding two
//! [`camp::Camp`]s of [`combatant::Combatant`]s. Each round every living
//! combatant runs its [`action::ActionController`], which casts skills
//! through [`combat_controller::cast_spell`]. Casts resolve effects and
//! apply [`aura`]s, all driven by the read-only [`data::DataStore`].
//!
//! ## Crate Structure
//!
//! - [`data`] - Static tables and their RON loader
//! - [`attribute`] - Per-combatant attribute manager
//! - [`aura`] - Buffs, debuffs and their triggers
//! - [`spell`] - Cast pipeline, targeting and the damage formula
//! - [`scene`] - Scene lifecycle and the round tick
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod action;
pub mod attribute;
pub mod aura;
pub mod battlefield;
pub mod camp;
pub mod combat_controller;
pub mod combatant;
pub mod data;
pub mod error;
pub mod events;
pub mod math;
pub mod pool;
pub mod rng;
pub mod scene;
pub mod spell;
pub mod state;

#[cfg(test)]
mod test_support;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::attribute::{AttManager, AttributeKind};
    pub use crate::battlefield::Battlefield;
    pub use crate::camp::CampId;
    pub use crate::combat_controller::cast_spell;
    pub use crate::combatant::{Combatant, CombatantId, UnitInfo};
    pub use crate::data::{DataDocument, DataStore, GlobalConfig};
    pub use crate::error::{CastError, CombatError, Result};
    pub use crate::events::{CombatEvent, EventKind, ResultFlags};
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::scene::{
        EndReason, Scene, SceneId, SceneOutcome, SceneReport, SceneSetup, SceneState,
    };
    pub use crate::spell::{CastOutcome, CastRequest};
}

//! Error types for the combat engine.

use thiserror::Error;

use crate::combatant::CombatantId;

/// Result type alias using [`CombatError`].
pub type Result<T> = std::result::Result<T, CombatError>;

/// Top-level error type for all combat engine errors.
#[derive(Debug, Error)]
pub enum CombatError {
    /// A static data entry referenced by id does not exist.
    #[error("Missing {table} entry: {id}")]
    MissingData {
        /// Name of the data table.
        table: &'static str,
        /// Identifier that was looked up.
        id: u32,
    },

    /// A combatant could not be constructed from its unit entry.
    #[error("Invalid unit entry {type_id}: {reason}")]
    InvalidUnit {
        /// Unit type id from the roster.
        type_id: u32,
        /// Why construction failed.
        reason: String,
    },

    /// Invalid combatant reference.
    #[error("Combatant not found: {0}")]
    CombatantNotFound(CombatantId),

    /// Data file parsing error.
    #[error("Failed to parse data '{source_name}': {message}")]
    DataParseError {
        /// Name of the source that failed to parse.
        source_name: String,
        /// Error message.
        message: String,
    },

    /// A cast was rejected before it produced any effect.
    #[error("Cast rejected: {0}")]
    CastRejected(#[from] CastError),

    /// Invalid engine state.
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

/// Reasons a cast is rejected by the precondition checks.
///
/// A rejected cast performs no state mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CastError {
    /// The caster is dead or missing.
    #[error("caster cannot act")]
    CasterUnavailable,
    /// The caster carries a state that forbids this skill.
    #[error("caster state forbids skill {0}")]
    CasterStateForbidden(u32),
    /// The target carries a state that forbids this skill.
    #[error("target state forbids skill {0}")]
    TargetStateForbidden(u32),
    /// A required aura is absent, or a forbidden aura is present.
    #[error("aura state gate failed for skill {0}")]
    AuraStateFailed(u32),
    /// The skill is still cooling down.
    #[error("skill {0} is cooling down")]
    CoolingDown(u32),
    /// The camp cannot pay the energy cost.
    #[error("not enough energy for skill {0}")]
    NotEnoughEnergy(u32),
    /// The combatant already issued the maximum number of casts this tick.
    #[error("cast capacity reached")]
    CapacityExceeded,
    /// The skill needs a target and none is available.
    #[error("skill {0} has no valid target")]
    NoTarget(u32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CombatError::MissingData {
            table: "skill",
            id: 42,
        };
        assert_eq!(err.to_string(), "Missing skill entry: 42");

        let err: CombatError = CastError::CapacityExceeded.into();
        assert_eq!(err.to_string(), "Cast rejected: cast capacity reached");
    }
}

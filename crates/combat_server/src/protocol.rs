//! JSON protocol for combat requests.
//!
//! The server binary reads JSON lines (one object per line) on stdin and
//! answers each request with one JSON line on stdout once its scene ends.
//!
//! # Example Session
//!
//! ```text
//! -> {"scene_type":1,"attacker_id":10,"defender_id":0,"attackers":[{"type_id":1,"level":5}],"defenders":[],"unit_group":1}
//! <- {"type":"started","scene_id":1,"attacker_id":10,"defender_id":0}
//! <- {"type":"result","scene_id":1,"scene_type":1,"attacker_id":10,"defender_id":0,"attacker_win":true,"rounds":41}
//! -> {"scene_type":1,"attacker_id":10,"defender_id":0,"attackers":[],"defenders":[]}
//! <- {"type":"rejected","attacker_id":10,"defender_id":0,"reason":"..."}
//! ```
//!
//! Positions and attribute values are decimals on the wire and are
//! converted to fixed-point once, when the request is accepted.

use combat_core::attribute::AttributeKind;
use combat_core::combatant::UnitInfo;
use combat_core::math::{Fixed, Vec2Fixed};
use combat_core::scene::{SceneId, SceneOutcome, SceneSetup};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ServerError};

// ============================================================================
// Requests
// ============================================================================

/// Attribute override on a roster slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeOverride {
    /// Attribute to overwrite.
    pub kind: AttributeKind,
    /// New base value.
    pub value: f64,
}

/// One roster slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitRequest {
    /// Unit entry id.
    pub type_id: u32,
    /// Level.
    #[serde(default = "default_level")]
    pub level: u32,
    /// Spawn X; the formation is used unless both coordinates are given.
    #[serde(default)]
    pub x: Option<f64>,
    /// Spawn Y.
    #[serde(default)]
    pub y: Option<f64>,
    /// Base value overrides.
    #[serde(default)]
    pub attributes: Vec<AttributeOverride>,
    /// Equipped item ids.
    #[serde(default)]
    pub items: Vec<u32>,
}

fn default_level() -> u32 {
    1
}

/// Request to start one combat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatRequest {
    /// Game-defined scene type.
    pub scene_type: u32,
    /// External id of the attacking party.
    pub attacker_id: u64,
    /// External id of the defending party.
    pub defender_id: u64,
    /// Attack camp roster.
    #[serde(default)]
    pub attackers: Vec<UnitRequest>,
    /// Defence camp roster.
    #[serde(default)]
    pub defenders: Vec<UnitRequest>,
    /// NPC wave joining the defence camp.
    #[serde(default)]
    pub unit_group: Option<u32>,
    /// Random seed.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn to_fixed(what: &str, value: f64) -> Result<Fixed> {
    Fixed::checked_from_num(value)
        .filter(|_| value.is_finite())
        .ok_or_else(|| ServerError::InvalidRequest(format!("{what} {value} out of range")))
}

impl UnitRequest {
    /// Convert to a roster slot.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::InvalidRequest`] if a decimal does not fit
    /// the fixed-point range.
    pub fn to_unit_info(&self) -> Result<UnitInfo> {
        let mut info = UnitInfo::new(self.type_id).with_level(self.level);
        if let (Some(x), Some(y)) = (self.x, self.y) {
            info = info.at(Vec2Fixed::new(to_fixed("x", x)?, to_fixed("y", y)?));
        }
        for attribute in &self.attributes {
            info = info.with_attribute(attribute.kind, to_fixed("attribute", attribute.value)?);
        }
        for item in &self.items {
            info = info.with_item(*item);
        }
        Ok(info)
    }
}

impl CombatRequest {
    /// Convert to a scene setup.
    ///
    /// # Errors
    ///
    /// See [`UnitRequest::to_unit_info`].
    pub fn to_setup(&self) -> Result<SceneSetup> {
        Ok(SceneSetup {
            scene_type: self.scene_type,
            attacker_id: self.attacker_id,
            defender_id: self.defender_id,
            attackers: self
                .attackers
                .iter()
                .map(UnitRequest::to_unit_info)
                .collect::<Result<_>>()?,
            defenders: self
                .defenders
                .iter()
                .map(UnitRequest::to_unit_info)
                .collect::<Result<_>>()?,
            unit_group: self.unit_group,
            seed: self.seed,
        })
    }
}

// ============================================================================
// Responses
// ============================================================================

/// Lines written back for a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CombatResponse {
    /// The scene was accepted and is running.
    Started {
        /// Allocated scene id.
        scene_id: SceneId,
        /// Echoed attacker id.
        attacker_id: u64,
        /// Echoed defender id.
        defender_id: u64,
    },
    /// The scene reached a verdict.
    Result {
        /// Scene id.
        scene_id: SceneId,
        /// Echoed scene type.
        scene_type: u32,
        /// Echoed attacker id.
        attacker_id: u64,
        /// Echoed defender id.
        defender_id: u64,
        /// Whether the attacker won.
        attacker_win: bool,
        /// Rounds played.
        rounds: u32,
    },
    /// The request never became a scene.
    Rejected {
        /// Echoed attacker id.
        attacker_id: u64,
        /// Echoed defender id.
        defender_id: u64,
        /// Why.
        reason: String,
    },
    /// The scene stopped without a verdict.
    Failed {
        /// Scene id.
        scene_id: SceneId,
        /// Why.
        reason: String,
    },
}

impl CombatResponse {
    /// Result line for a finished scene.
    #[must_use]
    pub const fn result(request: &CombatRequest, scene_id: SceneId, outcome: SceneOutcome) -> Self {
        Self::Result {
            scene_id,
            scene_type: request.scene_type,
            attacker_id: request.attacker_id,
            defender_id: request.defender_id,
            attacker_win: outcome.attacker_win,
            rounds: outcome.rounds,
        }
    }

    /// Encode as one JSON line (without the newline).
    #[must_use]
    pub fn to_line(&self) -> String {
        // Plain data with string keys only; serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use combat_core::scene::EndReason;

    #[test]
    fn test_request_defaults() {
        let request: CombatRequest = serde_json::from_str(
            r#"{"scene_type":2,"attacker_id":7,"defender_id":0,"attackers":[{"type_id":1}],"unit_group":1}"#,
        )
        .unwrap();

        let setup = request.to_setup().unwrap();
        assert_eq!(setup.attackers, vec![UnitInfo::new(1)]);
        assert!(setup.defenders.is_empty());
        assert_eq!(setup.unit_group, Some(1));
        assert_eq!(setup.seed, None);
    }

    #[test]
    fn test_unit_conversion() {
        let unit: UnitRequest = serde_json::from_str(
            r#"{"type_id":2,"level":4,"x":-3.5,"y":2,"attributes":[{"kind":"Armor","value":50}],"items":[9001]}"#,
        )
        .unwrap();

        let info = unit.to_unit_info().unwrap();
        assert_eq!(info.level, 4);
        assert_eq!(
            info.position,
            Some(Vec2Fixed::new(Fixed::from_num(-3.5), Fixed::from_num(2)))
        );
        assert_eq!(info.attributes[0].kind, AttributeKind::Armor);
        assert_eq!(info.attributes[0].value, Fixed::from_num(50));
        assert_eq!(info.items, vec![9001]);
    }

    #[test]
    fn test_single_coordinate_uses_formation() {
        let unit: UnitRequest = serde_json::from_str(r#"{"type_id":2,"x":1.0}"#).unwrap();
        assert_eq!(unit.to_unit_info().unwrap().position, None);
    }

    #[test]
    fn test_out_of_range_decimal_rejected() {
        let unit: UnitRequest = serde_json::from_str(r#"{"type_id":2,"x":1e300,"y":0}"#).unwrap();
        assert!(matches!(
            unit.to_unit_info(),
            Err(ServerError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_result_line() {
        let request = CombatRequest {
            scene_type: 3,
            attacker_id: 10,
            defender_id: 20,
            attackers: Vec::new(),
            defenders: Vec::new(),
            unit_group: None,
            seed: None,
        };
        let outcome = SceneOutcome {
            attacker_win: true,
            rounds: 12,
            reason: EndReason::Eliminated,
        };

        let line = CombatResponse::result(&request, 5, outcome).to_line();
        assert_eq!(
            line,
            r#"{"type":"result","scene_id":5,"scene_type":3,"attacker_id":10,"defender_id":20,"attacker_win":true,"rounds":12}"#
        );
    }
}

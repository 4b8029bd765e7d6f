//! Offline scene runs.
//!
//! Runs one scene to completion without a server, for balance checks on a
//! data file.

use std::str::FromStr;
use std::sync::Arc;

use combat_core::camp::CampId;
use combat_core::combatant::{CombatantId, UnitInfo};
use combat_core::data::DataStore;
use combat_core::events::EventKind;
use combat_core::scene::{Scene, SceneReport, SceneSetup};
use serde::Serialize;

use crate::error::{Result, ToolError};

/// `TYPE` or `TYPE:LEVEL` unit argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitSpec {
    /// Unit entry id.
    pub type_id: u32,
    /// Level.
    pub level: u32,
}

impl FromStr for UnitSpec {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || ToolError::InvalidUnitSpec(s.to_string());
        let (type_part, level_part) = match s.split_once(':') {
            Some((t, l)) => (t, Some(l)),
            None => (s, None),
        };
        let type_id = type_part.trim().parse().map_err(|_| invalid())?;
        let level = match level_part {
            Some(l) => l.trim().parse().map_err(|_| invalid())?,
            None => 1,
        };
        if level == 0 {
            return Err(invalid());
        }
        Ok(Self { type_id, level })
    }
}

impl UnitSpec {
    /// Roster slot at the formation position.
    #[must_use]
    pub const fn to_unit_info(self) -> UnitInfo {
        UnitInfo::new(self.type_id).with_level(self.level)
    }
}

/// Damage and healing per camp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CampTotals {
    /// Damage dealt by the camp's units.
    pub damage_dealt: i64,
    /// Healing done by the camp's units.
    pub healing_done: i64,
    /// Hits that were critical.
    pub crits: u32,
}

/// What an offline run produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimulationSummary {
    /// Final scene report.
    pub report: SceneReport,
    /// Attack camp totals.
    pub attack: CampTotals,
    /// Defence camp totals.
    pub defence: CampTotals,
}

/// Run `setup` to completion on `store`.
///
/// Stops after the data set's round limit even if the scene somehow did
/// not end by itself.
///
/// # Errors
///
/// Returns an error if the setup is rejected or a tick fails.
pub fn simulate(store: Arc<DataStore>, setup: &SceneSetup) -> Result<SimulationSummary> {
    let max_rounds = store.config().max_rounds;
    let mut scene = Scene::build(store, 1, setup)?;
    scene.start()?;

    let mut attack = CampTotals::default();
    let mut defence = CampTotals::default();
    let camp_of = |scene: &Scene, id: CombatantId| scene.battlefield().unit(id).map(|u| u.camp());

    for _ in 0..=max_rounds {
        let done = scene.update()?.is_some();
        for event in scene.drain_events() {
            let totals = match camp_of(&scene, event.caster) {
                Some(CampId::Attack) => &mut attack,
                Some(CampId::Defence) => &mut defence,
                None => continue,
            };
            match event.kind {
                EventKind::Damage => {
                    totals.damage_dealt += event.amount;
                    if event.flags.contains(combat_core::events::ResultFlags::CRIT) {
                        totals.crits += 1;
                    }
                }
                EventKind::Heal => totals.healing_done += event.amount,
                _ => {}
            }
        }
        if done {
            break;
        }
    }

    tracing::info!(
        rounds = scene.round(),
        attack_damage = attack.damage_dealt,
        defence_damage = defence.damage_dealt,
        "offline scene finished"
    );
    Ok(SimulationSummary {
        report: scene.report(),
        attack,
        defence,
    })
}

/// Render a summary as pretty RON.
///
/// # Errors
///
/// Returns [`ToolError::Render`] if serialization fails.
pub fn render(summary: &SimulationSummary) -> Result<String> {
    ron::ser::to_string_pretty(summary, ron::ser::PrettyConfig::default())
        .map_err(|e| ToolError::Render(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use combat_test_utils::fixtures::{sample_store, wolf_pack_setup, KNIGHT};

    #[test]
    fn test_unit_spec_parsing() {
        assert_eq!(
            "1".parse::<UnitSpec>().unwrap(),
            UnitSpec {
                type_id: 1,
                level: 1
            }
        );
        assert_eq!(
            "101:7".parse::<UnitSpec>().unwrap(),
            UnitSpec {
                type_id: 101,
                level: 7
            }
        );
        assert!("knight".parse::<UnitSpec>().is_err());
        assert!("1:0".parse::<UnitSpec>().is_err());
        assert!("1:".parse::<UnitSpec>().is_err());
    }

    #[test]
    fn test_wolf_pack_run() {
        let summary = simulate(sample_store(), &wolf_pack_setup(3)).unwrap();

        let outcome = summary.report.outcome.unwrap();
        assert!(outcome.attacker_win);
        assert!(summary.attack.damage_dealt > 0);
        assert!(summary.report.deaths.len() >= 3);

        let text = render(&summary).unwrap();
        assert!(text.contains("attacker_win: true"));
    }

    #[test]
    fn test_rejected_setup_is_an_error() {
        let setup = SceneSetup {
            attackers: vec![UnitSpec {
                type_id: KNIGHT,
                level: 1,
            }
            .to_unit_info()],
            ..SceneSetup::default()
        };
        assert!(matches!(
            simulate(sample_store(), &setup),
            Err(ToolError::Combat(_))
        ));
    }
}

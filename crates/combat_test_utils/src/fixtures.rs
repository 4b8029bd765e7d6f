//! Test fixtures and helpers.
//!
//! The sample data set shipped in `data/combat.ron` plus pre-built
//! rosters, so every crate tests against the same units.

use std::sync::Arc;

use combat_core::data::{DataDocument, DataStore};
use combat_core::math::Vec2Fixed;
use combat_core::scene::{Scene, SceneId, SceneOutcome, SceneSetup};
use combat_core::combatant::UnitInfo;
use fixed::types::I32F32;

/// Sample data set, as authored.
pub const SAMPLE_DATA: &str = include_str!("../../../data/combat.ron");

/// Knight hero: melee, blocks, camp rally skill.
pub const KNIGHT: u32 = 1;
/// Ranger hero: long range, area volley.
pub const RANGER: u32 = 2;
/// Wolf creature.
pub const WOLF: u32 = 101;
/// Ghoul creature with a poison skill.
pub const GHOUL: u32 = 102;
/// Three level-1 wolves.
pub const WOLF_PACK: u32 = 1;
/// A ghoul and two wolves.
pub const GHOUL_NEST: u32 = 2;
/// Longsword item.
pub const LONGSWORD: u32 = 9001;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In combat code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// Parse the sample data into an editable document.
///
/// # Panics
///
/// Panics if the sample data does not parse.
#[must_use]
pub fn sample_document() -> DataDocument {
    ron::from_str(SAMPLE_DATA).expect("sample data parses")
}

/// The sample data as a shared store.
///
/// # Panics
///
/// Panics if the sample data does not parse.
#[must_use]
pub fn sample_store() -> Arc<DataStore> {
    store_from(sample_document())
}

/// Wrap an edited document into a shared store.
///
/// # Panics
///
/// Panics on duplicate ids.
#[must_use]
pub fn store_from(document: DataDocument) -> Arc<DataStore> {
    Arc::new(DataStore::from_document(document).expect("valid fixture data"))
}

/// Hero roster slot at `level`, positioned by the formation.
#[must_use]
pub fn hero(type_id: u32, level: u32) -> UnitInfo {
    UnitInfo::new(type_id).with_level(level)
}

/// Knight and ranger attacking a knight and ranger.
#[must_use]
pub fn duel_setup(seed: u64) -> SceneSetup {
    SceneSetup {
        scene_type: 1,
        attacker_id: 1,
        defender_id: 2,
        attackers: vec![hero(KNIGHT, 5).with_item(LONGSWORD), hero(RANGER, 5)],
        defenders: vec![hero(KNIGHT, 5), hero(RANGER, 5)],
        unit_group: None,
        seed: Some(seed),
    }
}

/// Two level-10 heroes attacking the wolf pack.
#[must_use]
pub fn wolf_pack_setup(seed: u64) -> SceneSetup {
    SceneSetup {
        scene_type: 2,
        attacker_id: 1,
        defender_id: 0,
        attackers: vec![
            hero(KNIGHT, 10).at(Vec2Fixed::from_ints(-4, 0)),
            hero(RANGER, 10).at(Vec2Fixed::from_ints(-8, 0)),
        ],
        defenders: Vec::new(),
        unit_group: Some(WOLF_PACK),
        seed: Some(seed),
    }
}

/// Build and start a scene.
///
/// # Panics
///
/// Panics if the setup is rejected.
#[must_use]
pub fn started_scene(store: Arc<DataStore>, id: SceneId, setup: &SceneSetup) -> Scene {
    let mut scene = Scene::build(store, id, setup).expect("scene builds");
    scene.start().expect("scene starts");
    scene
}

/// Tick a started scene until it completes or `max_ticks` pass.
///
/// # Panics
///
/// Panics if a tick fails.
pub fn run_to_completion(scene: &mut Scene, max_ticks: u32) -> Option<SceneOutcome> {
    for _ in 0..max_ticks {
        if let Some(outcome) = scene.update().expect("tick") {
            tracing::debug!(scene = scene.id(), rounds = outcome.rounds, "fixture scene done");
            return Some(outcome);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_data_is_consistent() {
        let store = sample_store();
        assert!(store.validate().is_empty(), "{:?}", store.validate());
        assert!(store.unit(KNIGHT).is_some());
        assert!(store.unit_group(GHOUL_NEST).is_some());
    }

    #[test]
    fn test_fixture_setups_build() {
        let store = sample_store();
        assert!(Scene::build(Arc::clone(&store), 1, &duel_setup(1)).is_ok());
        assert!(Scene::build(store, 2, &wolf_pack_setup(1)).is_ok());
    }
}

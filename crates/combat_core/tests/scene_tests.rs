//! End-to-end scene tests against the sample data set.
//!
//! These run whole scenes through the public API and check the properties
//! every finished scene must have, rather than exact damage numbers.

use std::collections::BTreeSet;
use std::sync::Arc;

use combat_core::prelude::*;
use combat_test_utils::fixtures::{
    duel_setup, hero, run_to_completion, sample_document, sample_store, started_scene,
    store_from, wolf_pack_setup, GHOUL_NEST, KNIGHT, RANGER, WOLF,
};

// =============================================================================
// Outcomes
// =============================================================================

mod outcomes {
    use super::*;

    #[test]
    fn test_heroes_clear_wolf_pack() {
        let mut scene = started_scene(sample_store(), 1, &wolf_pack_setup(3));
        let outcome = run_to_completion(&mut scene, 300).expect("scene finishes");

        assert!(outcome.attacker_win);
        assert_eq!(outcome.reason, EndReason::Eliminated);
        assert_eq!(scene.battlefield().camp(CampId::Defence).alive_count(), 0);
        assert_eq!(scene.state(), SceneState::Completed);
    }

    #[test]
    fn test_round_limit_ends_in_defender_favour() {
        let mut document = sample_document();
        document.config.max_rounds = 5;
        let mut scene = started_scene(store_from(document), 1, &duel_setup(1));

        let outcome = run_to_completion(&mut scene, 10).expect("scene finishes");

        assert!(!outcome.attacker_win);
        assert_eq!(outcome.reason, EndReason::RoundLimit);
        assert_eq!(outcome.rounds, 5);
    }

    #[test]
    fn test_lone_creature_loses_to_heroes() {
        let setup = SceneSetup {
            attackers: vec![hero(KNIGHT, 20), hero(RANGER, 20)],
            defenders: vec![UnitInfo::new(WOLF)],
            seed: Some(8),
            ..SceneSetup::default()
        };
        let mut scene = started_scene(sample_store(), 1, &setup);
        let outcome = run_to_completion(&mut scene, 300).expect("scene finishes");

        assert!(outcome.attacker_win);
        let report = scene.report();
        assert_eq!(report.deaths.len(), 1);
        assert_eq!(report.survivors.len(), 2);
    }

    #[test]
    fn test_aborted_scene_stops_ticking() {
        let mut scene = started_scene(sample_store(), 1, &duel_setup(1));
        scene.update().unwrap();
        scene.abort();

        assert!(scene.update().is_err());
        assert_eq!(scene.report().state, SceneState::Aborted);
        assert!(scene.report().outcome.is_none());
    }
}

// =============================================================================
// Invariants over a whole scene
// =============================================================================

mod invariants {
    use super::*;

    fn check_tick(scene: &Scene, energy_max: i32) {
        let bf = scene.battlefield();
        for camp in CampId::ALL {
            let camp = bf.camp(camp);
            let alive = camp.units().filter(|u| u.is_alive()).count();
            assert_eq!(alive, camp.alive_count());
            assert!(camp.energy() >= 0 && camp.energy() <= energy_max);

            let deaths: BTreeSet<_> = camp.deaths().iter().copied().collect();
            assert_eq!(deaths.len(), camp.deaths().len(), "death recorded twice");
            assert_eq!(deaths.len() + alive, camp.len());
        }
        for unit in bf.units() {
            assert!(unit.hp() >= 0 && unit.hp() <= unit.max_hp());
            assert_eq!(unit.is_alive(), unit.hp() > 0);
        }
    }

    #[test]
    fn test_state_stays_consistent_every_tick() {
        let store = sample_store();
        let energy_max = store.config().energy_max;
        let setup = SceneSetup {
            attackers: vec![hero(KNIGHT, 6), hero(RANGER, 6)],
            defenders: Vec::new(),
            unit_group: Some(GHOUL_NEST),
            seed: Some(21),
            ..SceneSetup::default()
        };
        let mut scene = started_scene(store, 1, &setup);

        for _ in 0..300 {
            let done = scene.update().unwrap().is_some();
            check_tick(&scene, energy_max);
            if done {
                break;
            }
        }
    }

    #[test]
    fn test_events_are_stamped_with_their_round() {
        let mut scene = started_scene(sample_store(), 1, &duel_setup(4));
        // Passive auras applied by `start` belong to round 0.
        assert!(scene.drain_events().iter().all(|e| e.round == 0));
        for _ in 0..40 {
            scene.update().unwrap();
            let round = scene.round();
            for event in scene.drain_events() {
                assert_eq!(event.round, round);
                if matches!(event.kind, EventKind::Damage | EventKind::Heal) {
                    assert!(event.amount >= 0);
                }
            }
        }
    }

    #[test]
    fn test_every_kill_is_reported_once() {
        let mut scene = started_scene(sample_store(), 1, &wolf_pack_setup(12));
        let mut killed = Vec::new();
        for _ in 0..300 {
            let done = scene.update().unwrap().is_some();
            killed.extend(
                scene
                    .drain_events()
                    .into_iter()
                    .filter(|e| e.flags.contains(ResultFlags::KILLED))
                    .map(|e| e.target),
            );
            if done {
                break;
            }
        }

        let mut expected = scene.report().deaths;
        expected.sort_unstable();
        killed.sort_unstable();
        assert_eq!(killed, expected);
    }
}

// =============================================================================
// Reuse
// =============================================================================

mod reuse {
    use super::*;

    #[test]
    fn test_pooled_shell_replays_identically() {
        let store = sample_store();
        let mut fresh = started_scene(Arc::clone(&store), 5, &duel_setup(5));
        let fresh_outcome = run_to_completion(&mut fresh, 400);

        let mut shell = started_scene(Arc::clone(&store), 1, &wolf_pack_setup(1));
        run_to_completion(&mut shell, 400);
        shell.reset();
        shell.populate(5, &duel_setup(5)).unwrap();
        shell.start().unwrap();
        let reused_outcome = run_to_completion(&mut shell, 400);

        assert_eq!(fresh_outcome, reused_outcome);
        assert_eq!(fresh.state_hash(), shell.state_hash());
    }
}

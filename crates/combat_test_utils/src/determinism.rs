//! Determinism testing utilities.
//!
//! Provides a harness for verifying that a scene produces identical
//! results given identical data, rosters and seed.
//!
//! # Testing Strategy
//!
//! Scene results are persisted and may be replayed for audit, so a scene
//! must be 100% deterministic. Sources of non-determinism include:
//!
//! - **Floating-point math**: Different CPUs can produce different results.
//!   We use fixed-point arithmetic via [`combat_core::math::Fixed`] throughout.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Combatants and auras are always visited in id order.
//!
//! - **System randomness**: Every roll draws from the scene's seeded
//!   generator, never from thread or OS randomness.
//!
//! - **Shared state between scenes**: Scenes share only the immutable data
//!   store, so running many in parallel must not change any of them.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: Individual formula and aura determinism
//! 2. **Property tests**: Random rosters must still produce deterministic outcomes
//! 3. **Integration tests**: Full scenes are reproducible
//! 4. **Parallel tests**: Running N scenes in parallel all match

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use combat_core::scene::{Scene, SceneReport};

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks run.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic scene).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the runs were deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Scene is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Result of parallel scene runs.
#[derive(Debug, Clone)]
pub struct ParallelRunResult {
    /// Final state hash from each scene.
    pub hashes: Vec<u64>,
    /// Number of ticks each scene ran.
    pub ticks: u64,
    /// Number of scenes run.
    pub num_scenes: usize,
}

impl ParallelRunResult {
    /// Check if all scenes produced identical results.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }

    /// Assert all scenes matched.
    ///
    /// # Panics
    ///
    /// Panics if scenes produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic() {
            let mut unique: Vec<u64> = self.hashes.clone();
            unique.sort_unstable();
            unique.dedup();
            panic!(
                "Parallel scenes diverged!\n\
                 Scenes: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {}\n\
                 All hashes: {:?}",
                self.num_scenes,
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a state machine multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run
/// * `ticks` - Number of ticks per run
/// * `setup` - Function to create the initial state
/// * `step` - Function to advance the state by one tick
/// * `hash` - Function to compute the state hash
///
/// # Example
///
/// ```ignore
/// use combat_test_utils::determinism::verify_determinism;
/// use combat_test_utils::fixtures::{duel_setup, sample_store, started_scene};
///
/// let store = sample_store();
/// let result = verify_determinism(
///     5,   // Run 5 times
///     100, // 100 ticks each
///     || started_scene(store.clone(), 1, &duel_setup(7)),
///     |scene| { let _ = scene.update(); },
///     |scene| scene.state_hash(),
/// );
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

fn tick(scene: &mut Scene) {
    // A completed scene keeps returning its outcome; only lifecycle
    // misuse errors, and the hash comparison catches that.
    let _ = scene.update();
}

/// Run a scene twice with identical setup and compare final hashes.
///
/// `setup_fn` must return a started scene.
pub fn verify_scene_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> Scene,
{
    let result = verify_determinism(2, num_ticks, &setup_fn, tick, Scene::state_hash);
    result.is_deterministic
}

/// Run N scenes on scoped threads and collect final hashes.
///
/// Catches non-determinism that only shows under thread scheduling
/// variations, such as state accidentally shared through the data store.
pub fn run_parallel_scenes<F>(setup_fn: F, num_scenes: usize, num_ticks: u64) -> ParallelRunResult
where
    F: Fn() -> Scene + Sync,
{
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..num_scenes)
            .map(|_| {
                s.spawn(|| {
                    let mut scene = setup_fn();
                    for _ in 0..num_ticks {
                        tick(&mut scene);
                    }
                    scene.state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("scene thread panicked"))
            .collect()
    });

    ParallelRunResult {
        hashes,
        ticks: num_ticks,
        num_scenes,
    }
}

/// Compare two scene runs tick-by-tick, finding the first divergence.
///
/// # Returns
///
/// `None` if the scenes stay identical, `Some(tick)` if they diverge at
/// that tick.
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64) -> Option<u64>
where
    F: Fn() -> Scene,
{
    let mut a = setup_fn();
    let mut b = setup_fn();

    if a.state_hash() != b.state_hash() {
        return Some(0);
    }

    for tick_no in 1..=num_ticks {
        tick(&mut a);
        tick(&mut b);

        if a.state_hash() != b.state_hash() {
            tracing::debug!(tick = tick_no, "scenes diverged");
            return Some(tick_no);
        }
    }

    None
}

/// Run a scene and check that its report survives a storage round trip.
pub fn verify_report_round_trip<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> Scene,
{
    let mut scene = setup_fn();
    for _ in 0..num_ticks {
        tick(&mut scene);
    }

    let report = scene.report();
    let Ok(bytes) = report.to_bytes() else {
        return false;
    };
    SceneReport::from_bytes(&bytes).is_ok_and(|restored| restored == report)
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for determinism testing.
///
/// These strategies generate random but reproducible rosters for
/// property-based testing of scene determinism.
pub mod strategies {
    use proptest::prelude::*;

    use combat_core::combatant::UnitInfo;
    use combat_core::math::{Fixed, Vec2Fixed};

    use crate::fixtures::{GHOUL, KNIGHT, RANGER, WOLF};

    /// Generate a fixed-point coordinate on a 40x40 field.
    pub fn arb_fixed_position() -> impl Strategy<Value = Fixed> {
        (-20i32..20i32).prop_map(Fixed::from_num)
    }

    /// Generate a fixed-point 2D vector for positions.
    pub fn arb_vec2_position() -> impl Strategy<Value = Vec2Fixed> {
        (arb_fixed_position(), arb_fixed_position()).prop_map(|(x, y)| Vec2Fixed::new(x, y))
    }

    /// Generate a unit type from the sample data.
    pub fn arb_unit_type() -> impl Strategy<Value = u32> {
        prop_oneof![Just(KNIGHT), Just(RANGER), Just(WOLF), Just(GHOUL)]
    }

    /// Generate one roster slot, with or without an explicit position.
    pub fn arb_unit_info() -> impl Strategy<Value = UnitInfo> {
        (
            arb_unit_type(),
            1u32..20u32,
            proptest::option::of(arb_vec2_position()),
        )
            .prop_map(|(type_id, level, position)| {
                let info = UnitInfo::new(type_id).with_level(level);
                match position {
                    Some(position) => info.at(position),
                    None => info,
                }
            })
    }

    /// Generate a non-empty roster.
    pub fn arb_roster(max_units: usize) -> impl Strategy<Value = Vec<UnitInfo>> {
        proptest::collection::vec(arb_unit_info(), 1..max_units)
    }

    /// Generate a scene seed.
    pub fn arb_seed() -> impl Strategy<Value = u64> {
        any::<u64>()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::fixtures::{duel_setup, sample_store, started_scene, wolf_pack_setup};
    use combat_core::scene::SceneSetup;
    use proptest::prelude::*;

    // =========================================================================
    // Basic determinism tests
    // =========================================================================

    #[test]
    fn test_verify_determinism_simple() {
        let result = verify_determinism(3, 100, || 0u64, |n| *n += 1, |n| *n);

        assert!(result.is_deterministic);
        assert_eq!(result.hashes, vec![100, 100, 100]);
    }

    #[test]
    fn test_duel_is_deterministic() {
        let store = sample_store();
        assert!(verify_scene_determinism(
            || started_scene(Arc::clone(&store), 1, &duel_setup(11)),
            300,
        ));
    }

    #[test]
    fn test_wolf_pack_has_no_divergence() {
        let store = sample_store();
        let divergence = find_first_divergence(
            || started_scene(Arc::clone(&store), 1, &wolf_pack_setup(5)),
            200,
        );
        assert!(divergence.is_none(), "Expected no divergence");
    }

    #[test]
    fn test_different_seeds_can_diverge() {
        let store = sample_store();
        let mut a = started_scene(Arc::clone(&store), 1, &duel_setup(1));
        let mut b = started_scene(store, 1, &duel_setup(2));
        for _ in 0..50 {
            tick(&mut a);
            tick(&mut b);
        }
        assert_ne!(a.state_hash(), b.state_hash());
    }

    #[test]
    fn test_unseeded_scene_uses_its_id() {
        let store = sample_store();
        let mut setup = duel_setup(0);
        setup.seed = None;
        let scene = started_scene(store, 42, &setup);
        assert_eq!(scene.seed(), 42);
    }

    // =========================================================================
    // Serialization round-trip tests
    // =========================================================================

    #[test]
    fn test_report_round_trip_mid_scene() {
        let store = sample_store();
        assert!(verify_report_round_trip(
            || started_scene(Arc::clone(&store), 3, &duel_setup(3)),
            20,
        ));
    }

    #[test]
    fn test_report_round_trip_finished_scene() {
        let store = sample_store();
        assert!(verify_report_round_trip(
            || started_scene(Arc::clone(&store), 3, &wolf_pack_setup(3)),
            400,
        ));
    }

    // =========================================================================
    // Parallel tests
    // =========================================================================

    #[test]
    fn test_parallel_duels() {
        let store = sample_store();
        let result = run_parallel_scenes(
            || started_scene(Arc::clone(&store), 9, &duel_setup(9)),
            4,
            300,
        );
        result.assert_deterministic();
    }

    #[test]
    fn test_compute_hash_is_stable() {
        assert_eq!(compute_hash(&(1u32, "a")), compute_hash(&(1u32, "a")));
        assert_ne!(compute_hash(&1u32), compute_hash(&2u32));
    }

    // =========================================================================
    // Property-based tests using proptest
    // =========================================================================

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        /// Any roster pairing with any seed replays identically.
        #[test]
        fn prop_random_rosters_are_deterministic(
            attackers in strategies::arb_roster(4),
            defenders in strategies::arb_roster(4),
            seed in strategies::arb_seed(),
        ) {
            let store = sample_store();
            let setup = SceneSetup {
                attackers,
                defenders,
                seed: Some(seed),
                ..SceneSetup::default()
            };
            let result = verify_determinism(
                2,
                100,
                || started_scene(Arc::clone(&store), 1, &setup),
                tick,
                Scene::state_hash,
            );
            prop_assert!(result.is_deterministic);
        }

        /// Scenes always end within the round limit.
        #[test]
        fn prop_scenes_terminate(
            attackers in strategies::arb_roster(3),
            defenders in strategies::arb_roster(3),
            seed in strategies::arb_seed(),
        ) {
            let store = sample_store();
            let max_rounds = store.config().max_rounds;
            let setup = SceneSetup {
                attackers,
                defenders,
                seed: Some(seed),
                ..SceneSetup::default()
            };
            let mut scene = started_scene(store, 1, &setup);
            let outcome = crate::fixtures::run_to_completion(&mut scene, max_rounds);
            prop_assert!(outcome.is_some());
            prop_assert!(outcome.map_or(0, |o| o.rounds) <= max_rounds);
        }
    }
}

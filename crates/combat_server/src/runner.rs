//! Fixed-interval tick loop for one scene.

use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use combat_core::events::{CombatEvent, EventKind};
use combat_core::scene::{Scene, SceneId, SceneOutcome};
use tokio::sync::{mpsc, watch};
use tokio::time::{self, MissedTickBehavior};

use crate::error::{Result, ServerError};

/// Damage or heal event tagged with its scene, sent to the event sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneEvent {
    /// Scene the event happened in.
    pub scene_id: SceneId,
    /// The event.
    pub event: CombatEvent,
}

/// Run `f`, turning a panic into [`ServerError::ScenePanicked`].
pub fn guarded_tick<T>(id: SceneId, f: impl FnOnce() -> T) -> Result<T> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(ToString::to_string)
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        ServerError::ScenePanicked { id, message }
    })
}

fn forward_events(scene: &mut Scene, sink: Option<&mpsc::UnboundedSender<SceneEvent>>) {
    let scene_id = scene.id();
    let events = scene.drain_events();
    let Some(sink) = sink else {
        return;
    };
    for event in events {
        if matches!(event.kind, EventKind::Damage | EventKind::Heal) {
            // Fire-and-forget; a closed sink is not the scene's problem.
            let _ = sink.send(SceneEvent { scene_id, event });
        }
    }
}

/// Tick a started scene every `interval` until it completes.
///
/// The cancellation signal is checked before every tick and while waiting
/// for the next one. Returns `Ok(None)` once cancelled (the scene is then
/// aborted), `Ok(Some(outcome))` on completion, and an error if a tick
/// fails or panics.
///
/// # Errors
///
/// Returns [`ServerError::Combat`] if a tick fails and
/// [`ServerError::ScenePanicked`] if it panics.
pub async fn run(
    scene: &mut Scene,
    interval: Duration,
    cancel: &mut watch::Receiver<bool>,
    sink: Option<&mpsc::UnboundedSender<SceneEvent>>,
) -> Result<Option<SceneOutcome>> {
    let id = scene.id();
    let mut ticker = time::interval(interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            changed = cancel.changed() => {
                // A dropped sender cancels as well.
                if changed.is_err() || *cancel.borrow() {
                    scene.abort();
                    return Ok(None);
                }
                continue;
            }
            _ = ticker.tick() => {}
        }

        if *cancel.borrow() {
            scene.abort();
            return Ok(None);
        }

        let outcome = guarded_tick(id, || scene.update())??;
        forward_events(scene, sink);
        if let Some(outcome) = outcome {
            return Ok(Some(outcome));
        }
        tracing::trace!(scene = id, round = scene.round(), "tick");
    }
}

//! Scene Manager: bounded registry of concurrently running scenes.
//!
//! Every accepted scene runs as its own tokio task driven by
//! [`runner::run`](crate::runner::run). The registry is the only state shared
//! between tasks and is locked only to reserve a slot, register, cancel and
//! deregister; scenes are built outside the lock on a reserved slot. Scene
//! shells are recycled through a pool after `reset()`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use combat_core::data::DataStore;
use combat_core::scene::{Scene, SceneId, SceneOutcome, SceneReport, SceneSetup};
use tokio::sync::{mpsc, oneshot, watch, RwLock};

use crate::config::ServerConfig;
use crate::error::{Result, ServerError};
use crate::runner::{self, SceneEvent};

/// What a finished scene hands back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneResult {
    /// Verdict.
    pub outcome: SceneOutcome,
    /// Record for persistence.
    pub report: SceneReport,
}

/// Handle to a running scene's result.
///
/// The result is written once by the scene task and read once, by
/// consuming the ticket.
#[derive(Debug)]
pub struct SceneTicket {
    id: SceneId,
    result: oneshot::Receiver<Result<SceneResult>>,
}

impl SceneTicket {
    /// Scene id.
    #[must_use]
    pub const fn id(&self) -> SceneId {
        self.id
    }

    /// Wait for the scene to end.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Aborted`] if the scene was cancelled, the
    /// scene's own error if it failed, and [`ServerError::ResultDropped`]
    /// if its task vanished without answering.
    pub async fn result(self) -> Result<SceneResult> {
        self.result
            .await
            .map_err(|_| ServerError::ResultDropped(self.id))?
    }
}

#[derive(Debug)]
struct SceneEntry {
    cancel: watch::Sender<bool>,
    attacker_id: u64,
    defender_id: u64,
}

#[derive(Debug, Default)]
struct Registry {
    scenes: HashMap<SceneId, SceneEntry>,
    /// Slots held by scenes still being built.
    reserved: usize,
}

impl Registry {
    fn occupied(&self) -> usize {
        self.scenes.len() + self.reserved
    }
}

#[derive(Debug)]
struct Inner {
    store: Arc<DataStore>,
    config: ServerConfig,
    interval: Duration,
    registry: RwLock<Registry>,
    next_id: AtomicU64,
    pool: Mutex<Vec<Scene>>,
    sink: Option<mpsc::UnboundedSender<SceneEvent>>,
}

/// Bounded registry of running scenes. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SceneManager {
    inner: Arc<Inner>,
}

impl SceneManager {
    /// Create a manager over a loaded data store.
    #[must_use]
    pub fn new(store: Arc<DataStore>, config: ServerConfig) -> Self {
        Self::build(store, config, None)
    }

    /// Create a manager that forwards damage and heal events to `sink`.
    #[must_use]
    pub fn with_event_sink(
        store: Arc<DataStore>,
        config: ServerConfig,
        sink: mpsc::UnboundedSender<SceneEvent>,
    ) -> Self {
        Self::build(store, config, Some(sink))
    }

    fn build(
        store: Arc<DataStore>,
        config: ServerConfig,
        sink: Option<mpsc::UnboundedSender<SceneEvent>>,
    ) -> Self {
        let interval_ms = config
            .tick_interval_ms
            .unwrap_or(store.config().tick_interval_ms);
        Self {
            inner: Arc::new(Inner {
                store,
                interval: Duration::from_millis(interval_ms),
                registry: RwLock::new(Registry::default()),
                next_id: AtomicU64::new(1),
                pool: Mutex::new(Vec::new()),
                sink,
                config,
            }),
        }
    }

    /// Maximum number of concurrent scenes.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.config.max_scenes_per_combat
    }

    /// Build a scene from `setup` and start it on its own task.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::CapacityExceeded`] without allocating when the
    /// registry is full, or [`ServerError::Combat`] when the setup is
    /// rejected.
    pub async fn create_scene(&self, mut setup: SceneSetup) -> Result<SceneTicket> {
        let inner = &self.inner;
        let capacity = inner.config.max_scenes_per_combat;
        {
            let mut registry = inner.registry.write().await;
            if registry.occupied() >= capacity {
                tracing::warn!(capacity, "scene rejected, registry full");
                return Err(ServerError::CapacityExceeded { capacity });
            }
            registry.reserved += 1;
        }

        let id = inner.next_id.fetch_add(1, Ordering::Relaxed);
        if setup.seed.is_none() {
            setup.seed = Some(inner.config.seed_policy.seed_for(id));
        }

        let mut scene = self.take_shell();
        let built = scene.populate(id, &setup).and_then(|()| scene.start());

        let mut registry = inner.registry.write().await;
        registry.reserved -= 1;
        if let Err(e) = built {
            drop(registry);
            self.return_shell(scene);
            tracing::warn!(scene = id, error = %e, "scene rejected");
            return Err(e.into());
        }

        let (cancel_tx, cancel_rx) = watch::channel(false);
        registry.scenes.insert(
            id,
            SceneEntry {
                cancel: cancel_tx,
                attacker_id: setup.attacker_id,
                defender_id: setup.defender_id,
            },
        );
        let running = registry.scenes.len();
        drop(registry);

        tracing::info!(
            scene = id,
            attacker = setup.attacker_id,
            defender = setup.defender_id,
            running,
            "scene registered"
        );

        let (result_tx, result_rx) = oneshot::channel();
        let manager = self.clone();
        tokio::spawn(async move {
            let result = manager.drive(scene, cancel_rx).await;
            // The ticket may have been dropped; nobody is waiting then.
            let _ = result_tx.send(result);
        });

        Ok(SceneTicket {
            id,
            result: result_rx,
        })
    }

    async fn drive(&self, mut scene: Scene, mut cancel: watch::Receiver<bool>) -> Result<SceneResult> {
        let id = scene.id();
        let inner = &self.inner;
        let run = runner::run(&mut scene, inner.interval, &mut cancel, inner.sink.as_ref()).await;

        let entry = inner.registry.write().await.scenes.remove(&id);
        if let Some(entry) = &entry {
            tracing::debug!(
                scene = id,
                attacker = entry.attacker_id,
                defender = entry.defender_id,
                "scene deregistered"
            );
        }

        let result = match run {
            Ok(Some(outcome)) => Ok(SceneResult {
                outcome,
                report: scene.report(),
            }),
            Ok(None) => Err(ServerError::Aborted(id)),
            Err(e) => {
                tracing::error!(scene = id, error = %e, "scene failed");
                Err(e)
            }
        };

        // A shell that panicked mid-tick may be inconsistent; let it go.
        if !matches!(result, Err(ServerError::ScenePanicked { .. })) {
            self.return_shell(scene);
        }
        result
    }

    fn take_shell(&self) -> Scene {
        self.inner
            .pool
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
            .unwrap_or_else(|| Scene::new(Arc::clone(&self.inner.store)))
    }

    fn return_shell(&self, mut scene: Scene) {
        scene.reset();
        let mut pool = self
            .inner
            .pool
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if pool.len() < self.capacity() {
            pool.push(scene);
        }
    }

    /// Number of idle shells waiting for reuse.
    #[must_use]
    pub fn pooled(&self) -> usize {
        self.inner
            .pool
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Request cancellation of one scene. Returns whether it was running.
    pub async fn cancel(&self, id: SceneId) -> bool {
        let registry = self.inner.registry.read().await;
        match registry.scenes.get(&id) {
            Some(entry) => {
                tracing::info!(scene = id, "cancel requested");
                entry.cancel.send_replace(true);
                true
            }
            None => false,
        }
    }

    /// Request cancellation of every running scene.
    pub async fn shutdown(&self) {
        let registry = self.inner.registry.read().await;
        tracing::info!(running = registry.scenes.len(), "cancelling all scenes");
        for entry in registry.scenes.values() {
            entry.cancel.send_replace(true);
        }
    }

    /// Number of running scenes.
    pub async fn len(&self) -> usize {
        self.inner.registry.read().await.scenes.len()
    }

    /// Whether no scene is running.
    pub async fn is_empty(&self) -> bool {
        self.inner.registry.read().await.scenes.is_empty()
    }

    /// Whether scene `id` is running.
    pub async fn contains(&self, id: SceneId) -> bool {
        self.inner.registry.read().await.scenes.contains_key(&id)
    }
}

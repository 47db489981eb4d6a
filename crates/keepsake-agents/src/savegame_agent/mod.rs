// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The Intelligent Subsystem Agent responsible for saving and loading the game.
//!
//! One agent lives per scene. It captures entity state in batches across
//! ticks, hands the container to a background worker for encoding and disk
//! I/O, and on load switches to the saved scene, leaving the decoded
//! container in the [`TransitoryHandoff`] for the next scene's agent.
//!
//! ```text
//! Idle --save--> Saving(capturing) --tick*--> Saving(writing) --poll*--> Idle
//! Idle --load--> Loading --poll*--> ReconciliationPending --scene loaded--> Idle
//! ```

mod reconcile;
mod task;

pub use reconcile::ReconciliationReport;

use crate::handoff::TransitoryHandoff;
use chrono::Local;
use keepsake_core::{
    validate_name, Container, EntityKey, PersistenceContext, PersistentId, Result,
    SavegameConfig, SavegameDirectory, SavegameError, SavegameEvent, SceneHost, SceneTarget,
    TemplateRegistry,
};
use keepsake_lanes::SavegamePipeline;
use reconcile::reconcile;
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use task::{BackgroundTask, CancelToken, TaskPoll};
use uuid::Uuid;

/// Everything of the current scene the agent needs during a tick.
pub struct SceneContext<'a> {
    /// Entities registered for persistence.
    pub persistence: &'a mut PersistenceContext,
    /// The host's scene service.
    pub scene: &'a mut dyn SceneHost,
    /// Templates spawned entities are recreated from.
    pub templates: &'a dyn TemplateRegistry,
}

impl<'a> SceneContext<'a> {
    /// Bundles the scene services for one call.
    pub fn new(
        persistence: &'a mut PersistenceContext,
        scene: &'a mut dyn SceneHost,
        templates: &'a dyn TemplateRegistry,
    ) -> Self {
        Self {
            persistence,
            scene,
            templates,
        }
    }
}

/// A save request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRequest {
    name: String,
    include_spawned: Option<bool>,
}

impl SaveRequest {
    /// Saves under `name`, following the configured spawned-entity policy.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            include_spawned: None,
        }
    }

    /// Leaves spawned entities out of this save.
    pub fn without_spawned(mut self) -> Self {
        self.include_spawned = Some(false);
        self
    }

    /// Overrides the spawned-entity policy for this save.
    pub fn with_spawned(mut self, include: bool) -> Self {
        self.include_spawned = Some(include);
        self
    }

    /// The logical savegame name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Observable state of a [`SavegameAgent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentPhase {
    /// Accepting requests.
    Idle,
    /// Capturing or writing a savegame.
    Saving,
    /// Reading and decoding a savegame.
    Loading,
    /// The saved scene is loading; the next scene's agent will reconcile.
    ReconciliationPending,
}

impl fmt::Display for AgentPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentPhase::Idle => write!(f, "Idle"),
            AgentPhase::Saving => write!(f, "Saving"),
            AgentPhase::Loading => write!(f, "Loading"),
            AgentPhase::ReconciliationPending => write!(f, "ReconciliationPending"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Operation {
    Save,
    Load,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Save => write!(f, "save"),
            Operation::Load => write!(f, "load"),
        }
    }
}

/// Batched capture of the scene into a container.
///
/// The scene identity and the entities to visit are fixed when the save
/// starts. Entities that leave the world before their turn are skipped, and
/// an id is written at most once even if a newcomer inherits it.
struct Capture {
    container: Container,
    entities: VecDeque<EntityKey>,
    spawned: VecDeque<EntityKey>,
    captured: HashSet<PersistentId>,
}

impl Capture {
    fn begin(cx: &SceneContext<'_>, include_spawned: bool) -> Self {
        let entities: VecDeque<EntityKey> = cx.persistence.entities().map(|e| e.key()).collect();
        let spawned = if include_spawned {
            cx.persistence.spawned().map(|e| e.key()).collect()
        } else {
            VecDeque::new()
        };
        Self {
            container: Container::new(cx.scene.active_scene()),
            captured: HashSet::with_capacity(entities.len()),
            entities,
            spawned,
        }
    }

    /// Captures up to `batch_size` entities. Returns `true` once done.
    fn advance(
        &mut self,
        cx: &mut SceneContext<'_>,
        batch_size: usize,
        started: Instant,
        timeout: Duration,
    ) -> Result<bool> {
        let mut budget = batch_size;

        loop {
            let elapsed = started.elapsed();
            if elapsed > timeout {
                return Err(SavegameError::Timeout {
                    operation: "save",
                    elapsed,
                });
            }

            if let Some(&key) = self.entities.front() {
                let Some(entity) = cx.persistence.entity_mut(key) else {
                    log::debug!("Entity {key} left the scene before it was captured.");
                    self.entities.pop_front();
                    continue;
                };
                if budget == 0 {
                    return Ok(false);
                }
                self.entities.pop_front();
                let id = entity.id();
                if !self.captured.insert(id) {
                    log::warn!("Entity {key} reuses id {id}, which is already captured; skipping it.");
                    continue;
                }
                let state = entity.state_mut();
                state.before_saving();
                let snapshot = state.capture_snapshot().map_err(|e| {
                    log::error!("Entity {id} could not capture its state: {e}");
                    SavegameError::from(e)
                })?;
                self.container.push_entity(id, snapshot);
            } else if let Some(&key) = self.spawned.front() {
                let Some(spawned) = cx.persistence.spawned_mut(key) else {
                    log::debug!("Spawned entity {key} left the scene before it was captured.");
                    self.spawned.pop_front();
                    continue;
                };
                if budget == 0 {
                    return Ok(false);
                }
                self.spawned.pop_front();
                let reference = spawned.template_reference().to_string();
                let data = match spawned.state_mut() {
                    Some(state) => {
                        state.before_saving();
                        Some(state.capture_snapshot().map_err(|e| {
                            log::error!("Spawned '{reference}' could not capture its state: {e}");
                            SavegameError::from(e)
                        })?)
                    }
                    None => None,
                };
                self.container.push_spawned(reference, data);
            } else {
                return Ok(true);
            }
            budget -= 1;
        }
    }

    fn finish(self) -> Container {
        self.container
    }
}

enum SaveStage {
    Capturing(Capture),
    Writing(BackgroundTask<PathBuf>),
}

struct SaveJob {
    name: String,
    started: Instant,
    stage: SaveStage,
}

struct LoadJob {
    started: Instant,
    task: BackgroundTask<Container>,
}

enum Phase {
    Idle,
    Saving(SaveJob),
    Loading(LoadJob),
    ReconciliationPending { ticket: Uuid },
}

/// Per-scene save/load orchestrator.
///
/// Obtain one from [`SavegameService::agent`](crate::SavegameService::agent),
/// call [`update`](Self::update) every tick and
/// [`on_scene_loaded`](Self::on_scene_loaded) once the scene has finished
/// loading. Progress is reported as [`SavegameEvent`]s on the service bus.
pub struct SavegameAgent {
    config: Arc<SavegameConfig>,
    directory: SavegameDirectory,
    pipeline: Arc<SavegamePipeline>,
    events: flume::Sender<SavegameEvent>,
    handoff: TransitoryHandoff,
    phase: Phase,
}

impl SavegameAgent {
    pub(crate) fn new(
        config: Arc<SavegameConfig>,
        directory: SavegameDirectory,
        pipeline: Arc<SavegamePipeline>,
        events: flume::Sender<SavegameEvent>,
        handoff: TransitoryHandoff,
    ) -> Self {
        Self {
            config,
            directory,
            pipeline,
            events,
            handoff,
            phase: Phase::Idle,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> AgentPhase {
        match self.phase {
            Phase::Idle => AgentPhase::Idle,
            Phase::Saving(_) => AgentPhase::Saving,
            Phase::Loading(_) => AgentPhase::Loading,
            Phase::ReconciliationPending { .. } => AgentPhase::ReconciliationPending,
        }
    }

    /// Returns `true` unless the agent is idle.
    pub fn is_busy(&self) -> bool {
        !matches!(self.phase, Phase::Idle)
    }

    /// Starts saving the scene in `cx` under `name`.
    ///
    /// The scene identity and the set of entities to capture are taken now;
    /// capture itself runs over the following [`update`](Self::update) ticks.
    /// Returns `false`, with no event, when another operation is running.
    pub fn save(&mut self, name: &str, cx: &SceneContext<'_>) -> bool {
        self.save_with(SaveRequest::new(name), cx)
    }

    /// Starts the save described by `request`.
    pub fn save_with(&mut self, request: SaveRequest, cx: &SceneContext<'_>) -> bool {
        if self.is_busy() {
            log::debug!(
                "Ignoring save of '{}' while the agent is {}.",
                request.name,
                self.phase()
            );
            return false;
        }

        let started = Instant::now();
        self.emit(SavegameEvent::SavingStarted {
            name: request.name.clone(),
        });
        if let Err(e) = validate_name(&request.name) {
            self.fail(Operation::Save, e);
            return true;
        }

        let include_spawned = request
            .include_spawned
            .unwrap_or(self.config.save_spawned);
        log::info!("Saving '{}'.", request.name);
        self.phase = Phase::Saving(SaveJob {
            name: request.name,
            started,
            stage: SaveStage::Capturing(Capture::begin(cx, include_spawned)),
        });
        true
    }

    /// Starts loading savegame `name`.
    ///
    /// `name` is an exact file stem or the logical name of timestamped saves,
    /// in which case the newest of them is loaded.
    pub fn load(&mut self, name: &str) -> bool {
        if self.is_busy() {
            log::debug!("Ignoring load of '{name}' while the agent is {}.", self.phase());
            return false;
        }

        let started = Instant::now();
        self.emit(SavegameEvent::LoadingStarted {
            name: name.to_string(),
        });
        let resolved = self.directory.resolve(name);
        self.begin_load(started, resolved);
        true
    }

    /// Starts loading the most recently written savegame.
    pub fn load_newest(&mut self) -> bool {
        if self.is_busy() {
            log::debug!("Ignoring load of the newest savegame while the agent is {}.", self.phase());
            return false;
        }

        let started = Instant::now();
        self.emit(SavegameEvent::LoadingStarted {
            name: String::new(),
        });
        let resolved = self.directory.newest().and_then(|newest| match newest {
            Some(stem) => Ok(self.directory.file_path(&stem)),
            None => Err(SavegameError::NotFound {
                name: format!("any savegame in '{}'", self.directory.path().display()),
            }),
        });
        self.begin_load(started, resolved);
        true
    }

    /// Advances the running operation by one tick.
    pub fn update(&mut self, cx: &mut SceneContext<'_>) {
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Idle => {}
            Phase::Saving(job) => self.step_save(job, cx),
            Phase::Loading(job) => self.step_load(job, cx),
            Phase::ReconciliationPending { ticket } => {
                if self.handoff.is_pending(ticket) {
                    self.phase = Phase::ReconciliationPending { ticket };
                } else {
                    log::debug!("Savegame handoff {ticket} was claimed, agent is idle.");
                }
            }
        }
    }

    /// Reconciles a pending savegame into the scene that just finished loading.
    ///
    /// Returns `None` when no handoff targets this scene.
    pub fn on_scene_loaded(&mut self, cx: &mut SceneContext<'_>) -> Option<ReconciliationReport> {
        let scene = cx.scene.active_scene();
        let handoff = self.handoff.take_for(&scene)?;
        log::info!(
            "Restoring savegame into scene {} '{}'.",
            scene.index,
            scene.name
        );

        let report = reconcile(handoff.container, cx);
        if matches!(self.phase, Phase::ReconciliationPending { .. }) {
            self.phase = Phase::Idle;
        }
        log::info!(
            "Savegame restored: {} applied, {} destroyed, {} spawned, {} failed.",
            report.applied.len(),
            report.destroyed.len(),
            report.spawned.len(),
            report.failures.len()
        );
        self.emit(SavegameEvent::Loaded {
            applied: report.applied.len(),
            destroyed: report.destroyed.len(),
            spawned: report.spawned.len(),
            failures: report.failures.len(),
        });
        self.emit(SavegameEvent::Ready);
        Some(report)
    }

    /// Captures the whole scene in one call, without touching the disk.
    pub fn capture_container(&self, cx: &mut SceneContext<'_>) -> Result<Container> {
        let mut capture = Capture::begin(cx, self.config.save_spawned);
        capture.advance(cx, usize::MAX, Instant::now(), Duration::MAX)?;
        Ok(capture.finish())
    }

    fn step_save(&mut self, job: SaveJob, cx: &mut SceneContext<'_>) {
        let SaveJob {
            name,
            started,
            stage,
        } = job;
        let timeout = self.config.save_timeout();

        let stage = match stage {
            SaveStage::Capturing(mut capture) => {
                match capture.advance(cx, self.config.batch_size, started, timeout) {
                    Ok(false) => SaveStage::Capturing(capture),
                    Ok(true) => match self.start_write(&name, capture.finish()) {
                        Ok(task) => SaveStage::Writing(task),
                        Err(e) => return self.fail(Operation::Save, e),
                    },
                    Err(e) => return self.fail(Operation::Save, e),
                }
            }
            SaveStage::Writing(mut task) => {
                let elapsed = started.elapsed();
                if elapsed > timeout {
                    task.abandon();
                    return self.fail(
                        Operation::Save,
                        SavegameError::Timeout {
                            operation: "save",
                            elapsed,
                        },
                    );
                }
                match task.poll(Instant::now()) {
                    TaskPoll::Pending => SaveStage::Writing(task),
                    TaskPoll::Done(Ok(path)) => {
                        log::info!("Saved '{name}' to '{}'.", path.display());
                        self.emit(SavegameEvent::Saved { path });
                        self.emit(SavegameEvent::Ready);
                        return;
                    }
                    TaskPoll::Done(Err(e)) => return self.fail(Operation::Save, e),
                }
            }
        };

        self.phase = Phase::Saving(SaveJob {
            name,
            started,
            stage,
        });
    }

    fn start_write(&self, name: &str, container: Container) -> Result<BackgroundTask<PathBuf>> {
        let path = self.directory.timestamped_path(name, &Local::now());
        let directory = self.directory.clone();
        let pipeline = Arc::clone(&self.pipeline);
        log::debug!(
            "Captured {} entities and {} spawned for '{name}', writing through {}.",
            container.entities.len(),
            container.spawned.len(),
            pipeline.describe()
        );

        BackgroundTask::spawn("save", self.config.poll_interval(), move |cancel| {
            write_savegame(&pipeline, &directory, &container, &path, cancel)
        })
    }

    fn begin_load(&mut self, started: Instant, resolved: Result<PathBuf>) {
        let path = match resolved {
            Ok(path) => path,
            Err(e) => return self.fail(Operation::Load, e),
        };
        log::info!("Loading savegame '{}'.", path.display());

        let pipeline = Arc::clone(&self.pipeline);
        let spawned = BackgroundTask::spawn("load", self.config.poll_interval(), move |cancel| {
            let bytes = fs::read(&path)?;
            if cancel.is_cancelled() {
                return Err(SavegameError::Cancelled);
            }
            pipeline.decode(&bytes)
        });

        match spawned {
            Ok(task) => self.phase = Phase::Loading(LoadJob { started, task }),
            Err(e) => self.fail(Operation::Load, e),
        }
    }

    fn step_load(&mut self, job: LoadJob, cx: &mut SceneContext<'_>) {
        let LoadJob { started, mut task } = job;

        let elapsed = started.elapsed();
        if elapsed > self.config.load_timeout() {
            task.abandon();
            return self.fail(
                Operation::Load,
                SavegameError::Timeout {
                    operation: "load",
                    elapsed,
                },
            );
        }

        match task.poll(Instant::now()) {
            TaskPoll::Pending => self.phase = Phase::Loading(LoadJob { started, task }),
            TaskPoll::Done(Ok(container)) => self.switch_scene(container, cx),
            TaskPoll::Done(Err(e)) => self.fail(Operation::Load, e),
        }
    }

    fn switch_scene(&mut self, container: Container, cx: &mut SceneContext<'_>) {
        let target = if self.config.load_by_name {
            if container.scene.name.is_empty() {
                return self.fail(
                    Operation::Load,
                    SavegameError::Scene("savegame does not record a scene name".into()),
                );
            }
            SceneTarget::Name(container.scene.name.clone())
        } else {
            SceneTarget::Index(container.scene.index)
        };

        log::info!("Savegame decoded, switching to {target}.");
        let ticket = self.handoff.deposit(target.clone(), container);
        if let Err(e) = cx.scene.load_scene(&target) {
            self.handoff.withdraw(ticket);
            return self.fail(Operation::Load, e);
        }
        self.phase = Phase::ReconciliationPending { ticket };
    }

    fn fail(&mut self, operation: Operation, error: SavegameError) {
        log::error!("Savegame {operation} failed: {error}");
        self.phase = Phase::Idle;
        let kind = error.kind();
        let message = error.to_string();
        self.emit(match operation {
            Operation::Save => SavegameEvent::SaveFailed { kind, message },
            Operation::Load => SavegameEvent::LoadFailed { kind, message },
        });
        self.emit(SavegameEvent::Ready);
    }

    fn emit(&self, event: SavegameEvent) {
        log::trace!("Savegame event: {event:?}");
        if self.events.send(event).is_err() {
            log::warn!("Savegame event dropped: the service is gone.");
        }
    }
}

/// Encodes `container` and moves it into place at `path`.
///
/// The bytes go to a sibling `.tmp` file first; a cancelled save removes it
/// and leaves no savegame behind.
fn write_savegame(
    pipeline: &SavegamePipeline,
    directory: &SavegameDirectory,
    container: &Container,
    path: &Path,
    cancel: &CancelToken,
) -> Result<PathBuf> {
    let bytes = pipeline.encode(container)?;
    directory.ensure()?;

    let mut staging = path.as_os_str().to_owned();
    staging.push(".tmp");
    let staging = PathBuf::from(staging);
    fs::write(&staging, &bytes)?;

    if cancel.is_cancelled() {
        if let Err(e) = fs::remove_file(&staging) {
            log::warn!("Could not remove '{}': {e}", staging.display());
        }
        return Err(SavegameError::Cancelled);
    }

    if let Err(e) = fs::rename(&staging, path) {
        let _ = fs::remove_file(&staging);
        return Err(e.into());
    }
    Ok(path.to_path_buf())
}

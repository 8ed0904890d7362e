use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
    time::Duration,
};

use anyhow::Result;
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::Serialize;
use tokio::{
    sync::{broadcast::error::RecvError, Mutex},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    classifier::DomainClassifier,
    drift::DriftDetector,
    effects::{Effect, Outbox},
    error::FocusError,
    models::{Category, FocusState, FocusStatePatch},
    policy::{CompileReport, PolicyStatus, PolicySync},
    scheduler::{task, Clock, Scheduler, TaskSlot},
    settings::FocusSettings,
    store::{StateRepository, DOMAIN_MAP_KEY, FOCUS_STATE_KEY},
};

use super::state::{has_expired, is_blocked, time_left_secs, SessionPhase};

pub(crate) const EXPIRY_TASK: &str = "focus-expiry";
pub(crate) const COOLDOWN_TASK: &str = "blocked-cooldown";

const ACTIVE_INDICATOR: &str = "ON";
const BLOCKED_INDICATOR: &str = "!";

#[derive(Debug, Clone)]
pub(crate) struct TabContext {
    pub(crate) category: Option<Category>,
    pub(crate) url: String,
}

/// Process-scoped state. Cleared on `end()` and on restart.
pub(crate) struct ControllerState {
    pub(crate) focus: FocusState,
    pub(crate) classifier: DomainClassifier,
    pub(crate) drift: DriftDetector,
    pub(crate) tabs: HashMap<u32, TabContext>,
    pub(crate) recently_blocked: bool,
    expiry: TaskSlot,
    cooldown: TaskSlot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EndReason {
    Manual,
    Completed,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FocusStatus {
    pub phase: SessionPhase,
    pub allowed_contexts: BTreeSet<Category>,
    pub time_left_secs: u64,
    pub recently_blocked: bool,
    pub known_domains: usize,
    pub policy: PolicyStatus,
}

#[derive(Clone)]
pub struct FocusController {
    pub(crate) state: Arc<Mutex<ControllerState>>,
    pub(crate) repo: StateRepository,
    pub(crate) policy: PolicySync,
    recompile_gate: Arc<Mutex<()>>,
    scheduler: Arc<dyn Scheduler>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) outbox: Outbox,
    pub(crate) settings: Arc<FocusSettings>,
}

fn session_key(state: &FocusState) -> String {
    state.session_id.clone().unwrap_or_default()
}

fn describe_session(state: &FocusState) -> String {
    let allowed = if state.allowed_contexts.is_empty() {
        "nothing".to_string()
    } else {
        state
            .allowed_contexts
            .iter()
            .map(Category::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    };
    match (state.started_at, state.end_time) {
        (Some(start), Some(end)) => {
            format!("Allowed: {allowed} for {} minutes", (end - start).num_minutes())
        }
        _ => format!("Allowed: {allowed}, no time limit"),
    }
}

fn end_time_for(
    now: DateTime<Utc>,
    duration_minutes: Option<f64>,
) -> Result<Option<DateTime<Utc>>, FocusError> {
    let Some(minutes) = duration_minutes else {
        return Ok(None);
    };
    if !minutes.is_finite() || minutes <= 0.0 {
        return Err(FocusError::InvalidDuration(minutes));
    }
    chrono::Duration::try_milliseconds((minutes * 60_000.0).round() as i64)
        .and_then(|offset| now.checked_add_signed(offset))
        .map(Some)
        .ok_or(FocusError::InvalidDuration(minutes))
}

impl FocusController {
    pub fn new(
        repo: StateRepository,
        policy: PolicySync,
        scheduler: Arc<dyn Scheduler>,
        clock: Arc<dyn Clock>,
        outbox: Outbox,
        settings: FocusSettings,
    ) -> Self {
        let drift = DriftDetector::new(settings.drift.clone());
        Self {
            state: Arc::new(Mutex::new(ControllerState {
                focus: FocusState::default(),
                classifier: DomainClassifier::with_builtins(),
                drift,
                tabs: HashMap::new(),
                recently_blocked: false,
                expiry: TaskSlot::default(),
                cooldown: TaskSlot::default(),
            })),
            repo,
            policy,
            recompile_gate: Arc::new(Mutex::new(())),
            scheduler,
            clock,
            outbox,
            settings: Arc::new(settings),
        }
    }

    /// Loads persisted state, finishes a session that ran out while the
    /// process was down, re-arms the expiry check, and installs the policy.
    pub async fn recover(&self) -> Result<()> {
        let persisted_map = self.repo.get_domain_map().await?;
        let focus = self.repo.get_state().await?;
        let now = self.clock.now();

        {
            let mut guard = self.state.lock().await;
            guard.classifier = DomainClassifier::from_persisted(persisted_map);
            guard.focus = focus.clone();
            if focus.active && !has_expired(&focus, now) {
                self.arm_expiry(&mut guard, session_key(&focus));
            }
        }

        if has_expired(&focus, now) {
            warn!("Session {} expired while offline; completing it", session_key(&focus));
            self.end_session(EndReason::Completed, None, None).await?;
            return Ok(());
        }

        if focus.active {
            info!("Recovered active focus session {}", session_key(&focus));
            self.outbox.emit(Effect::SetIndicator {
                text: ACTIVE_INDICATOR.into(),
            });
        }
        self.recompile_logged().await;
        Ok(())
    }

    /// `Inactive -> Active`. Starting over an active session replaces it.
    pub async fn start(
        &self,
        allowed: BTreeSet<Category>,
        duration_minutes: Option<f64>,
    ) -> Result<FocusState> {
        let now = self.clock.now();
        let end_time = end_time_for(now, duration_minutes)?;
        let session_id = Uuid::new_v4().to_string();

        let stored = {
            let mut guard = self.state.lock().await;
            let stored = self
                .repo
                .set_state(FocusStatePatch::started(
                    allowed,
                    now,
                    end_time,
                    session_id.clone(),
                ))
                .await?;
            guard.focus = stored.clone();
            guard.drift.reset();
            self.arm_expiry(&mut guard, session_id.clone());
            stored
        };

        info!(
            "Focus session {session_id} started ({} allowed, ends {:?})",
            stored.allowed_contexts.len(),
            stored.end_time
        );
        self.outbox.emit(Effect::ShowNotification {
            title: "Focus session started".into(),
            message: describe_session(&stored),
        });
        self.outbox.emit(Effect::SetIndicator {
            text: ACTIVE_INDICATOR.into(),
        });

        self.recompile_logged().await;
        Ok(stored)
    }

    /// `Active -> Inactive`; a no-op when already inactive.
    pub async fn end(&self, save_workspace: Option<String>) -> Result<()> {
        self.end_session(EndReason::Manual, save_workspace, None)
            .await
            .map(|_| ())
    }

    async fn end_session(
        &self,
        reason: EndReason,
        save_workspace: Option<String>,
        expected_session: Option<&str>,
    ) -> Result<bool> {
        let finished = {
            let mut guard = self.state.lock().await;
            if !guard.focus.active {
                guard.expiry.cancel();
                return Ok(false);
            }
            if let Some(expected) = expected_session {
                if session_key(&guard.focus) != expected {
                    return Ok(false);
                }
            }

            let finished = session_key(&guard.focus);
            let stored = self.repo.set_state(FocusStatePatch::ended()).await?;
            guard.focus = stored;
            guard.expiry.cancel();
            guard.cooldown.cancel();
            guard.recently_blocked = false;
            guard.drift.reset();
            guard.tabs.clear();
            finished
        };

        info!("Focus session {finished} ended ({reason:?})");
        if let Some(name) = save_workspace.filter(|name| !name.trim().is_empty()) {
            self.outbox.emit(Effect::SaveWorkspace { name });
        }
        self.outbox.emit(Effect::ReleaseParkedLinks);
        self.outbox.emit(Effect::ClearIndicator);
        if reason == EndReason::Completed {
            self.outbox.emit(Effect::ShowNotification {
                title: "Focus session complete".into(),
                message: "Nice work. Parked links are available again.".into(),
            });
        }

        self.recompile_logged().await;
        Ok(true)
    }

    /// Always cancel-then-schedule so a restart never leaves two timers.
    fn arm_expiry(&self, guard: &mut ControllerState, session_id: String) {
        let controller = self.clone();
        let every = Duration::from_secs(self.settings.expiry_check_secs.max(1));
        let handle = self.scheduler.schedule_repeating(
            EXPIRY_TASK,
            every,
            task(move || {
                let controller = controller.clone();
                let session_id = session_id.clone();
                async move { controller.run_maintenance(&session_id).await }
            }),
        );
        guard.expiry.replace(handle);
    }

    async fn run_maintenance(&self, session_id: &str) {
        let now = self.clock.now();
        let (expired, warning) = {
            let mut guard = self.state.lock().await;
            if !guard.focus.active || session_key(&guard.focus) != session_id {
                return;
            }
            let allowed = guard.focus.allowed_contexts.clone();
            let warning = guard.drift.escalation(now, &allowed);
            (has_expired(&guard.focus, now), warning)
        };

        if let Some(warning) = warning {
            self.outbox.emit(Effect::DriftWarning {
                level: warning.level,
                switches: warning.switches,
            });
        }

        if expired {
            if let Err(err) = self
                .end_session(EndReason::Completed, None, Some(session_id))
                .await
            {
                warn!("Failed to complete expired session {session_id}: {err:#}");
            }
        }
    }

    /// Pure in its result. A `true` answer also lights the transient
    /// "recently blocked" indicator.
    pub async fn is_blocked(&self, category: Option<Category>) -> bool {
        let mut guard = self.state.lock().await;
        let blocked = is_blocked(&guard.focus, category);
        if blocked {
            self.mark_recently_blocked(&mut guard);
        }
        blocked
    }

    /// Each block restarts the cool-down instead of stacking another one.
    pub(crate) fn mark_recently_blocked(&self, guard: &mut ControllerState) {
        guard.recently_blocked = true;
        let controller = self.clone();
        let handle = self.scheduler.schedule_once(
            COOLDOWN_TASK,
            Duration::from_secs(self.settings.blocked_cooldown_secs),
            task(move || {
                let controller = controller.clone();
                async move { controller.clear_recently_blocked().await }
            }),
        );
        guard.cooldown.replace(handle);
        self.outbox.emit(Effect::SetIndicator {
            text: BLOCKED_INDICATOR.into(),
        });
    }

    async fn clear_recently_blocked(&self) {
        let active = {
            let mut guard = self.state.lock().await;
            if !guard.recently_blocked {
                return;
            }
            guard.recently_blocked = false;
            guard.focus.active
        };
        if active {
            self.outbox.emit(Effect::SetIndicator {
                text: ACTIVE_INDICATOR.into(),
            });
        } else {
            self.outbox.emit(Effect::ClearIndicator);
        }
    }

    pub async fn is_active(&self) -> bool {
        self.state.lock().await.focus.active
    }

    pub async fn recently_blocked(&self) -> bool {
        self.state.lock().await.recently_blocked
    }

    pub async fn time_left_secs(&self) -> u64 {
        let now = self.clock.now();
        time_left_secs(&self.state.lock().await.focus, now)
    }

    pub async fn focus_state(&self) -> FocusState {
        self.state.lock().await.focus.clone()
    }

    pub async fn status(&self) -> FocusStatus {
        let now = self.clock.now();
        let (phase, allowed_contexts, time_left, recently_blocked, known_domains) = {
            let guard = self.state.lock().await;
            (
                SessionPhase::of(&guard.focus),
                guard.focus.allowed_contexts.clone(),
                time_left_secs(&guard.focus, now),
                guard.recently_blocked,
                guard.classifier.len(),
            )
        };
        FocusStatus {
            phase,
            allowed_contexts,
            time_left_secs: time_left,
            recently_blocked,
            known_domains,
            policy: self.policy.status().await,
        }
    }

    /// Full rebuild from the current snapshot. Installs are serialized so an
    /// older snapshot can never land after a newer one.
    pub async fn recompile(&self) -> Result<CompileReport> {
        let _gate = self.recompile_gate.lock().await;
        let (focus, domains) = {
            let guard = self.state.lock().await;
            (guard.focus.clone(), guard.classifier.map().clone())
        };
        self.policy.apply(&focus, &domains).await
    }

    /// Install failures are retried by the next mutation.
    pub(crate) async fn recompile_logged(&self) {
        if let Err(err) = self.recompile().await {
            warn!("Block rules not installed; will retry on next change: {err:#}");
        }
    }

    /// Adopts a change written by another process.
    pub async fn reload(&self, key: &str) -> Result<()> {
        let changed = match key {
            FOCUS_STATE_KEY => {
                let stored = self.repo.get_state().await?;
                let mut guard = self.state.lock().await;
                if guard.focus == stored {
                    false
                } else {
                    let was_active = guard.focus.active;
                    guard.focus = stored.clone();
                    if stored.active {
                        self.arm_expiry(&mut guard, session_key(&stored));
                    } else {
                        guard.expiry.cancel();
                        if was_active {
                            guard.cooldown.cancel();
                            guard.recently_blocked = false;
                            guard.drift.reset();
                            guard.tabs.clear();
                        }
                    }
                    true
                }
            }
            DOMAIN_MAP_KEY => {
                let persisted = self.repo.get_domain_map().await?;
                let next = DomainClassifier::from_persisted(persisted);
                let mut guard = self.state.lock().await;
                if guard.classifier == next {
                    false
                } else {
                    guard.classifier = next;
                    true
                }
            }
            _ => false,
        };

        if changed {
            info!("Reloaded '{key}' after external change");
            self.recompile_logged().await;
        }
        Ok(())
    }

    /// Re-triggers compilation whenever the store changes from any source.
    pub fn spawn_store_watcher(&self, shutdown: CancellationToken) -> JoinHandle<()> {
        let mut changes = self.repo.subscribe();
        let controller = self.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    change = changes.recv() => match change {
                        Ok(change) => {
                            if let Err(err) = controller.reload(&change.key).await {
                                warn!("Failed to reload '{}': {err:#}", change.key);
                            }
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!("Store watcher lagged by {skipped} changes; reloading everything");
                            for key in [FOCUS_STATE_KEY, DOMAIN_MAP_KEY] {
                                if let Err(err) = controller.reload(key).await {
                                    warn!("Failed to reload '{key}': {err:#}");
                                }
                            }
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            }
        })
    }
}

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Utc};
use focus_guard_lib::{
    effects::{Effect, Outbox},
    policy::{InMemoryEngine, PolicySync},
    scheduler::{ManualClock, ManualScheduler},
    session::FocusController,
    settings::FocusSettings,
    store::{MemoryStore, StateRepository},
};
use tokio::sync::mpsc::UnboundedReceiver;

pub const EXPIRY: &str = "focus-expiry";
pub const COOLDOWN: &str = "blocked-cooldown";

pub struct Harness {
    pub core: FocusController,
    pub clock: Arc<ManualClock>,
    pub scheduler: Arc<ManualScheduler>,
    pub engine: Arc<InMemoryEngine>,
    pub store: Arc<MemoryStore>,
    pub effects: UnboundedReceiver<Effect>,
}

pub fn start_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-03-02T09:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

pub fn harness() -> Harness {
    harness_on(Arc::new(MemoryStore::new()), FocusSettings::default())
}

pub fn harness_on(store: Arc<MemoryStore>, settings: FocusSettings) -> Harness {
    let clock = Arc::new(ManualClock::new(start_time()));
    let scheduler = Arc::new(ManualScheduler::new());
    let engine = Arc::new(InMemoryEngine::new(5000));
    let (outbox, effects) = Outbox::channel();
    let repo = StateRepository::new(store.clone());
    let policy = PolicySync::new(engine.clone(), settings.policy.clone());
    let core = FocusController::new(
        repo,
        policy,
        scheduler.clone(),
        clock.clone(),
        outbox,
        settings,
    );
    Harness {
        core,
        clock,
        scheduler,
        engine,
        store,
        effects,
    }
}

impl Harness {
    pub fn drain(&mut self) -> Vec<Effect> {
        let mut drained = Vec::new();
        while let Ok(effect) = self.effects.try_recv() {
            drained.push(effect);
        }
        drained
    }
}

mod common;

use std::{collections::BTreeSet, time::Duration as StdDuration};

use chrono::Duration;
use common::{harness, harness_on, COOLDOWN, EXPIRY};
use focus_guard_lib::{
    effects::Effect,
    models::{Category, FocusState, FocusStatePatch},
    session::SessionPhase,
    settings::FocusSettings,
    store::{MemoryStore, StateRepository},
};
use std::sync::Arc;

fn allow(categories: &[Category]) -> BTreeSet<Category> {
    categories.iter().copied().collect()
}

#[tokio::test]
async fn timed_session_blocks_then_expires() {
    let mut h = harness();
    h.core.recover().await.unwrap();

    h.core
        .start(allow(&[Category::Work, Category::Development]), Some(25.0))
        .await
        .unwrap();

    assert!(h.core.is_active().await);
    assert_eq!(h.core.time_left_secs().await, 25 * 60);
    assert!(h.core.is_blocked(Some(Category::Entertainment)).await);
    assert!(!h.core.is_blocked(Some(Category::Work)).await);

    let rule = h
        .engine
        .matching_rule("https://www.youtube.com/watch?v=abc")
        .await
        .expect("youtube should be blocked");
    assert_eq!(rule.category, Category::Entertainment);
    assert!(h.engine.matching_rule("https://github.com/rust-lang").await.is_none());
    assert!(h.engine.matching_rule("https://docs.google.com/doc").await.is_none());

    h.clock.advance(Duration::minutes(10));
    assert_eq!(h.core.time_left_secs().await, 15 * 60);

    // A check before the deadline keeps the session alive.
    assert_eq!(h.scheduler.tick(EXPIRY).await, 1);
    assert!(h.core.is_active().await);

    h.clock.advance(Duration::minutes(15));
    h.drain();
    assert_eq!(h.scheduler.tick(EXPIRY).await, 1);

    assert!(!h.core.is_active().await);
    assert_eq!(h.core.time_left_secs().await, 0);
    assert!(!h.core.is_blocked(Some(Category::Entertainment)).await);
    assert!(h.engine.rules().await.is_empty());
    assert_eq!(h.scheduler.live(EXPIRY), 0);

    let effects = h.drain();
    assert!(effects.contains(&Effect::ReleaseParkedLinks));
    assert!(effects.contains(&Effect::ClearIndicator));
    assert!(effects.iter().any(|effect| matches!(
        effect,
        Effect::ShowNotification { title, .. } if title == "Focus session complete"
    )));
}

#[tokio::test]
async fn untimed_session_never_expires() {
    let h = harness();
    h.core.start(allow(&[Category::Work]), None).await.unwrap();

    h.clock.advance(Duration::days(3));
    h.scheduler.tick(EXPIRY).await;

    assert!(h.core.is_active().await);
    assert_eq!(h.core.time_left_secs().await, 0);
    assert!(matches!(
        h.core.status().await.phase,
        SessionPhase::Active { end_time: None }
    ));
}

#[tokio::test]
async fn unclassified_activity_is_never_blocked() {
    let h = harness();
    h.core.start(allow(&[]), Some(30.0)).await.unwrap();

    assert!(!h.core.is_blocked(None).await);
    assert_eq!(h.core.classify_domain("totally-unknown.example").await, None);
    let decision = h.core.on_navigation(1, "https://totally-unknown.example/").await;
    assert!(!decision.blocked);
    assert_eq!(decision.category, None);

    let decision = h.core.on_navigation(1, "not a url").await;
    assert!(!decision.blocked);
}

#[tokio::test]
async fn ending_twice_is_a_no_op() {
    let mut h = harness();
    h.core.end(None).await.unwrap();
    assert!(h.drain().is_empty());

    h.core.start(allow(&[Category::Work]), Some(5.0)).await.unwrap();
    h.core.end(Some("Deep work".into())).await.unwrap();
    let effects = h.drain();
    assert!(effects.contains(&Effect::SaveWorkspace {
        name: "Deep work".into()
    }));

    h.core.end(None).await.unwrap();
    assert!(h.drain().is_empty());
    assert!(!h.core.focus_state().await.active);
}

#[tokio::test]
async fn end_keeps_allow_list_and_clears_deadline() {
    let h = harness();
    h.core
        .start(allow(&[Category::Research]), Some(45.0))
        .await
        .unwrap();
    h.core.end(None).await.unwrap();

    let state = StateRepository::new(h.store.clone()).get_state().await.unwrap();
    assert!(!state.active);
    assert_eq!(state.end_time, None);
    assert_eq!(state.allowed_contexts, allow(&[Category::Research]));
}

#[tokio::test]
async fn restarting_replaces_the_expiry_timer() {
    let h = harness();
    let first = h.core.start(allow(&[Category::Work]), Some(5.0)).await.unwrap();
    let second = h.core.start(allow(&[Category::News]), Some(60.0)).await.unwrap();

    assert_ne!(first.session_id, second.session_id);
    assert_eq!(h.scheduler.live(EXPIRY), 1);

    // Past the first deadline only.
    h.clock.advance(Duration::minutes(10));
    h.scheduler.tick(EXPIRY).await;
    assert!(h.core.is_active().await);
    assert!(h.core.is_blocked(Some(Category::Work)).await);
}

#[tokio::test]
async fn invalid_duration_is_rejected_without_side_effects() {
    let mut h = harness();
    assert!(h.core.start(allow(&[Category::Work]), Some(0.0)).await.is_err());
    assert!(h.core.start(allow(&[Category::Work]), Some(-1.0)).await.is_err());
    assert!(!h.core.is_active().await);
    assert!(h.drain().is_empty());
    assert_eq!(h.scheduler.live(EXPIRY), 0);
}

#[tokio::test]
async fn failed_persist_leaves_memory_untouched() {
    let h = harness();
    h.store.fail_writes(true);

    let err = h
        .core
        .start(allow(&[Category::Work]), Some(25.0))
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("focusState"));
    assert!(!h.core.is_active().await);
    assert_eq!(h.scheduler.live(EXPIRY), 0);

    h.store.fail_writes(false);
    h.core.start(allow(&[Category::Work]), Some(25.0)).await.unwrap();
    h.store.fail_writes(true);
    assert!(h.core.end(None).await.is_err());
    assert!(h.core.is_active().await);
}

#[tokio::test]
async fn blocked_navigation_redirects_and_cools_down() {
    let mut h = harness();
    h.core.start(allow(&[Category::Work]), Some(25.0)).await.unwrap();
    h.drain();

    let decision = h.core.on_navigation(7, "https://www.reddit.com/r/rust").await;
    assert!(decision.blocked);
    assert_eq!(decision.category, Some(Category::Social));
    let redirect = decision.redirect_url.unwrap();
    assert!(redirect.starts_with("/intercept.html?url=https%3A%2F%2Fwww.reddit.com"));
    assert!(redirect.ends_with("context=Social"));
    assert_eq!(h.core.tab_category(7).await, Some(Category::Social));

    let effects = h.drain();
    assert!(effects.contains(&Effect::RedirectNow {
        tab_id: 7,
        url: redirect.clone(),
    }));
    assert!(effects.contains(&Effect::SetIndicator { text: "!".into() }));
    assert!(h.core.recently_blocked().await);

    // Blocking again restarts the cool-down instead of adding one.
    assert!(h.core.is_blocked(Some(Category::Shopping)).await);
    assert_eq!(h.scheduler.live(COOLDOWN), 1);

    assert_eq!(h.scheduler.fire_once(COOLDOWN, StdDuration::from_secs(29)).await, 0);
    assert_eq!(h.scheduler.fire_once(COOLDOWN, StdDuration::from_secs(30)).await, 1);
    assert!(!h.core.recently_blocked().await);
    assert!(h.drain().contains(&Effect::SetIndicator { text: "ON".into() }));

    h.core.tab_closed(7).await;
    assert_eq!(h.core.tab_category(7).await, None);
}

#[tokio::test]
async fn recovery_completes_sessions_that_ran_out_offline() {
    let store = Arc::new(MemoryStore::new());
    let repo = StateRepository::new(store.clone());
    let t0 = common::start_time();
    repo.set_state(FocusStatePatch::started(
        allow(&[Category::Work]),
        t0 - Duration::hours(2),
        Some(t0 - Duration::hours(1)),
        "stale".into(),
    ))
    .await
    .unwrap();

    let mut h = harness_on(store, FocusSettings::default());
    h.core.recover().await.unwrap();

    assert!(!h.core.is_active().await);
    assert_eq!(h.scheduler.live(EXPIRY), 0);
    assert!(h.drain().iter().any(|effect| matches!(
        effect,
        Effect::ShowNotification { title, .. } if title == "Focus session complete"
    )));
}

#[tokio::test]
async fn recovery_rearms_a_live_session() {
    let store = Arc::new(MemoryStore::new());
    let repo = StateRepository::new(store.clone());
    let t0 = common::start_time();
    repo.set_state(FocusStatePatch::started(
        allow(&[Category::Work]),
        t0 - Duration::minutes(5),
        Some(t0 + Duration::minutes(20)),
        "live".into(),
    ))
    .await
    .unwrap();

    let h = harness_on(store, FocusSettings::default());
    h.core.recover().await.unwrap();

    assert!(h.core.is_active().await);
    assert_eq!(h.core.time_left_secs().await, 20 * 60);
    assert_eq!(h.scheduler.live(EXPIRY), 1);
    assert!(h.engine.matching_rule("https://youtube.com/").await.is_some());

    h.clock.advance(Duration::minutes(21));
    h.scheduler.tick(EXPIRY).await;
    assert!(!h.core.is_active().await);
}

#[tokio::test]
async fn external_state_change_is_adopted() {
    let h = harness();
    h.core.recover().await.unwrap();

    let other_process = StateRepository::new(h.store.clone());
    let t0 = common::start_time();
    other_process
        .set_state(FocusStatePatch::started(
            allow(&[Category::Learning]),
            t0,
            Some(t0 + Duration::minutes(50)),
            "from-popup".into(),
        ))
        .await
        .unwrap();
    h.core.reload("focusState").await.unwrap();

    let state: FocusState = h.core.focus_state().await;
    assert!(state.active);
    assert_eq!(state.session_id.as_deref(), Some("from-popup"));
    assert_eq!(h.scheduler.live(EXPIRY), 1);
    assert!(h.engine.matching_rule("https://x.com/home").await.is_some());

    other_process.set_state(FocusStatePatch::ended()).await.unwrap();
    h.core.reload("focusState").await.unwrap();
    assert!(!h.core.is_active().await);
    assert_eq!(h.scheduler.live(EXPIRY), 0);
    assert!(h.engine.rules().await.is_empty());
}

#[tokio::test]
async fn store_watcher_recompiles_on_domain_map_change() {
    let h = harness();
    h.core.start(allow(&[Category::Work]), None).await.unwrap();
    let shutdown = tokio_util::sync::CancellationToken::new();
    let watcher = h.core.spawn_store_watcher(shutdown.clone());

    let other_process = StateRepository::new(h.store.clone());
    let mut map = other_process.get_domain_map().await.unwrap();
    map.insert("brand-new-feed.example".into(), Category::News);
    other_process.set_domain_map(&map).await.unwrap();

    for _ in 0..100 {
        if h.engine.matching_rule("https://brand-new-feed.example/").await.is_some() {
            break;
        }
        tokio::time::sleep(StdDuration::from_millis(10)).await;
    }
    assert!(h
        .engine
        .matching_rule("https://brand-new-feed.example/")
        .await
        .is_some());

    shutdown.cancel();
    watcher.await.unwrap();
}

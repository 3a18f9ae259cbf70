//! Tests for the [`FetchRunner`] supervisor and the backfill traversal.
//!
//! Workers run against a real [`Storage`] over a [`MemoryBackend`] and a
//! scripted upstream; assertions are on upstream call counts.

mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use common::{MockUpstream, PageGate, league, match_record, match_reference, max_ages, rotation, summoner};
use fafnir::{
    Backend, FafnirError, FetchRunner, LeagueTier, MemoryBackend, RunnerConfig, Storage,
};

fn setup(upstream: Arc<MockUpstream>) -> (Arc<MemoryBackend>, Arc<Storage>) {
    let backend = Arc::new(MemoryBackend::new());
    let storage = Arc::new(Storage::new(
        Arc::clone(&backend) as Arc<dyn Backend>,
        upstream,
        max_ages(60),
    ));
    (backend, storage)
}

fn runner_config() -> RunnerConfig {
    RunnerConfig {
        matches_interval_minutes: 60,
        rotation_interval_minutes: 60,
        ..RunnerConfig::default()
    }
}

/// Poll until `condition` holds, panicking after `timeout`.
async fn wait_until(timeout: Duration, what: &str, condition: impl Fn() -> bool) {
    let deadline = Instant::now() + timeout;
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for: {what}");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn zero_interval_is_fatal_at_construction() {
    let upstream = Arc::new(MockUpstream::new());
    let (_backend, storage) = setup(upstream);

    let mut config = runner_config();
    config.matches_interval_minutes = 0;

    let err = FetchRunner::new(storage, config).unwrap_err();
    assert!(matches!(err, FafnirError::Configuration(_)));
}

#[tokio::test]
async fn start_and_stop_are_idempotent() {
    let upstream = Arc::new(MockUpstream::new());
    let (_backend, storage) = setup(upstream);

    let mut runner = FetchRunner::new(storage, runner_config()).unwrap();
    assert!(!runner.is_running());

    runner.start();
    runner.start(); // no-op
    assert!(runner.is_running());

    runner.stop().await;
    assert!(!runner.is_running());
    runner.stop().await; // no-op
}

#[tokio::test]
async fn rotation_worker_force_refreshes_every_cycle() {
    let upstream = Arc::new(MockUpstream::new());
    *upstream.rotation.lock().unwrap() = Some(rotation(&[11, 22]));
    let (_backend, storage) = setup(Arc::clone(&upstream));

    let mut runner = FetchRunner::new(Arc::clone(&storage), runner_config()).unwrap();
    runner.start();
    wait_until(Duration::from_secs(5), "first rotation refresh", || {
        upstream.counters.free_rotation.load(Ordering::SeqCst) >= 1
    })
    .await;
    runner.stop().await;

    // The refreshed rotation was persisted: a non-forced read is a hit.
    let calls = upstream.counters.free_rotation.load(Ordering::SeqCst);
    let stored = storage.free_rotation(false).await.unwrap();
    assert_eq!(stored.free_champion_ids, vec![11, 22]);
    assert_eq!(upstream.counters.free_rotation.load(Ordering::SeqCst), calls);
}

#[tokio::test]
async fn cap_truncates_a_single_page_request() {
    let upstream = Arc::new(MockUpstream::new());
    upstream.add_summoner(summoner("Faker", "sid-faker", "aid-faker", "puuid-faker"));
    upstream.add_history("aid-faker", (1..=120).map(match_reference).collect());
    for game_id in 1..=120 {
        upstream.add_match(match_record(game_id, &["aid-faker"]));
    }
    let (_backend, storage) = setup(Arc::clone(&upstream));

    let mut config = runner_config();
    config.summoners = vec!["Faker".to_owned()];
    config.matches_per_account = 50;

    let mut runner = FetchRunner::new(storage, config).unwrap();
    runner.start();
    wait_until(Duration::from_secs(5), "50 matches fetched", || {
        upstream.counters.match_fetch.load(Ordering::SeqCst) >= 50
    })
    .await;
    tokio::time::sleep(Duration::from_millis(50)).await; // catch any overshoot
    runner.stop().await;

    // Exactly one page-100 request, truncated to 50 processed matches.
    assert_eq!(upstream.counters.matches_page.load(Ordering::SeqCst), 1);
    assert_eq!(upstream.counters.match_fetch.load(Ordering::SeqCst), 50);
}

#[tokio::test]
async fn pagination_stops_at_the_first_short_page() {
    let upstream = Arc::new(MockUpstream::new());
    upstream.add_summoner(summoner("Faker", "sid-faker", "aid-faker", "puuid-faker"));
    upstream.add_history("aid-faker", (1..=250).map(match_reference).collect());
    for game_id in 1..=250 {
        upstream.add_match(match_record(game_id, &["aid-faker"]));
    }
    let (_backend, storage) = setup(Arc::clone(&upstream));

    let mut config = runner_config();
    config.summoners = vec!["Faker".to_owned()];

    let mut runner = FetchRunner::new(storage, config).unwrap();
    runner.start();
    wait_until(Duration::from_secs(10), "250 matches fetched", || {
        upstream.counters.match_fetch.load(Ordering::SeqCst) >= 250
    })
    .await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    runner.stop().await;

    // 100 + 100 + 50: the 50-long page ends the traversal.
    assert_eq!(upstream.counters.matches_page.load(Ordering::SeqCst), 3);
    assert_eq!(upstream.counters.match_fetch.load(Ordering::SeqCst), 250);
}

#[tokio::test]
async fn account_shared_by_two_leagues_is_fetched_once() {
    let upstream = Arc::new(MockUpstream::new());
    upstream.add_summoner(summoner("Shared", "sid-shared", "aid-shared", "puuid-shared"));
    upstream.add_league(league(
        LeagueTier::Challenger,
        "RANKED_SOLO_5x5",
        &["sid-shared"],
    ));
    upstream.add_league(league(
        LeagueTier::Master,
        "RANKED_SOLO_5x5",
        &["sid-shared"],
    ));
    upstream.add_history("aid-shared", (1..=3).map(match_reference).collect());
    for game_id in 1..=3 {
        upstream.add_match(match_record(game_id, &["aid-shared"]));
    }
    let (_backend, storage) = setup(Arc::clone(&upstream));

    let mut config = runner_config();
    config.league_tiers = vec![LeagueTier::Challenger, LeagueTier::Master];
    config.queues = vec!["RANKED_SOLO_5x5".to_owned()];

    let mut runner = FetchRunner::new(storage, config).unwrap();
    runner.start();
    wait_until(Duration::from_secs(5), "shared account backfilled", || {
        upstream.counters.match_fetch.load(Ordering::SeqCst) >= 3
    })
    .await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    runner.stop().await;

    // Deduplicated across leagues: one history request, one summoner
    // resolution (the second league entry is a cache hit).
    assert_eq!(upstream.counters.matches_page.load(Ordering::SeqCst), 1);
    assert_eq!(upstream.counters.summoner.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn seen_accounts_expand_exactly_one_hop() {
    let upstream = Arc::new(MockUpstream::new());
    upstream.add_summoner(summoner("Alpha", "sid-a", "aid-alpha", "puuid-a"));
    upstream.add_history("aid-alpha", vec![match_reference(1)]);
    upstream.add_match(match_record(1, &["aid-alpha", "aid-beta"]));
    // Beta was seen in Alpha's match; Gamma is only ever seen in Beta's.
    upstream.add_history("aid-beta", vec![match_reference(2)]);
    upstream.add_match(match_record(2, &["aid-beta", "aid-gamma"]));
    upstream.add_history("aid-gamma", vec![match_reference(3)]);
    upstream.add_match(match_record(3, &["aid-gamma"]));
    let (_backend, storage) = setup(Arc::clone(&upstream));

    let mut config = runner_config();
    config.summoners = vec!["Alpha".to_owned()];
    config.expand_seen_summoners = true;

    let mut runner = FetchRunner::new(storage, config).unwrap();
    runner.start();
    wait_until(Duration::from_secs(5), "one-hop expansion", || {
        upstream.counters.matches_page.load(Ordering::SeqCst) >= 2
    })
    .await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    runner.stop().await;

    // Alpha + Beta; Gamma's history is never requested.
    assert_eq!(upstream.counters.matches_page.load(Ordering::SeqCst), 2);
    assert_eq!(upstream.counters.match_fetch.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn primary_accounts_are_not_refetched_from_the_seen_set() {
    let upstream = Arc::new(MockUpstream::new());
    upstream.add_summoner(summoner("Alpha", "sid-a", "aid-alpha", "puuid-a"));
    upstream.add_summoner(summoner("Xerxes", "sid-x", "aid-x", "puuid-x"));
    // Alpha's match features X, so X lands in the seen set; X is also a
    // league entry, i.e. a primary account.
    upstream.add_history("aid-alpha", vec![match_reference(1)]);
    upstream.add_match(match_record(1, &["aid-alpha", "aid-x"]));
    upstream.add_history("aid-x", vec![match_reference(2)]);
    upstream.add_match(match_record(2, &["aid-x"]));
    upstream.add_league(league(LeagueTier::Challenger, "RANKED_SOLO_5x5", &["sid-x"]));
    let (_backend, storage) = setup(Arc::clone(&upstream));

    let mut config = runner_config();
    config.summoners = vec!["Alpha".to_owned()];
    config.league_tiers = vec![LeagueTier::Challenger];
    config.queues = vec!["RANKED_SOLO_5x5".to_owned()];
    config.expand_seen_summoners = true;

    let mut runner = FetchRunner::new(storage, config).unwrap();
    runner.start();
    wait_until(Duration::from_secs(5), "both accounts backfilled", || {
        upstream.counters.match_fetch.load(Ordering::SeqCst) >= 2
    })
    .await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    runner.stop().await;

    // X is backfilled once as a primary account, not again as seen.
    assert_eq!(upstream.counters.matches_page.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn stop_mid_pagination_aborts_promptly_and_joins() {
    let upstream = Arc::new(MockUpstream::new());
    upstream.add_summoner(summoner("Faker", "sid-faker", "aid-faker", "puuid-faker"));
    upstream.add_history("aid-faker", (1..=250).map(match_reference).collect());
    for game_id in 1..=250 {
        upstream.add_match(match_record(game_id, &["aid-faker"]));
    }
    // Block the second history page until the test releases it.
    let gate = Arc::new(PageGate::new(2));
    *upstream.page_gate.lock().unwrap() = Some(Arc::clone(&gate));
    let (_backend, storage) = setup(Arc::clone(&upstream));

    let mut config = runner_config();
    config.summoners = vec!["Faker".to_owned()];

    let mut runner = FetchRunner::new(storage, config).unwrap();
    runner.start();

    // Worker is now inside the second page request.
    gate.entered.notified().await;

    let stopper = tokio::spawn(async move {
        runner.stop().await;
        runner
    });
    tokio::time::sleep(Duration::from_millis(50)).await; // let the cancel land
    gate.release.notify_one();

    // Stop must block until the worker has fully exited, and not longer.
    let runner = tokio::time::timeout(Duration::from_secs(3), stopper)
        .await
        .expect("stop did not return after cancellation")
        .unwrap();
    assert!(!runner.is_running());

    // The aborted cycle fetched no further pages; the first page's
    // matches were kept.
    assert_eq!(upstream.counters.matches_page.load(Ordering::SeqCst), 2);
    assert_eq!(upstream.counters.match_fetch.load(Ordering::SeqCst), 100);
}

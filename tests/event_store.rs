// tests/event_store.rs
//
// Event store contract, exercised through the in-memory backend:
// - idempotent inserts
// - exact-match, non-failing removal
// - window expiry without explicit removal
// - randomized add/remove sequences agree with a set model

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use trending_ranker::{EngagementEvent, EngagementKind, EventStore, MemoryEventStore};

const HOUR_MS: i64 = 3_600_000;
const WINDOW_MS: i64 = 6 * HOUR_MS;
const T0: i64 = 1_700_000_000_000;

fn like(post: &str, actor: &str, ts: i64) -> EngagementEvent {
    EngagementEvent::new(post, EngagementKind::Likes, actor, ts)
}

#[tokio::test]
async fn duplicate_record_is_a_noop() {
    let store = MemoryEventStore::new_6h();
    store.record_event(&like("a", "u1", T0), T0).await.unwrap();
    store.record_event(&like("a", "u1", T0), T0).await.unwrap();

    assert_eq!(store.stream_len("a", EngagementKind::Likes), 1);
    let n = store
        .count_in_window("a", EngagementKind::Likes, T0 - WINDOW_MS, T0)
        .await
        .unwrap();
    assert_eq!(n, 1);
}

#[tokio::test]
async fn same_actor_at_different_instants_counts_twice() {
    let store = MemoryEventStore::new_6h();
    store.record_event(&like("a", "u1", T0), T0).await.unwrap();
    store
        .record_event(&like("a", "u1", T0 + 1), T0 + 1)
        .await
        .unwrap();
    let n = store
        .count_in_window("a", EngagementKind::Likes, T0 - WINDOW_MS, T0 + 1)
        .await
        .unwrap();
    assert_eq!(n, 2);
}

#[tokio::test]
async fn removing_missing_event_is_harmless() {
    let store = MemoryEventStore::new_6h();
    assert!(!store
        .remove_event("nope", EngagementKind::Comments, "u1", T0)
        .await
        .unwrap());

    store.record_event(&like("a", "u1", T0), T0).await.unwrap();
    // wrong timestamp, wrong actor, wrong kind
    assert!(!store
        .remove_event("a", EngagementKind::Likes, "u1", T0 + 1)
        .await
        .unwrap());
    assert!(!store
        .remove_event("a", EngagementKind::Likes, "u2", T0)
        .await
        .unwrap());
    assert!(!store
        .remove_event("a", EngagementKind::Views, "u1", T0)
        .await
        .unwrap());
    assert_eq!(store.stream_len("a", EngagementKind::Likes), 1);

    assert!(store
        .remove_event("a", EngagementKind::Likes, "u1", T0)
        .await
        .unwrap());
    // double un-like
    assert!(!store
        .remove_event("a", EngagementKind::Likes, "u1", T0)
        .await
        .unwrap());
    assert_eq!(store.stream_len("a", EngagementKind::Likes), 0);
}

#[tokio::test]
async fn events_older_than_window_are_not_counted() {
    let store = MemoryEventStore::new_6h();
    store.record_event(&like("a", "u1", T0), T0).await.unwrap();

    let now = T0 + 7 * HOUR_MS;
    let n = store
        .count_in_window("a", EngagementKind::Likes, now - WINDOW_MS, now)
        .await
        .unwrap();
    assert_eq!(n, 0);
}

#[tokio::test]
async fn writes_prune_expired_members_of_the_same_stream() {
    let store = MemoryEventStore::new_6h();
    store.record_event(&like("a", "old", T0), T0).await.unwrap();
    store.record_event(&like("b", "old", T0), T0).await.unwrap();

    let later = T0 + 7 * HOUR_MS;
    store
        .record_event(&like("a", "new", later), later)
        .await
        .unwrap();

    assert_eq!(store.stream_len("a", EngagementKind::Likes), 1);
    // other streams are only pruned when written to (or compacted)
    assert_eq!(store.stream_len("b", EngagementKind::Likes), 1);
    store.compact(later).await.unwrap();
    assert_eq!(store.stream_len("b", EngagementKind::Likes), 0);
}

#[tokio::test]
async fn window_boundaries_are_inclusive() {
    let store = MemoryEventStore::new_6h();
    let now = T0 + WINDOW_MS;
    store.record_event(&like("a", "edge", T0), now).await.unwrap();
    store.record_event(&like("a", "end", now), now).await.unwrap();
    let n = store
        .count_in_window("a", EngagementKind::Likes, now - WINDOW_MS, now)
        .await
        .unwrap();
    assert_eq!(n, 2);
}

#[tokio::test]
async fn random_sequences_match_set_model() {
    let mut rng = StdRng::seed_from_u64(0x7e4d);
    let actors = ["u1", "u2", "u3", "u4"];

    for _round in 0..20 {
        let store = MemoryEventStore::new_6h();
        let mut model: HashSet<(String, i64)> = HashSet::new();
        let now = T0;

        for _ in 0..200 {
            let actor = actors[rng.random_range(0..actors.len())];
            let ts = now - rng.random_range(0..30) * 60_000;
            if rng.random_bool(0.6) {
                store.record_event(&like("p", actor, ts), now).await.unwrap();
                model.insert((actor.to_string(), ts));
            } else {
                let removed = store
                    .remove_event("p", EngagementKind::Likes, actor, ts)
                    .await
                    .unwrap();
                assert_eq!(removed, model.remove(&(actor.to_string(), ts)));
            }
        }

        let n = store
            .count_in_window("p", EngagementKind::Likes, now - WINDOW_MS, now)
            .await
            .unwrap();
        assert_eq!(n as usize, model.len());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writers_on_one_stream_lose_nothing() {
    let store = Arc::new(MemoryEventStore::new(Duration::from_secs(6 * 3600)));
    let mut tasks = Vec::new();
    for w in 0..8 {
        let store = Arc::clone(&store);
        tasks.push(tokio::spawn(async move {
            for i in 0..100 {
                let actor = format!("w{w}");
                store
                    .record_event(&like("hot", &actor, T0 - i), T0)
                    .await
                    .unwrap();
            }
        }));
    }
    for t in tasks {
        t.await.unwrap();
    }
    let n = store
        .count_in_window("hot", EngagementKind::Likes, T0 - WINDOW_MS, T0)
        .await
        .unwrap();
    assert_eq!(n, 800);
}

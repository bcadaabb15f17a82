//! Integration tests for the query cache
//!
//! These tests drive the public API the way the QA service does:
//! - Key normalization
//! - Get-or-compute hits and misses
//! - TTL expiration against a manual clock
//! - LRU eviction
//! - Invalidation hooks
//! - Stats reporting
//! - Concurrent access

use futures::future::join_all;
use paper_cache::{
    normalize, CacheConfig, CachedAnswer, Citation, DocumentId, ManualClock, QueryCache,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn cache_with(ttl: Duration, max_entries: usize) -> (QueryCache, ManualClock) {
    let clock = ManualClock::starting_now();
    let config = CacheConfig::builder()
        .ttl(ttl)
        .max_entries(max_entries)
        .build();
    let cache = QueryCache::with_clock(config, Arc::new(clock.clone())).unwrap();
    (cache, clock)
}

fn citation(paper_id: DocumentId) -> Citation {
    Citation {
        paper_id,
        paper_title: format!("Paper {}", paper_id),
        filename: format!("paper_{}.pdf", paper_id),
        section: Some("Introduction".to_string()),
        page: 1,
        relevance_score: 0.8,
        chunk_text: None,
    }
}

fn answer_citing(text: &str, papers: &[DocumentId]) -> CachedAnswer {
    papers
        .iter()
        .fold(CachedAnswer::new(text), |answer, id| answer.with_citation(citation(*id)))
}

async fn ask(cache: &QueryCache, question: &str, answer: CachedAnswer) -> bool {
    let (_, hit) = cache
        .get_or_compute(question, 5, None, || async move {
            Ok::<_, anyhow::Error>(answer)
        })
        .await
        .unwrap();
    hit
}

#[test]
fn test_normalization_properties() {
    assert_eq!(
        normalize("What is AI?", 5, None),
        normalize("  what   is AI?  ", 5, None)
    );
    assert_ne!(
        normalize("What is AI?", 5, None),
        normalize("What is AI?", 10, None)
    );
    assert_eq!(
        normalize("What is AI?", 5, Some(&[3, 1])),
        normalize("What is AI?", 5, Some(&[1, 3]))
    );
    assert_ne!(
        normalize("What is AI?", 5, Some(&[1])),
        normalize("What is AI?", 5, None)
    );
}

#[tokio::test]
async fn test_miss_then_hit_invokes_compute_once() {
    let (cache, _) = cache_with(Duration::from_secs(3600), 100);
    let calls = AtomicUsize::new(0);

    for expected_hit in [false, true] {
        let (answer, hit) = cache
            .get_or_compute("What is AI?", 5, None, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, anyhow::Error>(CachedAnswer::new("Artificial intelligence."))
            })
            .await
            .unwrap();

        assert_eq!(hit, expected_hit);
        assert_eq!(answer.answer, "Artificial intelligence.");
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_ttl_expiration() {
    let (cache, clock) = cache_with(Duration::from_secs(60), 100);

    assert!(!ask(&cache, "q", CachedAnswer::new("v")).await);

    // One second short of the TTL is still a hit, hits do not extend it
    clock.advance(Duration::from_secs(59));
    assert!(ask(&cache, "q", CachedAnswer::new("v")).await);

    clock.advance(Duration::from_secs(1));
    assert!(!ask(&cache, "q", CachedAnswer::new("v")).await);

    let stats = cache.stats().await;
    assert_eq!(stats.expirations, 1);
    assert_eq!(stats.size, 1);
}

#[tokio::test]
async fn test_lru_eviction() {
    let (cache, _) = cache_with(Duration::from_secs(3600), 3);

    for question in ["k1", "k2", "k3", "k4"] {
        ask(&cache, question, CachedAnswer::new(question)).await;
    }

    assert!(cache.get("k1", 5, None).await.is_none());
    for question in ["k2", "k3", "k4"] {
        assert!(cache.get(question, 5, None).await.is_some());
    }

    let stats = cache.stats().await;
    assert_eq!(stats.size, 3);
    assert_eq!(stats.evictions, 1);
}

#[tokio::test]
async fn test_end_to_end_scenario() {
    let (cache, _) = cache_with(Duration::from_secs(3600), 2);

    assert!(!ask(&cache, "What is X?", CachedAnswer::new("A")).await);
    assert!(!ask(&cache, "Question B", CachedAnswer::new("B")).await);
    assert!(!ask(&cache, "Question C", CachedAnswer::new("C")).await);

    let store = cache.store().unwrap();
    assert!(!store.contains_key(&normalize("What is X?", 5, None)).await);
    assert!(store.contains_key(&normalize("Question B", 5, None)).await);
    assert!(store.contains_key(&normalize("Question C", 5, None)).await);

    // Refresh B, so C becomes least recently used
    assert!(ask(&cache, "Question B", CachedAnswer::new("unused")).await);
    assert!(!ask(&cache, "What is X?", CachedAnswer::new("A")).await);

    assert!(store.contains_key(&normalize("What is X?", 5, None)).await);
    assert!(store.contains_key(&normalize("Question B", 5, None)).await);
    assert!(!store.contains_key(&normalize("Question C", 5, None)).await);
    assert_eq!(cache.stats().await.evictions, 2);
}

#[tokio::test]
async fn test_invalidate_all_clears_everything() {
    let (cache, _) = cache_with(Duration::from_secs(3600), 100);

    for i in 0..5 {
        ask(&cache, &format!("question {}", i), answer_citing("a", &[i])).await;
    }
    assert_eq!(cache.stats().await.size, 5);

    cache.invalidate_all().await;

    assert_eq!(cache.stats().await.size, 0);
    for i in 0..5 {
        assert!(cache.get(&format!("question {}", i), 5, None).await.is_none());
    }
}

#[tokio::test]
async fn test_targeted_invalidation() {
    let (cache, _) = cache_with(Duration::from_secs(3600), 100);

    ask(&cache, "first", answer_citing("one", &[1])).await;
    ask(&cache, "second", answer_citing("two", &[2])).await;
    ask(&cache, "third", answer_citing("three", &[1, 3])).await;

    assert_eq!(cache.invalidate_document(1).await, 2);

    assert!(cache.get("first", 5, None).await.is_none());
    assert!(cache.get("second", 5, None).await.is_some());
    assert!(cache.get("third", 5, None).await.is_none());
    assert_eq!(cache.stats().await.invalidations, 2);
}

#[tokio::test]
async fn test_filtered_queries_cache_separately() {
    let (cache, _) = cache_with(Duration::from_secs(3600), 100);

    let (_, hit) = cache
        .get_or_compute("q", 5, Some(&[2, 1]), || async {
            Ok::<_, anyhow::Error>(answer_citing("filtered", &[1]))
        })
        .await
        .unwrap();
    assert!(!hit);

    assert!(cache.get("q", 5, None).await.is_none());
    let cached = cache.get("Q", 5, Some(&[1, 2])).await.unwrap();
    assert_eq!(cached.answer, "filtered");
}

#[tokio::test]
async fn test_hit_rate_arithmetic() {
    let (cache, _) = cache_with(Duration::from_secs(3600), 100);

    let empty = cache.stats().await;
    assert_eq!(empty.total_requests, 0);
    assert_eq!(empty.hit_rate, 0.0);

    // 2 misses, then 6 hits
    ask(&cache, "a", CachedAnswer::new("a")).await;
    ask(&cache, "b", CachedAnswer::new("b")).await;
    for _ in 0..3 {
        ask(&cache, "a", CachedAnswer::new("a")).await;
        ask(&cache, "b", CachedAnswer::new("b")).await;
    }

    let stats = cache.stats().await;
    assert_eq!(stats.hits, 6);
    assert_eq!(stats.misses, 2);
    assert_eq!(stats.total_requests, 8);
    assert!((stats.hit_rate - 0.75).abs() < 1e-9);
}

#[tokio::test]
async fn test_failure_is_not_cached() {
    let (cache, _) = cache_with(Duration::from_secs(3600), 100);

    let result = cache
        .get_or_compute("q", 5, None, || async {
            Err::<CachedAnswer, _>(anyhow::anyhow!("language model unavailable"))
        })
        .await;
    assert_eq!(result.unwrap_err().to_string(), "language model unavailable");
    assert!(cache.get("q", 5, None).await.is_none());

    let calls = AtomicUsize::new(0);
    let (_, hit) = cache
        .get_or_compute("q", 5, None, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, anyhow::Error>(CachedAnswer::new("ok"))
        })
        .await
        .unwrap();
    assert!(!hit);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cancelled_compute_stores_nothing() {
    let (cache, _) = cache_with(Duration::from_secs(3600), 100);

    let pending = cache.get_or_compute("slow", 5, None, || async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok::<_, anyhow::Error>(CachedAnswer::new("late"))
    });
    assert!(tokio::time::timeout(Duration::from_millis(20), pending)
        .await
        .is_err());

    assert!(cache.is_empty().await);
}

#[tokio::test]
async fn test_stats_top_entries() {
    let clock = ManualClock::starting_now();
    let config = CacheConfig::builder()
        .ttl(Duration::from_secs(600))
        .top_entries(2)
        .build();
    let cache: QueryCache = QueryCache::with_clock(config, Arc::new(clock.clone())).unwrap();

    for question in ["popular", "sometimes", "once"] {
        ask(&cache, question, CachedAnswer::new(question)).await;
    }
    for _ in 0..3 {
        ask(&cache, "popular", CachedAnswer::new("x")).await;
    }
    ask(&cache, "sometimes", CachedAnswer::new("x")).await;
    clock.advance(Duration::from_secs(100));

    let stats = cache.stats().await;
    assert_eq!(stats.top_entries.len(), 2);
    assert_eq!(stats.top_entries[0].question.as_deref(), Some("popular"));
    assert_eq!(stats.top_entries[0].hit_count, 3);
    assert_eq!(stats.top_entries[0].ttl_remaining_seconds, 500);
    assert_eq!(stats.top_entries[1].question.as_deref(), Some("sometimes"));

    // Reporting is read-only
    assert_eq!(cache.stats().await.hits, stats.hits);
}

#[tokio::test]
async fn test_disabled_cache_is_passthrough() {
    let config = CacheConfig::builder().enabled(false).build();
    let cache: QueryCache = QueryCache::new(config).unwrap();
    let calls = AtomicUsize::new(0);

    for _ in 0..2 {
        let (_, hit) = cache
            .get_or_compute("q", 5, None, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, anyhow::Error>(CachedAnswer::new("v"))
            })
            .await
            .unwrap();
        assert!(!hit);
    }

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    let stats = cache.stats().await;
    assert!(!stats.enabled);
    assert_eq!(stats.total_requests, 0);
}

#[tokio::test]
async fn test_concurrent_cache_access() {
    let config = CacheConfig::builder()
        .ttl(Duration::from_secs(60))
        .max_entries(1000)
        .build();
    let cache: Arc<QueryCache> = Arc::new(QueryCache::new(config).unwrap());

    let tasks = (0..10).map(|i| {
        let cache = cache.clone();
        tokio::spawn(async move {
            for j in 0..10 {
                let question = format!("question {} {}", i, j);
                for _ in 0..2 {
                    let expected = question.clone();
                    let (answer, _) = cache
                        .get_or_compute(&question, 5, None, || async move {
                            Ok::<_, anyhow::Error>(CachedAnswer::new(expected))
                        })
                        .await
                        .unwrap();
                    assert_eq!(answer.answer, question);
                }
            }
        })
    });

    for result in join_all(tasks).await {
        result.unwrap();
    }

    let stats = cache.stats().await;
    assert_eq!(stats.size, 100);
    assert_eq!(stats.hits, 100);
    assert_eq!(stats.misses, 100);
}

#[tokio::test]
async fn test_concurrent_identical_misses_leave_one_entry() {
    let cache: Arc<QueryCache> = Arc::new(QueryCache::new(CacheConfig::default()).unwrap());

    let requests = (0..8).map(|i| {
        let cache = cache.clone();
        async move {
            cache
                .get_or_compute("same question", 5, None, || async move {
                    tokio::task::yield_now().await;
                    Ok::<_, anyhow::Error>(CachedAnswer::new(format!("answer {}", i)))
                })
                .await
                .unwrap()
        }
    });
    join_all(requests).await;

    let stats = cache.stats().await;
    assert_eq!(stats.size, 1);
    assert_eq!(stats.hits + stats.misses, 8);
    assert!(cache.get("same question", 5, None).await.is_some());
}

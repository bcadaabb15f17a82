//! In-memory log of answered queries
//!
//! Every answered query is recorded, cache hits included, so the history and
//! the usage analytics count what was actually asked. Failed queries are not
//! recorded. Once the log holds [`MAX_RECORDS`] entries the oldest is dropped.

use std::collections::{HashMap, VecDeque};
use tokio::sync::RwLock;
use tracing::debug;

use crate::models::{PaperStats, PaperSummary, PopularTopics, QueryRecord, TopicCount};

/// Records kept before the oldest are dropped
pub const MAX_RECORDS: usize = 10_000;

/// Topics listed in a paper's stats
const PAPER_TOPICS: usize = 5;

/// Question words never counted as topics
const TOPIC_STOPWORDS: &[&str] = &[
    "what", "is", "the", "how", "in", "a", "an", "of", "to", "and", "for",
];

struct LogInner {
    next_id: u64,
    records: VecDeque<QueryRecord>,
}

/// Bounded, append-only query log
pub struct QueryLog {
    inner: RwLock<LogInner>,
    capacity: usize,
}

impl Default for QueryLog {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryLog {
    pub fn new() -> Self {
        Self::with_capacity(MAX_RECORDS)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(LogInner {
                next_id: 1,
                records: VecDeque::new(),
            }),
            capacity: capacity.max(1),
        }
    }

    /// Append a record, assigning its id
    pub async fn record(&self, mut record: QueryRecord) -> u64 {
        let mut inner = self.inner.write().await;
        let id = inner.next_id;
        inner.next_id += 1;
        record.id = id;

        if inner.records.len() >= self.capacity {
            inner.records.pop_front();
        }
        inner.records.push_back(record);
        debug!("Logged query {}", id);
        id
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Page through the log, newest first
    pub async fn history(&self, skip: usize, limit: usize) -> Vec<QueryRecord> {
        let inner = self.inner.read().await;
        inner
            .records
            .iter()
            .rev()
            .skip(skip)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Usage of one paper across the logged queries
    pub async fn paper_stats(&self, paper: &PaperSummary) -> PaperStats {
        let inner = self.inner.read().await;
        let involved: Vec<&QueryRecord> = inner
            .records
            .iter()
            .filter(|record| record.involves(paper.id))
            .collect();

        let avg_confidence = if involved.is_empty() {
            0.0
        } else {
            let mean = involved.iter().map(|r| r.confidence).sum::<f64>() / involved.len() as f64;
            (mean * 1000.0).round() / 1000.0
        };

        let most_common_topics = topic_counts(involved.iter().map(|r| r.question.as_str()))
            .into_iter()
            .take(PAPER_TOPICS)
            .map(|t| t.topic)
            .collect();

        PaperStats {
            paper_id: paper.id,
            title: paper.title.clone(),
            total_queries: involved.len(),
            avg_confidence,
            most_common_topics,
        }
    }

    /// Most frequent question words over the whole log
    pub async fn popular(&self, limit: usize) -> PopularTopics {
        let inner = self.inner.read().await;
        let mut popular_topics = topic_counts(inner.records.iter().map(|r| r.question.as_str()));
        popular_topics.truncate(limit);

        PopularTopics {
            popular_topics,
            total_queries: inner.records.len(),
        }
    }
}

/// Word frequencies, most frequent first and alphabetical among ties
///
/// A word counts when it is longer than three characters once surrounding
/// punctuation is stripped and it is not a stopword.
fn topic_counts<'a>(questions: impl Iterator<Item = &'a str>) -> Vec<TopicCount> {
    let mut counts: HashMap<String, usize> = HashMap::new();

    for question in questions {
        for word in question.split_whitespace() {
            let word = word
                .trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase();
            if word.chars().count() > 3 && !TOPIC_STOPWORDS.contains(&word.as_str()) {
                *counts.entry(word).or_insert(0) += 1;
            }
        }
    }

    let mut topics: Vec<TopicCount> = counts
        .into_iter()
        .map(|(topic, count)| TopicCount { topic, count })
        .collect();
    topics.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.topic.cmp(&b.topic)));
    topics
}

//! Request and response types shared by the service and the HTTP API

use chrono::{DateTime, Utc};
use paper_cache::{CachedAnswer, Citation, DocumentId};
use serde::{Deserialize, Serialize};

/// Question about the uploaded papers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub question: String,

    /// Number of chunks to retrieve; the configured default when absent
    #[serde(default)]
    pub top_k: Option<usize>,

    /// Restrict retrieval to these papers
    #[serde(default)]
    pub paper_ids: Option<Vec<DocumentId>>,
}

impl QueryRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            top_k: None,
            paper_ids: None,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn with_paper_ids(mut self, paper_ids: Vec<DocumentId>) -> Self {
        self.paper_ids = Some(paper_ids);
        self
    }
}

/// Answer to a [`QueryRequest`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    pub citations: Vec<Citation>,
    pub sources_used: Vec<String>,
    pub confidence: f64,
    /// Time spent serving this request
    pub response_time_ms: u64,
    /// Whether the answer came from the query cache
    pub cached: bool,
}

impl QueryResponse {
    pub fn from_answer(answer: CachedAnswer, response_time_ms: u64, cached: bool) -> Self {
        Self {
            answer: answer.answer,
            citations: answer.citations,
            sources_used: answer.sources_used,
            confidence: answer.confidence,
            response_time_ms,
            cached,
        }
    }
}

/// Paper text to add to the library
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPaper {
    pub title: String,
    pub filename: String,
    /// Extracted text; form feeds separate pages, blank lines separate paragraphs
    pub text: String,
    #[serde(default)]
    pub authors: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
}

/// Library listing entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperSummary {
    pub id: DocumentId,
    pub title: String,
    pub filename: String,
    pub authors: Option<String>,
    pub year: Option<i32>,
    pub total_pages: u32,
    pub chunk_count: usize,
    pub upload_date: DateTime<Utc>,
}

/// A retrieved chunk with its relevance score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkHit {
    pub paper_id: DocumentId,
    pub paper_title: String,
    pub filename: String,
    pub section: String,
    pub page: u32,
    pub text: String,
    /// Relevance in `[0, 1]`
    pub score: f64,
}

/// One answered query, as kept in the query log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRecord {
    pub id: u64,
    pub question: String,
    pub answer: String,
    /// Filter the query was restricted to, after de-duplication
    pub paper_ids_filter: Option<Vec<DocumentId>>,
    pub top_k: usize,
    pub confidence: f64,
    pub response_time_ms: u64,
    pub sources_used: Vec<String>,
    pub source_document_ids: Vec<DocumentId>,
    pub cached: bool,
    pub query_date: DateTime<Utc>,
}

impl QueryRecord {
    /// Record for an answer; the log assigns the id
    pub fn new(
        question: &str,
        top_k: usize,
        paper_ids: Option<&[DocumentId]>,
        answer: &CachedAnswer,
        response_time_ms: u64,
        cached: bool,
    ) -> Self {
        Self {
            id: 0,
            question: question.to_string(),
            answer: answer.answer.clone(),
            paper_ids_filter: paper_ids.map(<[DocumentId]>::to_vec),
            top_k,
            confidence: answer.confidence,
            response_time_ms,
            sources_used: answer.sources_used.clone(),
            source_document_ids: answer.source_document_ids.clone(),
            cached,
            query_date: Utc::now(),
        }
    }

    /// Whether the query was restricted to the paper or its answer drew on it
    pub fn involves(&self, paper_id: DocumentId) -> bool {
        self.source_document_ids.contains(&paper_id)
            || self
                .paper_ids_filter
                .as_ref()
                .is_some_and(|ids| ids.contains(&paper_id))
    }
}

/// Usage of a single paper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperStats {
    pub paper_id: DocumentId,
    pub title: String,
    pub total_queries: usize,
    /// Mean confidence of those queries, rounded to three decimals
    pub avg_confidence: f64,
    pub most_common_topics: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicCount {
    pub topic: String,
    pub count: usize,
}

/// Most frequent question words across the query log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopularTopics {
    pub popular_topics: Vec<TopicCount>,
    pub total_queries: usize,
}

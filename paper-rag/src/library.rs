//! In-memory paper library with keyword retrieval
//!
//! Papers are split into pages on form feeds and into chunks on blank lines.
//! A chunk's score is the fraction of the question's keywords it contains,
//! and answers are extracted from the best scoring chunks.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use paper_cache::{CachedAnswer, Citation, DocumentId};
use std::collections::{BTreeMap, HashSet};
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::models::{ChunkHit, NewPaper, PaperSummary};
use crate::pipeline::{AnswerPipeline, LibraryError, PaperLibrary};

/// Chunks quoted in an extractive answer
const ANSWER_CHUNKS: usize = 3;

const ANSWER_EXCERPT_CHARS: usize = 300;
const CITATION_EXCERPT_CHARS: usize = 200;

/// Only the start of a chunk is checked for a section heading
const SECTION_HEADING_CHARS: usize = 100;

const NO_ANSWER: &str =
    "I could not find relevant information in the uploaded papers to answer this question.";

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "are", "was", "were", "what", "which", "who", "why", "how", "does",
    "did", "with", "this", "that", "these", "those", "from", "into", "about", "can", "is",
];

const SECTIONS: &[(&str, &[&str])] = &[
    ("Abstract", &["abstract"]),
    ("Introduction", &["introduction"]),
    ("Related Work", &["related work", "literature review", "background"]),
    ("Methodology", &["methodology", "methods", "approach", "method"]),
    ("Results", &["results", "experiments", "evaluation", "findings"]),
    ("Discussion", &["discussion", "analysis"]),
    ("Conclusion", &["conclusion", "summary"]),
    ("References", &["references", "bibliography"]),
];

struct Chunk {
    text: String,
    section: String,
    page: u32,
    terms: HashSet<String>,
}

struct StoredPaper {
    summary: PaperSummary,
    chunks: Vec<Chunk>,
}

struct LibraryInner {
    next_id: DocumentId,
    papers: BTreeMap<DocumentId, StoredPaper>,
}

/// Paper store that also answers questions extractively
pub struct InMemoryLibrary {
    inner: RwLock<LibraryInner>,
}

impl Default for InMemoryLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryLibrary {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(LibraryInner {
                next_id: 1,
                papers: BTreeMap::new(),
            }),
        }
    }

    async fn rank(
        &self,
        question: &str,
        top_k: usize,
        paper_ids: Option<&[DocumentId]>,
    ) -> Vec<ChunkHit> {
        let query_terms = terms(question);
        if query_terms.is_empty() {
            return Vec::new();
        }

        let inner = self.inner.read().await;
        let mut hits: Vec<ChunkHit> = inner
            .papers
            .iter()
            .filter(|(id, _)| paper_ids.map_or(true, |ids| ids.contains(*id)))
            .flat_map(|(_, paper)| {
                paper.chunks.iter().filter_map(|chunk| {
                    let matched = query_terms.intersection(&chunk.terms).count();
                    if matched == 0 {
                        return None;
                    }
                    Some(ChunkHit {
                        paper_id: paper.summary.id,
                        paper_title: paper.summary.title.clone(),
                        filename: paper.summary.filename.clone(),
                        section: chunk.section.clone(),
                        page: chunk.page,
                        text: chunk.text.clone(),
                        score: matched as f64 / query_terms.len() as f64,
                    })
                })
            })
            .collect();

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(top_k);
        hits
    }
}

#[async_trait]
impl PaperLibrary for InMemoryLibrary {
    async fn add(&self, paper: NewPaper) -> std::result::Result<PaperSummary, LibraryError> {
        let (chunks, total_pages) = chunk_text(&paper.text);
        if chunks.is_empty() {
            return Err(LibraryError::EmptyPaper(paper.filename));
        }

        let mut inner = self.inner.write().await;
        if inner
            .papers
            .values()
            .any(|p| p.summary.filename == paper.filename)
        {
            return Err(LibraryError::DuplicateFilename(paper.filename));
        }

        let id = inner.next_id;
        inner.next_id += 1;

        let summary = PaperSummary {
            id,
            title: paper.title,
            filename: paper.filename,
            authors: paper.authors,
            year: paper.year,
            total_pages,
            chunk_count: chunks.len(),
            upload_date: Utc::now(),
        };
        info!(
            "Stored paper {} '{}' ({} pages, {} chunks)",
            id, summary.title, total_pages, summary.chunk_count
        );

        inner.papers.insert(
            id,
            StoredPaper {
                summary: summary.clone(),
                chunks,
            },
        );
        Ok(summary)
    }

    async fn remove(&self, paper_id: DocumentId) -> Result<bool> {
        let mut inner = self.inner.write().await;
        Ok(inner.papers.remove(&paper_id).is_some())
    }

    async fn get(&self, paper_id: DocumentId) -> Result<Option<PaperSummary>> {
        let inner = self.inner.read().await;
        Ok(inner.papers.get(&paper_id).map(|p| p.summary.clone()))
    }

    async fn list(&self) -> Result<Vec<PaperSummary>> {
        let inner = self.inner.read().await;
        Ok(inner.papers.values().map(|p| p.summary.clone()).collect())
    }

    async fn search(
        &self,
        question: &str,
        top_k: usize,
        paper_ids: Option<&[DocumentId]>,
    ) -> Result<Vec<ChunkHit>> {
        Ok(self.rank(question, top_k, paper_ids).await)
    }
}

#[async_trait]
impl AnswerPipeline for InMemoryLibrary {
    async fn answer(
        &self,
        question: &str,
        top_k: usize,
        paper_ids: Option<&[DocumentId]>,
    ) -> Result<CachedAnswer> {
        let started = Instant::now();
        let hits = self.rank(question, top_k, paper_ids).await;
        debug!("Retrieved {} chunks for question", hits.len());

        if hits.is_empty() {
            return Ok(CachedAnswer::new(NO_ANSWER)
                .with_response_time_ms(started.elapsed().as_millis() as u64));
        }

        let body = hits
            .iter()
            .take(ANSWER_CHUNKS)
            .map(|hit| {
                format!(
                    "According to \"{}\" (page {}): {}",
                    hit.paper_title,
                    hit.page,
                    excerpt(&hit.text, ANSWER_EXCERPT_CHARS)
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        let top_scores: Vec<f64> = hits.iter().take(ANSWER_CHUNKS).map(|h| h.score).collect();
        let confidence = top_scores.iter().sum::<f64>() / top_scores.len() as f64;

        let answer = hits
            .into_iter()
            .fold(CachedAnswer::new(body), |answer, hit| {
                answer.with_citation(Citation {
                    paper_id: hit.paper_id,
                    paper_title: hit.paper_title,
                    filename: hit.filename,
                    section: Some(hit.section),
                    page: hit.page,
                    relevance_score: hit.score,
                    chunk_text: Some(excerpt(&hit.text, CITATION_EXCERPT_CHARS)),
                })
            })
            .with_confidence(confidence)
            .with_response_time_ms(started.elapsed().as_millis() as u64);

        Ok(answer)
    }
}

/// Split extracted text into chunks, returning them with the page count
fn chunk_text(text: &str) -> (Vec<Chunk>, u32) {
    let mut chunks = Vec::new();
    let mut section = "Other".to_string();
    let mut total_pages = 0;

    for (index, page) in text.split('\x0c').enumerate() {
        let page_number = index as u32 + 1;
        total_pages = page_number;

        for paragraph in page.split("\n\n") {
            let paragraph = paragraph.split_whitespace().collect::<Vec<_>>().join(" ");
            if paragraph.is_empty() {
                continue;
            }
            if let Some(detected) = detect_section(&paragraph) {
                section = detected.to_string();
            }
            chunks.push(Chunk {
                terms: terms(&paragraph),
                text: paragraph,
                section: section.clone(),
                page: page_number,
            });
        }
    }

    (chunks, total_pages)
}

fn detect_section(paragraph: &str) -> Option<&'static str> {
    let head: String = paragraph
        .chars()
        .take(SECTION_HEADING_CHARS)
        .collect::<String>()
        .to_lowercase();

    SECTIONS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| head.starts_with(k)))
        .map(|(name, _)| *name)
}

/// Lowercased keywords of three or more characters, minus stopwords
fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| word.chars().count() >= 3)
        .map(|word| word.to_lowercase())
        .filter(|word| !STOPWORDS.contains(&word.as_str()))
        .collect()
}

fn excerpt(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}...", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paper(title: &str, filename: &str, text: &str) -> NewPaper {
        NewPaper {
            title: title.to_string(),
            filename: filename.to_string(),
            text: text.to_string(),
            authors: None,
            year: Some(2017),
        }
    }

    const TRANSFORMER: &str = "Abstract\n\nThe Transformer relies entirely on attention.\n\n\
        Introduction\n\nRecurrent networks process tokens sequentially.\x0c\
        Methods\n\nMulti-head attention projects queries, keys and values.";

    #[test]
    fn test_chunking_tracks_pages_and_sections() {
        let (chunks, pages) = chunk_text(TRANSFORMER);

        assert_eq!(pages, 2);
        assert_eq!(chunks.len(), 6);
        assert_eq!(chunks[1].section, "Abstract");
        assert_eq!(chunks[3].section, "Introduction");
        assert_eq!(chunks[5].section, "Methodology");
        assert_eq!(chunks[5].page, 2);
    }

    #[test]
    fn test_terms_skip_short_words_and_stopwords() {
        let terms = terms("What is the Attention mechanism, and why?");
        let mut sorted: Vec<_> = terms.into_iter().collect();
        sorted.sort();
        assert_eq!(sorted, vec!["attention", "mechanism"]);
    }

    #[test]
    fn test_excerpt() {
        assert_eq!(excerpt("short", 10), "short");
        assert_eq!(excerpt("abcdefghij klm", 10), "abcdefghij...");
    }

    #[tokio::test]
    async fn test_add_list_remove() {
        let library = InMemoryLibrary::new();

        let first = library.add(paper("Attention", "a.pdf", TRANSFORMER)).await.unwrap();
        let second = library.add(paper("Other", "b.pdf", "Some text.")).await.unwrap();
        assert_eq!((first.id, second.id), (1, 2));
        assert_eq!(first.total_pages, 2);

        assert!(library.remove(1).await.unwrap());
        assert!(!library.remove(1).await.unwrap());

        let listed = library.list().await.unwrap();
        assert_eq!(listed, vec![second]);
    }

    #[tokio::test]
    async fn test_empty_paper_is_rejected() {
        let library = InMemoryLibrary::new();
        let result = library.add(paper("Blank", "blank.pdf", " \n\n ")).await;
        assert!(matches!(result, Err(LibraryError::EmptyPaper(_))));
    }

    #[tokio::test]
    async fn test_duplicate_filename_is_rejected() {
        let library = InMemoryLibrary::new();
        library.add(paper("Attention", "a.pdf", TRANSFORMER)).await.unwrap();

        let result = library.add(paper("Attention v2", "a.pdf", "Other text.")).await;
        assert!(matches!(result, Err(LibraryError::DuplicateFilename(name)) if name == "a.pdf"));
        assert_eq!(library.list().await.unwrap().len(), 1);

        // The filename is free again once the paper is removed
        library.remove(1).await.unwrap();
        let readded = library.add(paper("Attention", "a.pdf", TRANSFORMER)).await.unwrap();
        assert_eq!(readded.id, 2);
        assert_eq!(library.get(2).await.unwrap(), Some(readded));
        assert_eq!(library.get(1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_search_ranks_and_filters() {
        let library = InMemoryLibrary::new();
        library.add(paper("Attention", "a.pdf", TRANSFORMER)).await.unwrap();
        library
            .add(paper("Vision", "v.pdf", "Convolutions capture local attention patterns."))
            .await
            .unwrap();

        let hits = library.search("multi-head attention", 10, None).await.unwrap();
        assert_eq!(hits[0].paper_id, 1);
        assert_eq!(hits[0].page, 2);
        assert!(hits.iter().all(|h| h.score > 0.0 && h.score <= 1.0));

        let filtered = library.search("attention", 10, Some(&[2])).await.unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].paper_title, "Vision");

        let limited = library.search("attention", 1, None).await.unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_answer_cites_sources() {
        let library = InMemoryLibrary::new();
        library.add(paper("Attention", "a.pdf", TRANSFORMER)).await.unwrap();

        let answer = library.answer("How does attention work?", 5, None).await.unwrap();

        assert!(answer.answer.contains("Attention"));
        assert_eq!(answer.source_document_ids, vec![1]);
        assert_eq!(answer.sources_used, vec!["Attention"]);
        assert_eq!(answer.citations[0].filename, "a.pdf");
        assert!(answer.confidence > 0.0);
    }

    #[tokio::test]
    async fn test_answer_without_matches() {
        let library = InMemoryLibrary::new();
        library.add(paper("Attention", "a.pdf", TRANSFORMER)).await.unwrap();

        let answer = library.answer("photosynthesis in plants", 5, None).await.unwrap();

        assert_eq!(answer.answer, NO_ANSWER);
        assert!(answer.citations.is_empty());
        assert_eq!(answer.confidence, 0.0);
    }
}

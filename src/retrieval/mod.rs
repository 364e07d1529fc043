//! Question-to-verse retrieval
//!
//! A [`KnowledgeBase`] owns the index and the verse records it was built
//! from. [`Retriever`] pairs it with the embedder used at load time and
//! applies the caller's book filter.


use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

use crate::dataset::VerseRecord;
use crate::embeddings::{EmbeddedCorpus, Embedder};
use crate::index::{FlatL2Index, IndexError};

/// How the book filter interacts with the top-k cut
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterStrategy {
    /// Take the k nearest verses overall, then drop those from other books.
    /// A narrow filter can return fewer than k results, or none.
    #[default]
    Post,
    /// Only verses from the selected books compete for the k slots.
    Pre,
}

/// Set of book names a query is restricted to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookFilter {
    books: BTreeSet<String>,
}

impl BookFilter {
    #[inline]
    pub fn new<I, S>(books: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            books: books.into_iter().map(Into::into).collect(),
        }
    }

    #[inline]
    pub fn contains(&self, book: &str) -> bool {
        self.books.contains(book)
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.books.iter().map(String::as_str)
    }
}

/// A verse judged close to the question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedVerse {
    #[serde(flatten)]
    pub record: VerseRecord,
    pub distance: f32,
}

/// The searchable verse collection
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    index: Option<FlatL2Index>,
    metadata: Vec<VerseRecord>,
}

impl KnowledgeBase {
    /// Index an embedded corpus; an empty corpus gives a knowledge base with
    /// no index
    #[inline]
    pub fn build(corpus: EmbeddedCorpus) -> Result<Self, IndexError> {
        let (vectors, metadata) = corpus.into_parts();
        let index = FlatL2Index::build(&vectors)?;
        Ok(Self { index, metadata })
    }

    #[inline]
    pub fn is_indexed(&self) -> bool {
        self.index.is_some()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.metadata.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }

    /// Nearest verses to an already embedded query
    #[inline]
    pub fn search(
        &self,
        query: &[f32],
        books: &BookFilter,
        k: usize,
        strategy: FilterStrategy,
    ) -> Result<Vec<RetrievedVerse>, IndexError> {
        let Some(index) = &self.index else {
            return Ok(Vec::new());
        };

        let neighbors = match strategy {
            FilterStrategy::Post => index.search(query, k)?,
            FilterStrategy::Pre => index.search_where(query, k, |position| {
                self.metadata
                    .get(position)
                    .is_some_and(|record| books.contains(&record.book))
            })?,
        };

        Ok(neighbors
            .into_iter()
            .filter_map(|neighbor| {
                let record = self.metadata.get(neighbor.position)?;
                books.contains(&record.book).then(|| RetrievedVerse {
                    record: record.clone(),
                    distance: neighbor.distance,
                })
            })
            .collect())
    }
}

/// Embeds questions and searches the knowledge base
#[derive(Clone)]
pub struct Retriever {
    knowledge_base: Arc<KnowledgeBase>,
    embedder: Arc<dyn Embedder>,
    strategy: FilterStrategy,
}

impl Retriever {
    #[inline]
    pub fn new(
        knowledge_base: Arc<KnowledgeBase>,
        embedder: Arc<dyn Embedder>,
        strategy: FilterStrategy,
    ) -> Self {
        Self {
            knowledge_base,
            embedder,
            strategy,
        }
    }

    #[inline]
    pub fn knowledge_base(&self) -> &KnowledgeBase {
        &self.knowledge_base
    }

    /// Up to `k` verses from `books`, closest first
    #[inline]
    pub fn retrieve(
        &self,
        question: &str,
        books: &BookFilter,
        k: usize,
    ) -> Result<Vec<RetrievedVerse>> {
        if !self.knowledge_base.is_indexed() {
            debug!("No index available, returning no results");
            return Ok(Vec::new());
        }

        let query = self
            .embedder
            .embed(question)
            .context("Failed to embed question")?;

        let results = self
            .knowledge_base
            .search(&query, books, k, self.strategy)
            .context("Failed to search index")?;

        if tracing::enabled!(tracing::Level::DEBUG) {
            let selected: Vec<&str> = books.iter().collect();
            debug!(
                "Retrieved {} verses for question (k={}, strategy={:?}, books={:?})",
                results.len(),
                k,
                self.strategy,
                selected
            );
        }
        Ok(results)
    }
}

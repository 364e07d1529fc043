// Embeddings module
// Turns verse text into vectors through an external embedding model


pub mod ollama;

pub use ollama::OllamaClient;

use anyhow::{Context, Result, anyhow};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use crate::dataset::{Datasets, VerseRecord};

/// A dense vector produced by an embedding model
pub type Embedding = Vec<f32>;

const CORPUS_BATCH_SIZE: usize = 64;

/// Text embedding model
///
/// Implementations must embed queries and documents with the same model so
/// that distances between them are meaningful.
pub trait Embedder: Send + Sync {
    /// Embed a single text
    fn embed(&self, text: &str) -> Result<Embedding>;

    /// Embed several texts, returning one vector per input in input order
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        texts.iter().map(|text| self.embed(text)).collect()
    }

    /// Model identifier, for logging
    fn model_name(&self) -> &str;
}

/// Verse embeddings and the records they were produced from
///
/// `vectors()[i]` is the embedding of `metadata()[i]`. The two lists can only
/// be built together and are never mutated afterwards.
#[derive(Debug, Clone, Default)]
pub struct EmbeddedCorpus {
    vectors: Vec<Embedding>,
    metadata: Vec<VerseRecord>,
}

impl EmbeddedCorpus {
    #[inline]
    pub fn new(vectors: Vec<Embedding>, metadata: Vec<VerseRecord>) -> Result<Self> {
        if vectors.len() != metadata.len() {
            return Err(anyhow!(
                "Embedding count {} does not match record count {}",
                vectors.len(),
                metadata.len()
            ));
        }
        Ok(Self { vectors, metadata })
    }

    #[inline]
    pub fn vectors(&self) -> &[Embedding] {
        &self.vectors
    }

    #[inline]
    pub fn metadata(&self) -> &[VerseRecord] {
        &self.metadata
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.metadata.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }

    #[inline]
    pub fn into_parts(self) -> (Vec<Embedding>, Vec<VerseRecord>) {
        (self.vectors, self.metadata)
    }
}

/// Embed every verse of every loaded book
#[inline]
pub fn embed_corpus(datasets: &Datasets, embedder: &dyn Embedder) -> Result<EmbeddedCorpus> {
    let metadata: Vec<VerseRecord> = datasets.records().collect();
    info!(
        "Embedding {} verses with model {}",
        metadata.len(),
        embedder.model_name()
    );

    let bar = if console::user_attended_stderr() {
        ProgressBar::new(metadata.len() as u64).with_style(
            ProgressStyle::with_template("{spinner} [{pos}/{len}] Embedding verses {wide_bar}")
                .expect("style template is valid"),
        )
    } else {
        ProgressBar::hidden()
    };

    let mut vectors = Vec::with_capacity(metadata.len());
    for batch in metadata.chunks(CORPUS_BATCH_SIZE) {
        let texts: Vec<String> = batch.iter().map(|r| r.verse.clone()).collect();
        let embeddings = embedder
            .embed_batch(&texts)
            .with_context(|| format!("Failed to embed batch of {} verses", texts.len()))?;

        if embeddings.len() != texts.len() {
            return Err(anyhow!(
                "Embedder returned {} vectors for {} verses",
                embeddings.len(),
                texts.len()
            ));
        }

        vectors.extend(embeddings);
        bar.set_position(vectors.len() as u64);
    }
    bar.finish_and_clear();

    debug!("Embedded {} verses", vectors.len());
    EmbeddedCorpus::new(vectors, metadata)
}

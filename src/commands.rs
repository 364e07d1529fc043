use anyhow::{Context, Result};
use console::style;
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::dataset::load_all_datasets;
use crate::embeddings::{Embedder, OllamaClient, embed_corpus};
use crate::generation::{AnswerGenerator, GenerationReply};
use crate::retrieval::{KnowledgeBase, Retriever};
use crate::server::{self, AppState};

/// Load the datasets, embed them and build the index
///
/// Any failure here is fatal for the process.
#[inline]
pub fn build_knowledge_base(config: &Config, embedder: &dyn Embedder) -> Result<KnowledgeBase> {
    let sources = config.dataset.resolved_sources();
    let datasets = load_all_datasets(&sources).context("Failed to load datasets")?;
    info!(
        "Loaded {} verses from {} books",
        datasets.len(),
        sources.len()
    );

    let corpus = embed_corpus(&datasets, embedder).context("Failed to embed datasets")?;
    let knowledge_base = KnowledgeBase::build(corpus).context("Failed to build index")?;

    if knowledge_base.is_indexed() {
        info!("Indexed {} verses", knowledge_base.len());
    } else {
        info!("No verses to index, retrieval will return no results");
    }

    Ok(knowledge_base)
}

/// Connect to the embedding server and assemble everything a request needs
#[inline]
pub fn prepare_state(config: &Config) -> Result<AppState> {
    let embedder = OllamaClient::new(&config.ollama).context("Failed to create Ollama client")?;
    embedder
        .health_check()
        .context("Failed to load embedding model")?;

    let knowledge_base = build_knowledge_base(config, &embedder)?;

    let retriever = Retriever::new(
        Arc::new(knowledge_base),
        Arc::new(embedder),
        config.retrieval.filter_strategy,
    );

    Ok(AppState::new(
        retriever,
        AnswerGenerator::from_env(),
        config.dataset.books(),
        config.retrieval.top_k,
    ))
}

/// Run the HTTP API
#[inline]
pub async fn serve(config: Config) -> Result<()> {
    let addr = config
        .server
        .socket_addr()
        .context("Invalid server address")?;

    let state = tokio::task::spawn_blocking(move || prepare_state(&config))
        .await
        .context("Startup task panicked")??;

    info!("Application started");
    server::serve(state, addr).await
}

/// Answer a single question from the command line
#[inline]
pub async fn ask(config: Config, question: String, books: Vec<String>) -> Result<()> {
    let response = tokio::task::spawn_blocking(move || {
        let state = prepare_state(&config)?;
        let filter = state.book_filter(books);
        state.ask(&question, &filter)
    })
    .await
    .context("Question task panicked")??;

    println!("{}", style("Relevant verses").bold().yellow());
    if response.local_results.is_empty() {
        println!("  {}", style("none found").dim());
    }
    for result in &response.local_results {
        let chapter = result
            .record
            .chapter
            .as_ref()
            .map(|c| format!(" ({})", c))
            .unwrap_or_default();
        println!(
            "  {}{} {}",
            style(&result.record.book).cyan(),
            chapter,
            result.record.verse
        );
        if let Some(meaning) = &result.record.meaning {
            println!("      {}", style(meaning).dim());
        }
    }

    println!();
    println!("{}", style("Answer").bold().yellow());
    match &response.gemini_results {
        GenerationReply::Answer(text) => println!("{}", text),
        GenerationReply::Error { error } => println!("{}", style(error).red()),
    }

    Ok(())
}

//! HTTP API
//!
//! `GET /ask?question=...&books=...` retrieves verses and asks the
//! generative model; `GET /health` reports what was loaded at startup. The
//! knowledge base is immutable, so handlers share it without locks and push
//! the blocking HTTP work onto the blocking thread pool.


use anyhow::Result;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use axum_extra::extract::Query;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::generation::{AnswerGenerator, GenerationReply};
use crate::retrieval::{BookFilter, RetrievedVerse, Retriever};

/// Shared, read-only request state
#[derive(Clone)]
pub struct AppState {
    retriever: Retriever,
    generator: Arc<AnswerGenerator>,
    default_books: Arc<Vec<String>>,
    top_k: usize,
}

#[derive(Debug, Deserialize)]
pub struct AskParams {
    pub question: String,
    #[serde(default)]
    pub books: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AskResponse {
    pub local_results: Vec<RetrievedVerse>,
    pub gemini_results: GenerationReply,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub verses: usize,
    pub indexed: bool,
    pub generation_configured: bool,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Retrieval failed: {0}")]
    Retrieval(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!("Request failed: {}", self);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}

impl AppState {
    #[inline]
    pub fn new(
        retriever: Retriever,
        generator: AnswerGenerator,
        default_books: Vec<String>,
        top_k: usize,
    ) -> Self {
        Self {
            retriever,
            generator: Arc::new(generator),
            default_books: Arc::new(default_books),
            top_k,
        }
    }

    /// Book filter for a request; no books means every configured book
    #[inline]
    pub fn book_filter(&self, requested: Vec<String>) -> BookFilter {
        if requested.is_empty() {
            BookFilter::new(self.default_books.iter().cloned())
        } else {
            BookFilter::new(requested)
        }
    }

    /// Retrieve supporting verses and ask the model. Blocks on network I/O.
    #[inline]
    pub fn ask(&self, question: &str, books: &BookFilter) -> Result<AskResponse> {
        let local_results = self.retriever.retrieve(question, books, self.top_k)?;
        let gemini_results = self.generator.generate(question, &local_results);

        Ok(AskResponse {
            local_results,
            gemini_results,
        })
    }
}

#[inline]
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/ask", get(ask_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the API on `addr` until Ctrl-C
#[inline]
pub async fn serve(state: AppState, addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
}

async fn ask_handler(
    State(state): State<AppState>,
    Query(params): Query<AskParams>,
) -> Result<Json<AskResponse>, ApiError> {
    let books = state.book_filter(params.books);
    let question = params.question;

    let response = tokio::task::spawn_blocking(move || state.ask(&question, &books))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(|e| ApiError::Retrieval(format!("{:#}", e)))?;

    Ok(Json(response))
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let knowledge_base = state.retriever.knowledge_base();
    Json(HealthResponse {
        status: "ok".to_string(),
        verses: knowledge_base.len(),
        indexed: knowledge_base.is_indexed(),
        generation_configured: state.generator.is_configured(),
    })
}

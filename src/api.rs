//! REST API for a powledger node
//!
//! Exposes mining, transaction submission and chain inspection over HTTP.
//! Handlers only translate between JSON and [`Node`] calls.

use axum::{
    extract::{Request, State},
    http::{self, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::blockchain::Block;
use crate::error::ChainError;
use crate::node::Node;
use crate::transaction::Transaction;

// ============================================================================
// API Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    BlockchainError(ChainError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let ApiError::BlockchainError(e) = self;
        let status = match &e {
            ChainError::InvalidTransaction(_) => StatusCode::BAD_REQUEST,
            ChainError::ProofNotFound { .. } => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let message = e.to_string();

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<ChainError> for ApiError {
    fn from(err: ChainError) -> Self {
        ApiError::BlockchainError(err)
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct NewTransactionRequest {
    pub sender: String,
    pub recipient: String,
    pub amount: f64,
}

#[derive(Debug, Serialize)]
pub struct NewTransactionResponse {
    pub status: String,
    pub index: u64,
}

#[derive(Debug, Serialize)]
pub struct MineResponse {
    pub message: String,
    pub index: u64,
    pub transactions: Vec<Transaction>,
    pub proof: u64,
    pub previous_hash: String,
}

impl From<Block> for MineResponse {
    fn from(block: Block) -> Self {
        MineResponse {
            message: "success".to_string(),
            index: block.index(),
            transactions: block.transactions().to_vec(),
            proof: block.proof(),
            previous_hash: block.previous_hash().to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChainResponse {
    pub chain: Vec<Block>,
    pub length: usize,
}

#[derive(Debug, Serialize)]
pub struct ValidationResponse {
    pub valid: bool,
    pub first_invalid_index: Option<u64>,
    pub error: Option<String>,
}

// ============================================================================
// Middleware
// ============================================================================

/// Logs method, path, status and duration of every request.
async fn logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    tracing::info!(
        method = %method,
        path = %path,
        status = %response.status().as_u16(),
        duration_ms = %start.elapsed().as_millis(),
        "api.request"
    );

    response
}

// ============================================================================
// API Server
// ============================================================================

/// Build the API router with all endpoints
pub fn build_api_router(node: Arc<Node>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods(vec![
            http::Method::GET,
            http::Method::POST,
            http::Method::OPTIONS,
        ])
        .allow_headers(vec![http::header::CONTENT_TYPE]);

    Router::new()
        .route("/mine", get(mine))
        .route("/transactions/new", post(new_transaction))
        .route("/fullchain", get(full_chain))
        .route("/chain/validate", get(validate_chain))
        .route("/health", get(health_check))
        .layer(middleware::from_fn(logging_middleware))
        .layer(cors)
        .with_state(node)
}

/// Serve the API on `0.0.0.0:port` until the process exits.
pub async fn run_api_server(node: Arc<Node>, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let app = build_api_router(node);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(%addr, "API server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Route Handlers
// ============================================================================

async fn mine(State(node): State<Arc<Node>>) -> Result<Json<MineResponse>, ApiError> {
    let block = node.mine_async().await?;
    Ok(Json(block.into()))
}

async fn new_transaction(
    State(node): State<Arc<Node>>,
    Json(req): Json<NewTransactionRequest>,
) -> Result<Json<NewTransactionResponse>, ApiError> {
    let index = node.submit_transaction(req.sender, req.recipient, req.amount)?;

    Ok(Json(NewTransactionResponse {
        status: "success".to_string(),
        index,
    }))
}

async fn full_chain(State(node): State<Arc<Node>>) -> impl IntoResponse {
    let chain = node.chain();
    let length = chain.len();
    Json(ChainResponse { chain, length })
}

async fn validate_chain(State(node): State<Arc<Node>>) -> impl IntoResponse {
    let response = match node.verify_chain() {
        Ok(()) => ValidationResponse {
            valid: true,
            first_invalid_index: None,
            error: None,
        },
        Err(e) => ValidationResponse {
            valid: false,
            first_invalid_index: e.block_index(),
            error: Some(e.to_string()),
        },
    };
    Json(response)
}

async fn health_check(State(node): State<Arc<Node>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "node_id": node.node_id(),
        "length": node.len(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

#![forbid(unsafe_code)]
//! HTTP node for powledger

use std::sync::Arc;
use powledger::api::run_api_server;
use powledger::config::load_config;
use powledger::node::Node;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = load_config()?;
    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(config.network.api_port);

    let node = Arc::new(Node::new(config.node_config())?);
    info!(
        node_id = %node.node_id(),
        difficulty = node.proof_of_work().difficulty(),
        "Starting powledger node"
    );

    run_api_server(node, port).await
}

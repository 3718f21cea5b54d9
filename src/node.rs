use crate::blockchain::{Block, Ledger, GENESIS_PROOF};
use crate::crypto::random_identifier;
use crate::error::{ChainError, Result};
use crate::miner::{ProofOfWork, DEFAULT_DIFFICULTY};
use crate::transaction::Transaction;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Settings for a [`Node`]; usually built with [`crate::config::Config::node_config`].
#[derive(Debug, Clone, PartialEq)]
pub struct NodeConfig {
    pub difficulty: usize,
    pub max_iterations: Option<u64>,
    pub reward_amount: f64,
    /// `None` generates a random identifier.
    pub node_id: Option<String>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            difficulty: DEFAULT_DIFFICULTY,
            max_iterations: None,
            reward_amount: 1.0,
            node_id: None,
        }
    }
}

impl NodeConfig {
    /// Puzzle settings: difficulty plus the optional iteration cap.
    pub fn proof_of_work(&self) -> ProofOfWork {
        let pow = ProofOfWork::new(self.difficulty);
        match self.max_iterations {
            Some(cap) => pow.with_max_iterations(cap),
            None => pow,
        }
    }
}

/// Owns a [`Ledger`] and drives mining on its behalf.
///
/// Cloning is cheap and every clone shares the same ledger. Submissions and
/// block appends are serialized by the ledger mutex; the proof search runs
/// without holding it.
#[derive(Clone)]
pub struct Node {
    ledger: Arc<Mutex<Ledger>>,
    pow: ProofOfWork,
    node_id: String,
    reward: Transaction,
    blocks_mined: Arc<AtomicU64>,
}

impl Node {
    pub fn new(config: NodeConfig) -> Result<Self> {
        Self::with_ledger(Ledger::new(), config)
    }

    pub fn with_ledger(ledger: Ledger, config: NodeConfig) -> Result<Self> {
        let node_id = config.node_id.clone().unwrap_or_else(random_identifier);
        let reward = Transaction::reward(node_id.clone(), config.reward_amount)?;

        let pow = config.proof_of_work();

        info!(node_id = %node_id, difficulty = pow.difficulty(), "node initialized");

        Ok(Self {
            ledger: Arc::new(Mutex::new(ledger)),
            pow,
            node_id,
            reward,
            blocks_mined: Arc::new(AtomicU64::new(0)),
        })
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn proof_of_work(&self) -> &ProofOfWork {
        &self.pow
    }

    pub fn blocks_mined(&self) -> u64 {
        self.blocks_mined.load(Ordering::Relaxed)
    }

    pub fn submit_transaction(
        &self,
        sender: impl Into<String>,
        recipient: impl Into<String>,
        amount: f64,
    ) -> Result<u64> {
        self.ledger.lock().submit_transaction(sender, recipient, amount)
    }

    /// Finds a proof for the current tip, seals the pending pool and queues the reward.
    ///
    /// If another caller appends a block while the search runs, the proof no
    /// longer matches the tip and the search starts over.
    pub fn mine(&self) -> Result<Block> {
        loop {
            let (last_index, last_proof) = {
                let ledger = self.ledger.lock();
                ledger
                    .last_block()
                    .map(|b| (b.index(), b.proof()))
                    .unwrap_or((0, GENESIS_PROOF))
            };

            let proof = self.pow.find_proof(last_proof)?;

            let mut ledger = self.ledger.lock();
            let tip = ledger.last_block().map(Block::index).unwrap_or(0);
            if tip != last_index {
                warn!(expected = last_index, tip, "chain advanced during proof search, retrying");
                continue;
            }

            let block = ledger.seal_block(proof).clone();
            ledger.add_transaction(self.reward.clone());
            drop(ledger);

            self.blocks_mined.fetch_add(1, Ordering::Relaxed);
            info!(index = block.index(), proof, "mined block");
            return Ok(block);
        }
    }

    /// [`mine`](Self::mine) on tokio's blocking pool.
    pub async fn mine_async(&self) -> Result<Block> {
        let node = self.clone();
        tokio::task::spawn_blocking(move || node.mine())
            .await
            .map_err(|e| ChainError::MiningTask(e.to_string()))?
    }

    pub fn chain(&self) -> Vec<Block> {
        self.ledger.lock().chain().to_vec()
    }

    pub fn len(&self) -> usize {
        self.ledger.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ledger.lock().is_empty()
    }

    pub fn last_block(&self) -> Option<Block> {
        self.ledger.lock().last_block().cloned()
    }

    pub fn pending(&self) -> Vec<Transaction> {
        self.ledger.lock().pending().to_vec()
    }

    pub fn validate_chain(&self) -> bool {
        self.ledger.lock().validate_chain()
    }

    pub fn verify_chain(&self) -> Result<()> {
        self.ledger.lock().verify_chain()
    }

    /// Checks every sealed proof against this node's difficulty.
    pub fn verify_proofs(&self) -> Result<()> {
        self.pow.verify_proofs(self.ledger.lock().chain())
    }
}

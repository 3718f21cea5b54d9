use crate::crypto::canonical_hash;
use crate::error::{ChainError, Result};
use crate::mempool::Mempool;
use crate::transaction::Transaction;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::validation::verify_links;

/// Proof stored in the genesis block.
pub const GENESIS_PROOF: u64 = 100;

/// `previous_hash` of the genesis block.
pub const GENESIS_PREVIOUS_HASH: &str = "0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    index: u64,
    timestamp: u64,
    transactions: Vec<Transaction>,
    proof: u64,
    previous_hash: String,
}

impl Block {
    fn new(index: u64, transactions: Vec<Transaction>, proof: u64, previous_hash: String) -> Self {
        let timestamp = chrono::Utc::now().timestamp_millis() as u64;

        Block {
            index,
            timestamp,
            transactions,
            proof,
            previous_hash,
        }
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    /// Creation time in unix milliseconds.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn proof(&self) -> u64 {
        self.proof
    }

    pub fn previous_hash(&self) -> &str {
        &self.previous_hash
    }

    /// JSON object with the wire field names, used for canonical hashing.
    pub fn to_canonical_value(&self) -> Value {
        let transactions: Vec<Value> = self
            .transactions
            .iter()
            .map(Transaction::to_canonical_value)
            .collect();

        json!({
            "index": self.index,
            "timestamp": self.timestamp,
            "transactions": transactions,
            "proof": self.proof,
            "previous_hash": self.previous_hash,
        })
    }

    pub fn hash(&self) -> String {
        hash_block(self)
    }
}

/// Hex SHA-256 of the block's canonical JSON (see [`crate::crypto::canonical_json`]).
pub fn hash_block(block: &Block) -> String {
    canonical_hash(block.to_canonical_value())
}

/// Append-only chain of blocks plus the pool of transactions waiting for the next one.
///
/// The genesis block is created by [`Ledger::new`], so a ledger is never empty.
/// Mutations take `&mut self`; share a ledger between threads behind a lock
/// (see [`crate::node::Node`]).
#[derive(Debug, Clone)]
pub struct Ledger {
    blocks: Vec<Block>,
    mempool: Mempool,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    pub fn new() -> Self {
        let mut ledger = Ledger {
            blocks: Vec::new(),
            mempool: Mempool::new(),
        };
        ledger.append_block(GENESIS_PROOF, GENESIS_PREVIOUS_HASH.to_string());
        ledger
    }

    /// Queues a transaction and returns the index of the block that will hold it.
    pub fn submit_transaction(
        &mut self,
        sender: impl Into<String>,
        recipient: impl Into<String>,
        amount: f64,
    ) -> Result<u64> {
        let tx = Transaction::new(sender, recipient, amount)?;
        Ok(self.add_transaction(tx))
    }

    /// Queues an already-built transaction; see [`submit_transaction`](Self::submit_transaction).
    pub fn add_transaction(&mut self, tx: Transaction) -> u64 {
        debug!(tx = %tx.hash_str(), amount = tx.amount(), "queued transaction");
        self.mempool.add_transaction(tx);
        self.next_index()
    }

    /// Seals every pending transaction into a new block carrying `proof`.
    ///
    /// The pool is drained even when empty. The proof is not checked here;
    /// obtain it from [`ProofOfWork::find_proof`](crate::miner::ProofOfWork::find_proof)
    /// seeded with the last block's proof.
    pub fn seal_block(&mut self, proof: u64) -> &Block {
        let previous_hash = self
            .blocks
            .last()
            .map(hash_block)
            .unwrap_or_else(|| GENESIS_PREVIOUS_HASH.to_string());
        self.append_block(proof, previous_hash)
    }

    fn append_block(&mut self, proof: u64, previous_hash: String) -> &Block {
        let block = Block::new(self.next_index(), self.mempool.drain(), proof, previous_hash);
        info!(
            index = block.index,
            transactions = block.transactions.len(),
            proof,
            "sealed block"
        );
        self.blocks.push(block);
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn last_block(&self) -> Option<&Block> {
        self.blocks.last()
    }

    pub fn chain(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Always false once constructed; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Index the next sealed block will receive.
    pub fn next_index(&self) -> u64 {
        self.blocks.len() as u64 + 1
    }

    pub fn pending(&self) -> &[Transaction] {
        self.mempool.get_all_transactions()
    }

    pub fn validate_chain(&self) -> bool {
        self.verify_chain().is_ok()
    }

    /// Like [`validate_chain`](Self::validate_chain), but reports the first broken block.
    pub fn verify_chain(&self) -> Result<()> {
        let result = verify_links(&self.blocks);
        if let Err(ChainError::ChainIntegrityViolation { index, reason }) = &result {
            warn!(index, %reason, "chain integrity check failed");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::miner::ProofOfWork;

    fn mine(ledger: &mut Ledger, pow: &ProofOfWork) -> Block {
        let last_proof = ledger.last_block().unwrap().proof();
        let proof = pow.find_proof(last_proof).unwrap();
        ledger.seal_block(proof).clone()
    }

    #[test]
    fn test_new_ledger_has_genesis() {
        let ledger = Ledger::new();
        assert_eq!(ledger.len(), 1);
        assert!(!ledger.is_empty());

        let genesis = ledger.last_block().unwrap();
        assert_eq!(genesis.index(), 1);
        assert_eq!(genesis.previous_hash(), GENESIS_PREVIOUS_HASH);
        assert_eq!(genesis.proof(), GENESIS_PROOF);
        assert!(genesis.transactions().is_empty());
        assert!(ledger.pending().is_empty());
        assert!(ledger.validate_chain());
    }

    #[test]
    fn test_submit_returns_next_index() {
        let mut ledger = Ledger::new();
        assert_eq!(ledger.submit_transaction("A", "B", 10.0).unwrap(), 2);
        assert_eq!(ledger.submit_transaction("B", "C", 5.0).unwrap(), 2);
        assert_eq!(ledger.pending().len(), 2);

        ledger.seal_block(0);
        assert_eq!(ledger.submit_transaction("C", "A", 1.0).unwrap(), 3);
    }

    #[test]
    fn test_invalid_amount_leaves_pool_untouched() {
        let mut ledger = Ledger::new();
        ledger.submit_transaction("A", "B", 1.0).unwrap();

        let err = ledger.submit_transaction("A", "B", -3.0).unwrap_err();
        assert!(matches!(err, ChainError::InvalidTransaction(_)));
        assert!(ledger.submit_transaction("A", "B", f64::NAN).is_err());

        assert_eq!(ledger.pending().len(), 1);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_first_block_scenario() {
        let pow = ProofOfWork::default();
        let mut ledger = Ledger::new();
        let genesis = ledger.last_block().unwrap().clone();

        assert_eq!(ledger.submit_transaction("A", "B", 10.0).unwrap(), 2);
        let proof = pow.find_proof(genesis.proof()).unwrap();
        let block = ledger.seal_block(proof).clone();

        assert_eq!(ledger.len(), 2);
        assert_eq!(block.index(), 2);
        assert_eq!(block.proof(), proof);
        assert_eq!(block.transactions(), &[Transaction::new("A", "B", 10.0).unwrap()]);
        assert_eq!(block.previous_hash(), hash_block(&genesis));
        assert!(ledger.pending().is_empty());
        assert!(ledger.validate_chain());
    }

    #[test]
    fn test_block_keeps_submission_order() {
        let pow = ProofOfWork::new(2);
        let mut ledger = Ledger::new();
        let submitted = [("A", "B", 1.0), ("C", "D", 2.0), ("A", "D", 3.5), ("B", "A", 0.0)];
        for (sender, recipient, amount) in submitted {
            ledger.submit_transaction(sender, recipient, amount).unwrap();
        }

        let block = mine(&mut ledger, &pow);
        let sealed: Vec<(&str, &str, f64)> = block
            .transactions()
            .iter()
            .map(|tx| (tx.sender(), tx.recipient(), tx.amount()))
            .collect();
        assert_eq!(sealed, submitted.to_vec());
        assert!(ledger.pending().is_empty());
    }

    #[test]
    fn test_double_seal_yields_empty_block() {
        let mut ledger = Ledger::new();
        ledger.submit_transaction("A", "B", 10.0).unwrap();

        let first = ledger.seal_block(1).clone();
        let second = ledger.seal_block(2).clone();

        assert_eq!(first.transactions().len(), 1);
        assert!(second.transactions().is_empty());
        assert_eq!(second.index(), 3);
        assert_eq!(second.previous_hash(), hash_block(&first));
        assert!(ledger.validate_chain());
    }

    #[test]
    fn test_hash_block_is_deterministic() {
        let mut ledger = Ledger::new();
        ledger.submit_transaction("A", "B", 10.0).unwrap();
        let block = ledger.seal_block(7).clone();

        let digest = hash_block(&block);
        assert_eq!(digest, hash_block(&block));
        assert_eq!(digest, block.clone().hash());
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_hash_block_changes_with_every_field() {
        let mut ledger = Ledger::new();
        ledger.submit_transaction("A", "B", 10.0).unwrap();
        let block = ledger.seal_block(7).clone();
        let original = hash_block(&block);

        let mut changed = block.clone();
        changed.index += 1;
        assert_ne!(hash_block(&changed), original);

        let mut changed = block.clone();
        changed.timestamp += 1;
        assert_ne!(hash_block(&changed), original);

        let mut changed = block.clone();
        changed.proof += 1;
        assert_ne!(hash_block(&changed), original);

        let mut changed = block.clone();
        changed.previous_hash.push('0');
        assert_ne!(hash_block(&changed), original);

        let mut changed = block.clone();
        changed.transactions[0] = Transaction::new("A", "B", 10.000001).unwrap();
        assert_ne!(hash_block(&changed), original);

        let mut changed = block;
        changed.transactions.clear();
        assert_ne!(hash_block(&changed), original);
    }

    #[test]
    fn test_hash_block_matches_json_dumps_digest() {
        // sha256(json.dumps(block, sort_keys=True)) computed with CPython
        let block: Block = serde_json::from_str(
            r#"{"index":2,"timestamp":1700000000000,"transactions":[{"sender":"A","recipient":"B","amount":10.0}],"proof":35293,"previous_hash":"abc"}"#,
        )
        .unwrap();
        assert_eq!(
            hash_block(&block),
            "cc31ea9dc5a0f8236ec3e1f1bb53330e9600bef1f2cef4e7e625c623c190316d"
        );
    }

    #[test]
    fn test_block_with_negative_amount_is_rejected_on_read() {
        let result = serde_json::from_str::<Block>(
            r#"{"index":2,"timestamp":1,"transactions":[{"sender":"A","recipient":"B","amount":-5.0}],"proof":1,"previous_hash":"abc"}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_canonical_value_matches_wire_form() {
        let mut ledger = Ledger::new();
        ledger.submit_transaction("A", "B", 2.5).unwrap();
        let block = ledger.seal_block(3).clone();

        let wire = serde_json::to_value(&block).unwrap();
        assert_eq!(block.to_canonical_value(), wire);
        for field in ["index", "timestamp", "transactions", "proof", "previous_hash"] {
            assert!(wire.get(field).is_some(), "missing field {}", field);
        }
    }

    #[test]
    fn test_honest_chain_validates() {
        let pow = ProofOfWork::new(2);
        let mut ledger = Ledger::new();
        for i in 0..5 {
            ledger.submit_transaction("A", "B", i as f64).unwrap();
            mine(&mut ledger, &pow);
        }
        assert_eq!(ledger.len(), 6);
        assert!(ledger.validate_chain());
        assert!(ledger.verify_chain().is_ok());
    }

    #[test]
    fn test_tampered_genesis_proof_detected_at_block_two() {
        let pow = ProofOfWork::new(2);
        let mut ledger = Ledger::new();
        ledger.submit_transaction("A", "B", 10.0).unwrap();
        mine(&mut ledger, &pow);
        mine(&mut ledger, &pow);

        ledger.blocks[0].proof = 999;

        assert!(!ledger.validate_chain());
        let err = ledger.verify_chain().unwrap_err();
        assert_eq!(err.block_index(), Some(2));
    }

    #[test]
    fn test_tampered_previous_hash_detected() {
        let mut ledger = Ledger::new();
        for proof in 1..=4 {
            ledger.seal_block(proof);
        }

        ledger.blocks[2].previous_hash = "f".repeat(64);

        assert!(!ledger.validate_chain());
        assert_eq!(ledger.verify_chain().unwrap_err().block_index(), Some(3));
    }

    #[test]
    fn test_tampered_transaction_detected_at_next_block() {
        let mut ledger = Ledger::new();
        ledger.submit_transaction("A", "B", 10.0).unwrap();
        ledger.seal_block(1);
        ledger.seal_block(2);

        ledger.blocks[1].transactions[0] = Transaction::new("A", "B", 1000.0).unwrap();

        assert_eq!(ledger.verify_chain().unwrap_err().block_index(), Some(3));
    }

    #[test]
    fn test_tampering_last_block_is_not_detectable() {
        // Nothing links to the tip, so only its own previous_hash is checked.
        let mut ledger = Ledger::new();
        ledger.submit_transaction("A", "B", 10.0).unwrap();
        ledger.seal_block(1);

        ledger.blocks[1].transactions.clear();
        assert!(ledger.validate_chain());
    }

    #[test]
    fn test_index_gap_detected() {
        let mut ledger = Ledger::new();
        ledger.seal_block(1);
        ledger.seal_block(2);

        ledger.blocks[2].index = 7;

        let err = ledger.verify_chain().unwrap_err();
        assert!(matches!(err, ChainError::ChainIntegrityViolation { index: 3, .. }));
    }

    #[test]
    fn test_verification_does_not_modify_chain() {
        let mut ledger = Ledger::new();
        ledger.seal_block(1);
        ledger.blocks[0].proof = 1;
        let before = ledger.chain().to_vec();

        assert!(!ledger.validate_chain());
        assert_eq!(ledger.chain(), before.as_slice());
    }
}

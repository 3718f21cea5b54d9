//! Proof-of-work search for powledger
//!
//! The puzzle: find the smallest non-negative `proof` such that
//! `sha256(format!("{last_proof}{proof}"))`, in lowercase hex, starts with
//! `difficulty` zero characters.

use crate::blockchain::Block;
use crate::crypto::{has_leading_zeros, sha256_hex, HEX_DIGEST_LEN};
use crate::error::{ChainError, Result};
use rayon::prelude::*;
use tracing::debug;

/// Leading hex zeros required by default.
pub const DEFAULT_DIFFICULTY: usize = 4;

/// Candidates handed to rayon per round of the parallel search.
const PARALLEL_BATCH_SIZE: u64 = 8192;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProofOfWork {
    difficulty: usize,
    max_iterations: Option<u64>,
}

impl Default for ProofOfWork {
    fn default() -> Self {
        Self::new(DEFAULT_DIFFICULTY)
    }
}

impl ProofOfWork {
    /// Difficulty is clamped to the digest length.
    pub fn new(difficulty: usize) -> Self {
        Self {
            difficulty: difficulty.min(HEX_DIGEST_LEN),
            max_iterations: None,
        }
    }

    /// Gives up with [`ChainError::ProofNotFound`] after `cap` candidates.
    pub fn with_max_iterations(mut self, cap: u64) -> Self {
        self.max_iterations = Some(cap);
        self
    }

    pub fn difficulty(&self) -> usize {
        self.difficulty
    }

    pub fn max_iterations(&self) -> Option<u64> {
        self.max_iterations
    }

    /// Hex digest of the decimal concatenation of `last_proof` and `proof`.
    pub fn proof_digest(last_proof: u64, proof: u64) -> String {
        sha256_hex(format!("{}{}", last_proof, proof).as_bytes())
    }

    pub fn valid_proof(&self, last_proof: u64, proof: u64) -> bool {
        has_leading_zeros(&Self::proof_digest(last_proof, proof), self.difficulty)
    }

    /// Sequential search from 0 upward; returns the first candidate that solves the puzzle.
    pub fn find_proof(&self, last_proof: u64) -> Result<u64> {
        let limit = self.limit();
        for candidate in 0..limit {
            if self.valid_proof(last_proof, candidate) {
                debug!(last_proof, proof = candidate, "proof found");
                return Ok(candidate);
            }
        }
        Err(ChainError::ProofNotFound {
            last_proof,
            attempts: limit,
        })
    }

    /// Same answer as [`find_proof`](Self::find_proof), searched on the rayon pool.
    ///
    /// Batches are scanned in ascending order and `find_first` keeps the
    /// lowest match inside a batch, so the smallest solution always wins.
    pub fn find_proof_parallel(&self, last_proof: u64) -> Result<u64> {
        let limit = self.limit();
        let mut start = 0u64;
        while start < limit {
            let end = start.saturating_add(PARALLEL_BATCH_SIZE).min(limit);
            let found = (start..end)
                .into_par_iter()
                .find_first(|&candidate| self.valid_proof(last_proof, candidate));
            if let Some(proof) = found {
                debug!(last_proof, proof, "proof found (parallel)");
                return Ok(proof);
            }
            start = end;
        }
        Err(ChainError::ProofNotFound {
            last_proof,
            attempts: limit,
        })
    }

    /// Checks every non-genesis block's proof against its predecessor's proof.
    pub fn verify_proofs(&self, blocks: &[Block]) -> Result<()> {
        for pair in blocks.windows(2) {
            let (previous, block) = (&pair[0], &pair[1]);
            if !self.valid_proof(previous.proof(), block.proof()) {
                return Err(ChainError::InvalidProofOfWork {
                    index: block.index(),
                });
            }
        }
        Ok(())
    }

    fn limit(&self) -> u64 {
        self.max_iterations.unwrap_or(u64::MAX)
    }
}

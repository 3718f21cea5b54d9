/// Transaction types for powledger
use crate::crypto::{canonical_hash, json_f64};
use crate::error::ChainError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Sender identifier used for mining reward transactions.
pub const MINING_REWARD_SENDER: &str = "0";

/// A value transfer waiting in the pending pool or sealed into a block.
///
/// Fields are private so a transaction cannot change once created; the
/// serialized field names are `sender`, `recipient` and `amount`.
/// Deserialization goes through [`Transaction::new`], so a transaction read
/// back from JSON obeys the same amount rules as a submitted one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTransaction")]
pub struct Transaction {
    sender: String,
    recipient: String,
    amount: f64,
}

/// Unchecked wire form of a [`Transaction`].
#[derive(Deserialize)]
struct RawTransaction {
    sender: String,
    recipient: String,
    amount: f64,
}

impl TryFrom<RawTransaction> for Transaction {
    type Error = ChainError;

    fn try_from(raw: RawTransaction) -> Result<Self, Self::Error> {
        Transaction::new(raw.sender, raw.recipient, raw.amount)
    }
}

impl Transaction {
    /// Builds a transaction, rejecting amounts that are negative, NaN or infinite.
    pub fn new(
        sender: impl Into<String>,
        recipient: impl Into<String>,
        amount: f64,
    ) -> Result<Self, ChainError> {
        super::validation::validate_amount(amount)?;
        Ok(Transaction {
            sender: sender.into(),
            recipient: recipient.into(),
            amount,
        })
    }

    /// Mining reward credited to `recipient`.
    pub fn reward(recipient: impl Into<String>, amount: f64) -> Result<Self, ChainError> {
        Self::new(MINING_REWARD_SENDER, recipient, amount)
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn is_reward(&self) -> bool {
        self.sender == MINING_REWARD_SENDER
    }

    /// JSON object with the wire field names, used for canonical hashing.
    pub fn to_canonical_value(&self) -> Value {
        json!({
            "sender": self.sender,
            "recipient": self.recipient,
            "amount": json_f64(self.amount),
        })
    }

    /// Hex digest of the canonical encoding of this transaction.
    pub fn hash_str(&self) -> String {
        canonical_hash(self.to_canonical_value())
    }
}

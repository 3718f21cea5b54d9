/// Validation logic for transactions separated from type definitions
use crate::error::ChainError;

/// Amounts must be finite and non-negative; identifiers are left to the caller.
pub fn validate_amount(amount: f64) -> Result<(), ChainError> {
    if !amount.is_finite() {
        return Err(ChainError::InvalidTransaction(format!(
            "Amount must be a finite number, got {}",
            amount
        )));
    }

    if amount < 0.0 {
        return Err(ChainError::InvalidTransaction(format!(
            "Amount must not be negative, got {}",
            amount
        )));
    }

    Ok(())
}

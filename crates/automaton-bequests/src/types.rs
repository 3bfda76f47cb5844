//! Bequest types.

use serde::{Deserialize, Serialize};

/// How much of an asset a transfer moves.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Amount {
    Fixed(f64),
    /// Whatever is left of the asset after the fixed transfers.
    RemainingBalance,
    /// The entire asset balance at execution time.
    All,
}

impl Amount {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "remaining_balance" => Some(Amount::RemainingBalance),
            "all" => Some(Amount::All),
            number => number.parse::<f64>().ok().map(Amount::Fixed),
        }
    }

    pub fn is_fixed(&self) -> bool {
        matches!(self, Amount::Fixed(_))
    }
}

/// One declared transfer from the will.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BequestTransfer {
    pub recipient: String,
    pub asset: String,
    pub amount: Amount,
    pub chain: String,
    pub note: String,
}

/// One row of the execution log.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransferResult {
    pub recipient: String,
    pub asset: String,
    pub amount: f64,
    pub tx_hash: Option<String>,
    pub success: bool,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amount_parses_all_three_forms() {
        assert_eq!(Amount::parse("70"), Some(Amount::Fixed(70.0)));
        assert_eq!(Amount::parse("0.5"), Some(Amount::Fixed(0.5)));
        assert_eq!(
            Amount::parse("remaining_balance"),
            Some(Amount::RemainingBalance)
        );
        assert_eq!(Amount::parse("all"), Some(Amount::All));
        assert_eq!(Amount::parse("much"), None);
    }
}

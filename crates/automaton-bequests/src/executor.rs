//! Bequest validation and execution.
//!
//! Execution never aborts the sequence: every declared transfer gets a
//! result row, failed or not. Fixed amounts run in declared order, scaled
//! down per asset when they exceed the balance; `remaining_balance` runs
//! last per asset and consumes what is left.

use crate::parser::parse_bequests;
use crate::types::{Amount, BequestTransfer, TransferResult};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{info, warn};

/// On-chain collaborator. Both calls are bounded by the executor deadline.
#[async_trait::async_trait]
pub trait TransferExecutor: Send + Sync {
    /// Current balance of an asset on a chain.
    async fn balance(&self, asset: &str, chain: &str) -> Result<f64, String>;
    /// Perform the transfer; returns a transaction hash.
    async fn transfer(&self, transfer: &BequestTransfer, amount: f64)
        -> Result<String, String>;
}

fn valid_recipient(recipient: &str) -> bool {
    recipient.len() == 42
        && recipient.starts_with("0x")
        && recipient[2..].chars().all(|c| c.is_ascii_hexdigit())
}

/// Per-entry validation errors, index-aligned with the input.
pub fn validate(transfers: &[BequestTransfer]) -> Vec<Option<String>> {
    let mut seen_remaining = false;
    transfers
        .iter()
        .map(|t| {
            if !valid_recipient(&t.recipient) {
                return Some(format!("invalid recipient address: {}", t.recipient));
            }
            match t.amount {
                Amount::Fixed(a) if a <= 0.0 => {
                    Some(format!("amount must be positive, got {a}"))
                }
                Amount::RemainingBalance if seen_remaining => {
                    Some("more than one remaining_balance entry".to_string())
                }
                Amount::RemainingBalance => {
                    seen_remaining = true;
                    None
                }
                _ => None,
            }
        })
        .collect()
}

fn round6(x: f64) -> f64 {
    (x * 1_000_000.0).floor() / 1_000_000.0
}

fn failure(t: &BequestTransfer, amount: f64, error: String) -> TransferResult {
    TransferResult {
        recipient: t.recipient.clone(),
        asset: t.asset.clone(),
        amount,
        tx_hash: None,
        success: false,
        error: Some(error),
    }
}

async fn run_one(
    executor: &dyn TransferExecutor,
    transfer: &BequestTransfer,
    amount: f64,
    deadline: Duration,
) -> TransferResult {
    let call = executor.transfer(transfer, amount);
    match tokio::time::timeout(deadline, call).await {
        Ok(Ok(tx_hash)) => {
            info!(
                "Bequest executed: {} {} to {} ({})",
                amount, transfer.asset, transfer.recipient, tx_hash
            );
            TransferResult {
                recipient: transfer.recipient.clone(),
                asset: transfer.asset.clone(),
                amount,
                tx_hash: Some(tx_hash),
                success: true,
                error: None,
            }
        }
        Ok(Err(e)) => {
            warn!("Bequest transfer failed: {e}");
            failure(transfer, amount, e)
        }
        Err(_) => {
            warn!("Bequest transfer timed out after {deadline:?}");
            failure(transfer, amount, format!("timed out after {deadline:?}"))
        }
    }
}

/// Parse, validate and execute the will's bequests. One result row per
/// declared transfer; a failure never stops the rest.
pub async fn execute_bequests(
    will: &str,
    executor: &dyn TransferExecutor,
    per_transfer_deadline: Duration,
) -> Vec<TransferResult> {
    let transfers = parse_bequests(will);
    let errors = validate(&transfers);

    // Balance per asset, queried once. The first declared chain for an
    // asset is the one asked.
    let mut balances: HashMap<String, f64> = HashMap::new();
    for t in &transfers {
        if balances.contains_key(&t.asset) {
            continue;
        }
        let balance = match tokio::time::timeout(
            per_transfer_deadline,
            executor.balance(&t.asset, &t.chain),
        )
        .await
        {
            Ok(Ok(b)) => b,
            Ok(Err(e)) => {
                warn!("Balance query for {} failed: {e}", t.asset);
                0.0
            }
            Err(_) => {
                warn!("Balance query for {} timed out", t.asset);
                0.0
            }
        };
        balances.insert(t.asset.clone(), balance);
    }

    // Per-asset scaling: if the fixed sum exceeds the balance and no "all"
    // entry exists for the asset, every fixed amount shrinks by
    // balance / sum, floored at six decimals.
    let mut scale: HashMap<String, f64> = HashMap::new();
    for (asset, balance) in &balances {
        let fixed_sum: f64 = transfers
            .iter()
            .zip(&errors)
            .filter(|(t, err)| err.is_none() && t.asset == *asset)
            .filter_map(|(t, _)| match t.amount {
                Amount::Fixed(a) => Some(a),
                _ => None,
            })
            .sum();
        let has_all = transfers
            .iter()
            .zip(&errors)
            .any(|(t, err)| err.is_none() && t.asset == *asset && t.amount == Amount::All);
        if fixed_sum > *balance && !has_all && fixed_sum > 0.0 {
            scale.insert(asset.clone(), balance / fixed_sum);
            info!(
                "Scaling {} bequests by {:.6} (declared {} > balance {})",
                asset,
                balance / fixed_sum,
                fixed_sum,
                balance
            );
        }
    }

    let mut remaining: HashMap<String, f64> = balances.clone();
    let mut results = Vec::with_capacity(transfers.len());
    let mut residual_queue: Vec<&BequestTransfer> = Vec::new();

    // Pass 1: declared order, fixed and "all" amounts.
    for (transfer, error) in transfers.iter().zip(&errors) {
        if let Some(reason) = error {
            results.push(failure(transfer, 0.0, reason.clone()));
            continue;
        }
        match transfer.amount {
            Amount::RemainingBalance => residual_queue.push(transfer),
            Amount::Fixed(declared) => {
                let factor = scale.get(&transfer.asset).copied().unwrap_or(1.0);
                let amount = round6(declared * factor);
                let result = run_one(executor, transfer, amount, per_transfer_deadline).await;
                if result.success {
                    if let Some(r) = remaining.get_mut(&transfer.asset) {
                        *r -= amount;
                    }
                }
                results.push(result);
            }
            Amount::All => {
                let amount = round6(remaining.get(&transfer.asset).copied().unwrap_or(0.0));
                let result = run_one(executor, transfer, amount, per_transfer_deadline).await;
                if result.success {
                    if let Some(r) = remaining.get_mut(&transfer.asset) {
                        *r -= amount;
                    }
                }
                results.push(result);
            }
        }
    }

    // Pass 2: remaining_balance, last per asset.
    for transfer in residual_queue {
        let amount = round6(remaining.get(&transfer.asset).copied().unwrap_or(0.0).max(0.0));
        let result = run_one(executor, transfer, amount, per_transfer_deadline).await;
        if result.success {
            if let Some(r) = remaining.get_mut(&transfer.asset) {
                *r -= amount;
            }
        }
        results.push(result);
    }

    results
}

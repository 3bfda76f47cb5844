//! Integration tests for automaton-bequests
//!
//! A mock executor stands in for the chain; the scenarios cover scaling,
//! residual transfers, and failure isolation.

use automaton_bequests::{execute_bequests, Amount, BequestTransfer, TransferExecutor};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

const ALICE: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
const BOB: &str = "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
const CARA: &str = "0xcccccccccccccccccccccccccccccccccccccccc";

struct MockChain {
    balances: Mutex<HashMap<String, f64>>,
    executed: Mutex<Vec<(String, f64)>>,
    fail_recipients: Vec<String>,
}

impl MockChain {
    fn with_balance(asset: &str, balance: f64) -> Self {
        Self {
            balances: Mutex::new(HashMap::from([(asset.to_string(), balance)])),
            executed: Mutex::new(Vec::new()),
            fail_recipients: Vec::new(),
        }
    }

    fn failing_for(mut self, recipient: &str) -> Self {
        self.fail_recipients.push(recipient.to_string());
        self
    }
}

#[async_trait::async_trait]
impl TransferExecutor for MockChain {
    async fn balance(&self, asset: &str, _chain: &str) -> Result<f64, String> {
        Ok(*self.balances.lock().unwrap().get(asset).unwrap_or(&0.0))
    }

    async fn transfer(
        &self,
        transfer: &BequestTransfer,
        amount: f64,
    ) -> Result<String, String> {
        if self.fail_recipients.contains(&transfer.recipient) {
            return Err("chain rejected transfer".to_string());
        }
        let mut balances = self.balances.lock().unwrap();
        let balance = balances.entry(transfer.asset.clone()).or_insert(0.0);
        *balance -= amount;
        self.executed
            .lock()
            .unwrap()
            .push((transfer.recipient.clone(), amount));
        Ok(format!("0xhash{:04}", self.executed.lock().unwrap().len()))
    }
}

fn will(entries: &[(&str, &str, &str)]) -> String {
    let mut out = String::from("# Will\n\nWhat I leave behind.\n\n[bequests]\n");
    for (recipient, asset, amount) in entries {
        out.push_str(&format!(
            "\n[[bequests.transfer]]\nrecipient = \"{recipient}\"\nasset = \"{asset}\"\namount = \"{amount}\"\nchain = \"base\"\nnote = \"gift\"\n"
        ));
    }
    out
}

const DEADLINE: Duration = Duration::from_secs(5);

// ============================================================
// Scaling (scenario: fixed transfers exceed the balance)
// ============================================================

#[tokio::test]
async fn overdrawn_fixed_transfers_scale_to_the_balance() {
    let chain = MockChain::with_balance("USDC", 100.0);
    let doc = will(&[(ALICE, "USDC", "70"), (BOB, "USDC", "60")]);

    let results = execute_bequests(&doc, &chain, DEADLINE).await;
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.success));

    // 100/130 scaling, floored at six decimals.
    assert_eq!(results[0].amount, 53.846153);
    assert_eq!(results[1].amount, 46.153846);
    let spent: f64 = results.iter().map(|r| r.amount).sum();
    assert!(spent <= 100.0);
    assert!(100.0 - spent < 1e-5, "residual is dust only");
}

#[tokio::test]
async fn sufficient_balance_needs_no_scaling() {
    let chain = MockChain::with_balance("USDC", 500.0);
    let doc = will(&[(ALICE, "USDC", "70"), (BOB, "USDC", "60")]);
    let results = execute_bequests(&doc, &chain, DEADLINE).await;
    assert_eq!(results[0].amount, 70.0);
    assert_eq!(results[1].amount, 60.0);
}

// ============================================================
// Residual transfer
// ============================================================

#[tokio::test]
async fn remaining_balance_runs_last_and_consumes_the_rest() {
    let chain = MockChain::with_balance("USDC", 100.0);
    let doc = will(&[
        (CARA, "USDC", "remaining_balance"),
        (ALICE, "USDC", "30"),
        (BOB, "USDC", "20"),
    ]);

    let results = execute_bequests(&doc, &chain, DEADLINE).await;
    assert_eq!(results.len(), 3);

    // Fixed transfers first in declared order, residual appended last.
    assert_eq!(results[0].recipient, ALICE);
    assert_eq!(results[1].recipient, BOB);
    assert_eq!(results[2].recipient, CARA);
    assert_eq!(results[2].amount, 50.0);

    let order = chain.executed.lock().unwrap();
    assert_eq!(order.last().unwrap().0, CARA);
}

#[tokio::test]
async fn failed_transfer_leaves_its_amount_for_the_residual() {
    let chain = MockChain::with_balance("USDC", 100.0).failing_for(ALICE);
    let doc = will(&[
        (ALICE, "USDC", "30"),
        (BOB, "USDC", "20"),
        (CARA, "USDC", "remaining_balance"),
    ]);

    let results = execute_bequests(&doc, &chain, DEADLINE).await;
    assert!(!results[0].success);
    assert!(results[0].error.as_ref().unwrap().contains("rejected"));
    assert!(results[1].success, "failure does not abort the sequence");
    assert!(results[2].success);
    // Alice's 30 never left, so the residual includes it.
    assert_eq!(results[2].amount, 80.0);
}

// ============================================================
// Validation in the result stream
// ============================================================

#[tokio::test]
async fn invalid_entries_get_result_rows_but_no_execution() {
    let chain = MockChain::with_balance("USDC", 100.0);
    let doc = will(&[("0xnot-an-address", "USDC", "10"), (BOB, "USDC", "20")]);

    let results = execute_bequests(&doc, &chain, DEADLINE).await;
    assert_eq!(results.len(), 2);
    assert!(!results[0].success);
    assert!(results[0].error.as_ref().unwrap().contains("recipient"));
    assert!(results[1].success);

    let executed = chain.executed.lock().unwrap();
    assert_eq!(executed.len(), 1);
}

#[tokio::test]
async fn empty_will_executes_nothing() {
    let chain = MockChain::with_balance("USDC", 100.0);
    let results = execute_bequests("# Will\n\nNothing.\n", &chain, DEADLINE).await;
    assert!(results.is_empty());
}

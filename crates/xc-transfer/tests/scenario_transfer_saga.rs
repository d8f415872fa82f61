//! Saga behavior against in-process gateways that record every call.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use xc_config::{Category, LedgerConfig};
use xc_dfp::Dfp;
use xc_exchange::{ExchangeError, TransferAck};
use xc_ledger::LedgerError;
use xc_transfer::{
    AccountLookup, ExchangeTransfer, JournalStep, LedgerJournal, TransferError, TransferLeg,
    TransferOrchestrator, TransferRequest,
};

fn ledger_cfg() -> LedgerConfig {
    LedgerConfig {
        apikey: "k".to_string(),
        base_url: "http://ledger.example".to_string(),
        cat_funding: 6,
        cat_spot_available: 7,
        cat_spot_hold: 8,
    }
}

// ---------------------------------------------------------------------------
// Recording fakes
// ---------------------------------------------------------------------------

#[derive(Default)]
struct FakeExchange {
    calls: Mutex<Vec<(String, String, String, String)>>,
    fail: bool,
}

#[async_trait]
impl ExchangeTransfer for FakeExchange {
    async fn transfer(
        &self,
        from_code: &str,
        to_code: &str,
        currency: &str,
        amount: &str,
    ) -> Result<TransferAck, ExchangeError> {
        self.calls.lock().unwrap().push((
            from_code.to_string(),
            to_code.to_string(),
            currency.to_string(),
            amount.to_string(),
        ));
        if self.fail {
            return Err(ExchangeError::Status {
                code: 400,
                body: "insufficient funds".to_string(),
            });
        }
        Ok(TransferAck {
            transfer_id: "248263".to_string(),
            currency: currency.to_string(),
            result: true,
        })
    }
}

/// Keys are (category_id, symbol); values the matching account ids.
struct FakeLookup {
    accounts: HashMap<(u32, String), Vec<u32>>,
}

impl FakeLookup {
    fn with(entries: &[(u32, &str, &[u32])]) -> Self {
        let mut accounts = HashMap::new();
        for (category_id, symbol, ids) in entries {
            accounts.insert((*category_id, symbol.to_string()), ids.to_vec());
        }
        Self { accounts }
    }
}

#[async_trait]
impl AccountLookup for FakeLookup {
    async fn account_ids(
        &self,
        category_id: u32,
        symbol: &str,
    ) -> Result<Vec<u32>, LedgerError> {
        Ok(self
            .accounts
            .get(&(category_id, symbol.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum JournalCall {
    Transaction { notes: String },
    Distribution {
        account_id: u32,
        amount: Dfp,
        transaction_id: u32,
    },
}

#[derive(Default)]
struct FakeJournal {
    calls: Mutex<Vec<JournalCall>>,
    next_id: AtomicU32,
    fail_on_distribution: Option<usize>,
}

impl FakeJournal {
    fn new() -> Self {
        Self {
            next_id: AtomicU32::new(42),
            ..Default::default()
        }
    }
}

#[async_trait]
impl LedgerJournal for FakeJournal {
    async fn create_transaction(&self, notes: &str, _time: &str) -> Result<u32, LedgerError> {
        self.calls.lock().unwrap().push(JournalCall::Transaction {
            notes: notes.to_string(),
        });
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn create_distribution(
        &self,
        account_id: u32,
        amount: Dfp,
        transaction_id: u32,
    ) -> Result<u32, LedgerError> {
        let dist_count = self
            .calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| matches!(c, JournalCall::Distribution { .. }))
            .count();
        if self.fail_on_distribution == Some(dist_count) {
            return Err(LedgerError::Status {
                code: 500,
                body: "write failed".to_string(),
            });
        }
        self.calls.lock().unwrap().push(JournalCall::Distribution {
            account_id,
            amount,
            transaction_id,
        });
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst))
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn happy_path_posts_one_transaction_and_balanced_distributions() {
    // from=SpotAvailable (cat 7, account 10), to=Funding (cat 6, account 20).
    let exchange = FakeExchange::default();
    let lookup = FakeLookup::with(&[(7, "BTC", &[10]), (6, "BTC", &[20])]);
    let journal = FakeJournal::new();
    let cfg = ledger_cfg();

    let orchestrator = TransferOrchestrator::new(&exchange, &journal, &lookup, &cfg);
    let req = TransferRequest::new("BTC", "1", "6", "1.25").unwrap();
    let receipt = orchestrator.run(&req).await.unwrap();

    assert_eq!(receipt.exchange_transfer_id, "248263");
    assert_eq!(receipt.source_account, 10);
    assert_eq!(receipt.dest_account, 20);

    // The exchange saw the request's own fields, not anything canned.
    let exchange_calls = exchange.calls.lock().unwrap();
    assert_eq!(
        exchange_calls.as_slice(),
        &[(
            "1".to_string(),
            "6".to_string(),
            "BTC".to_string(),
            "1.25".to_string()
        )]
    );

    // One transaction, then +1.25 to 20 and -1.25 to 10, same txid.
    let journal_calls = journal.calls.lock().unwrap();
    assert_eq!(journal_calls.len(), 3);
    assert!(matches!(&journal_calls[0], JournalCall::Transaction { notes } if notes.contains("BTC")));
    assert_eq!(
        journal_calls[1],
        JournalCall::Distribution {
            account_id: 20,
            amount: Dfp::new(125, -2),
            transaction_id: receipt.transaction_id,
        }
    );
    assert_eq!(
        journal_calls[2],
        JournalCall::Distribution {
            account_id: 10,
            amount: Dfp::new(-125, -2),
            transaction_id: receipt.transaction_id,
        }
    );
}

#[tokio::test]
async fn same_leg_fails_validation_with_zero_network_calls() {
    let exchange = FakeExchange::default();
    let lookup = FakeLookup::with(&[]);
    let journal = FakeJournal::new();
    let cfg = ledger_cfg();

    let orchestrator = TransferOrchestrator::new(&exchange, &journal, &lookup, &cfg);
    let req = TransferRequest {
        currency: "BTC".to_string(),
        from: Category::Funding,
        to: Category::Funding,
        quantity: Dfp::new(125, -2),
    };

    let err = orchestrator.run(&req).await.unwrap_err();
    assert!(matches!(err, TransferError::Validation(_)));
    assert!(exchange.calls.lock().unwrap().is_empty());
    assert!(journal.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn exchange_failure_leaves_the_ledger_untouched() {
    let exchange = FakeExchange {
        fail: true,
        ..Default::default()
    };
    let lookup = FakeLookup::with(&[(7, "BTC", &[10]), (6, "BTC", &[20])]);
    let journal = FakeJournal::new();
    let cfg = ledger_cfg();

    let orchestrator = TransferOrchestrator::new(&exchange, &journal, &lookup, &cfg);
    let req = TransferRequest::new("BTC", "1", "6", "1.25").unwrap();

    let err = orchestrator.run(&req).await.unwrap_err();
    assert!(matches!(err, TransferError::Exchange(_)));
    assert!(journal.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn missing_destination_account_aborts_after_the_exchange_call() {
    // Source resolves; destination has no configured account.
    let exchange = FakeExchange::default();
    let lookup = FakeLookup::with(&[(7, "BTC", &[10])]);
    let journal = FakeJournal::new();
    let cfg = ledger_cfg();

    let orchestrator = TransferOrchestrator::new(&exchange, &journal, &lookup, &cfg);
    let req = TransferRequest::new("BTC", "1", "6", "1.25").unwrap();

    let err = orchestrator.run(&req).await.unwrap_err();
    match &err {
        TransferError::Resolve { leg, .. } => assert_eq!(*leg, TransferLeg::Destination),
        other => panic!("expected resolve failure, got: {other}"),
    }
    // The exchange leg already landed; zero ledger writes happened. The
    // error text must send the operator to reconciliation.
    assert_eq!(exchange.calls.lock().unwrap().len(), 1);
    assert!(journal.calls.lock().unwrap().is_empty());
    assert!(err.to_string().contains("reconciliation"));
}

#[tokio::test]
async fn ambiguous_account_configuration_fails_instead_of_guessing() {
    let exchange = FakeExchange::default();
    let lookup = FakeLookup::with(&[(7, "BTC", &[10, 11]), (6, "BTC", &[20])]);
    let journal = FakeJournal::new();
    let cfg = ledger_cfg();

    let orchestrator = TransferOrchestrator::new(&exchange, &journal, &lookup, &cfg);
    let req = TransferRequest::new("BTC", "1", "6", "1.25").unwrap();

    let err = orchestrator.run(&req).await.unwrap_err();
    match err {
        TransferError::Resolve { leg, source } => {
            assert_eq!(leg, TransferLeg::Source);
            assert!(source.to_string().contains("ambiguous"));
        }
        other => panic!("expected resolve failure, got: {other}"),
    }
    assert!(journal.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn second_distribution_failure_leaves_the_partial_journal_in_place() {
    let exchange = FakeExchange::default();
    let lookup = FakeLookup::with(&[(7, "BTC", &[10]), (6, "BTC", &[20])]);
    let journal = FakeJournal {
        fail_on_distribution: Some(1), // debit lands, credit fails
        ..FakeJournal::new()
    };
    let cfg = ledger_cfg();

    let orchestrator = TransferOrchestrator::new(&exchange, &journal, &lookup, &cfg);
    let req = TransferRequest::new("BTC", "1", "6", "1.25").unwrap();

    let err = orchestrator.run(&req).await.unwrap_err();
    match err {
        TransferError::Journal { step, .. } => {
            assert_eq!(step, JournalStep::CreditDistribution)
        }
        other => panic!("expected journal failure, got: {other}"),
    }

    // No compensation: the transaction and the debit stay exactly as written.
    let calls = journal.calls.lock().unwrap();
    assert_eq!(calls.len(), 2);
    assert!(matches!(calls[0], JournalCall::Transaction { .. }));
    assert!(matches!(
        calls[1],
        JournalCall::Distribution { account_id: 20, .. }
    ));
}

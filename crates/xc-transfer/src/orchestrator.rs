//! The cross-ledger transfer saga.
//!
//! Step order is load-bearing: the exchange call comes first because its
//! failure must leave the ledger untouched, and each later step records
//! precisely how far the sequence got before failing.

use crate::resolve::{AccountLookup, AccountResolver, ResolveError};
use crate::TransferRequest;
use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use std::fmt;
use xc_config::LedgerConfig;
use xc_dfp::Dfp;
use xc_exchange::{ExchangeClient, ExchangeError, TransferAck};
use xc_ledger::{LedgerClient, LedgerError};

// ---------------------------------------------------------------------------
// Gateway seams
// ---------------------------------------------------------------------------

/// The single exchange call the saga makes.
#[async_trait]
pub trait ExchangeTransfer: Send + Sync {
    async fn transfer(
        &self,
        from_code: &str,
        to_code: &str,
        currency: &str,
        amount: &str,
    ) -> Result<TransferAck, ExchangeError>;
}

#[async_trait]
impl ExchangeTransfer for ExchangeClient {
    async fn transfer(
        &self,
        from_code: &str,
        to_code: &str,
        currency: &str,
        amount: &str,
    ) -> Result<TransferAck, ExchangeError> {
        ExchangeClient::transfer(self, from_code, to_code, currency, amount).await
    }
}

/// The two ledger write endpoints the saga uses.
#[async_trait]
pub trait LedgerJournal: Send + Sync {
    async fn create_transaction(&self, notes: &str, time: &str) -> Result<u32, LedgerError>;

    async fn create_distribution(
        &self,
        account_id: u32,
        amount: Dfp,
        transaction_id: u32,
    ) -> Result<u32, LedgerError>;
}

#[async_trait]
impl LedgerJournal for LedgerClient {
    async fn create_transaction(&self, notes: &str, time: &str) -> Result<u32, LedgerError> {
        LedgerClient::create_transaction(self, notes, time).await
    }

    async fn create_distribution(
        &self,
        account_id: u32,
        amount: Dfp,
        transaction_id: u32,
    ) -> Result<u32, LedgerError> {
        LedgerClient::create_distribution(self, account_id, amount, transaction_id).await
    }
}

// ---------------------------------------------------------------------------
// Outcome types
// ---------------------------------------------------------------------------

/// Everything a completed transfer produced, for the operator's records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferReceipt {
    pub exchange_transfer_id: String,
    pub source_account: u32,
    pub dest_account: u32,
    pub transaction_id: u32,
    pub debit_distribution_id: u32,
    pub credit_distribution_id: u32,
}

/// Which leg of the transfer a resolution failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferLeg {
    Source,
    Destination,
}

impl fmt::Display for TransferLeg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferLeg::Source => f.write_str("source"),
            TransferLeg::Destination => f.write_str("destination"),
        }
    }
}

/// Which ledger write failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JournalStep {
    Transaction,
    DebitDistribution,
    CreditDistribution,
}

impl fmt::Display for JournalStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JournalStep::Transaction => f.write_str("create transaction"),
            JournalStep::DebitDistribution => f.write_str("create debit distribution"),
            JournalStep::CreditDistribution => f.write_str("create credit distribution"),
        }
    }
}

/// How a transfer failed, and — critically — what state it left behind.
///
/// `Exchange` means zero effect anywhere past the exchange's own rejection.
/// Every later variant means the exchange-side transfer already landed; the
/// `Display` text says so explicitly because the operator's next move is to
/// re-run reconciliation and clean up by hand.
#[derive(Debug)]
pub enum TransferError {
    Validation(crate::ValidationError),
    /// The exchange call failed; no ledger write was attempted.
    Exchange(ExchangeError),
    /// Account resolution failed after the exchange call succeeded.
    Resolve {
        leg: TransferLeg,
        source: ResolveError,
    },
    /// A ledger write failed after the exchange call succeeded; the journal
    /// may hold a transaction with zero, one, or an unbalanced set of
    /// distributions.
    Journal {
        step: JournalStep,
        source: LedgerError,
    },
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferError::Validation(err) => write!(f, "invalid transfer request: {err}"),
            TransferError::Exchange(err) => {
                write!(f, "exchange transfer failed, no ledger write attempted: {err}")
            }
            TransferError::Resolve { leg, source } => write!(
                f,
                "{leg} account resolution failed: {source}. \
                 The exchange-side transfer already completed and the ledger was \
                 not written; run a reconciliation and repair by hand"
            ),
            TransferError::Journal { step, source } => write!(
                f,
                "ledger write '{step}' failed: {source}. \
                 The exchange-side transfer already completed and the ledger may \
                 be partially written; run a reconciliation and repair by hand"
            ),
        }
    }
}

impl std::error::Error for TransferError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransferError::Validation(err) => Some(err),
            TransferError::Exchange(err) => Some(err),
            TransferError::Resolve { source, .. } => Some(source),
            TransferError::Journal { source, .. } => Some(source),
        }
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Runs the transfer saga:
///
/// ```text
/// validate -> exchange transfer -> resolve source -> resolve destination
///   -> create transaction -> debit distribution -> credit distribution
/// ```
///
/// Every step runs at most once. A failure aborts immediately; nothing is
/// retried and nothing is rolled back.
pub struct TransferOrchestrator<'a> {
    exchange: &'a dyn ExchangeTransfer,
    journal: &'a dyn LedgerJournal,
    lookup: &'a dyn AccountLookup,
    ledger_cfg: &'a LedgerConfig,
}

impl<'a> TransferOrchestrator<'a> {
    pub fn new(
        exchange: &'a dyn ExchangeTransfer,
        journal: &'a dyn LedgerJournal,
        lookup: &'a dyn AccountLookup,
        ledger_cfg: &'a LedgerConfig,
    ) -> Self {
        Self {
            exchange,
            journal,
            lookup,
            ledger_cfg,
        }
    }

    pub async fn run(&self, req: &TransferRequest) -> Result<TransferReceipt, TransferError> {
        // Re-validate even though TransferRequest::new already did: the
        // fields are public and this check must hold before any network
        // effect, whoever built the value.
        if req.from == req.to {
            return Err(TransferError::Validation(crate::ValidationError::SameLeg(
                req.from,
            )));
        }
        let (from_code, to_code) = match (req.from.transfer_code(), req.to.transfer_code()) {
            (Some(from), Some(to)) => (from, to),
            _ => {
                let bad = if req.from.transfer_code().is_none() {
                    req.from
                } else {
                    req.to
                };
                return Err(TransferError::Validation(
                    crate::ValidationError::UnknownLegCode(bad.to_string()),
                ));
            }
        };

        let amount = req.quantity.to_string();
        tracing::info!(
            currency = %req.currency,
            from = %req.from,
            to = %req.to,
            amount = %amount,
            "starting transfer"
        );

        // Step 1: the exchange moves the funds. Failing here is the only
        // fully safe failure.
        let ack = self
            .exchange
            .transfer(from_code, to_code, &req.currency, &amount)
            .await
            .map_err(TransferError::Exchange)?;
        tracing::info!(transfer_id = %ack.transfer_id, "exchange transfer completed");

        // Steps 2-3: find the two journal accounts.
        let resolver = AccountResolver::new(self.lookup, self.ledger_cfg);
        let source_account = resolver
            .resolve(req.from, &req.currency)
            .await
            .map_err(|source| TransferError::Resolve {
                leg: TransferLeg::Source,
                source,
            })?;
        let dest_account = resolver
            .resolve(req.to, &req.currency)
            .await
            .map_err(|source| TransferError::Resolve {
                leg: TransferLeg::Destination,
                source,
            })?;

        // Step 4: one transaction record shared by both distributions.
        let notes = format!("xconnect transfer {}", req.currency);
        let time = Utc::now().to_rfc3339();
        let transaction_id = self
            .journal
            .create_transaction(&notes, &time)
            .await
            .map_err(|source| TransferError::Journal {
                step: JournalStep::Transaction,
                source,
            })?;
        tracing::info!(transaction_id, "ledger transaction created");

        // Steps 5-6: +quantity to the destination, -quantity to the source,
        // carrying the exact (amount, exp) decomposition.
        let debit_distribution_id = self
            .journal
            .create_distribution(dest_account.id, req.quantity, transaction_id)
            .await
            .map_err(|source| TransferError::Journal {
                step: JournalStep::DebitDistribution,
                source,
            })?;
        let credit_distribution_id = self
            .journal
            .create_distribution(source_account.id, -req.quantity, transaction_id)
            .await
            .map_err(|source| TransferError::Journal {
                step: JournalStep::CreditDistribution,
                source,
            })?;
        tracing::info!(
            debit_distribution_id,
            credit_distribution_id,
            "ledger distributions created"
        );

        Ok(TransferReceipt {
            exchange_transfer_id: ack.transfer_id,
            source_account: source_account.id,
            dest_account: dest_account.id,
            transaction_id,
            debit_distribution_id,
            credit_distribution_id,
        })
    }
}

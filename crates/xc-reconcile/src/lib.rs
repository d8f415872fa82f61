//! xc-reconcile
//!
//! Balance reconciliation between the exchange and the bookkeeping ledger.
//!
//! Architectural decisions:
//! - Collectors are the only IO; the merge/mismatch engine is pure and
//!   deterministic (`BTreeMap`-keyed by currency symbol).
//! - "Balance observed as zero" and "no account on this side" are distinct
//!   states and only the latter pairs with absence in a mismatch.
//! - A failed collector aborts the whole run. A partial reconciliation
//!   presented as complete would read as false agreement.
//! - One unparseable balance string degrades that entry to absent (with a
//!   warning), never the batch.

mod collect;
mod engine;
mod runner;

pub use collect::{
    BalanceSource, CollectError, ExchangeFundingSource, ExchangeSpotAvailableSource,
    ExchangeSpotHoldSource, LedgerCategorySource, SourceBalance,
};
pub use engine::{merge, mismatches};
pub use runner::{reconcile_category, run};

use serde::Serialize;
use xc_config::Category;
use xc_dfp::MaybeBalance;

/// One reconciled (category, currency) pair: what each side reported, and
/// which ledger account carried it (when one exists).
///
/// Created during collector merge, read-only afterward, discarded after the
/// mismatch report. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comparison {
    pub category: Category,
    pub symbol: String,
    pub exchange_balance: MaybeBalance,
    pub ledger_balance: MaybeBalance,
    /// Set only when a matching ledger account was found.
    pub ledger_account_id: Option<u32>,
}

impl Comparison {
    /// A mismatch is: both sides present with unequal values, or exactly one
    /// side present. Two absent sides is never a mismatch.
    pub fn is_mismatch(&self) -> bool {
        !self.exchange_balance.agrees_with(&self.ledger_balance)
    }
}

impl std::fmt::Display for Comparison {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}: exchange={} ledger={}",
            self.category, self.symbol, self.exchange_balance, self.ledger_balance
        )
    }
}

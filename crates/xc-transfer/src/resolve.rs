//! Resolution of (category, currency) pairs to bookkeeping account ids.

use async_trait::async_trait;
use std::fmt;
use xc_config::{Category, LedgerConfig};
use xc_ledger::{LedgerClient, LedgerError};

/// The ledger query the resolver needs, as a seam so tests can resolve
/// against in-process fixtures.
#[async_trait]
pub trait AccountLookup: Send + Sync {
    /// Ids of every account tagged `category_id` and denominated in `symbol`.
    async fn account_ids(&self, category_id: u32, symbol: &str)
        -> Result<Vec<u32>, LedgerError>;
}

#[async_trait]
impl AccountLookup for LedgerClient {
    async fn account_ids(
        &self,
        category_id: u32,
        symbol: &str,
    ) -> Result<Vec<u32>, LedgerError> {
        self.accounts_by_category_and_currency(category_id, symbol).await
    }
}

/// A successfully resolved account. Transient; lives only for the duration
/// of one transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedAccount {
    pub id: u32,
}

/// Why resolution failed.
#[derive(Debug)]
pub enum ResolveError {
    /// No account carries both the category tag and the currency. The
    /// resolver never creates one — a missing account is a configuration
    /// error to surface, not to mask.
    NotConfigured { category: Category, symbol: String },
    /// More than one account matches. Proceeding would mean guessing which
    /// account carries real money, so this fails instead.
    Ambiguous {
        category: Category,
        symbol: String,
        count: usize,
    },
    /// The lookup itself failed.
    Ledger(LedgerError),
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::NotConfigured { category, symbol } => write!(
                f,
                "no ledger account is configured for {category}/{symbol}"
            ),
            ResolveError::Ambiguous {
                category,
                symbol,
                count,
            } => write!(
                f,
                "ambiguous ledger configuration: {count} accounts match {category}/{symbol}, expected exactly one"
            ),
            ResolveError::Ledger(err) => write!(f, "account lookup failed: {err}"),
        }
    }
}

impl std::error::Error for ResolveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResolveError::Ledger(err) => Some(err),
            _ => None,
        }
    }
}

/// Resolves the unique ledger account for a (category, currency) pair.
pub struct AccountResolver<'a> {
    lookup: &'a dyn AccountLookup,
    ledger_cfg: &'a LedgerConfig,
}

impl<'a> AccountResolver<'a> {
    pub fn new(lookup: &'a dyn AccountLookup, ledger_cfg: &'a LedgerConfig) -> Self {
        Self { lookup, ledger_cfg }
    }

    /// Zero matches fail, one succeeds, several fail as ambiguous. No side
    /// effects on the ledger in any branch.
    pub async fn resolve(
        &self,
        category: Category,
        symbol: &str,
    ) -> Result<ResolvedAccount, ResolveError> {
        let category_id = category.ledger_category_id(self.ledger_cfg);
        let ids = self
            .lookup
            .account_ids(category_id, symbol)
            .await
            .map_err(ResolveError::Ledger)?;

        match ids.as_slice() {
            [] => Err(ResolveError::NotConfigured {
                category,
                symbol: symbol.to_string(),
            }),
            [id] => Ok(ResolvedAccount { id: *id }),
            many => Err(ResolveError::Ambiguous {
                category,
                symbol: symbol.to_string(),
                count: many.len(),
            }),
        }
    }
}

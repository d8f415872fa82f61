//! Balance collectors: one per (source, category) pair.
//!
//! Each collector turns a raw remote response into normalized
//! [`SourceBalance`] observations. Transport/status/decode failures abort
//! the collection; a single unparseable balance string does not — it
//! degrades that one entry to absent with a warning.

use async_trait::async_trait;
use std::fmt;
use xc_dfp::{Dfp, MaybeBalance};
use xc_exchange::{ExchangeClient, ExchangeError};
use xc_ledger::{LedgerClient, LedgerError};

/// One normalized balance observation from a single source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceBalance {
    pub symbol: String,
    pub balance: MaybeBalance,
    /// Populated only by ledger-side sources.
    pub account_id: Option<u32>,
}

/// Why a collection failed. Any of these aborts the whole reconciliation
/// run; reconciliation never reports a partial result.
#[derive(Debug)]
pub enum CollectError {
    Exchange {
        source_name: &'static str,
        source: ExchangeError,
    },
    Ledger {
        source_name: &'static str,
        source: LedgerError,
    },
}

impl fmt::Display for CollectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectError::Exchange {
                source_name,
                source,
            } => write!(f, "collector '{source_name}' failed: {source}"),
            CollectError::Ledger {
                source_name,
                source,
            } => write!(f, "collector '{source_name}' failed: {source}"),
        }
    }
}

impl std::error::Error for CollectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CollectError::Exchange { source, .. } => Some(source),
            CollectError::Ledger { source, .. } => Some(source),
        }
    }
}

/// A source of balance observations for one (source, category) pair.
///
/// Object-safe so the runner and tests can hold `&dyn BalanceSource`.
#[async_trait]
pub trait BalanceSource: Send + Sync {
    /// Identifies this source in errors and logs (e.g. `"exchange-funding"`).
    fn source_name(&self) -> &'static str;

    async fn collect(&self) -> Result<Vec<SourceBalance>, CollectError>;
}

/// Parse an exchange decimal string leniently: a bad string becomes an
/// absent observation, never a batch failure.
fn lenient_balance(source_name: &str, symbol: &str, raw: &str) -> MaybeBalance {
    match Dfp::parse(raw) {
        Ok(dfp) => MaybeBalance::of(dfp),
        Err(err) => {
            tracing::warn!(
                source = source_name,
                symbol = symbol,
                raw = raw,
                %err,
                "unparseable balance string; treating as absent"
            );
            MaybeBalance::absent()
        }
    }
}

// ---------------------------------------------------------------------------
// Exchange-side sources
// ---------------------------------------------------------------------------

/// Funding-wallet balances from the exchange.
pub struct ExchangeFundingSource {
    client: ExchangeClient,
}

impl ExchangeFundingSource {
    pub fn new(client: ExchangeClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BalanceSource for ExchangeFundingSource {
    fn source_name(&self) -> &'static str {
        "exchange-funding"
    }

    async fn collect(&self) -> Result<Vec<SourceBalance>, CollectError> {
        let entries = self
            .client
            .wallet()
            .await
            .map_err(|source| CollectError::Exchange {
                source_name: self.source_name(),
                source,
            })?;

        Ok(entries
            .into_iter()
            .map(|e| SourceBalance {
                balance: lenient_balance(self.source_name(), &e.currency, &e.balance),
                symbol: e.currency,
                account_id: None,
            })
            .collect())
    }
}

/// Which slice of a spot account balance a source reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpotField {
    Available,
    Hold,
}

/// Spot available balances from the exchange.
pub struct ExchangeSpotAvailableSource {
    client: ExchangeClient,
}

impl ExchangeSpotAvailableSource {
    pub fn new(client: ExchangeClient) -> Self {
        Self { client }
    }
}

/// Spot hold balances from the exchange.
pub struct ExchangeSpotHoldSource {
    client: ExchangeClient,
}

impl ExchangeSpotHoldSource {
    pub fn new(client: ExchangeClient) -> Self {
        Self { client }
    }
}

async fn collect_spot(
    client: &ExchangeClient,
    source_name: &'static str,
    field: SpotField,
) -> Result<Vec<SourceBalance>, CollectError> {
    let accounts = client
        .spot_accounts()
        .await
        .map_err(|source| CollectError::Exchange {
            source_name,
            source,
        })?;

    Ok(accounts
        .into_iter()
        .map(|a| {
            let raw = match field {
                SpotField::Available => &a.available,
                SpotField::Hold => &a.hold,
            };
            SourceBalance {
                balance: lenient_balance(source_name, &a.currency, raw),
                symbol: a.currency.clone(),
                account_id: None,
            }
        })
        .collect())
}

#[async_trait]
impl BalanceSource for ExchangeSpotAvailableSource {
    fn source_name(&self) -> &'static str {
        "exchange-spot-available"
    }

    async fn collect(&self) -> Result<Vec<SourceBalance>, CollectError> {
        collect_spot(&self.client, self.source_name(), SpotField::Available).await
    }
}

#[async_trait]
impl BalanceSource for ExchangeSpotHoldSource {
    fn source_name(&self) -> &'static str {
        "exchange-spot-hold"
    }

    async fn collect(&self) -> Result<Vec<SourceBalance>, CollectError> {
        collect_spot(&self.client, self.source_name(), SpotField::Hold).await
    }
}

// ---------------------------------------------------------------------------
// Ledger-side source
// ---------------------------------------------------------------------------

/// Summed distribution balances for every account tagged with one ledger
/// category. The ledger reports native (amount, exp) values, so no string
/// parsing is involved on this side.
pub struct LedgerCategorySource {
    client: LedgerClient,
    category_id: u32,
}

impl LedgerCategorySource {
    pub fn new(client: LedgerClient, category_id: u32) -> Self {
        Self {
            client,
            category_id,
        }
    }
}

#[async_trait]
impl BalanceSource for LedgerCategorySource {
    fn source_name(&self) -> &'static str {
        "ledger-category-sum"
    }

    async fn collect(&self) -> Result<Vec<SourceBalance>, CollectError> {
        let sums = self
            .client
            .category_dist_sums(self.category_id)
            .await
            .map_err(|source| CollectError::Ledger {
                source_name: self.source_name(),
                source,
            })?;

        Ok(sums
            .into_iter()
            .map(|s| SourceBalance {
                symbol: s.account.currency.symbol,
                balance: MaybeBalance::of(s.sum),
                account_id: Some(s.account.account_id),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lenient_balance_parses_good_strings() {
        let mb = lenient_balance("test", "BTC", "1.50000000");
        assert!(mb.present);
        assert_eq!(mb.balance, Dfp::new(150000000, -8));
    }

    #[test]
    fn lenient_balance_degrades_bad_strings_to_absent() {
        let mb = lenient_balance("test", "BTC", "n/a");
        assert!(!mb.present);
    }
}

//! Sequential reconciliation runner.
//!
//! Collectors for distinct categories are logically independent and could be
//! parallelized; this runner keeps them strictly sequential so a failure
//! surfaces with an unambiguous "nothing after this ran" story.

use crate::collect::{
    BalanceSource, CollectError, ExchangeFundingSource, ExchangeSpotAvailableSource,
    ExchangeSpotHoldSource, LedgerCategorySource,
};
use crate::engine::{merge, mismatches};
use crate::Comparison;
use xc_config::{Category, Config};
use xc_exchange::ExchangeClient;
use xc_ledger::LedgerClient;

/// Reconcile one category from an explicit pair of sources.
///
/// Both sides are collected (exchange first), merged by currency symbol and
/// filtered to the entries that disagree. Either collection failing fails
/// the category.
pub async fn reconcile_category(
    category: Category,
    exchange_side: &dyn BalanceSource,
    ledger_side: &dyn BalanceSource,
) -> Result<Vec<Comparison>, CollectError> {
    let exchange_obs = exchange_side.collect().await?;
    let ledger_obs = ledger_side.collect().await?;

    let map = merge(category, &exchange_obs, &ledger_obs);
    let found = mismatches(&map);

    tracing::debug!(
        category = %category,
        entries = map.len(),
        mismatches = found.len(),
        "category reconciled"
    );
    Ok(found)
}

/// Run a full reconciliation: every category in [`Category::ALL`], exchange
/// and ledger sides, concatenated with per-category grouping preserved.
///
/// Any collector failure aborts the entire run; partial data is never
/// reported as agreement.
pub async fn run(
    cfg: &Config,
    exchange: &ExchangeClient,
    ledger: &LedgerClient,
) -> Result<Vec<Comparison>, CollectError> {
    let mut all: Vec<Comparison> = Vec::new();

    for category in Category::ALL {
        let exchange_side: Box<dyn BalanceSource> = match category {
            Category::Funding => Box::new(ExchangeFundingSource::new(exchange.clone())),
            Category::SpotAvailable => {
                Box::new(ExchangeSpotAvailableSource::new(exchange.clone()))
            }
            Category::SpotHold => Box::new(ExchangeSpotHoldSource::new(exchange.clone())),
        };
        let ledger_side = LedgerCategorySource::new(
            ledger.clone(),
            category.ledger_category_id(&cfg.ledger),
        );

        let found = reconcile_category(category, exchange_side.as_ref(), &ledger_side).await?;
        all.extend(found);
    }

    Ok(all)
}

//! Pure merge and mismatch detection. No IO, no clients.

use crate::collect::SourceBalance;
use crate::Comparison;
use std::collections::BTreeMap;
use xc_config::Category;
use xc_dfp::MaybeBalance;

/// Merge the two sides of one category into a map keyed by currency symbol.
///
/// The exchange side seeds the map (ledger side defaults to absent); the
/// ledger side then overwrites only `ledger_balance` / `ledger_account_id`
/// on existing entries and inserts exchange-absent entries for symbols the
/// exchange never reported. Re-merging the same ledger output is idempotent:
/// last write wins per symbol.
///
/// Duplicate symbols *within* one side follow the observed upstream
/// contract: the later entry silently replaces the earlier one (logged, not
/// corrected).
pub fn merge(
    category: Category,
    exchange_side: &[SourceBalance],
    ledger_side: &[SourceBalance],
) -> BTreeMap<String, Comparison> {
    let mut map: BTreeMap<String, Comparison> = BTreeMap::new();

    for obs in exchange_side {
        if map.contains_key(&obs.symbol) {
            tracing::warn!(
                category = %category,
                symbol = %obs.symbol,
                "duplicate symbol in exchange response; keeping the later entry"
            );
        }
        map.insert(
            obs.symbol.clone(),
            Comparison {
                category,
                symbol: obs.symbol.clone(),
                exchange_balance: obs.balance,
                ledger_balance: MaybeBalance::absent(),
                ledger_account_id: None,
            },
        );
    }

    for obs in ledger_side {
        match map.get_mut(&obs.symbol) {
            Some(entry) => {
                if entry.ledger_balance.present {
                    tracing::warn!(
                        category = %category,
                        symbol = %obs.symbol,
                        "duplicate symbol in ledger response; keeping the later entry"
                    );
                }
                entry.ledger_balance = obs.balance;
                entry.ledger_account_id = obs.account_id;
            }
            None => {
                map.insert(
                    obs.symbol.clone(),
                    Comparison {
                        category,
                        symbol: obs.symbol.clone(),
                        exchange_balance: MaybeBalance::absent(),
                        ledger_balance: obs.balance,
                        ledger_account_id: obs.account_id,
                    },
                );
            }
        }
    }

    map
}

/// The entries of a merged map where the two sides disagree.
///
/// Iteration order follows the map (lexicographic by symbol here); callers
/// must not depend on ordering within a category.
pub fn mismatches(map: &BTreeMap<String, Comparison>) -> Vec<Comparison> {
    map.values().filter(|c| c.is_mismatch()).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use xc_dfp::Dfp;

    fn exch(symbol: &str, balance: MaybeBalance) -> SourceBalance {
        SourceBalance {
            symbol: symbol.to_string(),
            balance,
            account_id: None,
        }
    }

    fn ledg(symbol: &str, balance: MaybeBalance, account_id: u32) -> SourceBalance {
        SourceBalance {
            symbol: symbol.to_string(),
            balance,
            account_id: Some(account_id),
        }
    }

    #[test]
    fn exchange_seeds_ledger_overwrites() {
        let exchange = vec![exch("BTC", MaybeBalance::of(Dfp::new(150000000, -8)))];
        let ledger = vec![ledg("BTC", MaybeBalance::of(Dfp::new(15, -1)), 10)];

        let map = merge(Category::Funding, &exchange, &ledger);
        let btc = &map["BTC"];
        assert!(btc.exchange_balance.present);
        assert!(btc.ledger_balance.present);
        assert_eq!(btc.ledger_account_id, Some(10));
        assert!(!btc.is_mismatch());
    }

    #[test]
    fn ledger_only_symbol_gets_absent_exchange_side() {
        let ledger = vec![ledg("XMR", MaybeBalance::of(Dfp::new(1, 0)), 30)];
        let map = merge(Category::Funding, &[], &ledger);
        let xmr = &map["XMR"];
        assert!(!xmr.exchange_balance.present);
        assert!(xmr.is_mismatch());
    }

    #[test]
    fn exchange_only_symbol_gets_absent_ledger_side() {
        let exchange = vec![exch("ETH", MaybeBalance::of(Dfp::new(2, 0)))];
        let map = merge(Category::Funding, &exchange, &[]);
        let eth = &map["ETH"];
        assert!(!eth.ledger_balance.present);
        assert!(eth.is_mismatch());
    }

    #[test]
    fn merge_is_idempotent_for_the_ledger_side() {
        let exchange = vec![exch("BTC", MaybeBalance::of(Dfp::new(125, -2)))];
        let ledger = vec![ledg("BTC", MaybeBalance::of(Dfp::new(1250, -3)), 10)];

        let once = merge(Category::Funding, &exchange, &ledger);
        let doubled: Vec<SourceBalance> =
            ledger.iter().chain(ledger.iter()).cloned().collect();
        let twice = merge(Category::Funding, &exchange, &doubled);
        assert_eq!(once, twice);
    }

    #[test]
    fn duplicate_symbol_within_a_side_last_entry_wins() {
        let exchange = vec![
            exch("BTC", MaybeBalance::of(Dfp::new(1, 0))),
            exch("BTC", MaybeBalance::of(Dfp::new(2, 0))),
        ];
        let map = merge(Category::Funding, &exchange, &[]);
        assert_eq!(map["BTC"].exchange_balance.balance, Dfp::new(2, 0));
    }

    #[test]
    fn mismatches_skips_agreeing_and_doubly_absent_entries() {
        let exchange = vec![
            exch("BTC", MaybeBalance::of(Dfp::new(125, -2))),
            exch("ETH", MaybeBalance::of(Dfp::new(2, 0))),
            exch("DOGE", MaybeBalance::absent()), // unparseable upstream string
        ];
        let ledger = vec![ledg("BTC", MaybeBalance::of(Dfp::new(1250, -3)), 10)];

        let map = merge(Category::SpotAvailable, &exchange, &ledger);
        let found = mismatches(&map);
        let symbols: Vec<&str> = found.iter().map(|c| c.symbol.as_str()).collect();
        // BTC agrees; DOGE is absent on both sides (unparseable upstream
        // string, no ledger account) which is not a mismatch; ETH disagrees.
        assert_eq!(symbols, vec!["ETH"]);
    }
}

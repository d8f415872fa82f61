//! The closed set of balance categories the connector reconciles.

use crate::LedgerConfig;
use serde::{Deserialize, Serialize};

/// Which logical bucket a balance or transfer leg belongs to.
///
/// The exchange addresses its sub-accounts by numeric code (`"6"` funding,
/// `"1"` spot); the ledger addresses them by configured category id. This
/// enum is the only place either mapping lives. Anything outside the closed
/// set is rejected at the edge — there is no string-keyed dispatch anywhere
/// downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Funding,
    SpotAvailable,
    SpotHold,
}

impl Category {
    /// Reconciliation order. Fixed so reports group deterministically.
    pub const ALL: [Category; 3] = [
        Category::Funding,
        Category::SpotAvailable,
        Category::SpotHold,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Funding => "funding",
            Category::SpotAvailable => "spot-available",
            Category::SpotHold => "spot-hold",
        }
    }

    /// Map an exchange sub-account code to a category.
    ///
    /// Only `"6"` (funding) and `"1"` (spot available) are valid transfer
    /// legs; spot-hold balances are exchange-managed and cannot be a leg.
    pub fn from_transfer_code(code: &str) -> Option<Category> {
        match code.trim() {
            "6" => Some(Category::Funding),
            "1" => Some(Category::SpotAvailable),
            _ => None,
        }
    }

    /// The exchange sub-account code for this category, when it is a legal
    /// transfer leg.
    pub fn transfer_code(&self) -> Option<&'static str> {
        match self {
            Category::Funding => Some("6"),
            Category::SpotAvailable => Some("1"),
            Category::SpotHold => None,
        }
    }

    /// The ledger category id configured for this category.
    pub fn ledger_category_id(&self, cfg: &LedgerConfig) -> u32 {
        match self {
            Category::Funding => cfg.cat_funding,
            Category::SpotAvailable => cfg.cat_spot_available,
            Category::SpotHold => cfg.cat_spot_hold,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

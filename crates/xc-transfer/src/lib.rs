//! xc-transfer
//!
//! Moving funds between exchange sub-accounts while mirroring the movement
//! as a journal transaction (one transaction, two distributions) in the
//! bookkeeping ledger.
//!
//! There is no transaction spanning the two systems. The orchestrator is a
//! saga: an ordered list of steps, each attempted at most once, no retry,
//! no compensation. Whatever already landed stays landed; divergence is
//! detected later by reconciliation, never papered over here.

mod orchestrator;
mod resolve;

pub use orchestrator::{
    ExchangeTransfer, JournalStep, LedgerJournal, TransferError, TransferLeg,
    TransferOrchestrator, TransferReceipt,
};
pub use resolve::{AccountLookup, AccountResolver, ResolveError, ResolvedAccount};

use std::fmt;
use xc_config::Category;
use xc_dfp::{Dfp, DfpParseError};

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// A validated transfer request. Construction via [`TransferRequest::new`]
/// is the only path that accepts raw CLI strings; once built, both legs are
/// legal transfer categories and the quantity is a finite decimal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub currency: String,
    pub from: Category,
    pub to: Category,
    pub quantity: Dfp,
}

impl TransferRequest {
    /// Build a request from raw parameters. Performs every check that must
    /// happen before any network effect.
    pub fn new(
        currency: &str,
        from_code: &str,
        to_code: &str,
        quantity: &str,
    ) -> Result<Self, ValidationError> {
        let from = Category::from_transfer_code(from_code)
            .ok_or_else(|| ValidationError::UnknownLegCode(from_code.to_string()))?;
        let to = Category::from_transfer_code(to_code)
            .ok_or_else(|| ValidationError::UnknownLegCode(to_code.to_string()))?;
        if from == to {
            return Err(ValidationError::SameLeg(from));
        }
        let quantity = Dfp::parse(quantity).map_err(ValidationError::BadQuantity)?;
        Ok(Self {
            currency: currency.to_string(),
            from,
            to,
            quantity,
        })
    }
}

/// Malformed transfer parameters. All variants are raised before any remote
/// call is made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The leg code is not in the closed set ("1" spot, "6" funding).
    UnknownLegCode(String),
    /// Source and destination are the same sub-account.
    SameLeg(Category),
    /// The quantity string is not a finite decimal.
    BadQuantity(DfpParseError),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::UnknownLegCode(code) => {
                write!(f, "transfer leg code must be '1' (spot) or '6' (funding), got '{code}'")
            }
            ValidationError::SameLeg(category) => {
                write!(f, "source and destination are both {category}; nothing to transfer")
            }
            ValidationError::BadQuantity(err) => write!(f, "bad quantity: {err}"),
        }
    }
}

impl std::error::Error for ValidationError {}

//! xc-ledger
//!
//! REST client for the double-entry bookkeeping ledger: category balance
//! sums, account lookup by (category, currency), and the two write
//! endpoints used by a transfer (transactions and distributions).
//!
//! The ledger occasionally returns JSON field names containing `.`
//! (`"accounts.id"`), which breaks structured decoding. That quirk is
//! contained in [`decode`]; nothing outside this crate sees raw bytes.

use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use xc_config::LedgerConfig;
use xc_dfp::Dfp;

mod decode;

use decode::normalize_dotted_keys;

/// Same fixed timeout as the exchange client; a timeout reports as a
/// transport failure.
const CLIENT_TIMEOUT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors the ledger client may return.
#[derive(Debug)]
pub enum LedgerError {
    /// Network or transport failure (including timeout).
    Transport(String),
    /// The ledger answered with a non-success status.
    Status { code: u16, body: String },
    /// A response payload could not be decoded.
    Decode(String),
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerError::Transport(msg) => write!(f, "ledger transport error: {msg}"),
            LedgerError::Status { code, body } => {
                write!(f, "ledger http error status={code} body={body}")
            }
            LedgerError::Decode(msg) => write!(f, "ledger decode error: {msg}"),
        }
    }
}

impl std::error::Error for LedgerError {}

// ---------------------------------------------------------------------------
// Response shapes
// ---------------------------------------------------------------------------

/// One decorated balance sum: the account, its currency, and the summed
/// distribution amount in the ledger's native (amount, exp) form.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CategorySum {
    pub account: SumAccount,
    pub sum: Dfp,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SumAccount {
    pub account_id: u32,
    #[serde(default)]
    pub title: String,
    pub currency: SumCurrency,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SumCurrency {
    pub currency_id: u32,
    pub symbol: String,
}

#[derive(Debug, Deserialize)]
struct SumsEnvelope {
    sums: Vec<CategorySum>,
}

/// Row shape of the `/sql` account lookup, after dotted-key normalization.
#[derive(Debug, Deserialize)]
struct AccountIdRow {
    #[serde(rename = "accounts-id")]
    id: u32,
}

#[derive(Debug, Deserialize)]
struct LastInsert {
    #[serde(rename = "LastInsertID")]
    last_insert_id: u32,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// REST client for the bookkeeping ledger. All calls carry the configured
/// API key.
#[derive(Clone)]
pub struct LedgerClient {
    http: reqwest::Client,
    base_url: String,
    apikey: String,
}

impl fmt::Debug for LedgerClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LedgerClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl LedgerClient {
    pub fn new(cfg: &LedgerConfig) -> Result<Self, LedgerError> {
        let http = reqwest::Client::builder()
            .timeout(CLIENT_TIMEOUT)
            .build()
            .map_err(|e| LedgerError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            apikey: cfg.apikey.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn read_success_body(resp: reqwest::Response) -> Result<String, LedgerError> {
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| LedgerError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(LedgerError::Status {
                code: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    /// Current balances of all accounts tagged with `category_id`, decorated
    /// with account and currency info.
    pub async fn category_dist_sums(
        &self,
        category_id: u32,
    ) -> Result<Vec<CategorySum>, LedgerError> {
        let category_id = category_id.to_string();
        let resp = self
            .http
            .get(self.url("/category_dist_sums"))
            .query(&[
                ("apikey", self.apikey.as_str()),
                ("category_id", category_id.as_str()),
                ("decorate", "true"),
            ])
            .send()
            .await
            .map_err(|e| LedgerError::Transport(e.to_string()))?;

        let body = Self::read_success_body(resp).await?;
        let envelope: SumsEnvelope = serde_json::from_str(&body)
            .map_err(|e| LedgerError::Decode(format!("category_dist_sums: {e}")))?;
        Ok(envelope.sums)
    }

    /// Ids of every account simultaneously tagged with `category_id` and
    /// denominated in `symbol`.
    ///
    /// A properly configured ledger has at most one such account; this call
    /// reports whatever the ledger actually has and lets the caller decide.
    pub async fn accounts_by_category_and_currency(
        &self,
        category_id: u32,
        symbol: &str,
    ) -> Result<Vec<u32>, LedgerError> {
        let query = account_lookup_sql(category_id, symbol);
        let resp = self
            .http
            .get(self.url("/sql"))
            .query(&[("query", query.as_str()), ("apikey", self.apikey.as_str())])
            .send()
            .await
            .map_err(|e| LedgerError::Transport(e.to_string()))?;

        let body = Self::read_success_body(resp).await?;
        let body = normalize_dotted_keys(body);
        let rows: Vec<AccountIdRow> = serde_json::from_str(&body)
            .map_err(|e| LedgerError::Decode(format!("sql account lookup: {e}")))?;
        Ok(rows.into_iter().map(|r| r.id).collect())
    }

    /// Create one transaction record; returns the new transaction id used by
    /// both distributions.
    pub async fn create_transaction(
        &self,
        notes: &str,
        time: &str,
    ) -> Result<u32, LedgerError> {
        let resp = self
            .http
            .post(self.url("/transactions"))
            .form(&[
                ("apikey", self.apikey.as_str()),
                ("notes", notes),
                ("time", time),
            ])
            .send()
            .await
            .map_err(|e| LedgerError::Transport(e.to_string()))?;

        let body = Self::read_success_body(resp).await?;
        let insert: LastInsert = serde_json::from_str(&body)
            .map_err(|e| LedgerError::Decode(format!("create_transaction: {e}")))?;
        Ok(insert.last_insert_id)
    }

    /// Post one distribution line (`amount * 10^exp`, signed) against
    /// `account_id`, referencing `transaction_id`.
    pub async fn create_distribution(
        &self,
        account_id: u32,
        amount: Dfp,
        transaction_id: u32,
    ) -> Result<u32, LedgerError> {
        let account_id = account_id.to_string();
        let amount_coefficient = amount.amount.to_string();
        let amount_exp = amount.exp.to_string();
        let transaction_id = transaction_id.to_string();
        let resp = self
            .http
            .post(self.url("/distributions"))
            .form(&[
                ("apikey", self.apikey.as_str()),
                ("account_id", account_id.as_str()),
                ("amount", amount_coefficient.as_str()),
                ("amount_exp", amount_exp.as_str()),
                ("transaction_id", transaction_id.as_str()),
            ])
            .send()
            .await
            .map_err(|e| LedgerError::Transport(e.to_string()))?;

        let body = Self::read_success_body(resp).await?;
        let insert: LastInsert = serde_json::from_str(&body)
            .map_err(|e| LedgerError::Decode(format!("create_distribution: {e}")))?;
        Ok(insert.last_insert_id)
    }
}

/// The join resolving accounts by (category, currency symbol). Single quotes
/// in the symbol are doubled so the literal cannot break out of its quoting.
fn account_lookup_sql(category_id: u32, symbol: &str) -> String {
    let escaped = symbol.replace('\'', "''");
    format!(
        "SELECT accounts.id \
         FROM accounts_categories \
         JOIN accounts ON accounts.id=accounts_categories.account_id \
         JOIN currencies ON currencies.id=accounts.currency_id \
         WHERE category_id={category_id} AND currencies.symbol='{escaped}'"
    )
}

// ---------------------------------------------------------------------------
// Tests (no network)
// ---------------------------------------------------------------------------

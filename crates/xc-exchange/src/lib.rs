//! xc-exchange
//!
//! REST client for the exchange side: wallet (funding) balances, spot
//! account balances, and the internal sub-account transfer endpoint.
//!
//! Every request is HMAC-SHA256 signed (see [`sign`]); credentials are held
//! by the client and never logged. Balances are returned exactly as the
//! exchange sends them — decimal strings — so the caller decides how to
//! parse (a bad string must not fail a whole balance batch).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use xc_config::{Credentials, ExchangeConfig};

mod sign;

pub use sign::{sign, signing_timestamp};

const WALLET_PATH: &str = "/api/account/v3/wallet";
const SPOT_ACCOUNTS_PATH: &str = "/api/spot/v3/accounts";
const TRANSFER_PATH: &str = "/api/account/v3/transfer";

/// All remote calls share one fixed timeout; a timed-out call is reported
/// like any other transport failure.
const CLIENT_TIMEOUT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors the exchange client may return.
#[derive(Debug)]
pub enum ExchangeError {
    /// Network or transport failure (including timeout).
    Transport(String),
    /// The exchange answered with a non-success status.
    Status { code: u16, body: String },
    /// A response payload could not be decoded.
    Decode(String),
}

impl fmt::Display for ExchangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExchangeError::Transport(msg) => write!(f, "exchange transport error: {msg}"),
            ExchangeError::Status { code, body } => {
                write!(f, "exchange http error status={code} body={body}")
            }
            ExchangeError::Decode(msg) => write!(f, "exchange decode error: {msg}"),
        }
    }
}

impl std::error::Error for ExchangeError {}

// ---------------------------------------------------------------------------
// Response shapes
// ---------------------------------------------------------------------------

/// One funding-wallet balance line as the exchange reports it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WalletEntry {
    /// Currency symbol (the exchange uses the symbol as the currency id).
    pub currency: String,
    /// Total balance as a decimal string.
    pub balance: String,
    #[serde(default)]
    pub available: String,
    #[serde(default)]
    pub hold: String,
}

/// One spot sub-account balance line: total split into available and hold.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SpotAccount {
    pub currency: String,
    #[serde(default)]
    pub balance: String,
    pub available: String,
    pub hold: String,
}

/// Acknowledgement of an internal sub-account transfer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TransferAck {
    pub transfer_id: String,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub result: bool,
}

#[derive(Debug, Serialize)]
struct TransferBody<'a> {
    from: &'a str,
    to: &'a str,
    amount: &'a str,
    currency: &'a str,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Signed REST client for the exchange.
#[derive(Clone)]
pub struct ExchangeClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Credentials,
}

impl fmt::Debug for ExchangeClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Credentials redact themselves; keep the client terse anyway.
        f.debug_struct("ExchangeClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl ExchangeClient {
    pub fn new(cfg: &ExchangeConfig, credentials: Credentials) -> Result<Self, ExchangeError> {
        let http = reqwest::Client::builder()
            .timeout(CLIENT_TIMEOUT)
            .build()
            .map_err(|e| ExchangeError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Attach the signature headers for `method + path (+ body)`.
    fn signed(
        &self,
        req: reqwest::RequestBuilder,
        method: &str,
        path: &str,
        body: &str,
    ) -> reqwest::RequestBuilder {
        let timestamp = signing_timestamp();
        let signature = sign(
            &self.credentials.secret_key,
            &timestamp,
            method,
            path,
            body,
        );
        req.header("OK-ACCESS-KEY", &self.credentials.api_key)
            .header("OK-ACCESS-SIGN", signature)
            .header("OK-ACCESS-TIMESTAMP", timestamp)
            .header("OK-ACCESS-PASSPHRASE", &self.credentials.passphrase)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<T, ExchangeError> {
        let req = self.http.get(self.url(path));
        let resp = self
            .signed(req, "GET", path, "")
            .send()
            .await
            .map_err(|e| ExchangeError::Transport(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| ExchangeError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(ExchangeError::Status {
                code: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body)
            .map_err(|e| ExchangeError::Decode(format!("{path}: {e}")))
    }

    /// All funding-wallet balances.
    pub async fn wallet(&self) -> Result<Vec<WalletEntry>, ExchangeError> {
        self.get_json(WALLET_PATH).await
    }

    /// All spot sub-account balances (available and hold per currency).
    pub async fn spot_accounts(&self) -> Result<Vec<SpotAccount>, ExchangeError> {
        self.get_json(SPOT_ACCOUNTS_PATH).await
    }

    /// Move `amount` of `currency` between exchange sub-accounts.
    ///
    /// `from` / `to` are the exchange's numeric sub-account codes (`"6"`
    /// funding, `"1"` spot). The serialized body is the exact string that is
    /// signed — the two must never diverge.
    pub async fn transfer(
        &self,
        from: &str,
        to: &str,
        currency: &str,
        amount: &str,
    ) -> Result<TransferAck, ExchangeError> {
        let body = serde_json::to_string(&TransferBody {
            from,
            to,
            amount,
            currency,
        })
        .map_err(|e| ExchangeError::Decode(format!("transfer body encode: {e}")))?;

        let req = self
            .http
            .post(self.url(TRANSFER_PATH))
            .header("Content-Type", "application/json")
            .body(body.clone());
        let resp = self
            .signed(req, "POST", TRANSFER_PATH, &body)
            .send()
            .await
            .map_err(|e| ExchangeError::Transport(e.to_string()))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| ExchangeError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(ExchangeError::Status {
                code: status.as_u16(),
                body: text,
            });
        }

        serde_json::from_str(&text)
            .map_err(|e| ExchangeError::Decode(format!("{TRANSFER_PATH}: {e}")))
    }
}

// ---------------------------------------------------------------------------
// Tests (no network)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wallet_entry_decodes_with_optional_fields() {
        let raw = r#"[{"currency":"BTC","balance":"1.50000000"}]"#;
        let entries: Vec<WalletEntry> = serde_json::from_str(raw).unwrap();
        assert_eq!(entries[0].currency, "BTC");
        assert_eq!(entries[0].balance, "1.50000000");
        assert_eq!(entries[0].available, "");
    }

    #[test]
    fn transfer_body_field_order_is_stable() {
        let body = serde_json::to_string(&TransferBody {
            from: "6",
            to: "1",
            amount: "1.25",
            currency: "BTC",
        })
        .unwrap();
        assert_eq!(
            body,
            r#"{"from":"6","to":"1","amount":"1.25","currency":"BTC"}"#
        );
    }

    #[test]
    fn error_display() {
        let err = ExchangeError::Status {
            code: 401,
            body: "bad sign".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "exchange http error status=401 body=bad sign"
        );
    }
}

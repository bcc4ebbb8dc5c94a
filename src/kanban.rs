//! Kanban API client
//!
//! HTTP client for the Kanban bridge service and the Kanban ledger node.
//! Implements [`BridgeGateway`] for balance queries, history and claim
//! submission, and [`ChainGateway`] for the ledger account (nonce reads,
//! raw transactions, contract calls).
//!
//! Responses are parsed from `serde_json::Value` by pure functions so their
//! edge cases are covered by unit tests. Rejections keep the service's
//! error message verbatim.

use std::str::FromStr;
use std::time::Duration;

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use eyre::{eyre, WrapErr};
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{BridgeError, Result};
use crate::gateway::{BridgeGateway, ChainGateway, WalletBalanceRow};
use crate::history::HistoryEntry;
use crate::types::{
    Balance, BroadcastResult, RedepositEntry, Signature, Utxo, WalletAddresses,
};

/// Kanban bridge and ledger HTTP client
pub struct KanbanClient {
    base_url: Url,
    client: Client,
}

impl KanbanClient {
    pub fn new(endpoint: &str) -> eyre::Result<Self> {
        let mut base_url = Url::parse(endpoint).wrap_err("Invalid Kanban endpoint")?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .wrap_err("Failed to create HTTP client")?;

        info!(endpoint = %base_url, "Kanban client initialized");
        Ok(Self { base_url, client })
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| BridgeError::gateway(eyre!("Invalid Kanban path {}: {}", path, e)))
    }

    async fn get(&self, path: &str) -> Result<Value> {
        let url = self.url(path)?;
        debug!(url = %url, "GET");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .wrap_err_with(|| format!("Kanban request {} failed", path))
            .map_err(BridgeError::gateway)?;
        read_response(path, response).await
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        let url = self.url(path)?;
        debug!(url = %url, "POST");
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .wrap_err_with(|| format!("Kanban request {} failed", path))
            .map_err(BridgeError::gateway)?;
        read_response(path, response).await
    }
}

async fn read_response(path: &str, response: reqwest::Response) -> Result<Value> {
    let status = response.status();
    let text = response
        .text()
        .await
        .wrap_err_with(|| format!("Failed to read {} response", path))
        .map_err(BridgeError::gateway)?;
    let body = serde_json::from_str(&text).unwrap_or(Value::String(text));

    if !status.is_success() {
        let message = extract_error_message(&body)
            .unwrap_or_else(|| format!("{} failed with status {}", path, status));
        warn!(path, status = %status, error = %message, "Kanban request rejected");
        return Err(BridgeError::Gateway(message));
    }
    if let Some(message) = extract_error_message(&body) {
        warn!(path, error = %message, "Kanban request returned an error");
        return Err(BridgeError::Gateway(message));
    }
    Ok(body)
}

// ============================================================================
// Response parsing
// ============================================================================

/// Pull the service's error message out of a response body
///
/// Recognizes `{"error": "..."}`, `{"error": {"message": "..."}}` and
/// `{"success": false, "message": "..."}`.
pub fn extract_error_message(body: &Value) -> Option<String> {
    match body.get("error") {
        Some(Value::String(s)) if !s.is_empty() => return Some(s.clone()),
        Some(Value::Object(obj)) => {
            if let Some(Value::String(s)) = obj.get("message") {
                return Some(s.clone());
            }
        }
        _ => {}
    }
    if body.get("success") == Some(&Value::Bool(false)) {
        return Some(
            body.get("message")
                .and_then(Value::as_str)
                .unwrap_or("Request failed")
                .to_string(),
        );
    }
    None
}

/// `data` when present, the whole body otherwise
fn payload(body: &Value) -> &Value {
    body.get("data").unwrap_or(body)
}

/// Decimal from a JSON number or string
pub fn decimal_from_value(value: &Value) -> Option<BigDecimal> {
    match value {
        Value::Number(n) => BigDecimal::from_str(&n.to_string()).ok(),
        Value::String(s) => BigDecimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

/// Integer amount from a JSON number, decimal string or `0x` hex string
///
/// Numbers past `u64::MAX` arrive in exponent form (`2.5e19`); they are read
/// through `BigDecimal` and must still be whole and non-negative.
pub fn u256_from_value(value: &Value) -> Option<U256> {
    let s = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    if let Some(hex) = s.strip_prefix("0x") {
        return U256::from_str_radix(hex, 16).ok();
    }
    if let Ok(n) = U256::from_str_radix(&s, 10) {
        return Some(n);
    }
    let decimal = BigDecimal::from_str(&s).ok()?;
    let whole = decimal.with_scale(0);
    if whole != decimal || whole < BigDecimal::from(0) {
        return None;
    }
    let (digits, _) = whole.as_bigint_and_exponent();
    U256::from_str_radix(&digits.to_string(), 10).ok()
}

fn string_field<'a>(obj: &'a Value, names: &[&str]) -> Option<&'a str> {
    names.iter().find_map(|n| obj.get(*n).and_then(Value::as_str))
}

/// Parse one captured claim from a `depositErr` list
pub fn parse_deposit_err(item: &Value) -> Result<RedepositEntry> {
    let invalid = |what: &str| BridgeError::Gateway(format!("Malformed depositErr: {}", what));

    let coin_type_id = item
        .get("coinType")
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| invalid("coinType"))?;
    let source_transaction_id = string_field(item, &["transactionID", "transactionId"])
        .ok_or_else(|| invalid("transactionID"))?
        .to_string();
    let amount = item
        .get("amount")
        .and_then(u256_from_value)
        .ok_or_else(|| invalid("amount"))?;
    let r = string_field(item, &["r"]).ok_or_else(|| invalid("r"))?;
    let s = string_field(item, &["s"]).ok_or_else(|| invalid("s"))?;
    let v = match item.get("v") {
        Some(Value::String(v)) => v.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => return Err(invalid("v")),
    };

    Ok(RedepositEntry {
        coin_type_id,
        amount,
        source_transaction_id,
        signature: Signature::from_hex_parts(r, s, &v)?,
    })
}

/// Parse the `walletBalances` response
pub fn parse_balance_rows(body: &Value) -> Result<Vec<WalletBalanceRow>> {
    let rows = payload(body)
        .as_array()
        .ok_or_else(|| BridgeError::Gateway("walletBalances returned no rows".to_string()))?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let Some(coin) = row.get("coin").and_then(Value::as_str) else {
            continue;
        };
        let zero = || BigDecimal::from(0);
        let claims: Vec<RedepositEntry> = match row.get("depositErr") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| match parse_deposit_err(item) {
                    Ok(entry) => Some(entry),
                    Err(e) => {
                        warn!(
                            coin,
                            error = %e,
                            claim = %item,
                            "Skipping malformed depositErr entry"
                        );
                        None
                    }
                })
                .collect(),
            _ => Vec::new(),
        };
        let deposit_err = (!claims.is_empty()).then_some(claims);
        out.push(WalletBalanceRow {
            coin: coin.to_string(),
            balance: row
                .get("balance")
                .and_then(decimal_from_value)
                .unwrap_or_else(zero),
            lock_balance: row
                .get("lockBalance")
                .and_then(decimal_from_value)
                .unwrap_or_else(zero),
            deposit_err,
            usd_value: row
                .get("usdValue")
                .and_then(|u| u.get("USD"))
                .and_then(decimal_from_value),
        });
    }
    Ok(out)
}

/// Bridge transaction id from a `submitDeposit` response
pub fn parse_transaction_id(body: &Value) -> Option<String> {
    string_field(payload(body), &["transactionID", "transactionId"])
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// Nonce from a `getTransactionCount` response
pub fn parse_transaction_count(body: &Value) -> Option<u64> {
    let value = payload(body);
    let value = value.get("transactionCount").unwrap_or(value);
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Address returned as a bare string or `{ "data": "0x..." }`
pub fn parse_address(body: &Value) -> Option<String> {
    payload(body)
        .as_str()
        .map(|s| s.trim().trim_matches('"').to_string())
        .filter(|s| !s.is_empty())
}

// ============================================================================
// Bridge Gateway
// ============================================================================

#[async_trait]
impl BridgeGateway for KanbanClient {
    async fn wallet_balances(&self, addresses: &WalletAddresses) -> Result<Vec<WalletBalanceRow>> {
        let body = serde_json::to_value(addresses)
            .map_err(|e| BridgeError::InvalidInput(e.to_string()))?;
        let response = self.post("walletBalances", &body).await?;
        parse_balance_rows(&response)
    }

    async fn submit_deposit(&self, source_tx_hex: &str, bridge_tx_hex: &str) -> Result<String> {
        let body = json!({
            "rawTransaction": source_tx_hex,
            "rawKanbanTransaction": bridge_tx_hex,
        });
        let response = self.post("submitDeposit", &body).await?;
        parse_transaction_id(&response).ok_or_else(|| {
            BridgeError::Gateway("submitDeposit returned no transaction id".to_string())
        })
    }

    async fn submit_redeposit(&self, bridge_tx_hex: &str) -> Result<()> {
        let body = json!({ "rawKanbanTransaction": bridge_tx_hex });
        self.post("submitReDeposit", &body).await?;
        Ok(())
    }

    async fn get_coin_pool_address(&self) -> Result<Address> {
        let response = self.get("exchangily/getCoinPoolAddress").await?;
        let address = parse_address(&response)
            .ok_or_else(|| BridgeError::Gateway("Missing coin pool address".to_string()))?;
        Address::from_str(&address).map_err(|e| {
            BridgeError::Gateway(format!("Invalid coin pool address {}: {}", address, e))
        })
    }

    async fn get_scar_address(&self) -> Result<String> {
        let response = self.get("exchangily/getScarAddress").await?;
        parse_address(&response)
            .ok_or_else(|| BridgeError::Gateway("Missing scar address".to_string()))
    }

    async fn transaction_history_events(
        &self,
        addresses: &WalletAddresses,
    ) -> Result<Vec<HistoryEntry>> {
        let body = serde_json::to_value(addresses)
            .map_err(|e| BridgeError::InvalidInput(e.to_string()))?;
        let response = self.post("getTransactionHistoryEvents", &body).await?;
        serde_json::from_value(payload(&response).clone())
            .wrap_err("Malformed transaction history")
            .map_err(BridgeError::gateway)
    }
}

// ============================================================================
// Ledger Chain Gateway
// ============================================================================

#[async_trait]
impl ChainGateway for KanbanClient {
    async fn get_balance(&self, address: &str) -> Result<Balance> {
        let response = self.get(&format!("kanban/getBalance/{}", address)).await?;
        let data = payload(&response);
        Ok(Balance {
            balance: data
                .get("balance")
                .and_then(decimal_from_value)
                .unwrap_or_else(|| BigDecimal::from(0)),
            locked_balance: data
                .get("lockBalance")
                .or_else(|| data.get("lockedBalance"))
                .and_then(decimal_from_value)
                .unwrap_or_else(|| BigDecimal::from(0)),
        })
    }

    async fn get_utxos(&self, _address: &str) -> Result<Vec<Utxo>> {
        Err(BridgeError::Gateway(
            "Kanban is an account ledger without UTXOs".to_string(),
        ))
    }

    async fn broadcast_raw(&self, tx_hex: &str) -> Result<BroadcastResult> {
        let body = json!({ "signedTransactionData": tx_hex });
        match self.post("kanban/sendRawTransaction", &body).await {
            Ok(response) => Ok(BroadcastResult {
                tx_hash: string_field(payload(&response), &["transactionHash", "txHash"])
                    .unwrap_or_default()
                    .to_string(),
                err_msg: String::new(),
            }),
            Err(BridgeError::Gateway(err_msg)) => Ok(BroadcastResult {
                tx_hash: String::new(),
                err_msg,
            }),
            Err(e) => Err(e),
        }
    }

    async fn get_transaction_count(&self, address: &str) -> Result<u64> {
        let response = self
            .get(&format!("kanban/getTransactionCount/{}", address))
            .await?;
        parse_transaction_count(&response).ok_or_else(|| {
            BridgeError::Gateway(format!("Malformed transaction count for {}", address))
        })
    }

    async fn call_contract(&self, address: &str, abi_hex: &str, sender: &str) -> Result<String> {
        let body = json!({
            "transactionOptions": {
                "to": address,
                "data": abi_hex,
                "from": sender,
            }
        });
        let response = self.post("kanban/call", &body).await?;
        Ok(match payload(&response) {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

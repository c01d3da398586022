//! Solana JSON-RPC over HTTP.

use crate::{
    backoff::{jittered_backoff, next_backoff},
    wallet::{AccountInfo, Confirmation, Ledger, Simulation, TransactionDetails},
    Error, Result,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use solana_sdk::{hash::Hash, pubkey::Pubkey, signature::Signature, transaction::Transaction};
use std::{
    str::FromStr,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};
use url::Url;

const COMMITMENT: &str = "confirmed";

/// Retry behavior for HTTP calls.
///
/// Reads are always idempotent. Anything else is only retried when
/// `retry_non_idempotent` is set.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub retry_non_idempotent: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(2),
            retry_non_idempotent: false,
        }
    }
}

/// JSON-RPC client for a single endpoint.
#[derive(Clone)]
pub struct RpcClient {
    pub base_url: Url,
    http: reqwest::Client,
    retry_policy: RetryPolicy,
    confirm_interval: Duration,
    confirm_timeout: Duration,
    next_id: Arc<AtomicU64>,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Value,
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct WithContext<T> {
    value: T,
}

#[derive(Deserialize)]
struct BlockhashValue {
    blockhash: String,
}

/// One entry of a `getSignatureStatuses` response.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureStatus {
    pub slot: u64,
    #[serde(default)]
    pub err: Option<Value>,
    #[serde(default)]
    pub confirmation_status: Option<String>,
}

impl SignatureStatus {
    /// Whether the status is at least `confirmed`.
    pub fn is_confirmed(&self) -> bool {
        matches!(
            self.confirmation_status.as_deref(),
            Some("confirmed") | Some("finalized")
        )
    }
}

#[derive(Deserialize)]
struct RawTransaction {
    slot: u64,
    meta: Option<RawMeta>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMeta {
    #[serde(default)]
    log_messages: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct RawAccount {
    lamports: u64,
    owner: String,
    /// `[payload, encoding]`.
    data: (String, String),
}

#[derive(Deserialize)]
struct RawSimulation {
    #[serde(default)]
    err: Option<Value>,
    #[serde(default)]
    logs: Option<Vec<String>>,
}

fn is_retryable_status(status: reqwest::StatusCode) -> bool {
    matches!(
        status,
        reqwest::StatusCode::TOO_MANY_REQUESTS
            | reqwest::StatusCode::INTERNAL_SERVER_ERROR
            | reqwest::StatusCode::BAD_GATEWAY
            | reqwest::StatusCode::SERVICE_UNAVAILABLE
            | reqwest::StatusCode::GATEWAY_TIMEOUT
    )
}

impl RpcClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        match base_url.scheme() {
            "http" | "https" => {}
            other => return Err(Error::InvalidScheme(other.to_string())),
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            base_url,
            http,
            retry_policy: RetryPolicy::default(),
            confirm_interval: Duration::from_millis(500),
            confirm_timeout: Duration::from_secs(60),
            next_id: Arc::new(AtomicU64::new(1)),
        })
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Sets how often and for how long [RpcClient::confirm_signature] polls.
    pub fn with_confirmation(mut self, interval: Duration, timeout: Duration) -> Self {
        self.confirm_interval = interval;
        self.confirm_timeout = timeout;
        self
    }

    async fn post_with_retry(&self, body: &Value, idempotent: bool) -> Result<reqwest::Response> {
        let retries_allowed = idempotent || self.retry_policy.retry_non_idempotent;
        let max_attempts = if retries_allowed {
            self.retry_policy.max_attempts.max(1)
        } else {
            1
        };
        let mut backoff = self.retry_policy.initial_backoff;
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.http.post(self.base_url.clone()).json(body).send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status();
                    if attempt >= max_attempts || !is_retryable_status(status) {
                        let text = response.text().await.unwrap_or_default();
                        return Err(Error::FailedWithBody {
                            status,
                            body: format!("POST {}: {text}", self.base_url),
                        });
                    }
                    debug!(%status, attempt, "retrying rpc request");
                }
                Err(err) => {
                    if attempt >= max_attempts || !(err.is_connect() || err.is_timeout()) {
                        return Err(err.into());
                    }
                    debug!(?err, attempt, "retrying rpc request");
                }
            }
            let delay = {
                let mut rng = rand::thread_rng();
                jittered_backoff(&mut rng, backoff)
            };
            sleep(delay).await;
            backoff = next_backoff(backoff, self.retry_policy.max_backoff);
        }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
        idempotent: bool,
    ) -> Result<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        let response = self.post_with_retry(&body, idempotent).await?;
        let envelope: RpcResponse = response.json().await?;
        if let Some(error) = envelope.error {
            return Err(Error::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        Ok(serde_json::from_value(envelope.result)?)
    }

    pub async fn get_balance(&self, address: &Pubkey) -> Result<u64> {
        let result: WithContext<u64> = self
            .call(
                "getBalance",
                json!([address.to_string(), { "commitment": COMMITMENT }]),
                true,
            )
            .await?;
        Ok(result.value)
    }

    pub async fn get_latest_blockhash(&self) -> Result<Hash> {
        let result: WithContext<BlockhashValue> = self
            .call(
                "getLatestBlockhash",
                json!([{ "commitment": COMMITMENT }]),
                true,
            )
            .await?;
        Hash::from_str(&result.value.blockhash)
            .map_err(|_| Error::UnexpectedResponse(format!("bad blockhash {}", result.value.blockhash)))
    }

    pub async fn get_signature_statuses(
        &self,
        signatures: &[Signature],
    ) -> Result<Vec<Option<SignatureStatus>>> {
        let signatures: Vec<String> = signatures.iter().map(|s| s.to_string()).collect();
        let result: WithContext<Vec<Option<SignatureStatus>>> = self
            .call(
                "getSignatureStatuses",
                json!([signatures, { "searchTransactionHistory": true }]),
                true,
            )
            .await?;
        Ok(result.value)
    }

    pub async fn get_transaction(&self, signature: &Signature) -> Result<Option<TransactionDetails>> {
        let result: Option<RawTransaction> = self
            .call(
                "getTransaction",
                json!([
                    signature.to_string(),
                    {
                        "encoding": "json",
                        "commitment": COMMITMENT,
                        "maxSupportedTransactionVersion": 0,
                    }
                ]),
                true,
            )
            .await?;
        Ok(result.map(|tx| TransactionDetails {
            slot: tx.slot,
            logs: tx.meta.and_then(|m| m.log_messages).unwrap_or_default(),
        }))
    }

    pub async fn get_account_info(&self, address: &Pubkey) -> Result<Option<AccountInfo>> {
        let result: WithContext<Option<RawAccount>> = self
            .call(
                "getAccountInfo",
                json!([
                    address.to_string(),
                    { "encoding": "base64", "commitment": COMMITMENT }
                ]),
                true,
            )
            .await?;
        let Some(raw) = result.value else {
            return Ok(None);
        };
        let (payload, encoding) = raw.data;
        if encoding != "base64" {
            return Err(Error::UnexpectedResponse(format!(
                "account data in {encoding}"
            )));
        }
        let data = STANDARD
            .decode(payload)
            .map_err(|err| Error::UnexpectedResponse(format!("bad account data: {err}")))?;
        let owner = Pubkey::from_str(&raw.owner)
            .map_err(|_| Error::UnexpectedResponse(format!("bad owner {}", raw.owner)))?;
        Ok(Some(AccountInfo {
            lamports: raw.lamports,
            owner,
            data,
        }))
    }

    /// Simulates an unsigned transaction against the latest blockhash.
    pub async fn simulate_transaction(&self, transaction: &Transaction) -> Result<Simulation> {
        let encoded = STANDARD.encode(bincode::serialize(transaction)?);
        let result: WithContext<RawSimulation> = self
            .call(
                "simulateTransaction",
                json!([
                    encoded,
                    {
                        "encoding": "base64",
                        "sigVerify": false,
                        "replaceRecentBlockhash": true,
                        "commitment": COMMITMENT,
                    }
                ]),
                true,
            )
            .await?;
        Ok(Simulation {
            err: result.value.err.map(|err| err.to_string()),
            logs: result.value.logs.unwrap_or_default(),
        })
    }

    /// Polls the signature status until it is confirmed, failed, or the
    /// confirmation timeout elapses.
    pub async fn confirm_signature(&self, signature: &Signature) -> Result<Confirmation> {
        let deadline = Instant::now() + self.confirm_timeout;
        loop {
            let status = self
                .get_signature_statuses(&[*signature])
                .await?
                .into_iter()
                .next()
                .flatten();
            if let Some(status) = status {
                if let Some(err) = status.err {
                    warn!(%signature, %err, "transaction failed on-chain");
                    return Ok(Confirmation {
                        slot: status.slot,
                        err: Some(err.to_string()),
                    });
                }
                if status.is_confirmed() {
                    debug!(%signature, slot = status.slot, "transaction confirmed");
                    return Ok(Confirmation {
                        slot: status.slot,
                        err: None,
                    });
                }
            }
            if Instant::now() >= deadline {
                return Err(Error::ConfirmationTimeout {
                    signature: signature.to_string(),
                });
            }
            sleep(self.confirm_interval).await;
        }
    }
}

impl Ledger for RpcClient {
    async fn latest_blockhash(&self) -> Result<Hash> {
        self.get_latest_blockhash().await
    }

    async fn balance(&self, address: &Pubkey) -> Result<u64> {
        self.get_balance(address).await
    }

    async fn confirm(&self, signature: &Signature) -> Result<Confirmation> {
        self.confirm_signature(signature).await
    }

    async fn transaction(&self, signature: &Signature) -> Result<Option<TransactionDetails>> {
        self.get_transaction(signature).await
    }

    async fn account(&self, address: &Pubkey) -> Result<Option<AccountInfo>> {
        self.get_account_info(address).await
    }

    async fn simulate(&self, transaction: &Transaction) -> Result<Simulation> {
        self.simulate_transaction(transaction).await
    }
}

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use ethers::types::transaction::eip712::TypedData;
use ethers::types::{Address, Signature};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::WalletSigner;
use crate::consts::{SIGNATURE_LEN, UNAUTHORIZED, USER_REJECTED_REQUEST};
use crate::prelude::Result;
use crate::req::{HttpClient, RequestFailure};
use crate::schema::EIP712_DOMAIN_TYPE;
use crate::Error;

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize, Debug)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcError>,
}

#[derive(Deserialize, Debug)]
struct RpcError {
    code: i64,
    message: String,
}

/// Talks to a wallet exposed as an EIP-1193 provider over JSON-RPC/HTTP:
/// a browser-wallet bridge, an embedded-wallet backend or a social-login
/// provider's RPC endpoint.
///
/// The underlying HTTP client must not carry a request timeout, since
/// `eth_signTypedData_v4` returns only once the user has answered the prompt.
#[derive(Debug, Clone)]
pub struct Eip1193Signer {
    http_client: HttpClient,
    expected_chain_id: Option<u64>,
    next_id: Arc<AtomicU64>,
}

impl Eip1193Signer {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint)
    }

    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Eip1193Signer {
            http_client: HttpClient::new(client, endpoint),
            expected_chain_id: None,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Refuse to sign while the wallet is on a different chain.
    pub fn with_expected_chain_id(mut self, chain_id: u64) -> Self {
        self.expected_chain_id = Some(chain_id);
        self
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        let body = serde_json::to_string(&request).map_err(|e| Error::SignerError(e.to_string()))?;

        debug!("Wallet request {method} (id {})", request.id);
        let text = self
            .http_client
            .post("", body)
            .await
            .map_err(|failure| match failure {
                RequestFailure::Transport(reason) => {
                    Error::SignerError(format!("wallet unreachable: {reason}"))
                }
                RequestFailure::Status { status_code, body } => {
                    Error::SignerError(format!("wallet returned status {status_code}: {body}"))
                }
            })?;

        let response: RpcResponse = serde_json::from_str(&text)
            .map_err(|e| Error::SignerError(format!("invalid wallet response: {e}")))?;
        if let Some(error) = response.error {
            return Err(map_rpc_error(error));
        }
        response
            .result
            .ok_or_else(|| Error::SignerError(format!("{method}: response has no result")))
    }

    async fn request_accounts(&self, method: &str) -> Result<Vec<Address>> {
        let result = self.request(method, json!([])).await?;
        serde_json::from_value(result)
            .map_err(|e| Error::SignerError(format!("{method}: invalid account list: {e}")))
    }

    async fn chain_id(&self) -> Result<u64> {
        let result = self.request("eth_chainId", json!([])).await?;
        let raw = result
            .as_str()
            .ok_or_else(|| Error::SignerError("eth_chainId: expected a hex string".to_string()))?;
        u64::from_str_radix(raw.trim_start_matches("0x"), 16)
            .map_err(|e| Error::SignerError(format!("eth_chainId: {e}")))
    }
}

#[async_trait]
impl WalletSigner for Eip1193Signer {
    async fn connect(&self) -> Result<Vec<Address>> {
        self.request_accounts("eth_requestAccounts").await
    }

    async fn accounts(&self) -> Result<Vec<Address>> {
        self.request_accounts("eth_accounts").await
    }

    async fn sign_typed_data(&self, account: Address, typed_data: &TypedData) -> Result<Signature> {
        if let Some(expected) = self.expected_chain_id {
            let actual = self.chain_id().await?;
            if actual != expected {
                return Err(Error::SignerError(format!(
                    "wallet is on chain {actual}, expected {expected}"
                )));
            }
        }

        let document = typed_data_request(typed_data)?;
        let result = self
            .request(
                "eth_signTypedData_v4",
                json!([format!("{account:?}"), document]),
            )
            .await
            .map_err(|e| match e {
                Error::SignerNotReady(_) => Error::SignerNotReady(account),
                other => other,
            })?;

        let raw = result
            .as_str()
            .ok_or_else(|| Error::SignerError("signature is not a string".to_string()))?;
        decode_signature(raw)
    }

    async fn disconnect(&self) -> Result<()> {
        // wallet_revokePermissions is optional for providers.
        let params = json!([{ "eth_accounts": {} }]);
        if let Err(e) = self.request("wallet_revokePermissions", params).await {
            warn!("Wallet did not revoke permissions: {e}");
        }
        Ok(())
    }
}

/// The JSON string `eth_signTypedData_v4` expects. Wallets need the
/// `EIP712Domain` type listed, so it is derived from the domain's populated
/// fields when absent; message types are left exactly as given.
fn typed_data_request(typed_data: &TypedData) -> Result<String> {
    let mut document =
        serde_json::to_value(typed_data).map_err(|e| Error::SignerError(e.to_string()))?;

    if !typed_data.types.contains_key(EIP712_DOMAIN_TYPE) {
        let domain = &typed_data.domain;
        let mut fields = Vec::new();
        if domain.name.is_some() {
            fields.push(json!({ "name": "name", "type": "string" }));
        }
        if domain.version.is_some() {
            fields.push(json!({ "name": "version", "type": "string" }));
        }
        if domain.chain_id.is_some() {
            fields.push(json!({ "name": "chainId", "type": "uint256" }));
        }
        if domain.verifying_contract.is_some() {
            fields.push(json!({ "name": "verifyingContract", "type": "address" }));
        }
        if domain.salt.is_some() {
            fields.push(json!({ "name": "salt", "type": "bytes32" }));
        }
        document["types"][EIP712_DOMAIN_TYPE] = Value::Array(fields);
    }

    serde_json::to_string(&document).map_err(|e| Error::SignerError(e.to_string()))
}

fn decode_signature(raw: &str) -> Result<Signature> {
    let bytes = hex::decode(raw.trim_start_matches("0x"))
        .map_err(|e| Error::SignerError(format!("signature is not hex: {e}")))?;
    if bytes.len() != SIGNATURE_LEN {
        return Err(Error::SignerError(format!(
            "signature has {} bytes, expected {SIGNATURE_LEN}",
            bytes.len()
        )));
    }
    Signature::try_from(bytes.as_slice()).map_err(|e| Error::SignerError(e.to_string()))
}

/// 4100 carries no account; callers that know which account they asked
/// about substitute it.
fn map_rpc_error(error: RpcError) -> Error {
    match error.code {
        USER_REJECTED_REQUEST => Error::UserRejected,
        UNAUTHORIZED => Error::SignerNotReady(Address::zero()),
        code => Error::SignerError(format!("wallet error {code}: {}", error.message)),
    }
}

use std::fmt;

use ethers::types::Address;
use log::{debug, info};
use serde::Serialize;
use serde_json::Value;

use crate::prelude::Result;
use crate::req::{HttpClient, RequestFailure};
use crate::{Error, InputPayload};

/// An action payload together with the signature that authorizes it.
///
/// Anyone holding a `SignedAction` can replay it unless the server enforces a
/// nonce carried inside `inputs`. It is therefore never logged: `Debug`
/// redacts the signature, and nothing in this crate persists it.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedAction {
    #[serde(rename = "msgSender")]
    pub sender: Address,
    pub signature: String,
    /// Exactly the message that was hashed into `signature`.
    pub inputs: InputPayload,
}

impl fmt::Debug for SignedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignedAction")
            .field("sender", &self.sender)
            .field("signature", &"<redacted>")
            .field("inputs", &self.inputs)
            .finish()
    }
}

/// The server's success body, passed back untouched.
pub type SubmissionResult = Value;

/// Posts signed actions to `<base-url>/<actionName>`.
///
/// No retries happen here. Posting the same `SignedAction` twice is only
/// safe if the server deduplicates; deciding to resubmit is up to the caller.
#[derive(Debug, Clone)]
pub struct ActionSubmitter {
    http_client: HttpClient,
}

impl ActionSubmitter {
    pub fn new(http_client: HttpClient) -> Self {
        ActionSubmitter { http_client }
    }

    pub async fn submit(&self, action_name: &str, signed: &SignedAction) -> Result<SubmissionResult> {
        let body = serde_json::to_string(signed).map_err(|e| Error::JsonParse(e.to_string()))?;

        debug!("Posting {action_name} action from {:?}", signed.sender);
        let text = self
            .http_client
            .post(&format!("/{action_name}"), body)
            .await
            .map_err(|failure| match failure {
                RequestFailure::Transport(reason) => Error::SubmissionUnreachable(reason),
                RequestFailure::Status { status_code, body } => Error::SubmissionRejected {
                    status: status_code,
                    reason: rejection_reason(&body),
                },
            })?;

        info!("Action {action_name} accepted for {:?}", signed.sender);
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| Error::SubmissionRejected {
            status: 200,
            reason: Some(format!("unreadable response ({e}): {text}")),
        })
    }
}

/// The server's own explanation of a rejection, if it gave one.
fn rejection_reason(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        for key in ["error", "message", "reason"] {
            match map.get(key) {
                Some(Value::String(reason)) => return Some(reason.clone()),
                Some(Value::Object(nested)) => {
                    if let Some(Value::String(reason)) = nested.get("message") {
                        return Some(reason.clone());
                    }
                }
                _ => {}
            }
        }
    }
    Some(body.to_string())
}

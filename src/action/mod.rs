mod cancel;

pub use cancel::{CancelHandle, CancelToken};

use ethers::types::Address;
use log::{info, warn};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::config::ActionClientConfig;
use crate::prelude::Result;
use crate::req::HttpClient;
use crate::schema::SchemaFetcher;
use crate::signer::{TypedDataSigner, WalletSigner};
use crate::submit::{ActionSubmitter, SignedAction, SubmissionResult};
use crate::Error;

/// Field name -> value for one action. Serialized in insertion order.
pub type InputPayload = Map<String, Value>;

/// A named operation and its inputs, built per user interaction.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub name: String,
    pub inputs: InputPayload,
}

impl Action {
    pub fn new(name: impl Into<String>) -> Self {
        Action {
            name: name.into(),
            inputs: InputPayload::new(),
        }
    }

    pub fn with_input(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.inputs.insert(field.into(), value.into());
        self
    }
}

/// Runs the fetch -> sign -> submit sequence for actions.
///
/// The client keeps no state between invocations, so one instance can serve
/// concurrent submissions. Two concurrent submissions for the same account
/// are not serialized here; that is up to the wallet.
#[derive(Debug)]
pub struct ActionClient<S> {
    fetcher: SchemaFetcher,
    signer: TypedDataSigner<S>,
    submitter: ActionSubmitter,
}

impl<S: WalletSigner> ActionClient<S> {
    pub fn new(wallet: S, config: ActionClientConfig) -> Result<Self> {
        let http_client = HttpClient::new(config.http_client()?, config.base_url.get_url());
        Ok(ActionClient {
            fetcher: SchemaFetcher::new(http_client.clone(), &config),
            signer: TypedDataSigner::new(wallet),
            submitter: ActionSubmitter::new(http_client),
        })
    }

    pub fn wallet(&self) -> &S {
        self.signer.wallet()
    }

    /// Asks the wallet for access and returns the account to act as.
    pub async fn connect_account(&self) -> Result<Address> {
        self.signer
            .wallet()
            .connect()
            .await?
            .into_iter()
            .next()
            .ok_or(Error::NoActiveAccount)
    }

    pub async fn submit(&self, action: &Action, account: Option<Address>) -> Result<SubmissionResult> {
        self.submit_action(&action.name, &action.inputs, account).await
    }

    /// Fetches the schema for `action_name`, has `account` sign
    /// `input_payload` under it, and posts the signed action.
    ///
    /// Any failure ends the invocation with that step's error; nothing is
    /// retried. A caller that wants to retry must call this again, which
    /// fetches the schema anew.
    pub async fn submit_action(
        &self,
        action_name: &str,
        input_payload: &InputPayload,
        account: Option<Address>,
    ) -> Result<SubmissionResult> {
        self.submit_action_with_cancel(action_name, input_payload, account, &CancelToken::never())
            .await
    }

    /// Like [`submit_action`](Self::submit_action), but gives up with
    /// [`Error::Cancelled`] if `cancel` fires while the wallet prompt is open.
    /// A signature obtained after cancellation is discarded, never posted.
    pub async fn submit_action_with_cancel(
        &self,
        action_name: &str,
        input_payload: &InputPayload,
        account: Option<Address>,
        cancel: &CancelToken,
    ) -> Result<SubmissionResult> {
        let attempt = Uuid::new_v4();
        info!("[{attempt}] Submitting {action_name}");

        let schema = self.fetcher.fetch(action_name).await?;

        let account = account.ok_or(Error::NoActiveAccount)?;

        let signature = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("[{attempt}] Cancelled while waiting for {account:?} to sign");
                return Err(Error::Cancelled);
            }
            signature = self.signer.sign(account, &schema, input_payload) => signature?,
        };
        if cancel.is_cancelled() {
            warn!("[{attempt}] Cancelled before submission, discarding signature");
            return Err(Error::Cancelled);
        }

        let signed = SignedAction {
            sender: account,
            signature,
            inputs: input_payload.clone(),
        };
        let result = self.submitter.submit(action_name, &signed).await?;

        info!("[{attempt}] {action_name} submitted");
        Ok(result)
    }
}

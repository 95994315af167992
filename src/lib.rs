//! Client for typed-data (EIP-712) action submission.
//!
//! An action is submitted in three strictly ordered steps: its signing schema
//! is fetched from the action service, a [`WalletSigner`] signs the inputs
//! under that schema, and the signed action is posted back to the service.
//! [`ActionClient`] runs the sequence; the individual steps are exposed as
//! [`SchemaFetcher`], [`TypedDataSigner`] and [`ActionSubmitter`].
//!
//! ```no_run
//! use typed_actions::{Action, ActionClient, ActionClientConfig, LocalWalletSigner};
//!
//! # async fn run() -> typed_actions::prelude::Result<()> {
//! let wallet = LocalWalletSigner::random();
//! let account = wallet.address();
//! let client = ActionClient::new(wallet, ActionClientConfig::default())?;
//!
//! let action = Action::new("create").with_input("address", format!("{account:?}"));
//! let response = client.submit(&action, Some(account)).await?;
//! println!("{response}");
//! # Ok(())
//! # }
//! ```

mod action;
mod config;
mod consts;
mod errors;
pub mod prelude;
mod req;
pub mod schema;
pub mod signer;
pub mod submit;

pub use action::{Action, ActionClient, CancelHandle, CancelToken, InputPayload};
pub use config::{
    ActionClientConfig, PrimaryTypeRule, ServiceUrl, ENV_PRIMARY_TYPE_SUFFIX,
    ENV_REQUEST_TIMEOUT_SECS, ENV_SCHEMA_PATH, ENV_SERVICE_URL,
};
pub use consts::{DEFAULT_PRIMARY_TYPE_SUFFIX, LOCAL_API_URL, SCHEMA_PATH, SEPOLIA_CHAIN_ID};
pub use errors::{Error, ErrorKind};
pub use req::HttpClient;
pub use schema::{SchemaFetcher, SigningSchema};
pub use signer::{Eip1193Signer, LocalWalletSigner, TypedDataSigner, WalletSigner};
pub use submit::{ActionSubmitter, SignedAction, SubmissionResult};

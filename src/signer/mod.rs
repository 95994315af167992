mod eip1193;
mod local;

pub use eip1193::Eip1193Signer;
pub use local::LocalWalletSigner;

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use ethers::types::transaction::eip712::TypedData;
use ethers::types::{Address, Signature};
use log::debug;

use crate::prelude::Result;
use crate::schema::SigningSchema;
use crate::{Error, InputPayload};

/// A wallet able to produce EIP-712 signatures.
///
/// One implementation exists per wallet backend; which one is used is decided
/// when an [`ActionClient`](crate::ActionClient) is built. Implementations
/// report a declined approval as [`Error::UserRejected`], an account they
/// cannot sign for as [`Error::SignerNotReady`], and any other failure as
/// [`Error::SignerError`].
#[async_trait]
pub trait WalletSigner: Send + Sync + Debug {
    /// Requests access to the wallet's accounts, prompting the user if the
    /// backend requires it.
    async fn connect(&self) -> Result<Vec<Address>>;

    /// Accounts the wallet is currently authorized to sign for. Never prompts.
    async fn accounts(&self) -> Result<Vec<Address>>;

    /// Signs `typed_data` as `account`. May wait indefinitely on a human.
    async fn sign_typed_data(&self, account: Address, typed_data: &TypedData) -> Result<Signature>;

    async fn disconnect(&self) -> Result<()>;
}

#[async_trait]
impl<T: WalletSigner + ?Sized> WalletSigner for Arc<T> {
    async fn connect(&self) -> Result<Vec<Address>> {
        (**self).connect().await
    }

    async fn accounts(&self) -> Result<Vec<Address>> {
        (**self).accounts().await
    }

    async fn sign_typed_data(&self, account: Address, typed_data: &TypedData) -> Result<Signature> {
        (**self).sign_typed_data(account, typed_data).await
    }

    async fn disconnect(&self) -> Result<()> {
        (**self).disconnect().await
    }
}

/// Signs action payloads under a fetched [`SigningSchema`].
///
/// The schema's domain, types and primary type reach the wallet exactly as
/// fetched; this type never builds or patches a schema of its own.
#[derive(Debug, Clone)]
pub struct TypedDataSigner<S> {
    wallet: S,
}

impl<S: WalletSigner> TypedDataSigner<S> {
    pub fn new(wallet: S) -> Self {
        TypedDataSigner { wallet }
    }

    pub fn wallet(&self) -> &S {
        &self.wallet
    }

    /// Returns the signature as `0x`-prefixed hex of the 65 `r‖s‖v` bytes.
    pub async fn sign(
        &self,
        account: Address,
        schema: &SigningSchema,
        payload: &InputPayload,
    ) -> Result<String> {
        let accounts = self.wallet.accounts().await.map_err(|e| match e {
            Error::SignerNotReady(_) => Error::SignerNotReady(account),
            other => other,
        })?;
        if !accounts.contains(&account) {
            return Err(Error::SignerNotReady(account));
        }

        let typed_data = schema.typed_data(payload)?;
        debug!(
            "Requesting {} signature from {account:?}",
            schema.primary_type()
        );
        let signature = self.wallet.sign_typed_data(account, &typed_data).await?;
        Ok(encode_signature(&signature))
    }
}

pub(crate) fn encode_signature(signature: &Signature) -> String {
    format!("0x{}", hex::encode(signature.to_vec()))
}

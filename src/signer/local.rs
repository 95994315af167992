use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip712::TypedData;
use ethers::types::{Address, Signature};

use super::WalletSigner;
use crate::prelude::Result;
use crate::Error;

/// Signs with a private key held in process memory.
///
/// Signatures are RFC 6979 deterministic: the same key, schema and payload
/// always produce the same bytes. There is no human in the loop, so this
/// signer never reports [`Error::UserRejected`].
#[derive(Debug)]
pub struct LocalWalletSigner {
    wallet: LocalWallet,
    connected: AtomicBool,
}

impl LocalWalletSigner {
    pub fn new(wallet: LocalWallet) -> Self {
        LocalWalletSigner {
            wallet,
            connected: AtomicBool::new(true),
        }
    }

    pub fn from_private_key(private_key: &str) -> Result<Self> {
        let wallet = private_key
            .trim_start_matches("0x")
            .parse::<LocalWallet>()
            .map_err(|e| Error::SignerError(format!("invalid private key: {e}")))?;
        Ok(Self::new(wallet))
    }

    /// A throwaway key, for tests and demos.
    pub fn random() -> Self {
        Self::new(LocalWallet::new(&mut rand::thread_rng()))
    }

    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WalletSigner for LocalWalletSigner {
    async fn connect(&self) -> Result<Vec<Address>> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(vec![self.address()])
    }

    async fn accounts(&self) -> Result<Vec<Address>> {
        if self.is_connected() {
            Ok(vec![self.address()])
        } else {
            Ok(Vec::new())
        }
    }

    async fn sign_typed_data(&self, account: Address, typed_data: &TypedData) -> Result<Signature> {
        if !self.is_connected() || account != self.address() {
            return Err(Error::SignerNotReady(account));
        }
        self.wallet
            .sign_typed_data(typed_data)
            .await
            .map_err(|e| Error::SignerError(e.to_string()))
    }

    async fn disconnect(&self) -> Result<()> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}

use std::env;
use std::sync::Arc;

use log::{error, info};
use typed_actions::prelude::Result;
use typed_actions::{
    Action, ActionClient, ActionClientConfig, Eip1193Signer, Error, LocalWalletSigner,
    WalletSigner, SEPOLIA_CHAIN_ID,
};

// Picks the wallet backend once, here. WALLET_RPC_URL selects an EIP-1193
// provider endpoint; otherwise PRIVATE_KEY is used as an in-process key.
fn wallet_from_env() -> Result<Arc<dyn WalletSigner>> {
    if let Ok(endpoint) = env::var("WALLET_RPC_URL") {
        info!("Using EIP-1193 wallet at {endpoint}");
        let chain_id = match env::var("WALLET_CHAIN_ID") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| Error::Config(format!("WALLET_CHAIN_ID is not a number: {raw:?}")))?,
            Err(_) => SEPOLIA_CHAIN_ID,
        };
        return Ok(Arc::new(
            Eip1193Signer::new(endpoint).with_expected_chain_id(chain_id),
        ));
    }

    let key = env::var("PRIVATE_KEY").map_err(|_| {
        Error::Config(
            "set WALLET_RPC_URL or PRIVATE_KEY in your .env file or environment".to_string(),
        )
    })?;
    let wallet = LocalWalletSigner::from_private_key(&key)?;
    info!("Using local wallet {:?}", wallet.address());
    Ok(Arc::new(wallet))
}

async fn run() -> Result<()> {
    let config = ActionClientConfig::from_env()?;
    let client = ActionClient::new(wallet_from_env()?, config)?;

    let account = client.connect_account().await?;
    let action_name = env::var("ACTION_NAME").unwrap_or_else(|_| "create".to_string());
    let action = Action::new(action_name).with_input("address", format!("{account:?}"));

    let response = client.submit(&action, Some(account)).await?;
    println!(
        "{}",
        serde_json::to_string_pretty(&response).unwrap_or_else(|_| response.to_string())
    );
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    env_logger::init();

    if let Err(e) = run().await {
        error!("{e}");
        eprintln!("{}", e.user_message());
        std::process::exit(1);
    }
}

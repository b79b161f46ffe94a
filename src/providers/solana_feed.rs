// In src/providers/solana_feed.rs

use async_trait::async_trait;
use futures_util::stream::StreamExt;
use serde::Deserialize;
use solana_account_decoder_client_types::{
  token::UiTokenAccount, UiAccountData, UiAccountEncoding,
};
use solana_client::{
  nonblocking::{pubsub_client::PubsubClient, rpc_client::RpcClient},
  rpc_config::RpcAccountInfoConfig,
  rpc_request::{RpcRequest, TokenAccountsFilter},
};
use solana_commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{mpsc::unbounded_channel, oneshot, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{
  models::{AccountChange, ChainTransaction, TokenAccountEntry, TokenHolding},
  traits::chain_feed::{AccountUpdates, ChainFeed, FeedConnector},
  utils::helper::parse_pubkey,
};

const COMMITMENT: &str = "confirmed";

fn token_program_id() -> Pubkey {
  Pubkey::from_str_const("TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA")
}

/// One live session: an RPC client for reads and a pubsub client whose
/// account subscriptions are pumped into channels by background tasks
pub struct SolanaFeed {
  rpc_client: Arc<RpcClient>,
  pubsub_client: RwLock<Option<Arc<PubsubClient>>>,
  subscription_tasks: SubscriptionTasks,
}

impl SolanaFeed {
  pub fn new(rpc_client: RpcClient, pubsub_client: PubsubClient) -> Self {
    Self {
      rpc_client: Arc::new(rpc_client),
      pubsub_client: RwLock::new(Some(Arc::new(pubsub_client))),
      subscription_tasks: SubscriptionTasks::default(),
    }
  }

}

/// Forwarding tasks of one session. The handle is recorded as part of the
/// spawn, so a subscribe future cancelled at any later await cannot leave a
/// task that `stop_all` does not see.
#[derive(Default)]
struct SubscriptionTasks {
  handles: Mutex<Vec<JoinHandle<()>>>,
}

impl SubscriptionTasks {
  fn spawn<F>(&self, task: F)
  where
    F: Future<Output = ()> + Send + 'static,
  {
    let handle = tokio::spawn(task);
    self.lock().push(handle);
  }

  async fn stop_all(&self) {
    let handles = std::mem::take(&mut *self.lock());
    for handle in &handles {
      handle.abort();
    }
    for handle in handles {
      let _ = handle.await;
    }
  }

  #[cfg(test)]
  fn len(&self) -> usize {
    self.lock().len()
  }

  fn lock(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
    match self.handles.lock() {
      Ok(guard) => guard,
      Err(poisoned) => poisoned.into_inner(),
    }
  }
}

#[async_trait]
impl ChainFeed for SolanaFeed {
  async fn subscribe(&self, address: &str) -> anyhow::Result<AccountUpdates> {
    let wallet_address = parse_pubkey(address)?;
    let pubsub_client = self
      .pubsub_client
      .read()
      .await
      .clone()
      .ok_or_else(|| anyhow::anyhow!("feed handle has been shut down"))?;

    let (change_tx, change_rx) = unbounded_channel();
    let (ack_tx, ack_rx) = oneshot::channel::<anyhow::Result<()>>();
    let address = address.to_string();

    self.subscription_tasks.spawn(async move {
      let config = RpcAccountInfoConfig {
        encoding: Some(UiAccountEncoding::Base64),
        commitment: Some(CommitmentConfig::confirmed()),
        data_slice: None,
        min_context_slot: None,
      };

      let (mut notifications, _unsubscribe) =
        match pubsub_client.account_subscribe(&wallet_address, Some(config)).await {
          Ok(subscription) => {
            let _ = ack_tx.send(Ok(()));
            subscription
          }
          Err(e) => {
            let _ = ack_tx.send(Err(anyhow::anyhow!(
              "Failed to subscribe to account {}: {}",
              address,
              e
            )));
            return;
          }
        };

      while let Some(notification) = notifications.next().await {
        let change =
          AccountChange::new(notification.value.lamports, notification.context.slot);
        if change_tx.send(change).is_err() {
          break;
        }
      }

      debug!("Account stream for {} ended", address);
    });

    match ack_rx.await {
      Ok(Ok(())) => Ok(change_rx),
      Ok(Err(e)) => Err(e),
      Err(_) => Err(anyhow::anyhow!("subscription task stopped before acknowledging")),
    }
  }

  async fn latest_signature(&self, address: &str) -> anyhow::Result<Option<String>> {
    let params = serde_json::json!([
      address,
      { "limit": 1, "commitment": COMMITMENT }
    ]);

    let signatures: Vec<SignatureInfo> = self
      .rpc_client
      .send(RpcRequest::GetSignaturesForAddress, params)
      .await?;

    Ok(signatures.into_iter().next().map(|s| s.signature))
  }

  async fn transaction(&self, signature: &str) -> anyhow::Result<Option<ChainTransaction>> {
    let params = serde_json::json!([
      signature,
      {
        "encoding": "jsonParsed",
        "commitment": COMMITMENT,
        "maxSupportedTransactionVersion": 0
      }
    ]);

    let transaction: Option<RpcTransaction> = self
      .rpc_client
      .send(RpcRequest::GetTransaction, params)
      .await?;

    Ok(transaction.map(RpcTransaction::into_chain_transaction))
  }

  async fn token_accounts(&self, address: &str) -> anyhow::Result<Vec<TokenAccountEntry>> {
    let wallet_address = parse_pubkey(address)?;
    let accounts = self
      .rpc_client
      .get_token_accounts_by_owner(
        &wallet_address,
        TokenAccountsFilter::ProgramId(token_program_id()),
      )
      .await?;

    debug!("Found {} token accounts for {}", accounts.len(), address);

    let entries = accounts
      .into_iter()
      .map(|keyed_account| {
        parse_token_account(keyed_account.pubkey, keyed_account.account.data)
      })
      .collect();

    Ok(entries)
  }

  async fn probe_liveness(&self) -> anyhow::Result<String> {
    let version = self.rpc_client.get_version().await?;
    Ok(version.solana_core)
  }

  async fn shutdown(&self) {
    self.subscription_tasks.stop_all().await;

    let Some(pubsub_client) = self.pubsub_client.write().await.take() else {
      return;
    };
    match Arc::try_unwrap(pubsub_client) {
      Ok(client) => {
        if let Err(e) = client.shutdown().await {
          warn!("Failed to close WebSocket cleanly: {}", e);
        }
      }
      Err(_) => debug!("WebSocket client still referenced, dropping it"),
    }
  }
}

fn parse_token_account(account: String, data: UiAccountData) -> TokenAccountEntry {
  let UiAccountData::Json(parsed_account) = data else {
    return TokenAccountEntry::Unparsable {
      account,
      reason: "account data is not jsonParsed".to_string(),
    };
  };

  let Some(info) = parsed_account.parsed.get("info") else {
    return TokenAccountEntry::Unparsable {
      account,
      reason: "missing info section".to_string(),
    };
  };

  match serde_json::from_value::<UiTokenAccount>(info.clone()) {
    Ok(token_data) => TokenAccountEntry::Parsed(TokenHolding::new(
      token_data.mint,
      token_data.token_amount.ui_amount_string,
    )),
    Err(e) => TokenAccountEntry::Unparsable {
      account,
      reason: e.to_string(),
    },
  }
}

#[derive(Debug, Deserialize)]
struct SignatureInfo {
  signature: String,
}

/// `getTransaction` result, reduced to what the report reads
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcTransaction {
  slot: u64,
  block_time: Option<i64>,
  meta: Option<RpcTransactionMeta>,
  transaction: RpcTransactionBody,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcTransactionMeta {
  fee: u64,
  #[serde(default)]
  pre_balances: Vec<u64>,
  #[serde(default)]
  post_balances: Vec<u64>,
}

#[derive(Debug, Deserialize)]
struct RpcTransactionBody {
  message: RpcMessage,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcMessage {
  #[serde(default)]
  account_keys: Vec<RpcAccountKey>,
  #[serde(default)]
  instructions: Vec<RpcInstruction>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RpcAccountKey {
  Parsed { pubkey: String },
  Raw(String),
}

impl RpcAccountKey {
  fn as_str(&self) -> &str {
    match self {
      RpcAccountKey::Parsed { pubkey } => pubkey,
      RpcAccountKey::Raw(pubkey) => pubkey,
    }
  }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcInstruction {
  program_id: Option<String>,
  program_id_index: Option<usize>,
}

impl RpcTransaction {
  fn into_chain_transaction(self) -> ChainTransaction {
    let RpcMessage { account_keys, instructions } = self.transaction.message;

    let program_ids = instructions
      .into_iter()
      .filter_map(|ix| match (ix.program_id, ix.program_id_index) {
        (Some(program_id), _) => Some(program_id),
        (None, Some(index)) => account_keys.get(index).map(|k| k.as_str().to_string()),
        (None, None) => None,
      })
      .collect();

    let (fee_lamports, pre_balances, post_balances) = match self.meta {
      Some(meta) => (meta.fee, Some(meta.pre_balances), Some(meta.post_balances)),
      None => (0, None, None),
    };

    ChainTransaction {
      slot: self.slot,
      block_time: self.block_time,
      fee_lamports,
      program_ids,
      pre_balances,
      post_balances,
    }
  }
}

/// Opens `SolanaFeed` sessions against fixed endpoints
pub struct SolanaFeedConnector {
  rpc_url: String,
  ws_url: String,
}

impl SolanaFeedConnector {
  pub fn new(rpc_url: String, ws_url: String) -> Self {
    Self { rpc_url, ws_url }
  }
}

#[async_trait]
impl FeedConnector for SolanaFeedConnector {
  async fn connect(&self) -> anyhow::Result<Arc<dyn ChainFeed>> {
    let rpc_client =
      RpcClient::new_with_commitment(self.rpc_url.clone(), CommitmentConfig::confirmed());

    let pubsub_client = PubsubClient::new(&self.ws_url).await.map_err(|e| {
      anyhow::anyhow!("Failed to connect to WebSocket {}: {}", self.ws_url, e)
    })?;

    info!("Connected to {} / {}", self.rpc_url, self.ws_url);
    Ok(Arc::new(SolanaFeed::new(rpc_client, pubsub_client)))
  }

  fn endpoint(&self) -> String {
    format!("{} / {}", self.rpc_url, self.ws_url)
  }
}

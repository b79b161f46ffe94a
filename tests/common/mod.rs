#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};

use solana_wallet_watch::{
    AccountChange, AccountUpdates, ChainFeed, ChainTransaction, ConnectionSupervisor,
    EnrichmentReader, FeedConnector, NotificationTransport, Notifier, SwapProgramSet,
    TokenAccountEntry, TokenHolding, TrackerSettings, UpdatePipeline, WalletTracker,
};

pub const WALLET_A: &str = "2UWHq9JNxnBi4ehpfivh9crJjG5EuayKCWsH9VuLXPeR";
pub const WALLET_B: &str = "HxjcMB4kfrwmGLZRk3dzwbd6EJJLDTceZgVv6Dw2WoaY";
pub const WALLET_C: &str = "H91Y4q87bbctbH9SNiHrATQo2W4nvagbyPXMhFnFtDvQ";
pub const JUPITER: &str = "JUP4Fb2cqiRUcaTHdrPC8h2gNsA2ETXiPDD33WcGuJB";

pub fn sample_transaction() -> ChainTransaction {
    ChainTransaction {
        slot: 42,
        block_time: Some(1_700_000_000),
        fee_lamports: 5_000,
        program_ids: vec![JUPITER.to_string()],
        pre_balances: Some(vec![2_000_000_000]),
        post_balances: Some(vec![1_999_995_000]),
    }
}

/// In-memory chain session. Tests push account changes into it directly.
pub struct FakeFeed {
    pub id: usize,
    pub alive: AtomicBool,
    pub hang_probe: AtomicBool,
    pub hang_tokens: AtomicBool,
    pub fail_tokens: AtomicBool,
    pub fail_signature: AtomicBool,
    pub fail_transaction: AtomicBool,
    pub shut_down: AtomicBool,
    pub signature: Mutex<Option<String>>,
    pub transaction: Mutex<Option<ChainTransaction>>,
    pub tokens: Mutex<Vec<TokenAccountEntry>>,
    pub failing_subscriptions: Mutex<HashSet<String>>,
    pub subscribe_calls: Mutex<Vec<String>>,
    pub token_fetches: AtomicUsize,
    senders: Mutex<HashMap<String, Vec<UnboundedSender<AccountChange>>>>,
}

impl FakeFeed {
    pub fn new(id: usize) -> Self {
        Self {
            id,
            alive: AtomicBool::new(true),
            hang_probe: AtomicBool::new(false),
            hang_tokens: AtomicBool::new(false),
            fail_tokens: AtomicBool::new(false),
            fail_signature: AtomicBool::new(false),
            fail_transaction: AtomicBool::new(false),
            shut_down: AtomicBool::new(false),
            signature: Mutex::new(Some("5sigXYZ".to_string())),
            transaction: Mutex::new(Some(sample_transaction())),
            tokens: Mutex::new(vec![TokenAccountEntry::Parsed(TokenHolding::new(
                "MintA", "1.5",
            ))]),
            failing_subscriptions: Mutex::new(HashSet::new()),
            subscribe_calls: Mutex::new(Vec::new()),
            token_fetches: AtomicUsize::new(0),
            senders: Mutex::new(HashMap::new()),
        }
    }

    /// Deliver a change to every open subscription of `address`
    pub fn push(&self, address: &str, lamports: u64) -> usize {
        let senders = self.senders.lock().unwrap();
        senders
            .get(address)
            .map(|list| {
                list.iter()
                    .filter(|tx| tx.send(AccountChange::new(lamports, 1)).is_ok())
                    .count()
            })
            .unwrap_or(0)
    }

    /// Open subscriptions whose receiver is still alive
    pub fn live_subscriptions(&self, address: &str) -> usize {
        let senders = self.senders.lock().unwrap();
        senders
            .get(address)
            .map(|list| list.iter().filter(|tx| !tx.is_closed()).count())
            .unwrap_or(0)
    }

    pub fn total_live_subscriptions(&self) -> usize {
        let senders = self.senders.lock().unwrap();
        senders
            .values()
            .flat_map(|list| list.iter())
            .filter(|tx| !tx.is_closed())
            .count()
    }

    pub fn subscribe_count(&self, address: &str) -> usize {
        self.subscribe_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.as_str() == address)
            .count()
    }

    pub fn kill(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl ChainFeed for FakeFeed {
    async fn subscribe(&self, address: &str) -> anyhow::Result<AccountUpdates> {
        self.subscribe_calls.lock().unwrap().push(address.to_string());
        if self.shut_down.load(Ordering::SeqCst) {
            anyhow::bail!("feed handle has been shut down");
        }
        if self.failing_subscriptions.lock().unwrap().contains(address) {
            anyhow::bail!("subscription rejected");
        }

        let (tx, rx) = unbounded_channel();
        self.senders
            .lock()
            .unwrap()
            .entry(address.to_string())
            .or_default()
            .push(tx);
        Ok(rx)
    }

    async fn latest_signature(&self, _address: &str) -> anyhow::Result<Option<String>> {
        if self.fail_signature.load(Ordering::SeqCst) {
            anyhow::bail!("429 Too Many Requests");
        }
        Ok(self.signature.lock().unwrap().clone())
    }

    async fn transaction(&self, _signature: &str) -> anyhow::Result<Option<ChainTransaction>> {
        if self.fail_transaction.load(Ordering::SeqCst) {
            anyhow::bail!("connection reset");
        }
        Ok(self.transaction.lock().unwrap().clone())
    }

    async fn token_accounts(&self, _address: &str) -> anyhow::Result<Vec<TokenAccountEntry>> {
        self.token_fetches.fetch_add(1, Ordering::SeqCst);
        if self.hang_tokens.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.fail_tokens.load(Ordering::SeqCst) {
            anyhow::bail!("rpc unavailable");
        }
        Ok(self.tokens.lock().unwrap().clone())
    }

    async fn probe_liveness(&self) -> anyhow::Result<String> {
        if self.hang_probe.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if !self.alive.load(Ordering::SeqCst) {
            anyhow::bail!("connection closed");
        }
        Ok("2.3.6".to_string())
    }

    async fn shutdown(&self) {
        self.shut_down.store(true, Ordering::SeqCst);
        self.senders.lock().unwrap().clear();
    }
}

/// Hands out a fresh `FakeFeed` on every connect
#[derive(Default)]
pub struct FakeConnector {
    feeds: Mutex<Vec<Arc<FakeFeed>>>,
    pub fail_next_connects: AtomicUsize,
    pub failing_subscriptions: Mutex<HashSet<String>>,
}

impl FakeConnector {
    pub fn connects(&self) -> usize {
        self.feeds.lock().unwrap().len()
    }

    pub fn feed(&self, index: usize) -> Arc<FakeFeed> {
        self.feeds.lock().unwrap()[index].clone()
    }

    pub fn latest(&self) -> Arc<FakeFeed> {
        self.feeds.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl FeedConnector for FakeConnector {
    async fn connect(&self) -> anyhow::Result<Arc<dyn ChainFeed>> {
        let pending_failures = self.fail_next_connects.load(Ordering::SeqCst);
        if pending_failures > 0 {
            self.fail_next_connects.store(pending_failures - 1, Ordering::SeqCst);
            anyhow::bail!("connection refused");
        }

        let mut feeds = self.feeds.lock().unwrap();
        let feed = Arc::new(FakeFeed::new(feeds.len()));
        *feed.failing_subscriptions.lock().unwrap() =
            self.failing_subscriptions.lock().unwrap().clone();
        feeds.push(feed.clone());
        Ok(feed as Arc<dyn ChainFeed>)
    }

    fn endpoint(&self) -> String {
        "fake://chain".to_string()
    }
}

/// Remembers every message it was asked to send
#[derive(Default)]
pub struct RecordingTransport {
    pub sent: Mutex<Vec<(String, String)>>,
}

impl RecordingTransport {
    pub fn messages(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, text)| text.clone())
            .collect()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl NotificationTransport for RecordingTransport {
    async fn send(&self, destination: &str, text: &str) -> anyhow::Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((destination.to_string(), text.to_string()));
        Ok(())
    }
}

pub struct Harness {
    pub tracker: Arc<WalletTracker>,
    pub supervisor: Arc<ConnectionSupervisor>,
    pub connector: Arc<FakeConnector>,
    pub transport: Arc<RecordingTransport>,
}

pub async fn harness(addresses: &[&str], cooldown: Duration, trailing_edge: bool) -> Harness {
    let connector = Arc::new(FakeConnector::default());
    let supervisor = Arc::new(
        ConnectionSupervisor::connect(connector.clone(), Duration::from_secs(5))
            .await
            .unwrap(),
    );

    let transport = Arc::new(RecordingTransport::default());
    let notifier = Notifier::new(
        transport.clone(),
        vec!["chat-1".to_string()],
        Duration::from_secs(5),
    );
    let reader = EnrichmentReader::new(SwapProgramSet::default(), true, Duration::from_secs(5));
    let pipeline = Arc::new(UpdatePipeline::new(supervisor.clone(), reader, notifier));

    let tracker = Arc::new(WalletTracker::new(
        addresses.iter().map(|a| a.to_string()).collect(),
        supervisor.clone(),
        pipeline,
        TrackerSettings {
            cooldown,
            trailing_edge,
            subscribe_timeout: Duration::from_secs(5),
        },
    ));

    Harness {
        tracker,
        supervisor,
        connector,
        transport,
    }
}

/// Let spawned workers drain their queues
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    tokio::time::sleep(Duration::from_millis(1)).await;
}

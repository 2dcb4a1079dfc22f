use crate::domain::money::{Amount, Balance};
use crate::domain::payment::{
    DepositBody, PaymentStatus, TransactionKind, TransactionReceipt, TransactionRecord,
    UpgradeBody, UpgradeQuote, WithdrawalBody,
};
use crate::domain::pool::{Pool, PoolTier};
use crate::domain::ports::{CheckoutEvent, CheckoutProvider, CheckoutSession, PoolApi};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Mutex, RwLock, mpsc};
use tracing::warn;

#[derive(Debug, Clone)]
enum Settlement {
    Deposit(Amount),
    Upgrade,
}

#[derive(Debug, Clone)]
struct PendingPayment {
    pool_id: String,
    reference: String,
    settlement: Settlement,
    fetches_left: usize,
}

#[derive(Debug, Default)]
struct State {
    pools: HashMap<String, Pool>,
    transactions: HashMap<String, Vec<TransactionRecord>>,
    pending: Vec<PendingPayment>,
    next_id: u64,
}

#[derive(Debug, Default)]
struct Counters {
    deposits: AtomicUsize,
    withdrawals: AtomicUsize,
    upgrades: AtomicUsize,
    fetches: AtomicUsize,
}

/// In-process stand-in for the pools backend.
///
/// Push payments settle on their own after a configurable number of pool
/// fetches, which is how the confirmation poller sees them land. Every call is
/// counted so tests can assert what reached the "network".
#[derive(Debug, Clone)]
pub struct InMemoryPoolApi {
    state: Arc<RwLock<State>>,
    counters: Arc<Counters>,
    settle_after: Option<usize>,
    rejection: Option<String>,
    upgrade_price: Decimal,
}

impl Default for InMemoryPoolApi {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryPoolApi {
    /// Creates an empty backend where push payments never settle.
    pub fn new() -> Self {
        Self {
            state: Arc::default(),
            counters: Arc::default(),
            settle_after: None,
            rejection: None,
            upgrade_price: dec!(500),
        }
    }

    /// Builder-only: seeds a pool before the backend is cloned. Use
    /// [`insert_pool`](Self::insert_pool) on a shared handle.
    pub fn with_pool(mut self, pool: Pool) -> Self {
        match Arc::get_mut(&mut self.state) {
            Some(state) => {
                state.get_mut().pools.insert(pool.id.clone(), pool);
            }
            None => warn!(pool_id = %pool.id, "with_pool on a shared backend ignored"),
        }
        self
    }

    /// Adds or replaces a pool; visible to every clone.
    pub async fn insert_pool(&self, pool: Pool) {
        self.state.write().await.pools.insert(pool.id.clone(), pool);
    }

    /// Push payments settle on the `fetches`-th pool fetch after initiation.
    pub fn settle_after(mut self, fetches: usize) -> Self {
        self.settle_after = Some(fetches);
        self
    }

    /// Every initiation call fails with a 400 carrying `message`.
    pub fn reject_with(mut self, message: impl Into<String>) -> Self {
        self.rejection = Some(message.into());
        self
    }

    pub fn with_upgrade_price(mut self, price: Amount) -> Self {
        self.upgrade_price = price.value();
        self
    }

    pub fn deposit_calls(&self) -> usize {
        self.counters.deposits.load(Ordering::SeqCst)
    }

    pub fn withdrawal_calls(&self) -> usize {
        self.counters.withdrawals.load(Ordering::SeqCst)
    }

    pub fn upgrade_calls(&self) -> usize {
        self.counters.upgrades.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.counters.fetches.load(Ordering::SeqCst)
    }

    fn check_rejection(&self) -> Result<()> {
        match &self.rejection {
            Some(message) => Err(PaymentError::Remote {
                status: 400,
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }

    async fn record(
        &self,
        pool_id: &str,
        kind: TransactionKind,
        amount: Amount,
        phone: Option<String>,
        settlement: Option<Settlement>,
    ) -> Result<String> {
        let mut state = self.state.write().await;
        if !state.pools.contains_key(pool_id) {
            return Err(not_found(pool_id));
        }

        state.next_id += 1;
        let reference = format!("tx_{}", state.next_id);
        state
            .transactions
            .entry(pool_id.to_string())
            .or_default()
            .push(TransactionRecord {
                id: reference.clone(),
                kind,
                amount,
                status: PaymentStatus::Pending,
                phone,
                created_at: Utc::now(),
            });

        if let (Some(settlement), Some(fetches_left)) = (settlement, self.settle_after) {
            state.pending.push(PendingPayment {
                pool_id: pool_id.to_string(),
                reference: reference.clone(),
                settlement,
                fetches_left,
            });
        }
        Ok(reference)
    }
}

#[async_trait]
impl PoolApi for InMemoryPoolApi {
    async fn initiate_deposit(
        &self,
        pool_id: &str,
        body: &DepositBody,
    ) -> Result<TransactionReceipt> {
        self.counters.deposits.fetch_add(1, Ordering::SeqCst);
        self.check_rejection()?;

        let transaction_id = self
            .record(
                pool_id,
                TransactionKind::Deposit,
                body.amount,
                Some(body.phone.to_string()),
                Some(Settlement::Deposit(body.amount)),
            )
            .await?;
        Ok(TransactionReceipt { transaction_id })
    }

    async fn initiate_withdrawal(
        &self,
        pool_id: &str,
        body: &WithdrawalBody,
    ) -> Result<TransactionReceipt> {
        self.counters.withdrawals.fetch_add(1, Ordering::SeqCst);
        self.check_rejection()?;

        let phone = body.phone.as_ref().map(ToString::to_string);
        let transaction_id = self
            .record(pool_id, TransactionKind::Withdrawal, body.amount, phone, None)
            .await?;
        Ok(TransactionReceipt { transaction_id })
    }

    async fn request_upgrade(&self, pool_id: &str, body: &UpgradeBody) -> Result<UpgradeQuote> {
        self.counters.upgrades.fetch_add(1, Ordering::SeqCst);
        self.check_rejection()?;

        let amount = Amount::new(self.upgrade_price)?;
        let phone = body.phone.as_ref().map(ToString::to_string);
        let reference = self
            .record(
                pool_id,
                TransactionKind::Upgrade,
                amount,
                phone,
                Some(Settlement::Upgrade),
            )
            .await?;
        Ok(UpgradeQuote { reference, amount })
    }

    async fn fetch_pool(&self, pool_id: &str) -> Result<Pool> {
        self.counters.fetches.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.write().await;

        let mut settled = Vec::new();
        state.pending.retain_mut(|payment| {
            if payment.pool_id != pool_id {
                return true;
            }
            payment.fetches_left = payment.fetches_left.saturating_sub(1);
            if payment.fetches_left == 0 {
                settled.push(payment.clone());
                false
            } else {
                true
            }
        });

        for payment in settled {
            if let Some(pool) = state.pools.get_mut(pool_id) {
                match payment.settlement {
                    Settlement::Deposit(amount) => {
                        if let Some(balance) = pool.balance.checked_add(Balance::from(amount)) {
                            pool.balance = balance;
                        }
                    }
                    Settlement::Upgrade => pool.tier = PoolTier::Premium,
                }
            }
            if let Some(record) = state
                .transactions
                .get_mut(pool_id)
                .and_then(|records| records.iter_mut().find(|r| r.id == payment.reference))
            {
                record.status = PaymentStatus::Success;
            }
        }

        state.pools.get(pool_id).cloned().ok_or_else(|| not_found(pool_id))
    }

    async fn list_transactions(&self, pool_id: &str) -> Result<Vec<TransactionRecord>> {
        let state = self.state.read().await;
        Ok(state.transactions.get(pool_id).cloned().unwrap_or_default())
    }
}

fn not_found(pool_id: &str) -> PaymentError {
    PaymentError::Remote {
        status: 404,
        message: format!("Pool {pool_id} not found"),
    }
}

/// Checkout provider that replays a fixed list of sheet events.
#[derive(Debug, Clone)]
pub struct ScriptedCheckout {
    ready: bool,
    script: Vec<CheckoutEvent>,
    queued: Arc<Mutex<VecDeque<Vec<CheckoutEvent>>>>,
    sessions: Arc<RwLock<Vec<CheckoutSession>>>,
}

impl ScriptedCheckout {
    pub fn new(script: Vec<CheckoutEvent>) -> Self {
        Self {
            ready: true,
            script,
            queued: Arc::default(),
            sessions: Arc::default(),
        }
    }

    /// One script per opened sheet, in order. Sheets opened after the last
    /// script just close.
    pub fn sequence(scripts: Vec<Vec<CheckoutEvent>>) -> Self {
        Self {
            queued: Arc::new(Mutex::new(scripts.into())),
            ..Self::closing()
        }
    }

    /// The user dismisses the sheet without a success callback.
    pub fn closing() -> Self {
        Self::new(vec![CheckoutEvent::Closed])
    }

    /// The provider script has not finished loading.
    pub fn not_ready() -> Self {
        Self {
            ready: false,
            ..Self::new(Vec::new())
        }
    }

    /// Sessions opened so far, oldest first.
    pub async fn sessions(&self) -> Vec<CheckoutSession> {
        self.sessions.read().await.clone()
    }
}

#[async_trait]
impl CheckoutProvider for ScriptedCheckout {
    fn is_ready(&self) -> bool {
        self.ready
    }

    async fn open(&self, session: CheckoutSession) -> Result<mpsc::Receiver<CheckoutEvent>> {
        self.sessions.write().await.push(session);
        let script = self
            .queued
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| self.script.clone());

        let (tx, rx) = mpsc::channel(script.len().max(1));
        for event in script {
            // capacity covers the whole script
            let _ = tx.try_send(event);
        }
        Ok(rx)
    }
}

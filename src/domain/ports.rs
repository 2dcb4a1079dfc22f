use super::money::Amount;
use super::payment::{
    DepositBody, TransactionReceipt, TransactionRecord, UpgradeBody, UpgradeQuote,
    WithdrawalBody,
};
use super::pool::Pool;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

/// The backend REST API this client drives.
#[async_trait]
pub trait PoolApi: Send + Sync {
    async fn initiate_deposit(&self, pool_id: &str, body: &DepositBody)
    -> Result<TransactionReceipt>;
    async fn initiate_withdrawal(
        &self,
        pool_id: &str,
        body: &WithdrawalBody,
    ) -> Result<TransactionReceipt>;
    async fn request_upgrade(&self, pool_id: &str, body: &UpgradeBody) -> Result<UpgradeQuote>;
    async fn fetch_pool(&self, pool_id: &str) -> Result<Pool>;
    async fn list_transactions(&self, pool_id: &str) -> Result<Vec<TransactionRecord>>;
}

pub type PoolApiRef = Arc<dyn PoolApi>;

/// Everything the hosted payment sheet is configured with.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutSession {
    pub public_key: String,
    pub email: String,
    pub amount: Amount,
    /// `amount` in minor units.
    pub amount_minor: u64,
    pub currency: String,
    pub reference: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CheckoutEvent {
    /// The user dismissed the sheet without an explicit success signal.
    Closed,
    Succeeded { reference: String },
}

/// Client for the third-party hosted payment sheet.
///
/// `open` hands back the stream of sheet callbacks; the provider drops its
/// sender once the sheet is gone.
#[async_trait]
pub trait CheckoutProvider: Send + Sync {
    fn is_ready(&self) -> bool;
    async fn open(&self, session: CheckoutSession) -> Result<mpsc::Receiver<CheckoutEvent>>;
}

pub type CheckoutProviderRef = Arc<dyn CheckoutProvider>;

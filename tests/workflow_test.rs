use async_trait::async_trait;
use poolpay::application::form::{PhoneInput, WithdrawalForm};
use poolpay::application::poller::PollOutcome;
use poolpay::application::presenter::PaymentOutcome;
use poolpay::application::workflow::PaymentWorkflow;
use poolpay::domain::money::{Amount, Balance};
use poolpay::domain::payment::{
    DepositBody, DestinationType, TransactionReceipt, TransactionRecord, UpgradeBody,
    UpgradeQuote, WithdrawalBody, WithdrawalDestination,
};
use poolpay::domain::pool::{Pool, PoolTier};
use poolpay::domain::ports::{CheckoutEvent, CheckoutProviderRef, PoolApi, PoolApiRef};
use poolpay::error::Result;
use poolpay::infrastructure::in_memory::{InMemoryPoolApi, ScriptedCheckout};
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};

mod common;
use common::{POOL_ID, backend, mount, paybill_deposit, push_deposit, workflow_config};

fn closing() -> Option<CheckoutProviderRef> {
    Some(Arc::new(ScriptedCheckout::closing()))
}

#[tokio::test]
async fn test_paybill_deposit_shows_instructions_without_api_call() {
    let api = backend(dec!(1000));
    let workflow = mount(&api, closing()).await;

    let outcome = workflow.submit_deposit(&paybill_deposit("300")).await;

    match outcome {
        Some(PaymentOutcome::ManualInstructions(instructions)) => {
            assert_eq!(instructions.paybill_number, "174379");
            assert_eq!(instructions.account_reference, POOL_ID);
            assert_eq!(instructions.amount, Amount::new(dec!(300)).unwrap());
        }
        other => panic!("expected paybill instructions, got {other:?}"),
    }
    assert_eq!(api.deposit_calls(), 0);
    assert!(!workflow.view().await.processing);
    assert_eq!(workflow.settle().await, None);
}

#[tokio::test(start_paused = true)]
async fn test_push_deposit_confirmed_by_polling() {
    let api = backend(dec!(1000)).settle_after(4);
    let workflow = mount(&api, closing()).await;

    let outcome = workflow.submit_deposit(&push_deposit("250")).await;
    assert!(matches!(outcome, Some(PaymentOutcome::PushInitiated { .. })));
    assert!(workflow.view().await.processing);

    let settled = workflow.settle().await;
    match settled {
        Some(PollOutcome::Confirmed { resource, attempts }) => {
            assert_eq!(attempts, 4);
            assert_eq!(resource.balance, Balance::new(dec!(1250)));
        }
        other => panic!("expected confirmation, got {other:?}"),
    }

    let view = workflow.view().await;
    assert!(!view.processing);
    assert_eq!(view.pool.unwrap().balance, Balance::new(dec!(1250)));
    // mount + four polls
    assert_eq!(api.fetch_calls(), 5);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(api.fetch_calls(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_unconfirmed_push_stops_after_budget() {
    let api = backend(dec!(1000));
    let workflow = mount(&api, closing()).await;

    workflow.submit_deposit(&push_deposit("250")).await;
    let settled = workflow.settle().await;

    assert!(matches!(
        settled,
        Some(PollOutcome::Exhausted {
            reconciled: Some(_),
            attempts: 15
        })
    ));
    // mount + 15 polls + 1 reconciliation
    assert_eq!(api.fetch_calls(), 17);
    assert!(!workflow.view().await.processing);
}

#[tokio::test(start_paused = true)]
async fn test_new_payment_cancels_previous_poll() {
    let api = backend(dec!(1000));
    let workflow = mount(&api, closing()).await;

    workflow.submit_deposit(&push_deposit("100")).await;
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(api.fetch_calls(), 2);

    workflow.submit_deposit(&push_deposit("200")).await;
    let settled = workflow.settle().await;

    assert!(matches!(settled, Some(PollOutcome::Exhausted { .. })));
    // mount + 1 poll of the first session + 16 of the second
    assert_eq!(api.fetch_calls(), 18);
    assert_eq!(api.deposit_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_workflow_stops_polling() {
    let api = backend(dec!(1000));
    let workflow = mount(&api, closing()).await;

    workflow.submit_deposit(&push_deposit("100")).await;
    tokio::time::sleep(Duration::from_millis(5000)).await;
    assert_eq!(api.fetch_calls(), 3);

    drop(workflow);
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(api.fetch_calls(), 3);
}

#[tokio::test]
async fn test_success_callback_refreshes_once() {
    let api = backend(dec!(1000)).settle_after(1);
    let checkout = ScriptedCheckout::new(vec![CheckoutEvent::Succeeded {
        reference: "tx_1".to_string(),
    }]);
    let workflow = mount(&api, Some(Arc::new(checkout))).await;

    workflow.submit_deposit(&push_deposit("100")).await;

    assert_eq!(workflow.settle().await, None);
    let view = workflow.view().await;
    assert!(!view.processing);
    assert_eq!(view.pool.unwrap().balance, Balance::new(dec!(1100)));
    assert_eq!(api.fetch_calls(), 2);
}

#[tokio::test]
async fn test_validation_error_lands_in_view() {
    let api = backend(dec!(1000));
    let workflow = mount(&api, closing()).await;

    assert_eq!(workflow.submit_deposit(&push_deposit("5")).await, None);
    assert_eq!(
        workflow.view().await.error.as_deref(),
        Some("Minimum amount is 10")
    );

    let mut form = push_deposit("100");
    form.phone = PhoneInput::manual("12345");
    assert_eq!(workflow.submit_deposit(&form).await, None);
    assert_eq!(
        workflow.view().await.error.as_deref(),
        Some("Please enter a valid phone number")
    );
    assert_eq!(api.deposit_calls(), 0);
}

#[tokio::test]
async fn test_oversized_deposit_lands_in_view() {
    let api = backend(dec!(1000));
    let workflow = mount(&api, closing()).await;

    let outcome = workflow
        .submit_deposit(&push_deposit("79228162514264337593543950335"))
        .await;

    assert_eq!(outcome, None);
    let view = workflow.view().await;
    assert_eq!(view.error.as_deref(), Some("Amount is too large"));
    assert!(!view.processing);
    assert_eq!(api.deposit_calls(), 0);
}

#[tokio::test]
async fn test_processor_not_ready_blocks_push() {
    let api = backend(dec!(1000));
    let workflow = mount(&api, Some(Arc::new(ScriptedCheckout::not_ready()))).await;

    assert_eq!(workflow.submit_deposit(&push_deposit("100")).await, None);
    let error = workflow.view().await.error.unwrap();
    assert!(error.contains("not ready"));
    assert_eq!(api.deposit_calls(), 0);

    // paybill does not depend on the processor
    assert!(workflow.submit_deposit(&paybill_deposit("100")).await.is_some());
    assert_eq!(workflow.view().await.error, None);
}

#[tokio::test]
async fn test_remote_error_uses_api_message() {
    let api = backend(dec!(1000)).reject_with("Deposits are paused for this pool");
    let workflow = mount(&api, closing()).await;

    assert_eq!(workflow.submit_deposit(&push_deposit("100")).await, None);
    let view = workflow.view().await;
    assert_eq!(view.error.as_deref(), Some("Deposits are paused for this pool"));
    assert!(!view.processing);
}

#[tokio::test]
async fn test_withdrawal_bounded_by_balance() {
    let api = backend(dec!(500));
    let workflow = mount(&api, None).await;
    let mut form = WithdrawalForm {
        amount: "500.01".to_string(),
        destination_type: DestinationType::Mobile,
        phone: PhoneInput::profile("0715234234"),
        ..Default::default()
    };

    assert_eq!(workflow.submit_withdrawal(&form).await, None);
    assert_eq!(
        workflow.view().await.error.as_deref(),
        Some("Amount cannot exceed balance of 500")
    );
    assert_eq!(api.withdrawal_calls(), 0);

    form.amount = "500".to_string();
    match workflow.submit_withdrawal(&form).await {
        Some(PaymentOutcome::WithdrawalPending {
            destination,
            transaction_id,
            ..
        }) => {
            assert_eq!(
                destination,
                WithdrawalDestination::Mobile {
                    phone: "0715234234".to_string()
                }
            );
            assert!(!transaction_id.is_empty());
        }
        other => panic!("expected pending withdrawal, got {other:?}"),
    }
    assert_eq!(api.withdrawal_calls(), 1);
    assert!(!workflow.is_polling().await);
}

#[tokio::test(start_paused = true)]
async fn test_upgrade_confirmed_by_tier() {
    let api = backend(dec!(0))
        .settle_after(2)
        .with_upgrade_price(Amount::new(dec!(750)).unwrap());
    let workflow = mount(&api, closing()).await;

    let outcome = workflow.submit_upgrade(Some("0715234234")).await;
    match outcome {
        Some(PaymentOutcome::UpgradeInitiated { amount, .. }) => {
            assert_eq!(amount, Amount::new(dec!(750)).unwrap());
        }
        other => panic!("expected upgrade, got {other:?}"),
    }

    match workflow.settle().await {
        Some(PollOutcome::Confirmed { resource, attempts }) => {
            assert_eq!(attempts, 2);
            assert_eq!(resource.tier, PoolTier::Premium);
        }
        other => panic!("expected confirmation, got {other:?}"),
    }
    assert_eq!(api.upgrade_calls(), 1);
}

#[tokio::test]
async fn test_dismiss_clears_outcome_and_error() {
    let api = backend(dec!(1000));
    let workflow = mount(&api, closing()).await;

    workflow.submit_deposit(&paybill_deposit("100")).await;
    assert!(workflow.view().await.outcome.is_some());

    workflow.dismiss().await;
    let view = workflow.view().await;
    assert_eq!(view.outcome, None);
    assert_eq!(view.error, None);
    assert!(view.pool.is_some());
}

#[tokio::test]
async fn test_ports_as_shared_trait_objects() {
    let api = backend(dec!(1000));
    let shared: PoolApiRef = Arc::new(api.clone());

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let shared = shared.clone();
            tokio::spawn(async move { shared.fetch_pool(POOL_ID).await.unwrap() })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap().balance, Balance::new(dec!(1000)));
    }
    assert_eq!(api.fetch_calls(), 4);
}

#[tokio::test]
async fn test_refresh_returns_latest_pool() {
    let api = backend(dec!(1000)).settle_after(1);
    let workflow = mount(&api, closing()).await;
    assert_eq!(workflow.pool_id(), POOL_ID);

    workflow.submit_deposit(&push_deposit("100")).await;
    workflow.settle().await;

    let pool = workflow.refresh().await.unwrap();
    assert_eq!(pool.balance, Balance::new(dec!(1100)));
    assert_eq!(workflow.view().await.pool, Some(pool));
}

/// Backend whose next pool fetch answers with a canned snapshot, but only
/// after the test releases it.
struct HeldFetchApi {
    inner: InMemoryPoolApi,
    held: Mutex<Option<Pool>>,
    entered: Notify,
    release: Notify,
}

impl HeldFetchApi {
    fn new(inner: InMemoryPoolApi) -> Self {
        Self {
            inner,
            held: Mutex::new(None),
            entered: Notify::new(),
            release: Notify::new(),
        }
    }

    async fn hold_next_fetch(&self, snapshot: Pool) {
        *self.held.lock().await = Some(snapshot);
    }
}

#[async_trait]
impl PoolApi for HeldFetchApi {
    async fn initiate_deposit(
        &self,
        pool_id: &str,
        body: &DepositBody,
    ) -> Result<TransactionReceipt> {
        self.inner.initiate_deposit(pool_id, body).await
    }

    async fn initiate_withdrawal(
        &self,
        pool_id: &str,
        body: &WithdrawalBody,
    ) -> Result<TransactionReceipt> {
        self.inner.initiate_withdrawal(pool_id, body).await
    }

    async fn request_upgrade(&self, pool_id: &str, body: &UpgradeBody) -> Result<UpgradeQuote> {
        self.inner.request_upgrade(pool_id, body).await
    }

    async fn fetch_pool(&self, pool_id: &str) -> Result<Pool> {
        let held = self.held.lock().await.take();
        match held {
            Some(snapshot) => {
                self.entered.notify_one();
                self.release.notified().await;
                Ok(snapshot)
            }
            None => self.inner.fetch_pool(pool_id).await,
        }
    }

    async fn list_transactions(&self, pool_id: &str) -> Result<Vec<TransactionRecord>> {
        self.inner.list_transactions(pool_id).await
    }
}

#[tokio::test(start_paused = true)]
async fn test_late_fetch_of_superseded_payment_is_discarded() {
    let api = Arc::new(HeldFetchApi::new(backend(dec!(1000))));
    let checkout = ScriptedCheckout::sequence(vec![
        vec![CheckoutEvent::Succeeded {
            reference: "tx_1".to_string(),
        }],
        vec![CheckoutEvent::Closed],
    ]);
    let workflow = PaymentWorkflow::mount(
        POOL_ID,
        api.clone(),
        Some(Arc::new(checkout)),
        workflow_config(),
    )
    .await
    .unwrap();

    // the first payment's success refresh would report it as landed
    let mut landed = Pool::new(POOL_ID, Balance::new(dec!(1100)));
    landed.name = "stale".to_string();
    api.hold_next_fetch(landed).await;

    workflow.submit_deposit(&push_deposit("100")).await;
    api.entered.notified().await;

    workflow.submit_deposit(&push_deposit("200")).await;
    api.release.notify_one();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let view = workflow.view().await;
    assert!(view.processing);
    let pool = view.pool.unwrap();
    assert_eq!(pool.balance, Balance::new(dec!(1000)));
    assert_ne!(pool.name, "stale");

    let settled = workflow.settle().await;
    assert!(matches!(settled, Some(PollOutcome::Exhausted { .. })));
    let view = workflow.view().await;
    assert!(!view.processing);
    assert_eq!(view.pool.unwrap().balance, Balance::new(dec!(1000)));
}

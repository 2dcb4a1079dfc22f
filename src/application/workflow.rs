use super::dispatcher::{CheckoutSettings, DepositDispatch, PaymentDispatcher, PushDispatch};
use super::form::{DepositForm, WithdrawalForm};
use super::poller::{ConfirmationPoller, PollConfig, PollOutcome, PollSession};
use super::presenter::PaymentOutcome;
use crate::domain::money::{Balance, MINIMUM_AMOUNT};
use crate::domain::pool::{Confirmation, Pool, PoolTier};
use crate::domain::ports::{CheckoutEvent, CheckoutProviderRef, PoolApiRef};
use crate::error::{PaymentError, Result, ValidationError};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, RwLock, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowConfig {
    pub minimum_amount: Decimal,
    pub poll: PollConfig,
    pub checkout: CheckoutSettings,
}

impl WorkflowConfig {
    pub fn new(checkout: CheckoutSettings) -> Self {
        Self {
            minimum_amount: MINIMUM_AMOUNT,
            poll: PollConfig::default(),
            checkout,
        }
    }
}

/// What the payment view shows right now.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    pub pool: Option<Pool>,
    /// A push payment is waiting for confirmation.
    pub processing: bool,
    pub error: Option<String>,
    pub outcome: Option<PaymentOutcome>,
}

#[derive(Default)]
struct Tasks {
    checkout: Option<PollSession<()>>,
    poll: Option<PollSession<PollOutcome<Pool>>>,
}

struct Inner {
    pool_id: String,
    api: PoolApiRef,
    dispatcher: PaymentDispatcher,
    poller: ConfirmationPoller,
    minimum_amount: Decimal,
    view: RwLock<ViewState>,
    /// Bumped on every push initiation; results tagged with an older value are dropped.
    generation: AtomicU64,
    tasks: Mutex<Tasks>,
    root: CancellationToken,
}

/// Deposit, withdrawal, and upgrade flow for a single pool.
///
/// Plays the part of the view hosting the payment forms: it is mounted with an
/// initial pool fetch, keeps at most one confirmation poll alive, and stops
/// every background task when dropped. Submissions never return errors; they
/// land in [`ViewState::error`] instead.
pub struct PaymentWorkflow {
    inner: Arc<Inner>,
}

impl PaymentWorkflow {
    /// Fetches the pool and builds the workflow around it.
    pub async fn mount(
        pool_id: impl Into<String>,
        api: PoolApiRef,
        checkout: Option<CheckoutProviderRef>,
        config: WorkflowConfig,
    ) -> Result<Self> {
        let pool_id = pool_id.into();
        let pool = api.fetch_pool(&pool_id).await?;
        info!(pool_id = %pool_id, balance = %pool.balance, "Payment view mounted");

        let inner = Inner {
            dispatcher: PaymentDispatcher::new(api.clone(), checkout, config.checkout),
            poller: ConfirmationPoller::new(config.poll),
            minimum_amount: config.minimum_amount,
            view: RwLock::new(ViewState {
                pool: Some(pool),
                ..Default::default()
            }),
            generation: AtomicU64::new(0),
            tasks: Mutex::new(Tasks::default()),
            root: CancellationToken::new(),
            pool_id,
            api,
        };

        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    pub fn pool_id(&self) -> &str {
        &self.inner.pool_id
    }

    pub async fn view(&self) -> ViewState {
        self.inner.view.read().await.clone()
    }

    pub async fn is_polling(&self) -> bool {
        let tasks = self.inner.tasks.lock().await;
        tasks.poll.as_ref().is_some_and(|poll| !poll.is_finished())
    }

    pub async fn submit_deposit(&self, form: &DepositForm) -> Option<PaymentOutcome> {
        let result = self.inner.deposit(form).await;
        self.inner.finish(result).await
    }

    pub async fn submit_withdrawal(&self, form: &WithdrawalForm) -> Option<PaymentOutcome> {
        let result = self.inner.withdraw(form).await;
        self.inner.finish(result).await
    }

    /// Buys the premium tier for the pool; confirmation is the tier flipping.
    pub async fn submit_upgrade(&self, phone: Option<&str>) -> Option<PaymentOutcome> {
        let result = self.inner.upgrade(phone).await;
        self.inner.finish(result).await
    }

    pub async fn refresh(&self) -> Result<Pool> {
        let pool = self.inner.api.fetch_pool(&self.inner.pool_id).await?;
        self.inner.view.write().await.pool = Some(pool.clone());
        Ok(pool)
    }

    /// Waits until the open checkout sheet is gone and any poll it started has
    /// finished. `None` when no poll ran.
    pub async fn settle(&self) -> Option<PollOutcome<Pool>> {
        let checkout = self.inner.tasks.lock().await.checkout.take();
        if let Some(checkout) = checkout {
            checkout.join().await;
        }

        let poll = self.inner.tasks.lock().await.poll.take();
        match poll {
            Some(poll) => poll.join().await,
            None => None,
        }
    }

    /// Clears the shown outcome and any error.
    pub async fn dismiss(&self) {
        let mut view = self.inner.view.write().await;
        view.outcome = None;
        view.error = None;
    }
}

impl Drop for PaymentWorkflow {
    fn drop(&mut self) {
        self.inner.root.cancel();
    }
}

impl Inner {
    async fn deposit(self: &Arc<Self>, form: &DepositForm) -> Result<PaymentOutcome> {
        let request = form.validate(self.minimum_amount)?;
        let confirmation = Confirmation::deposit(self.current_balance().await?, request.amount())?;

        match self.dispatcher.deposit(&self.pool_id, request).await? {
            DepositDispatch::Manual(instructions) => {
                Ok(PaymentOutcome::ManualInstructions(instructions))
            }
            DepositDispatch::Push(push) => {
                let outcome = PaymentOutcome::PushInitiated {
                    amount: push.amount,
                    phone: push.phone.clone(),
                    reference: push.attempt.reference.clone(),
                };
                self.track(push, confirmation).await;
                Ok(outcome)
            }
        }
    }

    async fn withdraw(&self, form: &WithdrawalForm) -> Result<PaymentOutcome> {
        let request = form.validate(self.minimum_amount, self.current_balance().await?)?;
        let amount = request.amount;
        let destination = request.destination.clone();

        let attempt = self.dispatcher.withdraw(&self.pool_id, request).await?;
        Ok(PaymentOutcome::WithdrawalPending {
            amount,
            destination,
            transaction_id: attempt.reference,
        })
    }

    async fn upgrade(self: &Arc<Self>, phone: Option<&str>) -> Result<PaymentOutcome> {
        let push = self.dispatcher.upgrade(&self.pool_id, phone).await?;
        let outcome = PaymentOutcome::UpgradeInitiated {
            amount: push.amount,
            reference: push.attempt.reference.clone(),
        };
        self.track(push, Confirmation::Tier(PoolTier::Premium)).await;
        Ok(outcome)
    }

    async fn current_balance(&self) -> Result<Balance> {
        self.view
            .read()
            .await
            .pool
            .as_ref()
            .map(|pool| pool.balance)
            .ok_or_else(|| ValidationError::PoolNotLoaded.into())
    }

    async fn finish(&self, result: Result<PaymentOutcome>) -> Option<PaymentOutcome> {
        let mut view = self.view.write().await;
        match result {
            Ok(outcome) => {
                view.error = None;
                view.outcome = Some(outcome.clone());
                Some(outcome)
            }
            Err(e) => {
                match &e {
                    PaymentError::Validation(reason) => debug!(%reason, "Submission rejected"),
                    other => warn!(error = %other, "Submission failed"),
                }
                view.error = Some(e.user_message());
                None
            }
        }
    }

    /// Supersedes whatever was in flight and starts watching the new sheet.
    async fn track(self: &Arc<Self>, push: PushDispatch, confirmation: Confirmation) {
        let mut tasks = self.tasks.lock().await;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tasks.poll = None;
        tasks.checkout = None;
        self.view.write().await.processing = true;

        let inner = Arc::clone(self);
        let events = push.events;
        tasks.checkout = Some(PollSession::spawn(&self.root, move |token| {
            inner.watch_checkout(generation, events, confirmation, token)
        }));
    }

    async fn watch_checkout(
        self: Arc<Self>,
        generation: u64,
        mut events: mpsc::Receiver<CheckoutEvent>,
        confirmation: Confirmation,
        token: CancellationToken,
    ) {
        let mut polling = false;
        loop {
            let event = tokio::select! {
                biased;
                _ = token.cancelled() => return,
                event = events.recv() => event,
            };

            match event {
                Some(CheckoutEvent::Closed) => {
                    info!(pool_id = %self.pool_id, "Checkout closed, polling for confirmation");
                    self.start_poll(generation, confirmation).await;
                    polling = true;
                }
                Some(CheckoutEvent::Succeeded { reference }) => {
                    info!(pool_id = %self.pool_id, %reference, "Checkout reported success");
                    match self.api.fetch_pool(&self.pool_id).await {
                        Ok(pool) => self.apply_refresh(generation, pool, confirmation).await,
                        Err(e) => warn!(error = %e, "Refresh after checkout success failed"),
                    }
                }
                None => break,
            }
        }

        if !polling {
            self.clear_processing(generation).await;
        }
    }

    async fn start_poll(self: &Arc<Self>, generation: u64, confirmation: Confirmation) {
        let mut tasks = self.tasks.lock().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            return;
        }

        let inner = Arc::clone(self);
        tasks.poll = Some(PollSession::spawn(&self.root, move |token| async move {
            let api = inner.api.clone();
            let pool_id = inner.pool_id.clone();
            let fetch = move || {
                let api = api.clone();
                let pool_id = pool_id.clone();
                async move { api.fetch_pool(&pool_id).await }
            };

            let outcome = inner
                .poller
                .run(fetch, |pool| confirmation.is_met(pool), &token)
                .await;
            inner.apply_poll(generation, &outcome).await;
            outcome
        }));
    }

    async fn apply_poll(&self, generation: u64, outcome: &PollOutcome<Pool>) {
        let mut view = self.view.write().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(generation, "Discarding poll result of superseded payment");
            return;
        }

        match outcome {
            PollOutcome::Confirmed { resource, .. } => {
                view.pool = Some(resource.clone());
                view.processing = false;
            }
            PollOutcome::Exhausted { reconciled, .. } => {
                if let Some(pool) = reconciled {
                    view.pool = Some(pool.clone());
                }
                view.processing = false;
            }
            PollOutcome::Cancelled => {}
        }
    }

    async fn apply_refresh(&self, generation: u64, pool: Pool, confirmation: Confirmation) {
        let mut view = self.view.write().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            return;
        }
        if confirmation.is_met(&pool) {
            view.processing = false;
        }
        view.pool = Some(pool);
    }

    async fn clear_processing(&self, generation: u64) {
        let mut view = self.view.write().await;
        if self.generation.load(Ordering::SeqCst) == generation {
            view.processing = false;
        }
    }
}

use crate::domain::money::Amount;
use crate::domain::payment::{
    DepositBody, DepositRequest, ManualInstructions, PaymentAttempt, PaymentMethod,
    UpgradeBody, WithdrawalBody, WithdrawalDestination, WithdrawalRequest,
};
use crate::domain::phone::NormalizedPhone;
use crate::domain::ports::{
    CheckoutEvent, CheckoutProviderRef, CheckoutSession, PoolApiRef,
};
use crate::error::{PaymentError, Result, ValidationError};
use tokio::sync::mpsc;
use tracing::info;

const DEFAULT_DEPOSIT_DESCRIPTION: &str = "Pool deposit";

/// Settings for the hosted checkout sheet and the paybill fallback.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutSettings {
    pub public_key: String,
    pub currency: String,
    pub payer_email: String,
    /// Merchant code shown for manual paybill payments.
    pub merchant_paybill: String,
}

/// A push payment whose sheet is open.
#[derive(Debug)]
pub struct PushDispatch {
    pub attempt: PaymentAttempt,
    pub amount: Amount,
    pub phone: Option<NormalizedPhone>,
    pub events: mpsc::Receiver<CheckoutEvent>,
}

#[derive(Debug)]
pub enum DepositDispatch {
    Manual(ManualInstructions),
    Push(PushDispatch),
}

/// Turns validated requests into backend calls.
///
/// Manual paybill deposits never reach the backend. Push payments need a
/// ready checkout provider before anything is sent.
pub struct PaymentDispatcher {
    api: PoolApiRef,
    checkout: Option<CheckoutProviderRef>,
    settings: CheckoutSettings,
}

impl PaymentDispatcher {
    pub fn new(
        api: PoolApiRef,
        checkout: Option<CheckoutProviderRef>,
        settings: CheckoutSettings,
    ) -> Self {
        Self {
            api,
            checkout,
            settings,
        }
    }

    pub async fn deposit(&self, pool_id: &str, request: DepositRequest) -> Result<DepositDispatch> {
        match request {
            DepositRequest::ManualReference { amount, .. } => {
                info!(pool_id, %amount, "Issuing paybill instructions");
                Ok(DepositDispatch::Manual(ManualInstructions {
                    paybill_number: self.settings.merchant_paybill.clone(),
                    account_reference: pool_id.to_string(),
                    amount,
                }))
            }
            DepositRequest::InstantPush {
                amount,
                phone,
                note,
            } => {
                let phone = NormalizedPhone::parse(&phone)?;
                let checkout = self.ready_checkout()?;

                let body = DepositBody {
                    amount,
                    phone: phone.clone(),
                    description: note.unwrap_or_else(|| DEFAULT_DEPOSIT_DESCRIPTION.to_string()),
                    payment_method: PaymentMethod::InstantPush,
                };
                let receipt = self.api.initiate_deposit(pool_id, &body).await?;
                info!(pool_id, reference = %receipt.transaction_id, "Deposit initiated");

                let events = checkout
                    .open(self.session(amount, &receipt.transaction_id)?)
                    .await?;

                Ok(DepositDispatch::Push(PushDispatch {
                    attempt: PaymentAttempt::pending(receipt.transaction_id),
                    amount,
                    phone: Some(phone),
                    events,
                }))
            }
        }
    }

    /// Single-shot withdrawal: one call, the returned id is reported as pending.
    pub async fn withdraw(&self, pool_id: &str, request: WithdrawalRequest) -> Result<PaymentAttempt> {
        let (phone, target, account_number) = match &request.destination {
            WithdrawalDestination::Mobile { phone } => {
                (Some(NormalizedPhone::parse(phone)?), None, None)
            }
            WithdrawalDestination::Till { till_number } => (None, Some(till_number.clone()), None),
            WithdrawalDestination::Paybill {
                paybill_number,
                account_number,
            } => (
                None,
                Some(paybill_number.clone()),
                Some(account_number.clone()),
            ),
        };

        let body = WithdrawalBody {
            amount: request.amount,
            phone,
            destination_type: request.destination.kind(),
            target,
            account_number,
            notes: request.note,
        };
        let receipt = self.api.initiate_withdrawal(pool_id, &body).await?;
        info!(pool_id, reference = %receipt.transaction_id, "Withdrawal initiated");

        Ok(PaymentAttempt::pending(receipt.transaction_id))
    }

    /// Starts the premium upgrade purchase; the backend quotes the price.
    pub async fn upgrade(&self, pool_id: &str, phone: Option<&str>) -> Result<PushDispatch> {
        let phone = phone.map(NormalizedPhone::parse).transpose()?;
        let checkout = self.ready_checkout()?;

        let body = UpgradeBody {
            email: self.settings.payer_email.clone(),
            phone: phone.clone(),
        };
        let quote = self.api.request_upgrade(pool_id, &body).await?;
        info!(pool_id, reference = %quote.reference, "Upgrade initiated");

        let events = checkout
            .open(self.session(quote.amount, &quote.reference)?)
            .await?;

        Ok(PushDispatch {
            attempt: PaymentAttempt::pending(quote.reference),
            amount: quote.amount,
            phone,
            events,
        })
    }

    fn ready_checkout(&self) -> Result<&CheckoutProviderRef> {
        self.checkout
            .as_ref()
            .filter(|checkout| checkout.is_ready())
            .ok_or(PaymentError::ProcessorNotReady)
    }

    fn session(&self, amount: Amount, reference: &str) -> Result<CheckoutSession> {
        let amount_minor = amount
            .to_minor_units()
            .ok_or(ValidationError::AmountTooLarge)?;

        Ok(CheckoutSession {
            public_key: self.settings.public_key.clone(),
            email: self.settings.payer_email.clone(),
            amount,
            amount_minor,
            currency: self.settings.currency.clone(),
            reference: reference.to_string(),
        })
    }
}

#![allow(dead_code)]

use poolpay::application::dispatcher::CheckoutSettings;
use poolpay::application::form::{DepositForm, PhoneInput};
use poolpay::application::workflow::{PaymentWorkflow, WorkflowConfig};
use poolpay::domain::money::Balance;
use poolpay::domain::payment::PaymentMethod;
use poolpay::domain::pool::Pool;
use poolpay::domain::ports::CheckoutProviderRef;
use poolpay::infrastructure::in_memory::InMemoryPoolApi;
use rust_decimal::Decimal;
use std::sync::Arc;

pub const POOL_ID: &str = "pool-1";

pub fn workflow_config() -> WorkflowConfig {
    WorkflowConfig::new(CheckoutSettings {
        public_key: "pk_test_123".to_string(),
        currency: "KES".to_string(),
        payer_email: "treasurer@example.com".to_string(),
        merchant_paybill: "174379".to_string(),
    })
}

pub fn backend(balance: Decimal) -> InMemoryPoolApi {
    InMemoryPoolApi::new().with_pool(Pool::new(POOL_ID, Balance::new(balance)))
}

pub async fn mount(
    api: &InMemoryPoolApi,
    checkout: Option<CheckoutProviderRef>,
) -> PaymentWorkflow {
    PaymentWorkflow::mount(POOL_ID, Arc::new(api.clone()), checkout, workflow_config())
        .await
        .expect("pool should load")
}

pub fn push_deposit(amount: &str) -> DepositForm {
    DepositForm {
        amount: amount.to_string(),
        method: PaymentMethod::InstantPush,
        phone: PhoneInput::manual("0715 234 234"),
        note: String::new(),
    }
}

pub fn paybill_deposit(amount: &str) -> DepositForm {
    DepositForm {
        amount: amount.to_string(),
        method: PaymentMethod::ManualReference,
        ..Default::default()
    }
}

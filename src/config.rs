use crate::application::dispatcher::CheckoutSettings;
use crate::application::poller::PollConfig;
use crate::application::workflow::WorkflowConfig;
use crate::domain::money::MINIMUM_AMOUNT;
use crate::error::{PaymentError, Result};
use rust_decimal::Decimal;
use secrecy::SecretString;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_url: String,
    pub api_token: Option<SecretString>,
    /// Public key of the hosted checkout. Empty means the processor is not ready.
    pub checkout_public_key: String,
    pub currency: String,
    pub merchant_paybill: String,
    pub payer_email: String,
    pub minimum_amount: Decimal,
    pub poll: PollConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        let defaults = PollConfig::default();
        let interval_ms: u64 = positive(
            "POOLPAY_POLL_INTERVAL_MS",
            &var(
                "POOLPAY_POLL_INTERVAL_MS",
                &defaults.interval.as_millis().to_string(),
            ),
        )?;
        let max_attempts: u32 = positive(
            "POOLPAY_POLL_MAX_ATTEMPTS",
            &var(
                "POOLPAY_POLL_MAX_ATTEMPTS",
                &defaults.max_attempts.to_string(),
            ),
        )?;

        Ok(Self {
            api_url: var("POOLPAY_API_URL", "http://localhost:8080"),
            api_token: lookup("POOLPAY_API_TOKEN")
                .filter(|token| !token.is_empty())
                .map(SecretString::from),
            checkout_public_key: var("PAYSTACK_PUBLIC_KEY", ""),
            currency: var("POOLPAY_CURRENCY", "KES"),
            merchant_paybill: var("POOLPAY_MERCHANT_PAYBILL", "174379"),
            payer_email: var("POOLPAY_PAYER_EMAIL", ""),
            minimum_amount: parse(
                "POOLPAY_MIN_AMOUNT",
                &var("POOLPAY_MIN_AMOUNT", &MINIMUM_AMOUNT.to_string()),
            )?,
            poll: PollConfig {
                interval: Duration::from_millis(interval_ms),
                max_attempts,
            },
        })
    }

    pub fn workflow(&self) -> WorkflowConfig {
        WorkflowConfig {
            minimum_amount: self.minimum_amount,
            poll: self.poll,
            checkout: CheckoutSettings {
                public_key: self.checkout_public_key.clone(),
                currency: self.currency.clone(),
                payer_email: self.payer_email.clone(),
                merchant_paybill: self.merchant_paybill.clone(),
            },
        }
    }
}

fn parse<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| PaymentError::Config(format!("{key} has an invalid value: {raw}")))
}

fn positive<T: FromStr + Default + PartialOrd>(key: &str, raw: &str) -> Result<T> {
    let value: T = parse(key, raw)?;
    if value > T::default() {
        Ok(value)
    } else {
        Err(PaymentError::Config(format!("{key} must be greater than zero")))
    }
}

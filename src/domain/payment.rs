use super::money::Amount;
use super::phone::NormalizedPhone;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
pub enum PaymentMethod {
    /// Phone prompt pushed by the provider; confirmation arrives later.
    #[default]
    #[serde(rename = "mpesa")]
    InstantPush,
    /// User pays through the paybill menu with a merchant code and reference.
    #[serde(rename = "paybill")]
    ManualReference,
}

/// A validated deposit, one variant per payment method.
#[derive(Debug, Clone, PartialEq)]
pub enum DepositRequest {
    InstantPush {
        amount: Amount,
        /// Raw phone as entered; normalized at dispatch.
        phone: String,
        note: Option<String>,
    },
    ManualReference {
        amount: Amount,
        note: Option<String>,
    },
}

impl DepositRequest {
    pub fn amount(&self) -> Amount {
        match self {
            Self::InstantPush { amount, .. } | Self::ManualReference { amount, .. } => *amount,
        }
    }

    pub fn method(&self) -> PaymentMethod {
        match self {
            Self::InstantPush { .. } => PaymentMethod::InstantPush,
            Self::ManualReference { .. } => PaymentMethod::ManualReference,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum DestinationType {
    #[default]
    Mobile,
    Till,
    Paybill,
}

/// Where withdrawn funds go. Each variant carries only its own fields.
#[derive(Debug, Clone, PartialEq)]
pub enum WithdrawalDestination {
    Mobile {
        phone: String,
    },
    Till {
        till_number: String,
    },
    Paybill {
        paybill_number: String,
        account_number: String,
    },
}

impl WithdrawalDestination {
    pub fn kind(&self) -> DestinationType {
        match self {
            Self::Mobile { .. } => DestinationType::Mobile,
            Self::Till { .. } => DestinationType::Till,
            Self::Paybill { .. } => DestinationType::Paybill,
        }
    }
}

impl fmt::Display for WithdrawalDestination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mobile { phone } => write!(f, "M-Pesa {phone}"),
            Self::Till { till_number } => write!(f, "Till {till_number}"),
            Self::Paybill {
                paybill_number,
                account_number,
            } => write!(f, "Paybill {paybill_number}, account {account_number}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WithdrawalRequest {
    pub amount: Amount,
    pub destination: WithdrawalDestination,
    pub note: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Success,
    Failed,
}

/// A payment the backend accepted, tracked only for the current view.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentAttempt {
    pub reference: String,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

impl PaymentAttempt {
    pub fn pending(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            status: PaymentStatus::Pending,
            created_at: Utc::now(),
        }
    }
}

/// What the user needs to pay through the paybill menu themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct ManualInstructions {
    pub paybill_number: String,
    pub account_reference: String,
    pub amount: Amount,
}

/// Body of `POST /v1/transactions/pools/{poolId}/deposits`.
#[derive(Debug, Serialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DepositBody {
    pub amount: Amount,
    pub phone: NormalizedPhone,
    pub description: String,
    pub payment_method: PaymentMethod,
}

/// Body of `POST /v1/transactions/pools/{poolId}/withdrawals`.
#[derive(Debug, Serialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalBody {
    pub amount: Amount,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<NormalizedPhone>,
    #[serde(rename = "type")]
    pub destination_type: DestinationType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Body of `POST /v1/pools/{poolId}/upgrade`.
#[derive(Debug, Serialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeBody {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<NormalizedPhone>,
}

#[derive(Debug, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_id: String,
}

#[derive(Debug, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeQuote {
    pub reference: String,
    pub amount: Amount,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
    Upgrade,
}

/// One row of the pool transaction listing.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub amount: Amount,
    pub status: PaymentStatus,
    #[serde(default)]
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

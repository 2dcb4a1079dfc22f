use rust_decimal::Decimal;
use thiserror::Error;

/// Local form rejections. The `Display` text is what the user sees.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Amount is required")]
    AmountRequired,
    #[error("Please enter a valid amount")]
    InvalidAmount,
    #[error("Amount is too large")]
    AmountTooLarge,
    #[error("Minimum amount is {0}")]
    BelowMinimum(Decimal),
    #[error("Amount cannot exceed balance of {0}")]
    ExceedsBalance(Decimal),
    #[error("Phone number is required")]
    PhoneRequired,
    #[error("Please enter a valid phone number")]
    InvalidPhone,
    #[error("Till number is required")]
    TillNumberRequired,
    #[error("Paybill number is required")]
    PaybillNumberRequired,
    #[error("Account number is required")]
    AccountNumberRequired,
    #[error("Pool details have not loaded yet")]
    PoolNotLoaded,
}

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Payment processor not ready, please try again in a moment")]
    ProcessorNotReady,
    #[error("Request failed with status {status}: {message}")]
    Remote { status: u16, message: String },
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Invalid response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PaymentError {
    /// Message safe to show in the UI. Remote messages pass through as-is,
    /// transport and decoding failures collapse to a generic line.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(e) => e.to_string(),
            Self::ProcessorNotReady => self.to_string(),
            Self::Remote { message, .. } if !message.trim().is_empty() => message.clone(),
            Self::Remote { status, .. } => format!("Request failed with status {status}"),
            Self::Http(_) => "Could not reach the payments service, please try again".to_string(),
            Self::Decode(_) => "Unexpected response from the payments service".to_string(),
            Self::Csv(_) | Self::Io(_) | Self::Config(_) => {
                "Something went wrong, please try again".to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, PaymentError>;

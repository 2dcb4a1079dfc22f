use crate::domain::money::{Amount, Balance};
use crate::domain::payment::{
    DepositRequest, DestinationType, PaymentMethod, WithdrawalDestination, WithdrawalRequest,
};
use crate::error::ValidationError;
use rust_decimal::Decimal;

/// Which phone number the user picked with the source toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PhoneSource {
    #[default]
    Profile,
    Manual,
}

/// Phone input shared by the deposit and withdrawal forms.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhoneInput {
    pub source: PhoneSource,
    pub profile_phone: Option<String>,
    pub manual_phone: String,
}

impl PhoneInput {
    pub fn manual(phone: impl Into<String>) -> Self {
        Self {
            source: PhoneSource::Manual,
            profile_phone: None,
            manual_phone: phone.into(),
        }
    }

    pub fn profile(phone: impl Into<String>) -> Self {
        Self {
            source: PhoneSource::Profile,
            profile_phone: Some(phone.into()),
            manual_phone: String::new(),
        }
    }

    /// The number the toggle currently points at, if it is non-empty.
    pub fn resolve(&self) -> Option<String> {
        let candidate = match self.source {
            PhoneSource::Profile => self.profile_phone.as_deref().unwrap_or_default(),
            PhoneSource::Manual => self.manual_phone.as_str(),
        };
        let candidate = candidate.trim();
        (!candidate.is_empty()).then(|| candidate.to_string())
    }
}

/// Raw deposit form fields, exactly as typed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DepositForm {
    pub amount: String,
    pub method: PaymentMethod,
    pub phone: PhoneInput,
    pub note: String,
}

impl DepositForm {
    /// Checks the fields in order and stops at the first failure.
    pub fn validate(&self, minimum: Decimal) -> Result<DepositRequest, ValidationError> {
        let amount = Amount::parse(&self.amount, minimum)?;
        let note = non_empty(&self.note);

        match self.method {
            PaymentMethod::InstantPush => {
                let phone = self.phone.resolve().ok_or(ValidationError::PhoneRequired)?;
                Ok(DepositRequest::InstantPush {
                    amount,
                    phone,
                    note,
                })
            }
            PaymentMethod::ManualReference => Ok(DepositRequest::ManualReference { amount, note }),
        }
    }
}

/// Raw withdrawal form fields, exactly as typed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WithdrawalForm {
    pub amount: String,
    pub destination_type: DestinationType,
    pub phone: PhoneInput,
    /// Till or paybill number, depending on `destination_type`.
    pub destination_target: String,
    pub account_number: String,
    pub note: String,
}

impl WithdrawalForm {
    /// Checks the fields in order against the balance the view currently shows.
    pub fn validate(
        &self,
        minimum: Decimal,
        available: Balance,
    ) -> Result<WithdrawalRequest, ValidationError> {
        let amount = Amount::parse(&self.amount, minimum)?;
        if Balance::from(amount) > available {
            return Err(ValidationError::ExceedsBalance(available.value()));
        }

        let destination = match self.destination_type {
            DestinationType::Mobile => WithdrawalDestination::Mobile {
                phone: self.phone.resolve().ok_or(ValidationError::PhoneRequired)?,
            },
            DestinationType::Till => WithdrawalDestination::Till {
                till_number: non_empty(&self.destination_target)
                    .ok_or(ValidationError::TillNumberRequired)?,
            },
            DestinationType::Paybill => WithdrawalDestination::Paybill {
                paybill_number: non_empty(&self.destination_target)
                    .ok_or(ValidationError::PaybillNumberRequired)?,
                account_number: non_empty(&self.account_number)
                    .ok_or(ValidationError::AccountNumberRequired)?,
            },
        };

        Ok(WithdrawalRequest {
            amount,
            destination,
            note: non_empty(&self.note),
        })
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

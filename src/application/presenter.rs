use crate::domain::money::Amount;
use crate::domain::payment::{ManualInstructions, WithdrawalDestination};
use crate::domain::phone::NormalizedPhone;
use std::fmt;

/// Terminal result of a submission, ready to be shown.
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentOutcome {
    PushInitiated {
        amount: Amount,
        phone: Option<NormalizedPhone>,
        reference: String,
    },
    ManualInstructions(ManualInstructions),
    WithdrawalPending {
        amount: Amount,
        destination: WithdrawalDestination,
        transaction_id: String,
    },
    UpgradeInitiated {
        amount: Amount,
        reference: String,
    },
}

/// Renders a [`PaymentOutcome`] for display. Pure, no I/O.
pub struct Receipt<'a> {
    outcome: &'a PaymentOutcome,
    currency: &'a str,
}

impl<'a> Receipt<'a> {
    pub fn new(outcome: &'a PaymentOutcome, currency: &'a str) -> Self {
        Self { outcome, currency }
    }
}

impl fmt::Display for Receipt<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let currency = self.currency;
        match self.outcome {
            PaymentOutcome::PushInitiated {
                amount,
                phone,
                reference,
            } => {
                writeln!(f, "Deposit of {currency} {amount} initiated")?;
                writeln!(f, "Reference: {reference}")?;
                match phone {
                    Some(phone) => write!(
                        f,
                        "Check your phone ({phone}) and enter your M-Pesa PIN to complete the payment."
                    ),
                    None => write!(f, "Check your phone to complete the payment."),
                }
            }
            PaymentOutcome::ManualInstructions(instructions) => {
                writeln!(f, "Pay {currency} {} via M-Pesa Paybill", instructions.amount)?;
                writeln!(f, "Paybill number: {}", instructions.paybill_number)?;
                writeln!(f, "Account number: {}", instructions.account_reference)?;
                writeln!(f, "1. Go to the M-Pesa menu on your phone")?;
                writeln!(f, "2. Select Lipa na M-Pesa, then Pay Bill")?;
                writeln!(f, "3. Enter business number {}", instructions.paybill_number)?;
                writeln!(f, "4. Enter account number {}", instructions.account_reference)?;
                writeln!(f, "5. Enter amount {}", instructions.amount)?;
                write!(f, "6. Enter your M-Pesa PIN and confirm")
            }
            PaymentOutcome::WithdrawalPending {
                amount,
                destination,
                transaction_id,
            } => {
                writeln!(f, "Withdrawal of {currency} {amount} to {destination} is pending")?;
                write!(f, "Transaction ID: {transaction_id}")
            }
            PaymentOutcome::UpgradeInitiated { amount, reference } => {
                writeln!(f, "Upgrade payment of {currency} {amount} initiated")?;
                writeln!(f, "Reference: {reference}")?;
                write!(f, "Check your phone to complete the payment.")
            }
        }
    }
}

use clap::{Args, Parser, Subcommand, ValueEnum};
use miette::{IntoDiagnostic, Result, miette};
use poolpay::application::form::{DepositForm, PhoneInput, PhoneSource, WithdrawalForm};
use poolpay::application::poller::PollOutcome;
use poolpay::application::presenter::{PaymentOutcome, Receipt};
use poolpay::application::workflow::PaymentWorkflow;
use poolpay::config::AppConfig;
use poolpay::domain::payment::{DestinationType, PaymentMethod};
use poolpay::domain::phone::NormalizedPhone;
use poolpay::domain::ports::{CheckoutProviderRef, PoolApiRef};
use poolpay::infrastructure::console::ConsoleCheckout;
use poolpay::infrastructure::http::HttpPoolApi;
use poolpay::interfaces::csv::transaction_writer::TransactionWriter;
use poolpay::logging::setup_logging;
use std::io;
use std::sync::Arc;

#[derive(Parser)]
#[command(author, version, about = "Move money in and out of savings pools", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print a phone number in the format the payments API expects
    NormalizePhone { phone: String },
    /// Deposit into a pool by M-Pesa push or paybill
    Deposit(DepositArgs),
    /// Withdraw from a pool to a phone, till, or paybill
    Withdraw(WithdrawArgs),
    /// Buy the premium tier for a pool
    Upgrade {
        #[arg(long)]
        pool: String,
        #[arg(long)]
        phone: Option<String>,
    },
    /// List a pool's transactions as CSV
    Transactions {
        #[arg(long)]
        pool: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Method {
    Mpesa,
    Paybill,
}

#[derive(Clone, Copy, ValueEnum)]
enum Destination {
    Mobile,
    Till,
    Paybill,
}

#[derive(Args)]
struct PhoneArgs {
    /// Phone number to use for this payment
    #[arg(long, conflicts_with = "profile_phone")]
    phone: Option<String>,

    /// Phone number stored on the user's profile
    #[arg(long)]
    profile_phone: Option<String>,
}

impl PhoneArgs {
    fn input(&self) -> PhoneInput {
        PhoneInput {
            source: if self.phone.is_some() {
                PhoneSource::Manual
            } else {
                PhoneSource::Profile
            },
            profile_phone: self.profile_phone.clone(),
            manual_phone: self.phone.clone().unwrap_or_default(),
        }
    }
}

#[derive(Args)]
struct DepositArgs {
    #[arg(long)]
    pool: String,
    #[arg(long)]
    amount: String,
    #[arg(long, value_enum, default_value = "mpesa")]
    method: Method,
    #[command(flatten)]
    phone: PhoneArgs,
    #[arg(long, default_value = "")]
    note: String,
}

#[derive(Args)]
struct WithdrawArgs {
    #[arg(long)]
    pool: String,
    #[arg(long)]
    amount: String,
    #[arg(long, value_enum, default_value = "mobile")]
    destination: Destination,
    #[command(flatten)]
    phone: PhoneArgs,
    /// Till or paybill number
    #[arg(long, default_value = "")]
    target: String,
    #[arg(long, default_value = "")]
    account_number: String,
    #[arg(long, default_value = "")]
    note: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging();
    let cli = Cli::parse();

    if let Command::NormalizePhone { phone } = &cli.command {
        let phone = NormalizedPhone::parse(phone).map_err(|e| miette!("{e}"))?;
        println!("{phone}");
        return Ok(());
    }

    let config = AppConfig::from_env().into_diagnostic()?;
    let api: PoolApiRef = Arc::new(
        HttpPoolApi::new(
            reqwest::Client::new(),
            &config.api_url,
            config.api_token.clone(),
        )
        .into_diagnostic()?,
    );
    let checkout: CheckoutProviderRef =
        Arc::new(ConsoleCheckout::new(config.checkout_public_key.clone()));

    match cli.command {
        Command::NormalizePhone { .. } => Ok(()),
        Command::Deposit(args) => {
            let form = DepositForm {
                amount: args.amount,
                method: match args.method {
                    Method::Mpesa => PaymentMethod::InstantPush,
                    Method::Paybill => PaymentMethod::ManualReference,
                },
                phone: args.phone.input(),
                note: args.note,
            };
            let workflow = mount(&args.pool, api, checkout, &config).await?;
            let outcome = workflow.submit_deposit(&form).await;
            present(&workflow, outcome, &config).await
        }
        Command::Withdraw(args) => {
            let form = WithdrawalForm {
                amount: args.amount,
                destination_type: match args.destination {
                    Destination::Mobile => DestinationType::Mobile,
                    Destination::Till => DestinationType::Till,
                    Destination::Paybill => DestinationType::Paybill,
                },
                phone: args.phone.input(),
                destination_target: args.target,
                account_number: args.account_number,
                note: args.note,
            };
            let workflow = mount(&args.pool, api, checkout, &config).await?;
            let outcome = workflow.submit_withdrawal(&form).await;
            present(&workflow, outcome, &config).await
        }
        Command::Upgrade { pool, phone } => {
            let workflow = mount(&pool, api, checkout, &config).await?;
            let outcome = workflow.submit_upgrade(phone.as_deref()).await;
            present(&workflow, outcome, &config).await
        }
        Command::Transactions { pool } => {
            let records = api
                .list_transactions(&pool)
                .await
                .map_err(|e| miette!("{}", e.user_message()))?;
            let stdout = io::stdout();
            let mut writer = TransactionWriter::new(stdout.lock());
            writer.write_transactions(records).into_diagnostic()?;
            Ok(())
        }
    }
}

async fn mount(
    pool: &str,
    api: PoolApiRef,
    checkout: CheckoutProviderRef,
    config: &AppConfig,
) -> Result<PaymentWorkflow> {
    PaymentWorkflow::mount(pool, api, Some(checkout), config.workflow())
        .await
        .map_err(|e| miette!("{}", e.user_message()))
}

/// Prints the receipt, waits out any confirmation poll, and reports the result.
async fn present(
    workflow: &PaymentWorkflow,
    outcome: Option<PaymentOutcome>,
    config: &AppConfig,
) -> Result<()> {
    let Some(outcome) = outcome else {
        let error = workflow.view().await.error.unwrap_or_default();
        return Err(miette!("{error}"));
    };
    println!("{}", Receipt::new(&outcome, &config.currency));

    match workflow.settle().await {
        Some(PollOutcome::Confirmed { resource, .. }) => {
            println!(
                "Payment confirmed. Pool balance: {} {}",
                config.currency, resource.balance
            );
        }
        Some(PollOutcome::Exhausted { reconciled, .. }) => {
            println!("Payment not confirmed yet; it may still complete.");
            if let Some(pool) = reconciled {
                println!("Pool balance: {} {}", config.currency, pool.balance);
            }
        }
        Some(PollOutcome::Cancelled) | None => {}
    }

    workflow.dismiss().await;
    Ok(())
}

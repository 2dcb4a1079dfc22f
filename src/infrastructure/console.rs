use crate::domain::ports::{CheckoutEvent, CheckoutProvider, CheckoutSession};
use crate::error::Result;
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Terminal stand-in for the hosted payment sheet.
///
/// Prints the session to stderr and reports the sheet as closed once the user
/// presses Enter (or stdin ends). It never reports an explicit success, so
/// confirmation always goes through polling.
pub struct ConsoleCheckout {
    public_key: String,
}

impl ConsoleCheckout {
    pub fn new(public_key: impl Into<String>) -> Self {
        Self {
            public_key: public_key.into(),
        }
    }
}

#[async_trait]
impl CheckoutProvider for ConsoleCheckout {
    fn is_ready(&self) -> bool {
        !self.public_key.trim().is_empty()
    }

    async fn open(&self, session: CheckoutSession) -> Result<mpsc::Receiver<CheckoutEvent>> {
        eprintln!(
            "Complete the payment of {} {} on your phone (reference {}).",
            session.currency, session.amount, session.reference
        );
        eprintln!("Press Enter once you are done.");

        let (tx, rx) = mpsc::channel(1);
        tokio::spawn(wait_for_enter(tokio::io::stdin(), tx));
        Ok(rx)
    }
}

/// Reports the sheet closed once a line (or EOF, or a read error) arrives.
async fn wait_for_enter<R>(input: R, tx: mpsc::Sender<CheckoutEvent>)
where
    R: AsyncRead + Unpin,
{
    let mut line = String::new();
    if let Err(e) = BufReader::new(input).read_line(&mut line).await {
        warn!(error = %e, "Could not read checkout confirmation from stdin");
    }
    if tx.send(CheckoutEvent::Closed).await.is_err() {
        debug!("Checkout sheet closed after its watcher went away");
    }
}

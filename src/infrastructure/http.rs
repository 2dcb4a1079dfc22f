use crate::domain::payment::{
    DepositBody, TransactionReceipt, TransactionRecord, UpgradeBody, UpgradeQuote,
    WithdrawalBody,
};
use crate::domain::pool::Pool;
use crate::domain::ports::PoolApi;
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TransactionList {
    transactions: Vec<TransactionRecord>,
}

/// `reqwest` client for the pools backend.
#[derive(Clone)]
pub struct HttpPoolApi {
    http: Client,
    base_url: Url,
    token: Option<SecretString>,
}

impl HttpPoolApi {
    pub fn new(http: Client, base_url: &str, token: Option<SecretString>) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| PaymentError::Config(format!("invalid API base URL {base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(PaymentError::Config(format!(
                "API base URL {base_url} cannot carry a path"
            )));
        }

        Ok(Self {
            http,
            base_url,
            token,
        })
    }

    /// Appends `segments` to the base URL, escaping each one.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.authorize(request).send().await?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    let url = response.url().clone();
    let body = response.text().await?;

    if !status.is_success() {
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|body| body.message.or(body.error))
            .unwrap_or_default();
        warn!(
            http_status = status.as_u16(),
            %url,
            response = %body.chars().take(200).collect::<String>(),
            "Payments API request failed"
        );
        return Err(PaymentError::Remote {
            status: status.as_u16(),
            message,
        });
    }

    debug!(http_status = status.as_u16(), %url, "Payments API request succeeded");
    Ok(serde_json::from_str(&body)?)
}

#[async_trait]
impl PoolApi for HttpPoolApi {
    async fn initiate_deposit(
        &self,
        pool_id: &str,
        body: &DepositBody,
    ) -> Result<TransactionReceipt> {
        let url = self.endpoint(&["v1", "transactions", "pools", pool_id, "deposits"]);
        self.send(self.http.post(url).json(body)).await
    }

    async fn initiate_withdrawal(
        &self,
        pool_id: &str,
        body: &WithdrawalBody,
    ) -> Result<TransactionReceipt> {
        let url = self.endpoint(&["v1", "transactions", "pools", pool_id, "withdrawals"]);
        self.send(self.http.post(url).json(body)).await
    }

    async fn request_upgrade(&self, pool_id: &str, body: &UpgradeBody) -> Result<UpgradeQuote> {
        let url = self.endpoint(&["v1", "pools", pool_id, "upgrade"]);
        self.send(self.http.post(url).json(body)).await
    }

    async fn fetch_pool(&self, pool_id: &str) -> Result<Pool> {
        let url = self.endpoint(&["v1", "pools", pool_id]);
        self.send(self.http.get(url)).await
    }

    async fn list_transactions(&self, pool_id: &str) -> Result<Vec<TransactionRecord>> {
        let url = self.endpoint(&["v1", "transactions", "pools", pool_id]);
        let list: TransactionList = self.send(self.http.get(url)).await?;
        Ok(list.transactions)
    }
}

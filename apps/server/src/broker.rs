//! Order placement against the Dhan trading API.
//!
//! Orders are single-shot: no retry, no status polling.

use std::{fmt, time::Duration};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

/// Default HTTP request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Buy,
    Sell,
}

impl TransactionType {
    /// Parse an alert action. Case-sensitive; callers upper-case first.
    pub fn from_action(action: &str) -> Option<Self> {
        match action {
            "BUY" => Some(Self::Buy),
            "SELL" => Some(Self::Sell),
            _ => None,
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// A market order for an equity on the NSE cash segment.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OrderRequest {
    pub security_id: String,
    pub transaction_type: TransactionType,
    pub quantity: u64,
}

/// Broker acknowledgement of an accepted order.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderAck {
    pub order_id: String,
    #[serde(default)]
    pub order_status: Option<String>,
}

#[derive(Error, Debug)]
pub enum OrderError {
    /// The broker answered but did not accept the order.
    #[error("Order rejected (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

#[async_trait]
pub trait OrderGateway: Send + Sync {
    async fn place_order(&self, order: &OrderRequest) -> Result<OrderAck, OrderError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DhanOrderBody<'a> {
    dhan_client_id: &'a str,
    transaction_type: TransactionType,
    exchange_segment: &'static str,
    product_type: &'static str,
    order_type: &'static str,
    validity: &'static str,
    security_id: &'a str,
    quantity: u64,
    price: u32,
}

/// Dhan v2 REST order client.
pub struct DhanOrderClient {
    client: Client,
    base_url: String,
    client_id: String,
    access_token: String,
}

impl DhanOrderClient {
    pub fn new(
        base_url: impl Into<String>,
        client_id: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client_id: client_id.into(),
            access_token: access_token.into(),
        }
    }

    fn body<'a>(&'a self, order: &'a OrderRequest) -> DhanOrderBody<'a> {
        DhanOrderBody {
            dhan_client_id: &self.client_id,
            transaction_type: order.transaction_type,
            exchange_segment: "NSE_EQ",
            product_type: "INTRADAY",
            order_type: "MARKET",
            validity: "DAY",
            security_id: &order.security_id,
            quantity: order.quantity,
            price: 0,
        }
    }
}

#[async_trait]
impl OrderGateway for DhanOrderClient {
    async fn place_order(&self, order: &OrderRequest) -> Result<OrderAck, OrderError> {
        info!(
            "Placing {} MARKET order for {} x security {}",
            order.transaction_type, order.quantity, order.security_id
        );

        let response = self
            .client
            .post(format!("{}/v2/orders", self.base_url))
            .header("access-token", &self.access_token)
            .json(&self.body(order))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        match serde_json::from_str::<OrderAck>(&body) {
            Ok(ack) if status.is_success() => {
                info!("Order accepted: {}", ack.order_id);
                Ok(ack)
            }
            _ => {
                warn!("Order rejected with HTTP {}: {}", status, body);
                Err(OrderError::Rejected {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }
}

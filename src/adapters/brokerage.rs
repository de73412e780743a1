//! Brokerage REST adapter.
//!
//! Every call is signed with a fresh ES256 bearer token scoped to the
//! request's method, host and path. Error-bearing bodies are turned into
//! `HodlError::Brokerage` even when the HTTP status is 200.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::BrokerageConfig;
use crate::domain::{
    BestBidAskResponse, Offer, OrderConfiguration, PortfolioCreatedResponse,
    PortfolioDetailsResponse, PortfolioResponse, ProductResponse, Side, TransferRequest,
};
use crate::error::{HodlError, Result};
use crate::exchange::BrokerageGateway;
use crate::signing::{ApiKey, RequestSigner, SignerSettings};

/// `{"error": ..., "message": ...}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderPlacedSuccess {
    #[serde(default)]
    pub order_id: String,
    #[serde(default)]
    pub product_id: String,
    #[serde(default)]
    pub side: String,
    #[serde(default)]
    pub client_order_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderPlacedError {
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub error_details: String,
    #[serde(default)]
    pub preview_failure_reason: String,
    #[serde(default)]
    pub new_order_failure_reason: String,
}

/// POST /orders
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderPlacedResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub failure_reason: String,
    #[serde(default)]
    pub order_id: String,
    #[serde(default)]
    pub success_response: Option<OrderPlacedSuccess>,
    #[serde(default)]
    pub error_response: Option<OrderPlacedError>,
}

impl OrderPlacedResponse {
    fn rejection_reason(&self) -> String {
        match &self.error_response {
            Some(e) if !e.message.is_empty() => format!("{}: {}", e.error, e.message),
            Some(e) if !e.new_order_failure_reason.is_empty() => e.new_order_failure_reason.clone(),
            _ if !self.failure_reason.is_empty() => self.failure_reason.clone(),
            _ => "order not accepted".to_string(),
        }
    }
}

/// POST /orders/preview
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderPreviewResponse {
    #[serde(default)]
    pub order_total: String,
    #[serde(default)]
    pub commission_total: String,
    #[serde(default, rename = "errs")]
    pub errors: Vec<String>,
    #[serde(default, rename = "warning")]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub quote_size: String,
    #[serde(default)]
    pub base_size: String,
    #[serde(default)]
    pub best_bid: String,
    #[serde(default)]
    pub best_ask: String,
    #[serde(default)]
    pub is_max: bool,
}

/// Preview requests carry no client order id
#[derive(Debug, Serialize)]
struct PreviewOrderRequest<'a> {
    product_id: &'a str,
    side: Side,
    order_configuration: &'a OrderConfiguration,
    retail_portfolio_id: &'a str,
}

#[derive(Debug, Serialize)]
struct Funds<'a> {
    value: &'a str,
    currency: &'a str,
}

#[derive(Debug, Serialize)]
struct MoveFundsRequest<'a> {
    funds: Funds<'a>,
    source_portfolio_uuid: &'a str,
    target_portfolio_uuid: &'a str,
}

/// What the brokerage said about a submitted order
#[derive(Debug, Clone, PartialEq)]
pub enum OrderReceipt {
    Placed(OrderPlacedResponse),
    Preview(OrderPreviewResponse),
}

impl OrderReceipt {
    pub fn order_id(&self) -> Option<&str> {
        match self {
            OrderReceipt::Placed(r) if !r.order_id.is_empty() => Some(&r.order_id),
            OrderReceipt::Placed(r) => r
                .success_response
                .as_ref()
                .map(|s| s.order_id.as_str())
                .filter(|id| !id.is_empty()),
            OrderReceipt::Preview(_) => None,
        }
    }
}

/// Turn a brokerage body into an error when the status or the body says so
pub fn check_error_response(status: StatusCode, body: &str) -> Result<()> {
    let parsed = serde_json::from_str::<ErrorResponse>(body).ok();

    if !status.is_success() {
        let (error, message) = match parsed {
            Some(e) if !e.error.is_empty() => (e.error, e.message),
            _ => (status.to_string(), body.to_string()),
        };
        return Err(HodlError::Brokerage { error, message });
    }

    if let Some(e) = parsed {
        if !e.error.is_empty() {
            return Err(HodlError::Brokerage {
                error: e.error,
                message: e.message,
            });
        }
    }

    Ok(())
}

#[derive(Clone)]
pub struct BrokerageClient {
    http: Client,
    base_url: String,
    signer: RequestSigner,
}

impl BrokerageClient {
    pub fn new(base_url: &str, signer: RequestSigner) -> Result<Self> {
        let http = Client::builder()
            .user_agent("hodl/0.1")
            .build()
            .map_err(|e| HodlError::Internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            signer,
        })
    }

    pub fn from_config(config: &BrokerageConfig) -> Result<Self> {
        let api_key = ApiKey::from_file(&config.api_key_path)?;
        let signer = RequestSigner::new(
            &api_key,
            SignerSettings {
                service: config.service.clone(),
                issuer: config.issuer.clone(),
            },
        )?;
        Self::new(&config.base_url, signer)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: Option<&[(&str, &str)]>,
        body: Option<Value>,
    ) -> Result<T> {
        let text = self.request_text(method, path, query, body).await?;
        serde_json::from_str(&text).map_err(|e| {
            HodlError::InvalidMarketData(format!("unexpected response shape for {}: {}", path, e))
        })
    }

    async fn request_text(
        &self,
        method: Method,
        path: &str,
        query: Option<&[(&str, &str)]>,
        body: Option<Value>,
    ) -> Result<String> {
        let url = format!("{}{}", self.base_url, path);
        // The token scope never includes the query string
        let token = self.signer.sign_url(method.as_str(), &url)?;

        let mut req = self
            .http
            .request(method.clone(), &url)
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .header(CONTENT_TYPE, "application/json");

        if let Some(query) = query {
            req = req.query(query);
        }

        if let Some(body) = body {
            req = req.json(&body);
        }

        debug!(%method, path, "sending brokerage request");

        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        if let Err(e) = check_error_response(status, &text) {
            warn!(%method, path, %status, error = %e, "brokerage request failed");
            return Err(e);
        }

        Ok(text)
    }
}

#[async_trait]
impl BrokerageGateway for BrokerageClient {
    async fn list_portfolios(&self) -> Result<PortfolioResponse> {
        self.request_json(Method::GET, "/portfolios", None, None).await
    }

    async fn portfolio_details(&self, portfolio_uuid: &str) -> Result<PortfolioDetailsResponse> {
        let path = format!("/portfolios/{}", portfolio_uuid);
        self.request_json(Method::GET, &path, None, None).await
    }

    async fn create_portfolio(&self, name: &str) -> Result<PortfolioCreatedResponse> {
        self.request_json(Method::POST, "/portfolios", None, Some(json!({ "name": name })))
            .await
    }

    async fn list_products(&self, product_id: &str) -> Result<ProductResponse> {
        let query = [("product_type", "SPOT"), ("product_ids", product_id)];
        self.request_json(Method::GET, "/products", Some(&query[..]), None)
            .await
    }

    async fn best_bid_ask(&self, product_id: &str) -> Result<BestBidAskResponse> {
        let query = [("product_ids", product_id)];
        self.request_json(Method::GET, "/best_bid_ask", Some(&query[..]), None)
            .await
    }

    async fn place_order(&self, offer: &Offer, preview: bool) -> Result<OrderReceipt> {
        if preview {
            let body = serde_json::to_value(PreviewOrderRequest {
                product_id: &offer.product_id,
                side: offer.side,
                order_configuration: &offer.config,
                retail_portfolio_id: &offer.retail_portfolio_id,
            })?;
            let resp: OrderPreviewResponse = self
                .request_json(Method::POST, "/orders/preview", None, Some(body))
                .await?;
            if !resp.errors.is_empty() {
                return Err(HodlError::OrderRejected(resp.errors.join(", ")));
            }
            return Ok(OrderReceipt::Preview(resp));
        }

        let body = serde_json::to_value(offer)?;
        let resp: OrderPlacedResponse = self
            .request_json(Method::POST, "/orders", None, Some(body))
            .await
            .map_err(|e| match e {
                HodlError::Http(inner) => HodlError::OrderSubmission(inner.to_string()),
                other => other,
            })?;

        if !resp.success {
            return Err(HodlError::OrderRejected(resp.rejection_reason()));
        }

        Ok(OrderReceipt::Placed(resp))
    }

    async fn move_funds(&self, request: &TransferRequest, currency: &str) -> Result<Value> {
        let body = serde_json::to_value(MoveFundsRequest {
            funds: Funds {
                value: &request.amount,
                currency,
            },
            source_portfolio_uuid: &request.sender_id,
            target_portfolio_uuid: &request.receiver_id,
        })?;
        let text = self
            .request_text(Method::POST, "/portfolios/move_funds", None, Some(body))
            .await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

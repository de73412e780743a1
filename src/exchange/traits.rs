use async_trait::async_trait;

use crate::adapters::OrderReceipt;
use crate::domain::{
    BestBidAskResponse, Offer, PortfolioCreatedResponse, PortfolioDetailsResponse,
    PortfolioResponse, ProductResponse, TransferRequest,
};
use crate::error::Result;

/// Everything the service needs from the brokerage.
///
/// Implementations translate error-bearing responses into `HodlError`, so a
/// returned `Ok` is always a usable payload.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BrokerageGateway: Send + Sync {
    async fn list_portfolios(&self) -> Result<PortfolioResponse>;

    async fn portfolio_details(&self, portfolio_uuid: &str) -> Result<PortfolioDetailsResponse>;

    async fn create_portfolio(&self, name: &str) -> Result<PortfolioCreatedResponse>;

    async fn list_products(&self, product_id: &str) -> Result<ProductResponse>;

    async fn best_bid_ask(&self, product_id: &str) -> Result<BestBidAskResponse>;

    /// Submit `offer`; with `preview` the brokerage only validates it
    async fn place_order(&self, offer: &Offer, preview: bool) -> Result<OrderReceipt>;

    /// Move `amount` of `currency` between two portfolios; returns the raw body
    async fn move_funds(&self, request: &TransferRequest, currency: &str) -> Result<serde_json::Value>;
}

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::null_as_default;
use crate::error::HodlError;

/// Fixed self-trade-prevention id attached to every offer
pub const SELF_TRADE_PREVENTION_ID: &str = "hodl-investment-manager";

/// Order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Closed set of strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrategyName {
    /// Spend all available fiat in one post-only order at the best bid
    #[serde(rename = "HODL")]
    Hodl,
}

impl StrategyName {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyName::Hodl => "HODL",
        }
    }
}

impl std::fmt::Display for StrategyName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for StrategyName {
    type Err = HodlError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "HODL" => Ok(StrategyName::Hodl),
            other => Err(HodlError::UnsupportedStrategy(other.to_string())),
        }
    }
}

/// Closed set of base currencies the service will buy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SupportedCurrency {
    #[serde(rename = "ETH")]
    Eth,
}

impl SupportedCurrency {
    pub fn as_str(&self) -> &'static str {
        match self {
            SupportedCurrency::Eth => "ETH",
        }
    }

    /// Market pair against the portfolio's cash currency, e.g. "ETH-GBP"
    pub fn product_id(&self, quote_currency: &str) -> String {
        format!("{}-{}", self.as_str(), quote_currency.trim().to_uppercase())
    }
}

impl std::fmt::Display for SupportedCurrency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SupportedCurrency {
    type Err = HodlError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "ETH" => Ok(SupportedCurrency::Eth),
            other => Err(HodlError::Validation(format!(
                "unsupported currency: {}",
                other
            ))),
        }
    }
}

/// Limit order, good till `end_time`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitLimitGtd {
    /// Quantity of the base currency, 8 decimal places
    pub base_size: String,
    /// Ceiling price for the fill
    pub limit_price: String,
    /// RFC3339 expiry
    pub end_time: String,
    /// Maker-only; rejected instead of crossing the spread
    pub post_only: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderConfiguration {
    pub limit_limit_gtd: LimitLimitGtd,
}

impl OrderConfiguration {
    pub fn base_size(&self) -> &str {
        &self.limit_limit_gtd.base_size
    }

    pub fn limit_price(&self) -> &str {
        &self.limit_limit_gtd.limit_price
    }
}

/// One proposed order submission. Immutable once submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub client_order_id: String,
    pub product_id: String,
    pub side: Side,
    #[serde(rename = "order_configuration")]
    pub config: OrderConfiguration,
    pub self_trade_prevention_id: String,
    pub retail_portfolio_id: String,
}

impl Offer {
    /// A buy offer with a fresh client order id
    pub fn buy(product_id: impl Into<String>, config: OrderConfiguration, portfolio_uuid: impl Into<String>) -> Self {
        Self {
            client_order_id: uuid::Uuid::new_v4().to_string(),
            product_id: product_id.into(),
            side: Side::Buy,
            config,
            self_trade_prevention_id: SELF_TRADE_PREVENTION_ID.to_string(),
            retail_portfolio_id: portfolio_uuid.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    pub name: StrategyName,
    pub currency: SupportedCurrency,
    #[serde(default, deserialize_with = "null_as_default")]
    pub open_offers: Vec<Offer>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub closed_offers: Vec<Offer>,
}

impl Strategy {
    pub fn new(name: StrategyName, currency: SupportedCurrency) -> Self {
        Self {
            name,
            currency,
            open_offers: Vec::new(),
            closed_offers: Vec::new(),
        }
    }

    pub fn with_open_offer(mut self, offer: Offer) -> Self {
        self.open_offers.push(offer);
        self
    }
}

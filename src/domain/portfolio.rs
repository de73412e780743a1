use serde::{Deserialize, Serialize};

use super::{null_as_default, Strategy};

/// A brokerage portfolio as known to the service.
///
/// The brokerage only reports `name`, `uuid`, `type` and `deleted`; the
/// strategy fields exist only in the persisted state document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    pub name: String,
    pub uuid: String,
    #[serde(rename = "type", default)]
    pub portfolio_type: String,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub current_strategy: Option<Strategy>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub previous_strategies: Vec<Strategy>,
}

impl Portfolio {
    pub fn new(name: impl Into<String>, uuid: impl Into<String>, portfolio_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uuid: uuid.into(),
            portfolio_type: portfolio_type.into(),
            deleted: false,
            current_strategy: None,
            previous_strategies: Vec::new(),
        }
    }

    /// Same identity, no strategy attached
    pub fn identity(&self) -> Self {
        Self {
            name: self.name.clone(),
            uuid: self.uuid.clone(),
            portfolio_type: self.portfolio_type.clone(),
            deleted: self.deleted,
            current_strategy: None,
            previous_strategies: Vec::new(),
        }
    }
}

/// GET /portfolios
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub portfolios: Vec<Portfolio>,
}

impl PortfolioResponse {
    /// Case-sensitive exact name match; first hit wins
    pub fn find_by_name(&self, name: &str) -> Option<&Portfolio> {
        self.portfolios.iter().find(|p| p.name == name)
    }
}

/// POST /portfolios
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioCreatedResponse {
    pub portfolio: Portfolio,
}

/// GET /portfolios/{uuid}
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioDetailsResponse {
    pub breakdown: Breakdown,
}

/// Detailed balance/position snapshot of one portfolio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Breakdown {
    pub portfolio: Portfolio,
    #[serde(default)]
    pub portfolio_balances: PortfolioBalances,
    #[serde(default, deserialize_with = "null_as_default")]
    pub spot_positions: Vec<SpotPosition>,
}

impl Breakdown {
    /// Currency the portfolio's cash is held in, e.g. "GBP"
    pub fn cash_currency(&self) -> Option<&str> {
        let currency = self
            .portfolio_balances
            .total_cash_equivalent_balance
            .currency
            .trim();
        if currency.is_empty() {
            None
        } else {
            Some(currency)
        }
    }

    /// Available-to-trade fiat for the first spot position in `currency`.
    /// A missing position counts as zero.
    pub fn available_to_trade(&self, currency: &str) -> f64 {
        self.spot_positions
            .iter()
            .find(|p| p.asset == currency)
            .map(|p| p.available_to_trade_fiat)
            .unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpotPosition {
    pub asset: String,
    #[serde(default)]
    pub account_uuid: String,
    #[serde(default)]
    pub total_balance_fiat: f64,
    #[serde(default)]
    pub total_balance_crypto: f64,
    #[serde(default)]
    pub available_to_trade_fiat: f64,
    #[serde(default)]
    pub allocation: f64,
    #[serde(default)]
    pub one_day_change: f64,
    #[serde(default)]
    pub cost_basis: Balance,
    #[serde(default)]
    pub asset_img_url: String,
    #[serde(default)]
    pub is_cash: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioBalances {
    #[serde(default)]
    pub total_balance: Balance,
    #[serde(default)]
    pub total_futures_balance: Balance,
    #[serde(default)]
    pub total_cash_equivalent_balance: Balance,
    #[serde(default)]
    pub total_crypto_balance: Balance,
    #[serde(default)]
    pub futures_unrealized_pnl: Balance,
    #[serde(default)]
    pub perp_unrealized_pnl: Balance,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    #[serde(alias = "Value", default)]
    pub value: String,
    #[serde(alias = "Currency", default)]
    pub currency: String,
}

impl Balance {
    pub fn new(value: impl Into<String>, currency: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            currency: currency.into(),
        }
    }
}

/// Inbound request to move cash between two portfolios
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub sender_id: String,
    pub receiver_id: String,
    /// Decimal text, e.g. "25.50"
    pub amount: String,
}

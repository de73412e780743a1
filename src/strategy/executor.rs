//! Execution of a strategy request against one portfolio.
//!
//! `accept` resolves everything the order depends on (portfolio, breakdown,
//! market, top of book) while the caller waits. Sizing, submission and the
//! state update then run on a spawned task whose progress is visible through
//! the `ExecutionTracker`.

use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::sizing::{compute_order_config, ensure_tradable};
use super::tracker::{ExecutionGuard, ExecutionTracker};
use crate::domain::{Offer, Portfolio, Strategy, StrategyName, SupportedCurrency};
use crate::error::{HodlError, Result};
use crate::exchange::BrokerageGateway;
use crate::persistence::StateHandle;

/// Body of `POST /execute-strategy`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExecuteStrategyRequest {
    pub portfolio: String,
    pub strategy: StrategyName,
    pub currency: SupportedCurrency,
}

#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    /// Validate orders with the brokerage instead of placing them
    pub preview: bool,
    /// Quote currency when a breakdown does not report one
    pub fiat_currency: String,
}

/// Everything resolved before the worker starts
#[derive(Debug, Clone)]
struct OrderPlan {
    portfolio: Portfolio,
    strategy: StrategyName,
    currency: SupportedCurrency,
    product_id: String,
    available_fiat: f64,
    best_bid: String,
}

#[derive(Clone)]
pub struct StrategyExecutor {
    gateway: Arc<dyn BrokerageGateway>,
    state: StateHandle,
    tracker: ExecutionTracker,
    settings: ExecutorSettings,
}

impl StrategyExecutor {
    pub fn new(
        gateway: Arc<dyn BrokerageGateway>,
        state: StateHandle,
        tracker: ExecutionTracker,
        settings: ExecutorSettings,
    ) -> Self {
        Self {
            gateway,
            state,
            tracker,
            settings,
        }
    }

    pub fn tracker(&self) -> &ExecutionTracker {
        &self.tracker
    }

    pub fn state(&self) -> &StateHandle {
        &self.state
    }

    /// Resolve the request and hand the order to a background worker.
    ///
    /// An `Ok` id means the request was accepted, not that an order was placed.
    /// Resolution failures are returned and also recorded against the id.
    pub async fn accept(&self, request: ExecuteStrategyRequest) -> Result<Uuid> {
        let guard = self
            .tracker
            .register(&request.portfolio, request.strategy, request.currency);
        let id = guard.id();

        let plan = match self.prepare(&request).await {
            Ok(plan) => plan,
            Err(e) => {
                warn!(execution_id = %id, portfolio = %request.portfolio, error = %e, "strategy request not accepted");
                guard.fail(&e);
                return Err(e);
            }
        };

        info!(
            execution_id = %id,
            portfolio = %plan.portfolio.name,
            product_id = %plan.product_id,
            best_bid = %plan.best_bid,
            available_fiat = plan.available_fiat,
            "strategy request accepted"
        );

        let this = self.clone();
        tokio::spawn(async move { this.run_worker(plan, guard).await });

        Ok(id)
    }

    async fn prepare(&self, request: &ExecuteStrategyRequest) -> Result<OrderPlan> {
        let portfolios = self.gateway.list_portfolios().await?;
        if portfolios.portfolios.is_empty() {
            return Err(HodlError::PortfolioNotFound(
                "brokerage returned no portfolios".to_string(),
            ));
        }
        let portfolio = portfolios
            .find_by_name(&request.portfolio)
            .cloned()
            .ok_or_else(|| HodlError::PortfolioNotFound(request.portfolio.clone()))?;

        let details = self.gateway.portfolio_details(&portfolio.uuid).await?;
        let breakdown = details.breakdown;
        let quote = breakdown
            .cash_currency()
            .unwrap_or(self.settings.fiat_currency.as_str())
            .to_string();

        let product_id = request.currency.product_id(&quote);
        let products = self.gateway.list_products(&product_id).await?;
        match products.products.len() {
            0 => return Err(HodlError::ProductNotFound(product_id)),
            1 => {}
            n => warn!(product_id = %product_id, matches = n, "multiple products listed, using the first"),
        }

        let book = self.gateway.best_bid_ask(&product_id).await?;
        let top = book.top_of_book(&product_id)?;

        Ok(OrderPlan {
            available_fiat: breakdown.available_to_trade(&quote),
            portfolio,
            strategy: request.strategy,
            currency: request.currency,
            product_id,
            best_bid: top.bid.price,
        })
    }

    async fn run_worker(self, plan: OrderPlan, guard: ExecutionGuard) {
        let id = guard.id();
        match self.submit(plan, &guard).await {
            Ok(order_id) => {
                info!(execution_id = %id, order_id = ?order_id, "strategy execution completed");
                guard.complete(order_id);
            }
            Err(e) => {
                error!(execution_id = %id, error = %e, "strategy execution failed");
                guard.fail(&e);
            }
        }
    }

    async fn submit(&self, plan: OrderPlan, guard: &ExecutionGuard) -> Result<Option<String>> {
        let config = compute_order_config(plan.available_fiat, &plan.best_bid, plan.strategy, Utc::now())?;
        ensure_tradable(&config)?;

        let offer = Offer::buy(&plan.product_id, config, &plan.portfolio.uuid);
        guard.mark_submitted(&offer.client_order_id);
        info!(
            execution_id = %guard.id(),
            client_order_id = %offer.client_order_id,
            base_size = %offer.config.base_size(),
            limit_price = %offer.config.limit_price(),
            preview = self.settings.preview,
            "submitting order"
        );

        let receipt = self.gateway.place_order(&offer, self.settings.preview).await?;
        let order_id = receipt.order_id().map(str::to_string);
        if let Some(order_id) = &order_id {
            guard.record_order(order_id);
        }

        let portfolio = plan.portfolio;
        let strategy = Strategy::new(plan.strategy, plan.currency).with_open_offer(offer);
        self.state
            .update(move |state| state.set_current_strategy(&portfolio, strategy, Utc::now()))
            .await?;

        Ok(order_id)
    }
}

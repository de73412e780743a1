//! Order sizing for the HODL strategy

use chrono::{DateTime, Duration, SecondsFormat, Utc};

use crate::domain::{LimitLimitGtd, OrderConfiguration, StrategyName};
use crate::error::{HodlError, Result};

/// Maker commission (0.40%) plus padding so the fill never exceeds the cash
pub const COMMISSION_RATE: f64 = 0.00400001;

/// How long a HODL offer rests on the book
pub const ORDER_TTL_SECS: i64 = 300;

/// Build the limit configuration that spends `available_fiat` at `best_bid`.
///
/// The limit price is the bid text as received so no precision is lost.
pub fn compute_order_config(
    available_fiat: f64,
    best_bid: &str,
    strategy: StrategyName,
    now: DateTime<Utc>,
) -> Result<OrderConfiguration> {
    match strategy {
        StrategyName::Hodl => hodl_config(available_fiat, best_bid, now),
    }
}

fn hodl_config(available_fiat: f64, best_bid: &str, now: DateTime<Utc>) -> Result<OrderConfiguration> {
    let bid: f64 = best_bid.trim().parse().map_err(|_| {
        HodlError::InvalidMarketData(format!("best bid is not a number: {:?}", best_bid))
    })?;
    if !bid.is_finite() || bid <= 0.0 {
        return Err(HodlError::InvalidMarketData(format!(
            "best bid must be positive, got {}",
            best_bid
        )));
    }

    let spendable = available_fiat - available_fiat * COMMISSION_RATE;
    let base_size = spendable / bid;
    let end_time = now + Duration::seconds(ORDER_TTL_SECS);

    Ok(OrderConfiguration {
        limit_limit_gtd: LimitLimitGtd {
            base_size: format!("{:.8}", base_size),
            limit_price: best_bid.to_string(),
            end_time: end_time.to_rfc3339_opts(SecondsFormat::Secs, true),
            post_only: true,
        },
    })
}

/// Refuse orders whose size rounds to nothing
pub fn ensure_tradable(config: &OrderConfiguration) -> Result<()> {
    let size: f64 = config.base_size().parse().unwrap_or(0.0);
    if size > 0.0 {
        Ok(())
    } else {
        Err(HodlError::OrderRejected(format!(
            "order size {} is not tradable",
            config.base_size()
        )))
    }
}

use serde_json::Value;
use tracing::{info, warn};

use crate::domain::TransferRequest;
use crate::error::{HodlError, Result};
use crate::exchange::BrokerageGateway;

/// Move cash from the sender to the receiver portfolio once the sender can
/// cover the amount. Returns the brokerage's response body.
pub async fn transfer_funds(
    gateway: &dyn BrokerageGateway,
    request: &TransferRequest,
    fallback_fiat: &str,
) -> Result<Value> {
    let amount = parse_amount(&request.amount)?;

    let details = gateway.portfolio_details(&request.sender_id).await?;
    let currency = details
        .breakdown
        .cash_currency()
        .unwrap_or(fallback_fiat)
        .to_string();
    let available = details.breakdown.available_to_trade(&currency);

    if available < amount {
        warn!(
            sender = %request.sender_id,
            available,
            requested = amount,
            currency = %currency,
            "transfer refused"
        );
        return Err(HodlError::InsufficientFunds {
            available,
            requested: amount,
        });
    }

    let body = gateway.move_funds(request, &currency).await?;
    info!(
        sender = %request.sender_id,
        receiver = %request.receiver_id,
        amount = %request.amount,
        currency = %currency,
        "funds moved"
    );
    Ok(body)
}

fn parse_amount(raw: &str) -> Result<f64> {
    match raw.trim().parse::<f64>() {
        Ok(amount) if amount.is_finite() && amount > 0.0 => Ok(amount),
        _ => Err(HodlError::Validation(format!(
            "amount must be a positive number, got {:?}",
            raw
        ))),
    }
}

use serde::{Deserialize, Serialize};

use super::null_as_default;
use crate::error::{HodlError, Result};

/// GET /products
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub products: Vec<Product>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub product_id: String,
    #[serde(default)]
    pub price: String,
}

/// One resting level on the book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: String,
    #[serde(default)]
    pub size: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBook {
    pub product_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub bids: Vec<PriceLevel>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub asks: Vec<PriceLevel>,
    #[serde(default)]
    pub time: String,
}

/// GET /best_bid_ask
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestBidAskResponse {
    #[serde(alias = "price_books", default, deserialize_with = "null_as_default")]
    pub pricebooks: Vec<PriceBook>,
}

/// Best bid and ask of one product, prices as received
#[derive(Debug, Clone, PartialEq)]
pub struct TopOfBook {
    pub product_id: String,
    pub bid: PriceLevel,
    pub ask: PriceLevel,
}

impl BestBidAskResponse {
    /// The first book must carry at least one bid and one ask
    pub fn top_of_book(&self, product_id: &str) -> Result<TopOfBook> {
        let book = self.pricebooks.first().ok_or_else(|| {
            HodlError::MarketDataUnavailable(format!("no price books for {}", product_id))
        })?;

        if self.pricebooks.len() > 1 {
            tracing::warn!(
                product_id,
                books = self.pricebooks.len(),
                "multiple price books in response, using the first"
            );
        }

        let bid = book.bids.first().cloned().ok_or_else(|| {
            HodlError::MarketDataUnavailable(format!("no bids in price book for {}", product_id))
        })?;
        let ask = book.asks.first().cloned().ok_or_else(|| {
            HodlError::MarketDataUnavailable(format!("no asks in price book for {}", product_id))
        })?;

        Ok(TopOfBook {
            product_id: book.product_id.clone(),
            bid,
            ask,
        })
    }
}

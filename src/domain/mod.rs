pub mod market;
pub mod portfolio;
pub mod state;
pub mod strategy;

pub use market::*;
pub use portfolio::*;
pub use state::*;
pub use strategy::*;

use serde::{Deserialize, Deserializer};

/// The brokerage sends `null` for empty lists
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

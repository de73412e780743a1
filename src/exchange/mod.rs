pub mod traits;

pub use traits::BrokerageGateway;
#[cfg(test)]
pub use traits::MockBrokerageGateway;

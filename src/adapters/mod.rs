pub mod api_server;
pub mod brokerage;

pub use api_server::start_api_server;
pub use brokerage::{
    check_error_response, BrokerageClient, ErrorResponse, OrderPlacedResponse,
    OrderPreviewResponse, OrderReceipt,
};

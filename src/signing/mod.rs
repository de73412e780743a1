pub mod api_key;
pub mod jwt;

pub use api_key::ApiKey;
pub use jwt::{token_scope, RequestClaims, RequestSigner, SignerSettings, TOKEN_TTL};

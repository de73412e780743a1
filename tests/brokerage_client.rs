//! `BrokerageClient` against a local stub of the brokerage REST API.

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode, Uri},
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64_URL, Engine};
use hodl::adapters::{BrokerageClient, OrderReceipt};
use hodl::domain::*;
use hodl::error::HodlError;
use hodl::exchange::BrokerageGateway;
use hodl::signing::{ApiKey, RequestSigner, SignerSettings};
use p256::pkcs8::LineEnding;
use p256::SecretKey;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

const KEY_NAME: &str = "organizations/org/apiKeys/stub-key";

#[derive(Debug, Clone)]
struct Seen {
    path: String,
    query: HashMap<String, String>,
    authorization: String,
    content_type: String,
    body: Value,
}

type Recorder = Arc<Mutex<Vec<Seen>>>;

fn record(seen: &Recorder, uri: &Uri, headers: &HeaderMap, query: HashMap<String, String>, body: Value) {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    };
    seen.lock().unwrap().push(Seen {
        path: uri.path().to_string(),
        query,
        authorization: header("authorization"),
        content_type: header("content-type"),
        body,
    });
}

async fn portfolios(State(seen): State<Recorder>, uri: Uri, headers: HeaderMap) -> Json<Value> {
    record(&seen, &uri, &headers, HashMap::new(), Value::Null);
    Json(json!({
        "portfolios": [
            {"name": "Default", "uuid": "uuid-default", "type": "DEFAULT", "deleted": false},
            {"name": "test", "uuid": "uuid-test", "type": "CONSUMER", "deleted": false}
        ]
    }))
}

async fn products(
    State(seen): State<Recorder>,
    uri: Uri,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    record(&seen, &uri, &headers, query, Value::Null);
    Json(json!({ "products": [{"product_id": "ETH-GBP", "price": "2349.80"}], "num_products": 1 }))
}

async fn best_bid_ask(
    State(seen): State<Recorder>,
    uri: Uri,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    record(&seen, &uri, &headers, query, Value::Null);
    Json(json!({ "error": "INVALID_ARGUMENT", "message": "product_ids is invalid" }))
}

async fn orders(State(seen): State<Recorder>, uri: Uri, headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
    record(&seen, &uri, &headers, HashMap::new(), body.clone());
    if body["product_id"] == "ETH-GBP" {
        Json(json!({
            "success": true,
            "order_id": "order-1",
            "success_response": {"order_id": "order-1", "product_id": "ETH-GBP", "side": "BUY"}
        }))
    } else {
        Json(json!({
            "success": false,
            "failure_reason": "UNKNOWN_FAILURE_REASON",
            "error_response": {"error": "INVALID_PRODUCT_ID", "message": "Invalid product id"}
        }))
    }
}

async fn preview(State(seen): State<Recorder>, uri: Uri, headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
    record(&seen, &uri, &headers, HashMap::new(), body);
    Json(json!({ "order_total": "999.99", "commission_total": "4.00", "errs": [], "warning": [] }))
}

async fn move_funds(
    State(seen): State<Recorder>,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, String) {
    record(&seen, &uri, &headers, HashMap::new(), body);
    (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded".to_string())
}

async fn spawn_stub() -> (SocketAddr, Recorder) {
    let seen: Recorder = Arc::default();
    let app = Router::new()
        .route("/portfolios", get(portfolios))
        .route("/products", get(products))
        .route("/best_bid_ask", get(best_bid_ask))
        .route("/orders", post(orders))
        .route("/orders/preview", post(preview))
        .route("/portfolios/move_funds", post(move_funds))
        .with_state(seen.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, seen)
}

fn client(addr: SocketAddr) -> BrokerageClient {
    let secret = SecretKey::random(&mut rand::rngs::OsRng);
    let pem = secret.to_sec1_pem(LineEnding::LF).unwrap();
    let signer = RequestSigner::new(
        &ApiKey::new(KEY_NAME, pem.to_string()),
        SignerSettings {
            service: "retail_rest_api_proxy".into(),
            issuer: "coinbase-cloud".into(),
        },
    )
    .unwrap();
    BrokerageClient::new(&format!("http://{addr}/"), signer).unwrap()
}

fn claims(authorization: &str) -> Value {
    let token = authorization.strip_prefix("Bearer ").expect("bearer scheme");
    let payload = token.split('.').nth(1).expect("jwt payload");
    serde_json::from_slice(&BASE64_URL.decode(payload).unwrap()).unwrap()
}

fn offer(product_id: &str) -> Offer {
    Offer::buy(
        product_id,
        OrderConfiguration {
            limit_limit_gtd: LimitLimitGtd {
                base_size: "0.42391096".into(),
                limit_price: "2349.55".into(),
                end_time: "2024-05-01T20:12:23Z".into(),
                post_only: true,
            },
        },
        "uuid-test",
    )
}

#[tokio::test]
async fn every_request_carries_a_token_scoped_to_it() {
    let (addr, seen) = spawn_stub().await;
    let client = client(addr);

    let resp = client.list_portfolios().await.unwrap();
    assert_eq!(resp.find_by_name("test").unwrap().uuid, "uuid-test");

    let products = client.list_products("ETH-GBP").await.unwrap();
    assert_eq!(products.products.len(), 1);

    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 2);

    let first = claims(&seen[0].authorization);
    assert_eq!(first["uri"], format!("GET {addr}/portfolios"));
    assert_eq!(first["sub"], KEY_NAME);
    assert_eq!(first["aud"], "retail_rest_api_proxy");
    assert_eq!(seen[0].content_type, "application/json");

    // query parameters are sent but never signed
    let second = claims(&seen[1].authorization);
    assert_eq!(second["uri"], format!("GET {addr}/products"));
    assert_eq!(seen[1].query.get("product_type").map(String::as_str), Some("SPOT"));
    assert_eq!(seen[1].query.get("product_ids").map(String::as_str), Some("ETH-GBP"));
}

#[tokio::test]
async fn error_field_in_success_body_becomes_brokerage_error() {
    let (addr, _) = spawn_stub().await;

    let err = client(addr).best_bid_ask("ETH-GBP").await.unwrap_err();

    match err {
        HodlError::Brokerage { error, message } => {
            assert_eq!(error, "INVALID_ARGUMENT");
            assert_eq!(message, "product_ids is invalid");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn placed_order_posts_the_offer() {
    let (addr, seen) = spawn_stub().await;
    let offer = offer("ETH-GBP");

    let receipt = client(addr).place_order(&offer, false).await.unwrap();
    assert_eq!(receipt.order_id(), Some("order-1"));

    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen[0].path, "/orders");
    assert_eq!(claims(&seen[0].authorization)["uri"], format!("POST {addr}/orders"));
    assert_eq!(seen[0].body["client_order_id"], offer.client_order_id.as_str());
    assert_eq!(seen[0].body["self_trade_prevention_id"], SELF_TRADE_PREVENTION_ID);
    assert_eq!(
        seen[0].body["order_configuration"]["limit_limit_gtd"]["post_only"],
        true
    );
}

#[tokio::test]
async fn unsuccessful_order_is_rejected() {
    let (addr, _) = spawn_stub().await;

    let err = client(addr).place_order(&offer("DOGE-GBP"), false).await.unwrap_err();

    assert!(matches!(err, HodlError::OrderRejected(ref reason) if reason.contains("INVALID_PRODUCT_ID")));
}

#[tokio::test]
async fn preview_uses_preview_endpoint_without_client_order_id() {
    let (addr, seen) = spawn_stub().await;

    let receipt = client(addr).place_order(&offer("ETH-GBP"), true).await.unwrap();
    match receipt {
        OrderReceipt::Preview(p) => assert_eq!(p.order_total, "999.99"),
        other => panic!("expected preview, got {other:?}"),
    }

    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen[0].path, "/orders/preview");
    assert!(seen[0].body.get("client_order_id").is_none());
    assert_eq!(seen[0].body["retail_portfolio_id"], "uuid-test");
}

#[tokio::test]
async fn failed_transfer_status_is_a_brokerage_error() {
    let (addr, seen) = spawn_stub().await;
    let request = TransferRequest {
        sender_id: "uuid-test".into(),
        receiver_id: "uuid-default".into(),
        amount: "25.50".into(),
    };

    let err = client(addr).move_funds(&request, "GBP").await.unwrap_err();
    assert!(matches!(err, HodlError::Brokerage { ref message, .. } if message == "upstream exploded"));

    let seen = seen.lock().unwrap().clone();
    assert_eq!(
        seen[0].body,
        json!({
            "funds": {"value": "25.50", "currency": "GBP"},
            "source_portfolio_uuid": "uuid-test",
            "target_portfolio_uuid": "uuid-default"
        })
    );
}

// -------------------------------------------------------------------------------------------------
//  Copyright (C) 2015-2026 Nautech Systems Pty Ltd. All rights reserved.
//  https://nautechsystems.io
//
//  Licensed under the GNU Lesser General Public License Version 3.0 (the "License");
//  You may not use this file except in compliance with the License.
//  You may obtain a copy of the License at https://www.gnu.org/licenses/lgpl-3.0.en.html
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.
// -------------------------------------------------------------------------------------------------

//! Integration tests for the CryptoMarket WebSocket client using a mock Axum server.

use std::{
    future::Future,
    net::SocketAddr,
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use axum::{
    Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
    routing::get,
};
use futures_util::StreamExt;
use nautilus_cryptomarket::{
    CryptomarketWebSocketClient, CryptomarketWsConfig, CryptomarketWsError, NotificationKind,
    common::enums::CryptomarketCandlePeriod,
    websocket::{auth::AuthState, dispatch::SubscriptionState, messages::CryptomarketReport},
};
use serde_json::{Value, json};

const GOOD_API_KEY: &str = "good-api-key";

// ------------------------------------------------------------------------------------------------
// Test Data Helpers
// ------------------------------------------------------------------------------------------------

fn data_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_data")
}

fn load_json(filename: &str) -> Value {
    let content = std::fs::read_to_string(data_path().join(filename))
        .unwrap_or_else(|_| panic!("failed to read {filename}"));
    serde_json::from_str(&content).expect("invalid json")
}

fn with_param(mut payload: Value, key: &str, value: Value) -> Value {
    payload["params"][key] = value;
    payload
}

async fn wait_until_async<F, Fut>(mut condition: F, timeout: Duration)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let start = tokio::time::Instant::now();
    while !condition().await {
        assert!(
            start.elapsed() < timeout,
            "condition not met within {timeout:?}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

// ------------------------------------------------------------------------------------------------
// Test Server State
// ------------------------------------------------------------------------------------------------

#[derive(Default)]
struct TestServerState {
    connection_count: tokio::sync::Mutex<usize>,
    methods: tokio::sync::Mutex<Vec<String>>,
    login_params: tokio::sync::Mutex<Option<Value>>,
    drop_on_hold: AtomicBool,
}

impl TestServerState {
    async fn methods(&self) -> Vec<String> {
        self.methods.lock().await.clone()
    }
}

// ------------------------------------------------------------------------------------------------
// Mock WebSocket Handler
// ------------------------------------------------------------------------------------------------

async fn handle_ws_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<Arc<TestServerState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn send_json(socket: &mut WebSocket, value: &Value) -> bool {
    socket
        .send(Message::Text(value.to_string().into()))
        .await
        .is_ok()
}

async fn handle_socket(mut socket: WebSocket, state: Arc<TestServerState>) {
    *state.connection_count.lock().await += 1;

    let ticker = load_json("ws_ticker.json");
    let book_snapshot = load_json("ws_orderbook_snapshot.json");
    let book_update = load_json("ws_orderbook_update.json");
    let spot_orders = load_json("ws_spot_orders.json");
    let spot_balances = load_json("ws_spot_balances.json");

    let mut authenticated = false;

    while let Some(message) = socket.recv().await {
        let Ok(message) = message else { break };

        let text = match message {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        let Ok(request) = serde_json::from_str::<Value>(&text) else {
            continue;
        };
        let id = request["id"].clone();
        let method = request["method"].as_str().unwrap_or_default().to_string();
        let params = request["params"].clone();
        state.methods.lock().await.push(method.clone());

        let ok = match method.as_str() {
            "login" => {
                *state.login_params.lock().await = Some(params.clone());
                let signature_ok = params["signature"]
                    .as_str()
                    .is_some_and(|s| s.len() == 64 && s.chars().all(|c| c.is_ascii_hexdigit()));
                if params["api_key"] == GOOD_API_KEY && signature_ok {
                    authenticated = true;
                    send_json(&mut socket, &json!({"id": id, "result": true})).await
                } else {
                    send_json(
                        &mut socket,
                        &json!({"id": id, "error": {
                            "code": 1002,
                            "message": "Authorization is required or has been failed",
                            "description": "invalid API key",
                        }}),
                    )
                    .await
                }
            }
            "subscribe_ticker" => {
                // Snapshot before the confirmation
                let snapshot = with_param(ticker.clone(), "symbol", params["symbol"].clone());
                send_json(&mut socket, &snapshot).await
                    && send_json(&mut socket, &json!({"id": id, "result": true})).await
                    && send_json(
                        &mut socket,
                        &with_param(ticker.clone(), "last", json!("0.054470")),
                    )
                    .await
                    && send_json(
                        &mut socket,
                        &with_param(ticker.clone(), "last", json!("0.054480")),
                    )
                    .await
            }
            "subscribe_orderbook" => {
                send_json(&mut socket, &json!({"id": id, "result": true})).await
                    && send_json(&mut socket, &book_snapshot).await
                    && send_json(&mut socket, &book_update).await
            }
            "subscribe_candles" | "unsubscribe_ticker" | "unsubscribe_orderbook" => {
                send_json(&mut socket, &json!({"id": id, "result": true})).await
            }
            "spot_subscribe" | "spot_balances" if !authenticated => {
                send_json(
                    &mut socket,
                    &json!({"id": id, "error": {
                        "code": 1001,
                        "message": "Authorization is required",
                        "description": "",
                    }}),
                )
                .await
            }
            "spot_subscribe" => {
                send_json(&mut socket, &json!({"id": id, "result": {"result": true}})).await
                    && send_json(&mut socket, &spot_orders).await
            }
            "spot_balances" => {
                send_json(&mut socket, &json!({"id": id, "result": spot_balances})).await
            }
            "echo" => send_json(&mut socket, &json!({"id": id, "result": params})).await,
            "hold" => {
                if state.drop_on_hold.load(Ordering::Relaxed) {
                    let _ = socket.send(Message::Close(None)).await;
                    break;
                }
                true
            }
            _ => {
                send_json(
                    &mut socket,
                    &json!({"id": id, "error": {
                        "code": 2001,
                        "message": "Method not found",
                        "description": method,
                    }}),
                )
                .await
            }
        };

        if !ok {
            break;
        }
    }

    let mut count = state.connection_count.lock().await;
    *count = count.saturating_sub(1);
}

async fn start_ws_server(state: Arc<TestServerState>) -> SocketAddr {
    let router = Router::new()
        .route("/api/3/ws/public", get(handle_ws_upgrade))
        .route("/api/3/ws/trading", get(handle_ws_upgrade))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind websocket listener");
    let addr = listener.local_addr().expect("missing local addr");

    tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("websocket server failed");
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    addr
}

fn public_config(addr: SocketAddr) -> CryptomarketWsConfig {
    CryptomarketWsConfig {
        base_url_ws: Some(format!("ws://{addr}/api/3/ws/public")),
        ..CryptomarketWsConfig::public()
    }
}

fn trading_config(addr: SocketAddr, api_key: &str) -> CryptomarketWsConfig {
    CryptomarketWsConfig {
        base_url_ws: Some(format!("ws://{addr}/api/3/ws/trading")),
        ..CryptomarketWsConfig::trading(api_key, "test-api-secret")
    }
}

// ================================================================================================
// Connection Tests
// ================================================================================================

#[tokio::test]
async fn test_connect_and_close() {
    let state = Arc::new(TestServerState::default());
    let addr = start_ws_server(state.clone()).await;

    let client = CryptomarketWebSocketClient::connect(public_config(addr))
        .await
        .expect("connect failed");

    assert!(client.is_active());
    assert_eq!(client.auth_state(), AuthState::Unauthenticated);
    wait_until_async(
        || {
            let state = state.clone();
            async move { *state.connection_count.lock().await == 1 }
        },
        Duration::from_secs(2),
    )
    .await;

    client.close().await;

    assert!(!client.is_active());
    wait_until_async(
        || {
            let state = state.clone();
            async move { *state.connection_count.lock().await == 0 }
        },
        Duration::from_secs(2),
    )
    .await;
}

#[tokio::test]
async fn test_connect_failure() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = CryptomarketWebSocketClient::connect(public_config(addr)).await;

    assert!(matches!(result, Err(CryptomarketWsError::Connect(_))));
}

#[tokio::test]
async fn test_echo_call_round_trip() {
    let state = Arc::new(TestServerState::default());
    let addr = start_ws_server(state.clone()).await;
    let client = CryptomarketWebSocketClient::connect(public_config(addr))
        .await
        .unwrap();

    let result = client.call("echo", json!({"value": 42})).await.unwrap();

    assert_eq!(result, json!({"value": 42}));
    client.close().await;
}

#[tokio::test]
async fn test_unknown_method_returns_server_error() {
    let state = Arc::new(TestServerState::default());
    let addr = start_ws_server(state.clone()).await;
    let client = CryptomarketWebSocketClient::connect(public_config(addr))
        .await
        .unwrap();

    let err = client.call("get_nothing", json!({})).await.unwrap_err();

    assert_eq!(
        err,
        CryptomarketWsError::Server {
            code: 2001,
            message: "Method not found".to_string(),
            description: "get_nothing".to_string(),
        }
    );
    assert!(client.is_active());
    client.close().await;
}

#[tokio::test]
async fn test_concurrent_calls_share_connection() {
    let state = Arc::new(TestServerState::default());
    let addr = start_ws_server(state.clone()).await;
    let client = Arc::new(
        CryptomarketWebSocketClient::connect(public_config(addr))
            .await
            .unwrap(),
    );

    let handles: Vec<_> = (0..20)
        .map(|n| {
            let client = client.clone();
            tokio::spawn(async move { (n, client.call("echo", json!({"n": n})).await) })
        })
        .collect();

    for handle in handles {
        let (n, result) = handle.await.unwrap();
        assert_eq!(result.unwrap(), json!({"n": n}));
    }
    client.close().await;
}

#[tokio::test]
async fn test_server_close_fails_pending_call() {
    let state = Arc::new(TestServerState::default());
    state.drop_on_hold.store(true, Ordering::Relaxed);
    let addr = start_ws_server(state.clone()).await;
    let client = CryptomarketWebSocketClient::connect(public_config(addr))
        .await
        .unwrap();
    let mut stream = client.subscribe_orderbook("ETHBTC").await.unwrap();

    let err = client.call("hold", json!({})).await.unwrap_err();

    assert_eq!(err, CryptomarketWsError::ConnectionClosed);
    assert_eq!(stream.next().await.unwrap().kind, NotificationKind::Snapshot);
    assert_eq!(stream.next().await.unwrap().kind, NotificationKind::Update);
    assert!(stream.next().await.is_none());
    assert!(!client.is_active());
}

// ================================================================================================
// Subscription Tests
// ================================================================================================

#[tokio::test]
async fn test_ticker_snapshot_precedes_confirmation() {
    let state = Arc::new(TestServerState::default());
    let addr = start_ws_server(state.clone()).await;
    let client = CryptomarketWebSocketClient::connect(public_config(addr))
        .await
        .unwrap();

    let mut stream = client.subscribe_ticker("ETHBTC").await.unwrap();

    let snapshot = stream.next().await.unwrap();
    assert_eq!(snapshot.kind, NotificationKind::Snapshot);
    assert_eq!(snapshot.topic, "ticker:ETHBTC");
    assert_eq!(snapshot.payload["last"], "0.054463");

    let first = stream.next().await.unwrap();
    let second = stream.next().await.unwrap();
    assert_eq!(first.kind, NotificationKind::Update);
    assert_eq!(first.payload["last"], "0.054470");
    assert_eq!(second.payload["last"], "0.054480");

    client.unsubscribe_ticker("ETHBTC").await.unwrap();

    assert!(stream.next().await.is_none());
    assert_eq!(
        client.subscription_state("ticker:ETHBTC"),
        SubscriptionState::Closed
    );
    assert_eq!(
        state.methods().await,
        vec!["subscribe_ticker", "unsubscribe_ticker"]
    );
    client.close().await;
}

#[tokio::test]
async fn test_orderbook_snapshot_and_update() {
    let state = Arc::new(TestServerState::default());
    let addr = start_ws_server(state.clone()).await;
    let client = CryptomarketWebSocketClient::connect(public_config(addr))
        .await
        .unwrap();

    let mut stream = client.subscribe_orderbook("ETHBTC").await.unwrap();

    let snapshot = stream.next().await.unwrap();
    let update = stream.next().await.unwrap();
    assert_eq!(snapshot.kind, NotificationKind::Snapshot);
    assert_eq!(snapshot.method, "snapshot_orderbook");
    assert_eq!(snapshot.payload["sequence"], 8_073_827);
    assert_eq!(update.kind, NotificationKind::Update);
    assert_eq!(update.payload["sequence"], 8_073_830);

    client.unsubscribe_orderbook("ETHBTC").await.unwrap();
    assert!(stream.next().await.is_none());
    client.close().await;
}

#[tokio::test]
async fn test_independent_candle_topics() {
    let state = Arc::new(TestServerState::default());
    let addr = start_ws_server(state.clone()).await;
    let client = CryptomarketWebSocketClient::connect(public_config(addr))
        .await
        .unwrap();

    let m1 = client
        .subscribe_candles("ETHBTC", CryptomarketCandlePeriod::Minute1, None)
        .await
        .unwrap();
    let h1 = client
        .subscribe_candles("ETHBTC", CryptomarketCandlePeriod::Hour1, Some(100))
        .await
        .unwrap();

    assert_eq!(m1.topic(), "candles:ETHBTC:M1");
    assert_eq!(h1.topic(), "candles:ETHBTC:H1");
    assert_eq!(
        client.subscription_state("candles:ETHBTC:H1"),
        SubscriptionState::Active
    );
    client.close().await;
}

// ================================================================================================
// Authentication Tests
// ================================================================================================

#[tokio::test]
async fn test_trading_session_authenticates_on_connect() {
    let state = Arc::new(TestServerState::default());
    let addr = start_ws_server(state.clone()).await;

    let client = CryptomarketWebSocketClient::connect(trading_config(addr, GOOD_API_KEY))
        .await
        .unwrap();

    assert_eq!(client.auth_state(), AuthState::Authenticated);
    let login = state.login_params.lock().await.clone().unwrap();
    assert_eq!(login["type"], "HS256");
    assert_eq!(login["api_key"], GOOD_API_KEY);
    assert_eq!(login["window"], 10_000);

    let balances = client.get_spot_trading_balances().await.unwrap();
    assert_eq!(balances.len(), 2);
    assert_eq!(balances[0].currency, "BTC");

    let mut reports = client.subscribe_reports().await.unwrap();
    let snapshot = reports.next().await.unwrap();
    assert_eq!(snapshot.kind, NotificationKind::Snapshot);
    let orders: Vec<CryptomarketReport> = snapshot.decode().unwrap();
    assert_eq!(orders[0].client_order_id, "b5acd79c0a854b01b558665bcf379456");

    client.close().await;
}

#[tokio::test]
async fn test_rejected_login_keeps_public_access() {
    let state = Arc::new(TestServerState::default());
    let addr = start_ws_server(state.clone()).await;

    let client = CryptomarketWebSocketClient::connect(trading_config(addr, "bad-api-key"))
        .await
        .unwrap();

    assert_eq!(client.auth_state(), AuthState::Failed);
    assert!(client.is_active());
    assert!(matches!(
        client.get_spot_trading_balances().await,
        Err(CryptomarketWsError::AuthFailed(_))
    ));
    assert!(matches!(
        client.subscribe_reports().await,
        Err(CryptomarketWsError::AuthFailed(_))
    ));

    let result = client.call("echo", json!({"still": "open"})).await.unwrap();
    assert_eq!(result, json!({"still": "open"}));
    assert_eq!(state.methods().await, vec!["login", "echo"]);
    client.close().await;
}

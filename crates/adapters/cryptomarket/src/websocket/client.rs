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

//! WebSocket client for the CryptoMarket v3 API.
//!
//! One [`CryptomarketWebSocketClient`] owns one connection. Calls are correlated with their
//! replies by a per-client monotonic request ID, and subscriptions are keyed by topic so any
//! number of feeds can share the connection. Private methods are gated on the `login`
//! handshake, which runs on connect whenever credentials are configured.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use parking_lot::Mutex;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{
    auth::{AuthState, AuthTracker, CryptomarketAuthenticator},
    connection::ConnectionManager,
    dispatch::{DispatchTable, NotificationStream, SubscriptionState},
    error::{CryptomarketWsError, CryptomarketWsResult},
    handler::CryptomarketWsRouter,
    messages::{
        CreateSpotOrderListParams, CreateSpotOrderParams, CryptomarketBalance,
        CryptomarketCandleParams, CryptomarketReport, CryptomarketSymbolParams,
        CryptomarketTradingCommission, CryptomarketWsRequest, ReplaceSpotOrderParams,
    },
    routes::CryptomarketWsFeed,
};
use crate::{
    common::{
        consts::{
            METHOD_SPOT_BALANCE, METHOD_SPOT_BALANCES, METHOD_SPOT_CANCEL_ORDER,
            METHOD_SPOT_CANCEL_ORDERS, METHOD_SPOT_FEE, METHOD_SPOT_FEES, METHOD_SPOT_GET_ORDERS,
            METHOD_SPOT_NEW_ORDER, METHOD_SPOT_NEW_ORDER_LIST, METHOD_SPOT_REPLACE_ORDER,
            is_private_method,
        },
        enums::CryptomarketCandlePeriod,
    },
    config::CryptomarketWsConfig,
};

const ROUTER_CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Deregisters a pending call when the caller stops waiting for its reply.
struct PendingCallGuard<'a> {
    dispatch: &'a DispatchTable,
    id: u64,
}

impl Drop for PendingCallGuard<'_> {
    fn drop(&mut self) {
        if self.dispatch.deregister_call(self.id) {
            tracing::trace!("Deregistered request ID {}", self.id);
        }
    }
}

/// WebSocket client for the CryptoMarket API.
#[derive(Debug)]
pub struct CryptomarketWebSocketClient {
    config: CryptomarketWsConfig,
    connection: ConnectionManager,
    dispatch: Arc<DispatchTable>,
    auth: AuthTracker,
    request_id: AtomicU64,
    router_task: Mutex<Option<JoinHandle<()>>>,
}

impl CryptomarketWebSocketClient {
    /// Connects to the configured endpoint.
    ///
    /// When credentials are configured the `login` handshake runs before this returns. A failed
    /// handshake leaves the client connected with [`AuthState::Failed`], so public operations
    /// remain available.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub async fn connect(config: CryptomarketWsConfig) -> CryptomarketWsResult<Self> {
        let connection = ConnectionManager::connect(&config).await?;
        let client = Self::from_connection(connection, config)?;

        if client.config.has_api_credentials() {
            match client.authenticate().await {
                Ok(()) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => tracing::warn!("Continuing unauthenticated: {e}"),
            }
        }

        Ok(client)
    }

    /// Creates a client over an established connection and starts its router.
    ///
    /// Does not authenticate; see [`Self::authenticate`].
    ///
    /// # Errors
    ///
    /// Returns [`CryptomarketWsError::ConnectionClosed`] if the connection's inbound queue was
    /// already taken.
    pub fn from_connection(
        connection: ConnectionManager,
        config: CryptomarketWsConfig,
    ) -> CryptomarketWsResult<Self> {
        let inbound = connection
            .take_receiver()
            .ok_or(CryptomarketWsError::ConnectionClosed)?;
        let dispatch = Arc::new(DispatchTable::new());
        let router = CryptomarketWsRouter::new(inbound, dispatch.clone());
        let router_task = tokio::spawn(router.run());

        Ok(Self {
            config,
            connection,
            dispatch,
            auth: AuthTracker::new(),
            request_id: AtomicU64::new(1),
            router_task: Mutex::new(Some(router_task)),
        })
    }

    /// Returns the client configuration.
    #[must_use]
    pub fn config(&self) -> &CryptomarketWsConfig {
        &self.config
    }

    /// Returns whether the connection accepts calls.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.connection.is_active() && self.dispatch.cancel_reason().is_none()
    }

    /// Returns the authentication state.
    #[must_use]
    pub fn auth_state(&self) -> AuthState {
        self.auth.state()
    }

    pub(crate) fn auth_tracker(&self) -> &AuthTracker {
        &self.auth
    }

    /// Runs the `login` handshake with the configured credentials.
    ///
    /// # Errors
    ///
    /// Returns [`CryptomarketWsError::MissingCredentials`] without credentials,
    /// [`CryptomarketWsError::AuthFailed`] if the venue rejects the login, or a transport
    /// error if the connection closes.
    pub async fn authenticate(&self) -> CryptomarketWsResult<()> {
        CryptomarketAuthenticator::from_config(&self.config)?
            .authenticate(self)
            .await
    }

    fn next_request_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::Relaxed)
    }

    #[cfg(test)]
    pub(crate) fn set_next_request_id(&self, id: u64) {
        self.request_id.store(id, Ordering::Relaxed);
    }

    /// Calls `method` and waits for its result using the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns the venue's error reply verbatim as [`CryptomarketWsError::Server`], or a local
    /// error if the call is gated, times out or the connection closes.
    pub async fn call(&self, method: &str, params: Value) -> CryptomarketWsResult<Value> {
        self.call_with_timeout(method, params, self.config.request_timeout())
            .await
    }

    /// Calls `method` and waits at most `timeout` for its result.
    ///
    /// # Errors
    ///
    /// See [`Self::call`].
    pub async fn call_with_timeout(
        &self,
        method: &str,
        params: Value,
        timeout: Duration,
    ) -> CryptomarketWsResult<Value> {
        let cancel = CancellationToken::new();
        self.call_with_cancel(method, params, Some(timeout), &cancel)
            .await
    }

    /// Calls `method`, giving up when `cancel` fires or the optional `timeout` elapses.
    ///
    /// A reply arriving after the caller gave up is discarded.
    ///
    /// # Errors
    ///
    /// Returns [`CryptomarketWsError::Cancelled`] or [`CryptomarketWsError::Timeout`] when the
    /// caller gives up, otherwise see [`Self::call`].
    pub async fn call_with_cancel(
        &self,
        method: &str,
        params: Value,
        timeout: Option<Duration>,
        cancel: &CancellationToken,
    ) -> CryptomarketWsResult<Value> {
        if is_private_method(method) {
            self.auth.ensure_ready()?;
        }
        self.dispatch_call(method, params, timeout, cancel).await
    }

    /// Calls `method` and decodes the result into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`CryptomarketWsError::Decode`] if the result does not match `T`, otherwise see
    /// [`Self::call`].
    pub async fn call_typed<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> CryptomarketWsResult<T> {
        let result = self.call(method, params).await?;
        serde_json::from_value(result).map_err(|e| {
            CryptomarketWsError::Decode(format!("unexpected result for {method}: {e}"))
        })
    }

    /// Calls `method` without the authentication gate.
    pub(crate) async fn call_unchecked(
        &self,
        method: &str,
        params: Value,
    ) -> CryptomarketWsResult<Value> {
        let cancel = CancellationToken::new();
        self.dispatch_call(method, params, Some(self.config.request_timeout()), &cancel)
            .await
    }

    async fn dispatch_call(
        &self,
        method: &str,
        params: Value,
        timeout: Option<Duration>,
        cancel: &CancellationToken,
    ) -> CryptomarketWsResult<Value> {
        let id = self.next_request_id();
        let reply_rx = self.dispatch.register_call(id)?;
        let _guard = PendingCallGuard {
            dispatch: &self.dispatch,
            id,
        };

        let request = CryptomarketWsRequest::new(id, method, params);
        let text = serde_json::to_string(&request)?;
        tracing::trace!("Sending {text}");
        self.connection.send(text).await?;

        let reply = async move {
            reply_rx
                .await
                .unwrap_or(Err(CryptomarketWsError::ConnectionClosed))
        };

        let deadline = async move {
            match timeout {
                Some(timeout) => tokio::time::timeout(timeout, reply)
                    .await
                    .unwrap_or_else(|_| {
                        Err(CryptomarketWsError::Timeout(format!(
                            "{method} (ID {id}) after {timeout:?}"
                        )))
                    }),
                None => reply.await,
            }
        };

        tokio::select! {
            () = cancel.cancelled() => {
                tracing::debug!("Call {method} (ID {id}) cancelled");
                Err(CryptomarketWsError::Cancelled)
            }
            outcome = deadline => outcome,
        }
    }

    /// Subscribes to the feed selected by `method` and returns its notification stream.
    ///
    /// The stream is registered before the request is sent, so a snapshot pushed ahead of the
    /// confirmation is not lost.
    ///
    /// # Errors
    ///
    /// Returns [`CryptomarketWsError::UnknownFeed`] if `method` subscribes to no known feed,
    /// [`CryptomarketWsError::InvalidParams`] if the topic cannot be derived from `params`,
    /// [`CryptomarketWsError::AlreadySubscribed`] if the topic is already subscribed, or the
    /// error of the subscribe call.
    pub async fn subscribe(
        &self,
        method: &str,
        params: Value,
    ) -> CryptomarketWsResult<NotificationStream> {
        let feed = CryptomarketWsFeed::from_subscribe_method(method)
            .ok_or_else(|| CryptomarketWsError::UnknownFeed(method.to_string()))?;
        let topic = feed.topic_key(&params)?;
        if feed.is_private() {
            self.auth.ensure_ready()?;
        }

        let stream = self
            .dispatch
            .register_subscription(&topic, self.config.subscription_buffer)?;

        let outcome = match self.call_unchecked(method, params).await {
            Ok(_) => match self.dispatch.activate_subscription(&topic) {
                SubscriptionState::Active | SubscriptionState::Overflowed => {
                    tracing::debug!("Subscribed to {topic}");
                    return Ok(stream);
                }
                state => {
                    tracing::debug!("Subscription to {topic} ended early ({state:?})");
                    CryptomarketWsError::NotSubscribed(topic.clone())
                }
            },
            Err(e) => {
                tracing::warn!("Failed to subscribe to {topic}: {e}");
                e
            }
        };

        self.dispatch.remove_subscription(&topic);
        Err(outcome)
    }

    /// Unsubscribes from the feed selected by `method`.
    ///
    /// Delivery for the topic stops before the request is sent. On confirmation the topic's
    /// stream ends once buffered notifications drain. If the call fails the subscription is
    /// restored to its prior state.
    ///
    /// # Errors
    ///
    /// Returns [`CryptomarketWsError::NotSubscribed`] without sending anything if the topic has
    /// no subscription or is already being unsubscribed, otherwise see [`Self::subscribe`].
    pub async fn unsubscribe(&self, method: &str, params: Value) -> CryptomarketWsResult<()> {
        let feed = CryptomarketWsFeed::from_unsubscribe_method(method)
            .ok_or_else(|| CryptomarketWsError::UnknownFeed(method.to_string()))?;
        let topic = feed.topic_key(&params)?;
        if self.dispatch.subscription_state(&topic) == SubscriptionState::Closed {
            return Err(CryptomarketWsError::NotSubscribed(topic));
        }
        if feed.is_private() {
            self.auth.ensure_ready()?;
        }

        let previous = self.dispatch.begin_unsubscribe(&topic)?;
        if let Err(e) = self.call_unchecked(method, params).await {
            self.dispatch.restore_subscription(&topic, previous);
            tracing::warn!("Failed to unsubscribe from {topic}: {e}");
            return Err(e);
        }

        self.dispatch.remove_subscription(&topic);
        tracing::debug!("Unsubscribed from {topic}");
        Ok(())
    }

    /// Returns the state of the subscription for `topic`.
    #[must_use]
    pub fn subscription_state(&self, topic: &str) -> SubscriptionState {
        self.dispatch.subscription_state(topic)
    }

    /// Subscribes to ticker notifications for `symbol`.
    ///
    /// # Errors
    ///
    /// See [`Self::subscribe`].
    pub async fn subscribe_ticker(
        &self,
        symbol: &str,
    ) -> CryptomarketWsResult<NotificationStream> {
        let feed = CryptomarketWsFeed::Ticker;
        self.subscribe(feed.subscribe_method(), symbol_params(symbol, None)?)
            .await
    }

    /// Unsubscribes from ticker notifications for `symbol`.
    ///
    /// # Errors
    ///
    /// See [`Self::unsubscribe`].
    pub async fn unsubscribe_ticker(&self, symbol: &str) -> CryptomarketWsResult<()> {
        let feed = CryptomarketWsFeed::Ticker;
        self.unsubscribe(feed.unsubscribe_method(), symbol_params(symbol, None)?)
            .await
    }

    /// Subscribes to order book snapshots and updates for `symbol`.
    ///
    /// # Errors
    ///
    /// See [`Self::subscribe`].
    pub async fn subscribe_orderbook(
        &self,
        symbol: &str,
    ) -> CryptomarketWsResult<NotificationStream> {
        let feed = CryptomarketWsFeed::Orderbook;
        self.subscribe(feed.subscribe_method(), symbol_params(symbol, None)?)
            .await
    }

    /// Unsubscribes from order book notifications for `symbol`.
    ///
    /// # Errors
    ///
    /// See [`Self::unsubscribe`].
    pub async fn unsubscribe_orderbook(&self, symbol: &str) -> CryptomarketWsResult<()> {
        let feed = CryptomarketWsFeed::Orderbook;
        self.unsubscribe(feed.unsubscribe_method(), symbol_params(symbol, None)?)
            .await
    }

    /// Subscribes to public trades for `symbol`, with an optional snapshot size.
    ///
    /// # Errors
    ///
    /// See [`Self::subscribe`].
    pub async fn subscribe_trades(
        &self,
        symbol: &str,
        limit: Option<u32>,
    ) -> CryptomarketWsResult<NotificationStream> {
        let feed = CryptomarketWsFeed::Trades;
        self.subscribe(feed.subscribe_method(), symbol_params(symbol, limit)?)
            .await
    }

    /// Unsubscribes from public trades for `symbol`.
    ///
    /// # Errors
    ///
    /// See [`Self::unsubscribe`].
    pub async fn unsubscribe_trades(&self, symbol: &str) -> CryptomarketWsResult<()> {
        let feed = CryptomarketWsFeed::Trades;
        self.unsubscribe(feed.unsubscribe_method(), symbol_params(symbol, None)?)
            .await
    }

    /// Subscribes to candles for `symbol` and `period`, with an optional snapshot size.
    ///
    /// # Errors
    ///
    /// See [`Self::subscribe`].
    pub async fn subscribe_candles(
        &self,
        symbol: &str,
        period: CryptomarketCandlePeriod,
        limit: Option<u32>,
    ) -> CryptomarketWsResult<NotificationStream> {
        let feed = CryptomarketWsFeed::Candles;
        self.subscribe(
            feed.subscribe_method(),
            candle_params(symbol, period, limit)?,
        )
        .await
    }

    /// Unsubscribes from candles for `symbol` and `period`.
    ///
    /// # Errors
    ///
    /// See [`Self::unsubscribe`].
    pub async fn unsubscribe_candles(
        &self,
        symbol: &str,
        period: CryptomarketCandlePeriod,
    ) -> CryptomarketWsResult<()> {
        let feed = CryptomarketWsFeed::Candles;
        self.unsubscribe(
            feed.unsubscribe_method(),
            candle_params(symbol, period, None)?,
        )
        .await
    }

    /// Subscribes to execution reports for the account's spot orders.
    ///
    /// The first notification carries the active orders, later ones each carry one report.
    ///
    /// # Errors
    ///
    /// See [`Self::subscribe`].
    pub async fn subscribe_reports(&self) -> CryptomarketWsResult<NotificationStream> {
        let feed = CryptomarketWsFeed::Reports;
        self.subscribe(feed.subscribe_method(), json!({})).await
    }

    /// Unsubscribes from execution reports.
    ///
    /// # Errors
    ///
    /// See [`Self::unsubscribe`].
    pub async fn unsubscribe_reports(&self) -> CryptomarketWsResult<()> {
        let feed = CryptomarketWsFeed::Reports;
        self.unsubscribe(feed.unsubscribe_method(), json!({})).await
    }

    /// Returns all spot trading balances.
    ///
    /// # Errors
    ///
    /// See [`Self::call_typed`].
    pub async fn get_spot_trading_balances(
        &self,
    ) -> CryptomarketWsResult<Vec<CryptomarketBalance>> {
        self.call_typed(METHOD_SPOT_BALANCES, json!({})).await
    }

    /// Returns the spot trading balance of `currency`.
    ///
    /// # Errors
    ///
    /// See [`Self::call_typed`].
    pub async fn get_spot_trading_balance(
        &self,
        currency: &str,
    ) -> CryptomarketWsResult<CryptomarketBalance> {
        self.call_typed(METHOD_SPOT_BALANCE, json!({ "currency": currency }))
            .await
    }

    /// Returns all active spot orders.
    ///
    /// # Errors
    ///
    /// See [`Self::call_typed`].
    pub async fn get_active_spot_orders(&self) -> CryptomarketWsResult<Vec<CryptomarketReport>> {
        self.call_typed(METHOD_SPOT_GET_ORDERS, json!({})).await
    }

    /// Creates a spot order.
    ///
    /// # Errors
    ///
    /// Returns [`CryptomarketWsError::InvalidParams`] if a required field is missing, otherwise
    /// see [`Self::call_typed`].
    pub async fn create_spot_order(
        &self,
        params: CreateSpotOrderParams,
    ) -> CryptomarketWsResult<CryptomarketReport> {
        let missing = params.missing_fields();
        if !missing.is_empty() {
            return Err(CryptomarketWsError::InvalidParams(format!(
                "missing {}",
                missing.join(", ")
            )));
        }
        self.call_typed(METHOD_SPOT_NEW_ORDER, to_params(&params)?)
            .await
    }

    /// Creates a list of contingent spot orders and returns a report for each order.
    ///
    /// # Errors
    ///
    /// Returns [`CryptomarketWsError::InvalidParams`] without sending anything if the list has
    /// no contingency type, no orders, or an order missing a required field. Otherwise see
    /// [`Self::call_typed`].
    pub async fn create_spot_order_list(
        &self,
        params: CreateSpotOrderListParams,
    ) -> CryptomarketWsResult<Vec<CryptomarketReport>> {
        let missing = params.missing_fields();
        if !missing.is_empty() {
            return Err(CryptomarketWsError::InvalidParams(format!(
                "missing {}",
                missing.join(", ")
            )));
        }
        self.call_typed(METHOD_SPOT_NEW_ORDER_LIST, to_params(&params)?)
            .await
    }

    /// Cancels the spot order with `client_order_id`.
    ///
    /// # Errors
    ///
    /// See [`Self::call_typed`].
    pub async fn cancel_spot_order(
        &self,
        client_order_id: &str,
    ) -> CryptomarketWsResult<CryptomarketReport> {
        self.call_typed(
            METHOD_SPOT_CANCEL_ORDER,
            json!({ "client_order_id": client_order_id }),
        )
        .await
    }

    /// Cancels every active spot order.
    ///
    /// # Errors
    ///
    /// See [`Self::call_typed`].
    pub async fn cancel_all_spot_orders(&self) -> CryptomarketWsResult<Vec<CryptomarketReport>> {
        self.call_typed(METHOD_SPOT_CANCEL_ORDERS, json!({})).await
    }

    /// Replaces a spot order with a new quantity and price.
    ///
    /// # Errors
    ///
    /// See [`Self::call_typed`].
    pub async fn replace_spot_order(
        &self,
        params: ReplaceSpotOrderParams,
    ) -> CryptomarketWsResult<CryptomarketReport> {
        self.call_typed(METHOD_SPOT_REPLACE_ORDER, to_params(&params)?)
            .await
    }

    /// Returns the account's commission rates for every symbol.
    ///
    /// # Errors
    ///
    /// See [`Self::call_typed`].
    pub async fn get_trading_commissions(
        &self,
    ) -> CryptomarketWsResult<Vec<CryptomarketTradingCommission>> {
        self.call_typed(METHOD_SPOT_FEES, json!({})).await
    }

    /// Returns the account's commission rates for `symbol`.
    ///
    /// # Errors
    ///
    /// See [`Self::call_typed`].
    pub async fn get_trading_commission(
        &self,
        symbol: &str,
    ) -> CryptomarketWsResult<CryptomarketTradingCommission> {
        self.call_typed(METHOD_SPOT_FEE, json!({ "symbol": symbol }))
            .await
    }

    /// Closes the connection.
    ///
    /// Every outstanding call fails with [`CryptomarketWsError::ConnectionClosed`] and every
    /// notification stream ends. Calling this more than once has no further effect.
    pub async fn close(&self) {
        self.connection.close().await;

        let router_task = self.router_task.lock().take();
        if let Some(mut handle) = router_task {
            if tokio::time::timeout(ROUTER_CLOSE_TIMEOUT, &mut handle)
                .await
                .is_err()
            {
                tracing::warn!("Router task did not complete within timeout, aborting");
                handle.abort();
            }
        }

        self.dispatch.cancel_all(CryptomarketWsError::ConnectionClosed);
    }
}

impl Drop for CryptomarketWebSocketClient {
    fn drop(&mut self) {
        if let Some(handle) = self.router_task.get_mut().take() {
            handle.abort();
        }
        self.dispatch.cancel_all(CryptomarketWsError::ConnectionClosed);
    }
}

fn to_params<T: Serialize>(params: &T) -> CryptomarketWsResult<Value> {
    Ok(serde_json::to_value(params)?)
}

fn symbol_params(symbol: &str, limit: Option<u32>) -> CryptomarketWsResult<Value> {
    to_params(&CryptomarketSymbolParams {
        symbol: symbol.to_string(),
        limit,
    })
}

fn candle_params(
    symbol: &str,
    period: CryptomarketCandlePeriod,
    limit: Option<u32>,
) -> CryptomarketWsResult<Value> {
    to_params(&CryptomarketCandleParams {
        symbol: symbol.to_string(),
        period: period.to_string(),
        limit,
    })
}

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

//! Router demultiplexing inbound messages into replies and notifications.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::{
    dispatch::DispatchTable,
    error::CryptomarketWsError,
    messages::{CryptomarketWsMessage, parse_raw_message},
    routes::push_route,
};

/// Consumes the inbound queue of one connection and routes each message.
#[derive(Debug)]
pub struct CryptomarketWsRouter {
    inbound: mpsc::Receiver<String>,
    dispatch: Arc<DispatchTable>,
}

impl CryptomarketWsRouter {
    /// Creates a new [`CryptomarketWsRouter`].
    #[must_use]
    pub fn new(inbound: mpsc::Receiver<String>, dispatch: Arc<DispatchTable>) -> Self {
        Self { inbound, dispatch }
    }

    /// Routes messages until the inbound queue ends, then cancels everything outstanding.
    pub async fn run(mut self) {
        while let Some(text) = self.inbound.recv().await {
            route_message(&self.dispatch, &text);
        }

        tracing::debug!("Inbound queue ended, cancelling outstanding operations");
        self.dispatch.cancel_all(CryptomarketWsError::ConnectionClosed);
    }
}

/// Routes a single raw message through `dispatch`.
///
/// Returns `true` if the message reached a caller or subscriber.
pub fn route_message(dispatch: &DispatchTable, text: &str) -> bool {
    match parse_raw_message(text) {
        Ok(CryptomarketWsMessage::Reply { id, outcome }) => dispatch.route_reply(id, outcome),
        Ok(CryptomarketWsMessage::Push { method, params }) => {
            let Some(route) = push_route(&method) else {
                tracing::warn!("Dropping notification with unknown method {method}");
                return false;
            };

            match route.feed.topic_key(&params) {
                Ok(topic) => dispatch.route_notification(&topic, &method, route.kind, params),
                Err(e) => {
                    tracing::warn!("Dropping {method} notification: {e}");
                    false
                }
            }
        }
        Ok(CryptomarketWsMessage::Error(error)) => {
            tracing::warn!(
                "Received error not tied to a request: {}",
                CryptomarketWsError::from(error)
            );
            false
        }
        Err(e) => {
            tracing::warn!("Dropping malformed message: {e}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;
    use crate::websocket::messages::NotificationKind;

    #[tokio::test]
    async fn test_routes_reply_to_pending_call() {
        let dispatch = DispatchTable::new();
        let rx = dispatch.register_call(1).unwrap();

        assert!(route_message(&dispatch, r#"{"id": 1, "result": [1, 2]}"#));
        assert_eq!(rx.await.unwrap(), Ok(json!([1, 2])));
    }

    #[tokio::test]
    async fn test_routes_push_by_topic() {
        let dispatch = DispatchTable::new();
        let mut stream = dispatch.register_subscription("candles:ETHBTC:M30", 4).unwrap();

        let text = json!({
            "method": "snapshot_candles",
            "params": {"symbol": "ETHBTC", "period": "M30", "data": []},
        })
        .to_string();

        assert!(route_message(&dispatch, &text));
        let notification = stream.recv().await.unwrap();
        assert_eq!(notification.kind, NotificationKind::Snapshot);
        assert_eq!(notification.method, "snapshot_candles");
    }

    #[rstest]
    #[case("garbage")]
    #[case(r#"{"method": "mystery", "params": {}}"#)]
    #[case(r#"{"method": "ticker", "params": {}}"#)]
    #[case(r#"{"method": "ticker", "params": {"symbol": "NOSUB"}}"#)]
    #[case(r#"{"id": 404, "result": true}"#)]
    #[case(r#"{"error": {"code": 2001, "message": "Symbol not found"}}"#)]
    fn test_unroutable_messages_are_dropped(#[case] text: &str) {
        let dispatch = DispatchTable::new();
        let _rx = dispatch.register_call(1).unwrap();

        assert!(!route_message(&dispatch, text));
        assert_eq!(dispatch.pending_calls(), 1);
    }

    #[tokio::test]
    async fn test_router_cancels_on_end_of_input() {
        let dispatch = Arc::new(DispatchTable::new());
        let (tx, rx) = mpsc::channel(4);
        let pending = dispatch.register_call(1).unwrap();
        let router = tokio::spawn(CryptomarketWsRouter::new(rx, dispatch.clone()).run());

        tx.send(r#"{"id": 2, "result": true}"#.to_string())
            .await
            .unwrap();
        drop(tx);
        router.await.unwrap();

        assert_eq!(
            pending.await.unwrap(),
            Err(CryptomarketWsError::ConnectionClosed)
        );
        assert!(dispatch.cancel_reason().is_some());
    }
}

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

//! In-memory transport for exercising the session without a socket.

use futures::{
    StreamExt,
    channel::mpsc::{UnboundedReceiver, UnboundedSender, unbounded},
};
use serde_json::Value;
use tokio_tungstenite::tungstenite::{self, Message};

use super::{client::CryptomarketWebSocketClient, connection::ConnectionManager};
use crate::config::CryptomarketWsConfig;

/// Far end of an in-memory connection.
#[derive(Debug)]
pub(crate) struct MockPeer {
    /// Messages written by the connection.
    pub outbound: UnboundedReceiver<Message>,
    /// Messages to be read by the connection.
    pub inbound: UnboundedSender<Result<Message, tungstenite::Error>>,
}

impl MockPeer {
    pub fn push(&self, msg: Message) {
        let _ = self.inbound.unbounded_send(Ok(msg));
    }

    pub fn push_text(&self, text: &str) {
        self.push(Message::Text(text.to_string().into()));
    }

    pub fn push_json(&self, value: &Value) {
        self.push_text(&value.to_string());
    }

    pub fn push_error(&self) {
        let _ = self
            .inbound
            .unbounded_send(Err(tungstenite::Error::ConnectionClosed));
    }

    pub async fn next(&mut self) -> Option<Message> {
        self.outbound.next().await
    }

    pub async fn next_text(&mut self) -> Option<String> {
        match self.next().await? {
            Message::Text(text) => Some(text.as_str().to_owned()),
            other => panic!("expected text message, was {other:?}"),
        }
    }

    /// Waits for the next outbound request and decodes it.
    pub async fn next_request(&mut self) -> Value {
        let text = self.next_text().await.expect("connection closed");
        serde_json::from_str(&text).expect("outbound message is not JSON")
    }

    /// Returns whether nothing has been written so far.
    pub fn nothing_written(&mut self) -> bool {
        self.outbound.try_recv().is_err()
    }
}

pub(crate) fn mock_connection() -> (ConnectionManager, MockPeer) {
    let (out_tx, out_rx) = unbounded::<Message>();
    let (in_tx, in_rx) = unbounded::<Result<Message, tungstenite::Error>>();

    let conn = ConnectionManager::from_parts(out_tx, in_rx, 64, 64);
    let peer = MockPeer {
        outbound: out_rx,
        inbound: in_tx,
    };
    (conn, peer)
}

/// Builds a client over an in-memory connection without authenticating.
pub(crate) fn mock_client(
    config: CryptomarketWsConfig,
) -> (CryptomarketWebSocketClient, MockPeer) {
    let (conn, peer) = mock_connection();
    let client = CryptomarketWebSocketClient::from_connection(conn, config)
        .expect("fresh connection has its receiver");
    (client, peer)
}

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

//! [NautilusTrader](http://nautilustrader.io) adapter for the
//! [CryptoMarket](https://www.cryptomkt.com) exchange WebSocket API.
//!
//! The `nautilus-cryptomarket` crate provides a persistent WebSocket session over the
//! CryptoMarket v3 JSON-RPC style API. A single connection carries:
//!
//! - Request/response calls correlated by client-generated request IDs.
//! - Push notifications for any number of independently subscribed feeds (tickers, order
//!   books, trades, candles and execution reports), each tagged as a snapshot or an update.
//! - An HMAC-SHA256 login handshake gating every private call.
//!
//! The connection may close at any time; every in-flight call then fails with
//! [`CryptomarketWsError::ConnectionClosed`](websocket::error::CryptomarketWsError) and every
//! notification stream ends. Reconnection is left to the caller.
//!
//! # Documentation
//!
//! - API reference: <https://api.exchange.cryptomkt.com/#socket-api-reference>

#![warn(rustc::all)]
#![deny(unsafe_code)]
#![deny(nonstandard_style)]
#![deny(missing_debug_implementations)]
#![deny(clippy::missing_errors_doc)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod common;
pub mod config;
pub mod websocket;

pub use crate::{
    config::CryptomarketWsConfig,
    websocket::{
        client::CryptomarketWebSocketClient,
        error::{CryptomarketWsError, CryptomarketWsResult},
        messages::{Notification, NotificationKind},
    },
};

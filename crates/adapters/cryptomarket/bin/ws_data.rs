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

//! Example binary demonstrating CryptoMarket WebSocket market data streaming.
//!
//! Connects to the public endpoint, subscribes to the ticker and order book of a symbol and
//! logs every notification until Ctrl+C.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p nautilus-cryptomarket --bin cryptomarket-ws-data -- ETHBTC
//! ```

use std::env;

use futures_util::StreamExt;
use nautilus_cryptomarket::{
    CryptomarketWebSocketClient, CryptomarketWsConfig, NotificationKind,
    common::enums::CryptomarketCandlePeriod,
};
use tokio::signal;
use tracing::level_filters::LevelFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::DEBUG)
        .init();

    let symbol = env::args().nth(1).unwrap_or_else(|| "ETHBTC".to_string());
    tracing::info!("Starting CryptoMarket WebSocket data example for {symbol}");

    let client = CryptomarketWebSocketClient::connect(CryptomarketWsConfig::public()).await?;

    let ticker = client.subscribe_ticker(&symbol).await?;
    let book = client.subscribe_orderbook(&symbol).await?;
    let candles = client
        .subscribe_candles(&symbol, CryptomarketCandlePeriod::Minute1, Some(10))
        .await?;

    let mut notifications = futures_util::stream::select_all([ticker, book, candles]);

    loop {
        tokio::select! {
            notification = notifications.next() => match notification {
                Some(notification) => {
                    let label = match notification.kind {
                        NotificationKind::Snapshot => "snapshot",
                        NotificationKind::Update => "update",
                    };
                    tracing::info!("{} {label}: {}", notification.topic, notification.payload);
                }
                None => {
                    tracing::warn!("All streams ended");
                    break;
                }
            },
            _ = signal::ctrl_c() => {
                tracing::info!("Received Ctrl+C, unsubscribing");
                client.unsubscribe_ticker(&symbol).await?;
                client.unsubscribe_orderbook(&symbol).await?;
                client
                    .unsubscribe_candles(&symbol, CryptomarketCandlePeriod::Minute1)
                    .await?;
                break;
            }
        }
    }

    client.close().await;
    Ok(())
}

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

//! Example binary demonstrating an authenticated CryptoMarket trading session.
//!
//! Logs in, prints spot balances and active orders, then streams execution reports until
//! Ctrl+C.
//!
//! # Environment Variables
//!
//! - `CRYPTOMARKET_API_KEY`: Your CryptoMarket API key
//! - `CRYPTOMARKET_API_SECRET`: Your CryptoMarket API secret
//!
//! # Usage
//!
//! ```bash
//! cargo run -p nautilus-cryptomarket --bin cryptomarket-ws-trading
//! ```

use futures_util::StreamExt;
use nautilus_cryptomarket::{
    CryptomarketWebSocketClient, CryptomarketWsConfig, websocket::auth::AuthState,
};
use tokio::signal;
use tracing::level_filters::LevelFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::DEBUG)
        .init();

    let config = CryptomarketWsConfig::trading_from_env();
    if !config.has_api_credentials() {
        anyhow::bail!("CRYPTOMARKET_API_KEY and CRYPTOMARKET_API_SECRET must be set");
    }

    let client = CryptomarketWebSocketClient::connect(config).await?;
    if client.auth_state() != AuthState::Authenticated {
        client.close().await;
        anyhow::bail!("Authentication failed: {:?}", client.auth_state());
    }

    for balance in client.get_spot_trading_balances().await? {
        tracing::info!(
            "{}: available={} reserved={}",
            balance.currency,
            balance.available,
            balance.reserved
        );
    }

    let orders = client.get_active_spot_orders().await?;
    tracing::info!("{} active order(s)", orders.len());

    let commissions = client.get_trading_commissions().await?;
    tracing::info!("Commission rates for {} symbol(s)", commissions.len());

    let mut reports = client.subscribe_reports().await?;

    loop {
        tokio::select! {
            report = reports.next() => match report {
                Some(report) => tracing::info!("{:?} {}: {}", report.kind, report.method, report.payload),
                None => {
                    tracing::warn!("Report stream ended");
                    break;
                }
            },
            _ = signal::ctrl_c() => {
                tracing::info!("Received Ctrl+C, unsubscribing");
                client.unsubscribe_reports().await?;
                break;
            }
        }
    }

    client.close().await;
    Ok(())
}

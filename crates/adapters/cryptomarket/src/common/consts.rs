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

//! Core constants for the CryptoMarket adapter.

/// Venue identifier string.
pub const CRYPTOMARKET: &str = "CRYPTOMARKET";

pub const CRYPTOMARKET_WS_HOST: &str = "api.exchange.cryptomkt.com";
pub const CRYPTOMARKET_WS_PUBLIC_URL: &str = "wss://api.exchange.cryptomkt.com/api/3/ws/public";
pub const CRYPTOMARKET_WS_TRADING_URL: &str = "wss://api.exchange.cryptomkt.com/api/3/ws/trading";

/// Environment variable holding the API key.
pub const CRYPTOMARKET_API_KEY_ENV: &str = "CRYPTOMARKET_API_KEY";

/// Environment variable holding the API secret.
pub const CRYPTOMARKET_API_SECRET_ENV: &str = "CRYPTOMARKET_API_SECRET";

/// Default login window in milliseconds.
pub const DEFAULT_LOGIN_WINDOW_MS: u64 = 10_000;

/// Maximum login window accepted by the venue.
pub const MAX_LOGIN_WINDOW_MS: u64 = 60_000;

/// Signature algorithm identifier sent with `login`.
pub const LOGIN_AUTH_TYPE: &str = "HS256";

// Authentication
pub const METHOD_LOGIN: &str = "login";

// Spot trading (private)
pub const METHOD_SPOT_BALANCES: &str = "spot_balances";
pub const METHOD_SPOT_BALANCE: &str = "spot_balance";
pub const METHOD_SPOT_GET_ORDERS: &str = "spot_get_orders";
pub const METHOD_SPOT_NEW_ORDER: &str = "spot_new_order";
pub const METHOD_SPOT_NEW_ORDER_LIST: &str = "spot_new_order_list";
pub const METHOD_SPOT_CANCEL_ORDER: &str = "spot_cancel_order";
pub const METHOD_SPOT_CANCEL_ORDERS: &str = "spot_cancel_orders";
pub const METHOD_SPOT_REPLACE_ORDER: &str = "spot_replace_order";
pub const METHOD_SPOT_FEES: &str = "spot_fees";
pub const METHOD_SPOT_FEE: &str = "spot_fee";
pub const METHOD_SPOT_SUBSCRIBE: &str = "spot_subscribe";
pub const METHOD_SPOT_UNSUBSCRIBE: &str = "spot_unsubscribe";

// Spot report notifications
pub const METHOD_SPOT_ORDERS: &str = "spot_orders";
pub const METHOD_SPOT_ORDER: &str = "spot_order";

// Public market data
pub const METHOD_SUBSCRIBE_TICKER: &str = "subscribe_ticker";
pub const METHOD_UNSUBSCRIBE_TICKER: &str = "unsubscribe_ticker";
pub const METHOD_SUBSCRIBE_ORDERBOOK: &str = "subscribe_orderbook";
pub const METHOD_UNSUBSCRIBE_ORDERBOOK: &str = "unsubscribe_orderbook";
pub const METHOD_SUBSCRIBE_TRADES: &str = "subscribe_trades";
pub const METHOD_UNSUBSCRIBE_TRADES: &str = "unsubscribe_trades";
pub const METHOD_SUBSCRIBE_CANDLES: &str = "subscribe_candles";
pub const METHOD_UNSUBSCRIBE_CANDLES: &str = "unsubscribe_candles";

// Public market data notifications
pub const METHOD_TICKER: &str = "ticker";
pub const METHOD_SNAPSHOT_ORDERBOOK: &str = "snapshot_orderbook";
pub const METHOD_UPDATE_ORDERBOOK: &str = "update_orderbook";
pub const METHOD_SNAPSHOT_TRADES: &str = "snapshot_trades";
pub const METHOD_UPDATE_TRADES: &str = "update_trades";
pub const METHOD_SNAPSHOT_CANDLES: &str = "snapshot_candles";
pub const METHOD_UPDATE_CANDLES: &str = "update_candles";

/// Methods which require an authenticated session.
pub const PRIVATE_METHODS: &[&str] = &[
    METHOD_SPOT_BALANCES,
    METHOD_SPOT_BALANCE,
    METHOD_SPOT_GET_ORDERS,
    METHOD_SPOT_NEW_ORDER,
    METHOD_SPOT_NEW_ORDER_LIST,
    METHOD_SPOT_CANCEL_ORDER,
    METHOD_SPOT_CANCEL_ORDERS,
    METHOD_SPOT_REPLACE_ORDER,
    METHOD_SPOT_FEES,
    METHOD_SPOT_FEE,
    METHOD_SPOT_SUBSCRIBE,
    METHOD_SPOT_UNSUBSCRIBE,
];

/// Returns whether `method` requires an authenticated session.
#[must_use]
pub fn is_private_method(method: &str) -> bool {
    PRIVATE_METHODS.contains(&method)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(METHOD_SPOT_NEW_ORDER, true)]
    #[case(METHOD_SPOT_NEW_ORDER_LIST, true)]
    #[case(METHOD_SPOT_SUBSCRIBE, true)]
    #[case(METHOD_SUBSCRIBE_TICKER, false)]
    #[case(METHOD_LOGIN, false)]
    #[case("unknown_method", false)]
    fn test_is_private_method(#[case] method: &str, #[case] expected: bool) {
        assert_eq!(is_private_method(method), expected);
    }
}

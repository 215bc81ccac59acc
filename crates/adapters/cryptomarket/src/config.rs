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

//! Configuration structures for the CryptoMarket WebSocket client.

use std::time::Duration;

use crate::common::{
    consts::{
        CRYPTOMARKET_API_KEY_ENV, CRYPTOMARKET_API_SECRET_ENV, CRYPTOMARKET_WS_PUBLIC_URL,
        CRYPTOMARKET_WS_TRADING_URL, DEFAULT_LOGIN_WINDOW_MS, MAX_LOGIN_WINDOW_MS,
    },
    credential::Credential,
};

/// Configuration for a CryptoMarket WebSocket session.
#[derive(Clone, Debug)]
pub struct CryptomarketWsConfig {
    /// Optional API key for the authenticated trading session.
    pub api_key: Option<String>,
    /// Optional API secret for the authenticated trading session.
    pub api_secret: Option<String>,
    /// Connect to the trading endpoint rather than the public one (default: false).
    pub is_trading: bool,
    /// Optional override for the WebSocket URL.
    pub base_url_ws: Option<String>,
    /// Login window in milliseconds, capped at 60 000 by the venue.
    pub login_window_ms: Option<u64>,
    /// Optional method used to request a server-issued login challenge.
    ///
    /// When unset the challenge is the local login timestamp.
    pub challenge_method: Option<String>,
    /// Default timeout for RPC calls in seconds.
    pub request_timeout_secs: u64,
    /// Timeout for establishing the connection in seconds.
    pub connect_timeout_secs: u64,
    /// Capacity of the outbound send queue.
    pub send_queue_capacity: usize,
    /// Capacity of the inbound receive queue.
    pub recv_queue_capacity: usize,
    /// Capacity of each subscription's notification stream; a subscriber this far behind has
    /// its stream ended.
    pub subscription_buffer: usize,
}

impl Default for CryptomarketWsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_secret: None,
            is_trading: false,
            base_url_ws: None,
            login_window_ms: Some(DEFAULT_LOGIN_WINDOW_MS),
            challenge_method: None,
            request_timeout_secs: 10,
            connect_timeout_secs: 10,
            send_queue_capacity: 1_024,
            recv_queue_capacity: 4_096,
            subscription_buffer: 1_024,
        }
    }
}

impl CryptomarketWsConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a public market data configuration.
    #[must_use]
    pub fn public() -> Self {
        Self::default()
    }

    /// Creates a trading configuration with the given credentials.
    #[must_use]
    pub fn trading(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            api_secret: Some(api_secret.into()),
            is_trading: true,
            ..Self::default()
        }
    }

    /// Creates a trading configuration reading credentials from the environment.
    ///
    /// Credentials are left unset when either variable is missing.
    #[must_use]
    pub fn trading_from_env() -> Self {
        Self {
            api_key: std::env::var(CRYPTOMARKET_API_KEY_ENV).ok(),
            api_secret: std::env::var(CRYPTOMARKET_API_SECRET_ENV).ok(),
            is_trading: true,
            ..Self::default()
        }
    }

    /// Returns `true` if both API key and secret are available.
    #[must_use]
    pub fn has_api_credentials(&self) -> bool {
        self.api_key.is_some() && self.api_secret.is_some()
    }

    /// Returns the credential built from the configured key and secret, if any.
    #[must_use]
    pub fn credential(&self) -> Option<Credential> {
        match (&self.api_key, &self.api_secret) {
            (Some(key), Some(secret)) => Some(Credential::new(key.clone(), secret.clone())),
            _ => None,
        }
    }

    /// Returns the WebSocket URL, considering overrides and the endpoint kind.
    #[must_use]
    pub fn ws_url(&self) -> String {
        self.base_url_ws.clone().unwrap_or_else(|| {
            if self.is_trading {
                CRYPTOMARKET_WS_TRADING_URL.to_string()
            } else {
                CRYPTOMARKET_WS_PUBLIC_URL.to_string()
            }
        })
    }

    /// Returns the login window, clamped to the venue maximum.
    #[must_use]
    pub fn login_window(&self) -> Option<u64> {
        self.login_window_ms
            .filter(|window| *window > 0)
            .map(|window| window.min(MAX_LOGIN_WINDOW_MS))
    }

    /// Returns the default RPC timeout.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Returns the connect timeout.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

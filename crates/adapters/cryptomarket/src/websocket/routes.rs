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

//! Static routing between method names, subscription feeds and topic keys.

use std::sync::LazyLock;

use ahash::AHashMap;
use serde_json::Value;
use strum::{AsRefStr, Display, EnumIter, IntoEnumIterator};

use super::{error::CryptomarketWsError, messages::NotificationKind};
use crate::common::consts::{
    METHOD_SNAPSHOT_CANDLES, METHOD_SNAPSHOT_ORDERBOOK, METHOD_SNAPSHOT_TRADES,
    METHOD_SPOT_ORDER, METHOD_SPOT_ORDERS, METHOD_SPOT_SUBSCRIBE, METHOD_SPOT_UNSUBSCRIBE,
    METHOD_SUBSCRIBE_CANDLES, METHOD_SUBSCRIBE_ORDERBOOK, METHOD_SUBSCRIBE_TICKER,
    METHOD_SUBSCRIBE_TRADES, METHOD_TICKER, METHOD_UNSUBSCRIBE_CANDLES,
    METHOD_UNSUBSCRIBE_ORDERBOOK, METHOD_UNSUBSCRIBE_TICKER, METHOD_UNSUBSCRIBE_TRADES,
    METHOD_UPDATE_CANDLES, METHOD_UPDATE_ORDERBOOK, METHOD_UPDATE_TRADES,
};

/// Subscription feeds offered over the WebSocket API.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash, AsRefStr, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum CryptomarketWsFeed {
    Ticker,
    Orderbook,
    Trades,
    Candles,
    Reports,
}

impl CryptomarketWsFeed {
    /// Returns the method which subscribes to this feed.
    #[must_use]
    pub const fn subscribe_method(self) -> &'static str {
        match self {
            Self::Ticker => METHOD_SUBSCRIBE_TICKER,
            Self::Orderbook => METHOD_SUBSCRIBE_ORDERBOOK,
            Self::Trades => METHOD_SUBSCRIBE_TRADES,
            Self::Candles => METHOD_SUBSCRIBE_CANDLES,
            Self::Reports => METHOD_SPOT_SUBSCRIBE,
        }
    }

    /// Returns the method which unsubscribes from this feed.
    #[must_use]
    pub const fn unsubscribe_method(self) -> &'static str {
        match self {
            Self::Ticker => METHOD_UNSUBSCRIBE_TICKER,
            Self::Orderbook => METHOD_UNSUBSCRIBE_ORDERBOOK,
            Self::Trades => METHOD_UNSUBSCRIBE_TRADES,
            Self::Candles => METHOD_UNSUBSCRIBE_CANDLES,
            Self::Reports => METHOD_SPOT_UNSUBSCRIBE,
        }
    }

    /// Returns whether the feed requires an authenticated session.
    #[must_use]
    pub const fn is_private(self) -> bool {
        matches!(self, Self::Reports)
    }

    /// Resolves the feed subscribed to by `method`.
    #[must_use]
    pub fn from_subscribe_method(method: &str) -> Option<Self> {
        Self::iter().find(|feed| feed.subscribe_method() == method)
    }

    /// Resolves the feed unsubscribed from by `method`.
    #[must_use]
    pub fn from_unsubscribe_method(method: &str) -> Option<Self> {
        Self::iter().find(|feed| feed.unsubscribe_method() == method)
    }

    /// Derives the topic key for this feed from request or notification params.
    ///
    /// # Errors
    ///
    /// Returns [`CryptomarketWsError::InvalidParams`] if a field identifying the topic is missing.
    pub fn topic_key(self, params: &Value) -> Result<String, CryptomarketWsError> {
        match self {
            Self::Ticker | Self::Orderbook | Self::Trades => {
                let symbol = required_str(params, "symbol")?;
                Ok(format!("{self}:{symbol}"))
            }
            Self::Candles => {
                let symbol = required_str(params, "symbol")?;
                let period = required_str(params, "period")?;
                Ok(format!("{self}:{symbol}:{period}"))
            }
            Self::Reports => Ok(self.to_string()),
        }
    }
}

fn required_str<'a>(params: &'a Value, field: &str) -> Result<&'a str, CryptomarketWsError> {
    params
        .get(field)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| CryptomarketWsError::InvalidParams(format!("missing `{field}`")))
}

/// Route for an inbound push method.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PushRoute {
    /// Feed the push belongs to.
    pub feed: CryptomarketWsFeed,
    /// Fixed notification kind, or `None` when the first push on a subscription is the snapshot.
    pub kind: Option<NotificationKind>,
}

static PUSH_ROUTES: LazyLock<AHashMap<&'static str, PushRoute>> = LazyLock::new(|| {
    use CryptomarketWsFeed::{Candles, Orderbook, Reports, Ticker, Trades};
    use NotificationKind::{Snapshot, Update};

    let entries = [
        (METHOD_TICKER, Ticker, None),
        (METHOD_SNAPSHOT_ORDERBOOK, Orderbook, Some(Snapshot)),
        (METHOD_UPDATE_ORDERBOOK, Orderbook, Some(Update)),
        (METHOD_SNAPSHOT_TRADES, Trades, Some(Snapshot)),
        (METHOD_UPDATE_TRADES, Trades, Some(Update)),
        (METHOD_SNAPSHOT_CANDLES, Candles, Some(Snapshot)),
        (METHOD_UPDATE_CANDLES, Candles, Some(Update)),
        (METHOD_SPOT_ORDERS, Reports, Some(Snapshot)),
        (METHOD_SPOT_ORDER, Reports, Some(Update)),
    ];

    entries
        .into_iter()
        .map(|(method, feed, kind)| (method, PushRoute { feed, kind }))
        .collect()
});

/// Looks up the route for a push method.
#[must_use]
pub fn push_route(method: &str) -> Option<PushRoute> {
    PUSH_ROUTES.get(method).copied()
}

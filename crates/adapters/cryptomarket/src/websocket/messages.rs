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

//! Data structures for CryptoMarket WebSocket messages.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::CryptomarketWsError;
use crate::common::enums::{
    CryptomarketContingencyType, CryptomarketOrderSide, CryptomarketOrderType,
    CryptomarketTimeInForce,
};

/// Outbound request envelope.
#[derive(Debug, Clone, Serialize)]
pub struct CryptomarketWsRequest<'a, T> {
    /// Method name.
    pub method: &'a str,
    /// Method-specific parameters.
    pub params: T,
    /// Request ID for correlation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
}

impl<'a, T> CryptomarketWsRequest<'a, T> {
    /// Creates a new request expecting exactly one reply.
    #[must_use]
    pub fn new(id: u64, method: &'a str, params: T) -> Self {
        Self {
            method,
            params,
            id: Some(id),
        }
    }
}

/// Error object carried by an error reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CryptomarketWsRpcError {
    /// Error code.
    pub code: i64,
    /// Error message.
    pub message: String,
    /// Additional error description.
    #[serde(default)]
    pub description: String,
}

impl From<CryptomarketWsRpcError> for CryptomarketWsError {
    fn from(error: CryptomarketWsRpcError) -> Self {
        Self::Server {
            code: error.code,
            message: error.message,
            description: error.description,
        }
    }
}

/// Outcome delivered to the caller of a single call.
pub type CallOutcome = Result<Value, CryptomarketWsError>;

/// Inbound message classified by the router.
#[derive(Debug, Clone, PartialEq)]
pub enum CryptomarketWsMessage {
    /// Reply to an outstanding call.
    Reply {
        /// Request ID being answered.
        id: u64,
        /// Result or error carried by the reply.
        outcome: CallOutcome,
    },
    /// Push notification for a subscribed feed.
    Push {
        /// Notification method name.
        method: String,
        /// Notification payload.
        params: Value,
    },
    /// Error not tied to any call.
    Error(CryptomarketWsRpcError),
}

/// Parses a raw text frame, reading only the fields needed for routing.
///
/// # Errors
///
/// Returns an error if the text is not a JSON object or carries neither an `id` nor a `method`.
pub fn parse_raw_message(text: &str) -> Result<CryptomarketWsMessage, CryptomarketWsError> {
    let value: Value = serde_json::from_str(text)?;
    let Value::Object(mut obj) = value else {
        return Err(CryptomarketWsError::Decode(
            "message is not a JSON object".to_string(),
        ));
    };

    if let Some(id) = obj.get("id").and_then(Value::as_u64) {
        let outcome = if let Some(error) = obj.remove("error") {
            match serde_json::from_value::<CryptomarketWsRpcError>(error) {
                Ok(error) => Err(error.into()),
                Err(e) => Err(CryptomarketWsError::Decode(format!(
                    "malformed error reply: {e}"
                ))),
            }
        } else if let Some(result) = obj.remove("result") {
            Ok(result)
        } else {
            Err(CryptomarketWsError::Decode(
                "reply carries neither result nor error".to_string(),
            ))
        };
        return Ok(CryptomarketWsMessage::Reply { id, outcome });
    }

    if let Some(Value::String(method)) = obj.remove("method") {
        let params = obj.remove("params").unwrap_or(Value::Null);
        return Ok(CryptomarketWsMessage::Push { method, params });
    }

    if let Some(error) = obj.remove("error") {
        let error = serde_json::from_value::<CryptomarketWsRpcError>(error)?;
        return Ok(CryptomarketWsMessage::Error(error));
    }

    Err(CryptomarketWsError::Decode(
        "message carries neither id nor method".to_string(),
    ))
}

/// Whether a notification carries full state or an incremental change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    /// Full current state for the topic.
    Snapshot,
    /// Incremental state for the topic.
    Update,
}

/// Notification delivered to a subscriber.
#[derive(Clone, Debug, PartialEq)]
pub struct Notification {
    /// Snapshot or update.
    pub kind: NotificationKind,
    /// Method name which delivered the notification.
    pub method: String,
    /// Topic key of the subscription.
    pub topic: String,
    /// Notification payload.
    pub payload: Value,
}

impl Notification {
    /// Returns whether this notification is a snapshot.
    #[must_use]
    pub fn is_snapshot(&self) -> bool {
        self.kind == NotificationKind::Snapshot
    }

    /// Decodes the payload into `T`.
    ///
    /// # Errors
    ///
    /// Returns a decode error if the payload does not match `T`.
    pub fn decode<T: serde::de::DeserializeOwned>(&self) -> Result<T, CryptomarketWsError> {
        serde_json::from_value(self.payload.clone())
            .map_err(|e| CryptomarketWsError::Decode(e.to_string()))
    }
}

/// Login request parameters.
#[derive(Clone, Debug, Serialize)]
pub struct CryptomarketLoginParams {
    /// Signature algorithm (`HS256`).
    #[serde(rename = "type")]
    pub auth_type: String,
    /// API key.
    pub api_key: String,
    /// Unix timestamp in milliseconds.
    pub timestamp: i64,
    /// Optional window in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window: Option<u64>,
    /// HMAC-SHA256 signature.
    pub signature: String,
    /// Server-issued challenge, when the challenge step requested one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub challenge: Option<String>,
}

/// Parameters for feeds keyed by a single symbol.
#[derive(Clone, Debug, Serialize)]
pub struct CryptomarketSymbolParams {
    /// Trading symbol.
    pub symbol: String,
    /// Optional snapshot size limit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

/// Parameters for candle feeds.
#[derive(Clone, Debug, Serialize)]
pub struct CryptomarketCandleParams {
    /// Trading symbol.
    pub symbol: String,
    /// Candle period.
    pub period: String,
    /// Optional snapshot size limit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

/// Parameters for creating a spot order.
#[derive(Clone, Debug, Default, Serialize)]
pub struct CreateSpotOrderParams {
    /// Trading symbol.
    pub symbol: String,
    /// Order side.
    pub side: Option<CryptomarketOrderSide>,
    /// Order quantity.
    pub quantity: String,
    /// Client order ID, generated by the venue when omitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_order_id: Option<String>,
    /// Order type (default limit).
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub order_type: Option<CryptomarketOrderType>,
    /// Time in force (default GTC).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_in_force: Option<CryptomarketTimeInForce>,
    /// Limit price.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    /// Stop price.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_price: Option<String>,
    /// Expiry for GTD orders.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expire_time: Option<String>,
    /// Reject rather than round prices and quantities.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strict_validate: Option<bool>,
    /// Cancel if the order would take liquidity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_only: Option<bool>,
    /// Taker fee markup.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub take_rate: Option<String>,
    /// Maker fee markup.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub make_rate: Option<String>,
}

impl CreateSpotOrderParams {
    /// Returns the names of required fields which are missing.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.symbol.is_empty() {
            missing.push("symbol");
        }
        if self.side.is_none() {
            missing.push("side");
        }
        if self.quantity.is_empty() {
            missing.push("quantity");
        }
        missing
    }
}

/// Parameters for creating a list of contingent spot orders.
#[derive(Clone, Debug, Default, Serialize)]
pub struct CreateSpotOrderListParams {
    /// Order list ID, generated by the venue when omitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_list_id: Option<String>,
    /// Contingency between the orders.
    pub contingency_type: Option<CryptomarketContingencyType>,
    /// Orders of the list, in placement order.
    pub orders: Vec<CreateSpotOrderParams>,
}

impl CreateSpotOrderListParams {
    /// Returns the names of required fields which are missing, including those of each order.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if self.contingency_type.is_none() {
            missing.push("contingency_type".to_string());
        }
        if self.orders.is_empty() {
            missing.push("orders".to_string());
        }
        for (i, order) in self.orders.iter().enumerate() {
            missing.extend(
                order
                    .missing_fields()
                    .into_iter()
                    .map(|field| format!("orders[{i}].{field}")),
            );
        }
        missing
    }
}

/// Parameters for replacing a spot order.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ReplaceSpotOrderParams {
    /// Client order ID of the order to replace.
    pub client_order_id: String,
    /// Client order ID for the replacement order.
    pub new_client_order_id: String,
    /// New order quantity.
    pub quantity: String,
    /// New order price.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    /// Reject rather than round prices and quantities.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strict_validate: Option<bool>,
}

/// Spot trading balance of one currency.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct CryptomarketBalance {
    /// Currency code.
    pub currency: String,
    /// Amount available for trading.
    pub available: String,
    /// Amount reserved by open orders.
    pub reserved: String,
}

/// Execution report for a spot order.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct CryptomarketReport {
    /// Venue order ID.
    pub id: i64,
    /// Client order ID.
    pub client_order_id: String,
    /// Trading symbol.
    pub symbol: String,
    /// Order side.
    pub side: CryptomarketOrderSide,
    /// Order status.
    pub status: String,
    /// Order type.
    #[serde(rename = "type")]
    pub order_type: CryptomarketOrderType,
    /// Time in force.
    pub time_in_force: CryptomarketTimeInForce,
    /// Order quantity.
    pub quantity: String,
    /// Executed quantity.
    #[serde(default)]
    pub quantity_cumulative: String,
    /// Limit price.
    #[serde(default)]
    pub price: Option<String>,
    /// Report type (`new`, `trade`, `canceled` and so on).
    #[serde(default)]
    pub report_type: Option<String>,
    /// Creation timestamp.
    pub created_at: String,
    /// Last update timestamp.
    pub updated_at: String,
}

/// Trading commission rates for one symbol.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct CryptomarketTradingCommission {
    /// Trading symbol.
    pub symbol: String,
    /// Taker fee rate.
    pub take_rate: String,
    /// Maker fee rate.
    pub make_rate: String,
}

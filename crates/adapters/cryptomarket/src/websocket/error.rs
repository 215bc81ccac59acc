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

//! CryptoMarket WebSocket client error types.

use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Error types for the CryptoMarket WebSocket client.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CryptomarketWsError {
    /// The transport could not be established.
    #[error("Connect error: {0}")]
    Connect(String),
    /// Transport-level failure on an established connection.
    #[error("Transport error: {0}")]
    Transport(String),
    /// The connection is closed or shutting down.
    #[error("Connection closed")]
    ConnectionClosed,
    /// Error reply returned by the venue for a specific call.
    #[error("CryptoMarket error {code}: {message} ({description})")]
    Server {
        /// The error code from the venue.
        code: i64,
        /// The error message from the venue.
        message: String,
        /// The error description from the venue.
        description: String,
    },
    /// A reply or result could not be decoded into the expected shape.
    #[error("Decode error: {0}")]
    Decode(String),
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(String),
    /// The call did not complete before its deadline.
    #[error("Timeout: {0}")]
    Timeout(String),
    /// The call was cancelled by the caller.
    #[error("Cancelled")]
    Cancelled,
    /// A private operation was attempted before authentication completed.
    #[error("Authentication not ready")]
    AuthNotReady,
    /// Authentication failed; private operations are unavailable on this connection.
    #[error("Authentication failed: {0}")]
    AuthFailed(String),
    /// Authentication was requested without API credentials.
    #[error("Missing API credentials")]
    MissingCredentials,
    /// The request ID is already registered for an outstanding call.
    #[error("Duplicate request ID: {0}")]
    DuplicateId(u64),
    /// The topic already has an active subscription.
    #[error("Already subscribed: {0}")]
    AlreadySubscribed(String),
    /// The topic has no subscription to remove.
    #[error("Not subscribed: {0}")]
    NotSubscribed(String),
    /// The method does not name a known subscription feed.
    #[error("Unknown feed: {0}")]
    UnknownFeed(String),
    /// The parameters lack what is needed to identify the topic.
    #[error("Invalid params: {0}")]
    InvalidParams(String),
}

impl CryptomarketWsError {
    /// Returns whether this error ends the connection rather than a single operation.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Connect(_) | Self::Transport(_) | Self::ConnectionClosed
        )
    }
}

impl From<tungstenite::Error> for CryptomarketWsError {
    fn from(error: tungstenite::Error) -> Self {
        Self::Transport(error.to_string())
    }
}

impl From<serde_json::Error> for CryptomarketWsError {
    fn from(error: serde_json::Error) -> Self {
        Self::Json(error.to_string())
    }
}

/// Result type alias for CryptoMarket WebSocket operations.
pub type CryptomarketWsResult<T> = Result<T, CryptomarketWsError>;

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

//! Authentication state tracking and the `login` handshake.

use std::sync::atomic::{AtomicU8, Ordering};

use parking_lot::Mutex;
use serde_json::{Value, json};

use super::{
    client::CryptomarketWebSocketClient,
    error::{CryptomarketWsError, CryptomarketWsResult},
    messages::CryptomarketLoginParams,
};
use crate::{
    common::{
        consts::{LOGIN_AUTH_TYPE, METHOD_LOGIN},
        credential::{Credential, login_payload},
    },
    config::CryptomarketWsConfig,
};

/// Authentication state of a session.
///
/// States only move forward; `Authenticated` and `Failed` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum AuthState {
    Unauthenticated = 0,
    ChallengeIssued = 1,
    Authenticated = 2,
    Failed = 3,
}

impl AuthState {
    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Unauthenticated,
            1 => Self::ChallengeIssued,
            2 => Self::Authenticated,
            _ => Self::Failed,
        }
    }
}

/// Tracks the authentication state of one connection.
#[derive(Debug)]
pub struct AuthTracker {
    state: AtomicU8,
    failure: Mutex<Option<String>>,
}

impl Default for AuthTracker {
    fn default() -> Self {
        Self {
            state: AtomicU8::new(AuthState::Unauthenticated as u8),
            failure: Mutex::new(None),
        }
    }
}

impl AuthTracker {
    /// Creates a new unauthenticated tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> AuthState {
        AuthState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn transition(&self, from: AuthState, to: AuthState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Records that the challenge has been obtained.
    ///
    /// Returns `false` if the tracker was not unauthenticated.
    pub fn issue_challenge(&self) -> bool {
        self.transition(AuthState::Unauthenticated, AuthState::ChallengeIssued)
    }

    /// Records a successful login.
    ///
    /// Returns `false` unless a challenge was outstanding.
    pub fn succeed(&self) -> bool {
        self.transition(AuthState::ChallengeIssued, AuthState::Authenticated)
    }

    /// Records a failed handshake. Has no effect once a terminal state was reached.
    pub fn fail(&self, reason: impl Into<String>) -> bool {
        let reason = reason.into();
        for from in [AuthState::Unauthenticated, AuthState::ChallengeIssued] {
            if self.transition(from, AuthState::Failed) {
                tracing::warn!("Authentication failed: {reason}");
                *self.failure.lock() = Some(reason);
                return true;
            }
        }
        false
    }

    /// Returns the reason the handshake failed, if it has.
    #[must_use]
    pub fn failure_reason(&self) -> Option<String> {
        self.failure.lock().clone()
    }

    /// Checks that private operations may proceed.
    ///
    /// # Errors
    ///
    /// Returns [`CryptomarketWsError::AuthNotReady`] until the login succeeds and
    /// [`CryptomarketWsError::AuthFailed`] once it has failed.
    pub fn ensure_ready(&self) -> CryptomarketWsResult<()> {
        match self.state() {
            AuthState::Authenticated => Ok(()),
            AuthState::Failed => Err(CryptomarketWsError::AuthFailed(
                self.failure_reason().unwrap_or_default(),
            )),
            AuthState::Unauthenticated | AuthState::ChallengeIssued => {
                Err(CryptomarketWsError::AuthNotReady)
            }
        }
    }
}

/// Login challenge to be signed.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Challenge {
    timestamp: i64,
    nonce: Option<String>,
}

/// Performs the `login` handshake for a session.
#[derive(Debug)]
pub struct CryptomarketAuthenticator {
    credential: Credential,
    window: Option<u64>,
    challenge_method: Option<String>,
}

impl CryptomarketAuthenticator {
    /// Creates a new [`CryptomarketAuthenticator`].
    #[must_use]
    pub fn new(
        credential: Credential,
        window: Option<u64>,
        challenge_method: Option<String>,
    ) -> Self {
        Self {
            credential,
            window,
            challenge_method,
        }
    }

    /// Creates an authenticator from the configured credentials.
    ///
    /// # Errors
    ///
    /// Returns [`CryptomarketWsError::MissingCredentials`] if the key or secret is missing.
    pub fn from_config(config: &CryptomarketWsConfig) -> CryptomarketWsResult<Self> {
        let credential = config
            .credential()
            .ok_or(CryptomarketWsError::MissingCredentials)?;
        Ok(Self::new(
            credential,
            config.login_window(),
            config.challenge_method.clone(),
        ))
    }

    /// Runs the handshake over `client`, updating its [`AuthTracker`].
    ///
    /// # Errors
    ///
    /// Returns [`CryptomarketWsError::AuthFailed`] if the challenge or the login is rejected,
    /// or the transport error if the connection closes mid-handshake.
    pub async fn authenticate(
        &self,
        client: &CryptomarketWebSocketClient,
    ) -> CryptomarketWsResult<()> {
        let tracker = client.auth_tracker();
        tracing::debug!(
            "Authenticating with API key {}",
            self.credential.masked_api_key()
        );

        let challenge = match self.obtain_challenge(client).await {
            Ok(challenge) => challenge,
            Err(e) => return Err(fail(tracker, e)),
        };

        if !tracker.issue_challenge() {
            return tracker.ensure_ready();
        }

        let mut message = login_payload(challenge.timestamp, self.window);
        if let Some(nonce) = &challenge.nonce {
            message.push_str(nonce);
        }

        let params = CryptomarketLoginParams {
            auth_type: LOGIN_AUTH_TYPE.to_string(),
            api_key: self.credential.api_key().to_string(),
            timestamp: challenge.timestamp,
            window: self.window,
            signature: self.credential.sign(&message),
            challenge: challenge.nonce,
        };
        let params = serde_json::to_value(params)?;

        match client.call_unchecked(METHOD_LOGIN, params).await {
            Ok(Value::Bool(false)) => Err(fail(
                tracker,
                CryptomarketWsError::AuthFailed("login rejected".to_string()),
            )),
            Ok(_) => {
                tracker.succeed();
                tracing::info!("Authenticated");
                Ok(())
            }
            Err(e) => Err(fail(tracker, e)),
        }
    }

    async fn obtain_challenge(
        &self,
        client: &CryptomarketWebSocketClient,
    ) -> CryptomarketWsResult<Challenge> {
        let local_timestamp = chrono::Utc::now().timestamp_millis();

        let Some(method) = &self.challenge_method else {
            return Ok(Challenge {
                timestamp: local_timestamp,
                nonce: None,
            });
        };

        let result = client.call_unchecked(method, json!({})).await?;
        parse_challenge(&result, local_timestamp)
    }
}

fn parse_challenge(result: &Value, local_timestamp: i64) -> CryptomarketWsResult<Challenge> {
    match result {
        Value::String(nonce) => Ok(Challenge {
            timestamp: local_timestamp,
            nonce: Some(nonce.clone()),
        }),
        Value::Object(obj) => {
            let nonce = obj
                .get("challenge")
                .and_then(Value::as_str)
                .map(ToString::to_string);
            let timestamp = obj
                .get("timestamp")
                .and_then(Value::as_i64)
                .unwrap_or(local_timestamp);
            Ok(Challenge { timestamp, nonce })
        }
        other => Err(CryptomarketWsError::Decode(format!(
            "unexpected challenge result: {other}"
        ))),
    }
}

fn fail(tracker: &AuthTracker, error: CryptomarketWsError) -> CryptomarketWsError {
    match error {
        // Leave the tracker alone when the connection dies mid-handshake
        CryptomarketWsError::ConnectionClosed | CryptomarketWsError::Transport(_) => error,
        other => {
            let reason = other.to_string();
            tracker.fail(reason.clone());
            CryptomarketWsError::AuthFailed(reason)
        }
    }
}

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

//! Registry of outstanding calls and active subscriptions for one connection.
//!
//! Every inbound reply and notification is routed through the [`DispatchTable`]. Replies are
//! matched to the pending call by request ID and delivered exactly once. Notifications are
//! matched to a subscription by topic key and delivered in arrival order.
//!
//! Each subscription owns a bounded channel which the router fills without waiting. When a
//! subscriber falls so far behind that its channel is full, that subscription alone moves to
//! [`SubscriptionState::Overflowed`]: its stream ends after yielding what was buffered and
//! reports [`NotificationStream::is_overflowed`], while every other topic keeps flowing.

use std::{
    pin::Pin,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    task::{Context, Poll},
};

use ahash::AHashMap;
use futures_util::Stream;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{
    mpsc::{self, error::TrySendError},
    oneshot,
};

use super::{
    error::{CryptomarketWsError, CryptomarketWsResult},
    messages::{CallOutcome, Notification, NotificationKind},
};

/// Lifecycle state of a subscription slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubscriptionState {
    /// Registered, awaiting confirmation of the subscribe call.
    Pending,
    /// Confirmed by the venue.
    Active,
    /// Unsubscribe in flight; notifications are dropped.
    Closing,
    /// The subscriber fell behind and its stream was ended; notifications are dropped.
    Overflowed,
    /// Removed or never registered.
    Closed,
}

/// Stream of notifications for a single subscribed topic.
///
/// Ends when the topic is unsubscribed, the subscriber overflows its buffer, or the connection
/// closes.
#[derive(Debug)]
pub struct NotificationStream {
    topic: String,
    rx: mpsc::Receiver<Notification>,
    overflowed: Arc<AtomicBool>,
}

impl NotificationStream {
    /// Returns the topic key of this stream.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Returns whether the stream was ended because its buffer filled up.
    #[must_use]
    pub fn is_overflowed(&self) -> bool {
        self.overflowed.load(Ordering::Acquire)
    }

    /// Receives the next notification, or `None` once the stream has ended.
    pub async fn recv(&mut self) -> Option<Notification> {
        self.rx.recv().await
    }
}

impl Stream for NotificationStream {
    type Item = Notification;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

#[derive(Debug)]
struct SubscriptionSlot {
    state: SubscriptionState,
    tx: Option<mpsc::Sender<Notification>>,
    delivered: bool,
    overflowed: Arc<AtomicBool>,
}

#[derive(Debug, Default)]
struct DispatchInner {
    calls: AHashMap<u64, oneshot::Sender<CallOutcome>>,
    subscriptions: AHashMap<String, SubscriptionSlot>,
    cancelled: Option<CryptomarketWsError>,
}

/// Concurrency-safe registry of pending calls and subscriptions.
#[derive(Debug, Default)]
pub struct DispatchTable {
    inner: Mutex<DispatchInner>,
}

impl DispatchTable {
    /// Creates a new empty [`DispatchTable`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a pending call and returns the receiver for its single reply.
    ///
    /// # Errors
    ///
    /// Returns [`CryptomarketWsError::DuplicateId`] if `id` is already outstanding, or
    /// [`CryptomarketWsError::ConnectionClosed`] once the table has been cancelled.
    pub fn register_call(&self, id: u64) -> CryptomarketWsResult<oneshot::Receiver<CallOutcome>> {
        let mut inner = self.inner.lock();
        if inner.cancelled.is_some() {
            return Err(CryptomarketWsError::ConnectionClosed);
        }
        if inner.calls.contains_key(&id) {
            return Err(CryptomarketWsError::DuplicateId(id));
        }

        let (tx, rx) = oneshot::channel();
        inner.calls.insert(id, tx);
        Ok(rx)
    }

    /// Removes a pending call without delivering anything.
    ///
    /// Returns `true` if the call was still outstanding.
    pub fn deregister_call(&self, id: u64) -> bool {
        self.inner.lock().calls.remove(&id).is_some()
    }

    /// Delivers a reply to the call registered under `id` and retires the ID.
    ///
    /// Returns `false` if no call is registered under `id`.
    pub fn route_reply(&self, id: u64, outcome: CallOutcome) -> bool {
        let Some(tx) = self.inner.lock().calls.remove(&id) else {
            tracing::debug!("Dropping reply for unknown request ID {id}");
            return false;
        };

        if tx.send(outcome).is_err() {
            tracing::trace!("Caller for request ID {id} went away before the reply");
        }
        true
    }

    /// Registers a subscription slot in the pending state.
    ///
    /// At most `capacity` notifications are buffered for the subscriber.
    ///
    /// # Errors
    ///
    /// Returns [`CryptomarketWsError::AlreadySubscribed`] if the topic already has a slot, or
    /// [`CryptomarketWsError::ConnectionClosed`] once the table has been cancelled.
    pub fn register_subscription(
        &self,
        topic: &str,
        capacity: usize,
    ) -> CryptomarketWsResult<NotificationStream> {
        let mut inner = self.inner.lock();
        if inner.cancelled.is_some() {
            return Err(CryptomarketWsError::ConnectionClosed);
        }
        if inner.subscriptions.contains_key(topic) {
            return Err(CryptomarketWsError::AlreadySubscribed(topic.to_string()));
        }

        let (tx, rx) = mpsc::channel(capacity.max(1));
        let overflowed = Arc::new(AtomicBool::new(false));

        inner.subscriptions.insert(
            topic.to_string(),
            SubscriptionSlot {
                state: SubscriptionState::Pending,
                tx: Some(tx),
                delivered: false,
                overflowed: overflowed.clone(),
            },
        );

        Ok(NotificationStream {
            topic: topic.to_string(),
            rx,
            overflowed,
        })
    }

    /// Marks a pending subscription as confirmed and returns the resulting state.
    ///
    /// Only a pending slot becomes active. A slot which overflowed, is being unsubscribed or was
    /// removed in the meantime keeps its state, with [`SubscriptionState::Closed`] meaning no
    /// slot exists.
    pub fn activate_subscription(&self, topic: &str) -> SubscriptionState {
        match self.inner.lock().subscriptions.get_mut(topic) {
            Some(slot) => {
                if slot.state == SubscriptionState::Pending {
                    slot.state = SubscriptionState::Active;
                }
                slot.state
            }
            None => SubscriptionState::Closed,
        }
    }

    /// Stops delivery for a topic ahead of its unsubscribe call and returns the prior state.
    ///
    /// # Errors
    ///
    /// Returns [`CryptomarketWsError::NotSubscribed`] if the topic has no slot or is already
    /// being unsubscribed.
    pub fn begin_unsubscribe(&self, topic: &str) -> CryptomarketWsResult<SubscriptionState> {
        let mut inner = self.inner.lock();
        match inner.subscriptions.get_mut(topic) {
            Some(slot) if slot.state != SubscriptionState::Closing => {
                let previous = slot.state;
                slot.state = SubscriptionState::Closing;
                Ok(previous)
            }
            _ => Err(CryptomarketWsError::NotSubscribed(topic.to_string())),
        }
    }

    /// Returns a closing slot to `state` after its unsubscribe call failed.
    ///
    /// Returns `false` if the topic has no closing slot.
    pub fn restore_subscription(&self, topic: &str, state: SubscriptionState) -> bool {
        match self.inner.lock().subscriptions.get_mut(topic) {
            Some(slot) if slot.state == SubscriptionState::Closing => {
                slot.state = state;
                true
            }
            _ => false,
        }
    }

    /// Removes a subscription slot, ending its stream once buffered notifications drain.
    ///
    /// Returns `true` if a slot was removed.
    pub fn remove_subscription(&self, topic: &str) -> bool {
        self.inner.lock().subscriptions.remove(topic).is_some()
    }

    /// Returns the state of the subscription for `topic`.
    #[must_use]
    pub fn subscription_state(&self, topic: &str) -> SubscriptionState {
        self.inner
            .lock()
            .subscriptions
            .get(topic)
            .map_or(SubscriptionState::Closed, |slot| slot.state)
    }

    /// Delivers a notification to the subscription for `topic` without waiting.
    ///
    /// When `kind` is `None` the first notification on the slot is tagged as the snapshot and
    /// later ones as updates. Returns `false` if the notification was dropped: the topic has no
    /// slot, is closing or overflowed, or the subscriber's buffer just filled up.
    pub fn route_notification(
        &self,
        topic: &str,
        method: &str,
        kind: Option<NotificationKind>,
        payload: Value,
    ) -> bool {
        let mut inner = self.inner.lock();
        let Some(slot) = inner.subscriptions.get_mut(topic) else {
            tracing::trace!("Dropping {method} notification for unsubscribed topic {topic}");
            return false;
        };

        if matches!(
            slot.state,
            SubscriptionState::Closing | SubscriptionState::Overflowed
        ) {
            tracing::trace!("Dropping {method} notification for {topic} ({:?})", slot.state);
            return false;
        }

        let Some(tx) = &slot.tx else {
            return false;
        };

        let kind = kind.unwrap_or(if slot.delivered {
            NotificationKind::Update
        } else {
            NotificationKind::Snapshot
        });

        let notification = Notification {
            kind,
            method: method.to_string(),
            topic: topic.to_string(),
            payload,
        };

        match tx.try_send(notification) {
            Ok(()) => {
                slot.delivered = true;
                true
            }
            Err(TrySendError::Full(_)) => {
                tracing::warn!("Subscriber for {topic} fell behind, ending its stream");
                slot.state = SubscriptionState::Overflowed;
                slot.overflowed.store(true, Ordering::Release);
                slot.tx = None;
                false
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!("Dropping {method} notification, stream for {topic} was dropped");
                false
            }
        }
    }

    /// Fails every pending call with `reason` and closes every subscription stream.
    ///
    /// Only the first invocation has any effect. Afterwards registrations fail with
    /// [`CryptomarketWsError::ConnectionClosed`].
    pub fn cancel_all(&self, reason: CryptomarketWsError) {
        let (calls, subscriptions) = {
            let mut inner = self.inner.lock();
            if inner.cancelled.is_some() {
                return;
            }
            inner.cancelled = Some(reason.clone());
            (
                std::mem::take(&mut inner.calls),
                std::mem::take(&mut inner.subscriptions),
            )
        };

        tracing::debug!(
            "Cancelling {} pending call(s) and {} subscription(s): {reason}",
            calls.len(),
            subscriptions.len(),
        );

        for (_, tx) in calls {
            let _ = tx.send(Err(reason.clone()));
        }
        drop(subscriptions);
    }

    /// Returns the reason the table was cancelled, if it has been.
    #[must_use]
    pub fn cancel_reason(&self) -> Option<CryptomarketWsError> {
        self.inner.lock().cancelled.clone()
    }

    /// Returns the number of outstanding calls.
    #[must_use]
    pub fn pending_calls(&self) -> usize {
        self.inner.lock().calls.len()
    }

    /// Returns the number of registered subscriptions.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.inner.lock().subscriptions.len()
    }
}

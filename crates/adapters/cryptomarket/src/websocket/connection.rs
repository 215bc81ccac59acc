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

//! Connection manager owning the WebSocket transport.
//!
//! The transport is split into a writer task draining a bounded FIFO send queue and a reader
//! task forwarding inbound text payloads into a bounded receive queue. Both tasks share a
//! [`CancellationToken`]; whichever side fails first cancels it and the other side stops.
//! The receive queue closing is the connection-level failure signal for consumers.

use std::{
    fmt::Display,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU8, Ordering},
    },
    time::Duration,
};

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use parking_lot::Mutex;
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;

use super::error::{CryptomarketWsError, CryptomarketWsResult};
use crate::config::CryptomarketWsConfig;

const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Lifecycle mode of a connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionMode {
    /// Accepting sends and reading.
    Active = 0,
    /// Shutdown in progress.
    Disconnect = 1,
    /// Both loops have stopped.
    Closed = 2,
}

impl ConnectionMode {
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Active,
            1 => Self::Disconnect,
            _ => Self::Closed,
        }
    }
}

#[derive(Debug)]
enum WriterCommand {
    Send(Message),
    Close,
}

/// Owns the transport of one WebSocket session.
#[derive(Debug)]
pub struct ConnectionManager {
    send_tx: mpsc::Sender<WriterCommand>,
    recv_rx: Mutex<Option<mpsc::Receiver<String>>>,
    mode: Arc<AtomicU8>,
    closing: AtomicBool,
    cancel_token: CancellationToken,
    writer_task: Mutex<Option<JoinHandle<()>>>,
    reader_task: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionManager {
    /// Dials the configured URL and starts the connection loops.
    ///
    /// # Errors
    ///
    /// Returns [`CryptomarketWsError::Connect`] if the handshake fails or times out.
    pub async fn connect(config: &CryptomarketWsConfig) -> CryptomarketWsResult<Self> {
        let url = config.ws_url();
        tracing::debug!("Connecting to {url}");

        let (ws_stream, _response) =
            tokio::time::timeout(config.connect_timeout(), connect_async(url.as_str()))
                .await
                .map_err(|_| {
                    CryptomarketWsError::Connect(format!(
                        "timed out after {:?} connecting to {url}",
                        config.connect_timeout()
                    ))
                })?
                .map_err(|e| CryptomarketWsError::Connect(e.to_string()))?;

        tracing::info!("Connected to {url}");

        let (sink, stream) = ws_stream.split();
        Ok(Self::from_parts(
            sink,
            stream,
            config.send_queue_capacity,
            config.recv_queue_capacity,
        ))
    }

    /// Starts the connection loops over an already established sink and stream.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn from_parts<S, R, E>(
        sink: S,
        stream: R,
        send_queue_capacity: usize,
        recv_queue_capacity: usize,
    ) -> Self
    where
        S: Sink<Message> + Unpin + Send + 'static,
        S::Error: Display + Send + 'static,
        R: Stream<Item = Result<Message, E>> + Unpin + Send + 'static,
        E: Display + Send + 'static,
    {
        let (send_tx, send_rx) = mpsc::channel(send_queue_capacity.max(1));
        let (recv_tx, recv_rx) = mpsc::channel(recv_queue_capacity.max(1));
        let cancel_token = CancellationToken::new();

        let writer_task = tokio::spawn(run_writer(sink, send_rx, cancel_token.clone()));
        let reader_task = tokio::spawn(run_reader(stream, recv_tx, cancel_token.clone()));

        Self {
            send_tx,
            recv_rx: Mutex::new(Some(recv_rx)),
            mode: Arc::new(AtomicU8::new(ConnectionMode::Active.as_u8())),
            closing: AtomicBool::new(false),
            cancel_token,
            writer_task: Mutex::new(Some(writer_task)),
            reader_task: Mutex::new(Some(reader_task)),
        }
    }

    /// Returns the current connection mode.
    #[must_use]
    pub fn mode(&self) -> ConnectionMode {
        let mode = ConnectionMode::from_u8(self.mode.load(Ordering::Acquire));
        if mode == ConnectionMode::Active && self.cancel_token.is_cancelled() {
            return ConnectionMode::Disconnect;
        }
        mode
    }

    /// Returns whether the connection accepts sends.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.mode() == ConnectionMode::Active
    }

    /// Returns whether both loops have stopped following [`Self::close`].
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.mode() == ConnectionMode::Closed
    }

    /// Returns a token cancelled once either loop stops.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Takes the inbound message queue.
    ///
    /// Returns `None` after the first call. The queue ends when the transport closes.
    pub fn take_receiver(&self) -> Option<mpsc::Receiver<String>> {
        self.recv_rx.lock().take()
    }

    /// Enqueues a text payload for transmission, waiting for queue capacity.
    ///
    /// # Errors
    ///
    /// Returns [`CryptomarketWsError::ConnectionClosed`] once shutdown has begun or the writer
    /// has stopped.
    pub async fn send(&self, text: String) -> CryptomarketWsResult<()> {
        if !self.is_active() {
            return Err(CryptomarketWsError::ConnectionClosed);
        }

        self.send_tx
            .send(WriterCommand::Send(Message::Text(text.into())))
            .await
            .map_err(|_| CryptomarketWsError::ConnectionClosed)
    }

    /// Closes the connection.
    ///
    /// Queued messages are flushed before the close frame. Tasks which do not stop within the
    /// grace period are aborted. Calling this more than once has no further effect.
    pub async fn close(&self) {
        if self.closing.swap(true, Ordering::AcqRel) {
            return;
        }

        tracing::debug!("Closing connection");
        self.mode
            .store(ConnectionMode::Disconnect.as_u8(), Ordering::Release);

        if self.send_tx.send(WriterCommand::Close).await.is_err() {
            tracing::debug!("Writer already stopped");
        }

        let writer_task = self.writer_task.lock().take();
        if let Some(handle) = writer_task {
            await_or_abort("Writer", handle).await;
        }

        self.cancel_token.cancel();

        let reader_task = self.reader_task.lock().take();
        if let Some(handle) = reader_task {
            await_or_abort("Reader", handle).await;
        }

        self.mode.store(ConnectionMode::Closed.as_u8(), Ordering::Release);
        tracing::debug!("Connection closed");
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.cancel_token.cancel();
        if let Some(handle) = self.writer_task.get_mut().take() {
            handle.abort();
        }
        if let Some(handle) = self.reader_task.get_mut().take() {
            handle.abort();
        }
    }
}

async fn await_or_abort(name: &str, mut handle: JoinHandle<()>) {
    match tokio::time::timeout(CLOSE_TIMEOUT, &mut handle).await {
        Ok(_) => tracing::debug!("{name} task completed gracefully"),
        Err(_) => {
            tracing::warn!("{name} task did not complete within timeout, aborting");
            handle.abort();
        }
    }
}

async fn run_writer<S>(
    mut sink: S,
    mut send_rx: mpsc::Receiver<WriterCommand>,
    cancel_token: CancellationToken,
) where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    loop {
        let cmd = tokio::select! {
            () = cancel_token.cancelled() => break,
            cmd = send_rx.recv() => cmd,
        };

        match cmd {
            Some(WriterCommand::Send(msg)) => {
                if let Err(e) = sink.send(msg).await {
                    tracing::error!("Error writing to transport: {e}");
                    cancel_token.cancel();
                    break;
                }
            }
            Some(WriterCommand::Close) | None => {
                if let Err(e) = sink.send(Message::Close(None)).await {
                    tracing::debug!("Error sending close frame: {e}");
                }
                if let Err(e) = sink.close().await {
                    tracing::debug!("Error closing transport: {e}");
                }
                break;
            }
        }
    }

    tracing::debug!("Writer stopped");
}

async fn run_reader<R, E>(
    mut stream: R,
    recv_tx: mpsc::Sender<String>,
    cancel_token: CancellationToken,
) where
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    loop {
        let msg = tokio::select! {
            () = cancel_token.cancelled() => break,
            msg = stream.next() => msg,
        };

        let text = match msg {
            Some(Ok(Message::Text(text))) => text.as_str().to_owned(),
            Some(Ok(Message::Binary(data))) => match String::from_utf8(data.to_vec()) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!("Dropping non UTF-8 binary message: {e}");
                    continue;
                }
            },
            Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => continue,
            Some(Ok(Message::Close(frame))) => {
                tracing::debug!("Received close frame: {frame:?}");
                break;
            }
            Some(Err(e)) => {
                tracing::error!("Error reading from transport: {e}");
                break;
            }
            None => {
                tracing::debug!("Transport stream ended");
                break;
            }
        };

        tracing::trace!("Received {text}");

        let sent = tokio::select! {
            () = cancel_token.cancelled() => break,
            sent = recv_tx.send(text) => sent,
        };
        if sent.is_err() {
            tracing::debug!("Receive queue dropped");
            break;
        }
    }

    cancel_token.cancel();
    tracing::debug!("Reader stopped");
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::websocket::testing::mock_connection;

    #[rstest]
    #[case(ConnectionMode::Active)]
    #[case(ConnectionMode::Disconnect)]
    #[case(ConnectionMode::Closed)]
    fn test_connection_mode_round_trips_through_u8(#[case] mode: ConnectionMode) {
        assert_eq!(ConnectionMode::from_u8(mode.as_u8()), mode);
    }

    #[tokio::test]
    async fn test_sends_are_written_in_order() {
        let (conn, mut peer) = mock_connection();

        for i in 0..5 {
            conn.send(format!("msg-{i}")).await.unwrap();
        }

        for i in 0..5 {
            assert_eq!(peer.next_text().await.unwrap(), format!("msg-{i}"));
        }
    }

    #[tokio::test]
    async fn test_inbound_text_and_binary_are_forwarded() {
        let (conn, peer) = mock_connection();
        let mut rx = conn.take_receiver().unwrap();

        peer.push_text("first");
        peer.push(Message::Ping(Vec::new().into()));
        peer.push(Message::Binary(b"second".to_vec().into()));

        assert_eq!(rx.recv().await.unwrap(), "first");
        assert_eq!(rx.recv().await.unwrap(), "second");
        assert!(conn.take_receiver().is_none());
    }

    #[tokio::test]
    async fn test_read_error_closes_receive_queue() {
        let (conn, peer) = mock_connection();
        let mut rx = conn.take_receiver().unwrap();

        peer.push_error();

        assert!(rx.recv().await.is_none());
        assert!(!conn.is_active());
        assert_eq!(
            conn.send("late".to_string()).await.unwrap_err(),
            CryptomarketWsError::ConnectionClosed
        );
    }

    #[tokio::test]
    async fn test_write_error_stops_reader() {
        let (conn, peer) = mock_connection();
        let mut rx = conn.take_receiver().unwrap();

        drop(peer.outbound);
        conn.send("lost".to_string()).await.unwrap();

        assert!(rx.recv().await.is_none());
        assert!(conn.cancellation_token().is_cancelled());
    }

    #[tokio::test]
    async fn test_close_flushes_then_sends_close_frame() {
        let (conn, mut peer) = mock_connection();

        conn.send("a".to_string()).await.unwrap();
        conn.send("b".to_string()).await.unwrap();
        conn.close().await;
        conn.close().await;

        assert_eq!(peer.next_text().await.unwrap(), "a");
        assert_eq!(peer.next_text().await.unwrap(), "b");
        assert!(matches!(peer.next().await, Some(Message::Close(None))));
        assert!(conn.is_closed());
        assert_eq!(
            conn.send("c".to_string()).await.unwrap_err(),
            CryptomarketWsError::ConnectionClosed
        );
    }
}

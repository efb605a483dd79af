use std::collections::VecDeque;

use rqlink_protocol::{ClientMessage, ServerFrame, parse_server_frame};
use tokio::time::Instant;

use crate::error::{ClientError, Result};
use crate::transport::Transport;

/// Frames in, commands out, over one transport.
///
/// Every receive is bounded by a deadline. Frames set aside with
/// [`Connection::defer`] are handed out again before anything new is read.
pub struct Connection<T> {
    transport: T,
    deferred: VecDeque<ServerFrame>,
}

impl<T: Transport> Connection<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            deferred: VecDeque::new(),
        }
    }

    /// Send a client message
    pub async fn send(&mut self, message: ClientMessage) -> Result<()> {
        let wire_format = message.to_wire_format();
        tracing::debug!(message = %wire_format, "Sending");
        self.transport.send(&wire_format).await
    }

    /// Receive the next frame, or `Ok(None)` once `deadline` has passed
    pub async fn next_frame(&mut self, deadline: Instant) -> Result<Option<ServerFrame>> {
        if let Some(frame) = self.deferred.pop_front() {
            return Ok(Some(frame));
        }
        self.read_frame(deadline).await
    }

    /// Like [`Connection::next_frame`] but skips the deferred queue
    pub async fn read_frame(&mut self, deadline: Instant) -> Result<Option<ServerFrame>> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Ok(None);
        }

        match tokio::time::timeout(remaining, self.transport.recv()).await {
            Err(_elapsed) => Ok(None),
            Ok(Ok(Some(text))) => Ok(Some(parse_server_frame(&text)?)),
            Ok(Ok(None)) => Err(ClientError::ConnectionClosed),
            Ok(Err(e)) => Err(e),
        }
    }

    /// Keep a frame for whichever wait loop runs next
    pub fn defer(&mut self, frame: ServerFrame) {
        self.deferred.push_back(frame);
    }

    /// Drop every deferred frame, returning how many there were
    pub fn clear_deferred(&mut self) -> usize {
        let count = self.deferred.len();
        self.deferred.clear();
        count
    }

    /// Close the transport, logging rather than failing
    pub async fn close(mut self) {
        if let Err(e) = self.transport.close().await {
            tracing::debug!(error = %e, "Error while closing connection");
        }
    }
}

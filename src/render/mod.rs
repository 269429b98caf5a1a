//! Streaming markup rendering with deadline-bounded production.
//!
//! A [`Markup`] value is an opaque byte producer: either bytes that
//! already exist, or an async closure writing chunks into a
//! [`MarkupSink`] (which may itself suspend, e.g. on a
//! [`SuspendCell`](crate::cache::SuspendCell)). [`render_to_stream`]
//! runs the producer on its own task; when a deadline is set,
//! `tokio::time::timeout` drops the producer future on expiry, so a
//! timed-out render cannot keep running in the background and its
//! timer is freed with it.
//!
//! Errors raised during production surface as the stream's terminal
//! state; there is no partial/placeholder fallback.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time;

use crate::error::RenderError;

/// Chunks buffered between producer and consumer before backpressure.
const CHANNEL_CAPACITY: usize = 16;

type ProduceFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

/// Opaque page markup: a one-shot producer of bytes.
pub struct Markup {
    produce: Box<dyn FnOnce(MarkupSink) -> ProduceFuture + Send>,
}

impl Markup {
    /// Markup from an async producer writing chunks into the sink.
    pub fn from_producer<F, Fut>(produce: F) -> Self
    where
        F: FnOnce(MarkupSink) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            produce: Box::new(move |sink| Box::pin(produce(sink))),
        }
    }

    /// Markup that is already fully materialized.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        let bytes = bytes.into();
        Self::from_producer(move |sink| async move { sink.write(bytes).await })
    }

    /// Markup from a complete string.
    pub fn from_string(markup: impl Into<String>) -> Self {
        Self::from_bytes(markup.into().into_bytes())
    }
}

impl std::fmt::Debug for Markup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Markup(..)")
    }
}

/// Producer-side handle writing chunks into a render stream.
pub struct MarkupSink {
    tx: mpsc::Sender<Vec<u8>>,
}

impl MarkupSink {
    /// Write one chunk of output.
    ///
    /// Fails if the consumer is gone, which unwinds the producer when
    /// a render is abandoned mid-stream.
    pub async fn write(&self, chunk: impl Into<Vec<u8>>) -> anyhow::Result<()> {
        self.tx
            .send(chunk.into())
            .await
            .map_err(|_| anyhow::anyhow!("render stream closed before production finished"))
    }
}

/// Consumer side of one page render.
///
/// Chunks arrive incrementally; the terminal state is a clean end, a
/// timeout, or a production failure.
pub struct RenderStream {
    rx: mpsc::Receiver<Vec<u8>>,
    status: Option<oneshot::Receiver<Result<(), RenderError>>>,
}

/// Start producing `markup` under an optional wall-clock deadline
/// measured from now.
pub fn render_to_stream(markup: Markup, deadline: Option<Duration>) -> RenderStream {
    let (data_tx, data_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (status_tx, status_rx) = oneshot::channel();

    tokio::spawn(async move {
        let fut = (markup.produce)(MarkupSink { tx: data_tx });
        let result = match deadline {
            Some(deadline) => match time::timeout(deadline, fut).await {
                Ok(result) => result.map_err(RenderError::Failed),
                // Expiry drops the producer future, cancelling any
                // in-flight sub-computations it owns.
                Err(_) => Err(RenderError::Timeout(deadline)),
            },
            None => fut.await.map_err(RenderError::Failed),
        };
        status_tx.send(result).ok();
    });

    RenderStream {
        rx: data_rx,
        status: Some(status_rx),
    }
}

impl RenderStream {
    /// Next chunk of output.
    ///
    /// `None` means the stream finished cleanly. A terminal error is
    /// yielded exactly once; the stream is exhausted afterwards.
    pub async fn next_chunk(&mut self) -> Option<Result<Vec<u8>, RenderError>> {
        if let Some(chunk) = self.rx.recv().await {
            return Some(Ok(chunk));
        }

        let status = self.status.take()?;
        match status.await {
            Ok(Ok(())) => None,
            Ok(Err(error)) => Some(Err(error)),
            Err(_) => Some(Err(RenderError::Failed(anyhow::anyhow!(
                "render task ended without reporting a status"
            )))),
        }
    }

    /// Buffer the entire stream.
    ///
    /// Convenience adapter for callers that need a complete byte
    /// sequence; any failure discards partial output.
    pub async fn collect(mut self) -> Result<Vec<u8>, RenderError> {
        let mut buffer = Vec::new();
        while let Some(chunk) = self.next_chunk().await {
            buffer.extend_from_slice(&chunk?);
        }
        Ok(buffer)
    }
}

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;
use tokio::sync::mpsc;

use crate::error::FetchError;

/// One logical file produced by a fetch
#[derive(Debug)]
pub struct Content {
    /// Backend-specific path of the file
    pub path: String,
    /// File bytes; empty or partial when `error` is set
    pub data: Bytes,
    /// Failure affecting only this file
    pub error: Option<FetchError>,
}

impl Content {
    pub fn new(path: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Content {
            path: path.into(),
            data: data.into(),
            error: None,
        }
    }

    pub fn failed(path: impl Into<String>, error: FetchError) -> Self {
        Content {
            path: path.into(),
            data: Bytes::new(),
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Receiving end of a fetch.
///
/// Yields every [`Content`] produced by the backend and ends once all
/// producers are done. Dropping the stream stops the producers at their
/// next send.
pub struct ContentStream {
    rx: mpsc::Receiver<Content>,
}

impl ContentStream {
    /// Create a bounded channel whose receiver is wrapped as a stream
    pub fn channel(capacity: usize) -> (ContentSender, ContentStream) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (ContentSender { tx }, ContentStream { rx })
    }

    /// Receive the next item, `None` once the fetch is complete
    pub async fn next(&mut self) -> Option<Content> {
        self.rx.recv().await
    }

    /// Drain the stream into a vector
    pub async fn collect_all(mut self) -> Vec<Content> {
        let mut out = Vec::new();
        while let Some(content) = self.rx.recv().await {
            out.push(content);
        }
        out
    }
}

impl Stream for ContentStream {
    type Item = Content;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Content>> {
        self.rx.poll_recv(cx)
    }
}

/// Producer handle for a [`ContentStream`]
#[derive(Clone)]
pub struct ContentSender {
    tx: mpsc::Sender<Content>,
}

impl ContentSender {
    /// Send from async code. Returns `false` once the consumer is gone.
    pub async fn send(&self, content: Content) -> bool {
        self.tx.send(content).await.is_ok()
    }

    /// Send from a blocking thread. Returns `false` once the consumer is gone.
    pub fn blocking_send(&self, content: Content) -> bool {
        self.tx.blocking_send(content).is_ok()
    }

    /// Forward every item of `stream`, stopping early if our consumer left
    pub async fn forward(&self, mut stream: ContentStream) -> bool {
        while let Some(content) = stream.next().await {
            if !self.send(content).await {
                return false;
            }
        }
        true
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

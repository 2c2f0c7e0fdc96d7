//! Newline-delimited record stream over a streaming response body.
//!
//! The watch endpoint keeps its response open and writes one JSON
//! document per line for as long as the client stays subscribed.
//! [`DocumentStream`] turns that body into a lazy, non-restartable
//! sequence of decoded [`Document`]s.
//!
//! - The stream ends (yields `None`) when the daemon closes the body.
//! - It yields [`Error::StreamDropped`] if the connection breaks mid-body.
//! - It ends cleanly, without error, as soon as the cancel token fires.
//!   The token is checked at every read boundary.
//!
//! Every record is decoded according to the content type announced when
//! the response began; nothing is re-negotiated per line.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use futures_core::Stream;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::client::conn::http1::SendRequest;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::client::Document;
use crate::error::Error;

/// Lazy sequence of records read from a streaming response.
pub struct DocumentStream {
    inner: Pin<Box<dyn Stream<Item = Result<Document, Error>> + Send>>,
}

impl DocumentStream {
    /// Wrap an open response body.
    ///
    /// `sender` is held for the lifetime of the stream so the underlying
    /// connection stays open until the stream is dropped.
    pub(crate) fn new(
        sender: SendRequest<Full<Bytes>>,
        mut body: Incoming,
        json: bool,
        cancel: CancellationToken,
    ) -> Self {
        let inner = async_stream::try_stream! {
            let _sender = sender;
            let mut lines = LineBuffer::default();

            loop {
                let frame = tokio::select! {
                    biased;
                    () = cancel.cancelled() => {
                        debug!("stream cancelled");
                        break;
                    }
                    frame = body.frame() => frame,
                };

                let Some(frame) = frame else {
                    debug!("stream closed by daemon");
                    break;
                };
                let frame = frame.map_err(|e| Error::StreamDropped(e.to_string()))?;

                let Ok(data) = frame.into_data() else {
                    continue;
                };
                lines.push(&data);

                while let Some(line) = lines.next_line() {
                    if line.iter().all(u8::is_ascii_whitespace) {
                        continue;
                    }
                    trace!(bytes = line.len(), "stream record");
                    yield Document::decode(&line, json)?;
                }
            }

            if !cancel.is_cancelled() {
                if let Some(rest) = lines.finish() {
                    yield Document::decode(&rest, json)?;
                }
            }
        };

        Self {
            inner: Box::pin(inner),
        }
    }
}

impl Stream for DocumentStream {
    type Item = Result<Document, Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

// ── Line splitting ───────────────────────────────────────────────────

/// Accumulates body chunks and hands out complete lines.
///
/// Chunk boundaries from the socket have no relation to record
/// boundaries, so partial lines are carried over between reads.
#[derive(Debug, Default)]
struct LineBuffer {
    buf: BytesMut,
}

impl LineBuffer {
    fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Next complete line without its terminator (`\n` or `\r\n`).
    fn next_line(&mut self) -> Option<Bytes> {
        let pos = self.buf.iter().position(|b| *b == b'\n')?;
        let mut line = self.buf.split_to(pos + 1);
        line.truncate(pos);
        if line.last() == Some(&b'\r') {
            line.truncate(pos - 1);
        }
        Some(line.freeze())
    }

    /// Whatever is left once the body has ended, if it isn't blank.
    fn finish(&mut self) -> Option<Bytes> {
        let rest = self.buf.split().freeze();
        if rest.iter().all(u8::is_ascii_whitespace) {
            None
        } else {
            Some(rest)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn splits_lines_across_chunks() {
        let mut lines = LineBuffer::default();
        lines.push(b"{\"a\":1}\n{\"b\"");
        assert_eq!(lines.next_line().unwrap(), Bytes::from_static(b"{\"a\":1}"));
        assert!(lines.next_line().is_none());

        lines.push(b":2}\r\n");
        assert_eq!(lines.next_line().unwrap(), Bytes::from_static(b"{\"b\":2}"));
        assert!(lines.next_line().is_none());
        assert!(lines.finish().is_none());
    }

    #[test]
    fn empty_lines_come_through_as_empty() {
        let mut lines = LineBuffer::default();
        lines.push(b"\n\r\n");
        assert!(lines.next_line().unwrap().is_empty());
        assert!(lines.next_line().unwrap().is_empty());
        assert!(lines.next_line().is_none());
    }

    #[test]
    fn finish_returns_unterminated_tail() {
        let mut lines = LineBuffer::default();
        lines.push(b"{\"tail\":true}");
        assert!(lines.next_line().is_none());
        assert_eq!(lines.finish().unwrap(), Bytes::from_static(b"{\"tail\":true}"));
        assert!(lines.finish().is_none());
    }
}

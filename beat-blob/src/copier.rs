//! Two-stage streaming copy.
//!
//! A producer reads fixed-size chunks from the source and hands them over a
//! bounded channel to a consumer that writes them to the destination. Both
//! stages run concurrently on the calling task. A write failure cancels the
//! producer, so a client that goes away stops the object download within one
//! chunk.

use std::io;

use bytes::Bytes;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_util::io::{ReaderStream, StreamReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, instrument, warn};

use crate::ByteStream;

/// Chunk size used when none (or zero) is configured.
pub const DEFAULT_CHUNK_SIZE: usize = 32 * 1024;

/// Outcome of a failed copy. `copied` is the number of bytes that reached the
/// destination before the failure.
#[derive(Error, Debug)]
pub enum CopyError {
    #[error("read failed after {copied} bytes: {source}")]
    Read {
        #[source]
        source: io::Error,
        copied: u64,
    },

    #[error("write failed after {copied} bytes: {source}")]
    Write {
        #[source]
        source: io::Error,
        copied: u64,
    },
}

impl CopyError {
    pub fn copied(&self) -> u64 {
        match self {
            Self::Read { copied, .. } | Self::Write { copied, .. } => *copied,
        }
    }

    /// Destination went away (client disconnect) rather than a storage fault.
    pub fn is_disconnect(&self) -> bool {
        matches!(
            self,
            Self::Write { source, .. } if matches!(
                source.kind(),
                io::ErrorKind::BrokenPipe | io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted
            )
        )
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ChunkedCopier {
    chunk_size: usize,
}

impl Default for ChunkedCopier {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl ChunkedCopier {
    /// A zero chunk size falls back to [`DEFAULT_CHUNK_SIZE`].
    pub fn new(chunk_size: usize) -> Self {
        if chunk_size == 0 {
            warn!(default = DEFAULT_CHUNK_SIZE, "chunk size 0 requested, using default");
            return Self::default();
        }
        Self { chunk_size }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Copy `src` to `dst` until EOF. Returns the number of bytes written.
    ///
    /// Returns only once both stages have stopped. When both sides fail the
    /// write error is reported.
    #[instrument(level = "debug", skip_all, fields(chunk_size = self.chunk_size))]
    pub async fn copy<R, W>(&self, mut src: R, mut dst: W) -> Result<u64, CopyError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let chunk_size = self.chunk_size;
        let (tx, mut rx) = mpsc::channel::<Bytes>(1);
        let cancel = CancellationToken::new();

        let producer = {
            let cancel = cancel.clone();
            async move {
                loop {
                    let mut buf = vec![0u8; chunk_size];
                    let n = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Ok::<(), io::Error>(()),
                        read = src.read(&mut buf) => read?,
                    };
                    if n == 0 {
                        return Ok(());
                    }
                    buf.truncate(n);

                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Ok(()),
                        sent = tx.send(Bytes::from(buf)) => {
                            if sent.is_err() {
                                return Ok(());
                            }
                        }
                    }
                }
            }
        };

        let consumer = async move {
            let mut written: u64 = 0;
            while let Some(chunk) = rx.recv().await {
                if let Err(source) = dst.write_all(&chunk).await {
                    cancel.cancel();
                    return Err((source, written));
                }
                written += chunk.len() as u64;
            }
            if let Err(source) = dst.flush().await {
                return Err((source, written));
            }
            Ok(written)
        };

        let (read, write): (io::Result<()>, Result<u64, (io::Error, u64)>) =
            tokio::join!(producer, consumer);

        match (read, write) {
            (_, Err((source, copied))) => Err(CopyError::Write { source, copied }),
            (Err(source), Ok(copied)) => Err(CopyError::Read { source, copied }),
            (Ok(()), Ok(copied)) => {
                debug!(bytes = copied, "copy complete");
                Ok(copied)
            }
        }
    }

    /// Run the copy from `src` in a background task and return the reading end
    /// as a stream, e.g. for an HTTP response body. Dropping the returned
    /// stream makes the next write fail, which stops the copy.
    pub fn spawn_pipe(&self, src: ByteStream) -> ByteStream {
        let (writer, reader) = tokio::io::duplex(self.chunk_size);
        let copier = *self;

        tokio::spawn(async move {
            match copier.copy(StreamReader::new(src), writer).await {
                Ok(bytes) => debug!(bytes, "stream delivered"),
                Err(e) if e.is_disconnect() => debug!(copied = e.copied(), "client went away"),
                Err(e) => error!(error = %e, copied = e.copied(), "stream copy failed"),
            }
        });

        Box::pin(ReaderStream::with_capacity(reader, self.chunk_size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::task::{Context, Poll};
    use std::time::Duration;

    /// Accepts `limit` bytes, then fails every write with `BrokenPipe`.
    struct ClosingWriter {
        accepted: usize,
        limit: usize,
        largest_write: usize,
    }

    impl AsyncWrite for ClosingWriter {
        fn poll_write(mut self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
            if self.accepted >= self.limit {
                return Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed")));
            }
            self.largest_write = self.largest_write.max(buf.len());
            self.accepted += buf.len();
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    /// Endless source that counts how many reads it served.
    struct CountingSource {
        reads: Arc<AtomicUsize>,
    }

    impl AsyncRead for CountingSource {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut tokio::io::ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            let n = buf.remaining();
            buf.put_slice(&vec![7u8; n]);
            Poll::Ready(Ok(()))
        }
    }

    /// Serves `good` bytes then fails.
    struct FailingSource {
        good: usize,
    }

    impl AsyncRead for FailingSource {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut tokio::io::ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            if self.good == 0 {
                return Poll::Ready(Err(io::Error::new(io::ErrorKind::Other, "disk gone")));
            }
            let n = self.good.min(buf.remaining());
            buf.put_slice(&vec![1u8; n]);
            self.good -= n;
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn copies_everything_in_order() {
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let mut out = Vec::new();

        let n = ChunkedCopier::new(333).copy(&data[..], &mut out).await.unwrap();

        assert_eq!(n, data.len() as u64);
        assert_eq!(out, data);
    }

    #[tokio::test]
    async fn empty_source_writes_nothing() {
        let mut out = Vec::new();
        let n = ChunkedCopier::new(8).copy(&b""[..], &mut out).await.unwrap();
        assert_eq!(n, 0);
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn zero_chunk_size_uses_default() {
        assert_eq!(ChunkedCopier::new(0).chunk_size(), DEFAULT_CHUNK_SIZE);
    }

    #[tokio::test]
    async fn write_failure_stops_an_endless_source() {
        let reads = Arc::new(AtomicUsize::new(0));
        let src = CountingSource { reads: Arc::clone(&reads) };
        let dst = ClosingWriter {
            accepted: 0,
            limit: 64,
            largest_write: 0,
        };

        let result = tokio::time::timeout(Duration::from_secs(5), ChunkedCopier::new(16).copy(src, dst))
            .await
            .expect("copy must stop after the destination fails");

        let err = result.unwrap_err();
        assert!(err.is_disconnect());
        assert_eq!(err.copied(), 64);
        // Bounded hand-off: only a few chunks are read past the failure.
        assert!(reads.load(Ordering::SeqCst) <= 10);
    }

    #[tokio::test]
    async fn read_failure_keeps_already_read_bytes() {
        let mut out = Vec::new();
        let err = ChunkedCopier::new(10)
            .copy(FailingSource { good: 25 }, &mut out)
            .await
            .unwrap_err();

        assert!(matches!(err, CopyError::Read { copied: 25, .. }));
        assert_eq!(out.len(), 25);
    }

    #[tokio::test]
    async fn writes_never_exceed_chunk_size() {
        let data = vec![3u8; 1000];
        let mut dst = ClosingWriter {
            accepted: 0,
            limit: usize::MAX,
            largest_write: 0,
        };
        ChunkedCopier::new(64).copy(&data[..], &mut dst).await.unwrap();
        assert_eq!(dst.accepted, 1000);
        assert!(dst.largest_write <= 64);
    }

    #[tokio::test]
    async fn spawn_pipe_streams_source() {
        use futures::StreamExt;

        let chunks = vec![Ok(Bytes::from_static(b"hello ")), Ok(Bytes::from_static(b"world"))];
        let src: ByteStream = Box::pin(futures::stream::iter(chunks));

        let mut body = ChunkedCopier::new(4).spawn_pipe(src);
        let mut out = Vec::new();
        while let Some(chunk) = body.next().await {
            out.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(out, b"hello world");
    }
}

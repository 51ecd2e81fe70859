//! Frame stream plumbing: a single-producer, single-consumer handoff between
//! whatever reads frames off the wire and the reconciliation loop.
//!
//! Frames arrive in FIFO order. Dropping the [`FrameSender`] closes the
//! stream, which the loop observes as [`TransportError::Closed`].

use std::path::PathBuf;

use futures::stream::Stream;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::TransportError;

/// One item of the frame stream: raw frame bytes or a read failure.
///
/// Frames stay bytes until classification so that a frame with invalid UTF-8
/// is skipped as a decode error instead of failing the stream.
pub type FrameItem = Result<Vec<u8>, TransportError>;

pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Producer half of the frame channel.
#[derive(Debug)]
pub struct FrameSender {
    tx: mpsc::Sender<FrameItem>,
}

/// Consumer half of the frame channel.
#[derive(Debug)]
pub struct FrameReceiver {
    rx: mpsc::Receiver<FrameItem>,
}

/// Create a bounded frame channel.
pub fn channel(capacity: usize) -> (FrameSender, FrameReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (FrameSender { tx }, FrameReceiver { rx })
}

impl FrameSender {
    /// Queue one raw frame. Fails with `Closed` once the consumer is gone.
    pub async fn send(&self, raw: impl Into<Vec<u8>>) -> Result<(), TransportError> {
        self.tx
            .send(Ok(raw.into()))
            .await
            .map_err(|_| TransportError::Closed)
    }

    /// Report a read failure and close the stream.
    pub async fn fail(self, reason: impl Into<String>) {
        let reason = reason.into();
        if self.tx.send(Err(TransportError::Read(reason))).await.is_err() {
            debug!("frame consumer dropped before read failure was delivered");
        }
    }
}

impl FrameReceiver {
    /// Adapt the receiver into a `Stream` for the reconciliation loop.
    pub fn into_stream(self) -> impl Stream<Item = FrameItem> {
        let mut rx = self.rx;
        async_stream::stream! {
            while let Some(item) = rx.recv().await {
                yield item;
            }
        }
    }
}

/// Spawn a producer that reads one frame per non-empty line of a JSONL file.
///
/// Lines are forwarded as raw bytes; content problems are left to the
/// classifier. Open or I/O failures are delivered through the channel as
/// [`TransportError::Read`]; reaching the end of the file closes the stream.
pub fn spawn_jsonl_reader(path: PathBuf, sender: FrameSender) -> JoinHandle<()> {
    tokio::spawn(async move {
        let file = match tokio::fs::File::open(&path).await {
            Ok(file) => file,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "open frames file");
                sender.fail(format!("open {}: {err}", path.display())).await;
                return;
            }
        };

        let mut lines = BufReader::new(file).split(b'\n');
        let mut sent = 0u64;
        loop {
            match lines.next_segment().await {
                Ok(Some(mut line)) => {
                    if line.last() == Some(&b'\r') {
                        line.pop();
                    }
                    if line.iter().all(u8::is_ascii_whitespace) {
                        continue;
                    }
                    if sender.send(line).await.is_err() {
                        debug!(sent, "frame consumer finished; stopping reader");
                        return;
                    }
                    sent += 1;
                }
                Ok(None) => {
                    debug!(path = %path.display(), sent, "frames file exhausted");
                    return;
                }
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "read frames file");
                    sender.fail(format!("read {}: {err}", path.display())).await;
                    return;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn channel_preserves_order_and_closes_on_drop() {
        let (sender, receiver) = channel(4);
        sender.send("one".to_string()).await.expect("send");
        sender.send("two".to_string()).await.expect("send");
        drop(sender);

        let items: Vec<FrameItem> = receiver.into_stream().collect().await;
        assert_eq!(items, vec![Ok(b"one".to_vec()), Ok(b"two".to_vec())]);
    }

    #[tokio::test]
    async fn send_after_consumer_drop_is_closed() {
        let (sender, receiver) = channel(1);
        drop(receiver);
        let err = sender.send("late").await.expect_err("closed");
        assert_eq!(err, TransportError::Closed);
    }

    #[tokio::test]
    async fn jsonl_reader_skips_blank_lines() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("frames.jsonl");
        std::fs::write(&path, "{\"a\":1}\r\n\n  \n{\"b\":2}\n").expect("write");

        let (sender, receiver) = channel(DEFAULT_CHANNEL_CAPACITY);
        let reader = spawn_jsonl_reader(path, sender);
        let items: Vec<FrameItem> = receiver.into_stream().collect().await;
        assert_eq!(
            items,
            vec![Ok(b"{\"a\":1}".to_vec()), Ok(b"{\"b\":2}".to_vec())]
        );
        reader.await.expect("join");
    }

    #[tokio::test]
    async fn jsonl_reader_forwards_invalid_utf8_lines() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("frames.jsonl");
        std::fs::write(&path, b"{\"messageId\":\"x\xff\"}\n{}\n").expect("write");

        let (sender, receiver) = channel(DEFAULT_CHANNEL_CAPACITY);
        spawn_jsonl_reader(path, sender);
        let items: Vec<FrameItem> = receiver.into_stream().collect().await;
        assert_eq!(
            items,
            vec![Ok(b"{\"messageId\":\"x\xff\"}".to_vec()), Ok(b"{}".to_vec())]
        );
    }

    #[tokio::test]
    async fn jsonl_reader_reports_missing_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let (sender, receiver) = channel(1);
        spawn_jsonl_reader(temp.path().join("missing.jsonl"), sender);
        let items: Vec<FrameItem> = receiver.into_stream().collect().await;
        match items.as_slice() {
            [Err(TransportError::Read(reason))] => assert!(reason.contains("missing.jsonl")),
            other => panic!("expected one read failure, got {other:?}"),
        }
    }
}

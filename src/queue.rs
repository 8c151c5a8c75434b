//! Bounded frame queue between the decode loop and the playback loop.
//!
//! Built on [`std::sync::mpsc::sync_channel`]: sends block while the queue is
//! full, receives block while it is empty. [`FrameSender::finish`] consumes the
//! sender, so the end-of-stream marker can only ever be sent once and nothing
//! can follow it.

use std::sync::mpsc::{self, RecvTimeoutError, SyncSender, TrySendError};
use std::time::Duration;

use crate::convert::AsciiFrame;
use crate::error::{PlayerError, Result};

/// Item carried by the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueItem {
    Frame(AsciiFrame),
    EndOfStream,
}

/// Outcome of a non-blocking send.
#[derive(Debug)]
pub enum TrySend {
    Sent,
    /// The queue is at capacity; the frame is handed back.
    Full(AsciiFrame),
}

/// Outcome of a bounded wait on the receiving side.
#[derive(Debug, PartialEq, Eq)]
pub enum Received {
    Frame(AsciiFrame),
    EndOfStream,
    Timeout,
}

/// Create a queue holding at most `capacity` items.
///
/// # Panics
///
/// Panics if `capacity` is zero; a zero-capacity channel would be a rendezvous,
/// not a buffer. Options validation rejects it earlier.
pub fn frame_queue(capacity: usize) -> (FrameSender, FrameReceiver) {
    assert!(capacity > 0, "frame queue capacity must be at least 1");
    let (tx, rx) = mpsc::sync_channel(capacity);
    (
        FrameSender { tx },
        FrameReceiver {
            rx,
            finished: false,
        },
    )
}

/// Producer half of the queue.
pub struct FrameSender {
    tx: SyncSender<QueueItem>,
}

impl FrameSender {
    /// Enqueue a frame, blocking while the queue is full.
    pub fn send(&self, frame: AsciiFrame) -> Result<()> {
        self.tx
            .send(QueueItem::Frame(frame))
            .map_err(|_| PlayerError::ConsumerGone)
    }

    /// Enqueue a frame only if there is room right now.
    pub fn try_send(&self, frame: AsciiFrame) -> Result<TrySend> {
        match self.tx.try_send(QueueItem::Frame(frame)) {
            Ok(()) => Ok(TrySend::Sent),
            Err(TrySendError::Full(QueueItem::Frame(frame))) => Ok(TrySend::Full(frame)),
            Err(TrySendError::Full(QueueItem::EndOfStream)) => Err(PlayerError::QueueProtocol(
                "end of stream marker bounced from a frame send".to_string(),
            )),
            Err(TrySendError::Disconnected(_)) => Err(PlayerError::ConsumerGone),
        }
    }

    /// Enqueue the end-of-stream marker and close the producer side.
    pub fn finish(self) -> Result<()> {
        self.tx
            .send(QueueItem::EndOfStream)
            .map_err(|_| PlayerError::ConsumerGone)
    }
}

/// Consumer half of the queue.
pub struct FrameReceiver {
    rx: mpsc::Receiver<QueueItem>,
    finished: bool,
}

impl FrameReceiver {
    /// Wait up to `timeout` for the next item.
    ///
    /// # Errors
    ///
    /// [`PlayerError::QueueProtocol`] if anything arrives after the end-of-stream
    /// marker, or if the sender disconnects without sending one.
    pub fn recv_timeout(&mut self, timeout: Duration) -> Result<Received> {
        match self.rx.recv_timeout(timeout) {
            Ok(item) => self.accept(item),
            Err(RecvTimeoutError::Timeout) => Ok(Received::Timeout),
            Err(RecvTimeoutError::Disconnected) if self.finished => Err(PlayerError::QueueProtocol(
                "receive attempted after end of stream".to_string(),
            )),
            Err(RecvTimeoutError::Disconnected) => Err(PlayerError::QueueProtocol(
                "decode loop hung up without signalling end of stream".to_string(),
            )),
        }
    }

    /// Whether the end-of-stream marker has been received.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn accept(&mut self, item: QueueItem) -> Result<Received> {
        if self.finished {
            return Err(PlayerError::QueueProtocol(
                "item received after end of stream".to_string(),
            ));
        }
        match item {
            QueueItem::Frame(frame) => Ok(Received::Frame(frame)),
            QueueItem::EndOfStream => {
                self.finished = true;
                Ok(Received::EndOfStream)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::{convert, DecodedFrame, FrameSize};

    const WAIT: Duration = Duration::from_millis(200);

    fn frame(v: u8) -> AsciiFrame {
        let pixel = image::RgbImage::from_pixel(1, 1, image::Rgb([v, v, v]));
        convert(&DecodedFrame::from_rgb(pixel), FrameSize::new(1, 1)).unwrap()
    }

    #[test]
    fn test_capacity_bounds_non_blocking_sends() {
        let (tx, _rx) = frame_queue(3);
        let mut sent = 0;
        loop {
            match tx.try_send(frame(255)).unwrap() {
                TrySend::Sent => sent += 1,
                TrySend::Full(_) => break,
            }
        }
        assert_eq!(sent, 3);
    }

    #[test]
    fn test_fifo_then_end_of_stream() {
        let (tx, mut rx) = frame_queue(4);
        tx.send(frame(0)).unwrap();
        tx.send(frame(255)).unwrap();
        tx.finish().unwrap();

        assert_eq!(rx.recv_timeout(WAIT).unwrap(), Received::Frame(frame(0)));
        assert_eq!(rx.recv_timeout(WAIT).unwrap(), Received::Frame(frame(255)));
        assert_eq!(rx.recv_timeout(WAIT).unwrap(), Received::EndOfStream);
        assert!(rx.is_finished());
    }

    #[test]
    fn test_receive_after_end_of_stream_is_protocol_violation() {
        let (tx, mut rx) = frame_queue(1);
        tx.finish().unwrap();
        assert_eq!(rx.recv_timeout(WAIT).unwrap(), Received::EndOfStream);
        let err = rx.recv_timeout(WAIT).unwrap_err();
        assert!(matches!(err, PlayerError::QueueProtocol(_)));
    }

    #[test]
    fn test_sender_dropped_without_sentinel() {
        let (tx, mut rx) = frame_queue(1);
        drop(tx);
        let err = rx.recv_timeout(WAIT).unwrap_err();
        assert!(matches!(err, PlayerError::QueueProtocol(_)));
    }

    #[test]
    fn test_empty_queue_times_out() {
        let (_tx, mut rx) = frame_queue(1);
        assert_eq!(rx.recv_timeout(Duration::from_millis(10)).unwrap(), Received::Timeout);
    }

    #[test]
    fn test_send_fails_once_receiver_dropped() {
        let (tx, rx) = frame_queue(1);
        drop(rx);
        assert!(matches!(tx.send(frame(255)), Err(PlayerError::ConsumerGone)));
        assert!(matches!(tx.finish(), Err(PlayerError::ConsumerGone)));
    }
}

// SPDX-License-Identifier: Apache-2.0

use bytes::Bytes;

use crate::bounded_channel::{BoundedSender, TrySendError};
use crate::sinks::{LineSink, SinkError};

/// Bounded-queue sink: the production delivery path into the downstream
/// pipeline. Clones share the same queue.
#[derive(Clone)]
pub struct QueueSink {
    tx: BoundedSender<Bytes>,
}

impl QueueSink {
    pub fn new(tx: BoundedSender<Bytes>) -> Self {
        Self { tx }
    }
}

impl LineSink for QueueSink {
    fn is_closed(&self) -> bool {
        self.tx.is_disconnected()
    }

    fn put(&self, line: Bytes) -> Result<(), SinkError> {
        self.tx.try_send(line).map_err(|e| match e {
            TrySendError::Full => SinkError::Full,
            TrySendError::Disconnected => SinkError::Closed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounded_channel::bounded;

    #[test]
    fn put_and_reject_when_full() {
        let (tx, rx) = bounded::<Bytes>(1);
        let sink = QueueSink::new(tx);

        assert!(!sink.is_closed());
        assert_eq!(Ok(()), sink.put(Bytes::from_static(b"one\n")));
        assert_eq!(Err(SinkError::Full), sink.put(Bytes::from_static(b"two\n")));

        assert_eq!(Some(Bytes::from_static(b"one\n")), rx.try_recv());
        assert_eq!(Ok(()), sink.put(Bytes::from_static(b"two\n")));
    }

    #[test]
    fn closed_when_receiver_dropped() {
        let (tx, rx) = bounded::<Bytes>(4);
        let sink = QueueSink::new(tx);

        drop(rx);
        assert!(sink.is_closed());
        assert_eq!(
            Err(SinkError::Closed),
            sink.put(Bytes::from_static(b"late\n"))
        );
    }
}

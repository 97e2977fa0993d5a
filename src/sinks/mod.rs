// SPDX-License-Identifier: Apache-2.0

//! Downstream delivery boundary.
//!
//! A source never assumes exclusive access to its sink: it checks `is_closed`
//! before attempting delivery and only ever offers lines non-blockingly.

pub mod queue;

use bytes::Bytes;
use thiserror::Error;

pub use queue::QueueSink;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SinkError {
    #[error("sink is at capacity")]
    Full,

    #[error("sink is closed")]
    Closed,
}

/// Contract a line source holds against its downstream consumer.
pub trait LineSink {
    /// True once the consumer side has gone away. A closed sink still counts
    /// lines as received, but no delivery is attempted.
    fn is_closed(&self) -> bool;

    /// Offer one line without waiting. A rejected line is the caller's to
    /// drop; there is no retry protocol.
    fn put(&self, line: Bytes) -> Result<(), SinkError>;
}

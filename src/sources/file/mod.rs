// SPDX-License-Identifier: Apache-2.0

//! File source: tails a single file and feeds each line into a sink.
//!
//! The engine follows growth and detects truncation/rotation through a
//! size-shrink comparison across polls, reports liveness and throughput
//! through value-copy stats snapshots, and shuts down cooperatively on a
//! cancellation signal.

pub mod config;
pub mod cursor;
pub mod error;
pub mod source;

pub use config::{FileSourceConfig, FileSourceDescriptor};
pub use error::{Error, Result};
pub use source::FileSource;

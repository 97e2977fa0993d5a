// SPDX-License-Identifier: Apache-2.0

//! File handle and read-cursor management for a tailed file.
//!
//! Rotation is detected by a size-shrink heuristic only: a replacement file
//! of equal or larger size, or a shrink that regrows between two polls, goes
//! unnoticed. Identity (inode) tracking is out of scope here.

use std::path::{Path, PathBuf};

use tokio::fs::{self, File};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

/// Outcome of one read attempt.
pub enum ReadEvent {
    /// A complete line, trailing newline included
    Line(String),
    /// Nothing more to read right now
    Eof,
    /// Read failure other than end of input
    Error(std::io::Error),
}

pub struct FileCursor {
    path: PathBuf,
    reader: Option<BufReader<File>>,
    last_size: u64,
}

impl FileCursor {
    /// Open the target file. Failure to open or stat is logged, not fatal:
    /// the cursor operates handle-less (every read reports end of input)
    /// until a later rotation check can open the file.
    pub async fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();

        let reader = match File::open(&path).await {
            Ok(f) => Some(BufReader::new(f)),
            Err(e) => {
                warn!(path = ?path, error = %e, "Failed to open source file, waiting for it to appear");
                None
            }
        };

        let last_size = match fs::metadata(&path).await {
            Ok(m) => m.len(),
            Err(e) => {
                warn!(path = ?path, error = %e, "Failed to stat source file");
                0
            }
        };

        Self {
            path,
            reader,
            last_size,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Attempt to read one newline-terminated line.
    ///
    /// A final line still missing its newline is consumed but not delivered,
    /// matching the contract of handing out complete lines only; once the
    /// writer terminates it, the remainder is delivered as its own line.
    pub async fn read_line(&mut self) -> ReadEvent {
        let reader = match self.reader.as_mut() {
            Some(r) => r,
            None => return ReadEvent::Eof,
        };

        let mut buf = String::new();
        match reader.read_line(&mut buf).await {
            Ok(0) => ReadEvent::Eof,
            Ok(_) if buf.ends_with('\n') => ReadEvent::Line(buf),
            Ok(_) => ReadEvent::Eof,
            Err(e) => ReadEvent::Error(e),
        }
    }

    /// Size-shrink rotation check, run on end of input in follow mode.
    ///
    /// A strictly smaller file means truncation or replacement: reopen fresh
    /// with the cursor at the start and record the new size. Equal or larger
    /// means more data may simply be pending, so nothing happens. A cursor
    /// that never managed to open its file uses this point to try again.
    pub async fn check_rotation(&mut self) {
        let size = match fs::metadata(&self.path).await {
            Ok(m) => m.len(),
            Err(e) => {
                warn!(path = ?self.path, error = %e, "Failed to stat source file");
                return;
            }
        };

        if self.reader.is_none() {
            debug!(path = ?self.path, size = size, "Source file appeared, opening");
            self.reopen(size).await;
            return;
        }

        if size < self.last_size {
            debug!(
                path = ?self.path,
                last_size = self.last_size,
                size = size,
                "Size shrink detected, treating as rotation"
            );
            self.reopen(size).await;
        }
    }

    async fn reopen(&mut self, size: u64) {
        self.reader = None;
        match File::open(&self.path).await {
            Ok(f) => self.reader = Some(BufReader::new(f)),
            Err(e) => {
                warn!(path = ?self.path, error = %e, "Failed to reopen source file");
            }
        }
        self.last_size = size;
    }

    /// Drop the handle. Safe to call with no handle open.
    pub fn close(&mut self) {
        self.reader = None;
    }
}

// SPDX-License-Identifier: Apache-2.0

//! File source engine.
//!
//! One spawned task per instance runs the whole tailing loop: read a line,
//! offer it to the sink, check the clear signal, offer a stats snapshot,
//! then pause. The stop signal is observed at exactly two suspension points
//! per iteration (the end-of-input poll wait and the idle sleep), so
//! shutdown latency is bounded by min(poll, sleep) plus the in-progress
//! read and delivery. Cancellation is cooperative only: a line being
//! processed is always finished first.

use std::time::Duration;

use bytes::Bytes;
use chrono::{SecondsFormat, Utc};
use tokio::select;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tower::BoxError;
use tracing::{error, info, warn};

use crate::monitor::{MonitorControl, SourceStats};
use crate::sinks::LineSink;
use crate::sources::file::config::FileSourceConfig;
use crate::sources::file::cursor::{FileCursor, ReadEvent};

/// A single-file tailing source feeding lines into a sink.
pub struct FileSource<S> {
    config: FileSourceConfig,
    sink: S,
}

impl<S: LineSink + Send + 'static> FileSource<S> {
    pub fn new(config: FileSourceConfig, sink: S) -> Self {
        Self { config, sink }
    }

    /// Start the source engine on the task set. `sources_cancel` is the stop
    /// signal; `control` carries the clear, stats and final-stats channels.
    pub fn start(
        self,
        task_set: &mut JoinSet<Result<(), BoxError>>,
        sources_cancel: &CancellationToken,
        control: MonitorControl,
    ) {
        info!(
            name = %self.config.name,
            path = ?self.config.path,
            follow = self.config.follow,
            "Starting file source"
        );

        let cancel = sources_cancel.clone();
        task_set.spawn(async move { run_tailer(self.config, self.sink, control, cancel).await });
    }
}

/// Wait out `dur` unless the stop signal fires first. Returns true on stop.
async fn wait_or_stop(cancel: &CancellationToken, dur: Duration) -> bool {
    select! {
        _ = cancel.cancelled() => true,
        _ = tokio::time::sleep(dur) => false,
    }
}

fn stamp_line(name: &str, line: &str) -> String {
    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    format!("[{} {}] {}", name, now, line)
}

async fn run_tailer<S: LineSink>(
    config: FileSourceConfig,
    sink: S,
    control: MonitorControl,
    cancel: CancellationToken,
) -> Result<(), BoxError> {
    let mut stats = SourceStats::new(config.name.clone());
    let mut cursor = FileCursor::open(&config.path).await;

    let mut running = true;
    stats.running = true;

    while running {
        match cursor.read_line().await {
            ReadEvent::Line(line) => {
                stats.messages_received += 1;

                if !sink.is_closed() && !line.is_empty() {
                    let payload = if config.timestamp {
                        Bytes::from(stamp_line(&config.name, &line))
                    } else {
                        Bytes::from(line)
                    };
                    // best effort: a rejected line is dropped, not retried
                    match sink.put(payload) {
                        Ok(()) => stats.messages_sent += 1,
                        Err(e) => {
                            warn!(name = %config.name, error = %e, "Sink rejected line, dropping")
                        }
                    }
                }
            }
            ReadEvent::Eof => {
                if config.follow {
                    cursor.check_rotation().await;
                }
                if wait_or_stop(&cancel, config.poll_interval).await {
                    running = false;
                    stats.running = false;
                    // no further publish this iteration
                    continue;
                }
            }
            ReadEvent::Error(e) => {
                // treated as end of input for control flow, without the
                // rotation check; no reopen or retry is attempted
                warn!(name = %config.name, error = %e, "Read error");
                if wait_or_stop(&cancel, config.poll_interval).await {
                    running = false;
                    stats.running = false;
                    continue;
                }
            }
        }

        if control.take_clear() {
            stats.clear();
        }
        control.try_publish(&stats);

        if wait_or_stop(&cancel, config.sleep_interval).await {
            running = false;
            stats.running = false;
        }
    }

    cursor.close();

    // Terminal handoff blocks until the controller accepts the snapshot; a
    // dropped receiver is a broken controller contract, not a source fault.
    if let Err(e) = control.publish_final(stats).await {
        error!(name = %config.name, error = %e, "Controller dropped the final stats receiver");
        return Err(format!("final stats handoff failed: {}", e).into());
    }

    info!(name = %config.name, "File source stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stamp_keeps_line_content() {
        let stamped = stamp_line("src", "payload\n");

        assert!(stamped.starts_with("[src "));
        assert!(stamped.ends_with("] payload\n"));
    }
}

//! Capture driving loop
//!
//! The [`Driver`] pulls frames from a [`CaptureSource`], decodes them and reports
//! every outcome to a [`Sink`], until the source ends, fails, or the run is
//! cancelled. Capture conditions never surface as errors: they are summarized in
//! the returned [`RunSummary`].

use crate::capture::{CaptureSource, NextFrame};
use crate::decode::{Decoder, FrameOutcome};
use crate::sink::{Event, Sink};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, trace, warn};

/// Shared cancellation flag, checked by the loop before each pull
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> CancelToken {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Why the loop stopped
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum StopReason {
    StreamEnded,
    TerminalError(String),
    Cancelled,
    /// The configured number of frames was reached
    FrameLimit,
    /// The sink failed to write an event
    SinkFailed(String),
}

/// Counters of a run
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RunStats {
    /// Frames pulled from the source
    pub frames: u64,
    pub decoded: u64,
    pub skipped: u64,
    pub malformed: u64,
    /// Recoverable capture errors
    pub warnings: u64,
    /// Pulls that returned no data before the read timeout
    pub idle: u64,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RunSummary {
    pub stats: RunStats,
    pub stop: StopReason,
}

/// Capture driving loop
#[derive(Clone, Copy, Debug, Default)]
pub struct Driver {
    decoder: Decoder,
    max_frames: Option<u64>,
}

impl Driver {
    pub fn new(decoder: Decoder) -> Driver {
        Driver {
            decoder,
            max_frames: None,
        }
    }

    /// Stop after `max_frames` frames have been pulled
    pub fn with_max_frames(self, max_frames: u64) -> Driver {
        Driver {
            max_frames: Some(max_frames),
            ..self
        }
    }

    /// Run the loop until the source stops or `cancel` is set.
    ///
    /// The source is owned by the loop, and closed exactly once before returning.
    pub fn run<S, K>(&self, mut source: S, sink: &mut K, cancel: &CancelToken) -> RunSummary
    where
        S: CaptureSource,
        K: Sink + ?Sized,
    {
        info!(max_frames = ?self.max_frames, "capture loop started");
        let mut stats = RunStats::default();
        let stop = self.pull_frames(&mut source, sink, cancel, &mut stats);
        source.close();
        info!(
            frames = stats.frames,
            decoded = stats.decoded,
            skipped = stats.skipped,
            malformed = stats.malformed,
            warnings = stats.warnings,
            stop = ?stop,
            "capture loop stopped"
        );
        RunSummary { stats, stop }
    }

    fn pull_frames<S, K>(
        &self,
        source: &mut S,
        sink: &mut K,
        cancel: &CancelToken,
        stats: &mut RunStats,
    ) -> StopReason
    where
        S: CaptureSource,
        K: Sink + ?Sized,
    {
        loop {
            if cancel.is_cancelled() {
                return StopReason::Cancelled;
            }
            if let Some(max) = self.max_frames {
                if stats.frames >= max {
                    return StopReason::FrameLimit;
                }
            }
            let res = match source.next_frame() {
                NextFrame::Frame(frame) => {
                    stats.frames += 1;
                    trace!(caplen = frame.caplen(), origlen = frame.origlen, "frame");
                    match self.decoder.decode(&frame) {
                        FrameOutcome::Decoded(record) => {
                            stats.decoded += 1;
                            sink.event(Event::Decoded(&record))
                        }
                        FrameOutcome::Skip(reason) => {
                            stats.skipped += 1;
                            sink.event(Event::Skipped(reason))
                        }
                        FrameOutcome::Malformed(m) => {
                            stats.malformed += 1;
                            sink.event(Event::Malformed(m))
                        }
                    }
                }
                NextFrame::NoDataYet => {
                    stats.idle += 1;
                    trace!("no data before read timeout");
                    Ok(())
                }
                NextFrame::RecoverableError(msg) => {
                    stats.warnings += 1;
                    sink.event(Event::Warning(&msg))
                }
                NextFrame::TerminalError(msg) => {
                    warn!("capture stopped: {}", msg);
                    return StopReason::TerminalError(msg);
                }
                NextFrame::StreamEnded => return StopReason::StreamEnded,
            };
            if let Err(e) = res {
                warn!("sink failed: {}", e);
                return StopReason::SinkFailed(e.to_string());
            }
        }
    }
}

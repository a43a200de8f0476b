// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr).

use std::io::Write;

use lamina_core::trace::{
    FrameBeginEvent, ReconcileSummary, SurfaceChange, SurfaceChangeKind, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
    verbose: bool,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink")
            .field("verbose", &self.verbose)
            .finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
            verbose: false,
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self {
            writer,
            verbose: false,
        }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self {
            writer,
            verbose: false,
        }
    }

    /// Also prints one line per surface change.
    #[must_use]
    pub fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }

    /// Consumes the sink and returns its writer.
    pub fn into_writer(self) -> W {
        self.writer
    }
}

fn kind_name(kind: SurfaceChangeKind) -> &'static str {
    match kind {
        SurfaceChangeKind::Created => "created",
        SurfaceChangeKind::Reused => "reused",
        SurfaceChangeKind::Repainted => "repainted",
        SurfaceChangeKind::Evicted => "evicted",
        SurfaceChangeKind::Failed => "failed",
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        let first = if e.first_render { " first-render" } else { "" };
        let _ = writeln!(
            self.writer,
            "[frame] frame={} root={} items={}{first}",
            e.frame_index, e.root.0, e.item_count,
        );
    }

    fn on_reconcile(&mut self, s: &ReconcileSummary) {
        if s.fast_path {
            let _ = writeln!(
                self.writer,
                "[reconcile] frame={} fast-path retained={}",
                s.frame_index, s.retained,
            );
            return;
        }
        let _ = writeln!(
            self.writer,
            "[reconcile] frame={} created={} reused={} repainted={} retained={} \
             evicted={} failed={} reorders={}",
            s.frame_index,
            s.created,
            s.reused,
            s.repainted,
            s.retained,
            s.evicted,
            s.failed,
            s.reorders,
        );
    }

    fn on_surface_changes(&mut self, frame_index: u64, changes: &[SurfaceChange]) {
        let _ = writeln!(
            self.writer,
            "[surfaces] frame={frame_index} changes={}",
            changes.len(),
        );
        if self.verbose {
            for c in changes {
                let _ = writeln!(
                    self.writer,
                    "  {} {:?} #{:016x}",
                    kind_name(c.kind),
                    c.drawing_type,
                    c.item_hash,
                );
            }
        }
    }
}

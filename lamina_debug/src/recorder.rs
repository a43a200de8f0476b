// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as little-endian records. [`decode`] reads them back as an
//! iterator of [`RecordedEvent`].
//!
//! Surface-change records carry a count followed by that many fixed-size
//! entries.

use lamina_core::backend::RootId;
use lamina_core::item::DrawingType;
use lamina_core::trace::{
    FrameBeginEvent, ReconcileSummary, SurfaceChange, SurfaceChangeKind, TraceSink,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_FRAME_BEGIN: u8 = 1;
const TAG_RECONCILE: u8 = 2;
const TAG_SURFACE_CHANGES: u8 = 3;

/// Bytes per encoded surface change: hash, type, kind.
const CHANGE_SIZE: usize = 8 + 1 + 1;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_bool(&mut self, v: bool) {
        self.write_u8(u8::from(v));
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "there are fewer than 256 drawing types"
    )]
    fn write_drawing_type(&mut self, t: DrawingType) {
        self.write_u8(t.index() as u8);
    }

    fn write_kind(&mut self, k: SurfaceChangeKind) {
        self.write_u8(match k {
            SurfaceChangeKind::Created => 0,
            SurfaceChangeKind::Reused => 1,
            SurfaceChangeKind::Repainted => 2,
            SurfaceChangeKind::Evicted => 3,
            SurfaceChangeKind::Failed => 4,
        });
    }
}

impl TraceSink for RecorderSink {
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        self.write_u8(TAG_FRAME_BEGIN);
        self.write_u64(e.frame_index);
        self.write_u64(e.root.0);
        self.write_u32(e.item_count);
        self.write_bool(e.first_render);
    }

    fn on_reconcile(&mut self, s: &ReconcileSummary) {
        self.write_u8(TAG_RECONCILE);
        self.write_u64(s.frame_index);
        self.write_bool(s.fast_path);
        self.write_u32(s.created);
        self.write_u32(s.reused);
        self.write_u32(s.repainted);
        self.write_u32(s.retained);
        self.write_u32(s.evicted);
        self.write_u32(s.failed);
        self.write_u32(s.reorders);
    }

    fn on_surface_changes(&mut self, frame_index: u64, changes: &[SurfaceChange]) {
        let count = u32::try_from(changes.len()).unwrap_or(u32::MAX);
        self.write_u8(TAG_SURFACE_CHANGES);
        self.write_u64(frame_index);
        self.write_u32(count);
        for c in changes.iter().take(count as usize) {
            self.write_u64(c.item_hash);
            self.write_drawing_type(c.drawing_type);
            self.write_kind(c.kind);
        }
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug)]
pub enum RecordedEvent {
    /// A [`FrameBeginEvent`].
    FrameBegin(FrameBeginEvent),
    /// A [`ReconcileSummary`].
    Reconcile(ReconcileSummary),
    /// Surface changes of one frame.
    SurfaceChanges {
        /// Frame counter.
        frame_index: u64,
        /// The changes, in reconcile order.
        changes: Vec<SurfaceChange>,
    },
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn read_u8(&mut self) -> Option<u8> {
        if self.remaining() < 1 {
            return None;
        }
        let v = self.data[self.pos];
        self.pos += 1;
        Some(v)
    }

    fn read_u32(&mut self) -> Option<u32> {
        if self.remaining() < 4 {
            return None;
        }
        let v = u32::from_le_bytes(self.data[self.pos..self.pos + 4].try_into().ok()?);
        self.pos += 4;
        Some(v)
    }

    fn read_u64(&mut self) -> Option<u64> {
        if self.remaining() < 8 {
            return None;
        }
        let v = u64::from_le_bytes(self.data[self.pos..self.pos + 8].try_into().ok()?);
        self.pos += 8;
        Some(v)
    }

    fn read_bool(&mut self) -> Option<bool> {
        Some(self.read_u8()? != 0)
    }

    fn read_drawing_type(&mut self) -> Option<DrawingType> {
        DrawingType::from_index(usize::from(self.read_u8()?))
    }

    fn read_kind(&mut self) -> Option<SurfaceChangeKind> {
        Some(match self.read_u8()? {
            0 => SurfaceChangeKind::Created,
            1 => SurfaceChangeKind::Reused,
            2 => SurfaceChangeKind::Repainted,
            3 => SurfaceChangeKind::Evicted,
            4 => SurfaceChangeKind::Failed,
            _ => return None,
        })
    }

    fn decode_frame_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::FrameBegin(FrameBeginEvent {
            frame_index: self.read_u64()?,
            root: RootId(self.read_u64()?),
            item_count: self.read_u32()?,
            first_render: self.read_bool()?,
        }))
    }

    fn decode_reconcile(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Reconcile(ReconcileSummary {
            frame_index: self.read_u64()?,
            fast_path: self.read_bool()?,
            created: self.read_u32()?,
            reused: self.read_u32()?,
            repainted: self.read_u32()?,
            retained: self.read_u32()?,
            evicted: self.read_u32()?,
            failed: self.read_u32()?,
            reorders: self.read_u32()?,
        }))
    }

    fn decode_surface_changes(&mut self) -> Option<RecordedEvent> {
        let frame_index = self.read_u64()?;
        let count = self.read_u32()? as usize;
        if self.remaining() < count.saturating_mul(CHANGE_SIZE) {
            return None;
        }
        let mut changes = Vec::with_capacity(count);
        for _ in 0..count {
            changes.push(SurfaceChange {
                item_hash: self.read_u64()?,
                drawing_type: self.read_drawing_type()?,
                kind: self.read_kind()?,
            });
        }
        Some(RecordedEvent::SurfaceChanges {
            frame_index,
            changes,
        })
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        match tag {
            TAG_FRAME_BEGIN => self.decode_frame_begin(),
            TAG_RECONCILE => self.decode_reconcile(),
            TAG_SURFACE_CHANGES => self.decode_surface_changes(),
            _ => None, // unknown tag → stop iteration
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

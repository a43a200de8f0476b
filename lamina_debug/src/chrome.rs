// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][format] JSON to the given writer.
//!
//! Recordings carry no wall-clock time, so frames are laid out on a synthetic
//! timeline: frame `n` starts at `n * frame_interval_us`.
//!
//! [format]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
///
/// Each frame becomes a `B`/`E` slice spanning half of `frame_interval_us`,
/// with the reconcile counts attached to its end event and plotted as a
/// counter track.
pub fn export(bytes: &[u8], frame_interval_us: f64, writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();
    let frame_ts = |frame_index: u64| frame_index as f64 * frame_interval_us;

    for recorded in decode(bytes) {
        match recorded {
            RecordedEvent::FrameBegin(e) => {
                events.push(json!({
                    "ph": "B",
                    "name": "Reconcile",
                    "cat": "Frame",
                    "ts": frame_ts(e.frame_index),
                    "pid": 0,
                    "tid": 0,
                    "args": {
                        "frame_index": e.frame_index,
                        "root": e.root.0,
                        "items": e.item_count,
                        "first_render": e.first_render,
                    }
                }));
            }
            RecordedEvent::Reconcile(s) => {
                let ts = frame_ts(s.frame_index) + frame_interval_us / 2.0;
                events.push(json!({
                    "ph": "E",
                    "name": "Reconcile",
                    "cat": "Frame",
                    "ts": ts,
                    "pid": 0,
                    "tid": 0,
                    "args": {
                        "frame_index": s.frame_index,
                        "fast_path": s.fast_path,
                        "failed": s.failed,
                        "reorders": s.reorders,
                    }
                }));
                events.push(json!({
                    "ph": "C",
                    "name": "Surfaces",
                    "cat": "Summary",
                    "ts": ts,
                    "pid": 0,
                    "args": {
                        "created": s.created,
                        "reused": s.reused,
                        "repainted": s.repainted,
                        "retained": s.retained,
                        "evicted": s.evicted,
                    }
                }));
            }
            RecordedEvent::SurfaceChanges {
                frame_index,
                changes,
            } => {
                let ts = frame_ts(frame_index);
                for c in changes {
                    events.push(json!({
                        "ph": "i",
                        "name": format!("{:?}", c.kind),
                        "cat": "Rich",
                        "ts": ts,
                        "pid": 0,
                        "tid": 0,
                        "s": "t",
                        "args": {
                            "frame_index": frame_index,
                            "item": format!("{:016x}", c.item_hash),
                            "type": format!("{:?}", c.drawing_type),
                        }
                    }));
                }
            }
        }
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::RecorderSink;
    use lamina_core::backend::memory::MemoryBackend;
    use lamina_core::backend::{RootId, Scene};
    use lamina_core::item::DrawingType;
    use lamina_core::recorder::PictureRecorder;
    use lamina_core::trace::Tracer;

    #[test]
    fn export_produces_valid_json() {
        let mut sink = RecorderSink::new();
        let mut scene = Scene::new(MemoryBackend::new());
        let mut recorder: PictureRecorder<MemoryBackend> = PictureRecorder::new();
        let root = RootId(1);

        recorder.start_recording(root);
        let _ = recorder.draw(DrawingType::Rect, 1, kurbo::Rect::new(0.0, 0.0, 4.0, 4.0));
        let _ = recorder.draw(DrawingType::Oval, 2, kurbo::Rect::new(0.0, 0.0, 4.0, 4.0));
        let mut tracer = Tracer::new(&mut sink);
        let _ = recorder.finish_recording_traced(root, &mut scene, &mut tracer);
        drop(tracer);

        let mut out = Vec::new();
        export(sink.as_bytes(), 16_000.0, &mut out).unwrap();
        let json_str = String::from_utf8(out).unwrap();

        let parsed: Vec<Value> = serde_json::from_str(&json_str).unwrap();
        // Begin, end, counter, then one instant per created surface.
        assert_eq!(parsed.len(), 5);

        assert_eq!(parsed[0]["ph"], "B");
        assert_eq!(parsed[0]["args"]["first_render"], true);
        assert_eq!(parsed[0]["ts"], 16_000.0);

        assert_eq!(parsed[1]["ph"], "E");
        assert_eq!(parsed[1]["ts"], 24_000.0);

        assert_eq!(parsed[2]["ph"], "C");
        assert_eq!(parsed[2]["args"]["created"], 2);

        assert_eq!(parsed[3]["name"], "Created");
        assert_eq!(parsed[3]["args"]["type"], "Rect");
        assert_eq!(parsed[4]["args"]["type"], "Oval");
    }

    #[test]
    fn export_empty_recording() {
        let mut out = Vec::new();
        export(&[], 16_000.0, &mut out).unwrap();
        let json_str = String::from_utf8(out).unwrap();
        let parsed: Vec<Value> = serde_json::from_str(&json_str).unwrap();
        assert!(parsed.is_empty());
    }
}

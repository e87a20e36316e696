// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`CommitTraceSink`] and writes one line per
//! event to a [`Write`](std::io::Write) destination (default: stderr).

use std::fmt;
use std::io::Write;

use accretion_core::layer::LayerId;
use accretion_core::trace::{
    AnimationFallbackEvent, BackingSwapEvent, CommitTraceSink, DepthCapEvent, FlushBeginEvent,
    FlushEndEvent, LayerCommitEvent, StructuralChange, StructuralLayerEvent,
};
use kurbo::Rect;

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
}

impl<W: Write> fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Consumes the sink and returns the destination.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// `x,y wxh` with one decimal.
struct DisplayRect(Rect);

impl fmt::Display for DisplayRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = self.0;
        write!(
            f,
            "{:.1},{:.1} {:.1}x{:.1}",
            r.x0,
            r.y0,
            r.width(),
            r.height()
        )
    }
}

/// `index@generation`.
struct DisplayId(LayerId);

impl fmt::Display for DisplayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.0.index(), self.0.generation())
    }
}

impl<W: Write> CommitTraceSink for PrettyPrintSink<W> {
    fn on_flush_begin(&mut self, e: &FlushBeginEvent) {
        let _ = match e.clip {
            Some(clip) => writeln!(
                self.writer,
                "[flush] root={} clip={}",
                DisplayId(e.root),
                DisplayRect(clip)
            ),
            None => writeln!(self.writer, "[flush] root={} this-layer-only", DisplayId(e.root)),
        };
    }

    fn on_flush_end(&mut self, e: &FlushEndEvent) {
        let _ = writeln!(
            self.writer,
            "[flush-end] root={} visited={} committed={}",
            DisplayId(e.root),
            e.layers_visited,
            e.layers_committed,
        );
    }

    fn on_layer_commit(&mut self, e: &LayerCommitEvent) {
        let _ = writeln!(
            self.writer,
            "  [commit] layer={} depth={} changes={:?}",
            DisplayId(e.layer),
            e.depth,
            e.changes,
        );
    }

    fn on_backing_swap(&mut self, e: &BackingSwapEvent) {
        let _ = writeln!(
            self.writer,
            "  [backing] layer={} {}",
            DisplayId(e.layer),
            if e.tiled { "plain -> tiled" } else { "tiled -> plain" },
        );
    }

    fn on_structural_layer(&mut self, e: &StructuralLayerEvent) {
        let change = match e.change {
            StructuralChange::Created => "created",
            StructuralChange::Removed => "removed",
        };
        let _ = writeln!(
            self.writer,
            "  [structural] layer={} {change} purpose={:?}",
            DisplayId(e.layer),
            e.purpose,
        );
    }

    fn on_animation_fallback(&mut self, e: &AnimationFallbackEvent<'_>) {
        let _ = writeln!(
            self.writer,
            "[fallback] layer={} animation={:?} reason={}",
            DisplayId(e.layer),
            e.name,
            e.reason,
        );
    }

    fn on_depth_cap(&mut self, e: &DepthCapEvent) {
        let _ = writeln!(
            self.writer,
            "  [depth-cap] layer={} depth={} sublayers pruned",
            DisplayId(e.layer),
            e.depth,
        );
    }
}

#[cfg(test)]
mod tests {
    use accretion_core::config::CommitConfig;
    use accretion_core::layer::{LayerTree, RecordingClient};
    use accretion_core::native::HeadlessCompositor;
    use accretion_core::trace::Tracer;
    use kurbo::Size;

    use super::*;

    fn output(sink: PrettyPrintSink<Vec<u8>>) -> String {
        String::from_utf8(sink.into_inner()).expect("trace output is UTF-8")
    }

    #[test]
    fn flush_prints_one_line_per_event() {
        let mut tree = LayerTree::new(
            HeadlessCompositor::new(),
            RecordingClient::new(),
            CommitConfig::modern(),
        );
        let root = tree.create_layer();
        let child = tree.create_layer();
        tree.add_child(root, child);
        tree.set_size(child, Size::new(100.0, 50.0));
        tree.set_preserves_3d(child, true);

        let mut sink = PrettyPrintSink::with_writer(Vec::new());
        tree.flush_compositing_state(
            root,
            Rect::new(0.0, 0.0, 800.0, 600.0),
            &mut Tracer::new(&mut sink),
        );
        let text = output(sink);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.first(), Some(&"[flush] root=0@0 clip=0.0,0.0 800.0x600.0"));
        assert_eq!(lines.last(), Some(&"[flush-end] root=0@0 visited=2 committed=2"));
        assert!(
            lines
                .iter()
                .any(|l| l.starts_with("  [structural] layer=1@0 created purpose=Preserve3D")),
            "structural layer creation is printed: {text}"
        );
        assert_eq!(lines.iter().filter(|l| l.starts_with("  [commit]")).count(), 2);
    }

    #[test]
    fn depth_cap_and_fallback_lines() {
        let mut sink = PrettyPrintSink::with_writer(Vec::new());
        let mut tree = LayerTree::new(
            HeadlessCompositor::new(),
            RecordingClient::new(),
            CommitConfig {
                max_layer_tree_depth: 1,
                ..CommitConfig::modern()
            },
        );
        let root = tree.create_layer();
        let child = tree.create_layer();
        tree.add_child(root, child);
        tree.flush_compositing_state(root, Rect::ZERO, &mut Tracer::new(&mut sink));
        sink.on_animation_fallback(&AnimationFallbackEvent {
            layer: child,
            name: "spin",
            reason: accretion_core::animation::AnimationFallback::SteppedTiming,
        });

        let text = output(sink);
        assert!(text.contains("  [depth-cap] layer=1@0 depth=2 sublayers pruned\n"), "{text}");
        assert!(text.contains("[fallback] layer=1@0 animation=\"spin\" reason="), "{text}");
    }
}

// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pretty-printing, recording, and layer-tree dumps for accretion
//! diagnostics.
//!
//! This crate provides [`CommitTraceSink`](accretion_core::trace::CommitTraceSink)
//! implementations and tree inspection for development and post-mortem
//! analysis:
//!
//! - [`pretty::PrettyPrintSink`] — human-readable one-line-per-event output.
//! - [`recorder::RecorderSink`] — in-memory recording with
//!   [`replay`](recorder::RecorderSink::replay) into another sink.
//! - [`snapshot::TreeSnapshot`] — a point-in-time capture of a layer tree's
//!   visible rects and tile caches, printable as an indented text dump or
//!   exportable as JSON.

pub mod pretty;
pub mod recorder;
pub mod snapshot;

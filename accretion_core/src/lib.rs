// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Retained compositing-layer tree with a batched commit engine.
//!
//! `accretion_core` sits between a platform-independent layer model (driven by
//! style and layout code) and an asynchronous native compositor. Callers mutate
//! [`LayerTree`](layer::LayerTree) at any time; mutations only record dirty
//! state. At a flush point the tree is walked once and every pending change is
//! reconciled into the smallest set of [`Compositor`](native::Compositor)
//! operations.
//!
//! It is `no_std` compatible (with `alloc`).
//!
//! # Architecture
//!
//! ```text
//!   host mutators (set_position, add_child, add_animation, ...)
//!       │  note_change(flags)
//!       ▼
//!   LayerTree ── per-layer ChangeFlags ──► LayerClient::notify_flush_required
//!       │
//!       │  flush_compositing_state(root, clip)
//!       ▼
//!   recursive commit
//!     visible rect ─► before-children steps ─► mask / children / replica
//!                                             ─► after-children steps
//!       │
//!       ▼
//!   Compositor (native layers, animations, tiled backings)
//! ```
//!
//! **[`layer`]** — The layer tree: generational handles, the mutator surface,
//! and the commit walk with its structural-layer, tiling, clone, and animation
//! machinery.
//!
//! **[`dirty`]** — [`ChangeFlags`](dirty::ChangeFlags) and the single ordered
//! table of before-children commit steps.
//!
//! **[`animation`]** — Keyframe value lists, timing metadata, and the
//! synthesizer that turns them into declarative
//! [`PlatformAnimation`](animation::PlatformAnimation)s or reports an
//! [`AnimationFallback`](animation::AnimationFallback).
//!
//! **[`native`]** — The [`Compositor`](native::Compositor) collaborator
//! contract plus an in-memory [`HeadlessCompositor`](native::HeadlessCompositor).
//!
//! **[`geometry`]** — Quads, transform-state propagation, and pixel alignment.
//!
//! **[`transform`]** — Column-major 4×4 transform math.
//!
//! **[`config`]** — [`CommitConfig`](config::CommitConfig) limits and
//! per-platform animation quirks.
//!
//! **[`trace`]** — [`CommitTraceSink`](trace::CommitTraceSink) and the
//! zero-overhead [`Tracer`](trace::Tracer) wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod animation;
pub mod config;
pub mod dirty;
pub mod geometry;
pub mod layer;
pub mod native;
pub mod trace;
pub mod transform;

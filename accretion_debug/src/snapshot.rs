// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layer-tree dumps.
//!
//! [`TreeSnapshot::capture`] walks a [`LayerTree`] from a root and records,
//! per layer, its committed geometry, visible rect, and tile-cache state. The
//! snapshot prints as an indented tree through [`Display`](fmt::Display) and
//! exports to JSON with [`TreeSnapshot::to_json`].

use std::fmt::{self, Write as _};

use accretion_core::layer::{LayerClient, LayerId, LayerTree};
use accretion_core::native::{Compositor, TileGridExtent};
use kurbo::{Point, Rect, Size};
use serde_json::{Value, json};

/// How a layer hangs off its parent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayerRole {
    /// The layer the snapshot started at.
    Root,
    /// An ordinary child.
    Child,
    /// The parent's mask.
    Mask,
    /// The parent's replica.
    Replica,
}

impl LayerRole {
    fn as_str(self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Child => "child",
            Self::Mask => "mask",
            Self::Replica => "replica",
        }
    }
}

/// Tile-cache state of a tiled backing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TileSnapshot {
    /// Area the backing currently keeps tiles for.
    pub coverage: Rect,
    /// Size of one tile.
    pub tile_size: Size,
    /// Tile counts covering `coverage`.
    pub grid: TileGridExtent,
}

/// One layer in a [`TreeSnapshot`].
#[derive(Clone, Debug, PartialEq)]
pub struct LayerSnapshot {
    /// The layer.
    pub id: LayerId,
    /// How it is attached.
    pub role: LayerRole,
    /// Debug name.
    pub name: String,
    /// Position in the parent.
    pub position: Point,
    /// Bounds size.
    pub size: Size,
    /// Visible rect from the last flush.
    pub visible_rect: Rect,
    /// Tile-cache state, for tiled backings.
    pub tiles: Option<TileSnapshot>,
    /// Backing store estimate in bytes.
    pub backing_store_bytes: f64,
    /// Mask, children, then replica.
    pub children: Vec<LayerSnapshot>,
}

/// A captured layer tree.
#[derive(Clone, Debug, PartialEq)]
pub struct TreeSnapshot {
    /// The root layer.
    pub root: LayerSnapshot,
}

impl TreeSnapshot {
    /// Captures the subtree under `root`.
    #[must_use]
    pub fn capture<C: Compositor, L: LayerClient>(tree: &LayerTree<C, L>, root: LayerId) -> Self {
        Self {
            root: capture_layer(tree, root, LayerRole::Root),
        }
    }

    /// Number of layers in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        fn count(layer: &LayerSnapshot) -> usize {
            1 + layer.children.iter().map(count).sum::<usize>()
        }
        count(&self.root)
    }

    /// Always `false`; a snapshot contains at least its root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// The snapshot as a JSON tree.
    #[must_use]
    pub fn to_json(&self) -> Value {
        layer_json(&self.root)
    }
}

fn capture_layer<C: Compositor, L: LayerClient>(
    tree: &LayerTree<C, L>,
    id: LayerId,
    role: LayerRole,
) -> LayerSnapshot {
    let tiles = tree.tiled_backing(id).map(|t| TileSnapshot {
        coverage: t.tile_coverage_rect(),
        tile_size: t.tile_size(),
        grid: t.tile_grid_extent(),
    });

    let mut children = Vec::new();
    if let Some(mask) = tree.mask_layer(id) {
        children.push(capture_layer(tree, mask, LayerRole::Mask));
    }
    for &child in tree.children(id) {
        children.push(capture_layer(tree, child, LayerRole::Child));
    }
    if let Some(replica) = tree.replica_layer(id) {
        children.push(capture_layer(tree, replica, LayerRole::Replica));
    }

    LayerSnapshot {
        id,
        role,
        name: tree.name(id).to_owned(),
        position: tree.position(id),
        size: tree.size(id),
        visible_rect: tree.visible_rect(id),
        tiles,
        backing_store_bytes: tree.backing_store_memory_estimate(id),
        children,
    }
}

// ---------------------------------------------------------------------------
// Text
// ---------------------------------------------------------------------------

impl fmt::Display for TreeSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        write_layer(&mut out, &self.root, 0)?;
        f.write_str(&out)
    }
}

fn write_layer(out: &mut String, layer: &LayerSnapshot, indent: usize) -> fmt::Result {
    let pad = "  ".repeat(indent);
    write!(out, "{pad}({} {}@{}", layer.role.as_str(), layer.id.index(), layer.id.generation())?;
    if !layer.name.is_empty() {
        write!(out, " {:?}", layer.name)?;
    }
    writeln!(out)?;
    writeln!(
        out,
        "{pad}  (position {}, {}) (size {} x {})",
        layer.position.x, layer.position.y, layer.size.width, layer.size.height
    )?;
    let v = layer.visible_rect;
    writeln!(
        out,
        "{pad}  (visible rect {}, {} {} x {})",
        v.x0,
        v.y0,
        v.width(),
        v.height()
    )?;
    if let Some(tiles) = &layer.tiles {
        let c = tiles.coverage;
        writeln!(
            out,
            "{pad}  (tile cache coverage {}, {} {} x {})",
            c.x0,
            c.y0,
            c.width(),
            c.height()
        )?;
        writeln!(
            out,
            "{pad}  (tile size {} x {})",
            tiles.tile_size.width, tiles.tile_size.height
        )?;
        writeln!(
            out,
            "{pad}  (tiles grid {} x {})",
            tiles.grid.columns, tiles.grid.rows
        )?;
    }
    for child in &layer.children {
        write_layer(out, child, indent + 1)?;
    }
    writeln!(out, "{pad})")
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

fn rect_json(r: Rect) -> Value {
    json!([r.x0, r.y0, r.width(), r.height()])
}

fn layer_json(layer: &LayerSnapshot) -> Value {
    let tiles = layer.tiles.map_or(Value::Null, |t| {
        json!({
            "coverage": rect_json(t.coverage),
            "tile_size": [t.tile_size.width, t.tile_size.height],
            "grid": [t.grid.columns, t.grid.rows],
        })
    });
    json!({
        "id": layer.id.index(),
        "generation": layer.id.generation(),
        "role": layer.role.as_str(),
        "name": layer.name,
        "position": [layer.position.x, layer.position.y],
        "size": [layer.size.width, layer.size.height],
        "visible_rect": rect_json(layer.visible_rect),
        "tiles": tiles,
        "backing_store_bytes": layer.backing_store_bytes,
        "children": layer.children.iter().map(layer_json).collect::<Vec<_>>(),
    })
}

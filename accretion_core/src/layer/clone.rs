// Copyright 2026 the Accretion Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Replica clones.
//!
//! A reflection is drawn by cloning the native layers of the replicated
//! subtree. Every clone is keyed by a [`CloneId`]: the path of branch choices
//! (child or replica) from the reflection root down to the cloned layer. The
//! same path always maps to the same clone, so repeated commits reuse native
//! layers instead of rebuilding them.

use alloc::vec::Vec;

use hashbrown::HashMap;

use crate::native::NativeLayerId;

/// Which edge a clone walk took to reach a layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BranchType {
    /// Descended into a child.
    Child,
    /// Descended into a replica.
    Replica,
}

/// Whether a clone is the root of a reflection or somewhere beneath it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CloneLevel {
    /// The clone of the replicated layer itself. Its opacity and animations
    /// are not copied; the replica positions it.
    Root,
    /// Any clone below the root. Copies opacity and animations so the
    /// reflection animates in step with the original.
    Intermediate,
}

/// A bit path identifying one clone of a layer (`1` = replica branch).
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct CloneId {
    words: Vec<u64>,
    len: u32,
}

impl CloneId {
    /// Number of branches in the path.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len as usize
    }

    /// Returns `true` for the empty path.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Branch at `index`, counting from the reflection root.
    #[must_use]
    pub fn branch(&self, index: usize) -> Option<BranchType> {
        if index >= self.len() {
            return None;
        }
        let bit = (self.words[index / 64] >> (index % 64)) & 1;
        Some(if bit == 1 {
            BranchType::Replica
        } else {
            BranchType::Child
        })
    }

    /// Returns `true` if the last step was into a replica, i.e. this clone is
    /// the immediate root of a reflection.
    ///
    /// Such clones move with the original, so per-property updates skip them.
    #[must_use]
    pub fn is_replica_root(&self) -> bool {
        self.len
            .checked_sub(1)
            .and_then(|last| self.branch(last as usize))
            == Some(BranchType::Replica)
    }

    fn from_branches(branches: &[BranchType]) -> Self {
        let mut words = alloc::vec![0_u64; branches.len().div_ceil(64)];
        for (i, b) in branches.iter().enumerate() {
            if *b == BranchType::Replica {
                words[i / 64] |= 1 << (i % 64);
            }
        }
        #[expect(
            clippy::cast_possible_truncation,
            reason = "branch stacks are bounded by tree depth"
        )]
        let len = branches.len() as u32;
        Self { words, len }
    }
}

impl core::fmt::Debug for CloneId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("CloneId(")?;
        for i in 0..self.len() {
            let c = match self.branch(i) {
                Some(BranchType::Replica) => '1',
                _ => '0',
            };
            write!(f, "{c}")?;
        }
        f.write_str(")")
    }
}

/// Branch stack carried through a clone walk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplicaState {
    branches: Vec<BranchType>,
    replica_depth: usize,
}

impl ReplicaState {
    /// Starts a walk with a single branch.
    #[must_use]
    pub fn new(first: BranchType) -> Self {
        let mut state = Self {
            branches: Vec::new(),
            replica_depth: 0,
        };
        state.push(first);
        state
    }

    /// Descends one level.
    pub fn push(&mut self, branch: BranchType) {
        self.branches.push(branch);
        if branch == BranchType::Replica {
            self.replica_depth += 1;
        }
    }

    /// Changes the type of the innermost branch.
    pub fn set_branch_type(&mut self, branch: BranchType) {
        if let Some(top) = self.branches.last_mut() {
            match (*top, branch) {
                (BranchType::Child, BranchType::Replica) => self.replica_depth += 1,
                (BranchType::Replica, BranchType::Child) => self.replica_depth -= 1,
                _ => {}
            }
            *top = branch;
        }
    }

    /// Ascends one level.
    pub fn pop(&mut self) {
        if self.branches.pop() == Some(BranchType::Replica) {
            self.replica_depth -= 1;
        }
    }

    /// Number of replica branches on the stack.
    #[must_use]
    pub fn replica_depth(&self) -> usize {
        self.replica_depth
    }

    /// Identifier of the current position.
    #[must_use]
    pub fn clone_id(&self) -> CloneId {
        CloneId::from_branches(&self.branches)
    }
}

/// Clone maps for the three native layers a logical layer may own.
#[derive(Clone, Debug, Default)]
pub(crate) struct CloneMaps {
    pub(crate) primary: HashMap<CloneId, NativeLayerId>,
    pub(crate) structural: HashMap<CloneId, NativeLayerId>,
    pub(crate) contents: HashMap<CloneId, NativeLayerId>,
}

impl CloneMaps {
    pub(crate) fn is_empty(&self) -> bool {
        self.primary.is_empty() && self.structural.is_empty() && self.contents.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.primary.len() + self.structural.len() + self.contents.len()
    }

    /// Removes every clone, returning the native layers for release.
    pub(crate) fn drain_all(&mut self) -> Vec<NativeLayerId> {
        self.primary
            .drain()
            .chain(self.structural.drain())
            .chain(self.contents.drain())
            .map(|(_, layer)| layer)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::format;

    #[test]
    fn clone_ids_encode_paths() {
        let mut state = ReplicaState::new(BranchType::Replica);
        let root = state.clone_id();
        assert!(root.is_replica_root(), "a lone replica branch is a root");

        state.push(BranchType::Child);
        let child = state.clone_id();
        assert!(!child.is_replica_root(), "child clones are not roots");
        assert_ne!(root, child, "different paths must not collide");
        assert_eq!(format!("{child:?}"), "CloneId(10)");

        state.pop();
        assert_eq!(state.clone_id(), root, "equal paths give equal ids");
    }

    #[test]
    fn replica_depth_tracks_branch_changes() {
        let mut state = ReplicaState::new(BranchType::Replica);
        state.push(BranchType::Child);
        assert_eq!(state.replica_depth(), 1);
        state.set_branch_type(BranchType::Replica);
        assert_eq!(state.replica_depth(), 2);
        assert!(state.clone_id().is_replica_root());
        state.set_branch_type(BranchType::Child);
        assert_eq!(state.replica_depth(), 1);
        state.pop();
        state.pop();
        assert_eq!(state.replica_depth(), 0);
    }

    #[test]
    fn long_paths_span_words() {
        let mut state = ReplicaState::new(BranchType::Child);
        for _ in 0..70 {
            state.push(BranchType::Child);
        }
        state.push(BranchType::Replica);
        let id = state.clone_id();
        assert_eq!(id.len(), 72);
        assert_eq!(id.branch(71), Some(BranchType::Replica));
        assert_eq!(id.branch(70), Some(BranchType::Child));
        assert_eq!(id.branch(72), None);
        assert!(id.is_replica_root());
    }
}

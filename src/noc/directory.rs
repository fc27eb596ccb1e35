// Snowcap: Synthesizing Network-Wide Configuration Updates
// Copyright (C) 2021  Tibor Schneider
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

//! Per-node page table: coherence state, LRU residency, and home-side presence bookkeeping.

use std::collections::{HashMap, HashSet, VecDeque};

use log::trace;

use crate::error::DirectoryError;

use super::{NodeName, PageId};

/// Coherence state of a page at a single node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoherenceState {
    /// the node holds no usable copy
    Invalid,
    /// the node holds a read-only copy, possibly shared with others
    Shared,
    /// the node holds the sole, writable copy
    Modified,
}

/// What happened when [`Directory::add`] needed to make room for an incoming page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum EvictionOutcome {
    /// no eviction was necessary
    None,
    /// the evicted page was `MODIFIED` and must be returned to its home
    Save(PageId),
    /// the evicted page was merely `SHARED` and its home only needs a notice
    Notice(PageId),
}

/// The directory owned by a single node. Tracks, for every page this node has ever held, its
/// coherence state and its position in the LRU list; for pages this node homes, additionally
/// tracks the presence set of every node (including itself) that may hold a live copy.
#[derive(Debug, Clone)]
pub(crate) struct Directory {
    node: NodeName,
    size: usize,
    homed_pages: HashSet<PageId>,
    flags: HashMap<PageId, CoherenceState>,
    lru: VecDeque<PageId>,
    presence: HashMap<PageId, HashSet<NodeName>>,
}

impl Directory {
    /// Build a directory for `node`, with room for `size` resident pages. Every page in
    /// `homed_pages` starts out `MODIFIED` and solely held by `node` itself, matching the
    /// convention that a page's home is always a valid (if uninteresting) holder of its own data
    /// before any other node has requested it.
    pub(crate) fn new(
        node: impl Into<NodeName>,
        size: usize,
        homed_pages: impl IntoIterator<Item = PageId>,
    ) -> Self {
        let node = node.into();
        let homed_pages: HashSet<PageId> = homed_pages.into_iter().collect();
        let mut dir = Self {
            node,
            size,
            homed_pages: homed_pages.clone(),
            flags: HashMap::new(),
            lru: VecDeque::new(),
            presence: homed_pages.iter().map(|&p| (p, HashSet::new())).collect(),
        };
        for page in homed_pages {
            dir.add(page);
            dir.flags.insert(page, CoherenceState::Modified);
            dir.presence.get_mut(&page).unwrap().insert(dir.node.clone());
        }
        dir
    }

    /// Whether this node currently holds a usable (non-`INVALID`) copy of `page`.
    pub(crate) fn has(&self, page: PageId) -> bool {
        !matches!(self.flags.get(&page).copied().unwrap_or(CoherenceState::Invalid), CoherenceState::Invalid)
    }

    /// Whether this node holds `page` `MODIFIED`.
    pub(crate) fn is_modified(&self, page: PageId) -> bool {
        self.flags.get(&page).copied() == Some(CoherenceState::Modified)
    }

    /// The coherence state of `page` at this node; `INVALID` if never held.
    pub(crate) fn state(&self, page: PageId) -> CoherenceState {
        self.flags.get(&page).copied().unwrap_or(CoherenceState::Invalid)
    }

    /// The presence set of a page this node homes.
    pub(crate) fn copy_holders(&self, page: PageId) -> Result<&HashSet<NodeName>, DirectoryError> {
        self.presence.get(&page).ok_or_else(|| DirectoryError::NotHomed { node: self.node.clone(), page })
    }

    /// Invalidate this node's own copy of `page`. Requires the page to currently be resident.
    pub(crate) fn dirty(&mut self, page: PageId) -> Result<(), DirectoryError> {
        self.require_resident(page)?;
        trace!("{}: page {} invalidated locally", self.node, page);
        self.flags.insert(page, CoherenceState::Invalid);
        Ok(())
    }

    /// Remove `holder` from the presence set of a homed `page`.
    pub(crate) fn erase_presence(&mut self, page: PageId, holder: &str) -> Result<(), DirectoryError> {
        let node = self.node.clone();
        let set = self
            .presence
            .get_mut(&page)
            .ok_or_else(|| DirectoryError::NotHomed { node: node.clone(), page })?;
        if !set.remove(holder) {
            return Err(DirectoryError::NotPresent { node, page, holder: holder.to_string() });
        }
        Ok(())
    }

    /// Add `holder` to the presence set of a homed `page`.
    pub(crate) fn add_presence(&mut self, page: PageId, holder: impl Into<NodeName>) -> Result<(), DirectoryError> {
        let node = self.node.clone();
        let set = self
            .presence
            .get_mut(&page)
            .ok_or_else(|| DirectoryError::NotHomed { node, page })?;
        set.insert(holder.into());
        Ok(())
    }

    /// The node that should be treated as the owner of a homed page: the sole remote holder if
    /// this home's own copy is invalid, otherwise the home itself.
    pub(crate) fn owner(&self, page: PageId) -> Result<NodeName, DirectoryError> {
        let holders = self.copy_holders(page)?;
        if self.flags.get(&page).copied().unwrap_or(CoherenceState::Invalid) == CoherenceState::Invalid {
            if holders.len() != 1 {
                return Err(DirectoryError::InsufficientHolders { node: self.node.clone(), page, found: holders.len() });
            }
            Ok(holders.iter().next().cloned().unwrap())
        } else {
            Ok(self.node.clone())
        }
    }

    /// Make room for `page` if the directory is full, transition it to `SHARED`, and record it
    /// in the LRU list. Returns what eviction (if any) occurred, so that the caller can emit the
    /// resulting `EVICTION_SAVE`/`EVICTION_NOTICE` packet.
    pub(crate) fn add(&mut self, page: PageId) -> EvictionOutcome {
        let outcome = self.evict_if_full();
        self.flags.insert(page, CoherenceState::Shared);
        self.lru.push_back(page);
        outcome
    }

    /// Transition a resident page to `MODIFIED`.
    pub(crate) fn modify(&mut self, page: PageId) -> Result<(), DirectoryError> {
        self.require_resident(page)?;
        self.flags.insert(page, CoherenceState::Modified);
        Ok(())
    }

    /// Transition a resident page to `SHARED`.
    pub(crate) fn share(&mut self, page: PageId) -> Result<(), DirectoryError> {
        self.require_resident(page)?;
        self.flags.insert(page, CoherenceState::Shared);
        Ok(())
    }

    fn require_resident(&self, page: PageId) -> Result<(), DirectoryError> {
        if self.has(page) {
            Ok(())
        } else {
            Err(DirectoryError::NotResident { node: self.node.clone(), page })
        }
    }

    /// Count of resident (non-`INVALID`) pages.
    fn resident_count(&self) -> usize {
        self.flags.values().filter(|s| !matches!(s, CoherenceState::Invalid)).count()
    }

    fn evict_if_full(&mut self) -> EvictionOutcome {
        if self.resident_count() < self.size {
            return EvictionOutcome::None;
        }
        // Scan the LRU list for the oldest page this node does not home; homed pages are
        // recycled to the back of the queue rather than ever being chosen as a victim.
        let scan_len = self.lru.len();
        for _ in 0..scan_len {
            let candidate = match self.lru.pop_front() {
                Some(p) => p,
                None => break,
            };
            if self.homed_pages.contains(&candidate) {
                self.lru.push_back(candidate);
                continue;
            }
            let was_modified = self.is_modified(candidate);
            self.flags.insert(candidate, CoherenceState::Invalid);
            trace!("{}: evicting page {} ({})", self.node, candidate, if was_modified { "modified" } else { "shared" });
            return if was_modified { EvictionOutcome::Save(candidate) } else { EvictionOutcome::Notice(candidate) };
        }
        EvictionOutcome::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn homed_page_starts_modified_and_self_present() {
        let dir = Directory::new("A", 2, vec![1]);
        assert!(dir.is_modified(1));
        assert_eq!(dir.copy_holders(1).unwrap(), &maplit::hashset! { "A".to_string() });
    }

    #[test]
    fn add_evicts_oldest_non_homed_page() {
        let mut dir = Directory::new("A", 2, vec![1]);
        dir.add(10);
        let outcome = dir.add(11);
        // size is 2, homed page 1 counts as resident; adding 10 then 11 must evict 10.
        assert_eq!(outcome, EvictionOutcome::Notice(10));
        assert!(!dir.has(10));
        assert!(dir.has(11));
        assert!(dir.has(1));
    }

    #[test]
    fn modify_requires_residency() {
        let mut dir = Directory::new("A", 2, Vec::new());
        assert!(dir.modify(5).is_err());
        dir.add(5);
        assert!(dir.modify(5).is_ok());
    }
}

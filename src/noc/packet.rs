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

//! The wire message exchanged between nodes, and the closed set of actions it may carry.

use std::fmt;

use super::{NodeName, PageId};

/// The fourteen coherence message kinds. Naming follows the direction implied by the protocol:
/// a plain name travels from a requester to a home node, a `REMOTE_` prefix travels from a home
/// node to a remote holder, and an `_ACKNOWLEDGE` suffix travels back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Requester asks its page's home for a read-only copy.
    ReadMiss,
    /// Home grants a read-only copy to the requester.
    Reply,
    /// Home asks a remote exclusive holder to relinquish its copy to shared.
    RemoteRead,
    /// Remote holder confirms it downgraded to shared.
    RemoteReply,
    /// Requester, already a sharer, asks its page's home to invalidate every other sharer.
    Invalidate,
    /// Home confirms every other sharer was invalidated; requester may become exclusive.
    InvalidateAcknowledge,
    /// Home asks a remote sharer to drop its copy.
    RemoteInvalidate,
    /// Remote sharer confirms it dropped its copy.
    RemoteInvalidateAcknowledge,
    /// Requester, lacking the page, asks its page's home for an exclusive copy.
    ReadInvalidate,
    /// Home confirms the requester now holds the sole, exclusive copy.
    ReadInvalidateAcknowledge,
    /// Home asks a remote holder to drop and return its copy.
    RemoteReadInvalidate,
    /// Remote holder confirms it dropped its copy.
    RemoteReadInvalidateAcknowledge,
    /// An evictor returns a modified page to its home.
    EvictionSave,
    /// An evictor notifies its home that it dropped a shared copy.
    EvictionNotice,
}

impl Action {
    /// The textual identifier used in the trace, matching the original naming convention.
    pub fn name(self) -> &'static str {
        match self {
            Action::ReadMiss => "READ_MISS",
            Action::Reply => "REPLY",
            Action::RemoteRead => "REMOTE_READ",
            Action::RemoteReply => "REMOTE_REPLY",
            Action::Invalidate => "INVALIDATE",
            Action::InvalidateAcknowledge => "INVALIDATE_ACKNOWLEDGE",
            Action::RemoteInvalidate => "REMOTE_INVALIDATE",
            Action::RemoteInvalidateAcknowledge => "REMOTE_INVALIDATE_ACKNOWLEDGE",
            Action::ReadInvalidate => "READ_INVALIDATE",
            Action::ReadInvalidateAcknowledge => "READ_INVALIDATE_ACKNOWLEDGE",
            Action::RemoteReadInvalidate => "REMOTE_READ_INVALIDATE",
            Action::RemoteReadInvalidateAcknowledge => "REMOTE_READ_INVALIDATE_ACKNOWLEDGE",
            Action::EvictionSave => "EVICTION_SAVE",
            Action::EvictionNotice => "EVICTION_NOTICE",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One coherence message. `source` and `destination` are the *logical* endpoints and stay fixed
/// across every hop a packet takes; only the router's next-hop lookup changes per hop.
///
/// `embedded` carries a third node's name through a home-mediated transaction, so that the home
/// can eventually reply to whichever node originated the request once the transaction with a
/// remote holder completes. It is deliberately left out of the `Display` rendering, matching the
/// wire trace format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// the message kind
    pub action: Action,
    /// the page this message concerns
    pub page: PageId,
    /// the logical originator of this message
    pub source: NodeName,
    /// the logical final recipient of this message
    pub destination: NodeName,
    /// an optional third node's name, carried through a home-mediated transaction
    pub embedded: Option<NodeName>,
}

impl Packet {
    /// Build a packet with no embedded node name.
    pub fn new(
        action: Action,
        page: PageId,
        source: impl Into<NodeName>,
        destination: impl Into<NodeName>,
    ) -> Self {
        Self { action, page, source: source.into(), destination: destination.into(), embedded: None }
    }

    /// Build a packet that embeds a third node's name.
    pub fn with_embedded(
        action: Action,
        page: PageId,
        source: impl Into<NodeName>,
        destination: impl Into<NodeName>,
        embedded: impl Into<NodeName>,
    ) -> Self {
        Self {
            action,
            page,
            source: source.into(),
            destination: destination.into(),
            embedded: Some(embedded.into()),
        }
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{action: {}, page: {}, source: {}, destination: {}}}",
            self.action, self.page, self.source, self.destination
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_omits_embedded() {
        let p = Packet::with_embedded(Action::RemoteRead, 7, "B", "C", "A");
        assert_eq!(
            p.to_string(),
            "{action: REMOTE_READ, page: 7, source: B, destination: C}"
        );
    }

    #[test]
    fn action_names_match_wire_format() {
        assert_eq!(Action::ReadMiss.name(), "READ_MISS");
        assert_eq!(Action::RemoteReadInvalidateAcknowledge.name(), "REMOTE_READ_INVALIDATE_ACKNOWLEDGE");
        assert_eq!(Action::EvictionNotice.name(), "EVICTION_NOTICE");
    }
}

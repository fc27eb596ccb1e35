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

//! Module containing all error types

use thiserror::Error;

use crate::noc::PageId;

/// Errors raised by a directory when a packet handler's precondition does not hold. These
/// indicate a broken coherence invariant and are never expected during a correctly driven
/// simulation; they propagate to the caller rather than panicking.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum DirectoryError {
    /// A page was accessed in a way that requires it to be resident, but it is `INVALID`.
    #[error("page {page} is not resident at node {node}")]
    NotResident {
        /// node at which the page was expected to be resident
        node: String,
        /// offending page
        page: PageId,
    },
    /// `owner()`/`copy_holders()` was called for a page this node does not home.
    #[error("node {node} does not home page {page}")]
    NotHomed {
        /// node queried
        node: String,
        /// offending page
        page: PageId,
    },
    /// `erase_presence` was asked to remove a node that was not a presence holder.
    #[error("node {holder} is not a presence holder of page {page} at home {node}")]
    NotPresent {
        /// home node
        node: String,
        /// offending page
        page: PageId,
        /// node that was expected to be a holder
        holder: String,
    },
    /// An `INVALIDATE` assumed at least two presence holders (the requester and at least one
    /// more), but the presence set was smaller.
    #[error("invalidate at {node} for page {page} expected at least 2 holders, found {found}")]
    InsufficientHolders {
        /// home node
        node: String,
        /// offending page
        page: PageId,
        /// actual number of holders found
        found: usize,
    },
}

/// Errors raised while routing a packet toward its destination.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum RoutingError {
    /// The router's next-hop table has no entry for the requested destination.
    #[error("node {node} has no route to destination {destination}")]
    NoRoute {
        /// node whose table was consulted
        node: String,
        /// destination that could not be routed
        destination: String,
    },
}

/// Errors raised while a node handles a packet or starts an operation.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum NodeError {
    /// Propagated from the node's directory.
    #[error("directory error: {0}")]
    Directory(#[from] DirectoryError),
    /// Propagated from the node's router.
    #[error("routing error: {0}")]
    Routing(#[from] RoutingError),
    /// A node was asked to start a second operation while one was already in flight.
    #[error("node {node} already has an operation in flight")]
    OperationInFlight {
        /// offending node
        node: String,
    },
}

/// Errors raised while constructing a [`Noc`](crate::noc::Noc).
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConstructionError {
    /// A node's cache size is smaller than the number of pages it homes.
    #[error("node {node} has size {size} but homes {homed} pages")]
    SizeTooSmall {
        /// offending node
        node: String,
        /// configured size
        size: usize,
        /// number of homed pages
        homed: usize,
    },
    /// A page was declared homed by more than one node.
    #[error("page {page} is already homed by node {existing}, cannot also home it at {node}")]
    DuplicateHome {
        /// offending page
        page: PageId,
        /// node that already homes the page
        existing: String,
        /// node that attempted to claim it too
        node: String,
    },
    /// `add_node` was called twice with the same node name.
    #[error("node {0} was already added")]
    DuplicateNode(String),
    /// An [`Operation`](crate::noc::Operation) was built from an empty page sequence, which
    /// leaves no output page.
    #[error("an operation needs at least one page (the output); none were given")]
    EmptyOperation,
}

/// Main error type, returned by every fallible operation on a [`Noc`](crate::noc::Noc).
#[derive(Debug, Error)]
pub enum Error {
    /// Propagated from a node while handling or emitting a packet.
    #[error("{0}")]
    Node(#[from] NodeError),
    /// Propagated while building the topology.
    #[error("{0}")]
    Construction(#[from] ConstructionError),
    /// Propagated while writing the trace.
    #[error("failed to write trace: {0}")]
    Io(#[from] std::io::Error),
    /// The optional cycle budget configured via
    /// [`Noc::with_stop_after`](crate::noc::Noc::with_stop_after) was exceeded before every node
    /// finished its program.
    #[error("simulation did not converge within {0} cycles")]
    NoConvergence(u64),
}

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

//! Per-node next-hop lookup table.

use std::collections::HashMap;

use crate::error::RoutingError;

use super::NodeName;

/// Maps a final destination name to the neighbour this node should forward toward. The owning
/// node's own name is never a key: packets destined for it are delivered locally and never
/// consult the table.
#[derive(Debug, Clone, Default)]
pub(crate) struct Router {
    table: HashMap<NodeName, NodeName>,
}

impl Router {
    pub(crate) fn new(table: HashMap<NodeName, NodeName>) -> Self {
        Self { table }
    }

    /// Look up the next hop toward `destination`. It is a routing error for the table to lack an
    /// entry for a destination a node actually needs to reach.
    pub(crate) fn next_hop(&self, node: &str, destination: &str) -> Result<&NodeName, RoutingError> {
        self.table.get(destination).ok_or_else(|| RoutingError::NoRoute {
            node: node.to_string(),
            destination: destination.to_string(),
        })
    }
}

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

//! The per-cycle context threaded through a node's packet handlers.
//!
//! The source lets a node reach back into its owning `NoC` (for the home-of-page map and for
//! emitting onto the wire) and its router reach back into the `NoC` too. Rather than introduce
//! that ownership cycle here, the `NoC` threads a short-lived borrowed [`Dispatch`] into every
//! call that needs cross-cutting state, the same way the teacher threads `queue: &mut EventQueue`
//! into every `Router`/`Network` method that must emit new events.

use std::collections::{HashMap, VecDeque};

use log::trace;

use crate::error::NodeError;

use super::packet::Packet;
use super::router::Router;
use super::{NodeName, PageId};

pub(crate) struct Dispatch<'a> {
    pub(crate) trace: &'a mut crate::noc::trace::Trace,
    pub(crate) out_queue: &'a mut VecDeque<(Packet, NodeName)>,
    pub(crate) cycle: u64,
    pub(crate) home: &'a HashMap<PageId, NodeName>,
}

impl<'a> Dispatch<'a> {
    /// The node that homes `page`. Immutable global state fixed at construction time (I1).
    pub(crate) fn home_of(&self, page: PageId) -> NodeName {
        self.home
            .get(&page)
            .cloned()
            .unwrap_or_else(|| panic!("page {} has no declared home", page))
    }

    /// Route `packet`, originating at `from`: deliver locally (synchronously, via `node.handle`)
    /// or stage it for next-cycle forwarding, logging the hop exactly as the router would.
    pub(crate) fn dispatch(
        &mut self,
        packet: Packet,
        from: &str,
        router: &Router,
    ) -> Result<Option<Packet>, NodeError> {
        if packet.destination == from {
            // Local delivery: handled synchronously by the caller, no hop to log.
            return Ok(Some(packet));
        }
        let next = router.next_hop(from, &packet.destination)?.clone();
        trace!("{}: cycle {}: forwarding {} toward {}", from, self.cycle, packet, next);
        self.trace.log(&packet, from, &next, self.cycle);
        self.out_queue.push_back((packet, next));
        Ok(None)
    }
}

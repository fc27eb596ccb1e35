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

//! The global synchronous clock, owning every node and the home-of-page map.

use std::collections::{HashMap, VecDeque};

use indexmap::IndexMap;
use log::{debug, warn};

use crate::error::{ConstructionError, Error};

use super::dispatch::Dispatch;
use super::node::{Node, Operation};
use super::packet::Packet;
use super::trace::{OutputTarget, Trace};
use super::{NodeName, PageId};

/// The simulator. Owns every [`Node`], the global home-of-page map, and the packets currently
/// in transit between cycles. Node visitation order is insertion order, fixed for the lifetime
/// of the `Noc`, so that two runs built with the same calls to [`Noc::add_node`] produce
/// identical traces.
#[derive(Debug)]
pub struct Noc {
    nodes: IndexMap<NodeName, Node>,
    home: HashMap<PageId, NodeName>,
    in_transit: VecDeque<(Packet, NodeName)>,
    cycle_counter: u64,
    trace: Trace,
    stop_after: Option<u64>,
}

impl Default for Noc {
    fn default() -> Self {
        Self::new()
    }
}

impl Noc {
    /// An empty NoC with no nodes and an empty trace.
    pub fn new() -> Self {
        Self {
            nodes: IndexMap::new(),
            home: HashMap::new(),
            in_transit: VecDeque::new(),
            cycle_counter: 0,
            trace: Trace::new(),
            stop_after: None,
        }
    }

    /// Configure an optional cycle budget: [`Noc::mainloop`] reports [`Error::NoConvergence`]
    /// instead of looping forever if not every node is done by then. Off by default, since the
    /// protocol itself defines no timeout.
    pub fn with_stop_after(mut self, cycles: u64) -> Self {
        self.stop_after = Some(cycles);
        self
    }

    /// Add a node named `name` with cache `size`, a next-hop `routing_table`, the set of pages
    /// it homes, and its program. `size` must be at least the number of homed pages, and no page
    /// may be homed by two different nodes.
    pub fn add_node(
        &mut self,
        name: impl Into<NodeName>,
        size: usize,
        routing_table: HashMap<NodeName, NodeName>,
        homed_pages: impl IntoIterator<Item = PageId>,
        program: Vec<Operation>,
    ) -> Result<(), Error> {
        let name = name.into();
        if self.nodes.contains_key(&name) {
            return Err(ConstructionError::DuplicateNode(name).into());
        }
        let homed: Vec<PageId> = homed_pages.into_iter().collect();
        if size < homed.len() {
            return Err(ConstructionError::SizeTooSmall { node: name, size, homed: homed.len() }.into());
        }
        for &page in &homed {
            if let Some(existing) = self.home.get(&page) {
                return Err(ConstructionError::DuplicateHome { page, existing: existing.clone(), node: name }.into());
            }
        }
        for &page in &homed {
            self.home.insert(page, name.clone());
        }
        debug!("added node {} (size {}, {} homed pages)", name, size, homed.len());
        let node = Node::new(name.clone(), size, routing_table, homed, program);
        self.nodes.insert(name, node);
        Ok(())
    }

    /// Advance the simulation by one cycle: snapshot and clear the in-transit queue, deliver
    /// each packet to the node matching its current hop, in node-insertion order, then advance
    /// the cycle counter.
    pub fn cycle(&mut self) -> Result<(), Error> {
        let snapshot = std::mem::take(&mut self.in_transit);
        let mut per_node: HashMap<NodeName, Vec<Packet>> = HashMap::new();
        for (packet, next_hop) in snapshot {
            per_node.entry(next_hop).or_insert_with(Vec::new).push(packet);
        }

        let mut staged: VecDeque<(Packet, NodeName)> = VecDeque::new();
        for (name, node) in self.nodes.iter_mut() {
            let packets = per_node.remove(name).unwrap_or_default();
            let mut dispatch =
                Dispatch { trace: &mut self.trace, out_queue: &mut staged, cycle: self.cycle_counter, home: &self.home };
            node.cycle(packets, &mut dispatch)?;
        }

        self.in_transit = staged;
        self.cycle_counter += 1;
        Ok(())
    }

    /// Whether every node has finished its program.
    pub fn is_done(&self) -> bool {
        self.nodes.values().all(Node::is_done)
    }

    /// Run cycles until every node is done, or until the configured `stop_after` budget (if any)
    /// is exceeded.
    pub fn mainloop(&mut self) -> Result<(), Error> {
        while !self.is_done() {
            if let Some(budget) = self.stop_after {
                if self.cycle_counter >= budget {
                    warn!("simulation did not converge within {} cycles", budget);
                    return Err(Error::NoConvergence(budget));
                }
            }
            self.cycle()?;
        }
        Ok(())
    }

    /// Run the mainloop to completion and render the accumulated trace to `output`.
    pub fn run(&mut self, output: impl Into<OutputTarget>) -> Result<(), Error> {
        self.mainloop()?;
        self.trace.write(output)?;
        Ok(())
    }

    /// The current cycle number.
    pub fn cycle_counter(&self) -> u64 {
        self.cycle_counter
    }

    /// Look up a node by name.
    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.get(name)
    }

    /// The accumulated trace of every hop emitted so far.
    pub fn trace(&self) -> &Trace {
        &self.trace
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maplit::hashmap;

    #[test]
    fn rejects_undersized_node() {
        let mut noc = Noc::new();
        let err = noc.add_node("A", 0, HashMap::new(), vec![1], Vec::new()).unwrap_err();
        assert!(matches!(err, Error::Construction(ConstructionError::SizeTooSmall { .. })));
    }

    #[test]
    fn rejects_duplicate_home() {
        let mut noc = Noc::new();
        noc.add_node("A", 2, HashMap::new(), vec![1], Vec::new()).unwrap();
        let err = noc.add_node("B", 2, HashMap::new(), vec![1], Vec::new()).unwrap_err();
        assert!(matches!(err, Error::Construction(ConstructionError::DuplicateHome { .. })));
    }

    #[test]
    fn empty_noc_is_immediately_done() {
        let noc = Noc::new();
        assert!(noc.is_done());
    }

    #[test]
    fn single_node_local_hit_completes_without_traffic() {
        let mut noc = Noc::new();
        noc.add_node("A", 2, hashmap! {}, vec![1], vec![Operation::new(vec![1, 1]).unwrap()]).unwrap();
        noc.mainloop().unwrap();
        assert!(noc.is_done());
        assert_eq!(noc.trace().entries().count(), 0);
    }
}

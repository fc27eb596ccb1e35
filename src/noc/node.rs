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

//! A simulated processing element: a program, a directory, a router, and the fourteen coherence
//! packet handlers that react to incoming traffic.

use std::collections::{HashMap, HashSet, VecDeque};

use log::debug;

use crate::error::{ConstructionError, NodeError};

use super::directory::{Directory, EvictionOutcome};
use super::dispatch::Dispatch;
use super::packet::{Action, Packet};
use super::router::Router;
use super::{NodeName, PageId};

/// One step of a node's program: a non-empty sequence of pages where the last element is the
/// output page and any preceding elements are input pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    inputs: Vec<PageId>,
    output: PageId,
}

impl Operation {
    /// Build an operation from `pages`; the last element becomes the output, the rest become
    /// inputs. `pages` must be non-empty.
    pub fn new(mut pages: Vec<PageId>) -> Result<Self, ConstructionError> {
        let output = pages.pop().ok_or(ConstructionError::EmptyOperation)?;
        Ok(Self { inputs: pages, output })
    }

    /// The input pages, in program order.
    pub fn inputs(&self) -> &[PageId] {
        &self.inputs
    }

    /// The output page.
    pub fn output(&self) -> PageId {
        self.output
    }
}

#[derive(Debug, Clone)]
struct InFlight {
    inputs: Vec<PageId>,
    output: PageId,
}

/// A single simulated node.
#[derive(Debug)]
pub struct Node {
    name: NodeName,
    directory: Directory,
    router: Router,
    program: VecDeque<Operation>,
    current: Option<InFlight>,
    frozen: HashSet<PageId>,
    awaiting: VecDeque<Packet>,
}

impl Node {
    pub(crate) fn new(
        name: impl Into<NodeName>,
        size: usize,
        routing_table: HashMap<NodeName, NodeName>,
        homed_pages: impl IntoIterator<Item = PageId>,
        program: Vec<Operation>,
    ) -> Self {
        let name = name.into();
        Self {
            directory: Directory::new(name.clone(), size, homed_pages),
            router: Router::new(routing_table),
            program: program.into(),
            current: None,
            frozen: HashSet::new(),
            awaiting: VecDeque::new(),
            name,
        }
    }

    /// This node's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// This node's directory. Exposed crate-internally so tests can assert on residency,
    /// coherence state, and presence without a public accessor surface.
    pub(crate) fn directory(&self) -> &Directory {
        &self.directory
    }

    /// A node is done once its program is empty and no operation is in flight.
    pub fn is_done(&self) -> bool {
        self.program.is_empty() && self.current.is_none()
    }

    fn is_locked(&self, page: PageId) -> bool {
        self.current.as_ref().map_or(false, |c| c.output == page || c.inputs.contains(&page))
    }

    fn is_frozen(&self, page: PageId) -> bool {
        self.frozen.contains(&page)
    }

    fn defer(&mut self, packet: Packet) {
        self.awaiting.push_back(packet);
    }

    /// Advance this node by one cycle: possibly start a new operation, retry deferred packets,
    /// then handle freshly arrived ones. Awaiting packets are retried before fresh arrivals.
    pub(crate) fn cycle(&mut self, packets: Vec<Packet>, dispatch: &mut Dispatch) -> Result<(), NodeError> {
        if self.current.is_none() {
            if let Some(op) = self.program.pop_front() {
                self.start_operation(op, dispatch)?;
            }
        }
        let retry: Vec<Packet> = self.awaiting.drain(..).collect();
        for packet in retry {
            self.emit_or_handle(packet, dispatch)?;
        }
        for packet in packets {
            self.emit_or_handle(packet, dispatch)?;
        }
        Ok(())
    }

    /// Route `packet` toward its destination: handle it synchronously if this node is the final
    /// destination, otherwise stage it for the next cycle. Used both for packets this node just
    /// originated and for packets arriving from the network that have not yet reached their
    /// destination.
    fn emit_or_handle(&mut self, packet: Packet, dispatch: &mut Dispatch) -> Result<(), NodeError> {
        if let Some(packet) = dispatch.dispatch(packet, &self.name, &self.router)? {
            self.handle(packet, dispatch)
        } else {
            Ok(())
        }
    }

    fn start_operation(&mut self, op: Operation, dispatch: &mut Dispatch) -> Result<(), NodeError> {
        if self.current.is_some() {
            return Err(NodeError::OperationInFlight { node: self.name.clone() });
        }
        let Operation { inputs, output } = op;
        self.current = Some(InFlight { inputs: inputs.clone(), output });

        for input in inputs {
            if input == output || self.directory.has(input) {
                continue;
            }
            let home = dispatch.home_of(input);
            self.emit_or_handle(Packet::new(Action::ReadMiss, input, self.name.clone(), home), dispatch)?;
        }

        if self.directory.has(output) {
            if self.directory.is_modified(output) {
                self.try_complete();
            } else {
                let home = dispatch.home_of(output);
                self.emit_or_handle(Packet::new(Action::Invalidate, output, self.name.clone(), home), dispatch)?;
            }
        } else {
            let home = dispatch.home_of(output);
            self.emit_or_handle(Packet::new(Action::ReadInvalidate, output, self.name.clone(), home), dispatch)?;
        }
        Ok(())
    }

    /// Clear the in-flight operation once every input is resident and the output is `MODIFIED`.
    /// No computation is actually modelled; completion is purely a bookkeeping event.
    fn try_complete(&mut self) -> bool {
        let ready = self.current.as_ref().map_or(false, |cur| {
            cur.inputs.iter().all(|&p| self.directory.has(p)) && self.directory.is_modified(cur.output)
        });
        if ready {
            debug!("{}: operation on output page {} complete", self.name, self.current.as_ref().unwrap().output);
            self.current = None;
        }
        ready
    }

    fn apply_eviction(&mut self, outcome: EvictionOutcome, dispatch: &mut Dispatch) -> Result<(), NodeError> {
        match outcome {
            EvictionOutcome::None => Ok(()),
            EvictionOutcome::Save(page) => self.send_home(page, dispatch),
            EvictionOutcome::Notice(page) => self.notify_home(page, dispatch),
        }
    }

    fn send_home(&mut self, page: PageId, dispatch: &mut Dispatch) -> Result<(), NodeError> {
        let home = dispatch.home_of(page);
        self.emit_or_handle(Packet::new(Action::EvictionSave, page, self.name.clone(), home), dispatch)
    }

    fn notify_home(&mut self, page: PageId, dispatch: &mut Dispatch) -> Result<(), NodeError> {
        let home = dispatch.home_of(page);
        self.emit_or_handle(Packet::new(Action::EvictionNotice, page, self.name.clone(), home), dispatch)
    }

    fn sorted_holders(&self, page: PageId) -> Result<Vec<NodeName>, NodeError> {
        let mut holders: Vec<NodeName> = self.directory.copy_holders(page)?.iter().cloned().collect();
        holders.sort();
        Ok(holders)
    }

    fn handle(&mut self, packet: Packet, dispatch: &mut Dispatch) -> Result<(), NodeError> {
        match packet.action {
            Action::ReadMiss => self.on_read_miss(packet, dispatch),
            Action::Reply => self.on_reply(packet, dispatch),
            Action::RemoteRead => self.on_remote_read(packet, dispatch),
            Action::RemoteReply => self.on_remote_reply(packet, dispatch),
            Action::Invalidate => self.on_invalidate(packet, dispatch),
            Action::InvalidateAcknowledge => self.on_invalidate_acknowledge(packet),
            Action::RemoteInvalidate => self.on_remote_invalidate(packet, dispatch),
            Action::RemoteInvalidateAcknowledge => self.on_remote_invalidate_acknowledge(packet, dispatch),
            Action::ReadInvalidate => self.on_read_invalidate(packet, dispatch),
            Action::ReadInvalidateAcknowledge => self.on_read_invalidate_acknowledge(packet, dispatch),
            Action::RemoteReadInvalidate => self.on_remote_read_invalidate(packet, dispatch),
            Action::RemoteReadInvalidateAcknowledge => self.on_remote_read_invalidate_acknowledge(packet, dispatch),
            Action::EvictionSave => self.on_eviction_save(packet, dispatch),
            Action::EvictionNotice => self.on_eviction_notice(packet),
        }
    }

    /// L→H: a requester wants a read-only copy.
    fn on_read_miss(&mut self, packet: Packet, dispatch: &mut Dispatch) -> Result<(), NodeError> {
        let page = packet.page;
        if self.is_frozen(page) {
            self.defer(packet);
            return Ok(());
        }
        if self.directory.has(page) {
            self.directory.add_presence(page, packet.source.clone())?;
            self.directory.share(page)?;
            self.emit_or_handle(Packet::new(Action::Reply, page, self.name.clone(), packet.source), dispatch)
        } else {
            let remote = self.directory.owner(page)?;
            self.frozen.insert(page);
            self.emit_or_handle(
                Packet::with_embedded(Action::RemoteRead, page, self.name.clone(), remote, packet.source),
                dispatch,
            )
        }
    }

    /// H→L: the home grants a read-only copy.
    fn on_reply(&mut self, packet: Packet, dispatch: &mut Dispatch) -> Result<(), NodeError> {
        let outcome = self.directory.add(packet.page);
        self.apply_eviction(outcome, dispatch)?;
        self.try_complete();
        Ok(())
    }

    /// H→R: the home asks a remote exclusive holder to downgrade to shared.
    fn on_remote_read(&mut self, packet: Packet, dispatch: &mut Dispatch) -> Result<(), NodeError> {
        let page = packet.page;
        self.directory.share(page)?;
        let requester = packet.embedded.expect("REMOTE_READ always embeds the original requester");
        self.emit_or_handle(
            Packet::with_embedded(Action::RemoteReply, page, self.name.clone(), packet.source, requester),
            dispatch,
        )
    }

    /// R→H: a remote holder confirms it downgraded to shared.
    fn on_remote_reply(&mut self, packet: Packet, dispatch: &mut Dispatch) -> Result<(), NodeError> {
        let page = packet.page;
        let outcome = self.directory.add(page);
        self.apply_eviction(outcome, dispatch)?;
        self.directory.add_presence(page, self.name.clone())?;
        self.frozen.remove(&page);
        let requester = packet.embedded.expect("REMOTE_REPLY always embeds the original requester");
        if requester == self.name {
            self.try_complete();
            Ok(())
        } else {
            self.directory.add_presence(page, requester.clone())?;
            self.emit_or_handle(Packet::new(Action::Reply, page, self.name.clone(), requester), dispatch)
        }
    }

    /// L→H: a sharer wants to upgrade to exclusive.
    ///
    /// `self_request` (L is this very node, i.e. a home upgrading a page it itself shares) is
    /// handled specially: the naive translation of the source's `invalidate()` locks the output
    /// page before dispatching this packet to itself, so a straight `is_locked` defer would bury
    /// the request in the awaiting queue forever, and unconditionally dropping the home's own
    /// copy would leave no holder for the "presence shrank to the requester" termination check to
    /// recognise once every other sharer had acknowledged — the home IS the requester, but it had
    /// already erased itself. We keep the home's own copy until every other sharer acknowledges,
    /// then transition directly to `MODIFIED` instead of bouncing a packet through ourselves.
    fn on_invalidate(&mut self, packet: Packet, dispatch: &mut Dispatch) -> Result<(), NodeError> {
        let page = packet.page;
        let self_request = packet.source == self.name;
        if self.is_frozen(page) || (self.is_locked(page) && !self_request) {
            self.defer(packet);
            return Ok(());
        }
        let holders = self.sorted_holders(page)?;
        let me = self.name.clone();
        if !self_request && holders.contains(&me) {
            self.directory.dirty(page)?;
            self.directory.erase_presence(page, &me)?;
        }
        let remaining: Vec<NodeName> = holders.into_iter().filter(|h| *h != packet.source && *h != me).collect();
        if remaining.is_empty() {
            if self_request {
                self.directory.modify(page)?;
                self.try_complete();
                Ok(())
            } else {
                self.emit_or_handle(Packet::new(Action::InvalidateAcknowledge, page, self.name.clone(), packet.source), dispatch)
            }
        } else {
            for holder in &remaining {
                self.emit_or_handle(
                    Packet::with_embedded(Action::RemoteInvalidate, page, self.name.clone(), holder.clone(), packet.source.clone()),
                    dispatch,
                )?;
            }
            self.frozen.insert(page);
            Ok(())
        }
    }

    /// H→L: every other sharer was invalidated; the requester may become exclusive.
    fn on_invalidate_acknowledge(&mut self, packet: Packet) -> Result<(), NodeError> {
        self.directory.modify(packet.page)?;
        self.try_complete();
        Ok(())
    }

    /// H→R: drop your shared copy.
    fn on_remote_invalidate(&mut self, packet: Packet, dispatch: &mut Dispatch) -> Result<(), NodeError> {
        let page = packet.page;
        if self.is_locked(page) {
            self.defer(packet);
            return Ok(());
        }
        self.directory.dirty(page)?;
        self.emit_or_handle(
            Packet { action: Action::RemoteInvalidateAcknowledge, page, source: self.name.clone(), destination: packet.source, embedded: packet.embedded },
            dispatch,
        )
    }

    /// R→H: a remote sharer confirms it dropped its copy.
    fn on_remote_invalidate_acknowledge(&mut self, packet: Packet, dispatch: &mut Dispatch) -> Result<(), NodeError> {
        let page = packet.page;
        self.directory.erase_presence(page, &packet.source)?;
        let holders = self.sorted_holders(page)?;
        if holders.len() == 1 {
            let requester = packet.embedded.expect("REMOTE_INVALIDATE_ACKNOWLEDGE always embeds the requester");
            if requester == self.name {
                self.directory.modify(page)?;
                self.frozen.remove(&page);
                self.try_complete();
            } else {
                debug_assert_eq!(holders[0], requester);
                self.emit_or_handle(Packet::new(Action::InvalidateAcknowledge, page, self.name.clone(), requester), dispatch)?;
                self.frozen.remove(&page);
            }
        }
        Ok(())
    }

    /// L→H: a requester lacking the page wants an exclusive copy.
    fn on_read_invalidate(&mut self, packet: Packet, dispatch: &mut Dispatch) -> Result<(), NodeError> {
        let page = packet.page;
        if self.is_frozen(page) || self.is_locked(page) {
            self.defer(packet);
            return Ok(());
        }
        let holders = self.sorted_holders(page)?;
        if holders.len() == 1 && holders[0] == self.name {
            self.directory.dirty(page)?;
            let me = self.name.clone();
            self.directory.erase_presence(page, &me)?;
            self.directory.add_presence(page, packet.source.clone())?;
            self.emit_or_handle(Packet::new(Action::ReadInvalidateAcknowledge, page, self.name.clone(), packet.source), dispatch)
        } else {
            for holder in holders.iter().filter(|h| **h != self.name) {
                self.emit_or_handle(
                    Packet::with_embedded(Action::RemoteReadInvalidate, page, self.name.clone(), holder.clone(), packet.source.clone()),
                    dispatch,
                )?;
            }
            self.frozen.insert(page);
            Ok(())
        }
    }

    /// H→L: the requester now holds the sole, exclusive copy.
    fn on_read_invalidate_acknowledge(&mut self, packet: Packet, dispatch: &mut Dispatch) -> Result<(), NodeError> {
        let page = packet.page;
        let outcome = self.directory.add(page);
        self.apply_eviction(outcome, dispatch)?;
        self.directory.modify(page)?;
        self.try_complete();
        Ok(())
    }

    /// H→R: drop and return your copy.
    fn on_remote_read_invalidate(&mut self, packet: Packet, dispatch: &mut Dispatch) -> Result<(), NodeError> {
        let page = packet.page;
        if self.is_locked(page) {
            self.defer(packet);
            return Ok(());
        }
        self.directory.dirty(page)?;
        self.emit_or_handle(
            Packet { action: Action::RemoteReadInvalidateAcknowledge, page, source: self.name.clone(), destination: packet.source, embedded: packet.embedded },
            dispatch,
        )
    }

    /// R→H: a remote holder confirms it dropped its copy.
    fn on_remote_read_invalidate_acknowledge(&mut self, packet: Packet, dispatch: &mut Dispatch) -> Result<(), NodeError> {
        let page = packet.page;
        if !self.directory.has(page) {
            let outcome = self.directory.add(page);
            self.apply_eviction(outcome, dispatch)?;
            self.directory.add_presence(page, self.name.clone())?;
        }
        self.directory.erase_presence(page, &packet.source)?;
        let holders = self.sorted_holders(page)?;
        if holders.len() == 1 {
            let requester = packet.embedded.expect("REMOTE_READ_INVALIDATE_ACKNOWLEDGE always embeds the requester");
            if requester == self.name {
                self.directory.modify(page)?;
                self.frozen.remove(&page);
                self.try_complete();
            } else {
                self.directory.dirty(page)?;
                let me = self.name.clone();
                self.directory.erase_presence(page, &me)?;
                self.directory.add_presence(page, requester.clone())?;
                self.emit_or_handle(Packet::new(Action::ReadInvalidateAcknowledge, page, self.name.clone(), requester), dispatch)?;
                self.frozen.remove(&page);
            }
        }
        Ok(())
    }

    /// An evictor returns a modified page to its home. Home immediately drops its own copy to
    /// `INVALID` right after recording it; see the design notes on this surprising but preserved
    /// behaviour.
    fn on_eviction_save(&mut self, packet: Packet, dispatch: &mut Dispatch) -> Result<(), NodeError> {
        let page = packet.page;
        let outcome = self.directory.add(page);
        self.apply_eviction(outcome, dispatch)?;
        self.directory.dirty(page)?;
        self.directory.erase_presence(page, &packet.source)?;
        self.directory.add_presence(page, self.name.clone())?;
        Ok(())
    }

    /// An evictor notifies its home that it dropped a shared copy.
    fn on_eviction_notice(&mut self, packet: Packet) -> Result<(), NodeError> {
        self.directory.erase_presence(packet.page, &packet.source)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_splits_inputs_and_output() {
        let op = Operation::new(vec![1, 2, 3]).unwrap();
        assert_eq!(op.inputs(), &[1, 2]);
        assert_eq!(op.output(), 3);
    }

    #[test]
    fn empty_operation_is_rejected() {
        assert!(Operation::new(Vec::new()).is_err());
    }

    #[test]
    fn node_with_empty_program_is_immediately_done() {
        let node = Node::new("A", 4, HashMap::new(), vec![1], Vec::new());
        assert!(node.is_done());
    }
}

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

#![deny(missing_docs, missing_debug_implementations)]

//! # NetSim
//!
//! Simulator of a directory-based cache-coherence protocol over a Network-on-Chip.
//!
//! ## Example usage
//!
//! The following builds a two-node mesh where `A` homes page `1` and `B` homes page `2`, and `B`
//! runs a single operation reading page `1` into page `2`.
//!
//! ```rust
//! use std::collections::HashMap;
//! use simplenoc::noc::{Noc, Operation};
//!
//! fn main() -> Result<(), simplenoc::Error> {
//!     let mut noc = Noc::new();
//!     let table_a = HashMap::from([("B".to_string(), "B".to_string())]);
//!     let table_b = HashMap::from([("A".to_string(), "A".to_string())]);
//!
//!     noc.add_node("A", 4, table_a, vec![1], Vec::new())?;
//!     noc.add_node("B", 4, table_b, vec![2], vec![Operation::new(vec![1, 2])?])?;
//!     noc.run("STDOUT")?;
//!     Ok(())
//! }
//! ```

pub(crate) mod directory;
pub(crate) mod dispatch;
pub mod node;
#[allow(clippy::module_inception)]
pub mod noc;
pub mod packet;
pub(crate) mod router;
pub mod trace;

pub use directory::CoherenceState;
pub use node::{Node, Operation};
pub use noc::Noc;
pub use packet::{Action, Packet};
pub use trace::OutputTarget;

/// A page identifier. Opaque from the protocol's point of view; only equality and ordering
/// (for the LRU scan and deterministic presence iteration) matter.
pub type PageId = u64;

/// The name of a node, used both as a routing destination and as a presence-set member.
pub type NodeName = String;

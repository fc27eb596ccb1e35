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

#![deny(missing_docs)]

//! # simplenoc
//!
//! A cycle-driven simulator of a directory-based cache-coherence protocol running on top of a
//! Network-on-Chip. Every simulated node owns a private cache, a router, and a directory
//! participating in an MSI-like coherence protocol; nodes execute small programs that reference
//! shared pages, and the simulator works out the coherence traffic these programs induce.
//!
//! ## Structure
//!
//! - **[`noc`]**: the simulator itself. See the main structure [`Noc`](noc::Noc), which owns
//!   every [`Node`](noc::Node) and drives the global synchronous clock.
//!
//! ## Usage
//!
//! ```
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

mod error;
pub mod noc;
mod test;

pub use error::{ConstructionError, DirectoryError, Error, NodeError, RoutingError};

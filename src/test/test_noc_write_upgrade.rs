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

//! Picking up where a shared read left off: A upgrades its shared copy to exclusive, which
//! requires the home to drop its own copy too since the home is itself a presence holder.

use maplit::{hashmap, hashset};

use crate::noc::{CoherenceState, Noc, Operation};

#[test]
fn write_upgrade_invalidates_home_and_other_sharers() {
    let mut noc = Noc::new();
    noc.add_node(
        "A",
        2,
        hashmap! { "B".to_string() => "B".to_string() },
        vec![1],
        vec![Operation::new(vec![2, 1]).unwrap(), Operation::new(vec![2]).unwrap()],
    )
    .unwrap();
    noc.add_node("B", 2, hashmap! { "A".to_string() => "A".to_string() }, vec![2], Vec::new()).unwrap();

    noc.mainloop().unwrap();

    assert!(noc.is_done());
    let lines: Vec<_> = noc.trace().entries().collect();
    assert_eq!(
        lines,
        vec![
            "cycle: 0, source_phy: A, destination_phy: B, packet: {action: READ_MISS, page: 2, source: A, destination: B}".to_string(),
            "cycle: 1, source_phy: B, destination_phy: A, packet: {action: REPLY, page: 2, source: B, destination: A}".to_string(),
            "cycle: 3, source_phy: A, destination_phy: B, packet: {action: INVALIDATE, page: 2, source: A, destination: B}".to_string(),
            "cycle: 4, source_phy: B, destination_phy: A, packet: {action: INVALIDATE_ACKNOWLEDGE, page: 2, source: B, destination: A}".to_string(),
        ]
    );

    let a = noc.node("A").unwrap();
    assert_eq!(a.directory().state(2), CoherenceState::Modified);
    assert!(a.directory().is_modified(1));

    let b = noc.node("B").unwrap();
    assert_eq!(b.directory().state(2), CoherenceState::Invalid);
    assert_eq!(b.directory().copy_holders(2).unwrap(), &hashset! { "A".to_string() });
}

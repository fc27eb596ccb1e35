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

//! A home upgrades its own shared page while two other nodes still hold read-only copies: the
//! home must invalidate both remote sharers, exactly as it would for a third party's upgrade
//! request, before it may become exclusive. `B` is given an unrelated page fetch first so that
//! `A` and `C` have time to become sharers of page 5 before `B` ever attempts its own write.

use maplit::{hashmap, hashset};

use crate::noc::{CoherenceState, Noc, Operation};

#[test]
fn home_upgrades_its_own_page_against_two_remote_sharers() {
    let mut noc = Noc::new();
    noc.add_node(
        "A",
        2,
        hashmap! { "B".to_string() => "B".to_string() },
        vec![10],
        vec![Operation::new(vec![5, 10]).unwrap()],
    )
    .unwrap();
    noc.add_node(
        "B",
        3,
        hashmap! { "A".to_string() => "A".to_string(), "C".to_string() => "C".to_string(), "D".to_string() => "D".to_string() },
        vec![5, 99],
        vec![Operation::new(vec![30, 99]).unwrap(), Operation::new(vec![5]).unwrap()],
    )
    .unwrap();
    noc.add_node(
        "C",
        2,
        hashmap! { "B".to_string() => "B".to_string() },
        vec![20],
        vec![Operation::new(vec![5, 20]).unwrap()],
    )
    .unwrap();
    noc.add_node("D", 1, hashmap! { "B".to_string() => "B".to_string() }, vec![30], Vec::new()).unwrap();

    noc.mainloop().unwrap();

    assert!(noc.is_done());
    assert_eq!(noc.cycle_counter(), 6);

    let lines: Vec<_> = noc.trace().entries().collect();
    assert_eq!(
        lines,
        vec![
            "cycle: 0, source_phy: A, destination_phy: B, packet: {action: READ_MISS, page: 5, source: A, destination: B}".to_string(),
            "cycle: 0, source_phy: B, destination_phy: D, packet: {action: READ_MISS, page: 30, source: B, destination: D}".to_string(),
            "cycle: 0, source_phy: C, destination_phy: B, packet: {action: READ_MISS, page: 5, source: C, destination: B}".to_string(),
            "cycle: 1, source_phy: B, destination_phy: A, packet: {action: REPLY, page: 5, source: B, destination: A}".to_string(),
            "cycle: 1, source_phy: B, destination_phy: C, packet: {action: REPLY, page: 5, source: B, destination: C}".to_string(),
            "cycle: 1, source_phy: D, destination_phy: B, packet: {action: REPLY, page: 30, source: D, destination: B}".to_string(),
            "cycle: 3, source_phy: B, destination_phy: A, packet: {action: REMOTE_INVALIDATE, page: 5, source: B, destination: A}".to_string(),
            "cycle: 3, source_phy: B, destination_phy: C, packet: {action: REMOTE_INVALIDATE, page: 5, source: B, destination: C}".to_string(),
            "cycle: 4, source_phy: A, destination_phy: B, packet: {action: REMOTE_INVALIDATE_ACKNOWLEDGE, page: 5, source: A, destination: B}".to_string(),
            "cycle: 4, source_phy: C, destination_phy: B, packet: {action: REMOTE_INVALIDATE_ACKNOWLEDGE, page: 5, source: C, destination: B}".to_string(),
        ]
    );

    let a = noc.node("A").unwrap();
    assert_eq!(a.directory().state(5), CoherenceState::Invalid);
    assert!(a.directory().is_modified(10));

    let c = noc.node("C").unwrap();
    assert_eq!(c.directory().state(5), CoherenceState::Invalid);
    assert!(c.directory().is_modified(20));

    let b = noc.node("B").unwrap();
    assert_eq!(b.directory().state(5), CoherenceState::Modified);
    assert_eq!(b.directory().copy_holders(5).unwrap(), &hashset! { "B".to_string() });

    let d = noc.node("D").unwrap();
    assert_eq!(d.directory().state(30), CoherenceState::Shared);
    assert_eq!(d.directory().copy_holders(30).unwrap(), &hashset! { "D".to_string(), "B".to_string() });
}

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

//! Recording and rendering of the wire trace.

use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

use super::packet::Packet;
use super::NodeName;

/// Where a trace should be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// the process's standard output
    Stdout,
    /// the process's standard error
    Stderr,
    /// a filesystem path, (re)created on write
    Path(PathBuf),
}

impl From<&str> for OutputTarget {
    fn from(s: &str) -> Self {
        match s {
            "STDOUT" => OutputTarget::Stdout,
            "STDERR" => OutputTarget::Stderr,
            other => OutputTarget::Path(PathBuf::from(other)),
        }
    }
}

impl From<String> for OutputTarget {
    fn from(s: String) -> Self {
        OutputTarget::from(s.as_str())
    }
}

impl From<PathBuf> for OutputTarget {
    fn from(p: PathBuf) -> Self {
        OutputTarget::Path(p)
    }
}

#[derive(Debug, Clone)]
struct Entry {
    cycle: u64,
    source_phy: NodeName,
    destination_phy: NodeName,
    packet: Packet,
}

/// An append-only buffer of emitted packets, rendered to a concrete output only once the
/// simulation finishes. Recording is a cheap push; rendering is a single pass over the buffer.
#[derive(Debug, Clone, Default)]
pub struct Trace {
    entries: Vec<Entry>,
}

impl Trace {
    /// An empty trace.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn log(&mut self, packet: &Packet, source_phy: &str, destination_phy: &str, cycle: u64) {
        self.entries.push(Entry {
            cycle,
            source_phy: source_phy.to_string(),
            destination_phy: destination_phy.to_string(),
            packet: packet.clone(),
        });
    }

    /// Render every recorded hop, one per line, to `target`.
    pub fn write(&self, target: impl Into<OutputTarget>) -> io::Result<()> {
        match target.into() {
            OutputTarget::Stdout => self.write_to(&mut io::stdout()),
            OutputTarget::Stderr => self.write_to(&mut io::stderr()),
            OutputTarget::Path(path) => {
                let mut file = File::create(path)?;
                self.write_to(&mut file)
            }
        }
    }

    fn write_to(&self, sink: &mut dyn Write) -> io::Result<()> {
        for entry in &self.entries {
            writeln!(
                sink,
                "cycle: {}, source_phy: {}, destination_phy: {}, packet: {}",
                entry.cycle, entry.source_phy, entry.destination_phy, entry.packet
            )?;
        }
        Ok(())
    }

    /// The recorded hops, in emission order. Exposed mainly so tests can assert on the trace
    /// without going through an output stream or a temporary file.
    pub fn entries(&self) -> impl Iterator<Item = String> + '_ {
        self.entries.iter().map(|e| {
            format!(
                "cycle: {}, source_phy: {}, destination_phy: {}, packet: {}",
                e.cycle, e.source_phy, e.destination_phy, e.packet
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noc::packet::Action;

    #[test]
    fn renders_exact_wire_format() {
        let mut trace = Trace::new();
        trace.log(&Packet::new(Action::ReadMiss, 3, "B", "A"), "B", "A", 0);
        let lines: Vec<_> = trace.entries().collect();
        assert_eq!(
            lines,
            vec!["cycle: 0, source_phy: B, destination_phy: A, packet: {action: READ_MISS, page: 3, source: B, destination: A}".to_string()]
        );
    }

    #[test]
    fn output_target_recognises_sentinels() {
        assert_eq!(OutputTarget::from("STDOUT"), OutputTarget::Stdout);
        assert_eq!(OutputTarget::from("STDERR"), OutputTarget::Stderr);
        assert_eq!(OutputTarget::from("trace.log"), OutputTarget::Path(PathBuf::from("trace.log")));
    }
}

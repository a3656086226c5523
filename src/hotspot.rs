//
// emudbg
//
// Copyright 2025- Manos Pitsidianakis
//
// This file is part of emudbg.
//
// emudbg is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// emudbg is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with emudbg. If not, see <http://www.gnu.org/licenses/>.
//
// SPDX-License-Identifier: EUPL-1.2 OR GPL-3.0-or-later

//! Tracking of memory addresses read unusually often.
//!
//! Every read of a tracked CPU is recorded in a small table of
//! `{address, pc, space}` entries kept in most-recently-used order. When a
//! new entry pushes the least recently used one out of the table and that
//! entry was hit more than `threshold` times, it is reported on the console.

use crate::{
    frontend::Frontend,
    logging::TraceItem,
    machine::Machine,
    memory::SpaceNum,
    session::CpuId,
    DebugSession,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HotspotEntry {
    /// Byte address that was read.
    pub address: u64,
    /// Program counter of the reading instruction.
    pub pc: u64,
    pub space: SpaceNum,
    pub count: u32,
}

impl std::fmt::Display for HotspotEntry {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            fmt,
            "Hotspot @ {} {:08X} (PC={:08X}) hit {} times",
            self.space, self.address, self.pc, self.count
        )
    }
}

#[derive(Clone, Debug)]
pub struct HotspotTable {
    /// Most recently used first. Unused slots are `None`.
    entries: Vec<Option<HotspotEntry>>,
    threshold: u32,
}

impl HotspotTable {
    pub fn new(capacity: usize, threshold: u32) -> Self {
        Self {
            entries: vec![None; capacity],
            threshold,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Entries in most-recently-used order.
    pub fn entries(&self) -> impl Iterator<Item = &HotspotEntry> + '_ {
        self.entries.iter().flatten()
    }

    /// Records a read and returns the entry that fell off the bottom of the
    /// table, if it was hit more than `threshold` times.
    pub fn record(&mut self, space: SpaceNum, address: u64, pc: u64) -> Option<HotspotEntry> {
        let found = self.entries.iter().position(|e| {
            matches!(e, Some(e) if e.address == address && e.pc == pc && e.space == space)
        });
        if let Some(pos) = found {
            if let Some(ref mut entry) = self.entries[pos] {
                entry.count += 1;
            }
            self.entries[..=pos].rotate_right(1);
            return None;
        }
        let threshold = self.threshold;
        let evicted = self.entries.last_mut()?.take().filter(|e| e.count > threshold);
        self.entries.rotate_right(1);
        self.entries[0] = Some(HotspotEntry {
            address,
            pc,
            space,
            count: 1,
        });
        evicted
    }
}

impl DebugSession {
    /// Starts tracking hotspots on `cpu` with a table of `capacity` entries,
    /// replacing any previous table. A zero capacity stops tracking.
    pub fn hotspot_track(
        &mut self,
        machine: &mut dyn Machine,
        cpu: CpuId,
        capacity: usize,
        threshold: u32,
    ) {
        let ctx = &mut self.cpus[cpu.0];
        ctx.hotspots = (capacity > 0).then(|| HotspotTable::new(capacity, threshold));
        log::debug!(
            target: TraceItem::Hotspot.as_str(),
            "hotspot tracking on CPU '{}': {capacity} entries, threshold {threshold}",
            ctx.tag
        );
        self.update_watchpoint_hooks(machine, cpu, SpaceNum::Program);
    }

    pub(crate) fn hotspot_check(
        &mut self,
        machine: &mut dyn Machine,
        frontend: &mut dyn Frontend,
        cpu: CpuId,
        space: SpaceNum,
        address: u64,
    ) {
        let pc = machine.pc(cpu);
        let Some(ref mut table) = self.cpus[cpu.0].hotspots else {
            return;
        };
        if let Some(evicted) = table.record(space, address, pc) {
            frontend.print(&format!("{evicted} (fell off bottom)"));
        }
    }
}

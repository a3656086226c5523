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

use std::time::Duration;

use bitflags::bitflags;

use crate::{
    breakpoint::Breakpoint,
    disasm::{Disassembler, DisassemblerOverride},
    gateway::CustomMemoryDevice,
    hotspot::HotspotTable,
    memory::SpaceNum,
    session::CpuId,
    symbols::SymbolTable,
    trace::TraceState,
    watchpoint::Watchpoint,
};

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct DebugFlags: u32 {
        const OBSERVING = 1 << 0;
        const HISTORY = 1 << 1;
        const TRACING = 1 << 2;
        const TRACING_OVER = 1 << 3;
        const HOOKED = 1 << 4;
        const STEPPING = 1 << 5;
        const STEPPING_OVER = 1 << 6;
        const STEPPING_OUT = 1 << 7;
        const STOP_PC = 1 << 8;
        const STOP_CONTEXT = 1 << 9;
        const STOP_INTERRUPT = 1 << 10;
        const STOP_EXCEPTION = 1 << 11;
        const STOP_VBLANK = 1 << 12;
        const STOP_TIME = 1 << 13;
        const LIVE_BP = 1 << 14;
        const LIVE_WP = 1 << 15;
        /// The CPU core must call the instruction hook.
        const CALL_HOOK = 1 << 16;

        const TRACING_ANY = Self::TRACING.bits() | Self::TRACING_OVER.bits();
        const STEPPING_ANY =
            Self::STEPPING.bits() | Self::STEPPING_OVER.bits() | Self::STEPPING_OUT.bits();
        /// Cleared on every CPU whenever execution stops.
        const TRANSIENT = Self::STEPPING_ANY.bits()
            | Self::STOP_PC.bits()
            | Self::STOP_CONTEXT.bits()
            | Self::STOP_INTERRUPT.bits()
            | Self::STOP_EXCEPTION.bits()
            | Self::STOP_VBLANK.bits()
            | Self::STOP_TIME.bits();
    }
}

/// Called before every instruction of a hooked CPU. Returning `true` halts
/// execution.
pub trait InstructionObserver {
    fn on_instruction(&mut self, cpu: CpuId, pc: u64) -> bool;
}

impl<F: FnMut(CpuId, u64) -> bool> InstructionObserver for F {
    fn on_instruction(&mut self, cpu: CpuId, pc: u64) -> bool {
        self(cpu, pc)
    }
}

/// Ring of the most recently executed program counters.
#[derive(Clone, Debug)]
pub struct PcHistory {
    pcs: Box<[u64; Self::CAPACITY]>,
    next: usize,
    len: usize,
}

impl Default for PcHistory {
    fn default() -> Self {
        Self {
            pcs: Box::new([0; Self::CAPACITY]),
            next: 0,
            len: 0,
        }
    }
}

impl PcHistory {
    pub const CAPACITY: usize = 256;

    pub fn push(&mut self, pc: u64) {
        self.pcs[self.next] = pc;
        self.next = (self.next + 1) % Self::CAPACITY;
        self.len = (self.len + 1).min(Self::CAPACITY);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The `age`-th most recent program counter; `get(0)` is the last one.
    pub fn get(&self, age: usize) -> Option<u64> {
        if age >= self.len {
            return None;
        }
        Some(self.pcs[(self.next + Self::CAPACITY - 1 - age) % Self::CAPACITY])
    }

    /// Program counters from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        (0..self.len).rev().filter_map(|age| self.get(age))
    }
}

/// Debugger state of one CPU.
pub struct CpuDebugContext {
    pub(crate) tag: String,
    pub(crate) flags: DebugFlags,
    pub(crate) history: PcHistory,
    pub(crate) steps_left: u32,
    /// `None` matches any address.
    pub(crate) step_target: Option<u64>,
    pub(crate) stop_addr: u64,
    pub(crate) stop_time: Duration,
    pub(crate) end_exec_time: Duration,
    /// `None` matches any line.
    pub(crate) stop_interrupt: Option<i32>,
    pub(crate) stop_exception: Option<i32>,
    pub(crate) observer: Option<Box<dyn InstructionObserver>>,
    pub(crate) dasm_override: Option<Box<dyn DisassemblerOverride>>,
    pub(crate) custom_memory: Option<Box<dyn CustomMemoryDevice>>,
    pub(crate) disassembler: Box<dyn Disassembler>,
    pub(crate) breakpoints: Vec<Breakpoint>,
    pub(crate) watchpoints: [Vec<Watchpoint>; SpaceNum::COUNT],
    pub(crate) trace: Option<TraceState>,
    pub(crate) hotspots: Option<HotspotTable>,
    pub(crate) symbols: SymbolTable,
}

impl std::fmt::Debug for CpuDebugContext {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        fmt.debug_struct("CpuDebugContext")
            .field("tag", &self.tag)
            .field("flags", &self.flags)
            .field("steps_left", &self.steps_left)
            .field("step_target", &self.step_target)
            .field("breakpoints", &self.breakpoints)
            .field("watchpoints", &self.watchpoints)
            .field("hotspots", &self.hotspots)
            .finish_non_exhaustive()
    }
}

impl CpuDebugContext {
    pub(crate) fn new(tag: &str, disassembler: Box<dyn Disassembler>) -> Self {
        Self {
            tag: tag.to_string(),
            flags: DebugFlags::OBSERVING | DebugFlags::HISTORY,
            history: PcHistory::default(),
            steps_left: 0,
            step_target: None,
            stop_addr: 0,
            stop_time: Duration::ZERO,
            end_exec_time: Duration::ZERO,
            stop_interrupt: None,
            stop_exception: None,
            observer: None,
            dasm_override: None,
            custom_memory: None,
            disassembler,
            breakpoints: vec![],
            watchpoints: Default::default(),
            trace: None,
            hotspots: None,
            symbols: SymbolTable::default(),
        }
    }

    #[inline]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    #[inline]
    pub fn flags(&self) -> DebugFlags {
        self.flags
    }

    #[inline]
    pub fn history(&self) -> &PcHistory {
        &self.history
    }

    #[inline]
    pub fn steps_left(&self) -> u32 {
        self.steps_left
    }

    #[inline]
    pub fn step_target(&self) -> Option<u64> {
        self.step_target
    }

    #[inline]
    pub fn breakpoints(&self) -> &[Breakpoint] {
        &self.breakpoints
    }

    #[inline]
    pub fn watchpoints(&self, space: SpaceNum) -> &[Watchpoint] {
        &self.watchpoints[space.index()]
    }

    #[inline]
    pub fn hotspots(&self) -> Option<&HotspotTable> {
        self.hotspots.as_ref()
    }

    #[inline]
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    #[inline]
    pub fn symbols_mut(&mut self) -> &mut SymbolTable {
        &mut self.symbols
    }

    #[inline]
    pub fn is_tracing(&self) -> bool {
        self.trace.is_some()
    }

    /// Recomputes the live breakpoint and watchpoint bits from the lists.
    pub(crate) fn update_live_flags(&mut self) {
        self.flags.set(
            DebugFlags::LIVE_BP,
            self.breakpoints.iter().any(|bp| bp.enabled()),
        );
        self.flags.set(
            DebugFlags::LIVE_WP,
            self.watchpoints.iter().flatten().any(|wp| wp.enabled()),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pc_history() {
        let mut history = PcHistory::default();
        assert!(history.is_empty());
        assert_eq!(history.get(0), None);
        for pc in 0..10 {
            history.push(pc * 4);
        }
        assert_eq!(history.len(), 10);
        assert_eq!(history.get(0), Some(36));
        assert_eq!(history.get(9), Some(0));
        assert_eq!(history.get(10), None);
        let expected: Vec<u64> = (0..10).map(|pc| pc * 4).collect();
        assert_eq!(history.iter().collect::<Vec<_>>(), expected);

        for pc in 10..(PcHistory::CAPACITY as u64 + 5) {
            history.push(pc * 4);
        }
        assert_eq!(history.len(), PcHistory::CAPACITY);
        assert_eq!(history.iter().next(), Some(5 * 4));
        assert_eq!(history.get(0), Some((PcHistory::CAPACITY as u64 + 4) * 4));
    }
}

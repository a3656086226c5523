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

use std::rc::Rc;

use crate::{
    expression::Expression,
    frontend::Frontend,
    logging::TraceItem,
    machine::Machine,
    session::{CpuId, ExecutionState},
    DebugSession,
};

#[derive(Clone, Debug)]
pub struct Breakpoint {
    index: u32,
    enabled: bool,
    address: u64,
    condition: Option<Rc<dyn Expression>>,
    action: Option<String>,
}

impl Breakpoint {
    #[inline]
    pub fn index(&self) -> u32 {
        self.index
    }

    #[inline]
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Program counter value that triggers this breakpoint.
    #[inline]
    pub fn address(&self) -> u64 {
        self.address
    }

    #[inline]
    pub fn condition(&self) -> Option<&Rc<dyn Expression>> {
        self.condition.as_ref()
    }

    #[inline]
    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }
}

impl std::fmt::Display for Breakpoint {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            fmt,
            "{:X}{} {:08X}",
            self.index,
            if self.enabled { ' ' } else { 'D' },
            self.address
        )?;
        if let Some(ref condition) = self.condition {
            write!(fmt, " if {}", condition.source())?;
        }
        if let Some(ref action) = self.action {
            write!(fmt, " do {action}")?;
        }
        Ok(())
    }
}

impl DebugSession {
    /// Sets a breakpoint on `cpu` and returns its index.
    pub fn breakpoint_set(
        &mut self,
        cpu: CpuId,
        address: u64,
        condition: Option<Rc<dyn Expression>>,
        action: Option<&str>,
    ) -> u32 {
        let index = self.next_breakpoint_index;
        self.next_breakpoint_index += 1;
        let ctx = &mut self.cpus[cpu.0];
        ctx.breakpoints.push(Breakpoint {
            index,
            enabled: true,
            address,
            condition,
            action: action.map(str::to_string),
        });
        log::debug!(
            target: TraceItem::Breakpoint.as_str(),
            "set breakpoint {index:X} at {address:#x} on CPU '{}'",
            ctx.tag
        );
        ctx.update_live_flags();
        self.update_debug_flags();
        index
    }

    fn find_breakpoint(&self, index: u32) -> Option<(CpuId, usize)> {
        self.cpus.iter().enumerate().find_map(|(cpu, ctx)| {
            ctx.breakpoints
                .iter()
                .position(|bp| bp.index == index)
                .map(|pos| (CpuId(cpu), pos))
        })
    }

    /// Clears the breakpoint with this index, on whichever CPU owns it.
    pub fn breakpoint_clear(&mut self, index: u32) -> bool {
        let Some((cpu, pos)) = self.find_breakpoint(index) else {
            return false;
        };
        let ctx = &mut self.cpus[cpu.0];
        ctx.breakpoints.remove(pos);
        log::debug!(
            target: TraceItem::Breakpoint.as_str(),
            "cleared breakpoint {index:X} on CPU '{}'",
            ctx.tag
        );
        ctx.update_live_flags();
        self.update_debug_flags();
        true
    }

    pub fn breakpoint_clear_all(&mut self, cpu: CpuId) {
        let ctx = &mut self.cpus[cpu.0];
        ctx.breakpoints.clear();
        ctx.update_live_flags();
        self.update_debug_flags();
    }

    /// Enables or disables the breakpoint with this index.
    pub fn breakpoint_enable(&mut self, index: u32, enable: bool) -> bool {
        let Some((cpu, pos)) = self.find_breakpoint(index) else {
            return false;
        };
        let ctx = &mut self.cpus[cpu.0];
        ctx.breakpoints[pos].enabled = enable;
        ctx.update_live_flags();
        self.update_debug_flags();
        true
    }

    pub fn breakpoint_enable_all(&mut self, cpu: CpuId, enable: bool) {
        let ctx = &mut self.cpus[cpu.0];
        for bp in ctx.breakpoints.iter_mut() {
            bp.enabled = enable;
        }
        ctx.update_live_flags();
        self.update_debug_flags();
    }

    /// Stops at the first breakpoint of `cpu` that `pc` hits, in insertion
    /// order.
    pub(crate) fn breakpoint_check(
        &mut self,
        machine: &mut dyn Machine,
        frontend: &mut dyn Frontend,
        cpu: CpuId,
        pc: u64,
    ) {
        let mut i = 0;
        while let Some(bp) = self.cpus[cpu.0].breakpoints.get(i) {
            i += 1;
            if !bp.enabled || bp.address != pc {
                continue;
            }
            let (index, condition, action) = (bp.index, bp.condition.clone(), bp.action.clone());
            if !self.condition_holds(machine, cpu, condition) {
                continue;
            }
            log::trace!(
                target: TraceItem::Breakpoint.as_str(),
                "breakpoint {index:X} hit at {pc:#x}"
            );
            self.set_execution_state(ExecutionState::Stopped);
            if let Some(action) = action {
                frontend.execute_command(self, machine, &action);
            }
            if self.is_stopped() {
                frontend.print(&format!("Stopped at breakpoint {index:X}"));
            }
            break;
        }
    }
}

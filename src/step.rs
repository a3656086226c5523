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

use crate::{
    cpu::DebugFlags,
    disasm::DasmFlags,
    logging::TraceItem,
    machine::Machine,
    session::{CpuId, ExecutionState},
    DebugSession,
};

/// Steps left when stepping out of a subroutine, refreshed on every
/// instruction that is not a return.
const STEP_OUT_STEPS: u32 = 100;

impl DebugSession {
    fn start_stepping(&mut self, steps: u32, mode: DebugFlags) {
        let Some(cpu) = self.visible_cpu else {
            return;
        };
        let ctx = &mut self.cpus[cpu.0];
        ctx.steps_left = steps;
        ctx.step_target = None;
        ctx.flags.insert(mode);
        log::debug!(
            target: TraceItem::Step.as_str(),
            "{mode:?} {steps} on CPU '{}'",
            ctx.tag
        );
        self.set_execution_state(ExecutionState::Running);
    }

    /// Resumes the visible CPU for `count` instructions.
    pub fn set_single_step(&mut self, count: u32) {
        self.start_stepping(count, DebugFlags::STEPPING);
    }

    /// Like [`set_single_step`](Self::set_single_step), but a subroutine
    /// call counts as a single instruction.
    pub fn set_step_over(&mut self, count: u32) {
        self.start_stepping(count, DebugFlags::STEPPING_OVER);
    }

    /// Resumes the visible CPU until the current subroutine returns.
    pub fn set_step_out(&mut self) {
        self.start_stepping(STEP_OUT_STEPS, DebugFlags::STEPPING_OUT);
    }

    /// Arms the step target for the instruction about to execute at `pc`.
    pub(crate) fn prepare_for_step_overout(
        &mut self,
        machine: &mut dyn Machine,
        cpu: CpuId,
        pc: u64,
    ) {
        let dasm = self.disassemble(machine, cpu, pc);
        if let Some(target) = self.post_call_address(machine, cpu, pc, &dasm) {
            log::trace!(
                target: TraceItem::Step.as_str(),
                "stepping over call at {pc:#x}, stopping at {target:#x}"
            );
            self.cpus[cpu.0].step_target = Some(target);
        }
        let ctx = &mut self.cpus[cpu.0];
        if ctx.flags.contains(DebugFlags::STEPPING_OUT) {
            ctx.steps_left = if dasm.flags.contains(DasmFlags::SUPPORTED)
                && !dasm.flags.contains(DasmFlags::STEP_OUT)
            {
                STEP_OUT_STEPS
            } else {
                1
            };
        }
    }
}

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

//! Entry points called by the CPU cores and the memory system.
//!
//! [`DebugSession::instruction_hook`] runs before every instruction of a CPU
//! whose [`needs_instruction_hook`](DebugSession::needs_instruction_hook) is
//! set. It is where execution halts: while the session is stopped it loops
//! on [`Frontend::wait_for_debugger`] until a command resumes execution.

use std::time::Duration;

use crate::{
    cpu::DebugFlags,
    frontend::{Frontend, ViewKind},
    logging::TraceItem,
    machine::Machine,
    memory::SpaceNum,
    session::{CpuId, ExecutionState},
    watchpoint::AccessType,
    DebugSession,
};

impl DebugSession {
    /// Called by the CPU core before executing the instruction at `pc`.
    pub fn instruction_hook(
        &mut self,
        machine: &mut dyn Machine,
        frontend: &mut dyn Frontend,
        cpu: CpuId,
        pc: u64,
    ) {
        let _guard = self.within_instruction_hook.enter();
        self.live_cpu = Some(cpu);
        self.scheduled_event_pending = machine.scheduled_event_pending();

        self.cpus[cpu.0].history.push(pc);

        if self.cpus[cpu.0].flags.intersects(DebugFlags::TRACING_ANY) {
            self.trace_step(machine, frontend, cpu, pc);
        }

        let halt = self.cpus[cpu.0]
            .observer
            .as_mut()
            .is_some_and(|observer| observer.on_instruction(cpu, pc));
        if halt && !self.is_stopped() {
            log::trace!(
                target: TraceItem::Hook.as_str(),
                "instruction observer halted CPU '{}' at {pc:#x}",
                self.cpus[cpu.0].tag
            );
            self.set_execution_state(ExecutionState::Stopped);
        }

        if !self.is_stopped() && self.cpus[cpu.0].flags.intersects(DebugFlags::STEPPING_ANY) {
            self.step_check(frontend, cpu, pc);
        }

        if !self.is_stopped()
            && self.cpus[cpu.0]
                .flags
                .intersects(DebugFlags::STOP_TIME | DebugFlags::STOP_PC | DebugFlags::LIVE_BP)
        {
            self.stop_check(machine, frontend, cpu, pc);
        }

        if self.is_stopped() {
            self.wait_while_stopped(machine, frontend, cpu);
        }

        let ctx = &self.cpus[cpu.0];
        if ctx
            .flags
            .intersects(DebugFlags::STEPPING_OVER | DebugFlags::STEPPING_OUT)
            && ctx.step_target.is_none()
        {
            self.prepare_for_step_overout(machine, cpu, pc);
        }
    }

    fn step_check(&mut self, frontend: &mut dyn Frontend, cpu: CpuId, pc: u64) {
        let ctx = &mut self.cpus[cpu.0];
        if ctx.step_target.is_some_and(|target| target != pc) {
            return;
        }
        ctx.step_target = None;
        ctx.steps_left = ctx.steps_left.saturating_sub(1);
        if ctx.steps_left == 0 {
            log::trace!(target: TraceItem::Step.as_str(), "step done at {pc:#x}");
            self.set_execution_state(ExecutionState::Stopped);
        } else if !ctx.flags.contains(DebugFlags::STEPPING_OUT)
            && (ctx.steps_left < 200 || ctx.steps_left % 100 == 0)
        {
            frontend.update_views(ViewKind::All);
            frontend.flush_views();
        }
    }

    fn stop_check(
        &mut self,
        machine: &mut dyn Machine,
        frontend: &mut dyn Frontend,
        cpu: CpuId,
        pc: u64,
    ) {
        let ctx = &mut self.cpus[cpu.0];
        let now = machine.current_time();
        if ctx.flags.contains(DebugFlags::STOP_TIME) && now >= ctx.stop_time {
            frontend.print(&format!(
                "Stopped at time interval {:.1}",
                now.as_secs_f64()
            ));
            self.set_execution_state(ExecutionState::Stopped);
        } else if ctx.flags.contains(DebugFlags::STOP_PC) && ctx.stop_addr == pc {
            ctx.flags.remove(DebugFlags::STOP_PC);
            frontend.print(&format!(
                "Stopped at temporary breakpoint {:X} on CPU '{}'",
                ctx.stop_addr, ctx.tag
            ));
            self.set_execution_state(ExecutionState::Stopped);
        } else if ctx.flags.contains(DebugFlags::LIVE_BP) {
            self.breakpoint_check(machine, frontend, cpu, pc);
        }
    }

    fn wait_while_stopped(
        &mut self,
        machine: &mut dyn Machine,
        frontend: &mut dyn Frontend,
        cpu: CpuId,
    ) {
        self.reset_transient_flags();
        self.pending_break_cpu = None;
        self.visible_cpu = Some(cpu);
        self.flush_traces();
        frontend.update_views(ViewKind::All);
        frontend.mute_audio(true);
        log::debug!(
            target: TraceItem::Hook.as_str(),
            "halted on CPU '{}' at {:#x}",
            self.cpus[cpu.0].tag,
            machine.pc(cpu)
        );

        let mut first_stop = true;
        while self.is_stopped() {
            frontend.flush_views();
            self.memory_modified = false;
            frontend.wait_for_debugger(self, machine, cpu, first_stop);
            first_stop = false;
            if self.memory_modified {
                frontend.update_views(ViewKind::Disassembly);
            }
            if self.is_stopped() {
                self.process_script_line(machine, frontend);
            }
            if machine.scheduled_event_pending() {
                self.scheduled_event_pending = true;
                self.set_execution_state(ExecutionState::Running);
            }
        }

        frontend.mute_audio(false);
        self.visible_cpu = Some(cpu);
        log::debug!(
            target: TraceItem::Hook.as_str(),
            "resumed on CPU '{}'",
            self.cpus[cpu.0].tag
        );
        self.update_debug_flags();
    }

    /// Called by the memory system on reads of a space whose read hooks are
    /// enabled. `mem_mask` selects the byte lanes read at byte `address`.
    pub fn memory_read_hook(
        &mut self,
        machine: &mut dyn Machine,
        frontend: &mut dyn Frontend,
        cpu: CpuId,
        space: SpaceNum,
        address: u64,
        mem_mask: u64,
    ) {
        self.watchpoint_check(
            machine,
            frontend,
            cpu,
            space,
            AccessType::READ,
            address,
            0,
            mem_mask,
        );
        if self.cpus[cpu.0].hotspots.is_some() && !self.debugger_access.is_active() {
            self.hotspot_check(machine, frontend, cpu, space, address);
        }
    }

    /// Called by the memory system on writes to a space whose write hooks
    /// are enabled.
    #[allow(clippy::too_many_arguments)]
    pub fn memory_write_hook(
        &mut self,
        machine: &mut dyn Machine,
        frontend: &mut dyn Frontend,
        cpu: CpuId,
        space: SpaceNum,
        address: u64,
        data: u64,
        mem_mask: u64,
    ) {
        self.watchpoint_check(
            machine,
            frontend,
            cpu,
            space,
            AccessType::WRITE,
            address,
            data,
            mem_mask,
        );
    }

    /// Called when `cpu` starts a timeslice ending at emulated time
    /// `end_time`.
    pub fn start_hook(
        &mut self,
        machine: &mut dyn Machine,
        frontend: &mut dyn Frontend,
        cpu: CpuId,
        end_time: Duration,
    ) {
        self.live_cpu = Some(cpu);
        self.scheduled_event_pending = machine.scheduled_event_pending();
        self.cpus[cpu.0].end_exec_time = end_time;

        if !self.is_stopped() {
            let now = frontend.ticks();
            let interval = frontend.ticks_per_second() * self.update_interval_ms / 1000;
            if self.visible_cpu == Some(cpu) && now > self.last_periodic_update + interval {
                frontend.update_views(ViewKind::Memory);
                frontend.update_views(ViewKind::Watchpoints);
                frontend.flush_views();
                self.last_periodic_update = now;
            } else if self.pending_break_cpu == Some(cpu) {
                self.set_execution_state(ExecutionState::Stopped);
                self.pending_break_cpu = None;
            }

            if self.vblank_occurred {
                self.vblank_occurred = false;
                if self.cpus[cpu.0].flags.contains(DebugFlags::STOP_VBLANK) {
                    self.set_execution_state(ExecutionState::Stopped);
                    frontend.print("Stopped at VBLANK");
                } else if frontend.break_requested() {
                    if let Some(visible) = self.visible_cpu {
                        self.halt_on_next_instruction(frontend, visible, "User-initiated break");
                    }
                }
            }
        }
        self.update_debug_flags();
    }

    /// Called when `cpu` ends its timeslice.
    pub fn stop_hook(&mut self, cpu: CpuId) {
        debug_assert!(
            self.live_cpu.is_none() || self.live_cpu == Some(cpu),
            "stop_hook on a CPU that is not live"
        );
        if self.cpus[cpu.0].flags.contains(DebugFlags::STOP_CONTEXT) {
            self.set_execution_state(ExecutionState::Stopped);
            self.reset_transient_flags();
        }
        self.live_cpu = None;
    }

    /// Called when `cpu` takes interrupt line `irq`.
    pub fn interrupt_hook(&mut self, frontend: &mut dyn Frontend, cpu: CpuId, irq: i32) {
        let ctx = &self.cpus[cpu.0];
        if ctx.flags.contains(DebugFlags::STOP_INTERRUPT)
            && ctx.stop_interrupt.map_or(true, |line| line == irq)
        {
            let message = format!("Stopped on interrupt (CPU '{}', IRQ {irq})", ctx.tag);
            self.set_execution_state(ExecutionState::Stopped);
            frontend.print(&message);
        }
    }

    /// Called when `cpu` takes exception `exception`.
    pub fn exception_hook(&mut self, frontend: &mut dyn Frontend, cpu: CpuId, exception: i32) {
        let ctx = &self.cpus[cpu.0];
        if ctx.flags.contains(DebugFlags::STOP_EXCEPTION)
            && ctx.stop_exception.map_or(true, |number| number == exception)
        {
            let message = format!(
                "Stopped on exception (CPU '{}', exception {exception})",
                ctx.tag
            );
            self.set_execution_state(ExecutionState::Stopped);
            frontend.print(&message);
        }
    }

    /// Called by the video system on VBLANK transitions.
    pub fn vblank_hook(&mut self, state: bool) {
        if state {
            self.vblank_occurred = true;
        }
    }
}

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

use std::{cell::Cell, rc::Rc, time::Duration};

use rustc_hash::FxHashMap;

use crate::{
    config::DebugOptions,
    cpu::{CpuDebugContext, DebugFlags, InstructionObserver},
    disasm::{Disassembler, DisassemblerOverride},
    error::DebugError,
    frontend::Frontend,
    gateway::CustomMemoryDevice,
    logging::TraceItem,
    machine::Machine,
    script::CommandScript,
    symbols::SymbolTable,
};

/// Index of a CPU registered with a [`DebugSession`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CpuId(pub usize);

impl std::fmt::Display for CpuId {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(fmt, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionState {
    Stopped,
    Running,
}

/// A reentrancy flag that is raised for the lifetime of a
/// [`ReentrancyGuard`].
#[derive(Clone, Debug, Default)]
pub(crate) struct Reentrancy(Rc<Cell<bool>>);

impl Reentrancy {
    #[inline]
    pub(crate) fn is_active(&self) -> bool {
        self.0.get()
    }

    #[must_use]
    pub(crate) fn enter(&self) -> ReentrancyGuard {
        let previous = self.0.replace(true);
        ReentrancyGuard {
            flag: Rc::clone(&self.0),
            previous,
        }
    }
}

/// Restores the flag to its previous value when dropped, so guards nest.
pub(crate) struct ReentrancyGuard {
    flag: Rc<Cell<bool>>,
    previous: bool,
}

impl Drop for ReentrancyGuard {
    fn drop(&mut self) {
        self.flag.set(self.previous);
    }
}

/// Number of `tempN` scratch variables.
pub const TEMP_VARIABLES: usize = 10;

/// Debugger state of a running machine.
pub struct DebugSession {
    pub(crate) cpus: Vec<CpuDebugContext>,
    tags: FxHashMap<String, CpuId>,
    pub(crate) live_cpu: Option<CpuId>,
    pub(crate) visible_cpu: Option<CpuId>,
    pub(crate) pending_break_cpu: Option<CpuId>,
    pub(crate) execution_state: ExecutionState,
    pub(crate) within_instruction_hook: Reentrancy,
    pub(crate) debugger_access: Reentrancy,
    pub(crate) vblank_occurred: bool,
    pub(crate) memory_modified: bool,
    pub(crate) next_breakpoint_index: u32,
    pub(crate) next_watchpoint_index: u32,
    pub(crate) temp: [u64; TEMP_VARIABLES],
    pub(crate) wpaddr: u64,
    pub(crate) wpdata: u64,
    pub(crate) script: Option<CommandScript>,
    pub(crate) symbols: SymbolTable,
    pub(crate) started: bool,
    pub(crate) scheduled_event_pending: bool,
    pub(crate) update_interval_ms: u64,
    pub(crate) last_periodic_update: u64,
    initial_breakpoints: Vec<u64>,
}

impl std::fmt::Debug for DebugSession {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        fmt.debug_struct("DebugSession")
            .field("cpus", &self.cpus)
            .field("live_cpu", &self.live_cpu)
            .field("visible_cpu", &self.visible_cpu)
            .field("pending_break_cpu", &self.pending_break_cpu)
            .field("execution_state", &self.execution_state)
            .field("memory_modified", &self.memory_modified)
            .finish_non_exhaustive()
    }
}

impl DebugSession {
    /// Creates the session of a machine that is about to start.
    ///
    /// Fails if `options` name a command script that cannot be opened.
    pub fn new(options: &DebugOptions) -> Result<Self, DebugError> {
        let mut session = Self {
            cpus: vec![],
            tags: FxHashMap::default(),
            live_cpu: None,
            visible_cpu: None,
            pending_break_cpu: None,
            execution_state: if options.start_running {
                ExecutionState::Running
            } else {
                ExecutionState::Stopped
            },
            within_instruction_hook: Reentrancy::default(),
            debugger_access: Reentrancy::default(),
            vblank_occurred: false,
            memory_modified: false,
            next_breakpoint_index: 1,
            next_watchpoint_index: 1,
            temp: [0; TEMP_VARIABLES],
            wpaddr: 0,
            wpdata: 0,
            script: None,
            symbols: SymbolTable::default(),
            started: false,
            scheduled_event_pending: false,
            update_interval_ms: options.update_interval_ms,
            last_periodic_update: 0,
            initial_breakpoints: options.breakpoints.clone(),
        };
        if let Some(ref path) = options.debugscript {
            session.open_script(path)?;
        }
        Ok(session)
    }

    /// Registers a CPU. The first CPU registered becomes the visible one and
    /// receives the initial breakpoints.
    pub fn add_cpu(&mut self, tag: &str, disassembler: Box<dyn Disassembler>) -> CpuId {
        debug_assert!(!self.tags.contains_key(tag), "CPU {tag} added twice");
        let id = CpuId(self.cpus.len());
        self.cpus.push(CpuDebugContext::new(tag, disassembler));
        self.tags.insert(tag.to_string(), id);
        if self.visible_cpu.is_none() {
            self.visible_cpu = Some(id);
            for address in std::mem::take(&mut self.initial_breakpoints) {
                self.breakpoint_set(id, address, None, None);
            }
        }
        self.update_debug_flags();
        id
    }

    /// Called once the machine is running. From then on, a command script
    /// that cannot be opened is no longer a fatal error.
    pub fn machine_started(&mut self) {
        self.started = true;
    }

    #[inline]
    pub fn cpu(&self, cpu: CpuId) -> &CpuDebugContext {
        &self.cpus[cpu.0]
    }

    #[inline]
    pub fn cpu_mut(&mut self, cpu: CpuId) -> &mut CpuDebugContext {
        &mut self.cpus[cpu.0]
    }

    #[inline]
    pub fn cpu_count(&self) -> usize {
        self.cpus.len()
    }

    pub fn find_cpu(&self, tag: &str) -> Option<CpuId> {
        self.tags.get(tag).copied()
    }

    #[inline]
    pub fn execution_state(&self) -> ExecutionState {
        self.execution_state
    }

    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.execution_state == ExecutionState::Stopped
    }

    pub fn set_execution_state(&mut self, state: ExecutionState) {
        self.execution_state = state;
        self.update_debug_flags();
    }

    #[inline]
    pub fn live_cpu(&self) -> Option<CpuId> {
        self.live_cpu
    }

    #[inline]
    pub fn visible_cpu(&self) -> Option<CpuId> {
        self.visible_cpu
    }

    pub fn set_visible_cpu(&mut self, cpu: CpuId) {
        debug_assert!(cpu.0 < self.cpus.len());
        self.visible_cpu = Some(cpu);
    }

    #[inline]
    pub fn pending_break_cpu(&self) -> Option<CpuId> {
        self.pending_break_cpu
    }

    /// Whether memory was written through the debugger since the wait loop
    /// last checked.
    #[inline]
    pub fn memory_modified(&self) -> bool {
        self.memory_modified
    }

    #[inline]
    pub fn vblank_occurred(&self) -> bool {
        self.vblank_occurred
    }

    /// Byte address of the last access checked against watchpoints.
    #[inline]
    pub fn wpaddr(&self) -> u64 {
        self.wpaddr
    }

    /// Value of the last write checked against watchpoints.
    #[inline]
    pub fn wpdata(&self) -> u64 {
        self.wpdata
    }

    #[inline]
    pub fn temp(&self) -> &[u64; TEMP_VARIABLES] {
        &self.temp
    }

    #[inline]
    pub fn temp_mut(&mut self) -> &mut [u64; TEMP_VARIABLES] {
        &mut self.temp
    }

    #[inline]
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    #[inline]
    pub fn symbols_mut(&mut self) -> &mut SymbolTable {
        &mut self.symbols
    }

    /// Whether the CPU core must call
    /// [`instruction_hook`](Self::instruction_hook) before each instruction
    /// of `cpu`.
    #[inline]
    pub fn needs_instruction_hook(&self, cpu: CpuId) -> bool {
        self.cpus[cpu.0].flags.contains(DebugFlags::CALL_HOOK)
    }

    /// Recomputes the call-hook flag of every CPU.
    pub(crate) fn update_debug_flags(&mut self) {
        const WANTS_HOOK: DebugFlags = DebugFlags::HISTORY
            .union(DebugFlags::TRACING_ANY)
            .union(DebugFlags::HOOKED)
            .union(DebugFlags::STEPPING_ANY)
            .union(DebugFlags::STOP_PC)
            .union(DebugFlags::LIVE_BP);

        let stopped = self.is_stopped();
        let event_pending = self.scheduled_event_pending;
        for ctx in self.cpus.iter_mut() {
            let call_hook = ctx.flags.contains(DebugFlags::OBSERVING)
                && !event_pending
                && (stopped
                    || ctx.flags.intersects(WANTS_HOOK)
                    || (ctx.flags.contains(DebugFlags::STOP_TIME)
                        && ctx.stop_time <= ctx.end_exec_time));
            ctx.flags.set(DebugFlags::CALL_HOOK, call_hook);
        }
    }

    pub(crate) fn reset_transient_flags(&mut self) {
        for ctx in self.cpus.iter_mut() {
            ctx.flags.remove(DebugFlags::TRANSIENT);
        }
    }

    fn resume_visible(&mut self, flags: DebugFlags) -> Option<CpuId> {
        let cpu = self.visible_cpu?;
        self.cpus[cpu.0].flags.insert(flags);
        self.set_execution_state(ExecutionState::Running);
        Some(cpu)
    }

    /// Resumes execution, stopping when the visible CPU reaches `target`.
    pub fn go(&mut self, target: Option<u64>) {
        let Some(cpu) = self.visible_cpu else {
            return;
        };
        if let Some(target) = target {
            self.cpus[cpu.0].stop_addr = target;
            self.cpus[cpu.0].flags.insert(DebugFlags::STOP_PC);
        }
        self.set_execution_state(ExecutionState::Running);
    }

    /// Resumes execution until the next VBLANK.
    pub fn go_vblank(&mut self) {
        self.vblank_occurred = false;
        self.resume_visible(DebugFlags::STOP_VBLANK);
    }

    /// Resumes execution until the visible CPU takes interrupt `irq`, or any
    /// interrupt.
    pub fn go_interrupt(&mut self, irq: Option<i32>) {
        if let Some(cpu) = self.visible_cpu {
            self.cpus[cpu.0].stop_interrupt = irq;
        }
        self.resume_visible(DebugFlags::STOP_INTERRUPT);
    }

    /// Resumes execution until the visible CPU takes exception `exception`,
    /// or any exception.
    pub fn go_exception(&mut self, exception: Option<i32>) {
        if let Some(cpu) = self.visible_cpu {
            self.cpus[cpu.0].stop_exception = exception;
        }
        self.resume_visible(DebugFlags::STOP_EXCEPTION);
    }

    /// Resumes execution for `ms` milliseconds of emulated time.
    pub fn go_milliseconds(&mut self, machine: &dyn Machine, ms: u64) {
        if let Some(cpu) = self.visible_cpu {
            self.cpus[cpu.0].stop_time = machine.current_time() + Duration::from_millis(ms);
        }
        self.resume_visible(DebugFlags::STOP_TIME);
    }

    /// Resumes execution until the visible CPU's timeslice ends.
    pub fn go_next_cpu(&mut self) {
        self.resume_visible(DebugFlags::STOP_CONTEXT);
    }

    /// Halts `cpu` before its next instruction, printing `message`.
    ///
    /// Does nothing if execution is already stopped or `cpu` already has a
    /// break pending.
    pub fn halt_on_next_instruction(
        &mut self,
        frontend: &mut dyn Frontend,
        cpu: CpuId,
        message: &str,
    ) {
        if self.is_stopped() || self.pending_break_cpu == Some(cpu) {
            return;
        }
        frontend.print(message);
        if self.live_cpu == Some(cpu) {
            self.set_execution_state(ExecutionState::Stopped);
        } else {
            self.pending_break_cpu = Some(cpu);
        }
    }

    /// Stops or resumes observing `cpu`. Ignored CPUs never halt.
    pub fn ignore_cpu(&mut self, cpu: CpuId, ignore: bool) {
        self.cpus[cpu.0].flags.set(DebugFlags::OBSERVING, !ignore);
        log::debug!(
            target: TraceItem::Hook.as_str(),
            "{} CPU '{}'",
            if ignore { "ignoring" } else { "observing" },
            self.cpus[cpu.0].tag
        );
        if ignore && self.is_stopped() && self.visible_cpu == Some(cpu) {
            self.go_next_cpu();
        } else {
            self.update_debug_flags();
        }
    }

    /// Turns per-instruction PC history recording for `cpu` on or off.
    ///
    /// With history off, the instruction hook only runs while another mode
    /// needs it, and the history ring only records those instructions.
    pub fn set_history(&mut self, cpu: CpuId, enable: bool) {
        self.cpus[cpu.0].flags.set(DebugFlags::HISTORY, enable);
        log::debug!(
            target: TraceItem::Hook.as_str(),
            "history {} for CPU '{}'",
            if enable { "enabled" } else { "disabled" },
            self.cpus[cpu.0].tag
        );
        self.update_debug_flags();
    }

    /// Installs or removes the per-instruction observer of `cpu`.
    pub fn set_instruction_hook(
        &mut self,
        cpu: CpuId,
        observer: Option<Box<dyn InstructionObserver>>,
    ) {
        let ctx = &mut self.cpus[cpu.0];
        ctx.flags.set(DebugFlags::HOOKED, observer.is_some());
        ctx.observer = observer;
        self.update_debug_flags();
    }

    pub fn set_disassembly_override(
        &mut self,
        cpu: CpuId,
        dasm_override: Option<Box<dyn DisassemblerOverride>>,
    ) {
        self.cpus[cpu.0].dasm_override = dasm_override;
    }

    pub fn set_custom_memory(&mut self, cpu: CpuId, device: Option<Box<dyn CustomMemoryDevice>>) {
        self.cpus[cpu.0].custom_memory = device;
    }
}

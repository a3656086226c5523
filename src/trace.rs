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

//! Instruction trace files.
//!
//! Each traced instruction is written as `<pc>: <disassembly>`. Tight loops
//! are collapsed: once a program counter shows up more than once among the
//! last [`TraceState::LOOP_WINDOW`] traced ones, nothing is written until the
//! loop is left, and a summary with the number of skipped instructions is
//! written instead.

use std::{
    fs::OpenOptions,
    io::{BufWriter, Write},
    path::Path,
};

use crate::{
    cpu::DebugFlags,
    error::DebugError,
    frontend::Frontend,
    logging::TraceItem,
    machine::Machine,
    memory::SpaceNum,
    session::CpuId,
    DebugSession,
};

pub struct TraceState {
    output: Box<dyn Write>,
    action: Option<String>,
    over: bool,
    /// Tracing resumes once the program counter reaches this address.
    over_target: Option<u64>,
    recent: [u64; Self::LOOP_WINDOW],
    next: usize,
    loops: u32,
}

impl std::fmt::Debug for TraceState {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        fmt.debug_struct("TraceState")
            .field("action", &self.action)
            .field("over", &self.over)
            .field("over_target", &self.over_target)
            .field("loops", &self.loops)
            .finish_non_exhaustive()
    }
}

impl TraceState {
    pub const LOOP_WINDOW: usize = 64;

    fn new(output: Box<dyn Write>, over: bool, action: Option<&str>) -> Self {
        Self {
            output,
            action: action.map(str::to_string),
            over,
            over_target: None,
            recent: [u64::MAX; Self::LOOP_WINDOW],
            next: 0,
            loops: 0,
        }
    }

    fn remember(&mut self, pc: u64) {
        self.next = (self.next + 1) % Self::LOOP_WINDOW;
        self.recent[self.next] = pc;
    }

    fn is_looping(&self, pc: u64) -> bool {
        self.recent.iter().filter(|&&recent| recent == pc).count() > 1
    }
}

impl DebugSession {
    /// Starts tracing `cpu` to `output`, or stops tracing if `output` is
    /// `None`.
    ///
    /// In `over` mode, subroutine calls are not traced into. `action` is a
    /// command executed before each traced instruction.
    pub fn set_trace(
        &mut self,
        cpu: CpuId,
        output: Option<Box<dyn Write>>,
        over: bool,
        action: Option<&str>,
    ) {
        let ctx = &mut self.cpus[cpu.0];
        if let Some(mut previous) = ctx.trace.take() {
            if let Err(err) = previous.output.flush() {
                log::warn!(target: TraceItem::Trace.as_str(), "could not flush trace: {err}");
            }
        }
        ctx.flags.remove(DebugFlags::TRACING_ANY);
        if let Some(output) = output {
            ctx.trace = Some(TraceState::new(output, over, action));
            ctx.flags.insert(if over {
                DebugFlags::TRACING_OVER
            } else {
                DebugFlags::TRACING
            });
        }
        log::debug!(
            target: TraceItem::Trace.as_str(),
            "tracing {} on CPU '{}'",
            if ctx.trace.is_some() { "enabled" } else { "disabled" },
            ctx.tag
        );
        self.update_debug_flags();
    }

    /// Starts tracing `cpu` to the file at `path`.
    pub fn trace_to_file(
        &mut self,
        cpu: CpuId,
        path: &Path,
        append: bool,
        over: bool,
        action: Option<&str>,
    ) -> Result<(), DebugError> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .append(append)
            .truncate(!append)
            .open(path)
            .map_err(|source| DebugError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        self.set_trace(cpu, Some(Box::new(BufWriter::new(file))), over, action);
        Ok(())
    }

    pub fn flush_traces(&mut self) {
        for ctx in self.cpus.iter_mut() {
            if let Some(ref mut trace) = ctx.trace {
                if let Err(err) = trace.output.flush() {
                    log::warn!(target: TraceItem::Trace.as_str(), "could not flush trace: {err}");
                }
            }
        }
    }

    /// Traces the instruction about to execute at `pc`.
    pub(crate) fn trace_step(
        &mut self,
        machine: &mut dyn Machine,
        frontend: &mut dyn Frontend,
        cpu: CpuId,
        pc: u64,
    ) {
        let action = {
            let Some(ref mut trace) = self.cpus[cpu.0].trace else {
                return;
            };
            if trace.over {
                match trace.over_target {
                    Some(target) if target != pc => return,
                    Some(_) => trace.over_target = None,
                    None => {}
                }
            }
            if trace.is_looping(pc) {
                trace.loops += 1;
                return;
            }
            if trace.loops != 0 {
                let loops = std::mem::take(&mut trace.loops);
                if let Err(err) = write!(trace.output, "\n   (loops for {loops} instructions)\n\n") {
                    log::warn!(target: TraceItem::Trace.as_str(), "could not write trace: {err}");
                }
            }
            trace.action.clone()
        };
        if let Some(action) = action {
            frontend.execute_command(self, machine, &action);
        }

        let chars = machine
            .space(cpu, SpaceNum::Program)
            .map_or(8, |s| s.config().logical_address_chars());
        let dasm = self.disassemble(machine, cpu, pc);
        let over_target = if self.cpus[cpu.0].flags.contains(DebugFlags::TRACING_OVER) {
            self.post_call_address(machine, cpu, pc, &dasm)
        } else {
            None
        };
        // The action may have stopped tracing.
        let Some(ref mut trace) = self.cpus[cpu.0].trace else {
            return;
        };
        if let Err(err) = writeln!(trace.output, "{pc:0chars$X}: {}", dasm.text) {
            log::warn!(target: TraceItem::Trace.as_str(), "could not write trace: {err}");
        }
        if trace.over {
            trace.over_target = over_target;
        }
        trace.remember(pc);
    }
}

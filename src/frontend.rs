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

use crate::{machine::Machine, session::CpuId, DebugSession};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ViewKind {
    All,
    Disassembly,
    Memory,
    Watchpoints,
}

/// The debugger user interface: console, command processor, views and the
/// host event loop.
pub trait Frontend {
    /// Blocks until the operator does something, pumping the host event
    /// loop.
    ///
    /// This is the only place where the engine blocks. Implementations may
    /// run any number of commands against `session` before returning,
    /// including commands that resume execution.
    fn wait_for_debugger(
        &mut self,
        session: &mut DebugSession,
        machine: &mut dyn Machine,
        cpu: CpuId,
        first_stop: bool,
    );

    /// Executes a debugger command line, such as a breakpoint action.
    fn execute_command(
        &mut self,
        session: &mut DebugSession,
        machine: &mut dyn Machine,
        command: &str,
    );

    /// Prints a line of text to the debugger console.
    fn print(&mut self, text: &str);

    fn update_views(&mut self, _kind: ViewKind) {}

    fn flush_views(&mut self) {}

    /// Mutes or unmutes emulated sound while the machine is halted.
    fn mute_audio(&mut self, _mute: bool) {}

    /// Host tick counter.
    fn ticks(&self) -> u64;

    fn ticks_per_second(&self) -> u64;

    /// Whether the operator pressed the debugger break key.
    fn break_requested(&mut self) -> bool {
        false
    }
}

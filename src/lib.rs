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

//! Execution control and memory inspection for the debugger of a multi-CPU
//! emulator.
//!
//! A [`DebugSession`] is created when the machine starts and every emulated
//! CPU is registered with [`DebugSession::add_cpu`]. From then on the
//! emulator calls into the session:
//!
//! - the CPU cores call [`DebugSession::instruction_hook`] before each
//!   instruction of a CPU for which
//!   [`DebugSession::needs_instruction_hook`] is set, and the
//!   [`start_hook`](DebugSession::start_hook),
//!   [`stop_hook`](DebugSession::stop_hook),
//!   [`interrupt_hook`](DebugSession::interrupt_hook) and
//!   [`exception_hook`](DebugSession::exception_hook) notifications,
//! - the memory system calls [`DebugSession::memory_read_hook`] and
//!   [`DebugSession::memory_write_hook`] on spaces that asked for them.
//!
//! The emulator itself is seen through the [`Machine`] trait and the user
//! interface through the [`Frontend`] trait. Breakpoint and watchpoint
//! conditions are [`Expression`]s compiled by an external evaluator.

pub mod breakpoint;
pub mod config;
pub mod cpu;
pub mod disasm;
pub mod error;
pub mod expression;
pub mod frontend;
pub mod gateway;
pub mod hook;
pub mod hotspot;
pub mod logging;
pub mod machine;
pub mod memory;
pub mod script;
pub mod session;
pub mod step;
pub mod symbols;
pub mod trace;
pub mod watchpoint;

pub use config::DebugOptions;
pub use error::DebugError;
pub use expression::{Expression, ExpressionContext, ExpressionError, ExpressionSpace};
pub use frontend::{Frontend, ViewKind};
pub use machine::Machine;
pub use session::{CpuId, DebugSession, ExecutionState};

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

//! Glue between the debugger and an external expression evaluator.
//!
//! Breakpoint and watchpoint conditions are compiled [`Expression`]s owned by
//! the evaluator. While one runs, it resolves symbols and memory references
//! through an [`ExpressionContext`], which the engine implements with
//! [`ExpressionMemoryBridge`].

use std::rc::Rc;

use crate::{
    logging::TraceItem,
    machine::Machine,
    memory::{low_mask, RawView, SpaceNum},
    session::{CpuId, TEMP_VARIABLES},
    DebugSession,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExpressionError {
    /// No CPU or memory region goes by this name.
    InvalidMemoryName(String),
    NoSuchMemorySpace,
    /// Region accesses need a region name.
    MissingMemoryName,
    UnknownSymbol(String),
    ReadOnlySymbol(String),
    Other(String),
}

impl std::fmt::Display for ExpressionError {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::InvalidMemoryName(name) => write!(fmt, "invalid memory name '{name}'"),
            Self::NoSuchMemorySpace => write!(fmt, "no such memory space"),
            Self::MissingMemoryName => write!(fmt, "missing memory name"),
            Self::UnknownSymbol(name) => write!(fmt, "unknown symbol '{name}'"),
            Self::ReadOnlySymbol(name) => write!(fmt, "symbol '{name}' is read-only"),
            Self::Other(msg) => write!(fmt, "{msg}"),
        }
    }
}

impl std::error::Error for ExpressionError {}

/// Memory an expression can reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExpressionSpace {
    /// Logical addresses of an address space, translated and hooked like CPU
    /// accesses.
    Logical(SpaceNum),
    Physical(SpaceNum),
    /// Decrypted opcode view of the program space.
    Opcode,
    /// RAM view of the program space, bypassing memory handlers.
    RamWrite,
    /// A named memory region.
    Region,
}

/// A compiled expression.
pub trait Expression: std::fmt::Debug {
    fn execute(&self, context: &mut dyn ExpressionContext) -> Result<u64, ExpressionError>;

    /// Source text, for listings.
    fn source(&self) -> &str;
}

/// Symbol and memory resolution offered to a running [`Expression`].
pub trait ExpressionContext {
    fn symbol(&mut self, name: &str) -> Result<u64, ExpressionError>;

    fn set_symbol(&mut self, name: &str, value: u64) -> Result<(), ExpressionError>;

    /// Reads `size` bytes at `address`. `name` selects a CPU by tag, or a
    /// memory region.
    fn read_memory(
        &mut self,
        name: Option<&str>,
        space: ExpressionSpace,
        address: u64,
        size: u8,
    ) -> u64;

    fn write_memory(
        &mut self,
        name: Option<&str>,
        space: ExpressionSpace,
        address: u64,
        size: u8,
        value: u64,
    );

    /// Checks a memory reference at compile time.
    fn validate(&mut self, name: Option<&str>, space: ExpressionSpace)
        -> Result<(), ExpressionError>;
}

const TEMP_NAMES: [&str; TEMP_VARIABLES] = [
    "temp0", "temp1", "temp2", "temp3", "temp4", "temp5", "temp6", "temp7", "temp8", "temp9",
];

/// Resolves expression symbols and memory references against a session and
/// its machine, in the scope of one CPU.
pub struct ExpressionMemoryBridge<'a> {
    pub session: &'a mut DebugSession,
    pub machine: &'a mut dyn Machine,
    pub cpu: CpuId,
}

impl ExpressionMemoryBridge<'_> {
    fn target_cpu(&self, name: Option<&str>) -> CpuId {
        name.and_then(|name| self.session.find_cpu(name))
            .or(self.session.visible_cpu)
            .unwrap_or(self.cpu)
    }

    /// Reads the program space of `cpu` through its raw `view`, one byte at
    /// a time.
    fn read_direct(&mut self, cpu: CpuId, view: RawView, address: u64, size: u8) -> u64 {
        let Some(space) = self.machine.space(cpu, SpaceNum::Program) else {
            return low_mask(size);
        };
        let config = space.config();
        if size > 1 {
            let half = size / 2;
            let lower = self.read_direct(cpu, view, address, half);
            let upper = self.read_direct(cpu, view, address.wrapping_add(u64::from(half)), half);
            return config.endianness.assemble(lower, upper, half);
        }
        let lowmask = u64::from(config.bus_bytes()) - 1;
        space
            .raw(view, address & !lowmask)
            .and_then(|word| {
                word.get(config.endianness.lane(address, lowmask) as usize)
                    .copied()
            })
            .map_or(low_mask(1), u64::from)
    }

    fn write_direct(&mut self, cpu: CpuId, view: RawView, address: u64, size: u8, value: u64) {
        let Some(space) = self.machine.space(cpu, SpaceNum::Program) else {
            return;
        };
        let config = space.config();
        if size > 1 {
            let half = size / 2;
            let (lower, upper) = config.endianness.split(value, half);
            self.write_direct(cpu, view, address, half, lower);
            self.write_direct(cpu, view, address.wrapping_add(u64::from(half)), half, upper);
            return;
        }
        let lowmask = u64::from(config.bus_bytes()) - 1;
        if let Some(byte) = space
            .raw_mut(view, address & !lowmask)
            .and_then(|word| word.get_mut(config.endianness.lane(address, lowmask) as usize))
        {
            *byte = value as u8;
            self.session.memory_modified = true;
        }
    }
}

impl ExpressionContext for ExpressionMemoryBridge<'_> {
    fn symbol(&mut self, name: &str) -> Result<u64, ExpressionError> {
        if let Some(i) = TEMP_NAMES.iter().position(|t| *t == name) {
            return Ok(self.session.temp[i]);
        }
        let beam = || self.machine.screen_position().unwrap_or_default();
        match name {
            "cpunum" => return Ok(self.session.visible_cpu.map_or(0, |c| c.0 as u64)),
            "wpaddr" => return Ok(self.session.wpaddr),
            "wpdata" => return Ok(self.session.wpdata),
            "beamx" => return Ok(beam().x),
            "beamy" => return Ok(beam().y),
            "frame" => return Ok(beam().frame),
            _ => {}
        }
        if let Some(value) = self.session.cpus[self.cpu.0].symbols.get(name) {
            return Ok(value);
        }
        if let Some(value) = self.machine.register(self.cpu, name) {
            return Ok(value);
        }
        self.session
            .symbols
            .get(name)
            .ok_or_else(|| ExpressionError::UnknownSymbol(name.to_string()))
    }

    fn set_symbol(&mut self, name: &str, value: u64) -> Result<(), ExpressionError> {
        if let Some(i) = TEMP_NAMES.iter().position(|t| *t == name) {
            self.session.temp[i] = value;
            return Ok(());
        }
        if matches!(
            name,
            "cpunum" | "wpaddr" | "wpdata" | "beamx" | "beamy" | "frame"
        ) {
            return Err(ExpressionError::ReadOnlySymbol(name.to_string()));
        }
        let cpu_symbols = &mut self.session.cpus[self.cpu.0].symbols;
        if cpu_symbols.contains(name) {
            return cpu_symbols.set(name, value);
        }
        if self.machine.set_register(self.cpu, name, value) {
            return Ok(());
        }
        self.session.symbols.set(name, value)
    }

    fn read_memory(
        &mut self,
        name: Option<&str>,
        space: ExpressionSpace,
        address: u64,
        size: u8,
    ) -> u64 {
        match space {
            ExpressionSpace::Logical(num) | ExpressionSpace::Physical(num) => {
                let cpu = self.target_cpu(name);
                let Some(config) = self.machine.space(cpu, num).map(|s| s.config()) else {
                    return low_mask(size);
                };
                let translate = matches!(space, ExpressionSpace::Logical(_));
                self.session.read_memory(
                    self.machine,
                    cpu,
                    num,
                    config.address_to_byte(address),
                    size,
                    translate,
                )
            }
            ExpressionSpace::Opcode | ExpressionSpace::RamWrite => {
                let cpu = self.target_cpu(name);
                let Some(config) = self
                    .machine
                    .space(cpu, SpaceNum::Program)
                    .map(|s| s.config())
                else {
                    return low_mask(size);
                };
                self.read_direct(cpu, direct_view(space), config.address_to_byte(address), size)
            }
            ExpressionSpace::Region => match name.and_then(|name| self.machine.region(name)) {
                Some(region) => region.read(address, size),
                None => low_mask(size),
            },
        }
    }

    fn write_memory(
        &mut self,
        name: Option<&str>,
        space: ExpressionSpace,
        address: u64,
        size: u8,
        value: u64,
    ) {
        match space {
            ExpressionSpace::Logical(num) | ExpressionSpace::Physical(num) => {
                let cpu = self.target_cpu(name);
                let Some(config) = self.machine.space(cpu, num).map(|s| s.config()) else {
                    return;
                };
                let translate = matches!(space, ExpressionSpace::Logical(_));
                self.session.write_memory(
                    self.machine,
                    cpu,
                    num,
                    config.address_to_byte(address),
                    size,
                    value,
                    translate,
                );
            }
            ExpressionSpace::Opcode | ExpressionSpace::RamWrite => {
                let cpu = self.target_cpu(name);
                let Some(config) = self
                    .machine
                    .space(cpu, SpaceNum::Program)
                    .map(|s| s.config())
                else {
                    return;
                };
                self.write_direct(
                    cpu,
                    direct_view(space),
                    config.address_to_byte(address),
                    size,
                    value,
                );
            }
            ExpressionSpace::Region => {
                if let Some(region) = name.and_then(|name| self.machine.region(name)) {
                    if region.write(address, size, value) {
                        self.session.memory_modified = true;
                    }
                }
            }
        }
    }

    fn validate(
        &mut self,
        name: Option<&str>,
        space: ExpressionSpace,
    ) -> Result<(), ExpressionError> {
        let num = match space {
            ExpressionSpace::Logical(num) | ExpressionSpace::Physical(num) => num,
            ExpressionSpace::Opcode | ExpressionSpace::RamWrite => SpaceNum::Program,
            ExpressionSpace::Region => {
                let name = name.ok_or(ExpressionError::MissingMemoryName)?;
                return match self.machine.region(name) {
                    Some(_) => Ok(()),
                    None => Err(ExpressionError::InvalidMemoryName(name.to_string())),
                };
            }
        };
        let cpu = match name {
            Some(name) => self
                .session
                .find_cpu(name)
                .ok_or_else(|| ExpressionError::InvalidMemoryName(name.to_string()))?,
            None => self.target_cpu(None),
        };
        match self.machine.space(cpu, num) {
            Some(_) => Ok(()),
            None => Err(ExpressionError::NoSuchMemorySpace),
        }
    }
}

fn direct_view(space: ExpressionSpace) -> RawView {
    if space == ExpressionSpace::Opcode {
        RawView::Opcode
    } else {
        RawView::Ram
    }
}

impl DebugSession {
    /// Evaluates `expression` in the scope of `cpu`.
    pub fn evaluate(
        &mut self,
        machine: &mut dyn Machine,
        cpu: CpuId,
        expression: &dyn Expression,
    ) -> Result<u64, ExpressionError> {
        let mut bridge = ExpressionMemoryBridge {
            session: self,
            machine,
            cpu,
        };
        expression.execute(&mut bridge)
    }

    /// Whether a breakpoint or watchpoint condition is met. A missing
    /// condition always is, a failing one never is.
    pub(crate) fn condition_holds(
        &mut self,
        machine: &mut dyn Machine,
        cpu: CpuId,
        condition: Option<Rc<dyn Expression>>,
    ) -> bool {
        let Some(condition) = condition else {
            return true;
        };
        match self.evaluate(machine, cpu, condition.as_ref()) {
            Ok(value) => value != 0,
            Err(err) => {
                log::debug!(
                    target: TraceItem::Expression.as_str(),
                    "condition `{}` failed: {err}",
                    condition.source()
                );
                false
            }
        }
    }
}

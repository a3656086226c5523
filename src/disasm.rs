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

//! Disassembler seams.
//!
//! The engine only needs a disassembler to find out how long an instruction
//! is and whether it is a subroutine call or return, for step-over,
//! step-out and trace-over. The text is used for trace files.

use bitflags::bitflags;

use crate::{machine::Machine, memory::SpaceNum, session::CpuId, DebugSession};

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct DasmFlags: u8 {
        /// The flags below are meaningful for this instruction.
        const SUPPORTED = 1 << 0;
        /// Subroutine call: stepping over it stops after it returns.
        const STEP_OVER = 1 << 1;
        /// Subroutine return.
        const STEP_OUT = 1 << 2;
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Disassembly {
    pub text: String,
    /// Instruction length in bytes.
    pub length: u32,
    pub flags: DasmFlags,
    /// For calls, the number of instructions after this one that belong to
    /// the same call sequence (delay slots and the like).
    pub extra_skip: u32,
}

impl Disassembly {
    #[inline]
    pub fn is_call(&self) -> bool {
        self.flags.contains(DasmFlags::SUPPORTED | DasmFlags::STEP_OVER)
    }

    #[inline]
    pub fn is_return(&self) -> bool {
        self.flags.contains(DasmFlags::SUPPORTED | DasmFlags::STEP_OUT)
    }
}

/// A CPU's disassembler.
pub trait Disassembler {
    /// Maximum number of bytes a single instruction spans.
    fn max_opcode_bytes(&self) -> usize;

    /// Disassembles the instruction at `pc`.
    ///
    /// `opcodes` holds bytes fetched from the decrypted opcode view and
    /// `arguments` from the raw argument view, both in ascending address
    /// order and both `max_opcode_bytes()` long.
    fn disassemble(&self, pc: u64, opcodes: &[u8], arguments: &[u8]) -> Disassembly;
}

/// Replaces the CPU disassembler for instructions it recognises.
pub trait DisassemblerOverride {
    fn disassemble(&mut self, pc: u64, opcodes: &[u8], arguments: &[u8]) -> Option<Disassembly>;
}

/// Disassembler for A64 instructions.
#[derive(Clone, Copy, Debug, Default)]
pub struct Aarch64Disassembler;

impl Disassembler for Aarch64Disassembler {
    fn max_opcode_bytes(&self) -> usize {
        4
    }

    fn disassemble(&self, pc: u64, opcodes: &[u8], _arguments: &[u8]) -> Disassembly {
        let Some(word) = opcodes
            .get(..4)
            .and_then(|bytes| <[u8; 4]>::try_from(bytes).ok())
            .map(u32::from_le_bytes)
        else {
            return Disassembly {
                text: "<truncated>".to_string(),
                length: 4,
                ..Disassembly::default()
            };
        };
        match bad64::decode(word, pc) {
            Ok(ins) => {
                use bad64::Op;

                let flags = match ins.op() {
                    Op::BL | Op::BLR => DasmFlags::SUPPORTED | DasmFlags::STEP_OVER,
                    Op::RET | Op::ERET => DasmFlags::SUPPORTED | DasmFlags::STEP_OUT,
                    _ => DasmFlags::SUPPORTED,
                };
                Disassembly {
                    text: ins.to_string(),
                    length: 4,
                    flags,
                    extra_skip: 0,
                }
            }
            Err(err) => Disassembly {
                text: format!(".inst 0x{word:08x} ; {err:?}"),
                length: 4,
                ..Disassembly::default()
            },
        }
    }
}

impl DebugSession {
    /// Disassembles the instruction at `pc` (in program space address units)
    /// on `cpu`, consulting the disassembly override first.
    pub fn disassemble(&mut self, machine: &mut dyn Machine, cpu: CpuId, pc: u64) -> Disassembly {
        let Some(config) = machine.space(cpu, SpaceNum::Program).map(|s| s.config()) else {
            return Disassembly::default();
        };
        let pcbyte = config.address_to_byte(pc) & config.logical_byte_mask();
        let max_bytes = self.cpus[cpu.0].disassembler.max_opcode_bytes();
        let mut opcodes = Vec::with_capacity(max_bytes);
        let mut arguments = Vec::with_capacity(max_bytes);
        for offset in 0..max_bytes as u64 {
            let address = pcbyte.wrapping_add(offset);
            opcodes.push(self.read_opcode(machine, cpu, address, 1, false) as u8);
            arguments.push(self.read_opcode(machine, cpu, address, 1, true) as u8);
        }
        let ctx = &mut self.cpus[cpu.0];
        if let Some(result) = ctx
            .dasm_override
            .as_mut()
            .and_then(|o| o.disassemble(pc, &opcodes, &arguments))
        {
            return result;
        }
        ctx.disassembler.disassemble(pc, &opcodes, &arguments)
    }

    /// Address right after the call instruction at `pc` and the extra
    /// instructions belonging to its call sequence, if `pc` holds a call.
    pub(crate) fn post_call_address(
        &mut self,
        machine: &mut dyn Machine,
        cpu: CpuId,
        pc: u64,
        dasm: &Disassembly,
    ) -> Option<u64> {
        if !dasm.is_call() {
            return None;
        }
        let config = machine.space(cpu, SpaceNum::Program)?.config();
        let advance = |pc: u64, length: u32| {
            config.byte_to_address(config.address_to_byte(pc).wrapping_add(u64::from(length)))
        };
        let mut target = advance(pc, dasm.length);
        for _ in 0..dasm.extra_skip {
            let length = self.disassemble(machine, cpu, target).length;
            target = advance(target, length);
        }
        Some(target)
    }
}

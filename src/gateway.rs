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

//! Memory accesses issued by the debugger itself.
//!
//! Such accesses never trigger watchpoints or hotspot recording, may go
//! through logical to physical translation, and can be intercepted by a
//! CPU's [`CustomMemoryDevice`]. Accesses wider than the data bus or not
//! naturally aligned are split in halves until they are neither.

use crate::{
    logging::TraceItem,
    machine::Machine,
    memory::{low_mask, Endianness, RawView, SpaceNum, TranslateIntention},
    session::CpuId,
    DebugSession,
};

/// Per-CPU interception of debugger memory accesses, for CPUs whose memory
/// is not fully described by their address spaces.
pub trait CustomMemoryDevice {
    /// Returns `Some` to claim a read of `size` bytes at byte `address`.
    fn read(&mut self, _space: SpaceNum, _address: u64, _size: u8) -> Option<u64> {
        None
    }

    /// Returns `true` to claim a write.
    fn write(&mut self, _space: SpaceNum, _address: u64, _size: u8, _value: u64) -> bool {
        false
    }

    /// Returns `Some` to claim an opcode fetch.
    fn read_opcode(&mut self, _address: u64, _size: u8) -> Option<u64> {
        None
    }
}

impl DebugSession {
    /// Reads `size` bytes at byte `address` of `space`.
    ///
    /// Addresses that fail translation read as all-ones.
    pub fn read_memory(
        &mut self,
        machine: &mut dyn Machine,
        cpu: CpuId,
        space: SpaceNum,
        address: u64,
        size: u8,
        translate: bool,
    ) -> u64 {
        debug_assert!(size.is_power_of_two() && size <= 8, "bad access size {size}");
        let Some(config) = machine.space(cpu, space).map(|s| s.config()) else {
            return low_mask(size);
        };
        let address = address & config.logical_byte_mask();
        let size_mask = u64::from(size) - 1;
        if size > config.bus_bytes() || address & size_mask != 0 {
            let half = size / 2;
            let lower = self.read_memory(machine, cpu, space, address, half, translate);
            let upper = self.read_memory(
                machine,
                cpu,
                space,
                address.wrapping_add(u64::from(half)),
                half,
                translate,
            );
            return config.endianness.assemble(lower, upper, half);
        }

        let _guard = self.debugger_access.enter();
        let Some(space_ref) = machine.space(cpu, space) else {
            return low_mask(size);
        };
        let address = if translate {
            match space_ref.translate(TranslateIntention::ReadDebug, address) {
                Some(address) => address,
                None => {
                    log::trace!(
                        target: TraceItem::Memory.as_str(),
                        "{space} read of {address:#x} failed translation"
                    );
                    return low_mask(size);
                }
            }
        } else {
            address
        };
        if let Some(value) = self.cpus[cpu.0]
            .custom_memory
            .as_mut()
            .and_then(|d| d.read(space, address, size))
        {
            return value & low_mask(size);
        }
        space_ref.read(address, size) & low_mask(size)
    }

    /// Writes `size` bytes at byte `address` of `space`.
    ///
    /// Writes to addresses that fail translation are dropped.
    #[allow(clippy::too_many_arguments)]
    pub fn write_memory(
        &mut self,
        machine: &mut dyn Machine,
        cpu: CpuId,
        space: SpaceNum,
        address: u64,
        size: u8,
        value: u64,
        translate: bool,
    ) {
        debug_assert!(size.is_power_of_two() && size <= 8, "bad access size {size}");
        self.memory_modified = true;
        let Some(config) = machine.space(cpu, space).map(|s| s.config()) else {
            return;
        };
        let address = address & config.logical_byte_mask();
        let size_mask = u64::from(size) - 1;
        if size > config.bus_bytes() || address & size_mask != 0 {
            let half = size / 2;
            let (lower, upper) = config.endianness.split(value, half);
            self.write_memory(machine, cpu, space, address, half, lower, translate);
            self.write_memory(
                machine,
                cpu,
                space,
                address.wrapping_add(u64::from(half)),
                half,
                upper,
                translate,
            );
            return;
        }

        let _guard = self.debugger_access.enter();
        let Some(space_ref) = machine.space(cpu, space) else {
            return;
        };
        let address = if translate {
            match space_ref.translate(TranslateIntention::WriteDebug, address) {
                Some(address) => address,
                None => {
                    log::trace!(
                        target: TraceItem::Memory.as_str(),
                        "{space} write to {address:#x} failed translation"
                    );
                    return;
                }
            }
        } else {
            address
        };
        let value = value & low_mask(size);
        if self.cpus[cpu.0]
            .custom_memory
            .as_mut()
            .is_some_and(|d| d.write(space, address, size, value))
        {
            return;
        }
        space_ref.write(address, size, value);
    }

    /// Fetches `size` opcode bytes at byte `address` of the program space.
    ///
    /// Reads the decrypted opcode view, or the raw argument view if
    /// `argument` is set, without going through the memory handlers.
    pub fn read_opcode(
        &mut self,
        machine: &mut dyn Machine,
        cpu: CpuId,
        address: u64,
        size: u8,
        argument: bool,
    ) -> u64 {
        debug_assert!(size.is_power_of_two() && size <= 8, "bad access size {size}");
        let Some(config) = machine.space(cpu, SpaceNum::Program).map(|s| s.config()) else {
            return low_mask(size);
        };
        let address = address & config.logical_byte_mask();
        let _guard = self.debugger_access.enter();
        if let Some(value) = self.cpus[cpu.0]
            .custom_memory
            .as_mut()
            .and_then(|d| d.read_opcode(address, size))
        {
            return value & low_mask(size);
        }

        let size_mask = u64::from(size) - 1;
        if size > config.bus_bytes() || address & size_mask != 0 {
            let half = size / 2;
            let lower = self.read_opcode(machine, cpu, address, half, argument);
            let upper = self.read_opcode(
                machine,
                cpu,
                address.wrapping_add(u64::from(half)),
                half,
                argument,
            );
            return config.endianness.assemble(lower, upper, half);
        }

        let Some(space_ref) = machine.space(cpu, SpaceNum::Program) else {
            return low_mask(size);
        };
        let Some(address) = space_ref.translate(TranslateIntention::FetchDebug, address) else {
            return low_mask(size);
        };
        let address = address & config.byte_mask();
        let bus_bytes = u64::from(config.bus_bytes());
        let lowmask = bus_bytes - 1;
        // Bus words are stored little-endian, so on a big-endian bus the
        // requested bytes sit in the opposite lanes.
        let lane_address = match config.endianness {
            Endianness::Little => address,
            Endianness::Big => address ^ (bus_bytes - u64::from(size)),
        };
        let view = if argument {
            RawView::Argument
        } else {
            RawView::Opcode
        };
        let offset = (lane_address & lowmask) as usize;
        let raw = space_ref
            .raw(view, lane_address & !lowmask)
            .and_then(|word| word.get(offset..offset + usize::from(size)));
        match raw {
            Some(bytes) => bytes
                .iter()
                .rev()
                .fold(0, |value, byte| (value << 8) | u64::from(*byte)),
            // No backing store, and device handlers must not see debugger
            // fetches.
            None => low_mask(size),
        }
    }
}

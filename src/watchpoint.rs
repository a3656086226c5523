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

use bitflags::bitflags;

use crate::{
    expression::Expression,
    frontend::Frontend,
    logging::TraceItem,
    machine::Machine,
    memory::{Endianness, SpaceNum},
    session::{CpuId, ExecutionState},
    DebugSession,
};

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct AccessType: u8 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
        const READ_WRITE = Self::READ.bits() | Self::WRITE.bits();
    }
}

/// Descriptive word of an access of 0 to 8 bytes.
const SIZE_NAMES: [&str; 9] = [
    "0bytes", "byte", "word", "3bytes", "dword", "5bytes", "6bytes", "7bytes", "qword",
];

#[derive(Clone, Debug)]
pub struct Watchpoint {
    index: u32,
    enabled: bool,
    space: SpaceNum,
    access: AccessType,
    /// Byte address.
    address: u64,
    /// Length in bytes.
    length: u64,
    condition: Option<Rc<dyn Expression>>,
    action: Option<String>,
}

impl Watchpoint {
    #[inline]
    pub fn index(&self) -> u32 {
        self.index
    }

    #[inline]
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    #[inline]
    pub fn space(&self) -> SpaceNum {
        self.space
    }

    #[inline]
    pub fn access(&self) -> AccessType {
        self.access
    }

    /// First byte address watched.
    #[inline]
    pub fn address(&self) -> u64 {
        self.address
    }

    #[inline]
    pub fn length(&self) -> u64 {
        self.length
    }

    #[inline]
    pub fn condition(&self) -> Option<&Rc<dyn Expression>> {
        self.condition.as_ref()
    }

    #[inline]
    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    /// Whether an access of `size` bytes at `address` overlaps the range.
    fn overlaps(&self, access: AccessType, address: u64, size: u64) -> bool {
        self.enabled
            && self.access.intersects(access)
            && address.wrapping_add(size) > self.address
            && address < self.address.wrapping_add(self.length)
    }
}

/// Narrows an access to the byte lanes selected by `mem_mask`.
///
/// Returns the address of the first selected byte, the number of selected
/// bytes and `value` shifted down to the first selected lane. A zero mask
/// leaves the access untouched with a size of zero.
pub fn narrow_to_lanes(
    endianness: Endianness,
    bus_bytes: u8,
    address: u64,
    value: u64,
    mut mem_mask: u64,
) -> (u64, u8, u64) {
    if mem_mask == 0 {
        return (address, 0, value);
    }
    let mut value = value;
    let mut offset = 0;
    while offset < bus_bytes && mem_mask & 0xff == 0 {
        offset += 1;
        value >>= 8;
        mem_mask >>= 8;
    }
    let mut size = 0;
    while mem_mask != 0 {
        size += 1;
        mem_mask >>= 8;
    }
    let address = match endianness {
        Endianness::Little => address.wrapping_add(u64::from(offset)),
        Endianness::Big => {
            address.wrapping_add(u64::from(bus_bytes.saturating_sub(size + offset)))
        }
    };
    (address, size, value)
}

impl DebugSession {
    /// Sets a watchpoint on `length` address units starting at `address` in
    /// `space` of `cpu`, and returns its index.
    #[allow(clippy::too_many_arguments)]
    pub fn watchpoint_set(
        &mut self,
        machine: &mut dyn Machine,
        cpu: CpuId,
        space: SpaceNum,
        access: AccessType,
        address: u64,
        length: u64,
        condition: Option<Rc<dyn Expression>>,
        action: Option<&str>,
    ) -> u32 {
        let (address, length) = match machine.space(cpu, space) {
            Some(s) => {
                let config = s.config();
                (
                    config.address_to_byte(address) & config.byte_mask(),
                    config.address_to_byte(length),
                )
            }
            None => (address, length),
        };
        let index = self.next_watchpoint_index;
        self.next_watchpoint_index += 1;
        let ctx = &mut self.cpus[cpu.0];
        ctx.watchpoints[space.index()].push(Watchpoint {
            index,
            enabled: true,
            space,
            access,
            address,
            length,
            condition,
            action: action.map(str::to_string),
        });
        log::debug!(
            target: TraceItem::Watchpoint.as_str(),
            "set watchpoint {index:X} on {space} [{address:#x}, {:#x}) of CPU '{}'",
            address.wrapping_add(length),
            ctx.tag
        );
        ctx.update_live_flags();
        self.update_watchpoint_hooks(machine, cpu, space);
        self.update_debug_flags();
        index
    }

    fn find_watchpoint(&self, index: u32) -> Option<(CpuId, SpaceNum, usize)> {
        self.cpus.iter().enumerate().find_map(|(cpu, ctx)| {
            SpaceNum::ALL.into_iter().find_map(|space| {
                ctx.watchpoints[space.index()]
                    .iter()
                    .position(|wp| wp.index == index)
                    .map(|pos| (CpuId(cpu), space, pos))
            })
        })
    }

    /// Clears the watchpoint with this index, on whichever CPU and space
    /// owns it.
    pub fn watchpoint_clear(&mut self, machine: &mut dyn Machine, index: u32) -> bool {
        let Some((cpu, space, pos)) = self.find_watchpoint(index) else {
            return false;
        };
        let ctx = &mut self.cpus[cpu.0];
        ctx.watchpoints[space.index()].remove(pos);
        log::debug!(
            target: TraceItem::Watchpoint.as_str(),
            "cleared watchpoint {index:X} on CPU '{}'",
            ctx.tag
        );
        ctx.update_live_flags();
        self.update_watchpoint_hooks(machine, cpu, space);
        self.update_debug_flags();
        true
    }

    pub fn watchpoint_clear_all(&mut self, machine: &mut dyn Machine, cpu: CpuId) {
        let ctx = &mut self.cpus[cpu.0];
        for list in ctx.watchpoints.iter_mut() {
            list.clear();
        }
        ctx.update_live_flags();
        for space in SpaceNum::ALL {
            self.update_watchpoint_hooks(machine, cpu, space);
        }
        self.update_debug_flags();
    }

    /// Enables or disables the watchpoint with this index.
    pub fn watchpoint_enable(
        &mut self,
        machine: &mut dyn Machine,
        index: u32,
        enable: bool,
    ) -> bool {
        let Some((cpu, space, pos)) = self.find_watchpoint(index) else {
            return false;
        };
        let ctx = &mut self.cpus[cpu.0];
        ctx.watchpoints[space.index()][pos].enabled = enable;
        ctx.update_live_flags();
        self.update_watchpoint_hooks(machine, cpu, space);
        self.update_debug_flags();
        true
    }

    pub fn watchpoint_enable_all(&mut self, machine: &mut dyn Machine, cpu: CpuId, enable: bool) {
        let ctx = &mut self.cpus[cpu.0];
        for wp in ctx.watchpoints.iter_mut().flatten() {
            wp.enabled = enable;
        }
        ctx.update_live_flags();
        for space in SpaceNum::ALL {
            self.update_watchpoint_hooks(machine, cpu, space);
        }
        self.update_debug_flags();
    }

    /// Tells `space` whether the memory system must call the read and write
    /// hooks.
    pub(crate) fn update_watchpoint_hooks(
        &mut self,
        machine: &mut dyn Machine,
        cpu: CpuId,
        space: SpaceNum,
    ) {
        let ctx = &self.cpus[cpu.0];
        let mut read = space == SpaceNum::Program && ctx.hotspots.is_some();
        let mut write = false;
        for wp in ctx.watchpoints[space.index()].iter().filter(|wp| wp.enabled) {
            read |= wp.access.contains(AccessType::READ);
            write |= wp.access.contains(AccessType::WRITE);
        }
        if let Some(s) = machine.space(cpu, space) {
            s.enable_watchpoint_hooks(read, write);
        }
    }

    /// Checks an access of the memory system against the watchpoints of
    /// `space`.
    ///
    /// `mem_mask` selects the byte lanes of the bus word at `address` that
    /// take part in the access.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn watchpoint_check(
        &mut self,
        machine: &mut dyn Machine,
        frontend: &mut dyn Frontend,
        cpu: CpuId,
        space: SpaceNum,
        access: AccessType,
        address: u64,
        value: u64,
        mem_mask: u64,
    ) {
        if self.within_instruction_hook.is_active() || self.debugger_access.is_active() {
            return;
        }
        let _guard = self.within_instruction_hook.enter();

        let Some(config) = machine.space(cpu, space).map(|s| s.config()) else {
            return;
        };
        let (address, size, value) =
            narrow_to_lanes(config.endianness, config.bus_bytes(), address, value, mem_mask);

        self.wpaddr = address;
        if access.contains(AccessType::WRITE) {
            self.wpdata = value;
        }

        let mut i = 0;
        while let Some(wp) = self.cpus[cpu.0].watchpoints[space.index()].get(i) {
            i += 1;
            if !wp.overlaps(access, address, u64::from(size)) {
                continue;
            }
            let (index, condition, action) = (wp.index, wp.condition.clone(), wp.action.clone());
            if !self.condition_holds(machine, cpu, condition) {
                continue;
            }
            log::trace!(
                target: TraceItem::Watchpoint.as_str(),
                "watchpoint {index:X} hit by {access:?} of {size} bytes at {address:#x}"
            );
            self.set_execution_state(ExecutionState::Stopped);
            if let Some(action) = action {
                frontend.execute_command(self, machine, &action);
            }
            if self.is_stopped() {
                let size_name = SIZE_NAMES[usize::from(size).min(SIZE_NAMES.len() - 1)];
                let pc = machine.pc(cpu);
                let address = config.byte_to_address(address);
                let message = if access.contains(AccessType::WRITE) {
                    format!(
                        "Stopped at watchpoint {index:X} writing {size_name} to {address:08X} \
                         (PC={pc:X}) (data={value:X})"
                    )
                } else {
                    format!(
                        "Stopped at watchpoint {index:X} reading {size_name} from {address:08X} \
                         (PC={pc:X})"
                    )
                };
                frontend.print(&message);
            }
            break;
        }
    }
}

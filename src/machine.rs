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

use std::time::Duration;

use crate::{
    memory::{AddressSpace, MemoryRegion, SpaceNum},
    session::CpuId,
};

/// Beam position of the primary screen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScreenPosition {
    pub x: u64,
    pub y: u64,
    pub frame: u64,
}

/// The emulated machine, as seen by the debugger.
///
/// CPUs are identified by the [`CpuId`] the session handed out when they
/// were registered with [`DebugSession::add_cpu`](crate::DebugSession::add_cpu).
pub trait Machine {
    /// Address space `space` of `cpu`, if the CPU has one.
    fn space(&mut self, cpu: CpuId, space: SpaceNum) -> Option<&mut dyn AddressSpace>;

    /// Named raw memory region, such as a ROM image.
    fn region(&mut self, _name: &str) -> Option<&mut MemoryRegion> {
        None
    }

    /// Current program counter of `cpu`, in program space address units.
    fn pc(&self, cpu: CpuId) -> u64;

    fn register(&self, _cpu: CpuId, _name: &str) -> Option<u64> {
        None
    }

    /// Returns `false` if `cpu` has no register called `name`.
    fn set_register(&mut self, _cpu: CpuId, _name: &str, _value: u64) -> bool {
        false
    }

    /// Current emulated time.
    fn current_time(&self) -> Duration;

    /// Whether a save, load or other scheduled event is waiting for the
    /// current timeslice to end.
    fn scheduled_event_pending(&self) -> bool {
        false
    }

    fn screen_position(&self) -> Option<ScreenPosition> {
        None
    }
}

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

#![allow(clippy::len_without_is_empty)]

use crate::memory::{low_mask, Endianness, Width};

/// Memory-mapped device handlers.
pub trait DeviceMemoryOps: std::fmt::Debug {
    fn read(&mut self, address_inside_region: u64, width: Width) -> u64;
    fn write(&mut self, address_inside_region: u64, value: u64, width: Width);
}

/// A named block of raw memory not attached to any address space, such as a
/// ROM image.
///
/// Contents are stored as words of `width` bytes in little-endian byte
/// order, the same layout [`MemoryMap`](crate::memory::MemoryMap) uses for
/// its RAM.
pub struct MemoryRegion {
    pub name: String,
    pub endianness: Endianness,
    pub width: Width,
    data: Vec<u8>,
}

impl std::fmt::Debug for MemoryRegion {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        fmt.debug_struct("MemoryRegion")
            .field("name", &self.name)
            .field("endianness", &self.endianness)
            .field("width", &self.width)
            .field("len", &self.data.len())
            .finish_non_exhaustive()
    }
}

impl MemoryRegion {
    /// Returns a zero-filled region of `len` bytes.
    pub fn new(name: &str, len: usize, width: Width, endianness: Endianness) -> Self {
        Self::from_bytes(name, vec![0; len], width, endianness)
    }

    /// Wraps raw contents, already in storage order.
    pub fn from_bytes(name: &str, data: Vec<u8>, width: Width, endianness: Endianness) -> Self {
        Self {
            name: name.to_string(),
            endianness,
            width,
            data,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    #[inline]
    fn storage_index(&self, address: u64) -> usize {
        let lowmask = u64::from(self.width.bytes()) - 1;
        ((address & !lowmask) | self.endianness.lane(address, lowmask)) as usize
    }

    /// Reads the byte at `address`, or `None` if out of range.
    pub fn read_byte(&self, address: u64) -> Option<u8> {
        if address >= self.data.len() as u64 {
            return None;
        }
        self.data.get(self.storage_index(address)).copied()
    }

    /// Writes the byte at `address`. Returns `false` if out of range.
    pub fn write_byte(&mut self, address: u64, value: u8) -> bool {
        if address >= self.data.len() as u64 {
            return false;
        }
        let index = self.storage_index(address);
        match self.data.get_mut(index) {
            Some(byte) => {
                *byte = value;
                true
            }
            None => false,
        }
    }

    /// Reads `size` bytes starting at `address`, decomposing recursively down
    /// to bytes. Out of range bytes read as all-ones.
    pub fn read(&self, address: u64, size: u8) -> u64 {
        if size > 1 {
            let half = size / 2;
            let lower = self.read(address, half);
            let upper = self.read(address.wrapping_add(u64::from(half)), half);
            return self.endianness.assemble(lower, upper, half);
        }
        self.read_byte(address).map_or(low_mask(1), u64::from)
    }

    /// Writes `size` bytes starting at `address`, decomposing recursively
    /// down to bytes. Returns whether any byte was stored.
    pub fn write(&mut self, address: u64, size: u8, value: u64) -> bool {
        if size > 1 {
            let half = size / 2;
            let (lower, upper) = self.endianness.split(value, half);
            let a = self.write(address, half, lower);
            let b = self.write(address.wrapping_add(u64::from(half)), half, upper);
            return a || b;
        }
        self.write_byte(address, value as u8)
    }
}

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

use std::collections::BTreeMap;

use crate::memory::{
    low_mask, AddressSpace, DeviceMemoryOps, RawView, SpaceConfig, TranslateIntention, Width,
};

/// Logical to physical address translation for a [`MemoryMap`].
pub type Translator = Box<dyn Fn(TranslateIntention, u64) -> Option<u64>>;

#[derive(Debug)]
pub enum Backing {
    /// Bus words stored in little-endian byte order.
    Ram { data: Vec<u8>, read_only: bool },
    Device(Box<dyn DeviceMemoryOps>),
}

#[derive(Debug)]
pub struct Mapping {
    pub start: u64,
    pub len: u64,
    pub backing: Backing,
}

impl Mapping {
    #[inline]
    pub const fn last_addr(&self) -> u64 {
        self.start + self.len - 1
    }
}

#[derive(Debug)]
pub enum MemoryMapError {
    Overflows {
        start: u64,
        len: u64,
        byte_mask: u64,
    },
    Overlaps {
        start: u64,
        len: u64,
        overlaps_with: u64,
    },
    Misaligned {
        start: u64,
        len: u64,
        bus_bytes: u8,
    },
}

impl std::fmt::Display for MemoryMapError {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(fmt, "{self:?}")
    }
}

impl std::error::Error for MemoryMapError {}

pub struct MemoryMapBuilder {
    config: SpaceConfig,
    entries: BTreeMap<u64, Mapping>,
    translator: Option<Translator>,
}

impl std::fmt::Debug for MemoryMapBuilder {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        fmt.debug_struct("MemoryMapBuilder")
            .field("config", &self.config)
            .field("entries", &self.entries)
            .finish_non_exhaustive()
    }
}

impl MemoryMapBuilder {
    #[inline]
    pub fn new(config: SpaceConfig) -> Self {
        Self {
            config,
            entries: BTreeMap::default(),
            translator: None,
        }
    }

    fn add_mapping(&mut self, new: Mapping) -> Result<(), MemoryMapError> {
        let (start, len) = (new.start, new.len);
        let bus_bytes = self.config.bus_bytes();
        if len == 0 || start % u64::from(bus_bytes) != 0 || len % u64::from(bus_bytes) != 0 {
            return Err(MemoryMapError::Misaligned {
                start,
                len,
                bus_bytes,
            });
        }
        let byte_mask = self.config.byte_mask();
        match start.checked_add(len - 1) {
            Some(last) if last <= byte_mask => {}
            _ => {
                return Err(MemoryMapError::Overflows {
                    start,
                    len,
                    byte_mask,
                })
            }
        }
        // Entries never overlap each other, so only the closest one starting
        // below our end can overlap us.
        if let Some((&other, mapping)) = self.entries.range(..start + len).next_back() {
            if mapping.last_addr() >= start {
                return Err(MemoryMapError::Overlaps {
                    start,
                    len,
                    overlaps_with: other,
                });
            }
        }
        self.entries.insert(start, new);
        Ok(())
    }

    pub fn add_ram(&mut self, start: u64, len: u64) -> Result<(), MemoryMapError> {
        self.add_mapping(Mapping {
            start,
            len,
            backing: Backing::Ram {
                data: vec![0; len as usize],
                read_only: false,
            },
        })
    }

    /// Maps read-only memory. `contents` are in ascending address order and
    /// are padded with zeroes to a multiple of the bus width.
    pub fn add_rom(&mut self, start: u64, contents: &[u8]) -> Result<(), MemoryMapError> {
        let bus_bytes = u64::from(self.config.bus_bytes());
        let len = (contents.len() as u64).div_ceil(bus_bytes) * bus_bytes;
        let lowmask = bus_bytes - 1;
        let mut data = vec![0; len as usize];
        for (offset, byte) in contents.iter().enumerate() {
            let offset = offset as u64;
            let index = (offset & !lowmask) | self.config.endianness.lane(offset, lowmask);
            data[index as usize] = *byte;
        }
        self.add_mapping(Mapping {
            start,
            len,
            backing: Backing::Ram {
                data,
                read_only: true,
            },
        })
    }

    pub fn add_device(
        &mut self,
        start: u64,
        len: u64,
        ops: Box<dyn DeviceMemoryOps>,
    ) -> Result<(), MemoryMapError> {
        self.add_mapping(Mapping {
            start,
            len,
            backing: Backing::Device(ops),
        })
    }

    pub fn with_ram(mut self, start: u64, len: u64) -> Result<Self, MemoryMapError> {
        self.add_ram(start, len)?;
        Ok(self)
    }

    pub fn with_rom(mut self, start: u64, contents: &[u8]) -> Result<Self, MemoryMapError> {
        self.add_rom(start, contents)?;
        Ok(self)
    }

    pub fn with_device(
        mut self,
        start: u64,
        len: u64,
        ops: Box<dyn DeviceMemoryOps>,
    ) -> Result<Self, MemoryMapError> {
        self.add_device(start, len, ops)?;
        Ok(self)
    }

    pub fn with_translator(
        mut self,
        translator: impl Fn(TranslateIntention, u64) -> Option<u64> + 'static,
    ) -> Self {
        self.translator = Some(Box::new(translator));
        self
    }

    pub fn build(self) -> MemoryMap {
        let Self {
            config,
            entries,
            translator,
        } = self;
        MemoryMap {
            config,
            mappings: entries.into_values().collect(),
            translator,
            read_hooks: false,
            write_hooks: false,
        }
    }
}

/// A flattened, bus-mapped address space.
///
/// Reads from unmapped addresses return all-ones and writes to them are
/// dropped.
///
/// # Example
///
/// ```rust
/// use emudbg::memory::*;
///
/// let config = SpaceConfig::new("program", Endianness::Big, Width::_16, 16);
/// let overlap = MemoryMap::builder(config)
///     .with_ram(0x0, 0x100)
///     .unwrap()
///     .with_ram(0x80, 0x100)
///     .unwrap_err();
/// assert!(matches!(overlap, MemoryMapError::Overlaps { overlaps_with: 0, .. }));
///
/// let mut map = MemoryMap::builder(config)
///     .with_ram(0x0, 0x100)
///     .unwrap()
///     .build();
/// map.write(0x10, 2, 0xbeef);
/// assert_eq!(map.read(0x10, 1), 0xbe);
/// assert_eq!(map.read(0x11, 1), 0xef);
/// assert_eq!(map.read(0x200, 2), 0xffff);
/// ```
pub struct MemoryMap {
    config: SpaceConfig,
    mappings: Vec<Mapping>,
    translator: Option<Translator>,
    read_hooks: bool,
    write_hooks: bool,
}

impl std::fmt::Debug for MemoryMap {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        fmt.debug_struct("MemoryMap")
            .field("config", &self.config)
            .field("mappings", &self.mappings)
            .field("read_hooks", &self.read_hooks)
            .field("write_hooks", &self.write_hooks)
            .finish_non_exhaustive()
    }
}

impl MemoryMap {
    #[inline]
    pub fn builder(config: SpaceConfig) -> MemoryMapBuilder {
        MemoryMapBuilder::new(config)
    }

    #[inline]
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    /// Whether the debugger asked to be called on reads and on writes.
    #[inline]
    pub const fn watchpoint_hooks(&self) -> (bool, bool) {
        (self.read_hooks, self.write_hooks)
    }

    fn find_index(&self, addr: u64) -> Option<usize> {
        match self.mappings.binary_search_by_key(&addr, |m| m.start) {
            Ok(x) => Some(x),
            // Within the closest mapping with starting address < addr
            Err(x) if (x > 0 && addr <= self.mappings[x - 1].last_addr()) => Some(x - 1),
            _ => None,
        }
    }

    pub fn find_mapping(&self, addr: u64) -> Option<&Mapping> {
        self.find_index(addr).and_then(|x| self.mappings.get(x))
    }

    pub fn find_mapping_mut(&mut self, addr: u64) -> Option<&mut Mapping> {
        self.find_index(addr).and_then(|x| self.mappings.get_mut(x))
    }

    fn storage_index(&self, offset: u64) -> usize {
        let lowmask = u64::from(self.config.bus_bytes()) - 1;
        ((offset & !lowmask) | self.config.endianness.lane(offset, lowmask)) as usize
    }

    fn read_ram_byte(&self, address: u64) -> Option<u8> {
        let mapping = self.find_mapping(address)?;
        match mapping.backing {
            Backing::Ram { ref data, .. } => {
                data.get(self.storage_index(address - mapping.start)).copied()
            }
            Backing::Device(_) => None,
        }
    }

    fn write_ram_byte(&mut self, address: u64, value: u8) {
        let Some(index) = self.find_index(address) else {
            return;
        };
        let offset = address - self.mappings[index].start;
        let storage_index = self.storage_index(offset);
        if let Backing::Ram {
            ref mut data,
            read_only: false,
        } = self.mappings[index].backing
        {
            if let Some(byte) = data.get_mut(storage_index) {
                *byte = value;
            }
        }
    }

    /// Copies `bytes` into RAM or ROM starting at `address`, in ascending
    /// address order, bypassing write protection.
    pub fn load(&mut self, address: u64, bytes: &[u8]) {
        for (offset, byte) in bytes.iter().enumerate() {
            let address = address + offset as u64;
            let Some(index) = self.find_index(address) else {
                continue;
            };
            let storage_index = self.storage_index(address - self.mappings[index].start);
            if let Backing::Ram { ref mut data, .. } = self.mappings[index].backing {
                data[storage_index] = *byte;
            }
        }
    }
}

impl AddressSpace for MemoryMap {
    fn config(&self) -> SpaceConfig {
        self.config
    }

    fn read(&mut self, address: u64, size: u8) -> u64 {
        let Some(index) = self.find_index(address) else {
            return low_mask(size);
        };
        let start = self.mappings[index].start;
        if let Backing::Device(ref mut ops) = self.mappings[index].backing {
            let Some(width) = Width::from_bytes(size) else {
                return low_mask(size);
            };
            return ops.read(address - start, width) & low_mask(size);
        }
        let mut value = 0;
        for i in 0..u64::from(size) {
            let byte = self
                .read_ram_byte(address + i)
                .map_or(low_mask(1), u64::from);
            value = match self.config.endianness {
                crate::memory::Endianness::Little => value | (byte << (8 * i)),
                crate::memory::Endianness::Big => (value << 8) | byte,
            };
        }
        value
    }

    fn write(&mut self, address: u64, size: u8, value: u64) {
        let Some(index) = self.find_index(address) else {
            return;
        };
        let start = self.mappings[index].start;
        if let Backing::Device(ref mut ops) = self.mappings[index].backing {
            if let Some(width) = Width::from_bytes(size) {
                ops.write(address - start, value & low_mask(size), width);
            }
            return;
        }
        let size = u64::from(size);
        for i in 0..size {
            let shift = match self.config.endianness {
                crate::memory::Endianness::Little => 8 * i,
                crate::memory::Endianness::Big => 8 * (size - 1 - i),
            };
            self.write_ram_byte(address + i, (value >> shift) as u8);
        }
    }

    fn translate(&self, intention: TranslateIntention, address: u64) -> Option<u64> {
        match self.translator {
            Some(ref translator) => translator(intention, address),
            None => Some(address),
        }
    }

    fn raw(&self, _view: RawView, address: u64) -> Option<&[u8]> {
        let mapping = self.find_mapping(address)?;
        match mapping.backing {
            Backing::Ram { ref data, .. } => data.get((address - mapping.start) as usize..),
            Backing::Device(_) => None,
        }
    }

    fn raw_mut(&mut self, _view: RawView, address: u64) -> Option<&mut [u8]> {
        let mapping = self.find_mapping_mut(address)?;
        let offset = (address - mapping.start) as usize;
        match mapping.backing {
            Backing::Ram { ref mut data, .. } => data.get_mut(offset..),
            Backing::Device(_) => None,
        }
    }

    fn enable_watchpoint_hooks(&mut self, read: bool, write: bool) {
        self.read_hooks = read;
        self.write_hooks = write;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Endianness;

    #[derive(Debug)]
    struct Latch {
        value: u64,
    }

    impl DeviceMemoryOps for Latch {
        fn read(&mut self, _offset: u64, _width: Width) -> u64 {
            self.value
        }

        fn write(&mut self, _offset: u64, value: u64, _width: Width) {
            self.value = value;
        }
    }

    #[test]
    fn test_memory_map_layout() {
        let config = SpaceConfig::new("program", Endianness::Little, Width::_32, 16);
        assert!(matches!(
            MemoryMap::builder(config).with_ram(0x2, 0x10),
            Err(MemoryMapError::Misaligned { bus_bytes: 4, .. })
        ));
        assert!(matches!(
            MemoryMap::builder(config).with_ram(0xfff0, 0x20),
            Err(MemoryMapError::Overflows { .. })
        ));
        let mut map = MemoryMap::builder(config)
            .with_rom(0x0, &[1, 2, 3, 4, 5])
            .unwrap()
            .with_ram(0x100, 0x100)
            .unwrap()
            .with_device(0x8000, 0x10, Box::new(Latch { value: 0 }))
            .unwrap()
            .build();
        assert_eq!(map.len(), 3);
        assert_eq!(map.read(0x0, 4), 0x0403_0201);
        assert_eq!(map.read(0x4, 1), 0x05);
        map.write(0x0, 1, 0xaa);
        assert_eq!(map.read(0x0, 1), 0x01, "ROM is write protected");
        map.write(0x104, 4, 0xdead_beef);
        assert_eq!(map.raw(RawView::Ram, 0x104).unwrap()[..4], [0xef, 0xbe, 0xad, 0xde]);
        map.write(0x8000, 2, 0x1234);
        assert_eq!(map.read(0x8000, 1), 0x34);
        assert_eq!(map.read(0x4000, 4), 0xffff_ffff);
    }
}

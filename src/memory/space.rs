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

use crate::memory::{Endianness, RawView, TranslateIntention, Width};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
/// Static description of an address space.
pub struct SpaceConfig {
    pub name: &'static str,
    pub endianness: Endianness,
    pub data_width: Width,
    /// Physical address bus width in bits.
    pub address_width: u8,
    /// Logical address width in bits.
    pub logical_address_width: u8,
    /// Shift converting addresses to byte addresses. Negative values mean
    /// each address unit spans several bytes (`address << -shift`).
    pub address_shift: i8,
}

impl SpaceConfig {
    pub const fn new(
        name: &'static str,
        endianness: Endianness,
        data_width: Width,
        address_width: u8,
    ) -> Self {
        Self {
            name,
            endianness,
            data_width,
            address_width,
            logical_address_width: address_width,
            address_shift: 0,
        }
    }

    pub const fn with_address_shift(mut self, address_shift: i8) -> Self {
        self.address_shift = address_shift;
        self
    }

    pub const fn with_logical_address_width(mut self, logical_address_width: u8) -> Self {
        self.logical_address_width = logical_address_width;
        self
    }

    /// Data bus width in bytes.
    #[inline]
    pub const fn bus_bytes(&self) -> u8 {
        self.data_width.bytes()
    }

    #[inline]
    const fn bits_mask(bits: u8) -> u64 {
        if bits >= 64 {
            u64::MAX
        } else {
            (1u64 << bits) - 1
        }
    }

    /// Converts an address in address units to a byte address.
    #[inline]
    pub const fn address_to_byte(&self, address: u64) -> u64 {
        if self.address_shift < 0 {
            address << (-self.address_shift) as u32
        } else {
            address >> self.address_shift as u32
        }
    }

    /// Converts an address in address units to the last byte address it
    /// covers.
    #[inline]
    pub const fn address_to_byte_end(&self, address: u64) -> u64 {
        if self.address_shift < 0 {
            let shift = (-self.address_shift) as u32;
            (address << shift) | ((1u64 << shift) - 1)
        } else {
            address >> self.address_shift as u32
        }
    }

    /// Converts a byte address back to address units.
    #[inline]
    pub const fn byte_to_address(&self, address: u64) -> u64 {
        if self.address_shift < 0 {
            address >> (-self.address_shift) as u32
        } else {
            address << self.address_shift as u32
        }
    }

    /// Mask of valid physical byte addresses.
    #[inline]
    pub const fn byte_mask(&self) -> u64 {
        self.address_to_byte_end(Self::bits_mask(self.address_width))
    }

    /// Mask of valid logical byte addresses.
    #[inline]
    pub const fn logical_byte_mask(&self) -> u64 {
        self.address_to_byte_end(Self::bits_mask(self.logical_address_width))
    }

    /// Number of hex digits needed to print a logical address.
    #[inline]
    pub const fn logical_address_chars(&self) -> usize {
        (self.logical_address_width as usize).div_ceil(4)
    }
}

/// An address space of an emulated CPU, provided by the emulator's memory
/// system.
///
/// `read` and `write` are the generic memory primitives: they take byte
/// addresses and accesses that are naturally aligned and no wider than the
/// data bus. The debugger splits anything else before calling them.
pub trait AddressSpace {
    fn config(&self) -> SpaceConfig;

    fn read(&mut self, address: u64, size: u8) -> u64;

    fn write(&mut self, address: u64, size: u8, value: u64);

    /// Translates a logical byte address to a physical one. `None` means
    /// the address is unmapped.
    fn translate(&self, _intention: TranslateIntention, address: u64) -> Option<u64> {
        Some(address)
    }

    /// Raw backing storage starting at the bus-aligned byte address
    /// `address`. Bus words are stored in little-endian byte order.
    fn raw(&self, _view: RawView, _address: u64) -> Option<&[u8]> {
        None
    }

    fn raw_mut(&mut self, _view: RawView, _address: u64) -> Option<&mut [u8]> {
        None
    }

    /// Tells the memory system whether it must call the debugger's read and
    /// write hooks on every access to this space.
    fn enable_watchpoint_hooks(&mut self, _read: bool, _write: bool) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_space_config_masks() {
        let config = SpaceConfig::new("program", Endianness::Little, Width::_8, 16);
        assert_eq!(config.byte_mask(), 0xffff);
        assert_eq!(config.logical_byte_mask(), 0xffff);
        assert_eq!(config.logical_address_chars(), 4);
        assert_eq!(config.address_to_byte(0x1234), 0x1234);

        let config = SpaceConfig::new("program", Endianness::Big, Width::_16, 23)
            .with_address_shift(-1)
            .with_logical_address_width(24);
        assert_eq!(config.address_to_byte(0x100), 0x200);
        assert_eq!(config.byte_to_address(0x201), 0x100);
        assert_eq!(config.byte_mask(), 0xff_ffff);
        assert_eq!(config.logical_byte_mask(), 0x1ff_ffff);
        assert_eq!(config.logical_address_chars(), 6);
        assert_eq!(config.bus_bytes(), 2);

        let config = SpaceConfig::new("program", Endianness::Little, Width::_64, 64);
        assert_eq!(config.byte_mask(), u64::MAX);
    }
}

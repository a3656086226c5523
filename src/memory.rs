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

//! Address spaces as seen by the debugger.
//!
//! The engine does not own guest memory. It talks to the emulator's memory
//! system through the [`AddressSpace`] trait, and to named raw regions (ROM
//! images and the like) through [`MemoryRegion`]. [`MemoryMap`] is a
//! bus-mapped implementation of [`AddressSpace`] that embedders can use
//! directly.

mod map;
mod region;
mod space;

pub use map::*;
pub use region::*;
pub use space::*;

#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord, Hash)]
#[repr(u8)]
/// Data bus width in bits.
pub enum Width {
    _64 = 64,
    _32 = 32,
    _16 = 16,
    _8 = 8,
}

impl Width {
    /// Width in bytes.
    #[inline]
    pub const fn bytes(self) -> u8 {
        (self as u8) / 8
    }

    /// Returns the width of an access of `bytes` bytes, if it is one of 1, 2, 4
    /// or 8.
    pub const fn from_bytes(bytes: u8) -> Option<Self> {
        match bytes {
            1 => Some(Self::_8),
            2 => Some(Self::_16),
            4 => Some(Self::_32),
            8 => Some(Self::_64),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
/// Byte order of an address space or memory region.
pub enum Endianness {
    #[default]
    Little,
    Big,
}

impl Endianness {
    /// Combines two halves of `half` bytes each, `lower` read from the lower
    /// address.
    #[inline]
    pub const fn assemble(self, lower: u64, upper: u64, half: u8) -> u64 {
        let shift = 8 * half as u32;
        match self {
            Self::Little => (lower & low_mask(half)) | (upper << shift),
            Self::Big => (upper & low_mask(half)) | (lower << shift),
        }
    }

    /// Splits `value` into two halves of `half` bytes each, returned as
    /// `(lower address, upper address)`.
    #[inline]
    pub const fn split(self, value: u64, half: u8) -> (u64, u64) {
        let shift = 8 * half as u32;
        let low = value & low_mask(half);
        let high = if shift >= 64 { 0 } else { value >> shift };
        match self {
            Self::Little => (low, high),
            Self::Big => (high, low),
        }
    }

    /// Index of the byte lane holding byte `address` inside a bus word of
    /// `lowmask + 1` bytes stored in little-endian order.
    #[inline]
    pub const fn lane(self, address: u64, lowmask: u64) -> u64 {
        match self {
            Self::Little => address & lowmask,
            Self::Big => (address & lowmask) ^ lowmask,
        }
    }
}

/// All bits set for an access of `size` bytes: `0xff` for 1, `0xffff` for 2
/// and so on.
#[inline]
pub const fn low_mask(size: u8) -> u64 {
    if size >= 8 {
        u64::MAX
    } else {
        (1u64 << (8 * size as u32)) - 1
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord, Hash)]
/// Address space number of a CPU.
pub enum SpaceNum {
    Program = 0,
    Data = 1,
    Io = 2,
    Space3 = 3,
}

impl SpaceNum {
    /// Number of address spaces a CPU can have.
    pub const COUNT: usize = 4;

    pub const ALL: [Self; Self::COUNT] = [Self::Program, Self::Data, Self::Io, Self::Space3];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Program => "program",
            Self::Data => "data",
            Self::Io => "io",
            Self::Space3 => "space3",
        }
    }
}

impl std::fmt::Display for SpaceNum {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(fmt, "{}", self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
/// Purpose of a debugger-originated address translation.
pub enum TranslateIntention {
    ReadDebug,
    WriteDebug,
    FetchDebug,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
/// Raw view of a bus used by direct (untranslated, unhooked) accesses.
pub enum RawView {
    /// Plain RAM contents.
    Ram,
    /// Decrypted opcode view of the bus.
    Opcode,
    /// Raw argument view of the bus, for CPUs that fetch operands separately
    /// from opcodes.
    Argument,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assemble_split() {
        assert_eq!(Endianness::Little.assemble(0x34, 0x12, 1), 0x1234);
        assert_eq!(Endianness::Big.assemble(0x12, 0x34, 1), 0x1234);
        assert_eq!(Endianness::Little.split(0x1234, 1), (0x34, 0x12));
        assert_eq!(Endianness::Big.split(0x1234, 1), (0x12, 0x34));
        assert_eq!(
            Endianness::Little.split(0x1122_3344_5566_7788, 4),
            (0x5566_7788, 0x1122_3344)
        );
    }

    #[test]
    fn test_lane() {
        assert_eq!(Endianness::Little.lane(5, 0), 0);
        assert_eq!(Endianness::Big.lane(5, 0), 0);
        assert_eq!(Endianness::Little.lane(5, 3), 1);
        assert_eq!(Endianness::Big.lane(5, 3), 2);
        assert_eq!(Endianness::Big.lane(0, 1), 1);
    }

    #[test]
    fn test_low_mask() {
        assert_eq!(low_mask(1), 0xff);
        assert_eq!(low_mask(2), 0xffff);
        assert_eq!(low_mask(4), 0xffff_ffff);
        assert_eq!(low_mask(8), u64::MAX);
        assert_eq!(Width::_32.bytes(), 4);
        assert_eq!(Width::from_bytes(3), None);
    }
}

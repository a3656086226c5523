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

use indexmap::IndexMap;

use crate::expression::ExpressionError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Symbol {
    value: u64,
    read_only: bool,
}

/// User-defined symbols, kept in definition order for listing.
#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
    entries: IndexMap<String, Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines or redefines a writable symbol.
    pub fn add(&mut self, name: &str, value: u64) {
        self.entries.insert(
            name.to_string(),
            Symbol {
                value,
                read_only: false,
            },
        );
    }

    pub fn add_constant(&mut self, name: &str, value: u64) {
        self.entries.insert(
            name.to_string(),
            Symbol {
                value,
                read_only: true,
            },
        );
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.entries.shift_remove(name).is_some()
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<u64> {
        self.entries.get(name).map(|s| s.value)
    }

    pub fn set(&mut self, name: &str, value: u64) -> Result<(), ExpressionError> {
        match self.entries.get_mut(name) {
            None => Err(ExpressionError::UnknownSymbol(name.to_string())),
            Some(Symbol {
                read_only: true, ..
            }) => Err(ExpressionError::ReadOnlySymbol(name.to_string())),
            Some(symbol) => {
                symbol.value = value;
                Ok(())
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.entries.iter().map(|(k, s)| (k.as_str(), s.value))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_table() {
        let mut table = SymbolTable::new();
        table.add("counter", 1);
        table.add_constant("romsize", 0x8000);
        table.add("base", 0x100);
        assert_eq!(
            table.iter().map(|(k, _)| k).collect::<Vec<_>>(),
            ["counter", "romsize", "base"]
        );
        table.set("counter", 2).unwrap();
        assert_eq!(table.get("counter"), Some(2));
        assert_eq!(
            table.set("romsize", 0),
            Err(ExpressionError::ReadOnlySymbol("romsize".into()))
        );
        assert_eq!(
            table.set("missing", 0),
            Err(ExpressionError::UnknownSymbol("missing".into()))
        );
        assert!(table.remove("romsize"));
        assert_eq!(table.iter().map(|(k, _)| k).collect::<Vec<_>>(), ["counter", "base"]);
        assert_eq!(table.len(), 2);
    }
}
